//! Energy-flow evaluation for a single simulation pass.

use std::collections::BTreeMap;

use chrono_weave_core::{CellCoord, CellKind, FlowReport, Grid, GridConfig, RouteOutcome};

use crate::navigation::Router;

/// Routes every source to its nearest target, scores the pass and deposits residue.
///
/// Energy leaving a source is scaled by each conduit along its route, and the
/// conduit's cost is charged to the pass. Cells along a route hold the
/// running energy of the last route that crossed them, while targets
/// accumulate every arrival; both are clamped to the configured cap. After
/// scoring, every conduit cell gains `residue_increment`, whether or not it
/// carried energy.
pub(crate) fn run_pass(
    grid: &mut Grid,
    config: &GridConfig,
    loop_number: u32,
    router: &mut Router,
    route: &mut Vec<CellCoord>,
) -> FlowReport {
    clear_pass_energy(grid);

    let cap = config.energy_cap;
    let mut total_delivered = 0.0_f64;
    let mut total_used = 0_u32;
    let mut arrivals: BTreeMap<CellCoord, f64> = BTreeMap::new();
    let mut routes = Vec::with_capacity(config.sources.len());

    for source in &config.sources {
        if !router.find_route(grid, source.cell, route) {
            routes.push(RouteOutcome {
                source: source.cell,
                target: None,
                hops: 0,
                delivered: 0.0,
            });
            continue;
        }

        let Some(&target) = route.last() else {
            continue;
        };
        let mut energy = source.output;
        let last = route.len() - 1;
        for &step in route.iter().take(last).skip(1) {
            let Some(cell) = grid.cell_mut(step) else {
                continue;
            };
            if let CellKind::Conduit { spec, .. } = cell.kind {
                energy *= spec.efficiency_multiplier;
                total_used = total_used.saturating_add(spec.cost);
            }
            cell.energy = energy.min(cap);
        }

        if let Some(cell) = grid.cell_mut(target) {
            cell.energy = (cell.energy + energy).min(cap);
        }
        *arrivals.entry(target).or_insert(0.0) += energy;
        total_delivered += energy;

        routes.push(RouteOutcome {
            source: source.cell,
            target: Some(target),
            hops: u32::try_from(last).unwrap_or(u32::MAX),
            delivered: energy,
        });
    }

    let targets_reached = config
        .targets
        .iter()
        .filter(|target| {
            arrivals
                .get(&target.cell)
                .is_some_and(|&delivered| delivered >= target.required_energy)
        })
        .count();

    deposit_residue(grid, config.residue_increment);

    FlowReport {
        loop_number,
        score: score_for(total_delivered),
        efficiency: efficiency_for(total_delivered, total_used),
        total_energy_delivered: total_delivered,
        total_energy_used: total_used,
        targets_reached: u32::try_from(targets_reached).unwrap_or(u32::MAX),
        routes,
    }
}

/// Clears the energy recorded on every non-source cell.
pub(crate) fn clear_pass_energy(grid: &mut Grid) {
    for cell in grid.cells_mut() {
        if !cell.is_source() {
            cell.energy = 0.0;
        }
    }
}

fn deposit_residue(grid: &mut Grid, increment: f64) {
    for cell in grid.cells_mut() {
        if cell.conduit().is_some() {
            cell.temporal_residue += increment;
        }
    }
}

fn score_for(delivered: f64) -> u64 {
    (delivered * 10.0).floor().max(0.0) as u64
}

fn efficiency_for(delivered: f64, used: u32) -> f64 {
    if used == 0 {
        return 0.0;
    }
    delivered / f64::from(used) * 100.0
}
