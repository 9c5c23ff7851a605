//! Plain-text rendering of the grid, pass reports and echoes.

use std::fmt::Write as _;

use chrono_weave_core::{CellKind, ConduitKind, FlowReport, Grid, TemporalEcho};

/// Number of most recent echoes shown after a session.
pub(crate) const VISIBLE_ECHOES: usize = 3;

/// Renders the grid one row per line.
///
/// `S` marks a source, `T` a target, `.` an empty cell and `-`, `=`, `#`
/// the basic, quantum and temporal conduits. Empty cells carrying residue are
/// shown as `:`.
#[must_use]
pub(crate) fn render_grid(grid: &Grid) -> String {
    let size = grid.size();
    let mut out = String::new();
    for (cell, state) in grid.iter() {
        let glyph = match state.kind {
            CellKind::Source { .. } => 'S',
            CellKind::Target { .. } => 'T',
            CellKind::Conduit { kind, .. } => conduit_glyph(kind),
            CellKind::Empty if state.temporal_residue > 0.0 => ':',
            CellKind::Empty => '.',
        };
        out.push(glyph);
        if cell.column() + 1 == size {
            out.push('\n');
        }
    }
    out
}

/// Summarises a completed pass.
#[must_use]
pub(crate) fn render_report(report: &FlowReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "loop {}: score {} | efficiency {:.1}% | delivered {:.1} | spent {} | targets reached {}",
        report.loop_number,
        report.score,
        report.efficiency,
        report.total_energy_delivered,
        report.total_energy_used,
        report.targets_reached,
    );
    for route in &report.routes {
        match route.target {
            Some(target) => {
                let _ = writeln!(
                    out,
                    "  {} -> {} in {} hops: {:.1}",
                    route.source, target, route.hops, route.delivered
                );
            }
            None => {
                let _ = writeln!(out, "  {} -> no reachable target", route.source);
            }
        }
    }
    out
}

/// Lists the most recent echoes, newest last.
#[must_use]
pub(crate) fn render_echoes(echoes: &[TemporalEcho]) -> String {
    let skip = echoes.len().saturating_sub(VISIBLE_ECHOES);
    let mut out = String::new();
    for echo in &echoes[skip..] {
        let _ = writeln!(
            out,
            "echo of loop {}: score {} | efficiency {:.1}%",
            echo.loop_number, echo.score, echo.efficiency
        );
    }
    out
}

const fn conduit_glyph(kind: ConduitKind) -> char {
    match kind {
        ConduitKind::Basic => '-',
        ConduitKind::Quantum => '=',
        ConduitKind::Temporal => '#',
    }
}

#[cfg(test)]
mod tests {
    use chrono_weave_core::{Cell, CellCoord, ConduitSpec, Grid};

    use super::*;

    fn echo(loop_number: u32) -> TemporalEcho {
        TemporalEcho {
            loop_number,
            score: u64::from(loop_number) * 100,
            efficiency: 0.0,
            grid: Grid::new(1),
        }
    }

    #[test]
    fn renders_rows_top_to_bottom() {
        let mut grid = Grid::new(3);
        let placements = [
            (CellCoord::new(0, 1), CellKind::Source { output: 100.0 }),
            (
                CellCoord::new(2, 1),
                CellKind::Target {
                    required_energy: 80.0,
                },
            ),
            (
                CellCoord::new(1, 1),
                CellKind::Conduit {
                    kind: ConduitKind::Quantum,
                    spec: ConduitSpec::new(25, 1.5, 1),
                },
            ),
        ];
        for (cell, kind) in placements {
            if let Some(state) = grid.cell_mut(cell) {
                *state = Cell {
                    kind,
                    ..Cell::EMPTY
                };
            }
        }
        if let Some(state) = grid.cell_mut(CellCoord::new(2, 2)) {
            state.temporal_residue = 0.1;
        }

        assert_eq!(render_grid(&grid), "...\nS=T\n..:\n");
    }

    #[test]
    fn only_the_last_three_echoes_are_shown() {
        let echoes: Vec<TemporalEcho> = (1..=5).map(echo).collect();

        let rendered = render_echoes(&echoes);

        let loops: Vec<&str> = rendered.lines().collect();
        assert_eq!(loops.len(), 3);
        assert!(loops[0].starts_with("echo of loop 3"));
        assert!(loops[2].starts_with("echo of loop 5"));
    }
}
