#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative temporal grid state for Chrono-Weave.
//!
//! The [`World`] owns the grid, the per-loop energy budget, the loop counter,
//! the phase state machine and the echo history. It is mutated exclusively
//! through [`apply`], which validates the command against the current phase,
//! mutates state and reports what happened as [`Event`] values. Rejected
//! commands never leave partially applied state behind.

mod flow;
mod navigation;

use std::collections::BTreeSet;

use chrono_weave_core::{
    Cell, CellCoord, CellKind, Command, ConduitKind, ConduitSpec, ConfigurationError, EngineError,
    Event, FlowReport, Grid, GridConfig, Operation, Phase, PlacementError, RemovalError, TemporalEcho,
    MAX_GRID_SIZE, WELCOME_BANNER,
};
use tracing::{debug, info};

use crate::navigation::Router;

/// Represents the authoritative Chrono-Weave engine state.
#[derive(Debug)]
pub struct World {
    banner: &'static str,
    config: GridConfig,
    grid: Grid,
    budget: u32,
    loop_number: u32,
    phase: Phase,
    echoes: Vec<TemporalEcho>,
    last_report: Option<FlowReport>,
    router: Router,
    scratch_route: Vec<CellCoord>,
}

impl World {
    /// Creates a world laid out as the standard 8x8 board.
    #[must_use]
    pub fn new() -> Self {
        Self::from_validated(GridConfig::standard())
    }

    /// Creates a world from the provided configuration.
    pub fn with_config(config: GridConfig) -> Result<Self, EngineError> {
        validate(&config)?;
        Ok(Self::from_validated(config))
    }

    fn from_validated(config: GridConfig) -> Self {
        let grid = populate(&config);
        Self {
            banner: WELCOME_BANNER,
            budget: config.starting_budget,
            grid,
            config,
            loop_number: 1,
            phase: Phase::Setup,
            echoes: Vec::new(),
            last_report: None,
            router: Router::default(),
            scratch_route: Vec::new(),
        }
    }

    fn rebuild(&mut self, config: GridConfig, out_events: &mut Vec<Event>) {
        self.grid = populate(&config);
        self.budget = config.starting_budget;
        self.config = config;
        self.loop_number = 1;
        self.echoes.clear();
        self.last_report = None;
        self.phase = Phase::Setup;

        out_events.push(Event::GridInitialized {
            size: self.grid.size(),
            budget: self.budget,
        });
        out_events.push(Event::PhaseChanged { phase: Phase::Setup });
    }

    fn require_phase(&self, expected: Phase, operation: Operation) -> Result<(), EngineError> {
        if self.phase == expected {
            Ok(())
        } else {
            debug!(%operation, phase = %self.phase, "operation rejected in current phase");
            Err(EngineError::InvalidPhaseTransition {
                operation,
                phase: self.phase,
            })
        }
    }

    fn enter_phase(&mut self, phase: Phase, out_events: &mut Vec<Event>) {
        self.phase = phase;
        out_events.push(Event::PhaseChanged { phase });
    }

    fn place_conduit(
        &mut self,
        cell: CellCoord,
        kind: ConduitKind,
        out_events: &mut Vec<Event>,
    ) -> Result<(), EngineError> {
        self.require_phase(Phase::Setup, Operation::PlaceConduit)?;

        let outcome = self.check_placement(cell, kind);
        let (spec, replaced, budget) = match outcome {
            Ok(accepted) => accepted,
            Err(reason) => {
                debug!(%cell, ?kind, ?reason, "conduit placement rejected");
                out_events.push(Event::ConduitPlacementRejected { cell, kind, reason });
                return Ok(());
            }
        };

        if let Some(state) = self.grid.cell_mut(cell) {
            state.kind = CellKind::Conduit { kind, spec };
            state.energy = 0.0;
        }
        self.budget = budget;
        out_events.push(Event::ConduitPlaced {
            cell,
            kind,
            replaced,
            budget,
        });
        Ok(())
    }

    /// Refunds any conduit already on the cell before charging the new one.
    ///
    /// Both steps are evaluated together, so a rejected replacement leaves the
    /// previous conduit and the budget untouched.
    fn check_placement(
        &self,
        cell: CellCoord,
        kind: ConduitKind,
    ) -> Result<(ConduitSpec, Option<ConduitKind>, u32), PlacementError> {
        let state = self.grid.cell(cell).ok_or(PlacementError::OutOfBounds)?;
        if state.is_source() || state.is_target() {
            return Err(PlacementError::ProtectedCell);
        }
        let spec = self
            .config
            .catalog
            .spec(kind)
            .ok_or(PlacementError::UnknownConduit)?;

        let existing = state.conduit();
        let refund = existing.map_or(0, |(_, previous)| previous.cost);
        let available = self.budget.saturating_add(refund);
        if spec.cost > available {
            return Err(PlacementError::InsufficientBudget);
        }

        Ok((spec, existing.map(|(previous, _)| previous), available - spec.cost))
    }

    fn remove_conduit(
        &mut self,
        cell: CellCoord,
        out_events: &mut Vec<Event>,
    ) -> Result<(), EngineError> {
        self.require_phase(Phase::Setup, Operation::RemoveConduit)?;

        let Some(state) = self.grid.cell_mut(cell) else {
            out_events.push(Event::ConduitRemovalRejected {
                cell,
                reason: RemovalError::OutOfBounds,
            });
            return Ok(());
        };
        let Some((kind, spec)) = state.conduit() else {
            out_events.push(Event::ConduitRemovalRejected {
                cell,
                reason: RemovalError::MissingConduit,
            });
            return Ok(());
        };

        state.kind = CellKind::Empty;
        state.energy = 0.0;
        self.budget = self.budget.saturating_add(spec.cost);
        out_events.push(Event::ConduitRemoved {
            cell,
            kind,
            budget: self.budget,
        });
        Ok(())
    }

    fn begin_simulation(&mut self, out_events: &mut Vec<Event>) -> Result<(), EngineError> {
        self.require_phase(Phase::Setup, Operation::BeginSimulation)?;
        out_events.push(Event::SimulationStarted {
            loop_number: self.loop_number,
        });
        self.enter_phase(Phase::Simulating, out_events);
        Ok(())
    }

    fn complete_simulation(
        &mut self,
        out_events: &mut Vec<Event>,
    ) -> Result<FlowReport, EngineError> {
        self.require_phase(Phase::Simulating, Operation::CompleteSimulation)?;

        let report = flow::run_pass(
            &mut self.grid,
            &self.config,
            self.loop_number,
            &mut self.router,
            &mut self.scratch_route,
        );
        self.echoes.push(TemporalEcho {
            loop_number: report.loop_number,
            score: report.score,
            efficiency: report.efficiency,
            grid: self.grid.clone(),
        });
        self.last_report = Some(report.clone());

        info!(
            loop_number = report.loop_number,
            score = report.score,
            efficiency = report.efficiency,
            delivered = report.total_energy_delivered,
            used = report.total_energy_used,
            "simulation pass completed"
        );

        out_events.push(Event::SimulationCompleted {
            report: report.clone(),
        });
        self.enter_phase(Phase::Completed, out_events);
        Ok(report)
    }

    fn cancel_simulation(&mut self, out_events: &mut Vec<Event>) -> Result<(), EngineError> {
        self.require_phase(Phase::Simulating, Operation::CancelSimulation)?;
        debug!(loop_number = self.loop_number, "simulation pass cancelled");
        out_events.push(Event::SimulationCancelled {
            loop_number: self.loop_number,
        });
        self.enter_phase(Phase::Setup, out_events);
        Ok(())
    }

    fn advance_loop(&mut self, out_events: &mut Vec<Event>) -> Result<(), EngineError> {
        self.require_phase(Phase::Completed, Operation::AdvanceLoop)?;

        flow::clear_pass_energy(&mut self.grid);
        self.loop_number = self.loop_number.saturating_add(1);
        // Conduits stay on the grid and remain paid for.
        self.budget = self
            .config
            .starting_budget
            .saturating_sub(self.grid.placed_conduit_cost());

        out_events.push(Event::LoopAdvanced {
            loop_number: self.loop_number,
            budget: self.budget,
        });
        self.enter_phase(Phase::Setup, out_events);
        Ok(())
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the provided command to the world, mutating state deterministically.
///
/// Phase violations and malformed configurations are returned as errors and
/// leave the world untouched. Rejected placements and removals are expected
/// player input and are reported through `out_events` instead.
pub fn apply(
    world: &mut World,
    command: Command,
    out_events: &mut Vec<Event>,
) -> Result<(), EngineError> {
    match command {
        Command::Initialize { config } => {
            validate(&config)?;
            world.rebuild(config, out_events);
            Ok(())
        }
        Command::PlaceConduit { cell, kind } => world.place_conduit(cell, kind, out_events),
        Command::RemoveConduit { cell } => world.remove_conduit(cell, out_events),
        Command::BeginSimulation => world.begin_simulation(out_events),
        Command::CompleteSimulation => world.complete_simulation(out_events).map(|_| ()),
        Command::CancelSimulation => world.cancel_simulation(out_events),
        Command::AdvanceLoop => world.advance_loop(out_events),
        Command::Reset => {
            let config = world.config.clone();
            world.rebuild(config, out_events);
            Ok(())
        }
        Command::Tick { dt } => {
            out_events.push(Event::TimeAdvanced { dt });
            Ok(())
        }
    }
}

/// Runs a full simulation pass without a presentation delay.
///
/// Equivalent to applying [`Command::BeginSimulation`] followed by
/// [`Command::CompleteSimulation`].
pub fn run_simulation(
    world: &mut World,
    out_events: &mut Vec<Event>,
) -> Result<FlowReport, EngineError> {
    world.begin_simulation(out_events)?;
    world.complete_simulation(out_events)
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use chrono_weave_core::{
        Cell, CellCoord, EnergySource, EnergyTarget, FlowReport, Grid, GridConfig, Phase,
        TemporalEcho,
    };

    use super::World;

    /// Retrieves the welcome banner that adapters may display to players.
    #[must_use]
    pub fn welcome_banner(world: &World) -> &'static str {
        world.banner
    }

    /// Current phase of the loop state machine.
    #[must_use]
    pub fn phase(world: &World) -> Phase {
        world.phase
    }

    /// Number of the loop currently being played, starting at one.
    #[must_use]
    pub fn loop_number(world: &World) -> u32 {
        world.loop_number
    }

    /// Budget left for conduit placement in the current loop.
    #[must_use]
    pub fn budget(world: &World) -> u32 {
        world.budget
    }

    /// Configuration the grid was last built from.
    #[must_use]
    pub fn config(world: &World) -> &GridConfig {
        &world.config
    }

    /// Provides read-only access to the live grid.
    #[must_use]
    pub fn grid(world: &World) -> &Grid {
        &world.grid
    }

    /// Returns the cell at the provided coordinate.
    #[must_use]
    pub fn cell(world: &World, cell: CellCoord) -> Option<&Cell> {
        world.grid.cell(cell)
    }

    /// Enumerates the energy sources in configuration order.
    #[must_use]
    pub fn sources(world: &World) -> Vec<EnergySource> {
        world
            .config
            .sources
            .iter()
            .map(|source| EnergySource {
                cell: source.cell,
                output: source.output,
            })
            .collect()
    }

    /// Enumerates the energy targets in configuration order.
    #[must_use]
    pub fn targets(world: &World) -> Vec<EnergyTarget> {
        world
            .config
            .targets
            .iter()
            .map(|target| EnergyTarget {
                cell: target.cell,
                required_energy: target.required_energy,
            })
            .collect()
    }

    /// Echoes recorded for completed loops, oldest first.
    #[must_use]
    pub fn echoes(world: &World) -> &[TemporalEcho] {
        &world.echoes
    }

    /// Report of the most recent completed pass since the last reset.
    #[must_use]
    pub fn last_report(world: &World) -> Option<&FlowReport> {
        world.last_report.as_ref()
    }
}

fn validate(config: &GridConfig) -> Result<(), ConfigurationError> {
    if config.size == 0 {
        return Err(ConfigurationError::EmptyGrid);
    }
    if config.size > MAX_GRID_SIZE {
        return Err(ConfigurationError::GridTooLarge {
            size: config.size,
            max: MAX_GRID_SIZE,
        });
    }

    check_quantity("residue increment", config.residue_increment)?;
    check_quantity("energy cap", config.energy_cap)?;

    let mut claimed = BTreeSet::new();
    let positions = config
        .sources
        .iter()
        .map(|source| (source.cell, "source output", source.output))
        .chain(
            config
                .targets
                .iter()
                .map(|target| (target.cell, "required energy", target.required_energy)),
        );
    for (cell, field, value) in positions {
        if cell.column() >= config.size || cell.row() >= config.size {
            return Err(ConfigurationError::OutOfBounds {
                cell,
                size: config.size,
            });
        }
        if !claimed.insert(cell) {
            return Err(ConfigurationError::Overlap { cell });
        }
        check_quantity(field, value)?;
    }

    let mut listed = BTreeSet::new();
    for entry in config.catalog.iter() {
        if !listed.insert(entry.kind) {
            return Err(ConfigurationError::DuplicateConduit { kind: entry.kind });
        }
        check_quantity("efficiency multiplier", entry.efficiency_multiplier)?;
    }

    Ok(())
}

fn check_quantity(field: &'static str, value: f64) -> Result<(), ConfigurationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigurationError::InvalidQuantity { field, value })
    }
}

fn populate(config: &GridConfig) -> Grid {
    let mut grid = Grid::new(config.size);
    for source in &config.sources {
        if let Some(cell) = grid.cell_mut(source.cell) {
            *cell = Cell {
                kind: CellKind::Source {
                    output: source.output,
                },
                energy: source.output.min(config.energy_cap),
                temporal_residue: 0.0,
            };
        }
    }
    for target in &config.targets {
        if let Some(cell) = grid.cell_mut(target.cell) {
            *cell = Cell {
                kind: CellKind::Target {
                    required_energy: target.required_energy,
                },
                ..Cell::EMPTY
            };
        }
    }
    grid
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_lane() -> GridConfig {
        GridConfig::empty(8)
            .with_source(CellCoord::new(0, 1), 100.0)
            .with_target(CellCoord::new(7, 1), 80.0)
    }

    fn place(world: &mut World, cell: CellCoord, kind: ConduitKind) -> Vec<Event> {
        let mut events = Vec::new();
        apply(world, Command::PlaceConduit { cell, kind }, &mut events).expect("setup phase");
        events
    }

    #[test]
    fn standard_configuration_is_valid() {
        assert_eq!(validate(&GridConfig::standard()), Ok(()));
    }

    #[test]
    fn new_world_starts_in_setup_on_loop_one() {
        let world = World::new();
        assert_eq!(query::phase(&world), Phase::Setup);
        assert_eq!(query::loop_number(&world), 1);
        assert_eq!(query::budget(&world), 100);
        assert!(query::echoes(&world).is_empty());
        assert_eq!(query::sources(&world).len(), 3);
        assert_eq!(query::targets(&world).len(), 3);
    }

    #[test]
    fn initialize_rejects_out_of_bounds_positions() {
        let mut world = World::new();
        let mut events = Vec::new();
        let config = GridConfig::empty(4).with_source(CellCoord::new(4, 0), 10.0);

        let result = apply(&mut world, Command::Initialize { config }, &mut events);

        assert_eq!(
            result,
            Err(EngineError::InvalidConfiguration(
                ConfigurationError::OutOfBounds {
                    cell: CellCoord::new(4, 0),
                    size: 4,
                }
            ))
        );
        assert!(events.is_empty());
        assert_eq!(query::grid(&world).size(), 8);
    }

    #[test]
    fn initialize_rejects_overlapping_positions() {
        let config = GridConfig::empty(4)
            .with_source(CellCoord::new(1, 1), 10.0)
            .with_target(CellCoord::new(1, 1), 5.0);

        assert_eq!(
            World::with_config(config).err(),
            Some(EngineError::InvalidConfiguration(
                ConfigurationError::Overlap {
                    cell: CellCoord::new(1, 1)
                }
            ))
        );
    }

    #[test]
    fn initialize_rejects_negative_energy() {
        let config = GridConfig::empty(4).with_source(CellCoord::new(0, 0), -1.0);
        assert!(matches!(
            World::with_config(config),
            Err(EngineError::InvalidConfiguration(
                ConfigurationError::InvalidQuantity { .. }
            ))
        ));
    }

    #[test]
    fn initialize_rejects_empty_grid() {
        assert!(matches!(
            World::with_config(GridConfig::empty(0)),
            Err(EngineError::InvalidConfiguration(ConfigurationError::EmptyGrid))
        ));
    }

    #[test]
    fn initialize_rejects_oversized_grid() {
        let mut world = World::new();
        let mut events = Vec::new();
        let config = GridConfig::empty(4_000_000_000).with_source(CellCoord::new(0, 0), 1.0);

        let result = apply(&mut world, Command::Initialize { config }, &mut events);

        assert_eq!(
            result,
            Err(EngineError::InvalidConfiguration(
                ConfigurationError::GridTooLarge {
                    size: 4_000_000_000,
                    max: MAX_GRID_SIZE,
                }
            ))
        );
        assert!(events.is_empty());
        assert_eq!(query::grid(&world).size(), 8);
        assert!(World::with_config(GridConfig::empty(MAX_GRID_SIZE)).is_ok());
    }

    #[test]
    fn placement_charges_budget_and_keeps_residue() {
        let mut world = World::with_config(single_lane()).expect("valid config");
        let cell = CellCoord::new(3, 1);
        if let Some(state) = world.grid.cell_mut(cell) {
            state.temporal_residue = 0.4;
        }

        let events = place(&mut world, cell, ConduitKind::Quantum);

        assert_eq!(
            events,
            vec![Event::ConduitPlaced {
                cell,
                kind: ConduitKind::Quantum,
                replaced: None,
                budget: 75,
            }]
        );
        let state = query::cell(&world, cell).expect("in bounds");
        assert_eq!(state.conduit().map(|(kind, _)| kind), Some(ConduitKind::Quantum));
        assert_eq!(state.temporal_residue, 0.4);
        assert_eq!(state.energy, 0.0);
    }

    #[test]
    fn replacement_refunds_before_charging() {
        let mut world = World::with_config(single_lane()).expect("valid config");
        let cell = CellCoord::new(3, 1);
        let _ = place(&mut world, cell, ConduitKind::Quantum);
        let _ = place(&mut world, CellCoord::new(4, 1), ConduitKind::Quantum);
        assert_eq!(query::budget(&world), 50);

        // 50 left + 25 refunded covers a 50-cost temporal conduit.
        let events = place(&mut world, cell, ConduitKind::Temporal);

        assert_eq!(
            events,
            vec![Event::ConduitPlaced {
                cell,
                kind: ConduitKind::Temporal,
                replaced: Some(ConduitKind::Quantum),
                budget: 25,
            }]
        );
    }

    #[test]
    fn failed_replacement_keeps_previous_conduit() {
        let mut world = World::with_config(single_lane()).expect("valid config");
        let cell = CellCoord::new(3, 1);
        let _ = place(&mut world, cell, ConduitKind::Basic);
        let _ = place(&mut world, CellCoord::new(4, 1), ConduitKind::Temporal);
        let _ = place(&mut world, CellCoord::new(5, 1), ConduitKind::Quantum);
        assert_eq!(query::budget(&world), 15);

        let events = place(&mut world, cell, ConduitKind::Temporal);

        assert_eq!(
            events,
            vec![Event::ConduitPlacementRejected {
                cell,
                kind: ConduitKind::Temporal,
                reason: PlacementError::InsufficientBudget,
            }]
        );
        assert_eq!(query::budget(&world), 15);
        assert_eq!(
            query::cell(&world, cell).and_then(Cell::conduit).map(|(kind, _)| kind),
            Some(ConduitKind::Basic)
        );
    }

    #[test]
    fn placement_outside_grid_is_rejected() {
        let mut world = World::new();
        let events = place(&mut world, CellCoord::new(8, 0), ConduitKind::Basic);
        assert_eq!(
            events,
            vec![Event::ConduitPlacementRejected {
                cell: CellCoord::new(8, 0),
                kind: ConduitKind::Basic,
                reason: PlacementError::OutOfBounds,
            }]
        );
    }

    #[test]
    fn unknown_conduit_is_rejected() {
        let mut config = single_lane();
        config.catalog = chrono_weave_core::ConduitCatalog::new(Vec::new());
        let mut world = World::with_config(config).expect("valid config");

        let events = place(&mut world, CellCoord::new(2, 2), ConduitKind::Basic);

        assert_eq!(
            events,
            vec![Event::ConduitPlacementRejected {
                cell: CellCoord::new(2, 2),
                kind: ConduitKind::Basic,
                reason: PlacementError::UnknownConduit,
            }]
        );
    }

    #[test]
    fn removal_refunds_cost_and_keeps_residue() {
        let mut world = World::with_config(single_lane()).expect("valid config");
        let cell = CellCoord::new(2, 1);
        let _ = place(&mut world, cell, ConduitKind::Quantum);
        let mut events = Vec::new();
        let _ = run_simulation(&mut world, &mut events).expect("setup phase");
        apply(&mut world, Command::AdvanceLoop, &mut events).expect("completed phase");
        let _ = place(&mut world, cell, ConduitKind::Basic);
        events.clear();

        apply(&mut world, Command::RemoveConduit { cell }, &mut events).expect("setup phase");

        assert_eq!(
            events,
            vec![Event::ConduitRemoved {
                cell,
                kind: ConduitKind::Basic,
                budget: 100,
            }]
        );
        let state = query::cell(&world, cell).expect("in bounds");
        assert_eq!(state.kind, CellKind::Empty);
        assert!((state.temporal_residue - 0.1).abs() < 1e-12);
    }

    #[test]
    fn removing_empty_cell_is_rejected() {
        let mut world = World::new();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::RemoveConduit {
                cell: CellCoord::new(3, 3),
            },
            &mut events,
        )
        .expect("setup phase");
        assert_eq!(
            events,
            vec![Event::ConduitRemovalRejected {
                cell: CellCoord::new(3, 3),
                reason: RemovalError::MissingConduit,
            }]
        );
    }

    #[test]
    fn second_begin_is_rejected_while_simulating() {
        let mut world = World::new();
        let mut events = Vec::new();
        apply(&mut world, Command::BeginSimulation, &mut events).expect("setup phase");

        let result = apply(&mut world, Command::BeginSimulation, &mut events);

        assert_eq!(
            result,
            Err(EngineError::InvalidPhaseTransition {
                operation: Operation::BeginSimulation,
                phase: Phase::Simulating,
            })
        );
        assert_eq!(query::phase(&world), Phase::Simulating);
    }

    #[test]
    fn cancel_discards_the_pass() {
        let mut world = World::with_config(single_lane()).expect("valid config");
        let cell = CellCoord::new(3, 1);
        let _ = place(&mut world, cell, ConduitKind::Basic);
        let before = query::grid(&world).clone();
        let mut events = Vec::new();
        apply(&mut world, Command::BeginSimulation, &mut events).expect("setup phase");
        events.clear();

        apply(&mut world, Command::CancelSimulation, &mut events).expect("simulating phase");

        assert_eq!(
            events,
            vec![
                Event::SimulationCancelled { loop_number: 1 },
                Event::PhaseChanged {
                    phase: Phase::Setup
                },
            ]
        );
        assert_eq!(query::grid(&world), &before);
        assert!(query::echoes(&world).is_empty());
        assert!(query::last_report(&world).is_none());
    }

    #[test]
    fn complete_requires_simulating_phase() {
        let mut world = World::new();
        let mut events = Vec::new();
        assert_eq!(
            apply(&mut world, Command::CompleteSimulation, &mut events),
            Err(EngineError::InvalidPhaseTransition {
                operation: Operation::CompleteSimulation,
                phase: Phase::Setup,
            })
        );
        assert_eq!(
            apply(&mut world, Command::AdvanceLoop, &mut events),
            Err(EngineError::InvalidPhaseTransition {
                operation: Operation::AdvanceLoop,
                phase: Phase::Setup,
            })
        );
        assert!(events.is_empty());
    }

    #[test]
    fn advance_loop_keeps_conduits_and_their_cost() {
        let mut world = World::with_config(single_lane()).expect("valid config");
        let cell = CellCoord::new(3, 1);
        let _ = place(&mut world, cell, ConduitKind::Temporal);
        let mut events = Vec::new();
        let first = run_simulation(&mut world, &mut events).expect("setup phase");
        events.clear();

        apply(&mut world, Command::AdvanceLoop, &mut events).expect("completed phase");

        assert_eq!(
            events,
            vec![
                Event::LoopAdvanced {
                    loop_number: 2,
                    budget: 50,
                },
                Event::PhaseChanged {
                    phase: Phase::Setup
                },
            ]
        );
        let state = query::cell(&world, cell).expect("in bounds");
        assert_eq!(
            state.conduit().map(|(kind, _)| kind),
            Some(ConduitKind::Temporal)
        );
        assert_eq!(state.energy, 0.0);
        assert!((state.temporal_residue - 0.1).abs() < 1e-12);
        let target = query::cell(&world, CellCoord::new(7, 1)).expect("in bounds");
        assert_eq!(target.energy, 0.0);
        let source = query::cell(&world, CellCoord::new(0, 1)).expect("in bounds");
        assert_eq!(source.energy, 100.0);
        assert_eq!(query::echoes(&world).len(), 1);

        let second = run_simulation(&mut world, &mut events).expect("setup phase");
        assert_eq!(second.loop_number, 2);
        assert_eq!(second.score, first.score);
        assert_eq!(second.total_energy_delivered, first.total_energy_delivered);
    }

    #[test]
    fn reset_is_accepted_from_every_phase() {
        let mut world = World::with_config(single_lane()).expect("valid config");
        let mut events = Vec::new();
        apply(&mut world, Command::BeginSimulation, &mut events).expect("setup phase");
        events.clear();

        apply(&mut world, Command::Reset, &mut events).expect("reset always allowed");

        assert_eq!(
            events,
            vec![
                Event::GridInitialized {
                    size: 8,
                    budget: 100,
                },
                Event::PhaseChanged {
                    phase: Phase::Setup
                },
            ]
        );
        assert_eq!(query::phase(&world), Phase::Setup);
        assert_eq!(query::config(&world), &single_lane());
    }

    #[test]
    fn tick_reports_elapsed_time() {
        let mut world = World::new();
        let mut events = Vec::new();
        let dt = std::time::Duration::from_millis(16);
        apply(&mut world, Command::Tick { dt }, &mut events).expect("ticks always allowed");
        assert_eq!(events, vec![Event::TimeAdvanced { dt }]);
    }
}
