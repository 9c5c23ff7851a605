#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Chrono-Weave engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative temporal grid, and pure systems. Adapters submit [`Command`]
//! values describing desired mutations, the world executes those commands via
//! its `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. Systems consume event streams, query immutable
//! snapshots, and respond exclusively with new command batches.
//!
//! The two collaborators that live outside the engine, the score sink and the
//! leaderboard source, are described by the [`ScoreSink`] and
//! [`LeaderboardSource`] traits.

use std::{fmt, time::Duration};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to Chrono-Weave: Temporal Architect.";

/// Identifier under which scores for this game are recorded.
pub const GAME_ID: &str = "chrono-weave-temporal-architect";

/// Side length of the standard square grid.
pub const DEFAULT_GRID_SIZE: u32 = 8;

/// Largest side length accepted when building a grid.
pub const MAX_GRID_SIZE: u32 = 1024;

/// Energy budget granted at the start of every loop.
pub const DEFAULT_STARTING_BUDGET: u32 = 100;

/// Residue added to every conduit cell per simulation pass.
pub const DEFAULT_RESIDUE_INCREMENT: f64 = 0.1;

/// Upper bound on the energy stored in a single cell.
pub const DEFAULT_ENERGY_CAP: f64 = 100.0;

/// Energy emitted by each source on the standard board.
pub const DEFAULT_SOURCE_OUTPUT: f64 = 100.0;

/// Energy each target on the standard board requires to count as reached.
pub const DEFAULT_TARGET_REQUIREMENT: f64 = 80.0;

/// Phase of the temporal loop state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Conduits may be placed and a simulation pass may be started.
    Setup,
    /// A simulation pass is in flight and awaiting completion.
    Simulating,
    /// The pass finished; the loop can be advanced or the game reset.
    Completed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Setup => "setup",
            Self::Simulating => "simulating",
            Self::Completed => "completed",
        };
        f.write_str(label)
    }
}

/// Engine operations that are restricted to particular phases.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Placing a conduit onto the grid.
    PlaceConduit,
    /// Removing a previously placed conduit.
    RemoveConduit,
    /// Starting a simulation pass.
    BeginSimulation,
    /// Completing the in-flight simulation pass.
    CompleteSimulation,
    /// Cancelling the in-flight simulation pass.
    CancelSimulation,
    /// Advancing to the next temporal loop.
    AdvanceLoop,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::PlaceConduit => "place conduit",
            Self::RemoveConduit => "remove conduit",
            Self::BeginSimulation => "begin simulation",
            Self::CompleteSimulation => "complete simulation",
            Self::CancelSimulation => "cancel simulation",
            Self::AdvanceLoop => "advance loop",
        };
        f.write_str(label)
    }
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Rebuilds the grid from the provided configuration.
    Initialize {
        /// Layout, budget and catalog the new grid is built from.
        config: GridConfig,
    },
    /// Requests placement of a conduit at the provided cell.
    PlaceConduit {
        /// Cell that should host the conduit.
        cell: CellCoord,
        /// Variant of conduit to place.
        kind: ConduitKind,
    },
    /// Requests removal of the conduit occupying the provided cell.
    RemoveConduit {
        /// Cell hosting the conduit to remove.
        cell: CellCoord,
    },
    /// Starts a simulation pass, moving the engine into [`Phase::Simulating`].
    BeginSimulation,
    /// Finishes the in-flight simulation pass and publishes its report.
    CompleteSimulation,
    /// Abandons the in-flight simulation pass without touching the grid.
    CancelSimulation,
    /// Moves a completed loop on to the next one.
    AdvanceLoop,
    /// Re-initializes the grid with the most recent configuration.
    Reset,
    /// Advances the presentation clock by the provided delta time.
    Tick {
        /// Duration of wall time that elapsed since the previous tick.
        dt: Duration,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the presentation clock advanced.
    TimeAdvanced {
        /// Duration of time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that a fresh grid was built.
    GridInitialized {
        /// Side length of the new grid.
        size: u32,
        /// Budget available for the first loop.
        budget: u32,
    },
    /// Announces that the engine entered a new phase.
    PhaseChanged {
        /// Phase that became active after processing the command.
        phase: Phase,
    },
    /// Confirms that a conduit was placed.
    ConduitPlaced {
        /// Cell now hosting the conduit.
        cell: CellCoord,
        /// Variant that was placed.
        kind: ConduitKind,
        /// Variant that previously occupied the cell, if any.
        replaced: Option<ConduitKind>,
        /// Budget left after the placement.
        budget: u32,
    },
    /// Reports that a placement request was rejected.
    ConduitPlacementRejected {
        /// Cell provided in the request.
        cell: CellCoord,
        /// Variant requested for placement.
        kind: ConduitKind,
        /// Specific reason the placement failed.
        reason: PlacementError,
    },
    /// Confirms that a conduit was removed and its cost refunded.
    ConduitRemoved {
        /// Cell that hosted the conduit.
        cell: CellCoord,
        /// Variant that was removed.
        kind: ConduitKind,
        /// Budget available after the refund.
        budget: u32,
    },
    /// Reports that a removal request was rejected.
    ConduitRemovalRejected {
        /// Cell provided in the request.
        cell: CellCoord,
        /// Specific reason the removal failed.
        reason: RemovalError,
    },
    /// Confirms that a simulation pass started.
    SimulationStarted {
        /// Loop the pass belongs to.
        loop_number: u32,
    },
    /// Publishes the outcome of a finished simulation pass.
    SimulationCompleted {
        /// Scores and routing details for the pass.
        report: FlowReport,
    },
    /// Confirms that the in-flight pass was abandoned.
    SimulationCancelled {
        /// Loop the abandoned pass belonged to.
        loop_number: u32,
    },
    /// Confirms that the engine moved on to a new loop.
    LoopAdvanced {
        /// Number of the loop that just began.
        loop_number: u32,
        /// Budget available for the new loop.
        budget: u32,
    },
}

/// Cardinal directions used to enumerate grid neighbours.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Movement toward decreasing row indices.
    North,
    /// Movement toward increasing column indices.
    East,
    /// Movement toward increasing row indices.
    South,
    /// Movement toward decreasing column indices.
    West,
}

impl Direction {
    /// Order in which routing explores neighbours: left, right, up, down.
    pub const ROUTING_ORDER: [Direction; 4] = [
        Direction::West,
        Direction::East,
        Direction::North,
        Direction::South,
    ];
}

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Returns the adjacent cell in `direction` if it lies inside a square grid of `size`.
    #[must_use]
    pub fn step(self, direction: Direction, size: u32) -> Option<CellCoord> {
        let (column, row) = match direction {
            Direction::North => (Some(self.column), self.row.checked_sub(1)),
            Direction::East => (self.column.checked_add(1), Some(self.row)),
            Direction::South => (Some(self.column), self.row.checked_add(1)),
            Direction::West => (self.column.checked_sub(1), Some(self.row)),
        };
        let (column, row) = (column?, row?);
        (column < size && row < size).then(|| CellCoord::new(column, row))
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.column, self.row)
    }
}

/// Variants of conduits that can be placed on the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConduitKind {
    /// Cheap conduit that passes energy through unchanged.
    Basic,
    /// Mid-tier conduit that amplifies energy by half.
    Quantum,
    /// Expensive conduit that doubles energy.
    Temporal,
}

impl ConduitKind {
    /// Every conduit variant in catalog order.
    pub const ALL: [ConduitKind; 3] = [Self::Basic, Self::Quantum, Self::Temporal];

    /// Lower-case label used by adapters.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Quantum => "quantum",
            Self::Temporal => "temporal",
        }
    }

    /// Parses a case-insensitive label produced by [`ConduitKind::label`].
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.label().eq_ignore_ascii_case(label.trim()))
    }
}

/// Static properties of a conduit variant.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConduitSpec {
    /// Budget consumed when the conduit is placed.
    pub cost: u32,
    /// Factor applied to energy routed through the conduit.
    pub efficiency_multiplier: f64,
    /// Reach of the conduit measured in cells.
    pub range: u32,
}

impl ConduitSpec {
    /// Creates a new conduit specification.
    #[must_use]
    pub const fn new(cost: u32, efficiency_multiplier: f64, range: u32) -> Self {
        Self {
            cost,
            efficiency_multiplier,
            range,
        }
    }
}

/// Catalog entry associating a conduit variant with its specification.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Variant described by the entry.
    pub kind: ConduitKind,
    /// Budget consumed when the conduit is placed.
    pub cost: u32,
    /// Factor applied to energy routed through the conduit.
    pub efficiency_multiplier: f64,
    /// Reach of the conduit measured in cells.
    pub range: u32,
}

impl CatalogEntry {
    /// Creates a catalog entry for `kind` with the provided specification.
    #[must_use]
    pub const fn new(kind: ConduitKind, spec: ConduitSpec) -> Self {
        Self {
            kind,
            cost: spec.cost,
            efficiency_multiplier: spec.efficiency_multiplier,
            range: spec.range,
        }
    }

    /// Specification described by the entry.
    #[must_use]
    pub const fn spec(&self) -> ConduitSpec {
        ConduitSpec::new(self.cost, self.efficiency_multiplier, self.range)
    }
}

/// Immutable lookup table from conduit variant to specification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConduitCatalog {
    entries: Vec<CatalogEntry>,
}

impl ConduitCatalog {
    /// Creates a catalog from explicit entries.
    #[must_use]
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    /// Catalog used by the standard game: Basic, Quantum and Temporal conduits.
    #[must_use]
    pub fn standard() -> Self {
        Self::new(vec![
            CatalogEntry::new(ConduitKind::Basic, ConduitSpec::new(10, 1.0, 1)),
            CatalogEntry::new(ConduitKind::Quantum, ConduitSpec::new(25, 1.5, 1)),
            CatalogEntry::new(ConduitKind::Temporal, ConduitSpec::new(50, 2.0, 1)),
        ])
    }

    /// Looks up the specification registered for `kind`.
    #[must_use]
    pub fn spec(&self, kind: ConduitKind) -> Option<ConduitSpec> {
        self.entries
            .iter()
            .find(|entry| entry.kind == kind)
            .map(CatalogEntry::spec)
    }

    /// Iterator over the catalog entries in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.iter()
    }
}

impl Default for ConduitCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

/// Position and output of an energy source requested at initialization.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceSpec {
    /// Cell occupied by the source.
    pub cell: CellCoord,
    /// Energy the source emits on every pass.
    pub output: f64,
}

/// Position and threshold of an energy target requested at initialization.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TargetSpec {
    /// Cell occupied by the target.
    pub cell: CellCoord,
    /// Energy the target needs to count as reached.
    pub required_energy: f64,
}

/// Complete configuration accepted by the engine when building a grid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    /// Side length of the square grid.
    pub size: u32,
    /// Energy sources placed on the grid.
    pub sources: Vec<SourceSpec>,
    /// Energy targets placed on the grid.
    pub targets: Vec<TargetSpec>,
    /// Budget restored at the start of every loop.
    #[serde(default = "default_starting_budget")]
    pub starting_budget: u32,
    /// Residue added to each conduit cell per simulation pass.
    #[serde(default = "default_residue_increment")]
    pub residue_increment: f64,
    /// Upper bound on the energy held by a single cell.
    #[serde(default = "default_energy_cap")]
    pub energy_cap: f64,
    /// Conduit variants available for placement.
    #[serde(default)]
    pub catalog: ConduitCatalog,
}

impl GridConfig {
    /// The standard 8x8 board: sources down the left edge, targets down the right.
    ///
    /// Sources and targets sit on every other row starting at row one, so an
    /// 8x8 grid carries three of each.
    #[must_use]
    pub fn standard() -> Self {
        let size = DEFAULT_GRID_SIZE;
        let rows = (1..size.saturating_sub(1)).step_by(2);
        let sources = rows
            .clone()
            .map(|row| SourceSpec {
                cell: CellCoord::new(0, row),
                output: DEFAULT_SOURCE_OUTPUT,
            })
            .collect();
        let targets = rows
            .map(|row| TargetSpec {
                cell: CellCoord::new(size - 1, row),
                required_energy: DEFAULT_TARGET_REQUIREMENT,
            })
            .collect();

        Self {
            size,
            sources,
            targets,
            starting_budget: DEFAULT_STARTING_BUDGET,
            residue_increment: DEFAULT_RESIDUE_INCREMENT,
            energy_cap: DEFAULT_ENERGY_CAP,
            catalog: ConduitCatalog::standard(),
        }
    }

    /// An empty grid of the provided size using the standard budget and catalog.
    #[must_use]
    pub fn empty(size: u32) -> Self {
        Self {
            size,
            sources: Vec::new(),
            targets: Vec::new(),
            ..Self::standard()
        }
    }

    /// Adds a source to the configuration.
    #[must_use]
    pub fn with_source(mut self, cell: CellCoord, output: f64) -> Self {
        self.sources.push(SourceSpec { cell, output });
        self
    }

    /// Adds a target to the configuration.
    #[must_use]
    pub fn with_target(mut self, cell: CellCoord, required_energy: f64) -> Self {
        self.targets.push(TargetSpec {
            cell,
            required_energy,
        });
        self
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self::standard()
    }
}

fn default_starting_budget() -> u32 {
    DEFAULT_STARTING_BUDGET
}

fn default_residue_increment() -> f64 {
    DEFAULT_RESIDUE_INCREMENT
}

fn default_energy_cap() -> f64 {
    DEFAULT_ENERGY_CAP
}

/// What occupies a grid cell. Each variant carries only the data valid for it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum CellKind {
    /// Nothing placed; energy may still pass through.
    Empty,
    /// Energy source emitting `output` per pass.
    Source {
        /// Energy emitted on every pass.
        output: f64,
    },
    /// Energy target that counts as reached at `required_energy`.
    Target {
        /// Threshold for counting the target as reached.
        required_energy: f64,
    },
    /// Player-placed conduit.
    Conduit {
        /// Variant of the conduit.
        kind: ConduitKind,
        /// Catalog properties captured when the conduit was placed.
        spec: ConduitSpec,
    },
}

/// One grid position.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// What occupies the cell.
    pub kind: CellKind,
    /// Energy currently held by the cell.
    pub energy: f64,
    /// Residue accumulated across loops; cleared only by a full reset.
    pub temporal_residue: f64,
}

impl Cell {
    /// An empty cell without energy or residue.
    pub const EMPTY: Cell = Cell {
        kind: CellKind::Empty,
        energy: 0.0,
        temporal_residue: 0.0,
    };

    /// Reports whether the cell hosts an energy source.
    #[must_use]
    pub const fn is_source(&self) -> bool {
        matches!(self.kind, CellKind::Source { .. })
    }

    /// Reports whether the cell hosts an energy target.
    #[must_use]
    pub const fn is_target(&self) -> bool {
        matches!(self.kind, CellKind::Target { .. })
    }

    /// Returns the conduit occupying the cell, if any.
    #[must_use]
    pub const fn conduit(&self) -> Option<(ConduitKind, ConduitSpec)> {
        match self.kind {
            CellKind::Conduit { kind, spec } => Some((kind, spec)),
            _ => None,
        }
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Dense square matrix of cells stored in row-major order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    size: u32,
    cells: Vec<Cell>,
}

impl Grid {
    /// Creates a grid of empty cells.
    #[must_use]
    pub fn new(size: u32) -> Self {
        let side = usize::try_from(size).unwrap_or(0);
        Self {
            size,
            cells: vec![Cell::EMPTY; side.saturating_mul(side)],
        }
    }

    /// Side length of the grid.
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Reports whether the coordinate lies inside the grid.
    #[must_use]
    pub const fn contains(&self, cell: CellCoord) -> bool {
        cell.column() < self.size && cell.row() < self.size
    }

    /// Returns the cell at the provided coordinate.
    #[must_use]
    pub fn cell(&self, cell: CellCoord) -> Option<&Cell> {
        self.index(cell).and_then(|index| self.cells.get(index))
    }

    /// Returns mutable access to the cell at the provided coordinate.
    #[must_use]
    pub fn cell_mut(&mut self, cell: CellCoord) -> Option<&mut Cell> {
        self.index(cell).and_then(|index| self.cells.get_mut(index))
    }

    /// Iterator over every cell with its coordinate, row by row.
    pub fn iter(&self) -> impl Iterator<Item = (CellCoord, &Cell)> {
        let size = self.size.max(1);
        self.cells.iter().enumerate().map(move |(index, cell)| {
            let index = u32::try_from(index).unwrap_or(u32::MAX);
            (CellCoord::new(index % size, index / size), cell)
        })
    }

    /// Mutable iterator over every cell.
    pub fn cells_mut(&mut self) -> impl Iterator<Item = &mut Cell> {
        self.cells.iter_mut()
    }

    /// Total budget cost of the conduits currently placed on the grid.
    #[must_use]
    pub fn placed_conduit_cost(&self) -> u32 {
        self.cells
            .iter()
            .filter_map(Cell::conduit)
            .map(|(_, spec)| spec.cost)
            .fold(0, u32::saturating_add)
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if !self.contains(cell) {
            return None;
        }
        let row = usize::try_from(cell.row()).ok()?;
        let column = usize::try_from(cell.column()).ok()?;
        let width = usize::try_from(self.size).ok()?;
        row.checked_mul(width)?.checked_add(column)
    }
}

/// Read-only view of a source derived from the grid configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnergySource {
    /// Cell occupied by the source.
    pub cell: CellCoord,
    /// Energy emitted per pass.
    pub output: f64,
}

/// Read-only view of a target derived from the grid configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnergyTarget {
    /// Cell occupied by the target.
    pub cell: CellCoord,
    /// Threshold for counting the target as reached.
    pub required_energy: f64,
}

/// Routing outcome for a single source during a pass.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteOutcome {
    /// Source the route starts from.
    pub source: CellCoord,
    /// Target the route reached, or `None` when no path exists.
    pub target: Option<CellCoord>,
    /// Number of steps between the source and the target.
    pub hops: u32,
    /// Energy that arrived at the target.
    pub delivered: f64,
}

/// Scores and routing details produced by a completed simulation pass.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlowReport {
    /// Loop the pass belongs to.
    pub loop_number: u32,
    /// `floor(total_energy_delivered * 10)`.
    pub score: u64,
    /// Delivered energy as a percentage of conduit cost; zero without conduits.
    pub efficiency: f64,
    /// Energy that reached targets across all sources.
    pub total_energy_delivered: f64,
    /// Cost of the conduits that energy was routed through.
    pub total_energy_used: u32,
    /// Targets whose accumulated energy met their requirement.
    pub targets_reached: u32,
    /// Per-source routing details in source order.
    pub routes: Vec<RouteOutcome>,
}

/// Immutable record of a completed loop.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TemporalEcho {
    /// Loop that produced the record.
    pub loop_number: u32,
    /// Score of the loop.
    pub score: u64,
    /// Efficiency of the loop.
    pub efficiency: f64,
    /// Independent copy of the grid after the pass.
    pub grid: Grid,
}

/// Reasons a conduit placement request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlacementError {
    /// The requested cell lies outside the grid.
    OutOfBounds,
    /// The requested cell hosts a source or a target.
    ProtectedCell,
    /// The conduit variant is missing from the configured catalog.
    UnknownConduit,
    /// The remaining budget cannot cover the conduit's cost.
    InsufficientBudget,
}

/// Reasons a conduit removal request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RemovalError {
    /// The requested cell lies outside the grid.
    OutOfBounds,
    /// No conduit occupies the requested cell.
    MissingConduit,
}

/// Problems detected while validating a [`GridConfig`].
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigurationError {
    /// The grid has no cells.
    #[error("grid size must be at least one cell")]
    EmptyGrid,
    /// The grid side exceeds [`MAX_GRID_SIZE`].
    #[error("grid size {size} exceeds the maximum of {max}")]
    GridTooLarge {
        /// Requested side length.
        size: u32,
        /// Largest accepted side length.
        max: u32,
    },
    /// A source or target lies outside the grid.
    #[error("cell {cell} lies outside the {size}x{size} grid")]
    OutOfBounds {
        /// Offending coordinate.
        cell: CellCoord,
        /// Side length of the configured grid.
        size: u32,
    },
    /// Two sources or targets share a cell.
    #[error("cell {cell} is claimed more than once")]
    Overlap {
        /// Coordinate claimed twice.
        cell: CellCoord,
    },
    /// An energy-like quantity is negative or not finite.
    #[error("{field} must be a finite, non-negative number (got {value})")]
    InvalidQuantity {
        /// Name of the offending field.
        field: &'static str,
        /// Value that failed validation.
        value: f64,
    },
    /// A conduit variant appears twice in the catalog.
    #[error("conduit {kind:?} is listed more than once in the catalog")]
    DuplicateConduit {
        /// Variant listed twice.
        kind: ConduitKind,
    },
}

/// Failures surfaced by the engine's `apply` entry point.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum EngineError {
    /// The configuration passed to initialization was malformed.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigurationError),
    /// The operation is not permitted in the current phase.
    #[error("cannot {operation} while the engine is in the {phase} phase")]
    InvalidPhaseTransition {
        /// Operation that was attempted.
        operation: Operation,
        /// Phase the engine was in.
        phase: Phase,
    },
}

/// Identifier of a player, typically a wallet address.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    /// Wraps the provided identifier.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrows the identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive comparison, matching how wallet addresses are compared.
    #[must_use]
    pub fn matches(&self, other: &PlayerId) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of a completed loop handed to a [`ScoreSink`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreSubmission {
    /// Score of the loop.
    pub score: u64,
    /// Efficiency of the loop.
    pub efficiency: f64,
    /// Loop that produced the score.
    pub loop_number: u32,
    /// Player the score belongs to.
    pub player: PlayerId,
}

impl ScoreSubmission {
    /// Builds a submission from a finished pass.
    #[must_use]
    pub fn from_report(report: &FlowReport, player: PlayerId) -> Self {
        Self {
            score: report.score,
            efficiency: report.efficiency,
            loop_number: report.loop_number,
            player,
        }
    }
}

/// Acknowledgement returned by a [`ScoreSink`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    /// Identifier of the stored record.
    pub receipt_id: String,
    /// Moment the record was accepted.
    pub recorded_at: DateTime<Utc>,
}

/// Failures reported by a [`ScoreSink`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SubmissionError {
    /// The sink refused the player, e.g. because they are not registered.
    #[error("player {0} is not allowed to submit scores")]
    Unauthorized(PlayerId),
    /// The sink could not be reached or failed to store the record.
    #[error("score sink unavailable: {0}")]
    Unavailable(String),
}

/// Entry of a ranked leaderboard.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// One-based position on the leaderboard.
    pub rank: u32,
    /// Name shown for the player.
    pub display_name: String,
    /// Identifier of the player.
    pub player: PlayerId,
    /// Best recorded score.
    pub score: u64,
    /// Efficiency of the recorded loop.
    pub efficiency: f64,
    /// Loops the player had played when the score was recorded.
    pub loop_count: u32,
    /// Moment the score was recorded.
    pub timestamp: DateTime<Utc>,
}

/// Failures reported by a [`LeaderboardSource`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LeaderboardError {
    /// The backing store could not be read.
    #[error("leaderboard unavailable: {0}")]
    Unavailable(String),
}

/// Destination for finished loop results.
pub trait ScoreSink {
    /// Attempts to persist the submission.
    fn submit(&mut self, submission: &ScoreSubmission) -> Result<SubmissionReceipt, SubmissionError>;
}

/// Read-only provider of ranked leaderboard entries.
pub trait LeaderboardSource {
    /// Returns at most `limit` entries ordered by rank.
    fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, LeaderboardError>;
}
