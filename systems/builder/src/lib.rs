#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure setup-phase system responsible for emitting conduit placement and removal commands.

use chrono_weave_core::{CellCoord, Command, ConduitKind, Event, Phase};

/// Input snapshot distilled from adapter-provided player actions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BuilderInput {
    /// Indicates whether the player confirmed a placement on the hovered cell.
    pub confirm_action: bool,
    /// Indicates whether the player requested removal of the hovered conduit.
    pub remove_action: bool,
    /// Cell currently selected by the player.
    pub cursor_cell: Option<CellCoord>,
    /// Conduit variant the player switched to, if any.
    pub select_kind: Option<ConduitKind>,
}

impl BuilderInput {
    /// Input that places the selected conduit on `cell`.
    #[must_use]
    pub const fn place(cell: CellCoord) -> Self {
        Self {
            confirm_action: true,
            remove_action: false,
            cursor_cell: Some(cell),
            select_kind: None,
        }
    }

    /// Input that removes the conduit on `cell`.
    #[must_use]
    pub const fn remove(cell: CellCoord) -> Self {
        Self {
            confirm_action: false,
            remove_action: true,
            cursor_cell: Some(cell),
            select_kind: None,
        }
    }

    /// Input that only switches the selected conduit variant.
    #[must_use]
    pub const fn select(kind: ConduitKind) -> Self {
        Self {
            confirm_action: false,
            remove_action: false,
            cursor_cell: None,
            select_kind: Some(kind),
        }
    }
}

/// Setup-phase system that translates player input into placement commands.
///
/// The system mirrors the engine phase from [`Event::PhaseChanged`] and stays
/// silent outside [`Phase::Setup`], so adapters never have to guard input.
#[derive(Debug, Clone)]
pub struct Builder {
    phase: Phase,
    selected: ConduitKind,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder {
    /// Creates a new builder system with the basic conduit selected.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            phase: Phase::Setup,
            selected: ConduitKind::Basic,
        }
    }

    /// Conduit variant that confirmations will place.
    #[must_use]
    pub const fn selected(&self) -> ConduitKind {
        self.selected
    }

    /// Consumes world events and adapter-derived input to emit builder commands.
    ///
    /// The `conduit_at` closure should report whether a conduit currently
    /// occupies the provided cell, mirroring the world's `query::cell` helper.
    pub fn handle<F>(
        &mut self,
        events: &[Event],
        input: BuilderInput,
        mut conduit_at: F,
        out: &mut Vec<Command>,
    ) where
        F: FnMut(CellCoord) -> bool,
    {
        for event in events {
            if let Event::PhaseChanged { phase } = event {
                self.phase = *phase;
            }
        }

        if let Some(kind) = input.select_kind {
            self.selected = kind;
        }

        if self.phase != Phase::Setup {
            return;
        }

        let Some(cell) = input.cursor_cell else {
            return;
        };

        if input.confirm_action {
            out.push(Command::PlaceConduit {
                cell,
                kind: self.selected,
            });
        }

        if input.remove_action && conduit_at(cell) {
            out.push(Command::RemoveConduit { cell });
        }
    }
}
