#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Cooperative presentation delay between the start and completion of a simulation pass.

use std::time::Duration;

use chrono_weave_core::{Command, Event};
use tracing::debug;

/// Delay applied when no explicit configuration is provided.
pub const DEFAULT_SIMULATION_DELAY: Duration = Duration::from_millis(2_000);

/// Configuration parameters required to construct the pacing system.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    delay: Duration,
}

impl Config {
    /// Creates a new configuration using the provided presentation delay.
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_SIMULATION_DELAY)
    }
}

/// Pure system that completes a started pass once the delay has elapsed.
///
/// The system arms on [`Event::SimulationStarted`] and only counts
/// [`Event::TimeAdvanced`] durations observed after that point. Completion,
/// cancellation and re-initialization all disarm it.
#[derive(Debug)]
pub struct Pacing {
    delay: Duration,
    accumulator: Duration,
    armed: bool,
}

impl Pacing {
    /// Creates a new pacing system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            delay: config.delay,
            accumulator: Duration::ZERO,
            armed: false,
        }
    }

    /// Reports whether a started pass is waiting for its delay to elapse.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.armed
    }

    /// Time left before the pending pass completes.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.armed
            .then(|| self.delay.saturating_sub(self.accumulator))
    }

    /// Consumes world events and emits the completion command when due.
    pub fn handle(&mut self, events: &[Event], out: &mut Vec<Command>) {
        for event in events {
            match event {
                Event::SimulationStarted { loop_number } => {
                    debug!(loop_number = *loop_number, delay = ?self.delay, "pacing armed");
                    self.armed = true;
                    self.accumulator = Duration::ZERO;
                }
                Event::TimeAdvanced { dt } if self.armed => {
                    self.accumulator = self.accumulator.saturating_add(*dt);
                }
                Event::SimulationCompleted { .. }
                | Event::SimulationCancelled { .. }
                | Event::GridInitialized { .. } => self.disarm(),
                _ => {}
            }
        }

        if self.armed && self.accumulator >= self.delay {
            self.disarm();
            out.push(Command::CompleteSimulation);
        }
    }

    /// Abandons the pending pass, rolling the engine back to setup.
    ///
    /// Does nothing when no pass is pending.
    pub fn cancel(&mut self, out: &mut Vec<Command>) {
        if self.armed {
            self.disarm();
            out.push(Command::CancelSimulation);
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
        self.accumulator = Duration::ZERO;
    }
}
