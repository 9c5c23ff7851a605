#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Score bookkeeping: once-per-loop submission and leaderboard ranking.

use std::cmp::Ordering;

use chrono_weave_core::{
    Event, FlowReport, LeaderboardEntry, PlayerId, ScoreSink, ScoreSubmission, SubmissionError,
    SubmissionReceipt,
};
use thiserror::Error;
use tracing::{info, warn};

/// Number of entries shown when a caller does not ask for a specific limit.
pub const DEFAULT_LEADERBOARD_LIMIT: usize = 100;

/// Reasons a submission attempt did not reach or was refused by the sink.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ScoringError {
    /// No loop has completed since the last reset or loop advance.
    #[error("no completed loop to submit")]
    NothingToSubmit,
    /// The current loop was already submitted.
    #[error("loop {loop_number} was already submitted")]
    AlreadySubmitted {
        /// Loop whose result was already recorded.
        loop_number: u32,
    },
    /// The sink rejected or failed to store the submission.
    #[error(transparent)]
    Sink(#[from] SubmissionError),
}

/// Pure system that remembers the latest completed loop and gates its submission.
#[derive(Debug, Default)]
pub struct Scoring {
    latest: Option<FlowReport>,
    submitted: bool,
}

impl Scoring {
    /// Creates a scoring system with nothing to submit.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Report of the most recent completed loop, if it is still current.
    #[must_use]
    pub fn latest(&self) -> Option<&FlowReport> {
        self.latest.as_ref()
    }

    /// Reports whether the current loop's result may still be submitted.
    #[must_use]
    pub fn can_submit(&self) -> bool {
        self.latest.is_some() && !self.submitted
    }

    /// Consumes world events to track the current loop's result.
    pub fn handle(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::SimulationCompleted { report } => {
                    self.latest = Some(report.clone());
                    self.submitted = false;
                }
                Event::LoopAdvanced { .. } | Event::GridInitialized { .. } => {
                    self.latest = None;
                    self.submitted = false;
                }
                _ => {}
            }
        }
    }

    /// Hands the current loop's result to `sink`.
    ///
    /// Failures are logged and returned but never touch engine state; a
    /// failed attempt may be retried, a successful one may not.
    pub fn submit<S>(
        &mut self,
        player: PlayerId,
        sink: &mut S,
    ) -> Result<SubmissionReceipt, ScoringError>
    where
        S: ScoreSink + ?Sized,
    {
        let report = self.latest.as_ref().ok_or(ScoringError::NothingToSubmit)?;
        if self.submitted {
            return Err(ScoringError::AlreadySubmitted {
                loop_number: report.loop_number,
            });
        }

        let submission = ScoreSubmission::from_report(report, player);
        match sink.submit(&submission) {
            Ok(receipt) => {
                info!(
                    player = %submission.player,
                    score = submission.score,
                    loop_number = submission.loop_number,
                    receipt = %receipt.receipt_id,
                    "score submitted"
                );
                self.submitted = true;
                Ok(receipt)
            }
            Err(error) => {
                warn!(player = %submission.player, %error, "score submission failed");
                Err(error.into())
            }
        }
    }
}

/// Orders leaderboard entries and assigns one-based ranks.
///
/// Entries are sorted by score (highest first), then efficiency (highest
/// first), then timestamp (earliest first), and truncated to `limit`.
#[must_use]
pub fn rank_entries(mut entries: Vec<LeaderboardEntry>, limit: usize) -> Vec<LeaderboardEntry> {
    entries.sort_by(compare_entries);
    entries.truncate(limit);
    for (position, entry) in entries.iter_mut().enumerate() {
        entry.rank = u32::try_from(position + 1).unwrap_or(u32::MAX);
    }
    entries
}

/// Rank of `player` among already ranked entries, compared case-insensitively.
#[must_use]
pub fn player_rank(entries: &[LeaderboardEntry], player: &PlayerId) -> Option<u32> {
    entries
        .iter()
        .find(|entry| entry.player.matches(player))
        .map(|entry| entry.rank)
}

fn compare_entries(left: &LeaderboardEntry, right: &LeaderboardEntry) -> Ordering {
    right
        .score
        .cmp(&left.score)
        .then_with(|| right.efficiency.total_cmp(&left.efficiency))
        .then_with(|| left.timestamp.cmp(&right.timestamp))
}
