//! Score board persisted as a JSON array inside a [`KeyValueStore`].

use chrono::{DateTime, Utc};
use chrono_weave_core::{
    LeaderboardEntry, LeaderboardError, LeaderboardSource, PlayerId, ScoreSink, ScoreSubmission,
    SubmissionError, SubmissionReceipt, GAME_ID,
};
use chrono_weave_system_scoring::rank_entries;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::store::{KeyValueStore, StoreError};

/// Key under which the score records are stored.
pub const SCORES_KEY: &str = "chrono_weave_scores";

const SHORT_ID_THRESHOLD: usize = 10;

/// One persisted submission.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    /// Digest identifying the record.
    pub receipt_id: String,
    /// Player that submitted the score.
    pub player: PlayerId,
    /// Score of the submitted loop.
    pub score: u64,
    /// Efficiency of the submitted loop.
    pub efficiency: f64,
    /// Loop that produced the score.
    pub loop_number: u32,
    /// Moment the record was stored.
    pub recorded_at: DateTime<Utc>,
}

/// Local score sink and leaderboard source on top of a key/value store.
#[derive(Debug)]
pub struct LocalScoreBoard<S> {
    store: S,
}

impl<S: KeyValueStore> LocalScoreBoard<S> {
    /// Wraps the provided store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Borrows the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Reads every stored record in submission order.
    pub fn records(&self) -> Result<Vec<ScoreRecord>, StoreError> {
        let Some(contents) = self.store.get(SCORES_KEY)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str(&contents) {
            Ok(records) => Ok(records),
            Err(error) => {
                warn!(%error, key = SCORES_KEY, "ignoring unreadable score records");
                Ok(Vec::new())
            }
        }
    }

    /// Deletes every stored record.
    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.store.remove(SCORES_KEY)
    }

    /// Records `submission` at the provided moment.
    pub fn record_at(
        &mut self,
        submission: &ScoreSubmission,
        recorded_at: DateTime<Utc>,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        // JSON has no encoding for infinities or NaN.
        if !submission.efficiency.is_finite() {
            return Err(SubmissionError::Unavailable(format!(
                "efficiency {} cannot be recorded",
                submission.efficiency
            )));
        }
        let contents = self.store.get(SCORES_KEY).map_err(unavailable)?;
        let mut records: Vec<ScoreRecord> = match contents {
            Some(contents) => serde_json::from_str(&contents).map_err(unavailable)?,
            None => Vec::new(),
        };

        let receipt_id = receipt_id(submission, recorded_at, records.len());
        records.push(ScoreRecord {
            receipt_id: receipt_id.clone(),
            player: submission.player.clone(),
            score: submission.score,
            efficiency: submission.efficiency,
            loop_number: submission.loop_number,
            recorded_at,
        });

        let encoded = serde_json::to_string(&records).map_err(unavailable)?;
        self.store.set(SCORES_KEY, &encoded).map_err(unavailable)?;
        debug!(receipt = %receipt_id, records = records.len(), "score recorded");

        Ok(SubmissionReceipt {
            receipt_id,
            recorded_at,
        })
    }
}

impl<S: KeyValueStore> ScoreSink for LocalScoreBoard<S> {
    fn submit(
        &mut self,
        submission: &ScoreSubmission,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        self.record_at(submission, Utc::now())
    }
}

impl<S: KeyValueStore> LeaderboardSource for LocalScoreBoard<S> {
    fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, LeaderboardError> {
        let records = self
            .records()
            .map_err(|error| LeaderboardError::Unavailable(error.to_string()))?;
        let entries = records
            .into_iter()
            .map(|record| LeaderboardEntry {
                rank: 0,
                display_name: display_name(&record.player),
                player: record.player,
                score: record.score,
                efficiency: record.efficiency,
                loop_count: record.loop_number,
                timestamp: record.recorded_at,
            })
            .collect();
        Ok(rank_entries(entries, limit))
    }
}

/// Shortens long identifiers such as wallet addresses to `0x1234...abcd`.
fn display_name(player: &PlayerId) -> String {
    let id = player.as_str();
    if id.len() <= SHORT_ID_THRESHOLD || !id.is_ascii() {
        return id.to_owned();
    }
    format!("{}...{}", &id[..6], &id[id.len() - 4..])
}

fn receipt_id(submission: &ScoreSubmission, recorded_at: DateTime<Utc>, sequence: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(GAME_ID.as_bytes());
    hasher.update(submission.player.as_str().as_bytes());
    hasher.update(submission.score.to_le_bytes());
    hasher.update(submission.efficiency.to_le_bytes());
    hasher.update(submission.loop_number.to_le_bytes());
    hasher.update(recorded_at.timestamp_millis().to_le_bytes());
    hasher.update((sequence as u64).to_le_bytes());
    format!("{:x}", hasher.finalize())
}

fn unavailable(error: impl std::fmt::Display) -> SubmissionError {
    SubmissionError::Unavailable(error.to_string())
}
