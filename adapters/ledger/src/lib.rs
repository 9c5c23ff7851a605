#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Local persistence for Chrono-Weave scores.
//!
//! The engine never touches storage. Adapters inject a [`KeyValueStore`] into
//! a [`LocalScoreBoard`], which then serves as both the score sink and the
//! leaderboard source.

mod scoreboard;
mod store;

pub use scoreboard::{LocalScoreBoard, ScoreRecord, SCORES_KEY};
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError};
