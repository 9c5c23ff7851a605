use std::{
    env, fs,
    path::PathBuf,
    time::{SystemTime, UNIX_EPOCH},
};

use chrono::{TimeZone, Utc};
use chrono_weave_core::{
    LeaderboardError, LeaderboardSource, PlayerId, ScoreSink, ScoreSubmission, SubmissionError,
};
use chrono_weave_ledger::{
    FileStore, KeyValueStore, LocalScoreBoard, MemoryStore, StoreError, SCORES_KEY,
};

fn submission(player: &str, score: u64, loop_number: u32) -> ScoreSubmission {
    ScoreSubmission {
        score,
        efficiency: 100.0,
        loop_number,
        player: PlayerId::new(player),
    }
}

fn scratch_dir(label: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock after epoch")
        .as_nanos();
    env::temp_dir().join(format!(
        "chrono-weave-ledger-{label}-{}-{nanos}",
        std::process::id()
    ))
}

#[test]
fn leaderboard_ranks_recorded_scores() {
    let mut board = LocalScoreBoard::new(MemoryStore::new());
    let _ = board.submit(&submission("ada", 900, 1)).expect("stored");
    let _ = board.submit(&submission("grace", 1500, 2)).expect("stored");
    let _ = board.submit(&submission("linus", 300, 1)).expect("stored");

    let entries = board.leaderboard(100).expect("readable");

    let ranked: Vec<(u32, &str, u64)> = entries
        .iter()
        .map(|entry| (entry.rank, entry.player.as_str(), entry.score))
        .collect();
    assert_eq!(
        ranked,
        vec![(1, "grace", 1500), (2, "ada", 900), (3, "linus", 300)]
    );
    assert_eq!(entries[0].loop_count, 2);
}

#[test]
fn leaderboard_respects_limit() {
    let mut board = LocalScoreBoard::new(MemoryStore::new());
    for score in [10, 20, 30, 40] {
        let _ = board.submit(&submission("ada", score, 1)).expect("stored");
    }

    let entries = board.leaderboard(2).expect("readable");

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].score, 40);
}

#[test]
fn records_are_a_json_array_under_the_scores_key() {
    let mut board = LocalScoreBoard::new(MemoryStore::new());
    let recorded_at = Utc.with_ymd_and_hms(2025, 3, 14, 15, 9, 26).unwrap();

    let receipt = board
        .record_at(&submission("ada", 1000, 1), recorded_at)
        .expect("stored");

    let raw = board
        .store()
        .get(SCORES_KEY)
        .expect("readable")
        .expect("key written");
    let parsed: serde_json::Value = serde_json::from_str(&raw).expect("valid json");
    let records = parsed.as_array().expect("json array");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["score"], 1000);
    assert_eq!(records[0]["player"], "ada");
    assert_eq!(receipt.recorded_at, recorded_at);
    assert_eq!(receipt.receipt_id.len(), 64);
}

#[test]
fn unreadable_records_yield_empty_leaderboard_but_block_submission() {
    let mut store = MemoryStore::new();
    store.set(SCORES_KEY, "not json").expect("memory set");
    let mut board = LocalScoreBoard::new(store);

    assert_eq!(board.leaderboard(10), Ok(Vec::new()));
    assert!(matches!(
        board.submit(&submission("ada", 10, 1)),
        Err(SubmissionError::Unavailable(_))
    ));
    assert_eq!(
        board.store().get(SCORES_KEY).expect("readable"),
        Some("not json".to_owned()),
        "existing data must not be overwritten"
    );
}

#[test]
fn non_finite_efficiency_is_refused_and_ledger_stays_readable() {
    let mut board = LocalScoreBoard::new(MemoryStore::new());
    let _ = board.submit(&submission("ada", 500, 1)).expect("stored");

    for efficiency in [f64::INFINITY, f64::NAN] {
        let rejected = board.submit(&ScoreSubmission {
            efficiency,
            ..submission("bob", u64::MAX, 1)
        });
        assert!(matches!(rejected, Err(SubmissionError::Unavailable(_))));
    }

    assert_eq!(board.leaderboard(10).expect("readable").len(), 1);
    let _ = board.submit(&submission("cy", 300, 2)).expect("still writable");
    assert_eq!(board.leaderboard(10).expect("readable").len(), 2);
}

#[test]
fn clear_removes_all_records() {
    let mut board = LocalScoreBoard::new(MemoryStore::new());
    let _ = board.submit(&submission("ada", 10, 1)).expect("stored");

    board.clear().expect("cleared");

    assert_eq!(board.leaderboard(10), Ok(Vec::new()));
}

#[test]
fn file_store_persists_across_instances() {
    let root = scratch_dir("persist");
    {
        let store = FileStore::open(&root).expect("directory created");
        let mut board = LocalScoreBoard::new(store);
        let _ = board.submit(&submission("ada", 700, 3)).expect("stored");
    }

    let store = FileStore::open(&root).expect("directory reopened");
    let board = LocalScoreBoard::new(store);
    let entries = board.leaderboard(10).expect("readable");

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].score, 700);
    assert_eq!(entries[0].loop_count, 3);

    fs::remove_dir_all(&root).expect("cleanup");
}

#[test]
fn file_store_get_set_remove() {
    let root = scratch_dir("crud");
    let mut store = FileStore::open(&root).expect("directory created");

    assert_eq!(store.get("missing").expect("readable"), None);
    store.set("greeting", "hello").expect("written");
    assert_eq!(
        store.get("greeting").expect("readable"),
        Some("hello".to_owned())
    );
    store.remove("greeting").expect("removed");
    store.remove("greeting").expect("removing twice is fine");
    assert_eq!(store.get("greeting").expect("readable"), None);
    assert!(matches!(
        store.set("../escape", "x"),
        Err(StoreError::InvalidKey(_))
    ));

    fs::remove_dir_all(store.root()).expect("cleanup");
}

#[test]
fn leaderboard_error_is_reported_for_unreachable_store() {
    struct Broken;

    impl KeyValueStore for Broken {
        fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::InvalidKey(key.to_owned()))
        }

        fn set(&mut self, key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::InvalidKey(key.to_owned()))
        }

        fn remove(&mut self, key: &str) -> Result<(), StoreError> {
            Err(StoreError::InvalidKey(key.to_owned()))
        }
    }

    let board = LocalScoreBoard::new(Broken);

    assert!(matches!(
        board.leaderboard(10),
        Err(LeaderboardError::Unavailable(_))
    ));
}
