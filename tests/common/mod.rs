use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use eval_worker::{AnalysisEngine, EngineError, EngineScore};
use pgn_tables::clean::{clean_metadata, clean_moves, MetadataCleanOptions};
use pgn_tables::extract::extract_tables;
use pgn_tables::{CleanMetadataTable, CleanMoveTable, GameDecoder};

/// Game 1 has four annotated plies, game 2 has two bare ones.
pub const TWO_GAMES: &str = r#"[Event "Rated Blitz"]
[Date "2024.03.01"]
[White "alice"]
[Black "bob"]
[WhiteElo "1500"]
[BlackElo "1480"]
[Result "1-0"]

1. e4 {[%clk 0:05:00][%eval 0.25]} 1... e5 {[%clk 0:04:58]} 2. Nf3 {[%clk 0:04:55][%eval #4]} 2... Nc6 {[%clk 0:04:50]} 1-0

[Event "Rated Blitz"]
[Date "2024.03.02"]
[White "carol"]
[Black "dave"]
[WhiteElo "1610"]
[Result "½-½"]

1. d4 d5 1/2-1/2
"#;

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 3, 12, 0, 0).unwrap()
}

/// Decode, extract and clean `pgn`.
pub fn clean_tables(pgn: &str) -> (CleanMetadataTable, CleanMoveTable) {
    let (metadata, moves) = extract_tables(GameDecoder::new(pgn.as_bytes()), "test.pgn", fixed_now);
    let metadata = clean_metadata(&metadata, &MetadataCleanOptions::default()).unwrap();
    let moves = clean_moves(&moves).unwrap();
    (metadata, moves)
}

/// How the fake engine answers a given query (1-based).
#[derive(Debug, Clone, Copy)]
pub enum Failure {
    NoScore,
    Crash,
}

/// Scripted engine: answers every query with `score` unless told to fail,
/// and records the positions it sees.
pub struct FakeEngine {
    pub score: EngineScore,
    pub fail_at: Option<(usize, Failure)>,
    pub seen: Vec<String>,
    quit: Arc<AtomicBool>,
}

impl FakeEngine {
    pub fn new(score: EngineScore) -> Self {
        Self {
            score,
            fail_at: None,
            seen: Vec::new(),
            quit: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn failing_at(mut self, query: usize, failure: Failure) -> Self {
        self.fail_at = Some((query, failure));
        self
    }

    /// Flag that flips once `quit` has been called, readable after the
    /// engine has been moved away.
    pub fn quit_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.quit)
    }

    pub fn has_quit(&self) -> bool {
        self.quit.load(Ordering::SeqCst)
    }
}

impl AnalysisEngine for FakeEngine {
    async fn analyse(&mut self, fen: &str, _depth: u32) -> Result<EngineScore, EngineError> {
        self.seen.push(fen.to_string());
        match self.fail_at {
            Some((query, Failure::NoScore)) if query == self.seen.len() => Err(EngineError::NoScore),
            Some((query, Failure::Crash)) if query <= self.seen.len() => Err(EngineError::Exited),
            _ => Ok(self.score),
        }
    }

    async fn quit(&mut self) {
        self.quit.store(true, Ordering::SeqCst);
    }
}
