//! Stockfish enrichment for the move table, plus the pipeline plumbing
//! (configuration, errors, progress) used by the `pgn-to-tables` binary.

pub mod config;
pub mod engine;
pub mod error;
pub mod merge;
pub mod progress;
pub mod stockfish;

pub use engine::{AnalysisEngine, EngineError, EngineScore};
pub use error::WorkerError;
pub use merge::{
    merge_evaluations, merge_with_engine, run_with_stockfish, IllegalMovePolicy, MergeOptions,
    MergeSummary,
};
pub use progress::{LogProgress, MergeProgress, NoProgress};
