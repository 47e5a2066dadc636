//! Worker error types

use pgn_tables::TableError;
use thiserror::Error;

use crate::engine::EngineError;

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Table error: {0}")]
    Table(#[from] TableError),

    #[error("Failed to start engine: {0}")]
    EngineStart(#[source] EngineError),

    #[error("Engine failed at game {game_id} ply {ply}: {source}")]
    Engine {
        game_id: u64,
        ply: u32,
        #[source]
        source: EngineError,
    },

    #[error("Illegal move {uci:?} at game {game_id} ply {ply}")]
    IllegalMove { game_id: u64, ply: u32, uci: String },
}
