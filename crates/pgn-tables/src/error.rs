//! Table error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TableError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Missing column: {0}")]
    MissingColumn(&'static str),

    #[error("Invalid game_id {value:?} at record {record}")]
    InvalidGameId { record: u64, value: String },

    #[error("Duplicate game_id {0} in metadata table")]
    DuplicateGameId(u64),

    #[error("Invalid color {value:?} at game {game_id} ply {ply}")]
    InvalidColor { game_id: u64, ply: u32, value: String },
}
