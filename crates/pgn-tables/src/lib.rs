//! PGN to tables: one row per game, one row per ply.

pub mod annotation;
pub mod clean;
pub mod error;
pub mod extract;
pub mod game_data;
pub mod pgn;
pub mod table_io;

pub use error::TableError;
pub use game_data::{
    CleanMetadataRow, CleanMetadataTable, CleanMoveRow, CleanMoveTable, Color, EnrichedMoveRow,
    EnrichedMoveTable, Evaluation, MetaValue, MetadataRow, MetadataTable, MoveRow, MoveTable,
};
pub use pgn::{GameDecoder, GameRecord, MoveNode, PgnFileDecoder};
