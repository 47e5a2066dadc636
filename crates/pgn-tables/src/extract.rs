//! Flatten decoded games into the metadata and move tables.
//!
//! Both tables draw `game_id` from the same [`GameIds`] sequence, so the
//! n-th decoded game is `game_id = n` in each of them.

use chrono::{DateTime, Utc};
use shakmaty::{fen::Fen, san::SanPlus, CastlingMode, EnPassantMode, Position};

use crate::annotation;
use crate::game_data::{
    Color, MetadataRow, MetadataTable, MoveRow, MoveTable, GAME_ID, PARSED_AT, SOURCE_FILE,
};
use crate::pgn::GameRecord;

/// Sequential game identifiers, starting at 1 in decode order.
#[derive(Debug, Clone)]
pub struct GameIds {
    next: u64,
}

impl GameIds {
    pub fn new() -> Self {
        Self { next: 1 }
    }
}

impl Default for GameIds {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for GameIds {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        let id = self.next;
        self.next += 1;
        Some(id)
    }
}

/// Pair each game with its `game_id`.
pub fn numbered<I>(games: I) -> impl Iterator<Item = (u64, GameRecord)>
where
    I: IntoIterator<Item = GameRecord>,
{
    GameIds::new().zip(games)
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

/// One metadata row: the game's headers, then `source_file` and `parsed_at`.
pub fn metadata_row(
    game_id: u64,
    game: &GameRecord,
    source_file: &str,
    parsed_at: DateTime<Utc>,
) -> MetadataRow {
    let mut fields: Vec<(String, String)> = game
        .headers
        .iter()
        .filter(|(key, _)| !matches!(key.as_str(), GAME_ID | SOURCE_FILE | PARSED_AT))
        .cloned()
        .collect();
    fields.push((SOURCE_FILE.to_string(), source_file.to_string()));
    fields.push((PARSED_AT.to_string(), format_timestamp(parsed_at)));

    MetadataRow { game_id, fields }
}

/// Walk the mainline of one game, one row per played move.
pub fn move_rows(game_id: u64, game: &GameRecord) -> Vec<MoveRow> {
    let mut pos = game.starting_position();
    let mut rows = Vec::with_capacity(game.nodes.len().saturating_sub(1));
    let mut ply = 1u32;

    for node in &game.nodes {
        let Some(mv) = node.mv else {
            continue;
        };

        // Side to move and notation come from the position before the move
        let color = Color::from(pos.turn());
        let san = SanPlus::from_move(pos.clone(), mv).to_string();
        let uci = mv.to_uci(CastlingMode::Standard).to_string();
        let annotations = annotation::parse_comment(node.comment.as_deref());

        pos.play_unchecked(mv);
        let fen = Fen::from_position(&pos, EnPassantMode::Legal).to_string();

        rows.push(MoveRow {
            game_id,
            ply,
            color: color.as_str().to_string(),
            san,
            clock: annotations.clock,
            eval_cp: annotations.eval,
            uci,
            fen,
        });
        ply += 1;
    }

    rows
}

/// Metadata table for a decode pass.
pub fn extract_metadata<I, F>(games: I, source_file: &str, now: F) -> MetadataTable
where
    I: IntoIterator<Item = GameRecord>,
    F: Fn() -> DateTime<Utc>,
{
    let rows = numbered(games)
        .map(|(game_id, game)| metadata_row(game_id, &game, source_file, now()))
        .collect();
    MetadataTable { rows }
}

/// Move table for a decode pass, ordered by `(game_id, ply)`.
pub fn extract_moves<I>(games: I) -> MoveTable
where
    I: IntoIterator<Item = GameRecord>,
{
    let rows = numbered(games)
        .flat_map(|(game_id, game)| move_rows(game_id, &game))
        .collect();
    MoveTable { rows }.sorted()
}

/// Both tables from a single decode pass.
pub fn extract_tables<I, F>(games: I, source_file: &str, now: F) -> (MetadataTable, MoveTable)
where
    I: IntoIterator<Item = GameRecord>,
    F: Fn() -> DateTime<Utc>,
{
    let mut metadata = MetadataTable::default();
    let mut moves = MoveTable::default();

    for (game_id, game) in numbered(games) {
        metadata
            .rows
            .push(metadata_row(game_id, &game, source_file, now()));
        moves.rows.extend(move_rows(game_id, &game));
    }

    (metadata, moves.sorted())
}
