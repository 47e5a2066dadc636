//! Row and table types for the metadata and move datasets.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

pub const GAME_ID: &str = "game_id";
pub const SOURCE_FILE: &str = "source_file";
pub const PARSED_AT: &str = "parsed_at";

pub const MOVE_COLUMNS: [&str; 8] = [
    "game_id", "ply", "color", "move", "clock", "eval_cp", "uci", "fen",
];

pub const ENRICHED_MOVE_COLUMNS: [&str; 9] = [
    "game_id",
    "ply",
    "color",
    "move",
    "clock",
    "eval_cp",
    "uci",
    "fen",
    "eval_stockfish",
];

/// A position evaluation: centipawns, or a mate count written `M<N>`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Evaluation {
    /// Centipawn score. Annotations may carry fractional values (`1.25`).
    Centipawns(f64),
    /// Mate in N, sign as reported by the source
    Mate(i32),
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Evaluation::Centipawns(cp) => write!(f, "{cp}"),
            Evaluation::Mate(n) => write!(f, "M{n}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid evaluation: {0:?}")]
pub struct ParseEvaluationError(String);

impl FromStr for Evaluation {
    type Err = ParseEvaluationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Some(count) = trimmed.strip_prefix('M') {
            return count
                .parse()
                .map(Evaluation::Mate)
                .map_err(|_| ParseEvaluationError(s.to_string()));
        }
        match trimmed.parse::<f64>() {
            Ok(cp) if cp.is_finite() => Ok(Evaluation::Centipawns(cp)),
            _ => Err(ParseEvaluationError(s.to_string())),
        }
    }
}

impl Serialize for Evaluation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Optional evaluation column: written as `M<N>` / number / empty,
/// read leniently (unparseable text becomes `None`).
pub(crate) mod eval_column {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::Evaluation;

    pub fn serialize<S: Serializer>(
        value: &Option<Evaluation>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(eval) => serializer.collect_str(eval),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Evaluation>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(raw.and_then(|s| s.parse().ok()))
    }
}

/// Side that made a move. Two-valued category of the cleaned move table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn as_str(self) -> &'static str {
        match self {
            Color::White => "white",
            Color::Black => "black",
        }
    }
}

impl From<shakmaty::Color> for Color {
    fn from(color: shakmaty::Color) -> Self {
        color.fold_wb(Color::White, Color::Black)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Color {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "white" => Ok(Color::White),
            "black" => Ok(Color::Black),
            _ => Err(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

/// One game's headers plus the synthetic `source_file` / `parsed_at` fields.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataRow {
    pub game_id: u64,
    /// Header pairs in file order, followed by the synthetic fields
    pub fields: Vec<(String, String)>,
}

impl MetadataRow {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataTable {
    pub rows: Vec<MetadataRow>,
}

impl MetadataTable {
    /// Union of all columns in first-seen order, `game_id` first.
    pub fn columns(&self) -> Vec<String> {
        union_columns(self.rows.iter().map(|row| row.fields.iter().map(|(k, _)| k.as_str())))
    }

    pub fn game_ids(&self) -> BTreeSet<u64> {
        self.rows.iter().map(|row| row.game_id).collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A cleaned metadata cell.
#[derive(Debug, Clone, PartialEq)]
pub enum MetaValue {
    Text(String),
    Date(Option<NaiveDate>),
    Rating(Option<f64>),
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaValue::Text(text) => f.write_str(text),
            MetaValue::Date(Some(date)) => write!(f, "{}", date.format("%Y-%m-%d")),
            MetaValue::Rating(Some(rating)) => write!(f, "{rating}"),
            MetaValue::Date(None) | MetaValue::Rating(None) => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CleanMetadataRow {
    pub game_id: u64,
    pub fields: Vec<(String, MetaValue)>,
}

impl CleanMetadataRow {
    pub fn get(&self, column: &str) -> Option<&MetaValue> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn date(&self) -> Option<NaiveDate> {
        match self.get("Date") {
            Some(MetaValue::Date(date)) => *date,
            _ => None,
        }
    }

    pub fn rating(&self, column: &str) -> Option<f64> {
        match self.get(column) {
            Some(MetaValue::Rating(rating)) => *rating,
            _ => None,
        }
    }

    pub fn result(&self) -> Option<&str> {
        match self.get("Result") {
            Some(MetaValue::Text(result)) => Some(result),
            _ => None,
        }
    }
}

/// Cleaned metadata keyed by `game_id`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanMetadataTable {
    pub rows: BTreeMap<u64, CleanMetadataRow>,
}

impl CleanMetadataTable {
    pub fn get(&self, game_id: u64) -> Option<&CleanMetadataRow> {
        self.rows.get(&game_id)
    }

    pub fn columns(&self) -> Vec<String> {
        union_columns(
            self.rows
                .values()
                .map(|row| row.fields.iter().map(|(k, _)| k.as_str())),
        )
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn union_columns<'a, I, C>(rows: I) -> Vec<String>
where
    I: Iterator<Item = C>,
    C: Iterator<Item = &'a str>,
{
    let mut columns = vec![GAME_ID.to_string()];
    for row in rows {
        for name in row {
            if !columns.iter().any(|c| c == name) {
                columns.push(name.to_string());
            }
        }
    }
    columns
}

// ---------------------------------------------------------------------------
// Moves
// ---------------------------------------------------------------------------

/// One ply as extracted from the PGN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveRow {
    pub game_id: u64,
    pub ply: u32,
    pub color: String,
    #[serde(rename = "move")]
    pub san: String,
    /// Raw `[%clk]` payload
    pub clock: Option<String>,
    #[serde(with = "eval_column")]
    pub eval_cp: Option<Evaluation>,
    pub uci: String,
    /// Position after the move
    pub fen: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MoveTable {
    pub rows: Vec<MoveRow>,
}

impl MoveTable {
    /// Copy ordered by `(game_id, ply)`.
    pub fn sorted(&self) -> MoveTable {
        let mut rows = self.rows.clone();
        rows.sort_by_key(|row| (row.game_id, row.ply));
        MoveTable { rows }
    }

    pub fn game_ids(&self) -> BTreeSet<u64> {
        self.rows.iter().map(|row| row.game_id).collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleanMoveRow {
    pub game_id: u64,
    pub ply: u32,
    pub color: Color,
    #[serde(rename = "move")]
    pub san: String,
    /// Remaining clock time in seconds
    pub clock: Option<f64>,
    #[serde(with = "eval_column")]
    pub eval_cp: Option<Evaluation>,
    pub uci: String,
    pub fen: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanMoveTable {
    pub rows: Vec<CleanMoveRow>,
}

impl CleanMoveTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Cleaned move row plus the engine's own evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedMoveRow {
    pub game_id: u64,
    pub ply: u32,
    pub color: Color,
    #[serde(rename = "move")]
    pub san: String,
    pub clock: Option<f64>,
    /// Annotation evaluation, filled from the engine only when absent
    #[serde(with = "eval_column")]
    pub eval_cp: Option<Evaluation>,
    pub uci: String,
    pub fen: String,
    /// Engine score at the position reached by this ply
    #[serde(with = "eval_column")]
    pub eval_stockfish: Option<Evaluation>,
}

impl From<CleanMoveRow> for EnrichedMoveRow {
    fn from(row: CleanMoveRow) -> Self {
        Self {
            game_id: row.game_id,
            ply: row.ply,
            color: row.color,
            san: row.san,
            clock: row.clock,
            eval_cp: row.eval_cp,
            uci: row.uci,
            fen: row.fen,
            eval_stockfish: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichedMoveTable {
    pub rows: Vec<EnrichedMoveRow>,
}

impl EnrichedMoveTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
