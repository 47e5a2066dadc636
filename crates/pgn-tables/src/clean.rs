//! Type normalization for the metadata and move tables.
//!
//! Cleaning never mutates its input and never fails on a single bad cell:
//! unparseable dates, evaluations and clocks become null. Only structural
//! faults (duplicate keys, an unknown side) are errors.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::error::TableError;
use crate::game_data::{
    CleanMetadataRow, CleanMetadataTable, CleanMoveRow, CleanMoveTable, Color, Evaluation,
    MetaValue, MetadataTable, MoveRow, MoveTable, GAME_ID,
};

pub const DATE_COLUMN: &str = "Date";
pub const RESULT_COLUMN: &str = "Result";
pub const RATING_COLUMNS: [&str; 2] = ["WhiteElo", "BlackElo"];

const DATE_FORMATS: [&str; 3] = ["%Y.%m.%d", "%Y-%m-%d", "%Y/%m/%d"];

/// Metadata cleaning policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetadataCleanOptions {
    /// Substituted for a missing or unparseable rating. The default of 0
    /// makes "no rating" indistinguishable from "rated 0"; `None` keeps
    /// such ratings null instead.
    pub missing_rating: Option<f64>,
}

impl Default for MetadataCleanOptions {
    fn default() -> Self {
        Self {
            missing_rating: Some(0.0),
        }
    }
}

/// Clean the metadata table and key it by `game_id`.
///
/// Every cleaned row carries every column of the table, in table order. A
/// cell the row lacks is null, or the `missing_rating` default for ratings,
/// exactly as an empty CSV cell would clean.
pub fn clean_metadata(
    table: &MetadataTable,
    options: &MetadataCleanOptions,
) -> Result<CleanMetadataTable, TableError> {
    let columns: Vec<String> = table
        .columns()
        .into_iter()
        .filter(|column| column != GAME_ID)
        .collect();

    let mut rows = BTreeMap::new();
    for row in &table.rows {
        let fields = columns
            .iter()
            .map(|column| {
                let raw = row.get(column).unwrap_or_default();
                (column.clone(), clean_field(column, raw, options))
            })
            .collect();

        let cleaned = CleanMetadataRow {
            game_id: row.game_id,
            fields,
        };
        if rows.insert(row.game_id, cleaned).is_some() {
            return Err(TableError::DuplicateGameId(row.game_id));
        }
    }

    Ok(CleanMetadataTable { rows })
}

fn clean_field(name: &str, value: &str, options: &MetadataCleanOptions) -> MetaValue {
    match name {
        DATE_COLUMN => MetaValue::Date(parse_date(value)),
        RESULT_COLUMN => MetaValue::Text(normalize_result(value)),
        _ if RATING_COLUMNS.contains(&name) => {
            MetaValue::Rating(parse_rating(value).or(options.missing_rating))
        }
        _ => MetaValue::Text(value.to_string()),
    }
}

/// PGN (`2024.03.01`), ISO and slash dates, or an ISO datetime.
/// Partial PGN dates such as `2024.??.??` are null.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|dt| dt.date())
        })
}

pub fn parse_rating(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|rating| rating.is_finite())
}

/// Map result spellings onto `1-0`, `0-1`, `1/2-1/2`; others pass unchanged.
pub fn normalize_result(value: &str) -> String {
    match value.trim() {
        canonical @ ("1-0" | "0-1" | "1/2-1/2") => canonical.to_string(),
        "½-½" | "1/2" | "0.5-0.5" | "=" => "1/2-1/2".to_string(),
        _ => value.to_string(),
    }
}

/// Clean the move table, returned ordered by `(game_id, ply)`.
pub fn clean_moves(table: &MoveTable) -> Result<CleanMoveTable, TableError> {
    let mut rows = table
        .rows
        .iter()
        .map(clean_move_row)
        .collect::<Result<Vec<_>, _>>()?;
    rows.sort_by_key(|row| (row.game_id, row.ply));
    Ok(CleanMoveTable { rows })
}

fn clean_move_row(row: &MoveRow) -> Result<CleanMoveRow, TableError> {
    let color: Color = row.color.parse().map_err(|_| TableError::InvalidColor {
        game_id: row.game_id,
        ply: row.ply,
        value: row.color.clone(),
    })?;

    Ok(CleanMoveRow {
        game_id: row.game_id,
        ply: row.ply,
        color,
        san: row.san.clone(),
        clock: row.clock.as_deref().and_then(clock_to_seconds),
        eval_cp: row.eval_cp.and_then(normalize_eval),
        uci: row.uci.clone(),
        fen: row.fen.clone(),
    })
}

/// Mates pass through; a centipawn value must be a finite number.
pub fn normalize_eval(eval: Evaluation) -> Option<Evaluation> {
    match eval {
        Evaluation::Mate(_) => Some(eval),
        Evaluation::Centipawns(cp) if cp.is_finite() => Some(eval),
        Evaluation::Centipawns(_) => None,
    }
}

/// `H:MM:SS`, `MM:SS` or bare seconds to seconds.
pub fn clock_to_seconds(clock: &str) -> Option<f64> {
    let parts = clock
        .split(':')
        .map(|part| {
            part.trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite() && *v >= 0.0)
        })
        .collect::<Option<Vec<f64>>>()?;

    match parts.as_slice() {
        [h, m, s] => Some(h * 3600.0 + m * 60.0 + s),
        [m, s] => Some(m * 60.0 + s),
        [s] => Some(*s),
        _ => None,
    }
}
