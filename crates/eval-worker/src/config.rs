//! Pipeline configuration from environment variables

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use pgn_tables::clean::MetadataCleanOptions;

use crate::error::WorkerError;
use crate::merge::{IllegalMovePolicy, MergeOptions};
use crate::stockfish::EngineOptions;

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// PGN file to decode
    pub pgn_path: PathBuf,

    /// Directory the CSV tables are written to
    pub output_dir: PathBuf,

    /// Path to Stockfish binary; no engine pass when unset
    pub stockfish_path: Option<String>,

    pub engine: EngineOptions,

    pub merge: MergeOptions,

    pub metadata: MetadataCleanOptions,

    /// Rows between progress lines (0 disables)
    pub progress_every: usize,
}

impl PipelineConfig {
    /// Load from the process environment. `pgn_arg` (the first CLI
    /// argument) takes precedence over `PGN_PATH`.
    pub fn load(pgn_arg: Option<String>) -> Result<Self, WorkerError> {
        Self::from_lookup(pgn_arg, |name| env::var(name).ok())
    }

    pub fn from_lookup<F>(pgn_arg: Option<String>, lookup: F) -> Result<Self, WorkerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pgn_path = pgn_arg
            .or_else(|| lookup("PGN_PATH"))
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| WorkerError::Config("PGN_PATH not set".into()))?;

        let output_dir = lookup("OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("data/tables"));

        let stockfish_path = lookup("STOCKFISH_PATH").filter(|p| !p.trim().is_empty());

        let engine = EngineOptions {
            threads: parse_var(&lookup, "ENGINE_THREADS", 1)?,
            hash_mb: parse_var(&lookup, "ENGINE_HASH_MB", 256)?,
        };

        let illegal_moves = match lookup("ILLEGAL_MOVES").as_deref().map(str::trim) {
            None | Some("skip") => IllegalMovePolicy::Skip,
            Some("abort") => IllegalMovePolicy::Abort,
            Some(other) => {
                return Err(WorkerError::Config(format!(
                    "ILLEGAL_MOVES must be skip or abort, got {other:?}"
                )))
            }
        };
        let merge = MergeOptions {
            depth: parse_var(&lookup, "ENGINE_DEPTH", 15)?,
            illegal_moves,
        };

        let missing_rating = match lookup("MISSING_RATING") {
            None => Some(0.0),
            Some(v) if v.trim().eq_ignore_ascii_case("none") => None,
            Some(v) => Some(
                v.trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|r| r.is_finite())
                    .ok_or_else(|| invalid("MISSING_RATING", &v))?,
            ),
        };

        Ok(Self {
            pgn_path,
            output_dir,
            stockfish_path,
            engine,
            merge,
            metadata: MetadataCleanOptions { missing_rating },
            progress_every: parse_var(&lookup, "PROGRESS_EVERY", 500)?,
        })
    }
}

fn invalid(name: &str, value: &str) -> WorkerError {
    WorkerError::Config(format!("{name} has invalid value {value:?}"))
}

fn parse_var<T, F>(lookup: &F, name: &str, default: T) -> Result<T, WorkerError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(default),
        Some(v) => v.trim().parse().map_err(|_| invalid(name, &v)),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<PipelineConfig, WorkerError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        PipelineConfig::from_lookup(None, |name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("PGN_PATH", "games.pgn")]).unwrap();
        assert_eq!(config.pgn_path, PathBuf::from("games.pgn"));
        assert_eq!(config.output_dir, PathBuf::from("data/tables"));
        assert_eq!(config.stockfish_path, None);
        assert_eq!(config.engine, EngineOptions::default());
        assert_eq!(config.merge, MergeOptions::default());
        assert_eq!(config.metadata.missing_rating, Some(0.0));
        assert_eq!(config.progress_every, 500);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("PGN_PATH", "games.pgn"),
            ("STOCKFISH_PATH", "/usr/bin/stockfish"),
            ("ENGINE_DEPTH", "20"),
            ("ENGINE_THREADS", "4"),
            ("MISSING_RATING", "none"),
            ("ILLEGAL_MOVES", "abort"),
        ])
        .unwrap();
        assert_eq!(config.stockfish_path.as_deref(), Some("/usr/bin/stockfish"));
        assert_eq!(config.merge.depth, 20);
        assert_eq!(config.engine.threads, 4);
        assert_eq!(config.metadata.missing_rating, None);
        assert_eq!(config.merge.illegal_moves, IllegalMovePolicy::Abort);
    }

    #[test]
    fn test_cli_argument_wins() {
        let config = PipelineConfig::from_lookup(Some("cli.pgn".into()), |name| {
            (name == "PGN_PATH").then(|| "env.pgn".to_string())
        })
        .unwrap();
        assert_eq!(config.pgn_path, PathBuf::from("cli.pgn"));
    }

    #[test]
    fn test_missing_pgn_path() {
        assert!(matches!(load(&[]), Err(WorkerError::Config(_))));
    }

    #[test]
    fn test_invalid_value_names_variable() {
        let err = load(&[("PGN_PATH", "g.pgn"), ("ENGINE_DEPTH", "deep")]).unwrap_err();
        assert!(err.to_string().contains("ENGINE_DEPTH"));

        let err = load(&[("PGN_PATH", "g.pgn"), ("ILLEGAL_MOVES", "ignore")]).unwrap_err();
        assert!(err.to_string().contains("ILLEGAL_MOVES"));
    }
}
