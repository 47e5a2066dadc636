//! Evaluation merge: replay each game's moves and record engine scores.
//!
//! Rows must arrive ordered by `(game_id, ply)`, as [`clean_moves`] returns
//! them. A row whose move cannot be played is passed through unchanged.
//!
//! [`clean_moves`]: pgn_tables::clean::clean_moves

use pgn_tables::{CleanMoveTable, EnrichedMoveRow, EnrichedMoveTable, Evaluation};
use shakmaty::{fen::Fen, uci::UciMove, Chess, EnPassantMode, Move, Position};
use tracing::{debug, info, warn};

use crate::engine::AnalysisEngine;
use crate::error::WorkerError;
use crate::progress::MergeProgress;
use crate::stockfish::{EngineOptions, StockfishEngine};

/// What to do with a move that is not legal in the replayed position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IllegalMovePolicy {
    /// Leave the row unenriched and keep going
    #[default]
    Skip,
    /// Fail the run
    Abort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOptions {
    /// Search depth per position
    pub depth: u32,
    pub illegal_moves: IllegalMovePolicy,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            depth: 15,
            illegal_moves: IllegalMovePolicy::Skip,
        }
    }
}

/// Counts from one merge pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub rows: usize,
    /// Rows that received an engine score
    pub analysed: usize,
    /// Rows whose missing `eval_cp` was filled from the engine
    pub filled: usize,
    pub skipped_illegal: usize,
    pub skipped_no_score: usize,
}

/// Replay position for the game currently being merged.
struct Replay {
    game_id: Option<u64>,
    position: Chess,
}

impl Replay {
    fn new() -> Self {
        Self {
            game_id: None,
            position: Chess::default(),
        }
    }

    /// Position for `game_id`, reset to the start when the game changes.
    fn position_for(&mut self, game_id: u64) -> &mut Chess {
        if self.game_id != Some(game_id) {
            self.game_id = Some(game_id);
            self.position = Chess::default();
        }
        &mut self.position
    }
}

fn legal_move(pos: &Chess, uci: &str) -> Option<Move> {
    let uci: UciMove = uci.trim().parse().ok()?;
    uci.to_move(pos).ok()
}

/// Fill in `eval_stockfish` for every playable row.
///
/// A row that already has `eval_cp` keeps it; otherwise the engine score is
/// copied there too. The engine is borrowed and left running.
pub async fn merge_evaluations<E, P>(
    table: &CleanMoveTable,
    engine: &mut E,
    options: &MergeOptions,
    progress: &mut P,
) -> Result<(EnrichedMoveTable, MergeSummary), WorkerError>
where
    E: AnalysisEngine,
    P: MergeProgress,
{
    let total = table.rows.len();
    let mut summary = MergeSummary {
        rows: total,
        ..MergeSummary::default()
    };
    let mut replay = Replay::new();
    let mut rows = Vec::with_capacity(total);

    for (index, row) in table.rows.iter().enumerate() {
        let mut enriched = EnrichedMoveRow::from(row.clone());
        let position = replay.position_for(row.game_id);

        match legal_move(position, &row.uci) {
            None => {
                if options.illegal_moves == IllegalMovePolicy::Abort {
                    return Err(WorkerError::IllegalMove {
                        game_id: row.game_id,
                        ply: row.ply,
                        uci: row.uci.clone(),
                    });
                }
                debug!(game_id = row.game_id, ply = row.ply, uci = %row.uci, "Illegal move, skipping row");
                summary.skipped_illegal += 1;
            }
            Some(mv) => {
                position.play_unchecked(mv);
                let fen = Fen::from_position(&*position, EnPassantMode::Legal).to_string();

                match engine.analyse(&fen, options.depth).await {
                    Ok(score) => {
                        let eval = Evaluation::from(score);
                        enriched.eval_stockfish = Some(eval);
                        if enriched.eval_cp.is_none() {
                            enriched.eval_cp = Some(eval);
                            summary.filled += 1;
                        }
                        summary.analysed += 1;
                    }
                    Err(e) if !e.is_fatal() => {
                        warn!(game_id = row.game_id, ply = row.ply, error = %e, "No engine score, skipping row");
                        summary.skipped_no_score += 1;
                    }
                    Err(e) => {
                        return Err(WorkerError::Engine {
                            game_id: row.game_id,
                            ply: row.ply,
                            source: e,
                        });
                    }
                }
            }
        }

        rows.push(enriched);
        progress.on_row(index + 1, total);
    }

    progress.on_finish(&summary);
    Ok((EnrichedMoveTable { rows }, summary))
}

/// Merge with an engine this call owns, shutting it down on every path.
pub async fn merge_with_engine<E, P>(
    mut engine: E,
    table: &CleanMoveTable,
    options: &MergeOptions,
    progress: &mut P,
) -> Result<(EnrichedMoveTable, MergeSummary), WorkerError>
where
    E: AnalysisEngine,
    P: MergeProgress,
{
    let result = merge_evaluations(table, &mut engine, options, progress).await;
    engine.quit().await;
    result
}

/// Start Stockfish at `path`, merge, and quit the engine.
pub async fn run_with_stockfish<P: MergeProgress>(
    path: &str,
    engine_options: &EngineOptions,
    table: &CleanMoveTable,
    options: &MergeOptions,
    progress: &mut P,
) -> Result<(EnrichedMoveTable, MergeSummary), WorkerError> {
    let engine = StockfishEngine::new(path, engine_options)
        .await
        .map_err(WorkerError::EngineStart)?;
    info!(path, depth = options.depth, "Stockfish engine ready");

    merge_with_engine(engine, table, options, progress).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineError, EngineScore};
    use crate::progress::NoProgress;
    use pgn_tables::{CleanMoveRow, Color};

    /// Replies with a fixed score and records every FEN it is asked about.
    #[derive(Default)]
    struct RecordingEngine {
        seen: Vec<String>,
        no_score_at: Option<usize>,
        quit: bool,
    }

    impl AnalysisEngine for RecordingEngine {
        async fn analyse(&mut self, fen: &str, _depth: u32) -> Result<EngineScore, EngineError> {
            self.seen.push(fen.to_string());
            if self.no_score_at == Some(self.seen.len()) {
                return Err(EngineError::NoScore);
            }
            Ok(EngineScore::Centipawns(20))
        }

        async fn quit(&mut self) {
            self.quit = true;
        }
    }

    fn row(game_id: u64, ply: u32, uci: &str) -> CleanMoveRow {
        CleanMoveRow {
            game_id,
            ply,
            color: if ply % 2 == 1 { Color::White } else { Color::Black },
            san: String::new(),
            clock: None,
            eval_cp: None,
            uci: uci.to_string(),
            fen: String::new(),
        }
    }

    #[tokio::test]
    async fn test_replay_resets_between_games() {
        let table = CleanMoveTable {
            rows: vec![row(1, 1, "e2e4"), row(1, 2, "e7e5"), row(2, 1, "d2d4")],
        };
        let mut engine = RecordingEngine::default();
        let (enriched, summary) =
            merge_evaluations(&table, &mut engine, &MergeOptions::default(), &mut NoProgress)
                .await
                .unwrap();

        assert_eq!(summary.analysed, 3);
        assert_eq!(
            engine.seen[2],
            "rnbqkbnr/pppppppp/8/8/3P4/8/PPP1PPPP/RNBQKBNR b KQkq - 0 1"
        );
        assert!(enriched.rows.iter().all(|r| r.eval_stockfish.is_some()));
        // borrowed engine is left running
        assert!(!engine.quit);
    }

    #[tokio::test]
    async fn test_skipped_row_does_not_advance_position() {
        let table = CleanMoveTable {
            rows: vec![row(1, 1, "e2e4"), row(1, 2, "e2e4"), row(1, 3, "e7e5")],
        };
        let mut engine = RecordingEngine::default();
        let (enriched, summary) =
            merge_evaluations(&table, &mut engine, &MergeOptions::default(), &mut NoProgress)
                .await
                .unwrap();

        assert_eq!(summary.skipped_illegal, 1);
        assert_eq!(enriched.rows[1].eval_stockfish, None);
        // black's reply still applies to the position after 1. e4
        assert_eq!(enriched.rows[2].eval_stockfish, Some(Evaluation::Centipawns(20.0)));
    }

    #[tokio::test]
    async fn test_abort_policy() {
        let table = CleanMoveTable {
            rows: vec![row(4, 1, "e2e5")],
        };
        let options = MergeOptions {
            illegal_moves: IllegalMovePolicy::Abort,
            ..MergeOptions::default()
        };
        let err = merge_evaluations(&table, &mut RecordingEngine::default(), &options, &mut NoProgress)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WorkerError::IllegalMove { game_id: 4, ply: 1, .. }
        ));
    }

    #[tokio::test]
    async fn test_no_score_leaves_row_alone() {
        let mut annotated = row(1, 1, "e2e4");
        annotated.eval_cp = Some(Evaluation::Centipawns(0.3));
        let table = CleanMoveTable {
            rows: vec![annotated.clone(), row(1, 2, "e7e5")],
        };
        let mut engine = RecordingEngine {
            no_score_at: Some(2),
            ..RecordingEngine::default()
        };
        let (enriched, summary) =
            merge_evaluations(&table, &mut engine, &MergeOptions::default(), &mut NoProgress)
                .await
                .unwrap();

        assert_eq!(summary.skipped_no_score, 1);
        assert_eq!(summary.filled, 0);
        assert_eq!(enriched.rows[0].eval_cp, Some(Evaluation::Centipawns(0.3)));
        assert_eq!(enriched.rows[1].eval_cp, None);
        assert_eq!(enriched.rows[1].eval_stockfish, None);
    }

    #[tokio::test]
    async fn test_missing_engine_binary() {
        let err = run_with_stockfish(
            "/nonexistent/stockfish",
            &EngineOptions::default(),
            &CleanMoveTable::default(),
            &MergeOptions::default(),
            &mut NoProgress,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, WorkerError::EngineStart(_)));
    }
}
