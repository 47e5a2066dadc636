//! The analysis engine seam used by the evaluation merge.

use std::future::Future;

use pgn_tables::Evaluation;
use thiserror::Error;

/// Engine score, from the point of view of the side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineScore {
    Centipawns(i32),
    /// Mate in N (positive = side to move mates, negative = gets mated)
    Mate(i32),
}

impl EngineScore {
    pub fn is_mate(&self) -> bool {
        matches!(self, EngineScore::Mate(_))
    }

    pub fn mate(&self) -> Option<i32> {
        match self {
            EngineScore::Mate(n) => Some(*n),
            EngineScore::Centipawns(_) => None,
        }
    }

    pub fn centipawns(&self) -> Option<i32> {
        match self {
            EngineScore::Centipawns(cp) => Some(*cp),
            EngineScore::Mate(_) => None,
        }
    }
}

impl From<EngineScore> for Evaluation {
    fn from(score: EngineScore) -> Self {
        match score {
            EngineScore::Centipawns(cp) => Evaluation::Centipawns(f64::from(cp)),
            EngineScore::Mate(n) => Evaluation::Mate(n),
        }
    }
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("search finished without a score")]
    NoScore,

    #[error("engine process exited")]
    Exited,

    #[error("{0}")]
    Io(String),
}

impl EngineError {
    /// Whether the engine can no longer be used.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, EngineError::NoScore)
    }
}

/// A running analysis engine session.
pub trait AnalysisEngine {
    /// Search `fen` to `depth` plies and report the score for the side to move.
    fn analyse(
        &mut self,
        fen: &str,
        depth: u32,
    ) -> impl Future<Output = Result<EngineScore, EngineError>> + Send;

    /// Shut the session down. Must be safe to call after a failure.
    fn quit(&mut self) -> impl Future<Output = ()> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_to_evaluation() {
        assert_eq!(
            Evaluation::from(EngineScore::Centipawns(-35)),
            Evaluation::Centipawns(-35.0)
        );
        assert_eq!(Evaluation::from(EngineScore::Mate(2)).to_string(), "M2");
        assert_eq!(Evaluation::from(EngineScore::Mate(-1)).to_string(), "M-1");
    }

    #[test]
    fn test_fatal_errors() {
        assert!(!EngineError::NoScore.is_fatal());
        assert!(EngineError::Exited.is_fatal());
        assert!(EngineError::Io("broken pipe".into()).is_fatal());
    }

    #[test]
    fn test_score_accessors() {
        let mate = EngineScore::Mate(3);
        assert!(mate.is_mate());
        assert_eq!(mate.mate(), Some(3));
        assert_eq!(mate.centipawns(), None);
        assert_eq!(EngineScore::Centipawns(12).centipawns(), Some(12));
    }
}
