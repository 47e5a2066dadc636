//! Stockfish engine wrapper using UCI protocol (async I/O)

use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::debug;

use crate::engine::{AnalysisEngine, EngineError, EngineScore};

/// UCI options applied once after the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    pub threads: u32,
    pub hash_mb: u32,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            threads: 1,
            hash_mb: 256,
        }
    }
}

/// Stockfish engine instance
pub struct StockfishEngine {
    process: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl StockfishEngine {
    /// Spawn a new Stockfish process and initialize UCI
    pub async fn new(path: &str, options: &EngineOptions) -> Result<Self, EngineError> {
        let mut process = Command::new(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EngineError::Io(format!("Failed to spawn {path}: {e}")))?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| EngineError::Io("Engine stdin not captured".into()))?;
        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| EngineError::Io("Engine stdout not captured".into()))?;

        let mut engine = Self {
            process,
            stdin,
            stdout: BufReader::new(stdout),
        };

        engine.send("uci").await?;
        engine.wait_for("uciok").await?;

        engine
            .send(&format!("setoption name Threads value {}", options.threads))
            .await?;
        engine
            .send(&format!("setoption name Hash value {}", options.hash_mb))
            .await?;
        engine.send("isready").await?;
        engine.wait_for("readyok").await?;

        Ok(engine)
    }

    /// Send a command to Stockfish
    async fn send(&mut self, cmd: &str) -> Result<(), EngineError> {
        debug!(cmd, "SF <");
        self.stdin
            .write_all(format!("{cmd}\n").as_bytes())
            .await
            .map_err(|e| EngineError::Io(format!("Failed to write to Stockfish: {e}")))?;
        self.stdin
            .flush()
            .await
            .map_err(|e| EngineError::Io(format!("Failed to flush stdin: {e}")))?;
        Ok(())
    }

    /// Next output line, trimmed. End of output means the process is gone.
    async fn read_line(&mut self, line: &mut String) -> Result<(), EngineError> {
        line.clear();
        let read = self
            .stdout
            .read_line(line)
            .await
            .map_err(|e| EngineError::Io(format!("Failed to read from Stockfish: {e}")))?;
        if read == 0 {
            return Err(EngineError::Exited);
        }
        let trimmed_len = line.trim_end().len();
        line.truncate(trimmed_len);
        debug!(line = line.as_str(), "SF >");
        Ok(())
    }

    /// Wait for a specific response line
    async fn wait_for(&mut self, expected: &str) -> Result<(), EngineError> {
        let mut line = String::new();
        loop {
            self.read_line(&mut line).await?;
            if line.trim() == expected {
                return Ok(());
            }
        }
    }

    /// Search a position to a fixed depth. The score of the last `info`
    /// line before `bestmove` is the result.
    pub async fn evaluate(&mut self, fen: &str, depth: u32) -> Result<EngineScore, EngineError> {
        self.send(&format!("position fen {fen}")).await?;
        self.send(&format!("go depth {depth}")).await?;

        let mut score = None;
        let mut line = String::new();
        loop {
            self.read_line(&mut line).await?;
            let trimmed = line.trim();

            if trimmed.starts_with("info") {
                if let Some(s) = parse_score(trimmed) {
                    score = Some(s);
                }
            } else if trimmed.starts_with("bestmove") {
                break;
            }
        }

        score.ok_or(EngineError::NoScore)
    }
}

impl AnalysisEngine for StockfishEngine {
    async fn analyse(&mut self, fen: &str, depth: u32) -> Result<EngineScore, EngineError> {
        self.evaluate(fen, depth).await
    }

    /// Send quit command and wait for process to exit
    async fn quit(&mut self) {
        let _ = self.send("quit").await;
        let _ = self.process.wait().await;
    }
}

impl Drop for StockfishEngine {
    fn drop(&mut self) {
        let _ = self.process.start_kill();
    }
}

/// Score from an `info` line, if it carries one
fn parse_score(line: &str) -> Option<EngineScore> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let at = parts.iter().position(|part| *part == "score")?;
    let value = parts.get(at + 2)?.parse().ok()?;
    match *parts.get(at + 1)? {
        "cp" => Some(EngineScore::Centipawns(value)),
        "mate" => Some(EngineScore::Mate(value)),
        _ => None,
    }
}
