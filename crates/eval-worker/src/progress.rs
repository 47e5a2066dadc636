//! Progress reporting for the evaluation merge.

use std::time::{Duration, Instant};

use tracing::info;

use crate::merge::MergeSummary;

/// Observer for the merge loop. Purely advisory.
pub trait MergeProgress {
    /// Called after each row, `done` counting from 1.
    fn on_row(&mut self, done: usize, total: usize);

    fn on_finish(&mut self, _summary: &MergeSummary) {}
}

/// Discards all progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl MergeProgress for NoProgress {
    fn on_row(&mut self, _done: usize, _total: usize) {}
}

/// Logs every `every` rows with elapsed time and an ETA.
#[derive(Debug, Clone)]
pub struct LogProgress {
    every: usize,
    started: Instant,
}

impl LogProgress {
    pub fn new(every: usize) -> Self {
        Self {
            every,
            started: Instant::now(),
        }
    }
}

impl MergeProgress for LogProgress {
    fn on_row(&mut self, done: usize, total: usize) {
        if !should_report(self.every, done, total) {
            return;
        }
        let elapsed = self.started.elapsed();
        let eta = estimate_remaining(elapsed, done, total);
        info!(
            done,
            total,
            elapsed_secs = elapsed.as_secs(),
            eta_secs = eta.as_secs(),
            "Evaluation progress"
        );
    }

    fn on_finish(&mut self, summary: &MergeSummary) {
        info!(
            rows = summary.rows,
            analysed = summary.analysed,
            filled = summary.filled,
            skipped_illegal = summary.skipped_illegal,
            skipped_no_score = summary.skipped_no_score,
            elapsed_secs = self.started.elapsed().as_secs(),
            "Evaluation merge complete"
        );
    }
}

/// Every `every`-th row and the last one; `every == 0` turns reporting off.
fn should_report(every: usize, done: usize, total: usize) -> bool {
    every != 0 && (done % every == 0 || done == total)
}

/// Linear estimate of the time left after `done` of `total` rows.
pub fn estimate_remaining(elapsed: Duration, done: usize, total: usize) -> Duration {
    if done == 0 {
        return Duration::ZERO;
    }
    let left = total.saturating_sub(done);
    elapsed.mul_f64(left as f64 / done as f64)
}
