//! The scoring port: the boundary where synthetic rows become predictions.
//!
//! The core never knows how a model is reached. Anything implementing
//! [`ScoringPort`] can score, be it the batch-scoring subprocess
//! ([`BatchScorer`]) or a plain closure in tests:
//!
//! ```ignore
//! let port = |req: &ScoringRequest| -> PdResult<Vec<Prediction>> {
//!     Ok(vec![Prediction::estimate(1.0); req.rows.len()])
//! };
//! ```
//!
//! ## Contract
//!
//! - Predictions come back aligned 1:1 with `request.rows`; any other length
//!   is a fatal [`PdError::Scoring`]. The core does not reconcile.
//! - Failures propagate as `PdError::Scoring`; retry policy belongs to the
//!   port's owner, never to the core.
//! - `request.workdir` is a per-invocation directory owned by the caller and
//!   removed after the call returns, fails, or times out. Ports that need
//!   intermediate files write them there.
//!
//! ## Bounded wait
//!
//! [`score_with_timeout`] runs the port on a worker thread and waits at most
//! the configured duration. A port that never answers yields
//! [`PdError::Timeout`]. Past the limit the worker gets [`DEADLINE_GRACE`]
//! to wind down (a port honoring `request.deadline` kills its child there)
//! before the caller moves on and removes the workdir; after that it is
//! abandoned and its result, if any, discarded.

pub mod batch;

pub use batch::BatchScorer;

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use crate::dataset::Dataset;
use crate::error::{PdError, PdResult};
use crate::types::{Prediction, TargetDescriptor};

/// Extra wait after a timeout for a deadline-aware port to stop writing
/// into its workdir.
pub const DEADLINE_GRACE: Duration = Duration::from_millis(500);

/// Everything a port needs to score one expansion. Owned so it can move to
/// the scoring worker thread.
#[derive(Debug, Clone)]
pub struct ScoringRequest {
    /// Synthetic rows to score, in order.
    pub rows: Dataset,
    /// Target column and kind the predictions must expose.
    pub target: TargetDescriptor,
    /// Columns a port should echo back alongside predictions, if it echoes.
    pub keep_columns: Vec<String>,
    /// Scratch directory for intermediate artifacts.
    pub workdir: PathBuf,
    /// Point in time after which the caller stops waiting.
    pub deadline: Option<Instant>,
}

impl ScoringRequest {
    /// Time left before the deadline; `None` when unbounded.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }
}

/// Something that turns feature rows into predictions.
pub trait ScoringPort: Send + Sync {
    fn score(&self, request: &ScoringRequest) -> PdResult<Vec<Prediction>>;

    /// Short label for logs.
    fn describe(&self) -> String {
        "scoring port".to_string()
    }
}

impl<F> ScoringPort for F
where
    F: Fn(&ScoringRequest) -> PdResult<Vec<Prediction>> + Send + Sync,
{
    fn score(&self, request: &ScoringRequest) -> PdResult<Vec<Prediction>> {
        self(request)
    }
}

/// Score `request` on a worker thread, waiting at most `timeout`.
///
/// Enforces row alignment on the way out.
pub fn score_with_timeout(
    port: Arc<dyn ScoringPort>,
    request: ScoringRequest,
    timeout: Option<Duration>,
) -> PdResult<Vec<Prediction>> {
    let expected = request.rows.len();
    let label = port.describe();
    let (tx, rx) = mpsc::channel();

    thread::Builder::new()
        .name("pdep-scoring".into())
        .spawn(move || {
            let result = port.score(&request);
            // Receiver is gone after a timeout; nothing left to report to.
            let _ = tx.send(result);
        })
        .map_err(|e| PdError::scoring(format!("failed to start scoring worker: {}", e)))?;

    let result = match timeout {
        Some(limit) => match rx.recv_timeout(limit) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(port = %label, ?limit, "scoring timed out");
                // Result is discarded either way; only the worker's exit matters.
                let _ = rx.recv_timeout(DEADLINE_GRACE);
                return Err(PdError::Timeout(limit));
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(PdError::scoring(format!("{} exited without a result", label)));
            }
        },
        None => rx
            .recv()
            .map_err(|_| PdError::scoring(format!("{} exited without a result", label)))?,
    };

    let predictions = result?;
    check_alignment(expected, predictions.len())?;
    Ok(predictions)
}

/// Row-count agreement between request and response.
pub fn check_alignment(expected: usize, returned: usize) -> PdResult<()> {
    if expected != returned {
        return Err(PdError::scoring(format!(
            "scoring port returned {} predictions for {} rows",
            returned, expected
        )));
    }
    Ok(())
}
