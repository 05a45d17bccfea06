//! Deadlines and the timeout guard
//!
//! A [`Deadline`] travels with an operation and is checked between encode
//! attempts. [`run_guarded`] bounds the caller's wait: when the budget runs
//! out the caller gets `EncodeTimeout` immediately while the blocking work is
//! abandoned. Abandoned work still releases its scratch files when its guards
//! drop.

use std::future::Future;
use std::time::{Duration, Instant};

use crate::config::TimeoutsConfig;
use crate::error::CompressionError;

/// Point in time after which an operation must stop
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    budget: Option<Duration>,
}

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self {
            started: Instant::now(),
            budget: Some(budget),
        }
    }

    /// Deadline that never expires
    pub fn unbounded() -> Self {
        Self {
            started: Instant::now(),
            budget: None,
        }
    }

    pub fn budget(&self) -> Option<Duration> {
        self.budget
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Time left, `None` when unbounded
    pub fn remaining(&self) -> Option<Duration> {
        self.budget
            .map(|budget| budget.saturating_sub(self.started.elapsed()))
    }

    pub fn is_expired(&self) -> bool {
        matches!(self.remaining(), Some(left) if left.is_zero())
    }

    /// `Err(EncodeTimeout)` once the deadline has passed
    pub fn check(&self) -> Result<(), CompressionError> {
        if self.is_expired() {
            Err(self.timeout_error())
        } else {
            Ok(())
        }
    }

    fn timeout_error(&self) -> CompressionError {
        CompressionError::EncodeTimeout {
            timeout_ms: self.budget.map(|b| b.as_millis() as u64).unwrap_or(0),
        }
    }
}

impl Default for Deadline {
    fn default() -> Self {
        Self::unbounded()
    }
}

/// Kind of job, used to pick a timeout budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Encode,
    Raw,
    Batch,
}

/// Caller-side timeout budgets per job kind
///
/// The engine itself never picks a budget; callers build deadlines from this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutPolicy {
    pub encode: Duration,
    pub raw: Duration,
    pub batch: Duration,
}

impl TimeoutPolicy {
    pub fn from_config(config: &TimeoutsConfig) -> Self {
        Self {
            encode: Duration::from_secs(config.encode_secs),
            raw: Duration::from_secs(config.raw_secs),
            batch: Duration::from_secs(config.batch_secs),
        }
    }

    pub fn budget(&self, kind: JobKind) -> Duration {
        match kind {
            JobKind::Encode => self.encode,
            JobKind::Raw => self.raw,
            JobKind::Batch => self.batch,
        }
    }

    /// Fresh deadline starting now
    pub fn deadline(&self, kind: JobKind) -> Deadline {
        Deadline::after(self.budget(kind))
    }
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self::from_config(&TimeoutsConfig::default())
    }
}

/// Run a blocking job on the blocking pool, bounded by `deadline`
///
/// The job receives the same deadline so it can stop between attempts.
pub async fn run_guarded<T, F>(deadline: Deadline, job: F) -> Result<T, CompressionError>
where
    F: FnOnce(Deadline) -> Result<T, CompressionError> + Send + 'static,
    T: Send + 'static,
{
    let handle = tokio::task::spawn_blocking(move || job(deadline));
    guard(deadline, async move {
        handle
            .await
            .map_err(|e| CompressionError::encode_failed("worker", e.to_string()))?
    })
    .await
}

/// Await `work`, giving up with `EncodeTimeout` when the deadline passes
pub async fn guard<T, Fut>(deadline: Deadline, work: Fut) -> Result<T, CompressionError>
where
    Fut: Future<Output = Result<T, CompressionError>>,
{
    let Some(remaining) = deadline.remaining() else {
        return work.await;
    };

    match tokio::time::timeout(remaining, work).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(
                budget_ms = deadline.budget().map(|b| b.as_millis() as u64),
                "Operation exceeded its deadline, abandoning it"
            );
            Err(deadline.timeout_error())
        }
    }
}
