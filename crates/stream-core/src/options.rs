use crate::error::SessionError;
use std::time::Duration;

pub const DEFAULT_BATCH_LIMIT: usize = 50;
pub const DEFAULT_DRAIN_DEADLINE: Duration = Duration::from_millis(50);
pub const DEFAULT_CLOSE_WAIT: Duration = Duration::from_secs(2);

/// Timing parameters of a streaming session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamOptions {
    /// Rows pulled from the cursor per fetch run.
    pub batch_limit: usize,
    /// Time budget of a single drain.
    pub drain_deadline: Duration,
    /// Longest a caller waits for an asynchronous cursor close.
    pub close_wait_budget: Duration,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            batch_limit: DEFAULT_BATCH_LIMIT,
            drain_deadline: DEFAULT_DRAIN_DEADLINE,
            close_wait_budget: DEFAULT_CLOSE_WAIT,
        }
    }
}

impl StreamOptions {
    pub fn with_batch_limit(mut self, batch_limit: usize) -> Self {
        self.batch_limit = batch_limit;
        self
    }

    pub fn with_drain_deadline(mut self, deadline: Duration) -> Self {
        self.drain_deadline = deadline;
        self
    }

    pub fn with_close_wait_budget(mut self, budget: Duration) -> Self {
        self.close_wait_budget = budget;
        self
    }

    /// One full batch plus a slot for the terminal error item.
    pub fn channel_capacity(&self) -> usize {
        self.batch_limit + 1
    }

    pub fn validate(&self) -> Result<(), SessionError> {
        if self.batch_limit == 0 {
            return Err(SessionError::InvalidOptions(
                "batch limit must be at least 1".into(),
            ));
        }
        if self.drain_deadline.is_zero() {
            return Err(SessionError::InvalidOptions(
                "drain deadline must be positive".into(),
            ));
        }
        if self.close_wait_budget.is_zero() {
            return Err(SessionError::InvalidOptions(
                "close wait budget must be positive".into(),
            ));
        }
        Ok(())
    }
}
