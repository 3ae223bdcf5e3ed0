pub mod close;
pub mod cursor;
pub mod drain;
pub mod error;
pub mod metrics;
pub mod options;
pub mod queue;
pub mod session;
pub mod state;
mod worker;

#[cfg(test)]
mod tests;

pub use close::{CloseHandle, CloseOutcome, CloseStatus};
pub use cursor::{QueryExecutor, QueryOutcome, RowCursor, SharedCursor};
pub use drain::{Delivery, StreamEnd, UiEvent};
pub use error::{CursorError, QueryError, SessionError};
pub use metrics::{StreamMetrics, StreamMetricsSnapshot};
pub use options::StreamOptions;
pub use session::{IterationSession, SessionId};
pub use state::StreamState;
