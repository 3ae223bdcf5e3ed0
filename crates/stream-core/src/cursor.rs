use crate::error::{CursorError, QueryError};
use async_trait::async_trait;
use model::{ColumnMetadata, Row};
use std::{fmt, sync::Arc};
use tokio::sync::Mutex;

/// Pull-based source of rows produced by an executed query.
///
/// Any method may suspend on network I/O for an arbitrary amount of time,
/// including `close`, so callers on the UI loop must never await them
/// directly.
#[async_trait]
pub trait RowCursor: Send {
    /// Column names of the result. Must be answerable before the first row.
    fn columns(&self) -> Result<ColumnMetadata, CursorError>;

    /// Whether another row is available. Reading past a transport error
    /// reports `true` so that the error surfaces from `next`.
    async fn has_next(&mut self) -> bool;

    async fn next(&mut self) -> Result<Row, CursorError>;

    /// Releases the remote result.
    async fn close(&mut self) -> Result<(), CursorError>;
}

/// A cursor shared between the fetch worker and the closer task.
pub type SharedCursor = Arc<Mutex<Box<dyn RowCursor>>>;

pub fn share(cursor: Box<dyn RowCursor>) -> SharedCursor {
    Arc::new(Mutex::new(cursor))
}

/// Result of executing a statement.
pub enum QueryOutcome {
    /// The statement produced a result set.
    Rows(Box<dyn RowCursor>),
    /// The statement modified data and returned an affected-row count.
    Updated(u64),
}

impl fmt::Debug for QueryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryOutcome::Rows(cursor) => f
                .debug_tuple("Rows")
                .field(&cursor.columns().ok())
                .finish(),
            QueryOutcome::Updated(count) => f.debug_tuple("Updated").field(count).finish(),
        }
    }
}

/// Already-connected query execution capability.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(&self, text: &str) -> Result<QueryOutcome, QueryError>;
}
