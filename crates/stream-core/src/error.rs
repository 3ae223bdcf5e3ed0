use thiserror::Error;

/// Failures reported by a [`RowCursor`](crate::cursor::RowCursor).
#[derive(Debug, Error)]
pub enum CursorError {
    #[error("Failed to read column metadata: {0}")]
    Metadata(String),

    #[error("Failed to fetch row: {0}")]
    Fetch(String),

    #[error("Failed to close result: {0}")]
    Close(String),

    #[error("Cursor is exhausted")]
    Exhausted,

    #[error("Unexpected error: {0}")]
    Unexpected(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Failures reported by a [`QueryExecutor`](crate::cursor::QueryExecutor).
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("{0}")]
    Execution(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Unsupported statement: {0}")]
    Unsupported(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    /// The result's column names could not be read. The cursor is unusable and
    /// no session was created.
    #[error("Failed to read column metadata: {source}")]
    Metadata {
        #[source]
        source: CursorError,
    },

    #[error("Invalid stream options: {0}")]
    InvalidOptions(String),
}
