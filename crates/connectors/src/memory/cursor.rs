use crate::memory::table::RowSource;
use async_trait::async_trait;
use model::{ColumnMetadata, Row};
use std::time::Duration;
use stream_core::{CursorError, RowCursor};

/// Cursor over an in-memory table.
#[derive(Debug)]
pub struct MemoryCursor {
    columns: ColumnMetadata,
    source: RowSource,
    position: usize,
    limit: Option<usize>,
    row_latency: Option<Duration>,
    fail_at: Option<usize>,
    closed: bool,
}

impl MemoryCursor {
    pub fn new(columns: ColumnMetadata, source: RowSource) -> Self {
        Self {
            columns,
            source,
            position: 0,
            limit: None,
            row_latency: None,
            fail_at: None,
            closed: false,
        }
    }

    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_row_latency(mut self, latency: Option<Duration>) -> Self {
        self.row_latency = latency;
        self
    }

    /// Reading row `index` fails as if the connection dropped.
    pub fn with_failure_at(mut self, index: Option<usize>) -> Self {
        self.fail_at = index;
        self
    }

    fn end(&self) -> Option<usize> {
        match (self.source.len(), self.limit) {
            (Some(len), Some(limit)) => Some(len.min(limit)),
            (len, None) => len,
            (None, limit) => limit,
        }
    }
}

#[async_trait]
impl RowCursor for MemoryCursor {
    fn columns(&self) -> Result<ColumnMetadata, CursorError> {
        Ok(self.columns.clone())
    }

    async fn has_next(&mut self) -> bool {
        !self.closed && self.end().is_none_or(|end| self.position < end)
    }

    async fn next(&mut self) -> Result<Row, CursorError> {
        if self.closed {
            return Err(CursorError::Fetch("cursor is closed".into()));
        }
        if let Some(latency) = self.row_latency {
            tokio::time::sleep(latency).await;
        }
        if self.fail_at == Some(self.position) {
            return Err(CursorError::Fetch(format!(
                "connection reset while reading row {}",
                self.position
            )));
        }
        if self.end().is_some_and(|end| self.position >= end) {
            return Err(CursorError::Exhausted);
        }
        let row = self.source.row(self.position).ok_or(CursorError::Exhausted)?;
        self.position += 1;
        Ok(row)
    }

    async fn close(&mut self) -> Result<(), CursorError> {
        self.closed = true;
        Ok(())
    }
}
