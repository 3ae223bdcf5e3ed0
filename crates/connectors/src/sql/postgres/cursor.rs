use crate::sql::postgres::coercion;
use async_trait::async_trait;
use futures_util::StreamExt;
use model::{ColumnMetadata, Row};
use std::pin::Pin;
use stream_core::{CursorError, RowCursor};
use tokio_postgres::{Row as PgRow, RowStream};
use tracing::debug;

/// Row cursor over a streaming Postgres portal.
///
/// Rows are read one message at a time; `has_next` pulls the next row from
/// the wire and keeps it until `next` hands it out.
pub struct PgCursor {
    columns: ColumnMetadata,
    stream: Option<Pin<Box<RowStream>>>,
    peeked: Option<Result<PgRow, tokio_postgres::Error>>,
    read: usize,
}

impl PgCursor {
    pub(crate) fn new(columns: ColumnMetadata, stream: RowStream) -> Self {
        Self {
            columns,
            stream: Some(Box::pin(stream)),
            peeked: None,
            read: 0,
        }
    }
}

#[async_trait]
impl RowCursor for PgCursor {
    fn columns(&self) -> Result<ColumnMetadata, CursorError> {
        Ok(self.columns.clone())
    }

    async fn has_next(&mut self) -> bool {
        if self.peeked.is_some() {
            return true;
        }
        let Some(stream) = self.stream.as_mut() else {
            return false;
        };
        match stream.next().await {
            Some(item) => {
                self.peeked = Some(item);
                true
            }
            None => {
                self.stream = None;
                false
            }
        }
    }

    async fn next(&mut self) -> Result<Row, CursorError> {
        if !self.has_next().await {
            return Err(CursorError::Exhausted);
        }
        let Some(item) = self.peeked.take() else {
            return Err(CursorError::Exhausted);
        };
        // A transport error ends the stream.
        let pg_row = item.map_err(|e| {
            self.stream = None;
            CursorError::Fetch(e.to_string())
        })?;
        self.read += 1;
        coercion::to_row(&pg_row).map_err(|e| CursorError::Fetch(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), CursorError> {
        self.peeked = None;
        if self.stream.take().is_some() {
            debug!(rows = self.read, "Dropping unfinished Postgres row stream");
        }
        Ok(())
    }
}
