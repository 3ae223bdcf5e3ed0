use crate::{
    error::ConnectorError,
    sql::postgres::{
        cursor::PgCursor,
        utils::{connect_client, query_error},
    },
};
use async_trait::async_trait;
use model::ColumnMetadata;
use stream_core::{QueryError, QueryExecutor, QueryOutcome};
use tokio_postgres::{Client, types::ToSql};
use tracing::debug;

/// Runs statements on one Postgres connection.
pub struct PgExecutor {
    client: Client,
}

impl PgExecutor {
    pub async fn connect(url: &str) -> Result<Self, ConnectorError> {
        let client = connect_client(url).await?;
        Ok(Self { client })
    }
}

#[async_trait]
impl QueryExecutor for PgExecutor {
    /// Prepares `text` first so the result shape is known before anything
    /// runs. Row statements stream through an unnamed portal, the rest report
    /// their affected row count.
    async fn execute(&self, text: &str) -> Result<QueryOutcome, QueryError> {
        let statement = self.client.prepare(text).await.map_err(query_error)?;

        if statement.columns().is_empty() {
            let affected = self
                .client
                .execute(&statement, &[])
                .await
                .map_err(query_error)?;
            debug!(affected, "Statement executed");
            return Ok(QueryOutcome::Updated(affected));
        }

        let columns = ColumnMetadata::new(statement.columns().iter().map(|c| c.name()));
        let stream = self
            .client
            .query_raw(&statement, std::iter::empty::<&(dyn ToSql + Sync)>())
            .await
            .map_err(query_error)?;
        debug!(columns = columns.len(), "Row stream opened");

        Ok(QueryOutcome::Rows(Box::new(PgCursor::new(columns, stream))))
    }
}
