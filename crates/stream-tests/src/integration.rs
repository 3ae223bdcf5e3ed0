#[cfg(test)]
mod tests {
    use crate::{TEST_PG_URL, pg_client, reset_postgres_schema, utils::drain_to_end};
    use connectors::{PgExecutor, connect};
    use model::Value;
    use std::time::Duration;
    use stream_core::{
        CloseOutcome, IterationSession, QueryError, QueryExecutor, QueryOutcome, StreamOptions,
    };
    use tracing_test::traced_test;

    const DEADLINE: Duration = Duration::from_millis(200);

    async fn seed_items(count: i64) {
        reset_postgres_schema().await;
        pg_client()
            .await
            .batch_execute(&format!(
                r#"
                CREATE TABLE items (
                    id BIGINT PRIMARY KEY,
                    label TEXT,
                    price NUMERIC(10, 2),
                    created_at TIMESTAMP NOT NULL DEFAULT '2024-01-01 00:00:00'
                );
                INSERT INTO items (id, label, price)
                SELECT n, CASE WHEN n % 10 = 0 THEN NULL ELSE 'item-' || n END, n * 1.25
                FROM generate_series(1, {count}) AS n;
            "#
            ))
            .await
            .expect("seed items");
    }

    async fn rows(executor: &PgExecutor, sql: &str) -> Box<dyn stream_core::RowCursor> {
        match executor.execute(sql).await.expect("execute") {
            QueryOutcome::Rows(cursor) => cursor,
            other => panic!("expected rows, got {other:?}"),
        }
    }

    // Scenario: a table larger than several batches is streamed through a session.
    // Expected Outcome: every row arrives once, in order, and values keep their types.
    #[ignore = "requires PostgreSQL at TEST_PG_URL"]
    #[traced_test]
    #[tokio::test]
    async fn streams_a_large_table_in_batches() {
        seed_items(175).await;
        let executor = PgExecutor::connect(TEST_PG_URL).await.unwrap();

        let cursor = rows(&executor, "SELECT id, label, price, created_at FROM items ORDER BY id").await;
        let session = IterationSession::start(cursor, StreamOptions::default()).unwrap();
        assert_eq!(session.columns().names(), ["id", "label", "price", "created_at"]);

        let collected = drain_to_end(&session, DEADLINE).await;
        assert_eq!(collected.rows.len(), 175);
        assert_eq!(collected.finished_events(), 1);
        assert_eq!(collected.error(), None);
        assert_eq!(collected.rows[0][0], Value::Int(1));
        assert_eq!(collected.rows[0][1], Value::String("item-1".into()));
        assert_eq!(collected.rows[0][2], Value::String("1.25".into()));
        assert_eq!(collected.rows[9][1], Value::Null);
        assert!(matches!(collected.rows[0][3], Value::Timestamp(_)));
        assert_eq!(session.metrics().snapshot().fetch_runs, 4);

        assert_eq!(session.wait_closed().await, Some(CloseOutcome::Closed));
    }

    // Scenario: the user cancels while most of the result is still on the server.
    // Expected Outcome: the session closes and the connection stays usable.
    #[ignore = "requires PostgreSQL at TEST_PG_URL"]
    #[tokio::test]
    async fn cancel_releases_the_portal() {
        seed_items(5_000).await;
        let executor = PgExecutor::connect(TEST_PG_URL).await.unwrap();

        let cursor = rows(&executor, "SELECT * FROM items ORDER BY id").await;
        let session = IterationSession::start(cursor, StreamOptions::default()).unwrap();
        let first = session.drain(DEADLINE).await.unwrap();
        assert_eq!(first.rows.len(), 50);

        assert!(session.cancel());
        assert_eq!(session.wait_closed().await, Some(CloseOutcome::Closed));

        let cursor = rows(&executor, "SELECT 1").await;
        let session = IterationSession::start(cursor, StreamOptions::default()).unwrap();
        let collected = drain_to_end(&session, DEADLINE).await;
        assert_eq!(collected.rows.len(), 1);
    }

    // Scenario: statements without a result set.
    // Expected Outcome: the affected row count is reported.
    #[ignore = "requires PostgreSQL at TEST_PG_URL"]
    #[tokio::test]
    async fn update_reports_affected_rows() {
        seed_items(30).await;
        let executor = connect(TEST_PG_URL).await.unwrap();

        let outcome = executor
            .execute("UPDATE items SET label = 'x' WHERE id <= 12")
            .await
            .unwrap();
        assert!(matches!(outcome, QueryOutcome::Updated(12)));
    }

    // Scenario: the statement references a missing relation.
    // Expected Outcome: the server message is returned as an execution error.
    #[ignore = "requires PostgreSQL at TEST_PG_URL"]
    #[tokio::test]
    async fn server_errors_are_execution_errors() {
        reset_postgres_schema().await;
        let executor = connect(TEST_PG_URL).await.unwrap();

        let err = executor.execute("SELECT * FROM missing").await.unwrap_err();
        match err {
            QueryError::Execution(message) => {
                assert!(message.contains("does not exist"), "{message}")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
