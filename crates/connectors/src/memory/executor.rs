use crate::memory::{
    cursor::MemoryCursor,
    table::{self, MemoryTable},
};
use async_trait::async_trait;
use model::{ColumnMetadata, Row, Value};
use std::{
    collections::BTreeMap,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};
use stream_core::{QueryError, QueryExecutor, QueryOutcome};
use tracing::debug;

/// Executor over named in-memory tables.
///
/// Understands a small statement set:
/// `SELECT * FROM <table> [LIMIT <n>]`, `SELECT <integer>`, `SHOW TABLES` and
/// `DELETE FROM <table>`.
#[derive(Debug, Default)]
pub struct MemoryExecutor {
    tables: RwLock<BTreeMap<String, MemoryTable>>,
    row_latency: Option<Duration>,
    fail_after: Option<usize>,
}

impl MemoryExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// The `users`, `events` and `ticks` tables.
    pub fn demo() -> Self {
        Self::new()
            .with_table("users", table::users())
            .with_table("events", table::events())
            .with_table("ticks", table::ticks())
    }

    pub fn with_table(self, name: &str, table: MemoryTable) -> Self {
        self.write().insert(name.to_ascii_lowercase(), table);
        self
    }

    /// Every cursor sleeps this long before each row.
    pub fn with_row_latency(mut self, latency: Duration) -> Self {
        self.row_latency = Some(latency);
        self
    }

    /// Every cursor fails when reading row `index`.
    pub fn with_failure_after(mut self, index: usize) -> Self {
        self.fail_after = Some(index);
        self
    }

    pub fn table_names(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    fn cursor(&self, table: &MemoryTable, limit: Option<usize>) -> MemoryCursor {
        MemoryCursor::new(table.columns.clone(), table.rows.clone())
            .with_limit(limit)
            .with_row_latency(self.row_latency)
            .with_failure_at(self.fail_after)
    }

    fn lookup(&self, name: &str) -> Result<MemoryTable, QueryError> {
        self.read()
            .get(&name.to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| QueryError::Execution(format!("relation \"{name}\" does not exist")))
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, MemoryTable>> {
        self.tables.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, MemoryTable>> {
        self.tables.write().unwrap_or_else(|p| p.into_inner())
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Statement {
    SelectAll { table: String, limit: Option<usize> },
    SelectLiteral(i64),
    ShowTables,
    Delete { table: String },
}

fn parse(text: &str) -> Result<Statement, QueryError> {
    let text = text.trim().trim_end_matches(';').trim();
    let words: Vec<&str> = text.split_whitespace().collect();
    let upper: Vec<String> = words.iter().map(|w| w.to_ascii_uppercase()).collect();
    let upper: Vec<&str> = upper.iter().map(String::as_str).collect();

    match upper.as_slice() {
        ["SELECT", "*", "FROM", _] => Ok(Statement::SelectAll {
            table: words[3].to_string(),
            limit: None,
        }),
        ["SELECT", "*", "FROM", _, "LIMIT", n] => Ok(Statement::SelectAll {
            table: words[3].to_string(),
            limit: Some(parse_number(n)?),
        }),
        ["SELECT", n] if n.parse::<i64>().is_ok() => {
            Ok(Statement::SelectLiteral(n.parse().unwrap_or_default()))
        }
        ["SHOW", "TABLES"] => Ok(Statement::ShowTables),
        ["DELETE", "FROM", _] => Ok(Statement::Delete {
            table: words[2].to_string(),
        }),
        [] => Err(QueryError::Execution("empty statement".into())),
        _ => Err(QueryError::Unsupported(text.to_string())),
    }
}

fn parse_number(raw: &str) -> Result<usize, QueryError> {
    raw.parse()
        .map_err(|_| QueryError::Execution(format!("invalid LIMIT value '{raw}'")))
}

#[async_trait]
impl QueryExecutor for MemoryExecutor {
    async fn execute(&self, text: &str) -> Result<QueryOutcome, QueryError> {
        let statement = parse(text)?;
        debug!(?statement, "Executing in-memory statement");

        let cursor = match statement {
            Statement::SelectAll { table, limit } => {
                let table = self.lookup(&table)?;
                self.cursor(&table, limit)
            }
            Statement::SelectLiteral(n) => {
                let table = MemoryTable::fixed(
                    ColumnMetadata::new(["?column?"]),
                    vec![Row::new(vec![Value::Int(n)])],
                );
                self.cursor(&table, None)
            }
            Statement::ShowTables => {
                let rows = self
                    .table_names()
                    .into_iter()
                    .map(|name| Row::new(vec![Value::String(name)]))
                    .collect();
                let table = MemoryTable::fixed(ColumnMetadata::new(["table_name"]), rows);
                self.cursor(&table, None)
            }
            Statement::Delete { table } => {
                let existing = self.lookup(&table)?;
                let affected = existing.rows.len().ok_or_else(|| {
                    QueryError::Execution(format!("cannot delete from unbounded table \"{table}\""))
                })?;
                self.write().insert(
                    table.to_ascii_lowercase(),
                    MemoryTable::fixed(existing.columns, Vec::new()),
                );
                return Ok(QueryOutcome::Updated(affected as u64));
            }
        };

        Ok(QueryOutcome::Rows(Box::new(cursor)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect(executor: &MemoryExecutor, sql: &str) -> Vec<Row> {
        let QueryOutcome::Rows(mut cursor) = executor.execute(sql).await.unwrap() else {
            panic!("expected rows for {sql}");
        };
        let mut rows = Vec::new();
        while cursor.has_next().await {
            rows.push(cursor.next().await.unwrap());
        }
        rows
    }

    #[test]
    fn parses_supported_statements() {
        assert_eq!(
            parse("select * from Users limit 5;").unwrap(),
            Statement::SelectAll {
                table: "Users".into(),
                limit: Some(5)
            }
        );
        assert_eq!(parse("SELECT 1").unwrap(), Statement::SelectLiteral(1));
        assert_eq!(parse("show tables").unwrap(), Statement::ShowTables);
        assert!(matches!(
            parse("UPDATE users SET a = 1"),
            Err(QueryError::Unsupported(_))
        ));
        assert!(parse("   ").is_err());
    }

    #[tokio::test]
    async fn selects_from_demo_tables() {
        let executor = MemoryExecutor::demo();
        assert_eq!(collect(&executor, "SELECT * FROM users").await.len(), 250);
        assert_eq!(collect(&executor, "SELECT * FROM ticks LIMIT 10").await.len(), 10);
        assert_eq!(
            collect(&executor, "SHOW TABLES").await,
            vec![
                Row::new(vec![Value::String("events".into())]),
                Row::new(vec![Value::String("ticks".into())]),
                Row::new(vec![Value::String("users".into())]),
            ]
        );
    }

    #[tokio::test]
    async fn unknown_table_is_an_execution_error() {
        let executor = MemoryExecutor::demo();
        let err = executor.execute("SELECT * FROM nope").await.unwrap_err();
        assert_eq!(err.to_string(), "relation \"nope\" does not exist");
    }

    #[tokio::test]
    async fn delete_reports_affected_rows() {
        let executor = MemoryExecutor::demo();
        assert!(matches!(
            executor.execute("DELETE FROM users").await,
            Ok(QueryOutcome::Updated(250))
        ));
        assert!(collect(&executor, "SELECT * FROM users").await.is_empty());
        assert!(executor.execute("DELETE FROM ticks").await.is_err());
    }
}
