use crate::{
    error::ConnectorError, memory::executor::MemoryExecutor, sql::postgres::executor::PgExecutor,
};
use async_trait::async_trait;
use stream_core::{QueryError, QueryExecutor, QueryOutcome};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverKind {
    Postgres,
    Memory,
}

impl DriverKind {
    /// Picks the driver from the URL scheme.
    pub fn from_url(url: &str) -> Result<Self, ConnectorError> {
        let Some((scheme, _)) = url.split_once("://") else {
            return Err(ConnectorError::InvalidUrl(format!(
                "missing scheme in '{url}'"
            )));
        };
        match scheme.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(DriverKind::Postgres),
            "memory" => Ok(DriverKind::Memory),
            other => Err(ConnectorError::UnsupportedDriver(other.to_string())),
        }
    }
}

/// A connected executor of any supported driver.
pub enum Adapter {
    Postgres(PgExecutor),
    Memory(MemoryExecutor),
}

impl Adapter {
    pub fn kind(&self) -> DriverKind {
        match self {
            Adapter::Postgres(_) => DriverKind::Postgres,
            Adapter::Memory(_) => DriverKind::Memory,
        }
    }

    fn executor(&self) -> &dyn QueryExecutor {
        match self {
            Adapter::Postgres(executor) => executor,
            Adapter::Memory(executor) => executor,
        }
    }
}

#[async_trait]
impl QueryExecutor for Adapter {
    async fn execute(&self, text: &str) -> Result<QueryOutcome, QueryError> {
        self.executor().execute(text).await
    }
}

/// Connects to `url`.
///
/// `postgres://` and `postgresql://` URLs open a network connection.
/// `memory://demo` serves the built-in demo tables and `memory://` an empty
/// store.
pub async fn connect(url: &str) -> Result<Adapter, ConnectorError> {
    let adapter = match DriverKind::from_url(url)? {
        DriverKind::Postgres => Adapter::Postgres(PgExecutor::connect(url).await?),
        DriverKind::Memory => {
            let name = url.split_once("://").map(|(_, rest)| rest).unwrap_or("");
            match name {
                "demo" => Adapter::Memory(MemoryExecutor::demo()),
                "" => Adapter::Memory(MemoryExecutor::new()),
                other => {
                    return Err(ConnectorError::InvalidUrl(format!(
                        "unknown memory store '{other}'"
                    )));
                }
            }
        }
    };
    info!(driver = ?adapter.kind(), "Connected");
    Ok(adapter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_from_scheme() {
        assert_eq!(
            DriverKind::from_url("postgres://u@localhost/db").unwrap(),
            DriverKind::Postgres
        );
        assert_eq!(
            DriverKind::from_url("PostgreSQL://localhost").unwrap(),
            DriverKind::Postgres
        );
        assert_eq!(
            DriverKind::from_url("memory://demo").unwrap(),
            DriverKind::Memory
        );
        assert!(matches!(
            DriverKind::from_url("mysql://localhost"),
            Err(ConnectorError::UnsupportedDriver(s)) if s == "mysql"
        ));
        assert!(matches!(
            DriverKind::from_url("localhost:5432"),
            Err(ConnectorError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn connects_to_demo_store() {
        let adapter = connect("memory://demo").await.unwrap();
        assert_eq!(adapter.kind(), DriverKind::Memory);
        assert!(matches!(
            adapter.execute("SHOW TABLES").await,
            Ok(QueryOutcome::Rows(_))
        ));
        assert!(connect("memory://nope").await.is_err());
    }
}
