use browser::BrowserError;
use connectors::ConnectorError;
use stream_core::{QueryError, SessionError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("configuration not found: {0}")]
    ConfigNotFound(String),

    #[error("Failed to parse the configuration file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("No connection URL configured; pass --url, set ROWSCOPE_URL or use --demo")]
    MissingUrl,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Connection failed: {0}")]
    Connector(#[from] ConnectorError),

    #[error("{0}")]
    Query(#[from] QueryError),

    #[error(transparent)]
    Session(#[from] SessionError),

    /// The stream ended with a read error after delivering some rows.
    #[error("Query failed while reading rows: {0}")]
    Fetch(String),

    #[error(transparent)]
    Browser(#[from] BrowserError),

    #[error("Failed to write CSV output: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to serialize data to JSON: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    #[error("Failed to initialize logging: {0}")]
    Logging(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),

    #[error("Shutdown requested")]
    ShutdownRequested,
}
