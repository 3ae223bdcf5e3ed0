use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Terminal I/O error: {0}")]
    Io(#[from] std::io::Error),
}
