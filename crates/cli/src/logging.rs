use crate::{config::DEFAULT_LOG_LEVEL, error::CliError};
use std::{
    fs::{self, OpenOptions},
    path::PathBuf,
    sync::Mutex,
};
use tracing_subscriber::EnvFilter;

/// Where log lines go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    /// Used while the browser owns the terminal.
    File(PathBuf),
}

/// Level from the resolved settings, then `RUST_LOG`, then `error`.
pub fn filter(level: Option<&str>) -> Result<EnvFilter, CliError> {
    match level {
        Some(level) => EnvFilter::try_new(level).map_err(|err| CliError::Logging(err.to_string())),
        None => Ok(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL))),
    }
}

pub fn init(level: Option<&str>, target: &LogTarget) -> Result<(), CliError> {
    let filter = filter(level)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    let result = match target {
        LogTarget::Stderr => builder.with_writer(std::io::stderr).try_init(),
        LogTarget::File(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
    };

    result.map_err(|err| CliError::Logging(err.to_string()))
}
