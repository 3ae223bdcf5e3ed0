use crate::{commands::GlobalArgs, env::EnvManager, error::CliError};
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use stream_core::StreamOptions;

pub const CONFIG_DIR: &str = ".rowscope";
pub const CONFIG_FILE: &str = "config.toml";
pub const LOG_FILE: &str = "rowscope.log";
pub const DEFAULT_LOG_LEVEL: &str = "error";

const LOG_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

/// Contents of `config.toml`. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub url: Option<String>,
    pub stream: StreamSection,
    pub log: LogSection,
    pub ui: UiSection,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StreamSection {
    pub batch_limit: Option<usize>,
    pub drain_deadline_ms: Option<u64>,
    pub close_wait_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogSection {
    pub level: Option<String>,
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UiSection {
    pub no_color: Option<bool>,
}

impl FileConfig {
    pub fn parse(content: &str) -> Result<Self, CliError> {
        Ok(toml::from_str(content)?)
    }

    /// Reads `explicit`, or the default file when none is given. Only the
    /// default file may be absent.
    pub fn load(explicit: Option<&Path>) -> Result<Self, CliError> {
        match explicit {
            Some(path) => {
                if !path.is_file() {
                    return Err(CliError::ConfigNotFound(path.display().to_string()));
                }
                Self::parse(&fs::read_to_string(path)?)
            }
            None => match default_config_path() {
                Some(path) if path.is_file() => Self::parse(&fs::read_to_string(path)?),
                _ => Ok(Self::default()),
            },
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_DIR).join(CONFIG_FILE))
}

pub fn default_log_path() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(CONFIG_DIR))
        .unwrap_or_default()
        .join(LOG_FILE)
}

/// Effective settings after layering defaults, the config file, the
/// environment and command-line flags.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub url: Option<String>,
    pub stream: StreamOptions,
    /// `None` defers to `RUST_LOG`.
    pub log_level: Option<String>,
    pub log_file: PathBuf,
    pub no_color: bool,
    pub verbose: bool,
    pub demo: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            url: None,
            stream: StreamOptions::default(),
            log_level: None,
            log_file: default_log_path(),
            no_color: false,
            verbose: false,
            demo: false,
        }
    }
}

impl Settings {
    pub fn resolve(args: &GlobalArgs, env: &EnvManager) -> Result<Self, CliError> {
        let file = FileConfig::load(args.config.as_deref())?;
        Self::layered(file, env, args)
    }

    pub fn layered(file: FileConfig, env: &EnvManager, args: &GlobalArgs) -> Result<Self, CliError> {
        let mut settings = Self::default();
        settings.apply_file(file);
        settings.apply_env(env)?;
        settings.apply_args(args);
        settings.validate()?;
        Ok(settings)
    }

    fn apply_file(&mut self, file: FileConfig) {
        if let Some(url) = file.url {
            self.url = Some(url);
        }
        if let Some(limit) = file.stream.batch_limit {
            self.stream.batch_limit = limit;
        }
        if let Some(ms) = file.stream.drain_deadline_ms {
            self.stream.drain_deadline = Duration::from_millis(ms);
        }
        if let Some(ms) = file.stream.close_wait_ms {
            self.stream.close_wait_budget = Duration::from_millis(ms);
        }
        if let Some(level) = file.log.level {
            self.log_level = Some(level);
        }
        if let Some(path) = file.log.file {
            self.log_file = path;
        }
        if let Some(no_color) = file.ui.no_color {
            self.no_color = no_color;
        }
    }

    fn apply_env(&mut self, env: &EnvManager) -> Result<(), CliError> {
        if let Some(url) = env.get("ROWSCOPE_URL") {
            self.url = Some(url.to_string());
        }
        if let Some(limit) = parse_env::<usize>(env, "ROWSCOPE_BATCH_LIMIT")? {
            self.stream.batch_limit = limit;
        }
        if let Some(ms) = parse_env::<u64>(env, "ROWSCOPE_DRAIN_DEADLINE_MS")? {
            self.stream.drain_deadline = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_env::<u64>(env, "ROWSCOPE_CLOSE_WAIT_MS")? {
            self.stream.close_wait_budget = Duration::from_millis(ms);
        }
        if let Some(level) = env.get("ROWSCOPE_LOG_LEVEL") {
            self.log_level = Some(level.to_string());
        }
        Ok(())
    }

    fn apply_args(&mut self, args: &GlobalArgs) {
        if let Some(url) = &args.url {
            self.url = Some(url.clone());
        }
        if let Some(limit) = args.batch_limit {
            self.stream.batch_limit = limit;
        }
        if let Some(level) = &args.log_level {
            self.log_level = Some(level.clone());
        }
        if let Some(path) = &args.log_file {
            self.log_file = path.clone();
        }
        self.no_color |= args.no_color;
        self.verbose |= args.verbose;
        self.demo |= args.demo;
    }

    fn validate(&mut self) -> Result<(), CliError> {
        self.stream
            .validate()
            .map_err(|err| CliError::Config(err.to_string()))?;

        if let Some(level) = &mut self.log_level {
            let normalized = level.trim().to_ascii_lowercase();
            if !LOG_LEVELS.contains(&normalized.as_str()) {
                return Err(CliError::Config(format!(
                    "unknown log level '{level}', expected one of {}",
                    LOG_LEVELS.join("|")
                )));
            }
            *level = normalized;
        }
        Ok(())
    }

    /// Connection URL to open: the demo tables when `--demo` is set.
    pub fn connection_url(&self) -> Result<&str, CliError> {
        if self.demo {
            return Ok("memory://demo");
        }
        self.url.as_deref().ok_or(CliError::MissingUrl)
    }
}

fn parse_env<T: std::str::FromStr>(env: &EnvManager, key: &str) -> Result<Option<T>, CliError> {
    env.get(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|_| CliError::Config(format!("{key} must be a non-negative integer, got '{raw}'")))
        })
        .transpose()
}
