use crate::output::OutputFormat;
use clap::{Args, Subcommand};
use std::path::PathBuf;

/// Options shared by every command. Each one overrides the configuration
/// file and the environment.
#[derive(Debug, Clone, Default, Args)]
pub struct GlobalArgs {
    /// Configuration file [default: ~/.rowscope/config.toml]
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Extra KEY=VALUE file loaded on top of the process environment
    #[arg(long, global = true)]
    pub env_file: Option<PathBuf>,

    /// Connection URL, e.g. postgres://user@localhost/db or memory://demo
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Rows fetched per background run
    #[arg(long, global = true)]
    pub batch_limit: Option<usize>,

    /// One of trace, debug, info, warn, error, off
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log file used while the browser owns the terminal
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Render without colors
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Print the full error chain on failure
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Use the built-in demo tables instead of a server
    #[arg(long, global = true)]
    pub demo: bool,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Open the interactive SQL browser (default)
    Browse {
        /// Statement placed in the editor at startup
        #[arg(long)]
        query: Option<String>,
    },
    /// Run one statement and print its result
    Query {
        /// The statement to run
        sql: String,

        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Connect and run `SELECT 1`
    TestConn,
    /// Print version information
    Version,
}
