use crate::{
    commands::{Commands, GlobalArgs},
    config::Settings,
    env::EnvManager,
    error::CliError,
    logging::LogTarget,
    output::QuerySummary,
    shutdown::{ExitCode, ShutdownCoordinator},
};
use browser::BrowserConfig;
use clap::Parser;
use std::{error::Error, io::BufWriter};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

mod commands;
mod config;
mod conn;
mod env;
mod error;
mod logging;
mod output;
mod shutdown;

#[derive(Parser)]
#[command(name = "rowscope", version, about = "Terminal SQL client with streamed results")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let verbose = cli.global.verbose;

    let shutdown = ShutdownCoordinator::new(CancellationToken::new());
    shutdown.register_handlers();

    let code = match run(cli, &shutdown).await {
        Ok(()) if shutdown.is_shutdown_requested() => ExitCode::ShutdownRequested,
        Ok(()) => ExitCode::Success,
        Err(CliError::ShutdownRequested) => ExitCode::ShutdownRequested,
        Err(err) => {
            error!(error = %err, "Command failed");
            report(&err, verbose);
            ExitCode::GeneralError
        }
    };

    std::process::exit(code.as_i32());
}

async fn run(cli: Cli, shutdown: &ShutdownCoordinator) -> Result<(), CliError> {
    let command = cli.command.unwrap_or(Commands::Browse { query: None });
    if let Commands::Version = command {
        print_version();
        return Ok(());
    }

    let env = EnvManager::load(cli.global.env_file.as_deref())?;
    let settings = Settings::resolve(&cli.global, &env)?;

    let target = match command {
        Commands::Browse { .. } => LogTarget::File(settings.log_file.clone()),
        _ => LogTarget::Stderr,
    };
    logging::init(settings.log_level.as_deref(), &target)?;
    debug!(?settings.stream, ?target, "Settings resolved");

    let executor = conn::connect(settings.connection_url()?).await?;

    match command {
        Commands::Browse { query } => {
            let config = BrowserConfig {
                options: settings.stream,
                no_color: settings.no_color,
                initial_query: query,
            };
            browser::run(executor, config, shutdown.cancel_token()).await?;
        }
        Commands::Query { sql, format } => {
            let out = BufWriter::new(std::io::stdout());
            let summary = output::run_query(
                executor.as_ref(),
                &sql,
                settings.stream,
                format,
                out,
                shutdown.cancel_token(),
            )
            .await?;
            match summary {
                QuerySummary::Rows(rows) => info!(rows, "Query finished"),
                QuerySummary::Updated(count) => info!(count, "Statement finished"),
            }
        }
        Commands::TestConn => {
            conn::ping(executor.as_ref()).await?;
            println!("Connection OK");
        }
        Commands::Version => {}
    }

    Ok(())
}

fn print_version() {
    println!("rowscope {}", env!("CARGO_PKG_VERSION"));
    println!(
        "platform: {}-{}",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
    println!("drivers: postgres, memory");
}

fn report(err: &CliError, verbose: bool) {
    eprintln!("error: {err}");
    if !verbose {
        return;
    }
    let mut source = err.source();
    while let Some(cause) = source {
        eprintln!("  caused by: {cause}");
        source = cause.source();
    }
}
