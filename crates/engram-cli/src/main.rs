use std::path::PathBuf;

use clap::{Parser, Subcommand};
use engram::config::Config;
use engram_cli::commands::{ConfigCommand, ReplCommand, ReplayCommand};
use engram_cli::error::CliResult;
use engram_cli::output::OutputFormat;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "engram")]
#[command(about = "Engram - bounded, tiered memory store")]
#[command(version)]
pub struct Cli {
    #[clap(long, short, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[clap(long, short = 'c', global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    #[clap(about = "Interactive session reading commands from stdin (default)")]
    Repl(ReplCommand),

    #[clap(about = "Run commands from a file against a fresh store")]
    Replay(ReplayCommand),

    #[clap(about = "Configuration commands")]
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> CliResult<()> {
    init_logging();

    let cli = Cli::parse();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Table
    };

    match cli.command {
        Some(Command::Config(cmd)) => cmd.execute(cli.config.as_deref(), format),
        Some(Command::Replay(cmd)) => {
            let config = Config::discover(cli.config.as_deref())?;
            cmd.execute(&config, format).await
        }
        Some(Command::Repl(cmd)) => {
            let config = Config::discover(cli.config.as_deref())?;
            cmd.execute(&config, format).await
        }
        None => {
            let config = Config::discover(cli.config.as_deref())?;
            ReplCommand::default().execute(&config, format).await
        }
    }
}

/// Logs go to stderr so stdout carries only command output.
fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,engram=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
