use std::io::{IsTerminal, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use engram::MemoryStore;
use engram::config::Config;
use engram::storage::ConsolidationScheduler;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::error::CliResult;
use crate::output::OutputFormat;
use crate::session::{Flow, Session};

const PROMPT: &str = "engram> ";

#[derive(Parser, Debug, Default)]
pub struct ReplCommand {
    #[clap(long, help = "Run periodic consolidation even if disabled in config")]
    pub schedule: bool,
}

impl ReplCommand {
    pub async fn execute(&self, config: &Config, format: OutputFormat) -> CliResult<()> {
        let store = Arc::new(MemoryStore::new(config)?);
        let scheduler = (self.schedule || config.scheduler.enabled).then(|| {
            ConsolidationScheduler::spawn(Arc::clone(&store), config.scheduler.interval())
        });

        let session = Session::new(store, format);
        let interactive = std::io::stdin().is_terminal() && format == OutputFormat::Table;
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = std::io::stdout();

        loop {
            if interactive {
                write!(stdout, "{PROMPT}")?;
                stdout.flush()?;
            }
            let Some(line) = lines.next_line().await? else {
                break;
            };
            if session.execute_line(&line, &mut stdout)? == Flow::Quit {
                break;
            }
        }

        if let Some(scheduler) = scheduler {
            scheduler.shutdown().await;
        }
        Ok(())
    }
}

#[derive(Parser, Debug)]
pub struct ReplayCommand {
    #[clap(help = "File of protocol commands, one per line")]
    pub file: PathBuf,
}

impl ReplayCommand {
    pub async fn execute(&self, config: &Config, format: OutputFormat) -> CliResult<()> {
        let mut stdout = std::io::stdout().lock();
        self.run(config, format, &mut stdout)
    }

    /// Replay the file against a fresh store, writing results to `out`.
    pub fn run(&self, config: &Config, format: OutputFormat, out: &mut dyn Write) -> CliResult<()> {
        let script = std::fs::read_to_string(&self.file).map_err(|e| {
            format!("Failed to read {}: {}", self.file.display(), e)
        })?;
        tracing::debug!(file = %self.file.display(), "Replaying commands");

        let session = Session::new(Arc::new(MemoryStore::new(config)?), format);
        for line in script.lines() {
            if session.execute_line(line, out)? == Flow::Quit {
                break;
            }
        }
        Ok(())
    }
}
