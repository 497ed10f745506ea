use std::io::Write;
use std::path::Path;

use clap::{Parser, Subcommand};
use engram::config::{Config, default_config_path};

use crate::error::CliResult;
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
pub struct ConfigCommand {
    #[clap(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigSubcommand {
    #[clap(about = "Print the effective configuration")]
    Show,

    #[clap(about = "Print the config file location")]
    Path,
}

impl ConfigCommand {
    pub fn execute(&self, explicit: Option<&Path>, format: OutputFormat) -> CliResult<()> {
        let mut stdout = std::io::stdout().lock();
        match self.command {
            ConfigSubcommand::Show => show(&Config::discover(explicit)?, format, &mut stdout),
            ConfigSubcommand::Path => path(explicit, format, &mut stdout),
        }
    }
}

fn show(config: &Config, format: OutputFormat, out: &mut dyn Write) -> CliResult<()> {
    match format {
        OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(config)?)?,
        OutputFormat::Table => write!(out, "{}", toml::to_string_pretty(config)?)?,
    }
    Ok(())
}

fn path(explicit: Option<&Path>, format: OutputFormat, out: &mut dyn Write) -> CliResult<()> {
    let path = explicit
        .map(Path::to_path_buf)
        .or_else(default_config_path)
        .ok_or("Could not determine home directory")?;
    let exists = path.exists();

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "path": path.display().to_string(),
                "exists": exists,
            });
            writeln!(out, "{}", serde_json::to_string_pretty(&output)?)?;
        }
        OutputFormat::Table => {
            let note = if exists { "" } else { " (not found, using defaults)" };
            writeln!(out, "{}{}", path.display(), note)?;
        }
    }
    Ok(())
}
