//! Line protocol shared by `repl` and `replay`
//!
//! Each non-empty line is one command; `#` starts a comment line.

use clap::{Parser, Subcommand};
use engram::Tier;

#[derive(Parser, Debug)]
#[command(
    no_binary_name = true,
    disable_help_subcommand = true,
    disable_help_flag = true,
    disable_version_flag = true
)]
struct Line {
    #[command(subcommand)]
    request: Request,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Request {
    /// store [--tier T] [--tag x]... <importance> <text>
    #[command(allow_negative_numbers = true)]
    Store {
        #[arg(long, default_value = "short_term")]
        tier: Tier,
        #[arg(long = "tag")]
        tags: Vec<String>,
        importance: f32,
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        text: Vec<String>,
    },
    /// retrieve <limit> <query>
    Retrieve {
        limit: usize,
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        query: Vec<String>,
    },
    Consolidate,
    Stats,
    /// show <tier>
    Show { tier: Tier },
    /// evictions [limit]
    Evictions {
        #[arg(default_value_t = 10)]
        limit: usize,
    },
    /// reinforce <id> <factor>
    Reinforce { id: u64, factor: f32 },
    Help,
    #[command(alias = "exit")]
    Quit,
}

pub const HELP: &str = "\
commands:
  store [--tier T] [--tag x]... <importance> <text>
  retrieve <limit> <query>
  consolidate
  stats
  show <tier>
  evictions [limit]
  reinforce <id> <factor>
  help
  quit";

/// Parse one protocol line. `Ok(None)` for blank and comment lines.
pub fn parse(line: &str) -> Result<Option<Request>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    Line::try_parse_from(line.split_whitespace())
        .map(|parsed| Some(parsed.request))
        .map_err(|e| e.to_string().trim_end().to_string())
}
