pub mod commands;
pub mod error;
pub mod output;
pub mod protocol;
pub mod session;

pub use commands::{ConfigCommand, ReplCommand, ReplayCommand};
pub use error::{CliError, CliResult};
pub use output::{OutputFormat, format_timestamp, truncate_string};
pub use session::{Flow, Session};
