pub mod config;
pub mod repl;

pub use config::ConfigCommand;
pub use repl::{ReplCommand, ReplayCommand};
