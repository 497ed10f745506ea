//! Executes protocol requests against a shared store

use std::io::Write;
use std::sync::Arc;

use engram::storage::StoreRequest;
use engram::{MemoryId, MemoryStore};

use crate::error::CliResult;
use crate::output::{self, OutputFormat};
use crate::protocol::{self, HELP, Request};

/// Whether the caller should keep reading lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Session {
    store: Arc<MemoryStore>,
    format: OutputFormat,
}

impl Session {
    pub fn new(store: Arc<MemoryStore>, format: OutputFormat) -> Self {
        Self { store, format }
    }

    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }

    /// Run one line. Protocol and store errors are written to `out`;
    /// only write failures are returned.
    pub fn execute_line(&self, line: &str, out: &mut dyn Write) -> CliResult<Flow> {
        match protocol::parse(line) {
            Ok(None) => Ok(Flow::Continue),
            Ok(Some(request)) => self.execute(request, out),
            Err(message) => {
                output::error(out, &message, self.format)?;
                Ok(Flow::Continue)
            }
        }
    }

    pub fn execute(&self, request: Request, out: &mut dyn Write) -> CliResult<Flow> {
        let format = self.format;
        match request {
            Request::Store {
                tier,
                tags,
                importance,
                text,
            } => {
                let request = tags.into_iter().fold(
                    StoreRequest::new(text.join(" "), importance).tier(tier),
                    |request, tag| request.tag(tag),
                );
                match self.store.store_with(request) {
                    Ok(id) => output::message(out, &format!("stored {id} in {tier}"), format)?,
                    Err(e) => output::error(out, &e.to_string(), format)?,
                }
            }
            Request::Retrieve { limit, query } => {
                let results = self.store.retrieve(&query.join(" "), limit);
                output::retrieved(out, &results, format)?;
            }
            Request::Consolidate => {
                let report = self.store.consolidate();
                output::report(out, &report, format)?;
            }
            Request::Stats => output::stats(out, &self.store.stats(), format)?,
            Request::Show { tier } => output::items(out, &self.store.contents(tier), format)?,
            Request::Evictions { limit } => {
                output::tombstones(out, &self.store.recent_evictions(limit), format)?;
            }
            Request::Reinforce { id, factor } => {
                let id = MemoryId(id);
                match self.store.reinforce(id, factor) {
                    Ok(Some(importance)) => output::message(
                        out,
                        &format!("{id} importance now {importance:.3}"),
                        format,
                    )?,
                    Ok(None) => match self.store.tombstone(id) {
                        Some(tombstone) => output::error(out, &tombstone.to_string(), format)?,
                        None => output::error(out, &format!("no memory {id}"), format)?,
                    },
                    Err(e) => output::error(out, &e.to_string(), format)?,
                }
            }
            Request::Help => output::message(out, HELP, format)?,
            Request::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }
}
