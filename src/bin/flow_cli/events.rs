//! Events command

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};

use flowkit::services::DEFAULT_LAST_BLOCKS;

use super::output::EventsOutput;
use super::Context;

#[derive(Parser, Debug)]
pub struct EventsCmd {
    #[command(subcommand)]
    pub command: EventsSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum EventsSubcommand {
    /// Get events of a type in a height range, or in the last blocks
    Get {
        /// Fully qualified event type, e.g. A.f8d6e0586b0a20c7.Foo.Minted
        event_type: String,

        #[arg(long, requires = "end")]
        start: Option<u64>,

        #[arg(long, requires = "start")]
        end: Option<u64>,

        /// Number of most recent blocks to search
        #[arg(long, conflicts_with_all = ["start", "end"])]
        last: Option<u64>,
    },
}

impl EventsCmd {
    pub fn execute(&self, ctx: &Context) -> Result<()> {
        match &self.command {
            EventsSubcommand::Get {
                event_type,
                start,
                end,
                last,
            } => {
                let services = ctx.services()?;
                let events = services.events();
                let found = match (start, end) {
                    (Some(start), Some(end)) => events.get(event_type, *start, *end)?,
                    (None, None) => events.get_last(event_type, last.unwrap_or(DEFAULT_LAST_BLOCKS))?,
                    _ => bail!("--start and --end must be given together"),
                };
                ctx.emit(&EventsOutput(found))
            }
        }
    }
}
