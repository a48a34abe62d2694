//! Blocks command

use anyhow::Result;
use clap::{Parser, Subcommand};

use flowkit::services::BlockQuery;

use super::output::BlockOutput;
use super::Context;

#[derive(Parser, Debug)]
pub struct BlocksCmd {
    #[command(subcommand)]
    pub command: BlocksSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum BlocksSubcommand {
    /// Get a block by height, id or `latest`
    Get {
        #[arg(default_value = "latest")]
        query: BlockQuery,

        /// Also fetch events of these types emitted in the block
        #[arg(long = "events")]
        event_types: Vec<String>,

        /// Also fetch the block's collections (`--include transactions`)
        #[arg(long, value_parser = ["transactions"])]
        include: Option<String>,
    },
}

impl BlocksCmd {
    pub fn execute(&self, ctx: &Context) -> Result<()> {
        match &self.command {
            BlocksSubcommand::Get {
                query,
                event_types,
                include,
            } => {
                let services = ctx.services()?;
                let block = services.blocks().get(*query, event_types, include.is_some())?;
                ctx.emit(&BlockOutput(block))
            }
        }
    }
}
