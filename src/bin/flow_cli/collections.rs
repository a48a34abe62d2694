//! Collections command

use anyhow::Result;
use clap::{Parser, Subcommand};

use super::output::CollectionOutput;
use super::Context;

#[derive(Parser, Debug)]
pub struct CollectionsCmd {
    #[command(subcommand)]
    pub command: CollectionsSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum CollectionsSubcommand {
    /// Get a collection by id
    Get { id: String },
}

impl CollectionsCmd {
    pub fn execute(&self, ctx: &Context) -> Result<()> {
        match &self.command {
            CollectionsSubcommand::Get { id } => {
                let collection = ctx.services()?.collections().get(id)?;
                ctx.emit(&CollectionOutput(collection))
            }
        }
    }
}
