//! Scripts command - execute read-only scripts

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use flow_types::Value;
use flowkit::arguments::parse_arguments;

use super::context::read_source;
use super::output::ScriptOutput;
use super::Context;

/// `--arg Type:Value` (repeatable) or `--args-json`, JSON wins when both are set.
#[derive(Args, Debug, Clone, Default)]
pub struct ArgumentFlags {
    /// Argument as Type:Value, e.g. String:hello or Address:f8d6e0586b0a20c7
    #[arg(long = "arg")]
    pub inline: Vec<String>,

    /// Arguments as a JSON array of {"type", "value"} objects
    #[arg(long = "args-json")]
    pub json: Option<String>,
}

impl ArgumentFlags {
    pub fn parse(&self) -> Result<Vec<Value>> {
        Ok(parse_arguments(&self.inline, self.json.as_deref().unwrap_or(""))?)
    }
}

#[derive(Parser, Debug)]
pub struct ScriptsCmd {
    #[command(subcommand)]
    pub command: ScriptsSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum ScriptsSubcommand {
    /// Execute a script file
    Execute {
        path: String,

        #[command(flatten)]
        args: ArgumentFlags,
    },
}

impl ScriptsCmd {
    pub fn execute(&self, ctx: &Context) -> Result<()> {
        match &self.command {
            ScriptsSubcommand::Execute { path, args } => {
                let code = read_source(path)?;
                let arguments = args.parse()?;
                let value = ctx.services()?.scripts().execute(&code, &arguments, path)?;
                ctx.emit(&ScriptOutput(value))
            }
        }
    }
}
