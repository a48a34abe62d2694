//! Emulator command - run the external emulator with the project's service account

use std::process::Command;

use anyhow::{anyhow, bail, Context as _, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use flowkit::config::DEFAULT_EMULATOR;

use super::Context;

/// Binary launched by `emulator start`, looked up on `PATH`.
pub const EMULATOR_BINARY: &str = "flow-emulator";

#[derive(Parser, Debug)]
pub struct EmulatorCmd {
    #[command(subcommand)]
    pub command: EmulatorSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum EmulatorSubcommand {
    /// Start the emulator in the foreground
    Start {
        /// Emulator profile from the configuration
        #[arg(long, default_value = DEFAULT_EMULATOR)]
        emulator: String,

        /// Emulator binary to run
        #[arg(long, env = "FLOW_EMULATOR_BIN", default_value = EMULATOR_BINARY)]
        binary: String,
    },
}

impl EmulatorCmd {
    pub fn execute(&self, ctx: &Context) -> Result<()> {
        match &self.command {
            EmulatorSubcommand::Start { emulator, binary } => start(ctx, emulator, binary),
        }
    }
}

fn start(ctx: &Context, name: &str, binary: &str) -> Result<()> {
    let project = ctx.require_project()?;
    let profile = project
        .config()
        .emulator_by_name(name)
        .ok_or_else(|| anyhow!("emulator {} is not configured", name))?;
    let service = project
        .account_by_name(&profile.service_account)
        .with_context(|| format!("emulator {} has no usable service account", name))?;
    let private_key = service
        .key
        .private_key()
        .ok_or_else(|| anyhow!("service account {} must use a hex key to start the emulator", service.name))?;

    info!(emulator = name, port = profile.port, service = %service.address, "starting emulator");
    let status = Command::new(binary)
        .arg("--port")
        .arg(profile.port.to_string())
        .arg("--service-priv-key")
        .arg(private_key.to_hex())
        .arg("--service-sig-algo")
        .arg(private_key.algorithm().name())
        .arg("--service-hash-algo")
        .arg(service.key.hash_algo().name())
        .status()
        .with_context(|| format!("failed to start {}, make sure it is installed", binary))?;

    if !status.success() {
        bail!("{} exited with {}", binary, status);
    }
    Ok(())
}
