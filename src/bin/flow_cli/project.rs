//! Project command - initialize a configuration and deploy its contracts

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::info;

use flow_types::{HashAlgorithm, PrivateKey, SignatureAlgorithm};
use flowkit::config::{global_path, DEFAULT_PATH};
use flowkit::{DeploymentEngine, Project};

use super::output::{DeploymentOutput, Message};
use super::Context;

#[derive(Parser, Debug)]
pub struct ProjectCmd {
    #[command(subcommand)]
    pub command: ProjectSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum ProjectSubcommand {
    /// Create a new configuration with an emulator service account
    Init {
        /// Overwrite an existing configuration
        #[arg(long)]
        reset: bool,

        /// Write the configuration to the home directory
        #[arg(long)]
        global: bool,

        /// Hex private key of the service account, generated when absent
        #[arg(long)]
        service_private_key: Option<String>,

        #[arg(long, default_value = "ECDSA_P256")]
        service_sig_algo: SignatureAlgorithm,

        #[arg(long, default_value = "SHA3_256")]
        service_hash_algo: HashAlgorithm,
    },
    /// Deploy every contract configured for the network
    Deploy {
        /// Update contracts that are already deployed
        #[arg(long)]
        update: bool,
    },
}

impl ProjectCmd {
    pub fn execute(&self, ctx: &Context) -> Result<()> {
        match &self.command {
            ProjectSubcommand::Init {
                reset,
                global,
                service_private_key,
                service_sig_algo,
                service_hash_algo,
            } => init(
                ctx,
                *reset,
                *global,
                service_private_key.as_deref(),
                *service_sig_algo,
                *service_hash_algo,
            ),
            ProjectSubcommand::Deploy { update } => deploy(ctx, *update),
        }
    }
}

fn init(
    ctx: &Context,
    reset: bool,
    global: bool,
    service_private_key: Option<&str>,
    sig_algo: SignatureAlgorithm,
    hash_algo: HashAlgorithm,
) -> Result<()> {
    let path = if global { global_path() } else { DEFAULT_PATH.to_string() };
    let loader = ctx.loader();
    if loader.reader().exists(&path) && !reset {
        bail!("configuration already exists at {}, use --reset to overwrite it", path);
    }

    let service_key = service_private_key
        .map(|hex| PrivateKey::from_hex(sig_algo, hex.trim_start_matches("0x")))
        .transpose()?;
    let project = Project::init(loader, sig_algo, hash_algo, service_key)?;
    project.save(&path)?;

    let service = project.emulator_service_account()?;
    info!(%path, "configuration initialized");
    ctx.emit(&Message::new(
        format!(
            "Configuration initialized\nService account: 0x{}\n\nStart the emulator with `flow emulator start`",
            service.address
        ),
        json!({
            "path": path,
            "serviceAccount": service.address.hex_with_prefix(),
        }),
    ))
}

fn deploy(ctx: &Context, update: bool) -> Result<()> {
    let project = ctx.require_project()?;
    let services = ctx.services_with(Some(project))?;
    let project = services.require_project()?;

    let report = DeploymentEngine::new(services.gateway(), project).deploy(services.network(), update)?;
    let output = DeploymentOutput(report);
    ctx.emit(&output)?;
    output.0.into_result()?;
    Ok(())
}
