//! Global flags and the state every command is built from.

use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context as _, Result};
use clap::Args;
use tracing::debug;

use flow_transport::network::{default_host, infer_chain_from_host};
use flow_transport::{EmulatorGateway, Gateway, RemoteGateway};
use flow_types::models::ACCOUNT_KEY_WEIGHT_THRESHOLD;
use flow_types::{AccountPublicKey, Chain, Error};
use flowkit::config::loader::read_dotenv;
use flowkit::config::{default_paths, Account};
use flowkit::{Loader, LocalFs, Project, Services};

use super::output::{OutputFormat, Render};

/// Host value selecting the in-process emulator instead of a node.
pub const IN_PROCESS_HOST: &str = "in-process";

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Configuration files to load, later files override earlier ones
    #[arg(short = 'f', long = "config-path", global = true, env = "FLOW_CONFIG_PATH", value_delimiter = ',')]
    pub config_paths: Vec<String>,

    /// Network to use from the configuration
    #[arg(short = 'n', long, global = true, env = "FLOW_NETWORK", default_value = "emulator")]
    pub network: String,

    /// Host overriding the network's host, `in-process` runs an embedded emulator
    #[arg(long, global = true, env = "FLOW_HOST")]
    pub host: Option<String>,

    /// Log level
    #[arg(
        long,
        global = true,
        env = "FLOW_LOG",
        default_value = "info",
        value_parser = ["none", "error", "warn", "info", "debug"]
    )]
    pub log: String,

    /// Output format
    #[arg(short = 'o', long, global = true, env = "FLOW_OUTPUT", value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    /// Write the rendered result to this file instead of stdout
    #[arg(long, global = true)]
    pub save: Option<String>,
}

pub struct Context {
    pub globals: GlobalArgs,
}

impl Context {
    pub fn new(globals: GlobalArgs) -> Self {
        Self { globals }
    }

    /// Loader over the local filesystem with `.env` values for substitution.
    pub fn loader(&self) -> Loader {
        Loader::new(Arc::new(LocalFs)).with_env(read_dotenv(".env"))
    }

    pub fn config_paths(&self) -> Vec<String> {
        if self.globals.config_paths.is_empty() {
            default_paths()
        } else {
            self.globals.config_paths.clone()
        }
    }

    /// The project, or `None` when no configuration exists at the default
    /// paths. Explicit paths that don't exist are an error.
    pub fn load_project(&self) -> Result<Option<Project>> {
        match Project::load(self.loader(), &self.config_paths()) {
            Ok(project) => Ok(Some(project)),
            Err(Error::ConfigMissing { .. }) if self.globals.config_paths.is_empty() => {
                debug!("no configuration found, continuing without a project");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Like [`Context::load_project`], but a project is mandatory.
    pub fn require_project(&self) -> Result<Project> {
        Ok(Project::load(self.loader(), &self.config_paths())?)
    }

    /// Services for the selected network.
    pub fn services(&self) -> Result<Services> {
        let project = self.load_project()?;
        self.services_with(project)
    }

    pub fn services_with(&self, project: Option<Project>) -> Result<Services> {
        let network = self.globals.network.as_str();
        let host = self.host(project.as_ref())?;
        let chain = network
            .parse::<Chain>()
            .ok()
            .or_else(|| infer_chain_from_host(&host))
            .unwrap_or(Chain::Emulator);

        let gateway: Arc<dyn Gateway> = if host == IN_PROCESS_HOST {
            Arc::new(in_process_emulator(project.as_ref())?)
        } else {
            Arc::new(RemoteGateway::new(&host))
        };
        debug!(network, %host, %chain, "gateway selected");
        Ok(Services::new(gateway, project, network, chain))
    }

    /// `--host`, else the project's host for the network, else the
    /// well-known host of the network name.
    fn host(&self, project: Option<&Project>) -> Result<String> {
        if let Some(host) = &self.globals.host {
            return Ok(host.clone());
        }
        let network = self.globals.network.as_str();
        if let Some(configured) = project.and_then(|p| p.network(network).ok()) {
            return Ok(configured.host.clone());
        }
        default_host(network)
            .map(str::to_string)
            .ok_or_else(|| anyhow!("network {} is not configured and has no default host", network))
    }

    /// A configured account by name.
    pub fn account(&self, services: &Services, name: &str) -> Result<Account> {
        let project = services.require_project()?;
        Ok(project.account_by_name(name)?.clone())
    }

    /// Render `result` in the requested format to stdout or the `--save` file.
    pub fn emit(&self, result: &dyn Render) -> Result<()> {
        let rendered = result.render(self.globals.output)?;
        match &self.globals.save {
            Some(path) => {
                std::fs::write(path, rendered.as_bytes())
                    .with_context(|| format!("failed to save output to {}", path))?;
                println!("result saved to: {}", path);
            }
            None => println!("{}", rendered),
        }
        Ok(())
    }
}

/// Embedded emulator seeded with the project's emulator service key.
fn in_process_emulator(project: Option<&Project>) -> Result<EmulatorGateway> {
    let project = project.ok_or_else(|| anyhow!("the in-process emulator needs a project configuration"))?;
    let service = project.emulator_service_account()?;
    let private_key = service
        .key
        .private_key()
        .ok_or_else(|| anyhow!("emulator service account {} must use a hex key", service.name))?;
    let key = AccountPublicKey::new(
        private_key.public_key(),
        service.key.hash_algo(),
        ACCOUNT_KEY_WEIGHT_THRESHOLD,
    );
    Ok(EmulatorGateway::new(key))
}

/// Read a source file given on the command line.
pub fn read_source(path: &str) -> Result<Vec<u8>> {
    std::fs::read(Path::new(path)).with_context(|| format!("failed to read {}", path))
}
