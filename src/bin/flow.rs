//! flow: command line client for Flow projects and networks
//!
//! ## Commands
//!
//! - **accounts**: get, create, add/update/remove contracts, staking info
//! - **keys**: generate and decode keys
//! - **blocks**, **collections**, **events**: chain queries
//! - **scripts**: execute read-only scripts
//! - **transactions**: send, status, build, sign, send-signed
//! - **project**: init a configuration, deploy its contracts
//! - **emulator**: start the local emulator
//! - **status**: check that the selected network is reachable
//!
//! ## Example Usage
//!
//! ```bash
//! # Create flow.json with a fresh emulator service account
//! flow project init
//!
//! # Deploy every contract configured for the emulator
//! flow project deploy --network emulator
//!
//! # Run a script with arguments
//! flow scripts execute ./scripts/balance.cdc --arg Address:f8d6e0586b0a20c7
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod flow_cli;

use flow_cli::{
    accounts::AccountsCmd, blocks::BlocksCmd, collections::CollectionsCmd, emulator::EmulatorCmd,
    events::EventsCmd, keys::KeysCmd, project::ProjectCmd, scripts::ScriptsCmd,
    transactions::TransactionsCmd, Context, GlobalArgs,
};

#[derive(Parser)]
#[command(
    name = "flow",
    author,
    version,
    about = "Configure, deploy to and query Flow networks",
    long_about = "Project-aware command line client for Flow.\n\n\
                  Reads flow.json, deploys contracts in dependency order and talks to \
                  access nodes or the local emulator."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    globals: GlobalArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Query and manage accounts
    Accounts(AccountsCmd),

    /// Generate and decode keys
    Keys(KeysCmd),

    /// Query blocks
    Blocks(BlocksCmd),

    /// Query collections
    Collections(CollectionsCmd),

    /// Query events
    Events(EventsCmd),

    /// Execute scripts
    Scripts(ScriptsCmd),

    /// Build, sign and send transactions
    Transactions(TransactionsCmd),

    /// Initialize a project and deploy its contracts
    Project(ProjectCmd),

    /// Run the local emulator
    Emulator(EmulatorCmd),

    /// Check that the selected network is reachable
    Status,
}

fn init_logging(level: &str) {
    let level = match level {
        "none" => "off",
        other => other,
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run(cli: Cli) -> Result<()> {
    let ctx = Context::new(cli.globals);
    match cli.command {
        Commands::Accounts(cmd) => cmd.execute(&ctx),
        Commands::Keys(cmd) => cmd.execute(&ctx),
        Commands::Blocks(cmd) => cmd.execute(&ctx),
        Commands::Collections(cmd) => cmd.execute(&ctx),
        Commands::Events(cmd) => cmd.execute(&ctx),
        Commands::Scripts(cmd) => cmd.execute(&ctx),
        Commands::Transactions(cmd) => cmd.execute(&ctx),
        Commands::Project(cmd) => cmd.execute(&ctx),
        Commands::Emulator(cmd) => cmd.execute(&ctx),
        Commands::Status => flow_cli::status::execute(&ctx),
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli.globals.log);

    if let Err(err) = run(cli) {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}
