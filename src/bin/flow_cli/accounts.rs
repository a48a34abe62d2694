//! Accounts command - query and manage accounts

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::{json, Value as Json};

use flow_types::{Address, HashAlgorithm, SignatureAlgorithm, Value};
use flowkit::config::DEFAULT_SERVICE_ACCOUNT;

use super::output::{AccountOutput, Render, Rows};
use super::Context;

#[derive(Parser, Debug)]
pub struct AccountsCmd {
    #[command(subcommand)]
    pub command: AccountsSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum AccountsSubcommand {
    /// Get an account by address
    Get {
        address: Address,

        /// Include contract sources
        #[arg(long)]
        contracts: bool,
    },
    /// Create a new account
    Create {
        /// Public keys to attach, hex encoded
        #[arg(long = "key", required = true)]
        keys: Vec<String>,

        /// Weight of each key, defaults to full weight
        #[arg(long = "key-weight")]
        weights: Vec<u32>,

        #[arg(long, default_value = "ECDSA_P256")]
        sig_algo: SignatureAlgorithm,

        #[arg(long, default_value = "SHA3_256")]
        hash_algo: HashAlgorithm,

        /// Contracts to deploy with the account, as name:path
        #[arg(long = "contract")]
        contracts: Vec<String>,

        /// Configured account paying for the creation
        #[arg(long, default_value = DEFAULT_SERVICE_ACCOUNT)]
        signer: String,
    },
    /// Deploy a new contract to a configured account
    AddContract {
        name: String,
        path: String,

        #[arg(long, default_value = DEFAULT_SERVICE_ACCOUNT)]
        signer: String,
    },
    /// Update a contract deployed to a configured account
    UpdateContract {
        name: String,
        path: String,

        #[arg(long, default_value = DEFAULT_SERVICE_ACCOUNT)]
        signer: String,
    },
    /// Remove a contract from a configured account
    RemoveContract {
        name: String,

        #[arg(long, default_value = DEFAULT_SERVICE_ACCOUNT)]
        signer: String,
    },
    /// Staking and delegation information of an account
    StakingInfo { address: Address },
}

impl AccountsCmd {
    pub fn execute(&self, ctx: &Context) -> Result<()> {
        let services = ctx.services()?;
        let accounts = services.accounts();

        let account = match &self.command {
            AccountsSubcommand::Get { address, contracts } => {
                let account = accounts.get(*address)?;
                return ctx.emit(&AccountOutput {
                    account,
                    include_code: *contracts,
                });
            }
            AccountsSubcommand::Create {
                keys,
                weights,
                sig_algo,
                hash_algo,
                contracts,
                signer,
            } => {
                let signer = ctx.account(&services, signer)?;
                accounts.create(&signer, keys, weights, *sig_algo, *hash_algo, contracts)?
            }
            AccountsSubcommand::AddContract { name, path, signer } => {
                accounts.add_contract(signer, name, path, false)?
            }
            AccountsSubcommand::UpdateContract { name, path, signer } => {
                accounts.add_contract(signer, name, path, true)?
            }
            AccountsSubcommand::RemoveContract { name, signer } => accounts.remove_contract(name, signer)?,
            AccountsSubcommand::StakingInfo { address } => {
                let (staking, delegation) = accounts.staking_info(*address)?;
                return ctx.emit(&StakingOutput { staking, delegation });
            }
        };

        ctx.emit(&AccountOutput {
            account,
            include_code: false,
        })
    }
}

struct StakingOutput {
    staking: Value,
    delegation: Value,
}

impl Render for StakingOutput {
    fn text(&self) -> String {
        Rows::new()
            .line("Account Staking Info:")
            .line(self.staking.to_string())
            .line("")
            .line("Account Delegation Info:")
            .line(self.delegation.to_string())
            .finish()
    }

    fn json(&self) -> Json {
        json!({
            "staking": self.staking.to_json(),
            "delegation": self.delegation.to_json(),
        })
    }
}
