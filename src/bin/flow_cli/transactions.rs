//! Transactions command - send, inspect, and sign transactions
//!
//! `build`, `sign` and `send-signed` pass the RLP encoded transaction around
//! as hex so that every signer can run on a different machine.

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};

use flow_types::Address;
use flowkit::config::DEFAULT_SERVICE_ACCOUNT;
use flowkit::{Services, SignerRole};

use super::context::read_source;
use super::output::{PayloadOutput, TransactionOutput};
use super::scripts::ArgumentFlags;
use super::Context;

#[derive(Parser, Debug)]
pub struct TransactionsCmd {
    #[command(subcommand)]
    pub command: TransactionsSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum TransactionsSubcommand {
    /// Sign and send a transaction in one step
    Send {
        path: String,

        /// Configured account acting as proposer, payer and authorizer
        #[arg(long, default_value = DEFAULT_SERVICE_ACCOUNT)]
        signer: String,

        #[command(flatten)]
        args: ArgumentFlags,

        #[arg(long)]
        gas_limit: Option<u64>,

        /// Print the transaction code
        #[arg(long)]
        code: bool,
    },
    /// Get a transaction and its result
    Status {
        id: String,

        /// Wait until the transaction is sealed
        #[arg(long)]
        sealed: bool,

        #[arg(long)]
        code: bool,
    },
    /// Build an unsigned transaction for offline signing
    Build {
        path: String,

        /// Configured account proposing the transaction
        #[arg(long, default_value = DEFAULT_SERVICE_ACCOUNT)]
        proposer: String,

        /// Account name or address paying for the transaction, defaults to the proposer
        #[arg(long)]
        payer: Option<String>,

        /// Account names or addresses authorizing the transaction
        #[arg(long = "authorizer")]
        authorizers: Vec<String>,

        #[command(flatten)]
        args: ArgumentFlags,

        #[arg(long)]
        gas_limit: Option<u64>,
    },
    /// Add a signature to a built transaction
    Sign {
        /// File holding the hex encoded transaction
        path: String,

        #[arg(long, default_value = DEFAULT_SERVICE_ACCOUNT)]
        signer: String,

        /// Role to sign in, inferred from the transaction when absent
        #[arg(long)]
        role: Option<SignerRole>,
    },
    /// Send a fully signed transaction
    SendSigned {
        /// File holding the hex encoded transaction
        path: String,
    },
}

impl TransactionsCmd {
    pub fn execute(&self, ctx: &Context) -> Result<()> {
        let services = ctx.services()?;
        let transactions = services.transactions();

        match &self.command {
            TransactionsSubcommand::Send {
                path,
                signer,
                args,
                gas_limit,
                code,
            } => {
                let signer = ctx.account(&services, signer)?;
                let source = read_source(path)?;
                let (transaction, result) =
                    transactions.send(&signer, &source, path, &args.parse()?, *gas_limit)?;
                ctx.emit(&TransactionOutput {
                    transaction,
                    result: Some(result),
                    include_code: *code,
                })
            }
            TransactionsSubcommand::Status { id, sealed, code } => {
                let (transaction, result) = transactions.get_status(id, *sealed)?;
                ctx.emit(&TransactionOutput {
                    transaction,
                    result: Some(result),
                    include_code: *code,
                })
            }
            TransactionsSubcommand::Build {
                path,
                proposer,
                payer,
                authorizers,
                args,
                gas_limit,
            } => {
                let proposer = ctx.account(&services, proposer)?;
                let payer = match payer {
                    Some(payer) => resolve_address(&services, payer)?,
                    None => proposer.address,
                };
                let authorizers = authorizers
                    .iter()
                    .map(|a| resolve_address(&services, a))
                    .collect::<Result<Vec<_>>>()?;
                let source = read_source(path)?;
                let builder = transactions.build(
                    &proposer,
                    payer,
                    &authorizers,
                    &source,
                    path,
                    &args.parse()?,
                    *gas_limit,
                )?;
                ctx.emit(&PayloadOutput(builder.into_transaction()))
            }
            TransactionsSubcommand::Sign { path, signer, role } => {
                let signer = ctx.account(&services, signer)?;
                let encoded = read_payload(path)?;
                let builder = transactions.sign(&encoded, &signer, *role)?;
                ctx.emit(&PayloadOutput(builder.into_transaction()))
            }
            TransactionsSubcommand::SendSigned { path } => {
                let encoded = read_payload(path)?;
                let (transaction, result) = transactions.send_signed(&encoded)?;
                ctx.emit(&TransactionOutput {
                    transaction,
                    result: Some(result),
                    include_code: false,
                })
            }
        }
    }
}

/// A configured account name, or a literal address.
fn resolve_address(services: &Services, value: &str) -> Result<Address> {
    if let Some(account) = services.project().and_then(|p| p.account_by_name(value).ok()) {
        return Ok(account.address);
    }
    Address::from_hex(value).with_context(|| format!("{} is neither a configured account nor an address", value))
}

fn read_payload(path: &str) -> Result<String> {
    let raw = read_source(path)?;
    Ok(String::from_utf8_lossy(&raw).trim().to_string())
}
