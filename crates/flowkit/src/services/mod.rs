//! Operations behind the command line verbs.
//!
//! [`Services`] holds the gateway of the selected network and, when a
//! configuration was found, the project. Each group of verbs is a small
//! borrowed view over it:
//!
//! - [`accounts`]: get, create, contract add/update/remove, staking info
//! - [`scripts`]: execute read-only scripts
//! - [`transactions`]: send, status, build, sign, send-signed
//! - [`blocks`], [`events`], [`collections`]: chain queries
//! - [`keys`]: key generation and decoding
//! - [`status`]: network reachability

pub mod accounts;
pub mod blocks;
pub mod collections;
pub mod events;
pub mod keys;
pub mod scripts;
pub mod status;
pub mod transactions;

use std::sync::Arc;

use tracing::debug;

use flow_resolver::Resolver;
use flow_transport::Gateway;
use flow_types::{Chain, Error, Result, Transaction, TransactionResult};

use crate::config::{LocalFs, ReaderWriter};
use crate::project::Project;
use crate::transactions::TransactionBuilder;

pub use accounts::Accounts;
pub use blocks::{BlockQuery, Blocks, BlockWithDetails};
pub use collections::Collections;
pub use events::{Events, DEFAULT_LAST_BLOCKS};
pub use keys::Keys;
pub use scripts::Scripts;
pub use status::Status;
pub use transactions::Transactions;

pub struct Services {
    gateway: Arc<dyn Gateway>,
    project: Option<Project>,
    network: String,
    chain: Chain,
}

impl Services {
    pub fn new(gateway: Arc<dyn Gateway>, project: Option<Project>, network: impl Into<String>, chain: Chain) -> Self {
        Self {
            gateway,
            project,
            network: network.into(),
            chain,
        }
    }

    pub fn gateway(&self) -> &dyn Gateway {
        self.gateway.as_ref()
    }

    pub fn project(&self) -> Option<&Project> {
        self.project.as_ref()
    }

    pub fn project_mut(&mut self) -> Option<&mut Project> {
        self.project.as_mut()
    }

    /// The project, or an error telling the user to create one.
    pub fn require_project(&self) -> Result<&Project> {
        self.project.as_ref().ok_or_else(|| {
            Error::InvalidArgument(
                "this command needs a project configuration, create one with `flow project init`".to_string(),
            )
        })
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    pub fn chain(&self) -> Chain {
        self.chain
    }

    pub fn accounts(&self) -> Accounts<'_> {
        Accounts::new(self)
    }

    pub fn scripts(&self) -> Scripts<'_> {
        Scripts::new(self)
    }

    pub fn transactions(&self) -> Transactions<'_> {
        Transactions::new(self)
    }

    pub fn blocks(&self) -> Blocks<'_> {
        Blocks::new(self)
    }

    pub fn events(&self) -> Events<'_> {
        Events::new(self)
    }

    pub fn collections(&self) -> Collections<'_> {
        Collections::new(self)
    }

    pub fn keys(&self) -> Keys {
        Keys
    }

    pub fn status(&self) -> Status<'_> {
        Status::new(self)
    }

    // ===== Shared helpers =====

    /// Read through the project's reader, or the local filesystem without a project.
    pub(crate) fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        match &self.project {
            Some(project) => project.read_file(path),
            None => LocalFs.read_file(path),
        }
    }

    /// Rewrite file and name imports in `code` to the addresses the project
    /// deploys to or aliases on the current network.
    pub(crate) fn resolve_imports(&self, code: &[u8], location: &str) -> Result<Vec<u8>> {
        let resolver = Resolver::new(code, location)?;
        if !resolver.has_imports() {
            return Ok(code.to_vec());
        }
        let project = self.require_project()?;
        let contracts = project.contracts_by_network(&self.network)?;
        let aliases = project.aliases_for_network(&self.network);
        debug!(file = location, network = %self.network, "resolving imports");
        Ok(resolver.resolve(&contracts, &aliases)?.into_bytes())
    }

    /// Submit a signed transaction and wait for it to seal. The payer must
    /// have signed the envelope.
    pub(crate) fn send_and_wait(&self, builder: &TransactionBuilder) -> Result<(Transaction, TransactionResult)> {
        let tx = builder.transaction();
        if !tx.envelope_signatures.iter().any(|s| s.address == tx.payer) {
            return Err(Error::UnpreparedTransaction(format!(
                "missing envelope signature from payer {}",
                tx.payer.hex_with_prefix()
            )));
        }
        let id = self.gateway.send_signed_transaction(tx)?;
        debug!(%id, "transaction sent, waiting for seal");
        let result = self.gateway.get_transaction_result(&id, true)?;
        Ok((builder.transaction().clone(), result))
    }
}
