//! Transaction operations: send in one step or build, sign and send-signed
//! for offline and multi-party signing.

use tracing::info;

use flow_types::{Address, Identifier, Result, Transaction, TransactionResult, Value};

use super::Services;
use crate::config::Account;
use crate::transactions::{authorizer_count, SignerRole, TransactionBuilder};

pub struct Transactions<'a> {
    services: &'a Services,
}

impl<'a> Transactions<'a> {
    pub(crate) fn new(services: &'a Services) -> Self {
        Self { services }
    }

    /// Send `code` with `signer` as proposer, payer and, when the code has a
    /// `prepare` block, authorizer. Waits for the seal.
    pub fn send(
        &self,
        signer: &Account,
        code: &[u8],
        location: &str,
        arguments: &[Value],
        gas_limit: Option<u64>,
    ) -> Result<(Transaction, TransactionResult)> {
        let code = self.services.resolve_imports(code, location)?;
        let mut builder = TransactionBuilder::new();
        builder.set_script(code.clone())?.add_arguments(arguments)?;
        if authorizer_count(&code)? > 0 {
            builder.add_authorizer(&signer.address.hex())?;
        }
        if let Some(limit) = gas_limit {
            builder.set_gas_limit(limit)?;
        }
        builder
            .prepare(self.services.gateway(), signer, signer.address)?
            .set_signer(signer.clone())?
            .sign()?;

        let (tx, result) = self.services.send_and_wait(&builder)?;
        info!(id = %tx.id(), status = %result.status, "transaction sent");
        Ok((tx, result))
    }

    /// The transaction and its result, optionally waiting for the seal.
    pub fn get_status(&self, id: &str, wait_for_seal: bool) -> Result<(Transaction, TransactionResult)> {
        let id = Identifier::from_hex(id)?;
        let gateway = self.services.gateway();
        let tx = gateway.get_transaction(&id)?;
        let result = gateway.get_transaction_result(&id, wait_for_seal)?;
        Ok((tx, result))
    }

    /// An unsigned transaction ready to be passed around for signing.
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        &self,
        proposer: &Account,
        payer: Address,
        authorizers: &[Address],
        code: &[u8],
        location: &str,
        arguments: &[Value],
        gas_limit: Option<u64>,
    ) -> Result<TransactionBuilder> {
        let code = self.services.resolve_imports(code, location)?;
        let mut builder = TransactionBuilder::new();
        builder.set_script(code)?.add_arguments(arguments)?;
        for authorizer in authorizers {
            builder.add_authorizer(&authorizer.hex())?;
        }
        if let Some(limit) = gas_limit {
            builder.set_gas_limit(limit)?;
        }
        builder.prepare(self.services.gateway(), proposer, payer)?;
        Ok(builder)
    }

    /// Add `signer`'s signature to an encoded transaction. Without an explicit
    /// role the signer signs the envelope if it pays and the payload otherwise.
    pub fn sign(&self, encoded: &str, signer: &Account, role: Option<SignerRole>) -> Result<TransactionBuilder> {
        let mut builder = TransactionBuilder::from_payload(encoded)?;
        builder.set_signer(signer.clone())?;
        if let Some(role) = role {
            builder.set_signer_role(role)?;
        }
        builder.sign()?;
        Ok(builder)
    }

    /// Submit an encoded, fully signed transaction and wait for the seal.
    pub fn send_signed(&self, encoded: &str) -> Result<(Transaction, TransactionResult)> {
        let builder = TransactionBuilder::from_payload(encoded)?;
        self.services.send_and_wait(&builder)
    }
}
