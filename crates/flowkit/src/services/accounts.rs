//! Account operations.

use tracing::info;

use flow_types::models::{ACCOUNT_CREATED_EVENT, ACCOUNT_KEY_WEIGHT_THRESHOLD};
use flow_types::templates::{delegation_info_script, staking_info_script};
use flow_types::{
    Account as ChainAccount, AccountPublicKey, Address, Error, HashAlgorithm, PublicKey, Result,
    SignatureAlgorithm, Value,
};

use super::Services;
use crate::config::Account;
use crate::transactions::TransactionBuilder;

pub struct Accounts<'a> {
    services: &'a Services,
}

impl<'a> Accounts<'a> {
    pub(crate) fn new(services: &'a Services) -> Self {
        Self { services }
    }

    pub fn get(&self, address: Address) -> Result<ChainAccount> {
        self.services.gateway().get_account(address)
    }

    /// Create an account holding `public_keys` and return it as seen on chain.
    ///
    /// `weights` is either empty (every key gets full weight) or one weight
    /// per key. `contracts` are `name:path` pairs deployed with the account.
    pub fn create(
        &self,
        signer: &Account,
        public_keys: &[String],
        weights: &[u32],
        sig_algo: SignatureAlgorithm,
        hash_algo: HashAlgorithm,
        contracts: &[String],
    ) -> Result<ChainAccount> {
        if public_keys.is_empty() {
            return Err(Error::InvalidArgument("at least one public key is required".to_string()));
        }
        if !weights.is_empty() && weights.len() != public_keys.len() {
            return Err(Error::InvalidArgument(format!(
                "got {} weights for {} keys, provide one weight per key",
                weights.len(),
                public_keys.len()
            )));
        }

        let mut keys = Vec::with_capacity(public_keys.len());
        for (i, raw) in public_keys.iter().enumerate() {
            let weight = weights.get(i).copied().unwrap_or(ACCOUNT_KEY_WEIGHT_THRESHOLD);
            if weight == 0 || weight > ACCOUNT_KEY_WEIGHT_THRESHOLD {
                return Err(Error::InvalidArgument(format!(
                    "key weight {} is out of range, must be between 1 and {}",
                    weight, ACCOUNT_KEY_WEIGHT_THRESHOLD
                )));
            }
            let public_key = PublicKey::from_hex(sig_algo, raw.trim().trim_start_matches("0x"))?;
            keys.push(AccountPublicKey::new(public_key, hash_algo, weight));
        }

        let mut initial_contracts = Vec::with_capacity(contracts.len());
        for entry in contracts {
            let (name, path) = entry.split_once(':').ok_or_else(|| {
                Error::InvalidArgument(format!("contract {:?} is not in the name:path format", entry))
            })?;
            initial_contracts.push((name.to_string(), self.services.read_file(path)?));
        }

        let mut builder = TransactionBuilder::create_account(&keys, &initial_contracts, signer.address)?;
        builder
            .prepare(self.services.gateway(), signer, signer.address)?
            .set_signer(signer.clone())?
            .sign()?;
        let (tx, result) = self.services.send_and_wait(&builder)?;
        let id = tx.id();
        if let Some(error) = result.error {
            return Err(Error::Gateway(format!("account creation transaction {} failed: {}", id, error)));
        }

        let address = result
            .events_of_type(ACCOUNT_CREATED_EVENT)
            .find_map(|event| event.field("address").and_then(Value::as_address))
            .ok_or_else(|| Error::AccountCreateFailed(id.hex()))?;
        info!(%address, transaction = %id, "account created");
        self.get(address)
    }

    /// Deploy the contract at `path` to the configured account, updating it
    /// when `update` is set.
    pub fn add_contract(&self, account_name: &str, contract_name: &str, path: &str, update: bool) -> Result<ChainAccount> {
        let project = self.services.require_project()?;
        let account = project.account_by_name(account_name)?;
        let code = self.services.read_file(path)?;
        let code = self.services.resolve_imports(&code, path)?;

        let mut builder = if update {
            TransactionBuilder::update_account_contract(account.address, contract_name, &code, &[])?
        } else {
            TransactionBuilder::add_account_contract(account.address, contract_name, &code, &[])?
        };
        self.submit(&mut builder, account)?;
        info!(contract = contract_name, account = %account.address, update, "contract deployed");
        self.get(account.address)
    }

    pub fn remove_contract(&self, contract_name: &str, account_name: &str) -> Result<ChainAccount> {
        let project = self.services.require_project()?;
        let account = project.account_by_name(account_name)?;
        let mut builder = TransactionBuilder::remove_account_contract(account.address, contract_name)?;
        self.submit(&mut builder, account)?;
        info!(contract = contract_name, account = %account.address, "contract removed");
        self.get(account.address)
    }

    /// Staking and delegation information of `address`.
    pub fn staking_info(&self, address: Address) -> Result<(Value, Value)> {
        let chain = self.services.chain();
        let staking = staking_info_script(chain, address)?;
        let delegation = delegation_info_script(chain, address)?;

        let gateway = self.services.gateway();
        let staking = gateway.execute_script(staking.script.as_bytes(), &staking.arguments)?;
        let delegation = gateway.execute_script(delegation.script.as_bytes(), &delegation.arguments)?;
        Ok((staking, delegation))
    }

    fn submit(&self, builder: &mut TransactionBuilder, account: &Account) -> Result<()> {
        builder
            .prepare(self.services.gateway(), account, account.address)?
            .set_signer(account.clone())?
            .sign()?;
        let (tx, result) = self.services.send_and_wait(builder)?;
        match result.error {
            Some(error) => Err(Error::Gateway(format!("transaction {} failed: {}", tx.id(), error))),
            None => Ok(()),
        }
    }
}
