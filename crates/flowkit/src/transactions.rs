//! Transaction builder and signer.
//!
//! [`TransactionBuilder`] owns an in-flight [`Transaction`] together with the
//! configured account that signs next and the role it signs in. Payload
//! fields are frozen once the envelope carries a signature.
//!
//! # Examples
//!
//! ```ignore
//! let mut tx = TransactionBuilder::add_account_contract(account.address, "Foo", code, &[])?;
//! tx.prepare(gateway, &account, account.address)?
//!     .set_signer(account.clone())?
//!     .sign()?;
//! let id = gateway.send_signed_transaction(tx.transaction())?;
//! ```

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use flow_resolver::Program;
use flow_transport::Gateway;
use flow_types::encoding::parse_hex_bytes;
use flow_types::templates::{self, Template};
use flow_types::{
    Account as ChainAccount, AccountPublicKey, Address, Block, Error, Identifier, ProposalKey,
    Result, Transaction, Value,
};

use crate::arguments::parse_arguments;
use crate::config::Account;

/// The part a signer plays in a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignerRole {
    Authorizer,
    Proposer,
    Payer,
}

impl fmt::Display for SignerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SignerRole::Authorizer => "authorizer",
            SignerRole::Proposer => "proposer",
            SignerRole::Payer => "payer",
        })
    }
}

impl FromStr for SignerRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "authorizer" => Ok(SignerRole::Authorizer),
            "proposer" => Ok(SignerRole::Proposer),
            "payer" => Ok(SignerRole::Payer),
            other => Err(Error::InvalidArgument(format!(
                "unknown signer role {:?}, expected authorizer, proposer or payer",
                other
            ))),
        }
    }
}

/// Number of accounts the script's `prepare` block asks for.
pub fn authorizer_count(script: &[u8]) -> Result<usize> {
    Ok(Program::parse(script)?.prepare_parameters().unwrap_or(0))
}

#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    tx: Transaction,
    signer: Option<Account>,
    role: Option<SignerRole>,
}

impl Default for TransactionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionBuilder {
    pub fn new() -> Self {
        Self {
            tx: Transaction::new(),
            signer: None,
            role: None,
        }
    }

    /// Continue from an RLP hex encoded transaction, signed or not.
    pub fn from_payload(encoded: &str) -> Result<Self> {
        let bytes = parse_hex_bytes(encoded, "transaction payload")?;
        Ok(Self {
            tx: Transaction::decode(&bytes)?,
            signer: None,
            role: None,
        })
    }

    fn from_template(template: Template, authorizer: Address) -> Result<Self> {
        let mut builder = Self::new();
        builder.set_script(template.script)?;
        builder.add_arguments(&template.arguments)?;
        builder.tx.authorizers.push(authorizer);
        Ok(builder)
    }

    // ===== Templates =====

    /// Create an account with `keys` and optional initial contracts, paid for
    /// and authorized by `creator`.
    pub fn create_account(
        keys: &[AccountPublicKey],
        contracts: &[(String, Vec<u8>)],
        creator: Address,
    ) -> Result<Self> {
        Self::from_template(templates::create_account(keys, contracts), creator)
    }

    pub fn add_account_contract(signer: Address, name: &str, code: &[u8], args: &[Value]) -> Result<Self> {
        Self::from_template(templates::add_account_contract(name, code, args), signer)
    }

    pub fn update_account_contract(signer: Address, name: &str, code: &[u8], args: &[Value]) -> Result<Self> {
        Self::from_template(templates::update_account_contract(name, code, args), signer)
    }

    pub fn remove_account_contract(signer: Address, name: &str) -> Result<Self> {
        Self::from_template(templates::remove_account_contract(name), signer)
    }

    // ===== Payload =====

    fn ensure_mutable(&self) -> Result<()> {
        if self.tx.envelope_signatures.is_empty() {
            Ok(())
        } else {
            Err(Error::ImmutableTransaction)
        }
    }

    pub fn set_script(&mut self, code: impl Into<Vec<u8>>) -> Result<&mut Self> {
        self.ensure_mutable()?;
        self.tx.script = code.into();
        Ok(self)
    }

    /// Append `Type:Value` or JSON arguments; JSON wins when non-empty.
    pub fn add_raw_arguments(&mut self, inline: &[String], json: &str) -> Result<&mut Self> {
        let values = parse_arguments(inline, json)?;
        self.add_arguments(&values)
    }

    pub fn add_arguments(&mut self, values: &[Value]) -> Result<&mut Self> {
        self.ensure_mutable()?;
        for value in values {
            self.tx.add_argument(value);
        }
        Ok(self)
    }

    pub fn add_authorizer(&mut self, address: &str) -> Result<&mut Self> {
        self.ensure_mutable()?;
        let address = address.trim();
        if address.is_empty() {
            return Err(Error::InvalidArgument("authorizer address is empty".to_string()));
        }
        let address = Address::from_hex(address)?;
        if address.is_empty() {
            return Err(Error::InvalidArgument("authorizer address is empty".to_string()));
        }
        if !self.tx.authorizers.contains(&address) {
            self.tx.authorizers.push(address);
        }
        Ok(self)
    }

    /// Use `key_index` of the on-chain `account` as the proposal key, with its
    /// current sequence number.
    pub fn set_proposer(&mut self, account: &ChainAccount, key_index: u32) -> Result<&mut Self> {
        self.ensure_mutable()?;
        let key = account
            .key(key_index)
            .filter(|k| !k.revoked)
            .ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "account {} has no valid key at index {}",
                    account.address, key_index
                ))
            })?;
        self.tx.proposal_key = ProposalKey {
            address: account.address,
            key_index,
            sequence_number: key.sequence_number,
        };
        Ok(self)
    }

    pub fn set_payer(&mut self, address: Address) -> Result<&mut Self> {
        self.ensure_mutable()?;
        self.tx.payer = address;
        Ok(self)
    }

    pub fn set_reference_block(&mut self, id: Identifier) -> Result<&mut Self> {
        self.ensure_mutable()?;
        self.tx.reference_block_id = id;
        Ok(self)
    }

    pub fn set_block_reference(&mut self, block: &Block) -> Result<&mut Self> {
        self.set_reference_block(block.id)
    }

    pub fn set_gas_limit(&mut self, limit: u64) -> Result<&mut Self> {
        self.ensure_mutable()?;
        self.tx.gas_limit = limit;
        Ok(self)
    }

    /// Fill the reference block, proposal key and payer from the gateway.
    /// `proposer` proposes with its configured key index.
    pub fn prepare(&mut self, gateway: &dyn Gateway, proposer: &Account, payer: Address) -> Result<&mut Self> {
        let block = gateway.get_latest_block()?;
        let on_chain = gateway.get_account(proposer.address)?;
        self.set_block_reference(&block)?;
        self.set_proposer(&on_chain, proposer.key.index())?;
        self.set_payer(payer)?;
        debug!(
            proposer = %proposer.address,
            sequence = self.tx.proposal_key.sequence_number,
            block = block.height,
            "prepared transaction"
        );
        Ok(self)
    }

    // ===== Signing =====

    pub fn set_signer(&mut self, account: Account) -> Result<&mut Self> {
        self.signer = Some(account);
        self.role = None;
        Ok(self)
    }

    /// Fix the signer's role. `Authorizer` adds the signer to the authorizers
    /// when missing; `Payer` requires the signer to be the payer.
    pub fn set_signer_role(&mut self, role: SignerRole) -> Result<&mut Self> {
        let address = self
            .signer
            .as_ref()
            .map(|s| s.address)
            .ok_or_else(|| Error::InvalidArgument("a signer must be set before its role".to_string()))?;

        match role {
            SignerRole::Authorizer if !self.tx.authorizers.contains(&address) => {
                self.ensure_mutable()?;
                if !self.tx.payload_signatures.is_empty() {
                    return Err(Error::RoleMismatch(format!(
                        "cannot add {} as an authorizer after the payload was signed",
                        address
                    )));
                }
                self.tx.authorizers.push(address);
            }
            SignerRole::Payer if self.tx.payer != address => {
                return Err(Error::RoleMismatch(format!(
                    "signer {} is not the payer {}",
                    address, self.tx.payer
                )));
            }
            _ => {}
        }
        self.role = Some(role);
        Ok(self)
    }

    fn infer_role(&self, address: Address) -> SignerRole {
        if self.tx.payer == address {
            SignerRole::Payer
        } else if self.tx.authorizers.contains(&address) {
            SignerRole::Authorizer
        } else {
            SignerRole::Proposer
        }
    }

    /// Sign with the current signer's key: the payload for authorizers and
    /// the proposer, the envelope for the payer.
    pub fn sign(&mut self) -> Result<&mut Self> {
        let signer = self
            .signer
            .as_ref()
            .ok_or_else(|| Error::UnpreparedTransaction("no signer set".to_string()))?;
        if self.tx.reference_block_id.is_empty() {
            return Err(Error::UnpreparedTransaction("missing reference block".to_string()));
        }
        if self.tx.proposal_key.address.is_empty() {
            return Err(Error::UnpreparedTransaction("missing proposer".to_string()));
        }
        if self.tx.payer.is_empty() {
            return Err(Error::UnpreparedTransaction("missing payer".to_string()));
        }

        let role = self.role.unwrap_or_else(|| self.infer_role(signer.address));
        let key = signer.key.signer()?;
        let index = signer.key.index();
        match role {
            SignerRole::Payer => self.tx.sign_envelope(signer.address, index, key.as_ref())?,
            SignerRole::Authorizer | SignerRole::Proposer => {
                self.ensure_mutable()?;
                self.tx.sign_payload(signer.address, index, key.as_ref())?
            }
        }
        debug!(signer = %signer.name, %role, "signed transaction");
        Ok(self)
    }

    // ===== Output =====

    pub fn transaction(&self) -> &Transaction {
        &self.tx
    }

    pub fn into_transaction(self) -> Transaction {
        self.tx
    }

    pub fn signer(&self) -> Option<&Account> {
        self.signer.as_ref()
    }

    /// RLP hex of the transaction with its signatures.
    pub fn encode(&self) -> String {
        hex::encode(self.tx.encode())
    }

    pub fn id(&self) -> Identifier {
        self.tx.id()
    }
}
