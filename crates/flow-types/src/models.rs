//! On-chain entities returned by a gateway.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rlp::{Rlp, RlpStream};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::address::Address;
use crate::crypto::{HashAlgorithm, PublicKey, SignatureAlgorithm};
use crate::error::{Error, Result};
use crate::value::Value;

/// Weight a key needs to authorize a transaction alone.
pub const ACCOUNT_KEY_WEIGHT_THRESHOLD: u32 = 1000;

pub const ACCOUNT_CREATED_EVENT: &str = "flow.AccountCreated";
pub const ACCOUNT_CONTRACT_ADDED_EVENT: &str = "flow.AccountContractAdded";
pub const ACCOUNT_CONTRACT_UPDATED_EVENT: &str = "flow.AccountContractUpdated";
pub const ACCOUNT_CONTRACT_REMOVED_EVENT: &str = "flow.AccountContractRemoved";

// =============================================================================
// Identifier
// =============================================================================

/// 32-byte identifier of blocks, collections and transactions.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier(pub [u8; 32]);

impl Identifier {
    pub const EMPTY: Identifier = Identifier([0u8; 32]);

    pub fn from_hex(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let stripped = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = hex::decode(stripped)
            .map_err(|e| Error::InvalidArgument(format!("invalid identifier '{}': {}", s, e)))?;
        Self::from_slice(&bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| {
            Error::InvalidArgument(format!("identifier must be 32 bytes, got {}", bytes.len()))
        })?;
        Ok(Self(arr))
    }

    pub fn hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex())
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identifier({})", self.hex())
    }
}

impl FromStr for Identifier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Identifier::from_hex(s)
    }
}

impl Serialize for Identifier {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(&self.hex())
    }
}

impl<'de> Deserialize<'de> for Identifier {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        Identifier::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Accounts
// =============================================================================

/// A public key registered on an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountPublicKey {
    pub index: u32,
    pub public_key: PublicKey,
    pub sig_algo: SignatureAlgorithm,
    pub hash_algo: HashAlgorithm,
    pub weight: u32,
    pub sequence_number: u64,
    pub revoked: bool,
}

impl AccountPublicKey {
    pub fn new(public_key: PublicKey, hash_algo: HashAlgorithm, weight: u32) -> Self {
        Self {
            index: 0,
            sig_algo: public_key.algorithm(),
            public_key,
            hash_algo,
            weight,
            sequence_number: 0,
            revoked: false,
        }
    }

    /// Canonical RLP `[publicKey, sigAlgo, hashAlgo, weight]`.
    pub fn encode(&self) -> Vec<u8> {
        let mut stream = RlpStream::new_list(4);
        stream.append(&self.public_key.to_bytes());
        stream.append(&self.sig_algo.code());
        stream.append(&self.hash_algo.code());
        stream.append(&self.weight);
        stream.out().to_vec()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let rlp = Rlp::new(bytes);
        let bad = |e: rlp::DecoderError| Error::parse("account public key", e);
        if rlp.item_count().map_err(bad)? != 4 {
            return Err(Error::parse("account public key", "expected a 4-item list"));
        }
        let key_bytes: Vec<u8> = rlp.val_at(0).map_err(bad)?;
        let sig_algo = SignatureAlgorithm::from_code(rlp.val_at(1).map_err(bad)?)?;
        let hash_algo = HashAlgorithm::from_code(rlp.val_at(2).map_err(bad)?)?;
        let weight: u32 = rlp.val_at(3).map_err(bad)?;
        let public_key = PublicKey::from_bytes(sig_algo, &key_bytes)?;
        Ok(Self {
            index: 0,
            public_key,
            sig_algo,
            hash_algo,
            weight,
            sequence_number: 0,
            revoked: false,
        })
    }
}

/// Account state as seen on chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub address: Address,
    /// Balance in the smallest unit (1e-8 of a token).
    pub balance: u64,
    pub keys: Vec<AccountPublicKey>,
    pub contracts: BTreeMap<String, Vec<u8>>,
}

impl Account {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            balance: 0,
            keys: Vec::new(),
            contracts: BTreeMap::new(),
        }
    }

    pub fn key(&self, index: u32) -> Option<&AccountPublicKey> {
        self.keys.iter().find(|k| k.index == index)
    }

    /// Balance formatted with the eight fixed-point decimals.
    pub fn balance_string(&self) -> String {
        format_ufix64(self.balance)
    }
}

/// Format an integer amount of 1e-8 units as a fixed-point decimal.
pub fn format_ufix64(value: u64) -> String {
    format!("{}.{:08}", value / 100_000_000, value % 100_000_000)
}

// =============================================================================
// Blocks, collections, events
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub id: Identifier,
    pub parent_id: Identifier,
    pub height: u64,
    pub timestamp: DateTime<Utc>,
    pub collection_guarantees: Vec<Identifier>,
    pub seals: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub id: Identifier,
    pub transaction_ids: Vec<Identifier>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub event_type: String,
    pub transaction_id: Identifier,
    pub transaction_index: u32,
    pub event_index: u32,
    /// Decoded JSON payload.
    pub value: Value,
}

impl Event {
    /// Field of the event payload by name.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.value.field(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlockEvents {
    pub block_id: Identifier,
    pub height: u64,
    pub timestamp: DateTime<Utc>,
    pub events: Vec<Event>,
}

// =============================================================================
// Transaction results
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TransactionStatus {
    #[default]
    Unknown,
    Pending,
    Finalized,
    Executed,
    Sealed,
    Expired,
}

impl TransactionStatus {
    pub fn name(self) -> &'static str {
        match self {
            TransactionStatus::Unknown => "UNKNOWN",
            TransactionStatus::Pending => "PENDING",
            TransactionStatus::Finalized => "FINALIZED",
            TransactionStatus::Executed => "EXECUTED",
            TransactionStatus::Sealed => "SEALED",
            TransactionStatus::Expired => "EXPIRED",
        }
    }

    /// Parse the status names used by access APIs (any case).
    pub fn parse(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "PENDING" => TransactionStatus::Pending,
            "FINALIZED" => TransactionStatus::Finalized,
            "EXECUTED" => TransactionStatus::Executed,
            "SEALED" => TransactionStatus::Sealed,
            "EXPIRED" => TransactionStatus::Expired,
            _ => TransactionStatus::Unknown,
        }
    }

    pub fn is_final(self) -> bool {
        matches!(self, TransactionStatus::Sealed | TransactionStatus::Expired)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Execution result of a transaction. A sealed result with `error` set is a
/// value, not a failure of the call that fetched it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransactionResult {
    pub status: TransactionStatus,
    pub status_code: u32,
    pub error: Option<String>,
    pub events: Vec<Event>,
    pub block_id: Option<Identifier>,
}

impl TransactionResult {
    pub fn events_of_type<'a>(&'a self, event_type: &'a str) -> impl Iterator<Item = &'a Event> + 'a {
        self.events.iter().filter(move |e| e.event_type == event_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::PrivateKey;

    #[test]
    fn test_identifier_hex() {
        let hex = "aa".repeat(32);
        let id = Identifier::from_hex(&format!("0x{}", hex)).unwrap();
        assert_eq!(id.to_string(), hex);
        assert!(Identifier::from_hex("abcd").is_err());
        assert!(Identifier::EMPTY.is_empty());
    }

    #[test]
    fn test_account_key_encoding() {
        let private = PrivateKey::from_seed(SignatureAlgorithm::EcdsaSecp256k1, &[3u8; 32]).unwrap();
        let key = AccountPublicKey::new(private.public_key(), HashAlgorithm::Sha2_256, 500);
        let encoded = key.encode();

        let decoded = AccountPublicKey::decode(&encoded).unwrap();
        assert_eq!(decoded, key);
        assert_eq!(decoded.sig_algo, SignatureAlgorithm::EcdsaSecp256k1);
        assert_eq!(decoded.weight, 500);
        assert!(AccountPublicKey::decode(&[0xc0]).is_err());
    }

    #[test]
    fn test_balance_format() {
        assert_eq!(format_ufix64(0), "0.00000000");
        assert_eq!(format_ufix64(100_000_000_123), "1000.00000123");
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(TransactionStatus::parse("Sealed"), TransactionStatus::Sealed);
        assert_eq!(TransactionStatus::parse("weird"), TransactionStatus::Unknown);
        assert!(TransactionStatus::Expired.is_final());
        assert!(!TransactionStatus::Executed.is_final());
    }
}
