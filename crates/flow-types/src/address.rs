//! Account addresses and chain-scoped address validity.
//!
//! This module is the canonical source for address parsing and normalization in
//! the workspace. Other crates should import from here rather than defining
//! their own logic.
//!
//! Flow addresses are 8-byte values, usually written as 16 lowercase hex
//! characters with or without a `0x` prefix:
//! - Short form: "0x1"
//! - Full form: "0x0000000000000001"
//! - Without prefix: "f8d6e0586b0a20c7"
//!
//! Addresses are generated as codewords of a [64,45] linear code XORed with a
//! chain-specific codeword, so an address is valid on at most one chain.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

/// Length of an address in bytes.
pub const ADDRESS_LENGTH: usize = 8;

/// Number of information bits of the address code.
const LINEAR_CODE_K: usize = 45;

/// Number of bits of an address.
const LINEAR_CODE_N: usize = 64;

/// Rows of the generator matrix of the address code.
const GENERATOR_MATRIX_ROWS: [u64; LINEAR_CODE_K] = [
    0xe467b9dd11fa00df, 0xf233dcee88fe0abe, 0xf919ee77447b7497, 0xfc8cf73ba23a260d,
    0xfe467b9dd11ee2a1, 0xff233dcee888d807, 0xff919ee774476ce6, 0x7fc8cf73ba231d10,
    0x3fe467b9dd11b183, 0x1ff233dcee8f96d6, 0x8ff919ee774757ba, 0x47fc8cf73ba2b331,
    0x23fe467b9dd27f6c, 0x11ff233dceee8e82, 0x88ff919ee775dd8f, 0x447fc8cf73b905e4,
    0xa23fe467b9de0d83, 0xd11ff233dce8d5a7, 0xe88ff919ee73c38a, 0x7447fc8cf73f171f,
    0xba23fe467b9dcb2b, 0xdd11ff233dcb0cb4, 0xee88ff919ee26c5d, 0x77447fc8cf775dd3,
    0x3ba23fe467b9b5a1, 0x9dd11ff233d9117a, 0xcee88ff919efa640, 0xe77447fc8cf3e297,
    0x73ba23fe467fabd2, 0xb9dd11ff233fb16c, 0xdcee88ff919adde7, 0xee77447fc8ceb196,
    0xf73ba23fe4621cd0, 0x7b9dd11ff2379ac3, 0x3dcee88ff91df46c, 0x9ee77447fc88e702,
    0xcf73ba23fe4131b6, 0x67b9dd11ff240f9a, 0x33dcee88ff90f9e0, 0x19ee77447fcff4e3,
    0x8cf73ba23fe64091, 0x467b9dd11ff115c7, 0x233dcee88ffdb735, 0x119ee77447fe2336,
    0x08cf73ba23fdc6ce,
];

/// Columns of the parity-check matrix of the address code.
const PARITY_CHECK_MATRIX_COLUMNS: [u64; LINEAR_CODE_N] = [
    0x00001, 0x00002, 0x00004, 0x00008, 0x00010, 0x00020, 0x00040, 0x00080,
    0x00100, 0x00200, 0x00400, 0x00800, 0x01000, 0x02000, 0x04000, 0x08000,
    0x10000, 0x20000, 0x40000, 0x7328d, 0x6689a, 0x6112f, 0x6084b, 0x433fd,
    0x42aab, 0x41951, 0x233ce, 0x22a81, 0x21948, 0x1ef60, 0x1deca, 0x1c639,
    0x1bdd8, 0x1a535, 0x194ac, 0x18c46, 0x1632b, 0x1529b, 0x14a43, 0x13184,
    0x12942, 0x118c1, 0x0f812, 0x0e027, 0x0d00e, 0x0c83c, 0x0b01d, 0x0a831,
    0x0982b, 0x07034, 0x0682a, 0x05819, 0x03807, 0x007d2, 0x00727, 0x0068e,
    0x0067c, 0x0059d, 0x004eb, 0x003b4, 0x0036a, 0x002d9, 0x001c7, 0x0003f,
];

/// Chains an address can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Mainnet,
    Testnet,
    Emulator,
}

impl Chain {
    pub const ALL: [Chain; 3] = [Chain::Mainnet, Chain::Testnet, Chain::Emulator];

    fn codeword(self) -> u64 {
        match self {
            Chain::Mainnet => 0,
            Chain::Testnet => 0x6834ba37b3980209,
            Chain::Emulator => 0x1cb159857af02018,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Chain::Mainnet => "mainnet",
            Chain::Testnet => "testnet",
            Chain::Emulator => "emulator",
        }
    }

    /// Chain identifier as reported by access nodes.
    pub fn chain_id(self) -> &'static str {
        match self {
            Chain::Mainnet => "flow-mainnet",
            Chain::Testnet => "flow-testnet",
            Chain::Emulator => "flow-emulator",
        }
    }

    /// Address of the service account (first generated address) on this chain.
    pub fn service_address(self) -> Address {
        AddressGenerator::new(self).next_address()
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Chain {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "mainnet" | "flow-mainnet" => Ok(Chain::Mainnet),
            "testnet" | "flow-testnet" => Ok(Chain::Testnet),
            "emulator" | "flow-emulator" | "local" => Ok(Chain::Emulator),
            other => Err(Error::InvalidArgument(format!("unknown chain '{}'", other))),
        }
    }
}

/// An 8-byte account address.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    pub const EMPTY: Address = Address([0u8; ADDRESS_LENGTH]);

    pub const fn new(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn from_u64(value: u64) -> Self {
        Self(value.to_be_bytes())
    }

    pub fn to_u64(self) -> u64 {
        u64::from_be_bytes(self.0)
    }

    /// Parse a hex address, with or without `0x`, left-padding short forms.
    pub fn from_hex(s: &str) -> Result<Self> {
        let normalized = normalize_address(s);
        if normalized.len() != ADDRESS_LENGTH * 2 {
            return Err(Error::InvalidArgument(format!(
                "invalid address '{}': longer than {} bytes",
                s, ADDRESS_LENGTH
            )));
        }
        let bytes = hex::decode(&normalized)
            .map_err(|e| Error::InvalidArgument(format!("invalid address '{}': {}", s, e)))?;
        Self::from_bytes(&bytes)
    }

    /// Build from raw bytes; shorter inputs are left-padded with zeros.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() > ADDRESS_LENGTH {
            return Err(Error::InvalidArgument(format!(
                "address has {} bytes, expected at most {}",
                bytes.len(),
                ADDRESS_LENGTH
            )));
        }
        let mut out = [0u8; ADDRESS_LENGTH];
        out[ADDRESS_LENGTH - bytes.len()..].copy_from_slice(bytes);
        Ok(Self(out))
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    /// Lowercase hex without prefix.
    pub fn hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Lowercase hex with `0x` prefix.
    pub fn hex_with_prefix(&self) -> String {
        format!("0x{}", self.hex())
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }

    /// Whether this address is a valid codeword for the given chain.
    pub fn is_valid(&self, chain: Chain) -> bool {
        let codeword = self.to_u64() ^ chain.codeword();
        if codeword == 0 {
            return false;
        }
        is_valid_codeword(codeword)
    }

    /// The single chain on which this address is valid.
    pub fn chain(&self) -> Result<Chain> {
        Chain::ALL
            .into_iter()
            .find(|chain| self.is_valid(*chain))
            .ok_or_else(|| {
                Error::InvalidArgument(format!("address {} is not valid on any chain", self))
            })
    }
}

fn is_valid_codeword(mut codeword: u64) -> bool {
    let mut parity = 0u64;
    for column in PARITY_CHECK_MATRIX_COLUMNS {
        if codeword & 1 == 1 {
            parity ^= column;
        }
        codeword >>= 1;
    }
    parity == 0
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.hex_with_prefix())
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Address::from_hex(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Generates the sequence of account addresses of a chain.
#[derive(Debug, Clone)]
pub struct AddressGenerator {
    chain: Chain,
    index: u64,
}

impl AddressGenerator {
    pub fn new(chain: Chain) -> Self {
        Self { chain, index: 0 }
    }

    /// Resume generation after `index` addresses have been handed out.
    pub fn at_index(chain: Chain, index: u64) -> Self {
        Self { chain, index }
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn next_address(&mut self) -> Address {
        self.index += 1;
        let mut word = 0u64;
        for (bit, row) in GENERATOR_MATRIX_ROWS.iter().enumerate() {
            if (self.index >> bit) & 1 == 1 {
                word ^= row;
            }
        }
        Address::from_u64(word ^ self.chain.codeword())
    }
}

/// Normalize an address to 16 lowercase hex characters without prefix.
///
/// # Examples
///
/// ```
/// use flow_types::address::normalize_address;
///
/// assert_eq!(normalize_address("0x1"), "0000000000000001");
/// assert_eq!(normalize_address("F8D6E0586B0A20C7"), "f8d6e0586b0a20c7");
/// ```
pub fn normalize_address(addr: &str) -> String {
    let addr = addr.trim();
    let hex = addr
        .strip_prefix("0x")
        .or_else(|| addr.strip_prefix("0X"))
        .unwrap_or(addr)
        .to_lowercase();
    format!("{:0>16}", hex)
}

/// Parse an address, returning None if it is not valid hex.
pub fn parse_address(addr: &str) -> Option<Address> {
    Address::from_hex(addr).ok()
}
