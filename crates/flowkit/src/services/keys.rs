//! Key generation and decoding. Needs no gateway.

use flow_types::encoding::parse_hex_bytes;
use flow_types::{AccountPublicKey, PrivateKey, Result, SignatureAlgorithm};

#[derive(Debug, Clone, Copy, Default)]
pub struct Keys;

impl Keys {
    /// A new private key, derived from `seed` when given.
    pub fn generate(&self, seed: Option<&str>, sig_algo: SignatureAlgorithm) -> Result<PrivateKey> {
        match seed {
            Some(seed) => PrivateKey::from_seed(sig_algo, seed.as_bytes()),
            None => PrivateKey::generate(sig_algo),
        }
    }

    /// Decode an RLP encoded account public key.
    pub fn decode(&self, encoded: &str) -> Result<AccountPublicKey> {
        AccountPublicKey::decode(&parse_hex_bytes(encoded, "account key")?)
    }
}
