//! Signature and hash algorithms, key pairs, and the `Signer` capability.
//!
//! Both supported curves produce raw 64-byte `r||s` signatures over a 32-byte
//! digest of the message. Public keys are carried as the 64-byte uncompressed
//! point without the SEC1 `0x04` tag.

use std::fmt;
use std::str::FromStr;

use k256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use sha3::{Digest, Sha3_256};

use crate::error::{Error, Result};

/// Shortest seed accepted for deterministic key generation.
pub const MIN_SEED_LENGTH: usize = 32;

/// Length of a raw `r||s` signature.
pub const SIGNATURE_LENGTH: usize = 64;

/// Length of an uncompressed public key without prefix.
pub const PUBLIC_KEY_LENGTH: usize = 64;

// =============================================================================
// Algorithms
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SignatureAlgorithm {
    #[default]
    EcdsaP256,
    EcdsaSecp256k1,
}

impl SignatureAlgorithm {
    pub fn name(self) -> &'static str {
        match self {
            SignatureAlgorithm::EcdsaP256 => "ECDSA_P256",
            SignatureAlgorithm::EcdsaSecp256k1 => "ECDSA_secp256k1",
        }
    }

    /// Numeric code used in the canonical account key encoding.
    pub fn code(self) -> u32 {
        match self {
            SignatureAlgorithm::EcdsaP256 => 2,
            SignatureAlgorithm::EcdsaSecp256k1 => 3,
        }
    }

    pub fn from_code(code: u32) -> Result<Self> {
        match code {
            2 => Ok(SignatureAlgorithm::EcdsaP256),
            3 => Ok(SignatureAlgorithm::EcdsaSecp256k1),
            other => Err(Error::BadKeyConfig(format!(
                "unsupported signature algorithm code {}",
                other
            ))),
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SignatureAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "ECDSA_P256" | "P256" | "ECDSA_P-256" => Ok(SignatureAlgorithm::EcdsaP256),
            "ECDSA_SECP256K1" | "SECP256K1" => Ok(SignatureAlgorithm::EcdsaSecp256k1),
            _ => Err(Error::BadKeyConfig(format!(
                "unsupported signature algorithm '{}'",
                s
            ))),
        }
    }
}

impl Serialize for SignatureAlgorithm {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for SignatureAlgorithm {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HashAlgorithm {
    Sha2_256,
    #[default]
    Sha3_256,
}

impl HashAlgorithm {
    pub fn name(self) -> &'static str {
        match self {
            HashAlgorithm::Sha2_256 => "SHA2_256",
            HashAlgorithm::Sha3_256 => "SHA3_256",
        }
    }

    pub fn code(self) -> u32 {
        match self {
            HashAlgorithm::Sha2_256 => 1,
            HashAlgorithm::Sha3_256 => 3,
        }
    }

    pub fn from_code(code: u32) -> Result<Self> {
        match code {
            1 => Ok(HashAlgorithm::Sha2_256),
            3 => Ok(HashAlgorithm::Sha3_256),
            other => Err(Error::BadKeyConfig(format!(
                "unsupported hash algorithm code {}",
                other
            ))),
        }
    }

    pub fn digest(self, message: &[u8]) -> [u8; 32] {
        match self {
            HashAlgorithm::Sha2_256 => Sha256::digest(message).into(),
            HashAlgorithm::Sha3_256 => Sha3_256::digest(message).into(),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "SHA2_256" | "SHA256" | "SHA2-256" => Ok(HashAlgorithm::Sha2_256),
            "SHA3_256" | "SHA3-256" => Ok(HashAlgorithm::Sha3_256),
            _ => Err(Error::BadKeyConfig(format!("unsupported hash algorithm '{}'", s))),
        }
    }
}

impl Serialize for HashAlgorithm {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for HashAlgorithm {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Keys
// =============================================================================

/// A private key on one of the supported curves.
#[derive(Clone)]
pub enum PrivateKey {
    P256(p256::ecdsa::SigningKey),
    Secp256k1(k256::ecdsa::SigningKey),
}

impl PrivateKey {
    /// Decode a 32-byte scalar given as hex, with or without `0x`.
    pub fn from_hex(algorithm: SignatureAlgorithm, hex_str: &str) -> Result<Self> {
        let trimmed = hex_str.trim();
        let stripped = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = hex::decode(stripped)
            .map_err(|e| Error::BadKeyConfig(format!("invalid private key hex: {}", e)))?;
        Self::from_bytes(algorithm, &bytes)
    }

    pub fn from_bytes(algorithm: SignatureAlgorithm, bytes: &[u8]) -> Result<Self> {
        let bad = |e: &dyn fmt::Display| {
            Error::BadKeyConfig(format!("invalid {} private key: {}", algorithm, e))
        };
        match algorithm {
            SignatureAlgorithm::EcdsaP256 => p256::ecdsa::SigningKey::from_slice(bytes)
                .map(PrivateKey::P256)
                .map_err(|e| bad(&e)),
            SignatureAlgorithm::EcdsaSecp256k1 => k256::ecdsa::SigningKey::from_slice(bytes)
                .map(PrivateKey::Secp256k1)
                .map_err(|e| bad(&e)),
        }
    }

    /// Derive a key deterministically from a seed of at least 32 bytes.
    pub fn from_seed(algorithm: SignatureAlgorithm, seed: &[u8]) -> Result<Self> {
        if seed.len() < MIN_SEED_LENGTH {
            return Err(Error::InvalidArgument(format!(
                "seed must be at least {} bytes, got {}",
                MIN_SEED_LENGTH,
                seed.len()
            )));
        }
        // Out-of-range candidates are astronomically rare; retry with a counter.
        for counter in 0u32..16 {
            let mut hasher = Sha3_256::new();
            hasher.update(algorithm.name().as_bytes());
            hasher.update(seed);
            hasher.update(counter.to_be_bytes());
            let candidate: [u8; 32] = hasher.finalize().into();
            if let Ok(key) = Self::from_bytes(algorithm, &candidate) {
                return Ok(key);
            }
        }
        Err(Error::InvalidArgument(
            "seed does not derive a valid private key".to_string(),
        ))
    }

    /// Generate a fresh key from a random seed of the minimum length.
    pub fn generate(algorithm: SignatureAlgorithm) -> Result<Self> {
        let mut seed = [0u8; MIN_SEED_LENGTH];
        rand::thread_rng().fill_bytes(&mut seed);
        Self::from_seed(algorithm, &seed)
    }

    pub fn algorithm(&self) -> SignatureAlgorithm {
        match self {
            PrivateKey::P256(_) => SignatureAlgorithm::EcdsaP256,
            PrivateKey::Secp256k1(_) => SignatureAlgorithm::EcdsaSecp256k1,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            PrivateKey::P256(k) => k.to_bytes().to_vec(),
            PrivateKey::Secp256k1(k) => k.to_bytes().to_vec(),
        }
    }

    /// Lowercase hex without prefix, as stored in configuration files.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    pub fn public_key(&self) -> PublicKey {
        match self {
            PrivateKey::P256(k) => PublicKey::P256(*k.verifying_key()),
            PrivateKey::Secp256k1(k) => PublicKey::Secp256k1(*k.verifying_key()),
        }
    }

    /// Sign the digest of `message` under `hash`, returning raw `r||s`.
    pub fn sign(&self, hash: HashAlgorithm, message: &[u8]) -> Result<Vec<u8>> {
        let digest = hash.digest(message);
        let signing_failed = |e: &dyn fmt::Display| Error::BadKeyConfig(format!("signing failed: {}", e));
        match self {
            PrivateKey::P256(k) => {
                let sig: p256::ecdsa::Signature = k.sign_prehash(&digest).map_err(|e| signing_failed(&e))?;
                Ok(sig.to_bytes().to_vec())
            }
            PrivateKey::Secp256k1(k) => {
                let sig: k256::ecdsa::Signature = k.sign_prehash(&digest).map_err(|e| signing_failed(&e))?;
                Ok(sig.to_bytes().to_vec())
            }
        }
    }
}

/// Displays as `0x`-prefixed hex.
impl fmt::Display for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey({}, <redacted>)", self.algorithm())
    }
}

impl PartialEq for PrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.algorithm() == other.algorithm() && self.to_bytes() == other.to_bytes()
    }
}

impl Eq for PrivateKey {}

/// A public key on one of the supported curves.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum PublicKey {
    P256(p256::ecdsa::VerifyingKey),
    Secp256k1(k256::ecdsa::VerifyingKey),
}

impl PublicKey {
    /// Decode a 64-byte uncompressed point (a leading `0x04` tag is tolerated).
    pub fn from_bytes(algorithm: SignatureAlgorithm, bytes: &[u8]) -> Result<Self> {
        let mut sec1 = Vec::with_capacity(PUBLIC_KEY_LENGTH + 1);
        match bytes.len() {
            PUBLIC_KEY_LENGTH => {
                sec1.push(0x04);
                sec1.extend_from_slice(bytes);
            }
            65 if bytes[0] == 0x04 => sec1.extend_from_slice(bytes),
            n => {
                return Err(Error::BadKeyConfig(format!(
                    "public key must be {} bytes, got {}",
                    PUBLIC_KEY_LENGTH, n
                )))
            }
        }
        let bad = |e: &dyn fmt::Display| {
            Error::BadKeyConfig(format!("invalid {} public key: {}", algorithm, e))
        };
        match algorithm {
            SignatureAlgorithm::EcdsaP256 => p256::ecdsa::VerifyingKey::from_sec1_bytes(&sec1)
                .map(PublicKey::P256)
                .map_err(|e| bad(&e)),
            SignatureAlgorithm::EcdsaSecp256k1 => {
                k256::ecdsa::VerifyingKey::from_sec1_bytes(&sec1)
                    .map(PublicKey::Secp256k1)
                    .map_err(|e| bad(&e))
            }
        }
    }

    pub fn from_hex(algorithm: SignatureAlgorithm, hex_str: &str) -> Result<Self> {
        let trimmed = hex_str.trim();
        let stripped = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = hex::decode(stripped)
            .map_err(|e| Error::BadKeyConfig(format!("invalid public key hex: {}", e)))?;
        Self::from_bytes(algorithm, &bytes)
    }

    /// Decode a SubjectPublicKeyInfo PEM document, as returned by cloud KMS.
    pub fn from_pem(algorithm: SignatureAlgorithm, pem: &str) -> Result<Self> {
        use p256::pkcs8::DecodePublicKey;
        let bad = |e: &dyn fmt::Display| {
            Error::BadKeyConfig(format!("invalid {} public key PEM: {}", algorithm, e))
        };
        match algorithm {
            SignatureAlgorithm::EcdsaP256 => p256::PublicKey::from_public_key_pem(pem)
                .map(|k| PublicKey::P256(k.into()))
                .map_err(|e| bad(&e)),
            SignatureAlgorithm::EcdsaSecp256k1 => k256::PublicKey::from_public_key_pem(pem)
                .map(|k| PublicKey::Secp256k1(k.into()))
                .map_err(|e| bad(&e)),
        }
    }

    pub fn algorithm(&self) -> SignatureAlgorithm {
        match self {
            PublicKey::P256(_) => SignatureAlgorithm::EcdsaP256,
            PublicKey::Secp256k1(_) => SignatureAlgorithm::EcdsaSecp256k1,
        }
    }

    /// 64-byte uncompressed point without the SEC1 tag.
    pub fn to_bytes(&self) -> Vec<u8> {
        let point = match self {
            PublicKey::P256(k) => k.to_encoded_point(false).as_bytes().to_vec(),
            PublicKey::Secp256k1(k) => k.to_encoded_point(false).as_bytes().to_vec(),
        };
        point[1..].to_vec()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Verify a raw `r||s` signature over the digest of `message`.
    pub fn verify(&self, hash: HashAlgorithm, message: &[u8], signature: &[u8]) -> bool {
        let digest = hash.digest(message);
        match self {
            PublicKey::P256(k) => p256::ecdsa::Signature::from_slice(signature)
                .map(|sig| k.verify_prehash(&digest, &sig).is_ok())
                .unwrap_or(false),
            PublicKey::Secp256k1(k) => k256::ecdsa::Signature::from_slice(signature)
                .map(|sig| k.verify_prehash(&digest, &sig).is_ok())
                .unwrap_or(false),
        }
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({}, 0x{})", self.algorithm(), self.to_hex())
    }
}

/// Convert a DER-encoded ECDSA signature to raw `r||s`.
pub fn der_to_raw_signature(algorithm: SignatureAlgorithm, der: &[u8]) -> Result<Vec<u8>> {
    let bad = |e: &dyn fmt::Display| Error::parse("DER signature", e);
    match algorithm {
        SignatureAlgorithm::EcdsaP256 => p256::ecdsa::Signature::from_der(der)
            .map(|sig| sig.to_bytes().to_vec())
            .map_err(|e| bad(&e)),
        SignatureAlgorithm::EcdsaSecp256k1 => k256::ecdsa::Signature::from_der(der)
            .map(|sig| {
                let sig = sig.normalize_s().unwrap_or(sig);
                sig.to_bytes().to_vec()
            })
            .map_err(|e| bad(&e)),
    }
}

// =============================================================================
// Signer
// =============================================================================

/// Produces signatures over arbitrary messages with a fixed key and hash.
pub trait Signer: Send + Sync {
    /// Sign `message`; the implementation hashes it with its configured algorithm.
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>>;

    fn public_key(&self) -> Result<PublicKey>;

    fn hash_algorithm(&self) -> HashAlgorithm;
}

/// Signer backed by a private key held in memory.
#[derive(Debug, Clone)]
pub struct InMemorySigner {
    key: PrivateKey,
    hash: HashAlgorithm,
}

impl InMemorySigner {
    pub fn new(key: PrivateKey, hash: HashAlgorithm) -> Self {
        Self { key, hash }
    }

    pub fn private_key(&self) -> &PrivateKey {
        &self.key
    }
}

impl Signer for InMemorySigner {
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        self.key.sign(self.hash, message)
    }

    fn public_key(&self) -> Result<PublicKey> {
        Ok(self.key.public_key())
    }

    fn hash_algorithm(&self) -> HashAlgorithm {
        self.hash
    }
}
