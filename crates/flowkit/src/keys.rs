//! Account keys as configured: either a private key held in memory or a
//! reference to a key in Google Cloud KMS.

use std::fmt;
use std::str::FromStr;

use flow_types::crypto::{HashAlgorithm, InMemorySigner, PrivateKey, SignatureAlgorithm, Signer};
use flow_types::{Error, Result};

use crate::kms::{KmsResource, KmsSigner};

/// How the key material is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    Hex,
    GoogleKms,
}

impl KeyType {
    pub fn name(self) -> &'static str {
        match self {
            KeyType::Hex => "hex",
            KeyType::GoogleKms => "google-kms",
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for KeyType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "hex" => Ok(KeyType::Hex),
            "google-kms" => Ok(KeyType::GoogleKms),
            other => Err(Error::BadKeyConfig(format!("unknown key type {:?}", other))),
        }
    }
}

/// A private key kept in the configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HexAccountKey {
    pub index: u32,
    pub hash_algo: HashAlgorithm,
    pub private_key: PrivateKey,
}

/// A key that never leaves KMS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KmsAccountKey {
    pub index: u32,
    pub sig_algo: SignatureAlgorithm,
    pub hash_algo: HashAlgorithm,
    pub resource: KmsResource,
}

/// Signing material of a configured account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountKey {
    Hex(HexAccountKey),
    Kms(KmsAccountKey),
}

impl AccountKey {
    /// Hex key at index 0 with the default hash algorithm.
    pub fn from_private_key(private_key: PrivateKey) -> Self {
        AccountKey::Hex(HexAccountKey {
            index: 0,
            hash_algo: HashAlgorithm::default(),
            private_key,
        })
    }

    /// Build a key from its configured parts.
    ///
    /// Exactly one of `private_key` (for `hex`) or `resource_id` (for
    /// `google-kms`) must be present.
    pub fn from_parts(
        key_type: KeyType,
        index: i64,
        sig_algo: SignatureAlgorithm,
        hash_algo: HashAlgorithm,
        private_key: Option<&str>,
        resource_id: Option<&str>,
    ) -> Result<Self> {
        let index = u32::try_from(index)
            .map_err(|_| Error::BadKeyConfig(format!("key index {} must be a non-negative integer", index)))?;

        match (key_type, private_key, resource_id) {
            (_, Some(_), Some(_)) => Err(Error::BadKeyConfig(
                "only one of privateKey or resourceID may be set".to_string(),
            )),
            (KeyType::Hex, Some(hex_key), None) => Ok(AccountKey::Hex(HexAccountKey {
                index,
                hash_algo,
                private_key: PrivateKey::from_hex(sig_algo, hex_key)
                    .map_err(|e| Error::BadKeyConfig(format!("invalid private key: {}", e)))?,
            })),
            (KeyType::GoogleKms, None, Some(resource_id)) => Ok(AccountKey::Kms(KmsAccountKey {
                index,
                sig_algo,
                hash_algo,
                resource: resource_id.parse()?,
            })),
            (KeyType::Hex, _, _) => Err(Error::BadKeyConfig("hex key requires privateKey".to_string())),
            (KeyType::GoogleKms, _, _) => {
                Err(Error::BadKeyConfig("google-kms key requires resourceID".to_string()))
            }
        }
    }

    pub fn key_type(&self) -> KeyType {
        match self {
            AccountKey::Hex(_) => KeyType::Hex,
            AccountKey::Kms(_) => KeyType::GoogleKms,
        }
    }

    pub fn index(&self) -> u32 {
        match self {
            AccountKey::Hex(k) => k.index,
            AccountKey::Kms(k) => k.index,
        }
    }

    pub fn sig_algo(&self) -> SignatureAlgorithm {
        match self {
            AccountKey::Hex(k) => k.private_key.algorithm(),
            AccountKey::Kms(k) => k.sig_algo,
        }
    }

    pub fn hash_algo(&self) -> HashAlgorithm {
        match self {
            AccountKey::Hex(k) => k.hash_algo,
            AccountKey::Kms(k) => k.hash_algo,
        }
    }

    pub fn private_key(&self) -> Option<&PrivateKey> {
        match self {
            AccountKey::Hex(k) => Some(&k.private_key),
            AccountKey::Kms(_) => None,
        }
    }

    pub fn resource_id(&self) -> Option<String> {
        match self {
            AccountKey::Hex(_) => None,
            AccountKey::Kms(k) => Some(k.resource.to_string()),
        }
    }

    /// Whether the simple `"key": "<hex>"` form captures this key entirely.
    pub fn is_default(&self) -> bool {
        matches!(self, AccountKey::Hex(k)
            if k.index == 0
                && k.hash_algo == HashAlgorithm::default()
                && k.private_key.algorithm() == SignatureAlgorithm::default())
    }

    /// A signer for this key.
    ///
    /// KMS signers make sure application default credentials exist before the
    /// first use, running the `gcloud` login helper if necessary.
    pub fn signer(&self) -> Result<Box<dyn Signer>> {
        match self {
            AccountKey::Hex(k) => Ok(Box::new(InMemorySigner::new(k.private_key.clone(), k.hash_algo))),
            AccountKey::Kms(k) => Ok(Box::new(KmsSigner::new(k.resource.clone(), k.sig_algo, k.hash_algo)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "21c5dfdeb0ff03a7a73ef39788563b62c89adea67bbb21ab95e5f710bd1d40b7";
    const RESOURCE: &str =
        "projects/my-project/locations/global/keyRings/flow/cryptoKeys/deployer/cryptoKeyVersions/1";

    #[test]
    fn test_hex_key() {
        let key = AccountKey::from_parts(
            KeyType::Hex,
            0,
            SignatureAlgorithm::EcdsaP256,
            HashAlgorithm::Sha3_256,
            Some(KEY),
            None,
        )
        .unwrap();
        assert_eq!(key.key_type(), KeyType::Hex);
        assert!(key.is_default());
        assert_eq!(key.private_key().unwrap().to_string(), format!("0x{}", KEY));

        let signer = key.signer().unwrap();
        let signature = signer.sign(b"message").unwrap();
        assert!(signer
            .public_key()
            .unwrap()
            .verify(HashAlgorithm::Sha3_256, b"message", &signature));
    }

    #[test]
    fn test_non_default_key() {
        let key = AccountKey::from_parts(
            KeyType::Hex,
            1,
            SignatureAlgorithm::EcdsaSecp256k1,
            HashAlgorithm::Sha2_256,
            Some(KEY),
            None,
        )
        .unwrap();
        assert!(!key.is_default());
        assert_eq!(key.index(), 1);
        assert_eq!(key.sig_algo(), SignatureAlgorithm::EcdsaSecp256k1);
    }

    #[test]
    fn test_kms_key() {
        let key = AccountKey::from_parts(
            KeyType::GoogleKms,
            0,
            SignatureAlgorithm::EcdsaP256,
            HashAlgorithm::Sha2_256,
            None,
            Some(RESOURCE),
        )
        .unwrap();
        assert_eq!(key.key_type(), KeyType::GoogleKms);
        assert_eq!(key.resource_id().as_deref(), Some(RESOURCE));
        assert!(key.private_key().is_none());
        assert!(!key.is_default());
    }

    #[test]
    fn test_bad_key_configs() {
        let p256 = SignatureAlgorithm::EcdsaP256;
        let sha3 = HashAlgorithm::Sha3_256;
        let cases = [
            AccountKey::from_parts(KeyType::Hex, 0, p256, sha3, Some(KEY), Some(RESOURCE)),
            AccountKey::from_parts(KeyType::Hex, 0, p256, sha3, None, None),
            AccountKey::from_parts(KeyType::Hex, 0, p256, sha3, Some("zz"), None),
            AccountKey::from_parts(KeyType::Hex, -1, p256, sha3, Some(KEY), None),
            AccountKey::from_parts(KeyType::GoogleKms, 0, p256, sha3, None, Some("projects/x")),
            AccountKey::from_parts(KeyType::GoogleKms, 0, p256, sha3, Some(KEY), None),
        ];
        for result in cases {
            assert!(matches!(result, Err(Error::BadKeyConfig(_))), "{:?}", result);
        }
        assert!(matches!("aws-kms".parse::<KeyType>(), Err(Error::BadKeyConfig(_))));
    }
}
