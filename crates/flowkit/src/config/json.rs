//! `flow.json` format.
//!
//! ```json
//! {
//!   "emulators": { "default": { "port": 3569, "serviceAccount": "emulator-account" } },
//!   "contracts": {
//!     "Foo": "./cadence/contracts/Foo.cdc",
//!     "FungibleToken": {
//!       "source": "./cadence/contracts/FungibleToken.cdc",
//!       "aliases": { "testnet": "9a0766d93b6608b7" }
//!     }
//!   },
//!   "networks": {
//!     "emulator": "127.0.0.1:3569",
//!     "testnet": { "host": "access.devnet.nodes.onflow.org:9000", "network-key": "ba69f7d2..." }
//!   },
//!   "accounts": {
//!     "emulator-account": { "address": "f8d6e0586b0a20c7", "key": "21c5dfde..." },
//!     "deployer": {
//!       "address": "01cf0e2f2f715450",
//!       "key": { "type": "google-kms", "index": 0, "signatureAlgorithm": "ECDSA_P256",
//!                "hashAlgorithm": "SHA2_256", "resourceID": "projects/..." }
//!     }
//!   },
//!   "deployments": {
//!     "emulator": { "emulator-account": ["Foo", { "name": "Bar", "args": [{ "type": "String", "value": "x" }] }] }
//!   }
//! }
//! ```
//!
//! Serialization picks the most compact form of every entry.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value as Json};
use tracing::warn;

use flow_types::crypto::{HashAlgorithm, SignatureAlgorithm};
use flow_types::{Address, Chain, Error, Result, Value};

use super::loader::Parser;
use super::{Account, Config, Contract, ContractDeployment, Deployment, Emulator, Network};
use crate::keys::{AccountKey, KeyType};

/// The address sentinel for the emulator service account.
const SERVICE_ADDRESS: &str = "service";

/// Account-level key fields of the pre-`key` format.
const LEGACY_ACCOUNT_FIELDS: [&str; 3] = ["privateKey", "sigAlgorithm", "hashAlgorithm"];

// =============================================================================
// Raw shapes
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEmulator {
    #[serde(default)]
    port: Option<u16>,
    service_account: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawContract {
    Simple(String),
    Advanced {
        source: String,
        #[serde(default)]
        aliases: Map<String, Json>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawNetwork {
    Simple(String),
    Advanced {
        host: String,
        #[serde(default, rename = "network-key", alias = "key")]
        key: Option<String>,
        #[serde(default)]
        chain: Option<String>,
    },
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct RawKey {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    key_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    index: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    signature_algorithm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    hash_algorithm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    private_key: Option<String>,
    #[serde(rename = "resourceID", default, skip_serializing_if = "Option::is_none")]
    resource_id: Option<String>,
    /// Pre-release files nested the private key here.
    #[serde(default, skip_serializing)]
    context: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawKeyField {
    Simple(String),
    Advanced(RawKey),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawLegacyKeys {
    Simple(String),
    List(Vec<RawKey>),
}

#[derive(Debug, Deserialize)]
struct RawAccount {
    address: String,
    #[serde(default)]
    key: Option<RawKeyField>,
    #[serde(default)]
    keys: Option<RawLegacyKeys>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawContractDeployment {
    Simple(String),
    Advanced {
        name: String,
        #[serde(default)]
        args: Vec<Json>,
    },
}

// =============================================================================
// Decoding
// =============================================================================

fn bad(subject: &str, err: impl std::fmt::Display) -> Error {
    Error::parse(subject, err)
}

fn parse_address(raw: &str) -> Result<Address> {
    if raw == SERVICE_ADDRESS {
        return Ok(Chain::Emulator.service_address());
    }
    Address::from_hex(raw)
}

fn decode_key(raw: RawKey) -> Result<AccountKey> {
    let key_type = raw.key_type.as_deref().unwrap_or("hex").parse::<KeyType>()?;
    let sig_algo = match raw.signature_algorithm.as_deref() {
        Some(name) if !name.is_empty() => name.parse::<SignatureAlgorithm>()?,
        _ => SignatureAlgorithm::default(),
    };
    let hash_algo = match raw.hash_algorithm.as_deref() {
        Some(name) if !name.is_empty() => name.parse::<HashAlgorithm>()?,
        _ => HashAlgorithm::default(),
    };
    let lifted = raw.context.as_ref().and_then(|ctx| ctx.get("privateKey")).cloned();
    let private_key = raw.private_key.or(lifted);

    AccountKey::from_parts(
        key_type,
        raw.index.unwrap_or(0),
        sig_algo,
        hash_algo,
        private_key.as_deref(),
        raw.resource_id.as_deref(),
    )
}

fn decode_account(name: &str, raw: RawAccount) -> Result<Account> {
    let address = parse_address(&raw.address)
        .map_err(|e| Error::parse(format!("account {}", name), e))?;

    let key = match (raw.key, raw.keys) {
        (Some(RawKeyField::Simple(hex_key)), _) => decode_key(RawKey {
            private_key: Some(hex_key),
            ..RawKey::default()
        })?,
        (Some(RawKeyField::Advanced(key)), _) => decode_key(key)?,
        (None, Some(RawLegacyKeys::Simple(hex_key))) => {
            warn!(account = name, "normalizing legacy keys field");
            decode_key(RawKey {
                private_key: Some(hex_key),
                ..RawKey::default()
            })?
        }
        (None, Some(RawLegacyKeys::List(mut keys))) if !keys.is_empty() => {
            warn!(account = name, "normalizing legacy keys list, only the first key is kept");
            decode_key(keys.remove(0))?
        }
        _ => {
            return Err(Error::BadKeyConfig(format!("account {} has no key", name)));
        }
    };

    Ok(Account {
        name: name.to_string(),
        address,
        key,
    })
}

fn decode_contracts(name: &str, raw: RawContract) -> Result<Vec<Contract>> {
    match raw {
        RawContract::Simple(source) => Ok(vec![Contract::new(name, source)]),
        RawContract::Advanced { source, aliases } => {
            let mut contracts = vec![Contract::new(name, source.clone())];
            for (network, alias) in aliases {
                let alias = alias
                    .as_str()
                    .ok_or_else(|| bad(&format!("contract {}", name), "alias must be an address string"))?;
                contracts.push(Contract {
                    name: name.to_string(),
                    source: source.clone(),
                    network,
                    alias: Some(Address::from_hex(alias)?),
                });
            }
            Ok(contracts)
        }
    }
}

fn decode_network(name: &str, raw: RawNetwork) -> Network {
    match raw {
        RawNetwork::Simple(host) => Network::new(name, host),
        RawNetwork::Advanced { host, key, chain } => {
            if chain.is_some() {
                warn!(network = name, "ignoring legacy chain field");
            }
            Network {
                name: name.to_string(),
                host,
                key: key.filter(|k| !k.is_empty()),
            }
        }
    }
}

fn decode_deployment_entry(raw: RawContractDeployment) -> Result<ContractDeployment> {
    match raw {
        RawContractDeployment::Simple(name) => Ok(ContractDeployment::new(name)),
        RawContractDeployment::Advanced { name, args } => {
            let args = args
                .iter()
                .map(Value::from_json)
                .collect::<Result<Vec<_>>>()
                .map_err(|e| bad(&format!("arguments of {}", name), e))?;
            Ok(ContractDeployment { name, args })
        }
    }
}

fn section<'a>(root: &'a Map<String, Json>, name: &str) -> Result<Option<&'a Map<String, Json>>> {
    match root.get(name) {
        None | Some(Json::Null) => Ok(None),
        Some(Json::Object(map)) => Ok(Some(map)),
        Some(_) => Err(bad(name, "expected an object")),
    }
}

/// An account written with its key fields inline instead of under `key`.
fn is_legacy_account(value: &Json) -> bool {
    value.as_object().is_some_and(|account| {
        !account.contains_key("key")
            && !account.contains_key("keys")
            && LEGACY_ACCOUNT_FIELDS.iter().any(|field| account.contains_key(*field))
    })
}

fn entry<T: for<'de> Deserialize<'de>>(what: &str, name: &str, value: &Json) -> Result<T> {
    serde_json::from_value(value.clone()).map_err(|e| bad(&format!("{} {}", what, name), e))
}

// =============================================================================
// Encoding
// =============================================================================

fn encode_key(key: &AccountKey) -> Result<Json> {
    if key.is_default() {
        if let Some(private_key) = key.private_key() {
            return Ok(Json::String(private_key.to_hex()));
        }
    }
    let raw = RawKey {
        key_type: Some(key.key_type().to_string()),
        index: Some(key.index() as i64),
        signature_algorithm: Some(key.sig_algo().to_string()),
        hash_algorithm: Some(key.hash_algo().to_string()),
        private_key: key.private_key().map(|k| k.to_hex()),
        resource_id: key.resource_id(),
        context: None,
    };
    serde_json::to_value(raw).map_err(|e| bad("account key", e))
}

fn encode_contracts(contracts: &[Contract]) -> Map<String, Json> {
    let mut out = Map::new();
    let mut seen: Vec<&str> = Vec::new();
    for contract in contracts {
        if seen.contains(&contract.name.as_str()) {
            continue;
        }
        seen.push(&contract.name);

        let records: Vec<&Contract> = contracts.iter().filter(|c| c.name == contract.name).collect();
        let aliases: Map<String, Json> = records
            .iter()
            .filter_map(|c| c.alias.map(|a| (c.network.clone(), Json::String(a.hex()))))
            .collect();
        let source = records
            .iter()
            .find(|c| !c.is_aliased())
            .unwrap_or(&records[0])
            .source
            .clone();

        let value = if aliases.is_empty() {
            Json::String(source)
        } else {
            json!({ "source": source, "aliases": aliases })
        };
        out.insert(contract.name.clone(), value);
    }
    out
}

fn encode_deployments(deployments: &[Deployment]) -> Map<String, Json> {
    let mut out: Map<String, Json> = Map::new();
    for deployment in deployments {
        let entries: Vec<Json> = deployment
            .contracts
            .iter()
            .map(|c| {
                if c.args.is_empty() {
                    Json::String(c.name.clone())
                } else {
                    json!({
                        "name": c.name,
                        "args": c.args.iter().map(Value::to_json).collect::<Vec<_>>(),
                    })
                }
            })
            .collect();

        let network = out
            .entry(deployment.network.clone())
            .or_insert_with(|| Json::Object(Map::new()));
        if let Json::Object(accounts) = network {
            accounts.insert(deployment.account.clone(), Json::Array(entries));
        }
    }
    out
}

// =============================================================================
// Parser
// =============================================================================

/// Reads and writes `flow.json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonParser;

impl Parser for JsonParser {
    fn supports(&self, extension: &str) -> bool {
        extension.eq_ignore_ascii_case("json")
    }

    fn deserialize(&self, raw: &[u8]) -> Result<Config> {
        let root: Json = serde_json::from_slice(raw).map_err(|e| bad("configuration", e))?;
        let root = root
            .as_object()
            .ok_or_else(|| bad("configuration", "expected a JSON object"))?;

        let legacy_accounts = section(root, "accounts")?
            .is_some_and(|accounts| accounts.values().any(is_legacy_account));
        if root.contains_key("host") || legacy_accounts {
            return Err(Error::OutdatedFormat { path: String::new() });
        }

        let mut config = Config::default();

        if let Some(emulators) = section(root, "emulators")? {
            for (name, value) in emulators {
                let raw: RawEmulator = entry("emulator", name, value)?;
                config.emulators.push(Emulator {
                    name: name.clone(),
                    port: raw.port.unwrap_or(super::DEFAULT_EMULATOR_PORT),
                    service_account: raw.service_account,
                });
            }
        }

        if let Some(contracts) = section(root, "contracts")? {
            for (name, value) in contracts {
                let raw: RawContract = entry("contract", name, value)?;
                config.contracts.extend(decode_contracts(name, raw)?);
            }
        }

        if let Some(networks) = section(root, "networks")? {
            for (name, value) in networks {
                let raw: RawNetwork = entry("network", name, value)?;
                config.networks.push(decode_network(name, raw));
            }
        }

        if let Some(accounts) = section(root, "accounts")? {
            for (name, value) in accounts {
                let raw: RawAccount = entry("account", name, value)?;
                config.accounts.push(decode_account(name, raw)?);
            }
        }

        if let Some(deployments) = section(root, "deployments")? {
            for (network, accounts) in deployments {
                let accounts = accounts
                    .as_object()
                    .ok_or_else(|| bad(&format!("deployments for {}", network), "expected an object"))?;
                for (account, contracts) in accounts {
                    let raw: Vec<RawContractDeployment> =
                        entry("deployment", &format!("{}/{}", network, account), contracts)?;
                    config.deployments.push(Deployment {
                        network: network.clone(),
                        account: account.clone(),
                        contracts: raw
                            .into_iter()
                            .map(decode_deployment_entry)
                            .collect::<Result<Vec<_>>>()?,
                    });
                }
            }
        }

        Ok(config)
    }

    fn serialize(&self, config: &Config) -> Result<Vec<u8>> {
        let mut root = Map::new();

        let emulators: Map<String, Json> = config
            .emulators
            .iter()
            .map(|e| {
                (
                    e.name.clone(),
                    json!({ "port": e.port, "serviceAccount": e.service_account }),
                )
            })
            .collect();
        root.insert("emulators".into(), Json::Object(emulators));
        root.insert("contracts".into(), Json::Object(encode_contracts(&config.contracts)));

        let networks: Map<String, Json> = config
            .networks
            .iter()
            .map(|n| {
                let value = match &n.key {
                    Some(key) => json!({ "host": n.host, "network-key": key }),
                    None => Json::String(n.host.clone()),
                };
                (n.name.clone(), value)
            })
            .collect();
        root.insert("networks".into(), Json::Object(networks));

        let accounts = config
            .accounts
            .iter()
            .map(|a| {
                let key = encode_key(&a.key)?;
                Ok((a.name.clone(), json!({ "address": a.address.hex(), "key": key })))
            })
            .collect::<Result<Map<String, Json>>>()?;
        root.insert("accounts".into(), Json::Object(accounts));
        root.insert("deployments".into(), Json::Object(encode_deployments(&config.deployments)));

        let mut out = serde_json::to_vec_pretty(&Json::Object(root)).map_err(|e| bad("configuration", e))?;
        out.push(b'\n');
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeyType;
    use flow_types::value::NumberType;

    const KEY: &str = "21c5dfdeb0ff03a7a73ef39788563b62c89adea67bbb21ab95e5f710bd1d40b7";

    fn parse(raw: &str) -> Result<Config> {
        JsonParser.deserialize(raw.as_bytes())
    }

    #[test]
    fn test_simple_config() {
        let config = parse(&format!(
            r#"{{
                "networks": {{ "emulator": "127.0.0.1:3569" }},
                "accounts": {{ "emulator-account": {{ "address": "f8d6e0586b0a20c7", "key": "{}" }} }}
            }}"#,
            KEY
        ))
        .unwrap();

        assert_eq!(config.accounts.len(), 1);
        let account = &config.accounts[0];
        assert_eq!(account.name, "emulator-account");
        assert_eq!(account.address.hex(), "f8d6e0586b0a20c7");
        assert_eq!(account.key.private_key().unwrap().to_string(), format!("0x{}", KEY));
        assert_eq!(config.network_by_name("emulator").unwrap().host, "127.0.0.1:3569");
    }

    #[test]
    fn test_advanced_and_legacy_accounts() {
        let config = parse(&format!(
            r#"{{
                "accounts": {{
                    "advanced": {{
                        "address": "service",
                        "key": {{ "type": "hex", "index": 1, "signatureAlgorithm": "ECDSA_secp256k1",
                                 "hashAlgorithm": "SHA2_256", "privateKey": "{key}" }}
                    }},
                    "kms": {{
                        "address": "0x01cf0e2f2f715450",
                        "key": {{ "type": "google-kms", "hashAlgorithm": "SHA2_256",
                                 "resourceID": "projects/p/locations/l/keyRings/r/cryptoKeys/k/cryptoKeyVersions/1" }}
                    }},
                    "legacy-string": {{ "address": "179b6b1cb6755e31", "keys": "{key}" }},
                    "legacy-list": {{
                        "address": "f3fcd2c1a78f5eee",
                        "keys": [{{ "type": "hex", "index": 0, "signatureAlgorithm": "ECDSA_P256",
                                   "hashAlgorithm": "SHA3_256", "context": {{ "privateKey": "{key}" }} }}]
                    }}
                }}
            }}"#,
            key = KEY
        ))
        .unwrap();

        let advanced = config.account_by_name("advanced").unwrap();
        assert_eq!(advanced.address, Chain::Emulator.service_address());
        assert_eq!(advanced.key.index(), 1);
        assert_eq!(advanced.key.sig_algo(), SignatureAlgorithm::EcdsaSecp256k1);
        assert_eq!(advanced.key.hash_algo(), HashAlgorithm::Sha2_256);

        let kms = config.account_by_name("kms").unwrap();
        assert_eq!(kms.key.key_type(), KeyType::GoogleKms);

        for name in ["legacy-string", "legacy-list"] {
            let account = config.account_by_name(name).unwrap();
            assert!(account.key.is_default(), "{}", name);
            assert_eq!(account.key.private_key().unwrap().to_hex(), KEY);
        }
    }

    #[test]
    fn test_contracts_networks_deployments() {
        let config = parse(
            r#"{
                "contracts": {
                    "Foo": "./Foo.cdc",
                    "FungibleToken": { "source": "./FT.cdc", "aliases": { "testnet": "9a0766d93b6608b7" } }
                },
                "networks": {
                    "emulator": "127.0.0.1:3569",
                    "testnet": { "host": "access.devnet.nodes.onflow.org:9000", "network-key": "abcd" },
                    "old": { "host": "127.0.0.1:3570", "chain": "flow-emulator" }
                },
                "deployments": {
                    "emulator": { "emulator-account": ["Foo", { "name": "FungibleToken",
                        "args": [{ "type": "String", "value": "hi" }, { "type": "Bool", "value": true }] }] }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(config.contracts.len(), 3);
        let aliased = config.contract_by_name_and_network("FungibleToken", "testnet").unwrap();
        assert_eq!(aliased.alias.unwrap().hex(), "9a0766d93b6608b7");

        assert_eq!(config.network_by_name("testnet").unwrap().key.as_deref(), Some("abcd"));
        assert_eq!(config.network_by_name("old").unwrap().host, "127.0.0.1:3570");

        let deployment = &config.deployments[0];
        assert_eq!(deployment.account, "emulator-account");
        assert_eq!(deployment.contracts[0].name, "Foo");
        assert_eq!(
            deployment.contracts[1].args,
            vec![Value::String("hi".into()), Value::Bool(true)]
        );
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(matches!(
            parse(r#"{ "host": "127.0.0.1:3569", "accounts": {} }"#),
            Err(Error::OutdatedFormat { .. })
        ));
        assert!(matches!(
            parse(&format!(
                r#"{{ "accounts": {{ "root": {{ "address": "f8d6e0586b0a20c7", "privateKey": "{}",
                    "sigAlgorithm": "ECDSA_P256", "hashAlgorithm": "SHA3_256" }} }} }}"#,
                KEY
            )),
            Err(Error::OutdatedFormat { .. })
        ));
        assert!(matches!(parse("{ not json"), Err(Error::Parse { .. })));
        assert!(matches!(
            parse(r#"{ "accounts": { "a": { "address": "f8d6e0586b0a20c7", "key": { "type": "aws", "privateKey": "00" } } } }"#),
            Err(Error::BadKeyConfig(_))
        ));
        assert!(matches!(
            parse(r#"{ "accounts": { "a": { "address": "f8d6e0586b0a20c7" } } }"#),
            Err(Error::BadKeyConfig(_))
        ));
    }

    #[test]
    fn test_roundtrip_is_compact() {
        let raw = format!(
            r#"{{
                "emulators": {{ "default": {{ "port": 3569, "serviceAccount": "emulator-account" }} }},
                "contracts": {{
                    "Foo": "./Foo.cdc",
                    "FungibleToken": {{ "source": "./FT.cdc", "aliases": {{ "testnet": "9a0766d93b6608b7" }} }}
                }},
                "networks": {{ "emulator": "127.0.0.1:3569", "testnet": {{ "host": "h:9000", "key": "ab" }} }},
                "accounts": {{
                    "emulator-account": {{ "address": "f8d6e0586b0a20c7", "key": "{key}" }},
                    "other": {{ "address": "01cf0e2f2f715450",
                               "key": {{ "type": "hex", "index": 2, "signatureAlgorithm": "ECDSA_P256",
                                        "hashAlgorithm": "SHA2_256", "privateKey": "{key}" }} }}
                }},
                "deployments": {{ "emulator": {{ "emulator-account": ["Foo", {{ "name": "FungibleToken",
                    "args": [{{ "type": "UFix64", "value": "1.00000000" }}] }}] }} }}
            }}"#,
            key = KEY
        );
        let config = parse(&raw).unwrap();
        let encoded = JsonParser.serialize(&config).unwrap();
        let decoded = JsonParser.deserialize(&encoded).unwrap();
        assert_eq!(config, decoded);

        let json: Json = serde_json::from_slice(&encoded).unwrap();
        assert_eq!(json["accounts"]["emulator-account"]["key"], Json::String(KEY.into()));
        assert_eq!(json["accounts"]["other"]["key"]["index"], 2);
        assert_eq!(json["contracts"]["Foo"], "./Foo.cdc");
        assert_eq!(json["contracts"]["FungibleToken"]["aliases"]["testnet"], "9a0766d93b6608b7");
        assert_eq!(json["networks"]["emulator"], "127.0.0.1:3569");
        assert_eq!(json["networks"]["testnet"]["network-key"], "ab");
        assert!(json["networks"]["testnet"].get("key").is_none());
        assert_eq!(
            decoded.deployments[0].contracts[1].args,
            vec![Value::Number(NumberType::UFix64, "1.00000000".into())]
        );
    }
}
