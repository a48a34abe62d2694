//! Built-in transaction and script templates.
//!
//! Account creation and contract management are ordinary transactions whose
//! code is fixed here. Every template returns the script together with the
//! arguments it expects, in order.

use crate::address::{Address, Chain};
use crate::crypto::{HashAlgorithm, SignatureAlgorithm};
use crate::error::{Error, Result};
use crate::models::{format_ufix64, AccountPublicKey};
use crate::value::{NumberType, Value};

const CREATE_ACCOUNT: &str = r#"transaction(publicKeys: [String], signatureAlgorithms: [UInt8], hashAlgorithms: [UInt8], weights: [UFix64], contracts: {String: String}) {
    prepare(signer: auth(BorrowValue) &Account) {
        let account = Account(payer: signer)

        var i = 0
        while i < publicKeys.length {
            let key = PublicKey(
                publicKey: publicKeys[i].decodeHex(),
                signatureAlgorithm: SignatureAlgorithm(rawValue: signatureAlgorithms[i])!
            )
            account.keys.add(
                publicKey: key,
                hashAlgorithm: HashAlgorithm(rawValue: hashAlgorithms[i])!,
                weight: weights[i]
            )
            i = i + 1
        }

        for name in contracts.keys {
            account.contracts.add(name: name, code: contracts[name]!.decodeHex())
        }
    }
}
"#;

const ADD_CONTRACT: &str = r#"transaction(name: String, code: String{params}) {
    prepare(signer: auth(AddContract) &Account) {
        signer.contracts.add(name: name, code: code.decodeHex(){args})
    }
}
"#;

const UPDATE_CONTRACT: &str = r#"transaction(name: String, code: String{params}) {
    prepare(signer: auth(UpdateContract) &Account) {
        signer.contracts.update(name: name, code: code.decodeHex())
    }
}
"#;

const REMOVE_CONTRACT: &str = r#"transaction(name: String) {
    prepare(signer: auth(RemoveContract) &Account) {
        signer.contracts.remove(name: name)
    }
}
"#;

const STAKING_INFO: &str = r#"import FlowStakingCollection from {collection}
import FlowIDTableStaking from {table}

access(all) fun main(account: Address): [FlowIDTableStaking.NodeInfo] {
    return FlowStakingCollection.getAllNodeInfo(address: account)
}
"#;

const DELEGATION_INFO: &str = r#"import FlowStakingCollection from {collection}
import FlowIDTableStaking from {table}

access(all) fun main(account: Address): [FlowIDTableStaking.DelegatorInfo] {
    return FlowStakingCollection.getAllDelegatorInfo(address: account)
}
"#;

/// A template's code and its arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub script: String,
    pub arguments: Vec<Value>,
}

/// Which built-in template a script is, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    CreateAccount,
    AddContract,
    UpdateContract,
    RemoveContract,
}

impl TemplateKind {
    pub fn classify(script: &str) -> Option<Self> {
        if script.contains("Account(payer: signer)") {
            Some(TemplateKind::CreateAccount)
        } else if script.contains("signer.contracts.add(name: name") {
            Some(TemplateKind::AddContract)
        } else if script.contains("signer.contracts.update(name: name") {
            Some(TemplateKind::UpdateContract)
        } else if script.contains("signer.contracts.remove(name: name)") {
            Some(TemplateKind::RemoveContract)
        } else {
            None
        }
    }
}

fn cadence_signature_algorithm(algo: SignatureAlgorithm) -> u8 {
    match algo {
        SignatureAlgorithm::EcdsaP256 => 1,
        SignatureAlgorithm::EcdsaSecp256k1 => 2,
    }
}

fn signature_algorithm_from_cadence(raw: &str) -> Result<SignatureAlgorithm> {
    match raw {
        "1" => Ok(SignatureAlgorithm::EcdsaP256),
        "2" => Ok(SignatureAlgorithm::EcdsaSecp256k1),
        other => Err(Error::BadKeyConfig(format!("unknown signature algorithm {}", other))),
    }
}

/// Build the account creation transaction.
pub fn create_account(keys: &[AccountPublicKey], contracts: &[(String, Vec<u8>)]) -> Template {
    let uint8 = |v: u32| Value::Number(NumberType::UInt8, v.to_string());
    let arguments = vec![
        Value::Array(keys.iter().map(|k| Value::String(k.public_key.to_hex())).collect()),
        Value::Array(keys.iter().map(|k| uint8(cadence_signature_algorithm(k.sig_algo) as u32)).collect()),
        Value::Array(keys.iter().map(|k| uint8(k.hash_algo.code())).collect()),
        Value::Array(
            keys.iter()
                .map(|k| Value::Number(NumberType::UFix64, format_ufix64(k.weight as u64 * 100_000_000)))
                .collect(),
        ),
        Value::Dictionary(
            contracts
                .iter()
                .map(|(name, code)| (Value::String(name.clone()), Value::String(hex::encode(code))))
                .collect(),
        ),
    ];
    Template {
        script: CREATE_ACCOUNT.to_string(),
        arguments,
    }
}

fn contract_template(code_template: &str, name: &str, code: &[u8], init_args: &[Value], pass_args: bool) -> Template {
    let params: String = init_args
        .iter()
        .enumerate()
        .map(|(i, v)| format!(", arg{}: {}", i, v.type_id()))
        .collect();
    let args: String = if pass_args {
        (0..init_args.len()).map(|i| format!(", arg{}", i)).collect()
    } else {
        String::new()
    };
    let script = code_template.replace("{params}", &params).replace("{args}", &args);

    let mut arguments = vec![Value::String(name.to_string()), Value::String(hex::encode(code))];
    arguments.extend(init_args.iter().cloned());
    Template { script, arguments }
}

/// Build a transaction adding `name` to the signer's account. Initializer
/// arguments are passed through to the contract's `init`.
pub fn add_account_contract(name: &str, code: &[u8], init_args: &[Value]) -> Template {
    contract_template(ADD_CONTRACT, name, code, init_args, true)
}

/// Build a transaction updating `name` on the signer's account. Updates do not
/// run `init`, so initializer arguments are declared but unused.
pub fn update_account_contract(name: &str, code: &[u8], init_args: &[Value]) -> Template {
    contract_template(UPDATE_CONTRACT, name, code, init_args, false)
}

pub fn remove_account_contract(name: &str) -> Template {
    Template {
        script: REMOVE_CONTRACT.to_string(),
        arguments: vec![Value::String(name.to_string())],
    }
}

/// Addresses of the staking collection and ID table contracts.
fn staking_contracts(chain: Chain) -> Result<(Address, Address)> {
    let (collection, table) = match chain {
        Chain::Mainnet => ("8d0e87b65159ae63", "8624b52f9ddcd04a"),
        Chain::Testnet => ("95e019a17d0e23d7", "9eca2b38b18b5dfe"),
        Chain::Emulator => return Err(Error::UnsupportedChain(chain.to_string())),
    };
    Ok((Address::from_hex(collection)?, Address::from_hex(table)?))
}

fn staking_script(template: &str, chain: Chain, account: Address) -> Result<Template> {
    let (collection, table) = staking_contracts(chain)?;
    Ok(Template {
        script: template
            .replace("{collection}", &collection.hex_with_prefix())
            .replace("{table}", &table.hex_with_prefix()),
        arguments: vec![Value::Address(account)],
    })
}

pub fn staking_info_script(chain: Chain, account: Address) -> Result<Template> {
    staking_script(STAKING_INFO, chain, account)
}

pub fn delegation_info_script(chain: Chain, account: Address) -> Result<Template> {
    staking_script(DELEGATION_INFO, chain, account)
}

// ===== Argument decoding =====

fn string_list(value: Option<&Value>, what: &str) -> Result<Vec<String>> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| {
                v.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| Error::InvalidArgument(format!("{} must contain scalars", what)))
            })
            .collect(),
        _ => Err(Error::InvalidArgument(format!("missing {} argument", what))),
    }
}

/// Decode the arguments of [`create_account`] back into keys and contracts.
pub fn decode_create_account(arguments: &[Value]) -> Result<(Vec<AccountPublicKey>, Vec<(String, Vec<u8>)>)> {
    let public_keys = string_list(arguments.first(), "publicKeys")?;
    let sig_algos = string_list(arguments.get(1), "signatureAlgorithms")?;
    let hash_algos = string_list(arguments.get(2), "hashAlgorithms")?;
    let weights = string_list(arguments.get(3), "weights")?;
    if sig_algos.len() != public_keys.len() || hash_algos.len() != public_keys.len() || weights.len() != public_keys.len() {
        return Err(Error::InvalidArgument("key argument lists differ in length".to_string()));
    }

    let mut keys = Vec::with_capacity(public_keys.len());
    for (i, key_hex) in public_keys.iter().enumerate() {
        let sig_algo = signature_algorithm_from_cadence(&sig_algos[i])?;
        let hash_code: u32 = hash_algos[i]
            .parse()
            .map_err(|_| Error::InvalidArgument(format!("bad hash algorithm {}", hash_algos[i])))?;
        let weight: u32 = weights[i]
            .split('.')
            .next()
            .unwrap_or_default()
            .parse()
            .map_err(|_| Error::InvalidArgument(format!("bad key weight {}", weights[i])))?;
        let public_key = crate::crypto::PublicKey::from_hex(sig_algo, key_hex)?;
        let mut key = AccountPublicKey::new(public_key, HashAlgorithm::from_code(hash_code)?, weight);
        key.index = i as u32;
        keys.push(key);
    }

    let contracts = match arguments.get(4) {
        Some(Value::Dictionary(entries)) => entries
            .iter()
            .map(|(k, v)| {
                let name = k.as_str().unwrap_or_default().to_string();
                let code = hex::decode(v.as_str().unwrap_or_default())
                    .map_err(|e| Error::InvalidArgument(format!("contract {} code is not hex: {}", name, e)))?;
                Ok((name, code))
            })
            .collect::<Result<Vec<_>>>()?,
        _ => Vec::new(),
    };
    Ok((keys, contracts))
}

/// Decode the `name` and optional hex `code` arguments of the contract templates.
pub fn decode_contract_arguments(arguments: &[Value]) -> Result<(String, Option<Vec<u8>>)> {
    let name = arguments
        .first()
        .and_then(Value::as_str)
        .ok_or_else(|| Error::InvalidArgument("missing contract name argument".to_string()))?
        .to_string();
    let code = match arguments.get(1).and_then(Value::as_str) {
        Some(hex_code) => Some(
            hex::decode(hex_code)
                .map_err(|e| Error::InvalidArgument(format!("contract {} code is not hex: {}", name, e)))?,
        ),
        None => None,
    };
    Ok((name, code))
}
