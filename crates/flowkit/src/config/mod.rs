//! In-memory project configuration.
//!
//! Plain data with collection accessors; [`Config::validate`] checks that every
//! cross-reference resolves. Collections keep insertion order, which is also
//! the order they are written back in.

pub mod json;
pub mod loader;

use flow_types::{Address, Error, Result, Value};

use crate::keys::AccountKey;

pub use json::JsonParser;
pub use loader::{
    default_paths, global_path, Loader, LocalFs, MemoryFs, Parser, ReaderWriter, DEFAULT_PATH,
};

/// A network the project can talk to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Network {
    pub name: String,
    pub host: String,
    /// Public key of the access node, for secured connections.
    pub key: Option<String>,
}

impl Network {
    pub fn new(name: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            key: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub name: String,
    pub address: Address,
    pub key: AccountKey,
}

/// A contract source. With `alias` set the contract already lives at that
/// address on `network` and is not deployed there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contract {
    pub name: String,
    pub source: String,
    /// Empty means every network.
    pub network: String,
    pub alias: Option<Address>,
}

impl Contract {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            network: String::new(),
            alias: None,
        }
    }

    pub fn is_aliased(&self) -> bool {
        self.alias.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContractDeployment {
    pub name: String,
    /// Initializer arguments.
    pub args: Vec<Value>,
}

impl ContractDeployment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }
}

/// The contracts an account receives on a network.
#[derive(Debug, Clone, PartialEq)]
pub struct Deployment {
    pub network: String,
    pub account: String,
    pub contracts: Vec<ContractDeployment>,
}

/// A local emulator profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emulator {
    pub name: String,
    pub port: u16,
    pub service_account: String,
}

pub const DEFAULT_EMULATOR: &str = "default";
pub const DEFAULT_EMULATOR_PORT: u16 = 3569;
pub const DEFAULT_SERVICE_ACCOUNT: &str = "emulator-account";

impl Default for Emulator {
    fn default() -> Self {
        Self {
            name: DEFAULT_EMULATOR.to_string(),
            port: DEFAULT_EMULATOR_PORT,
            service_account: DEFAULT_SERVICE_ACCOUNT.to_string(),
        }
    }
}

/// Entries that can be replaced by key.
trait Keyed {
    fn same_key(&self, other: &Self) -> bool;
}

impl Keyed for Network {
    fn same_key(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Keyed for Account {
    fn same_key(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Keyed for Contract {
    fn same_key(&self, other: &Self) -> bool {
        self.name == other.name && self.network == other.network
    }
}

impl Keyed for Deployment {
    fn same_key(&self, other: &Self) -> bool {
        self.account == other.account && self.network == other.network
    }
}

impl Keyed for Emulator {
    fn same_key(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

fn add_or_update<T: Keyed>(items: &mut Vec<T>, item: T) {
    match items.iter_mut().find(|existing| existing.same_key(&item)) {
        Some(existing) => *existing = item,
        None => items.push(item),
    }
}

/// Aggregate of everything a project declares.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Config {
    pub emulators: Vec<Emulator>,
    pub contracts: Vec<Contract>,
    pub networks: Vec<Network>,
    pub accounts: Vec<Account>,
    pub deployments: Vec<Deployment>,
}

impl Config {
    // ===== Networks =====

    pub fn network_by_name(&self, name: &str) -> Option<&Network> {
        self.networks.iter().find(|n| n.name == name)
    }

    pub fn add_or_update_network(&mut self, network: Network) {
        add_or_update(&mut self.networks, network);
    }

    pub fn remove_network(&mut self, name: &str) -> Result<()> {
        let before = self.networks.len();
        self.networks.retain(|n| n.name != name);
        removed(before, self.networks.len(), "network", name)
    }

    // ===== Accounts =====

    pub fn account_by_name(&self, name: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.name == name)
    }

    pub fn account_by_address(&self, address: Address) -> Option<&Account> {
        self.accounts.iter().find(|a| a.address == address)
    }

    pub fn add_or_update_account(&mut self, account: Account) {
        add_or_update(&mut self.accounts, account);
    }

    pub fn remove_account(&mut self, name: &str) -> Result<()> {
        let before = self.accounts.len();
        self.accounts.retain(|a| a.name != name);
        removed(before, self.accounts.len(), "account", name)
    }

    // ===== Contracts =====

    /// Every record with this name, across networks.
    pub fn contracts_by_name<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Contract> + 'a {
        self.contracts.iter().filter(move |c| c.name == name)
    }

    /// The record for `name` on `network`: the network-specific one if it
    /// exists, otherwise the one that applies to every network.
    pub fn contract_by_name_and_network(&self, name: &str, network: &str) -> Option<&Contract> {
        self.contracts
            .iter()
            .find(|c| c.name == name && c.network == network)
            .or_else(|| {
                self.contracts
                    .iter()
                    .find(|c| c.name == name && c.network.is_empty())
            })
    }

    /// Contracts that apply to `network`.
    pub fn contracts_by_network<'a>(&'a self, network: &'a str) -> impl Iterator<Item = &'a Contract> + 'a {
        self.contracts
            .iter()
            .filter(move |c| c.network.is_empty() || c.network == network)
    }

    pub fn add_or_update_contract(&mut self, contract: Contract) {
        add_or_update(&mut self.contracts, contract);
    }

    /// Remove every record with this name.
    pub fn remove_contract(&mut self, name: &str) -> Result<()> {
        let before = self.contracts.len();
        self.contracts.retain(|c| c.name != name);
        removed(before, self.contracts.len(), "contract", name)
    }

    // ===== Deployments =====

    pub fn deployments_by_network<'a>(&'a self, network: &'a str) -> impl Iterator<Item = &'a Deployment> + 'a {
        self.deployments.iter().filter(move |d| d.network == network)
    }

    pub fn deployment_by_account_and_network(&self, account: &str, network: &str) -> Option<&Deployment> {
        self.deployments
            .iter()
            .find(|d| d.account == account && d.network == network)
    }

    pub fn add_or_update_deployment(&mut self, deployment: Deployment) {
        add_or_update(&mut self.deployments, deployment);
    }

    pub fn remove_deployment(&mut self, account: &str, network: &str) -> Result<()> {
        let before = self.deployments.len();
        self.deployments
            .retain(|d| !(d.account == account && d.network == network));
        removed(
            before,
            self.deployments.len(),
            "deployment",
            &format!("{} on {}", account, network),
        )
    }

    // ===== Emulators =====

    pub fn emulator_by_name(&self, name: &str) -> Option<&Emulator> {
        self.emulators.iter().find(|e| e.name == name)
    }

    pub fn default_emulator(&self) -> Option<&Emulator> {
        self.emulator_by_name(DEFAULT_EMULATOR)
            .or_else(|| self.emulators.first())
    }

    pub fn add_or_update_emulator(&mut self, emulator: Emulator) {
        add_or_update(&mut self.emulators, emulator);
    }

    pub fn remove_emulator(&mut self, name: &str) -> Result<()> {
        let before = self.emulators.len();
        self.emulators.retain(|e| e.name != name);
        removed(before, self.emulators.len(), "emulator", name)
    }

    // ===== Composition =====

    /// Overlay `other` on top of this configuration; entries with the same
    /// key are replaced, new ones appended.
    pub fn overlay(&mut self, other: Config) {
        for emulator in other.emulators {
            self.add_or_update_emulator(emulator);
        }
        for contract in other.contracts {
            self.add_or_update_contract(contract);
        }
        for network in other.networks {
            self.add_or_update_network(network);
        }
        for account in other.accounts {
            self.add_or_update_account(account);
        }
        for deployment in other.deployments {
            self.add_or_update_deployment(deployment);
        }
    }

    /// Check that every reference points at something that exists.
    pub fn validate(&self) -> Result<()> {
        for account in &self.accounts {
            if account.address.chain().is_err() {
                return Err(Error::Validation(format!(
                    "account {} has address {} which is not valid on any chain",
                    account.name,
                    account.address.hex_with_prefix()
                )));
            }
        }

        for contract in &self.contracts {
            if !contract.network.is_empty() && self.network_by_name(&contract.network).is_none() {
                return Err(Error::Validation(format!(
                    "contract {} is defined on network {} which does not exist",
                    contract.name, contract.network
                )));
            }
        }

        for emulator in &self.emulators {
            if self.account_by_name(&emulator.service_account).is_none() {
                return Err(Error::Validation(format!(
                    "emulator {} uses service account {} which does not exist",
                    emulator.name, emulator.service_account
                )));
            }
        }

        for deployment in &self.deployments {
            if self.network_by_name(&deployment.network).is_none() {
                return Err(Error::Validation(format!(
                    "deployment contains network {} which does not exist",
                    deployment.network
                )));
            }
            if self.account_by_name(&deployment.account).is_none() {
                return Err(Error::Validation(format!(
                    "deployment contains account {} which does not exist",
                    deployment.account
                )));
            }
            for contract in &deployment.contracts {
                if self.contracts_by_name(&contract.name).next().is_none() {
                    return Err(Error::Validation(format!(
                        "deployment contains contract {} which does not exist",
                        contract.name
                    )));
                }
            }
        }

        Ok(())
    }
}

fn removed(before: usize, after: usize, what: &str, name: &str) -> Result<()> {
    if before == after {
        Err(Error::InvalidArgument(format!("{} {} does not exist", what, name)))
    } else {
        Ok(())
    }
}

/// The networks every new project starts with.
pub fn default_networks() -> Vec<Network> {
    use flow_transport::network::{EMULATOR_HOST, MAINNET_HOST, TESTNET_HOST};
    vec![
        Network::new("emulator", EMULATOR_HOST),
        Network::new("testnet", TESTNET_HOST),
        Network::new("mainnet", MAINNET_HOST),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use flow_types::crypto::{PrivateKey, SignatureAlgorithm};

    fn account(name: &str, address: &str) -> Account {
        Account {
            name: name.to_string(),
            address: Address::from_hex(address).unwrap(),
            key: AccountKey::from_private_key(
                PrivateKey::from_seed(SignatureAlgorithm::EcdsaP256, &[7u8; 32]).unwrap(),
            ),
        }
    }

    fn sample() -> Config {
        let mut aliased = Contract::new("FungibleToken", "./FungibleToken.cdc");
        aliased.network = "testnet".to_string();
        aliased.alias = Some(Address::from_hex("9a0766d93b6608b7").unwrap());

        Config {
            emulators: vec![Emulator::default()],
            contracts: vec![
                Contract::new("FungibleToken", "./FungibleToken.cdc"),
                aliased,
                Contract::new("Foo", "./Foo.cdc"),
            ],
            networks: default_networks(),
            accounts: vec![account("emulator-account", "f8d6e0586b0a20c7")],
            deployments: vec![Deployment {
                network: "emulator".to_string(),
                account: "emulator-account".to_string(),
                contracts: vec![ContractDeployment::new("FungibleToken"), ContractDeployment::new("Foo")],
            }],
        }
    }

    #[test]
    fn test_lookups() {
        let config = sample();
        assert_eq!(config.network_by_name("testnet").unwrap().host, flow_transport::network::TESTNET_HOST);
        assert!(config.account_by_address(Address::from_hex("f8d6e0586b0a20c7").unwrap()).is_some());

        let testnet = config.contract_by_name_and_network("FungibleToken", "testnet").unwrap();
        assert!(testnet.is_aliased());
        let emulator = config.contract_by_name_and_network("FungibleToken", "emulator").unwrap();
        assert!(!emulator.is_aliased());

        assert_eq!(config.contracts_by_network("emulator").count(), 2);
        assert_eq!(config.contracts_by_network("testnet").count(), 3);
        assert!(config
            .deployment_by_account_and_network("emulator-account", "emulator")
            .is_some());
    }

    #[test]
    fn test_add_or_update_replaces_by_key() {
        let mut config = sample();
        config.add_or_update_account(account("emulator-account", "01cf0e2f2f715450"));
        config.add_or_update_account(account("alice", "179b6b1cb6755e31"));
        assert_eq!(config.accounts.len(), 2);
        assert_eq!(config.accounts[0].address.hex(), "01cf0e2f2f715450");

        config.add_or_update_deployment(Deployment {
            network: "emulator".to_string(),
            account: "emulator-account".to_string(),
            contracts: vec![],
        });
        assert_eq!(config.deployments.len(), 1);
        assert!(config.deployments[0].contracts.is_empty());
    }

    #[test]
    fn test_remove() {
        let mut config = sample();
        config.remove_contract("FungibleToken").unwrap();
        assert_eq!(config.contracts.len(), 1);
        assert!(config.remove_contract("FungibleToken").is_err());
        config.remove_deployment("emulator-account", "emulator").unwrap();
        assert!(config.deployments.is_empty());
        config.remove_network("mainnet").unwrap();
        assert_eq!(config.networks.len(), 2);
        config.remove_emulator(DEFAULT_EMULATOR).unwrap();
        assert!(config.default_emulator().is_none());
        assert!(config.remove_emulator(DEFAULT_EMULATOR).is_err());
    }

    #[test]
    fn test_overlay_is_idempotent() {
        let mut overlay = Config::default();
        overlay.add_or_update_account(account("emulator-account", "01cf0e2f2f715450"));
        overlay.add_or_update_network(Network::new("emulator", "127.0.0.1:3570"));

        let mut once = sample();
        once.overlay(overlay.clone());
        let mut twice = once.clone();
        twice.overlay(overlay);

        assert_eq!(once, twice);
        assert_eq!(once.network_by_name("emulator").unwrap().host, "127.0.0.1:3570");
    }

    #[test]
    fn test_validate() {
        assert!(sample().validate().is_ok());

        let mut bad_network = sample();
        bad_network.contracts[1].network = "previewnet".to_string();
        assert!(matches!(bad_network.validate(), Err(Error::Validation(_))));

        let mut bad_emulator = sample();
        bad_emulator.emulators[0].service_account = "nobody".to_string();
        assert!(matches!(bad_emulator.validate(), Err(Error::Validation(_))));

        let mut bad_account = sample();
        bad_account.deployments[0].account = "nobody".to_string();
        assert!(matches!(bad_account.validate(), Err(Error::Validation(_))));

        let mut bad_contract = sample();
        bad_contract.deployments[0].contracts.push(ContractDeployment::new("Missing"));
        let err = bad_contract.validate().unwrap_err();
        assert!(err.to_string().contains("Missing"));

        let mut bad_address = sample();
        bad_address.accounts[0].address = Address::from_u64(1);
        let err = bad_address.validate().unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(err.to_string().contains("emulator-account"));
        assert!(err.to_string().contains("0x0000000000000001"));
    }
}
