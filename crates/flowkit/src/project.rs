//! A loaded project: the configuration plus the loader it came from.

use std::collections::HashMap;

use tracing::debug;

use flow_resolver::{clean_path, ResolvedContract};
use flow_types::crypto::{HashAlgorithm, PrivateKey, SignatureAlgorithm};
use flow_types::{Address, Chain, Error, Result};

use crate::config::{
    default_networks, Account, Config, Emulator, Loader, Network, DEFAULT_SERVICE_ACCOUNT,
};
use crate::keys::{AccountKey, HexAccountKey};

pub struct Project {
    config: Config,
    loader: Loader,
}

impl std::fmt::Debug for Project {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Project")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Project {
    pub fn new(config: Config, loader: Loader) -> Self {
        Self { config, loader }
    }

    /// Load and compose the configuration files at `paths`.
    pub fn load(loader: Loader, paths: &[String]) -> Result<Self> {
        let config = loader.load(paths)?;
        Ok(Self::new(config, loader))
    }

    /// A fresh project with the default networks, a `default` emulator and a
    /// service account holding `service_key` (generated when absent).
    pub fn init(
        loader: Loader,
        sig_algo: SignatureAlgorithm,
        hash_algo: HashAlgorithm,
        service_key: Option<PrivateKey>,
    ) -> Result<Self> {
        let private_key = match service_key {
            Some(key) => key,
            None => PrivateKey::generate(sig_algo)?,
        };
        let service_account = Account {
            name: DEFAULT_SERVICE_ACCOUNT.to_string(),
            address: Chain::Emulator.service_address(),
            key: AccountKey::Hex(HexAccountKey {
                index: 0,
                hash_algo,
                private_key,
            }),
        };

        let config = Config {
            emulators: vec![Emulator::default()],
            networks: default_networks(),
            accounts: vec![service_account],
            ..Config::default()
        };
        Ok(Self::new(config, loader))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn loader(&self) -> &Loader {
        &self.loader
    }

    /// Read a file through the project's reader.
    pub fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        self.loader.reader().read_file(path)
    }

    pub fn save(&self, path: &str) -> Result<()> {
        self.config.validate()?;
        self.loader.save(&self.config, path)
    }

    // ===== Networks =====

    pub fn network(&self, name: &str) -> Result<&Network> {
        self.config
            .network_by_name(name)
            .ok_or_else(|| Error::InvalidArgument(format!("network {} is not configured", name)))
    }

    // ===== Accounts =====

    pub fn accounts(&self) -> &[Account] {
        &self.config.accounts
    }

    pub fn account_by_name(&self, name: &str) -> Result<&Account> {
        self.config
            .account_by_name(name)
            .ok_or_else(|| Error::InvalidArgument(format!("account {} is not configured", name)))
    }

    pub fn account_by_address(&self, address: Address) -> Option<&Account> {
        self.config.account_by_address(address)
    }

    pub fn add_or_update_account(&mut self, account: Account) {
        self.config.add_or_update_account(account);
    }

    pub fn remove_account(&mut self, name: &str) -> Result<()> {
        self.config.remove_account(name)
    }

    /// The service account of the default emulator.
    pub fn emulator_service_account(&self) -> Result<&Account> {
        let name = self
            .config
            .default_emulator()
            .map(|e| e.service_account.as_str())
            .unwrap_or(DEFAULT_SERVICE_ACCOUNT);
        self.config.account_by_name(name).ok_or_else(|| {
            Error::Validation(format!("emulator service account {} is not configured", name))
        })
    }

    // ===== Contracts =====

    /// Every contract deployed on `network` with the address of the account it
    /// goes to. Contracts aliased on the network are left out.
    pub fn contracts_by_network(&self, network: &str) -> Result<Vec<ResolvedContract>> {
        let mut contracts = Vec::new();
        for deployment in self.config.deployments_by_network(network) {
            let account = self.config.account_by_name(&deployment.account).ok_or_else(|| {
                Error::Validation(format!(
                    "deployment contains account {} which does not exist",
                    deployment.account
                ))
            })?;

            for entry in &deployment.contracts {
                let contract = self
                    .config
                    .contract_by_name_and_network(&entry.name, network)
                    .ok_or_else(|| {
                        Error::Validation(format!(
                            "deployment contains contract {} which is not defined for network {}",
                            entry.name, network
                        ))
                    })?;
                if contract.is_aliased() {
                    debug!(contract = %contract.name, network, "skipping aliased contract");
                    continue;
                }
                contracts.push(
                    ResolvedContract::new(&contract.name, &contract.source, account.address)
                        .with_args(entry.args.clone()),
                );
            }
        }
        Ok(contracts)
    }

    /// Cleaned source path to alias address, for contracts aliased on `network`.
    pub fn aliases_for_network(&self, network: &str) -> HashMap<String, Address> {
        self.config
            .contracts
            .iter()
            .filter(|c| c.network == network)
            .filter_map(|c| c.alias.map(|alias| (clean_path(&c.source), alias)))
            .collect()
    }

    /// True when two deployments on `network` name the same contract.
    pub fn contract_conflict_exists(&self, network: &str) -> bool {
        self.conflicting_contract(network).is_some()
    }

    /// The first contract named by two deployments on `network`.
    pub fn conflicting_contract(&self, network: &str) -> Option<String> {
        let mut owners: HashMap<&str, usize> = HashMap::new();
        for (index, deployment) in self.config.deployments_by_network(network).enumerate() {
            for contract in &deployment.contracts {
                let name = contract.name.as_str();
                match owners.get(name) {
                    Some(owner) if *owner != index => return Some(name.to_string()),
                    Some(_) => {}
                    None => {
                        owners.insert(name, index);
                    }
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::{Contract, ContractDeployment, Deployment, MemoryFs};
    use flow_types::Value;

    const KEY: &str = "21c5dfdeb0ff03a7a73ef39788563b62c89adea67bbb21ab95e5f710bd1d40b7";

    const CONFIG: &str = r#"{
        "contracts": {
            "NonFungibleToken": "./contracts/NonFungibleToken.cdc",
            "Foo": "./contracts/Foo.cdc",
            "FungibleToken": {
                "source": "./contracts/FungibleToken.cdc",
                "aliases": { "testnet": "9a0766d93b6608b7" }
            }
        },
        "networks": { "emulator": "127.0.0.1:3569", "testnet": "access.devnet.nodes.onflow.org:9000" },
        "accounts": {
            "emulator-account": { "address": "f8d6e0586b0a20c7", "key": "KEY" },
            "alice": { "address": "01cf0e2f2f715450", "key": "KEY" }
        },
        "deployments": {
            "emulator": {
                "emulator-account": ["NonFungibleToken", "FungibleToken"],
                "alice": [{ "name": "Foo", "args": [{ "type": "String", "value": "hello" }] }]
            },
            "testnet": { "alice": ["FungibleToken", "Foo"] }
        }
    }"#;

    fn project() -> Project {
        let fs = MemoryFs::new().with_file("flow.json", CONFIG.replace("KEY", KEY));
        Project::load(Loader::new(Arc::new(fs)), &["flow.json".to_string()]).unwrap()
    }

    #[test]
    fn test_contracts_by_network() {
        let project = project();

        let emulator = project.contracts_by_network("emulator").unwrap();
        let names: Vec<_> = emulator.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["NonFungibleToken", "FungibleToken", "Foo"]);
        assert_eq!(emulator[0].target.hex(), "f8d6e0586b0a20c7");
        assert_eq!(emulator[2].target.hex(), "01cf0e2f2f715450");
        assert_eq!(emulator[2].args, vec![Value::String("hello".into())]);

        // aliased on testnet, so only Foo is deployed there
        let testnet = project.contracts_by_network("testnet").unwrap();
        assert_eq!(testnet.len(), 1);
        assert_eq!(testnet[0].name, "Foo");

        assert!(project.contracts_by_network("mainnet").unwrap().is_empty());
    }

    #[test]
    fn test_aliases_for_network() {
        let project = project();
        let aliases = project.aliases_for_network("testnet");
        assert_eq!(
            aliases.get("contracts/FungibleToken.cdc").map(Address::hex).as_deref(),
            Some("9a0766d93b6608b7")
        );
        assert!(project.aliases_for_network("emulator").is_empty());
    }

    #[test]
    fn test_contract_conflicts() {
        let mut project = project();
        assert!(!project.contract_conflict_exists("emulator"));

        project.config_mut().add_or_update_deployment(Deployment {
            network: "emulator".to_string(),
            account: "alice".to_string(),
            contracts: vec![ContractDeployment::new("Foo"), ContractDeployment::new("NonFungibleToken")],
        });
        assert!(project.contract_conflict_exists("emulator"));
        assert_eq!(project.conflicting_contract("emulator").as_deref(), Some("NonFungibleToken"));
        assert!(!project.contract_conflict_exists("testnet"));
    }

    #[test]
    fn test_missing_contract_definition() {
        let mut project = project();
        project.config_mut().contracts.retain(|c| c.name != "Foo");
        project
            .config_mut()
            .add_or_update_contract(Contract::new("Bar", "./Bar.cdc"));
        assert!(matches!(
            project.contracts_by_network("emulator"),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_init_and_save() {
        let fs = Arc::new(MemoryFs::new());
        let project = Project::init(
            Loader::new(fs.clone()),
            SignatureAlgorithm::EcdsaP256,
            HashAlgorithm::Sha3_256,
            None,
        )
        .unwrap();

        let service = project.emulator_service_account().unwrap();
        assert_eq!(service.address, Chain::Emulator.service_address());
        assert_eq!(project.config().networks.len(), 3);
        assert_eq!(project.config().emulators[0].port, 3569);

        project.save("flow.json").unwrap();
        let reloaded = Project::load(Loader::new(fs), &["flow.json".to_string()]).unwrap();
        assert_eq!(reloaded.config(), project.config());
    }

    #[test]
    fn test_init_with_key() {
        let key = PrivateKey::from_hex(SignatureAlgorithm::EcdsaP256, KEY).unwrap();
        let project = Project::init(
            Loader::new(Arc::new(MemoryFs::new())),
            SignatureAlgorithm::EcdsaP256,
            HashAlgorithm::Sha3_256,
            Some(key.clone()),
        )
        .unwrap();
        let service = project.emulator_service_account().unwrap();
        assert_eq!(service.key.private_key(), Some(&key));
    }

    #[test]
    fn test_account_lookups() {
        let mut project = project();
        let alice = project.account_by_name("alice").unwrap().clone();
        assert_eq!(project.account_by_address(alice.address).unwrap().name, "alice");
        assert!(project.account_by_name("bob").is_err());

        project.remove_account("alice").unwrap();
        assert!(project.account_by_address(alice.address).is_none());
    }
}
