//! Test setup helpers.

use std::sync::Arc;

use flow_transport::EmulatorGateway;
use flow_types::{AccountPublicKey, HashAlgorithm, PrivateKey, SignatureAlgorithm};
use flowkit::config::Account;
use flowkit::{Loader, MemoryFs, Project};

/// Private key of the emulator service account in every fixture.
pub const SERVICE_KEY: &str = "21c5dfdeb0ff03a7a73ef39788563b62c89adea67bbb21ab95e5f710bd1d40b7";

pub fn service_private_key() -> PrivateKey {
    PrivateKey::from_hex(SignatureAlgorithm::EcdsaP256, SERVICE_KEY).unwrap()
}

/// An emulator whose service account holds [`SERVICE_KEY`].
pub fn emulator() -> Arc<EmulatorGateway> {
    let key = AccountPublicKey::new(service_private_key().public_key(), HashAlgorithm::Sha3_256, 1000);
    Arc::new(EmulatorGateway::new(key))
}

/// Replace every `KEY` placeholder with [`SERVICE_KEY`].
pub fn config_with_key(config: &str) -> String {
    config.replace("KEY", SERVICE_KEY)
}

/// A project loaded from `flow.json` in memory next to `files`.
pub fn memory_project(config: &str, files: &[(&str, &str)]) -> Project {
    let mut fs = MemoryFs::new().with_file("flow.json", config_with_key(config));
    for (path, data) in files {
        fs = fs.with_file(path, data);
    }
    Project::load(Loader::new(Arc::new(fs)), &["flow.json".to_string()]).unwrap()
}

pub fn service_account(project: &Project) -> Account {
    project.account_by_name("emulator-account").unwrap().clone()
}
