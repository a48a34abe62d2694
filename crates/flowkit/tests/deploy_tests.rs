//! Deployment pipeline against the in-process emulator:
//! project -> planner -> engine -> gateway.

mod common;

use flow_transport::Gateway;
use flow_types::Error;
use flowkit::deploy::ALREADY_DEPLOYED;
use flowkit::{ContractOutcome, DeploymentEngine};

use common::{emulator, memory_project};

const CONFIG: &str = r#"{
    "contracts": {
        "NonFungibleToken": "./contracts/NonFungibleToken.cdc",
        "Foo": "./contracts/Foo.cdc"
    },
    "networks": { "emulator": "127.0.0.1:3569" },
    "accounts": {
        "emulator-account": { "address": "f8d6e0586b0a20c7", "key": "KEY" }
    },
    "deployments": {
        "emulator": { "emulator-account": ["Foo", "NonFungibleToken"] }
    }
}"#;

const NFT: &str = "access(all) contract interface NonFungibleToken {}\n";
const FOO: &str = r#"import NonFungibleToken from "./NonFungibleToken.cdc"

access(all) contract Foo {}
"#;

fn names(report: &flowkit::DeploymentReport) -> Vec<&str> {
    report.contracts.iter().map(|c| c.name.as_str()).collect()
}

#[test]
fn test_deploys_in_dependency_order() {
    let project = memory_project(
        CONFIG,
        &[("contracts/NonFungibleToken.cdc", NFT), ("contracts/Foo.cdc", FOO)],
    );
    let gateway = emulator();
    let engine = DeploymentEngine::new(gateway.as_ref(), &project);

    let report = engine.deploy("emulator", false).unwrap();
    assert_eq!(names(&report), vec!["NonFungibleToken", "Foo"]);
    assert!(report.contracts.iter().all(|c| c.outcome == ContractOutcome::Added));
    assert!(report.contracts.iter().all(|c| c.transaction_id.is_some()));
    assert!(report.is_success());

    let account = gateway.get_account(gateway.service_address()).unwrap();
    let foo = String::from_utf8(account.contracts["Foo"].clone()).unwrap();
    assert!(foo.contains("import NonFungibleToken from 0xf8d6e0586b0a20c7"));
    assert!(!foo.contains("\"./NonFungibleToken.cdc\""));
    assert_eq!(account.contracts["NonFungibleToken"], NFT.as_bytes());
}

#[test]
fn test_redeploy_skips_updates_and_leaves_unchanged() {
    let project = memory_project(
        CONFIG,
        &[("contracts/NonFungibleToken.cdc", NFT), ("contracts/Foo.cdc", FOO)],
    );
    let gateway = emulator();
    let engine = DeploymentEngine::new(gateway.as_ref(), &project);
    engine.deploy("emulator", false).unwrap();

    let skipped = engine.deploy("emulator", false).unwrap();
    assert!(skipped
        .contracts
        .iter()
        .all(|c| c.outcome == ContractOutcome::Skipped(ALREADY_DEPLOYED.to_string())));
    assert!(skipped.is_success());

    let unchanged = engine.deploy("emulator", true).unwrap();
    assert!(unchanged.contracts.iter().all(|c| c.outcome == ContractOutcome::Unchanged));

    let changed = FOO.replace("contract Foo {}", "contract Foo { access(all) let x: Int; init() { self.x = 1 } }");
    project
        .loader()
        .reader()
        .write_file("contracts/Foo.cdc", changed.as_bytes())
        .unwrap();
    let updated = engine.deploy("emulator", true).unwrap();
    assert_eq!(updated.contracts[0].outcome, ContractOutcome::Unchanged);
    assert_eq!(updated.contracts[1].outcome, ContractOutcome::Updated);

    let account = gateway.get_account(gateway.service_address()).unwrap();
    assert!(String::from_utf8_lossy(&account.contracts["Foo"]).contains("self.x = 1"));
}

#[test]
fn test_failures_are_aggregated() {
    // bob is configured but does not exist on chain
    let config = r#"{
        "contracts": {
            "NonFungibleToken": "./contracts/NonFungibleToken.cdc",
            "Bar": "./contracts/Bar.cdc"
        },
        "networks": { "emulator": "127.0.0.1:3569" },
        "accounts": {
            "emulator-account": { "address": "f8d6e0586b0a20c7", "key": "KEY" },
            "bob": { "address": "ee82856bf20e2aa6", "key": "KEY" }
        },
        "deployments": {
            "emulator": { "bob": ["Bar"], "emulator-account": ["NonFungibleToken"] }
        }
    }"#;
    let project = memory_project(
        config,
        &[
            ("contracts/NonFungibleToken.cdc", NFT),
            ("contracts/Bar.cdc", "access(all) contract Bar {}"),
        ],
    );
    let gateway = emulator();
    let report = DeploymentEngine::new(gateway.as_ref(), &project)
        .deploy("emulator", false)
        .unwrap();

    assert_eq!(names(&report), vec!["Bar", "NonFungibleToken"]);
    assert!(report.contracts[0].outcome.is_failure());
    assert_eq!(report.contracts[1].outcome, ContractOutcome::Added);

    let err = report.into_result().unwrap_err();
    assert_eq!(
        err,
        Error::DeploymentFailed {
            failed: vec!["Bar".to_string()]
        }
    );
}

#[test]
fn test_cycle_sends_nothing() {
    let config = r#"{
        "contracts": { "A": "./A.cdc", "B": "./B.cdc" },
        "networks": { "emulator": "127.0.0.1:3569" },
        "accounts": { "emulator-account": { "address": "f8d6e0586b0a20c7", "key": "KEY" } },
        "deployments": { "emulator": { "emulator-account": ["A", "B"] } }
    }"#;
    let project = memory_project(
        config,
        &[
            ("A.cdc", "import B from \"./B.cdc\"\naccess(all) contract A {}"),
            ("B.cdc", "import A from \"./A.cdc\"\naccess(all) contract B {}"),
        ],
    );
    let gateway = emulator();
    let err = DeploymentEngine::new(gateway.as_ref(), &project)
        .deploy("emulator", false)
        .unwrap_err();
    assert!(matches!(err, Error::ImportCycle(_)));
    assert_eq!(gateway.get_latest_block().unwrap().height, 0);
}

#[test]
fn test_ambiguous_deployment() {
    let config = r#"{
        "contracts": { "NonFungibleToken": "./contracts/NonFungibleToken.cdc" },
        "networks": { "emulator": "127.0.0.1:3569" },
        "accounts": {
            "emulator-account": { "address": "f8d6e0586b0a20c7", "key": "KEY" },
            "bob": { "address": "ee82856bf20e2aa6", "key": "KEY" }
        },
        "deployments": {
            "emulator": { "emulator-account": ["NonFungibleToken"], "bob": ["NonFungibleToken"] }
        }
    }"#;
    let project = memory_project(config, &[("contracts/NonFungibleToken.cdc", NFT)]);
    let gateway = emulator();
    let err = DeploymentEngine::new(gateway.as_ref(), &project)
        .deploy("emulator", false)
        .unwrap_err();
    assert_eq!(err, Error::AmbiguousDeployment("NonFungibleToken".to_string()));
}

#[test]
fn test_unresolved_import_fails_planning() {
    let project = memory_project(
        CONFIG,
        &[
            ("contracts/NonFungibleToken.cdc", NFT),
            ("contracts/Foo.cdc", "import Missing from \"./Missing.cdc\"\naccess(all) contract Foo {}"),
        ],
    );
    let gateway = emulator();
    let err = DeploymentEngine::new(gateway.as_ref(), &project)
        .plan("emulator")
        .unwrap_err();
    assert!(matches!(err, Error::UnresolvedImport(_)));
}
