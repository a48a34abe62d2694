#![allow(deprecated)]
//! End-to-end tests of the `flow` binary in temporary workspaces.
//!
//! Commands that need a chain run against `--host in-process`, so nothing
//! here touches the network.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

use flow_types::{AccountPublicKey, HashAlgorithm, PrivateKey, SignatureAlgorithm};

const SERVICE_KEY: &str = "21c5dfdeb0ff03a7a73ef39788563b62c89adea67bbb21ab95e5f710bd1d40b7";
const SEED: &str = "elephant ears space cowboy octopus rodeo potato cannon pineapple";

const CONFIG: &str = r#"{
    "contracts": {
        "Greeter": "./contracts/Greeter.cdc",
        "Hello": "./contracts/Hello.cdc"
    },
    "networks": { "emulator": "127.0.0.1:3569" },
    "accounts": {
        "emulator-account": { "address": "f8d6e0586b0a20c7", "key": "KEY" }
    },
    "deployments": {
        "emulator": { "emulator-account": ["Hello", "Greeter"] }
    }
}"#;

const GREETER: &str = "access(all) contract Greeter {}\n";
const HELLO: &str = r#"import Greeter from "./Greeter.cdc"

access(all) contract Hello {}
"#;

/// `flow` running in `dir`, with `dir` as home so no global config leaks in.
fn flow(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("flow").expect("binary not found");
    cmd.current_dir(dir)
        .env("HOME", dir)
        .env_remove("FLOW_CONFIG_PATH")
        .env_remove("FLOW_NETWORK")
        .env_remove("FLOW_HOST")
        .env_remove("FLOW_OUTPUT")
        .env_remove("RUST_LOG")
        .arg("--log")
        .arg("none");
    cmd
}

fn workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("flow.json"), CONFIG.replace("KEY", SERVICE_KEY)).unwrap();
    fs::create_dir(dir.path().join("contracts")).unwrap();
    fs::write(dir.path().join("contracts/Greeter.cdc"), GREETER).unwrap();
    fs::write(dir.path().join("contracts/Hello.cdc"), HELLO).unwrap();
    dir
}

fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
}

#[test]
fn test_help_lists_commands() {
    let dir = TempDir::new().unwrap();
    flow(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("accounts"))
        .stdout(predicate::str::contains("project"))
        .stdout(predicate::str::contains("transactions"));
}

#[test]
fn test_keys_generate_from_seed_is_deterministic() {
    let dir = TempDir::new().unwrap();
    let run = || {
        let output = flow(dir.path())
            .args(["keys", "generate", "--seed", SEED, "-o", "json"])
            .output()
            .unwrap();
        assert!(output.status.success());
        stdout_json(&output)
    };

    let first = run();
    let second = run();
    assert_eq!(first, second);
    assert_eq!(first["private"].as_str().unwrap().len(), 64);
    assert_eq!(first["sigAlgo"], "ECDSA_P256");
}

#[test]
fn test_keys_generate_short_seed_fails() {
    let dir = TempDir::new().unwrap();
    flow(dir.path())
        .args(["keys", "generate", "--seed", "too short"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn test_keys_decode() {
    let dir = TempDir::new().unwrap();
    let private = PrivateKey::from_hex(SignatureAlgorithm::EcdsaP256, SERVICE_KEY).unwrap();
    let key = AccountPublicKey::new(private.public_key(), HashAlgorithm::Sha3_256, 500);
    let encoded = hex::encode(key.encode());

    let output = flow(dir.path())
        .args(["keys", "decode", &encoded, "-o", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["publicKey"], private.public_key().to_hex());
    assert_eq!(json["weight"], 500);
    assert_eq!(json["hashAlgo"], "SHA3_256");
}

#[test]
fn test_save_writes_rendered_output() {
    let dir = TempDir::new().unwrap();
    flow(dir.path())
        .args(["keys", "generate", "--seed", SEED, "-o", "inline", "--save", "key.txt"])
        .assert()
        .success()
        .stdout(predicate::str::contains("result saved to: key.txt"));

    let saved = fs::read_to_string(dir.path().join("key.txt")).unwrap();
    assert_eq!(saved.split_whitespace().count(), 2);
}

#[test]
fn test_project_init_writes_config() {
    let dir = TempDir::new().unwrap();
    flow(dir.path())
        .args(["project", "init", "--service-private-key", SERVICE_KEY])
        .assert()
        .success()
        .stdout(predicate::str::contains("0xf8d6e0586b0a20c7"));

    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("flow.json")).unwrap()).unwrap();
    assert_eq!(written["accounts"]["emulator-account"]["address"], "f8d6e0586b0a20c7");
    assert!(written["networks"]["testnet"].is_string());
    assert!(fs::read_to_string(dir.path().join("flow.json")).unwrap().contains(SERVICE_KEY));

    // an existing configuration is only replaced with --reset
    flow(dir.path())
        .args(["project", "init"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("already exists"));
    flow(dir.path()).args(["project", "init", "--reset"]).assert().success();
    assert!(!fs::read_to_string(dir.path().join("flow.json")).unwrap().contains(SERVICE_KEY));
}

#[test]
fn test_missing_explicit_config_fails() {
    let dir = TempDir::new().unwrap();
    flow(dir.path())
        .args(["-f", "missing.json", "project", "deploy"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("missing.json"));
}

#[test]
fn test_project_deploy_in_process() {
    let dir = workspace();
    let output = flow(dir.path())
        .args(["--host", "in-process", "-o", "json", "project", "deploy"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let report = stdout_json(&output);
    assert_eq!(report["network"], "emulator");
    let contracts = report["contracts"].as_array().unwrap();
    let names: Vec<_> = contracts.iter().map(|c| c["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["Greeter", "Hello"]);
    assert!(contracts.iter().all(|c| c["outcome"] == "added"));
    assert!(contracts.iter().all(|c| c["address"] == "0xf8d6e0586b0a20c7"));
}

#[test]
fn test_project_deploy_reports_unresolved_import() {
    let dir = workspace();
    fs::write(
        dir.path().join("contracts/Hello.cdc"),
        "import Missing from \"./Missing.cdc\"\n\naccess(all) contract Hello {}\n",
    )
    .unwrap();

    flow(dir.path())
        .args(["--host", "in-process", "project", "deploy"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Missing.cdc"));
}

#[test]
fn test_accounts_get_in_process() {
    let dir = workspace();
    flow(dir.path())
        .args(["--host", "in-process", "accounts", "get", "f8d6e0586b0a20c7"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0xf8d6e0586b0a20c7"))
        .stdout(predicate::str::contains("Keys"));
}

#[test]
fn test_blocks_get_latest_in_process() {
    let dir = workspace();
    let output = flow(dir.path())
        .args(["--host", "in-process", "-o", "json", "blocks", "get", "latest"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["block"]["height"], 0);
}

#[test]
fn test_in_process_requires_project() {
    let dir = TempDir::new().unwrap();
    flow(dir.path())
        .args(["--host", "in-process", "status"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("project configuration"));
}

#[test]
fn test_invalid_block_query_fails() {
    let dir = workspace();
    flow(dir.path())
        .args(["--host", "in-process", "blocks", "get", "not-a-block"])
        .assert()
        .failure();
}
