//! End-to-end planning over contracts laid out like a project directory.

use std::collections::HashMap;

use flow_resolver::{DeploymentPlanner, ResolvedContract};
use flow_types::{Address, Error};

const NFT: &str = r#"
access(all) contract interface NonFungibleToken {
    access(all) resource interface NFT {
        access(all) let id: UInt64
    }
}
"#;

const FOO: &str = r#"
import NonFungibleToken from "./NonFungibleToken.cdc"

access(all) contract Foo {
    access(all) let name: String
    init() {
        self.name = "Foo"
    }
}
"#;

fn service() -> Address {
    Address::from_hex("f8d6e0586b0a20c7").unwrap()
}

#[test]
fn test_ordered_plan_rewrites_imports() {
    let mut planner = DeploymentPlanner::new(HashMap::new());
    // dependent contract first, to prove the order is not just insertion order
    planner
        .add(ResolvedContract::new("Foo", "./contracts/Foo.cdc", service()), FOO.as_bytes())
        .unwrap();
    planner
        .add(
            ResolvedContract::new("NonFungibleToken", "contracts/NonFungibleToken.cdc", service()),
            NFT.as_bytes(),
        )
        .unwrap();

    let plan = planner.plan().unwrap();
    let names: Vec<_> = plan.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["NonFungibleToken", "Foo"]);

    let foo = &plan[1];
    assert!(foo.code.contains("import NonFungibleToken from 0xf8d6e0586b0a20c7"));
    assert!(!foo.code.contains("\"./NonFungibleToken.cdc\""));
    assert!(foo.code.contains("self.name = \"Foo\""));
    assert_eq!(plan[0].code, NFT);
}

#[test]
fn test_two_contract_cycle_is_rejected() {
    let mut planner = DeploymentPlanner::new(HashMap::new());
    planner
        .add(
            ResolvedContract::new("A", "A.cdc", service()),
            b"import B from \"./B.cdc\"\naccess(all) contract A {}",
        )
        .unwrap();
    planner
        .add(
            ResolvedContract::new("B", "B.cdc", service()),
            b"import A from \"./A.cdc\"\naccess(all) contract B {}",
        )
        .unwrap();

    match planner.plan() {
        Err(Error::ImportCycle(path)) => assert_eq!(path, vec!["A", "B", "A"]),
        other => panic!("expected import cycle, got {:?}", other),
    }
}
