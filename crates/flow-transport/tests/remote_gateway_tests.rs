//! Tests against live access nodes. Run with `cargo test -- --ignored`.

use flow_transport::network::TESTNET_HOST;
use flow_transport::{Gateway, RemoteGateway};
use flow_types::Address;

#[test]
#[ignore = "requires network access"]
fn test_testnet_latest_block() {
    let gateway = RemoteGateway::new(TESTNET_HOST);
    gateway.ping().expect("ping testnet");
    let block = gateway.get_latest_block().expect("latest block");
    assert!(block.height > 0);

    let same = gateway.get_block_by_height(block.height).expect("block by height");
    assert_eq!(same.id, block.id);
}

#[test]
#[ignore = "requires network access"]
fn test_testnet_service_account() {
    let gateway = RemoteGateway::new(TESTNET_HOST);
    let address = Address::from_hex("8c5303eaa26202d6").unwrap();
    let account = gateway.get_account(address).expect("service account");
    assert_eq!(account.address, address);
    assert!(!account.keys.is_empty());
}
