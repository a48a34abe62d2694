//! Well-known hosts and REST endpoint resolution.

use flow_types::env_utils::env_string;
use flow_types::Chain;

pub const EMULATOR_HOST: &str = "127.0.0.1:3569";
pub const TESTNET_HOST: &str = "access.devnet.nodes.onflow.org:9000";
pub const MAINNET_HOST: &str = "access.mainnet.nodes.onflow.org:9000";

const EMULATOR_REST: &str = "http://127.0.0.1:8888";
const TESTNET_REST: &str = "https://rest-testnet.onflow.org";
const MAINNET_REST: &str = "https://rest-mainnet.onflow.org";

/// Environment variable that forces the REST endpoint.
pub const REST_ENDPOINT_ENV: &str = "FLOW_REST_ENDPOINT";

/// Default host for one of the built-in network names.
pub fn default_host(network: &str) -> Option<&'static str> {
    match network {
        "emulator" => Some(EMULATOR_HOST),
        "testnet" => Some(TESTNET_HOST),
        "mainnet" => Some(MAINNET_HOST),
        _ => None,
    }
}

/// Guess the chain served by a host, by name.
pub fn infer_chain_from_host(host: &str) -> Option<Chain> {
    let lower = host.to_lowercase();
    if lower.contains("mainnet") {
        Some(Chain::Mainnet)
    } else if lower.contains("testnet") || lower.contains("devnet") {
        Some(Chain::Testnet)
    } else if lower.starts_with("127.0.0.1") || lower.starts_with("localhost") || lower.contains("//127.0.0.1") || lower.contains("//localhost") {
        Some(Chain::Emulator)
    } else {
        None
    }
}

/// Map a configured host to the REST endpoint of the same node.
///
/// `FLOW_REST_ENDPOINT` wins when set. Known gRPC hosts map to their public
/// REST endpoints; hosts with an explicit scheme are used as given; anything
/// else gets `http://` prepended.
pub fn resolve_rest_endpoint(host: &str) -> String {
    if let Some(value) = env_string(REST_ENDPOINT_ENV) {
        return value.trim_end_matches('/').to_string();
    }

    let host = host.trim();
    match host {
        EMULATOR_HOST | "localhost:3569" => return EMULATOR_REST.to_string(),
        TESTNET_HOST | "access.testnet.nodes.onflow.org:9000" => return TESTNET_REST.to_string(),
        MAINNET_HOST => return MAINNET_REST.to_string(),
        _ => {}
    }

    if host.starts_with("http://") || host.starts_with("https://") {
        host.trim_end_matches('/').to_string()
    } else {
        format!("http://{}", host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_known_hosts() {
        // the override is not set in unit tests
        assert_eq!(resolve_rest_endpoint("127.0.0.1:3569"), "http://127.0.0.1:8888");
        assert_eq!(resolve_rest_endpoint(TESTNET_HOST), "https://rest-testnet.onflow.org");
        assert_eq!(resolve_rest_endpoint(MAINNET_HOST), "https://rest-mainnet.onflow.org");
    }

    #[test]
    fn test_resolve_custom_hosts() {
        assert_eq!(resolve_rest_endpoint("https://node.example.org/"), "https://node.example.org");
        assert_eq!(resolve_rest_endpoint("10.0.0.5:8080"), "http://10.0.0.5:8080");
    }

    #[test]
    fn test_infer_chain() {
        assert_eq!(infer_chain_from_host(MAINNET_HOST), Some(Chain::Mainnet));
        assert_eq!(infer_chain_from_host(TESTNET_HOST), Some(Chain::Testnet));
        assert_eq!(infer_chain_from_host(EMULATOR_HOST), Some(Chain::Emulator));
        assert_eq!(infer_chain_from_host("node.example.org:9000"), None);
        assert_eq!(default_host("testnet"), Some(TESTNET_HOST));
        assert_eq!(default_host("previewnet"), None);
    }
}
