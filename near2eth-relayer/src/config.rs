//! Near2EthRelayer Config
//!
//! See instructions in `commands.rs` to specify the path to your
//! application's configuration file and/or command-line options
//! for specifying it.

use std::time::Duration;

use near2eth_relay::RelayConfig;
use serde::{Deserialize, Serialize};

/// Near2EthRelayer Configuration
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Near2EthRelayerConfig {
    /// Configuration for NEAR rpc.
    #[serde(default)]
    pub near_rpc: NearRpcSection,
    /// Configuration for the Ethereum node and the verifier contract.
    #[serde(default)]
    pub eth_rpc: EthRpcSection,
    /// Timing and retry settings of the relay loop.
    #[serde(default)]
    pub relay: RelaySection,
}

/// Configuration settings for NEAR RPC.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NearRpcSection {
    /// Endpoint of the RPC service. Should be a valid URL.
    pub rpc_endpoint: String,
    /// Chain id the endpoint must report, e.g. `testnet`.
    pub network_id: String,
}

impl Default for NearRpcSection {
    fn default() -> Self {
        Self {
            rpc_endpoint: "https://rpc.testnet.near.org".to_owned(),
            network_id: "testnet".to_owned(),
        }
    }
}

/// Configuration settings for the Ethereum side.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EthRpcSection {
    /// Endpoint of the Ethereum JSON-RPC service.
    pub rpc_endpoint: String,
    /// Hex encoded private key of the relay account.
    pub master_sk: String,
    /// JSON ABI of the verifier contract.
    pub client_abi_path: String,
    /// Address of the verifier contract.
    pub client_address: String,
    /// Gas limit of every transaction sent to the verifier contract.
    pub gas_limit: u64,
}

impl Default for EthRpcSection {
    fn default() -> Self {
        Self {
            rpc_endpoint: "http://localhost:8545".to_owned(),
            master_sk: String::new(),
            client_abi_path: "./res/NearBridge.full.abi".to_owned(),
            client_address: String::new(),
            gas_limit: 1_000_000,
        }
    }
}

/// Configuration settings for the relay loop.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RelaySection {
    /// Interval between polls for a light client block that is not available yet.
    pub proof_poll_interval_ms: u64,
    /// First retry delay after a failed step.
    pub retry_base_delay_ms: u64,
    /// Upper bound of the retry delay.
    pub retry_max_delay_secs: u64,
    /// Stop relaying after this many failed steps in a row. Unlimited if unset.
    pub max_consecutive_failures: Option<u32>,
}

impl Default for RelaySection {
    fn default() -> Self {
        Self {
            proof_poll_interval_ms: 300,
            retry_base_delay_ms: 1000,
            retry_max_delay_secs: 60,
            max_consecutive_failures: None,
        }
    }
}

impl From<&RelaySection> for RelayConfig {
    fn from(section: &RelaySection) -> Self {
        RelayConfig {
            proof_poll_interval: Duration::from_millis(section.proof_poll_interval_ms),
            retry_base_delay: Duration::from_millis(section.retry_base_delay_ms),
            retry_max_delay: Duration::from_secs(section.retry_max_delay_secs),
            max_consecutive_failures: section.max_consecutive_failures,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_relay_section_matches_engine_defaults() {
        assert_eq!(
            RelayConfig::from(&RelaySection::default()),
            RelayConfig::default()
        );
    }

    #[test]
    fn sections_fall_back_to_defaults() {
        let config: Near2EthRelayerConfig = serde_json::from_str(
            r#"{ "eth_rpc": {
                "rpc_endpoint": "http://eth:8545",
                "master_sk": "0x01",
                "client_abi_path": "bridge.abi",
                "client_address": "0x0000000000000000000000000000000000000001",
                "gas_limit": 2000000
            } }"#,
        )
        .unwrap();
        assert_eq!(config.near_rpc.network_id, "testnet");
        assert_eq!(config.eth_rpc.gas_limit, 2_000_000);
        assert_eq!(config.relay.proof_poll_interval_ms, 300);
        assert!(config.relay.max_consecutive_failures.is_none());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result: Result<Near2EthRelayerConfig, _> =
            serde_json::from_str(r#"{ "relay": { "poll_ms": 1 } }"#);
        assert!(result.is_err());
    }
}
