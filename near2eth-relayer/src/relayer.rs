//! Wiring of the relay engine to the NEAR RPC and the Ethereum contract.

pub mod eth_client;
pub mod near_rpc_client_wrapper;
pub mod utils;

use near2eth_relay::{RelayConfig, RelayEngine, RelayError, TargetChainClient};
use url::Url;

use self::eth_client::{EthBridgeClient, EthBridgeSettings};
use self::near_rpc_client_wrapper::NearRpcClientWrapper;
use crate::config::{Near2EthRelayerConfig, NearRpcSection};

/// Relay engine between NEAR RPC and the Ethereum verifier contract.
pub type Near2EthEngine = RelayEngine<NearRpcClientWrapper, EthBridgeClient>;

/// Validate the configuration, then connect both chains.
///
/// The NEAR node must report the configured `network_id`.
pub async fn connect(config: &Near2EthRelayerConfig) -> Result<Near2EthEngine, RelayError> {
    let eth_settings = EthBridgeSettings::from_config(&config.eth_rpc)?;
    let near_client = connect_near(&config.near_rpc).await?;
    let eth_client = EthBridgeClient::new(eth_settings);
    tracing::info!(
        signer = %eth_client.signer_address(),
        contract = %eth_client.contract_address(),
        "connected to the verifier contract"
    );
    Ok(RelayEngine::new(
        near_client,
        eth_client,
        RelayConfig::from(&config.relay),
    ))
}

/// Connect to the NEAR RPC and check its chain id.
pub async fn connect_near(section: &NearRpcSection) -> Result<NearRpcClientWrapper, RelayError> {
    section.rpc_endpoint.parse::<Url>().map_err(|err| {
        RelayError::Configuration(format!(
            "invalid near_rpc.rpc_endpoint `{}`: {}",
            section.rpc_endpoint, err
        ))
    })?;
    let client = NearRpcClientWrapper::new(&section.rpc_endpoint);
    let status = client.view_status().await?;
    if status.chain_id != section.network_id {
        return Err(RelayError::Configuration(format!(
            "NEAR RPC {} serves chain `{}`, expected `{}`",
            section.rpc_endpoint, status.chain_id, section.network_id
        )));
    }
    tracing::info!(
        chain_id = %status.chain_id,
        latest_height = status.sync_info.latest_block_height,
        "connected to NEAR RPC"
    );
    Ok(client)
}
