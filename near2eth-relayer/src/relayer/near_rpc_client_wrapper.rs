//! Implementation of a wrapper of NEAR JsonRpcClient.
//!

use std::fmt::Debug;

use async_trait::async_trait;
use near2eth_relay::near_types::{hash::CryptoHash, BlockHeight};
use near2eth_relay::types::{BlockSummary, ChainStatus, LightClientBlockView};
use near2eth_relay::{RelayError, SourceChainReader};
use near_jsonrpc_client::{methods, JsonRpcClient, MethodCallResult};
use near_primitives::types::{BlockId, Finality};
use near_primitives::views::{BlockView, StatusResponse};
use tokio_retry::strategy::{jitter, ExponentialBackoff, FixedInterval};
use tokio_retry::Retry;

use super::utils::produce_light_client_block_view;

enum RetryStrategy {
    ExponentialBackoff,
    FixedInterval,
}

/// A client that wraps around [`JsonRpcClient`], and provides more capabilities such
/// as retry w/ exponential backoff.
pub struct NearRpcClientWrapper {
    ///
    pub rpc_addr: String,
    ///
    pub rpc_client: JsonRpcClient,
}

fn transport_error<E: Debug>(err: E) -> RelayError {
    RelayError::Transport(format!("{:?}", err))
}

impl NearRpcClientWrapper {
    /// Create a client for the given NEAR RPC endpoint.
    pub fn new(rpc_addr: &str) -> Self {
        let connector = JsonRpcClient::new_client();
        let rpc_client = connector.connect(rpc_addr);

        Self {
            rpc_client,
            rpc_addr: rpc_addr.into(),
        }
    }

    pub(crate) async fn query<M>(&self, method: &M) -> MethodCallResult<M::Response, M::Error>
    where
        M: methods::RpcMethod + Debug,
        M::Response: Debug,
        M::Error: Debug,
    {
        retry(
            || async {
                let result = self.rpc_client.call(method).await;
                tracing::debug!(
                    target: "near_rpc",
                    "Querying RPC with {:?} resulted in {:?}",
                    method,
                    result
                );
                result
            },
            RetryStrategy::FixedInterval,
        )
        .await
    }

    /// Node status, including the chain id and the latest block height.
    pub async fn view_status(&self) -> Result<StatusResponse, RelayError> {
        retry(
            || async {
                self.query(&methods::status::RpcStatusRequest)
                    .await
                    .map_err(transport_error)
            },
            RetryStrategy::ExponentialBackoff,
        )
        .await
    }

    /// Block at the given height, or the latest one.
    pub async fn view_block(&self, block_id: &Option<BlockId>) -> Result<BlockView, RelayError> {
        retry(
            || async {
                let block_reference = block_id
                    .clone()
                    .map(Into::into)
                    .unwrap_or_else(|| Finality::None.into());

                self.query(&methods::block::RpcBlockRequest { block_reference })
                    .await
                    .map_err(transport_error)
            },
            RetryStrategy::ExponentialBackoff,
        )
        .await
    }

    /// The light client block following `last_block_hash`, if the node has it.
    pub async fn get_next_light_client_block(
        &self,
        last_block_hash: &CryptoHash,
    ) -> Result<Option<near_primitives::views::LightClientBlockView>, RelayError> {
        retry(
            || async {
                self.query(
                    &methods::next_light_client_block::RpcLightClientNextBlockRequest {
                        last_block_hash: near_primitives::hash::CryptoHash(last_block_hash.0),
                    },
                )
                .await
                .map_err(transport_error)
            },
            RetryStrategy::ExponentialBackoff,
        )
        .await
    }
}

#[async_trait]
impl SourceChainReader for NearRpcClientWrapper {
    async fn status(&self) -> Result<ChainStatus, RelayError> {
        let status = self.view_status().await?;
        Ok(ChainStatus {
            latest_height: status.sync_info.latest_block_height,
        })
    }

    async fn block(&self, height: BlockHeight) -> Result<BlockSummary, RelayError> {
        let block_view = self.view_block(&Some(BlockId::Height(height))).await?;
        Ok(BlockSummary {
            height: block_view.header.height,
            last_final_block_hash: CryptoHash(block_view.header.last_final_block.0),
        })
    }

    async fn next_light_client_block(
        &self,
        after: &CryptoHash,
    ) -> Result<Option<LightClientBlockView>, RelayError> {
        self.get_next_light_client_block(after)
            .await?
            .as_ref()
            .map(produce_light_client_block_view)
            .transpose()
    }
}

async fn retry<R, E, T, F>(task: F, strategy: RetryStrategy) -> T::Output
where
    F: FnMut() -> T,
    T: core::future::Future<Output = Result<R, E>>,
{
    match strategy {
        RetryStrategy::ExponentialBackoff => {
            // Exponential backoff for maximum retry of 3 times with the following delays:
            //   100, 1000, 10000 ms
            let retry_strategy = ExponentialBackoff::from_millis(10)
                .factor(10)
                .map(jitter)
                .take(3);
            Retry::spawn(retry_strategy, task).await
        }
        RetryStrategy::FixedInterval => {
            let retry_strategy = FixedInterval::from_millis(1000).map(jitter).take(3);
            Retry::spawn(retry_strategy, task).await
        }
    }
}
