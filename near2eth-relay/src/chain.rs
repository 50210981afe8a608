//! Interfaces of the two chains the relay talks to.

use alloy_primitives::{Address, U256};
use async_trait::async_trait;

use crate::error::RelayError;
use crate::near_types::{hash::CryptoHash, BlockHeight};
use crate::types::{BlockSummary, ChainStatus, ClientHead, LightClientBlockView, TxOutcome};

/// Read-only access to the NEAR chain.
#[async_trait]
pub trait SourceChainReader: Send + Sync {
    async fn status(&self) -> Result<ChainStatus, RelayError>;

    async fn block(&self, height: BlockHeight) -> Result<BlockSummary, RelayError>;

    /// Returns `None` while the node has not produced the proof yet.
    async fn next_light_client_block(
        &self,
        after: &CryptoHash,
    ) -> Result<Option<LightClientBlockView>, RelayError>;
}

/// The verifier contract on the target chain, bound to the relay's signer.
///
/// Transaction methods return once the receipt is available; a reverted
/// receipt is reported as [`RelayError::TransactionRejected`].
#[async_trait]
pub trait TargetChainClient: Send + Sync {
    /// Address the relay signs with.
    fn signer_address(&self) -> Address;

    async fn is_initialized(&self) -> Result<bool, RelayError>;

    async fn init_with_block(&self, data: Vec<u8>) -> Result<TxOutcome, RelayError>;

    async fn head(&self) -> Result<ClientHead, RelayError>;

    async fn block_hash(&self, height: BlockHeight) -> Result<CryptoHash, RelayError>;

    async fn required_stake_amount(&self) -> Result<U256, RelayError>;

    async fn stake_balance_of(&self, address: Address) -> Result<U256, RelayError>;

    async fn deposit(&self, amount: U256) -> Result<TxOutcome, RelayError>;

    async fn add_light_client_block(&self, data: Vec<u8>) -> Result<TxOutcome, RelayError>;

    /// Timestamp (seconds) of the latest target chain block.
    async fn current_chain_time(&self) -> Result<u64, RelayError>;
}
