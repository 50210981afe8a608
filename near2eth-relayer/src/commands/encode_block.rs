//! `encode-block` subcommand - print the encoding of a light client block
//! exactly as it would be submitted to the verifier contract.

use crate::commands::run_to_completion;
use crate::error::Error;
use crate::prelude::*;
use crate::relayer;
use crate::relayer::utils::print_light_client_block_view;
use abscissa_core::{Command, Runnable};
use near2eth_relay::near_types::{hash::CryptoHash, LightClientBlock};
use near2eth_relay::{encoder, RelayError, SourceChainReader};

/// `encode-block` subcommand
///
/// Only talks to the NEAR RPC, nothing is sent to Ethereum.
#[derive(clap::Parser, Command, Debug)]
pub struct EncodeBlockCmd {
    /// Base58 hash of the block to start from. Defaults to the latest final block.
    pub block_hash: Option<String>,
}

impl Runnable for EncodeBlockCmd {
    fn run(&self) {
        run_to_completion("encode-block", encode_block(self.block_hash.clone()));
    }
}

async fn encode_block(block_hash: Option<String>) -> Result<(), Error> {
    let client = relayer::connect_near(&APP.config().near_rpc).await?;
    let after = match block_hash {
        Some(text) => text
            .parse::<CryptoHash>()
            .map_err(|err| RelayError::Configuration(format!("invalid block hash: {}", err)))?,
        None => {
            let status = client.status().await?;
            client.block(status.latest_height).await?.last_final_block_hash
        }
    };

    let view = client
        .next_light_client_block(&after)
        .await?
        .ok_or(RelayError::ProofUnavailable { after })?;
    print_light_client_block_view(&view);

    let block = LightClientBlock::try_from(&view).map_err(RelayError::from)?;
    let bytes = encoder::to_bytes(&block).map_err(RelayError::from)?;
    status_info!(
        "Info",
        "Block {} at height {}, {} bytes encoded",
        block.current_block_hash(),
        block.inner_lite.height,
        bytes.len()
    );
    println!("{}", hex::encode(bytes));
    Ok(())
}
