//! `view-head` subcommand - to print the head stored in the verifier contract.

use crate::commands::run_to_completion;
use crate::error::Error;
/// App-local prelude includes `app_reader()`/`app_writer()`/`app_config()`
/// accessors along with logging macros. Customize as you see fit.
use crate::prelude::*;
use crate::relayer::eth_client::{EthBridgeClient, EthBridgeSettings};
use crate::relayer::utils::{print_client_head, print_stake_state};
use abscissa_core::{Command, Runnable};
use near2eth_relay::types::StakeState;
use near2eth_relay::TargetChainClient;

/// `view-head` subcommand
///
/// Only talks to the Ethereum node.
#[derive(clap::Parser, Command, Debug)]
pub struct ViewHeadCmd {
    /// Also print the stake of the relay account.
    #[arg(long)]
    pub with_stake: bool,
}

impl Runnable for ViewHeadCmd {
    fn run(&self) {
        run_to_completion("view-head", view_head(self.with_stake));
    }
}

async fn view_head(with_stake: bool) -> Result<(), Error> {
    let settings = EthBridgeSettings::from_config(&APP.config().eth_rpc)?;
    let client = EthBridgeClient::new(settings);

    if !client.is_initialized().await? {
        status_warn!("Verifier contract {} is not initialized.", client.contract_address());
        return Ok(());
    }
    let head = client.head().await?;
    let hash = client.block_hash(head.height).await?;
    let chain_time = client.current_chain_time().await?;
    print_client_head(&head, &hash, chain_time);

    if with_stake {
        let stake = StakeState {
            required: client.required_stake_amount().await?,
            balance: client.stake_balance_of(client.signer_address()).await?,
        };
        status_info!("Info", "Relay account: {}", client.signer_address());
        print_stake_state(&stake);
        if stake.needs_deposit() {
            status_warn!("Relay account has no stake, `start` will deposit it.");
        }
    }
    Ok(())
}
