//! `init` subcommand - initialize the verifier contract without relaying.

use crate::commands::run_to_completion;
use crate::error::Error;
use crate::{info_with_time, prelude::*, relayer};
use abscissa_core::{Command, Runnable};
use near2eth_relay::InitOutcome;

/// `init` subcommand
#[derive(clap::Parser, Command, Debug)]
pub struct InitCmd {}

impl Runnable for InitCmd {
    fn run(&self) {
        run_to_completion("init", init_client());
    }
}

async fn init_client() -> Result<(), Error> {
    let engine = relayer::connect(&APP.config()).await?;
    match engine.initialize().await? {
        InitOutcome::AlreadyInitialized => {
            status_warn!("Verifier contract is already initialized, nothing to do.");
        }
        InitOutcome::Initialized { height, hash, tx } => {
            info_with_time!(
                "Initialized verifier contract with block {} at height {} (tx {}, gas used {}).",
                hash,
                height,
                tx.tx_hash,
                tx.gas_used
            );
        }
    }
    Ok(())
}
