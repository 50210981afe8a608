//! `start` subcommand - initialize the verifier contract if needed and keep
//! relaying light client blocks to it.

use crate::commands::run_to_completion;
use crate::config::Near2EthRelayerConfig;
use crate::error::Error;
/// App-local prelude includes `app_reader()`/`app_writer()`/`app_config()`
/// accessors along with logging macros. Customize as you see fit.
use crate::{info_with_time, prelude::*, relayer};
use abscissa_core::{config, Command, FrameworkError, Runnable};
use near2eth_relay::InitOutcome;
use tokio::sync::watch;

/// `start` subcommand
///
/// The `Parser` proc macro generates an option parser based on the struct
/// definition, and is defined in the `clap` crate. See their documentation
/// for a more comprehensive example:
///
/// <https://docs.rs/clap/>
#[derive(clap::Parser, Command, Debug)]
pub struct StartCmd {
    /// NEAR RPC endpoint, overriding `near_rpc.rpc_endpoint`.
    #[arg(long)]
    pub near_rpc: Option<String>,
    /// Ethereum RPC endpoint, overriding `eth_rpc.rpc_endpoint`.
    #[arg(long)]
    pub eth_rpc: Option<String>,
}

impl Runnable for StartCmd {
    /// Start the relay.
    fn run(&self) {
        run_to_completion("start", start_relay());
    }
}

impl config::Override<Near2EthRelayerConfig> for StartCmd {
    // Endpoints given on the command line take precedence over the config file.
    fn override_config(
        &self,
        mut config: Near2EthRelayerConfig,
    ) -> Result<Near2EthRelayerConfig, FrameworkError> {
        if let Some(near_rpc) = &self.near_rpc {
            config.near_rpc.rpc_endpoint = near_rpc.clone();
        }
        if let Some(eth_rpc) = &self.eth_rpc {
            config.eth_rpc.rpc_endpoint = eth_rpc.clone();
        }
        Ok(config)
    }
}

async fn start_relay() -> Result<(), Error> {
    let config = APP.config();
    let engine = relayer::connect(&config).await?;

    match engine.initialize().await? {
        InitOutcome::AlreadyInitialized => {
            info_with_time!("Verifier contract is already initialized.");
        }
        InitOutcome::Initialized { height, hash, tx } => {
            info_with_time!(
                "Initialized verifier contract with block {} at height {} (tx {}).",
                hash,
                height,
                tx.tx_hash
            );
        }
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received Ctrl-C, stopping before the next transaction");
            request_shutdown(&shutdown_tx);
        }
    });

    engine.run(shutdown_rx).await?;
    info_with_time!("Relay stopped.");
    Ok(())
}

/// Ask the relay loop to stop. Returns `false` if the loop is already gone.
fn request_shutdown(shutdown: &watch::Sender<bool>) -> bool {
    if shutdown.send(true).is_err() {
        debug!("relay loop already stopped, shutdown signal dropped");
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shutdown_reaches_a_running_loop() {
        let (sender, receiver) = watch::channel(false);
        assert!(request_shutdown(&sender));
        assert!(*receiver.borrow());
    }

    #[test]
    fn shutdown_after_the_loop_stopped_is_reported() {
        let (sender, receiver) = watch::channel(false);
        drop(receiver);
        assert!(!request_shutdown(&sender));
    }
}
