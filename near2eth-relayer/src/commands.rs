//! Near2EthRelayer Subcommands
//!
//! - `start`: initialize the verifier contract if needed and keep relaying
//! - `init`: only initialize the verifier contract
//! - `view-head`: print the head stored in the verifier contract
//! - `encode-block`: print the encoding of a light client block
//! - `--version`: print application version
//!
//! See the `impl Configurable` below for how to specify the path to the
//! application's configuration file.

mod encode_block;
mod init;
mod start;
mod view_head;

use self::{
    encode_block::EncodeBlockCmd, init::InitCmd, start::StartCmd, view_head::ViewHeadCmd,
};
use crate::application::APP;
use crate::config::Near2EthRelayerConfig;
use crate::error::Error;
use abscissa_core::{
    config::Override, status_err, Command, Configurable, FrameworkError, Runnable,
};
use std::future::Future;
use std::path::PathBuf;

/// Near2EthRelayer Configuration Filename
pub const CONFIG_FILE: &str = "near2eth_relayer.toml";

/// Near2EthRelayer Subcommands
/// Subcommands need to be listed in an enum.
#[derive(clap::Parser, Command, Debug, Runnable)]
pub enum Near2EthRelayerCmd {
    /// Initialize the verifier contract if needed, then keep relaying NEAR
    /// light client blocks to it.
    Start(StartCmd),
    /// Initialize the verifier contract with a recent finalized NEAR block.
    Init(InitCmd),
    /// View the head stored in the verifier contract and the relay's stake.
    ViewHead(ViewHeadCmd),
    /// Print the encoding of the light client block following the given
    /// block hash, or the latest final block.
    EncodeBlock(EncodeBlockCmd),
}

/// Entry point for the application. It needs to be a struct to allow using subcommands!
#[derive(clap::Parser, Command, Debug)]
#[command(author, about, version)]
pub struct EntryPoint {
    #[command(subcommand)]
    cmd: Near2EthRelayerCmd,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Use the specified config file
    #[arg(short, long)]
    pub config: Option<String>,
}

impl Runnable for EntryPoint {
    fn run(&self) {
        self.cmd.run()
    }
}

/// This trait allows you to define how application configuration is loaded.
impl Configurable<Near2EthRelayerConfig> for EntryPoint {
    /// Location of the configuration file
    fn config_path(&self) -> Option<PathBuf> {
        // A missing default config file is ignored, so that every setting
        // can come from defaults and command-line overrides.
        let filename = self
            .config
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| CONFIG_FILE.into());

        if filename.exists() {
            Some(filename)
        } else {
            None
        }
    }

    /// Apply changes to the config after it's been loaded, e.g. overriding
    /// values in a config file using command-line options.
    fn process_config(
        &self,
        config: Near2EthRelayerConfig,
    ) -> Result<Near2EthRelayerConfig, FrameworkError> {
        match &self.cmd {
            Near2EthRelayerCmd::Start(cmd) => cmd.override_config(config),
            _ => Ok(config),
        }
    }
}

/// Run an async command body on the tokio runtime, exiting with status 1
/// if it fails.
pub(crate) fn run_to_completion<F>(name: &str, future: F)
where
    F: Future<Output = Result<(), Error>>,
{
    match abscissa_tokio::run(&APP, future) {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            status_err!("`{}` failed: {}", name, err);
            std::process::exit(1);
        }
        Err(err) => {
            status_err!("`{}` could not start: {}", name, err);
            std::process::exit(1);
        }
    }
}
