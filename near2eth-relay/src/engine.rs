//! The relay state machine: initialization of the verifier contract and the
//! advancement loop that keeps its head following NEAR finality.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::sleep;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;
use tracing::{debug, error, info, warn};

use crate::chain::{SourceChainReader, TargetChainClient};
use crate::encoder;
use crate::error::RelayError;
use crate::near_types::{hash::CryptoHash, BlockHeight, LightClientBlock};
use crate::types::{ClientHead, LightClientBlockView, StakeState, TxOutcome};

/// Attempts after the first for a read made during initialization.
const READ_RETRIES: usize = 5;

/// Timing and retry settings of [`RelayEngine`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelayConfig {
    /// Pause between two requests for a light-client block that is not
    /// available yet.
    pub proof_poll_interval: Duration,
    /// First delay after a failed advancement step. Doubles on every
    /// consecutive failure.
    pub retry_base_delay: Duration,
    pub retry_max_delay: Duration,
    /// `None` retries forever.
    pub max_consecutive_failures: Option<u32>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            proof_poll_interval: Duration::from_millis(300),
            retry_base_delay: Duration::from_secs(1),
            retry_max_delay: Duration::from_secs(60),
            max_consecutive_failures: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InitOutcome {
    AlreadyInitialized,
    Initialized {
        height: BlockHeight,
        hash: CryptoHash,
        tx: TxOutcome,
    },
}

/// Result of one advancement step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepOutcome {
    pub previous_height: BlockHeight,
    pub height: BlockHeight,
    pub hash: CryptoHash,
    pub deposit: Option<TxOutcome>,
    pub tx: TxOutcome,
}

pub struct RelayEngine<S, T> {
    source: S,
    target: T,
    config: RelayConfig,
}

impl<S, T> RelayEngine<S, T>
where
    S: SourceChainReader,
    T: TargetChainClient,
{
    pub fn new(source: S, target: T, config: RelayConfig) -> Self {
        Self {
            source,
            target,
            config,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Submit the first block to the contract unless it already has one.
    ///
    /// Reads failing with a transient error are retried with backoff. A
    /// failed `initWithBlock` transaction is returned as is and never retried.
    pub async fn initialize(&self) -> Result<InitOutcome, RelayError> {
        info!("checking whether client is initialized");
        if self
            .read("initialized", || self.target.is_initialized())
            .await?
        {
            info!("client is initialized");
            return Ok(InitOutcome::AlreadyInitialized);
        }

        info!("client is not initialized, initializing");
        let status = self.read("status", || self.source.status()).await?;
        let head_block = self
            .read("block", || self.source.block(status.latest_height))
            .await?;
        let last_final_block_hash = head_block.last_final_block_hash;
        debug!(
            latest_height = status.latest_height,
            last_final_block = %last_final_block_hash,
            "resolved last final block"
        );

        let view = self
            .read("next light client block", || {
                self.wait_for_next_block(&last_final_block_hash, None)
            })
            .await?
            .ok_or(RelayError::ProofUnavailable {
                after: last_final_block_hash,
            })?;
        let block = LightClientBlock::try_from(&view)?;
        info!(
            height = block.inner_lite.height,
            hash = %block.current_block_hash(),
            "initializing with block"
        );
        let tx = self
            .target
            .init_with_block(encoder::to_bytes(&block)?)
            .await?;
        info!(tx = %tx.tx_hash, "initialization transaction mined");

        let head = self.read("head", || self.target.head()).await?;
        let hash = self
            .read("block hash", || self.target.block_hash(head.height))
            .await?;
        info!(height = head.height, %hash, "client is initialized");
        Ok(InitOutcome::Initialized {
            height: head.height,
            hash,
            tx,
        })
    }

    /// One advancement step: wait for the head to become valid, make sure the
    /// relay has stake, then submit the next light-client block.
    ///
    /// The waits end early once `shutdown` turns `true`; the step then returns
    /// `None` without sending any transaction.
    pub async fn step(
        &self,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<Option<StepOutcome>, RelayError> {
        let head = self.target.head().await?;
        let head_hash = self.target.block_hash(head.height).await?;
        info!(hash = %head_hash, height = head.height, "current light client head");

        if !self.wait_until_valid(&head, shutdown).await? {
            return Ok(None);
        }
        let deposit = self.ensure_stake().await?;

        let view = match self.wait_for_next_block(&head_hash, Some(shutdown)).await? {
            Some(view) => view,
            None => return Ok(None),
        };
        let block = LightClientBlock::try_from(&view)?;
        let height = block.inner_lite.height;
        if height <= head.height {
            return Err(RelayError::InvalidResponse(format!(
                "next light client block after {} has height {}, not above head {}",
                head_hash, height, head.height
            )));
        }
        let hash = block.current_block_hash();

        info!(height, %hash, "adding block");
        let tx = self
            .target
            .add_light_client_block(encoder::to_bytes(&block)?)
            .await?;
        info!(height, tx = %tx.tx_hash, "block added");

        Ok(Some(StepOutcome {
            previous_height: head.height,
            height,
            hash,
            deposit,
            tx,
        }))
    }

    /// Run advancement steps until `shutdown` turns `true`.
    ///
    /// Failed steps are retried with exponential backoff, starting again from
    /// reading the head. Fatal errors, or more than
    /// `max_consecutive_failures` failures in a row, end the loop.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), RelayError> {
        let mut backoff = self.backoff();
        let mut failures = 0u32;

        while !*shutdown.borrow() {
            match self.step(&mut shutdown).await {
                Ok(Some(outcome)) => {
                    debug!(?outcome, "advancement step finished");
                    failures = 0;
                    backoff = self.backoff();
                }
                Ok(None) => break,
                Err(err) if err.is_fatal() => {
                    error!(%err, "fatal error, stopping relay");
                    return Err(err);
                }
                Err(err) => {
                    failures += 1;
                    if let Some(max) = self.config.max_consecutive_failures {
                        if failures > max {
                            error!(%err, failures, "too many consecutive failures, stopping relay");
                            return Err(err);
                        }
                    }
                    let delay = backoff.next().unwrap_or(self.config.retry_max_delay);
                    if err.is_persistent() {
                        error!(%err, failures, ?delay, "advancement step failed, retrying");
                    } else {
                        warn!(%err, failures, ?delay, "advancement step failed, retrying");
                    }
                    pause(delay, Some(&mut shutdown)).await;
                }
            }
        }

        info!("shutdown requested, relay stopped");
        Ok(())
    }

    /// Sleep until the target chain time reaches `head.valid_after`.
    ///
    /// Returns `false` if shutdown was requested first.
    async fn wait_until_valid(
        &self,
        head: &ClientHead,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<bool, RelayError> {
        loop {
            let now = self.target.current_chain_time().await?;
            if now >= head.valid_after {
                info!("block is valid");
                return Ok(true);
            }
            let sleep_secs = head.valid_after - now;
            info!(sleep_secs, "block is not valid yet");
            if !pause(Duration::from_secs(sleep_secs), Some(&mut *shutdown)).await {
                info!("shutdown requested while waiting for validity");
                return Ok(false);
            }
        }
    }

    /// Current and required stake of the relay's signer.
    pub async fn stake_state(&self) -> Result<StakeState, RelayError> {
        let required = self.target.required_stake_amount().await?;
        let balance = self
            .target
            .stake_balance_of(self.target.signer_address())
            .await?;
        Ok(StakeState { balance, required })
    }

    /// Deposit the required stake if the relay has none.
    async fn ensure_stake(&self) -> Result<Option<TxOutcome>, RelayError> {
        let stake = self.stake_state().await?;
        if !stake.needs_deposit() {
            return Ok(None);
        }
        info!(required = %stake.required, "sender has no stake, depositing");
        let tx = self.target.deposit(stake.required).await?;
        info!(tx = %tx.tx_hash, "stake deposited");
        Ok(Some(tx))
    }

    /// Poll the source chain until it has the light-client block after
    /// `after`. Returns `None` if shutdown was requested first.
    async fn wait_for_next_block(
        &self,
        after: &CryptoHash,
        mut shutdown: Option<&mut watch::Receiver<bool>>,
    ) -> Result<Option<LightClientBlockView>, RelayError> {
        loop {
            if let Some(view) = self.source.next_light_client_block(after).await? {
                return Ok(Some(view));
            }
            debug!(%after, "next light client block is not available yet");
            if !pause(self.config.proof_poll_interval, shutdown.as_deref_mut()).await {
                info!("shutdown requested while waiting for the next block");
                return Ok(None);
            }
        }
    }

    /// Run `read`, retrying transient failures with the step backoff.
    async fn read<R, F, Fut>(&self, what: &str, read: F) -> Result<R, RelayError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<R, RelayError>>,
    {
        RetryIf::spawn(self.backoff().take(READ_RETRIES), read, |err: &RelayError| {
            let retry = err.is_retryable_read();
            if retry {
                warn!(%err, what, "read failed, retrying");
            }
            retry
        })
        .await
    }

    fn backoff(&self) -> impl Iterator<Item = Duration> {
        retry_delays(&self.config).map(jitter)
    }
}

/// Sleep for `duration`, waking early if `shutdown` changes.
///
/// Returns `false` if shutdown was requested. Without a receiver, or once its
/// sender is gone, this is a plain sleep.
async fn pause(duration: Duration, shutdown: Option<&mut watch::Receiver<bool>>) -> bool {
    let Some(shutdown) = shutdown else {
        sleep(duration).await;
        return true;
    };
    if *shutdown.borrow() {
        return false;
    }
    tokio::select! {
        _ = sleep(duration) => true,
        changed = shutdown.changed() => {
            if changed.is_err() {
                sleep(duration).await;
                return true;
            }
            !*shutdown.borrow()
        }
    }
}

/// `retry_base_delay`, doubling on every step, capped at `retry_max_delay`.
fn retry_delays(config: &RelayConfig) -> ExponentialBackoff {
    let factor = (config.retry_base_delay.as_millis() as u64 / 2).max(1);
    ExponentialBackoff::from_millis(2)
        .factor(factor)
        .max_delay(config.retry_max_delay)
}
