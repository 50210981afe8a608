//! Core of the NEAR to Ethereum light client relay.
//!
//! [`encoder`] turns light-client blocks returned by NEAR RPC into the binary
//! layout the Ethereum verifier contract decodes, and [`engine::RelayEngine`]
//! drives the contract's head forward through the [`chain`] interfaces.

pub mod chain;
pub mod encoder;
pub mod engine;
pub mod error;
pub mod near_types;
pub mod types;

pub use chain::{SourceChainReader, TargetChainClient};
pub use encoder::encode;
pub use engine::{InitOutcome, RelayConfig, RelayEngine, StepOutcome};
pub use error::{EncodeError, RelayError};
