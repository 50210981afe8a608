//! Records exchanged with the two chains.

use alloy_primitives::{TxHash, U256};
use serde::{Deserialize, Serialize};

use crate::near_types::{hash::CryptoHash, Balance, BlockHeight};

/// Light-client block as returned by the NEAR `next_light_client_block` RPC.
///
/// Hashes, keys and signatures stay in their textual form here; the encoder
/// decodes them. Unknown fields (such as `timestamp_nanosec` or
/// `validator_stake_struct_version`) are ignored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightClientBlockView {
    pub prev_block_hash: String,
    pub next_block_inner_hash: String,
    pub inner_lite: BlockHeaderInnerLiteView,
    pub inner_rest_hash: String,
    #[serde(default)]
    pub next_bps: Option<Vec<ValidatorStakeView>>,
    pub approvals_after_next: Vec<Option<String>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeaderInnerLiteView {
    pub height: BlockHeight,
    pub epoch_id: String,
    pub next_epoch_id: String,
    pub prev_state_root: String,
    pub outcome_root: String,
    /// Legacy json number, nanoseconds.
    pub timestamp: u64,
    pub next_bp_hash: String,
    pub block_merkle_root: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorStakeView {
    pub account_id: String,
    pub public_key: String,
    #[serde(with = "dec_format")]
    pub stake: Balance,
}

/// Source chain status, as far as the relay needs it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChainStatus {
    pub latest_height: BlockHeight,
}

/// Header data of a source chain block, as far as the relay needs it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockSummary {
    pub height: BlockHeight,
    pub last_final_block_hash: CryptoHash,
}

/// The head currently stored by the verifier contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClientHead {
    pub height: BlockHeight,
    /// Target chain time (seconds) after which a new block is accepted.
    pub valid_after: u64,
}

/// Receipt summary of a mined target chain transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TxOutcome {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    pub gas_used: u64,
}

/// Collateral of the relay identity on the target chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StakeState {
    pub balance: U256,
    pub required: U256,
}

impl StakeState {
    /// The contract only accepts blocks from relays with a non-zero balance.
    pub fn needs_deposit(&self) -> bool {
        self.balance.is_zero()
    }
}

/// NEAR encodes balances as decimal strings; plain numbers are accepted too.
mod dec_format {
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        struct DecVisitor;

        impl<'de> Visitor<'de> for DecVisitor {
            type Value = u128;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a decimal string or a non-negative integer")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<u128, E> {
                v.parse().map_err(de::Error::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<u128, E> {
                Ok(v.into())
            }

            fn visit_u128<E: de::Error>(self, v: u128) -> Result<u128, E> {
                Ok(v)
            }
        }

        deserializer.deserialize_any(DecVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rpc_json() {
        let json = r#"{
            "prev_block_hash": "a",
            "next_block_inner_hash": "b",
            "inner_lite": {
                "height": 42,
                "epoch_id": "c",
                "next_epoch_id": "d",
                "prev_state_root": "e",
                "outcome_root": "f",
                "timestamp": 1591286036123456789,
                "timestamp_nanosec": "1591286036123456789",
                "next_bp_hash": "g",
                "block_merkle_root": "h"
            },
            "inner_rest_hash": "i",
            "next_bps": [
                {
                    "account_id": "node0",
                    "public_key": "ed25519:abc",
                    "stake": "340282366920938463463374607431768211455",
                    "validator_stake_struct_version": "V1"
                }
            ],
            "approvals_after_next": [null, "ed25519:xyz"]
        }"#;
        let view: LightClientBlockView = serde_json::from_str(json).unwrap();
        assert_eq!(view.inner_lite.height, 42);
        assert_eq!(view.inner_lite.timestamp, 1591286036123456789);
        let bps = view.next_bps.as_ref().unwrap();
        assert_eq!(bps[0].stake, u128::MAX);
        assert_eq!(view.approvals_after_next, vec![None, Some("ed25519:xyz".to_owned())]);
    }

    #[test]
    fn missing_next_bps_is_none() {
        let json = r#"{
            "prev_block_hash": "a", "next_block_inner_hash": "b",
            "inner_lite": {"height": 1, "epoch_id": "c", "next_epoch_id": "d",
                "prev_state_root": "e", "outcome_root": "f", "timestamp": 2,
                "next_bp_hash": "g", "block_merkle_root": "h"},
            "inner_rest_hash": "i", "approvals_after_next": []
        }"#;
        let view: LightClientBlockView = serde_json::from_str(json).unwrap();
        assert!(view.next_bps.is_none());
    }

    #[test]
    fn stake_serializes_as_decimal_string() {
        let bp = ValidatorStakeView {
            account_id: "a".into(),
            public_key: "ed25519:1".into(),
            stake: 12,
        };
        let value = serde_json::to_value(&bp).unwrap();
        assert_eq!(value["stake"], "12");
        let back: ValidatorStakeView = serde_json::from_value(value).unwrap();
        assert_eq!(back, bp);
    }
}
