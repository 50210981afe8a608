//! Some util functions related to the relayer.
//!

use abscissa_core::status_info;
use near2eth_relay::near_types::hash::CryptoHash;
use near2eth_relay::types::{ClientHead, LightClientBlockView, StakeState};
use near2eth_relay::RelayError;
use serde::Serialize;

/// Produce the relay's `LightClientBlockView` from its NEAR version.
///
/// Both share the RPC json layout, so the conversion goes through json.
pub fn produce_light_client_block_view<T: Serialize>(
    view: &T,
) -> Result<LightClientBlockView, RelayError> {
    serde_json::to_value(view)
        .and_then(serde_json::from_value)
        .map_err(|err| {
            RelayError::InvalidResponse(format!("malformed light client block: {}", err))
        })
}

/// Print general info of `LightClientBlockView` with macro `status_info`.
pub fn print_light_client_block_view(view: &LightClientBlockView) {
    status_info!(
        "Info",
        "LightClientBlockView: {{ prev_block_hash: {}, height: {}, epoch_id: {}, next_epoch_id: {}, next_bps_count: {}, approvals_count: {}, signed_approvals: {} }}",
        view.prev_block_hash,
        view.inner_lite.height,
        view.inner_lite.epoch_id,
        view.inner_lite.next_epoch_id,
        view.next_bps.as_ref().map_or(0, |bps| bps.len()),
        view.approvals_after_next.len(),
        view.approvals_after_next.iter().filter(|a| a.is_some()).count(),
    );
}

/// Print the head stored in the verifier contract with macro `status_info`.
pub fn print_client_head(head: &ClientHead, hash: &CryptoHash, chain_time: u64) {
    let remaining = head.valid_after.saturating_sub(chain_time);
    status_info!(
        "Info",
        "ClientHead: {{ height: {}, hash: {}, valid_after: {}, chain_time: {}, valid_in_secs: {} }}",
        head.height,
        hash,
        head.valid_after,
        chain_time,
        remaining,
    );
}

/// Print the stake of the relay account with macro `status_info`.
pub fn print_stake_state(stake: &StakeState) {
    status_info!(
        "Info",
        "Stake: {{ balance: {} wei, required: {} wei }}",
        stake.balance,
        stake.required,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn b58(bytes: &[u8]) -> String {
        bs58::encode(bytes).into_string()
    }

    #[test]
    fn converts_rpc_json_layout() {
        let rpc = json!({
            "prev_block_hash": b58(&[1; 32]),
            "next_block_inner_hash": b58(&[2; 32]),
            "inner_lite": {
                "height": 86_000_123u64,
                "epoch_id": b58(&[3; 32]),
                "next_epoch_id": b58(&[4; 32]),
                "prev_state_root": b58(&[5; 32]),
                "outcome_root": b58(&[6; 32]),
                "timestamp": 1_650_000_000_000_000_000u64,
                "timestamp_nanosec": "1650000000000000000",
                "next_bp_hash": b58(&[7; 32]),
                "block_merkle_root": b58(&[8; 32])
            },
            "inner_rest_hash": b58(&[9; 32]),
            "next_bps": [{
                "validator_stake_struct_version": "V1",
                "account_id": "validator.pool.near",
                "public_key": format!("ed25519:{}", b58(&[10; 32])),
                "stake": "29999999999999999999999999"
            }],
            "approvals_after_next": [format!("ed25519:{}", b58(&[11; 64])), null]
        });
        let view = produce_light_client_block_view(&rpc).unwrap();
        assert_eq!(view.inner_lite.height, 86_000_123);
        assert_eq!(
            view.next_bps.as_ref().unwrap()[0].stake,
            29_999_999_999_999_999_999_999_999
        );
        assert_eq!(view.approvals_after_next[1], None);
        let bytes = near2eth_relay::encode(&view).unwrap();
        assert_eq!(bytes[304], 1);
    }

    #[test]
    fn missing_fields_are_invalid_responses() {
        let err = produce_light_client_block_view(&json!({ "prev_block_hash": "x" })).unwrap_err();
        assert!(matches!(err, RelayError::InvalidResponse(_)));
    }
}
