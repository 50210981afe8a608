//! Canonical encoding of light-client blocks for the verifier contract.
//!
//! The layout is borsh over the types in [`crate::near_types`]:
//!
//! | field                  | bytes                                        |
//! |------------------------|----------------------------------------------|
//! | prev_block_hash        | 32                                           |
//! | next_block_inner_hash  | 32                                           |
//! | inner_lite             | 8 + 4 * 32 + 8 + 2 * 32                      |
//! | inner_rest_hash        | 32                                           |
//! | next_bps               | `1`, u32 count, entries                      |
//! | approvals_after_next   | u32 count, `0` or `1` + tag + signature each |
//!
//! Each `next_bps` entry is a u32 length-prefixed account id, a curve tag,
//! the raw key and the stake as u128. All integers are little-endian.

use crate::error::EncodeError;
use crate::near_types::{
    hash::CryptoHash,
    signature::{PublicKey, Signature},
    BlockHeaderInnerLite, EpochId, LightClientBlock, ValidatorStake,
};
use crate::types::{BlockHeaderInnerLiteView, LightClientBlockView, ValidatorStakeView};

/// Length of an encoded block with no validators and no approvals.
pub const EMPTY_BLOCK_ENCODED_LEN: usize = 32 + 32 + 208 + 32 + 1 + 4 + 4;

/// Encode a light-client block record into the bytes the contract decodes.
pub fn encode(view: &LightClientBlockView) -> Result<Vec<u8>, EncodeError> {
    to_bytes(&LightClientBlock::try_from(view)?)
}

/// Serialize an already decoded block.
pub fn to_bytes(block: &LightClientBlock) -> Result<Vec<u8>, EncodeError> {
    borsh::to_vec(block).map_err(|err| EncodeError::Serialize(err.to_string()))
}

impl TryFrom<&BlockHeaderInnerLiteView> for BlockHeaderInnerLite {
    type Error = EncodeError;

    fn try_from(view: &BlockHeaderInnerLiteView) -> Result<Self, Self::Error> {
        let hash = |name: &str, value: &str| {
            CryptoHash::from_base58(&format!("inner_lite.{}", name), value)
        };
        Ok(BlockHeaderInnerLite {
            height: view.height,
            epoch_id: EpochId(hash("epoch_id", &view.epoch_id)?),
            next_epoch_id: EpochId(hash("next_epoch_id", &view.next_epoch_id)?),
            prev_state_root: hash("prev_state_root", &view.prev_state_root)?,
            outcome_root: hash("outcome_root", &view.outcome_root)?,
            timestamp: view.timestamp,
            next_bp_hash: hash("next_bp_hash", &view.next_bp_hash)?,
            block_merkle_root: hash("block_merkle_root", &view.block_merkle_root)?,
        })
    }
}

fn validator_stake(index: usize, view: &ValidatorStakeView) -> Result<ValidatorStake, EncodeError> {
    Ok(ValidatorStake {
        account_id: view.account_id.clone(),
        public_key: PublicKey::parse(&format!("next_bps[{}].public_key", index), &view.public_key)?,
        stake: view.stake,
    })
}

impl TryFrom<&LightClientBlockView> for LightClientBlock {
    type Error = EncodeError;

    fn try_from(view: &LightClientBlockView) -> Result<Self, Self::Error> {
        // The contract always expects the validator set to be present.
        let next_bps = view
            .next_bps
            .as_deref()
            .unwrap_or_default()
            .iter()
            .enumerate()
            .map(|(index, bp)| validator_stake(index, bp))
            .collect::<Result<Vec<_>, _>>()?;
        let approvals_after_next = view
            .approvals_after_next
            .iter()
            .enumerate()
            .map(|(index, approval)| {
                approval
                    .as_deref()
                    .map(|text| {
                        Signature::parse(&format!("approvals_after_next[{}]", index), text)
                    })
                    .transpose()
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(LightClientBlock {
            prev_block_hash: CryptoHash::from_base58("prev_block_hash", &view.prev_block_hash)?,
            next_block_inner_hash: CryptoHash::from_base58(
                "next_block_inner_hash",
                &view.next_block_inner_hash,
            )?,
            inner_lite: BlockHeaderInnerLite::try_from(&view.inner_lite)?,
            inner_rest_hash: CryptoHash::from_base58("inner_rest_hash", &view.inner_rest_hash)?,
            next_bps: Some(next_bps),
            approvals_after_next,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    fn b58(bytes: &[u8]) -> String {
        bs58::encode(bytes).into_string()
    }

    pub(crate) fn empty_block_view(height: u64) -> LightClientBlockView {
        LightClientBlockView {
            prev_block_hash: b58(&[1; 32]),
            next_block_inner_hash: b58(&[2; 32]),
            inner_lite: BlockHeaderInnerLiteView {
                height,
                epoch_id: b58(&[3; 32]),
                next_epoch_id: b58(&[4; 32]),
                prev_state_root: b58(&[5; 32]),
                outcome_root: b58(&[6; 32]),
                timestamp: 0x0102_0304_0506_0708,
                next_bp_hash: b58(&[7; 32]),
                block_merkle_root: b58(&[8; 32]),
            },
            inner_rest_hash: b58(&[9; 32]),
            next_bps: Some(vec![]),
            approvals_after_next: vec![],
        }
    }

    fn read_u32(bytes: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
    }

    #[test]
    fn empty_block_layout() {
        let bytes = encode(&empty_block_view(1234)).unwrap();
        assert_eq!(bytes.len(), EMPTY_BLOCK_ENCODED_LEN);
        assert_eq!(bytes.len(), 313);

        assert_eq!(&bytes[0..32], &[1; 32]);
        assert_eq!(&bytes[32..64], &[2; 32]);
        assert_eq!(&bytes[64..72], &1234u64.to_le_bytes());
        assert_eq!(&bytes[72..104], &[3; 32]);
        assert_eq!(&bytes[104..136], &[4; 32]);
        assert_eq!(&bytes[136..168], &[5; 32]);
        assert_eq!(&bytes[168..200], &[6; 32]);
        assert_eq!(&bytes[200..208], &0x0102_0304_0506_0708u64.to_le_bytes());
        assert_eq!(&bytes[208..240], &[7; 32]);
        assert_eq!(&bytes[240..272], &[8; 32]);
        assert_eq!(&bytes[272..304], &[9; 32]);
        assert_eq!(bytes[304], 1);
        assert_eq!(read_u32(&bytes, 305), 0);
        assert_eq!(read_u32(&bytes, 309), 0);
    }

    #[test]
    fn absent_next_bps_still_writes_presence_and_count() {
        let mut view = empty_block_view(5);
        view.next_bps = None;
        assert_eq!(encode(&view).unwrap(), encode(&empty_block_view(5)).unwrap());
    }

    #[test]
    fn encoding_is_deterministic() {
        let mut view = empty_block_view(9);
        view.approvals_after_next = vec![None, Some(format!("ed25519:{}", b58(&[0xab; 64])))];
        assert_eq!(encode(&view).unwrap(), encode(&view.clone()).unwrap());
    }

    #[test]
    fn validators_and_approvals_layout() {
        let mut view = empty_block_view(10);
        view.next_bps = Some(vec![
            ValidatorStakeView {
                account_id: "alice.near".to_owned(),
                public_key: format!("ed25519:{}", b58(&[0x11; 32])),
                stake: 1_000_000_000_000_000_000_000_000,
            },
            ValidatorStakeView {
                account_id: "bob".to_owned(),
                public_key: format!("secp256k1:{}", b58(&[0x22; 64])),
                stake: 7,
            },
        ]);
        view.approvals_after_next = vec![
            Some(format!("ed25519:{}", b58(&[0x33; 64]))),
            None,
            Some(format!("secp256k1:{}", b58(&[0x44; 65]))),
        ];
        let bytes = encode(&view).unwrap();

        let alice = 4 + 10 + 1 + 32 + 16;
        let bob = 4 + 3 + 1 + 64 + 16;
        let approvals = (1 + 1 + 64) + 1 + (1 + 1 + 65);
        assert_eq!(bytes.len(), EMPTY_BLOCK_ENCODED_LEN + alice + bob + approvals);

        let mut at = 304;
        assert_eq!(bytes[at], 1);
        at += 1;
        assert_eq!(read_u32(&bytes, at), 2);
        at += 4;

        assert_eq!(read_u32(&bytes, at), 10);
        at += 4;
        assert_eq!(&bytes[at..at + 10], b"alice.near");
        at += 10;
        assert_eq!(bytes[at], 0);
        at += 1;
        assert_eq!(&bytes[at..at + 32], &[0x11; 32]);
        at += 32;
        assert_eq!(
            &bytes[at..at + 16],
            &1_000_000_000_000_000_000_000_000u128.to_le_bytes()
        );
        at += 16;

        assert_eq!(read_u32(&bytes, at), 3);
        at += 4 + 3;
        assert_eq!(bytes[at], 1);
        at += 1 + 64;
        assert_eq!(&bytes[at..at + 16], &7u128.to_le_bytes());
        at += 16;

        assert_eq!(read_u32(&bytes, at), 3);
        at += 4;
        assert_eq!(&bytes[at..at + 2], &[1, 0]);
        at += 2;
        assert_eq!(&bytes[at..at + 64], &[0x33; 64]);
        at += 64;
        assert_eq!(bytes[at], 0);
        at += 1;
        assert_eq!(&bytes[at..at + 2], &[1, 1]);
        at += 2;
        assert_eq!(&bytes[at..at + 65], &[0x44; 65]);
        at += 65;
        assert_eq!(at, bytes.len());
    }

    #[test]
    fn encoded_bytes_decode_back_to_binary_block() {
        use borsh::BorshDeserialize;

        let mut view = empty_block_view(3);
        view.next_bps = Some(vec![ValidatorStakeView {
            account_id: "node0".to_owned(),
            public_key: format!("ed25519:{}", b58(&[0x55; 32])),
            stake: 99,
        }]);
        view.approvals_after_next = vec![None];
        let bytes = encode(&view).unwrap();
        let block = LightClientBlock::try_from_slice(&bytes).unwrap();
        assert_eq!(block, LightClientBlock::try_from(&view).unwrap());
        assert_eq!(block.inner_lite.height, 3);
        assert_eq!(block.prev_block_hash.to_string(), view.prev_block_hash);
    }

    #[test]
    fn malformed_fields_are_reported() {
        let mut view = empty_block_view(1);
        view.inner_lite.outcome_root = b58(&[1; 20]);
        assert!(matches!(
            encode(&view),
            Err(EncodeError::InvalidLength { ref field, .. }) if field == "inner_lite.outcome_root"
        ));

        let mut view = empty_block_view(1);
        view.next_bps = Some(vec![ValidatorStakeView {
            account_id: "x".to_owned(),
            public_key: format!("rsa:{}", b58(&[0; 32])),
            stake: 1,
        }]);
        assert!(matches!(
            encode(&view),
            Err(EncodeError::UnknownKeyType { ref field, .. }) if field == "next_bps[0].public_key"
        ));

        let mut view = empty_block_view(1);
        view.approvals_after_next = vec![None, Some("ed25519:0OIl".to_owned())];
        assert!(matches!(
            encode(&view),
            Err(EncodeError::InvalidBase58 { ref field, .. }) if field == "approvals_after_next[1]"
        ));
    }
}
