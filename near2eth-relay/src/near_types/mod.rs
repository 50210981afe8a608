//! Binary light-client block types, laid out exactly as the verifier
//! contract decodes them.

pub mod hash;
pub mod signature;

use self::{
    hash::{combine_hash, sha256, CryptoHash},
    signature::{PublicKey, Signature},
};
use borsh::{BorshDeserialize, BorshSerialize};

pub type BlockHeight = u64;
pub type AccountId = String;
pub type Balance = u128;
pub type MerkleHash = CryptoHash;

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, Eq, PartialEq)]
pub struct EpochId(pub CryptoHash);

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Eq, PartialEq)]
pub struct BlockHeaderInnerLite {
    /// Height of this block.
    pub height: BlockHeight,
    /// Epoch start hash of this block's epoch.
    /// Used for retrieving validator information
    pub epoch_id: EpochId,
    pub next_epoch_id: EpochId,
    /// Root hash of the state at the previous block.
    pub prev_state_root: MerkleHash,
    /// Root of the outcomes of transactions and receipts.
    pub outcome_root: MerkleHash,
    /// Timestamp at which the block was built (number of non-leap-nanoseconds since January 1, 1970 0:00:00 UTC).
    pub timestamp: u64,
    /// Hash of the next epoch block producers set
    pub next_bp_hash: CryptoHash,
    /// Merkle root of block hashes up to the current block.
    pub block_merkle_root: CryptoHash,
}

/// One entry of `next_bps`. Unlike NEAR's own view there is no
/// struct-version tag: the contract reads the three fields directly.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct ValidatorStake {
    pub account_id: AccountId,
    pub public_key: PublicKey,
    pub stake: Balance,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct LightClientBlock {
    pub prev_block_hash: CryptoHash,
    pub next_block_inner_hash: CryptoHash,
    pub inner_lite: BlockHeaderInnerLite,
    pub inner_rest_hash: CryptoHash,
    pub next_bps: Option<Vec<ValidatorStake>>,
    pub approvals_after_next: Vec<Option<Signature>>,
}

impl LightClientBlock {
    /// Hash of the block this light-client block describes.
    ///
    /// `sha256(sha256(borsh(inner_lite)) || inner_rest_hash) || prev_block_hash`,
    /// hashed once more.
    pub fn current_block_hash(&self) -> CryptoHash {
        let inner_lite_bytes =
            borsh::to_vec(&self.inner_lite).expect("borsh serialization into a Vec never fails");
        combine_hash(
            &combine_hash(
                &CryptoHash(sha256(&inner_lite_bytes)),
                &self.inner_rest_hash,
            ),
            &self.prev_block_hash,
        )
    }

    /// Hash of the block following the described one.
    pub fn next_block_hash(&self) -> CryptoHash {
        combine_hash(&self.next_block_inner_hash, &self.current_block_hash())
    }
}
