use borsh::{BorshDeserialize, BorshSerialize};
use core::fmt;
use core::str::FromStr;

use crate::error::EncodeError;

/// Raw 32-byte hash as stored by NEAR and by the verifier contract.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash, BorshDeserialize, BorshSerialize)]
pub struct CryptoHash(pub [u8; 32]);

impl CryptoHash {
    pub const LENGTH: usize = 32;

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Decode a base58 string, naming `field` in the error on failure.
    pub fn from_base58(field: &str, encoded: &str) -> Result<Self, EncodeError> {
        let bytes = bs58::decode(encoded)
            .into_vec()
            .map_err(|err| EncodeError::InvalidBase58 {
                field: field.to_owned(),
                reason: err.to_string(),
            })?;
        CryptoHash::try_from(bytes.as_slice()).map_err(|_| EncodeError::InvalidLength {
            field: field.to_owned(),
            expected: Self::LENGTH,
            actual: bytes.len(),
        })
    }
}

impl TryFrom<&[u8]> for CryptoHash {
    type Error = core::array::TryFromSliceError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        Ok(CryptoHash(<[u8; 32]>::try_from(bytes)?))
    }
}

impl FromStr for CryptoHash {
    type Err = EncodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CryptoHash::from_base58("hash", s)
    }
}

impl AsRef<[u8]> for CryptoHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for CryptoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for CryptoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut result = [0u8; 32];
    hex::decode_to_slice(sha256::digest(data), &mut result)
        .expect("sha256 digest is always 64 hex characters");
    result
}

pub fn combine_hash(hash1: &CryptoHash, hash2: &CryptoHash) -> CryptoHash {
    CryptoHash(sha256(&[hash1.0.as_ref(), hash2.0.as_ref()].concat()))
}
