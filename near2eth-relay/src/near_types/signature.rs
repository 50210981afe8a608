use borsh::io::{Error, ErrorKind, Write};
use borsh::{BorshDeserialize, BorshSerialize};

use crate::error::EncodeError;

pub const ED25519_PUBLIC_KEY_LENGTH: usize = 32;
pub const ED25519_SIGNATURE_LENGTH: usize = 64;
pub const SECP256K1_PUBLIC_KEY_LENGTH: usize = 64;
pub const SECP256K1_SIGNATURE_LENGTH: usize = 65;

/// Curve tag written in front of every key and signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    ED25519 = 0,
    SECP256K1 = 1,
}

impl KeyType {
    /// Textual prefix used by NEAR RPC, without the trailing colon.
    pub fn prefix(&self) -> &'static str {
        match self {
            KeyType::ED25519 => "ed25519",
            KeyType::SECP256K1 => "secp256k1",
        }
    }

    pub fn public_key_len(&self) -> usize {
        match self {
            KeyType::ED25519 => ED25519_PUBLIC_KEY_LENGTH,
            KeyType::SECP256K1 => SECP256K1_PUBLIC_KEY_LENGTH,
        }
    }

    pub fn signature_len(&self) -> usize {
        match self {
            KeyType::ED25519 => ED25519_SIGNATURE_LENGTH,
            KeyType::SECP256K1 => SECP256K1_SIGNATURE_LENGTH,
        }
    }
}

impl TryFrom<u8> for KeyType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Error> {
        match value {
            0 => Ok(KeyType::ED25519),
            1 => Ok(KeyType::SECP256K1),
            _unknown_key_type => Err(Error::new(
                ErrorKind::InvalidData,
                format!("unknown key type: {}", value),
            )),
        }
    }
}

/// Split `"<curve>:<base58>"` and decode the payload, checking its length.
fn decode_tagged(
    field: &str,
    text: &str,
    expected_len: impl Fn(KeyType) -> usize,
) -> Result<(KeyType, Vec<u8>), EncodeError> {
    let (key_type, payload) = match text.split_once(':') {
        Some((prefix, payload)) if prefix == KeyType::ED25519.prefix() => {
            (KeyType::ED25519, payload)
        }
        Some((prefix, payload)) if prefix == KeyType::SECP256K1.prefix() => {
            (KeyType::SECP256K1, payload)
        }
        _ => {
            return Err(EncodeError::UnknownKeyType {
                field: field.to_owned(),
                value: text.to_owned(),
            })
        }
    };
    let bytes = bs58::decode(payload)
        .into_vec()
        .map_err(|err| EncodeError::InvalidBase58 {
            field: field.to_owned(),
            reason: err.to_string(),
        })?;
    let expected = expected_len(key_type);
    if bytes.len() != expected {
        return Err(EncodeError::InvalidLength {
            field: field.to_owned(),
            expected,
            actual: bytes.len(),
        });
    }
    Ok((key_type, bytes))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    pub key_type: KeyType,
    pub data: Vec<u8>,
}

impl PublicKey {
    pub fn parse(field: &str, text: &str) -> Result<Self, EncodeError> {
        let (key_type, data) = decode_tagged(field, text, |k| k.public_key_len())?;
        Ok(PublicKey { key_type, data })
    }
}

/// Signature container supporting different curves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub key_type: KeyType,
    pub data: Vec<u8>,
}

impl Signature {
    pub fn parse(field: &str, text: &str) -> Result<Self, EncodeError> {
        let (key_type, data) = decode_tagged(field, text, |k| k.signature_len())?;
        Ok(Signature { key_type, data })
    }
}

impl BorshSerialize for PublicKey {
    fn serialize<W: Write>(&self, writer: &mut W) -> Result<(), Error> {
        BorshSerialize::serialize(&(self.key_type as u8), writer)?;
        writer.write_all(&self.data)
    }
}

impl BorshDeserialize for PublicKey {
    fn deserialize_reader<R: borsh::io::Read>(reader: &mut R) -> Result<Self, Error> {
        let key_type = KeyType::try_from(u8::deserialize_reader(reader)?)?;
        let mut data = vec![0u8; key_type.public_key_len()];
        reader.read_exact(&mut data)?;
        Ok(PublicKey { key_type, data })
    }
}

impl BorshSerialize for Signature {
    fn serialize<W: Write>(&self, writer: &mut W) -> Result<(), Error> {
        BorshSerialize::serialize(&(self.key_type as u8), writer)?;
        writer.write_all(&self.data)
    }
}

impl BorshDeserialize for Signature {
    fn deserialize_reader<R: borsh::io::Read>(reader: &mut R) -> Result<Self, Error> {
        let key_type = KeyType::try_from(u8::deserialize_reader(reader)?)?;
        let mut data = vec![0u8; key_type.signature_len()];
        reader.read_exact(&mut data)?;
        Ok(Signature { key_type, data })
    }
}
