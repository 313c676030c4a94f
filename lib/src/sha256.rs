use std::fmt;

use serde::{Deserialize, Serialize};
use sha256::digest;

use crate::{
    U256,
    error::{Result, TokenError},
};

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash)]
pub struct Hash(U256);
impl Hash {
    /// SHA-256 of the CBOR encoding of `data`.
    pub fn hash<T: serde::Serialize>(data: &T) -> Result<Self> {
        let mut serialized: Vec<u8> = vec![];

        ciborium::into_writer(data, &mut serialized)
            .map_err(|e| TokenError::Serialization(e.to_string()))?;

        Self::digest_bytes(&serialized)
    }

    pub fn digest_bytes(bytes: &[u8]) -> Result<Self> {
        let hash = digest(bytes);
        let Ok(hash_bytes) = hex::decode(hash) else {
            return Err(TokenError::InvalidHash);
        };

        let hash_array: [u8; 32] = hash_bytes
            .as_slice()
            .try_into()
            .map_err(|_| TokenError::InvalidHash)?;

        Ok(Hash(U256::from_little_endian(&hash_array)))
    }

    pub fn matches_target(&self, target: U256) -> bool {
        self.0 <= target
    }

    pub fn as_bytes(&self) -> [u8; 32] {
        self.0.to_little_endian()
    }
}

impl From<U256> for Hash {
    fn from(value: U256) -> Self {
        Hash(value)
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self.0)
    }
}
