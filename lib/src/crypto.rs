use std::{
    fmt,
    io::{Error as IoError, ErrorKind as IoErrorKind, Read, Result as IoResult, Write},
    str::FromStr,
};

use crate::{
    error::{Result, TokenError},
    sha256::Hash,
    util::{Saveable, load_cbor, save_cbor},
};
use ecdsa::{
    Signature as ECDSASignature, SigningKey, VerifyingKey,
    signature::{SignerMut, Verifier, rand_core::OsRng},
};
use k256::Secp256k1;
use serde::{Deserialize, Serialize};
use spki::{EncodePublicKey, der::pem::LineEnding};

/// Account identity on the token ledger.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; 20]);
impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Last 20 bytes of the SHA-256 of the compressed SEC1 public key.
    pub fn from_public_key(public_key: &PublicKey) -> Result<Self> {
        let point = public_key.0.to_encoded_point(true);
        let digest = Hash::digest_bytes(point.as_bytes())?.as_bytes();

        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest[12..]);
        Ok(Self(bytes))
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|_| TokenError::InvalidAddress)?;
        let bytes: [u8; 20] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| TokenError::InvalidAddress)?;
        Ok(Self(bytes))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Signature(pub ECDSASignature<Secp256k1>);
impl Signature {
    pub fn sign(message_hash: &Hash, private_key: &mut PrivateKey) -> Self {
        let signature = private_key.0.sign(&message_hash.as_bytes());
        Signature(signature)
    }

    pub fn verify(&self, message_hash: &Hash, public_key: &PublicKey) -> bool {
        public_key
            .0
            .verify(&message_hash.as_bytes(), &self.0)
            .is_ok()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PublicKey(pub VerifyingKey<Secp256k1>);
impl PublicKey {
    pub fn address(&self) -> Result<Address> {
        Address::from_public_key(self)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PrivateKey(#[serde(with = "signkey_serde")] pub SigningKey<Secp256k1>);
impl PrivateKey {
    pub fn new_key() -> Self {
        Self(SigningKey::random(&mut OsRng))
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(*self.0.verifying_key())
    }
}

impl Saveable for PublicKey {
    fn load<I: Read>(mut reader: I) -> IoResult<Self> {
        let mut buf = String::new();
        reader.read_to_string(&mut buf)?;
        let public_key = buf
            .parse()
            .map_err(|_| IoError::new(IoErrorKind::InvalidData, "Failed to parse PublicKey"))?;
        Ok(PublicKey(public_key))
    }

    fn save<O: Write>(&self, mut writer: O) -> IoResult<()> {
        let pem = self
            .0
            .to_public_key_pem(LineEnding::default())
            .map_err(|_| IoError::new(IoErrorKind::InvalidData, "Failed to encode PublicKey"))?;
        writer.write_all(pem.as_bytes())
    }
}

impl Saveable for PrivateKey {
    fn load<I: Read>(reader: I) -> IoResult<Self> {
        load_cbor(reader, "PrivateKey")
    }

    fn save<O: Write>(&self, writer: O) -> IoResult<()> {
        save_cbor(self, writer, "PrivateKey")
    }
}

mod signkey_serde {
    use serde::{Deserialize, de::Error};

    pub fn serialize<S>(
        key: &super::SigningKey<super::Secp256k1>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_bytes(&key.to_bytes())
    }

    pub fn deserialize<'de, D>(
        deserializer: D,
    ) -> Result<super::SigningKey<super::Secp256k1>, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let bytes = Vec::<u8>::deserialize(deserializer)?;
        super::SigningKey::from_slice(&bytes).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_binds_to_key_and_message() {
        let mut key = PrivateKey::new_key();
        let other = PrivateKey::new_key();
        let message = Hash::hash(&"mint").unwrap();

        let signature = Signature::sign(&message, &mut key);
        assert!(signature.verify(&message, &key.public_key()));
        assert!(!signature.verify(&message, &other.public_key()));
        assert!(!signature.verify(&Hash::hash(&"burn").unwrap(), &key.public_key()));
    }

    #[test]
    fn address_is_stable_per_key() {
        let key = PrivateKey::new_key();
        let a = key.public_key().address().unwrap();
        let b = key.public_key().address().unwrap();
        assert_eq!(a, b);
        assert!(!a.is_zero());
        assert_ne!(a, PrivateKey::new_key().public_key().address().unwrap());
    }

    #[test]
    fn address_parses_its_display_form() {
        let address = Address::new([0xab; 20]);
        let parsed: Address = address.to_string().parse().unwrap();
        assert_eq!(parsed, address);
        assert!("0x1234".parse::<Address>().is_err());
    }
}
