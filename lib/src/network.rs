use serde::{Deserialize, Serialize};
use std::io::{Error as IoError, Read, Write};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use uuid::Uuid;

use crate::{
    U256,
    crypto::{Address, PrivateKey, PublicKey, Signature},
    error::{Result, TokenError},
    sha256::Hash,
    types::{CallContext, Event, MineableToken, MiningInfo},
};

// frames larger than this are refused before allocating
const MAX_MESSAGE_SIZE: u64 = 1 << 20;
/// Host blocks a signed call may stay valid past the head it was signed at.
pub const CALL_LIFETIME: u64 = 64;

/// A state-changing token operation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub enum Call {
    Mint { nonce: u64, digest: Hash },
    SetGasPriceLimit(Option<u64>),
    Transfer { to: Address, value: U256 },
    Approve { spender: Address, value: U256 },
    TransferFrom { from: Address, to: Address, value: U256 },
    Pause,
    Unpause,
    TransferOwnership(Address),
    Deposit,
}

impl Call {
    /// Applies the call to `token` in the context of `ctx`.
    pub fn apply(&self, token: &mut MineableToken, ctx: &CallContext) -> Result<Vec<Event>> {
        let events = match *self {
            Call::Mint { nonce, digest } => token.mint(ctx, nonce, digest)?.events,
            Call::SetGasPriceLimit(limit) => token.set_gas_price_limit(ctx, limit)?.events,
            Call::Transfer { to, value } => token.transfer(ctx, to, value)?.events,
            Call::Approve { spender, value } => token.approve(ctx, spender, value)?.events,
            Call::TransferFrom { from, to, value } => {
                token.transfer_from(ctx, from, to, value)?.events
            }
            Call::Pause => token.pause(ctx)?.events,
            Call::Unpause => token.unpause(ctx)?.events,
            Call::TransferOwnership(new_owner) => token.transfer_ownership(ctx, new_owner)?.events,
            Call::Deposit => token.receive(ctx)?.events,
        };
        Ok(events)
    }
}

/// A call authenticated by the sender's key. The sender's address is derived
/// from `public_key`; `id` makes every signed call unique and `valid_until` is
/// the last host block height it may be applied at.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SignedCall {
    pub id: Uuid,
    pub public_key: PublicKey,
    pub gas_price: u64,
    pub value: U256,
    pub valid_until: u64,
    pub call: Call,
    pub signature: Signature,
}

impl SignedCall {
    pub fn new(
        call: Call,
        gas_price: u64,
        valid_until: u64,
        private_key: &mut PrivateKey,
    ) -> Result<Self> {
        Self::with_value(call, gas_price, U256::zero(), valid_until, private_key)
    }

    pub fn with_value(
        call: Call,
        gas_price: u64,
        value: U256,
        valid_until: u64,
        private_key: &mut PrivateKey,
    ) -> Result<Self> {
        let id = Uuid::new_v4();
        let message = Self::message_hash(&id, gas_price, &value, valid_until, &call)?;
        Ok(Self {
            id,
            public_key: private_key.public_key(),
            gas_price,
            value,
            valid_until,
            call,
            signature: Signature::sign(&message, private_key),
        })
    }

    fn message_hash(
        id: &Uuid,
        gas_price: u64,
        value: &U256,
        valid_until: u64,
        call: &Call,
    ) -> Result<Hash> {
        Hash::hash(&(id, gas_price, value, valid_until, call))
    }

    /// Checks the signature and returns the sender's address.
    pub fn verify(&self) -> Result<Address> {
        let message = Self::message_hash(
            &self.id,
            self.gas_price,
            &self.value,
            self.valid_until,
            &self.call,
        )?;
        if !self.signature.verify(&message, &self.public_key) {
            return Err(TokenError::InvalidSignature);
        }
        self.public_key.address()
    }

    /// Refuses calls that expired before `height` or that reach further than
    /// [`CALL_LIFETIME`] blocks past it.
    pub fn check_window(&self, height: u64) -> Result<()> {
        if self.valid_until < height {
            return Err(TokenError::CallExpired {
                valid_until: self.valid_until,
                height,
            });
        }
        if self.valid_until - height > CALL_LIFETIME {
            return Err(TokenError::CallTooFarAhead {
                valid_until: self.valid_until,
                height,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub enum Message {
    // Request: current challenge, target, reward and gas limit
    FetchMiningInfo,
    // Response: mining parameters and the current host block height
    MiningInfo { info: MiningInfo, height: u64 },

    // Request: balance of an address
    FetchBalance(Address),
    // Response: balance in base units
    Balance(U256),

    // Request: apply a signed call to the token
    SubmitCall(SignedCall),
    // Response: emitted events or the reason the call was refused
    CallResult(std::result::Result<Vec<Event>, TokenError>),
}

impl Message {
    pub fn encode(&self) -> std::result::Result<Vec<u8>, ciborium::ser::Error<IoError>> {
        let mut bytes = Vec::new();
        ciborium::into_writer(self, &mut bytes)?;

        Ok(bytes)
    }

    pub fn decode(data: &[u8]) -> std::result::Result<Self, ciborium::de::Error<IoError>> {
        ciborium::from_reader(data)
    }

    pub fn send(
        &self,
        stream: &mut impl Write,
    ) -> std::result::Result<(), ciborium::ser::Error<IoError>> {
        let bytes = self.encode()?;
        let length = bytes.len() as u64;

        stream.write_all(&length.to_be_bytes())?;
        stream.write_all(&bytes)?;

        Ok(())
    }

    pub fn receive(
        stream: &mut impl Read,
    ) -> std::result::Result<Self, ciborium::de::Error<IoError>> {
        let mut length_bytes = [0u8; 8];
        stream.read_exact(&mut length_bytes)?;
        let length = frame_length(length_bytes)?;

        let mut data = vec![0u8; length];
        stream.read_exact(&mut data)?;

        Self::decode(&data)
    }

    pub async fn send_async(
        &self,
        stream: &mut (impl AsyncWrite + Unpin),
    ) -> std::result::Result<(), ciborium::ser::Error<IoError>> {
        let bytes = self.encode()?;
        let length = bytes.len() as u64;

        stream.write_all(&length.to_be_bytes()).await?;
        stream.write_all(&bytes).await?;

        Ok(())
    }

    pub async fn receive_async(
        stream: &mut (impl AsyncRead + Unpin),
    ) -> std::result::Result<Self, ciborium::de::Error<IoError>> {
        let mut length_bytes = [0u8; 8];
        stream.read_exact(&mut length_bytes).await?;
        let length = frame_length(length_bytes)?;

        let mut data = vec![0u8; length];
        stream.read_exact(&mut data).await?;

        Self::decode(&data)
    }
}

fn frame_length(length_bytes: [u8; 8]) -> std::result::Result<usize, IoError> {
    let length = u64::from_be_bytes(length_bytes);
    if length > MAX_MESSAGE_SIZE {
        return Err(IoError::new(
            std::io::ErrorKind::InvalidData,
            format!("message of {length} bytes exceeds limit"),
        ));
    }
    Ok(length as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_call_yields_sender_address() {
        let mut key = PrivateKey::new_key();
        let call = SignedCall::new(Call::Pause, 3, 10, &mut key).unwrap();
        assert_eq!(call.verify().unwrap(), key.public_key().address().unwrap());
    }

    #[test]
    fn tampered_call_fails_verification() {
        let mut key = PrivateKey::new_key();
        let mut call = SignedCall::new(Call::SetGasPriceLimit(Some(5)), 3, 10, &mut key).unwrap();
        call.call = Call::SetGasPriceLimit(Some(500));
        assert_eq!(call.verify(), Err(TokenError::InvalidSignature));

        let mut call = SignedCall::new(Call::Pause, 3, 10, &mut key).unwrap();
        call.gas_price = 1;
        assert_eq!(call.verify(), Err(TokenError::InvalidSignature));

        let mut call = SignedCall::new(Call::Pause, 3, 10, &mut key).unwrap();
        call.valid_until = 1_000;
        assert_eq!(call.verify(), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn call_is_valid_only_inside_its_window() {
        let mut key = PrivateKey::new_key();
        let call = SignedCall::new(Call::Pause, 3, 100, &mut key).unwrap();

        assert_eq!(call.check_window(40), Ok(()));
        assert_eq!(call.check_window(100 - CALL_LIFETIME), Ok(()));
        assert_eq!(call.check_window(100), Ok(()));
        assert_eq!(
            call.check_window(101),
            Err(TokenError::CallExpired {
                valid_until: 100,
                height: 101
            })
        );
        assert_eq!(
            call.check_window(100 - CALL_LIFETIME - 1),
            Err(TokenError::CallTooFarAhead {
                valid_until: 100,
                height: 100 - CALL_LIFETIME - 1
            })
        );
    }

    #[test]
    fn frames_survive_a_stream() {
        let message = Message::CallResult(Err(TokenError::GasPriceExceeded {
            gas_price: 6,
            limit: 5,
        }));
        let mut buffer = Vec::new();
        message.send(&mut buffer).unwrap();

        let received = Message::receive(&mut buffer.as_slice()).unwrap();
        assert!(matches!(
            received,
            Message::CallResult(Err(TokenError::GasPriceExceeded { gas_price: 6, limit: 5 }))
        ));
    }

    #[test]
    fn oversized_frame_is_refused() {
        let mut bytes = (MAX_MESSAGE_SIZE + 1).to_be_bytes().to_vec();
        bytes.extend_from_slice(&[0u8; 16]);
        assert!(Message::receive(&mut bytes.as_slice()).is_err());
    }

    #[tokio::test]
    async fn async_frames_survive_a_duplex() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        Message::FetchBalance(Address::new([7; 20]))
            .send_async(&mut client)
            .await
            .unwrap();

        match Message::receive_async(&mut server).await.unwrap() {
            Message::FetchBalance(address) => assert_eq!(address, Address::new([7; 20])),
            m => panic!("unexpected message: {m:?}"),
        }
    }
}
