use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenError {
    #[error("caller lacks the required capability")]
    Unauthorized,
    #[error("token is paused")]
    Paused,
    #[error("token is not paused")]
    NotPaused,
    #[error("invalid address")]
    InvalidAddress,
    #[error("invalid gas price")]
    InvalidGasPrice,
    #[error("gas price {gas_price} exceeds limit {limit}")]
    GasPriceExceeded { gas_price: u64, limit: u64 },
    #[error("invalid proof of work")]
    InvalidProofOfWork,
    #[error("mining target must be non-zero and within its bounds")]
    InvalidTarget,
    #[error("decimals {0} exceeds the maximum of 77")]
    InvalidDecimals(u8),
    #[error("insufficient balance")]
    InsufficientBalance,
    #[error("insufficient allowance")]
    InsufficientAllowance,
    #[error("token does not accept value transfers")]
    ValueNotAccepted,
    #[error("arithmetic overflow")]
    Overflow,
    #[error("invalid hash")]
    InvalidHash,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("call was already submitted")]
    DuplicateCall,
    #[error("call expired at height {valid_until}, head is {height}")]
    CallExpired { valid_until: u64, height: u64 },
    #[error("call valid until {valid_until} reaches too far past head {height}")]
    CallTooFarAhead { valid_until: u64, height: u64 },
    #[error("serialization failed: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, TokenError>;
