use serde::{Deserialize, Serialize};

use crate::{U256, crypto::Address, sha256::Hash};

/// Notifications emitted by state-changing calls, consumed by indexers and logs.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Transfer {
        from: Address,
        to: Address,
        value: U256,
    },
    Approval {
        owner: Address,
        spender: Address,
        value: U256,
    },
    Mint {
        to: Address,
        reward: U256,
        epoch_count: u64,
        new_challenge: Hash,
    },
    GasPriceSet {
        limit: u64,
    },
    Pause,
    Unpause,
    OwnershipTransferred {
        previous: Address,
        new: Address,
    },
}

/// Result of a successful call together with the events it emitted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receipt<T> {
    pub value: T,
    pub events: Vec<Event>,
}

impl<T> Receipt<T> {
    pub fn new(value: T, events: Vec<Event>) -> Self {
        Self { value, events }
    }

    pub fn event(value: T, event: Event) -> Self {
        Self::new(value, vec![event])
    }
}
