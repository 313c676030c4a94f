use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::{Read, Result as IoResult, Write};

use crate::{
    U256,
    crypto::Address,
    error::Result,
    sha256::Hash,
    util::{Saveable, load_cbor, save_cbor},
};

/// The host-ledger block a call executes in.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockContext {
    pub height: u64,
    pub hash: Hash,
    pub timestamp: DateTime<Utc>,
}

/// Ambient values of a single call.
#[derive(Clone, Copy, Debug)]
pub struct CallContext {
    pub sender: Address,
    pub gas_price: u64,
    /// Native value attached to the call.
    pub value: U256,
    pub block: BlockContext,
}

impl CallContext {
    pub fn new(sender: Address, gas_price: u64, block: BlockContext) -> Self {
        Self {
            sender,
            gas_price,
            value: U256::zero(),
            block,
        }
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }
}

/// Simulated block clock of the host ledger.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Chain {
    head: BlockContext,
}

impl Chain {
    pub fn genesis() -> Result<Self> {
        let timestamp = Utc::now();
        Ok(Self {
            head: BlockContext {
                height: 1,
                hash: Hash::hash(&(1u64, timestamp))?,
                timestamp,
            },
        })
    }

    pub fn head(&self) -> BlockContext {
        self.head
    }

    pub fn height(&self) -> u64 {
        self.head.height
    }

    pub fn advance(&mut self) -> Result<BlockContext> {
        let height = self.head.height + 1;
        let timestamp = Utc::now().max(self.head.timestamp);
        let hash = Hash::hash(&(self.head.hash, height, timestamp))?;

        self.head = BlockContext {
            height,
            hash,
            timestamp,
        };
        Ok(self.head)
    }

    pub fn advance_by(&mut self, blocks: u64) -> Result<BlockContext> {
        for _ in 0..blocks {
            self.advance()?;
        }
        Ok(self.head)
    }
}

impl Saveable for Chain {
    fn load<I: Read>(reader: I) -> IoResult<Self> {
        load_cbor(reader, "chain")
    }
    fn save<O: Write>(&self, writer: O) -> IoResult<()> {
        save_cbor(self, writer, "chain")
    }
}
