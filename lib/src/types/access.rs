use serde::{Deserialize, Serialize};

use crate::{
    crypto::Address,
    error::{Result, TokenError},
    types::event::{Event, Receipt},
};

/// Owner and pause capability consulted by the mining engine and ledger.
pub trait AccessGate {
    fn is_paused(&self) -> bool;
    fn owner(&self) -> Address;

    fn require_owner(&self, caller: Address) -> Result<()> {
        if caller != self.owner() {
            return Err(TokenError::Unauthorized);
        }
        Ok(())
    }

    fn require_not_paused(&self) -> Result<()> {
        if self.is_paused() {
            return Err(TokenError::Paused);
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Ownership {
    owner: Address,
    paused: bool,
}

impl Ownership {
    pub fn new(owner: Address) -> Self {
        Self {
            owner,
            paused: false,
        }
    }

    pub fn transfer_ownership(
        &mut self,
        caller: Address,
        new_owner: Address,
    ) -> Result<Receipt<()>> {
        self.require_owner(caller)?;
        if new_owner.is_zero() {
            return Err(TokenError::InvalidAddress);
        }

        let previous = self.owner;
        self.owner = new_owner;
        Ok(Receipt::event(
            (),
            Event::OwnershipTransferred {
                previous,
                new: new_owner,
            },
        ))
    }

    pub fn pause(&mut self, caller: Address) -> Result<Receipt<()>> {
        self.require_owner(caller)?;
        self.require_not_paused()?;
        self.paused = true;
        Ok(Receipt::event((), Event::Pause))
    }

    pub fn unpause(&mut self, caller: Address) -> Result<Receipt<()>> {
        self.require_owner(caller)?;
        if !self.paused {
            return Err(TokenError::NotPaused);
        }
        self.paused = false;
        Ok(Receipt::event((), Event::Unpause))
    }
}

impl AccessGate for Ownership {
    fn is_paused(&self) -> bool {
        self.paused
    }

    fn owner(&self) -> Address {
        self.owner
    }
}
