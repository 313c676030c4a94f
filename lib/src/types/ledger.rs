use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{
    U256,
    crypto::Address,
    error::{Result, TokenError},
    types::{
        access::AccessGate,
        event::{Event, Receipt},
    },
};

/// Balance bookkeeping the mining engine mints into.
pub trait Ledger {
    fn total_supply(&self) -> U256;
    fn balance_of(&self, account: Address) -> U256;
    fn mint(&mut self, to: Address, amount: U256) -> Result<Event>;
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct TokenLedger {
    total_supply: U256,
    balances: HashMap<Address, U256>,
    allowances: HashMap<(Address, Address), U256>,
}

impl TokenLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allowance(&self, owner: Address, spender: Address) -> U256 {
        self.allowances
            .get(&(owner, spender))
            .copied()
            .unwrap_or_default()
    }

    pub fn transfer(
        &mut self,
        gate: &impl AccessGate,
        from: Address,
        to: Address,
        value: U256,
    ) -> Result<Receipt<()>> {
        gate.require_not_paused()?;
        let event = self.move_balance(from, to, value)?;
        Ok(Receipt::event((), event))
    }

    pub fn approve(
        &mut self,
        gate: &impl AccessGate,
        owner: Address,
        spender: Address,
        value: U256,
    ) -> Result<Receipt<()>> {
        gate.require_not_paused()?;
        if spender.is_zero() {
            return Err(TokenError::InvalidAddress);
        }

        self.allowances.insert((owner, spender), value);
        Ok(Receipt::event(
            (),
            Event::Approval {
                owner,
                spender,
                value,
            },
        ))
    }

    pub fn transfer_from(
        &mut self,
        gate: &impl AccessGate,
        spender: Address,
        from: Address,
        to: Address,
        value: U256,
    ) -> Result<Receipt<()>> {
        gate.require_not_paused()?;
        let allowed = self.allowance(from, spender);
        let remaining = allowed
            .checked_sub(value)
            .ok_or(TokenError::InsufficientAllowance)?;

        let event = self.move_balance(from, to, value)?;
        self.allowances.insert((from, spender), remaining);
        Ok(Receipt::event((), event))
    }

    // Validates everything before touching either balance.
    fn move_balance(&mut self, from: Address, to: Address, value: U256) -> Result<Event> {
        if to.is_zero() {
            return Err(TokenError::InvalidAddress);
        }

        let from_balance = self.balance_of(from);
        let from_after = from_balance
            .checked_sub(value)
            .ok_or(TokenError::InsufficientBalance)?;

        if from != to {
            let to_after = self
                .balance_of(to)
                .checked_add(value)
                .ok_or(TokenError::Overflow)?;
            self.balances.insert(from, from_after);
            self.balances.insert(to, to_after);
        }

        Ok(Event::Transfer { from, to, value })
    }
}

impl Ledger for TokenLedger {
    fn total_supply(&self) -> U256 {
        self.total_supply
    }

    fn balance_of(&self, account: Address) -> U256 {
        self.balances.get(&account).copied().unwrap_or_default()
    }

    fn mint(&mut self, to: Address, amount: U256) -> Result<Event> {
        if to.is_zero() {
            return Err(TokenError::InvalidAddress);
        }

        let total_supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;
        let balance = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;

        self.total_supply = total_supply;
        self.balances.insert(to, balance);
        Ok(Event::Transfer {
            from: Address::ZERO,
            to,
            value: amount,
        })
    }
}
