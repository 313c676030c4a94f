use serde::{Deserialize, Serialize};
use std::io::{Read, Result as IoResult, Write};

use crate::{
    U256,
    config::TokenConfig,
    crypto::Address,
    error::{Result, TokenError},
    sha256::Hash,
    types::{
        access::{AccessGate, Ownership},
        chain::{BlockContext, CallContext},
        engine::{MiningEngine, Minted},
        event::Receipt,
        ledger::{Ledger, TokenLedger},
        schedule,
    },
    util::{Saveable, load_cbor, save_cbor},
};

/// What a miner needs to start searching.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct MiningInfo {
    pub challenge_number: Hash,
    pub mining_target: U256,
    pub mining_difficulty: U256,
    pub mining_reward: U256,
    pub epoch_count: u64,
    pub reward_era: u64,
    pub gas_price_limit: u64,
}

/// A fungible token whose supply grows through proof-of-work.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct MineableToken {
    ledger: TokenLedger,
    access: Ownership,
    engine: MiningEngine,
}

impl MineableToken {
    /// Creates the token and credits the configured pre-allocation to `owner`.
    pub fn new(config: TokenConfig, owner: Address, genesis: &BlockContext) -> Result<Self> {
        if owner.is_zero() {
            return Err(TokenError::InvalidAddress);
        }

        let engine = MiningEngine::new(config, genesis)?;
        let config = engine.config();
        let premine = U256::from(config.initial_supply)
            .checked_mul(crate::unit(config.decimals))
            .ok_or(TokenError::Overflow)?;
        let mut ledger = TokenLedger::new();
        if !premine.is_zero() {
            ledger.mint(owner, premine)?;
        }

        Ok(Self {
            ledger,
            access: Ownership::new(owner),
            engine,
        })
    }

    pub fn name(&self) -> &str {
        &self.engine.config().name
    }

    pub fn symbol(&self) -> &str {
        &self.engine.config().symbol
    }

    pub fn decimals(&self) -> u8 {
        self.engine.config().decimals
    }

    pub fn config(&self) -> &TokenConfig {
        self.engine.config()
    }

    pub fn total_supply(&self) -> U256 {
        self.ledger.total_supply()
    }

    pub fn balance_of(&self, account: Address) -> U256 {
        self.ledger.balance_of(account)
    }

    pub fn allowance(&self, owner: Address, spender: Address) -> U256 {
        self.ledger.allowance(owner, spender)
    }

    pub fn owner(&self) -> Address {
        self.access.owner()
    }

    pub fn paused(&self) -> bool {
        self.access.is_paused()
    }

    pub fn challenge_number(&self) -> Hash {
        self.engine.challenge_number()
    }

    pub fn mining_target(&self) -> U256 {
        self.engine.mining_target()
    }

    pub fn mining_difficulty(&self) -> U256 {
        self.engine.mining_difficulty()
    }

    pub fn mining_reward(&self) -> U256 {
        self.engine.mining_reward()
    }

    pub fn epoch_count(&self) -> u64 {
        self.engine.epoch_count()
    }

    pub fn reward_era(&self) -> u64 {
        self.engine.reward_era()
    }

    pub fn tokens_minted(&self) -> U256 {
        self.engine.tokens_minted()
    }

    pub fn latest_difficulty_period_started(&self) -> u64 {
        self.engine.latest_difficulty_period_started()
    }

    pub fn max_supply_for_era(&self) -> U256 {
        schedule::max_supply_for_era(self.ledger.total_supply())
    }

    pub fn gas_price_limit(&self) -> u64 {
        self.engine.gas_price_limit()
    }

    pub fn mining_info(&self) -> MiningInfo {
        MiningInfo {
            challenge_number: self.challenge_number(),
            mining_target: self.mining_target(),
            mining_difficulty: self.mining_difficulty(),
            mining_reward: self.mining_reward(),
            epoch_count: self.epoch_count(),
            reward_era: self.reward_era(),
            gas_price_limit: self.gas_price_limit(),
        }
    }

    /// Bare value deposits are never accepted.
    pub fn receive(&mut self, _ctx: &CallContext) -> Result<Receipt<()>> {
        Err(TokenError::ValueNotAccepted)
    }

    pub fn mint(
        &mut self,
        ctx: &CallContext,
        nonce: u64,
        digest: Hash,
    ) -> Result<Receipt<Minted>> {
        reject_value(ctx)?;
        self.engine
            .submit_solution(ctx, &self.access, &mut self.ledger, nonce, digest)
    }

    pub fn set_gas_price_limit(
        &mut self,
        ctx: &CallContext,
        new_limit: Option<u64>,
    ) -> Result<Receipt<()>> {
        reject_value(ctx)?;
        self.engine
            .set_gas_price_limit(&self.access, ctx.sender, new_limit)
    }

    pub fn transfer(
        &mut self,
        ctx: &CallContext,
        to: Address,
        value: U256,
    ) -> Result<Receipt<()>> {
        reject_value(ctx)?;
        self.ledger.transfer(&self.access, ctx.sender, to, value)
    }

    pub fn approve(
        &mut self,
        ctx: &CallContext,
        spender: Address,
        value: U256,
    ) -> Result<Receipt<()>> {
        reject_value(ctx)?;
        self.ledger.approve(&self.access, ctx.sender, spender, value)
    }

    pub fn transfer_from(
        &mut self,
        ctx: &CallContext,
        from: Address,
        to: Address,
        value: U256,
    ) -> Result<Receipt<()>> {
        reject_value(ctx)?;
        self.ledger
            .transfer_from(&self.access, ctx.sender, from, to, value)
    }

    pub fn pause(&mut self, ctx: &CallContext) -> Result<Receipt<()>> {
        reject_value(ctx)?;
        self.access.pause(ctx.sender)
    }

    pub fn unpause(&mut self, ctx: &CallContext) -> Result<Receipt<()>> {
        reject_value(ctx)?;
        self.access.unpause(ctx.sender)
    }

    pub fn transfer_ownership(
        &mut self,
        ctx: &CallContext,
        new_owner: Address,
    ) -> Result<Receipt<()>> {
        reject_value(ctx)?;
        self.access.transfer_ownership(ctx.sender, new_owner)
    }
}

fn reject_value(ctx: &CallContext) -> Result<()> {
    if !ctx.value.is_zero() {
        return Err(TokenError::ValueNotAccepted);
    }
    Ok(())
}

impl Saveable for MineableToken {
    fn load<I: Read>(reader: I) -> IoResult<Self> {
        load_cbor(reader, "token")
    }
    fn save<O: Write>(&self, writer: O) -> IoResult<()> {
        save_cbor(self, writer, "token")
    }
}
