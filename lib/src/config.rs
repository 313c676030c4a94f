use serde::{Deserialize, Serialize};

use crate::U256;

/// Economic and metadata parameters fixed at genesis.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TokenConfig {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    /// Whole tokens credited to the owner at genesis.
    pub initial_supply: u64,
    /// Whole tokens paid per solution in the first era.
    pub base_reward: u64,
    pub epoch_length: u64,
    pub blocks_per_mint: u64,
    pub max_adjustment_factor: u64,
    pub initial_target: U256,
    pub min_target: U256,
    pub max_target: U256,
    pub gas_price_limit: u64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            name: String::from("Mineable Token"),
            symbol: String::from("MTK"),
            decimals: crate::DECIMALS,
            initial_supply: crate::INITIAL_SUPPLY,
            base_reward: crate::INITIAL_REWARD,
            epoch_length: crate::EPOCH_LENGTH,
            blocks_per_mint: crate::BLOCKS_PER_MINT,
            max_adjustment_factor: crate::MAX_ADJUSTMENT_FACTOR,
            initial_target: crate::MAX_TARGET,
            min_target: crate::MIN_TARGET,
            max_target: crate::MAX_TARGET,
            gas_price_limit: crate::DEFAULT_GAS_PRICE_LIMIT,
        }
    }
}

impl TokenConfig {
    /// Host blocks a whole difficulty period is expected to take.
    pub fn blocks_per_period(&self) -> u64 {
        self.epoch_length.saturating_mul(self.blocks_per_mint).max(1)
    }
}
