//! Emission and difficulty schedule. Everything here is pure.

use crate::{U256, config::TokenConfig};

/// Supply cap of the current reward era: half of everything issued so far.
pub fn max_supply_for_era(total_supply: U256) -> U256 {
    total_supply / 2
}

/// Base reward halved once per era after the first; zero once it is shifted out.
pub fn mining_reward(config: &TokenConfig, reward_era: u64) -> U256 {
    let halvings = reward_era.saturating_sub(1);
    if halvings >= 256 {
        return U256::zero();
    }

    let base = U256::from(config.base_reward) * crate::unit(config.decimals);
    base >> halvings as usize
}

/// Next mining target given how many host blocks the finished period took.
///
/// Faster than `blocks_per_period` lowers the target (harder), slower raises it.
/// The ratio is bounded by `max_adjustment_factor` in both directions and the
/// result is kept within `[min_target, max_target]`.
pub fn retarget(config: &TokenConfig, target: U256, elapsed_blocks: u64) -> U256 {
    let expected = config.blocks_per_period();
    let factor = config.max_adjustment_factor.max(1);
    let elapsed = elapsed_blocks
        .max(1)
        .clamp((expected / factor).max(1), expected.saturating_mul(factor));

    // target * elapsed / expected, split to stay inside 256 bits; the remainder
    // term is below 2^128 and the whole term saturates
    let expected = U256::from(expected);
    let elapsed = U256::from(elapsed);
    let scaled = (target / expected)
        .checked_mul(elapsed)
        .and_then(|whole| whole.checked_add((target % expected) * elapsed / expected))
        .unwrap_or(U256::MAX);

    scaled.clamp(config.min_target, config.max_target)
}

/// Inverse ratio of the current target to the easiest allowed one.
pub fn difficulty(config: &TokenConfig, target: U256) -> U256 {
    if target.is_zero() {
        return config.max_target;
    }
    (config.max_target / target).max(U256::one())
}
