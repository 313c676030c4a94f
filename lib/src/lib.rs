pub const INITIAL_REWARD: u64 = 50;
pub const DECIMALS: u8 = 18;
// 10^77 is the largest power of ten below 2^256
pub const MAX_DECIMALS: u8 = 77;
// whole tokens pre-allocated to the owner at genesis
pub const INITIAL_SUPPLY: u64 = 1_000_000;
// accepted solutions per difficulty period
pub const EPOCH_LENGTH: u64 = 1024;
// host blocks expected between two accepted solutions
pub const BLOCKS_PER_MINT: u64 = 60;
pub const MAX_ADJUSTMENT_FACTOR: u64 = 4;
pub const DEFAULT_GAS_PRICE_LIMIT: u64 = 5_000_000_000;
// 2^16, hardest allowed target
pub const MIN_TARGET: U256 = U256([0x0000_0000_0001_0000, 0, 0, 0]);
// 2^234, easiest allowed target
pub const MAX_TARGET: U256 = U256([0, 0, 0, 0x0000_0400_0000_0000]);

pub mod config;
pub mod crypto;
pub mod error;
pub mod network;
pub mod sha256;
pub mod types;
pub mod util;

use serde::{Deserialize, Serialize};
use uint::construct_uint;

construct_uint! {
    #[derive(Serialize, Deserialize)]
    pub struct U256(4);
}

/// `10^decimals` as a U256, the number of base units in one whole token.
///
/// `decimals` must not exceed [`MAX_DECIMALS`]; `MiningEngine::new` refuses
/// configs that would.
pub fn unit(decimals: u8) -> U256 {
    U256::exp10(decimals as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_bounds_are_powers_of_two() {
        assert_eq!(MIN_TARGET, U256::one() << 16);
        assert_eq!(MAX_TARGET, U256::one() << 234);
    }

    #[test]
    fn unit_scales_by_decimals() {
        assert_eq!(unit(0), U256::one());
        assert_eq!(unit(18), U256::from(1_000_000_000_000_000_000u64));
        assert!(unit(MAX_DECIMALS) > U256::MAX / 10);
    }
}
