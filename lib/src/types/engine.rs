use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    U256,
    config::TokenConfig,
    crypto::Address,
    error::{Result, TokenError},
    sha256::Hash,
    types::{
        access::AccessGate,
        chain::{BlockContext, CallContext},
        event::{Event, Receipt},
        gas::GasPriceGuard,
        ledger::Ledger,
        schedule,
    },
};

/// Proof-of-work puzzle state; rotates on every accepted solution.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChallengeState {
    pub challenge_number: Hash,
    pub latest_difficulty_period_started: u64,
    pub epoch_count: u64,
    pub mining_target: U256,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct RewardState {
    pub reward_era: u64,
    pub tokens_minted: U256,
    /// Minted since the current era began.
    pub era_minted: U256,
}

/// Outcome of an accepted solution.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Minted {
    pub epoch_count: u64,
    pub reward: U256,
}

/// Digest a miner must produce for `nonce` against `challenge_number`.
pub fn solution_digest(challenge_number: &Hash, miner: &Address, nonce: u64) -> Result<Hash> {
    Hash::hash(&(challenge_number, miner, nonce))
}

/// Searches `steps` nonces starting at `start`, returning the first one whose
/// digest meets `target`.
pub fn search_nonce(
    challenge_number: &Hash,
    miner: &Address,
    target: U256,
    start: u64,
    steps: u64,
) -> Result<Option<(u64, Hash)>> {
    let mut nonce = start;
    for _ in 0..steps {
        let digest = solution_digest(challenge_number, miner, nonce)?;
        if digest.matches_target(target) {
            return Ok(Some((nonce, digest)));
        }
        nonce = nonce.wrapping_add(1);
    }
    Ok(None)
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct MiningEngine {
    config: TokenConfig,
    challenge: ChallengeState,
    reward: RewardState,
    gas: GasPriceGuard,
}

impl MiningEngine {
    pub fn new(config: TokenConfig, genesis: &BlockContext) -> Result<Self> {
        let gas = GasPriceGuard::new(config.gas_price_limit)?;
        if config.decimals > crate::MAX_DECIMALS {
            return Err(TokenError::InvalidDecimals(config.decimals));
        }
        U256::from(config.base_reward)
            .checked_mul(crate::unit(config.decimals))
            .ok_or(TokenError::Overflow)?;
        if config.min_target > config.max_target {
            return Err(TokenError::InvalidTarget);
        }
        let mining_target = config
            .initial_target
            .clamp(config.min_target, config.max_target);
        if mining_target.is_zero() {
            return Err(TokenError::InvalidTarget);
        }

        Ok(Self {
            challenge: ChallengeState {
                challenge_number: genesis.hash,
                latest_difficulty_period_started: genesis.height,
                epoch_count: 0,
                mining_target,
            },
            reward: RewardState {
                reward_era: 1,
                tokens_minted: U256::zero(),
                era_minted: U256::zero(),
            },
            gas,
            config,
        })
    }

    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    pub fn challenge_state(&self) -> &ChallengeState {
        &self.challenge
    }

    pub fn challenge_number(&self) -> Hash {
        self.challenge.challenge_number
    }

    pub fn mining_target(&self) -> U256 {
        self.challenge.mining_target
    }

    pub fn mining_difficulty(&self) -> U256 {
        schedule::difficulty(&self.config, self.challenge.mining_target)
    }

    pub fn mining_reward(&self) -> U256 {
        schedule::mining_reward(&self.config, self.reward.reward_era)
    }

    pub fn epoch_count(&self) -> u64 {
        self.challenge.epoch_count
    }

    pub fn reward_era(&self) -> u64 {
        self.reward.reward_era
    }

    pub fn tokens_minted(&self) -> U256 {
        self.reward.tokens_minted
    }

    pub fn latest_difficulty_period_started(&self) -> u64 {
        self.challenge.latest_difficulty_period_started
    }

    pub fn gas_price_limit(&self) -> u64 {
        self.gas.limit()
    }

    pub fn set_gas_price_limit(
        &mut self,
        gate: &impl AccessGate,
        caller: Address,
        new_limit: Option<u64>,
    ) -> Result<Receipt<()>> {
        self.gas.set_limit(gate, caller, new_limit)
    }

    /// Verifies a solution and, if it holds, mints the reward to the sender.
    ///
    /// Every check runs before any state is touched, and the ledger mint (the
    /// only fallible mutation) runs before the engine commits its own state, so
    /// a failed call leaves everything unchanged.
    pub fn submit_solution(
        &mut self,
        ctx: &CallContext,
        gate: &impl AccessGate,
        ledger: &mut impl Ledger,
        nonce: u64,
        digest: Hash,
    ) -> Result<Receipt<Minted>> {
        gate.require_not_paused()?;
        self.gas.check(ctx.gas_price)?;
        if ctx.sender.is_zero() {
            return Err(TokenError::InvalidAddress);
        }

        let expected = solution_digest(&self.challenge.challenge_number, &ctx.sender, nonce)?;
        if expected != digest || !digest.matches_target(self.challenge.mining_target) {
            debug!(miner = %ctx.sender, nonce, "rejected solution");
            return Err(TokenError::InvalidProofOfWork);
        }

        let mut challenge = self.challenge;
        let mut reward_state = self.reward;

        challenge.epoch_count = challenge
            .epoch_count
            .checked_add(1)
            .ok_or(TokenError::Overflow)?;
        if challenge.epoch_count % self.config.epoch_length.max(1) == 0 {
            self.retarget(&mut challenge, &ctx.block);
        }

        let reward = self.mining_reward();
        reward_state.tokens_minted = reward_state
            .tokens_minted
            .checked_add(reward)
            .ok_or(TokenError::Overflow)?;
        reward_state.era_minted = reward_state
            .era_minted
            .checked_add(reward)
            .ok_or(TokenError::Overflow)?;

        challenge.challenge_number = Hash::hash(&(
            challenge.challenge_number,
            ctx.block.hash,
            challenge.epoch_count,
        ))?;

        let transfer = ledger.mint(ctx.sender, reward)?;

        let era_cap = schedule::max_supply_for_era(ledger.total_supply());
        if !reward.is_zero() && reward_state.era_minted >= era_cap {
            reward_state.reward_era += 1;
            reward_state.era_minted = U256::zero();
            info!(
                reward_era = reward_state.reward_era,
                total_supply = %ledger.total_supply(),
                "reward era advanced"
            );
        }

        self.challenge = challenge;
        self.reward = reward_state;

        info!(
            miner = %ctx.sender,
            epoch_count = challenge.epoch_count,
            reward = %reward,
            "solution accepted"
        );

        Ok(Receipt::new(
            Minted {
                epoch_count: challenge.epoch_count,
                reward,
            },
            vec![
                transfer,
                Event::Mint {
                    to: ctx.sender,
                    reward,
                    epoch_count: challenge.epoch_count,
                    new_challenge: challenge.challenge_number,
                },
            ],
        ))
    }

    fn retarget(&self, challenge: &mut ChallengeState, block: &BlockContext) {
        let elapsed = block
            .height
            .saturating_sub(challenge.latest_difficulty_period_started);
        let previous = challenge.mining_target;

        challenge.mining_target = schedule::retarget(&self.config, previous, elapsed);
        challenge.latest_difficulty_period_started = block.height;

        info!(
            elapsed,
            expected = self.config.blocks_per_period(),
            previous = %previous,
            target = %challenge.mining_target,
            "mining target adjusted"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{access::Ownership, chain::Chain, ledger::TokenLedger};

    const OWNER: Address = Address::new([1; 20]);
    const MINER: Address = Address::new([2; 20]);

    struct Fixture {
        chain: Chain,
        gate: Ownership,
        ledger: TokenLedger,
        engine: MiningEngine,
    }

    fn fixture(config: TokenConfig) -> Fixture {
        let chain = Chain::genesis().unwrap();
        let engine = MiningEngine::new(config, &chain.head()).unwrap();
        Fixture {
            chain,
            gate: Ownership::new(OWNER),
            ledger: TokenLedger::new(),
            engine,
        }
    }

    fn easy_config() -> TokenConfig {
        TokenConfig {
            epoch_length: 4,
            blocks_per_mint: 10,
            initial_target: U256::MAX >> 4,
            max_target: U256::MAX >> 2,
            min_target: U256::one(),
            ..TokenConfig::default()
        }
    }

    impl Fixture {
        fn ctx(&self, sender: Address, gas_price: u64) -> CallContext {
            CallContext::new(sender, gas_price, self.chain.head())
        }

        fn solve(&self, miner: Address) -> (u64, Hash) {
            search_nonce(
                &self.engine.challenge_number(),
                &miner,
                self.engine.mining_target(),
                0,
                1_000_000,
            )
            .unwrap()
            .expect("easy target always has a solution")
        }

        fn mine(&mut self, miner: Address) -> Result<Receipt<Minted>> {
            let (nonce, digest) = self.solve(miner);
            let ctx = self.ctx(miner, 1);
            self.engine
                .submit_solution(&ctx, &self.gate, &mut self.ledger, nonce, digest)
        }
    }

    #[test]
    fn fresh_engine_starts_at_genesis() {
        let f = fixture(TokenConfig::default());
        assert_eq!(f.engine.epoch_count(), 0);
        assert_eq!(f.engine.reward_era(), 1);
        assert_eq!(f.engine.tokens_minted(), U256::zero());
        assert!(f.engine.mining_target() > U256::zero());
        assert_eq!(f.engine.challenge_number(), f.chain.head().hash);
        assert_eq!(
            f.engine.latest_difficulty_period_started(),
            f.chain.height()
        );
        assert_eq!(f.engine.mining_difficulty(), U256::one());
    }

    #[test]
    fn accepted_solution_mints_and_rotates_challenge() {
        let mut f = fixture(easy_config());
        let genesis_challenge = f.engine.challenge_number();
        let expected_reward = f.engine.mining_reward();

        let receipt = f.mine(MINER).unwrap();
        assert_eq!(receipt.value.epoch_count, 1);
        assert_eq!(receipt.value.reward, expected_reward);
        assert_eq!(f.engine.epoch_count(), 1);
        assert_eq!(f.engine.tokens_minted(), expected_reward);
        assert_eq!(f.ledger.balance_of(MINER), expected_reward);
        assert_ne!(f.engine.challenge_number(), genesis_challenge);
        assert!(matches!(
            receipt.events.last(),
            Some(Event::Mint { to, epoch_count: 1, .. }) if *to == MINER
        ));
    }

    #[test]
    fn replayed_solution_is_rejected() {
        let mut f = fixture(easy_config());
        let (nonce, digest) = f.solve(MINER);
        let ctx = f.ctx(MINER, 1);
        f.engine
            .submit_solution(&ctx, &f.gate, &mut f.ledger, nonce, digest)
            .unwrap();

        let before = *f.engine.challenge_state();
        assert_eq!(
            f.engine
                .submit_solution(&ctx, &f.gate, &mut f.ledger, nonce, digest),
            Err(TokenError::InvalidProofOfWork)
        );
        assert_eq!(f.engine.challenge_state(), &before);
    }

    #[test]
    fn solution_is_bound_to_submitter() {
        let mut f = fixture(easy_config());
        let (nonce, digest) = f.solve(MINER);
        let ctx = f.ctx(OWNER, 1);
        assert_eq!(
            f.engine
                .submit_solution(&ctx, &f.gate, &mut f.ledger, nonce, digest),
            Err(TokenError::InvalidProofOfWork)
        );
        assert_eq!(f.engine.epoch_count(), 0);
    }

    #[test]
    fn digest_above_target_is_rejected() {
        let mut f = fixture(TokenConfig {
            initial_target: U256::one(),
            min_target: U256::one(),
            ..TokenConfig::default()
        });
        let digest = solution_digest(&f.engine.challenge_number(), &MINER, 0).unwrap();
        let ctx = f.ctx(MINER, 1);
        assert_eq!(
            f.engine.submit_solution(&ctx, &f.gate, &mut f.ledger, 0, digest),
            Err(TokenError::InvalidProofOfWork)
        );
    }

    #[test]
    fn paused_and_overpriced_submissions_change_nothing() {
        let mut f = fixture(easy_config());
        let (nonce, digest) = f.solve(MINER);
        let challenge = f.engine.challenge_number();

        let limit = f.engine.gas_price_limit();
        let ctx = f.ctx(MINER, limit + 1);
        assert!(matches!(
            f.engine
                .submit_solution(&ctx, &f.gate, &mut f.ledger, nonce, digest),
            Err(TokenError::GasPriceExceeded { .. })
        ));

        f.gate.pause(OWNER).unwrap();
        let ctx = f.ctx(MINER, 1);
        assert_eq!(
            f.engine
                .submit_solution(&ctx, &f.gate, &mut f.ledger, nonce, digest),
            Err(TokenError::Paused)
        );

        assert_eq!(f.engine.epoch_count(), 0);
        assert_eq!(f.engine.challenge_number(), challenge);
        assert_eq!(f.ledger.total_supply(), U256::zero());
    }

    #[test]
    fn fast_period_raises_difficulty_at_boundary() {
        let mut f = fixture(easy_config());
        for _ in 0..3 {
            f.chain.advance().unwrap();
            f.mine(MINER).unwrap();
        }
        let target = f.engine.mining_target();
        let started = f.engine.latest_difficulty_period_started();

        f.chain.advance().unwrap();
        f.mine(MINER).unwrap();

        assert_eq!(f.engine.epoch_count(), 4);
        assert!(f.engine.mining_target() < target);
        assert!(f.engine.latest_difficulty_period_started() > started);
        assert_eq!(
            f.engine.latest_difficulty_period_started(),
            f.chain.height()
        );
    }

    #[test]
    fn slow_period_lowers_difficulty_at_boundary() {
        let mut f = fixture(easy_config());
        for _ in 0..3 {
            f.mine(MINER).unwrap();
        }
        let target = f.engine.mining_target();

        f.chain.advance_by(100).unwrap();
        f.mine(MINER).unwrap();
        assert!(f.engine.mining_target() > target);
    }

    #[test]
    fn target_is_untouched_between_boundaries() {
        let mut f = fixture(easy_config());
        let target = f.engine.mining_target();
        for _ in 0..3 {
            f.mine(MINER).unwrap();
            assert_eq!(f.engine.mining_target(), target);
        }
    }

    #[test]
    fn era_advances_once_minted_reaches_half_of_supply() {
        let mut f = fixture(easy_config());
        let first_reward = f.engine.mining_reward();

        // without a pre-allocation the first mint is the whole supply
        f.mine(MINER).unwrap();
        assert_eq!(f.engine.reward_era(), 2);
        assert_eq!(f.engine.mining_reward(), first_reward / 2);

        // era 2 needs another `first_reward` worth at half the rate
        f.mine(MINER).unwrap();
        assert_eq!(f.engine.reward_era(), 2);
        f.mine(MINER).unwrap();
        assert_eq!(f.engine.reward_era(), 3);
        assert_eq!(f.engine.tokens_minted(), first_reward * 2);
    }

    #[test]
    fn reward_rounding_to_zero_keeps_mining_open() {
        let mut f = fixture(TokenConfig {
            initial_supply: 0,
            base_reward: 1,
            decimals: 0,
            ..easy_config()
        });

        let receipt = f.mine(MINER).unwrap();
        assert_eq!(receipt.value.reward, U256::one());
        assert_eq!(f.engine.reward_era(), 2);
        assert!(f.engine.mining_reward().is_zero());

        for epoch in 2..6 {
            let challenge = f.engine.challenge_number();
            let receipt = f.mine(MINER).unwrap();
            assert_eq!(receipt.value.epoch_count, epoch);
            assert!(receipt.value.reward.is_zero());
            assert_ne!(f.engine.challenge_number(), challenge);
            assert_eq!(f.engine.reward_era(), 2);
        }
        assert_eq!(f.engine.tokens_minted(), U256::one());
        assert_eq!(f.ledger.balance_of(MINER), U256::one());
    }

    #[test]
    fn slow_period_at_the_widest_target_saturates() {
        let mut f = fixture(TokenConfig {
            epoch_length: 2,
            blocks_per_mint: 1,
            initial_target: U256::MAX,
            max_target: U256::MAX,
            min_target: U256::one(),
            ..TokenConfig::default()
        });
        f.mine(MINER).unwrap();
        f.chain.advance_by(100).unwrap();

        let receipt = f.mine(MINER).unwrap();
        assert_eq!(receipt.value.epoch_count, 2);
        assert_eq!(f.engine.mining_target(), U256::MAX);
    }

    #[test]
    fn unusable_configs_are_refused() {
        let genesis = Chain::genesis().unwrap().head();
        let refused = |config: TokenConfig| MiningEngine::new(config, &genesis).err();

        assert_eq!(
            refused(TokenConfig {
                decimals: 78,
                ..TokenConfig::default()
            }),
            Some(TokenError::InvalidDecimals(78))
        );
        assert_eq!(
            refused(TokenConfig {
                decimals: crate::MAX_DECIMALS,
                base_reward: u64::MAX,
                ..TokenConfig::default()
            }),
            Some(TokenError::Overflow)
        );
        assert_eq!(
            refused(TokenConfig {
                min_target: U256::MAX,
                max_target: U256::one(),
                ..TokenConfig::default()
            }),
            Some(TokenError::InvalidTarget)
        );
        assert_eq!(
            refused(TokenConfig {
                initial_target: U256::zero(),
                min_target: U256::zero(),
                ..TokenConfig::default()
            }),
            Some(TokenError::InvalidTarget)
        );
        assert!(
            MiningEngine::new(
                TokenConfig {
                    decimals: crate::MAX_DECIMALS,
                    base_reward: 1,
                    ..TokenConfig::default()
                },
                &genesis,
            )
            .is_ok()
        );
    }
}
