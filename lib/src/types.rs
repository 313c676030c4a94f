pub mod access;
pub mod chain;
pub mod engine;
pub mod event;
pub mod gas;
pub mod ledger;
pub mod schedule;
pub mod token;

pub use access::{AccessGate, Ownership};
pub use chain::{BlockContext, CallContext, Chain};
pub use engine::{ChallengeState, MiningEngine, Minted, RewardState, search_nonce, solution_digest};
pub use event::{Event, Receipt};
pub use gas::GasPriceGuard;
pub use ledger::{Ledger, TokenLedger};
pub use token::{MineableToken, MiningInfo};
