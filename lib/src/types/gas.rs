use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    crypto::Address,
    error::{Result, TokenError},
    types::{
        access::AccessGate,
        event::{Event, Receipt},
    },
};

/// Ceiling on the gas price a miner may pay for a solution, so a solution
/// seen in the mempool cannot be outbid by a copier.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct GasPriceGuard {
    limit: u64,
}

impl GasPriceGuard {
    pub fn new(limit: u64) -> Result<Self> {
        if limit == 0 {
            return Err(TokenError::InvalidGasPrice);
        }
        Ok(Self { limit })
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// `None` stands for a missing argument on the wire.
    pub fn set_limit(
        &mut self,
        gate: &impl AccessGate,
        caller: Address,
        new_limit: Option<u64>,
    ) -> Result<Receipt<()>> {
        gate.require_owner(caller)?;
        let limit = match new_limit {
            Some(limit) if limit > 0 => limit,
            _ => return Err(TokenError::InvalidGasPrice),
        };

        self.limit = limit;
        info!(limit, "gas price limit set");
        Ok(Receipt::event((), Event::GasPriceSet { limit }))
    }

    pub fn check(&self, gas_price: u64) -> Result<()> {
        if gas_price > self.limit {
            return Err(TokenError::GasPriceExceeded {
                gas_price,
                limit: self.limit,
            });
        }
        Ok(())
    }
}
