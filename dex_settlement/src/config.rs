use borsh::{BorshDeserialize, BorshSerialize};

use crate::constants::{BPS_DENOMINATOR, DEFAULT_FEE_BPS, DEFAULT_RATIO_TOLERANCE_BPS};
use crate::error::ExchangeError;

/// How shares are minted by the first deposit into an empty pool.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InitialSharePolicy {
    /// `floor(sqrt(amount_a * amount_b))`
    #[default]
    GeometricMean,
    /// `min(amount_a, amount_b)`
    MinimumAmount,
}

/// Per-pool parameters fixed at `init` and persisted in the pool record.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Swap fee retained by the pool, in basis points of the input.
    pub fee_bps: u16,
    /// Allowed deviation of a deposit from the current reserve ratio.
    pub ratio_tolerance_bps: u16,
    pub initial_share_policy: InitialSharePolicy,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            fee_bps: DEFAULT_FEE_BPS,
            ratio_tolerance_bps: DEFAULT_RATIO_TOLERANCE_BPS,
            initial_share_policy: InitialSharePolicy::GeometricMean,
        }
    }
}

impl PoolConfig {
    pub fn with_fee_bps(mut self, fee_bps: u16) -> Self {
        self.fee_bps = fee_bps;
        self
    }

    pub fn with_ratio_tolerance_bps(mut self, ratio_tolerance_bps: u16) -> Self {
        self.ratio_tolerance_bps = ratio_tolerance_bps;
        self
    }

    pub fn with_initial_share_policy(mut self, policy: InitialSharePolicy) -> Self {
        self.initial_share_policy = policy;
        self
    }

    /// Both basis-point values must stay below 100%.
    pub fn validate(&self) -> Result<(), ExchangeError> {
        if u64::from(self.fee_bps) >= BPS_DENOMINATOR
            || u64::from(self.ratio_tolerance_bps) >= BPS_DENOMINATOR
        {
            return Err(ExchangeError::InvalidConfig);
        }
        Ok(())
    }
}
