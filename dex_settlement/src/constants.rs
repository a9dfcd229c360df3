/// Fees and tolerances are expressed in basis points of this denominator.
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Swap fee applied when a pool is created with the default config (0.30%).
pub const DEFAULT_FEE_BPS: u16 = 30;

/// Allowed deviation of a deposit from the pool ratio (1%).
pub const DEFAULT_RATIO_TOLERANCE_BPS: u16 = 100;

pub const POOL_SEED: &[u8] = b"liquidity-pool";
pub const AUTHORITY_SEED: &[u8] = b"auth";
pub const VAULT_SEED: &[u8] = b"treasury-vault";
pub const LIQUIDITY_PROVIDER_SEED: &[u8] = b"liquidity-provider";
pub const TRADER_SEED: &[u8] = b"trader";
