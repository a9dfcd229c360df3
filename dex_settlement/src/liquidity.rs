use solana_program::msg;

use crate::config::InitialSharePolicy;
use crate::error::ExchangeError;
use crate::math::{integer_sqrt, mul_div_floor, ratio_within_tolerance};
use crate::state::{LiquidityProvider, Pool};

/// Result of pricing a deposit against a pool snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepositQuote {
    pub amount_a: u64,
    pub amount_b: u64,
    pub shares_minted: u64,
}

/// Result of pricing a share burn against a pool snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawalQuote {
    pub shares_burned: u64,
    pub amount_a: u64,
    pub amount_b: u64,
}

/// Shares minted by the first deposit into an empty pool.
pub fn initial_shares(
    policy: InitialSharePolicy,
    amount_a: u64,
    amount_b: u64,
) -> Result<u64, ExchangeError> {
    if amount_a == 0 || amount_b == 0 {
        return Err(ExchangeError::InvalidAmount);
    }
    let minted = match policy {
        InitialSharePolicy::GeometricMean => {
            let root = integer_sqrt(u128::from(amount_a) * u128::from(amount_b));
            u64::try_from(root).map_err(|_| ExchangeError::ArithmeticOverflow)?
        }
        InitialSharePolicy::MinimumAmount => amount_a.min(amount_b),
    };
    Ok(minted)
}

/// Shares minted by a deposit into a pool that already holds liquidity.
pub fn subsequent_shares(
    amount_a: u64,
    amount_b: u64,
    reserve_a: u64,
    reserve_b: u64,
    total_shares: u64,
) -> Result<u64, ExchangeError> {
    if reserve_a == 0 || reserve_b == 0 {
        return Err(ExchangeError::InsufficientLiquidity);
    }
    let share_a = mul_div_floor(amount_a, total_shares, reserve_a)?;
    let share_b = mul_div_floor(amount_b, total_shares, reserve_b)?;
    Ok(share_a.min(share_b))
}

/// Prices a deposit of `(amount_a, amount_b)`.
///
/// An empty pool accepts any pair and sets the price; afterwards the pair
/// must match the reserve ratio within the pool's tolerance. Both amounts are
/// always taken in full.
pub fn quote_deposit(
    pool: &Pool,
    amount_a: u64,
    amount_b: u64,
) -> Result<DepositQuote, ExchangeError> {
    if amount_a == 0 || amount_b == 0 {
        return Err(ExchangeError::InvalidAmount);
    }

    let shares_minted = if pool.is_empty() {
        initial_shares(pool.config.initial_share_policy, amount_a, amount_b)?
    } else {
        if !ratio_within_tolerance(
            amount_a,
            amount_b,
            pool.reserve_a,
            pool.reserve_b,
            pool.config.ratio_tolerance_bps,
        )? {
            msg!(
                "Deposit ({}, {}) off ratio of reserves ({}, {})",
                amount_a,
                amount_b,
                pool.reserve_a,
                pool.reserve_b
            );
            return Err(ExchangeError::RatioMismatch);
        }
        subsequent_shares(
            amount_a,
            amount_b,
            pool.reserve_a,
            pool.reserve_b,
            pool.total_shares,
        )?
    };

    if shares_minted == 0 {
        return Err(ExchangeError::InvalidAmount);
    }

    Ok(DepositQuote {
        amount_a,
        amount_b,
        shares_minted,
    })
}

/// Prices burning `shares` of `provider`'s holding. Withdrawals floor so
/// the dust stays with the remaining providers.
pub fn quote_withdrawal(
    pool: &Pool,
    provider: &LiquidityProvider,
    shares: u64,
) -> Result<WithdrawalQuote, ExchangeError> {
    if shares == 0 {
        return Err(ExchangeError::InvalidAmount);
    }
    if shares > provider.shares || shares > pool.total_shares {
        return Err(ExchangeError::InsufficientShares);
    }

    let amount_a = mul_div_floor(pool.reserve_a, shares, pool.total_shares)?;
    let amount_b = mul_div_floor(pool.reserve_b, shares, pool.total_shares)?;
    if amount_a == 0 && amount_b == 0 {
        return Err(ExchangeError::InvalidAmount);
    }

    Ok(WithdrawalQuote {
        shares_burned: shares,
        amount_a,
        amount_b,
    })
}

/// Pool and provider records after `quote` is settled.
pub fn apply_deposit(
    pool: &Pool,
    provider: &LiquidityProvider,
    quote: &DepositQuote,
) -> Result<(Pool, LiquidityProvider), ExchangeError> {
    let mut pool = pool.clone();
    let mut provider = provider.clone();
    pool.reserve_a = pool
        .reserve_a
        .checked_add(quote.amount_a)
        .ok_or(ExchangeError::ArithmeticOverflow)?;
    pool.reserve_b = pool
        .reserve_b
        .checked_add(quote.amount_b)
        .ok_or(ExchangeError::ArithmeticOverflow)?;
    pool.total_shares = pool
        .total_shares
        .checked_add(quote.shares_minted)
        .ok_or(ExchangeError::ArithmeticOverflow)?;
    provider.shares = provider
        .shares
        .checked_add(quote.shares_minted)
        .ok_or(ExchangeError::ArithmeticOverflow)?;
    Ok((pool, provider))
}

/// Pool and provider records after `quote` is settled.
pub fn apply_withdrawal(
    pool: &Pool,
    provider: &LiquidityProvider,
    quote: &WithdrawalQuote,
) -> Result<(Pool, LiquidityProvider), ExchangeError> {
    let mut pool = pool.clone();
    let mut provider = provider.clone();
    pool.reserve_a = pool
        .reserve_a
        .checked_sub(quote.amount_a)
        .ok_or(ExchangeError::ArithmeticOverflow)?;
    pool.reserve_b = pool
        .reserve_b
        .checked_sub(quote.amount_b)
        .ok_or(ExchangeError::ArithmeticOverflow)?;
    pool.total_shares = pool
        .total_shares
        .checked_sub(quote.shares_burned)
        .ok_or(ExchangeError::ArithmeticOverflow)?;
    provider.shares = provider
        .shares
        .checked_sub(quote.shares_burned)
        .ok_or(ExchangeError::InsufficientShares)?;
    Ok((pool, provider))
}
