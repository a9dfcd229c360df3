//! Constant-product swap pricing.
//!
//! The fee is withheld from the input before pricing and stays in the pool.
//! The output is derived from the ceiling of the post-trade invariant
//! `reserve_in * reserve_out / (reserve_in + amount_in_after_fee)`, so every
//! rounding step favors the pool and `reserve_in * reserve_out` can never
//! decrease across a swap.

use solana_program::{msg, pubkey::Pubkey};
use spl_math::checked_ceil_div::CheckedCeilDiv;

use crate::error::ExchangeError;
use crate::math::amount_after_fee;
use crate::state::Pool;

/// Which vault receives the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapDirection {
    AToB,
    BToA,
}

impl SwapDirection {
    /// Direction for an input of `token_in`, if it belongs to the pool.
    pub fn for_input(pool: &Pool, token_in: &Pubkey) -> Result<Self, ExchangeError> {
        if token_in == &pool.token_a {
            Ok(SwapDirection::AToB)
        } else if token_in == &pool.token_b {
            Ok(SwapDirection::BToA)
        } else {
            Err(ExchangeError::InvalidToken)
        }
    }

    /// `(reserve_in, reserve_out)` of `pool` for this direction.
    pub fn reserves(&self, pool: &Pool) -> (u64, u64) {
        match self {
            SwapDirection::AToB => (pool.reserve_a, pool.reserve_b),
            SwapDirection::BToA => (pool.reserve_b, pool.reserve_a),
        }
    }

    /// `(vault_in, vault_out)` of `pool` for this direction.
    pub fn vaults(&self, pool: &Pool) -> (Pubkey, Pubkey) {
        match self {
            SwapDirection::AToB => (pool.vault_a, pool.vault_b),
            SwapDirection::BToA => (pool.vault_b, pool.vault_a),
        }
    }

    pub fn token_out(&self, pool: &Pool) -> Pubkey {
        match self {
            SwapDirection::AToB => pool.token_b,
            SwapDirection::BToA => pool.token_a,
        }
    }
}

/// A fully priced swap against one reserve snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapQuote {
    pub direction: SwapDirection,
    pub amount_in: u64,
    /// Input counted by the pricing curve.
    pub amount_in_after_fee: u64,
    /// Input withheld as fee; stays in the pool.
    pub fee: u64,
    pub amount_out: u64,
    pub reserve_in_after: u64,
    pub reserve_out_after: u64,
}

/// Output of a constant-product trade of `amount_in_after_fee` against
/// `(reserve_in, reserve_out)`.
pub fn constant_product_output(
    reserve_in: u64,
    reserve_out: u64,
    amount_in_after_fee: u64,
) -> Result<u64, ExchangeError> {
    if reserve_in == 0 || reserve_out == 0 {
        return Err(ExchangeError::InsufficientLiquidity);
    }
    let invariant = u128::from(reserve_in) * u128::from(reserve_out);
    let new_reserve_in = u128::from(reserve_in) + u128::from(amount_in_after_fee);
    // Rounds a zero quotient to 0 or 1; a zero reserve is refused by the caller.
    let (new_reserve_out, _) = invariant
        .checked_ceil_div(new_reserve_in)
        .ok_or(ExchangeError::ArithmeticOverflow)?;

    let out = u128::from(reserve_out)
        .checked_sub(new_reserve_out)
        .ok_or(ExchangeError::ArithmeticOverflow)?;
    u64::try_from(out).map_err(|_| ExchangeError::ArithmeticOverflow)
}

/// Prices `amount_in` of `token_in` against the reserves in `pool`.
pub fn quote_swap(
    pool: &Pool,
    token_in: &Pubkey,
    amount_in: u64,
) -> Result<SwapQuote, ExchangeError> {
    let direction = SwapDirection::for_input(pool, token_in)?;
    if amount_in == 0 {
        return Err(ExchangeError::InvalidAmount);
    }

    let (reserve_in, reserve_out) = direction.reserves(pool);
    let amount_in_after_fee = amount_after_fee(amount_in, pool.config.fee_bps)?;
    let amount_out = constant_product_output(reserve_in, reserve_out, amount_in_after_fee)?;

    if amount_out == 0 || amount_out >= reserve_out {
        msg!(
            "Swap of {} against reserves ({}, {}) yields {}",
            amount_in,
            reserve_in,
            reserve_out,
            amount_out
        );
        return Err(ExchangeError::InsufficientLiquidity);
    }

    let reserve_in_after = reserve_in
        .checked_add(amount_in)
        .ok_or(ExchangeError::ArithmeticOverflow)?;
    let reserve_out_after = reserve_out - amount_out;

    Ok(SwapQuote {
        direction,
        amount_in,
        amount_in_after_fee,
        fee: amount_in - amount_in_after_fee,
        amount_out,
        reserve_in_after,
        reserve_out_after,
    })
}

/// Pool record after `quote` is settled.
pub fn apply_swap(pool: &Pool, quote: &SwapQuote) -> Pool {
    let mut pool = pool.clone();
    match quote.direction {
        SwapDirection::AToB => {
            pool.reserve_a = quote.reserve_in_after;
            pool.reserve_b = quote.reserve_out_after;
        }
        SwapDirection::BToA => {
            pool.reserve_b = quote.reserve_in_after;
            pool.reserve_a = quote.reserve_out_after;
        }
    }
    pool
}
