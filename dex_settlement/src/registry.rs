use solana_program::{msg, pubkey::Pubkey};

use crate::address::{AddressResolver, PoolAddresses};
use crate::config::PoolConfig;
use crate::error::ExchangeError;
use crate::state::{Pool, RecordKind};

/// Lifecycle of a pool. `Active` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolStatus {
    Uninitialized,
    Active,
}

impl PoolStatus {
    pub fn of(pool: Option<&Pool>) -> Self {
        match pool {
            Some(_) => PoolStatus::Active,
            None => PoolStatus::Uninitialized,
        }
    }
}

/// Builds the empty pool record for `admin`'s pair at `addresses`.
pub fn new_pool(
    admin: &Pubkey,
    token_a: &Pubkey,
    token_b: &Pubkey,
    decimals: u8,
    config: PoolConfig,
    addresses: &PoolAddresses,
) -> Result<Pool, ExchangeError> {
    if token_a == token_b {
        return Err(ExchangeError::InvalidToken);
    }
    config.validate()?;

    Ok(Pool {
        kind: RecordKind::Pool,
        admin: *admin,
        token_a: *token_a,
        token_b: *token_b,
        decimals,
        reserve_a: 0,
        reserve_b: 0,
        total_shares: 0,
        config,
        vault_authority: addresses.authority.address,
        vault_a: addresses.vault_a.address,
        vault_b: addresses.vault_b.address,
    })
}

/// Re-derives every address of `pool` and checks them against the record
/// stored at `pool_address`.
///
/// Returns the derived addresses, whose authority seeds sign vault
/// withdrawals.
pub fn verify_addresses<R: AddressResolver + ?Sized>(
    resolver: &R,
    pool_address: &Pubkey,
    pool: &Pool,
) -> Result<PoolAddresses, ExchangeError> {
    let expected = PoolAddresses::derive(resolver, &pool.admin, &pool.token_a, &pool.token_b);
    if &expected.pool.address != pool_address {
        msg!("Pool record {} is not at its derived address", pool_address);
        return Err(ExchangeError::InvalidRecord);
    }
    if expected.authority.address != pool.vault_authority
        || expected.vault_a.address != pool.vault_a
        || expected.vault_b.address != pool.vault_b
    {
        msg!("Vault references of pool {} do not match derivation", pool_address);
        return Err(ExchangeError::VaultMismatch);
    }
    Ok(expected)
}
