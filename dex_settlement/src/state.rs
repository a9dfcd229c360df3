use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::pubkey::Pubkey;

use crate::config::PoolConfig;
use crate::error::ExchangeError;

/// Tag written as the first byte of every persisted record.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Uninitialized,
    Pool,
    LiquidityProvider,
    Trader,
}

/// A record the ledger persists under a derived address.
pub trait LedgerRecord: BorshSerialize + BorshDeserialize + Clone {
    const KIND: RecordKind;

    fn kind(&self) -> RecordKind;

    /// Serialized size; every record has a fixed layout.
    fn space() -> usize;

    fn decode(data: &[u8]) -> Result<Self, ExchangeError> {
        let record =
            Self::deserialize(&mut &data[..]).map_err(|_| ExchangeError::InvalidRecord)?;
        if record.kind() != Self::KIND {
            return Err(ExchangeError::InvalidRecord);
        }
        Ok(record)
    }

    fn encode(&self) -> Result<Vec<u8>, ExchangeError> {
        self.try_to_vec().map_err(|_| ExchangeError::InvalidRecord)
    }
}

/// The main state record of a liquidity pool.
///
/// Identity fields (admin, mints, decimals, config, vault references) are
/// fixed by `init`. Reserves and `total_shares` only move through deposits,
/// withdrawals and swaps.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct Pool {
    pub kind: RecordKind,
    /// Admin that created the pool.
    pub admin: Pubkey,
    /// Mint of the first token (Token A).
    pub token_a: Pubkey,
    /// Mint of the second token (Token B).
    pub token_b: Pubkey,
    /// Decimals shared by both mints, informational.
    pub decimals: u8,
    /// Recorded balance of vault A.
    pub reserve_a: u64,
    /// Recorded balance of vault B.
    pub reserve_b: u64,
    /// Sum of all provider shares.
    pub total_shares: u64,
    pub config: PoolConfig,
    /// Derived authority controlling both vaults.
    pub vault_authority: Pubkey,
    /// Token account holding the pool's reserves of Token A.
    pub vault_a: Pubkey,
    /// Token account holding the pool's reserves of Token B.
    pub vault_b: Pubkey,
}

impl Pool {
    /// kind + 3 keys + decimals + 3 u64 + config + 3 keys
    pub const LEN: usize = 1 + 32 * 3 + 1 + 8 * 3 + (2 + 2 + 1) + 32 * 3;

    pub fn is_empty(&self) -> bool {
        self.total_shares == 0
    }

    /// Product of the reserves, the constant-product invariant.
    pub fn invariant(&self) -> u128 {
        u128::from(self.reserve_a) * u128::from(self.reserve_b)
    }

    /// True when every identity field of `other` matches `self`.
    pub fn same_identity(&self, other: &Pool) -> bool {
        self.admin == other.admin
            && self.token_a == other.token_a
            && self.token_b == other.token_b
            && self.decimals == other.decimals
            && self.config == other.config
            && self.vault_authority == other.vault_authority
            && self.vault_a == other.vault_a
            && self.vault_b == other.vault_b
    }
}

impl LedgerRecord for Pool {
    const KIND: RecordKind = RecordKind::Pool;

    fn kind(&self) -> RecordKind {
        self.kind
    }

    fn space() -> usize {
        Self::LEN
    }
}

/// A provider's claim on one pool.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct LiquidityProvider {
    pub kind: RecordKind,
    pub owner: Pubkey,
    pub pool: Pubkey,
    pub shares: u64,
}

impl LiquidityProvider {
    pub const LEN: usize = 1 + 32 + 32 + 8;

    pub fn new(owner: Pubkey, pool: Pubkey) -> Self {
        Self {
            kind: RecordKind::LiquidityProvider,
            owner,
            pool,
            shares: 0,
        }
    }
}

impl LedgerRecord for LiquidityProvider {
    const KIND: RecordKind = RecordKind::LiquidityProvider;

    fn kind(&self) -> RecordKind {
        self.kind
    }

    fn space() -> usize {
        Self::LEN
    }
}

/// Cumulative swap activity of one trader against one pool.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct Trader {
    pub kind: RecordKind,
    pub owner: Pubkey,
    pub pool: Pubkey,
    /// Total input paid into the pool, both directions summed.
    pub volume_in: u64,
    /// Total output received from the pool, both directions summed.
    pub volume_out: u64,
    pub swap_count: u64,
}

impl Trader {
    pub const LEN: usize = 1 + 32 + 32 + 8 * 3;

    pub fn new(owner: Pubkey, pool: Pubkey) -> Self {
        Self {
            kind: RecordKind::Trader,
            owner,
            pool,
            volume_in: 0,
            volume_out: 0,
            swap_count: 0,
        }
    }
}

impl LedgerRecord for Trader {
    const KIND: RecordKind = RecordKind::Trader;

    fn kind(&self) -> RecordKind {
        self.kind
    }

    fn space() -> usize {
        Self::LEN
    }
}
