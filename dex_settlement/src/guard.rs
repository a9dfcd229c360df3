//! Settlement guard.
//!
//! Every mutating operation hands the guard a [`Settlement`]: the pool
//! snapshot it priced against, the records it wants to commit and the vault
//! movements that back them. The guard checks the invariants on the computed
//! state, performs the movements, re-checks the vault balances and only then
//! writes the ledger. Any failure unwinds the movements already made, so no
//! partial effect survives.

use solana_program::{msg, pubkey::Pubkey};

use crate::address::DerivedAddress;
use crate::custody::{LedgerStore, VaultCustody};
use crate::error::ExchangeError;
use crate::state::{LiquidityProvider, Pool, RecordKind, Trader};
use crate::trader::is_monotonic;

/// A single token movement between a user and a pool vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultMovement {
    In {
        vault: Pubkey,
        from: Pubkey,
        amount: u64,
    },
    Out {
        vault: Pubkey,
        to: Pubkey,
        amount: u64,
    },
}

impl VaultMovement {
    pub fn vault(&self) -> &Pubkey {
        match self {
            VaultMovement::In { vault, .. } | VaultMovement::Out { vault, .. } => vault,
        }
    }

    /// Signed effect on the vault balance.
    pub fn net(&self) -> i128 {
        match self {
            VaultMovement::In { amount, .. } => i128::from(*amount),
            VaultMovement::Out { amount, .. } => -i128::from(*amount),
        }
    }

    /// The movement that undoes this one.
    pub fn reversed(&self) -> VaultMovement {
        match *self {
            VaultMovement::In {
                vault,
                from,
                amount,
            } => VaultMovement::Out {
                vault,
                to: from,
                amount,
            },
            VaultMovement::Out { vault, to, amount } => VaultMovement::In {
                vault,
                from: to,
                amount,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementKind {
    Deposit,
    Withdrawal,
    Swap,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderUpdate {
    pub address: Pubkey,
    pub before: LiquidityProvider,
    pub after: LiquidityProvider,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraderUpdate {
    pub address: Pubkey,
    pub before: Trader,
    pub after: Trader,
}

/// Computed next state of one operation, not yet committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    pub kind: SettlementKind,
    pub pool_address: Pubkey,
    pub pool_before: Pool,
    pub pool_after: Pool,
    pub provider: Option<ProviderUpdate>,
    pub trader: Option<TraderUpdate>,
    pub movements: Vec<VaultMovement>,
}

/// Properties every settlement must satisfy before it may commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementInvariant {
    /// Vault balances equal the recorded reserves.
    VaultBalance,
    /// Identity fields of the pool are unchanged.
    PoolIdentity,
    /// Reserve deltas equal the net vault movements.
    ReserveConservation,
    /// The total share delta equals the provider's share delta.
    ShareConservation,
    /// `reserve_a * reserve_b` does not decrease across a swap.
    ConstantProduct,
    /// Trader counters do not decrease.
    TraderMonotonic,
}

impl SettlementInvariant {
    pub fn description(&self) -> &'static str {
        match self {
            Self::VaultBalance => "vault balances must equal recorded reserves",
            Self::PoolIdentity => "pool identity fields are immutable",
            Self::ReserveConservation => "reserve changes must equal vault movements",
            Self::ShareConservation => "total shares must move with provider shares",
            Self::ConstantProduct => "reserve product must not decrease on swap",
            Self::TraderMonotonic => "trader counters must not decrease",
        }
    }
}

/// Checks the computed state of `settlement` without touching custody.
pub fn check_invariants(settlement: &Settlement) -> Result<(), SettlementInvariant> {
    let before = &settlement.pool_before;
    let after = &settlement.pool_after;

    if after.kind != RecordKind::Pool || !before.same_identity(after) {
        return Err(SettlementInvariant::PoolIdentity);
    }

    let mut net_a: i128 = 0;
    let mut net_b: i128 = 0;
    for movement in &settlement.movements {
        if movement.vault() == &before.vault_a {
            net_a += movement.net();
        } else if movement.vault() == &before.vault_b {
            net_b += movement.net();
        } else {
            return Err(SettlementInvariant::ReserveConservation);
        }
    }
    if i128::from(after.reserve_a) - i128::from(before.reserve_a) != net_a
        || i128::from(after.reserve_b) - i128::from(before.reserve_b) != net_b
    {
        return Err(SettlementInvariant::ReserveConservation);
    }

    let total_delta = i128::from(after.total_shares) - i128::from(before.total_shares);
    let provider_delta = match &settlement.provider {
        Some(update) => {
            if update.after.pool != settlement.pool_address
                || update.after.owner != update.before.owner
            {
                return Err(SettlementInvariant::ShareConservation);
            }
            i128::from(update.after.shares) - i128::from(update.before.shares)
        }
        None => 0,
    };
    if total_delta != provider_delta {
        return Err(SettlementInvariant::ShareConservation);
    }

    if settlement.kind == SettlementKind::Swap && after.invariant() < before.invariant() {
        return Err(SettlementInvariant::ConstantProduct);
    }

    if let Some(update) = &settlement.trader {
        if update.after.pool != settlement.pool_address
            || update.after.owner != update.before.owner
            || !is_monotonic(&update.before, &update.after)
        {
            return Err(SettlementInvariant::TraderMonotonic);
        }
    }

    Ok(())
}

/// Commits settlements for one pool, signing outgoing movements with the
/// pool's vault authority.
pub struct SettlementGuard<'a> {
    authority: &'a DerivedAddress,
}

impl<'a> SettlementGuard<'a> {
    pub fn new(authority: &'a DerivedAddress) -> Self {
        Self { authority }
    }

    /// Fails with `VaultMismatch` unless both vaults hold exactly the
    /// reserves recorded in `pool`.
    pub fn check_vaults<C: VaultCustody>(custody: &C, pool: &Pool) -> Result<(), ExchangeError> {
        let balance_a = custody.vault_balance(&pool.vault_a)?;
        let balance_b = custody.vault_balance(&pool.vault_b)?;
        if balance_a != pool.reserve_a || balance_b != pool.reserve_b {
            msg!(
                "Guard: {} (vaults ({}, {}), reserves ({}, {}))",
                SettlementInvariant::VaultBalance.description(),
                balance_a,
                balance_b,
                pool.reserve_a,
                pool.reserve_b
            );
            return Err(ExchangeError::VaultMismatch);
        }
        Ok(())
    }

    pub fn settle<S: LedgerStore, C: VaultCustody>(
        &self,
        store: &mut S,
        custody: &mut C,
        settlement: &Settlement,
    ) -> Result<(), ExchangeError> {
        Self::check_vaults(custody, &settlement.pool_before)?;
        if let Err(invariant) = check_invariants(settlement) {
            msg!("Guard: {} ({:?})", invariant.description(), settlement.kind);
            return Err(ExchangeError::InvariantViolated);
        }

        let mut applied: Vec<VaultMovement> = Vec::with_capacity(settlement.movements.len());
        for movement in &settlement.movements {
            if let Err(e) = self.apply(custody, movement) {
                self.unwind(custody, &applied);
                return Err(e);
            }
            applied.push(*movement);
        }

        if let Err(e) = Self::check_vaults(custody, &settlement.pool_after) {
            self.unwind(custody, &applied);
            return Err(e);
        }

        if let Err(e) = Self::write_records(store, settlement) {
            self.unwind(custody, &applied);
            Self::restore_records(store, settlement);
            return Err(e);
        }

        Ok(())
    }

    fn apply<C: VaultCustody>(
        &self,
        custody: &mut C,
        movement: &VaultMovement,
    ) -> Result<(), ExchangeError> {
        match *movement {
            VaultMovement::In {
                vault,
                from,
                amount,
            } => custody.move_in(&vault, &from, amount),
            VaultMovement::Out { vault, to, amount } => {
                custody.move_out(self.authority, &vault, &to, amount)
            }
        }
    }

    fn unwind<C: VaultCustody>(&self, custody: &mut C, applied: &[VaultMovement]) {
        for movement in applied.iter().rev() {
            if let Err(e) = self.apply(custody, &movement.reversed()) {
                msg!("Guard: failed to unwind {:?}: {}", movement, e);
            }
        }
    }

    fn write_records<S: LedgerStore>(
        store: &mut S,
        settlement: &Settlement,
    ) -> Result<(), ExchangeError> {
        store.save(&settlement.pool_address, &settlement.pool_after)?;
        if let Some(update) = &settlement.provider {
            store.save(&update.address, &update.after)?;
        }
        if let Some(update) = &settlement.trader {
            store.save(&update.address, &update.after)?;
        }
        Ok(())
    }

    fn restore_records<S: LedgerStore>(store: &mut S, settlement: &Settlement) {
        let mut restored = store.save(&settlement.pool_address, &settlement.pool_before);
        if let Some(update) = &settlement.provider {
            restored = restored.and(store.save(&update.address, &update.before));
        }
        if let Some(update) = &settlement.trader {
            restored = restored.and(store.save(&update.address, &update.before));
        }
        if let Err(e) = restored {
            msg!("Guard: failed to restore records: {}", e);
        }
    }
}
