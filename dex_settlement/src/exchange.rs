//! The exchange: every public operation of the settlement core.
//!
//! Each mutating operation loads one snapshot of the records it touches,
//! prices the request against that snapshot and hands the computed next
//! state to the [`SettlementGuard`]. Nothing is written unless the guard
//! commits.

use solana_program::{msg, pubkey::Pubkey};

use crate::address::{AddressResolver, DerivedAddress, PoolAddresses};
use crate::config::PoolConfig;
use crate::custody::{LedgerStore, VaultCustody};
use crate::error::ExchangeError;
use crate::guard::{
    ProviderUpdate, Settlement, SettlementGuard, SettlementKind, TraderUpdate, VaultMovement,
};
use crate::liquidity::{apply_deposit, apply_withdrawal, quote_deposit, quote_withdrawal};
use crate::registry::{self, PoolStatus};
use crate::state::{LiquidityProvider, Pool, Trader};
use crate::swap::{self, SwapQuote};
use crate::trader::record_swap;

pub struct Exchange<R, S, C> {
    resolver: R,
    store: S,
    custody: C,
}

impl<R: AddressResolver, S: LedgerStore, C: VaultCustody> Exchange<R, S, C> {
    pub fn new(resolver: R, store: S, custody: C) -> Self {
        Self {
            resolver,
            store,
            custody,
        }
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn custody(&self) -> &C {
        &self.custody
    }

    pub fn custody_mut(&mut self) -> &mut C {
        &mut self.custody
    }

    /// Creates the pool for `admin` with both vaults. Returns the pool
    /// address.
    pub fn init(
        &mut self,
        admin: &Pubkey,
        token_a: &Pubkey,
        token_b: &Pubkey,
        decimals: u8,
        config: PoolConfig,
    ) -> Result<Pubkey, ExchangeError> {
        msg!("Pool Init: admin {}", admin);
        let addresses = PoolAddresses::derive(&self.resolver, admin, token_a, token_b);
        if self.store.load::<Pool>(&addresses.pool.address)?.is_some() {
            msg!("Pool Init: pool {} already exists", addresses.pool.address);
            return Err(ExchangeError::AlreadyInitialized);
        }

        let pool = registry::new_pool(admin, token_a, token_b, decimals, config, &addresses)?;
        let authority = &addresses.authority;
        let (vault_a, vault_b) = (addresses.vault_a.address, addresses.vault_b.address);
        self.custody
            .open_vault(&addresses.vault_a, &authority.address, token_a)?;
        if let Err(e) = self
            .custody
            .open_vault(&addresses.vault_b, &authority.address, token_b)
        {
            self.close_vaults(authority, &[vault_a]);
            return Err(e);
        }
        if let Err(e) = self.store.create(&addresses.pool, &pool) {
            self.close_vaults(authority, &[vault_a, vault_b]);
            return Err(e);
        }

        msg!(
            "Pool Init: pool {} with vaults {} / {}",
            addresses.pool.address,
            pool.vault_a,
            pool.vault_b
        );
        Ok(addresses.pool.address)
    }

    /// Closes vaults opened by an `init` that then failed, newest first.
    fn close_vaults(&mut self, authority: &DerivedAddress, vaults: &[Pubkey]) {
        for vault in vaults.iter().rev() {
            if let Err(e) = self.custody.close_vault(authority, vault) {
                msg!("Pool Init: failed to close vault {}: {}", vault, e);
            }
        }
    }

    /// Creates a zero-share provider record for `owner` in `pool`.
    pub fn register_liquidity_provider(
        &mut self,
        owner: &Pubkey,
        pool: &Pubkey,
    ) -> Result<Pubkey, ExchangeError> {
        self.pool(pool)?;
        let derived = self.resolver.liquidity_provider(owner, pool);
        if self
            .store
            .load::<LiquidityProvider>(&derived.address)?
            .is_some()
        {
            return Err(ExchangeError::AlreadyRegistered);
        }
        self.store
            .create(&derived, &LiquidityProvider::new(*owner, *pool))
            .map_err(already_registered)?;
        msg!("Register: provider {} for {}", derived.address, owner);
        Ok(derived.address)
    }

    /// Creates a zero-volume trader record for `owner` in `pool`.
    pub fn register_trader(&mut self, owner: &Pubkey, pool: &Pubkey) -> Result<Pubkey, ExchangeError> {
        self.pool(pool)?;
        let derived = self.resolver.trader(owner, pool);
        if self.store.load::<Trader>(&derived.address)?.is_some() {
            return Err(ExchangeError::AlreadyRegistered);
        }
        self.store
            .create(&derived, &Trader::new(*owner, *pool))
            .map_err(already_registered)?;
        msg!("Register: trader {} for {}", derived.address, owner);
        Ok(derived.address)
    }

    /// Deposits `(amount_a, amount_b)` from `signer` into the provider's
    /// pool. Returns the shares minted.
    pub fn add_liquidity(
        &mut self,
        signer: &Pubkey,
        provider: &Pubkey,
        amount_a: u64,
        amount_b: u64,
    ) -> Result<u64, ExchangeError> {
        let record = self.liquidity_provider(provider)?;
        if &record.owner != signer {
            return Err(ExchangeError::Unauthorized);
        }
        let (pool, addresses) = self.active_pool(&record.pool)?;

        let quote = quote_deposit(&pool, amount_a, amount_b)?;
        msg!(
            "Deposit: ({}, {}) mints {} shares",
            quote.amount_a,
            quote.amount_b,
            quote.shares_minted
        );
        let (pool_after, record_after) = apply_deposit(&pool, &record, &quote)?;

        let settlement = Settlement {
            kind: SettlementKind::Deposit,
            pool_address: record.pool,
            movements: vec![
                VaultMovement::In {
                    vault: pool.vault_a,
                    from: *signer,
                    amount: quote.amount_a,
                },
                VaultMovement::In {
                    vault: pool.vault_b,
                    from: *signer,
                    amount: quote.amount_b,
                },
            ],
            pool_before: pool,
            pool_after,
            provider: Some(ProviderUpdate {
                address: *provider,
                before: record,
                after: record_after,
            }),
            trader: None,
        };
        SettlementGuard::new(&addresses.authority).settle(
            &mut self.store,
            &mut self.custody,
            &settlement,
        )?;
        Ok(quote.shares_minted)
    }

    /// Burns `shares` of the provider's holding and pays out its part of
    /// both reserves to `signer`.
    pub fn remove_liquidity(
        &mut self,
        signer: &Pubkey,
        provider: &Pubkey,
        shares: u64,
    ) -> Result<(u64, u64), ExchangeError> {
        let record = self.liquidity_provider(provider)?;
        if &record.owner != signer {
            return Err(ExchangeError::Unauthorized);
        }
        let (pool, addresses) = self.active_pool(&record.pool)?;

        let quote = quote_withdrawal(&pool, &record, shares)?;
        msg!(
            "Withdraw: {} shares pays ({}, {})",
            quote.shares_burned,
            quote.amount_a,
            quote.amount_b
        );
        let (pool_after, record_after) = apply_withdrawal(&pool, &record, &quote)?;

        let mut movements = Vec::with_capacity(2);
        if quote.amount_a > 0 {
            movements.push(VaultMovement::Out {
                vault: pool.vault_a,
                to: *signer,
                amount: quote.amount_a,
            });
        }
        if quote.amount_b > 0 {
            movements.push(VaultMovement::Out {
                vault: pool.vault_b,
                to: *signer,
                amount: quote.amount_b,
            });
        }

        let settlement = Settlement {
            kind: SettlementKind::Withdrawal,
            pool_address: record.pool,
            pool_before: pool,
            pool_after,
            provider: Some(ProviderUpdate {
                address: *provider,
                before: record,
                after: record_after,
            }),
            trader: None,
            movements,
        };
        SettlementGuard::new(&addresses.authority).settle(
            &mut self.store,
            &mut self.custody,
            &settlement,
        )?;
        Ok((quote.amount_a, quote.amount_b))
    }

    pub fn swap(
        &mut self,
        signer: &Pubkey,
        trader: &Pubkey,
        token_in: &Pubkey,
        amount_in: u64,
    ) -> Result<u64, ExchangeError> {
        self.swap_with_limit(signer, trader, token_in, amount_in, 0)
    }

    /// Swaps `amount_in` of `token_in` for the other token of the trader's
    /// pool. Fails with `SlippageExceeded` when the output is below
    /// `min_amount_out`.
    pub fn swap_with_limit(
        &mut self,
        signer: &Pubkey,
        trader: &Pubkey,
        token_in: &Pubkey,
        amount_in: u64,
        min_amount_out: u64,
    ) -> Result<u64, ExchangeError> {
        let record = self.trader(trader)?;
        if &record.owner != signer {
            return Err(ExchangeError::Unauthorized);
        }
        let (pool, addresses) = self.active_pool(&record.pool)?;

        let quote = swap::quote_swap(&pool, token_in, amount_in)?;
        msg!(
            "Swap: {} in (fee {}) -> {} out",
            quote.amount_in,
            quote.fee,
            quote.amount_out
        );
        if quote.amount_out < min_amount_out {
            msg!("Swap: output {} below minimum {}", quote.amount_out, min_amount_out);
            return Err(ExchangeError::SlippageExceeded);
        }

        let pool_after = swap::apply_swap(&pool, &quote);
        let record_after = record_swap(&record, &quote)?;
        let (vault_in, vault_out) = quote.direction.vaults(&pool);

        let settlement = Settlement {
            kind: SettlementKind::Swap,
            pool_address: record.pool,
            pool_before: pool,
            pool_after,
            provider: None,
            trader: Some(TraderUpdate {
                address: *trader,
                before: record,
                after: record_after,
            }),
            movements: vec![
                VaultMovement::In {
                    vault: vault_in,
                    from: *signer,
                    amount: quote.amount_in,
                },
                VaultMovement::Out {
                    vault: vault_out,
                    to: *signer,
                    amount: quote.amount_out,
                },
            ],
        };
        SettlementGuard::new(&addresses.authority).settle(
            &mut self.store,
            &mut self.custody,
            &settlement,
        )?;
        Ok(quote.amount_out)
    }

    pub fn pool(&self, address: &Pubkey) -> Result<Pool, ExchangeError> {
        self.store
            .load::<Pool>(address)?
            .ok_or(ExchangeError::NotInitialized)
    }

    pub fn liquidity_provider(&self, address: &Pubkey) -> Result<LiquidityProvider, ExchangeError> {
        self.store
            .load::<LiquidityProvider>(address)?
            .ok_or(ExchangeError::NotRegistered)
    }

    pub fn trader(&self, address: &Pubkey) -> Result<Trader, ExchangeError> {
        self.store
            .load::<Trader>(address)?
            .ok_or(ExchangeError::NotRegistered)
    }

    /// Prices a swap against the latest committed reserves without
    /// settling it.
    pub fn quote_swap(
        &self,
        pool: &Pubkey,
        token_in: &Pubkey,
        amount_in: u64,
    ) -> Result<SwapQuote, ExchangeError> {
        let pool = self.pool(pool)?;
        swap::quote_swap(&pool, token_in, amount_in)
    }

    pub fn pool_status(&self, pool: &Pubkey) -> Result<PoolStatus, ExchangeError> {
        let pool = self.store.load::<Pool>(pool)?;
        Ok(PoolStatus::of(pool.as_ref()))
    }

    /// Checks the derived addresses and vault balances of `pool`.
    pub fn audit_pool(&self, pool: &Pubkey) -> Result<(), ExchangeError> {
        self.active_pool(pool).map(|_| ())
    }

    /// Loads `address` and refuses to go further while its vaults diverge
    /// from the recorded reserves.
    fn active_pool(&self, address: &Pubkey) -> Result<(Pool, PoolAddresses), ExchangeError> {
        let pool = self.pool(address)?;
        let addresses = registry::verify_addresses(&self.resolver, address, &pool)?;
        SettlementGuard::check_vaults(&self.custody, &pool)?;
        Ok((pool, addresses))
    }
}

fn already_registered(e: ExchangeError) -> ExchangeError {
    match e {
        ExchangeError::AlreadyInitialized => ExchangeError::AlreadyRegistered,
        other => other,
    }
}
