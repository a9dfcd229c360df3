//! In-memory host: a record store and token custody backed by ordered maps.
//!
//! Used by the core's own tests and by anything that wants to run the
//! exchange without a chain.

use std::collections::BTreeMap;

use solana_program::{msg, pubkey::Pubkey};

use crate::address::DerivedAddress;
use crate::custody::{LedgerStore, VaultCustody};
use crate::error::ExchangeError;
use crate::state::{LedgerRecord, LiquidityProvider};

/// Borsh-encoded records keyed by address.
#[derive(Debug, Default, Clone)]
pub struct MemoryLedger {
    records: BTreeMap<Pubkey, Vec<u8>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Every provider record of `pool`, with its address.
    pub fn providers_of(&self, pool: &Pubkey) -> Vec<(Pubkey, LiquidityProvider)> {
        self.records
            .iter()
            .filter_map(|(address, bytes)| {
                LiquidityProvider::decode(bytes)
                    .ok()
                    .filter(|provider| &provider.pool == pool)
                    .map(|provider| (*address, provider))
            })
            .collect()
    }

    pub fn total_provider_shares(&self, pool: &Pubkey) -> u128 {
        self.providers_of(pool)
            .iter()
            .map(|(_, provider)| u128::from(provider.shares))
            .sum()
    }
}

impl LedgerStore for MemoryLedger {
    fn load<T: LedgerRecord>(&self, address: &Pubkey) -> Result<Option<T>, ExchangeError> {
        self.records
            .get(address)
            .map(|bytes| T::decode(bytes))
            .transpose()
    }

    fn create<T: LedgerRecord>(
        &mut self,
        address: &DerivedAddress,
        record: &T,
    ) -> Result<(), ExchangeError> {
        if self.records.contains_key(&address.address) {
            return Err(ExchangeError::AlreadyInitialized);
        }
        self.records.insert(address.address, record.encode()?);
        Ok(())
    }

    fn save<T: LedgerRecord>(&mut self, address: &Pubkey, record: &T) -> Result<(), ExchangeError> {
        let slot = self
            .records
            .get_mut(address)
            .ok_or(ExchangeError::InvalidRecord)?;
        T::decode(slot)?;
        *slot = record.encode()?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Vault {
    mint: Pubkey,
    authority: Pubkey,
    balance: u64,
}

/// Token balances of vaults and of user principals, per mint.
#[derive(Debug, Default, Clone)]
pub struct MemoryCustody {
    vaults: BTreeMap<Pubkey, Vault>,
    holdings: BTreeMap<(Pubkey, Pubkey), u64>,
}

impl MemoryCustody {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credits `owner` with `amount` of `mint`.
    pub fn fund(&mut self, owner: &Pubkey, mint: &Pubkey, amount: u64) {
        let holding = self.holdings.entry((*owner, *mint)).or_insert(0);
        *holding = holding.saturating_add(amount);
    }

    pub fn holding(&self, owner: &Pubkey, mint: &Pubkey) -> u64 {
        self.holdings.get(&(*owner, *mint)).copied().unwrap_or(0)
    }

    /// Sends tokens straight to a vault without going through the
    /// exchange, as any token holder can.
    pub fn transfer_to_vault(
        &mut self,
        from: &Pubkey,
        vault: &Pubkey,
        amount: u64,
    ) -> Result<(), ExchangeError> {
        self.move_in(vault, from, amount)
    }

    fn vault_mut(&mut self, vault: &Pubkey) -> Result<&mut Vault, ExchangeError> {
        self.vaults.get_mut(vault).ok_or(ExchangeError::VaultMismatch)
    }
}

impl VaultCustody for MemoryCustody {
    fn open_vault(
        &mut self,
        vault: &DerivedAddress,
        authority: &Pubkey,
        mint: &Pubkey,
    ) -> Result<(), ExchangeError> {
        if self.vaults.contains_key(&vault.address) {
            return Err(ExchangeError::AlreadyInitialized);
        }
        self.vaults.insert(
            vault.address,
            Vault {
                mint: *mint,
                authority: *authority,
                balance: 0,
            },
        );
        Ok(())
    }

    fn close_vault(&mut self, authority: &DerivedAddress, vault: &Pubkey) -> Result<(), ExchangeError> {
        let target = self.vault_mut(vault)?;
        if target.authority != authority.address {
            return Err(ExchangeError::Unauthorized);
        }
        if target.balance != 0 {
            return Err(ExchangeError::CustodyRejected);
        }
        self.vaults.remove(vault);
        Ok(())
    }

    fn vault_balance(&self, vault: &Pubkey) -> Result<u64, ExchangeError> {
        self.vaults
            .get(vault)
            .map(|v| v.balance)
            .ok_or(ExchangeError::VaultMismatch)
    }

    fn move_in(&mut self, vault: &Pubkey, from: &Pubkey, amount: u64) -> Result<(), ExchangeError> {
        let mint = self.vault_mut(vault)?.mint;
        let available = self.holding(from, &mint);
        if available < amount {
            msg!("Custody: {} holds {} of {}, needs {}", from, available, mint, amount);
            return Err(ExchangeError::CustodyRejected);
        }
        let target = self.vault_mut(vault)?;
        target.balance = target
            .balance
            .checked_add(amount)
            .ok_or(ExchangeError::ArithmeticOverflow)?;
        self.holdings.insert((*from, mint), available - amount);
        Ok(())
    }

    fn move_out(
        &mut self,
        authority: &DerivedAddress,
        vault: &Pubkey,
        to: &Pubkey,
        amount: u64,
    ) -> Result<(), ExchangeError> {
        let source = self.vault_mut(vault)?;
        if source.authority != authority.address {
            return Err(ExchangeError::Unauthorized);
        }
        if source.balance < amount {
            return Err(ExchangeError::CustodyRejected);
        }
        source.balance -= amount;
        let mint = source.mint;
        self.fund(to, &mint, amount);
        Ok(())
    }
}
