//! Seams to the hosting platform: persistent keyed storage and token custody.

use solana_program::pubkey::Pubkey;

use crate::address::DerivedAddress;
use crate::error::ExchangeError;
use crate::state::LedgerRecord;

/// Persistent storage of records keyed by derived address.
pub trait LedgerStore {
    /// `Ok(None)` when nothing is stored at `address`.
    fn load<T: LedgerRecord>(&self, address: &Pubkey) -> Result<Option<T>, ExchangeError>;

    /// Allocates storage at `address` and writes `record`. Fails with
    /// `AlreadyInitialized` if the address is taken.
    fn create<T: LedgerRecord>(
        &mut self,
        address: &DerivedAddress,
        record: &T,
    ) -> Result<(), ExchangeError>;

    /// Overwrites an existing record.
    fn save<T: LedgerRecord>(&mut self, address: &Pubkey, record: &T)
        -> Result<(), ExchangeError>;
}

/// Token vaults held under a derived authority.
///
/// Each movement is all-or-nothing: it is either fully reflected in the
/// vault balance or returns an error with nothing changed.
pub trait VaultCustody {
    /// Creates an empty vault for `mint` controlled by `authority`.
    fn open_vault(
        &mut self,
        vault: &DerivedAddress,
        authority: &Pubkey,
        mint: &Pubkey,
    ) -> Result<(), ExchangeError>;

    /// Closes an empty vault, signed by `authority`.
    fn close_vault(&mut self, authority: &DerivedAddress, vault: &Pubkey)
        -> Result<(), ExchangeError>;

    fn vault_balance(&self, vault: &Pubkey) -> Result<u64, ExchangeError>;

    /// Moves `amount` from `from`'s holding of the vault mint into `vault`.
    fn move_in(&mut self, vault: &Pubkey, from: &Pubkey, amount: u64)
        -> Result<(), ExchangeError>;

    /// Moves `amount` out of `vault` to `to`, signed by `authority`.
    fn move_out(
        &mut self,
        authority: &DerivedAddress,
        vault: &Pubkey,
        to: &Pubkey,
        amount: u64,
    ) -> Result<(), ExchangeError>;
}
