//! Account-backed storage and SPL token custody for the exchange.
//!
//! Both look accounts up by key among those passed to the instruction, so
//! the exchange can derive an address and find it without caring where the
//! client placed it in the account list.

use dex_settlement::{
    state::LedgerRecord, DerivedAddress, ExchangeError, LedgerStore, VaultCustody,
};
use solana_program::{
    account_info::AccountInfo,
    msg,
    program::{invoke, invoke_signed},
    program_error::ProgramError,
    program_pack::Pack,
    pubkey::Pubkey,
    system_instruction, system_program,
    sysvar::{rent::Rent, Sysvar},
};
use spl_associated_token_account::get_associated_token_address;
use spl_token::state::{Account as TokenAccount, AccountState};

pub fn find_account<'a, 'info>(
    accounts: &'a [AccountInfo<'info>],
    key: &Pubkey,
) -> Option<&'a AccountInfo<'info>> {
    accounts.iter().find(|account| account.key == key)
}

/// True for an address the system program has never allocated.
pub fn is_unallocated(account: &AccountInfo) -> bool {
    account.owner == &system_program::id() && account.data_is_empty()
}

fn rejected(context: &str, e: ProgramError, as_error: ExchangeError) -> ExchangeError {
    msg!("{}: {}", context, e);
    as_error
}

/// Creates `target` at a derived address, rent exempt, owned by `owner`.
fn allocate<'info>(
    payer: &AccountInfo<'info>,
    target: &AccountInfo<'info>,
    system_program: &AccountInfo<'info>,
    space: usize,
    owner: &Pubkey,
    address: &DerivedAddress,
) -> Result<(), ProgramError> {
    let lamports = Rent::get()?.minimum_balance(space);
    let seeds = address.signer_seeds();
    invoke_signed(
        &system_instruction::create_account(payer.key, target.key, lamports, space as u64, owner),
        &[payer.clone(), target.clone(), system_program.clone()],
        &[seeds.as_slice()],
    )
}

/// Records stored as borsh bytes in accounts owned by this program.
pub struct AccountLedger<'a, 'info> {
    program_id: &'a Pubkey,
    payer: &'a AccountInfo<'info>,
    accounts: &'a [AccountInfo<'info>],
}

impl<'a, 'info> AccountLedger<'a, 'info> {
    pub fn new(
        program_id: &'a Pubkey,
        payer: &'a AccountInfo<'info>,
        accounts: &'a [AccountInfo<'info>],
    ) -> Self {
        Self {
            program_id,
            payer,
            accounts,
        }
    }

    fn account(&self, key: &Pubkey) -> Result<&'a AccountInfo<'info>, ExchangeError> {
        find_account(self.accounts, key).ok_or_else(|| {
            msg!("Ledger: account {} not supplied", key);
            ExchangeError::InvalidRecord
        })
    }

    fn owned(&self, key: &Pubkey) -> Result<&'a AccountInfo<'info>, ExchangeError> {
        let account = self.account(key)?;
        if account.owner != self.program_id {
            msg!("Ledger: account {} owned by {}", key, account.owner);
            return Err(ExchangeError::InvalidRecord);
        }
        Ok(account)
    }

    fn write<T: LedgerRecord>(account: &AccountInfo, record: &T) -> Result<(), ExchangeError> {
        let bytes = record.encode()?;
        let mut data = account
            .try_borrow_mut_data()
            .map_err(|e| rejected("Ledger: borrow", e, ExchangeError::InvalidRecord))?;
        if data.len() != bytes.len() {
            return Err(ExchangeError::InvalidRecord);
        }
        data.copy_from_slice(&bytes);
        Ok(())
    }
}

impl LedgerStore for AccountLedger<'_, '_> {
    fn load<T: LedgerRecord>(&self, address: &Pubkey) -> Result<Option<T>, ExchangeError> {
        let account = self.account(address)?;
        if is_unallocated(account) {
            return Ok(None);
        }
        let account = self.owned(address)?;
        let data = account
            .try_borrow_data()
            .map_err(|e| rejected("Ledger: borrow", e, ExchangeError::InvalidRecord))?;
        T::decode(&data).map(Some)
    }

    fn create<T: LedgerRecord>(
        &mut self,
        address: &DerivedAddress,
        record: &T,
    ) -> Result<(), ExchangeError> {
        let account = self.account(&address.address)?;
        if !is_unallocated(account) {
            return Err(ExchangeError::AlreadyInitialized);
        }
        let system = self.account(&system_program::id())?;
        allocate(
            self.payer,
            account,
            system,
            T::space(),
            self.program_id,
            address,
        )
        .map_err(|e| rejected("Ledger: create_account", e, ExchangeError::InvalidRecord))?;
        Self::write(account, record)
    }

    fn save<T: LedgerRecord>(&mut self, address: &Pubkey, record: &T) -> Result<(), ExchangeError> {
        let account = self.owned(address)?;
        {
            let data = account
                .try_borrow_data()
                .map_err(|e| rejected("Ledger: borrow", e, ExchangeError::InvalidRecord))?;
            T::decode(&data)?;
        }
        Self::write(account, record)
    }
}

/// Vaults as SPL token accounts owned by the pool authority. User funds
/// move through the user's associated token account for the vault's mint.
pub struct TokenCustody<'a, 'info> {
    payer: &'a AccountInfo<'info>,
    accounts: &'a [AccountInfo<'info>],
}

impl<'a, 'info> TokenCustody<'a, 'info> {
    pub fn new(payer: &'a AccountInfo<'info>, accounts: &'a [AccountInfo<'info>]) -> Self {
        Self { payer, accounts }
    }

    fn account(&self, key: &Pubkey) -> Result<&'a AccountInfo<'info>, ExchangeError> {
        find_account(self.accounts, key).ok_or_else(|| {
            msg!("Custody: account {} not supplied", key);
            ExchangeError::CustodyRejected
        })
    }

    fn vault_state(&self, vault: &Pubkey) -> Result<TokenAccount, ExchangeError> {
        let account = find_account(self.accounts, vault).ok_or(ExchangeError::VaultMismatch)?;
        if account.owner != &spl_token::id() {
            msg!("Vault Error: Account {} owned by {}", vault, account.owner);
            return Err(ExchangeError::VaultMismatch);
        }
        let data = account
            .try_borrow_data()
            .map_err(|e| rejected("Vault Error: borrow", e, ExchangeError::VaultMismatch))?;
        let state = TokenAccount::unpack(&data)
            .map_err(|e| rejected("Vault Error: unpack", e, ExchangeError::VaultMismatch))?;
        if state.state != AccountState::Initialized {
            msg!("Vault Error: Account {} is not initialized", vault);
            return Err(ExchangeError::VaultMismatch);
        }
        Ok(state)
    }
}

impl VaultCustody for TokenCustody<'_, '_> {
    fn open_vault(
        &mut self,
        vault: &DerivedAddress,
        authority: &Pubkey,
        mint: &Pubkey,
    ) -> Result<(), ExchangeError> {
        let vault_acc = self.account(&vault.address)?;
        if !is_unallocated(vault_acc) {
            return Err(ExchangeError::AlreadyInitialized);
        }
        let mint_acc = self.account(mint)?;
        let system = self.account(&system_program::id())?;
        let token_program = self.account(&spl_token::id())?;

        allocate(
            self.payer,
            vault_acc,
            system,
            TokenAccount::LEN,
            &spl_token::id(),
            vault,
        )
        .map_err(|e| rejected("Custody: create vault", e, ExchangeError::CustodyRejected))?;

        let ix = spl_token::instruction::initialize_account3(
            &spl_token::id(),
            vault_acc.key,
            mint,
            authority,
        )
        .map_err(|e| rejected("Custody: init vault", e, ExchangeError::CustodyRejected))?;
        invoke(
            &ix,
            &[vault_acc.clone(), mint_acc.clone(), token_program.clone()],
        )
        .map_err(|e| rejected("Custody: init vault", e, ExchangeError::CustodyRejected))
    }

    fn close_vault(&mut self, authority: &DerivedAddress, vault: &Pubkey) -> Result<(), ExchangeError> {
        let state = self.vault_state(vault)?;
        if state.owner != authority.address {
            msg!("Vault Error: {} is not controlled by {}", vault, authority.address);
            return Err(ExchangeError::Unauthorized);
        }
        let authority_acc = self.account(&authority.address)?;
        let vault_acc = self.account(vault)?;
        let token_program = self.account(&spl_token::id())?;

        // Rent goes back to whoever paid for the vault.
        let ix = spl_token::instruction::close_account(
            &spl_token::id(),
            vault,
            self.payer.key,
            &authority.address,
            &[],
        )
        .map_err(|e| rejected("Custody: close vault", e, ExchangeError::CustodyRejected))?;
        let seeds = authority.signer_seeds();
        invoke_signed(
            &ix,
            &[
                vault_acc.clone(),
                self.payer.clone(),
                authority_acc.clone(),
                token_program.clone(),
            ],
            &[seeds.as_slice()],
        )
        .map_err(|e| rejected("Custody: close vault", e, ExchangeError::CustodyRejected))
    }

    fn vault_balance(&self, vault: &Pubkey) -> Result<u64, ExchangeError> {
        Ok(self.vault_state(vault)?.amount)
    }

    fn move_in(&mut self, vault: &Pubkey, from: &Pubkey, amount: u64) -> Result<(), ExchangeError> {
        let mint = self.vault_state(vault)?.mint;
        let source = self.account(&get_associated_token_address(from, &mint))?;
        let owner = self.account(from)?;
        let vault_acc = self.account(vault)?;
        let token_program = self.account(&spl_token::id())?;

        let ix = spl_token::instruction::transfer(
            &spl_token::id(),
            source.key,
            vault_acc.key,
            from,
            &[],
            amount,
        )
        .map_err(|e| rejected("Custody: transfer in", e, ExchangeError::CustodyRejected))?;
        invoke(
            &ix,
            &[
                source.clone(),
                vault_acc.clone(),
                owner.clone(),
                token_program.clone(),
            ],
        )
        .map_err(|e| rejected("Custody: transfer in", e, ExchangeError::CustodyRejected))
    }

    fn move_out(
        &mut self,
        authority: &DerivedAddress,
        vault: &Pubkey,
        to: &Pubkey,
        amount: u64,
    ) -> Result<(), ExchangeError> {
        let state = self.vault_state(vault)?;
        if state.owner != authority.address {
            msg!("Vault Error: {} is not controlled by {}", vault, authority.address);
            return Err(ExchangeError::Unauthorized);
        }
        let destination = self.account(&get_associated_token_address(to, &state.mint))?;
        let authority_acc = self.account(&authority.address)?;
        let vault_acc = self.account(vault)?;
        let token_program = self.account(&spl_token::id())?;

        let ix = spl_token::instruction::transfer(
            &spl_token::id(),
            vault_acc.key,
            destination.key,
            &authority.address,
            &[],
            amount,
        )
        .map_err(|e| rejected("Custody: transfer out", e, ExchangeError::CustodyRejected))?;
        let seeds = authority.signer_seeds();
        invoke_signed(
            &ix,
            &[
                vault_acc.clone(),
                destination.clone(),
                authority_acc.clone(),
                token_program.clone(),
            ],
            &[seeds.as_slice()],
        )
        .map_err(|e| rejected("Custody: transfer out", e, ExchangeError::CustodyRejected))
    }
}
