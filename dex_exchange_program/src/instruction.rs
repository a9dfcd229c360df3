#![allow(clippy::doc_lazy_continuation)]
use borsh::{BorshDeserialize, BorshSerialize};
use dex_settlement::{AddressResolver, PoolAddresses, PoolConfig, ProgramAddressResolver};
use solana_program::{
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_program,
};
use spl_associated_token_account::get_associated_token_address;

/// Defines the instructions available in the exchange program.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub enum ExchangeInstruction {
    /// Creates the admin's pool and both vaults.
    ///
    /// Accounts (expected):
    /// 0. [signer, writable] admin: pays for the new accounts
    /// 1. [writable] pool: PDA `["liquidity-pool", admin]`
    /// 2. [read]   authority: PDA `["auth", pool]`
    /// 3. [writable] vault A: PDA `["treasury-vault", authority, mint A]`
    /// 4. [writable] vault B: PDA `["treasury-vault", authority, mint B]`
    /// 5. [read]   mint A
    /// 6. [read]   mint B
    /// 7. [read]   system_program
    /// 8. [read]   token_program
    Init {
        token_a: Pubkey,
        token_b: Pubkey,
        decimals: u8,
        config: PoolConfig,
    },

    /// Creates the owner's zero-share provider record for a pool.
    ///
    /// Accounts:
    /// 0. [signer, writable] owner: pays for the record
    /// 1. [read]   pool
    /// 2. [writable] provider: PDA `["liquidity-provider", owner, pool]`
    /// 3. [read]   system_program
    RegisterLiquidityProvider,

    /// Creates the owner's trader record for a pool.
    ///
    /// Accounts:
    /// 0. [signer, writable] owner: pays for the record
    /// 1. [read]   pool
    /// 2. [writable] trader: PDA `["trader", owner, pool]`
    /// 3. [read]   system_program
    RegisterTrader,

    /// Deposits both tokens and mints shares to the provider record.
    ///
    /// Accounts:
    /// 0. [signer] owner
    /// 1. [writable] pool
    /// 2. [writable] provider record
    /// 3. [read]   authority
    /// 4. [writable] vault A
    /// 5. [writable] vault B
    /// 6. [writable] owner token A: owner's associated token account
    /// 7. [writable] owner token B: owner's associated token account
    /// 8. [read]   token_program
    AddLiquidity { amount_a: u64, amount_b: u64 },

    /// Burns shares and pays out both tokens. Accounts as `AddLiquidity`.
    RemoveLiquidity { shares: u64 },

    /// Swaps `amount_in` of `token_in` for the other pool token.
    /// Accounts as `AddLiquidity`, with the trader record at 2.
    Swap {
        token_in: Pubkey,
        amount_in: u64,
        /// Minimum amount of the output token the user must receive (slippage protection)
        min_amount_out: u64,
    },
}

/// Every account of a pool a client needs to build instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolAccounts {
    pub pool: Pubkey,
    pub authority: Pubkey,
    pub vault_a: Pubkey,
    pub vault_b: Pubkey,
    pub token_a: Pubkey,
    pub token_b: Pubkey,
}

impl PoolAccounts {
    pub fn derive(program_id: &Pubkey, admin: &Pubkey, token_a: &Pubkey, token_b: &Pubkey) -> Self {
        let resolver = ProgramAddressResolver::new(*program_id);
        let addresses = PoolAddresses::derive(&resolver, admin, token_a, token_b);
        Self {
            pool: addresses.pool.address,
            authority: addresses.authority.address,
            vault_a: addresses.vault_a.address,
            vault_b: addresses.vault_b.address,
            token_a: *token_a,
            token_b: *token_b,
        }
    }

    pub fn liquidity_provider(&self, program_id: &Pubkey, owner: &Pubkey) -> Pubkey {
        ProgramAddressResolver::new(*program_id)
            .liquidity_provider(owner, &self.pool)
            .address
    }

    pub fn trader(&self, program_id: &Pubkey, owner: &Pubkey) -> Pubkey {
        ProgramAddressResolver::new(*program_id)
            .trader(owner, &self.pool)
            .address
    }
}

fn instruction(
    program_id: &Pubkey,
    accounts: Vec<AccountMeta>,
    data: &ExchangeInstruction,
) -> Result<Instruction, ProgramError> {
    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data: data.try_to_vec()?,
    })
}

pub fn init(
    program_id: &Pubkey,
    admin: &Pubkey,
    token_a: &Pubkey,
    token_b: &Pubkey,
    decimals: u8,
    config: PoolConfig,
) -> Result<Instruction, ProgramError> {
    let keys = PoolAccounts::derive(program_id, admin, token_a, token_b);
    instruction(
        program_id,
        vec![
            AccountMeta::new(*admin, true),
            AccountMeta::new(keys.pool, false),
            AccountMeta::new_readonly(keys.authority, false),
            AccountMeta::new(keys.vault_a, false),
            AccountMeta::new(keys.vault_b, false),
            AccountMeta::new_readonly(*token_a, false),
            AccountMeta::new_readonly(*token_b, false),
            AccountMeta::new_readonly(system_program::id(), false),
            AccountMeta::new_readonly(spl_token::id(), false),
        ],
        &ExchangeInstruction::Init {
            token_a: *token_a,
            token_b: *token_b,
            decimals,
            config,
        },
    )
}

fn registration(
    program_id: &Pubkey,
    owner: &Pubkey,
    pool: &Pubkey,
    record: Pubkey,
    data: &ExchangeInstruction,
) -> Result<Instruction, ProgramError> {
    instruction(
        program_id,
        vec![
            AccountMeta::new(*owner, true),
            AccountMeta::new_readonly(*pool, false),
            AccountMeta::new(record, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data,
    )
}

pub fn register_liquidity_provider(
    program_id: &Pubkey,
    pool: &PoolAccounts,
    owner: &Pubkey,
) -> Result<Instruction, ProgramError> {
    registration(
        program_id,
        owner,
        &pool.pool,
        pool.liquidity_provider(program_id, owner),
        &ExchangeInstruction::RegisterLiquidityProvider,
    )
}

pub fn register_trader(
    program_id: &Pubkey,
    pool: &PoolAccounts,
    owner: &Pubkey,
) -> Result<Instruction, ProgramError> {
    registration(
        program_id,
        owner,
        &pool.pool,
        pool.trader(program_id, owner),
        &ExchangeInstruction::RegisterTrader,
    )
}

fn settlement(
    program_id: &Pubkey,
    pool: &PoolAccounts,
    owner: &Pubkey,
    record: Pubkey,
    data: &ExchangeInstruction,
) -> Result<Instruction, ProgramError> {
    instruction(
        program_id,
        vec![
            AccountMeta::new_readonly(*owner, true),
            AccountMeta::new(pool.pool, false),
            AccountMeta::new(record, false),
            AccountMeta::new_readonly(pool.authority, false),
            AccountMeta::new(pool.vault_a, false),
            AccountMeta::new(pool.vault_b, false),
            AccountMeta::new(get_associated_token_address(owner, &pool.token_a), false),
            AccountMeta::new(get_associated_token_address(owner, &pool.token_b), false),
            AccountMeta::new_readonly(spl_token::id(), false),
        ],
        data,
    )
}

pub fn add_liquidity(
    program_id: &Pubkey,
    pool: &PoolAccounts,
    owner: &Pubkey,
    amount_a: u64,
    amount_b: u64,
) -> Result<Instruction, ProgramError> {
    settlement(
        program_id,
        pool,
        owner,
        pool.liquidity_provider(program_id, owner),
        &ExchangeInstruction::AddLiquidity { amount_a, amount_b },
    )
}

pub fn remove_liquidity(
    program_id: &Pubkey,
    pool: &PoolAccounts,
    owner: &Pubkey,
    shares: u64,
) -> Result<Instruction, ProgramError> {
    settlement(
        program_id,
        pool,
        owner,
        pool.liquidity_provider(program_id, owner),
        &ExchangeInstruction::RemoveLiquidity { shares },
    )
}

pub fn swap(
    program_id: &Pubkey,
    pool: &PoolAccounts,
    owner: &Pubkey,
    token_in: &Pubkey,
    amount_in: u64,
    min_amount_out: u64,
) -> Result<Instruction, ProgramError> {
    settlement(
        program_id,
        pool,
        owner,
        pool.trader(program_id, owner),
        &ExchangeInstruction::Swap {
            token_in: *token_in,
            amount_in,
            min_amount_out,
        },
    )
}
