use borsh::BorshDeserialize;
use dex_settlement::{AddressResolver, Exchange, PoolConfig, ProgramAddressResolver};
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    entrypoint::ProgramResult,
    msg,
    program_error::ProgramError,
    program_pack::Pack,
    pubkey::Pubkey,
    system_program,
};
use spl_token::state::Mint;

use crate::accounts::{AccountLedger, TokenCustody};
use crate::error::AdapterError;
use crate::instruction::{ExchangeInstruction, PoolAccounts};

type Acc<'a, 'info> = &'a AccountInfo<'info>;

type ProgramExchange<'a, 'info> =
    Exchange<ProgramAddressResolver, AccountLedger<'a, 'info>, TokenCustody<'a, 'info>>;

/// Checks that the account is signer.
pub fn require_signer(account: &AccountInfo) -> ProgramResult {
    if !account.is_signer {
        msg!("Account {} did not sign", account.key);
        return Err(AdapterError::MissingRequiredSignature.into());
    }
    Ok(())
}

/// Checks that the account is the expected program.
pub fn validate_program_id(account: &AccountInfo, expected: &Pubkey) -> ProgramResult {
    if account.key != expected {
        msg!(
            "Program ID Error: Expected {}, got {}",
            expected,
            account.key
        );
        return Err(AdapterError::IncorrectProgramId.into());
    }
    Ok(())
}

/// Checks that the account sits at the address derived for it.
pub fn validate_derived(account: &AccountInfo, expected: &Pubkey) -> ProgramResult {
    if account.key != expected {
        msg!(
            "Address Error: Expected {}, got {}",
            expected,
            account.key
        );
        return Err(AdapterError::AccountMismatch.into());
    }
    Ok(())
}

/// Checks a pool mint against the init instruction.
pub fn validate_mint(account: &AccountInfo, expected: &Pubkey, decimals: u8) -> ProgramResult {
    if account.key != expected || account.owner != &spl_token::id() {
        msg!("Mint Error: Account {} is not mint {}", account.key, expected);
        return Err(AdapterError::MintMismatch.into());
    }
    let mint = Mint::unpack(&account.data.borrow()).map_err(|_| AdapterError::MintMismatch)?;
    if mint.decimals != decimals {
        msg!(
            "Mint Error: {} has {} decimals, expected {}",
            account.key,
            mint.decimals,
            decimals
        );
        return Err(AdapterError::MintMismatch.into());
    }
    Ok(())
}

/// Processes instructions for the exchange program.
pub struct Processor;
impl Processor {
    /// Main processing function dispatching to specific instruction handlers.
    pub fn process<'info>(
        program_id: &Pubkey,
        accounts: &[AccountInfo<'info>],
        instr_data: &[u8],
    ) -> ProgramResult {
        let instruction = ExchangeInstruction::try_from_slice(instr_data)
            .map_err(|_| AdapterError::InvalidInstructionData)?;

        match instruction {
            ExchangeInstruction::Init {
                token_a,
                token_b,
                decimals,
                config,
            } => Self::process_init(program_id, accounts, token_a, token_b, decimals, config),
            ExchangeInstruction::RegisterLiquidityProvider => {
                Self::process_register_liquidity_provider(program_id, accounts)
            }
            ExchangeInstruction::RegisterTrader => {
                Self::process_register_trader(program_id, accounts)
            }
            ExchangeInstruction::AddLiquidity { amount_a, amount_b } => {
                Self::process_add_liquidity(program_id, accounts, amount_a, amount_b)
            }
            ExchangeInstruction::RemoveLiquidity { shares } => {
                Self::process_remove_liquidity(program_id, accounts, shares)
            }
            ExchangeInstruction::Swap {
                token_in,
                amount_in,
                min_amount_out,
            } => Self::process_swap(program_id, accounts, token_in, amount_in, min_amount_out),
        }
    }

    fn exchange<'a, 'info>(
        program_id: &'a Pubkey,
        payer: &'a AccountInfo<'info>,
        accounts: &'a [AccountInfo<'info>],
    ) -> ProgramExchange<'a, 'info> {
        Exchange::new(
            ProgramAddressResolver::new(*program_id),
            AccountLedger::new(program_id, payer, accounts),
            TokenCustody::new(payer, accounts),
        )
    }

    fn process_init<'info>(
        program_id: &Pubkey,
        accounts: &[AccountInfo<'info>],
        token_a: Pubkey,
        token_b: Pubkey,
        decimals: u8,
        config: PoolConfig,
    ) -> ProgramResult {
        msg!("Exchange: Init");
        let acc_iter = &mut accounts.iter();
        let admin_acc = next_account_info(acc_iter)?; // 0
        let pool_acc = next_account_info(acc_iter)?; // 1
        let authority_acc = next_account_info(acc_iter)?; // 2
        let vault_a_acc = next_account_info(acc_iter)?; // 3
        let vault_b_acc = next_account_info(acc_iter)?; // 4
        let mint_a_acc = next_account_info(acc_iter)?; // 5
        let mint_b_acc = next_account_info(acc_iter)?; // 6
        let system_acc = next_account_info(acc_iter)?; // 7
        let token_prog_acc = next_account_info(acc_iter)?; // 8

        require_signer(admin_acc)?;
        validate_program_id(system_acc, &system_program::id())?;
        validate_program_id(token_prog_acc, &spl_token::id())?;
        validate_mint(mint_a_acc, &token_a, decimals)?;
        validate_mint(mint_b_acc, &token_b, decimals)?;

        let expected = PoolAccounts::derive(program_id, admin_acc.key, &token_a, &token_b);
        validate_derived(pool_acc, &expected.pool)?;
        validate_derived(authority_acc, &expected.authority)?;
        validate_derived(vault_a_acc, &expected.vault_a)?;
        validate_derived(vault_b_acc, &expected.vault_b)?;

        let mut exchange = Self::exchange(program_id, admin_acc, accounts);
        exchange.init(admin_acc.key, &token_a, &token_b, decimals, config)?;
        Ok(())
    }

    /// Owner, pool and record accounts of a registration, checked.
    fn registration_accounts<'a, 'info>(
        accounts: &'a [AccountInfo<'info>],
    ) -> Result<(Acc<'a, 'info>, Acc<'a, 'info>, Acc<'a, 'info>), ProgramError> {
        let acc_iter = &mut accounts.iter();
        let owner_acc = next_account_info(acc_iter)?; // 0
        let pool_acc = next_account_info(acc_iter)?; // 1
        let record_acc = next_account_info(acc_iter)?; // 2
        let system_acc = next_account_info(acc_iter)?; // 3

        require_signer(owner_acc)?;
        validate_program_id(system_acc, &system_program::id())?;
        Ok((owner_acc, pool_acc, record_acc))
    }

    fn process_register_liquidity_provider<'info>(
        program_id: &Pubkey,
        accounts: &[AccountInfo<'info>],
    ) -> ProgramResult {
        msg!("Exchange: RegisterLiquidityProvider");
        let (owner_acc, pool_acc, record_acc) = Self::registration_accounts(accounts)?;
        let resolver = ProgramAddressResolver::new(*program_id);
        validate_derived(
            record_acc,
            &resolver.liquidity_provider(owner_acc.key, pool_acc.key).address,
        )?;

        let mut exchange = Self::exchange(program_id, owner_acc, accounts);
        exchange.register_liquidity_provider(owner_acc.key, pool_acc.key)?;
        Ok(())
    }

    fn process_register_trader<'info>(
        program_id: &Pubkey,
        accounts: &[AccountInfo<'info>],
    ) -> ProgramResult {
        msg!("Exchange: RegisterTrader");
        let (owner_acc, pool_acc, record_acc) = Self::registration_accounts(accounts)?;
        let resolver = ProgramAddressResolver::new(*program_id);
        validate_derived(
            record_acc,
            &resolver.trader(owner_acc.key, pool_acc.key).address,
        )?;

        let mut exchange = Self::exchange(program_id, owner_acc, accounts);
        exchange.register_trader(owner_acc.key, pool_acc.key)?;
        Ok(())
    }

    /// Owner and member record accounts of a settlement, checked. Vaults,
    /// authority and token accounts are found by derived key.
    fn settlement_accounts<'a, 'info>(
        accounts: &'a [AccountInfo<'info>],
    ) -> Result<(Acc<'a, 'info>, Acc<'a, 'info>), ProgramError> {
        let acc_iter = &mut accounts.iter();
        let owner_acc = next_account_info(acc_iter)?; // 0
        let _pool_acc = next_account_info(acc_iter)?; // 1
        let record_acc = next_account_info(acc_iter)?; // 2
        let _authority_acc = next_account_info(acc_iter)?; // 3
        let _vault_a_acc = next_account_info(acc_iter)?; // 4
        let _vault_b_acc = next_account_info(acc_iter)?; // 5
        let _owner_token_a_acc = next_account_info(acc_iter)?; // 6
        let _owner_token_b_acc = next_account_info(acc_iter)?; // 7
        let token_prog_acc = next_account_info(acc_iter)?; // 8

        require_signer(owner_acc)?;
        validate_program_id(token_prog_acc, &spl_token::id())?;
        Ok((owner_acc, record_acc))
    }

    fn process_add_liquidity<'info>(
        program_id: &Pubkey,
        accounts: &[AccountInfo<'info>],
        amount_a: u64,
        amount_b: u64,
    ) -> ProgramResult {
        msg!("Exchange: AddLiquidity ({}, {})", amount_a, amount_b);
        let (owner_acc, record_acc) = Self::settlement_accounts(accounts)?;
        let mut exchange = Self::exchange(program_id, owner_acc, accounts);
        let shares = exchange.add_liquidity(owner_acc.key, record_acc.key, amount_a, amount_b)?;
        msg!("Exchange: minted {} shares", shares);
        Ok(())
    }

    fn process_remove_liquidity<'info>(
        program_id: &Pubkey,
        accounts: &[AccountInfo<'info>],
        shares: u64,
    ) -> ProgramResult {
        msg!("Exchange: RemoveLiquidity {}", shares);
        let (owner_acc, record_acc) = Self::settlement_accounts(accounts)?;
        let mut exchange = Self::exchange(program_id, owner_acc, accounts);
        let (amount_a, amount_b) =
            exchange.remove_liquidity(owner_acc.key, record_acc.key, shares)?;
        msg!("Exchange: paid out ({}, {})", amount_a, amount_b);
        Ok(())
    }

    fn process_swap<'info>(
        program_id: &Pubkey,
        accounts: &[AccountInfo<'info>],
        token_in: Pubkey,
        amount_in: u64,
        min_amount_out: u64,
    ) -> ProgramResult {
        msg!("Exchange: Swap {} of {}", amount_in, token_in);
        let (owner_acc, record_acc) = Self::settlement_accounts(accounts)?;
        let mut exchange = Self::exchange(program_id, owner_acc, accounts);
        let amount_out = exchange.swap_with_limit(
            owner_acc.key,
            record_acc.key,
            &token_in,
            amount_in,
            min_amount_out,
        )?;
        msg!("Exchange: swapped for {}", amount_out);
        Ok(())
    }
}
