use {
    dex_exchange_program::{
        instruction::{self, PoolAccounts},
        processor::Processor,
    },
    dex_settlement::{
        state::LedgerRecord, ExchangeError, InitialSharePolicy, LiquidityProvider, Pool,
        PoolConfig, Trader,
    },
    solana_program_test::{processor, BanksClientError, ProgramTest, ProgramTestContext},
    solana_sdk::{
        instruction::{Instruction, InstructionError},
        program_pack::Pack,
        pubkey::Pubkey,
        signature::Signer,
        signer::keypair::Keypair,
        system_instruction,
        transaction::{Transaction, TransactionError},
    },
    spl_associated_token_account::{
        get_associated_token_address, instruction::create_associated_token_account,
    },
    spl_token::state::{Account as TokenAccount, Mint},
    std::error::Error,
};

const DECIMALS: u8 = 6;
const USER_LAMPORTS: u64 = 1_000_000_000;

// Common setup for every test: a running bank, two mints and an
// initialized pool.
struct TestSetup {
    context: ProgramTestContext,
    program_id: Pubkey,
    admin: Keypair,
    mint_authority: Keypair,
    pool: PoolAccounts,
}

// Sends a transaction paid by the context payer. A fresh blockhash keeps
// repeated instructions from being deduplicated.
async fn process(
    context: &mut ProgramTestContext,
    instructions: &[Instruction],
    signers: &[&Keypair],
) -> Result<(), BanksClientError> {
    let blockhash = context.get_new_latest_blockhash().await?;
    let mut all_signers = vec![&context.payer];
    all_signers.extend_from_slice(signers);
    let tx = Transaction::new_signed_with_payer(
        instructions,
        Some(&context.payer.pubkey()),
        &all_signers,
        blockhash,
    );
    context.banks_client.process_transaction(tx).await
}

// Helper function to create mint accounts
async fn create_mint(
    context: &mut ProgramTestContext,
    mint_authority: &Pubkey,
    decimals: u8,
) -> Result<Pubkey, Box<dyn Error>> {
    let mint_kp = Keypair::new();
    let rent = context.banks_client.get_rent().await?;
    let create_ix = system_instruction::create_account(
        &context.payer.pubkey(),
        &mint_kp.pubkey(),
        rent.minimum_balance(Mint::LEN),
        Mint::LEN as u64,
        &spl_token::id(),
    );
    let init_ix = spl_token::instruction::initialize_mint2(
        &spl_token::id(),
        &mint_kp.pubkey(),
        mint_authority,
        None,
        decimals,
    )?;
    process(context, &[create_ix, init_ix], &[&mint_kp]).await?;
    Ok(mint_kp.pubkey())
}

fn assert_exchange_error(result: Result<(), BanksClientError>, expected: ExchangeError) {
    let err = result.expect_err("transaction should have failed");
    assert_eq!(
        err.unwrap(),
        TransactionError::InstructionError(0, InstructionError::Custom(expected as u32))
    );
}

impl TestSetup {
    async fn new(config: PoolConfig) -> Result<Self, Box<dyn Error>> {
        let program_id = Pubkey::new_unique();
        let program_test = ProgramTest::new(
            "dex_exchange_program",
            program_id,
            processor!(Processor::process),
        );
        let mut context = program_test.start_with_context().await;

        let admin = Keypair::new();
        let mint_authority = Keypair::new();
        let fund_ix =
            system_instruction::transfer(&context.payer.pubkey(), &admin.pubkey(), USER_LAMPORTS);
        process(&mut context, &[fund_ix], &[]).await?;

        let mint_a = create_mint(&mut context, &mint_authority.pubkey(), DECIMALS).await?;
        let mint_b = create_mint(&mut context, &mint_authority.pubkey(), DECIMALS).await?;
        let pool = PoolAccounts::derive(&program_id, &admin.pubkey(), &mint_a, &mint_b);

        let mut setup = Self {
            context,
            program_id,
            admin,
            mint_authority,
            pool,
        };
        setup.init(config).await?;
        Ok(setup)
    }

    async fn init(&mut self, config: PoolConfig) -> Result<(), BanksClientError> {
        let ix = instruction::init(
            &self.program_id,
            &self.admin.pubkey(),
            &self.pool.token_a,
            &self.pool.token_b,
            DECIMALS,
            config,
        )
        .expect("init instruction");
        let admin = self.admin.insecure_clone();
        process(&mut self.context, &[ix], &[&admin]).await
    }

    /// A funded user with token accounts for both mints holding the given
    /// amounts.
    async fn create_user(&mut self, amount_a: u64, amount_b: u64) -> Result<Keypair, Box<dyn Error>> {
        let user = Keypair::new();
        let payer = self.context.payer.pubkey();
        let mut ixs = vec![system_instruction::transfer(
            &payer,
            &user.pubkey(),
            USER_LAMPORTS,
        )];
        for (mint, amount) in [(self.pool.token_a, amount_a), (self.pool.token_b, amount_b)] {
            ixs.push(create_associated_token_account(
                &payer,
                &user.pubkey(),
                &mint,
                &spl_token::id(),
            ));
            if amount > 0 {
                ixs.push(spl_token::instruction::mint_to(
                    &spl_token::id(),
                    &mint,
                    &get_associated_token_address(&user.pubkey(), &mint),
                    &self.mint_authority.pubkey(),
                    &[],
                    amount,
                )?);
            }
        }
        let mint_authority = self.mint_authority.insecure_clone();
        process(&mut self.context, &ixs, &[&mint_authority]).await?;
        Ok(user)
    }

    async fn send(&mut self, ix: Instruction, signer: &Keypair) -> Result<(), BanksClientError> {
        process(&mut self.context, &[ix], &[signer]).await
    }

    async fn register_provider(&mut self, owner: &Keypair) -> Result<(), BanksClientError> {
        let ix = instruction::register_liquidity_provider(&self.program_id, &self.pool, &owner.pubkey())
            .expect("register instruction");
        self.send(ix, owner).await
    }

    async fn register_trader(&mut self, owner: &Keypair) -> Result<(), BanksClientError> {
        let ix = instruction::register_trader(&self.program_id, &self.pool, &owner.pubkey())
            .expect("register instruction");
        self.send(ix, owner).await
    }

    async fn add_liquidity(
        &mut self,
        owner: &Keypair,
        amount_a: u64,
        amount_b: u64,
    ) -> Result<(), BanksClientError> {
        let ix = instruction::add_liquidity(
            &self.program_id,
            &self.pool,
            &owner.pubkey(),
            amount_a,
            amount_b,
        )
        .expect("add_liquidity instruction");
        self.send(ix, owner).await
    }

    async fn remove_liquidity(&mut self, owner: &Keypair, shares: u64) -> Result<(), BanksClientError> {
        let ix = instruction::remove_liquidity(&self.program_id, &self.pool, &owner.pubkey(), shares)
            .expect("remove_liquidity instruction");
        self.send(ix, owner).await
    }

    async fn swap(
        &mut self,
        owner: &Keypair,
        token_in: &Pubkey,
        amount_in: u64,
        min_amount_out: u64,
    ) -> Result<(), BanksClientError> {
        let ix = instruction::swap(
            &self.program_id,
            &self.pool,
            &owner.pubkey(),
            token_in,
            amount_in,
            min_amount_out,
        )
        .expect("swap instruction");
        self.send(ix, owner).await
    }

    /// A provider that registered and deposited everything they hold.
    async fn funded_provider(&mut self, amount_a: u64, amount_b: u64) -> Result<Keypair, Box<dyn Error>> {
        let provider = self.create_user(amount_a, amount_b).await?;
        self.register_provider(&provider).await?;
        self.add_liquidity(&provider, amount_a, amount_b).await?;
        Ok(provider)
    }

    async fn record<T: LedgerRecord>(&mut self, address: &Pubkey) -> Result<T, Box<dyn Error>> {
        let account = self
            .context
            .banks_client
            .get_account(*address)
            .await?
            .ok_or("record account missing")?;
        assert_eq!(account.owner, self.program_id);
        Ok(T::decode(&account.data)?)
    }

    async fn pool_state(&mut self) -> Result<Pool, Box<dyn Error>> {
        let address = self.pool.pool;
        self.record(&address).await
    }

    async fn provider_state(&mut self, owner: &Keypair) -> Result<LiquidityProvider, Box<dyn Error>> {
        let address = self.pool.liquidity_provider(&self.program_id, &owner.pubkey());
        self.record(&address).await
    }

    async fn trader_state(&mut self, owner: &Keypair) -> Result<Trader, Box<dyn Error>> {
        let address = self.pool.trader(&self.program_id, &owner.pubkey());
        self.record(&address).await
    }

    // Helper to get token account balance
    async fn token_balance(&mut self, address: &Pubkey) -> Result<u64, Box<dyn Error>> {
        Ok(match self.context.banks_client.get_account(*address).await? {
            Some(account) => TokenAccount::unpack(&account.data)?.amount,
            None => 0,
        })
    }

    async fn holdings(&mut self, owner: &Keypair) -> Result<(u64, u64), Box<dyn Error>> {
        let ata_a = get_associated_token_address(&owner.pubkey(), &self.pool.token_a);
        let ata_b = get_associated_token_address(&owner.pubkey(), &self.pool.token_b);
        Ok((self.token_balance(&ata_a).await?, self.token_balance(&ata_b).await?))
    }

    async fn vault_balances(&mut self) -> Result<(u64, u64), Box<dyn Error>> {
        let (vault_a, vault_b) = (self.pool.vault_a, self.pool.vault_b);
        Ok((self.token_balance(&vault_a).await?, self.token_balance(&vault_b).await?))
    }

    /// Reserves match the vaults and the pool record is consistent.
    async fn assert_settled(&mut self, reserve_a: u64, reserve_b: u64, total_shares: u64) -> Result<(), Box<dyn Error>> {
        let pool = self.pool_state().await?;
        assert_eq!(
            (pool.reserve_a, pool.reserve_b, pool.total_shares),
            (reserve_a, reserve_b, total_shares)
        );
        assert_eq!(self.vault_balances().await?, (reserve_a, reserve_b));
        Ok(())
    }
}

fn no_fee() -> PoolConfig {
    PoolConfig::default().with_fee_bps(0)
}

#[tokio::test]
async fn test_init_creates_pool_and_vaults() -> Result<(), Box<dyn Error>> {
    let mut setup = TestSetup::new(PoolConfig::default()).await?;

    let pool = setup.pool_state().await?;
    assert_eq!(pool.admin, setup.admin.pubkey());
    assert_eq!(pool.token_a, setup.pool.token_a);
    assert_eq!(pool.token_b, setup.pool.token_b);
    assert_eq!(pool.decimals, DECIMALS);
    assert_eq!(pool.config, PoolConfig::default());
    assert_eq!(pool.vault_authority, setup.pool.authority);
    assert_eq!((pool.vault_a, pool.vault_b), (setup.pool.vault_a, setup.pool.vault_b));
    assert!(pool.is_empty());

    for (vault, mint) in [
        (setup.pool.vault_a, setup.pool.token_a),
        (setup.pool.vault_b, setup.pool.token_b),
    ] {
        let account = setup
            .context
            .banks_client
            .get_account(vault)
            .await?
            .ok_or("vault missing")?;
        assert_eq!(account.owner, spl_token::id());
        let state = TokenAccount::unpack(&account.data)?;
        assert_eq!(state.mint, mint);
        assert_eq!(state.owner, setup.pool.authority);
        assert_eq!(state.amount, 0);
    }

    // The config is fixed at init; a second init is refused.
    assert_exchange_error(
        setup.init(no_fee()).await,
        ExchangeError::AlreadyInitialized,
    );
    assert_eq!(setup.pool_state().await?.config, PoolConfig::default());
    Ok(())
}

#[tokio::test]
async fn test_init_rejects_identical_tokens() -> Result<(), Box<dyn Error>> {
    let mut setup = TestSetup::new(PoolConfig::default()).await?;
    let mint = setup.pool.token_a;
    let ix = instruction::init(
        &setup.program_id,
        &setup.admin.pubkey(),
        &mint,
        &mint,
        DECIMALS,
        PoolConfig::default(),
    )?;
    let admin = setup.admin.insecure_clone();
    // The pool address for (mint, mint) is the admin's existing pool.
    assert_exchange_error(setup.send(ix, &admin).await, ExchangeError::AlreadyInitialized);

    let other_admin = setup.create_user(0, 0).await?;
    let ix = instruction::init(
        &setup.program_id,
        &other_admin.pubkey(),
        &mint,
        &mint,
        DECIMALS,
        PoolConfig::default(),
    )?;
    assert_exchange_error(setup.send(ix, &other_admin).await, ExchangeError::InvalidToken);
    Ok(())
}

#[tokio::test]
async fn test_registration() -> Result<(), Box<dyn Error>> {
    let mut setup = TestSetup::new(PoolConfig::default()).await?;
    let user = setup.create_user(0, 0).await?;

    setup.register_provider(&user).await?;
    let provider = setup.provider_state(&user).await?;
    assert_eq!(provider.owner, user.pubkey());
    assert_eq!(provider.pool, setup.pool.pool);
    assert_eq!(provider.shares, 0);

    setup.register_trader(&user).await?;
    let trader = setup.trader_state(&user).await?;
    assert_eq!(trader.owner, user.pubkey());
    assert_eq!((trader.volume_in, trader.volume_out, trader.swap_count), (0, 0, 0));

    assert_exchange_error(
        setup.register_provider(&user).await,
        ExchangeError::AlreadyRegistered,
    );
    assert_exchange_error(
        setup.register_trader(&user).await,
        ExchangeError::AlreadyRegistered,
    );
    Ok(())
}

#[tokio::test]
async fn test_scenarios_deposit_then_swaps() -> Result<(), Box<dyn Error>> {
    let mut setup = TestSetup::new(no_fee()).await?;
    let token_a = setup.pool.token_a;

    // Scenario A: two deposits at the same ratio.
    let first = setup.funded_provider(10, 10).await?;
    let second = setup.funded_provider(20, 20).await?;
    assert_eq!(setup.provider_state(&first).await?.shares, 10);
    assert_eq!(setup.provider_state(&second).await?.shares, 20);
    assert_eq!(setup.holdings(&first).await?, (0, 0));
    setup.assert_settled(30, 30, 30).await?;

    // Scenario B: 2 of A in.
    let trader_one = setup.create_user(2, 0).await?;
    setup.register_trader(&trader_one).await?;
    setup.swap(&trader_one, &token_a, 2, 1).await?;
    assert_eq!(setup.holdings(&trader_one).await?, (0, 1));
    setup.assert_settled(32, 29, 30).await?;
    let trader = setup.trader_state(&trader_one).await?;
    assert_eq!((trader.volume_in, trader.volume_out, trader.swap_count), (2, 1, 1));

    // Scenario C: 3 of A in.
    let trader_two = setup.create_user(3, 0).await?;
    setup.register_trader(&trader_two).await?;
    setup.swap(&trader_two, &token_a, 3, 0).await?;
    assert_eq!(setup.holdings(&trader_two).await?, (0, 2));
    setup.assert_settled(35, 27, 30).await?;

    let pool = setup.pool_state().await?;
    assert!(pool.invariant() >= 900);

    // The second provider leaves with their share of the grown reserves.
    setup.remove_liquidity(&second, 20).await?;
    assert_eq!(setup.holdings(&second).await?, (23, 18));
    assert_eq!(setup.provider_state(&second).await?.shares, 0);
    setup.assert_settled(12, 9, 10).await?;
    Ok(())
}

#[tokio::test]
async fn test_swap_both_directions_with_fee() -> Result<(), Box<dyn Error>> {
    let mut setup = TestSetup::new(PoolConfig::default()).await?;
    let (token_a, token_b) = (setup.pool.token_a, setup.pool.token_b);
    setup.funded_provider(1_000_000, 1_000_000).await?;

    let trader = setup.create_user(10_000, 10_000).await?;
    setup.register_trader(&trader).await?;
    setup.swap(&trader, &token_a, 10_000, 0).await?;
    let (held_a, held_b) = setup.holdings(&trader).await?;
    assert_eq!(held_a, 0);
    let out_b = held_b - 10_000;
    // The fee keeps the output under the fee-free quote.
    assert!(out_b > 0 && out_b < 9_901);

    setup.swap(&trader, &token_b, out_b, 0).await?;
    let (held_a, held_b) = setup.holdings(&trader).await?;
    assert_eq!(held_b, 10_000);
    assert!(held_a < 10_000);

    let pool = setup.pool_state().await?;
    assert!(pool.invariant() >= 1_000_000u128 * 1_000_000);
    let vaults = setup.vault_balances().await?;
    assert_eq!(vaults, (pool.reserve_a, pool.reserve_b));
    Ok(())
}

#[tokio::test]
async fn test_remove_liquidity_round_trip() -> Result<(), Box<dyn Error>> {
    let mut setup = TestSetup::new(PoolConfig::default()).await?;
    let first = setup.funded_provider(10, 10).await?;
    let second = setup.funded_provider(20, 20).await?;

    assert_exchange_error(
        setup.remove_liquidity(&first, 11).await,
        ExchangeError::InsufficientShares,
    );
    assert_exchange_error(
        setup.remove_liquidity(&first, 0).await,
        ExchangeError::InvalidAmount,
    );

    setup.remove_liquidity(&first, 10).await?;
    assert_eq!(setup.holdings(&first).await?, (10, 10));
    setup.assert_settled(20, 20, 20).await?;

    setup.remove_liquidity(&second, 20).await?;
    assert_eq!(setup.holdings(&second).await?, (20, 20));
    setup.assert_settled(0, 0, 0).await?;
    Ok(())
}

#[tokio::test]
async fn test_deposit_boundaries() -> Result<(), Box<dyn Error>> {
    let mut setup = TestSetup::new(PoolConfig::default()).await?;
    let provider = setup.create_user(100, 100).await?;

    // Unregistered provider.
    assert_exchange_error(
        setup.add_liquidity(&provider, 10, 10).await,
        ExchangeError::NotRegistered,
    );

    setup.register_provider(&provider).await?;
    assert_exchange_error(
        setup.add_liquidity(&provider, 0, 10).await,
        ExchangeError::InvalidAmount,
    );

    setup.add_liquidity(&provider, 30, 30).await?;
    assert_exchange_error(
        setup.add_liquidity(&provider, 10, 20).await,
        ExchangeError::RatioMismatch,
    );
    setup.assert_settled(30, 30, 30).await?;
    assert_eq!(setup.holdings(&provider).await?, (70, 70));
    Ok(())
}

#[tokio::test]
async fn test_minimum_amount_policy() -> Result<(), Box<dyn Error>> {
    let config = PoolConfig::default().with_initial_share_policy(InitialSharePolicy::MinimumAmount);
    let mut setup = TestSetup::new(config).await?;
    let provider = setup.funded_provider(40, 10).await?;
    assert_eq!(setup.provider_state(&provider).await?.shares, 10);
    setup.assert_settled(40, 10, 10).await?;
    Ok(())
}

#[tokio::test]
async fn test_swap_boundaries() -> Result<(), Box<dyn Error>> {
    let mut setup = TestSetup::new(no_fee()).await?;
    let token_a = setup.pool.token_a;
    let trader = setup.create_user(10, 0).await?;

    assert_exchange_error(
        setup.swap(&trader, &token_a, 2, 0).await,
        ExchangeError::NotRegistered,
    );
    setup.register_trader(&trader).await?;

    // Empty pool.
    assert_exchange_error(
        setup.swap(&trader, &token_a, 2, 0).await,
        ExchangeError::InsufficientLiquidity,
    );

    setup.funded_provider(30, 30).await?;
    assert_exchange_error(
        setup.swap(&trader, &token_a, 0, 0).await,
        ExchangeError::InvalidAmount,
    );
    assert_exchange_error(
        setup.swap(&trader, &Pubkey::new_unique(), 2, 0).await,
        ExchangeError::InvalidToken,
    );
    assert_exchange_error(
        setup.swap(&trader, &token_a, 3, 3).await,
        ExchangeError::SlippageExceeded,
    );

    // Nothing settled.
    setup.assert_settled(30, 30, 30).await?;
    assert_eq!(setup.holdings(&trader).await?, (10, 0));
    assert_eq!(setup.trader_state(&trader).await?.swap_count, 0);
    Ok(())
}

#[tokio::test]
async fn test_failed_transfer_leaves_pool_unchanged() -> Result<(), Box<dyn Error>> {
    let mut setup = TestSetup::new(no_fee()).await?;
    let token_a = setup.pool.token_a;
    setup.funded_provider(30, 30).await?;

    // The trader holds less than they offer.
    let trader = setup.create_user(1, 0).await?;
    setup.register_trader(&trader).await?;
    assert!(setup.swap(&trader, &token_a, 3, 0).await.is_err());

    setup.assert_settled(30, 30, 30).await?;
    assert_eq!(setup.holdings(&trader).await?, (1, 0));
    assert_eq!(setup.trader_state(&trader).await?.swap_count, 0);
    Ok(())
}

#[tokio::test]
async fn test_foreign_record_is_unauthorized() -> Result<(), Box<dyn Error>> {
    let mut setup = TestSetup::new(no_fee()).await?;
    let token_a = setup.pool.token_a;
    let provider = setup.funded_provider(30, 30).await?;
    let victim = setup.create_user(0, 0).await?;
    setup.register_trader(&victim).await?;

    let intruder = setup.create_user(3, 0).await?;
    let mut ix = instruction::swap(
        &setup.program_id,
        &setup.pool,
        &intruder.pubkey(),
        &token_a,
        3,
        0,
    )?;
    ix.accounts[2].pubkey = setup.pool.trader(&setup.program_id, &victim.pubkey());
    assert_exchange_error(setup.send(ix, &intruder).await, ExchangeError::Unauthorized);

    let mut ix = instruction::remove_liquidity(&setup.program_id, &setup.pool, &intruder.pubkey(), 10)?;
    ix.accounts[2].pubkey = setup.pool.liquidity_provider(&setup.program_id, &provider.pubkey());
    assert_exchange_error(setup.send(ix, &intruder).await, ExchangeError::Unauthorized);

    setup.assert_settled(30, 30, 30).await?;
    Ok(())
}
