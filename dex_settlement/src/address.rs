use solana_program::pubkey::Pubkey;

use crate::constants::{
    AUTHORITY_SEED, LIQUIDITY_PROVIDER_SEED, POOL_SEED, TRADER_SEED, VAULT_SEED,
};

/// Fixed seed label per derived record kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedLabel {
    Pool,
    Authority,
    Vault,
    LiquidityProvider,
    Trader,
}

impl SeedLabel {
    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            SeedLabel::Pool => POOL_SEED,
            SeedLabel::Authority => AUTHORITY_SEED,
            SeedLabel::Vault => VAULT_SEED,
            SeedLabel::LiquidityProvider => LIQUIDITY_PROVIDER_SEED,
            SeedLabel::Trader => TRADER_SEED,
        }
    }
}

/// A derived address together with the full seeds (bump included) a host
/// needs to sign for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedAddress {
    pub address: Pubkey,
    pub seeds: Vec<Vec<u8>>,
}

impl DerivedAddress {
    pub fn signer_seeds(&self) -> Vec<&[u8]> {
        self.seeds.iter().map(|s| s.as_slice()).collect()
    }
}

/// Deterministic address derivation from a label and context keys.
pub trait AddressResolver {
    fn derive(&self, label: SeedLabel, context: &[&[u8]]) -> DerivedAddress;

    fn pool(&self, admin: &Pubkey) -> DerivedAddress {
        self.derive(SeedLabel::Pool, &[admin.as_ref()])
    }

    fn authority(&self, pool: &Pubkey) -> DerivedAddress {
        self.derive(SeedLabel::Authority, &[pool.as_ref()])
    }

    fn vault(&self, authority: &Pubkey, mint: &Pubkey) -> DerivedAddress {
        self.derive(SeedLabel::Vault, &[authority.as_ref(), mint.as_ref()])
    }

    fn liquidity_provider(&self, owner: &Pubkey, pool: &Pubkey) -> DerivedAddress {
        self.derive(
            SeedLabel::LiquidityProvider,
            &[owner.as_ref(), pool.as_ref()],
        )
    }

    fn trader(&self, owner: &Pubkey, pool: &Pubkey) -> DerivedAddress {
        self.derive(SeedLabel::Trader, &[owner.as_ref(), pool.as_ref()])
    }
}

/// Program-derived addresses under a fixed program id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramAddressResolver {
    pub program_id: Pubkey,
}

impl ProgramAddressResolver {
    pub fn new(program_id: Pubkey) -> Self {
        Self { program_id }
    }
}

impl AddressResolver for ProgramAddressResolver {
    fn derive(&self, label: SeedLabel, context: &[&[u8]]) -> DerivedAddress {
        let mut seeds: Vec<&[u8]> = Vec::with_capacity(context.len() + 1);
        seeds.push(label.as_bytes());
        seeds.extend_from_slice(context);
        let (address, bump) = Pubkey::find_program_address(&seeds, &self.program_id);

        let mut owned: Vec<Vec<u8>> = seeds.iter().map(|s| s.to_vec()).collect();
        owned.push(vec![bump]);
        DerivedAddress {
            address,
            seeds: owned,
        }
    }
}

/// Every address a pool owns, derived from its admin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolAddresses {
    pub pool: DerivedAddress,
    pub authority: DerivedAddress,
    pub vault_a: DerivedAddress,
    pub vault_b: DerivedAddress,
}

impl PoolAddresses {
    pub fn derive<R: AddressResolver + ?Sized>(
        resolver: &R,
        admin: &Pubkey,
        token_a: &Pubkey,
        token_b: &Pubkey,
    ) -> Self {
        let pool = resolver.pool(admin);
        let authority = resolver.authority(&pool.address);
        let vault_a = resolver.vault(&authority.address, token_a);
        let vault_b = resolver.vault(&authority.address, token_b);
        Self {
            pool,
            authority,
            vault_a,
            vault_b,
        }
    }
}
