//! Settlement core for a two-token constant-product exchange.
//!
//! The crate owns pool state, liquidity-share accounting and swap pricing.
//! Storage, token custody and address derivation are reached through the
//! [`LedgerStore`], [`VaultCustody`] and [`AddressResolver`] seams so the same
//! logic runs inside an on-chain program or against the in-memory host in
//! [`memory`].

pub mod address;
pub mod config;
pub mod constants;
pub mod custody;
pub mod error;
pub mod exchange;
pub mod guard;
pub mod liquidity;
pub mod math;
pub mod memory;
pub mod registry;
pub mod state;
pub mod swap;
pub mod trader;

pub use solana_program;

pub use address::{AddressResolver, DerivedAddress, PoolAddresses, ProgramAddressResolver, SeedLabel};
pub use config::{InitialSharePolicy, PoolConfig};
pub use custody::{LedgerStore, VaultCustody};
pub use error::ExchangeError;
pub use exchange::Exchange;
pub use state::{LiquidityProvider, Pool, RecordKind, Trader};
