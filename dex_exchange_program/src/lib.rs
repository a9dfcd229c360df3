//! Native program hosting the settlement core on accounts and SPL tokens.

pub mod accounts;
pub mod error;
pub mod instruction;
pub mod processor;

#[cfg(not(feature = "no-entrypoint"))]
pub mod entrypoint;

pub use dex_settlement;
pub use solana_program;
