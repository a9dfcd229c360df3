use solana_program::program_error::ProgramError;
use thiserror::Error;

/// Errors returned by every settlement operation.
///
/// Any error aborts the operation before a vault movement or ledger write
/// is committed.
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExchangeError {
    /// A pool already exists for this admin.
    #[error("Pool already initialized")]
    AlreadyInitialized,

    /// A provider or trader record already exists for this owner and pool.
    #[error("Already registered")]
    AlreadyRegistered,

    /// The provider or trader record does not exist.
    #[error("Not registered")]
    NotRegistered,

    /// Signer does not match the stored owner or admin.
    #[error("Unauthorized signer")]
    Unauthorized,

    /// Token is not one of the pool's two mints, or both mints are equal.
    #[error("Invalid token")]
    InvalidToken,

    /// Zero amount, or an amount too small to mint or return anything.
    #[error("Invalid amount")]
    InvalidAmount,

    /// Deposit does not match the pool ratio within tolerance.
    #[error("Deposit ratio mismatch")]
    RatioMismatch,

    /// Burn amount exceeds the provider's shares.
    #[error("Insufficient shares")]
    InsufficientShares,

    /// Pool cannot pay out the requested swap.
    #[error("Insufficient liquidity")]
    InsufficientLiquidity,

    /// An arithmetic operation overflowed.
    #[error("Arithmetic overflow")]
    ArithmeticOverflow,

    /// A vault balance diverges from the recorded reserve, or a vault
    /// reference diverges from its derived address.
    #[error("Vault balance or address mismatch")]
    VaultMismatch,

    /// The pool does not exist.
    #[error("Pool not initialized")]
    NotInitialized,

    /// Fee or tolerance is out of range.
    #[error("Invalid pool config")]
    InvalidConfig,

    /// Swap output is below the caller's minimum.
    #[error("Slippage limit exceeded")]
    SlippageExceeded,

    /// A settlement invariant other than the vault balance check failed.
    #[error("Settlement invariant violated")]
    InvariantViolated,

    /// Stored bytes are not a record of the expected kind.
    #[error("Invalid record data")]
    InvalidRecord,

    /// The custody collaborator refused a movement.
    #[error("Custody rejected movement")]
    CustodyRejected,
}

impl From<ExchangeError> for ProgramError {
    fn from(e: ExchangeError) -> Self {
        ProgramError::Custom(e as u32)
    }
}
