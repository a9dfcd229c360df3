use solana_program::program_error::ProgramError;
use thiserror::Error;

/// Errors raised by the program before the exchange sees a request.
///
/// Codes start at 100 so they never collide with `ExchangeError`.
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum AdapterError {
    /// Invalid instruction data passed.
    #[error("Invalid instruction data")]
    InvalidInstructionData = 100,

    /// Missing required signature.
    #[error("Missing required signature")]
    MissingRequiredSignature,

    /// Provided program ID is incorrect
    #[error("Incorrect program ID provided")]
    IncorrectProgramId,

    /// An account is not the one derived for this request.
    #[error("Account does not match derived address")]
    AccountMismatch,

    /// Mint account does not match the instruction.
    #[error("Mint mismatch")]
    MintMismatch,
}

impl From<AdapterError> for ProgramError {
    fn from(e: AdapterError) -> Self {
        ProgramError::Custom(e as u32)
    }
}
