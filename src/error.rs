//! Error types for the GenPredict market engine

use num_derive::FromPrimitive;
use num_traits::FromPrimitive as _;
use solana_program::{
    decode_error::DecodeError,
    program_error::ProgramError,
};
use thiserror::Error;

/// Errors that may be returned by the GenPredict market engine
#[derive(Clone, Copy, Debug, Eq, Error, FromPrimitive, PartialEq)]
pub enum PredictionMarketError {
    // === General Errors (0-99) ===

    #[error("Invalid instruction")]
    InvalidInstruction = 0,

    #[error("Invalid account data")]
    InvalidAccountData = 1,

    #[error("Invalid argument")]
    InvalidArgument = 2,

    #[error("Invalid amount")]
    InvalidAmount = 3,

    #[error("Arithmetic overflow")]
    ArithmeticOverflow = 4,

    #[error("Operation does not accept attached value")]
    NonPayable = 5,

    #[error("Engine state unavailable")]
    StateUnavailable = 6,

    // === Market Errors (100-199) ===

    #[error("Market not found")]
    MarketNotFound = 100,

    #[error("Market already resolved")]
    MarketAlreadyResolved = 101,

    #[error("Market expired")]
    MarketExpired = 102,

    #[error("Resolution time not reached")]
    NotYetExpired = 103,

    #[error("Market not resolved")]
    MarketNotResolved = 104,

    // === Settlement Errors (300-399) ===

    #[error("Invalid market outcome")]
    InvalidOutcome = 300,

    #[error("No stake found")]
    NoStake = 301,

    // === Oracle Errors (500-599) ===

    #[error("Oracle unavailable")]
    OracleUnavailable = 500,

    // === Collaborator Errors (600-699) ===

    #[error("Value transfer failed")]
    TransferFailed = 600,

    #[error("Store write failed")]
    StoreWriteFailed = 601,
}

impl PredictionMarketError {
    /// Decode a numeric error code back into the error
    pub fn from_code(code: u32) -> Option<Self> {
        Self::from_u32(code)
    }

    /// Retryable errors leave all state untouched and may succeed later
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::OracleUnavailable | Self::TransferFailed | Self::StoreWriteFailed
        )
    }
}

impl From<PredictionMarketError> for ProgramError {
    fn from(e: PredictionMarketError) -> Self {
        ProgramError::Custom(e as u32)
    }
}

impl<T> DecodeError<T> for PredictionMarketError {
    fn type_of() -> &'static str {
        "PredictionMarketError"
    }
}

pub type PredictionMarketResult<T> = Result<T, PredictionMarketError>;
