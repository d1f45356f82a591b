//! Value transfer seam
//!
//! Payouts leave the engine through [`AccountTransfer`]. An implementation
//! either moves the full amount or reports an error; partial transfers are
//! not allowed.

use solana_program::{msg, pubkey::Pubkey};
use thiserror::Error;

use crate::error::PredictionMarketError;

#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum TransferError {
    #[error("destination account {0} rejected the transfer")]
    Rejected(Pubkey),

    #[error("payout escrow has insufficient balance: needed {needed}, available {available}")]
    InsufficientBalance { needed: u64, available: u64 },

    #[error("transfer backend unavailable: {0}")]
    Unavailable(String),
}

/// Moves value to a caller-identified account
pub trait AccountTransfer: Send + Sync {
    fn send(&self, to: &Pubkey, amount: u64) -> Result<(), TransferError>;
}

impl<T: AccountTransfer + ?Sized> AccountTransfer for std::sync::Arc<T> {
    fn send(&self, to: &Pubkey, amount: u64) -> Result<(), TransferError> {
        (**self).send(to, amount)
    }
}

/// Send a payout, logging and mapping the failure into the engine taxonomy
pub fn send_payout<T: AccountTransfer + ?Sized>(
    transfer: &T,
    to: &Pubkey,
    amount: u64,
) -> Result<(), PredictionMarketError> {
    msg!("Transfer: {} to {}", amount, to);
    transfer.send(to, amount).map_err(|e| {
        msg!("Error: Transfer to {} failed: {}", to, e);
        PredictionMarketError::TransferFailed
    })
}
