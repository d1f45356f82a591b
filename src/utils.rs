//! Utility functions for the GenPredict market engine

use borsh::BorshDeserialize;
use solana_program::msg;

use crate::error::{PredictionMarketError, PredictionMarketResult};
use crate::state::{BPS_DENOMINATOR, MAX_ASSET_LEN, PRICE_PRECISION, PRICE_DECIMALS};

/// Safely deserialize record data using BorshDeserialize::deserialize
/// This does NOT require the slice to be fully consumed.
pub fn deserialize_account<T: BorshDeserialize>(data: &[u8]) -> PredictionMarketResult<T> {
    T::deserialize(&mut &data[..])
        .map_err(|_| PredictionMarketError::InvalidAccountData)
}

/// Safe addition for u64
pub fn safe_add_u64(a: u64, b: u64) -> PredictionMarketResult<u64> {
    a.checked_add(b)
        .ok_or(PredictionMarketError::ArithmeticOverflow)
}

/// Safe subtraction for u64
pub fn safe_sub_u64(a: u64, b: u64) -> PredictionMarketResult<u64> {
    a.checked_sub(b)
        .ok_or(PredictionMarketError::ArithmeticOverflow)
}

/// Calculate fee amount from total and basis points (floor)
pub fn calculate_fee(amount: u64, fee_bps: u16) -> u64 {
    let fee_bps = fee_bps.min(BPS_DENOMINATOR as u16);
    ((amount as u128) * (fee_bps as u128) / (BPS_DENOMINATOR as u128)) as u64
}

/// Proportional share of the whole pool: floor(stake * total / winning)
///
/// Returns 0 when the winning side is empty.
pub fn proportional_payout(
    winning_stake: u64,
    total_pool: u64,
    winning_pool: u64,
) -> PredictionMarketResult<u64> {
    if winning_pool == 0 {
        return Ok(0);
    }
    let payout = (winning_stake as u128) * (total_pool as u128) / (winning_pool as u128);
    u64::try_from(payout).map_err(|_| PredictionMarketError::ArithmeticOverflow)
}

/// Integer-percent pool shares, 50/50 when both pools are empty
pub fn pool_odds(yes_pool: u64, no_pool: u64) -> (u8, u8) {
    let total = (yes_pool as u128) + (no_pool as u128);
    if total == 0 {
        return (50, 50);
    }
    let yes = (yes_pool as u128) * 100 / total;
    let no = (no_pool as u128) * 100 / total;
    (yes as u8, no as u8)
}

/// Normalize an asset symbol: trimmed, upper-cased, non-empty
pub fn normalize_asset(asset: &str) -> PredictionMarketResult<String> {
    let asset = asset.trim();
    if asset.is_empty() {
        msg!("Error: Asset symbol required");
        return Err(PredictionMarketError::InvalidArgument);
    }
    if asset.len() > MAX_ASSET_LEN {
        msg!("Error: Asset symbol too long ({} > {})", asset.len(), MAX_ASSET_LEN);
        return Err(PredictionMarketError::InvalidArgument);
    }
    Ok(asset.to_uppercase())
}

/// Parse a non-negative decimal string into 6-decimal fixed point.
///
/// Digits past the sixth fractional place are truncated.
pub fn parse_decimal_e6(text: &str) -> PredictionMarketResult<u64> {
    let text = text.trim();
    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i, f),
        None => (text, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(PredictionMarketError::InvalidArgument);
    }
    if !int_part.bytes().all(|b| b.is_ascii_digit())
        || !frac_part.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(PredictionMarketError::InvalidArgument);
    }

    let whole: u64 = if int_part.is_empty() {
        0
    } else {
        int_part
            .parse()
            .map_err(|_| PredictionMarketError::ArithmeticOverflow)?
    };

    let mut frac: u64 = 0;
    for (i, digit) in frac_part.bytes().take(PRICE_DECIMALS).enumerate() {
        frac += ((digit - b'0') as u64) * 10u64.pow((PRICE_DECIMALS - 1 - i) as u32);
    }

    whole
        .checked_mul(PRICE_PRECISION)
        .and_then(|w| w.checked_add(frac))
        .ok_or(PredictionMarketError::ArithmeticOverflow)
}

/// Render a 6-decimal fixed point value without trailing zeros
pub fn format_e6(value: u64) -> String {
    let whole = value / PRICE_PRECISION;
    let frac = value % PRICE_PRECISION;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{:06}", frac);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}
