//! Price oracle seam
//!
//! The engine never fetches prices itself. It hands an [`OracleQuery`] to a
//! [`PriceOracle`] and receives back the one payload the oracle's validators
//! agreed on. That payload is the only untyped input the engine accepts, so
//! it is parsed and checked here.

use serde_json::Value;
use thiserror::Error;

use crate::state::{Condition, Market, MarketResult, Outcome, PRICE_PRECISION};
use crate::utils::{format_e6, parse_decimal_e6};

/// Failure of the oracle call itself (no agreed payload)
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum OracleError {
    #[error("oracle unreachable: {0}")]
    Unavailable(String),

    #[error("validators did not reach agreement")]
    NoConsensus,

    #[error("oracle call cancelled")]
    Cancelled,
}

/// Deterministic description of what must be judged
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OracleQuery {
    pub market_id: u64,
    pub asset: String,
    pub condition: Condition,
    pub threshold_e6: u64,
}

impl OracleQuery {
    pub fn for_market(market: &Market) -> Self {
        Self {
            market_id: market.market_id,
            asset: market.asset.clone(),
            condition: market.condition,
            threshold_e6: market.threshold_e6,
        }
    }

    /// Price-source identifier for the asset (unknown symbols fall back to bitcoin)
    pub fn source_id(&self) -> &'static str {
        match self.asset.as_str() {
            "ETH" => "ethereum",
            "SOL" => "solana",
            "BNB" => "binancecoin",
            "XRP" => "ripple",
            "ADA" => "cardano",
            "DOGE" => "dogecoin",
            _ => "bitcoin",
        }
    }

    /// Public USD spot price endpoint for the asset
    pub fn source_url(&self) -> String {
        format!(
            "https://api.coingecko.com/api/v3/simple/price?ids={}&vs_currencies=usd",
            self.source_id()
        )
    }

    /// Judging instructions handed to every validator; identical inputs give identical text.
    pub fn instructions(&self) -> String {
        format!(
            "Parse the price and determine outcome.\n\
             Asset: {}\n\
             Condition: price {} ${}\n\
             Return ONLY JSON: {{\"price\": <number>, \"outcome\": \"YES\" or \"NO\"}}",
            self.asset,
            self.condition,
            format_e6(self.threshold_e6),
        )
    }
}

/// External, consensus-validated price judge
pub trait PriceOracle: Send + Sync {
    /// Resolve a query into the single agreed textual payload
    fn resolve(&self, query: &OracleQuery) -> Result<String, OracleError>;
}

impl<O: PriceOracle + ?Sized> PriceOracle for std::sync::Arc<O> {
    fn resolve(&self, query: &OracleQuery) -> Result<String, OracleError> {
        (**self).resolve(query)
    }
}

/// Typed reading of an oracle payload
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OracleVerdict {
    pub result: MarketResult,
    pub price_e6: Option<u64>,
    pub error: Option<String>,
}

impl OracleVerdict {
    fn invalid(error: impl Into<String>) -> Self {
        Self {
            result: MarketResult::Invalid,
            price_e6: None,
            error: Some(error.into()),
        }
    }
}

/// Parse an agreed payload. Never fails: anything unusable becomes INVALID.
pub fn parse_payload(payload: &str) -> OracleVerdict {
    let fields = match serde_json::from_str::<Value>(payload.trim()) {
        Ok(Value::Object(fields)) => fields,
        Ok(other) => return OracleVerdict::invalid(format!("oracle payload is not an object: {}", other)),
        Err(e) => return OracleVerdict::invalid(format!("unparseable oracle payload: {}", e)),
    };

    let outcome = match fields.get("outcome") {
        Some(Value::String(s)) => s,
        Some(other) => return OracleVerdict::invalid(format!("outcome is not a string: {}", other)),
        None => return OracleVerdict::invalid("outcome missing from oracle payload"),
    };

    let side = match outcome.parse::<Outcome>() {
        Ok(side) => side,
        Err(_) => return OracleVerdict::invalid(format!("unrecognised outcome {:?}", outcome)),
    };

    let price_e6 = match fields.get("price") {
        None | Some(Value::Null) => 0,
        Some(value) => match price_to_e6(value) {
            Some(price) => price,
            None => return OracleVerdict::invalid(format!("unusable price {}", value)),
        },
    };

    OracleVerdict {
        result: side.into(),
        price_e6: Some(price_e6),
        error: None,
    }
}

fn price_to_e6(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => {
            if let Some(whole) = n.as_u64() {
                return whole.checked_mul(PRICE_PRECISION);
            }
            let f = n.as_f64()?;
            if !f.is_finite() || f < 0.0 {
                return None;
            }
            let scaled = (f * PRICE_PRECISION as f64).floor();
            if scaled > u64::MAX as f64 {
                return None;
            }
            Some(scaled as u64)
        }
        Value::String(s) => parse_decimal_e6(s).ok(),
        _ => None,
    }
}
