//! Market resolution
//!
//! `Open -> Resolved` is the only transition and it happens at most once.
//! Once the oracle has answered, the market is always closed: an unusable
//! answer becomes the terminal INVALID result instead of an error. Only a
//! failed oracle call leaves the market open for another attempt.

use serde::Serialize;
use solana_program::msg;

use crate::engine::{encode_record, lock, CallContext, PredictionMarket};
use crate::error::{PredictionMarketError, PredictionMarketResult};
use crate::oracle::{parse_payload, OracleQuery, PriceOracle};
use crate::state::{Market, MarketResult, MarketStatus};
use crate::store::AccountStore;
use crate::transfer::AccountTransfer;
use crate::utils::format_e6;

/// Outcome of a resolution attempt that reached the oracle
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ResolutionReceipt {
    pub market_id: u64,
    pub outcome: MarketResult,
    pub resolution_price_e6: Option<u64>,
    /// Why the oracle answer was rejected, for INVALID results
    pub error: Option<String>,
}

impl<O, T, S> PredictionMarket<O, T, S>
where
    O: PriceOracle,
    T: AccountTransfer,
    S: AccountStore,
{
    pub fn resolve_market(&self, ctx: &CallContext, market_id: u64) -> PredictionMarketResult<ResolutionReceipt> {
        let handle = self.market_handle(market_id)?;
        // Held across the oracle round trip so no other call can touch this market meanwhile.
        let mut market = lock(&handle)?;

        if market.is_resolved() {
            msg!("Error: Market {} already resolved", market_id);
            return Err(PredictionMarketError::MarketAlreadyResolved);
        }

        if self.config.enforce_resolution_deadline && !market.can_resolve(ctx.now) {
            msg!(
                "Error: Market {} resolves at {} (now {})",
                market_id,
                market.resolution_time,
                ctx.now
            );
            return Err(PredictionMarketError::NotYetExpired);
        }

        let query = OracleQuery::for_market(&market);
        msg!(
            "Oracle: market {} {} {} {} requested by {}",
            market_id,
            query.asset,
            query.condition,
            format_e6(query.threshold_e6),
            ctx.caller
        );

        let payload = self.oracle.resolve(&query).map_err(|e| {
            msg!("Error: Oracle call for market {} failed: {}", market_id, e);
            PredictionMarketError::OracleUnavailable
        })?;

        let verdict = parse_payload(&payload);
        if let Some(reason) = &verdict.error {
            msg!("Oracle payload rejected for market {}: {}", market_id, reason);
        }

        let mut updated_market = market.clone();
        updated_market.status = MarketStatus::Resolved;
        updated_market.final_result = Some(verdict.result);
        updated_market.resolution_price_e6 = verdict.price_e6;
        updated_market.snapshot_pools();

        self.commit(vec![encode_record(Market::storage_key(market_id), &updated_market)?])?;

        match verdict.price_e6 {
            Some(price) => msg!(
                "Market {} resolved: {} at {}",
                market_id,
                verdict.result.as_str(),
                format_e6(price)
            ),
            None => msg!("Market {} resolved: {}", market_id, verdict.result.as_str()),
        }

        *market = updated_market;

        Ok(ResolutionReceipt {
            market_id,
            outcome: verdict.result,
            resolution_price_e6: verdict.price_e6,
            error: verdict.error,
        })
    }
}
