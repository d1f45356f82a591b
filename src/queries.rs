//! Read-only views
//!
//! Market snapshots never carry the per-bettor stake map; a bettor's stake is
//! only visible through `get_user_position`.

use serde::Serialize;
use solana_program::pubkey::Pubkey;

use crate::engine::{lock, PredictionMarket};
use crate::error::{PredictionMarketError, PredictionMarketResult};
use crate::oracle::PriceOracle;
use crate::state::{
    BetReceipt, Condition, Market, MarketResult, MarketStatus, Outcome, StakePosition, BPS_DENOMINATOR,
    FIRST_MARKET_ID,
};
use crate::store::AccountStore;
use crate::transfer::AccountTransfer;
use crate::utils::{calculate_fee, pool_odds, proportional_payout, safe_add_u64};

/// Public view of a market
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct MarketSnapshot {
    pub market_id: u64,
    pub creator: Pubkey,
    pub asset: String,
    pub condition: Condition,
    pub threshold_e6: u64,
    pub resolution_time: i64,
    pub created_at: i64,
    pub status: MarketStatus,
    pub final_result: Option<MarketResult>,
    pub resolution_price_e6: Option<u64>,
    pub yes_pool: u64,
    pub no_pool: u64,
    pub total_pool: u64,
    pub bettor_count: u64,
    pub bet_count: u64,
    pub collected_fees: u64,
}

impl From<&Market> for MarketSnapshot {
    fn from(market: &Market) -> Self {
        Self {
            market_id: market.market_id,
            creator: market.creator,
            asset: market.asset.clone(),
            condition: market.condition,
            threshold_e6: market.threshold_e6,
            resolution_time: market.resolution_time,
            created_at: market.created_at,
            status: market.status,
            final_result: market.final_result,
            resolution_price_e6: market.resolution_price_e6,
            yes_pool: market.yes_pool,
            no_pool: market.no_pool,
            total_pool: market.total_pool(),
            bettor_count: market.bettors.len() as u64,
            bet_count: market.bet_count,
            collected_fees: market.collected_fees,
        }
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketOdds {
    pub yes_probability: u8,
    pub no_probability: u8,
    pub yes_pool: u64,
    pub no_pool: u64,
    pub total_pool: u64,
}

#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MarketStats {
    pub total_markets: u64,
    pub active_markets: u64,
    pub resolved_markets: u64,
    pub invalid_markets: u64,
    /// Sum of current pools across all markets
    pub total_volume: u64,
    pub total_bets: u64,
    pub collected_fees: u64,
}

/// What a bet of `amount` would earn if placed now and its side won
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct BetQuote {
    pub bet_amount: u64,
    pub fee: u64,
    pub net_amount: u64,
    pub potential_payout: u64,
    /// potential_payout / bet_amount in basis points
    pub multiplier_bps: u64,
}

impl<O, T, S> PredictionMarket<O, T, S>
where
    O: PriceOracle,
    T: AccountTransfer,
    S: AccountStore,
{
    pub fn get_market(&self, market_id: u64) -> PredictionMarketResult<Option<MarketSnapshot>> {
        match self.market_handle(market_id) {
            Ok(handle) => {
                let market = lock(&handle)?;
                Ok(Some(MarketSnapshot::from(&*market)))
            }
            Err(PredictionMarketError::MarketNotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn get_all_market_ids(&self) -> PredictionMarketResult<Vec<u64>> {
        let next_market_id = lock(&self.ledger)?.next_market_id;
        Ok((FIRST_MARKET_ID..next_market_id).collect())
    }

    pub fn get_all_markets(&self) -> PredictionMarketResult<Vec<MarketSnapshot>> {
        let mut snapshots = Vec::new();
        for market_id in self.get_all_market_ids()? {
            if let Some(snapshot) = self.get_market(market_id)? {
                snapshots.push(snapshot);
            }
        }
        Ok(snapshots)
    }

    /// Markets still accepting bets at `now`
    pub fn get_active_markets(&self, now: i64) -> PredictionMarketResult<Vec<MarketSnapshot>> {
        Ok(self
            .get_all_markets()?
            .into_iter()
            .filter(|m| m.status == MarketStatus::Open && now < m.resolution_time)
            .collect())
    }

    /// Stake of `user` on a market; zero for unknown markets or users
    pub fn get_user_position(&self, market_id: u64, user: &Pubkey) -> PredictionMarketResult<StakePosition> {
        match self.market_handle(market_id) {
            Ok(handle) => {
                let market = lock(&handle)?;
                Ok(market.position_of(user))
            }
            Err(PredictionMarketError::MarketNotFound) => Ok(StakePosition::default()),
            Err(e) => Err(e),
        }
    }

    pub fn get_user_bets(&self, user: &Pubkey) -> PredictionMarketResult<Vec<BetReceipt>> {
        Ok(self.load_history(user)?.receipts)
    }

    pub fn get_market_odds(&self, market_id: u64) -> PredictionMarketResult<MarketOdds> {
        let handle = self.market_handle(market_id)?;
        let market = lock(&handle)?;
        let (yes_probability, no_probability) = pool_odds(market.yes_pool, market.no_pool);
        Ok(MarketOdds {
            yes_probability,
            no_probability,
            yes_pool: market.yes_pool,
            no_pool: market.no_pool,
            total_pool: market.total_pool(),
        })
    }

    pub fn get_stats(&self) -> PredictionMarketResult<MarketStats> {
        let mut stats = MarketStats::default();

        for market in self.get_all_markets()? {
            stats.total_markets += 1;
            stats.total_volume = safe_add_u64(stats.total_volume, market.total_pool)?;
            stats.total_bets = safe_add_u64(stats.total_bets, market.bet_count)?;
            stats.collected_fees = safe_add_u64(stats.collected_fees, market.collected_fees)?;
            match market.final_result {
                None => stats.active_markets += 1,
                Some(MarketResult::Invalid) => {
                    stats.resolved_markets += 1;
                    stats.invalid_markets += 1;
                }
                Some(_) => stats.resolved_markets += 1,
            }
        }

        Ok(stats)
    }

    /// Estimate a bet without placing it
    pub fn quote_bet(&self, market_id: u64, position: Outcome, amount: u64) -> PredictionMarketResult<BetQuote> {
        let handle = self.market_handle(market_id)?;
        let market = lock(&handle)?;

        let fee = calculate_fee(amount, self.fee_rate_bps);
        let net_amount = amount - fee;

        let side_pool = safe_add_u64(market.pool(position), net_amount)?;
        let total_pool = safe_add_u64(market.total_pool(), net_amount)?;
        let potential_payout = proportional_payout(net_amount, total_pool, side_pool)?;

        let multiplier_bps = if amount == 0 {
            0
        } else {
            ((potential_payout as u128) * (BPS_DENOMINATOR as u128) / (amount as u128)) as u64
        };

        Ok(BetQuote {
            bet_amount: amount,
            fee,
            net_amount,
            potential_payout,
            multiplier_bps,
        })
    }
}
