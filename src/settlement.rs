//! Winnings settlement
//!
//! A winner receives `floor(stake * total_pool / winning_pool)`, i.e. their
//! share of both pools in proportion to their share of the winning side.
//! Both pool totals are the ones frozen at resolution, so claim order never
//! changes a payout and floor dust stays in the pool.
//! The claimant's stake entry is zeroed and committed before value leaves
//! the engine, so a repeated claim finds nothing to pay.

use solana_program::msg;

use crate::engine::{encode_record, lock, CallContext, PredictionMarket};
use crate::error::{PredictionMarketError, PredictionMarketResult};
use crate::oracle::PriceOracle;
use crate::state::{Market, Outcome, StakePosition};
use crate::store::AccountStore;
use crate::transfer::{send_payout, AccountTransfer};
use crate::utils::{proportional_payout, safe_sub_u64};

impl<O, T, S> PredictionMarket<O, T, S>
where
    O: PriceOracle,
    T: AccountTransfer,
    S: AccountStore,
{
    /// Pay the caller's winnings and return the amount paid (0 if nothing is owed).
    pub fn claim_winnings(&self, ctx: &CallContext, market_id: u64) -> PredictionMarketResult<u64> {
        let handle = self.market_handle(market_id)?;
        let mut market = lock(&handle)?;

        if !market.is_resolved() {
            msg!("Error: Market {} not resolved", market_id);
            return Err(PredictionMarketError::MarketNotResolved);
        }

        let result = market.final_result.ok_or(PredictionMarketError::MarketNotResolved)?;
        let winning_side = result.winning_side().ok_or_else(|| {
            msg!("Error: Market {} resolved {}, nothing to claim", market_id, result.as_str());
            PredictionMarketError::InvalidOutcome
        })?;

        let position = match market.bettors.get(&ctx.caller) {
            Some(position) => *position,
            None => {
                msg!("Error: No bets by {} on market {}", ctx.caller, market_id);
                return Err(PredictionMarketError::NoStake);
            }
        };

        let winning_stake = position.stake(winning_side);
        if winning_stake == 0 {
            msg!("No winnings to claim for {} on market {}", ctx.caller, market_id);
            return Ok(0);
        }

        let winning_pool = market.resolved_pool(winning_side);
        if winning_pool == 0 {
            msg!("Winning pool of market {} is empty, nothing paid", market_id);
            return Ok(0);
        }

        let payout = proportional_payout(winning_stake, market.resolved_total_pool(), winning_pool)?;
        let updated_market = settle_claim(&market, ctx, winning_side, winning_stake, payout)?;

        // Reset is durable before the transfer is issued.
        self.commit(vec![encode_record(Market::storage_key(market_id), &updated_market)?])?;
        let previous = std::mem::replace(&mut *market, updated_market);

        if let Err(e) = send_payout(&self.transfer, &ctx.caller, payout) {
            match self.commit(vec![encode_record(Market::storage_key(market_id), &previous)?]) {
                Ok(()) => {
                    *market = previous;
                    msg!("Claim on market {} rolled back for {}", market_id, ctx.caller);
                }
                Err(_) => {
                    msg!(
                        "Error: Could not restore stake of {} on market {} after failed transfer of {}",
                        ctx.caller,
                        market_id,
                        payout
                    );
                }
            }
            return Err(e);
        }

        msg!("Winnings paid: market {} {} to {}", market_id, payout, ctx.caller);

        Ok(payout)
    }
}

/// Market after a claim: stake entry zeroed and the payout taken out of the live pools
fn settle_claim(
    market: &Market,
    ctx: &CallContext,
    winning_side: Outcome,
    winning_stake: u64,
    payout: u64,
) -> PredictionMarketResult<Market> {
    let losing_side = match winning_side {
        Outcome::Yes => Outcome::No,
        Outcome::No => Outcome::Yes,
    };
    let from_losing = safe_sub_u64(payout, winning_stake)?;

    let mut updated = market.clone();
    updated.bettors.insert(ctx.caller, StakePosition::default());

    let pool = updated.pool_mut(winning_side);
    *pool = safe_sub_u64(*pool, winning_stake)?;
    let pool = updated.pool_mut(losing_side);
    *pool = safe_sub_u64(*pool, from_losing)?;

    Ok(updated)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use solana_program::pubkey::Pubkey;

    use super::*;
    use crate::engine::EngineConfig;
    use crate::instruction::{CreateMarketArgs, PlaceBetArgs};
    use crate::oracle::{OracleError, OracleQuery};
    use crate::store::MemoryStore;
    use crate::transfer::TransferError;

    struct FixedOracle(&'static str);

    impl PriceOracle for FixedOracle {
        fn resolve(&self, _query: &OracleQuery) -> Result<String, OracleError> {
            Ok(self.0.to_string())
        }
    }

    #[derive(Default)]
    struct RecordingTransfer {
        sent: Mutex<Vec<(Pubkey, u64)>>,
        reject: AtomicBool,
    }

    impl AccountTransfer for RecordingTransfer {
        fn send(&self, to: &Pubkey, amount: u64) -> Result<(), TransferError> {
            if self.reject.load(Ordering::SeqCst) {
                return Err(TransferError::Rejected(*to));
            }
            self.sent.lock().unwrap().push((*to, amount));
            Ok(())
        }
    }

    const NOW: i64 = 1_700_000_000;
    const DEADLINE: i64 = NOW + 3600;

    type Engine = PredictionMarket<FixedOracle, RecordingTransfer, MemoryStore>;

    fn engine(answer: &'static str) -> Engine {
        PredictionMarket::new(
            EngineConfig::default(),
            FixedOracle(answer),
            RecordingTransfer::default(),
            MemoryStore::new(),
        )
        .unwrap()
    }

    fn open_market(engine: &Engine) -> u64 {
        let ctx = CallContext::new(Pubkey::new_unique(), NOW);
        engine
            .create_market(
                &ctx,
                CreateMarketArgs {
                    asset: "ETH".into(),
                    condition: "below".into(),
                    threshold: "3000".into(),
                    resolution_time: DEADLINE,
                },
            )
            .unwrap()
    }

    fn bet(engine: &Engine, id: u64, who: Pubkey, side: &str, value: u64) {
        let ctx = CallContext::new(who, NOW).with_value(value);
        engine
            .place_bet(&ctx, PlaceBetArgs { market_id: id, position: side.into() })
            .unwrap();
    }

    fn resolve(engine: &Engine, id: u64) {
        engine
            .resolve_market(&CallContext::new(Pubkey::new_unique(), DEADLINE), id)
            .unwrap();
    }

    fn claim(engine: &Engine, id: u64, who: Pubkey) -> PredictionMarketResult<u64> {
        engine.claim_winnings(&CallContext::new(who, DEADLINE + 10), id)
    }

    #[test]
    fn test_claim_pays_share_of_whole_pool() {
        let engine = engine(r#"{"price": 2900, "outcome": "YES"}"#);
        let id = open_market(&engine);
        let (a, b, c) = (Pubkey::new_unique(), Pubkey::new_unique(), Pubkey::new_unique());

        // Net stakes: a 297 YES, b 99 YES, c 594 NO
        bet(&engine, id, a, "YES", 300);
        bet(&engine, id, b, "YES", 100);
        bet(&engine, id, c, "NO", 600);
        resolve(&engine, id);

        assert_eq!(claim(&engine, id, a).unwrap(), 742);
        assert_eq!(claim(&engine, id, b).unwrap(), 247);
        assert_eq!(claim(&engine, id, c).unwrap(), 0);

        let handle = engine.market_handle(id).unwrap();
        let market = handle.lock().unwrap();
        // 990 net staked, 989 paid out, 1 of floor dust left behind
        assert_eq!(market.total_pool(), 1);
        assert_eq!(market.resolved_total_pool(), 990);

        let sent = engine.transfer.sent.lock().unwrap();
        assert_eq!(*sent, vec![(a, 742), (b, 247)]);
    }

    #[test]
    fn test_claim_order_does_not_move_dust() {
        let engine = PredictionMarket::new(
            EngineConfig { fee_rate_bps: 0, ..EngineConfig::default() },
            FixedOracle(r#"{"price": 2900, "outcome": "YES"}"#),
            RecordingTransfer::default(),
            MemoryStore::new(),
        )
        .unwrap();
        let id = open_market(&engine);
        let winners = [Pubkey::new_unique(), Pubkey::new_unique(), Pubkey::new_unique()];
        for who in winners {
            bet(&engine, id, who, "YES", 1);
        }
        bet(&engine, id, Pubkey::new_unique(), "NO", 1);
        resolve(&engine, id);

        // floor(1 * 4 / 3) for every winner, whatever the claim order
        let payouts: Vec<u64> = winners.iter().map(|who| claim(&engine, id, *who).unwrap()).collect();
        assert_eq!(payouts, vec![1, 1, 1]);

        let handle = engine.market_handle(id).unwrap();
        assert_eq!(handle.lock().unwrap().total_pool(), 1);
    }

    #[test]
    fn test_second_claim_pays_nothing() {
        let engine = engine(r#"{"price": 2900, "outcome": "YES"}"#);
        let id = open_market(&engine);
        let (a, b) = (Pubkey::new_unique(), Pubkey::new_unique());
        bet(&engine, id, a, "YES", 1000);
        bet(&engine, id, b, "NO", 500);
        resolve(&engine, id);

        assert_eq!(claim(&engine, id, a).unwrap(), 1485);
        assert_eq!(claim(&engine, id, a).unwrap(), 0);
        assert_eq!(engine.transfer.sent.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_claim_guards() {
        let engine = engine(r#"{"price": 2900, "outcome": "NO"}"#);
        let id = open_market(&engine);
        let a = Pubkey::new_unique();
        bet(&engine, id, a, "NO", 1000);

        assert_eq!(claim(&engine, 77, a), Err(PredictionMarketError::MarketNotFound));
        assert_eq!(claim(&engine, id, a), Err(PredictionMarketError::MarketNotResolved));

        resolve(&engine, id);
        assert_eq!(claim(&engine, id, Pubkey::new_unique()), Err(PredictionMarketError::NoStake));
        assert_eq!(claim(&engine, id, a).unwrap(), 990);
    }

    #[test]
    fn test_invalid_market_pays_nobody() {
        let engine = engine("no idea");
        let id = open_market(&engine);
        let a = Pubkey::new_unique();
        bet(&engine, id, a, "YES", 1000);
        resolve(&engine, id);

        assert_eq!(claim(&engine, id, a), Err(PredictionMarketError::InvalidOutcome));
        assert!(engine.transfer.sent.lock().unwrap().is_empty());

        let handle = engine.market_handle(id).unwrap();
        assert_eq!(handle.lock().unwrap().yes_pool, 990);
    }

    #[test]
    fn test_failed_transfer_restores_stake() {
        let engine = engine(r#"{"price": 2900, "outcome": "YES"}"#);
        let id = open_market(&engine);
        let (a, b) = (Pubkey::new_unique(), Pubkey::new_unique());
        bet(&engine, id, a, "YES", 1000);
        bet(&engine, id, b, "NO", 500);
        resolve(&engine, id);

        engine.transfer.reject.store(true, Ordering::SeqCst);
        assert_eq!(claim(&engine, id, a), Err(PredictionMarketError::TransferFailed));
        {
            let handle = engine.market_handle(id).unwrap();
            let market = handle.lock().unwrap();
            assert_eq!(market.position_of(&a).yes_stake, 990);
            assert_eq!(market.total_pool(), 1485);
        }

        engine.transfer.reject.store(false, Ordering::SeqCst);
        assert_eq!(claim(&engine, id, a).unwrap(), 1485);
    }

    #[test]
    fn test_settle_claim_takes_payout_from_pools() {
        let mut market = Market::new(1, Pubkey::new_unique(), "BTC".into(), crate::state::Condition::Above, 1, DEADLINE, NOW);
        let a = Pubkey::new_unique();
        market.bettors.insert(a, StakePosition { yes_stake: 300, no_stake: 50 });
        market.yes_pool = 400;
        market.no_pool = 650;
        let ctx = CallContext::new(a, DEADLINE);

        let payout = proportional_payout(300, market.total_pool(), 400).unwrap();
        assert_eq!(payout, 787);
        let updated = settle_claim(&market, &ctx, Outcome::Yes, 300, payout).unwrap();
        assert!(updated.position_of(&a).is_empty());
        assert_eq!(updated.yes_pool, 100);
        assert_eq!(updated.no_pool, 650 - 487);
        assert_eq!(market.total_pool() - updated.total_pool(), payout);
    }
}
