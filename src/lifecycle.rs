//! Market creation and bet placement

use solana_program::msg;

use crate::engine::{encode_record, lock, CallContext, PredictionMarket};
use crate::error::{PredictionMarketError, PredictionMarketResult};
use crate::instruction::{CreateMarketArgs, PlaceBetArgs};
use crate::oracle::PriceOracle;
use crate::state::{BetReceipt, Condition, LedgerState, Market, Outcome, UserBetHistory};
use crate::store::AccountStore;
use crate::transfer::AccountTransfer;
use crate::utils::{calculate_fee, normalize_asset, parse_decimal_e6, safe_add_u64, format_e6};

impl<O, T, S> PredictionMarket<O, T, S>
where
    O: PriceOracle,
    T: AccountTransfer,
    S: AccountStore,
{
    /// Create an open market and return its id.
    ///
    /// Nothing is written unless every argument is valid.
    pub fn create_market(&self, ctx: &CallContext, args: CreateMarketArgs) -> PredictionMarketResult<u64> {
        let condition: Condition = args.condition.parse().map_err(|e| {
            msg!("Error: Condition must be 'above' or 'below', got {:?}", args.condition);
            e
        })?;

        let asset = normalize_asset(&args.asset)?;

        let threshold_e6 = parse_decimal_e6(&args.threshold).map_err(|e| {
            msg!("Error: Invalid threshold {:?}", args.threshold);
            e
        })?;
        if threshold_e6 == 0 {
            msg!("Error: Threshold must be positive");
            return Err(PredictionMarketError::InvalidArgument);
        }

        if args.resolution_time <= ctx.now {
            msg!("Error: Resolution time must be in the future");
            return Err(PredictionMarketError::InvalidArgument);
        }

        let mut ledger = lock(&self.ledger)?;

        let market_id = ledger.next_market_id;
        let mut updated_ledger = ledger.clone();
        updated_ledger.next_market_id = safe_add_u64(market_id, 1)?;

        let market = Market::new(
            market_id,
            ctx.caller,
            asset,
            condition,
            threshold_e6,
            args.resolution_time,
            ctx.now,
        );

        self.commit(vec![
            encode_record(Market::storage_key(market_id), &market)?,
            encode_record(LedgerState::storage_key(), &updated_ledger)?,
        ])?;

        msg!(
            "Market {} created: {} {} {} until {} by {}",
            market_id,
            market.asset,
            market.condition,
            format_e6(threshold_e6),
            market.resolution_time,
            ctx.caller
        );

        *ledger = updated_ledger;
        self.insert_market(market)?;

        Ok(market_id)
    }

    /// Stake the attached value on one side and return the net stake.
    pub fn place_bet(&self, ctx: &CallContext, args: PlaceBetArgs) -> PredictionMarketResult<u64> {
        let handle = self.market_handle(args.market_id)?;
        let mut market = lock(&handle)?;

        if market.is_resolved() {
            msg!("Error: Market {} already resolved", market.market_id);
            return Err(PredictionMarketError::MarketAlreadyResolved);
        }

        if ctx.now >= market.resolution_time {
            msg!(
                "Error: Market {} expired at {} (now {})",
                market.market_id,
                market.resolution_time,
                ctx.now
            );
            return Err(PredictionMarketError::MarketExpired);
        }

        let position: Outcome = args.position.parse().map_err(|e| {
            msg!("Error: Position must be 'YES' or 'NO', got {:?}", args.position);
            e
        })?;

        let amount = ctx.attached_value;
        if amount < self.min_bet_amount {
            msg!("Error: Bet {} below minimum {}", amount, self.min_bet_amount);
            return Err(PredictionMarketError::InvalidAmount);
        }

        let fee = calculate_fee(amount, self.fee_rate_bps);
        let net_amount = amount - fee;

        let mut updated_market = market.clone();
        let pool = updated_market.pool_mut(position);
        *pool = safe_add_u64(*pool, net_amount)?;
        let stake = updated_market.bettors.entry(ctx.caller).or_default();
        let stake = stake.stake_mut(position);
        *stake = safe_add_u64(*stake, net_amount)?;
        updated_market.collected_fees = safe_add_u64(updated_market.collected_fees, fee)?;
        updated_market.bet_count = safe_add_u64(updated_market.bet_count, 1)?;

        // Read-modify-write of the bettor's history across markets.
        let _history_guard = lock(self.history_lock(&ctx.caller))?;
        let mut history = self.load_history(&ctx.caller)?;
        history.receipts.push(BetReceipt {
            market_id: market.market_id,
            position,
            net_amount,
            timestamp: ctx.now,
        });

        self.commit(vec![
            encode_record(Market::storage_key(market.market_id), &updated_market)?,
            encode_record(UserBetHistory::storage_key(&ctx.caller), &history)?,
        ])?;

        msg!(
            "Bet accepted: market {} {} net {} fee {} from {}",
            market.market_id,
            position,
            net_amount,
            fee,
            ctx.caller
        );

        *market = updated_market;

        Ok(net_amount)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use solana_program::pubkey::Pubkey;

    use super::*;
    use crate::engine::EngineConfig;
    use crate::oracle::{OracleError, OracleQuery};
    use crate::state::{MarketStatus, PRICE_PRECISION};
    use crate::store::{Key, MemoryStore, StoreError};
    use crate::transfer::TransferError;

    struct NoOracle;

    impl PriceOracle for NoOracle {
        fn resolve(&self, _query: &OracleQuery) -> Result<String, OracleError> {
            Err(OracleError::NoConsensus)
        }
    }

    struct NoTransfer;

    impl AccountTransfer for NoTransfer {
        fn send(&self, _to: &Pubkey, _amount: u64) -> Result<(), TransferError> {
            Ok(())
        }
    }

    const NOW: i64 = 1_700_000_000;
    const HOUR: i64 = 3600;

    fn engine() -> PredictionMarket<NoOracle, NoTransfer, Arc<MemoryStore>> {
        PredictionMarket::new(EngineConfig::default(), NoOracle, NoTransfer, Arc::new(MemoryStore::new())).unwrap()
    }

    fn btc_args() -> CreateMarketArgs {
        CreateMarketArgs {
            asset: "btc".into(),
            condition: "above".into(),
            threshold: "50000".into(),
            resolution_time: NOW + HOUR,
        }
    }

    fn bet(market_id: u64, position: &str) -> PlaceBetArgs {
        PlaceBetArgs { market_id, position: position.into() }
    }

    #[test]
    fn test_create_market_assigns_sequential_ids() {
        let engine = engine();
        let ctx = CallContext::new(Pubkey::new_unique(), NOW);

        assert_eq!(engine.create_market(&ctx, btc_args()).unwrap(), 1);
        assert_eq!(engine.create_market(&ctx, btc_args()).unwrap(), 2);

        let handle = engine.market_handle(1).unwrap();
        let market = handle.lock().unwrap();
        assert_eq!(market.asset, "BTC");
        assert_eq!(market.condition, Condition::Above);
        assert_eq!(market.threshold_e6, 50_000 * PRICE_PRECISION);
        assert_eq!(market.status, MarketStatus::Open);
        assert_eq!(market.final_result, None);
        assert_eq!(market.created_at, NOW);
        assert_eq!(market.total_pool(), 0);
        assert!(market.bettors.is_empty());
    }

    #[test]
    fn test_create_market_rejects_bad_arguments() {
        let engine = engine();
        let ctx = CallContext::new(Pubkey::new_unique(), NOW);

        let cases = [
            CreateMarketArgs { condition: "sideways".into(), ..btc_args() },
            CreateMarketArgs { asset: "".into(), ..btc_args() },
            CreateMarketArgs { threshold: "0".into(), ..btc_args() },
            CreateMarketArgs { threshold: "-1".into(), ..btc_args() },
            CreateMarketArgs { resolution_time: NOW, ..btc_args() },
            CreateMarketArgs { resolution_time: NOW - 1, ..btc_args() },
        ];
        for args in cases {
            assert_eq!(
                engine.create_market(&ctx, args),
                Err(PredictionMarketError::InvalidArgument)
            );
        }

        // Nothing was allocated
        assert_eq!(engine.ledger_state().unwrap().next_market_id, 1);
        assert_eq!(engine.create_market(&ctx, btc_args()).unwrap(), 1);
    }

    #[test]
    fn test_place_bet_deducts_fee() {
        let engine = engine();
        let creator = CallContext::new(Pubkey::new_unique(), NOW);
        let id = engine.create_market(&creator, btc_args()).unwrap();

        let alice = CallContext::new(Pubkey::new_unique(), NOW + 10).with_value(1000);
        assert_eq!(engine.place_bet(&alice, bet(id, "YES")).unwrap(), 990);
        assert_eq!(engine.place_bet(&alice, bet(id, "yes")).unwrap(), 990);

        let bob = CallContext::new(Pubkey::new_unique(), NOW + 20).with_value(500);
        assert_eq!(engine.place_bet(&bob, bet(id, "NO")).unwrap(), 495);

        let handle = engine.market_handle(id).unwrap();
        let market = handle.lock().unwrap();
        assert_eq!(market.yes_pool, 1980);
        assert_eq!(market.no_pool, 495);
        assert_eq!(market.position_of(&alice.caller).yes_stake, 1980);
        assert_eq!(market.position_of(&bob.caller).no_stake, 495);

        assert_eq!(market.collected_fees, 25);
        assert_eq!(market.bet_count, 3);

        let history = engine.load_history(&alice.caller).unwrap();
        assert_eq!(history.receipts.len(), 2);
    }

    #[test]
    fn test_zero_value_bet_creates_entry() {
        let engine = engine();
        let ctx = CallContext::new(Pubkey::new_unique(), NOW);
        let id = engine.create_market(&ctx, btc_args()).unwrap();

        assert_eq!(engine.place_bet(&ctx, bet(id, "NO")).unwrap(), 0);

        let handle = engine.market_handle(id).unwrap();
        let market = handle.lock().unwrap();
        assert!(market.bettors.contains_key(&ctx.caller));
        assert_eq!(market.total_pool(), 0);
    }

    #[test]
    fn test_place_bet_guards() {
        let engine = engine();
        let ctx = CallContext::new(Pubkey::new_unique(), NOW).with_value(100);
        let id = engine.create_market(&ctx, btc_args()).unwrap();

        assert_eq!(engine.place_bet(&ctx, bet(99, "YES")), Err(PredictionMarketError::MarketNotFound));
        assert_eq!(engine.place_bet(&ctx, bet(id, "MAYBE")), Err(PredictionMarketError::InvalidArgument));

        let late = CallContext { now: NOW + HOUR, ..ctx };
        assert_eq!(engine.place_bet(&late, bet(id, "YES")), Err(PredictionMarketError::MarketExpired));

        assert_eq!(engine.get_stats().unwrap().collected_fees, 0);
    }

    #[test]
    fn test_min_bet_amount() {
        let config = EngineConfig { min_bet_amount: 100, ..EngineConfig::default() };
        let engine = PredictionMarket::new(config, NoOracle, NoTransfer, MemoryStore::new()).unwrap();
        let ctx = CallContext::new(Pubkey::new_unique(), NOW);
        let id = engine.create_market(&ctx, btc_args()).unwrap();

        assert_eq!(
            engine.place_bet(&ctx.with_value(99), bet(id, "YES")),
            Err(PredictionMarketError::InvalidAmount)
        );
        assert_eq!(engine.place_bet(&ctx.with_value(100), bet(id, "YES")).unwrap(), 99);
    }

    #[test]
    fn test_bets_leave_ledger_record_alone() {
        let store = Arc::new(MemoryStore::new());
        let engine = PredictionMarket::new(EngineConfig::default(), NoOracle, NoTransfer, Arc::clone(&store)).unwrap();
        let ctx = CallContext::new(Pubkey::new_unique(), NOW).with_value(1000);
        let id = engine.create_market(&ctx, btc_args()).unwrap();
        let ledger_before = store.load(&LedgerState::storage_key()).unwrap();

        // Ledger lock held elsewhere: bets still go through.
        let _ledger = engine.ledger.lock().unwrap();
        engine.place_bet(&ctx, bet(id, "YES")).unwrap();
        engine.place_bet(&ctx, bet(id, "NO")).unwrap();

        assert_eq!(store.load(&LedgerState::storage_key()).unwrap(), ledger_before);
    }

    struct FailingStore {
        inner: MemoryStore,
        fail_writes: std::sync::atomic::AtomicBool,
    }

    impl AccountStore for FailingStore {
        fn load(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
            self.inner.load(key)
        }

        fn commit(&self, writes: Vec<(Key, Vec<u8>)>) -> Result<(), StoreError> {
            if self.fail_writes.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(StoreError::Write("disk full".into()));
            }
            self.inner.commit(writes)
        }
    }

    #[test]
    fn test_failed_commit_leaves_state_untouched() {
        let store = Arc::new(FailingStore {
            inner: MemoryStore::new(),
            fail_writes: std::sync::atomic::AtomicBool::new(false),
        });
        let engine = PredictionMarket::new(EngineConfig::default(), NoOracle, NoTransfer, Arc::clone(&store)).unwrap();
        let ctx = CallContext::new(Pubkey::new_unique(), NOW).with_value(1000);
        let id = engine.create_market(&ctx, btc_args()).unwrap();

        store.fail_writes.store(true, std::sync::atomic::Ordering::SeqCst);
        assert_eq!(engine.place_bet(&ctx, bet(id, "YES")), Err(PredictionMarketError::StoreWriteFailed));
        assert_eq!(engine.create_market(&ctx, btc_args()), Err(PredictionMarketError::StoreWriteFailed));

        {
            let handle = engine.market_handle(id).unwrap();
            let market = handle.lock().unwrap();
            assert_eq!(market.yes_pool, 0);
            assert_eq!(market.collected_fees, 0);
        }
        assert!(engine.load_history(&ctx.caller).unwrap().receipts.is_empty());
        assert_eq!(engine.ledger_state().unwrap().next_market_id, 2);
    }
}
