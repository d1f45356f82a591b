//! Engine state, configuration and record plumbing
//!
//! Every market record sits behind its own mutex so independent markets can
//! be mutated in parallel. Bet histories are guarded by a fixed set of
//! striped locks keyed by owner. The ledger record (market counter) has its
//! own mutex and is only taken by market creation.
//!
//! Lock order is always: ledger -> market cache -> market -> history stripe.
//!
//! The market cache is bounded. Once it reaches capacity, entries nobody is
//! holding are dropped; every mutation is committed before it is applied in
//! memory, so an evicted market reloads from the store unchanged.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{msg, pubkey::Pubkey};

use crate::error::{PredictionMarketError, PredictionMarketResult};
use crate::oracle::PriceOracle;
use crate::state::{
    LedgerState, Market, UserBetHistory, BPS_DENOMINATOR, DEFAULT_FEE_RATE_BPS,
    LEDGER_DISCRIMINATOR, MARKET_DISCRIMINATOR, USER_BETS_DISCRIMINATOR,
};
use crate::store::{AccountStore, Key};
use crate::transfer::AccountTransfer;
use crate::utils::deserialize_account;

/// Markets kept in memory before idle entries are evicted
pub const DEFAULT_MARKET_CACHE_CAPACITY: usize = 1024;

/// Number of striped bet-history locks
pub const HISTORY_LOCK_STRIPES: usize = 64;

/// Engine settings; fee rate and minimum bet only apply when a ledger is first created
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Fee taken from every bet (basis points)
    pub fee_rate_bps: u16,
    /// Smallest attached value accepted by place_bet
    pub min_bet_amount: u64,
    /// Reject resolution attempts before the market deadline
    pub enforce_resolution_deadline: bool,
    /// Markets kept in memory before idle entries are evicted
    pub market_cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fee_rate_bps: DEFAULT_FEE_RATE_BPS,
            min_bet_amount: 0,
            enforce_resolution_deadline: true,
            market_cache_capacity: DEFAULT_MARKET_CACHE_CAPACITY,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> PredictionMarketResult<()> {
        if u64::from(self.fee_rate_bps) > BPS_DENOMINATOR {
            msg!("Error: Fee rate {} bps exceeds {}", self.fee_rate_bps, BPS_DENOMINATOR);
            return Err(PredictionMarketError::InvalidArgument);
        }
        if self.market_cache_capacity == 0 {
            msg!("Error: Market cache capacity must be positive");
            return Err(PredictionMarketError::InvalidArgument);
        }
        Ok(())
    }
}

/// Per-call context supplied by the boundary layer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallContext {
    /// Authenticated caller
    pub caller: Pubkey,
    /// Value attached to the call
    pub attached_value: u64,
    /// Current Unix timestamp
    pub now: i64,
}

impl CallContext {
    pub fn new(caller: Pubkey, now: i64) -> Self {
        Self {
            caller,
            attached_value: 0,
            now,
        }
    }

    pub fn with_value(mut self, attached_value: u64) -> Self {
        self.attached_value = attached_value;
        self
    }
}

/// Pooled YES/NO prediction market engine
pub struct PredictionMarket<O, T, S> {
    pub(crate) config: EngineConfig,
    pub(crate) oracle: O,
    pub(crate) transfer: T,
    pub(crate) store: S,
    /// Fee rate in force, fixed by the ledger record
    pub(crate) fee_rate_bps: u16,
    /// Minimum bet in force, fixed by the ledger record
    pub(crate) min_bet_amount: u64,
    pub(crate) ledger: Mutex<LedgerState>,
    pub(crate) markets: RwLock<HashMap<u64, Arc<Mutex<Market>>>>,
    history_locks: Vec<Mutex<()>>,
}

impl<O, T, S> PredictionMarket<O, T, S>
where
    O: PriceOracle,
    T: AccountTransfer,
    S: AccountStore,
{
    /// Open the engine over `store`, creating the ledger record on first use.
    ///
    /// An existing ledger record wins over `config` for fee rate and minimum bet.
    pub fn new(config: EngineConfig, oracle: O, transfer: T, store: S) -> PredictionMarketResult<Self> {
        config.validate()?;

        let ledger = match load_record::<LedgerState, S>(&store, &LedgerState::storage_key())? {
            Some(ledger) => {
                if ledger.discriminator != LEDGER_DISCRIMINATOR {
                    msg!("Error: Invalid LedgerState discriminator");
                    return Err(PredictionMarketError::InvalidAccountData);
                }
                if ledger.fee_rate_bps != config.fee_rate_bps {
                    msg!(
                        "Ledger restored with fee rate {} bps (configured {} bps ignored)",
                        ledger.fee_rate_bps,
                        config.fee_rate_bps
                    );
                }
                msg!("Ledger restored: {} markets", ledger.market_count());
                ledger
            }
            None => {
                let ledger = LedgerState::new(config.fee_rate_bps, config.min_bet_amount);
                commit_records(&store, vec![encode_record(LedgerState::storage_key(), &ledger)?])?;
                msg!("Ledger initialized: fee rate {} bps", ledger.fee_rate_bps);
                ledger
            }
        };

        Ok(Self {
            config,
            oracle,
            transfer,
            store,
            fee_rate_bps: ledger.fee_rate_bps,
            min_bet_amount: ledger.min_bet_amount,
            ledger: Mutex::new(ledger),
            markets: RwLock::new(HashMap::new()),
            history_locks: (0..HISTORY_LOCK_STRIPES).map(|_| Mutex::new(())).collect(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Copy of the current ledger record
    pub fn ledger_state(&self) -> PredictionMarketResult<LedgerState> {
        Ok(lock(&self.ledger)?.clone())
    }

    /// Shared handle to a market record, loading it from the store on a cache miss
    pub(crate) fn market_handle(&self, market_id: u64) -> PredictionMarketResult<Arc<Mutex<Market>>> {
        {
            let markets = self
                .markets
                .read()
                .map_err(|_| PredictionMarketError::StateUnavailable)?;
            if let Some(handle) = markets.get(&market_id) {
                return Ok(Arc::clone(handle));
            }
        }

        // Misses load under the write lock so an evicted record can never be
        // replaced by a copy read before its last commit.
        let mut markets = self
            .markets
            .write()
            .map_err(|_| PredictionMarketError::StateUnavailable)?;
        if let Some(handle) = markets.get(&market_id) {
            return Ok(Arc::clone(handle));
        }

        let market = match load_record::<Market, S>(&self.store, &Market::storage_key(market_id))? {
            Some(market) => market,
            None => {
                msg!("Error: Market {} not found", market_id);
                return Err(PredictionMarketError::MarketNotFound);
            }
        };
        if market.discriminator != MARKET_DISCRIMINATOR || market.market_id != market_id {
            msg!("Error: Invalid Market record for id {}", market_id);
            return Err(PredictionMarketError::InvalidAccountData);
        }

        self.make_room(&mut markets);
        let handle = Arc::new(Mutex::new(market));
        markets.insert(market_id, Arc::clone(&handle));
        Ok(handle)
    }

    /// Publish a freshly created market in the cache
    pub(crate) fn insert_market(&self, market: Market) -> PredictionMarketResult<()> {
        let mut markets = self
            .markets
            .write()
            .map_err(|_| PredictionMarketError::StateUnavailable)?;
        if markets.contains_key(&market.market_id) {
            return Ok(());
        }
        self.make_room(&mut markets);
        markets.insert(market.market_id, Arc::new(Mutex::new(market)));
        Ok(())
    }

    /// Drop cached markets no caller is holding once the cache is full
    fn make_room(&self, markets: &mut HashMap<u64, Arc<Mutex<Market>>>) {
        if markets.len() < self.config.market_cache_capacity {
            return;
        }
        let before = markets.len();
        markets.retain(|_, handle| Arc::strong_count(handle) > 1);
        msg!("Market cache evicted {} idle entries", before - markets.len());
    }

    /// Lock guarding the bet history of `owner`
    pub(crate) fn history_lock(&self, owner: &Pubkey) -> &Mutex<()> {
        let mut hasher = DefaultHasher::new();
        owner.hash(&mut hasher);
        let stripe = (hasher.finish() % self.history_locks.len() as u64) as usize;
        &self.history_locks[stripe]
    }

    /// Bet history of `owner` as committed, empty if none was ever recorded
    pub(crate) fn load_history(&self, owner: &Pubkey) -> PredictionMarketResult<UserBetHistory> {
        match load_record::<UserBetHistory, S>(&self.store, &UserBetHistory::storage_key(owner))? {
            Some(history) => {
                if history.discriminator != USER_BETS_DISCRIMINATOR || history.owner != *owner {
                    msg!("Error: Invalid UserBetHistory record for {}", owner);
                    return Err(PredictionMarketError::InvalidAccountData);
                }
                Ok(history)
            }
            None => Ok(UserBetHistory::new(*owner)),
        }
    }

    pub(crate) fn commit(&self, writes: Vec<(Key, Vec<u8>)>) -> PredictionMarketResult<()> {
        commit_records(&self.store, writes)
    }
}

/// Lock a mutex, treating poisoning as unavailable state
pub(crate) fn lock<X>(mutex: &Mutex<X>) -> PredictionMarketResult<MutexGuard<'_, X>> {
    mutex.lock().map_err(|_| {
        msg!("Error: Engine state lock poisoned");
        PredictionMarketError::StateUnavailable
    })
}

pub(crate) fn encode_record<R: BorshSerialize>(key: Key, record: &R) -> PredictionMarketResult<(Key, Vec<u8>)> {
    let data = record
        .try_to_vec()
        .map_err(|_| PredictionMarketError::InvalidAccountData)?;
    Ok((key, data))
}

fn load_record<R: BorshDeserialize, S: AccountStore>(store: &S, key: &[u8]) -> PredictionMarketResult<Option<R>> {
    let data = store.load(key).map_err(|e| {
        msg!("Error: {}", e);
        PredictionMarketError::StateUnavailable
    })?;
    data.map(|bytes| deserialize_account::<R>(&bytes)).transpose()
}

fn commit_records<S: AccountStore>(store: &S, writes: Vec<(Key, Vec<u8>)>) -> PredictionMarketResult<()> {
    store.commit(writes).map_err(|e| {
        msg!("Error: {}", e);
        PredictionMarketError::StoreWriteFailed
    })
}
