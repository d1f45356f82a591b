//! State definitions for the GenPredict market engine
//!
//! All persisted record structures used by the engine.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::Serialize;
use solana_program::pubkey::Pubkey;

use crate::error::PredictionMarketError;

// ============================================================================
// Discriminators
// ============================================================================

pub const LEDGER_DISCRIMINATOR: u64 = 0x4C45444745525F5F; // "LEDGER__"
pub const MARKET_DISCRIMINATOR: u64 = 0x4D41524B45545F5F; // "MARKET__"
pub const USER_BETS_DISCRIMINATOR: u64 = 0x555345525F424554; // "USER_BET"

// ============================================================================
// Record Seeds
// ============================================================================

pub const LEDGER_SEED: &[u8] = b"ledger";
pub const MARKET_SEED: &[u8] = b"market";
pub const USER_BETS_SEED: &[u8] = b"user_bets";

// ============================================================================
// Constants
// ============================================================================

/// Basis point denominator (10_000 = 100%)
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Default bet fee (100 = 1%)
pub const DEFAULT_FEE_RATE_BPS: u16 = 100;

/// Price precision (1.0 = 1_000_000)
pub const PRICE_PRECISION: u64 = 1_000_000;

/// Fractional digits kept for thresholds and resolution prices
pub const PRICE_DECIMALS: usize = 6;

/// Maximum length of an asset symbol (bytes)
pub const MAX_ASSET_LEN: usize = 16;

/// First id handed out by a fresh ledger
pub const FIRST_MARKET_ID: u64 = 1;

// ============================================================================
// Enums
// ============================================================================

/// Price comparison a market is created on
#[derive(BorshSerialize, BorshDeserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    Above = 0,
    Below = 1,
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::Above => "above",
            Condition::Below => "below",
        }
    }
}

impl FromStr for Condition {
    type Err = PredictionMarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "above" => Ok(Condition::Above),
            "below" => Ok(Condition::Below),
            _ => Err(PredictionMarketError::InvalidArgument),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Side of a market a stake is placed on
#[derive(BorshSerialize, BorshDeserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Yes = 0,
    No = 1,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Yes => "YES",
            Outcome::No => "NO",
        }
    }
}

impl FromStr for Outcome {
    type Err = PredictionMarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "YES" => Ok(Outcome::Yes),
            "NO" => Ok(Outcome::No),
            _ => Err(PredictionMarketError::InvalidArgument),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Market lifecycle status
#[derive(BorshSerialize, BorshDeserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketStatus {
    /// Accepting bets until the resolution time
    Open = 0,
    /// Outcome committed (terminal)
    Resolved = 1,
}

impl Default for MarketStatus {
    fn default() -> Self {
        MarketStatus::Open
    }
}

/// Market resolution result
#[derive(BorshSerialize, BorshDeserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketResult {
    /// YES stakes share the whole pool
    Yes = 0,
    /// NO stakes share the whole pool
    No = 1,
    /// Oracle answer unusable, nobody is paid
    Invalid = 2,
}

impl MarketResult {
    /// Winning side, if the result pays anyone
    pub fn winning_side(&self) -> Option<Outcome> {
        match self {
            MarketResult::Yes => Some(Outcome::Yes),
            MarketResult::No => Some(Outcome::No),
            MarketResult::Invalid => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MarketResult::Yes => "YES",
            MarketResult::No => "NO",
            MarketResult::Invalid => "INVALID",
        }
    }
}

impl From<Outcome> for MarketResult {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Yes => MarketResult::Yes,
            Outcome::No => MarketResult::No,
        }
    }
}

// ============================================================================
// Record Structures
// ============================================================================

/// Market counter and fee settings
///
/// Seeds: ["ledger"]
///
/// Only market creation writes this record. Fees and bet counts live on
/// each market so bets never contend on it.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct LedgerState {
    /// Record discriminator
    pub discriminator: u64,

    /// Next market ID
    pub next_market_id: u64,

    /// Fee taken from every bet (basis points)
    pub fee_rate_bps: u16,

    /// Smallest attached value accepted by place_bet
    pub min_bet_amount: u64,

    /// Reserved for future use
    pub reserved: [u8; 32],
}

impl LedgerState {
    pub const SIZE: usize = 8   // discriminator
        + 8   // next_market_id
        + 2   // fee_rate_bps
        + 8   // min_bet_amount
        + 32; // reserved (= 58 total)

    /// Record seeds
    pub fn seeds() -> Vec<Vec<u8>> {
        vec![LEDGER_SEED.to_vec()]
    }

    pub fn storage_key() -> Vec<u8> {
        Self::seeds().concat()
    }

    /// Create a fresh ledger
    pub fn new(fee_rate_bps: u16, min_bet_amount: u64) -> Self {
        Self {
            discriminator: LEDGER_DISCRIMINATOR,
            next_market_id: FIRST_MARKET_ID,
            fee_rate_bps,
            min_bet_amount,
            reserved: [0u8; 32],
        }
    }

    /// Number of markets ever created
    pub fn market_count(&self) -> u64 {
        self.next_market_id - FIRST_MARKET_ID
    }
}

/// A bettor's net stake on each side of one market
#[derive(BorshSerialize, BorshDeserialize, Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StakePosition {
    pub yes_stake: u64,
    pub no_stake: u64,
}

impl StakePosition {
    pub fn stake(&self, side: Outcome) -> u64 {
        match side {
            Outcome::Yes => self.yes_stake,
            Outcome::No => self.no_stake,
        }
    }

    pub fn stake_mut(&mut self, side: Outcome) -> &mut u64 {
        match side {
            Outcome::Yes => &mut self.yes_stake,
            Outcome::No => &mut self.no_stake,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.yes_stake == 0 && self.no_stake == 0
    }
}

/// A single binary price market
///
/// Seeds: ["market", market_id.to_le_bytes()]
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct Market {
    /// Record discriminator
    pub discriminator: u64,

    /// Unique market ID
    pub market_id: u64,

    /// Market creator
    pub creator: Pubkey,

    /// Upper-cased asset symbol
    pub asset: String,

    /// Price comparison
    pub condition: Condition,

    /// Threshold price (e6)
    pub threshold_e6: u64,

    /// Resolution deadline (Unix timestamp)
    pub resolution_time: i64,

    /// Market creation timestamp
    pub created_at: i64,

    /// Current market status
    pub status: MarketStatus,

    /// Final result, None while open
    pub final_result: Option<MarketResult>,

    /// Price reported by the oracle (e6), set on YES/NO resolution
    pub resolution_price_e6: Option<u64>,

    /// Sum of all net YES stakes, less what claims have paid out
    pub yes_pool: u64,

    /// Sum of all net NO stakes, less what claims have paid out
    pub no_pool: u64,

    /// YES pool as it stood when the market resolved
    pub resolved_yes_pool: u64,

    /// NO pool as it stood when the market resolved
    pub resolved_no_pool: u64,

    /// Fees taken from bets on this market (never decreases)
    pub collected_fees: u64,

    /// Bets accepted on this market
    pub bet_count: u64,

    /// Per-bettor stakes, entry created on first bet
    pub bettors: BTreeMap<Pubkey, StakePosition>,
}

impl Market {
    /// Record seeds
    pub fn seeds(market_id: u64) -> Vec<Vec<u8>> {
        vec![MARKET_SEED.to_vec(), market_id.to_le_bytes().to_vec()]
    }

    pub fn storage_key(market_id: u64) -> Vec<u8> {
        Self::seeds(market_id).concat()
    }

    /// Create an open market with empty pools
    pub fn new(
        market_id: u64,
        creator: Pubkey,
        asset: String,
        condition: Condition,
        threshold_e6: u64,
        resolution_time: i64,
        created_at: i64,
    ) -> Self {
        Self {
            discriminator: MARKET_DISCRIMINATOR,
            market_id,
            creator,
            asset,
            condition,
            threshold_e6,
            resolution_time,
            created_at,
            status: MarketStatus::Open,
            final_result: None,
            resolution_price_e6: None,
            yes_pool: 0,
            no_pool: 0,
            resolved_yes_pool: 0,
            resolved_no_pool: 0,
            collected_fees: 0,
            bet_count: 0,
            bettors: BTreeMap::new(),
        }
    }

    /// Check if market accepts bets at `current_time`
    pub fn is_tradeable(&self, current_time: i64) -> bool {
        self.status == MarketStatus::Open && current_time < self.resolution_time
    }

    /// Check if the resolution deadline has passed
    pub fn can_resolve(&self, current_time: i64) -> bool {
        self.status == MarketStatus::Open && current_time >= self.resolution_time
    }

    pub fn is_resolved(&self) -> bool {
        self.status == MarketStatus::Resolved
    }

    pub fn pool(&self, side: Outcome) -> u64 {
        match side {
            Outcome::Yes => self.yes_pool,
            Outcome::No => self.no_pool,
        }
    }

    pub fn pool_mut(&mut self, side: Outcome) -> &mut u64 {
        match side {
            Outcome::Yes => &mut self.yes_pool,
            Outcome::No => &mut self.no_pool,
        }
    }

    /// Both sides combined
    pub fn total_pool(&self) -> u64 {
        self.yes_pool.saturating_add(self.no_pool)
    }

    /// Freeze the current pools as the basis for every payout
    pub fn snapshot_pools(&mut self) {
        self.resolved_yes_pool = self.yes_pool;
        self.resolved_no_pool = self.no_pool;
    }

    /// Pool of one side at resolution time
    pub fn resolved_pool(&self, side: Outcome) -> u64 {
        match side {
            Outcome::Yes => self.resolved_yes_pool,
            Outcome::No => self.resolved_no_pool,
        }
    }

    /// Both sides combined at resolution time
    pub fn resolved_total_pool(&self) -> u64 {
        self.resolved_yes_pool.saturating_add(self.resolved_no_pool)
    }

    /// Stake of one bettor, zero if they never bet
    pub fn position_of(&self, bettor: &Pubkey) -> StakePosition {
        self.bettors.get(bettor).copied().unwrap_or_default()
    }
}

/// One accepted bet as seen by the bettor
#[derive(BorshSerialize, BorshDeserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct BetReceipt {
    pub market_id: u64,
    pub position: Outcome,
    pub net_amount: u64,
    pub timestamp: i64,
}

/// Append-only bet history of one bettor
///
/// Seeds: ["user_bets", owner]
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct UserBetHistory {
    /// Record discriminator
    pub discriminator: u64,

    /// Bettor
    pub owner: Pubkey,

    /// Receipts in placement order
    pub receipts: Vec<BetReceipt>,
}

impl UserBetHistory {
    /// Record seeds
    pub fn seeds(owner: &Pubkey) -> Vec<Vec<u8>> {
        vec![USER_BETS_SEED.to_vec(), owner.to_bytes().to_vec()]
    }

    pub fn storage_key(owner: &Pubkey) -> Vec<u8> {
        Self::seeds(owner).concat()
    }

    pub fn new(owner: Pubkey) -> Self {
        Self {
            discriminator: USER_BETS_DISCRIMINATOR,
            owner,
            receipts: Vec::new(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
