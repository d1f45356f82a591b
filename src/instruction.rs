//! Instruction definitions for the GenPredict market engine

use borsh::{BorshDeserialize, BorshSerialize};

/// State-mutating requests accepted by the processor
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub enum PredictionMarketInstruction {
    /// Create a new price market
    ///
    /// Caller becomes the creator. Attached value is not accepted.
    CreateMarket(CreateMarketArgs),

    /// Stake the attached value on one side of a market
    ///
    /// The configured fee is deducted before the stake is recorded.
    PlaceBet(PlaceBetArgs),

    /// Ask the oracle for the outcome and close the market
    ResolveMarket(ResolveMarketArgs),

    /// Pay the caller's share of a resolved market
    ClaimWinnings(ClaimWinningsArgs),
}

impl PredictionMarketInstruction {
    /// Public operation name
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateMarket(_) => "create_market",
            Self::PlaceBet(_) => "place_bet",
            Self::ResolveMarket(_) => "resolve_market",
            Self::ClaimWinnings(_) => "claim_winnings",
        }
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            Self::PlaceBet(_) => OperationKind::ValueAccepting,
            Self::CreateMarket(_) | Self::ResolveMarket(_) | Self::ClaimWinnings(_) => {
                OperationKind::NonValueMutation
            }
        }
    }
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct CreateMarketArgs {
    /// Asset symbol, upper-cased on creation
    pub asset: String,
    /// "above" or "below"
    pub condition: String,
    /// Positive decimal threshold price
    pub threshold: String,
    /// Resolution deadline (Unix timestamp)
    pub resolution_time: i64,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct PlaceBetArgs {
    pub market_id: u64,
    /// "YES" or "NO"
    pub position: String,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct ResolveMarketArgs {
    pub market_id: u64,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct ClaimWinningsArgs {
    pub market_id: u64,
}

/// Classification of a public operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    /// Mutation that consumes the attached value
    ValueAccepting,
    /// Mutation that must not carry value
    NonValueMutation,
    /// Side-effect free query
    Read,
}

/// Every public operation name and its kind
pub const PUBLIC_OPERATIONS: &[(&str, OperationKind)] = &[
    ("create_market", OperationKind::NonValueMutation),
    ("place_bet", OperationKind::ValueAccepting),
    ("resolve_market", OperationKind::NonValueMutation),
    ("claim_winnings", OperationKind::NonValueMutation),
    ("get_market", OperationKind::Read),
    ("get_all_market_ids", OperationKind::Read),
    ("get_all_markets", OperationKind::Read),
    ("get_active_markets", OperationKind::Read),
    ("get_user_bets", OperationKind::Read),
    ("get_user_position", OperationKind::Read),
    ("get_market_odds", OperationKind::Read),
    ("get_stats", OperationKind::Read),
    ("quote_bet", OperationKind::Read),
];

pub fn operation_kind(name: &str) -> Option<OperationKind> {
    PUBLIC_OPERATIONS
        .iter()
        .find(|(op, _)| *op == name)
        .map(|(_, kind)| *kind)
}
