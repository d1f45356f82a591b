//! GenPredict Market Engine
//!
//! Pooled-liquidity binary prediction markets on crypto prices.
//!
//! ## Architecture
//!
//! The engine owns market and ledger records and relies on three
//! collaborators it never implements itself:
//! - `PriceOracle`: consensus-validated price judge returning one agreed payload
//! - `AccountTransfer`: pays winnings out to an account
//! - `AccountStore`: durable key/value storage for borsh records
//!
//! ## Key Features
//!
//! - Two-sided YES/NO pools, fee taken at stake time
//! - Exactly-once resolution; unusable oracle answers close the market as INVALID
//! - Proportional payouts from the combined pool, each stake paid at most once
//! - Per-market locking so independent markets proceed in parallel

pub mod error;
pub mod instruction;
pub mod processor;
pub mod state;
pub mod utils;
pub mod oracle;
pub mod transfer;
pub mod store;
pub mod engine;
pub mod lifecycle;
pub mod resolution;
pub mod settlement;
pub mod queries;

// Re-export commonly used items
pub use engine::{CallContext, EngineConfig, PredictionMarket};
pub use error::{PredictionMarketError, PredictionMarketResult};
pub use instruction::PredictionMarketInstruction;
pub use oracle::{OracleError, OracleQuery, PriceOracle};
pub use processor::{process_instruction, InstructionOutput};
pub use queries::{BetQuote, MarketOdds, MarketSnapshot, MarketStats};
pub use resolution::ResolutionReceipt;
pub use state::*;
pub use store::{AccountStore, MemoryStore, StoreError};
pub use transfer::{AccountTransfer, TransferError};
