//! Instruction processor for the GenPredict market engine

use borsh::BorshDeserialize;
use solana_program::msg;

use crate::engine::{CallContext, PredictionMarket};
use crate::error::{PredictionMarketError, PredictionMarketResult};
use crate::instruction::{OperationKind, PredictionMarketInstruction};
use crate::oracle::PriceOracle;
use crate::resolution::ResolutionReceipt;
use crate::store::AccountStore;
use crate::transfer::AccountTransfer;

/// Result of a processed instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstructionOutput {
    MarketCreated { market_id: u64 },
    BetAccepted { net_amount: u64 },
    MarketResolved(ResolutionReceipt),
    WinningsClaimed { amount: u64 },
}

/// Process a borsh-encoded instruction
pub fn process_instruction<O, T, S>(
    engine: &PredictionMarket<O, T, S>,
    ctx: &CallContext,
    instruction_data: &[u8],
) -> PredictionMarketResult<InstructionOutput>
where
    O: PriceOracle,
    T: AccountTransfer,
    S: AccountStore,
{
    let instruction = PredictionMarketInstruction::try_from_slice(instruction_data).map_err(|_| {
        msg!("Error: Undecodable instruction ({} bytes)", instruction_data.len());
        PredictionMarketError::InvalidInstruction
    })?;

    if instruction.kind() != OperationKind::ValueAccepting && ctx.attached_value > 0 {
        msg!(
            "Error: {} does not accept value ({} attached)",
            instruction.name(),
            ctx.attached_value
        );
        return Err(PredictionMarketError::NonPayable);
    }

    match instruction {
        PredictionMarketInstruction::CreateMarket(args) => {
            msg!("Instruction: CreateMarket");
            let market_id = engine.create_market(ctx, args)?;
            Ok(InstructionOutput::MarketCreated { market_id })
        }
        PredictionMarketInstruction::PlaceBet(args) => {
            msg!("Instruction: PlaceBet");
            let net_amount = engine.place_bet(ctx, args)?;
            Ok(InstructionOutput::BetAccepted { net_amount })
        }
        PredictionMarketInstruction::ResolveMarket(args) => {
            msg!("Instruction: ResolveMarket");
            let receipt = engine.resolve_market(ctx, args.market_id)?;
            Ok(InstructionOutput::MarketResolved(receipt))
        }
        PredictionMarketInstruction::ClaimWinnings(args) => {
            msg!("Instruction: ClaimWinnings");
            let amount = engine.claim_winnings(ctx, args.market_id)?;
            Ok(InstructionOutput::WinningsClaimed { amount })
        }
    }
}

#[cfg(test)]
mod tests {
    use borsh::BorshSerialize;
    use solana_program::pubkey::Pubkey;

    use super::*;
    use crate::engine::EngineConfig;
    use crate::instruction::{ClaimWinningsArgs, CreateMarketArgs, PlaceBetArgs, ResolveMarketArgs};
    use crate::oracle::{OracleError, OracleQuery};
    use crate::state::MarketResult;
    use crate::store::MemoryStore;
    use crate::transfer::TransferError;

    struct FixedOracle;

    impl PriceOracle for FixedOracle {
        fn resolve(&self, _query: &OracleQuery) -> Result<String, OracleError> {
            Ok(r#"{"price": 51000, "outcome": "YES"}"#.to_string())
        }
    }

    struct NoTransfer;

    impl AccountTransfer for NoTransfer {
        fn send(&self, _to: &Pubkey, _amount: u64) -> Result<(), TransferError> {
            Ok(())
        }
    }

    const NOW: i64 = 1_700_000_000;

    fn data(ix: PredictionMarketInstruction) -> Vec<u8> {
        ix.try_to_vec().unwrap()
    }

    #[test]
    fn test_full_flow_through_processor() {
        let engine = PredictionMarket::new(EngineConfig::default(), FixedOracle, NoTransfer, MemoryStore::new()).unwrap();
        let user = Pubkey::new_unique();

        let create = data(PredictionMarketInstruction::CreateMarket(CreateMarketArgs {
            asset: "BTC".into(),
            condition: "above".into(),
            threshold: "50000".into(),
            resolution_time: NOW + 60,
        }));
        let out = process_instruction(&engine, &CallContext::new(user, NOW), &create).unwrap();
        assert_eq!(out, InstructionOutput::MarketCreated { market_id: 1 });

        let bet = data(PredictionMarketInstruction::PlaceBet(PlaceBetArgs {
            market_id: 1,
            position: "YES".into(),
        }));
        let out = process_instruction(&engine, &CallContext::new(user, NOW).with_value(1000), &bet).unwrap();
        assert_eq!(out, InstructionOutput::BetAccepted { net_amount: 990 });

        let resolve = data(PredictionMarketInstruction::ResolveMarket(ResolveMarketArgs { market_id: 1 }));
        match process_instruction(&engine, &CallContext::new(user, NOW + 60), &resolve).unwrap() {
            InstructionOutput::MarketResolved(receipt) => assert_eq!(receipt.outcome, MarketResult::Yes),
            other => panic!("unexpected output {:?}", other),
        }

        let claim = data(PredictionMarketInstruction::ClaimWinnings(ClaimWinningsArgs { market_id: 1 }));
        let out = process_instruction(&engine, &CallContext::new(user, NOW + 61), &claim).unwrap();
        assert_eq!(out, InstructionOutput::WinningsClaimed { amount: 990 });
    }

    #[test]
    fn test_rejects_value_on_non_payable() {
        let engine = PredictionMarket::new(EngineConfig::default(), FixedOracle, NoTransfer, MemoryStore::new()).unwrap();
        let create = data(PredictionMarketInstruction::CreateMarket(CreateMarketArgs {
            asset: "BTC".into(),
            condition: "above".into(),
            threshold: "50000".into(),
            resolution_time: NOW + 60,
        }));
        let ctx = CallContext::new(Pubkey::new_unique(), NOW).with_value(5);

        assert_eq!(
            process_instruction(&engine, &ctx, &create),
            Err(PredictionMarketError::NonPayable)
        );
        assert!(engine.get_all_market_ids().unwrap().is_empty());
    }

    #[test]
    fn test_rejects_garbage() {
        let engine = PredictionMarket::new(EngineConfig::default(), FixedOracle, NoTransfer, MemoryStore::new()).unwrap();
        let ctx = CallContext::new(Pubkey::new_unique(), NOW);
        assert_eq!(
            process_instruction(&engine, &ctx, &[42, 1, 2]),
            Err(PredictionMarketError::InvalidInstruction)
        );
        assert_eq!(
            process_instruction(&engine, &ctx, &[]),
            Err(PredictionMarketError::InvalidInstruction)
        );
    }
}
