//! Single-token exits that burn BPT for one of the pool's tokens.

use crate::actions::{
    action_min_out, pool_token_index, validate_asset_index, validate_slippage, ActionAmount, ActionStep,
    ActionType, ChainedReference, Chaining, ChainedReferenceKey, OperationTokens, OutputReference, Party, PoolId,
    PoolKind,
};
use crate::encoding::exit_exact_bpt_in_for_one_token_out_user_data;
use crate::ActionResult;
use alloy::primitives::{Address, Bytes, U256};

/// Caller input for an exit.
#[derive(Clone, Debug)]
pub struct ExitParams {
    pub pool_id: PoolId,
    pub pool_kind: PoolKind,
    /// Tokens registered in the pool, in vault order.
    pub pool_tokens: Vec<Address>,
    pub token_out: Address,
    /// Index of the pool's BPT in the operation's asset list.
    pub asset_in_index: usize,
    /// Index of `token_out` in the operation's asset list.
    pub asset_out_index: usize,
    pub bpt_amount_in: U256,
    pub expected_amount_out: U256,
    pub slippage_bps: u32,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExitAction {
    pub pool_id: PoolId,
    pub pool_kind: PoolKind,
    pub pool_tokens: Vec<Address>,
    pub token_out: Address,
    pub step: ActionStep,
    pub bpt_amount_in: ActionAmount,
    pub min_amount_out: U256,
    pub has_token_in: bool,
    pub has_token_out: bool,
    pub sender: Party,
    pub recipient: Party,
    pub to_internal_balance: bool,
    pub output_reference: Option<OutputReference>,
    token_out_pool_index: usize,
}

impl ExitAction {
    /// Builds the exit and returns the next free chained reference key.
    ///
    /// The output reference, when allocated, points at the exit token's
    /// position in the pool tokens since that is where the relayer reads it.
    pub fn new(
        params: ExitParams,
        operation: OperationTokens,
        key: ChainedReferenceKey,
    ) -> ActionResult<(Self, ChainedReferenceKey)> {
        validate_slippage(params.slippage_bps)?;
        let token_out_pool_index = pool_token_index(&params.pool_tokens, params.token_out)?;

        let chaining = Chaining::resolve(
            operation,
            ActionType::Exit,
            params.asset_in_index,
            params.asset_out_index,
            token_out_pool_index,
            params.bpt_amount_in,
            key,
        );
        let has_token_in = chaining.step.has_token_in();
        let has_token_out = chaining.step.has_token_out();
        let min_amount_out = if has_token_out {
            action_min_out(ActionAmount::Literal(params.expected_amount_out), params.slippage_bps)
        } else {
            U256::ZERO
        };

        let exit = Self {
            pool_id: params.pool_id,
            pool_kind: params.pool_kind,
            pool_tokens: params.pool_tokens,
            token_out: params.token_out,
            step: chaining.step,
            bpt_amount_in: chaining.amount_in,
            min_amount_out,
            has_token_in,
            has_token_out,
            sender: Party::sender(has_token_in),
            recipient: Party::recipient(has_token_out),
            to_internal_balance: !has_token_out,
            output_reference: chaining.output_reference,
            token_out_pool_index,
        };
        Ok((exit, chaining.next_key))
    }

    /// Convenience wrapper that also checks the asset indices against `asset_count`.
    pub fn with_asset_count(
        params: ExitParams,
        operation: OperationTokens,
        asset_count: usize,
        key: ChainedReferenceKey,
    ) -> ActionResult<(Self, ChainedReferenceKey)> {
        validate_asset_index(params.asset_in_index, asset_count)?;
        validate_asset_index(params.asset_out_index, asset_count)?;
        Self::new(params, operation, key)
    }

    pub fn token_out_pool_index(&self) -> usize {
        self.token_out_pool_index
    }

    pub(crate) fn add_output_peek(&mut self, reference: ChainedReference) {
        if self.has_token_out && self.output_reference.is_none() {
            self.output_reference = Some(OutputReference { index: self.token_out_pool_index, key: reference });
        }
    }

    /// Per-pool-token minimums: the slippage-adjusted amount at the exit token, zero elsewhere.
    pub fn min_amounts_out(&self) -> Vec<U256> {
        let mut amounts = vec![U256::ZERO; self.pool_tokens.len()];
        amounts[self.token_out_pool_index] = self.min_amount_out;
        amounts
    }

    pub fn user_data(&self) -> Bytes {
        exit_exact_bpt_in_for_one_token_out_user_data(self.bpt_amount_in.to_u256(), self.token_out_pool_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ChainedReference;
    use alloy::primitives::{address, b256};

    const WETH: Address = address!("c02aaa39b223fe8d0a0e5c4f27ead9083c756cc2");
    const BAL: Address = address!("ba100000625a3754423978a60c9317c58a424e3d");

    fn params(asset_in_index: usize, asset_out_index: usize) -> ExitParams {
        ExitParams {
            pool_id: PoolId(b256!("5c6ee304399dbdb9c8ef030ab642b10820db8f56000200000000000000000014")),
            pool_kind: PoolKind::Weighted,
            pool_tokens: vec![BAL, WETH],
            token_out: WETH,
            asset_in_index,
            asset_out_index,
            bpt_amount_in: U256::from(5_000u64),
            expected_amount_out: U256::from(10_000u64),
            slippage_bps: 50,
        }
    }

    #[test]
    fn test_output_exit_reads_previous_reference() {
        let operation = OperationTokens::new(0, 2);
        let (exit, next) = ExitAction::new(params(1, 2), operation, ChainedReferenceKey::new(1)).unwrap();

        assert_eq!(exit.step, ActionStep::TokenOut);
        assert_eq!(
            exit.bpt_amount_in,
            ActionAmount::Chained(ChainedReference::temporary(ChainedReferenceKey::new(0)))
        );
        assert_eq!(exit.sender, Party::Relayer);
        assert_eq!(exit.recipient, Party::User);
        assert!(!exit.to_internal_balance);
        assert_eq!(exit.min_amounts_out(), vec![U256::ZERO, U256::from(9_950u64)]);
        assert!(exit.output_reference.is_none());
        assert_eq!(next, ChainedReferenceKey::new(1));
    }

    #[test]
    fn test_entry_exit_references_pool_token_index() {
        let operation = OperationTokens::new(1, 3);
        let (exit, next) = ExitAction::new(params(1, 2), operation, ChainedReferenceKey::new(0)).unwrap();

        assert_eq!(exit.step, ActionStep::TokenIn);
        assert_eq!(exit.bpt_amount_in, ActionAmount::Literal(U256::from(5_000u64)));
        assert_eq!(exit.sender, Party::User);
        assert!(exit.to_internal_balance);
        assert_eq!(exit.output_reference.map(|r| r.index), Some(1));
        assert_eq!(next, ChainedReferenceKey::new(1));
    }
}
