//! Single-token joins that mint a pool's BPT.

use crate::actions::{
    action_min_out, pool_token_index, validate_asset_index, validate_slippage, ActionAmount, ActionStep,
    ActionType, ChainedReference, Chaining, ChainedReferenceKey, OperationTokens, OutputReference, Party, PoolId,
    PoolKind,
};
use crate::encoding::join_exact_tokens_in_user_data;
use crate::ActionResult;
use alloy::primitives::{Address, Bytes, U256};

/// Caller input for a join.
#[derive(Clone, Debug)]
pub struct JoinParams {
    pub pool_id: PoolId,
    pub pool_kind: PoolKind,
    /// Tokens registered in the pool, in vault order.
    pub pool_tokens: Vec<Address>,
    pub token_in: Address,
    /// Index of `token_in` in the operation's asset list.
    pub asset_in_index: usize,
    /// Index of the pool's BPT in the operation's asset list.
    pub asset_out_index: usize,
    pub amount_in: U256,
    pub expected_bpt_out: U256,
    pub slippage_bps: u32,
    /// `token_in` is itself a BPT minted to the relayer by an earlier join.
    pub is_bpt_in: bool,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct JoinAction {
    pub pool_id: PoolId,
    pub pool_kind: PoolKind,
    pub pool_tokens: Vec<Address>,
    pub token_in: Address,
    pub step: ActionStep,
    pub amount_in: ActionAmount,
    pub min_bpt_out: U256,
    pub has_token_in: bool,
    pub has_token_out: bool,
    pub sender: Party,
    pub recipient: Party,
    pub from_internal_balance: bool,
    pub output_reference: Option<OutputReference>,
    token_in_pool_index: usize,
    asset_out_index: usize,
}

impl JoinAction {
    /// Builds the join and returns the next free chained reference key.
    pub fn new(
        params: JoinParams,
        operation: OperationTokens,
        key: ChainedReferenceKey,
    ) -> ActionResult<(Self, ChainedReferenceKey)> {
        validate_slippage(params.slippage_bps)?;
        let token_in_pool_index = pool_token_index(&params.pool_tokens, params.token_in)?;

        let chaining = Chaining::resolve(
            operation,
            ActionType::Join,
            params.asset_in_index,
            params.asset_out_index,
            params.asset_out_index,
            params.amount_in,
            key,
        );
        let has_token_in = chaining.step.has_token_in();
        let has_token_out = chaining.step.has_token_out();
        let min_bpt_out = if has_token_out {
            action_min_out(ActionAmount::Literal(params.expected_bpt_out), params.slippage_bps)
        } else {
            U256::ZERO
        };

        let join = Self {
            pool_id: params.pool_id,
            pool_kind: params.pool_kind,
            pool_tokens: params.pool_tokens,
            token_in: params.token_in,
            step: chaining.step,
            amount_in: chaining.amount_in,
            min_bpt_out,
            has_token_in,
            has_token_out,
            sender: Party::sender(has_token_in),
            recipient: Party::recipient(has_token_out),
            from_internal_balance: !(has_token_in || params.is_bpt_in),
            output_reference: chaining.output_reference,
            token_in_pool_index,
            asset_out_index: params.asset_out_index,
        };
        Ok((join, chaining.next_key))
    }

    /// Convenience wrapper that also checks the asset indices against `asset_count`.
    pub fn with_asset_count(
        params: JoinParams,
        operation: OperationTokens,
        asset_count: usize,
        key: ChainedReferenceKey,
    ) -> ActionResult<(Self, ChainedReferenceKey)> {
        validate_asset_index(params.asset_in_index, asset_count)?;
        validate_asset_index(params.asset_out_index, asset_count)?;
        Self::new(params, operation, key)
    }

    /// Per-pool-token amounts: the join amount at the input token, zero elsewhere.
    pub fn amounts_in(&self) -> Vec<U256> {
        let mut amounts = vec![U256::ZERO; self.pool_tokens.len()];
        amounts[self.token_in_pool_index] = self.amount_in.to_u256();
        amounts
    }

    pub fn user_data(&self) -> Bytes {
        join_exact_tokens_in_user_data(&self.amounts_in(), self.min_bpt_out)
    }

    /// Stores the minted BPT under `reference` as well. Only output joins carry
    /// no reference of their own, so this never replaces an allocated one.
    pub(crate) fn add_output_peek(&mut self, reference: ChainedReference) {
        if self.has_token_out && self.output_reference.is_none() {
            self.output_reference = Some(OutputReference { index: self.asset_out_index, key: reference });
        }
    }

    /// Native value forwarded with the call when the user joins with ETH.
    pub fn value(&self) -> U256 {
        match self.amount_in {
            ActionAmount::Literal(amount) if self.token_in == Address::ZERO && self.has_token_in => amount,
            _ => U256::ZERO,
        }
    }
}
