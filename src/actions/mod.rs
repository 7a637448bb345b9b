//! Relayer actions and the pipeline that turns them into an executable sequence.
//!
//! An operation converting one token into another is expressed as a list of
//! joins, exits and batch swaps. Each action is classified against the
//! operation's input and output tokens (`ActionStep`), and actions that feed a
//! later action store their output under a chained reference the later action
//! reads back.
//!
//! # Pipeline
//!
//! 1. Build actions with `JoinAction::new`, `ExitAction::new` and
//!    `SwapAction::new`, threading a `ChainedReferenceKey` through the calls.
//! 2. `order_actions` moves input joins/exits first and output joins/exits
//!    last, then merges adjacent compatible swaps into single batch swaps.
//! 3. `crate::encoding` turns the ordered actions into relayer calldata.

pub mod exit;
pub mod join;
pub mod ordering;
pub mod reference;
pub mod step;
pub mod swap;

pub use exit::{ExitAction, ExitParams};
pub use join::{JoinAction, JoinParams};
pub use ordering::{batch_swap_actions, categorize_actions, number_of_output_actions, order_actions, output_peeks};
pub use reference::{
    action_amount, action_min_out, action_output_ref, is_chained_reference, ActionAmount,
    ChainedReference, ChainedReferenceKey, OutputReference, ReferenceKind,
};
pub use step::{action_step, ActionStep};
pub use swap::{SwapAction, SwapFunds, SwapParams, SwapStep};

use crate::errors::ActionError;
use crate::ActionResult;
use alloy::primitives::{Address, B256, U256};
use std::fmt;

/// Kind of relayer sub-call an action compiles to.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ActionType {
    Join,
    Exit,
    BatchSwap,
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionType::Join => "join",
            ActionType::Exit => "exit",
            ActionType::BatchSwap => "batch_swap",
        };
        f.write_str(name)
    }
}

/// Balancer pool id. The first 20 bytes are the pool (and BPT) address.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct PoolId(pub B256);

impl PoolId {
    pub fn address(&self) -> Address {
        Address::from_slice(&self.0[..20])
    }
}

impl From<B256> for PoolId {
    fn from(id: B256) -> Self {
        Self(id)
    }
}

/// Pool family passed to the relayer so it can rewrite chained amounts in user data.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum PoolKind {
    #[default]
    Weighted,
    LegacyStable,
    ComposableStable,
    ComposableStableV2,
}

impl PoolKind {
    pub fn as_u8(self) -> u8 {
        match self {
            PoolKind::Weighted => 0,
            PoolKind::LegacyStable => 1,
            PoolKind::ComposableStable => 2,
            PoolKind::ComposableStableV2 => 3,
        }
    }
}

/// Who funds or receives tokens for a sub-call. Resolved to an address at encoding time.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Party {
    User,
    Relayer,
}

impl Party {
    pub fn sender(has_token_in: bool) -> Self {
        if has_token_in {
            Party::User
        } else {
            Party::Relayer
        }
    }

    pub fn recipient(has_token_out: bool) -> Self {
        if has_token_out {
            Party::User
        } else {
            Party::Relayer
        }
    }
}

/// Indices of the overall operation's input and output tokens in the shared asset list.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct OperationTokens {
    pub token_in_index: usize,
    pub token_out_index: usize,
}

impl OperationTokens {
    pub fn new(token_in_index: usize, token_out_index: usize) -> Self {
        Self { token_in_index, token_out_index }
    }
}

/// One relayer sub-call.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Action {
    Join(JoinAction),
    Exit(ExitAction),
    BatchSwap(SwapAction),
}

impl Action {
    pub fn action_type(&self) -> ActionType {
        match self {
            Action::Join(_) => ActionType::Join,
            Action::Exit(_) => ActionType::Exit,
            Action::BatchSwap(_) => ActionType::BatchSwap,
        }
    }

    pub fn has_token_in(&self) -> bool {
        match self {
            Action::Join(join) => join.has_token_in,
            Action::Exit(exit) => exit.has_token_in,
            Action::BatchSwap(swap) => swap.has_token_in,
        }
    }

    pub fn has_token_out(&self) -> bool {
        match self {
            Action::Join(join) => join.has_token_out,
            Action::Exit(exit) => exit.has_token_out,
            Action::BatchSwap(swap) => swap.has_token_out,
        }
    }

    /// An output action delivers the operation's output token to the user.
    pub fn is_output(&self) -> bool {
        self.has_token_out()
    }

    pub fn output_references(&self) -> Vec<OutputReference> {
        match self {
            Action::Join(join) => join.output_reference.into_iter().collect(),
            Action::Exit(exit) => exit.output_reference.into_iter().collect(),
            Action::BatchSwap(swap) => swap.output_references.clone(),
        }
    }

    /// Attaches a read-only reference to the output this action delivers to the
    /// user. Returns whether the action took it.
    pub(crate) fn add_output_peek(&mut self, reference: ChainedReference) -> bool {
        if !self.has_token_out() {
            return false;
        }
        match self {
            Action::Join(join) => join.add_output_peek(reference),
            Action::Exit(exit) => exit.add_output_peek(reference),
            Action::BatchSwap(swap) => swap.add_output_peek(reference),
        }
        true
    }

    /// Token this action produces: the BPT for joins, the exit token for exits,
    /// the last step's output asset for batch swaps.
    pub fn output_token(&self) -> Option<Address> {
        match self {
            Action::Join(join) => Some(join.pool_id.address()),
            Action::Exit(exit) => Some(exit.token_out),
            Action::BatchSwap(swap) => swap.output_token(),
        }
    }
}

impl From<JoinAction> for Action {
    fn from(join: JoinAction) -> Self {
        Action::Join(join)
    }
}

impl From<ExitAction> for Action {
    fn from(exit: ExitAction) -> Self {
        Action::Exit(exit)
    }
}

impl From<SwapAction> for Action {
    fn from(swap: SwapAction) -> Self {
        Action::BatchSwap(swap)
    }
}

/// Chaining decisions shared by every action constructor.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Chaining {
    pub step: ActionStep,
    pub amount_in: ActionAmount,
    pub output_reference: Option<OutputReference>,
    pub next_key: ChainedReferenceKey,
}

impl Chaining {
    /// `output_index` is the index the relayer reads the output from: the asset
    /// index for swaps, the pool-token index for exits.
    pub(crate) fn resolve(
        operation: OperationTokens,
        action_type: ActionType,
        action_token_in_index: usize,
        action_token_out_index: usize,
        output_index: usize,
        amount_in: U256,
        key: ChainedReferenceKey,
    ) -> Self {
        let step = action_step(
            operation.token_in_index,
            operation.token_out_index,
            action_token_in_index,
            action_token_out_index,
        );
        let amount_in = action_amount(amount_in, action_type, step, key);
        let (output_reference, next_key) = action_output_ref(step, output_index, key);

        tracing::trace!(
            action_type = %action_type,
            step = %step,
            amount_in = %amount_in,
            chained = amount_in.is_chained(),
            key = %key,
            next_key = %next_key,
            "Resolved action chaining"
        );

        Self { step, amount_in, output_reference, next_key }
    }
}

pub(crate) fn validate_slippage(slippage_bps: u32) -> ActionResult<()> {
    if slippage_bps > 10_000 {
        return Err(ActionError::InvalidSlippage { slippage_bps });
    }
    Ok(())
}

pub(crate) fn validate_asset_index(index: usize, assets: usize) -> ActionResult<()> {
    if index >= assets {
        return Err(ActionError::AssetIndexOutOfRange { index, assets });
    }
    Ok(())
}

/// Position of `token` in `pool_tokens`.
pub(crate) fn pool_token_index(pool_tokens: &[Address], token: Address) -> ActionResult<usize> {
    pool_tokens
        .iter()
        .position(|candidate| *candidate == token)
        .ok_or(ActionError::TokenNotInPool { token })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::b256;

    #[test]
    fn test_pool_id_address_is_prefix() {
        let pool_id = PoolId(b256!("5c6ee304399dbdb9c8ef030ab642b10820db8f56000200000000000000000014"));
        assert_eq!(
            pool_id.address(),
            Address::from_slice(&alloy::hex::decode("5c6ee304399dbdb9c8ef030ab642b10820db8f56").unwrap())
        );
    }

    #[test]
    fn test_party_from_flags() {
        assert_eq!(Party::sender(true), Party::User);
        assert_eq!(Party::sender(false), Party::Relayer);
        assert_eq!(Party::recipient(true), Party::User);
        assert_eq!(Party::recipient(false), Party::Relayer);
    }

    #[test]
    fn test_slippage_validation() {
        assert!(validate_slippage(10_000).is_ok());
        assert!(matches!(
            validate_slippage(10_001),
            Err(ActionError::InvalidSlippage { slippage_bps: 10_001 })
        ));
    }
}
