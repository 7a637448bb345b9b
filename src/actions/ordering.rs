//! Ordering and batching of actions into the final multicall sequence.

use crate::actions::{Action, ChainedReference, ReferenceKind, SwapAction};
use itertools::Itertools;

/// Stable partition: joins/exits that consume the input first, then everything
/// else, then joins/exits that produce the output.
///
/// Swaps always stay in the middle group. A join or exit with both the input
/// and the output (a direct action) counts as an entry action.
pub fn categorize_actions(actions: Vec<Action>) -> Vec<Action> {
    let mut enter = Vec::new();
    let mut middle = Vec::new();
    let mut exit = Vec::new();

    for action in actions {
        match action {
            Action::BatchSwap(_) => middle.push(action),
            _ if action.has_token_in() => enter.push(action),
            _ if action.has_token_out() => exit.push(action),
            _ => middle.push(action),
        }
    }

    enter.into_iter().chain(middle).chain(exit).collect()
}

/// Merges runs of adjacent compatible swaps into single batch swaps.
///
/// Any non-swap action or an incompatible swap closes the current aggregate.
/// The trailing aggregate is flushed exactly once, however many steps it holds.
pub fn batch_swap_actions(actions: Vec<Action>) -> Vec<Action> {
    let (mut batched, pending) = actions.into_iter().fold(
        (Vec::new(), None::<SwapAction>),
        |(mut batched, pending), action| match (pending, action) {
            (None, Action::BatchSwap(swap)) => (batched, Some(swap)),
            (Some(current), Action::BatchSwap(swap)) => {
                if current.can_add_swap(&swap) {
                    (batched, Some(current.merged_with(swap)))
                } else {
                    batched.push(Action::BatchSwap(current));
                    (batched, Some(swap))
                }
            }
            (pending, other) => {
                batched.extend(pending.map(Action::BatchSwap));
                batched.push(other);
                (batched, None)
            }
        },
    );
    batched.extend(pending.map(Action::BatchSwap));
    batched
}

/// Full ordering pass: categorize, then batch.
pub fn order_actions(actions: Vec<Action>) -> Vec<Action> {
    let input_count = actions.len();
    let ordered = batch_swap_actions(categorize_actions(actions));

    tracing::debug!(
        input_actions = input_count,
        ordered_actions = ordered.len(),
        sequence = %ordered.iter().map(|action| action.action_type()).join(" -> "),
        "Ordered relayer actions"
    );

    ordered
}

/// Number of actions that deliver the operation's output to the user.
pub fn number_of_output_actions(actions: &[Action]) -> usize {
    actions.iter().filter(|action| action.is_output()).count()
}

/// Read-only references the actions store their outputs under, in action order.
///
/// Peeking these after the actions have run reads each output without
/// clearing it. Temporary references are skipped since the next action
/// consumes them.
pub fn output_peeks(actions: &[Action]) -> Vec<ChainedReference> {
    actions
        .iter()
        .flat_map(Action::output_references)
        .map(|reference| reference.key)
        .filter(|reference| reference.kind == ReferenceKind::ReadOnly)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{
        ActionType, ChainedReferenceKey, ExitAction, ExitParams, JoinAction, JoinParams, OperationTokens, PoolId,
        PoolKind, SwapParams,
    };
    use alloy::primitives::{address, b256, Address, Bytes, U256};

    const DAI: Address = address!("6b175474e89094c44da98b954eedeac495271d0f");
    const USDC: Address = address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
    const WETH: Address = address!("c02aaa39b223fe8d0a0e5c4f27ead9083c756cc2");
    const JOIN_POOL: PoolId = PoolId(b256!("06df3b2bbb68adc8b0e302443692037ed9f91b42000000000000000000000063"));
    const EXIT_POOL: PoolId = PoolId(b256!("5c6ee304399dbdb9c8ef030ab642b10820db8f56000200000000000000000014"));
    const SWAP_POOL: PoolId = PoolId(b256!("0b09dea16768f0799065c475be02919503cb2a3500020000000000000000001a"));

    // assets: DAI(0) JOIN_BPT(1) EXIT_BPT(2) USDC(3) WETH(4); DAI -> WETH
    fn assets() -> Vec<Address> {
        vec![DAI, JOIN_POOL.address(), EXIT_POOL.address(), USDC, WETH]
    }

    fn operation() -> OperationTokens {
        OperationTokens::new(0, 4)
    }

    fn entry_join(key: ChainedReferenceKey) -> (Action, ChainedReferenceKey) {
        let params = JoinParams {
            pool_id: JOIN_POOL,
            pool_kind: PoolKind::Weighted,
            pool_tokens: vec![DAI, USDC],
            token_in: DAI,
            asset_in_index: 0,
            asset_out_index: 1,
            amount_in: U256::from(1_000u64),
            expected_bpt_out: U256::from(900u64),
            slippage_bps: 50,
            is_bpt_in: false,
        };
        let (join, next) = JoinAction::new(params, operation(), key).unwrap();
        (join.into(), next)
    }

    fn output_exit(key: ChainedReferenceKey) -> (Action, ChainedReferenceKey) {
        let params = ExitParams {
            pool_id: EXIT_POOL,
            pool_kind: PoolKind::Weighted,
            pool_tokens: vec![USDC, WETH],
            token_out: WETH,
            asset_in_index: 2,
            asset_out_index: 4,
            bpt_amount_in: U256::from(500u64),
            expected_amount_out: U256::from(400u64),
            slippage_bps: 50,
        };
        let (exit, next) = ExitAction::new(params, operation(), key).unwrap();
        (exit.into(), next)
    }

    fn entry_swap(asset_out_index: usize, amount: u64, key: ChainedReferenceKey) -> (Action, ChainedReferenceKey) {
        let params = SwapParams {
            pool_id: SWAP_POOL,
            assets: assets(),
            asset_in_index: 0,
            asset_out_index,
            amount_in: U256::from(amount),
            expected_amount_out: U256::from(amount),
            slippage_bps: 50,
            is_bpt_in: false,
            is_bpt_out: asset_out_index == 2,
            user_data: Bytes::new(),
        };
        let (swap, next) = SwapAction::new(params, operation(), key).unwrap();
        (swap.into(), next)
    }

    fn middle_swap(key: ChainedReferenceKey) -> (Action, ChainedReferenceKey) {
        let params = SwapParams {
            pool_id: SWAP_POOL,
            assets: assets(),
            asset_in_index: 1,
            asset_out_index: 2,
            amount_in: U256::from(900u64),
            expected_amount_out: U256::from(500u64),
            slippage_bps: 50,
            is_bpt_in: true,
            is_bpt_out: true,
            user_data: Bytes::new(),
        };
        let (swap, next) = SwapAction::new(params, operation(), key).unwrap();
        (swap.into(), next)
    }

    fn types(actions: &[Action]) -> Vec<ActionType> {
        actions.iter().map(Action::action_type).collect()
    }

    #[test]
    fn test_join_two_swaps_exit_batches_to_three() {
        let key = ChainedReferenceKey::new(0);
        let (join, key) = entry_join(key);
        let (swap_a, key) = entry_swap(3, 100, key);
        let (swap_b, key) = entry_swap(3, 200, key);
        let (exit, _) = output_exit(key);

        let ordered = order_actions(vec![join, swap_a, swap_b, exit]);

        assert_eq!(types(&ordered), vec![ActionType::Join, ActionType::BatchSwap, ActionType::Exit]);
        match &ordered[1] {
            Action::BatchSwap(swap) => assert_eq!(swap.swaps.len(), 2),
            other => panic!("expected batch swap, got {other:?}"),
        }
    }

    #[test]
    fn test_categorize_moves_entries_first_and_outputs_last() {
        let key = ChainedReferenceKey::new(0);
        let (exit, key) = output_exit(key);
        let (swap, key) = middle_swap(key);
        let (join, _) = entry_join(key);

        let categorized = categorize_actions(vec![exit, swap, join]);
        assert_eq!(types(&categorized), vec![ActionType::Join, ActionType::BatchSwap, ActionType::Exit]);
    }

    #[test]
    fn test_categorize_is_stable_within_groups() {
        let key = ChainedReferenceKey::new(0);
        let (first, key) = entry_swap(3, 1, key);
        let (join, key) = entry_join(key);
        let (second, _) = middle_swap(key);

        let categorized = categorize_actions(vec![first.clone(), join.clone(), second.clone()]);
        assert_eq!(categorized, vec![join, first, second]);
    }

    #[test]
    fn test_single_trailing_swap_is_flushed() {
        let key = ChainedReferenceKey::new(0);
        let (join, key) = entry_join(key);
        let (swap, _) = middle_swap(key);

        let batched = batch_swap_actions(vec![join, swap.clone()]);
        assert_eq!(batched.len(), 2);
        assert_eq!(batched[1], swap);
    }

    #[test]
    fn test_trailing_multi_step_aggregate_is_flushed() {
        let key = ChainedReferenceKey::new(0);
        let (swap_a, key) = entry_swap(3, 1, key);
        let (swap_b, key) = entry_swap(3, 2, key);
        let (swap_c, _) = entry_swap(3, 3, key);

        let batched = batch_swap_actions(vec![swap_a, swap_b, swap_c]);
        assert_eq!(batched.len(), 1);
        match &batched[0] {
            Action::BatchSwap(swap) => assert_eq!(swap.swaps.len(), 3),
            other => panic!("expected batch swap, got {other:?}"),
        }
    }

    #[test]
    fn test_swap_separated_by_join_is_not_merged() {
        let key = ChainedReferenceKey::new(0);
        let (swap_a, key) = entry_swap(3, 1, key);
        let (join, key) = entry_join(key);
        let (swap_b, _) = entry_swap(3, 2, key);

        let batched = batch_swap_actions(vec![swap_a, join, swap_b]);
        assert_eq!(types(&batched), vec![ActionType::BatchSwap, ActionType::Join, ActionType::BatchSwap]);
    }

    #[test]
    fn test_incompatible_adjacent_swaps_stay_separate() {
        let key = ChainedReferenceKey::new(0);
        let (entry, key) = entry_swap(2, 1, key);
        let (middle, _) = middle_swap(key);

        let batched = batch_swap_actions(vec![entry, middle]);
        assert_eq!(batched.len(), 2);
    }

    #[test]
    fn test_batching_is_idempotent() {
        let key = ChainedReferenceKey::new(0);
        let (join, key) = entry_join(key);
        let (swap_a, key) = entry_swap(3, 100, key);
        let (swap_a2, key) = entry_swap(3, 150, key);
        let (swap_b, key) = entry_swap(2, 200, key);
        let (swap_c, key) = entry_swap(3, 300, key);
        let (middle, key) = middle_swap(key);
        let (exit, _) = output_exit(key);

        let once = batch_swap_actions(vec![join, swap_a, swap_a2, swap_b, swap_c, middle, exit]);
        assert_eq!(once.len(), 6);
        let twice = batch_swap_actions(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_number_of_output_actions() {
        let key = ChainedReferenceKey::new(0);
        let (join, key) = entry_join(key);
        let (swap, key) = middle_swap(key);
        let (exit, _) = output_exit(key);

        assert_eq!(number_of_output_actions(&[join, swap, exit]), 1);
        assert_eq!(number_of_output_actions(&[]), 0);
    }
}
