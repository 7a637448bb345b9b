//! Relayer calldata encoding.
//!
//! Turns ordered actions into the sub-calls of a single relayer `multicall`.
//! Parties recorded on the actions (`Party::User` / `Party::Relayer`) are
//! resolved to addresses here, so the same ordered plan can be encoded for
//! different users.
//!
//! Output amounts of a plan are read back by appending
//! `peekChainedReferenceValue` sub-calls; `RelayerMulticall::peek` returns the
//! multicall index whose result holds the value.

use crate::actions::{Action, ChainedReference, ExitAction, JoinAction, OutputReference, Party, SwapAction};
use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::{SolCall, SolValue};

pub(crate) mod relayer {
    alloy::sol! {
        #[derive(Debug)]
        struct OutputReference {
            uint256 index;
            uint256 key;
        }

        #[derive(Debug)]
        struct JoinPoolRequest {
            address[] assets;
            uint256[] maxAmountsIn;
            bytes userData;
            bool fromInternalBalance;
        }

        #[derive(Debug)]
        struct ExitPoolRequest {
            address[] assets;
            uint256[] minAmountsOut;
            bytes userData;
            bool toInternalBalance;
        }

        #[derive(Debug)]
        struct BatchSwapStep {
            bytes32 poolId;
            uint256 assetInIndex;
            uint256 assetOutIndex;
            uint256 amount;
            bytes userData;
        }

        #[derive(Debug)]
        struct FundManagement {
            address sender;
            bool fromInternalBalance;
            address recipient;
            bool toInternalBalance;
        }

        interface IBalancerRelayer {
            function multicall(bytes[] calldata data) external payable returns (bytes[] memory results);
        }

        interface IVaultActions {
            function joinPool(
                bytes32 poolId,
                uint8 kind,
                address sender,
                address recipient,
                JoinPoolRequest memory request,
                uint256 value,
                uint256 outputReference
            ) external payable;

            function exitPool(
                bytes32 poolId,
                uint8 poolKind,
                address sender,
                address recipient,
                ExitPoolRequest memory request,
                OutputReference[] calldata outputReferences
            ) external payable;

            function batchSwap(
                uint8 kind,
                BatchSwapStep[] memory swaps,
                address[] memory assets,
                FundManagement memory funds,
                int256[] memory limits,
                uint256 deadline,
                uint256 value,
                OutputReference[] memory outputReferences
            ) external payable returns (int256[] memory);

            function peekChainedReferenceValue(uint256 chainedReference) external view returns (uint256 value);
        }
    }
}

const SWAP_KIND_GIVEN_IN: u8 = 0;
const JOIN_EXACT_TOKENS_IN_FOR_BPT_OUT: u64 = 1;
const EXIT_EXACT_BPT_IN_FOR_ONE_TOKEN_OUT: u64 = 0;

/// Addresses that `Party` values resolve to, plus the batch swap deadline.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct EncodingContext {
    pub user: Address,
    pub relayer: Address,
    pub deadline: U256,
}

impl EncodingContext {
    pub fn new(user: Address, relayer: Address) -> Self {
        Self {
            user,
            relayer,
            // far enough in the future to never expire, with as many zero bytes as possible
            deadline: U256::from(1) << 255,
        }
    }

    pub fn resolve(&self, party: Party) -> Address {
        match party {
            Party::User => self.user,
            Party::Relayer => self.relayer,
        }
    }
}

/// `abi.encode(uint256(1), amountsIn, minBptOut)`
pub fn join_exact_tokens_in_user_data(amounts_in: &[U256], min_bpt_out: U256) -> Bytes {
    (U256::from(JOIN_EXACT_TOKENS_IN_FOR_BPT_OUT), amounts_in.to_vec(), min_bpt_out)
        .abi_encode_params()
        .into()
}

/// `abi.encode(uint256(0), bptAmountIn, exitTokenIndex)`
pub fn exit_exact_bpt_in_for_one_token_out_user_data(bpt_amount_in: U256, exit_token_index: usize) -> Bytes {
    (U256::from(EXIT_EXACT_BPT_IN_FOR_ONE_TOKEN_OUT), bpt_amount_in, U256::from(exit_token_index))
        .abi_encode_params()
        .into()
}

fn output_references(references: &[OutputReference]) -> Vec<relayer::OutputReference> {
    references
        .iter()
        .map(|reference| relayer::OutputReference {
            index: U256::from(reference.index),
            key: reference.key.to_u256(),
        })
        .collect()
}

pub fn encode_join(join: &JoinAction, context: &EncodingContext) -> Bytes {
    let amounts_in = join.amounts_in();
    relayer::IVaultActions::joinPoolCall {
        poolId: join.pool_id.0,
        kind: join.pool_kind.as_u8(),
        sender: context.resolve(join.sender),
        recipient: context.resolve(join.recipient),
        request: relayer::JoinPoolRequest {
            assets: join.pool_tokens.clone(),
            maxAmountsIn: amounts_in,
            userData: join.user_data(),
            fromInternalBalance: join.from_internal_balance,
        },
        value: join.value(),
        outputReference: join
            .output_reference
            .map(|reference| reference.key.to_u256())
            .unwrap_or(U256::ZERO),
    }
    .abi_encode()
    .into()
}

pub fn encode_exit(exit: &ExitAction, context: &EncodingContext) -> Bytes {
    let references: Vec<OutputReference> = exit.output_reference.into_iter().collect();
    relayer::IVaultActions::exitPoolCall {
        poolId: exit.pool_id.0,
        poolKind: exit.pool_kind.as_u8(),
        sender: context.resolve(exit.sender),
        recipient: context.resolve(exit.recipient),
        request: relayer::ExitPoolRequest {
            assets: exit.pool_tokens.clone(),
            minAmountsOut: exit.min_amounts_out(),
            userData: exit.user_data(),
            toInternalBalance: exit.to_internal_balance,
        },
        outputReferences: output_references(&references),
    }
    .abi_encode()
    .into()
}

pub fn encode_batch_swap(swap: &SwapAction, context: &EncodingContext) -> Bytes {
    let swaps = swap
        .swaps
        .iter()
        .map(|step| relayer::BatchSwapStep {
            poolId: step.pool_id.0,
            assetInIndex: U256::from(step.asset_in_index),
            assetOutIndex: U256::from(step.asset_out_index),
            amount: step.amount.to_u256(),
            userData: step.user_data.clone(),
        })
        .collect();

    relayer::IVaultActions::batchSwapCall {
        kind: SWAP_KIND_GIVEN_IN,
        swaps,
        assets: swap.assets.clone(),
        funds: relayer::FundManagement {
            sender: context.resolve(swap.funds.sender),
            fromInternalBalance: swap.funds.from_internal_balance,
            recipient: context.resolve(swap.funds.recipient),
            toInternalBalance: swap.funds.to_internal_balance,
        },
        limits: swap.limits.clone(),
        deadline: context.deadline,
        value: swap.value(),
        outputReferences: output_references(&swap.output_references),
    }
    .abi_encode()
    .into()
}

pub fn encode_action(action: &Action, context: &EncodingContext) -> Bytes {
    match action {
        Action::Join(join) => encode_join(join, context),
        Action::Exit(exit) => encode_exit(exit, context),
        Action::BatchSwap(swap) => encode_batch_swap(swap, context),
    }
}

pub fn encode_peek_chained_reference_value(reference: ChainedReference) -> Bytes {
    relayer::IVaultActions::peekChainedReferenceValueCall { chainedReference: reference.to_u256() }
        .abi_encode()
        .into()
}

pub fn encode_relayer_multicall(calls: Vec<Bytes>) -> Bytes {
    relayer::IBalancerRelayer::multicallCall { data: calls }.abi_encode().into()
}

/// Incrementally assembled relayer multicall.
#[derive(Clone, Debug)]
pub struct RelayerMulticall {
    context: EncodingContext,
    calls: Vec<Bytes>,
    value: U256,
}

impl RelayerMulticall {
    pub fn new(context: EncodingContext) -> Self {
        Self { context, calls: Vec::new(), value: U256::ZERO }
    }

    /// Appends every action in order.
    pub fn with_actions(context: EncodingContext, actions: &[Action]) -> Self {
        let mut multicall = Self::new(context);
        for action in actions {
            multicall.push_action(action);
        }
        multicall
    }

    /// Appends an action and returns its index in the multicall.
    pub fn push_action(&mut self, action: &Action) -> usize {
        let value = match action {
            Action::Join(join) => join.value(),
            Action::BatchSwap(swap) => swap.value(),
            Action::Exit(_) => U256::ZERO,
        };
        self.value = self.value.saturating_add(value);
        self.calls.push(encode_action(action, &self.context));
        self.calls.len() - 1
    }

    /// Appends a read of `reference` and returns the index whose result holds the value.
    pub fn peek(&mut self, reference: ChainedReference) -> usize {
        self.calls.push(encode_peek_chained_reference_value(reference));
        self.calls.len() - 1
    }

    pub fn calls(&self) -> &[Bytes] {
        &self.calls
    }

    /// Total native value the multicall must be sent with.
    pub fn value(&self) -> U256 {
        self.value
    }

    pub fn encode(&self) -> Bytes {
        encode_relayer_multicall(self.calls.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{
        ChainedReferenceKey, ExitParams, JoinParams, OperationTokens, PoolId, PoolKind, SwapParams,
    };
    use alloy::primitives::{address, b256, I256};

    const USER: Address = address!("1111111111111111111111111111111111111111");
    const RELAYER: Address = address!("35cea9e57a393ac66aaa7e25c391d52c74b5648f");
    const DAI: Address = address!("6b175474e89094c44da98b954eedeac495271d0f");
    const USDC: Address = address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
    const POOL: PoolId = PoolId(b256!("06df3b2bbb68adc8b0e302443692037ed9f91b42000000000000000000000063"));

    fn context() -> EncodingContext {
        EncodingContext::new(USER, RELAYER)
    }

    fn entry_join() -> JoinAction {
        let params = JoinParams {
            pool_id: POOL,
            pool_kind: PoolKind::Weighted,
            pool_tokens: vec![DAI, USDC],
            token_in: DAI,
            asset_in_index: 0,
            asset_out_index: 1,
            amount_in: U256::from(1_000u64),
            expected_bpt_out: U256::from(900u64),
            slippage_bps: 0,
            is_bpt_in: false,
        };
        JoinAction::new(params, OperationTokens::new(0, 2), ChainedReferenceKey::new(0)).unwrap().0
    }

    #[test]
    fn test_join_user_data_layout() {
        let data = join_exact_tokens_in_user_data(&[U256::from(1u64), U256::from(2u64)], U256::from(3u64));
        let (kind, amounts, min_bpt) = <(U256, Vec<U256>, U256)>::abi_decode_params(&data).unwrap();
        assert_eq!(kind, U256::from(1u64));
        assert_eq!(amounts, vec![U256::from(1u64), U256::from(2u64)]);
        assert_eq!(min_bpt, U256::from(3u64));
    }

    #[test]
    fn test_exit_user_data_layout() {
        let data = exit_exact_bpt_in_for_one_token_out_user_data(U256::from(500u64), 1);
        assert_eq!(data.len(), 96);
        let (kind, bpt_in, index) = <(U256, U256, U256)>::abi_decode_params(&data).unwrap();
        assert_eq!(kind, U256::ZERO);
        assert_eq!(bpt_in, U256::from(500u64));
        assert_eq!(index, U256::from(1u64));
    }

    #[test]
    fn test_encode_join_resolves_parties() {
        let join = entry_join();
        let data = encode_join(&join, &context());
        let call = relayer::IVaultActions::joinPoolCall::abi_decode(&data).unwrap();

        assert_eq!(call.poolId, POOL.0);
        assert_eq!(call.sender, USER);
        assert_eq!(call.recipient, RELAYER);
        assert_eq!(call.request.maxAmountsIn, vec![U256::from(1_000u64), U256::ZERO]);
        assert!(!call.request.fromInternalBalance);
        assert_eq!(
            call.outputReference,
            ChainedReferenceKey::new(0).to_chained_reference().to_u256()
        );
    }

    #[test]
    fn test_encode_exit_output_references() {
        let params = ExitParams {
            pool_id: POOL,
            pool_kind: PoolKind::Weighted,
            pool_tokens: vec![DAI, USDC],
            token_out: USDC,
            asset_in_index: 1,
            asset_out_index: 2,
            bpt_amount_in: U256::from(5u64),
            expected_amount_out: U256::from(5u64),
            slippage_bps: 0,
        };
        let (exit, _) = ExitAction::new(params, OperationTokens::new(0, 3), ChainedReferenceKey::new(2)).unwrap();
        let call = relayer::IVaultActions::exitPoolCall::abi_decode(&encode_exit(&exit, &context())).unwrap();

        assert_eq!(call.sender, RELAYER);
        assert!(call.request.toInternalBalance);
        assert_eq!(call.outputReferences.len(), 1);
        assert_eq!(call.outputReferences[0].index, U256::from(1u64));
        assert_eq!(
            call.outputReferences[0].key,
            ChainedReferenceKey::new(2).to_chained_reference().to_u256()
        );
    }

    #[test]
    fn test_encode_batch_swap_limits_and_funds() {
        let params = SwapParams {
            pool_id: POOL,
            assets: vec![DAI, USDC],
            asset_in_index: 0,
            asset_out_index: 1,
            amount_in: U256::from(10u64),
            expected_amount_out: U256::from(10u64),
            slippage_bps: 0,
            is_bpt_in: false,
            is_bpt_out: false,
            user_data: Bytes::new(),
        };
        let (swap, _) = SwapAction::new(params, OperationTokens::new(0, 1), ChainedReferenceKey::new(0)).unwrap();
        let call = relayer::IVaultActions::batchSwapCall::abi_decode(&encode_batch_swap(&swap, &context())).unwrap();

        assert_eq!(call.kind, SWAP_KIND_GIVEN_IN);
        assert_eq!(call.funds.sender, USER);
        assert_eq!(call.funds.recipient, USER);
        assert_eq!(call.limits, vec![I256::try_from(10i64).unwrap(), -I256::try_from(10i64).unwrap()]);
        assert_eq!(call.deadline, U256::from(1) << 255);
        assert!(call.outputReferences.is_empty());
    }

    #[test]
    fn test_multicall_tracks_indexes() {
        let join = Action::Join(entry_join());
        let reference = join.output_references()[0].key;

        let mut multicall = RelayerMulticall::new(context());
        assert_eq!(multicall.push_action(&join), 0);
        assert_eq!(multicall.peek(reference), 1);

        let call = relayer::IBalancerRelayer::multicallCall::abi_decode(&multicall.encode()).unwrap();
        assert_eq!(call.data.len(), 2);
        assert_eq!(&call.data[0][..4], relayer::IVaultActions::joinPoolCall::SELECTOR.as_slice());
        assert_eq!(
            &call.data[1][..4],
            relayer::IVaultActions::peekChainedReferenceValueCall::SELECTOR.as_slice()
        );
        assert_eq!(multicall.value(), U256::ZERO);
    }
}
