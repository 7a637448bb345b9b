//! Batch swaps and the merge rule used to collapse adjacent swaps into one call.

use crate::actions::{
    action_min_out, validate_asset_index, validate_slippage, ActionAmount, ActionStep, ActionType, ChainedReference,
    Chaining, ChainedReferenceKey, OperationTokens, OutputReference, Party, PoolId,
};
use crate::errors::ActionError;
use crate::ActionResult;
use alloy::primitives::{Address, Bytes, I256, U256};

/// Caller input for a single-hop swap.
#[derive(Clone, Debug)]
pub struct SwapParams {
    pub pool_id: PoolId,
    /// The operation's asset list; the indices below point into it.
    pub assets: Vec<Address>,
    pub asset_in_index: usize,
    pub asset_out_index: usize,
    pub amount_in: U256,
    pub expected_amount_out: U256,
    pub slippage_bps: u32,
    /// The input asset is a BPT minted to the relayer's external balance.
    pub is_bpt_in: bool,
    /// The output asset is a BPT that a later exit burns from the relayer's external balance.
    pub is_bpt_out: bool,
    pub user_data: Bytes,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SwapStep {
    pub pool_id: PoolId,
    pub step: ActionStep,
    pub asset_in_index: usize,
    pub asset_out_index: usize,
    pub amount: ActionAmount,
    pub user_data: Bytes,
}

/// Fund management shared by every step of a batch swap.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct SwapFunds {
    pub sender: Party,
    pub from_internal_balance: bool,
    pub recipient: Party,
    pub to_internal_balance: bool,
}

impl SwapFunds {
    fn resolve(has_token_in: bool, has_token_out: bool, is_bpt_in: bool, is_bpt_out: bool) -> Self {
        Self {
            sender: Party::sender(has_token_in),
            from_internal_balance: !(has_token_in || is_bpt_in),
            recipient: Party::recipient(has_token_out),
            to_internal_balance: !(has_token_out || is_bpt_out),
        }
    }

    /// Funded from the user's wallet (or the relayer's external BPT balance) rather than internal balance.
    pub fn is_external(&self) -> bool {
        !self.from_internal_balance
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SwapAction {
    pub swaps: Vec<SwapStep>,
    pub assets: Vec<Address>,
    /// Signed per-asset limits: positive is the most the vault may pull, negative the least it must pay.
    pub limits: Vec<I256>,
    pub funds: SwapFunds,
    pub output_references: Vec<OutputReference>,
    pub has_token_in: bool,
    pub has_token_out: bool,
}

impl SwapAction {
    /// Builds a one-step batch swap and returns the next free chained reference key.
    pub fn new(
        params: SwapParams,
        operation: OperationTokens,
        key: ChainedReferenceKey,
    ) -> ActionResult<(Self, ChainedReferenceKey)> {
        validate_slippage(params.slippage_bps)?;
        validate_asset_index(params.asset_in_index, params.assets.len())?;
        validate_asset_index(params.asset_out_index, params.assets.len())?;

        let chaining = Chaining::resolve(
            operation,
            ActionType::BatchSwap,
            params.asset_in_index,
            params.asset_out_index,
            params.asset_out_index,
            params.amount_in,
            key,
        );
        let has_token_in = chaining.step.has_token_in();
        let has_token_out = chaining.step.has_token_out();

        let mut limits = vec![I256::ZERO; params.assets.len()];
        limits[params.asset_in_index] = match chaining.amount_in {
            ActionAmount::Chained(_) => I256::MAX,
            ActionAmount::Literal(amount) => I256::try_from(amount).unwrap_or(I256::MAX),
        };
        if has_token_out {
            let min_out = action_min_out(ActionAmount::Literal(params.expected_amount_out), params.slippage_bps);
            limits[params.asset_out_index] = -I256::try_from(min_out).unwrap_or(I256::MAX);
        }

        let swap = Self {
            swaps: vec![SwapStep {
                pool_id: params.pool_id,
                step: chaining.step,
                asset_in_index: params.asset_in_index,
                asset_out_index: params.asset_out_index,
                amount: chaining.amount_in,
                user_data: params.user_data,
            }],
            assets: params.assets,
            limits,
            funds: SwapFunds::resolve(has_token_in, has_token_out, params.is_bpt_in, params.is_bpt_out),
            output_references: chaining.output_reference.into_iter().collect(),
            has_token_in,
            has_token_out,
        };
        Ok((swap, chaining.next_key))
    }

    /// Asset produced by the last step.
    pub fn output_token(&self) -> Option<Address> {
        self.swaps
            .last()
            .and_then(|step| self.assets.get(step.asset_out_index))
            .copied()
    }

    /// Native value forwarded with the call for steps that spend the user's ETH.
    pub fn value(&self) -> U256 {
        if !self.funds.is_external() || self.funds.sender != Party::User {
            return U256::ZERO;
        }
        self.swaps
            .iter()
            .filter(|step| self.assets[step.asset_in_index] == Address::ZERO)
            .filter_map(|step| match step.amount {
                ActionAmount::Literal(amount) => Some(amount),
                ActionAmount::Chained(_) => None,
            })
            .fold(U256::ZERO, |total, amount| total.saturating_add(amount))
    }

    /// Whether `other` can be folded into this batch swap.
    ///
    /// Both must share the same fund management, and `other` must not read a
    /// chained reference this batch writes: references are resolved before the
    /// vault runs the batch.
    pub fn can_add_swap(&self, other: &SwapAction) -> bool {
        self.merge_conflict(other).is_none()
    }

    /// Merges `other` into this batch swap.
    pub fn add_swap(self, other: SwapAction) -> ActionResult<Self> {
        if self.swaps.is_empty() || other.swaps.is_empty() {
            return Err(ActionError::EmptySwap);
        }
        if let Some(reason) = self.merge_conflict(&other) {
            return Err(ActionError::IncompatibleSwaps { reason: reason.to_string() });
        }
        Ok(self.merged_with(other))
    }

    /// Stores the delivered asset of the last output step under `reference`.
    pub(crate) fn add_output_peek(&mut self, reference: ChainedReference) {
        if let Some(step) = self.swaps.iter().rev().find(|step| step.step.has_token_out()) {
            self.output_references.push(OutputReference { index: step.asset_out_index, key: reference });
        }
    }

    fn merge_conflict(&self, other: &SwapAction) -> Option<&'static str> {
        if self.swaps.is_empty() || other.swaps.is_empty() {
            return Some("empty swap");
        }
        if self.funds != other.funds {
            return Some("fund management differs");
        }
        let reads_own_output = other.swaps.iter().filter_map(|step| step.amount.chained_reference()).any(|read| {
            self.output_references.iter().any(|written| written.key == read)
        });
        if reads_own_output {
            return Some("swap reads a reference written by the same batch");
        }
        None
    }

    /// Union of both asset lists with `other`'s indices remapped. Limits are summed per asset.
    pub(crate) fn merged_with(mut self, other: SwapAction) -> Self {
        let remap: Vec<usize> = other
            .assets
            .iter()
            .map(|asset| match self.assets.iter().position(|known| known == asset) {
                Some(index) => index,
                None => {
                    self.assets.push(*asset);
                    self.assets.len() - 1
                }
            })
            .collect();

        self.limits.resize(self.assets.len(), I256::ZERO);
        for (index, limit) in other.limits.into_iter().enumerate() {
            let target = remap[index];
            self.limits[target] = self.limits[target].saturating_add(limit);
        }

        self.swaps.extend(other.swaps.into_iter().map(|step| SwapStep {
            asset_in_index: remap[step.asset_in_index],
            asset_out_index: remap[step.asset_out_index],
            ..step
        }));
        self.output_references
            .extend(other.output_references.into_iter().map(|reference| OutputReference {
                index: remap[reference.index],
                ..reference
            }));
        self.has_token_in |= other.has_token_in;
        self.has_token_out |= other.has_token_out;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ChainedReference;
    use alloy::primitives::{address, b256};

    const DAI: Address = address!("6b175474e89094c44da98b954eedeac495271d0f");
    const USDC: Address = address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
    const WETH: Address = address!("c02aaa39b223fe8d0a0e5c4f27ead9083c756cc2");
    const BAL: Address = address!("ba100000625a3754423978a60c9317c58a424e3d");

    fn swap_params(assets: Vec<Address>, asset_in_index: usize, asset_out_index: usize, amount: u64) -> SwapParams {
        SwapParams {
            pool_id: PoolId(b256!("0b09dea16768f0799065c475be02919503cb2a3500020000000000000000001a")),
            assets,
            asset_in_index,
            asset_out_index,
            amount_in: U256::from(amount),
            expected_amount_out: U256::from(amount * 2),
            slippage_bps: 100,
            is_bpt_in: false,
            is_bpt_out: false,
            user_data: Bytes::new(),
        }
    }

    #[test]
    fn test_entry_swap_limits_and_funds() {
        let assets = vec![DAI, USDC, WETH, BAL];
        let operation = OperationTokens::new(0, 3);
        let (swap, next) = SwapAction::new(swap_params(assets, 0, 2, 100), operation, ChainedReferenceKey::new(0)).unwrap();

        assert_eq!(swap.limits, vec![I256::try_from(100i64).unwrap(), I256::ZERO, I256::ZERO, I256::ZERO]);
        assert_eq!(swap.funds.sender, Party::User);
        assert!(swap.funds.is_external());
        assert_eq!(swap.funds.recipient, Party::Relayer);
        assert!(swap.funds.to_internal_balance);
        assert_eq!(swap.output_references.len(), 1);
        assert_eq!(next, ChainedReferenceKey::new(1));
    }

    #[test]
    fn test_output_swap_limits() {
        let assets = vec![DAI, USDC, WETH, BAL];
        let operation = OperationTokens::new(0, 3);
        let (swap, next) = SwapAction::new(swap_params(assets, 2, 3, 100), operation, ChainedReferenceKey::new(3)).unwrap();

        assert_eq!(
            swap.swaps[0].amount,
            ActionAmount::Chained(ChainedReference::temporary(ChainedReferenceKey::new(2)))
        );
        assert_eq!(swap.limits[2], I256::MAX);
        assert_eq!(swap.limits[3], -I256::try_from(198i64).unwrap());
        assert!(!swap.funds.is_external());
        assert_eq!(swap.funds.recipient, Party::User);
        assert!(swap.output_references.is_empty());
        assert_eq!(next, ChainedReferenceKey::new(3));
    }

    #[test]
    fn test_parallel_entry_swaps_merge() {
        let operation = OperationTokens::new(0, 3);
        let (first, key) =
            SwapAction::new(swap_params(vec![DAI, USDC, WETH, BAL], 0, 2, 100), operation, ChainedReferenceKey::new(0))
                .unwrap();
        let (second, _) = SwapAction::new(swap_params(vec![DAI, USDC, WETH, BAL], 0, 1, 50), operation, key).unwrap();

        assert!(first.can_add_swap(&second));
        let merged = first.add_swap(second).unwrap();

        assert_eq!(merged.swaps.len(), 2);
        assert_eq!(merged.assets.len(), 4);
        assert_eq!(merged.limits[0], I256::try_from(150i64).unwrap());
        assert_eq!(merged.output_references.len(), 2);
        assert!(merged.has_token_in);
        assert!(!merged.has_token_out);
    }

    #[test]
    fn test_merge_remaps_foreign_assets() {
        let operation = OperationTokens::new(0, 1);
        let (first, key) =
            SwapAction::new(swap_params(vec![DAI, WETH], 0, 1, 10), operation, ChainedReferenceKey::new(0)).unwrap();
        let (second, _) = SwapAction::new(swap_params(vec![DAI, USDC], 0, 1, 20), operation, key).unwrap();

        let merged = first.add_swap(second).unwrap();

        assert_eq!(merged.assets, vec![DAI, WETH, USDC]);
        assert_eq!(merged.swaps[1].asset_in_index, 0);
        assert_eq!(merged.swaps[1].asset_out_index, 2);
        assert_eq!(merged.limits, vec![I256::try_from(30i64).unwrap(), -I256::try_from(19i64).unwrap(), -I256::try_from(39i64).unwrap()]);
        assert_eq!(merged.output_token(), Some(USDC));
    }

    #[test]
    fn test_swaps_with_different_funding_do_not_merge() {
        let assets = vec![DAI, USDC, WETH, BAL];
        let operation = OperationTokens::new(0, 3);
        let (entry, key) = SwapAction::new(swap_params(assets.clone(), 0, 2, 100), operation, ChainedReferenceKey::new(0)).unwrap();
        let (chained, _) = SwapAction::new(swap_params(assets, 2, 3, 100), operation, key).unwrap();

        assert!(!entry.can_add_swap(&chained));
        assert!(matches!(entry.add_swap(chained), Err(ActionError::IncompatibleSwaps { .. })));
    }

    #[test]
    fn test_native_value_for_user_funded_swaps() {
        let operation = OperationTokens::new(0, 1);
        let (swap, _) =
            SwapAction::new(swap_params(vec![Address::ZERO, DAI], 0, 1, 7), operation, ChainedReferenceKey::new(0)).unwrap();
        assert_eq!(swap.value(), U256::from(7u64));
    }
}
