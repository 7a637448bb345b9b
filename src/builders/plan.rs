//! Builder pattern for action plans

use crate::actions::{
    order_actions, Action, ChainedReference, ChainedReferenceKey, ExitAction, ExitParams, JoinAction, JoinParams, OperationTokens,
    SwapAction, SwapParams,
};
use crate::errors::Result;

/// Builder that creates the actions of one operation in caller order.
///
/// Each added action consumes the current chained reference key and hands the
/// next free key to the following action.
pub struct ActionPlanBuilder {
    operation: OperationTokens,
    asset_count: Option<usize>,
    key: ChainedReferenceKey,
    /// Next read-only key; `None` while output peeks are off.
    peek_key: Option<ChainedReferenceKey>,
    actions: Vec<Action>,
}

impl ActionPlanBuilder {
    /// Create a new builder for one operation.
    ///
    /// # Arguments
    ///
    /// * `operation` - Indices of the operation's input and output tokens in the asset list
    ///
    /// # Returns
    ///
    /// An empty plan that allocates chained references from key zero
    pub fn new(operation: OperationTokens) -> Self {
        Self {
            operation,
            asset_count: None,
            key: ChainedReferenceKey::default(),
            peek_key: None,
            actions: Vec::new(),
        }
    }

    /// Start allocating chained references at `key` instead of zero
    pub fn starting_key(mut self, key: ChainedReferenceKey) -> Self {
        self.key = key;
        self
    }

    /// Validate join and exit asset indices against the operation's asset list length
    pub fn with_asset_count(mut self, asset_count: usize) -> Self {
        self.asset_count = Some(asset_count);
        self
    }

    /// Store every output delivered to the user under a read-only reference.
    ///
    /// Read-only keys live in their own key space, so the temporary counter
    /// handed between actions is unaffected. Peeking these references after
    /// the actions reads each output without clearing it.
    pub fn with_output_peeks(mut self) -> Self {
        self.peek_key = Some(ChainedReferenceKey::default());
        self
    }

    /// Add a join
    pub fn join(mut self, params: JoinParams) -> Result<Self> {
        let (join, next) = match self.asset_count {
            Some(count) => JoinAction::with_asset_count(params, self.operation, count, self.key)?,
            None => JoinAction::new(params, self.operation, self.key)?,
        };
        self.push(join.into(), next);
        Ok(self)
    }

    /// Add an exit
    pub fn exit(mut self, params: ExitParams) -> Result<Self> {
        let (exit, next) = match self.asset_count {
            Some(count) => ExitAction::with_asset_count(params, self.operation, count, self.key)?,
            None => ExitAction::new(params, self.operation, self.key)?,
        };
        self.push(exit.into(), next);
        Ok(self)
    }

    /// Add a single-hop swap
    pub fn swap(mut self, params: SwapParams) -> Result<Self> {
        let (swap, next) = SwapAction::new(params, self.operation, self.key)?;
        self.push(swap.into(), next);
        Ok(self)
    }

    fn push(&mut self, mut action: Action, next: ChainedReferenceKey) {
        if let Some(peek_key) = self.peek_key {
            if action.add_output_peek(ChainedReference::read_only(peek_key)) {
                tracing::trace!(index = self.actions.len(), peek_key = %peek_key, "Output peek attached");
                self.peek_key = Some(peek_key.next());
            }
        }
        tracing::debug!(
            index = self.actions.len(),
            action_type = %action.action_type(),
            has_token_in = action.has_token_in(),
            has_token_out = action.has_token_out(),
            key = %self.key,
            next_key = %next,
            "Action added to plan"
        );
        self.actions.push(action);
        self.key = next;
    }

    /// Next free chained reference key
    pub fn next_key(&self) -> ChainedReferenceKey {
        self.key
    }

    /// Actions in the order they were added
    pub fn build(self) -> Vec<Action> {
        self.actions
    }

    /// Actions categorized and batched for execution
    pub fn build_ordered(self) -> Vec<Action> {
        order_actions(self.actions)
    }
}
