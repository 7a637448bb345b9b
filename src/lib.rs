//! Balancer Relayer Orchestration Library
//!
//! Turns a conversion from one token to another, expressed as joins, exits and
//! swaps against Balancer pools, into a single relayer `multicall` and checks
//! the expected outputs through pluggable simulation strategies.
//!
//! # Architecture Overview
//!
//! - **`actions`**: action model, step classification, chained reference
//!   allocation, ordering and swap batching
//! - **`encoding`**: relayer calldata for each action and the outer multicall
//! - **`simulation`**: strategy dispatch (Tenderly, vault model, static call)
//!   and result decoding
//! - **`config`**: environment configuration and validation
//! - **`builders`**: builders for action plans and simulators
//! - **`errors`**: error hierarchy
//! - **`utils`**: chain lookups, default addresses and conversions
//!
//! # Core Concepts
//!
//! - **Action Step**: where an action sits relative to the operation's input and
//!   output tokens; decides who funds it and who receives its output
//! - **Chained Reference**: a relayer-side slot that one sub-call writes and a
//!   later sub-call reads, so intermediate amounts need not be known up front
//! - **Batching**: adjacent swaps with the same fund management collapse into
//!   one `batchSwap`
//!
//! # Example
//!
//! ```no_run
//! use balancer_relayer_orchestrator::actions::OperationTokens;
//! use balancer_relayer_orchestrator::builders::ActionPlanBuilder;
//! use balancer_relayer_orchestrator::encoding::{EncodingContext, RelayerMulticall};
//! # fn plan(user: alloy::primitives::Address, relayer: alloy::primitives::Address) {
//! let actions = ActionPlanBuilder::new(OperationTokens::new(0, 2)).build_ordered();
//! let multicall = RelayerMulticall::with_actions(EncodingContext::new(user, relayer), &actions);
//! let calldata = multicall.encode();
//! # let _ = calldata;
//! # }
//! ```

pub mod actions;
pub mod builders;
pub mod config;
pub mod encoding;
pub mod errors;
pub mod simulation;
pub mod utils;

// Re-export the main Result type and error enum for convenience
pub use errors::{RelayerError, Result};

// Re-export builder patterns for convenience
pub use builders::{ActionPlanBuilder, SimulatorBuilder};

pub use actions::{
    action_amount, action_output_ref, action_step, number_of_output_actions, order_actions, output_peeks,
};
pub use simulation::{SimulationOutcome, SimulationRequest, SimulationType, Simulator};

// Module-specific result types for better ergonomics
pub type ActionResult<T> = std::result::Result<T, errors::ActionError>;
pub type SimulationResult<T> = std::result::Result<T, errors::SimulationError>;
