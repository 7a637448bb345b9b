//! Builder patterns for complex object construction.
//!
//! # Available Builders
//!
//! - **`ActionPlanBuilder`**: Builds an operation's actions while threading the
//!   chained reference counter through every constructor
//! - **`SimulatorBuilder`**: Creates a `Simulator` with the strategies a
//!   configuration (or the caller) provides
//!
//! Builders consume themselves; build methods that can fail return `Result<T>`.

pub mod plan;
pub mod simulator;

// Re-export builders for convenience
pub use plan::ActionPlanBuilder;
pub use simulator::SimulatorBuilder;
