//! Recommendation engine runtime
//!
//! Orchestrates the pure algorithms in `agrimarket-core` over the repositories in
//! `agrimarket-db`:
//! - profile updates from purchase history
//! - per-customer recommendation generation and replacement
//! - preferred marketplace items for a customer
//! - action recording with listing snapshots
//! - batch runs with per-customer failure isolation
//!
//! Every unit of work is sequential and scoped to one customer. Models are trained per call
//! and never cached.

pub mod batch;
pub mod error;
pub mod runtime;

pub use batch::{BatchStage, BatchSummary, CustomerOutcome, CustomerRunStatus};
pub use error::EngineError;
pub use runtime::{EngineRepositories, EngineSettings, RecommendationEngine, RecordActionRequest};
