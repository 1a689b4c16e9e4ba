//! WarpGrid inter-pod affinity scoring.
//!
//! Scores candidate nodes for a pod by the affinity and anti-affinity
//! rules of the pod itself and of the pods already running in the
//! cluster. It does NOT filter infeasible nodes or pick the winner; the
//! scores feed the scheduler's weighted sum alongside other priorities.
//!
//! # Components
//!
//! - **`selector`** — Label selector parsing and matching
//! - **`matcher`** — Does a pod fall under an affinity term
//! - **`topology`** — Do two nodes share a topology domain
//! - **`accumulator`** — Lock-free per-node raw scores + first error
//! - **`terms`** — Term groups and the per-term scoring step
//! - **`scanner`** — Symmetric scan of placed pods against the incoming pod
//! - **`dispatcher`** — Bounded fork-join worker pool
//! - **`normalize`** — Min-max scaling into `[0, max_score]`
//! - **`pipeline`** — `InterPodAffinityScorer`, the entry point
//! - **`config`** — `ScoringConfig` (TOML)

pub mod accumulator;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod matcher;
pub mod normalize;
pub mod pipeline;
pub mod scanner;
pub mod selector;
pub mod terms;
pub mod topology;

pub use accumulator::PriorityAccumulator;
pub use config::ScoringConfig;
pub use dispatcher::ParallelDispatcher;
pub use error::{PlacementError, PlacementResult};
pub use normalize::normalize;
pub use pipeline::{InterPodAffinityScorer, NodeScore};
pub use selector::{Selector, SelectorError};
pub use terms::{TermGroup, TermKind};
pub use topology::same_topology;
