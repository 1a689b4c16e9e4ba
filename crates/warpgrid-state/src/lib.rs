//! warpgrid-state — cluster snapshot model for WarpGrid scheduling.
//!
//! Holds the read-only view of nodes and the pods bound to them that the
//! placement engine scores against: pods with their inter-pod affinity
//! rules, nodes with their topology labels, and the [`NodeInfoProvider`]
//! seam through which scorers resolve nodes.
//!
//! # Architecture
//!
//! A [`ClusterSnapshot`] is built once per scheduling cycle and shared by
//! reference across scoring workers. It is never written back to; each
//! cycle starts from a fresh snapshot.

pub mod error;
pub mod snapshot;
pub mod types;

pub use error::{StateError, StateResult};
pub use snapshot::{ClusterSnapshot, NodeInfo, NodeInfoProvider, SnapshotSpec};
pub use types::*;
