//! Symmetric pairwise scan of placed pods against the pod being scheduled.
//!
//! For each placed pod two directions are scored:
//! - the incoming pod's soft terms, matched against the placed pod;
//! - the placed pod's hard affinity and soft terms, matched against the
//!   incoming pod.
//!
//! Either way the score lands on every candidate node co-located with the
//! placed pod's node, so a preference declared by one side influences
//! placement of the other.

use tracing::debug;
use warpgrid_state::{Node, NodeInfo, NodeInfoProvider, Pod};

use crate::accumulator::PriorityAccumulator;
use crate::error::PlacementResult;
use crate::terms::{self, TermContext, TermGroup};

/// Scans placed pods for one incoming pod.
pub struct PairwiseScanner<'a, P: NodeInfoProvider + ?Sized> {
    pod: &'a Pod,
    /// Incoming pod's groups, built once per pass.
    incoming: Vec<TermGroup<'a>>,
    /// Whether the incoming pod declares any affinity block.
    incoming_has_constraints: bool,
    nodes: &'a [Node],
    provider: &'a P,
    hard_weight: i64,
    acc: &'a PriorityAccumulator,
}

impl<'a, P: NodeInfoProvider + ?Sized> PairwiseScanner<'a, P> {
    pub fn new(
        pod: &'a Pod,
        nodes: &'a [Node],
        provider: &'a P,
        hard_weight: i64,
        acc: &'a PriorityAccumulator,
    ) -> Self {
        Self {
            pod,
            incoming: terms::incoming_groups(pod),
            incoming_has_constraints: pod.has_affinity_constraints(),
            nodes,
            provider,
            hard_weight,
            acc,
        }
    }

    /// Score every relevant pod placed on `info`'s node.
    ///
    /// When the incoming pod has no rules of its own, only placed pods
    /// with rules can contribute and the rest are skipped. Errors are
    /// recorded on the accumulator.
    pub fn scan_node(&self, info: &NodeInfo) {
        if info.node().is_none() {
            return;
        }

        let result = if self.incoming_has_constraints {
            self.scan_pods(info.pods().iter())
        } else {
            self.scan_pods(info.pods_with_affinity())
        };
        if let Err(err) = result {
            self.acc.set_error(err);
        }
    }

    fn scan_pods<'p>(&self, pods: impl Iterator<Item = &'p Pod>) -> PlacementResult<()> {
        for existing in pods {
            self.process_existing_pod(existing)?;
        }
        Ok(())
    }

    /// Score one placed pod in both directions.
    pub fn process_existing_pod(&self, existing: &Pod) -> PlacementResult<()> {
        if !self.incoming_has_constraints && !existing.has_affinity_constraints() {
            return Ok(());
        }

        let Some(node_name) = existing.node_name.as_deref() else {
            return Ok(());
        };
        let existing_node = match self.provider.get_node_info(node_name) {
            Ok(info) => match info.node() {
                Some(node) => node,
                None => return Ok(()),
            },
            Err(err) if err.is_not_found() => {
                debug!(
                    pod = %existing.key(),
                    node = node_name,
                    "node of placed pod not found, skipping"
                );
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };

        let outward = TermContext {
            defining_pod: self.pod,
            candidate_pod: existing,
            fixed_node: existing_node,
            nodes: self.nodes,
        };
        for group in &self.incoming {
            terms::process_group(group, &outward, self.acc);
        }

        let inward = TermContext {
            defining_pod: existing,
            candidate_pod: self.pod,
            fixed_node: existing_node,
            nodes: self.nodes,
        };
        for group in terms::existing_groups(existing, self.hard_weight) {
            terms::process_group(&group, &inward, self.acc);
        }

        Ok(())
    }
}
