//! Inter-pod affinity scoring pipeline.
//!
//! Composes the pieces of a scoring pass:
//!
//! ```text
//! score(pod, nodes, provider)
//!   ├── fast path: nobody declares rules → all zero
//!   ├── PriorityAccumulator (one counter per candidate node)
//!   ├── ParallelDispatcher over provider.node_infos()
//!   │     └── PairwiseScanner → terms → matcher / topology
//!   └── normalize(raw, min, max, max_score) per candidate node
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use warpgrid_state::{Node, NodeInfoProvider, Pod};

use crate::accumulator::PriorityAccumulator;
use crate::config::ScoringConfig;
use crate::dispatcher::ParallelDispatcher;
use crate::error::PlacementResult;
use crate::normalize::normalize;
use crate::scanner::PairwiseScanner;

/// Normalized score of one candidate node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeScore {
    pub node_name: String,
    /// In `[0, max_score]`.
    pub score: i64,
}

/// Scores candidate nodes by inter-pod affinity and anti-affinity.
///
/// Stateless between calls; one instance can serve many scheduling cycles
/// and concurrent callers.
#[derive(Debug, Clone)]
pub struct InterPodAffinityScorer {
    config: ScoringConfig,
    dispatcher: ParallelDispatcher,
}

impl InterPodAffinityScorer {
    pub fn new(config: ScoringConfig) -> PlacementResult<Self> {
        config.validate()?;
        let dispatcher = ParallelDispatcher::new(config.parallelism);
        Ok(Self { config, dispatcher })
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Score `nodes` for placing `pod`.
    ///
    /// The result has one entry per candidate node, in input order. Any
    /// selector error aborts the pass and no scores are returned.
    pub fn score<P>(&self, pod: &Pod, nodes: &[Node], provider: &P) -> PlacementResult<Vec<NodeScore>>
    where
        P: NodeInfoProvider + ?Sized,
    {
        if nodes.is_empty() {
            return Ok(Vec::new());
        }

        let infos = provider.node_infos();
        let pod_has_constraints = pod.has_affinity_constraints();
        if !pod_has_constraints && !infos.iter().any(|info| info.has_pods_with_affinity()) {
            debug!(pod = %pod.key(), nodes = nodes.len(), "no affinity rules in play, skipping scan");
            return Ok(zero_scores(nodes));
        }

        let acc = PriorityAccumulator::new(nodes);
        let scanner = PairwiseScanner::new(
            pod,
            nodes,
            provider,
            self.config.hard_pod_affinity_weight,
            &acc,
        );
        let scanned = self.dispatcher.run(
            infos.len(),
            || acc.has_error(),
            |i| scanner.scan_node(infos[i]),
        );

        if let Some(err) = acc.take_error() {
            return Err(err);
        }

        let (min, max) = acc.min_max();
        debug!(
            pod = %pod.key(),
            nodes = nodes.len(),
            scanned,
            min,
            max,
            "inter-pod affinity scan finished"
        );

        Ok(nodes
            .iter()
            .map(|node| {
                let raw = acc.get(&node.name).unwrap_or(0);
                self.emit(pod, &node.name, normalize(raw, min, max, self.config.max_score))
            })
            .collect())
    }

    /// Normalize externally computed raw scores, bypassing the scan.
    ///
    /// Nodes absent from `raw` count as 0, and the min/max range always
    /// includes 0: a cluster where every node has the same positive raw
    /// score normalizes to `max_score` everywhere, unlike [`Self::score`].
    pub fn score_precomputed(
        &self,
        pod: &Pod,
        nodes: &[Node],
        raw: &HashMap<String, i64>,
    ) -> Vec<NodeScore> {
        let value = |node: &Node| raw.get(&node.name).copied().unwrap_or(0);
        let (min, max) = nodes
            .iter()
            .map(value)
            .fold((0, 0), |(min, max), v| (min.min(v), max.max(v)));

        debug!(pod = %pod.key(), nodes = nodes.len(), min, max, "normalizing precomputed scores");
        nodes
            .iter()
            .map(|node| {
                self.emit(pod, &node.name, normalize(value(node), min, max, self.config.max_score))
            })
            .collect()
    }

    fn emit(&self, pod: &Pod, node_name: &str, score: i64) -> NodeScore {
        trace!(pod = %pod.key(), node = node_name, score, "inter-pod affinity score");
        NodeScore {
            node_name: node_name.to_string(),
            score,
        }
    }
}

impl Default for InterPodAffinityScorer {
    fn default() -> Self {
        let config = ScoringConfig::default();
        Self {
            dispatcher: ParallelDispatcher::new(config.parallelism),
            config,
        }
    }
}

fn zero_scores(nodes: &[Node]) -> Vec<NodeScore> {
    nodes
        .iter()
        .map(|node| NodeScore {
            node_name: node.name.clone(),
            score: 0,
        })
        .collect()
}
