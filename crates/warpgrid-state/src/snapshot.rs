//! ClusterSnapshot — immutable view of nodes and the pods bound to them.
//!
//! The scheduler builds one snapshot per scheduling cycle and hands it to
//! scorers through [`NodeInfoProvider`]. Nothing here is mutated while a
//! scoring pass is in flight; scorers only take shared references.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::types::{Node, NodeName, Pod};

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// A node together with the pods bound to it.
#[derive(Debug, Clone, Default)]
pub struct NodeInfo {
    /// `None` when pods reference a node the snapshot could not resolve.
    node: Option<Node>,
    pods: Vec<Pod>,
    /// Indices into `pods` of pods declaring affinity or anti-affinity.
    affinity_pods: Vec<usize>,
}

impl NodeInfo {
    pub fn new(node: Node) -> Self {
        Self {
            node: Some(node),
            ..Default::default()
        }
    }

    /// Entry for pods whose node is unknown to the snapshot.
    pub fn without_node() -> Self {
        Self::default()
    }

    pub fn with_pods(mut self, pods: impl IntoIterator<Item = Pod>) -> Self {
        for pod in pods {
            self.add_pod(pod);
        }
        self
    }

    pub fn add_pod(&mut self, pod: Pod) {
        if pod.has_affinity_constraints() {
            self.affinity_pods.push(self.pods.len());
        }
        self.pods.push(pod);
    }

    pub fn node(&self) -> Option<&Node> {
        self.node.as_ref()
    }

    pub fn pods(&self) -> &[Pod] {
        &self.pods
    }

    /// Pods on this node that declare affinity or anti-affinity.
    pub fn pods_with_affinity(&self) -> impl Iterator<Item = &Pod> + '_ {
        self.affinity_pods.iter().map(|&i| &self.pods[i])
    }

    pub fn has_pods_with_affinity(&self) -> bool {
        !self.affinity_pods.is_empty()
    }
}

/// Read access to the cluster view consumed by scorers.
///
/// Implementations must be safe to share across scoring workers.
pub trait NodeInfoProvider: Sync {
    /// Resolve a node name. Returns [`StateError::NotFound`] when the node
    /// is not part of the current view.
    fn get_node_info(&self, node_name: &str) -> StateResult<&NodeInfo>;

    /// Every node entry currently hosting pods or known to the cluster.
    fn node_infos(&self) -> Vec<&NodeInfo>;
}

/// Serialized form of a snapshot: nodes plus pods bound by `node_name`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotSpec {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub pods: Vec<Pod>,
}

/// In-memory [`NodeInfoProvider`] keyed by node name.
#[derive(Debug, Clone, Default)]
pub struct ClusterSnapshot {
    infos: BTreeMap<NodeName, NodeInfo>,
}

impl ClusterSnapshot {
    /// Build a snapshot from nodes and pods.
    ///
    /// Pods without a node are pending and are left out. Pods bound to a
    /// node that is not in `nodes` are kept under a node-less entry.
    pub fn new(nodes: impl IntoIterator<Item = Node>, pods: impl IntoIterator<Item = Pod>) -> Self {
        let mut infos: BTreeMap<NodeName, NodeInfo> = nodes
            .into_iter()
            .map(|node| (node.name.clone(), NodeInfo::new(node)))
            .collect();

        let mut pending = 0usize;
        for pod in pods {
            let Some(node_name) = pod.node_name.clone() else {
                pending += 1;
                continue;
            };
            infos
                .entry(node_name)
                .or_insert_with(NodeInfo::without_node)
                .add_pod(pod);
        }

        debug!(nodes = infos.len(), pending, "cluster snapshot built");
        Self { infos }
    }

    /// Parse a JSON-encoded [`SnapshotSpec`].
    pub fn from_json(json: &str) -> StateResult<Self> {
        let spec: SnapshotSpec = serde_json::from_str(json).map_err(map_err!(Deserialize))?;
        Ok(Self::new(spec.nodes, spec.pods))
    }

    /// Resolved node objects, in name order.
    pub fn nodes(&self) -> Vec<Node> {
        self.infos
            .values()
            .filter_map(|info| info.node().cloned())
            .collect()
    }
}

impl NodeInfoProvider for ClusterSnapshot {
    fn get_node_info(&self, node_name: &str) -> StateResult<&NodeInfo> {
        match self.infos.get(node_name) {
            Some(info) if info.node().is_some() => Ok(info),
            _ => Err(StateError::NotFound(format!("node {node_name}"))),
        }
    }

    fn node_infos(&self) -> Vec<&NodeInfo> {
        self.infos.values().collect()
    }
}
