//! Domain types for the WarpGrid cluster snapshot.
//!
//! These types describe the read-only view of pods and nodes that the
//! placement engine scores against. All types are serializable to/from
//! JSON so snapshots can be captured and replayed.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Unique identifier for a node in the cluster.
pub type NodeName = String;

/// Label key → value map attached to pods and nodes.
pub type Labels = HashMap<String, String>;

// ── Pod ───────────────────────────────────────────────────────────

/// A workload instance, either already placed or waiting for placement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Pod {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub labels: Labels,
    /// Node this pod is bound to. `None` while unscheduled.
    #[serde(default)]
    pub node_name: Option<NodeName>,
    /// Inter-pod affinity rules declared by this pod.
    #[serde(default)]
    pub affinity: Option<Affinity>,
}

impl Pod {
    /// Create an unscheduled pod with no labels or affinity.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    /// Add a label to the pod.
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Bind the pod to a node.
    pub fn on_node(mut self, node_name: impl Into<String>) -> Self {
        self.node_name = Some(node_name.into());
        self
    }

    /// Set the pod's affinity rules.
    pub fn with_affinity(mut self, affinity: Affinity) -> Self {
        self.affinity = Some(affinity);
        self
    }

    /// `{namespace}/{name}`, used in logs.
    pub fn key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    /// The pod's affinity block, if it declares one.
    pub fn pod_affinity(&self) -> Option<&PodAffinity> {
        self.affinity.as_ref().and_then(|a| a.pod_affinity.as_ref())
    }

    /// The pod's anti-affinity block, if it declares one.
    pub fn pod_anti_affinity(&self) -> Option<&PodAntiAffinity> {
        self.affinity.as_ref().and_then(|a| a.pod_anti_affinity.as_ref())
    }

    /// Whether the pod declares an affinity or anti-affinity block.
    ///
    /// Presence of the block is what counts, even if its term lists are empty.
    pub fn has_affinity_constraints(&self) -> bool {
        self.pod_affinity().is_some() || self.pod_anti_affinity().is_some()
    }
}

// ── Affinity ──────────────────────────────────────────────────────

/// Inter-pod scheduling rules of a pod.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Affinity {
    #[serde(default)]
    pub pod_affinity: Option<PodAffinity>,
    #[serde(default)]
    pub pod_anti_affinity: Option<PodAntiAffinity>,
}

/// Rules attracting a pod towards pods matching its terms.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PodAffinity {
    /// Hard terms. Feasibility is enforced upstream; scoring only uses
    /// their symmetric effect.
    #[serde(default)]
    pub required: Vec<AffinityTerm>,
    /// Soft terms, each contributing its weight.
    #[serde(default)]
    pub preferred: Vec<WeightedAffinityTerm>,
}

/// Rules repelling a pod from pods matching its terms.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PodAntiAffinity {
    #[serde(default)]
    pub required: Vec<AffinityTerm>,
    #[serde(default)]
    pub preferred: Vec<WeightedAffinityTerm>,
}

/// A co-location rule: pods matched by `label_selector` in `namespaces`,
/// grouped by the node label `topology_key`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AffinityTerm {
    /// `None` selects no pods.
    #[serde(default)]
    pub label_selector: Option<LabelSelector>,
    /// Empty means the namespace of the pod declaring the term.
    #[serde(default)]
    pub namespaces: Vec<String>,
    pub topology_key: String,
}

impl AffinityTerm {
    /// Term selecting pods with the given selector expression.
    pub fn new(selector: impl Into<String>, topology_key: impl Into<String>) -> Self {
        Self {
            label_selector: Some(LabelSelector::Expression(selector.into())),
            namespaces: Vec::new(),
            topology_key: topology_key.into(),
        }
    }

    /// Restrict the term to explicit namespaces.
    pub fn in_namespaces<I, S>(mut self, namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.namespaces = namespaces.into_iter().map(Into::into).collect();
        self
    }
}

/// A soft term with its weight.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeightedAffinityTerm {
    pub weight: i32,
    pub term: AffinityTerm,
}

impl WeightedAffinityTerm {
    pub fn new(weight: i32, term: AffinityTerm) -> Self {
        Self { weight, term }
    }
}

// ── Label selectors ───────────────────────────────────────────────

/// A label query over pods.
///
/// Accepted either as an expression string (`"app=web,tier in (a,b)"`) or
/// in structured form. Semantics are checked by the scorer, not here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum LabelSelector {
    Expression(String),
    Structured {
        #[serde(default)]
        match_labels: HashMap<String, String>,
        #[serde(default)]
        match_expressions: Vec<LabelSelectorRequirement>,
    },
}

/// One requirement of a structured selector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LabelSelectorRequirement {
    pub key: String,
    /// `In`, `NotIn`, `Exists` or `DoesNotExist`. Kept raw so that a bad
    /// operator surfaces as a selector error at scoring time.
    pub operator: String,
    #[serde(default)]
    pub values: Vec<String>,
}

// ── Node ──────────────────────────────────────────────────────────

/// A cluster node as seen by the scheduler.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Node {
    pub name: NodeName,
    /// Labels used for topology comparisons (zone, hostname, ...).
    #[serde(default)]
    pub labels: Labels,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            labels: HashMap::new(),
        }
    }

    /// Add a label to the node.
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }
}
