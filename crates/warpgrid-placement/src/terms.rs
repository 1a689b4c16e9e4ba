//! Term groups and the per-term scoring step.
//!
//! A pod's affinity rules are flattened into [`TermGroup`]s tagged with a
//! [`TermKind`], so the pairwise scan is one loop over groups instead of a
//! branch per rule category. Each term carries its resolved weight:
//! preferred terms bring their own, required terms use the configured
//! hard-affinity weight, and its selector compiled once when the group is
//! built.

use warpgrid_state::{AffinityTerm, Node, Pod, WeightedAffinityTerm};

use crate::accumulator::PriorityAccumulator;
use crate::matcher;
use crate::selector::{Selector, SelectorError};
use crate::topology::same_topology;

/// Rule category of a term group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermKind {
    RequiredAffinity,
    PreferredAffinity,
    RequiredAntiAffinity,
    PreferredAntiAffinity,
}

impl TermKind {
    /// `+1` for affinity, `-1` for anti-affinity.
    pub fn sign(self) -> i64 {
        match self {
            TermKind::RequiredAffinity | TermKind::PreferredAffinity => 1,
            TermKind::RequiredAntiAffinity | TermKind::PreferredAntiAffinity => -1,
        }
    }
}

/// A term borrowed from a pod spec with its unsigned weight.
#[derive(Debug, Clone)]
pub struct WeightedTermRef<'a> {
    pub weight: i64,
    pub term: &'a AffinityTerm,
    /// Parse errors surface only when the term is evaluated.
    pub selector: Result<Selector, SelectorError>,
}

impl<'a> WeightedTermRef<'a> {
    pub fn new(weight: i64, term: &'a AffinityTerm) -> Self {
        Self {
            weight,
            term,
            selector: matcher::compile(term),
        }
    }
}

/// Terms of one kind declared by one pod.
#[derive(Debug, Clone)]
pub struct TermGroup<'a> {
    pub kind: TermKind,
    pub terms: Vec<WeightedTermRef<'a>>,
}

impl TermGroup<'_> {
    pub fn sign(&self) -> i64 {
        self.kind.sign()
    }
}

/// Groups a pod contributes when it is the pod being placed: its soft
/// affinity and anti-affinity terms.
pub fn incoming_groups(pod: &Pod) -> Vec<TermGroup<'_>> {
    let mut groups = Vec::new();
    if let Some(affinity) = pod.pod_affinity() {
        groups.push(preferred(TermKind::PreferredAffinity, &affinity.preferred));
    }
    if let Some(anti) = pod.pod_anti_affinity() {
        groups.push(preferred(TermKind::PreferredAntiAffinity, &anti.preferred));
    }
    groups.retain(|g| !g.terms.is_empty());
    groups
}

/// Groups a pod contributes when it is already placed: its hard affinity
/// terms at `hard_weight` (skipped when zero), plus its soft terms.
///
/// Hard anti-affinity is a feasibility concern and never scores.
pub fn existing_groups(pod: &Pod, hard_weight: i64) -> Vec<TermGroup<'_>> {
    let mut groups = Vec::new();
    if let Some(affinity) = pod.pod_affinity() {
        if hard_weight > 0 {
            groups.push(TermGroup {
                kind: TermKind::RequiredAffinity,
                terms: affinity
                    .required
                    .iter()
                    .map(|term| WeightedTermRef::new(hard_weight, term))
                    .collect(),
            });
        }
        groups.push(preferred(TermKind::PreferredAffinity, &affinity.preferred));
    }
    if let Some(anti) = pod.pod_anti_affinity() {
        groups.push(preferred(TermKind::PreferredAntiAffinity, &anti.preferred));
    }
    groups.retain(|g| !g.terms.is_empty());
    groups
}

fn preferred(kind: TermKind, terms: &[WeightedAffinityTerm]) -> TermGroup<'_> {
    TermGroup {
        kind,
        terms: terms
            .iter()
            .map(|t| WeightedTermRef::new(i64::from(t.weight), &t.term))
            .collect(),
    }
}

/// Inputs shared by every term evaluated against one pod pair.
#[derive(Debug, Clone, Copy)]
pub struct TermContext<'a> {
    /// Pod that declares the terms.
    pub defining_pod: &'a Pod,
    /// Pod checked against the terms.
    pub candidate_pod: &'a Pod,
    /// Node of the already-placed pod of the pair.
    pub fixed_node: &'a Node,
    /// Candidate nodes receiving score.
    pub nodes: &'a [Node],
}

/// Score one term: if the candidate pod matches, every node co-located
/// with the fixed node gets `weight * sign`.
///
/// A selector error is recorded on the accumulator and the term is dropped.
pub fn process_term(
    weighted: &WeightedTermRef<'_>,
    sign: i64,
    ctx: &TermContext<'_>,
    acc: &PriorityAccumulator,
) {
    let selector = match &weighted.selector {
        Ok(selector) => selector,
        Err(err) => {
            acc.set_error(err.clone().into());
            return;
        }
    };
    let term = weighted.term;
    if !matcher::matches(selector, term, ctx.defining_pod, ctx.candidate_pod) {
        return;
    }

    let delta = weighted.weight * sign;
    for node in ctx.nodes {
        if same_topology(node, ctx.fixed_node, &term.topology_key) {
            acc.add(&node.name, delta);
        }
    }
}

/// Score every term of `group`.
pub fn process_group(group: &TermGroup<'_>, ctx: &TermContext<'_>, acc: &PriorityAccumulator) {
    let sign = group.sign();
    for weighted in &group.terms {
        process_term(weighted, sign, ctx, acc);
    }
}
