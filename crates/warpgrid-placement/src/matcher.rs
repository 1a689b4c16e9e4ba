//! Affinity term matching.
//!
//! Decides whether a pod falls under an affinity term: the pod must live
//! in one of the term's namespaces and carry labels satisfying the term's
//! selector. Pure functions, safe to call from any scoring worker.

use std::borrow::Cow;

use warpgrid_state::{AffinityTerm, Pod};

use crate::selector::{Selector, SelectorError};

/// Namespaces a term applies to.
///
/// An empty namespace list means the namespace of the pod that declares
/// the term, never the pod being matched.
pub fn term_namespaces<'a>(term: &'a AffinityTerm, defining_pod: &'a Pod) -> Cow<'a, [String]> {
    if term.namespaces.is_empty() {
        Cow::Owned(vec![defining_pod.namespace.clone()])
    } else {
        Cow::Borrowed(&term.namespaces)
    }
}

/// Compile a term's selector.
///
/// A selector that does not parse is an error; callers must treat it as
/// terminal for the scoring pass.
pub fn compile(term: &AffinityTerm) -> Result<Selector, SelectorError> {
    Selector::from_label_selector(term.label_selector.as_ref())
}

/// Whether `candidate` is selected by `term` as declared by `defining_pod`,
/// with `selector` compiled from the term.
pub fn matches(selector: &Selector, term: &AffinityTerm, defining_pod: &Pod, candidate: &Pod) -> bool {
    term_namespaces(term, defining_pod).contains(&candidate.namespace)
        && selector.matches(&candidate.labels)
}
