//! Topology co-location between nodes.

use warpgrid_state::Node;

/// Whether `a` and `b` share the same value for `topology_key`.
///
/// A key missing on either node, or an empty key, is a non-match.
pub fn same_topology(a: &Node, b: &Node, topology_key: &str) -> bool {
    if topology_key.is_empty() {
        return false;
    }
    match (a.labels.get(topology_key), b.labels.get(topology_key)) {
        (Some(va), Some(vb)) => va == vb,
        _ => false,
    }
}
