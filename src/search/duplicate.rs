//! Detection of sibling turns that reach the same map.
//!
//! Two bundles that move the same units to the same places in a different
//! order end in the same state. Only the first such sibling (the primary)
//! is evaluated and expanded; later ones are recorded as its duplicates and
//! share its fitness.

use super::node::{NodeId, Tree};

/// Looks for an existing child of `candidate`'s parent whose state matches
/// `candidate`'s. Returns the primary of the matching sibling.
///
/// `candidate` must be created but not yet attached, so it never matches
/// itself.
pub fn check_duplicate(tree: &Tree, candidate: NodeId) -> Option<NodeId> {
    let node = tree.get(candidate);
    let parent = node.parent()?;
    tree.get(parent)
        .children()
        .iter()
        .copied()
        .filter(|&sib| sib != candidate)
        .find(|&sib| {
            let other = tree.get(sib);
            other.hash() == node.hash() && other.state().is_equivalent(node.state())
        })
        .map(|sib| tree.primary_of(sib))
}

/// Records `candidate` as a duplicate of `primary`. Its fitness mirrors the
/// primary's from now on.
pub fn mark_duplicate(tree: &mut Tree, candidate: NodeId, primary: NodeId) {
    log::trace!("node {candidate:?} duplicates {primary:?}");
    tree.link_duplicate(candidate, primary);
}
