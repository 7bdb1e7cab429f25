//! Pure, path-addressed edits of a filter tree. Every function returns a new
//! tree and leaves its input untouched.
use tracing::debug;

use crate::core::filter::{FilterNode, Leaf};
use crate::core::path::{Branch, NodePath};
use crate::core::types::LogicalOp;

/// Node addressed by `path`, or None when the path leaves the tree
pub fn node_at<'a>(root: &'a FilterNode, path: &NodePath) -> Option<&'a FilterNode> {
    path.branches().iter().try_fold(root, |node, branch| {
        let (_, left, right) = node.as_binary()?;
        Some(match branch {
            Branch::Left => left,
            Branch::Right => right,
        })
    })
}

/// Append `leaf` as the rightmost leaf, joined to the existing tree by `op`
pub fn add_leaf(root: Option<&FilterNode>, op: LogicalOp, leaf: Leaf) -> FilterNode {
    match root {
        None => FilterNode::Leaf(leaf),
        Some(existing) => FilterNode::binary(op, existing.clone(), FilterNode::Leaf(leaf)),
    }
}

/// Replace the leaf at `path`; anything else at `path` leaves the tree unchanged
pub fn replace_leaf(root: &FilterNode, path: &NodePath, leaf: Leaf) -> FilterNode {
    let rewritten = rewrite_at(root, path.branches(), |node| match node {
        FilterNode::Leaf(_) => Some(FilterNode::Leaf(leaf)),
        _ => None,
    });
    rewritten.unwrap_or_else(|| {
        debug!("replace_leaf: no leaf at path {path}");
        root.clone()
    })
}

/// Swap AND/OR of the operator node at `path`, keeping its children
pub fn toggle_operator(root: &FilterNode, path: &NodePath) -> FilterNode {
    let rewritten = rewrite_at(root, path.branches(), |node| {
        let (op, left, right) = node.as_binary()?;
        Some(FilterNode::binary(op.toggled(), left.clone(), right.clone()))
    });
    rewritten.unwrap_or_else(|| {
        debug!("toggle_operator: no operator at path {path}");
        root.clone()
    })
}

/// Delete the leaf at `path`, collapsing its parent into the sibling subtree
///
/// Returns None when the deleted leaf was the whole tree.
pub fn delete_leaf(root: &FilterNode, path: &NodePath) -> Option<FilterNode> {
    match remove_at(root, path.branches()) {
        Some(result) => result,
        None => {
            debug!("delete_leaf: no leaf at path {path}");
            Some(root.clone())
        }
    }
}

fn rewrite_at<F>(node: &FilterNode, branches: &[Branch], rewrite: F) -> Option<FilterNode>
where
    F: FnOnce(&FilterNode) -> Option<FilterNode>,
{
    let Some((first, rest)) = branches.split_first() else {
        return rewrite(node);
    };
    let (op, left, right) = node.as_binary()?;
    Some(match first {
        Branch::Left => FilterNode::binary(op, rewrite_at(left, rest, rewrite)?, right.clone()),
        Branch::Right => FilterNode::binary(op, left.clone(), rewrite_at(right, rest, rewrite)?),
    })
}

// Outer None: the path does not resolve to a leaf. Inner None: the subtree is gone.
fn remove_at(node: &FilterNode, branches: &[Branch]) -> Option<Option<FilterNode>> {
    let Some((first, rest)) = branches.split_first() else {
        return match node {
            FilterNode::Leaf(_) => Some(None),
            _ => None,
        };
    };
    let (op, left, right) = node.as_binary()?;
    let (target, sibling) = match first {
        Branch::Left => (left, right),
        Branch::Right => (right, left),
    };
    let remaining = match remove_at(target, rest)? {
        None => sibling.clone(),
        Some(kept) => match first {
            Branch::Left => FilterNode::binary(op, kept, right.clone()),
            Branch::Right => FilterNode::binary(op, left.clone(), kept),
        },
    };
    Some(Some(remaining))
}
