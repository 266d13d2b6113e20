//! Left-leaning red-black fixup.
//!
//! The three classic cases run bottom-up on the unwind path of every
//! insertion. Rotations are restricted to pivots whose replaced child is a
//! branch; a leaf is never rotated into an internal position, so leaves stay
//! leaves. Skipped rotations cost at most transient local lean, which the
//! bounded leaf capacity keeps harmless.

use crate::node::{Branch, Color, Node};
use crate::pool;

pub(crate) fn is_red(node: &Node) -> bool {
    node.color() == Color::Red
}

/// Restores the red-black shape of a branch after one of its subtrees
/// changed, returning the (possibly new) subtree root.
pub(crate) fn balance(mut node: Box<Node>) -> Box<Node> {
    if !node.is_branch() {
        return node;
    }

    // right-leaning red link
    if let Node::Branch(b) = &*node
        && is_red(&b.right)
        && !is_red(&b.left)
        && b.right.is_branch()
    {
        node = rotate_left(node);
    }

    // two consecutive red links on the left
    if let Node::Branch(b) = &*node
        && is_red(&b.left)
        && let Node::Branch(left) = &*b.left
        && is_red(&left.left)
    {
        node = rotate_right(node);
    }

    // split a 4-node
    if let Node::Branch(b) = &mut *node
        && is_red(&b.left)
        && is_red(&b.right)
    {
        b.color = Color::Red;
        b.left.set_color(Color::Black);
        b.right.set_color(Color::Black);
    }

    node
}

/// The promoted child inherits the pivot's color; the demoted pivot turns
/// red. Both rebuilt branches get fresh weights.
fn rotate_left(node: Box<Node>) -> Box<Node> {
    let Node::Branch(b) = pool::retire(node) else {
        unreachable!()
    };
    let Node::Branch(r) = pool::retire(b.right) else {
        unreachable!()
    };
    let color = b.color;
    let pivot = Branch::new(b.left, r.left, Color::Red);
    let top = Branch::new(pool::alloc(Node::Branch(pivot)), r.right, color);
    pool::alloc(Node::Branch(top))
}

fn rotate_right(node: Box<Node>) -> Box<Node> {
    let Node::Branch(b) = pool::retire(node) else {
        unreachable!()
    };
    let Node::Branch(l) = pool::retire(b.left) else {
        unreachable!()
    };
    let color = b.color;
    let pivot = Branch::new(l.right, b.right, Color::Red);
    let top = Branch::new(l.left, pool::alloc(Node::Branch(pivot)), color);
    pool::alloc(Node::Branch(top))
}
