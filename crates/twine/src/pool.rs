//! A bounded freelist of recycled node shells.
//!
//! Leaf byte buffers are never pooled; retiring a node drops its contents
//! (buffer included) and keeps only the heap shell for reuse. The pool is
//! per-thread, so ropes may be used from multiple threads as long as each
//! rope stays on one.

use std::cell::RefCell;
use std::mem;

use crate::node::{Leaf, Node};

pub(crate) const NODE_POOL_SIZE: usize = 512;

thread_local! {
    static POOL: RefCell<Vec<Box<Node>>> = const { RefCell::new(Vec::new()) };
}

/// Boxes a node, reusing a pooled shell when one is available.
pub(crate) fn alloc(node: Node) -> Box<Node> {
    match POOL.try_with(|pool| pool.borrow_mut().pop()) {
        Ok(Some(mut shell)) => {
            *shell = node;
            shell
        }
        _ => Box::new(node),
    }
}

/// Takes a node out of its box and recycles the shell, returning the
/// contents for restructuring. Shells past the pool bound are freed
/// outright, as are shells retired after thread-local teardown.
pub(crate) fn retire(mut node: Box<Node>) -> Node {
    let inner = mem::replace(&mut *node, Node::Leaf(Leaf::default()));
    let _ = POOL.try_with(|pool| {
        let mut pool = pool.borrow_mut();
        if pool.len() < NODE_POOL_SIZE {
            pool.push(node);
        }
    });
    inner
}

/// Retires a whole subtree, shell by shell.
pub(crate) fn free_tree(node: Box<Node>) {
    match retire(node) {
        Node::Leaf(_) => {}
        Node::Branch(branch) => {
            free_tree(branch.left);
            free_tree(branch.right);
        }
    }
}

#[cfg(test)]
pub(crate) fn pooled() -> usize {
    POOL.with_borrow(Vec::len)
}
