//! Structural recursion over the weighted tree: insertion, splitting,
//! bulk text building, and byte gathering.

use crate::node::{Branch, Color, Leaf, Node, NODE_CAPACITY, SPLIT_THRESHOLD};
use crate::pool;
use crate::rb;
use crate::utf8;

/// Inserts `text` at byte offset `at` within the subtree, returning the new
/// subtree root. Descends by byte weight, rebalancing on the unwind.
pub(crate) fn insert_rec(node: Box<Node>, at: usize, text: &[u8]) -> Box<Node> {
    match pool::retire(node) {
        Node::Leaf(leaf) => insert_into_leaf(leaf, at, text),
        Node::Branch(mut b) => {
            if at <= b.left_bytes {
                b.left = insert_rec(b.left, at, text);
                b.refresh_weights();
            } else {
                let at = at - b.left_bytes;
                b.right = insert_rec(b.right, at, text);
            }
            rb::balance(pool::alloc(Node::Branch(b)))
        }
    }
}

fn insert_into_leaf(leaf: Leaf, at: usize, text: &[u8]) -> Box<Node> {
    let fresh = build_text(text);
    let branch = if at == 0 {
        Branch::new(fresh, pool::alloc(Node::Leaf(leaf)), Color::Red)
    } else if at >= leaf.len() {
        Branch::new(pool::alloc(Node::Leaf(leaf)), fresh, Color::Red)
    } else {
        // split the leaf around the insertion point; the old leaf retires
        // and its buffer is released
        let head = pool::alloc(Node::Leaf(Leaf::new(&leaf.buf[..at])));
        let tail = pool::alloc(Node::Leaf(Leaf::new(&leaf.buf[at..])));
        let lower = Branch::new(head, fresh, Color::Red);
        Branch::new(pool::alloc(Node::Branch(lower)), tail, Color::Red)
    };
    rb::balance(pool::alloc(Node::Branch(branch)))
}

/// Splits the subtree at byte offset `at`, consuming it. Either side may be
/// empty when the cut lands on the subtree's edge.
///
/// Reassembly branches are born black: they never introduce a red-red
/// violation, at the cost of black-height skew that later insertions are
/// allowed to leave in place.
pub(crate) fn split_rec(node: Box<Node>, at: usize) -> (Option<Box<Node>>, Option<Box<Node>>) {
    match pool::retire(node) {
        Node::Leaf(leaf) => {
            if at == 0 {
                (None, Some(pool::alloc(Node::Leaf(leaf))))
            } else if at >= leaf.len() {
                (Some(pool::alloc(Node::Leaf(leaf))), None)
            } else {
                let head = Leaf::new(&leaf.buf[..at]);
                let tail = Leaf::new(&leaf.buf[at..]);
                (
                    Some(pool::alloc(Node::Leaf(head))),
                    Some(pool::alloc(Node::Leaf(tail))),
                )
            }
        }
        Node::Branch(b) => {
            if at <= b.left_bytes {
                let (head, rest) = split_rec(b.left, at);
                let right = match rest {
                    Some(rest) => join(rest, b.right),
                    None => b.right,
                };
                (head, Some(right))
            } else {
                let (rest, tail) = split_rec(b.right, at - b.left_bytes);
                let left = match rest {
                    Some(rest) => join(b.left, rest),
                    None => b.left,
                };
                (Some(left), tail)
            }
        }
    }
}

fn join(left: Box<Node>, right: Box<Node>) -> Box<Node> {
    pool::alloc(Node::Branch(Branch::new(left, right, Color::Black)))
}

/// Builds a subtree holding `text`: a single leaf up to the split
/// threshold, otherwise capacity-sized leaves split on character
/// boundaries under a balanced fork.
pub(crate) fn build_text(text: &[u8]) -> Box<Node> {
    debug_assert!(!text.is_empty());
    if text.len() <= SPLIT_THRESHOLD {
        return pool::alloc(Node::Leaf(Leaf::new(text)));
    }
    let mut chunks = Vec::new();
    let mut rest = text;
    while rest.len() > SPLIT_THRESHOLD {
        let cut = chunk_end(rest, NODE_CAPACITY);
        let (head, tail) = rest.split_at(cut);
        chunks.push(head);
        rest = tail;
    }
    chunks.push(rest);
    build_chunks(&chunks)
}

fn build_chunks(chunks: &[&[u8]]) -> Box<Node> {
    if let [chunk] = chunks {
        return pool::alloc(Node::Leaf(Leaf::new(chunk)));
    }
    let (head, tail) = chunks.split_at(chunks.len() / 2);
    join(build_chunks(head), build_chunks(tail))
}

/// Backs `target` off to the nearest preceding character boundary. Falls
/// through to a raw cut if the window is all continuation bytes.
fn chunk_end(bytes: &[u8], target: usize) -> usize {
    let mut end = target;
    while end > 0 && utf8::is_continuation(bytes[end]) {
        end -= 1;
    }
    if end == 0 { target } else { end }
}

/// Appends the subtree's bytes to `out` in order.
pub(crate) fn collect_bytes(node: &Node, out: &mut Vec<u8>) {
    match node {
        Node::Leaf(leaf) => out.extend_from_slice(&leaf.buf),
        Node::Branch(b) => {
            collect_bytes(&b.left, out);
            collect_bytes(&b.right, out);
        }
    }
}

/// Copies bytes starting `skip` bytes into the subtree until `out` is full
/// or the subtree ends; returns the number of bytes written.
pub(crate) fn copy_from(node: &Node, skip: usize, out: &mut [u8]) -> usize {
    match node {
        Node::Leaf(leaf) => {
            let avail = &leaf.buf[skip.min(leaf.len())..];
            let n = avail.len().min(out.len());
            out[..n].copy_from_slice(&avail[..n]);
            n
        }
        Node::Branch(b) => {
            if skip < b.left_bytes {
                let n = copy_from(&b.left, skip, out);
                if n < out.len() {
                    n + copy_from(&b.right, 0, &mut out[n..])
                } else {
                    n
                }
            } else {
                copy_from(&b.right, skip - b.left_bytes, out)
            }
        }
    }
}
