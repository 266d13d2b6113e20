use crate::rope::Stats;
use crate::utf8;

/// Target leaf size; new leaf buffers reserve at least this much.
pub(crate) const NODE_CAPACITY: usize = 1024;
/// Upper bound on leaf size; longer text is chunked before it becomes leaves.
pub(crate) const SPLIT_THRESHOLD: usize = 2048;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub(crate) enum Color {
    Red,
    #[default]
    Black,
}

/// A tree node: terminal byte storage or an internal two-way fork caching
/// its left subtree's totals.
pub(crate) enum Node {
    Leaf(Leaf),
    Branch(Branch),
}

#[derive(Default)]
pub(crate) struct Leaf {
    pub buf: Vec<u8>,
    pub chars: usize,
    pub newlines: usize,
    pub color: Color,
}

pub(crate) struct Branch {
    pub left: Box<Node>,
    pub right: Box<Node>,
    pub left_bytes: usize,
    pub left_chars: usize,
    pub left_newlines: usize,
    pub color: Color,
}

impl Leaf {
    /// Builds a leaf from a byte slice, over-allocating to the node
    /// capacity. New leaves are born red.
    pub(crate) fn new(bytes: &[u8]) -> Leaf {
        let mut buf = Vec::with_capacity(NODE_CAPACITY.max(bytes.len()));
        buf.extend_from_slice(bytes);
        Leaf {
            chars: utf8::count_chars(&buf),
            newlines: utf8::count_newlines(&buf),
            buf,
            color: Color::Red,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.buf.len()
    }
}

impl Branch {
    /// Joins two subtrees, computing the left-side weights from the left
    /// child's authoritative totals.
    pub(crate) fn new(left: Box<Node>, right: Box<Node>, color: Color) -> Branch {
        let sum = left.totals();
        Branch {
            left,
            right,
            left_bytes: sum.bytes,
            left_chars: sum.chars,
            left_newlines: sum.newlines,
            color,
        }
    }

    /// Recomputes the cached weights after the left child changed shape.
    pub(crate) fn refresh_weights(&mut self) {
        let sum = self.left.totals();
        self.left_bytes = sum.bytes;
        self.left_chars = sum.chars;
        self.left_newlines = sum.newlines;
    }
}

impl Node {
    pub(crate) fn is_branch(&self) -> bool {
        matches!(self, Node::Branch(_))
    }

    pub(crate) fn color(&self) -> Color {
        match self {
            Node::Leaf(leaf) => leaf.color,
            Node::Branch(branch) => branch.color,
        }
    }

    pub(crate) fn set_color(&mut self, color: Color) {
        match self {
            Node::Leaf(leaf) => leaf.color = color,
            Node::Branch(branch) => branch.color = color,
        }
    }

    /// Recursive totals of the subtree. Walks only the right spine; every
    /// left subtree is covered by a cached weight.
    pub(crate) fn totals(&self) -> Stats {
        let mut node = self;
        let mut sum = Stats::default();
        loop {
            match node {
                Node::Leaf(leaf) => {
                    sum.bytes += leaf.len();
                    sum.chars += leaf.chars;
                    sum.newlines += leaf.newlines;
                    return sum;
                }
                Node::Branch(branch) => {
                    sum.bytes += branch.left_bytes;
                    sum.chars += branch.left_chars;
                    sum.newlines += branch.left_newlines;
                    node = &branch.right;
                }
            }
        }
    }
}
