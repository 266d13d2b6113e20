use std::fmt;
use std::mem;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

use crate::iter::Chars;
use crate::node::{Color, Node};
use crate::pool;
use crate::tree;
use crate::utf8;

/// Byte, character and newline totals of a rope or a subtree.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    /// Total bytes.
    pub bytes: usize,
    /// Total UTF-8 characters, counted by the lenient codec.
    pub chars: usize,
    /// Total `\n` bytes.
    pub newlines: usize,
}

impl Add for Stats {
    type Output = Stats;

    fn add(self, other: Stats) -> Stats {
        Stats {
            bytes: self.bytes + other.bytes,
            chars: self.chars + other.chars,
            newlines: self.newlines + other.newlines,
        }
    }
}

impl AddAssign for Stats {
    fn add_assign(&mut self, other: Stats) {
        *self = *self + other;
    }
}

/// A UTF-8 aware rope: a balanced binary tree of byte buffers with cached
/// byte, character and newline weights.
///
/// Positional arguments never fail; anything out of range is clamped to the
/// document. Content does not have to be valid UTF-8: the codec counts and
/// decodes malformed sequences leniently, and [`Rope::validate_utf8`] is the
/// dedicated strict check.
///
/// Structural operations ([`Rope::concat`], [`Rope::split_bytes`],
/// [`Rope::split_chars`]) consume their inputs and return new ropes.
#[derive(Default)]
pub struct Rope {
    root: Option<Box<Node>>,
    stats: Stats,
}

impl Drop for Rope {
    fn drop(&mut self) {
        if let Some(root) = self.root.take() {
            pool::free_tree(root);
        }
    }
}

impl Rope {
    /// Creates an empty rope.
    #[must_use]
    pub fn new() -> Rope {
        Rope::default()
    }

    /// Creates a rope from a byte slice. The bytes are not required to be
    /// valid UTF-8.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Rope {
        if bytes.is_empty() {
            return Rope::new();
        }
        let mut root = tree::build_text(bytes);
        root.set_color(Color::Black);
        Rope {
            stats: utf8::scan(bytes),
            root: Some(root),
        }
    }

    fn from_root(root: Option<Box<Node>>) -> Rope {
        match root {
            Some(mut root) => {
                root.set_color(Color::Black);
                let stats = root.totals();
                Rope {
                    root: Some(root),
                    stats,
                }
            }
            None => Rope::new(),
        }
    }

    pub(crate) fn root(&self) -> Option<&Node> {
        self.root.as_deref()
    }

    /// Returns the length in bytes.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.stats.bytes
    }

    /// Returns the length in characters.
    #[must_use]
    pub fn char_len(&self) -> usize {
        self.stats.chars
    }

    /// Returns true if the rope holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stats.bytes == 0
    }

    /// Returns the cached byte, character and newline totals.
    #[must_use]
    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// Returns the character at `char_pos`, or `None` past the end.
    #[must_use]
    pub fn char_at(&self, char_pos: usize) -> Option<char> {
        if char_pos >= self.stats.chars {
            return None;
        }
        let mut node = self.root.as_deref()?;
        let mut p = char_pos;
        loop {
            match node {
                Node::Branch(b) => {
                    if p < b.left_chars {
                        node = &b.left;
                    } else {
                        p -= b.left_chars;
                        node = &b.right;
                    }
                }
                Node::Leaf(leaf) => {
                    let off = utf8::char_to_byte(&leaf.buf, p);
                    return utf8::decode(&leaf.buf[off..]).map(|(ch, _)| ch);
                }
            }
        }
    }

    /// Converts a character offset to a byte offset, clamping past-the-end
    /// positions to the byte length.
    #[must_use]
    pub fn char_to_byte(&self, char_pos: usize) -> usize {
        if char_pos >= self.stats.chars {
            return self.stats.bytes;
        }
        let Some(mut node) = self.root.as_deref() else {
            return 0;
        };
        let mut p = char_pos;
        let mut bytes = 0;
        loop {
            match node {
                Node::Branch(b) => {
                    if p < b.left_chars {
                        node = &b.left;
                    } else {
                        p -= b.left_chars;
                        bytes += b.left_bytes;
                        node = &b.right;
                    }
                }
                Node::Leaf(leaf) => return bytes + utf8::char_to_byte(&leaf.buf, p),
            }
        }
    }

    /// Converts a byte offset to a character offset. Offsets interior to a
    /// multi-byte sequence resolve to the containing character.
    #[must_use]
    pub fn byte_to_char(&self, byte_pos: usize) -> usize {
        if byte_pos >= self.stats.bytes {
            return self.stats.chars;
        }
        let Some(mut node) = self.root.as_deref() else {
            return 0;
        };
        let mut p = byte_pos;
        let mut chars = 0;
        loop {
            match node {
                Node::Branch(b) => {
                    if p < b.left_bytes {
                        node = &b.left;
                    } else {
                        p -= b.left_bytes;
                        chars += b.left_chars;
                        node = &b.right;
                    }
                }
                Node::Leaf(leaf) => return chars + utf8::byte_to_char(&leaf.buf, p),
            }
        }
    }

    /// Copies bytes starting at `byte_start` into `buf`, returning how many
    /// were written (at most `buf.len()`, at most what remains).
    pub fn copy_bytes(&self, byte_start: usize, buf: &mut [u8]) -> usize {
        if byte_start >= self.stats.bytes || buf.is_empty() {
            return 0;
        }
        let want = (self.stats.bytes - byte_start).min(buf.len());
        match &self.root {
            Some(root) => tree::copy_from(root, byte_start, &mut buf[..want]),
            None => 0,
        }
    }

    /// Copies `char_len` characters starting at `char_start` into `buf`,
    /// returning the number of bytes written. A short buffer may cut the
    /// final character.
    pub fn copy_chars(&self, char_start: usize, char_len: usize, buf: &mut [u8]) -> usize {
        if char_start >= self.stats.chars {
            return 0;
        }
        let byte_start = self.char_to_byte(char_start);
        let byte_end = self.char_to_byte(char_start.saturating_add(char_len));
        let want = (byte_end - byte_start).min(buf.len());
        self.copy_bytes(byte_start, &mut buf[..want])
    }

    /// Inserts bytes at a byte offset, clamped to the document end.
    ///
    /// The offset is taken as-is: an offset interior to a multi-byte
    /// sequence splits that sequence across leaves, and later queries see
    /// it through the lenient codec. Use [`Rope::insert_chars`] for
    /// boundary-safe insertion.
    pub fn insert_bytes(&mut self, byte_pos: usize, text: &[u8]) {
        if text.is_empty() {
            return;
        }
        let at = byte_pos.min(self.stats.bytes);
        let mut root = match self.root.take() {
            Some(root) => tree::insert_rec(root, at, text),
            None => tree::build_text(text),
        };
        root.set_color(Color::Black);
        self.root = Some(root);
        self.stats += utf8::scan(text);
    }

    /// Inserts bytes at a character offset.
    pub fn insert_chars(&mut self, char_pos: usize, text: &[u8]) {
        let at = self.char_to_byte(char_pos);
        self.insert_bytes(at, text);
    }

    /// Deletes `byte_len` bytes starting at `byte_start`, clamped to the
    /// available range. Composed from two splits and a concat, so every
    /// intermediate fragment is a well-formed rope.
    pub fn delete_bytes(&mut self, byte_start: usize, byte_len: usize) {
        if byte_start >= self.stats.bytes {
            return;
        }
        let len = byte_len.min(self.stats.bytes - byte_start);
        if len == 0 {
            return;
        }
        let rope = mem::take(self);
        let (head, rest) = rope.split_bytes(byte_start);
        let (_, tail) = rest.split_bytes(len);
        *self = head.concat(tail);
    }

    /// Deletes `char_len` characters starting at `char_start`.
    pub fn delete_chars(&mut self, char_start: usize, char_len: usize) {
        if char_start >= self.stats.chars {
            return;
        }
        let byte_start = self.char_to_byte(char_start);
        let byte_end = self.char_to_byte(char_start.saturating_add(char_len));
        self.delete_bytes(byte_start, byte_end - byte_start);
    }

    /// Concatenates two ropes, consuming both. An empty side returns the
    /// other unchanged; otherwise this is a single new root above the two
    /// trees.
    #[must_use]
    pub fn concat(mut self, mut other: Rope) -> Rope {
        let Some(left) = self.root.take() else {
            return other;
        };
        let Some(right) = other.root.take() else {
            return Rope {
                root: Some(left),
                stats: self.stats,
            };
        };
        let branch = crate::node::Branch {
            left,
            right,
            left_bytes: self.stats.bytes,
            left_chars: self.stats.chars,
            left_newlines: self.stats.newlines,
            color: Color::Black,
        };
        Rope {
            root: Some(pool::alloc(Node::Branch(branch))),
            stats: self.stats + other.stats,
        }
    }

    /// Splits the rope at a byte offset, consuming it and returning the two
    /// halves. The offset is clamped; splitting at 0 or at the end yields
    /// an empty side.
    #[must_use]
    pub fn split_bytes(mut self, byte_pos: usize) -> (Rope, Rope) {
        if byte_pos == 0 {
            return (Rope::new(), self);
        }
        if byte_pos >= self.stats.bytes {
            return (self, Rope::new());
        }
        let Some(root) = self.root.take() else {
            unreachable!()
        };
        let (head, tail) = tree::split_rec(root, byte_pos);
        (Rope::from_root(head), Rope::from_root(tail))
    }

    /// Splits the rope at a character offset, which always lands on a
    /// character boundary.
    #[must_use]
    pub fn split_chars(self, char_pos: usize) -> (Rope, Rope) {
        let at = self.char_to_byte(char_pos);
        self.split_bytes(at)
    }

    /// Returns a new rope holding `len` bytes starting at `start`, clamped
    /// to the available range.
    #[must_use]
    pub fn substring_bytes(&self, start: usize, len: usize) -> Rope {
        if start >= self.stats.bytes {
            return Rope::new();
        }
        let len = len.min(self.stats.bytes - start);
        let mut buf = vec![0; len];
        let copied = self.copy_bytes(start, &mut buf);
        Rope::from_bytes(&buf[..copied])
    }

    /// Returns a new rope holding `len` characters starting at `start`.
    #[must_use]
    pub fn substring_chars(&self, start: usize, len: usize) -> Rope {
        if start >= self.stats.chars {
            return Rope::new();
        }
        let byte_start = self.char_to_byte(start);
        let byte_end = self.char_to_byte(start.saturating_add(len));
        self.substring_bytes(byte_start, byte_end - byte_start)
    }

    /// Flattens the rope into a freshly allocated byte vector.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.stats.bytes);
        if let Some(root) = &self.root {
            tree::collect_bytes(root, &mut out);
        }
        out
    }

    /// Strictly validates that the content is well-formed UTF-8.
    #[must_use]
    pub fn validate_utf8(&self) -> bool {
        simdutf8::basic::from_utf8(&self.to_bytes()).is_ok()
    }

    /// Returns an iterator over the characters, starting at the front.
    #[must_use]
    pub fn chars(&self) -> Chars<'_> {
        Chars::new(self, 0)
    }

    /// Returns an iterator positioned at `char_pos` (clamped to the end).
    #[must_use]
    pub fn chars_at(&self, char_pos: usize) -> Chars<'_> {
        Chars::new(self, char_pos)
    }

    /// Returns the number of lines: newline count plus one.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.stats.newlines + 1
    }

    /// Returns the character offset where line `line` starts (the position
    /// right after its preceding newline). Lines past the last yield the
    /// character length.
    #[must_use]
    pub fn line_to_char(&self, line: usize) -> usize {
        if line == 0 {
            return 0;
        }
        if line > self.stats.newlines {
            return self.stats.chars;
        }
        let Some(mut node) = self.root.as_deref() else {
            return 0;
        };
        let mut k = line;
        let mut chars = 0;
        loop {
            match node {
                Node::Branch(b) => {
                    if k <= b.left_newlines {
                        node = &b.left;
                    } else {
                        k -= b.left_newlines;
                        chars += b.left_chars;
                        node = &b.right;
                    }
                }
                Node::Leaf(leaf) => {
                    let Some(pos) = memchr::memchr_iter(b'\n', &leaf.buf).nth(k - 1) else {
                        unreachable!()
                    };
                    return chars + utf8::count_chars(&leaf.buf[..pos + 1]);
                }
            }
        }
    }

    /// Returns the byte offset where line `line` starts.
    #[must_use]
    pub fn line_to_byte(&self, line: usize) -> usize {
        if line == 0 {
            return 0;
        }
        if line > self.stats.newlines {
            return self.stats.bytes;
        }
        let Some(mut node) = self.root.as_deref() else {
            return 0;
        };
        let mut k = line;
        let mut bytes = 0;
        loop {
            match node {
                Node::Branch(b) => {
                    if k <= b.left_newlines {
                        node = &b.left;
                    } else {
                        k -= b.left_newlines;
                        bytes += b.left_bytes;
                        node = &b.right;
                    }
                }
                Node::Leaf(leaf) => {
                    let Some(pos) = memchr::memchr_iter(b'\n', &leaf.buf).nth(k - 1) else {
                        unreachable!()
                    };
                    return bytes + pos + 1;
                }
            }
        }
    }

    /// Returns the line containing the character at `char_pos`: the number
    /// of newlines among the first `char_pos` characters.
    #[must_use]
    pub fn char_to_line(&self, char_pos: usize) -> usize {
        let Some(mut node) = self.root.as_deref() else {
            return 0;
        };
        let mut p = char_pos.min(self.stats.chars);
        let mut newlines = 0;
        loop {
            match node {
                Node::Branch(b) => {
                    if p <= b.left_chars {
                        node = &b.left;
                    } else {
                        p -= b.left_chars;
                        newlines += b.left_newlines;
                        node = &b.right;
                    }
                }
                Node::Leaf(leaf) => {
                    let off = utf8::char_to_byte(&leaf.buf, p);
                    return newlines + utf8::count_newlines(&leaf.buf[..off]);
                }
            }
        }
    }

    /// Returns the line containing the byte at `byte_pos`.
    #[must_use]
    pub fn byte_to_line(&self, byte_pos: usize) -> usize {
        let Some(mut node) = self.root.as_deref() else {
            return 0;
        };
        let mut p = byte_pos.min(self.stats.bytes);
        let mut newlines = 0;
        loop {
            match node {
                Node::Branch(b) => {
                    if p <= b.left_bytes {
                        node = &b.left;
                    } else {
                        p -= b.left_bytes;
                        newlines += b.left_newlines;
                        node = &b.right;
                    }
                }
                Node::Leaf(leaf) => {
                    return newlines + utf8::count_newlines(&leaf.buf[..p.min(leaf.len())]);
                }
            }
        }
    }
}

impl fmt::Display for Rope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.to_bytes()))
    }
}

impl fmt::Debug for Rope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rope")
            .field("bytes", &self.stats.bytes)
            .field("chars", &self.stats.chars)
            .field("newlines", &self.stats.newlines)
            .finish()
    }
}

impl From<&str> for Rope {
    fn from(s: &str) -> Rope {
        Rope::from_bytes(s.as_bytes())
    }
}

impl From<String> for Rope {
    fn from(s: String) -> Rope {
        Rope::from_bytes(s.as_bytes())
    }
}

impl FromStr for Rope {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Rope, Self::Err> {
        Ok(Rope::from(s))
    }
}

#[cfg(test)]
impl Rope {
    /// Checks every structural invariant the tree is supposed to keep:
    /// leaf stats match their bytes, every branch's cached weights match
    /// its left subtree, the root totals match the handle, no red node has
    /// a red child, and the root is black.
    pub(crate) fn is_valid(&self) {
        fn verify_stats(node: &Node) -> Stats {
            match node {
                Node::Leaf(leaf) => {
                    let fresh = utf8::scan(&leaf.buf);
                    assert_eq!(leaf.chars, fresh.chars);
                    assert_eq!(leaf.newlines, fresh.newlines);
                    fresh
                }
                Node::Branch(b) => {
                    let left = verify_stats(&b.left);
                    let right = verify_stats(&b.right);
                    assert_eq!(b.left_bytes, left.bytes);
                    assert_eq!(b.left_chars, left.chars);
                    assert_eq!(b.left_newlines, left.newlines);
                    left + right
                }
            }
        }

        fn verify_children_color(node: &Node) {
            if let Node::Branch(b) = node {
                if b.color == Color::Red {
                    assert!(
                        b.left.color() != Color::Red && b.right.color() != Color::Red,
                        "red node has red children"
                    );
                }
                verify_children_color(&b.left);
                verify_children_color(&b.right);
            }
        }

        match &self.root {
            Some(root) => {
                assert_eq!(root.color(), Color::Black); // root is black
                verify_children_color(root);
                assert_eq!(verify_stats(root), self.stats);
            }
            None => assert_eq!(self.stats, Stats::default()),
        }
    }

    pub(crate) fn height(&self) -> usize {
        fn depth(node: &Node) -> usize {
            match node {
                Node::Leaf(_) => 1,
                Node::Branch(b) => 1 + depth(&b.left).max(depth(&b.right)),
            }
        }
        self.root.as_deref().map_or(0, depth)
    }
}
