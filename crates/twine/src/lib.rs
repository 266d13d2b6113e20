//! This crate contains a UTF-8 aware rope: a balanced binary-tree text
//! buffer with byte-indexed, character-indexed and line-indexed access.
//!
//! Branches cache their left subtree's byte, character and newline totals,
//! so positional queries, insertion and deletion all run in logarithmic
//! time on documents of any size. Content is stored as raw bytes and
//! interpreted through a lenient UTF-8 codec; see [Rope] for the contract.

#![warn(missing_docs)]

/// The lenient UTF-8 codec: lead-byte classification and decoding.
pub mod utf8;

mod iter;
mod node;
mod pool;
mod rb;
mod rope;
mod tree;

pub use iter::Chars;
pub use rope::{Rope, Stats};
