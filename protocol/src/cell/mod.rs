//! # The Cell Data Model
//!
//! A [`Cell`] is the unit of data in the Lumen protocol: up to 1023
//! bits of payload plus up to four references to child cells. Every
//! wire structure (call envelopes, messages, wallet state init) is a
//! tree of cells, and every decoder is a cursor over one.
//!
//! Cells are immutable once built and shared via `Arc`. Construction
//! goes through [`CellBuilder`], which enforces the capacity limits at
//! write time so a finished cell is valid by construction. Reading goes
//! through [`CellSlice`], a greedy bit-and-reference cursor that fails
//! with typed underflow errors instead of panicking -- malformed input
//! is an error value, never a crash.
//!
//! ## Representation hash
//!
//! Each cell has a *representation hash*: SHA-256 over its bit length,
//! reference count, zero-padded data bytes, and the representation
//! hashes of its children. Two cell trees are wire-equal iff their repr
//! hashes match. The repr hash of an unsigned call envelope is the
//! digest the owner signs, and the repr hash of a state-init cell is
//! the account address.

mod builder;
mod slice;

pub use builder::CellBuilder;
pub use slice::CellSlice;

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::config::{MAX_CELL_BITS, MAX_CELL_REFS};
use crate::crypto::hash::sha256_array;

/// Errors raised by cell construction and cursor reads.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CellError {
    /// Appending would exceed the 1023-bit data capacity of one cell.
    #[error("cell data overflow: capacity {capacity} bits, would hold {attempted}")]
    BitOverflow {
        /// Capacity of a single cell in bits.
        capacity: usize,
        /// Total bits the cell would hold after the append.
        attempted: usize,
    },

    /// Appending would exceed the four-reference capacity of one cell.
    #[error("cell reference overflow: capacity {capacity} references")]
    RefOverflow {
        /// Capacity of a single cell in references.
        capacity: usize,
    },

    /// The value does not fit in the requested bit width.
    #[error("value {value} does not fit in {bits} bits")]
    ValueOutOfRange {
        /// The value the caller tried to store.
        value: u128,
        /// The requested field width.
        bits: usize,
    },

    /// The requested field width exceeds what the operation supports.
    #[error("invalid bit count {bits}: this operation supports at most {max} bits")]
    InvalidBitCount {
        /// The requested field width.
        bits: usize,
        /// Maximum width the operation supports.
        max: usize,
    },

    /// The cursor ran out of data bits mid-field.
    #[error("cell underflow: requested {requested} bits, {remaining} remaining")]
    Underflow {
        /// Bits the caller asked for.
        requested: usize,
        /// Bits left under the cursor.
        remaining: usize,
    },

    /// The cursor ran out of references.
    #[error("cell reference underflow: no references remaining")]
    RefUnderflow,
}

/// An immutable cell: data bits plus child references.
///
/// Built via [`CellBuilder`], read via [`CellSlice`]. The repr hash is
/// computed once at construction; everything downstream (signing,
/// address derivation, payload identity checks) compares hashes rather
/// than walking trees.
#[derive(Clone, PartialEq, Eq)]
pub struct Cell {
    /// Data bits, packed MSB-first, zero-padded to whole bytes.
    data: Vec<u8>,
    /// Number of meaningful bits in `data`.
    bit_len: usize,
    /// Child cells, in reference order.
    refs: Vec<Arc<Cell>>,
    /// Representation hash, fixed at construction.
    hash: [u8; 32],
}

impl Cell {
    /// The empty cell: zero bits, zero references.
    pub fn empty() -> Self {
        Self::assemble(Vec::new(), 0, Vec::new())
    }

    /// Internal constructor used by [`CellBuilder::build`]. Capacity
    /// invariants must already hold.
    pub(crate) fn assemble(data: Vec<u8>, bit_len: usize, refs: Vec<Arc<Cell>>) -> Self {
        debug_assert!(bit_len <= MAX_CELL_BITS);
        debug_assert!(refs.len() <= MAX_CELL_REFS);
        debug_assert_eq!(data.len(), bit_len.div_ceil(8));

        let hash = Self::compute_hash(&data, bit_len, &refs);
        Self {
            data,
            bit_len,
            refs,
            hash,
        }
    }

    fn compute_hash(data: &[u8], bit_len: usize, refs: &[Arc<Cell>]) -> [u8; 32] {
        // Descriptor (bit length + ref count), padded data, then child
        // hashes. Trailing bits past `bit_len` are zero by construction,
        // so identical logical content always hashes identically.
        let mut preimage = Vec::with_capacity(3 + data.len() + refs.len() * 32);
        preimage.extend_from_slice(&(bit_len as u16).to_be_bytes());
        preimage.push(refs.len() as u8);
        preimage.extend_from_slice(data);
        for child in refs {
            preimage.extend_from_slice(child.repr_hash());
        }
        sha256_array(&preimage)
    }

    /// Number of meaningful data bits.
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// Packed data bytes (MSB-first, zero-padded).
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Number of child references.
    pub fn reference_count(&self) -> usize {
        self.refs.len()
    }

    /// Child cells in reference order.
    pub fn references(&self) -> &[Arc<Cell>] {
        &self.refs
    }

    /// The representation hash. Wire identity of the whole subtree.
    pub fn repr_hash(&self) -> &[u8; 32] {
        &self.hash
    }

    /// Returns a cursor positioned at the start of this cell.
    pub fn as_slice(&self) -> CellSlice<'_> {
        CellSlice::new(self)
    }

    /// Reads the bit at `index`. Caller guarantees `index < bit_len`.
    pub(crate) fn bit(&self, index: usize) -> bool {
        debug_assert!(index < self.bit_len);
        let byte = self.data[index / 8];
        (byte >> (7 - index % 8)) & 1 == 1
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cell({} bits, {} refs, hash={})",
            self.bit_len,
            self.refs.len(),
            &hex::encode(self.hash)[..16]
        )
    }
}
