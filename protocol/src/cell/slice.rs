//! Cursor-based cell reading.
//!
//! [`CellSlice`] is the greedy reader every protocol decoder is built
//! on: it tracks a bit position and a reference position over one cell
//! and hands out fields front to back. There is deliberately no peek or
//! rewind; decoders consume the body in a single pass and report typed
//! underflow when the data runs out mid-field. Whether leftover content
//! after a decode is an error is the caller's policy, which is exactly
//! the hook the variable-arity transfer decoder needs.

use std::sync::Arc;

use super::{Cell, CellError};

/// A read cursor over one cell's bits and references.
#[derive(Debug, Clone)]
pub struct CellSlice<'a> {
    cell: &'a Cell,
    bit_pos: usize,
    ref_pos: usize,
}

impl<'a> CellSlice<'a> {
    pub(crate) fn new(cell: &'a Cell) -> Self {
        Self {
            cell,
            bit_pos: 0,
            ref_pos: 0,
        }
    }

    /// Data bits not yet consumed.
    pub fn remaining_bits(&self) -> usize {
        self.cell.bit_len() - self.bit_pos
    }

    /// References not yet consumed.
    pub fn remaining_refs(&self) -> usize {
        self.cell.reference_count() - self.ref_pos
    }

    /// True when both bits and references are fully consumed.
    pub fn is_empty(&self) -> bool {
        self.remaining_bits() == 0 && self.remaining_refs() == 0
    }

    /// Reads one bit.
    pub fn load_bit(&mut self) -> Result<bool, CellError> {
        if self.remaining_bits() < 1 {
            return Err(CellError::Underflow {
                requested: 1,
                remaining: 0,
            });
        }
        let bit = self.cell.bit(self.bit_pos);
        self.bit_pos += 1;
        Ok(bit)
    }

    /// Reads `bits` bits as an unsigned integer, most significant
    /// first. `bits` may be 0..=64.
    pub fn load_uint(&mut self, bits: usize) -> Result<u64, CellError> {
        if bits > 64 {
            return Err(CellError::InvalidBitCount { bits, max: 64 });
        }
        Ok(self.load_u128(bits)? as u64)
    }

    /// Reads `bits` bits as a 128-bit unsigned integer, most
    /// significant first. `bits` may be 0..=128.
    pub fn load_u128(&mut self, bits: usize) -> Result<u128, CellError> {
        if bits > 128 {
            return Err(CellError::InvalidBitCount { bits, max: 128 });
        }
        if self.remaining_bits() < bits {
            return Err(CellError::Underflow {
                requested: bits,
                remaining: self.remaining_bits(),
            });
        }
        let mut value: u128 = 0;
        for _ in 0..bits {
            value = (value << 1) | u128::from(self.cell.bit(self.bit_pos));
            self.bit_pos += 1;
        }
        Ok(value)
    }

    /// Reads `bits` bits into a byte vector, MSB-aligned and
    /// zero-padded to whole bytes. Used for fixed-width byte fields
    /// (public keys, account ids).
    pub fn load_raw(&mut self, bits: usize) -> Result<Vec<u8>, CellError> {
        if self.remaining_bits() < bits {
            return Err(CellError::Underflow {
                requested: bits,
                remaining: self.remaining_bits(),
            });
        }
        let mut out = vec![0u8; bits.div_ceil(8)];
        for i in 0..bits {
            if self.cell.bit(self.bit_pos) {
                out[i / 8] |= 1 << (7 - i % 8);
            }
            self.bit_pos += 1;
        }
        Ok(out)
    }

    /// Takes the next child reference.
    pub fn load_reference(&mut self) -> Result<Arc<Cell>, CellError> {
        if self.remaining_refs() == 0 {
            return Err(CellError::RefUnderflow);
        }
        let child = Arc::clone(&self.cell.references()[self.ref_pos]);
        self.ref_pos += 1;
        Ok(child)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellBuilder;

    #[test]
    fn sequential_fields_read_back() {
        let mut b = CellBuilder::new();
        b.store_bit(true).unwrap();
        b.store_uint(0x42, 8).unwrap();
        b.store_u128(1_000_000_000, 128).unwrap();
        let cell = b.build();

        let mut slice = cell.as_slice();
        assert!(slice.load_bit().unwrap());
        assert_eq!(slice.load_uint(8).unwrap(), 0x42);
        assert_eq!(slice.load_u128(128).unwrap(), 1_000_000_000);
        assert!(slice.is_empty());
    }

    #[test]
    fn underflow_mid_field() {
        let mut b = CellBuilder::new();
        b.store_uint(0b101, 3).unwrap();
        let cell = b.build();

        let mut slice = cell.as_slice();
        let err = slice.load_uint(8).unwrap_err();
        assert_eq!(
            err,
            CellError::Underflow {
                requested: 8,
                remaining: 3
            }
        );
        // A failed load consumes nothing.
        assert_eq!(slice.remaining_bits(), 3);
        assert_eq!(slice.load_uint(3).unwrap(), 0b101);
    }

    #[test]
    fn reference_order_is_preserved() {
        let mut first = CellBuilder::new();
        first.store_uint(1, 8).unwrap();
        let mut second = CellBuilder::new();
        second.store_uint(2, 8).unwrap();

        let mut b = CellBuilder::new();
        b.store_reference(Arc::new(first.build())).unwrap();
        b.store_reference(Arc::new(second.build())).unwrap();
        let cell = b.build();

        let mut slice = cell.as_slice();
        assert_eq!(slice.remaining_refs(), 2);
        let r1 = slice.load_reference().unwrap();
        let r2 = slice.load_reference().unwrap();
        assert_eq!(r1.as_slice().load_uint(8).unwrap(), 1);
        assert_eq!(r2.as_slice().load_uint(8).unwrap(), 2);
        assert!(matches!(
            slice.load_reference(),
            Err(CellError::RefUnderflow)
        ));
    }

    #[test]
    fn load_raw_roundtrip() {
        let key = [0xA5u8; 32];
        let mut b = CellBuilder::new();
        b.store_raw(&key, 256).unwrap();
        let cell = b.build();

        let mut slice = cell.as_slice();
        assert_eq!(slice.load_raw(256).unwrap(), key.to_vec());
        assert!(slice.is_empty());
    }

    #[test]
    fn load_raw_unaligned() {
        // 12 bits starting after a 1-bit prefix: exercises the bit-by-bit
        // repacking path.
        let mut b = CellBuilder::new();
        b.store_bit(false).unwrap();
        b.store_uint(0xFFF, 12).unwrap();
        let cell = b.build();

        let mut slice = cell.as_slice();
        slice.load_bit().unwrap();
        assert_eq!(slice.load_raw(12).unwrap(), vec![0xFF, 0xF0]);
    }

    #[test]
    fn empty_cell_slice_is_empty() {
        let cell = Cell::empty();
        let slice = cell.as_slice();
        assert!(slice.is_empty());
        assert_eq!(slice.remaining_bits(), 0);
        assert_eq!(slice.remaining_refs(), 0);
    }
}
