//! Cell construction.
//!
//! [`CellBuilder`] appends bits and references, enforcing the per-cell
//! capacity limits (1023 bits, 4 references) at write time. `build()`
//! is infallible because every invariant was already checked on the way
//! in.

use std::sync::Arc;

use super::{Cell, CellError};
use crate::config::{MAX_CELL_BITS, MAX_CELL_REFS};

/// Incremental writer for a single cell.
///
/// Bits are packed MSB-first. Multi-bit integers are stored big-endian
/// at the bit level: the most significant of the `bits` requested goes
/// first. This matches how [`CellSlice`](super::CellSlice) reads them
/// back and is the only bit order used anywhere in the protocol.
#[derive(Debug, Default)]
pub struct CellBuilder {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<Arc<Cell>>,
}

impl CellBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bits written so far.
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// References attached so far.
    pub fn reference_count(&self) -> usize {
        self.refs.len()
    }

    /// Appends a single bit.
    pub fn store_bit(&mut self, bit: bool) -> Result<&mut Self, CellError> {
        if self.bit_len + 1 > MAX_CELL_BITS {
            return Err(CellError::BitOverflow {
                capacity: MAX_CELL_BITS,
                attempted: self.bit_len + 1,
            });
        }
        if self.bit_len % 8 == 0 {
            self.data.push(0);
        }
        if bit {
            let last = self.data.len() - 1;
            self.data[last] |= 1 << (7 - self.bit_len % 8);
        }
        self.bit_len += 1;
        Ok(self)
    }

    /// Appends `bits` bits of an unsigned integer, most significant
    /// first. `bits` may be 0..=64; the value must fit the width.
    pub fn store_uint(&mut self, value: u64, bits: usize) -> Result<&mut Self, CellError> {
        if bits > 64 {
            return Err(CellError::InvalidBitCount { bits, max: 64 });
        }
        self.store_u128(value as u128, bits)
    }

    /// Appends `bits` bits of a 128-bit unsigned integer, most
    /// significant first. `bits` may be 0..=128.
    pub fn store_u128(&mut self, value: u128, bits: usize) -> Result<&mut Self, CellError> {
        if bits > 128 {
            return Err(CellError::InvalidBitCount { bits, max: 128 });
        }
        if bits < 128 && value >> bits != 0 {
            return Err(CellError::ValueOutOfRange { value, bits });
        }
        if self.bit_len + bits > MAX_CELL_BITS {
            return Err(CellError::BitOverflow {
                capacity: MAX_CELL_BITS,
                attempted: self.bit_len + bits,
            });
        }
        for i in (0..bits).rev() {
            self.store_bit((value >> i) & 1 == 1)?;
        }
        Ok(self)
    }

    /// Appends the first `bits` bits of `bytes`, MSB-first.
    ///
    /// Used for fixed-width byte fields (public keys, account ids) and
    /// for splicing one cell's data into another.
    pub fn store_raw(&mut self, bytes: &[u8], bits: usize) -> Result<&mut Self, CellError> {
        if bits > bytes.len() * 8 {
            return Err(CellError::InvalidBitCount {
                bits,
                max: bytes.len() * 8,
            });
        }
        if self.bit_len + bits > MAX_CELL_BITS {
            return Err(CellError::BitOverflow {
                capacity: MAX_CELL_BITS,
                attempted: self.bit_len + bits,
            });
        }
        for i in 0..bits {
            let bit = (bytes[i / 8] >> (7 - i % 8)) & 1 == 1;
            self.store_bit(bit)?;
        }
        Ok(self)
    }

    /// Attaches a child cell reference.
    pub fn store_reference(&mut self, cell: Arc<Cell>) -> Result<&mut Self, CellError> {
        if self.refs.len() + 1 > MAX_CELL_REFS {
            return Err(CellError::RefOverflow {
                capacity: MAX_CELL_REFS,
            });
        }
        self.refs.push(cell);
        Ok(self)
    }

    /// Splices another cell inline: appends its data bits and attaches
    /// its references. The envelope codec uses this to place a call
    /// body after the fixed header fields.
    pub fn store_cell(&mut self, cell: &Cell) -> Result<&mut Self, CellError> {
        if self.refs.len() + cell.reference_count() > MAX_CELL_REFS {
            return Err(CellError::RefOverflow {
                capacity: MAX_CELL_REFS,
            });
        }
        self.store_raw(cell.data(), cell.bit_len())?;
        for child in cell.references() {
            self.refs.push(Arc::clone(child));
        }
        Ok(self)
    }

    /// Finalizes the cell. Infallible: capacity was enforced on append.
    pub fn build(self) -> Cell {
        Cell::assemble(self.data, self.bit_len, self.refs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_pack_msb_first() {
        let mut b = CellBuilder::new();
        b.store_bit(true).unwrap();
        b.store_bit(false).unwrap();
        b.store_bit(true).unwrap();
        let cell = b.build();
        assert_eq!(cell.bit_len(), 3);
        assert_eq!(cell.data(), &[0b1010_0000]);
    }

    #[test]
    fn uint_roundtrip() {
        let mut b = CellBuilder::new();
        b.store_uint(0xDEAD_BEEF, 32).unwrap();
        let cell = b.build();
        assert_eq!(cell.as_slice().load_uint(32).unwrap(), 0xDEAD_BEEF);
    }

    #[test]
    fn u128_roundtrip() {
        let value = 123_456_789_000_000_000_000_u128;
        let mut b = CellBuilder::new();
        b.store_u128(value, 128).unwrap();
        let cell = b.build();
        assert_eq!(cell.as_slice().load_u128(128).unwrap(), value);
    }

    #[test]
    fn value_must_fit_width() {
        let mut b = CellBuilder::new();
        let err = b.store_uint(256, 8).unwrap_err();
        assert!(matches!(err, CellError::ValueOutOfRange { bits: 8, .. }));
    }

    #[test]
    fn bit_capacity_enforced() {
        let mut b = CellBuilder::new();
        b.store_raw(&[0xFF; 127], 1016).unwrap();
        b.store_uint(0, 7).unwrap(); // exactly 1023
        let err = b.store_bit(true).unwrap_err();
        assert!(matches!(err, CellError::BitOverflow { .. }));
    }

    #[test]
    fn ref_capacity_enforced() {
        let mut b = CellBuilder::new();
        for _ in 0..4 {
            b.store_reference(Arc::new(Cell::empty())).unwrap();
        }
        let err = b.store_reference(Arc::new(Cell::empty())).unwrap_err();
        assert!(matches!(err, CellError::RefOverflow { capacity: 4 }));
    }

    #[test]
    fn store_cell_splices_bits_and_refs() {
        let mut inner = CellBuilder::new();
        inner.store_uint(0xAB, 8).unwrap();
        inner.store_reference(Arc::new(Cell::empty())).unwrap();
        let inner = inner.build();

        let mut outer = CellBuilder::new();
        outer.store_uint(0x1, 4).unwrap();
        outer.store_cell(&inner).unwrap();
        let cell = outer.build();

        assert_eq!(cell.bit_len(), 12);
        assert_eq!(cell.reference_count(), 1);
        let mut slice = cell.as_slice();
        assert_eq!(slice.load_uint(4).unwrap(), 0x1);
        assert_eq!(slice.load_uint(8).unwrap(), 0xAB);
    }

    #[test]
    fn store_raw_partial_byte() {
        let mut b = CellBuilder::new();
        b.store_raw(&[0b1100_0000], 2).unwrap();
        let cell = b.build();
        assert_eq!(cell.bit_len(), 2);
        let mut slice = cell.as_slice();
        assert!(slice.load_bit().unwrap());
        assert!(slice.load_bit().unwrap());
    }
}
