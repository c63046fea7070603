//! # Messages
//!
//! Two message shapes live here:
//!
//! - [`InternalMessage`] - a value transfer between accounts, encoded
//!   as a cell. This is what a wallet emits for a structured transfer
//!   and what callers pre-encode for the raw variant (where the wallet
//!   treats it as an opaque reference and only attaches a flags byte).
//! - [`OutboundMessage`] - the per-message entry of a transaction
//!   report, as consumed back from the execution environment. The
//!   serialized report carries destination, value, bounce, and flags;
//!   the payload travels alongside in-process but is not part of the
//!   serialized form.
//!
//! ## Send flags
//!
//! The flags byte is a bitmask forwarded verbatim to the environment,
//! which is the actual enforcement point. Bit 0 pays the forwarding fee
//! out of the message value instead of the sender's remaining balance;
//! bit 1 makes the send best-effort (a failure of this particular send
//! does not bounce the whole transaction). The common value 3 sets both.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::address::{Address, AddressError};
use crate::cell::{Cell, CellBuilder, CellError};

/// Flag bit 0: pay the forwarding fee out of the message value itself.
pub const FLAG_FEE_FROM_VALUE: u8 = 1;

/// Flag bit 1: best-effort send; ignore this send's failure instead of
/// bouncing the whole transaction.
pub const FLAG_IGNORE_SEND_ERRORS: u8 = 2;

/// Errors from the internal-message codec.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MessageError {
    /// The message cell did not contain a whole message.
    #[error("message truncated: {0}")]
    Truncated(#[from] CellError),

    /// The destination field could not be decoded.
    #[error("bad destination: {0}")]
    BadDestination(#[from] AddressError),

    /// Content remained after the last field. A message cell carries
    /// one message and nothing else.
    #[error("trailing content after message: {remaining_bits} bits, {remaining_refs} refs")]
    TrailingContent {
        remaining_bits: usize,
        remaining_refs: usize,
    },
}

/// A value-transfer message between accounts.
///
/// The cell layout, front to back: bounce flag (1 bit), destination
/// (8 + 256 bits), value in nanolumen (128 bits), payload-present flag
/// (1 bit) and, when set, the payload as the first reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalMessage {
    /// Where the value goes.
    pub destination: Address,
    /// Return funds to the sender if delivery fails.
    pub bounce: bool,
    /// Amount in nanolumen.
    pub value: u128,
    /// Opaque payload forwarded to the destination, if any.
    pub payload: Option<Arc<Cell>>,
}

impl InternalMessage {
    /// Encodes the message into a cell.
    pub fn encode(&self) -> Result<Cell, CellError> {
        let mut b = CellBuilder::new();
        b.store_bit(self.bounce)?;
        self.destination.store(&mut b)?;
        b.store_u128(self.value, 128)?;
        match &self.payload {
            Some(payload) => {
                b.store_bit(true)?;
                b.store_reference(Arc::clone(payload))?;
            }
            None => {
                b.store_bit(false)?;
            }
        }
        Ok(b.build())
    }

    /// Decodes a message from a cell, rejecting trailing content.
    pub fn decode(cell: &Cell) -> Result<Self, MessageError> {
        let mut slice = cell.as_slice();
        let bounce = slice.load_bit()?;
        let destination = Address::load(&mut slice)?;
        let value = slice.load_u128(128)?;
        let payload = if slice.load_bit()? {
            Some(slice.load_reference()?)
        } else {
            None
        };
        if !slice.is_empty() {
            return Err(MessageError::TrailingContent {
                remaining_bits: slice.remaining_bits(),
                remaining_refs: slice.remaining_refs(),
            });
        }
        Ok(Self {
            destination,
            bounce,
            value,
            payload,
        })
    }
}

/// One outbound message of a transaction report.
///
/// Produced by the dispatch engine, settled and echoed back by the
/// execution environment. Order matters: entry `i` of a report
/// corresponds to the `i`-th transfer requested in the call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Where the value went.
    pub destination: Address,
    /// Amount in nanolumen.
    pub value: u128,
    /// Bounce policy the message carried.
    pub bounce: bool,
    /// Send flags forwarded to the environment.
    pub flags: u8,
    /// Payload forwarded verbatim. In-process only; the serialized
    /// report identifies messages by the fields above.
    #[serde(skip)]
    pub payload: Option<Arc<Cell>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::new(0, [byte; 32])
    }

    #[test]
    fn encode_decode_roundtrip() {
        let msg = InternalMessage {
            destination: addr(0x77),
            bounce: false,
            value: 1_000_000_000,
            payload: None,
        };
        let cell = msg.encode().unwrap();
        assert_eq!(InternalMessage::decode(&cell).unwrap(), msg);
    }

    #[test]
    fn roundtrip_with_payload() {
        let mut p = CellBuilder::new();
        p.store_uint(0xCAFE, 16).unwrap();
        let payload = Arc::new(p.build());

        let msg = InternalMessage {
            destination: addr(0x01),
            bounce: true,
            value: 42,
            payload: Some(Arc::clone(&payload)),
        };
        let decoded = InternalMessage::decode(&msg.encode().unwrap()).unwrap();
        assert_eq!(
            decoded.payload.unwrap().repr_hash(),
            payload.repr_hash(),
            "payload must survive the roundtrip unmodified"
        );
    }

    #[test]
    fn empty_cell_is_not_a_message() {
        let err = InternalMessage::decode(&Cell::empty()).unwrap_err();
        assert!(matches!(err, MessageError::Truncated(_)));
    }

    #[test]
    fn trailing_bits_rejected() {
        let msg = InternalMessage {
            destination: addr(0x02),
            bounce: false,
            value: 1,
            payload: None,
        };
        let cell = msg.encode().unwrap();

        // Rebuild with one junk bit appended.
        let mut b = CellBuilder::new();
        b.store_cell(&cell).unwrap();
        b.store_bit(true).unwrap();
        let padded = b.build();

        assert!(matches!(
            InternalMessage::decode(&padded),
            Err(MessageError::TrailingContent {
                remaining_bits: 1,
                ..
            })
        ));
    }

    #[test]
    fn outbound_report_serializes_without_payload() {
        let mut p = CellBuilder::new();
        p.store_uint(1, 8).unwrap();
        let out = OutboundMessage {
            destination: addr(0x03),
            value: 5,
            bounce: false,
            flags: 3,
            payload: Some(Arc::new(p.build())),
        };
        let json = serde_json::to_string(&out).unwrap();
        assert!(!json.contains("payload"));
        let recovered: OutboundMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(recovered.destination, out.destination);
        assert_eq!(recovered.value, 5);
        assert!(recovered.payload.is_none());
    }
}
