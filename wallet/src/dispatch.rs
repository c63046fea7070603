//! # The Dispatch Engine
//!
//! An authorized call lands here with its selector, body, and the
//! wallet's spendable balance, and leaves as zero or more outbound
//! messages. Two entry points share the engine:
//!
//! - the **structured** transfer: one fixed-shape request per call, the
//!   engine packs the outbound message itself;
//! - the **raw** transfer: one selector, no length field, and anywhere
//!   from zero to [`MAX_RAW_TRANSFERS`] `(flags, message)` pairs read
//!   greedily off the body cursor. The messages are pre-encoded by the
//!   caller; the engine attaches a flags byte each and forwards them.
//!
//! ## The silent no-op
//!
//! A transfer whose value exceeds the remaining balance is *dropped*,
//! not aborted: the call still completes with result code 0, the
//! message is simply absent from the report, and in the raw variant
//! later pairs are still attempted against the remaining balance. This
//! looks like a bug and is not one -- it is the observable contract of
//! the wallet, pinned by tests. Do not "fix" it into an error.

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, trace};

use lumen_protocol::address::Address;
use lumen_protocol::cell::{Cell, CellBuilder, CellError, CellSlice};
use lumen_protocol::config::{
    EXIT_CODE_MALFORMED_BODY, EXIT_CODE_UNKNOWN_SELECTOR, MAX_RAW_TRANSFERS,
    SELECTOR_SEND_TRANSACTION, SELECTOR_SEND_TRANSACTION_RAW,
};
use lumen_protocol::message::{InternalMessage, OutboundMessage};

/// Errors that abort a dispatched call.
///
/// Note what is absent: there is no insufficient-balance variant. That
/// case is the silent no-op described at module level.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    /// No entry point matches the call's selector.
    #[error("unknown function selector {selector:#010x}")]
    UnknownSelector {
        /// The selector the call carried.
        selector: u32,
    },

    /// The body could not be consumed into whole units: a truncated
    /// structured request, a dangling raw flags field, a reference
    /// without a flags field, or more pairs than the protocol cap.
    #[error("malformed call body")]
    MalformedBody,
}

impl DispatchError {
    /// The exit code the environment reports for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            DispatchError::UnknownSelector { .. } => EXIT_CODE_UNKNOWN_SELECTOR,
            DispatchError::MalformedBody => EXIT_CODE_MALFORMED_BODY,
        }
    }
}

// ---------------------------------------------------------------------------
// Structured transfer
// ---------------------------------------------------------------------------

/// The fixed-shape body of a structured transfer call.
///
/// Body layout: destination (8 + 256 bits), bounce (1 bit), value
/// (128 bits), flags (8 bits), payload as the single reference. The
/// payload may be the empty cell; it may equally be a chain of cells
/// kilobytes deep -- the engine forwards it verbatim and imposes no
/// size policy of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    /// Where the value goes.
    pub destination: Address,
    /// Return funds to the sender if delivery fails.
    pub bounce: bool,
    /// Amount in nanolumen.
    pub value: u128,
    /// Send flags, forwarded verbatim.
    pub flags: u8,
    /// Opaque payload forwarded to the destination.
    pub payload: Arc<Cell>,
}

impl TransferRequest {
    /// Encodes the request into a call body (client side).
    pub fn encode_body(&self) -> Result<Cell, CellError> {
        let mut b = CellBuilder::new();
        self.destination.store(&mut b)?;
        b.store_bit(self.bounce)?;
        b.store_u128(self.value, 128)?;
        b.store_uint(u64::from(self.flags), 8)?;
        b.store_reference(Arc::clone(&self.payload))?;
        Ok(b.build())
    }

    /// Decodes a request from a call body, rejecting trailing content.
    pub fn decode_body(body: &Cell) -> Result<Self, DispatchError> {
        let mut slice = body.as_slice();
        let destination =
            Address::load(&mut slice).map_err(|_| DispatchError::MalformedBody)?;
        let bounce = slice.load_bit().map_err(|_| DispatchError::MalformedBody)?;
        let value = slice.load_u128(128).map_err(|_| DispatchError::MalformedBody)?;
        let flags = slice.load_uint(8).map_err(|_| DispatchError::MalformedBody)? as u8;
        let payload = slice
            .load_reference()
            .map_err(|_| DispatchError::MalformedBody)?;
        if !slice.is_empty() {
            return Err(DispatchError::MalformedBody);
        }
        Ok(Self {
            destination,
            bounce,
            value,
            flags,
            payload,
        })
    }
}

// ---------------------------------------------------------------------------
// Raw variable-arity transfer
// ---------------------------------------------------------------------------

/// One decoded `(flags, message)` pair of a raw transfer body.
#[derive(Debug, Clone)]
pub struct RawTransferEntry {
    /// Send flags for this message.
    pub flags: u8,
    /// The pre-encoded message, opaque until settlement.
    pub message: Arc<Cell>,
}

/// Outcome of the bounded-greedy raw-body decode.
///
/// The three-way split is the point: an empty body is a *valid* no-op
/// call, while a body that cannot be consumed into whole pairs is a
/// hard failure that must stay distinguishable from "completed with
/// nothing to do".
#[derive(Debug, Clone)]
pub enum RawDecodeOutcome {
    /// No pairs: the legal do-nothing call.
    Empty,
    /// Between one and [`MAX_RAW_TRANSFERS`] pairs, in body order.
    Pairs(Vec<RawTransferEntry>),
    /// The body does not divide into whole pairs within the cap.
    Malformed,
}

/// Greedily decodes `(flags, message)` pairs from a raw transfer body.
///
/// Reads one 8-bit flags field and one reference per pair until the
/// cursor is exhausted. There is no length field; exhaustion *is* the
/// terminator. Anything left over that cannot form a complete pair --
/// trailing bits shorter than a flags field, a flags field with no
/// reference left, references beyond the last flags field, or content
/// beyond [`MAX_RAW_TRANSFERS`] pairs -- makes the whole body
/// [`RawDecodeOutcome::Malformed`].
pub fn decode_raw_pairs(body: &Cell) -> RawDecodeOutcome {
    let mut slice: CellSlice<'_> = body.as_slice();
    let mut pairs = Vec::new();

    while !slice.is_empty() {
        if pairs.len() == MAX_RAW_TRANSFERS {
            debug!(
                cap = MAX_RAW_TRANSFERS,
                "raw body implies more pairs than the protocol cap"
            );
            return RawDecodeOutcome::Malformed;
        }
        if slice.remaining_bits() < 8 || slice.remaining_refs() == 0 {
            debug!(
                remaining_bits = slice.remaining_bits(),
                remaining_refs = slice.remaining_refs(),
                "raw body does not divide into whole (flags, message) pairs"
            );
            return RawDecodeOutcome::Malformed;
        }
        let Ok(flags) = slice.load_uint(8) else {
            return RawDecodeOutcome::Malformed;
        };
        let Ok(message) = slice.load_reference() else {
            return RawDecodeOutcome::Malformed;
        };
        pairs.push(RawTransferEntry {
            flags: flags as u8,
            message,
        });
    }

    if pairs.is_empty() {
        RawDecodeOutcome::Empty
    } else {
        RawDecodeOutcome::Pairs(pairs)
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Dispatches an authorized call body against the spendable balance.
///
/// Returns the outbound messages to queue, in request order: message
/// `i` of the result corresponds to the `i`-th transfer of the call.
/// Transfers the balance cannot cover are dropped silently (see module
/// docs); an undecodable body is a [`DispatchError`] and aborts the
/// transaction instead.
pub fn dispatch_call(
    selector: u32,
    body: &Cell,
    balance: u128,
) -> Result<Vec<OutboundMessage>, DispatchError> {
    match selector {
        SELECTOR_SEND_TRANSACTION => dispatch_structured(body, balance),
        SELECTOR_SEND_TRANSACTION_RAW => dispatch_raw(body, balance),
        other => Err(DispatchError::UnknownSelector { selector: other }),
    }
}

fn dispatch_structured(
    body: &Cell,
    balance: u128,
) -> Result<Vec<OutboundMessage>, DispatchError> {
    let request = TransferRequest::decode_body(body)?;

    if request.value > balance {
        debug!(
            value = request.value,
            balance, "dropping structured transfer: value exceeds balance"
        );
        return Ok(Vec::new());
    }

    trace!(destination = %request.destination, value = request.value, "queueing structured transfer");
    Ok(vec![OutboundMessage {
        destination: request.destination,
        value: request.value,
        bounce: request.bounce,
        flags: request.flags,
        payload: Some(request.payload),
    }])
}

fn dispatch_raw(body: &Cell, balance: u128) -> Result<Vec<OutboundMessage>, DispatchError> {
    let pairs = match decode_raw_pairs(body) {
        RawDecodeOutcome::Empty => return Ok(Vec::new()),
        RawDecodeOutcome::Malformed => return Err(DispatchError::MalformedBody),
        RawDecodeOutcome::Pairs(pairs) => pairs,
    };

    let mut remaining = balance;
    let mut out = Vec::with_capacity(pairs.len());
    for (index, entry) in pairs.into_iter().enumerate() {
        // The message was pre-encoded by the caller; an entry that is
        // not a whole message is body malformation, same as a broken
        // pair boundary.
        let message = InternalMessage::decode(&entry.message)
            .map_err(|_| DispatchError::MalformedBody)?;

        let Some(after) = remaining.checked_sub(message.value) else {
            debug!(
                index,
                value = message.value,
                remaining,
                "dropping raw transfer: value exceeds remaining balance"
            );
            continue;
        };
        remaining = after;

        trace!(index, destination = %message.destination, value = message.value, "queueing raw transfer");
        out.push(OutboundMessage {
            destination: message.destination,
            value: message.value,
            bounce: message.bounce,
            flags: entry.flags,
            payload: message.payload,
        });
    }
    Ok(out)
}
