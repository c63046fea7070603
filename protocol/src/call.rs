//! # The External-Call Envelope
//!
//! An external call is how an owner talks to their wallet from outside
//! the chain: a header identifying the signer and a validity window, a
//! 32-bit function selector, a body cell, and (normally) an Ed25519
//! signature over all of it.
//!
//! ## Envelope layout
//!
//! Front to back in the envelope cell:
//!
//! - signature-present flag (1 bit), then 512 signature bits when set
//! - `public_key` (256 bits)
//! - `time` (64 bits, milliseconds)
//! - `expire` (32 bits, unix seconds)
//! - `selector` (32 bits)
//! - the body as the single reference
//!
//! ## What gets signed
//!
//! The canonical hash is the repr hash of the *unsigned* envelope:
//! header + selector + body reference, no signature material. Signing
//! therefore commits to every field the contract will act on, and the
//! verifier recomputes the same hash from what actually arrived; there
//! is no way to splice a signed header onto a different body.

use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

use crate::cell::{Cell, CellBuilder, CellError};
use crate::crypto::keys::{LumenKeypair, LumenPublicKey, LumenSignature};

/// Errors from envelope encoding and decoding.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// The envelope cell did not contain a whole header.
    #[error("envelope truncated: {0}")]
    Truncated(#[from] CellError),

    /// The envelope carries no body reference.
    #[error("envelope has no body reference")]
    MissingBody,

    /// Content remained after the envelope fields.
    #[error("trailing content after envelope: {remaining_bits} bits, {remaining_refs} refs")]
    TrailingContent {
        remaining_bits: usize,
        remaining_refs: usize,
    },
}

/// The authenticated header of an external call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallHeader {
    /// The key the call claims to be signed with. The gate ignores this
    /// claim and verifies against the wallet's stored owner key; the
    /// field exists so clients can build the envelope without chain
    /// access.
    pub public_key: LumenPublicKey,
    /// Client wall clock in milliseconds. Makes every fresh envelope
    /// byte-distinct, which is what the environment's duplicate
    /// suppression keys on.
    pub time: u64,
    /// Validity deadline in unix seconds. Must not have elapsed at
    /// execution time, and `time / 1000` must not exceed it.
    pub expire: u32,
}

/// An external call: header, selector, body, optional signature.
///
/// Freshly constructed calls are unsigned; [`sign`](Self::sign) attaches
/// the owner signature. Leaving a call unsigned is legal at this layer
/// (it is how the signature-rejection path gets exercised) and fails at
/// the wallet's authentication gate, not here.
#[derive(Debug, Clone)]
pub struct ExternalCall {
    /// Detached owner signature, if the call has been signed.
    pub signature: Option<LumenSignature>,
    /// The authenticated header.
    pub header: CallHeader,
    /// Entry-point selector.
    pub selector: u32,
    /// The call body, opaque at this layer.
    pub body: Arc<Cell>,
}

impl ExternalCall {
    /// Creates an unsigned call.
    pub fn new(header: CallHeader, selector: u32, body: Cell) -> Self {
        Self {
            signature: None,
            header,
            selector,
            body: Arc::new(body),
        }
    }

    /// The canonical hash: repr hash of the unsigned envelope. This is
    /// what the owner signs and what the gate verifies.
    pub fn unsigned_hash(&self) -> Result<[u8; 32], CellError> {
        let mut b = CellBuilder::new();
        self.store_unsigned_fields(&mut b)?;
        Ok(*b.build().repr_hash())
    }

    /// Signs the call in place with the owner keypair.
    pub fn sign(&mut self, keypair: &LumenKeypair) -> Result<(), CellError> {
        let hash = self.unsigned_hash()?;
        self.signature = Some(keypair.sign(&hash));
        Ok(())
    }

    /// Strips the signature. Test hook for the rejection path; the
    /// resulting envelope encodes with the signature-present flag clear.
    pub fn into_unsigned(mut self) -> Self {
        self.signature = None;
        self
    }

    /// Encodes the full envelope cell, signature included when present.
    pub fn encode(&self) -> Result<Cell, CellError> {
        let mut b = CellBuilder::new();
        match &self.signature {
            Some(sig) => {
                b.store_bit(true)?;
                b.store_raw(sig.as_bytes(), 512)?;
            }
            None => {
                b.store_bit(false)?;
            }
        }
        self.store_unsigned_fields(&mut b)?;
        Ok(b.build())
    }

    /// Decodes an envelope cell, rejecting trailing content.
    pub fn decode(cell: &Cell) -> Result<Self, EnvelopeError> {
        let mut slice = cell.as_slice();

        let signature = if slice.load_bit().map_err(EnvelopeError::Truncated)? {
            let raw = slice.load_raw(512)?;
            let mut bytes = [0u8; 64];
            bytes.copy_from_slice(&raw);
            Some(LumenSignature::from_bytes(bytes))
        } else {
            None
        };

        let key_raw = slice.load_raw(256)?;
        let mut key_bytes = [0u8; 32];
        key_bytes.copy_from_slice(&key_raw);
        let public_key = LumenPublicKey::from_bytes(key_bytes);

        let time = slice.load_uint(64)?;
        let expire = slice.load_uint(32)? as u32;
        let selector = slice.load_uint(32)? as u32;

        let body = match slice.load_reference() {
            Ok(body) => body,
            Err(_) => {
                warn!("external call envelope without a body reference");
                return Err(EnvelopeError::MissingBody);
            }
        };

        if !slice.is_empty() {
            return Err(EnvelopeError::TrailingContent {
                remaining_bits: slice.remaining_bits(),
                remaining_refs: slice.remaining_refs(),
            });
        }

        Ok(Self {
            signature,
            header: CallHeader {
                public_key,
                time,
                expire,
            },
            selector,
            body,
        })
    }

    fn store_unsigned_fields(&self, b: &mut CellBuilder) -> Result<(), CellError> {
        b.store_raw(self.header.public_key.as_bytes(), 256)?;
        b.store_uint(self.header.time, 64)?;
        b.store_uint(u64::from(self.header.expire), 32)?;
        b.store_uint(u64::from(self.selector), 32)?;
        b.store_reference(Arc::clone(&self.body))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SELECTOR_SEND_TRANSACTION_RAW;

    fn test_call(kp: &LumenKeypair) -> ExternalCall {
        let mut body = CellBuilder::new();
        body.store_uint(0xAB, 8).unwrap();
        ExternalCall::new(
            CallHeader {
                public_key: kp.public_key(),
                time: 1_700_000_000_000,
                expire: 1_700_003_600,
            },
            SELECTOR_SEND_TRANSACTION_RAW,
            body.build(),
        )
    }

    #[test]
    fn signed_envelope_roundtrip() {
        let kp = LumenKeypair::generate();
        let mut call = test_call(&kp);
        call.sign(&kp).unwrap();

        let cell = call.encode().unwrap();
        let decoded = ExternalCall::decode(&cell).unwrap();

        assert_eq!(decoded.header, call.header);
        assert_eq!(decoded.selector, call.selector);
        assert_eq!(decoded.body.repr_hash(), call.body.repr_hash());
        assert_eq!(
            decoded.signature.as_ref().unwrap().as_bytes(),
            call.signature.as_ref().unwrap().as_bytes()
        );
    }

    #[test]
    fn unsigned_envelope_roundtrip() {
        let kp = LumenKeypair::generate();
        let call = test_call(&kp);

        let decoded = ExternalCall::decode(&call.encode().unwrap()).unwrap();
        assert!(decoded.signature.is_none());
        assert_eq!(decoded.header, call.header);
    }

    #[test]
    fn signature_does_not_change_canonical_hash() {
        let kp = LumenKeypair::generate();
        let mut call = test_call(&kp);
        let before = call.unsigned_hash().unwrap();
        call.sign(&kp).unwrap();
        assert_eq!(call.unsigned_hash().unwrap(), before);
    }

    #[test]
    fn signature_verifies_against_canonical_hash() {
        let kp = LumenKeypair::generate();
        let mut call = test_call(&kp);
        call.sign(&kp).unwrap();

        let decoded = ExternalCall::decode(&call.encode().unwrap()).unwrap();
        let hash = decoded.unsigned_hash().unwrap();
        assert!(kp
            .public_key()
            .verify(&hash, decoded.signature.as_ref().unwrap()));
    }

    #[test]
    fn hash_commits_to_body() {
        let kp = LumenKeypair::generate();
        let call_a = test_call(&kp);

        let mut other_body = CellBuilder::new();
        other_body.store_uint(0xCD, 8).unwrap();
        let call_b = ExternalCall::new(call_a.header.clone(), call_a.selector, other_body.build());

        assert_ne!(
            call_a.unsigned_hash().unwrap(),
            call_b.unsigned_hash().unwrap()
        );
    }

    #[test]
    fn missing_body_rejected() {
        let mut b = CellBuilder::new();
        b.store_bit(false).unwrap(); // no signature
        b.store_raw(&[0u8; 32], 256).unwrap();
        b.store_uint(0, 64).unwrap();
        b.store_uint(0, 32).unwrap();
        b.store_uint(0, 32).unwrap();
        // no body reference
        let cell = b.build();
        assert!(matches!(
            ExternalCall::decode(&cell),
            Err(EnvelopeError::MissingBody)
        ));
    }

    #[test]
    fn truncated_envelope_rejected() {
        let mut b = CellBuilder::new();
        b.store_bit(false).unwrap();
        b.store_raw(&[0u8; 16], 128).unwrap(); // half a public key
        let cell = b.build();
        assert!(matches!(
            ExternalCall::decode(&cell),
            Err(EnvelopeError::Truncated(_))
        ));
    }

    #[test]
    fn fresh_time_makes_envelopes_distinct() {
        let kp = LumenKeypair::generate();
        let mut a = test_call(&kp);
        let mut b = test_call(&kp);
        b.header.time += 1;
        a.sign(&kp).unwrap();
        b.sign(&kp).unwrap();
        assert_ne!(
            a.encode().unwrap().repr_hash(),
            b.encode().unwrap().repr_hash()
        );
    }
}
