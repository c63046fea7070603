//! # The Authentication Gate
//!
//! Every external call passes through [`authorize`] before the dispatch
//! engine sees it. The gate answers one question: is this call from the
//! wallet's owner and still inside its validity window?
//!
//! Checks run cheapest first: the expiry comparison is two integer
//! loads, the Ed25519 verification is ~1600 field operations, so the
//! window is checked before any signature work.
//!
//! A rejection has no side effects by construction -- the gate borrows
//! the call and the state immutably and returns a verdict. Whatever
//! state mutation the surrounding transaction was going to perform is
//! simply never reached.

use thiserror::Error;
use tracing::{debug, warn};

use lumen_protocol::call::ExternalCall;
use lumen_protocol::config::{EXIT_CODE_EXPIRED, EXIT_CODE_INVALID_SIGNATURE};

use crate::state::WalletState;

/// Why the gate refused a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RejectReason {
    /// The call carried no signature, or the signature does not verify
    /// against the owner key. The two cases are deliberately not
    /// distinguished.
    #[error("missing or invalid signature")]
    InvalidSignature,

    /// The header's validity window has elapsed (or was never valid:
    /// `time` past `expire`).
    #[error("call validity window elapsed")]
    ExpiredCall,
}

impl RejectReason {
    /// The exit code the environment reports for this rejection.
    pub fn exit_code(&self) -> i32 {
        match self {
            RejectReason::InvalidSignature => EXIT_CODE_INVALID_SIGNATURE,
            RejectReason::ExpiredCall => EXIT_CODE_EXPIRED,
        }
    }
}

/// The gate's verdict on one external call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Selector and body may proceed to the dispatch engine unchanged.
    Authorized,
    /// The call is refused; the transaction aborts with the reason's
    /// exit code and zero effects.
    Rejected(RejectReason),
}

/// Authenticates an external call against the wallet's owner key.
///
/// `now` is the environment's logical clock in unix seconds. A call
/// whose `expire` is at or before `now` is expired; a header whose
/// `time` (milliseconds) already lies past its own `expire` never had a
/// valid window and is rejected the same way.
///
/// The header's embedded public key is a client-side convenience and is
/// ignored here: verification runs against the key in `state`, so a
/// valid signature from anyone but the owner still rejects.
pub fn authorize(call: &ExternalCall, state: &WalletState, now: u64) -> Verdict {
    // Window first: cheap, and an expired call's signature is not
    // worth verifying.
    if u64::from(call.header.expire) <= now || call.header.time / 1000 > u64::from(call.header.expire)
    {
        warn!(
            expire = call.header.expire,
            now, "rejecting expired external call"
        );
        return Verdict::Rejected(RejectReason::ExpiredCall);
    }

    let Some(signature) = &call.signature else {
        warn!("rejecting unsigned external call");
        return Verdict::Rejected(RejectReason::InvalidSignature);
    };

    // Re-encoding the fixed-width header cannot overflow a cell; if it
    // somehow fails, refuse rather than guess.
    let Ok(hash) = call.unsigned_hash() else {
        return Verdict::Rejected(RejectReason::InvalidSignature);
    };

    if !state.owner_public_key().verify(&hash, signature) {
        warn!("rejecting external call: signature does not verify against owner key");
        return Verdict::Rejected(RejectReason::InvalidSignature);
    }

    debug!(selector = format_args!("{:#010x}", call.selector), "call authorized");
    Verdict::Authorized
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_protocol::call::CallHeader;
    use lumen_protocol::cell::Cell;
    use lumen_protocol::config::SELECTOR_SEND_TRANSACTION_RAW;
    use lumen_protocol::crypto::keys::LumenKeypair;

    const NOW: u64 = 1_700_000_000;

    fn call_at(kp: &LumenKeypair, time_ms: u64, expire: u32) -> ExternalCall {
        ExternalCall::new(
            CallHeader {
                public_key: kp.public_key(),
                time: time_ms,
                expire,
            },
            SELECTOR_SEND_TRANSACTION_RAW,
            Cell::empty(),
        )
    }

    fn wallet_of(kp: &LumenKeypair) -> WalletState {
        WalletState::new(kp.public_key(), 0)
    }

    #[test]
    fn signed_call_in_window_is_authorized() {
        let kp = LumenKeypair::generate();
        let mut call = call_at(&kp, NOW * 1000, (NOW + 3600) as u32);
        call.sign(&kp).unwrap();
        assert_eq!(authorize(&call, &wallet_of(&kp), NOW), Verdict::Authorized);
    }

    #[test]
    fn unsigned_call_rejected() {
        let kp = LumenKeypair::generate();
        let call = call_at(&kp, NOW * 1000, (NOW + 3600) as u32);
        assert_eq!(
            authorize(&call, &wallet_of(&kp), NOW),
            Verdict::Rejected(RejectReason::InvalidSignature)
        );
    }

    #[test]
    fn wrong_key_signature_rejected() {
        let owner = LumenKeypair::generate();
        let intruder = LumenKeypair::generate();
        let mut call = call_at(&owner, NOW * 1000, (NOW + 3600) as u32);
        call.sign(&intruder).unwrap();
        assert_eq!(
            authorize(&call, &wallet_of(&owner), NOW),
            Verdict::Rejected(RejectReason::InvalidSignature)
        );
    }

    #[test]
    fn tampered_body_rejected() {
        // Sign one body, then swap it: the recomputed canonical hash no
        // longer matches the signature.
        let kp = LumenKeypair::generate();
        let mut call = call_at(&kp, NOW * 1000, (NOW + 3600) as u32);
        call.sign(&kp).unwrap();

        let mut b = lumen_protocol::cell::CellBuilder::new();
        b.store_uint(0xFF, 8).unwrap();
        call.body = std::sync::Arc::new(b.build());

        assert_eq!(
            authorize(&call, &wallet_of(&kp), NOW),
            Verdict::Rejected(RejectReason::InvalidSignature)
        );
    }

    #[test]
    fn elapsed_expire_rejected_even_when_signed() {
        let kp = LumenKeypair::generate();
        let mut call = call_at(&kp, (NOW - 7200) * 1000, (NOW - 3600) as u32);
        call.sign(&kp).unwrap();
        assert_eq!(
            authorize(&call, &wallet_of(&kp), NOW),
            Verdict::Rejected(RejectReason::ExpiredCall)
        );
    }

    #[test]
    fn expire_boundary_is_exclusive() {
        let kp = LumenKeypair::generate();
        let mut call = call_at(&kp, NOW * 1000, NOW as u32);
        call.sign(&kp).unwrap();
        // expire == now counts as elapsed.
        assert_eq!(
            authorize(&call, &wallet_of(&kp), NOW),
            Verdict::Rejected(RejectReason::ExpiredCall)
        );
    }

    #[test]
    fn inverted_window_rejected() {
        // time (ms) already past expire: the window never opens.
        let kp = LumenKeypair::generate();
        let mut call = call_at(&kp, (NOW + 7200) * 1000, (NOW + 3600) as u32);
        call.sign(&kp).unwrap();
        assert_eq!(
            authorize(&call, &wallet_of(&kp), NOW),
            Verdict::Rejected(RejectReason::ExpiredCall)
        );
    }

    #[test]
    fn expiry_checked_before_signature() {
        // Expired AND badly signed: the window should win.
        let owner = LumenKeypair::generate();
        let intruder = LumenKeypair::generate();
        let mut call = call_at(&owner, (NOW - 7200) * 1000, (NOW - 3600) as u32);
        call.sign(&intruder).unwrap();
        assert_eq!(
            authorize(&call, &wallet_of(&owner), NOW),
            Verdict::Rejected(RejectReason::ExpiredCall)
        );
    }

    #[test]
    fn exit_codes_are_distinct() {
        assert_ne!(
            RejectReason::InvalidSignature.exit_code(),
            RejectReason::ExpiredCall.exit_code()
        );
        assert_eq!(RejectReason::InvalidSignature.exit_code(), 58);
        assert_eq!(RejectReason::ExpiredCall.exit_code(), 57);
    }
}
