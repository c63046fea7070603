//! # Key Management
//!
//! Ed25519 keypair generation and serialization for wallet owners.
//!
//! A Lumen wallet has exactly one owner key, fixed at deploy time. The
//! 256-bit public half is embedded in the wallet's state-init payload;
//! the private half signs external calls and never appears on the wire.
//!
//! ## Security considerations
//!
//! - Private keys are zeroized on drop (thanks, ed25519-dalek).
//! - Key generation uses the OS RNG. If your OS RNG is broken, your
//!   wallet keys are the least of your worries.
//! - Key bytes are never logged, and `Debug` prints only the public
//!   half. If you add logging to this module, you will be asked to
//!   leave.

use ed25519_dalek::{
    Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey, SECRET_KEY_LENGTH,
};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use thiserror::Error;

/// Errors that can occur during key operations.
///
/// Intentionally vague about *why* something failed; leaking details
/// about key material through error messages is a classic footgun.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid secret key bytes: wrong length or not a valid scalar")]
    InvalidSecretKey,

    #[error("invalid public key bytes: not a valid Ed25519 point")]
    InvalidPublicKey,
}

/// An owner keypair wrapping the Ed25519 signing and verification keys.
///
/// Deliberately does NOT implement `Serialize`/`Deserialize`; exporting
/// private key material should be a conscious act, not something that
/// happens because a keypair fell into a JSON response. Use
/// `secret_key_bytes()` explicitly.
pub struct LumenKeypair {
    signing_key: SigningKey,
}

/// The public half of an owner identity, safe to share with the world.
///
/// This is the 256-bit value embedded in the wallet's state init and
/// checked by the authentication gate on every external call.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LumenPublicKey {
    bytes: [u8; 32],
}

/// An Ed25519 signature over a canonical call hash.
///
/// 64 bytes, deterministic for a given (key, message) pair. Stored as
/// `Vec<u8>` for serde compatibility but always exactly 64 bytes; a
/// wrong-length signature simply fails verification, no panics.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LumenSignature {
    bytes: Vec<u8>,
}

impl LumenKeypair {
    /// Generate a fresh keypair using the OS cryptographic RNG.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        Self { signing_key }
    }

    /// Constructs a keypair deterministically from a 32-byte seed.
    ///
    /// In Ed25519 the 32-byte secret key *is* the seed. Useful for
    /// fixture keys in tests; with a weak seed you get a weak key.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        Self { signing_key }
    }

    /// Reconstruct a keypair from a hex-encoded secret key.
    pub fn from_hex(hex_str: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_str).map_err(|_| KeyError::InvalidSecretKey)?;
        if bytes.len() != SECRET_KEY_LENGTH {
            return Err(KeyError::InvalidSecretKey);
        }
        let mut arr = [0u8; SECRET_KEY_LENGTH];
        arr.copy_from_slice(&bytes);
        Ok(Self::from_seed(&arr))
    }

    /// Returns the public key associated with this keypair.
    pub fn public_key(&self) -> LumenPublicKey {
        LumenPublicKey {
            bytes: self.signing_key.verifying_key().to_bytes(),
        }
    }

    /// Raw public key bytes (32 bytes). This is the identity that ends
    /// up in wallet state. Safe to share, log, tattoo on your arm, etc.
    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Sign a message and return a `LumenSignature`.
    ///
    /// Deterministic: the same (key, message) pair always produces the
    /// same signature. No nonce management at signing time.
    pub fn sign(&self, message: &[u8]) -> LumenSignature {
        let sig = self.signing_key.sign(message);
        LumenSignature {
            bytes: sig.to_bytes().to_vec(),
        }
    }

    /// Verify a signature against this keypair's public key.
    pub fn verify(&self, message: &[u8], signature: &LumenSignature) -> bool {
        self.public_key().verify(message, signature)
    }

    /// Exports the raw 32-byte secret key material.
    ///
    /// **Handle with extreme care.** This is the only secret standing
    /// between an attacker and everything the wallet holds.
    pub fn secret_key_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }
}

impl Clone for LumenKeypair {
    /// Cloning a keypair is allowed but should make you uncomfortable.
    /// Every copy of a private key is another thing to protect.
    fn clone(&self) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&self.signing_key.to_bytes()),
        }
    }
}

impl fmt::Debug for LumenKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print secret key material in debug output. Not even
        // "partially" -- a partial leak is still a leak.
        write!(f, "LumenKeypair(pub={})", self.public_key().to_hex())
    }
}

// ---------------------------------------------------------------------------
// LumenPublicKey
// ---------------------------------------------------------------------------

impl LumenPublicKey {
    /// Create a `LumenPublicKey` from raw bytes.
    ///
    /// Accepts any 32 bytes; point validity is checked at verification
    /// time, where an invalid point simply fails to verify. This keeps
    /// decode paths (wallet state read from a cell) infallible.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    /// Try to create a `LumenPublicKey` from a byte slice, validating
    /// both the length and that the bytes are a valid Ed25519 point.
    pub fn try_from_slice(slice: &[u8]) -> Result<Self, KeyError> {
        if slice.len() != 32 {
            return Err(KeyError::InvalidPublicKey);
        }
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(slice);

        // Catches low-order points and other degenerate encodings.
        VerifyingKey::from_bytes(&bytes).map_err(|_| KeyError::InvalidPublicKey)?;

        Ok(Self { bytes })
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// Verify a signature against this public key.
    ///
    /// Returns `true` if the signature is valid, `false` otherwise.
    /// A boolean rather than a `Result`: callers want a yes/no answer,
    /// and a detailed failure oracle helps nobody but attackers.
    pub fn verify(&self, message: &[u8], signature: &LumenSignature) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_bytes(&self.bytes) else {
            return false;
        };
        let sig_bytes: [u8; 64] = match signature.bytes.as_slice().try_into() {
            Ok(b) => b,
            Err(_) => return false,
        };
        let dalek_sig = DalekSignature::from_bytes(&sig_bytes);
        verifying_key.verify(message, &dalek_sig).is_ok()
    }

    /// Hex-encoded representation. 64 characters for 32 bytes.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Parse a hex-encoded public key string.
    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(s).map_err(|_| KeyError::InvalidPublicKey)?;
        if bytes.len() != 32 {
            return Err(KeyError::InvalidPublicKey);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self { bytes: arr })
    }
}

impl Hash for LumenPublicKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bytes.hash(state);
    }
}

impl fmt::Display for LumenPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for LumenPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LumenPublicKey({})", &self.to_hex()[..16])
    }
}

// ---------------------------------------------------------------------------
// LumenSignature
// ---------------------------------------------------------------------------

impl LumenSignature {
    /// Create a signature from its raw 64-byte representation.
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self {
            bytes: bytes.to_vec(),
        }
    }

    /// Raw signature bytes (always 64 for a properly built signature).
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the signature as a fixed 64-byte array, or `None` if the
    /// internal length is somehow wrong.
    pub fn to_fixed_bytes(&self) -> Option<[u8; 64]> {
        self.bytes.as_slice().try_into().ok()
    }

    /// Hex-encoded signature string. 128 characters for a valid sig.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }
}

impl fmt::Display for LumenSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for LumenSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex_str = self.to_hex();
        if hex_str.len() >= 128 {
            write!(f, "LumenSignature({}...{})", &hex_str[..8], &hex_str[120..])
        } else {
            write!(f, "LumenSignature({})", hex_str)
        }
    }
}
