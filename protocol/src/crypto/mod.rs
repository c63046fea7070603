//! Cryptographic primitives: Ed25519 keys and SHA-256 hashing.
//!
//! Two building blocks and nothing more. Signatures authenticate
//! external calls against the wallet's owner key; SHA-256 produces the
//! representation hash of cells, which doubles as the canonical call
//! hash and the account address seed.

pub mod hash;
pub mod keys;

pub use hash::{sha256, sha256_array};
pub use keys::{KeyError, LumenKeypair, LumenPublicKey, LumenSignature};
