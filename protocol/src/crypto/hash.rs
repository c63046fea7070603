//! # Hashing Utilities
//!
//! SHA-256, and only SHA-256. The representation hash of a cell, the
//! canonical hash an owner signs, and the account address derived from
//! a deploy payload are all the same 32-byte digest, so there is
//! exactly one hash function in the protocol and no negotiation about
//! it.

use sha2::{Digest, Sha256};

/// Compute the SHA-256 hash of the input data.
///
/// Returns a 32-byte digest as a `Vec<u8>`. Most callers immediately
/// pass the result to something that wants `&[u8]`; the heap
/// allocation is noise compared to the cost of the hash itself.
///
/// # Example
///
/// ```
/// use lumen_protocol::crypto::sha256;
///
/// let digest = sha256(b"lumen protocol");
/// assert_eq!(digest.len(), 32);
/// ```
pub fn sha256(data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

/// Compute the SHA-256 hash and return a fixed-size array.
///
/// Same as [`sha256`] but returns `[u8; 32]` for callers where the
/// array type propagates naturally: cell hashes, addresses, signable
/// digests.
pub fn sha256_array(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_known_vector() {
        // SHA-256("abc"), straight from FIPS 180-2.
        let digest = sha256(b"abc");
        assert_eq!(
            hex::encode(digest),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn array_and_vec_agree() {
        let data = b"same input, same digest";
        assert_eq!(sha256(data), sha256_array(data).to_vec());
    }

    #[test]
    fn empty_input_hashes() {
        let digest = sha256_array(b"");
        assert_eq!(
            hex::encode(digest),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
