//! # Wallet State
//!
//! The persistent state of a deployed wallet is deliberately tiny: the
//! owner's 256-bit public key and the deploy timestamp. Both are fixed
//! at construction. There is no owner rotation, no multi-owner support,
//! and no persisted nonce -- replay protection comes from the call
//! header's validity window plus the environment's duplicate-message
//! suppression, not from mutable state.
//!
//! The same two fields, encoded as a cell, form the *state init*: the
//! construction payload delivered alongside the first external call.
//! Its repr hash is the account address, so the owner key and timestamp
//! together determine where the wallet lives before it exists.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use lumen_protocol::cell::{Cell, CellBuilder, CellError};
use lumen_protocol::crypto::keys::LumenPublicKey;

/// Errors from state-init decoding.
#[derive(Debug, Error)]
pub enum StateError {
    /// The init cell did not contain a whole state record.
    #[error("state init truncated: {0}")]
    Truncated(#[from] CellError),

    /// Content remained after the state fields.
    #[error("trailing content after state init")]
    TrailingContent,
}

/// Lifecycle status of an account, as reported by the environment.
///
/// The only transition is `Uninitialized -> Active`, one-way, performed
/// by the first successful call that carries a valid state init. Plain
/// value credits do not activate an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountStatus {
    /// The address may hold a balance but no contract is deployed.
    Uninitialized,
    /// A contract is deployed and processing calls.
    Active,
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountStatus::Uninitialized => write!(f, "uninit"),
            AccountStatus::Active => write!(f, "active"),
        }
    }
}

/// The immutable state of a deployed wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletState {
    owner_public_key: LumenPublicKey,
    deploy_timestamp: u64,
}

impl WalletState {
    /// Creates wallet state for the given owner.
    ///
    /// `deploy_timestamp` is a domain-separation seed, nothing more: two
    /// wallets of the same owner with different timestamps get different
    /// addresses. It is not consulted at runtime.
    pub fn new(owner_public_key: LumenPublicKey, deploy_timestamp: u64) -> Self {
        Self {
            owner_public_key,
            deploy_timestamp,
        }
    }

    /// The owner key every external call is verified against.
    pub fn owner_public_key(&self) -> &LumenPublicKey {
        &self.owner_public_key
    }

    /// The domain-separation timestamp fixed at construction.
    pub fn deploy_timestamp(&self) -> u64 {
        self.deploy_timestamp
    }

    /// Encodes the state-init cell: owner key (256 bits) then deploy
    /// timestamp (64 bits).
    pub fn encode_state_init(&self) -> Result<Cell, CellError> {
        let mut b = CellBuilder::new();
        b.store_raw(self.owner_public_key.as_bytes(), 256)?;
        b.store_uint(self.deploy_timestamp, 64)?;
        Ok(b.build())
    }

    /// Decodes a state-init cell, rejecting trailing content.
    pub fn decode_state_init(cell: &Cell) -> Result<Self, StateError> {
        let mut slice = cell.as_slice();
        let raw = slice.load_raw(256)?;
        let mut key_bytes = [0u8; 32];
        key_bytes.copy_from_slice(&raw);
        let deploy_timestamp = slice.load_uint(64)?;
        if !slice.is_empty() {
            return Err(StateError::TrailingContent);
        }
        Ok(Self {
            owner_public_key: LumenPublicKey::from_bytes(key_bytes),
            deploy_timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_protocol::address::Address;
    use lumen_protocol::crypto::keys::LumenKeypair;

    #[test]
    fn state_init_roundtrip() {
        let kp = LumenKeypair::generate();
        let state = WalletState::new(kp.public_key(), 0);
        let cell = state.encode_state_init().unwrap();
        assert_eq!(WalletState::decode_state_init(&cell).unwrap(), state);
    }

    #[test]
    fn address_depends_on_owner_key() {
        let a = WalletState::new(LumenKeypair::generate().public_key(), 0);
        let b = WalletState::new(LumenKeypair::generate().public_key(), 0);
        assert_ne!(
            Address::from_state_init(&a.encode_state_init().unwrap()),
            Address::from_state_init(&b.encode_state_init().unwrap())
        );
    }

    #[test]
    fn address_depends_on_timestamp() {
        let kp = LumenKeypair::generate();
        let a = WalletState::new(kp.public_key(), 0);
        let b = WalletState::new(kp.public_key(), 1);
        assert_ne!(
            Address::from_state_init(&a.encode_state_init().unwrap()),
            Address::from_state_init(&b.encode_state_init().unwrap())
        );
    }

    #[test]
    fn trailing_content_rejected() {
        let kp = LumenKeypair::generate();
        let state = WalletState::new(kp.public_key(), 7);
        let cell = state.encode_state_init().unwrap();

        let mut b = CellBuilder::new();
        b.store_cell(&cell).unwrap();
        b.store_bit(false).unwrap();
        assert!(matches!(
            WalletState::decode_state_init(&b.build()),
            Err(StateError::TrailingContent)
        ));
    }

    #[test]
    fn truncated_init_rejected() {
        let mut b = CellBuilder::new();
        b.store_raw(&[0u8; 32], 256).unwrap(); // key but no timestamp
        assert!(matches!(
            WalletState::decode_state_init(&b.build()),
            Err(StateError::Truncated(_))
        ));
    }

    #[test]
    fn status_display() {
        assert_eq!(AccountStatus::Uninitialized.to_string(), "uninit");
        assert_eq!(AccountStatus::Active.to_string(), "active");
    }

    #[test]
    fn state_serde_roundtrip() {
        let kp = LumenKeypair::generate();
        let state = WalletState::new(kp.public_key(), 42);
        let json = serde_json::to_string(&state).unwrap();
        let recovered: WalletState = serde_json::from_str(&json).unwrap();
        assert_eq!(recovered, state);
    }
}
