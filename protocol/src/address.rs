//! # Account Addresses
//!
//! A Lumen address is a workchain id plus a 256-bit account id. For a
//! deployed contract the account id is the representation hash of its
//! state-init cell, which makes addresses deterministic: anyone holding
//! the code-and-data payload can compute where it will live before a
//! single message is sent. Funding an address before deploying to it is
//! normal and expected.
//!
//! The canonical text form is `<workchain>:<64 hex chars>`, e.g.
//! `0:3f9a...`. Base chain is workchain 0; negative workchains exist in
//! the encoding (signed 8-bit) but nothing in this crate treats them
//! specially.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::cell::{Cell, CellBuilder, CellError, CellSlice};

/// Errors from parsing or decoding addresses.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    /// The text form is not `<workchain>:<64 hex chars>`.
    #[error("malformed address string: {input}")]
    Malformed {
        /// The offending input.
        input: String,
    },

    /// The account id hex did not decode to exactly 32 bytes.
    #[error("invalid account id: expected 64 hex characters")]
    InvalidAccountId,

    /// The cell did not contain a whole address field.
    #[error("address field truncated: {0}")]
    Truncated(#[from] CellError),
}

/// A workchain-qualified account address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    /// Workchain id. 0 for the base chain.
    workchain: i8,
    /// 256-bit account id.
    account: [u8; 32],
}

impl Address {
    /// Creates an address from its parts.
    pub fn new(workchain: i8, account: [u8; 32]) -> Self {
        Self { workchain, account }
    }

    /// Derives the base-chain address of a contract from its state-init
    /// cell. The account id is the init cell's repr hash.
    pub fn from_state_init(state_init: &Cell) -> Self {
        Self {
            workchain: 0,
            account: *state_init.repr_hash(),
        }
    }

    /// The workchain id.
    pub fn workchain(&self) -> i8 {
        self.workchain
    }

    /// The raw 256-bit account id.
    pub fn account(&self) -> &[u8; 32] {
        &self.account
    }

    /// Appends this address to a builder: 8-bit signed workchain, then
    /// the 256-bit account id.
    pub fn store(&self, builder: &mut CellBuilder) -> Result<(), CellError> {
        builder.store_uint(self.workchain as u8 as u64, 8)?;
        builder.store_raw(&self.account, 256)?;
        Ok(())
    }

    /// Reads an address from a cursor. Counterpart of [`store`](Self::store).
    pub fn load(slice: &mut CellSlice<'_>) -> Result<Self, AddressError> {
        let workchain = slice.load_uint(8)? as u8 as i8;
        let raw = slice.load_raw(256)?;
        let mut account = [0u8; 32];
        account.copy_from_slice(&raw);
        Ok(Self { workchain, account })
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.workchain, hex::encode(self.account))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Address({}:{}...)",
            self.workchain,
            &hex::encode(self.account)[..8]
        )
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (wc, hex_part) = s.split_once(':').ok_or_else(|| AddressError::Malformed {
            input: s.to_string(),
        })?;
        let workchain: i8 = wc.parse().map_err(|_| AddressError::Malformed {
            input: s.to_string(),
        })?;
        let bytes = hex::decode(hex_part).map_err(|_| AddressError::InvalidAccountId)?;
        if bytes.len() != 32 {
            return Err(AddressError::InvalidAccountId);
        }
        let mut account = [0u8; 32];
        account.copy_from_slice(&bytes);
        Ok(Self { workchain, account })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_parse_roundtrip() {
        let addr = Address::new(0, [0xAB; 32]);
        let text = addr.to_string();
        assert!(text.starts_with("0:abab"));
        let parsed: Address = text.parse().unwrap();
        assert_eq!(parsed, addr);
    }

    #[test]
    fn negative_workchain_roundtrip() {
        let addr = Address::new(-1, [0x01; 32]);
        let parsed: Address = addr.to_string().parse().unwrap();
        assert_eq!(parsed.workchain(), -1);
        assert_eq!(parsed, addr);
    }

    #[test]
    fn cell_store_load_roundtrip() {
        let addr = Address::new(-1, [0x5C; 32]);
        let mut b = CellBuilder::new();
        addr.store(&mut b).unwrap();
        let cell = b.build();

        let mut slice = cell.as_slice();
        let loaded = Address::load(&mut slice).unwrap();
        assert_eq!(loaded, addr);
        assert!(slice.is_empty());
    }

    #[test]
    fn rejects_malformed_strings() {
        assert!("no-colon".parse::<Address>().is_err());
        assert!("0:short".parse::<Address>().is_err());
        assert!("x:0000000000000000000000000000000000000000000000000000000000000000"
            .parse::<Address>()
            .is_err());
    }

    #[test]
    fn state_init_derivation_is_deterministic() {
        let mut b = CellBuilder::new();
        b.store_raw(&[0x11; 32], 256).unwrap();
        b.store_uint(0, 64).unwrap();
        let init = b.build();

        let a1 = Address::from_state_init(&init);
        let a2 = Address::from_state_init(&init);
        assert_eq!(a1, a2);
        assert_eq!(a1.workchain(), 0);
        assert_eq!(a1.account(), init.repr_hash());
    }

    #[test]
    fn truncated_cell_fails() {
        let mut b = CellBuilder::new();
        b.store_uint(0, 8).unwrap(); // workchain only, no account id
        let cell = b.build();
        let mut slice = cell.as_slice();
        assert!(matches!(
            Address::load(&mut slice),
            Err(AddressError::Truncated(_))
        ));
    }
}
