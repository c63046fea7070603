// Copyright (c) 2026 Lumen Foundation. MIT License.
// See LICENSE for details.

//! # Lumen Wallet
//!
//! A single-owner wallet contract and the in-process execution
//! environment it runs against.
//!
//! The wallet itself is two small pieces: an authentication gate that
//! checks the call's validity window and owner signature, and a dispatch
//! engine that turns an authorized body into outbound value transfers.
//! Everything else here exists to exercise them the way a live chain
//! would: a ledger with accounts, balances, deploy-on-first-call, a
//! logical clock, duplicate suppression, and an async subscriber for
//! following the transaction trees a call produces.
//!
//! ## Modules
//!
//! - **state** - Wallet persistent state and the state-init cell whose
//!   hash is the account address.
//! - **auth** - The authentication gate: expiry window, then Ed25519.
//! - **dispatch** - Structured and raw variable-arity transfers.
//! - **ledger** - The execution environment double.
//! - **subscriber** - Async traces over transaction trees.

pub mod auth;
pub mod dispatch;
pub mod ledger;
pub mod state;
pub mod subscriber;

pub use auth::{authorize, RejectReason, Verdict};
pub use dispatch::{
    decode_raw_pairs, dispatch_call, DispatchError, RawDecodeOutcome, RawTransferEntry,
    TransferRequest,
};
pub use ledger::{AccountView, Ledger, LedgerError, Transaction};
pub use state::{AccountStatus, WalletState};
pub use subscriber::{Subscriber, Trace};
