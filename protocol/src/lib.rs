// Copyright (c) 2026 Lumen Foundation. MIT License.
// See LICENSE for details.

//! # Lumen Protocol - Core Library
//!
//! Primitives shared by every Lumen contract and client: the cell data
//! model, addresses, message encoding, and the externally-signed call
//! envelope.
//!
//! Everything on the Lumen wire is a **cell**: up to 1023 bits of data
//! plus up to four references to other cells. Contracts never see byte
//! streams; they see a cursor over a cell. That single decision shapes
//! the whole protocol: variable-arity call bodies, opaque pre-encoded
//! messages, and multi-kilobyte payload chains all fall out of it.
//!
//! ## Modules
//!
//! - **cell** - The cell model: immutable `Cell`, `CellBuilder` writer,
//!   `CellSlice` cursor. The decoding substrate for everything else.
//! - **crypto** - Ed25519 keys and SHA-256 hashing. Don't roll your own.
//! - **address** - Workchain-qualified 256-bit account addresses.
//! - **message** - Internal value-transfer messages and the outbound
//!   message report consumed from the execution environment.
//! - **call** - The external-call envelope: header, selector, signature,
//!   body, and the canonical hash that gets signed.
//! - **config** - Protocol constants. Every magic number lives here.

pub mod address;
pub mod call;
pub mod cell;
pub mod config;
pub mod crypto;
pub mod message;
