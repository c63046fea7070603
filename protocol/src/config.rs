//! # Protocol Configuration & Constants
//!
//! Every magic number in the Lumen wallet protocol lives here. If you
//! are hardcoding a constant somewhere else, you are doing it wrong and
//! you owe the team coffee.
//!
//! Several of these values are load-bearing for on-chain compatibility
//! (selectors, exit codes); changing them changes the observable wire
//! contract of every deployed wallet.

// ---------------------------------------------------------------------------
// Cell Limits
// ---------------------------------------------------------------------------

/// Maximum number of data bits a single cell may hold.
///
/// 1023, not 1024: the top bit of the length descriptor is reserved, so
/// the representable range is 0..=1023. Larger payloads chain through
/// references instead.
pub const MAX_CELL_BITS: usize = 1023;

/// Maximum number of child references per cell.
///
/// Four. This is also what bounds the arity of the raw multi-transfer
/// call: each `(flags, message)` pair consumes one reference of the
/// body cell, so no body can carry more than four messages.
pub const MAX_CELL_REFS: usize = 4;

// ---------------------------------------------------------------------------
// Function Selectors
// ---------------------------------------------------------------------------

/// Selector for the structured single-transfer entry point.
///
/// Body shape: `(destination, bounce, value: u128, flags: u8, payload)`.
pub const SELECTOR_SEND_TRANSACTION: u32 = 0x5345_4e44; // "SEND"

/// Selector for the raw variable-arity transfer entry point.
///
/// One fixed id serves zero, one, or up to [`MAX_RAW_TRANSFERS`]
/// `(flags: u8, message: ref)` pairs with no length field anywhere in
/// the encoding. The decoder reads pairs greedily until the body is
/// exhausted.
pub const SELECTOR_SEND_TRANSACTION_RAW: u32 = 0x169e_3e11;

// ---------------------------------------------------------------------------
// Dispatch Limits
// ---------------------------------------------------------------------------

/// Maximum number of `(flags, message)` pairs in one raw transfer call.
///
/// Equal to [`MAX_CELL_REFS`]: each pair holds its message as one body
/// reference. A body implying more pairs than this is a hard decode
/// failure, not a truncation.
pub const MAX_RAW_TRANSFERS: usize = 4;

// ---------------------------------------------------------------------------
// Exit Codes
// ---------------------------------------------------------------------------

/// Compute aborted: the call carried no signature or a signature that
/// does not verify against the wallet's owner key.
pub const EXIT_CODE_INVALID_SIGNATURE: i32 = 58;

/// Compute aborted: the header's `expire` field has elapsed relative to
/// the environment's logical clock.
pub const EXIT_CODE_EXPIRED: i32 = 57;

/// Compute aborted: the call body could not be consumed into whole
/// units (cell underflow class). Covers dangling raw-pair fields and
/// over-long pair sequences.
pub const EXIT_CODE_MALFORMED_BODY: i32 = 9;

/// Compute aborted: no entry point matches the call's selector.
pub const EXIT_CODE_UNKNOWN_SELECTOR: i32 = 60;

/// Result code of a transaction that completed normally. Note that a
/// completed transaction may still have produced zero effects: dropping
/// an unaffordable transfer is a silent no-op, not an abort.
pub const RESULT_CODE_OK: i32 = 0;

// ---------------------------------------------------------------------------
// Currency
// ---------------------------------------------------------------------------

/// Decimal places of the native LUM token. All protocol amounts are
/// integer nanolumen; 1 LUM = 10^9 nanolumen.
pub const LUM_DECIMALS: u32 = 9;

/// Converts whole LUM into nanolumen, the integer unit used on the wire.
pub const fn nano(lum: u64) -> u128 {
    (lum as u128) * 10u128.pow(LUM_DECIMALS)
}

// ---------------------------------------------------------------------------
// Cryptographic Parameters
// ---------------------------------------------------------------------------

/// Ed25519 public key length in bytes. The owner key stored in wallet
/// state is exactly this wide.
pub const PUBLIC_KEY_LENGTH: usize = 32;

/// Ed25519 signature length. Always 64 bytes, carried as 512 bits at
/// the front of a signed envelope.
pub const SIGNATURE_LENGTH: usize = 64;
