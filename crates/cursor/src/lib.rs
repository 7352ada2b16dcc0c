//! Tamper-evident pagination cursors.
//!
//! A cursor is a self-contained token carrying a resumption offset and an
//! issuance timestamp, signed with HMAC-SHA256 so clients cannot forge
//! offsets or extend the TTL. Because the cursor validates on its own, no
//! server-side session is required for correctness; the optional
//! [`store::CursorStore`] exists only for adoption telemetry.

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Encode/decode and signature verification.
pub mod codec;
/// Optional TTL-bounded issuance bookkeeping.
pub mod store;

pub use codec::{
    decode_cursor, decode_cursor_expecting, encode_cursor, encode_cursor_with_filter,
    filter_fingerprint, CursorClaims, CursorError, CURSOR_TTL,
};
pub use store::CursorStore;
