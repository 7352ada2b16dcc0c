//! Cursor encode/decode with HMAC-SHA256 signatures.
//!
//! Wire format: `base64url(payload_json) . base64url(mac)` where the MAC
//! is computed over the exact payload bytes. Verification order on decode
//! is structure, then signature, then claims, then TTL; the payload is
//! not parsed until the signature has been trusted.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// How long an issued cursor stays valid.
pub const CURSOR_TTL: Duration = Duration::from_secs(10 * 60);

/// Decoded cursor contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorClaims {
    /// Offset to resume fetching from.
    pub offset: u64,
    /// Issuance time, unix seconds.
    pub issued_at: u64,
    /// Fingerprint of the filter parameters the cursor was issued for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

/// Why a client-supplied cursor was rejected.
///
/// The display strings are the wire-level reasons surfaced in 400
/// responses; keep them stable.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CursorError {
    /// Base64 or JSON structure could not be decoded.
    #[error("malformed cursor")]
    Malformed,
    /// The HMAC did not verify; the cursor was tampered with or signed
    /// under a different secret.
    #[error("invalid cursor signature")]
    InvalidSignature,
    /// The cursor outlived [`CURSOR_TTL`].
    #[error("cursor expired")]
    Expired,
    /// The cursor was issued for a different filter set than the request
    /// now carries.
    #[error("cursor filter mismatch")]
    FilterMismatch,
}

/// Encode a cursor for `offset`, signed with `secret`.
///
/// Deterministic for a fixed `(offset, secret, issued_at)`; the output is
/// an opaque ~100 byte string regardless of offset magnitude.
pub fn encode_cursor(offset: u64, secret: &str) -> String {
    encode_cursor_with_filter(offset, secret, None)
}

/// Encode a cursor carrying a filter fingerprint (see [`filter_fingerprint`]).
pub fn encode_cursor_with_filter(offset: u64, secret: &str, filter: Option<&str>) -> String {
    encode_at(offset, secret, filter, unix_now())
}

fn encode_at(offset: u64, secret: &str, filter: Option<&str>, issued_at: u64) -> String {
    let mut payload = Map::new();
    payload.insert("offset".to_string(), offset.into());
    payload.insert("issued_at".to_string(), issued_at.into());
    if let Some(filter) = filter {
        payload.insert("filter".to_string(), filter.into());
    }
    let payload = Value::Object(payload).to_string();
    let mac = sign(payload.as_bytes(), secret);
    format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(payload.as_bytes()),
        URL_SAFE_NO_PAD.encode(mac)
    )
}

/// Decode and validate a cursor.
///
/// Fails with [`CursorError::Malformed`] on structural problems,
/// [`CursorError::InvalidSignature`] when the MAC does not verify
/// (constant-time comparison), and [`CursorError::Expired`] past the TTL.
pub fn decode_cursor(cursor: &str, secret: &str) -> Result<CursorClaims, CursorError> {
    decode_at(cursor, secret, None, unix_now())
}

/// Decode a cursor, additionally requiring its filter fingerprint to
/// match `filter`.
///
/// A cursor issued without a fingerprint is accepted for any filter; one
/// issued with a fingerprint is rejected with
/// [`CursorError::FilterMismatch`] when the request's filters changed.
pub fn decode_cursor_expecting(
    cursor: &str,
    secret: &str,
    filter: Option<&str>,
) -> Result<CursorClaims, CursorError> {
    decode_at(cursor, secret, filter, unix_now())
}

fn decode_at(
    cursor: &str,
    secret: &str,
    filter: Option<&str>,
    now: u64,
) -> Result<CursorClaims, CursorError> {
    let (payload_b64, mac_b64) = cursor.split_once('.').ok_or(CursorError::Malformed)?;
    let payload = URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| CursorError::Malformed)?;
    let provided_mac = URL_SAFE_NO_PAD
        .decode(mac_b64)
        .map_err(|_| CursorError::Malformed)?;

    // Signature first: the payload is untrusted input until the MAC holds.
    let expected_mac = sign(&payload, secret);
    let same_len = provided_mac.len() == expected_mac.len();
    if !same_len || !bool::from(provided_mac.ct_eq(&expected_mac)) {
        return Err(CursorError::InvalidSignature);
    }

    let claims: CursorClaims =
        serde_json::from_slice(&payload).map_err(|_| CursorError::Malformed)?;

    if now.saturating_sub(claims.issued_at) > CURSOR_TTL.as_secs() {
        return Err(CursorError::Expired);
    }

    if claims.filter.is_some() && claims.filter.as_deref() != filter {
        return Err(CursorError::FilterMismatch);
    }

    Ok(claims)
}

/// Fingerprint of canonicalized filter parameters.
///
/// First 8 bytes of SHA-256 over the canonical string, hex-encoded.
/// Callers are responsible for canonicalization (sorted `key=value`
/// pairs) so that equivalent filter sets fingerprint identically.
pub fn filter_fingerprint(canonical: &str) -> String {
    let digest = Sha256::digest(canonical.as_bytes());
    hex::encode(&digest[..8])
}

fn sign(payload: &[u8], secret: &str) -> Vec<u8> {
    // HMAC accepts keys of any length; new_from_slice cannot fail.
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(payload);
    mac.finalize().into_bytes().to_vec()
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
