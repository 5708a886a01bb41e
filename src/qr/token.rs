//! Token codec: builds and parses the signed QR token blob.
//!
//! Wire format: `base64url( canonical_json(payload) + "|" + hex(hmac_sha256) )`
//! where the canonical JSON has fixed key order `ticket_id, event_id, ts` and
//! no inserted whitespace. The codec never verifies signatures; it only
//! carries the exact signed bytes to [`crate::qr::signature`] so formats can
//! be tested independently of cryptographic material.

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::qr::signature;

/// Separator between the canonical payload and the signature inside the
/// decoded blob. Reserved: the canonical JSON must not contain it.
const SEPARATOR: char = '|';

/// Signed assertion carried by a QR token. Field order is load-bearing:
/// serde_json serializes in declaration order and that exact byte sequence
/// is what gets signed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenPayload {
    pub ticket_id: String,
    pub event_id: i64,
    /// Start of the validity window, unix seconds.
    pub ts: i64,
}

/// Result of a structurally successful decode. `canonical` holds the exact
/// bytes the signature was computed over; verification must use these, never
/// a re-serialization of `payload`.
#[derive(Debug, Clone)]
pub struct DecodedToken {
    pub payload: TokenPayload,
    pub canonical: String,
    pub signature: String,
}

/// The token failed to decode: bad base64, missing or duplicated separator,
/// or a payload that does not parse into the required fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("malformed token")]
pub struct MalformedToken;

/// Serialize `payload` canonically, sign it with `secret`, and encode the
/// result as a URL-safe text token.
pub fn encode(payload: &TokenPayload, secret: &[u8]) -> String {
    let canonical =
        serde_json::to_string(payload).expect("token payload serialization is infallible");
    let sig = signature::sign(canonical.as_bytes(), secret);
    URL_SAFE.encode(format!("{canonical}{SEPARATOR}{sig}"))
}

/// Inverse of [`encode`], minus signature verification.
pub fn decode(token: &str) -> Result<DecodedToken, MalformedToken> {
    let blob = URL_SAFE.decode(token.trim()).map_err(|_| MalformedToken)?;
    let blob = String::from_utf8(blob).map_err(|_| MalformedToken)?;

    let (canonical, sig) = blob.rsplit_once(SEPARATOR).ok_or(MalformedToken)?;
    if canonical.contains(SEPARATOR) || sig.is_empty() {
        return Err(MalformedToken);
    }

    let payload: TokenPayload = serde_json::from_str(canonical).map_err(|_| MalformedToken)?;
    Ok(DecodedToken {
        payload,
        canonical: canonical.to_string(),
        signature: sig.to_string(),
    })
}

/// Best-effort extraction of the ticket id from a raw token, used to key the
/// rate limiter before any signature work happens. Deliberately lenient: a
/// forged token should still burn throttle attempts against the id it names.
pub fn peek_ticket_id(token: &str) -> Option<String> {
    let blob = URL_SAFE.decode(token.trim()).ok()?;
    let blob = String::from_utf8(blob).ok()?;
    let (canonical, _) = blob.rsplit_once(SEPARATOR)?;
    let value: serde_json::Value = serde_json::from_str(canonical).ok()?;
    value.get("ticket_id")?.as_str().map(str::to_owned)
}
