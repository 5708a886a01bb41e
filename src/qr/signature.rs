//! Keyed-hash sign/verify primitive for QR token payloads.
//!
//! HMAC-SHA256 over the exact canonical bytes of the payload. Any change to
//! field order, whitespace, or numeric formatting between sign and verify
//! breaks the signature, so callers must always sign and verify the same
//! canonical byte sequence (see [`crate::qr::token`]).

use constant_time_eq::constant_time_eq;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Sign `message` with `secret`, returning the lowercase hex digest.
pub fn sign(message: &[u8], secret: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts keys of any length");
    mac.update(message);
    hex::encode(mac.finalize().into_bytes())
}

/// Recompute the signature for `message` and compare it against
/// `signature_hex` in constant time.
pub fn verify(message: &[u8], secret: &[u8], signature_hex: &str) -> bool {
    let expected = sign(message, secret);
    constant_time_eq(expected.as_bytes(), signature_hex.as_bytes())
}
