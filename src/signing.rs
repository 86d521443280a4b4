//! HMAC-SHA256 payload signing.
//!
//! The signature covers the exact byte sequence of the opaque payload string.
//! Verification goes through the mac's own `verify_slice`, which compares in
//! constant time.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::PaymentError;

type HmacSha256 = Hmac<Sha256>;

/// Signs `payload` under `secret`, returning the hex-encoded MAC.
pub fn sign(secret: &str, payload: &str) -> Result<String, PaymentError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| PaymentError::Internal("signing key rejected".to_string()))?;
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verifies a hex-encoded signature against `payload` under `secret`.
/// Malformed hex counts as a mismatch; comparison is constant-time.
pub fn verify(secret: &str, payload: &str, signature: &str) -> bool {
    let expected = match hex::decode(signature) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };

    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(payload.as_bytes());
    mac.verify_slice(&expected).is_ok()
}
