//! HMAC signatures and payload checksums for webhook intake.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Compute the HMAC-SHA256 signature over a raw webhook body.
///
/// Returns a hex-encoded signature string.
#[must_use]
pub fn compute_signature(secret: &str, body: &[u8]) -> String {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Verify a hex-encoded HMAC-SHA256 signature in constant time.
#[must_use]
pub fn verify_signature(expected_hex: &str, secret: &str, body: &[u8]) -> bool {
    let computed = compute_signature(secret, body);
    constant_time_eq(expected_hex.as_bytes(), computed.as_bytes())
}

/// SHA-256 checksum of a payload, hex-encoded. Part of the dedup key.
#[must_use]
pub fn payload_checksum(body: &[u8]) -> String {
    hex::encode(Sha256::digest(body))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_deterministic_and_hex() {
        let sig1 = compute_signature("secret", b"payload");
        let sig2 = compute_signature("secret", b"payload");
        assert_eq!(sig1, sig2);
        // SHA256 = 32 bytes = 64 hex chars
        assert_eq!(sig1.len(), 64);
        assert!(sig1.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_signature_changes_with_secret_and_body() {
        assert_ne!(
            compute_signature("secret1", b"payload"),
            compute_signature("secret2", b"payload")
        );
        assert_ne!(
            compute_signature("secret", b"payload1"),
            compute_signature("secret", b"payload2")
        );
    }

    #[test]
    fn test_verify_valid_and_invalid() {
        let sig = compute_signature("secret", b"body");
        assert!(verify_signature(&sig, "secret", b"body"));
        assert!(!verify_signature(&sig, "other", b"body"));
        assert!(!verify_signature("not-hex", "secret", b"body"));
    }

    #[test]
    fn test_checksum_distinguishes_payloads() {
        assert_eq!(payload_checksum(b"a"), payload_checksum(b"a"));
        assert_ne!(payload_checksum(b"a"), payload_checksum(b"b"));
    }
}
