//! Password digests.
//!
//! Digests are the lowercase hex SHA-256 of the UTF-8 password with no salt,
//! so the same password always produces the same digest. Existing account
//! rows depend on this format.

use sha2::{Digest, Sha256};

/// Hash a password into its stored digest.
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// Check a candidate password against a stored digest.
///
/// The comparison does not short-circuit on the first differing byte.
pub fn verify_password(candidate: &str, stored_digest: &str) -> bool {
    let computed = hash_password(candidate);
    if computed.len() != stored_digest.len() {
        return false;
    }
    computed
        .bytes()
        .zip(stored_digest.bytes())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_deterministic() {
        assert_eq!(hash_password("hunter2"), hash_password("hunter2"));
        assert_ne!(hash_password("hunter2"), hash_password("hunter3"));
    }

    #[test]
    fn test_known_digest() {
        assert_eq!(
            hash_password("password"),
            "5e884898da28047151d0e56f8dc6292773603d0d6aabbdd62a11ef721d1542d8"
        );
    }

    #[test]
    fn test_verify_round_trip() {
        let stored = hash_password("correct horse");
        assert!(verify_password("correct horse", &stored));
        assert!(!verify_password("correct horse", &hash_password("correct horsex")));
    }

    #[test]
    fn test_verify_rejects_truncated_digest() {
        let stored = hash_password("abc");
        assert!(!verify_password("abc", &stored[..10]));
        assert!(!verify_password("abc", ""));
    }
}
