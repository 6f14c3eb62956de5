//! Hashing - SHA-256 for Revisions and Digests
//!
//! Revision markers and content digests are both plain SHA-256 hex strings.

use sha2::{Digest, Sha256};

/// Compute SHA-256 hash of bytes, return hex string
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Digest of rendered markup, as reported in a run report
pub fn content_digest(content: &str) -> String {
    sha256_hex(content.as_bytes())
}

mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{:02x}", b)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_deterministic() {
        let h1 = sha256_hex(b"<svg/>");
        let h2 = sha256_hex(b"<svg/>");
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
    }

    #[test]
    fn test_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_digest_differs_on_change() {
        assert_ne!(content_digest("<svg></svg>"), content_digest("<svg> </svg>"));
    }
}
