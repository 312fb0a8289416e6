// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Content integrity — SHA-256 hashing for content addressing.

use sha2::{Digest, Sha256};

use medivault_core::types::ContentId;

/// Compute the SHA-256 hash of `data` and return it as a lowercase hex string.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Derive the content id for a byte string.
///
/// A pure function of the bytes: identical input always yields the identical
/// id, which is what makes blob storage idempotent.
pub fn content_id_for(data: &[u8]) -> ContentId {
    ContentId::new(hash_bytes(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// SHA-256 of the empty byte slice (well-known constant).
    const EMPTY_SHA256: &str =
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn hash_empty_input() {
        assert_eq!(hash_bytes(b""), EMPTY_SHA256);
    }

    #[test]
    fn hash_known_value() {
        // SHA-256("hello") — verified against coreutils sha256sum.
        let expected = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";
        assert_eq!(hash_bytes(b"hello"), expected);
    }

    #[test]
    fn content_id_is_deterministic() {
        let a = content_id_for(b"ciphertext bytes");
        let b = content_id_for(b"ciphertext bytes");
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_bytes_distinct_ids() {
        assert_ne!(content_id_for(b"a"), content_id_for(b"b"));
    }
}
