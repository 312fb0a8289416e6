// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-record AEAD encryption — AES-256-GCM with a fresh random key per
// record and a random 96-bit nonce per sealing operation.
//
// Wire format: nonce (12 bytes) || ciphertext || tag (16 bytes), so that
// decryption is fully self-contained given the sealed bytes and the key.

use ring::aead::{AES_256_GCM, Aad, LessSafeKey, NONCE_LEN, Nonce, UnboundKey};
use ring::rand::{SecureRandom, SystemRandom};
use tracing::{debug, instrument};

use medivault_core::error::{MedivaultError, Result};

/// A record's 256-bit custody key.
///
/// Exists in plaintext only inside this crate's callers; it is wrapped by
/// [`crate::KeyCustodian`] before it ever reaches ledger-anchored storage.
#[derive(Clone, PartialEq, Eq)]
pub struct RecordKey([u8; Self::LEN]);

impl RecordKey {
    pub const LEN: usize = 32;

    pub fn from_bytes(bytes: [u8; Self::LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.0
    }
}

// Key material must never leak through logs.
impl std::fmt::Debug for RecordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RecordKey(..)")
    }
}

/// Stateless AEAD cipher for record payloads.
///
/// Holds only a handle to the system CSPRNG; each encrypt call draws a fresh
/// nonce, each `generate_key` call draws fresh key material.
pub struct RecordCipher {
    rng: SystemRandom,
}

impl Default for RecordCipher {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordCipher {
    pub fn new() -> Self {
        Self {
            rng: SystemRandom::new(),
        }
    }

    /// Generate a fresh 256-bit custody key from the system CSPRNG.
    pub fn generate_key(&self) -> Result<RecordKey> {
        let mut bytes = [0u8; RecordKey::LEN];
        self.rng
            .fill(&mut bytes)
            .map_err(|_| MedivaultError::EntropyUnavailable)?;
        Ok(RecordKey(bytes))
    }

    /// Seal `plaintext` under `key`.
    ///
    /// Returns `nonce || ciphertext || tag`.  The payload format is
    /// caller-defined; this layer sees only bytes.
    #[instrument(skip_all, fields(plaintext_len = plaintext.len()))]
    pub fn encrypt(&self, plaintext: &[u8], key: &RecordKey) -> Result<Vec<u8>> {
        let unbound = UnboundKey::new(&AES_256_GCM, key.as_bytes())
            .map_err(|_| MedivaultError::Encryption("invalid key material".into()))?;
        let sealing = LessSafeKey::new(unbound);

        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| MedivaultError::EntropyUnavailable)?;
        let nonce = Nonce::assume_unique_for_key(nonce_bytes);

        let mut in_out = plaintext.to_vec();
        sealing
            .seal_in_place_append_tag(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| MedivaultError::Encryption("AEAD seal failed".into()))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + in_out.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&in_out);

        debug!(sealed_len = sealed.len(), "payload sealed");
        Ok(sealed)
    }

    /// Open a sealed payload produced by [`encrypt`](Self::encrypt).
    ///
    /// Fails with `Decryption` on a wrong key or corrupted ciphertext —
    /// distinguishable from any not-found condition upstream, and always
    /// terminal: retrying with the same inputs cannot succeed.
    #[instrument(skip_all, fields(sealed_len = sealed.len()))]
    pub fn decrypt(&self, sealed: &[u8], key: &RecordKey) -> Result<Vec<u8>> {
        if sealed.len() < NONCE_LEN + AES_256_GCM.tag_len() {
            return Err(MedivaultError::Decryption(format!(
                "sealed payload too short ({} bytes)",
                sealed.len()
            )));
        }

        let unbound = UnboundKey::new(&AES_256_GCM, key.as_bytes())
            .map_err(|_| MedivaultError::Decryption("invalid key material".into()))?;
        let opening = LessSafeKey::new(unbound);

        let nonce = Nonce::try_assume_unique_for_key(&sealed[..NONCE_LEN])
            .map_err(|_| MedivaultError::Decryption("malformed nonce".into()))?;

        let mut in_out = sealed[NONCE_LEN..].to_vec();
        let plaintext = opening
            .open_in_place(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| MedivaultError::Decryption("authentication failed".into()))?;

        debug!(plaintext_len = plaintext.len(), "payload opened");
        Ok(plaintext.to_vec())
    }
}
