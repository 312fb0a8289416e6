// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Custody key wrapping — age (X25519) encryption of per-record keys to the
// coordinator's escrow recipient.
//
// The anchored `custody_key_blob` is always a wrapped key, never plaintext.
// The escrow identity — not the grantee — holds the unwrap capability, so
// delegated reads keep working without owner interaction at read time; the
// coordinator only unwraps after ledger authorization has passed.

use std::io::{Read, Write};
use std::str::FromStr;

use tracing::{debug, instrument};

use medivault_core::error::{MedivaultError, Result};

use crate::cipher::RecordKey;

/// Escrow-side key wrapping handle.
///
/// Constructed from an age X25519 identity string
/// (`AGE-SECRET-KEY-1...`) supplied by deployment configuration.
pub struct KeyCustodian {
    identity: age::x25519::Identity,
}

impl KeyCustodian {
    /// Generate a fresh escrow identity (local development and tests).
    pub fn generate() -> Self {
        Self {
            identity: age::x25519::Identity::generate(),
        }
    }

    /// Parse an escrow identity from its Bech32 string form.
    pub fn from_identity_str(identity: &str) -> Result<Self> {
        let identity = age::x25519::Identity::from_str(identity)
            .map_err(|e| MedivaultError::Config(format!("invalid escrow identity: {e}")))?;
        Ok(Self { identity })
    }

    /// The public recipient string (`age1...`) keys are wrapped to.
    pub fn recipient(&self) -> String {
        self.identity.to_public().to_string()
    }

    /// Wrap a custody key to the escrow recipient.
    ///
    /// The output is a complete age file (header + payload) suitable for
    /// anchoring on the ledger as the record's `custody_key_blob`.
    #[instrument(skip_all)]
    pub fn wrap_key(&self, key: &RecordKey) -> Result<Vec<u8>> {
        let recipient = self.identity.to_public();
        let encryptor =
            age::Encryptor::with_recipients(std::iter::once(&recipient as &dyn age::Recipient))
                .map_err(|e| MedivaultError::KeyCustody(e.to_string()))?;

        let mut wrapped = Vec::new();
        let mut writer = encryptor
            .wrap_output(&mut wrapped)
            .map_err(|e| MedivaultError::KeyCustody(e.to_string()))?;

        writer
            .write_all(key.as_bytes())
            .map_err(|e| MedivaultError::KeyCustody(e.to_string()))?;

        writer
            .finish()
            .map_err(|e| MedivaultError::KeyCustody(e.to_string()))?;

        debug!(wrapped_len = wrapped.len(), "custody key wrapped");
        Ok(wrapped)
    }

    /// Unwrap a custody key blob previously produced by
    /// [`wrap_key`](Self::wrap_key).
    ///
    /// Only invoked after read authorization has succeeded.
    #[instrument(skip_all, fields(blob_len = blob.len()))]
    pub fn unwrap_key(&self, blob: &[u8]) -> Result<RecordKey> {
        let decryptor = age::Decryptor::new(blob)
            .map_err(|e| MedivaultError::KeyCustody(e.to_string()))?;

        let mut reader = decryptor
            .decrypt(std::iter::once(&self.identity as &dyn age::Identity))
            .map_err(|e| MedivaultError::KeyCustody(e.to_string()))?;

        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|e| MedivaultError::KeyCustody(e.to_string()))?;

        let raw: [u8; RecordKey::LEN] = bytes.try_into().map_err(|_| {
            MedivaultError::KeyCustody("wrapped blob did not contain a 256-bit key".into())
        })?;

        debug!("custody key unwrapped");
        Ok(RecordKey::from_bytes(raw))
    }
}
