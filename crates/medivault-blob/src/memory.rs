// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory blob store — content ids are SHA-256 hex digests of the bytes.
// Used by tests and local development; shares state across clones so a
// coordinator and a test can observe the same store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::debug;

use medivault_core::error::{MedivaultError, Result};
use medivault_core::types::ContentId;
use medivault_crypto::content_id_for;

#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct blobs currently stored.
    pub fn len(&self) -> usize {
        self.blobs.lock().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl super::BlobStore for MemoryBlobStore {
    async fn put(&self, bytes: &[u8]) -> Result<ContentId> {
        let id = content_id_for(bytes).0;

        let mut blobs = self
            .blobs
            .lock()
            .map_err(|_| MedivaultError::StoreUnavailable("store lock poisoned".into()))?;

        // Idempotent: identical bytes hash to the same id, so a repeat put
        // is a no-op that still reports the id.
        blobs.entry(id.clone()).or_insert_with(|| bytes.to_vec());

        debug!(content_id = %id, len = bytes.len(), "blob stored in memory");
        Ok(ContentId::new(id))
    }

    async fn get(&self, id: &ContentId) -> Result<Vec<u8>> {
        let blobs = self
            .blobs
            .lock()
            .map_err(|_| MedivaultError::StoreUnavailable("store lock poisoned".into()))?;

        blobs
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| MedivaultError::NotFound(id.as_str().to_owned()))
    }
}
