// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// medivault-blob — client for the content-addressed blob store that holds
// encrypted record payloads.  The store is trusted for availability only;
// confidentiality comes from the ciphertext, integrity from the
// content-derived id.

pub mod http;
pub mod memory;

pub use http::HttpBlobStore;
pub use memory::MemoryBlobStore;

use medivault_core::error::Result;
use medivault_core::types::ContentId;

/// Client interface to a content-addressed blob store.
///
/// `put` is idempotent: storing identical bytes twice returns the identical
/// content id both times, without error.  Implementations map transport
/// failures to `StoreUnavailable` (retryable) and unknown ids to `NotFound`
/// (terminal).
#[allow(async_fn_in_trait)]
pub trait BlobStore {
    /// Store opaque bytes and return their content-derived identifier.
    async fn put(&self, bytes: &[u8]) -> Result<ContentId>;

    /// Fetch previously stored bytes by content id.
    async fn get(&self, id: &ContentId) -> Result<Vec<u8>>;
}
