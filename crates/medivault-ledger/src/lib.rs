// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// medivault-ledger — client for the access-control ledger that anchors
// record existence, custody metadata, grants, and access requests.
//
// The ledger is consumed as an opaque trusted oracle: this crate submits
// state changes (through the ledger's two-phase fee protocol) and reads
// state, but never interprets consensus or contract internals.

pub mod http;
pub mod memory;
pub mod retry;

pub use http::HttpLedgerClient;
pub use memory::MemoryLedger;
pub use retry::{AnchorOutcome, RetryConfig, anchor_with_recheck};

use chrono::{DateTime, Utc};

use medivault_core::error::Result;
use medivault_core::types::{ContentId, Identity, Receipt, RecordId, RecordMeta, RequestId};

/// Authorization-aware, transactional view over ledger state.
///
/// State-changing calls (`anchor_record`, `grant_access`, `revoke_record`,
/// `file_access_request`) run the ledger's two-phase fee protocol inside the
/// implementation: estimate the operation's fee units, read the current unit
/// price, submit with both.  A caller-level retry therefore re-quotes —
/// stale prices are never reused across attempts.
///
/// Reads (`check_access`, `read_record_meta`, `list_patient_records`) are
/// side-effect-free and safe to call concurrently.
#[allow(async_fn_in_trait)]
pub trait LedgerStore {
    /// Anchor a new record in one atomic state change.
    ///
    /// `custody_key_blob` is the wrapped (never plaintext) custody key.
    /// Fails with `LedgerRejected` if `record_id` is already anchored,
    /// `LedgerUnavailable` on transport or consensus timeout.
    async fn anchor_record(
        &self,
        record_id: &RecordId,
        content_id: &ContentId,
        custody_key_blob: &[u8],
        record_type: &str,
        owner: &Identity,
    ) -> Result<Receipt>;

    /// True iff `caller` is the record's owner or holds an unexpired grant.
    ///
    /// Expiry policy: a grant is void once `now >= expiry`.  Read-only.
    async fn check_access(&self, record_id: &RecordId, caller: &Identity) -> Result<bool>;

    /// Authoritative anchored metadata, or `None` if the ledger has no such
    /// id.  A revoked record (`is_active = false`) is returned, not `None`,
    /// so callers can distinguish inactive from unknown.
    async fn read_record_meta(&self, record_id: &RecordId) -> Result<Option<RecordMeta>>;

    /// Every record id ever anchored by `owner`, inactive ones included.
    async fn list_patient_records(&self, owner: &Identity) -> Result<Vec<RecordId>>;

    /// Durably append an access request.  Idempotent on duplicate
    /// `request_id`: the second filing is a no-op success.
    async fn file_access_request(
        &self,
        request_id: &RequestId,
        record_id: &RecordId,
        purpose: &str,
        requester: &Identity,
    ) -> Result<()>;

    /// Grant `grantee` read access until `expiry`.
    ///
    /// The ledger itself rejects non-owner grantors with `Unauthorized`;
    /// callers must not rely on local pre-checks alone.
    async fn grant_access(
        &self,
        record_id: &RecordId,
        grantee: &Identity,
        expiry: DateTime<Utc>,
        grantor: &Identity,
    ) -> Result<Receipt>;

    /// Owner-only: mark a record inactive.  The record stays anchored and
    /// enumerable; only reads stop being served.
    async fn revoke_record(&self, record_id: &RecordId, caller: &Identity) -> Result<Receipt>;
}
