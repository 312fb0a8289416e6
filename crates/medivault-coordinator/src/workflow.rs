// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Access workflow — the request -> grant -> expiry state machine for
// delegated reads.  Requests are durable audit signals only; grants are the
// authorization the coordinator's read gate consults.

use chrono::{DateTime, Utc};
use tracing::{info, instrument};

use medivault_core::error::{MedivaultError, Result};
use medivault_core::types::{Identity, Receipt, RecordId, RequestId};
use medivault_ledger::LedgerStore;

/// Drives the delegated-access workflow against the ledger.
pub struct AccessWorkflow<L> {
    ledger: L,
}

impl<L: LedgerStore> AccessWorkflow<L> {
    pub fn new(ledger: L) -> Self {
        Self { ledger }
    }

    /// File an access request on behalf of `requester`.
    ///
    /// Generates a fresh request id and appends the request durably.  The
    /// request grants nothing; the owner acts on it out-of-band.
    #[instrument(skip_all, fields(record_id = %record_id, requester = %requester))]
    pub async fn request_access(
        &self,
        requester: &Identity,
        record_id: &RecordId,
        purpose: &str,
    ) -> Result<RequestId> {
        let request_id = RequestId::generate();
        self.file_request(&request_id, requester, record_id, purpose)
            .await?;
        Ok(request_id)
    }

    /// File an access request under a caller-supplied id.
    ///
    /// The ledger deduplicates on the id, so re-filing after an uncertain
    /// outcome is a safe no-op.
    #[instrument(skip_all, fields(request_id = %request_id, record_id = %record_id))]
    pub async fn file_request(
        &self,
        request_id: &RequestId,
        requester: &Identity,
        record_id: &RecordId,
        purpose: &str,
    ) -> Result<()> {
        self.ledger
            .file_access_request(request_id, record_id, purpose, requester)
            .await?;
        info!("access request filed");
        Ok(())
    }

    /// Grant `grantee` read access to a record until `expiry`.
    ///
    /// The anchored owner is pre-checked here so an obvious non-owner fails
    /// fast, but the ledger's own rejection is the authoritative
    /// enforcement — the local check is never trusted alone.
    #[instrument(skip_all, fields(record_id = %record_id, grantee = %grantee, grantor = %grantor))]
    pub async fn grant_access(
        &self,
        grantor: &Identity,
        record_id: &RecordId,
        grantee: &Identity,
        expiry: DateTime<Utc>,
    ) -> Result<Receipt> {
        if let Some(meta) = self.ledger.read_record_meta(record_id).await?
            && meta.owner != *grantor
        {
            return Err(MedivaultError::Unauthorized(format!(
                "{grantor} is not the owner of record {record_id}"
            )));
        }

        let receipt = self
            .ledger
            .grant_access(record_id, grantee, expiry, grantor)
            .await?;

        info!(%expiry, "access granted");
        Ok(receipt)
    }
}
