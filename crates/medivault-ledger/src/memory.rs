// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory ledger — the full `LedgerStore` semantics (anchor uniqueness,
// owner-only mutations, grant expiry, request deduplication) over process
// memory.  Used by tests and local development; clones share state.
//
// Fee accounting is simulated: every state-changing call consumes one fresh
// quote (estimate + price), observable through `fee_quotes()` so tests can
// assert that retries re-quote.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tracing::debug;

use medivault_core::error::{MedivaultError, Result};
use medivault_core::types::{
    AccessGrant, AccessRequest, ContentId, Identity, Receipt, RecordId, RecordMeta, RequestId,
};

/// Base fee units charged for any submission; payload bytes cost extra.
const BASE_FEE_UNITS: u64 = 21_000;

#[derive(Default)]
struct LedgerState {
    records: HashMap<String, RecordMeta>,
    owner_index: HashMap<String, Vec<RecordId>>,
    grants: Vec<AccessGrant>,
    requests: HashMap<String, AccessRequest>,
    tx_counter: u64,
    quote_counter: u64,
    unit_price: u64,
}

#[derive(Clone)]
pub struct MemoryLedger {
    state: Arc<Mutex<LedgerState>>,
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(LedgerState {
                unit_price: 7,
                ..LedgerState::default()
            })),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, LedgerState>> {
        self.state
            .lock()
            .map_err(|_| MedivaultError::LedgerUnavailable("ledger lock poisoned".into()))
    }

    /// Number of fee quotes issued so far (one per submission attempt).
    pub fn fee_quotes(&self) -> u64 {
        self.state.lock().map(|s| s.quote_counter).unwrap_or(0)
    }

    /// Number of access requests on file.
    pub fn request_count(&self) -> usize {
        self.state.lock().map(|s| s.requests.len()).unwrap_or(0)
    }

    /// Number of grants on file (expired ones included — grants are never
    /// deleted, merely no longer honored).
    pub fn grant_count(&self) -> usize {
        self.state.lock().map(|s| s.grants.len()).unwrap_or(0)
    }

    /// Move the simulated fee market.
    pub fn set_unit_price(&self, unit_price: u64) {
        if let Ok(mut state) = self.state.lock() {
            state.unit_price = unit_price;
        }
    }
}

/// Issue a receipt for one submission, consuming a fresh fee quote.
fn issue_receipt(state: &mut LedgerState, payload_len: usize) -> Receipt {
    state.quote_counter += 1;
    state.tx_counter += 1;
    Receipt {
        tx_id: format!("tx_{:08}", state.tx_counter),
        fee_units: BASE_FEE_UNITS + payload_len as u64,
        unit_price: state.unit_price,
    }
}

impl super::LedgerStore for MemoryLedger {
    async fn anchor_record(
        &self,
        record_id: &RecordId,
        content_id: &ContentId,
        custody_key_blob: &[u8],
        record_type: &str,
        owner: &Identity,
    ) -> Result<Receipt> {
        let mut state = self.lock()?;

        if state.records.contains_key(record_id.as_str()) {
            return Err(MedivaultError::LedgerRejected(format!(
                "record id {record_id} already anchored"
            )));
        }

        let receipt = issue_receipt(&mut state, custody_key_blob.len());
        state.records.insert(
            record_id.as_str().to_owned(),
            RecordMeta {
                record_id: record_id.clone(),
                content_id: content_id.clone(),
                record_type: record_type.to_owned(),
                owner: owner.clone(),
                custody_key_blob: custody_key_blob.to_vec(),
                is_active: true,
                created_at: Utc::now(),
            },
        );
        state
            .owner_index
            .entry(owner.as_str().to_owned())
            .or_default()
            .push(record_id.clone());

        debug!(%record_id, %content_id, %owner, "record anchored");
        Ok(receipt)
    }

    async fn check_access(&self, record_id: &RecordId, caller: &Identity) -> Result<bool> {
        let state = self.lock()?;

        if let Some(meta) = state.records.get(record_id.as_str())
            && meta.owner == *caller
        {
            return Ok(true);
        }

        let now = Utc::now();
        Ok(state.grants.iter().any(|g| {
            g.record_id == *record_id && g.grantee == *caller && !g.is_expired(now)
        }))
    }

    async fn read_record_meta(&self, record_id: &RecordId) -> Result<Option<RecordMeta>> {
        let state = self.lock()?;
        Ok(state.records.get(record_id.as_str()).cloned())
    }

    async fn list_patient_records(&self, owner: &Identity) -> Result<Vec<RecordId>> {
        let state = self.lock()?;
        Ok(state
            .owner_index
            .get(owner.as_str())
            .cloned()
            .unwrap_or_default())
    }

    async fn file_access_request(
        &self,
        request_id: &RequestId,
        record_id: &RecordId,
        purpose: &str,
        requester: &Identity,
    ) -> Result<()> {
        let mut state = self.lock()?;

        if !state.records.contains_key(record_id.as_str()) {
            return Err(MedivaultError::LedgerRejected(format!(
                "no record anchored under id {record_id}"
            )));
        }

        // Deduplicated on request_id: a repeat filing is a no-op success.
        if state.requests.contains_key(request_id.as_str()) {
            debug!(%request_id, "duplicate access request ignored");
            return Ok(());
        }

        issue_receipt(&mut state, purpose.len());
        state.requests.insert(
            request_id.as_str().to_owned(),
            AccessRequest {
                request_id: request_id.clone(),
                record_id: record_id.clone(),
                requester: requester.clone(),
                purpose: purpose.to_owned(),
            },
        );

        debug!(%request_id, %record_id, %requester, "access request filed");
        Ok(())
    }

    async fn grant_access(
        &self,
        record_id: &RecordId,
        grantee: &Identity,
        expiry: chrono::DateTime<Utc>,
        grantor: &Identity,
    ) -> Result<Receipt> {
        let mut state = self.lock()?;

        let owner = match state.records.get(record_id.as_str()) {
            Some(meta) => meta.owner.clone(),
            None => {
                return Err(MedivaultError::LedgerRejected(format!(
                    "no record anchored under id {record_id}"
                )));
            }
        };

        // Authoritative owner check — rejected before any state mutates.
        if owner != *grantor {
            return Err(MedivaultError::Unauthorized(format!(
                "{grantor} is not the owner of record {record_id}"
            )));
        }

        let receipt = issue_receipt(&mut state, 0);
        state.grants.push(AccessGrant {
            record_id: record_id.clone(),
            grantee: grantee.clone(),
            expiry,
            granted_by: grantor.clone(),
        });

        debug!(%record_id, %grantee, %expiry, "access granted");
        Ok(receipt)
    }

    async fn revoke_record(&self, record_id: &RecordId, caller: &Identity) -> Result<Receipt> {
        let mut state = self.lock()?;

        let owner = match state.records.get(record_id.as_str()) {
            Some(meta) => meta.owner.clone(),
            None => {
                return Err(MedivaultError::LedgerRejected(format!(
                    "no record anchored under id {record_id}"
                )));
            }
        };

        if owner != *caller {
            return Err(MedivaultError::Unauthorized(format!(
                "{caller} is not the owner of record {record_id}"
            )));
        }

        let receipt = issue_receipt(&mut state, 0);
        if let Some(meta) = state.records.get_mut(record_id.as_str()) {
            meta.is_active = false;
        }

        debug!(%record_id, "record revoked");
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LedgerStore;
    use chrono::Duration;

    fn ids() -> (RecordId, ContentId, Identity) {
        (
            RecordId::new("rec_1"),
            ContentId::new("cid_1"),
            Identity::new("0xpatient"),
        )
    }

    async fn anchor_one(ledger: &MemoryLedger) -> (RecordId, Identity) {
        let (record_id, content_id, owner) = ids();
        ledger
            .anchor_record(&record_id, &content_id, b"wrapped", "lab", &owner)
            .await
            .unwrap();
        (record_id, owner)
    }

    #[tokio::test]
    async fn duplicate_anchor_rejected_first_record_untouched() {
        let ledger = MemoryLedger::new();
        let (record_id, content_id, owner) = ids();

        ledger
            .anchor_record(&record_id, &content_id, b"wrapped", "lab", &owner)
            .await
            .unwrap();

        let second = ledger
            .anchor_record(
                &record_id,
                &ContentId::new("other"),
                b"other",
                "scan",
                &Identity::new("0xintruder"),
            )
            .await;
        assert!(matches!(second, Err(MedivaultError::LedgerRejected(_))));

        let meta = ledger.read_record_meta(&record_id).await.unwrap().unwrap();
        assert_eq!(meta.content_id, content_id);
        assert_eq!(meta.record_type, "lab");
    }

    #[tokio::test]
    async fn owner_always_has_access() {
        let ledger = MemoryLedger::new();
        let (record_id, owner) = anchor_one(&ledger).await;
        assert!(ledger.check_access(&record_id, &owner).await.unwrap());
        assert!(
            !ledger
                .check_access(&record_id, &Identity::new("0xstranger"))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn grant_honored_until_expiry() {
        let ledger = MemoryLedger::new();
        let (record_id, owner) = anchor_one(&ledger).await;
        let doctor = Identity::new("0xdoctor");

        ledger
            .grant_access(&record_id, &doctor, Utc::now() + Duration::hours(1), &owner)
            .await
            .unwrap();
        assert!(ledger.check_access(&record_id, &doctor).await.unwrap());
    }

    #[tokio::test]
    async fn expired_grant_not_honored() {
        let ledger = MemoryLedger::new();
        let (record_id, owner) = anchor_one(&ledger).await;
        let doctor = Identity::new("0xdoctor");

        ledger
            .grant_access(&record_id, &doctor, Utc::now() - Duration::hours(1), &owner)
            .await
            .unwrap();
        assert!(!ledger.check_access(&record_id, &doctor).await.unwrap());
    }

    #[tokio::test]
    async fn non_owner_grant_is_unauthorized_and_mutates_nothing() {
        let ledger = MemoryLedger::new();
        let (record_id, _owner) = anchor_one(&ledger).await;
        let doctor = Identity::new("0xdoctor");

        let result = ledger
            .grant_access(
                &record_id,
                &doctor,
                Utc::now() + Duration::hours(1),
                &Identity::new("0xintruder"),
            )
            .await;

        assert!(matches!(result, Err(MedivaultError::Unauthorized(_))));
        assert_eq!(ledger.grant_count(), 0);
        assert!(!ledger.check_access(&record_id, &doctor).await.unwrap());
    }

    #[tokio::test]
    async fn access_request_is_idempotent() {
        let ledger = MemoryLedger::new();
        let (record_id, _owner) = anchor_one(&ledger).await;
        let request_id = RequestId::new("req_1");
        let doctor = Identity::new("0xdoctor");

        ledger
            .file_access_request(&request_id, &record_id, "consult", &doctor)
            .await
            .unwrap();
        ledger
            .file_access_request(&request_id, &record_id, "consult", &doctor)
            .await
            .unwrap();

        assert_eq!(ledger.request_count(), 1);
    }

    #[tokio::test]
    async fn revoke_is_owner_only_and_keeps_record_enumerable() {
        let ledger = MemoryLedger::new();
        let (record_id, owner) = anchor_one(&ledger).await;

        let denied = ledger
            .revoke_record(&record_id, &Identity::new("0xintruder"))
            .await;
        assert!(matches!(denied, Err(MedivaultError::Unauthorized(_))));

        ledger.revoke_record(&record_id, &owner).await.unwrap();

        let meta = ledger.read_record_meta(&record_id).await.unwrap().unwrap();
        assert!(!meta.is_active);
        // Inactive records still enumerate; filtering is the coordinator's job.
        assert_eq!(ledger.list_patient_records(&owner).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn every_submission_consumes_a_fresh_quote() {
        let ledger = MemoryLedger::new();
        let (record_id, owner) = anchor_one(&ledger).await;
        assert_eq!(ledger.fee_quotes(), 1);

        ledger.set_unit_price(11);
        let receipt = ledger
            .grant_access(
                &record_id,
                &Identity::new("0xdoctor"),
                Utc::now() + Duration::hours(1),
                &owner,
            )
            .await
            .unwrap();

        assert_eq!(ledger.fee_quotes(), 2);
        // The new price is observed, not the one from anchor time.
        assert_eq!(receipt.unit_price, 11);
    }
}
