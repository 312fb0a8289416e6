// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Record coordinator — the create and read flows.
//
// Create: KeyGenerated -> Encrypted -> Stored -> Anchored.  The anchor is
// the last step, so a failure anywhere leaves at worst an orphaned blob,
// never a ledger entry pointing at nothing.  There is no compensating
// rollback.
//
// Read: authorization gate -> meta -> blob -> unwrap -> decrypt.  A denial
// terminates before any blob-store or crypto work.

use tracing::{info, instrument, warn};

use medivault_blob::BlobStore;
use medivault_core::error::{MedivaultError, Result};
use medivault_core::types::{
    CreatedRecord, Identity, Receipt, RecordId, RecordSummary, RecordWithData,
};
use medivault_crypto::{KeyCustodian, RecordCipher};
use medivault_ledger::{LedgerStore, RetryConfig, anchor_with_recheck};

/// Coordinator tuning.
#[derive(Debug, Clone, Default)]
pub struct CoordinatorConfig {
    /// Retry policy for the anchor step of the create flow.
    pub anchor_retry: RetryConfig,
}

/// Orchestrates record lifecycle flows across injected client handles.
///
/// Stateless beyond its handles: concurrent flows share nothing, so creates
/// of distinct record ids proceed fully in parallel and same-id races are
/// serialised solely by the ledger's atomic anchor.
pub struct RecordCoordinator<L, B> {
    ledger: L,
    blobs: B,
    cipher: RecordCipher,
    custodian: KeyCustodian,
    config: CoordinatorConfig,
}

impl<L: LedgerStore, B: BlobStore> RecordCoordinator<L, B> {
    pub fn new(ledger: L, blobs: B, custodian: KeyCustodian) -> Self {
        Self::with_config(ledger, blobs, custodian, CoordinatorConfig::default())
    }

    pub fn with_config(
        ledger: L,
        blobs: B,
        custodian: KeyCustodian,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            ledger,
            blobs,
            cipher: RecordCipher::new(),
            custodian,
            config,
        }
    }

    /// Create a record: encrypt the payload under a fresh key, store the
    /// ciphertext, anchor content id and custody metadata on the ledger.
    ///
    /// `record_id` may be caller-chosen; a generated one is used otherwise.
    /// Any step's failure aborts the flow.  A failed create after the store
    /// step leaves an orphaned blob behind — accepted residual, since the
    /// blob is ciphertext addressed by a digest nobody references.
    #[instrument(skip_all, fields(owner = %owner, record_type))]
    pub async fn create_record(
        &self,
        owner: &Identity,
        payload: &serde_json::Value,
        record_type: &str,
        record_id: Option<RecordId>,
    ) -> Result<CreatedRecord> {
        let record_id = record_id.unwrap_or_else(RecordId::generate);

        let key = self.cipher.generate_key()?;
        let plaintext = serde_json::to_vec(payload)?;
        let sealed = self.cipher.encrypt(&plaintext, &key)?;

        let content_id = self.blobs.put(&sealed).await?;

        let wrapped = self.custodian.wrap_key(&key)?;
        let outcome = anchor_with_recheck(
            &self.ledger,
            &self.config.anchor_retry,
            &record_id,
            &content_id,
            &wrapped,
            record_type,
            owner,
        )
        .await?;

        info!(%record_id, %content_id, "record created");
        Ok(CreatedRecord {
            record_id,
            content_id,
            receipt: outcome.receipt(),
        })
    }

    /// Read a record on behalf of `caller`.
    ///
    /// The authorization gate runs first and a denial short-circuits: no
    /// meta, blob-store, or crypto work happens for an unauthorized caller.
    /// A decryption failure is terminal and reported — retrying with the
    /// same key cannot fix a wrong key or corrupted ciphertext.
    #[instrument(skip_all, fields(record_id = %record_id, caller = %caller))]
    pub async fn read_record(
        &self,
        record_id: &RecordId,
        caller: &Identity,
    ) -> Result<RecordWithData> {
        if !self.ledger.check_access(record_id, caller).await? {
            warn!("read denied");
            return Err(MedivaultError::AccessDenied(record_id.to_string()));
        }

        let meta = self
            .ledger
            .read_record_meta(record_id)
            .await?
            .ok_or_else(|| MedivaultError::RecordUnknown(record_id.to_string()))?;

        if !meta.is_active {
            return Err(MedivaultError::RecordInactive(record_id.to_string()));
        }

        let sealed = self.blobs.get(&meta.content_id).await?;
        let key = self.custodian.unwrap_key(&meta.custody_key_blob)?;
        let plaintext = self.cipher.decrypt(&sealed, &key)?;
        let data = serde_json::from_slice(&plaintext)?;

        info!("record read");
        Ok(RecordWithData {
            record_id: meta.record_id,
            record_type: meta.record_type,
            owner: meta.owner,
            content_id: meta.content_id,
            created_at: meta.created_at,
            data,
        })
    }

    /// List the caller's active records as summaries.
    ///
    /// Ids come from the ledger; each id's meta is fetched sequentially and
    /// inactive records are filtered out.  Payloads are never fetched here —
    /// a listing costs zero blob-store round trips.
    #[instrument(skip_all, fields(owner = %owner))]
    pub async fn list_patient_records(&self, owner: &Identity) -> Result<Vec<RecordSummary>> {
        let ids = self.ledger.list_patient_records(owner).await?;

        let mut summaries = Vec::with_capacity(ids.len());
        for id in &ids {
            if let Some(meta) = self.ledger.read_record_meta(id).await?
                && meta.is_active
            {
                summaries.push(RecordSummary::from(&meta));
            }
        }

        info!(total = ids.len(), active = summaries.len(), "records listed");
        Ok(summaries)
    }

    /// Revoke a record (owner-only; enforced by the ledger).
    ///
    /// The record stays anchored and enumerable; reads return
    /// `RecordInactive` from then on.
    #[instrument(skip_all, fields(record_id = %record_id, caller = %caller))]
    pub async fn revoke_record(&self, record_id: &RecordId, caller: &Identity) -> Result<Receipt> {
        let receipt = self.ledger.revoke_record(record_id, caller).await?;
        info!("record revoked");
        Ok(receipt)
    }
}
