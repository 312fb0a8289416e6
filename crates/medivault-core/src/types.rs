// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Medivault record coordinator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an anchored record.
///
/// Caller-chosen or generated; immutable once the record is anchored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh record id (`record_<uuid>`).
    pub fn generate() -> Self {
        Self(format!("record_{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Content-derived identifier assigned by the blob store.
///
/// A pure function of the ciphertext bytes: re-uploading identical bytes
/// yields the identical id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentId(pub String);

impl ContentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A ledger account address identifying a caller, owner, or grantee.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity(pub String);

impl Identity {
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a filed access request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh request id (`req_<uuid>`).
    pub fn generate() -> Self {
        Self(format!("req_{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Authoritative record metadata as anchored on the ledger.
///
/// The coordinator treats this as a read-through view of ledger state, never
/// as a source of truth.  `custody_key_blob` is the record's symmetric key
/// wrapped to the escrow recipient — never plaintext key material.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordMeta {
    pub record_id: RecordId,
    pub content_id: ContentId,
    pub record_type: String,
    pub owner: Identity,
    pub custody_key_blob: Vec<u8>,
    /// False only after an explicit revoke; revoked records stay anchored.
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// A time-bounded delegation of read permission from a record's owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessGrant {
    pub record_id: RecordId,
    pub grantee: Identity,
    pub expiry: DateTime<Utc>,
    pub granted_by: Identity,
}

impl AccessGrant {
    /// Expiry policy: a grant is void once `now >= expiry`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiry
    }
}

/// An audit-trail signal that some identity wants access to a record.
///
/// Carries no authorization weight by itself; the owner acts on it
/// out-of-band.  Requests persist indefinitely and never expire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessRequest {
    pub request_id: RequestId,
    pub record_id: RecordId,
    pub requester: Identity,
    pub purpose: String,
}

/// Result of a state-changing ledger call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    /// Transaction id assigned by the ledger.
    pub tx_id: String,
    /// Fee units the submission was estimated at.
    pub fee_units: u64,
    /// Unit price the submission was paid at.
    pub unit_price: u64,
}

/// Listing projection of an active record.
///
/// Deliberately excludes the payload — bulk listings never touch the blob
/// store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordSummary {
    pub record_id: RecordId,
    pub record_type: String,
    pub created_at: DateTime<Utc>,
    pub content_id: ContentId,
}

impl From<&RecordMeta> for RecordSummary {
    fn from(meta: &RecordMeta) -> Self {
        Self {
            record_id: meta.record_id.clone(),
            record_type: meta.record_type.clone(),
            created_at: meta.created_at,
            content_id: meta.content_id.clone(),
        }
    }
}

/// Outcome of the create flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedRecord {
    pub record_id: RecordId,
    pub content_id: ContentId,
    /// `None` when a retried anchor was confirmed as already landed, so no
    /// fresh submission receipt exists.
    pub receipt: Option<Receipt>,
}

/// Outcome of the read flow: anchored metadata plus the decrypted payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordWithData {
    pub record_id: RecordId,
    pub record_type: String,
    pub owner: Identity,
    pub content_id: ContentId,
    pub created_at: DateTime<Utc>,
    pub data: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn generated_record_ids_are_unique() {
        let a = RecordId::generate();
        let b = RecordId::generate();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("record_"));
    }

    #[test]
    fn generated_request_ids_are_unique() {
        let a = RequestId::generate();
        let b = RequestId::generate();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("req_"));
    }

    #[test]
    fn grant_expiry_boundary() {
        let now = Utc::now();
        let grant = AccessGrant {
            record_id: RecordId::new("rec_1"),
            grantee: Identity::new("0xdoctor"),
            expiry: now,
            granted_by: Identity::new("0xpatient"),
        };

        // Expired exactly at the boundary (now >= expiry).
        assert!(grant.is_expired(now));
        assert!(grant.is_expired(now + Duration::seconds(1)));
        assert!(!grant.is_expired(now - Duration::seconds(1)));
    }

    #[test]
    fn summary_projects_meta_fields() {
        let meta = RecordMeta {
            record_id: RecordId::new("rec_1"),
            content_id: ContentId::new("abc123"),
            record_type: "lab".into(),
            owner: Identity::new("0xpatient"),
            custody_key_blob: vec![1, 2, 3],
            is_active: true,
            created_at: Utc::now(),
        };

        let summary = RecordSummary::from(&meta);
        assert_eq!(summary.record_id, meta.record_id);
        assert_eq!(summary.content_id, meta.content_id);
        assert_eq!(summary.record_type, "lab");
    }
}
