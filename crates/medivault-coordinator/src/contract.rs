// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Boundary contract — the request/response shapes and status mapping the
// external routing layer consumes.  This module is data-only: it owns no
// sockets and performs no I/O.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use medivault_core::error::MedivaultError;
use medivault_core::types::{CreatedRecord, RecordSummary, RecordWithData};

/// Body of `POST /records`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRecordBody {
    pub patient_id: String,
    pub record_data: serde_json::Value,
    pub record_type: String,
}

/// Reply of `POST /records`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRecordReply {
    pub success: bool,
    pub record_id: String,
    pub content_id: String,
}

impl From<CreatedRecord> for CreateRecordReply {
    fn from(created: CreatedRecord) -> Self {
        Self {
            success: true,
            record_id: created.record_id.0,
            content_id: created.content_id.0,
        }
    }
}

/// Reply of `GET /records/{recordId}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordReply {
    pub success: bool,
    pub record: RecordView,
}

/// A record's anchored metadata plus its decrypted payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordView {
    pub record_id: String,
    pub record_type: String,
    pub owner: String,
    pub content_id: String,
    pub timestamp: DateTime<Utc>,
    pub data: serde_json::Value,
}

impl From<RecordWithData> for RecordReply {
    fn from(record: RecordWithData) -> Self {
        Self {
            success: true,
            record: RecordView {
                record_id: record.record_id.0,
                record_type: record.record_type,
                owner: record.owner.0,
                content_id: record.content_id.0,
                timestamp: record.created_at,
                data: record.data,
            },
        }
    }
}

/// Reply of `GET /patient/records`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientRecordsReply {
    pub success: bool,
    pub records: Vec<RecordSummaryView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSummaryView {
    pub record_id: String,
    pub record_type: String,
    pub timestamp: DateTime<Utc>,
    pub content_id: String,
}

impl From<Vec<RecordSummary>> for PatientRecordsReply {
    fn from(summaries: Vec<RecordSummary>) -> Self {
        Self {
            success: true,
            records: summaries
                .into_iter()
                .map(|s| RecordSummaryView {
                    record_id: s.record_id.0,
                    record_type: s.record_type,
                    timestamp: s.created_at,
                    content_id: s.content_id.0,
                })
                .collect(),
        }
    }
}

/// Body of `POST /access/request`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessRequestBody {
    pub record_id: String,
    pub purpose: String,
    pub requester_identity: String,
}

/// Body of `POST /access/grant`.  Caller identity comes from the session.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessGrantBody {
    pub record_id: String,
    pub grantee_identity: String,
    pub expiry: DateTime<Utc>,
}

/// Failure reply shared by every endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReply {
    pub success: bool,
    pub error: String,
}

impl ErrorReply {
    pub fn from_error(err: &MedivaultError) -> Self {
        Self {
            success: false,
            error: err.to_string(),
        }
    }
}

/// Map an error to the HTTP status the routing layer should answer with.
///
/// Every kind maps distinctly so callers can tell "not found" from "not
/// allowed" from "inactive" from "try again later".
pub fn http_status(err: &MedivaultError) -> u16 {
    match err {
        MedivaultError::AccessDenied(_) | MedivaultError::Unauthorized(_) => 403,
        MedivaultError::RecordUnknown(_) | MedivaultError::NotFound(_) => 404,
        MedivaultError::RecordInactive(_) => 410,
        MedivaultError::LedgerRejected(_) => 409,
        MedivaultError::LedgerUnavailable(_) | MedivaultError::StoreUnavailable(_) => 503,
        MedivaultError::EntropyUnavailable
        | MedivaultError::Encryption(_)
        | MedivaultError::Decryption(_)
        | MedivaultError::KeyCustody(_)
        | MedivaultError::Serialization(_)
        | MedivaultError::Config(_) => 500,
    }
}
