// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// HTTP ledger gateway client.
//
// State-changing operations follow the ledger's two-phase fee protocol:
//   POST /v1/estimate   {op}                        -> {units}
//   GET  /v1/fee-price                              -> {unit_price}
//   POST /v1/submit     {op, fee_units, unit_price} -> {tx_id}
// Reads:
//   GET  /v1/records/{id}                           -> anchored meta | 404
//   GET  /v1/records/{id}/access?caller=X           -> {allowed}
//   GET  /v1/patients/{owner}/records               -> {record_ids}
//
// All response shapes are typed and validated here at the client boundary;
// nothing loosely-typed escapes this module.

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use medivault_core::config::GatewayConfig;
use medivault_core::error::{MedivaultError, Result};
use medivault_core::types::{ContentId, Identity, Receipt, RecordId, RecordMeta, RequestId};

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// A state-changing ledger operation, as submitted to the gateway.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum LedgerOp<'a> {
    AnchorRecord {
        record_id: &'a str,
        content_id: &'a str,
        /// Wrapped custody key, hex-encoded for the JSON wire.
        custody_key_blob: String,
        record_type: &'a str,
        owner: &'a str,
    },
    FileAccessRequest {
        request_id: &'a str,
        record_id: &'a str,
        purpose: &'a str,
        requester: &'a str,
    },
    GrantAccess {
        record_id: &'a str,
        grantee: &'a str,
        expiry: DateTime<Utc>,
        grantor: &'a str,
    },
    RevokeRecord {
        record_id: &'a str,
        caller: &'a str,
    },
}

#[derive(Debug, Serialize)]
struct SubmitBody<'a> {
    #[serde(flatten)]
    op: &'a LedgerOp<'a>,
    fee_units: u64,
    unit_price: u64,
}

#[derive(Debug, Deserialize)]
struct EstimateResponse {
    units: u64,
}

#[derive(Debug, Deserialize)]
struct FeePriceResponse {
    unit_price: u64,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    tx_id: String,
}

#[derive(Debug, Deserialize)]
struct AccessResponse {
    allowed: bool,
}

#[derive(Debug, Deserialize)]
struct RecordIdsResponse {
    record_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

/// Anchored metadata as the gateway reports it.
#[derive(Debug, Deserialize)]
struct RecordMetaWire {
    record_id: String,
    content_id: String,
    record_type: String,
    owner: String,
    /// Hex-encoded wrapped custody key.
    custody_key_blob: String,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl RecordMetaWire {
    fn into_meta(self) -> Result<RecordMeta> {
        let custody_key_blob = hex::decode(&self.custody_key_blob).map_err(|e| {
            MedivaultError::LedgerUnavailable(format!("malformed custody key blob: {e}"))
        })?;
        Ok(RecordMeta {
            record_id: RecordId::new(self.record_id),
            content_id: ContentId::new(self.content_id),
            record_type: self.record_type,
            owner: Identity::new(self.owner),
            custody_key_blob,
            is_active: self.is_active,
            created_at: self.created_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Ledger gateway client bound to a single endpoint.
///
/// The per-call timeout is fixed at construction; elapsed timeouts surface
/// as `LedgerUnavailable` and are safe to retry (`anchor_record` retries
/// must go through `retry::anchor_with_recheck`).
#[derive(Clone)]
pub struct HttpLedgerClient {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpLedgerClient {
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &config.auth_token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| MedivaultError::Config(format!("invalid auth token: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .default_headers(headers)
            .build()
            .map_err(|e| MedivaultError::Config(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_owned(),
        })
    }

    /// Run the two-phase fee protocol for one state-changing operation.
    ///
    /// Estimation and the price read happen immediately before the
    /// submission they fund; a retried call re-runs all three steps.
    async fn submit(&self, op: LedgerOp<'_>) -> Result<Receipt> {
        let units = self.estimate(&op).await?;
        let unit_price = self.fee_price().await?;
        debug!(units, unit_price, "fee quote obtained");

        let response = self
            .client
            .post(format!("{}/v1/submit", self.endpoint))
            .json(&SubmitBody {
                op: &op,
                fee_units: units,
                unit_price,
            })
            .send()
            .await
            .map_err(transport_err)?;

        let status = response.status();
        if !status.is_success() {
            return Err(rejection_error(status, response).await);
        }

        let body: SubmitResponse = response.json().await.map_err(transport_err)?;
        info!(tx_id = %body.tx_id, "ledger submission accepted");
        Ok(Receipt {
            tx_id: body.tx_id,
            fee_units: units,
            unit_price,
        })
    }

    async fn estimate(&self, op: &LedgerOp<'_>) -> Result<u64> {
        let response = self
            .client
            .post(format!("{}/v1/estimate", self.endpoint))
            .json(op)
            .send()
            .await
            .map_err(transport_err)?;

        let status = response.status();
        if !status.is_success() {
            return Err(rejection_error(status, response).await);
        }

        let body: EstimateResponse = response.json().await.map_err(transport_err)?;
        Ok(body.units)
    }

    async fn fee_price(&self) -> Result<u64> {
        let response = self
            .client
            .get(format!("{}/v1/fee-price", self.endpoint))
            .send()
            .await
            .map_err(transport_err)?;

        if !response.status().is_success() {
            return Err(MedivaultError::LedgerUnavailable(format!(
                "fee-price returned status {}",
                response.status()
            )));
        }

        let body: FeePriceResponse = response.json().await.map_err(transport_err)?;
        Ok(body.unit_price)
    }
}

/// Map a reqwest transport failure to `LedgerUnavailable`.
fn transport_err(e: reqwest::Error) -> MedivaultError {
    MedivaultError::LedgerUnavailable(e.to_string())
}

/// Map a non-success gateway status to the ledger error taxonomy.
///
/// 403 is the ledger refusing the caller (owner-only operations), other 4xx
/// are rejections of the operation itself, 5xx is the ledger being unable to
/// answer.
async fn rejection_error(status: StatusCode, response: reqwest::Response) -> MedivaultError {
    let detail = match response.json::<ErrorResponse>().await {
        Ok(body) => body.error,
        Err(_) => format!("status {status}"),
    };

    if status == StatusCode::FORBIDDEN {
        MedivaultError::Unauthorized(detail)
    } else if status.is_client_error() {
        MedivaultError::LedgerRejected(detail)
    } else {
        MedivaultError::LedgerUnavailable(detail)
    }
}

impl super::LedgerStore for HttpLedgerClient {
    #[instrument(skip_all, fields(endpoint = %self.endpoint, record_id = %record_id))]
    async fn anchor_record(
        &self,
        record_id: &RecordId,
        content_id: &ContentId,
        custody_key_blob: &[u8],
        record_type: &str,
        owner: &Identity,
    ) -> Result<Receipt> {
        self.submit(LedgerOp::AnchorRecord {
            record_id: record_id.as_str(),
            content_id: content_id.as_str(),
            custody_key_blob: hex::encode(custody_key_blob),
            record_type,
            owner: owner.as_str(),
        })
        .await
    }

    #[instrument(skip_all, fields(endpoint = %self.endpoint, record_id = %record_id, caller = %caller))]
    async fn check_access(&self, record_id: &RecordId, caller: &Identity) -> Result<bool> {
        let response = self
            .client
            .get(format!(
                "{}/v1/records/{}/access",
                self.endpoint,
                record_id.as_str()
            ))
            .query(&[("caller", caller.as_str())])
            .send()
            .await
            .map_err(transport_err)?;

        let status = response.status();
        if !status.is_success() {
            return Err(rejection_error(status, response).await);
        }

        let body: AccessResponse = response.json().await.map_err(transport_err)?;
        debug!(allowed = body.allowed, "access check answered");
        Ok(body.allowed)
    }

    #[instrument(skip_all, fields(endpoint = %self.endpoint, record_id = %record_id))]
    async fn read_record_meta(&self, record_id: &RecordId) -> Result<Option<RecordMeta>> {
        let response = self
            .client
            .get(format!("{}/v1/records/{}", self.endpoint, record_id.as_str()))
            .send()
            .await
            .map_err(transport_err)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(rejection_error(status, response).await);
        }

        let wire: RecordMetaWire = response.json().await.map_err(transport_err)?;
        Ok(Some(wire.into_meta()?))
    }

    #[instrument(skip_all, fields(endpoint = %self.endpoint, owner = %owner))]
    async fn list_patient_records(&self, owner: &Identity) -> Result<Vec<RecordId>> {
        let response = self
            .client
            .get(format!(
                "{}/v1/patients/{}/records",
                self.endpoint,
                owner.as_str()
            ))
            .send()
            .await
            .map_err(transport_err)?;

        let status = response.status();
        if !status.is_success() {
            return Err(rejection_error(status, response).await);
        }

        let body: RecordIdsResponse = response.json().await.map_err(transport_err)?;
        debug!(count = body.record_ids.len(), "record ids listed");
        Ok(body.record_ids.into_iter().map(RecordId::new).collect())
    }

    #[instrument(skip_all, fields(endpoint = %self.endpoint, request_id = %request_id, record_id = %record_id))]
    async fn file_access_request(
        &self,
        request_id: &RequestId,
        record_id: &RecordId,
        purpose: &str,
        requester: &Identity,
    ) -> Result<()> {
        // The ledger deduplicates on request_id: a repeat filing is a
        // no-op success at the gateway, so no special handling here.
        self.submit(LedgerOp::FileAccessRequest {
            request_id: request_id.as_str(),
            record_id: record_id.as_str(),
            purpose,
            requester: requester.as_str(),
        })
        .await
        .map(|_| ())
    }

    #[instrument(skip_all, fields(endpoint = %self.endpoint, record_id = %record_id, grantee = %grantee))]
    async fn grant_access(
        &self,
        record_id: &RecordId,
        grantee: &Identity,
        expiry: DateTime<Utc>,
        grantor: &Identity,
    ) -> Result<Receipt> {
        self.submit(LedgerOp::GrantAccess {
            record_id: record_id.as_str(),
            grantee: grantee.as_str(),
            expiry,
            grantor: grantor.as_str(),
        })
        .await
    }

    #[instrument(skip_all, fields(endpoint = %self.endpoint, record_id = %record_id))]
    async fn revoke_record(&self, record_id: &RecordId, caller: &Identity) -> Result<Receipt> {
        self.submit(LedgerOp::RevokeRecord {
            record_id: record_id.as_str(),
            caller: caller.as_str(),
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ops_serialize_tagged() {
        let op = LedgerOp::GrantAccess {
            record_id: "rec_1",
            grantee: "0xdoctor",
            expiry: Utc::now(),
            grantor: "0xpatient",
        };
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["kind"], "grant_access");
        assert_eq!(json["grantee"], "0xdoctor");
    }

    #[test]
    fn submit_body_flattens_op() {
        let op = LedgerOp::RevokeRecord {
            record_id: "rec_1",
            caller: "0xpatient",
        };
        let body = SubmitBody {
            op: &op,
            fee_units: 21_000,
            unit_price: 7,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["kind"], "revoke_record");
        assert_eq!(json["fee_units"], 21_000);
        assert_eq!(json["unit_price"], 7);
    }

    #[test]
    fn meta_wire_decodes_custody_blob() {
        let wire = RecordMetaWire {
            record_id: "rec_1".into(),
            content_id: "abc".into(),
            record_type: "lab".into(),
            owner: "0xpatient".into(),
            custody_key_blob: hex::encode([7u8; 4]),
            is_active: true,
            created_at: Utc::now(),
        };
        let meta = wire.into_meta().unwrap();
        assert_eq!(meta.custody_key_blob, vec![7u8; 4]);
    }

    #[test]
    fn meta_wire_rejects_bad_hex() {
        let wire = RecordMetaWire {
            record_id: "rec_1".into(),
            content_id: "abc".into(),
            record_type: "lab".into(),
            owner: "0xpatient".into(),
            custody_key_blob: "zz-not-hex".into(),
            is_active: true,
            created_at: Utc::now(),
        };
        assert!(wire.into_meta().is_err());
    }
}
