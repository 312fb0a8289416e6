// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// HTTP blob store client speaking the IPFS-style gateway API:
//   POST /api/v0/add        (multipart upload, returns the content id)
//   POST /api/v0/cat?arg=X  (returns the stored bytes)

use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Deserialize;
use tracing::{debug, instrument};

use medivault_core::config::GatewayConfig;
use medivault_core::error::{MedivaultError, Result};
use medivault_core::types::ContentId;

/// Response body of `/api/v0/add`.
#[derive(Debug, Deserialize)]
struct AddResponse {
    #[serde(rename = "Hash")]
    hash: String,
}

/// Blob store client bound to a single gateway endpoint.
///
/// The per-call timeout is fixed at construction; an elapsed timeout
/// surfaces as `StoreUnavailable` and is safe to retry.
#[derive(Clone)]
pub struct HttpBlobStore {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpBlobStore {
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
}

/// Map a reqwest transport failure to `StoreUnavailable`.
fn transport_err(e: reqwest::Error) -> MedivaultError {
    MedivaultError::StoreUnavailable(e.to_string())
}

impl super::BlobStore for HttpBlobStore {
    #[instrument(skip_all, fields(endpoint = %self.endpoint, len = bytes.len()))]
    async fn put(&self, bytes: &[u8]) -> Result<ContentId> {
        let part = reqwest::multipart::Part::bytes(bytes.to_vec()).file_name("blob");
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(format!("{}/api/v0/add", self.endpoint))
            .multipart(form)
            .send()
            .await
            .map_err(transport_err)?;

        if !response.status().is_success() {
            return Err(MedivaultError::StoreUnavailable(format!(
                "add returned status {}",
                response.status()
            )));
        }

        let body: AddResponse = response.json().await.map_err(transport_err)?;
        if body.hash.is_empty() {
            return Err(MedivaultError::StoreUnavailable(
                "add response missing content id".into(),
            ));
        }

        debug!(content_id = %body.hash, "blob stored");
        Ok(ContentId::new(body.hash))
    }

    #[instrument(skip_all, fields(endpoint = %self.endpoint, content_id = %id))]
    async fn get(&self, id: &ContentId) -> Result<Vec<u8>> {
        let response = self
            .client
            .post(format!("{}/api/v0/cat", self.endpoint))
            .query(&[("arg", id.as_str())])
            .send()
            .await
            .map_err(transport_err)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(MedivaultError::NotFound(id.as_str().to_owned()));
        }
        if !status.is_success() {
            // Gateways report unknown ids inconsistently; an error body
            // naming the id as missing is still a NotFound, not an outage.
            let body = response.text().await.unwrap_or_default();
            if body.contains("not found") {
                return Err(MedivaultError::NotFound(id.as_str().to_owned()));
            }
            return Err(MedivaultError::StoreUnavailable(format!(
                "cat returned status {status}: {body}"
            )));
        }

        let bytes = response.bytes().await.map_err(transport_err)?;
        debug!(len = bytes.len(), "blob fetched");
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_trims_trailing_slash() {
        let store = HttpBlobStore::new(&GatewayConfig::new("http://localhost:5001/")).unwrap();
        assert_eq!(store.endpoint, "http://localhost:5001");
    }

    #[test]
    fn rejects_unprintable_auth_token() {
        let config = GatewayConfig::new("http://localhost:5001").with_auth_token("bad\ntoken");
        assert!(matches!(
            HttpBlobStore::new(&config),
            Err(MedivaultError::Config(_))
        ));
    }
}
