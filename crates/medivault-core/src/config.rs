// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Gateway client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Connection settings for an external gateway (ledger or blob store).
///
/// Clients are explicitly constructed from one of these — there is no
/// ambient or static connection state anywhere in the workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Base URL of the gateway, e.g. `http://localhost:8545`.
    pub endpoint: String,
    /// Bearer token sent with every request, if the gateway requires one.
    pub auth_token: Option<String>,
    /// Per-call timeout in milliseconds.  Elapsed timeouts surface as the
    /// matching `*Unavailable` error and are safe to retry.
    pub timeout_ms: u64,
}

impl GatewayConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            auth_token: None,
            timeout_ms: 30_000,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let config = GatewayConfig::new("http://localhost:5001");
        assert_eq!(config.endpoint, "http://localhost:5001");
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert!(config.auth_token.is_none());
    }

    #[test]
    fn builder_overrides() {
        let config = GatewayConfig::new("http://ledger:8545")
            .with_timeout(Duration::from_secs(5))
            .with_auth_token("secret");
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.auth_token.as_deref(), Some("secret"));
    }
}
