// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Medivault.

use thiserror::Error;

/// Top-level error type for all Medivault operations.
///
/// The variants mirror the three trust domains the coordinator spans: the
/// crypto unit, the blob store, and the ledger.  Transport-class failures
/// (`StoreUnavailable`, `LedgerUnavailable`) are the only ones safe to retry;
/// everything else is terminal for the current request.
#[derive(Debug, Error)]
pub enum MedivaultError {
    // -- Crypto unit --
    #[error("entropy source unavailable")]
    EntropyUnavailable,

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("decryption failed: {0}")]
    Decryption(String),

    #[error("key custody operation failed: {0}")]
    KeyCustody(String),

    // -- Blob store --
    #[error("blob store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("no blob stored under content id {0}")]
    NotFound(String),

    // -- Ledger --
    #[error("ledger rejected the operation: {0}")]
    LedgerRejected(String),

    #[error("ledger unavailable: {0}")]
    LedgerUnavailable(String),

    #[error("ledger refused the caller: {0}")]
    Unauthorized(String),

    #[error("no record anchored under id {0}")]
    RecordUnknown(String),

    #[error("record {0} has been revoked")]
    RecordInactive(String),

    // -- Coordinator --
    #[error("access denied to record {0}")]
    AccessDenied(String),

    // -- Ambient --
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl MedivaultError {
    /// Whether a caller may retry the failed operation with backoff.
    ///
    /// Only transport-class failures qualify; a rejected anchor, a failed
    /// authentication tag, or a missing record will not heal on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::StoreUnavailable(_) | Self::LedgerUnavailable(_)
        )
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, MedivaultError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_are_retryable() {
        assert!(MedivaultError::LedgerUnavailable("timeout".into()).is_retryable());
        assert!(MedivaultError::StoreUnavailable("connection reset".into()).is_retryable());
    }

    #[test]
    fn terminal_errors_are_not_retryable() {
        assert!(!MedivaultError::AccessDenied("rec_1".into()).is_retryable());
        assert!(!MedivaultError::Decryption("tag mismatch".into()).is_retryable());
        assert!(!MedivaultError::LedgerRejected("duplicate id".into()).is_retryable());
        assert!(!MedivaultError::EntropyUnavailable.is_retryable());
    }
}
