// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Retry policy for ledger submissions: exponential backoff with jitter for
// transport-class failures, plus the anchor recheck rule — a retried anchor
// must first consult the anchored meta, because the previous submission may
// have landed without an acknowledgement.

use std::time::Duration;

use tracing::{debug, info, warn};

use medivault_core::error::{MedivaultError, Result};
use medivault_core::types::{ContentId, Identity, Receipt, RecordId};

use crate::LedgerStore;

/// Classification of errors for retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Network blip, gateway timeout, consensus delay — safe to retry.
    Transient,
    /// Rejection, authorization failure, bad data — retrying cannot help.
    Permanent,
}

/// Retry configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts.
    pub max_retries: u32,
    /// Base delay between retries (exponential backoff).
    pub base_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 4,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

/// Result of evaluating whether to retry.
pub enum RetryDecision {
    /// Retry after this delay.
    RetryAfter(Duration),
    /// Do not retry — the error is permanent.
    GiveUp,
    /// Maximum retries exhausted.
    Exhausted,
}

/// Classify a `MedivaultError` for retry decisions.
///
/// Only the transport-class `*Unavailable` errors are transient; the rest of
/// the taxonomy is terminal for the current request.  Crypto failures in
/// particular are never retried.
pub fn classify_error(err: &MedivaultError) -> ErrorClass {
    if err.is_retryable() {
        ErrorClass::Transient
    } else {
        ErrorClass::Permanent
    }
}

/// Decide whether to retry based on the error class and attempt count.
pub fn should_retry(err: &MedivaultError, attempt: u32, config: &RetryConfig) -> RetryDecision {
    match classify_error(err) {
        ErrorClass::Permanent => {
            info!("permanent error — not retrying");
            RetryDecision::GiveUp
        }
        ErrorClass::Transient => {
            if attempt >= config.max_retries {
                warn!(attempt, max = config.max_retries, "retry limit exhausted");
                RetryDecision::Exhausted
            } else {
                let delay = compute_delay(attempt, config);
                debug!(attempt, delay_ms = delay.as_millis(), "scheduling retry");
                RetryDecision::RetryAfter(delay)
            }
        }
    }
}

/// Compute exponential backoff delay with jitter.
///
/// delay = min(base * 2^attempt + jitter, max_delay)
/// jitter is a value in [0, base) to prevent thundering herd.
fn compute_delay(attempt: u32, config: &RetryConfig) -> Duration {
    let base_ms = config.base_delay.as_millis() as u64;
    let exp_ms = base_ms.saturating_mul(1u64 << attempt.min(10));

    let jitter_ms = jitter(base_ms, attempt);
    let total_ms = exp_ms.saturating_add(jitter_ms);
    let capped_ms = total_ms.min(config.max_delay.as_millis() as u64);

    Duration::from_millis(capped_ms)
}

/// Deterministic jitter from a hash of the attempt number, spread across
/// [0, base).
fn jitter(base_ms: u64, attempt: u32) -> u64 {
    let hash = (attempt as u64).wrapping_mul(6364136223846793005);
    hash % base_ms.max(1)
}

/// Outcome of an anchor attempt that may have needed the recheck path.
#[derive(Debug)]
pub enum AnchorOutcome {
    /// The submission this call made was accepted.
    Submitted(Receipt),
    /// A previous, unacknowledged submission had already landed; no new
    /// submission was made.
    ConfirmedExisting,
}

impl AnchorOutcome {
    pub fn receipt(self) -> Option<Receipt> {
        match self {
            Self::Submitted(receipt) => Some(receipt),
            Self::ConfirmedExisting => None,
        }
    }
}

/// Anchor a record with transport-failure retries and the recheck rule.
///
/// `anchor_record` is the one operation in the design that is not naturally
/// idempotent: after a timeout the submission may still have landed.  Before
/// every retry (and before surfacing a duplicate rejection that follows a
/// timeout) the anchored meta is consulted; if it matches what this call was
/// anchoring, the anchor is reported as confirmed rather than re-submitted.
///
/// Each underlying attempt re-runs the two-phase fee quote inside the
/// client, so no stale price is ever reused.
pub async fn anchor_with_recheck<L: LedgerStore>(
    ledger: &L,
    config: &RetryConfig,
    record_id: &RecordId,
    content_id: &ContentId,
    custody_key_blob: &[u8],
    record_type: &str,
    owner: &Identity,
) -> Result<AnchorOutcome> {
    let mut attempt = 0u32;

    loop {
        let err = match ledger
            .anchor_record(record_id, content_id, custody_key_blob, record_type, owner)
            .await
        {
            Ok(receipt) => return Ok(AnchorOutcome::Submitted(receipt)),
            Err(e) => e,
        };

        match &err {
            MedivaultError::LedgerUnavailable(_) => {
                // The submission may have landed without an acknowledgement.
                if let Ok(Some(meta)) = ledger.read_record_meta(record_id).await {
                    return if meta.content_id == *content_id && meta.owner == *owner {
                        info!(%record_id, "anchor confirmed by recheck");
                        Ok(AnchorOutcome::ConfirmedExisting)
                    } else {
                        Err(MedivaultError::LedgerRejected(format!(
                            "record id {record_id} already anchored with different content"
                        )))
                    };
                }
            }
            MedivaultError::LedgerRejected(_) if attempt > 0 => {
                // A duplicate rejection right after a timed-out attempt is
                // most likely our own submission landing late.
                if let Ok(Some(meta)) = ledger.read_record_meta(record_id).await
                    && meta.content_id == *content_id
                    && meta.owner == *owner
                {
                    info!(%record_id, "anchor confirmed by recheck after duplicate rejection");
                    return Ok(AnchorOutcome::ConfirmedExisting);
                }
                return Err(err);
            }
            _ => return Err(err),
        }

        match should_retry(&err, attempt, config) {
            RetryDecision::RetryAfter(delay) => tokio::time::sleep(delay).await,
            RetryDecision::GiveUp | RetryDecision::Exhausted => return Err(err),
        }
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryLedger;
    use chrono::{DateTime, Utc};
    use medivault_core::types::{RecordMeta, RequestId};
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn unavailable_is_transient() {
        let err = MedivaultError::LedgerUnavailable("timed out".into());
        assert_eq!(classify_error(&err), ErrorClass::Transient);
    }

    #[test]
    fn rejection_is_permanent() {
        let err = MedivaultError::LedgerRejected("duplicate id".into());
        assert_eq!(classify_error(&err), ErrorClass::Permanent);
    }

    #[test]
    fn retry_respects_max() {
        let config = RetryConfig {
            max_retries: 3,
            ..Default::default()
        };
        let err = MedivaultError::LedgerUnavailable("connection refused".into());
        assert!(matches!(
            should_retry(&err, 0, &config),
            RetryDecision::RetryAfter(_)
        ));
        assert!(matches!(
            should_retry(&err, 3, &config),
            RetryDecision::Exhausted
        ));
    }

    #[test]
    fn permanent_error_never_retries() {
        let config = RetryConfig::default();
        let err = MedivaultError::Unauthorized("not the owner".into());
        assert!(matches!(should_retry(&err, 0, &config), RetryDecision::GiveUp));
    }

    #[test]
    fn delay_increases_with_attempts() {
        let config = RetryConfig::default();
        let d0 = compute_delay(0, &config);
        let d1 = compute_delay(1, &config);
        let d2 = compute_delay(2, &config);
        assert!(d1 > d0);
        assert!(d2 > d1);
    }

    #[test]
    fn delay_capped_at_max() {
        let config = RetryConfig {
            max_delay: Duration::from_secs(5),
            ..Default::default()
        };
        assert!(compute_delay(20, &config) <= Duration::from_secs(5));
    }

    /// Ledger whose anchor submissions land but whose acknowledgements are
    /// lost for the first `drop_acks` attempts.
    struct LossyLedger {
        inner: MemoryLedger,
        drop_acks: AtomicU32,
    }

    impl LedgerStore for LossyLedger {
        async fn anchor_record(
            &self,
            record_id: &RecordId,
            content_id: &ContentId,
            custody_key_blob: &[u8],
            record_type: &str,
            owner: &Identity,
        ) -> medivault_core::error::Result<Receipt> {
            let receipt = self
                .inner
                .anchor_record(record_id, content_id, custody_key_blob, record_type, owner)
                .await?;
            if self.drop_acks.load(Ordering::SeqCst) > 0 {
                self.drop_acks.fetch_sub(1, Ordering::SeqCst);
                return Err(MedivaultError::LedgerUnavailable(
                    "acknowledgement lost".into(),
                ));
            }
            Ok(receipt)
        }

        async fn check_access(
            &self,
            record_id: &RecordId,
            caller: &Identity,
        ) -> medivault_core::error::Result<bool> {
            self.inner.check_access(record_id, caller).await
        }

        async fn read_record_meta(
            &self,
            record_id: &RecordId,
        ) -> medivault_core::error::Result<Option<RecordMeta>> {
            self.inner.read_record_meta(record_id).await
        }

        async fn list_patient_records(
            &self,
            owner: &Identity,
        ) -> medivault_core::error::Result<Vec<RecordId>> {
            self.inner.list_patient_records(owner).await
        }

        async fn file_access_request(
            &self,
            request_id: &RequestId,
            record_id: &RecordId,
            purpose: &str,
            requester: &Identity,
        ) -> medivault_core::error::Result<()> {
            self.inner
                .file_access_request(request_id, record_id, purpose, requester)
                .await
        }

        async fn grant_access(
            &self,
            record_id: &RecordId,
            grantee: &Identity,
            expiry: DateTime<Utc>,
            grantor: &Identity,
        ) -> medivault_core::error::Result<Receipt> {
            self.inner
                .grant_access(record_id, grantee, expiry, grantor)
                .await
        }

        async fn revoke_record(
            &self,
            record_id: &RecordId,
            caller: &Identity,
        ) -> medivault_core::error::Result<Receipt> {
            self.inner.revoke_record(record_id, caller).await
        }
    }

    #[tokio::test]
    async fn recheck_confirms_unacknowledged_anchor() {
        let ledger = LossyLedger {
            inner: MemoryLedger::new(),
            drop_acks: AtomicU32::new(1),
        };
        let record_id = RecordId::new("rec_1");
        let content_id = ContentId::new("cid_1");
        let owner = Identity::new("0xpatient");

        let outcome = anchor_with_recheck(
            &ledger,
            &RetryConfig::default(),
            &record_id,
            &content_id,
            b"wrapped",
            "lab",
            &owner,
        )
        .await
        .expect("anchor should be confirmed");

        assert!(matches!(outcome, AnchorOutcome::ConfirmedExisting));
        // The record landed exactly once.
        let meta = ledger.read_record_meta(&record_id).await.unwrap().unwrap();
        assert_eq!(meta.content_id, content_id);
    }

    #[tokio::test]
    async fn recheck_rejects_foreign_anchor_under_same_id() {
        let inner = MemoryLedger::new();
        let record_id = RecordId::new("rec_1");
        inner
            .anchor_record(
                &record_id,
                &ContentId::new("cid_theirs"),
                b"theirs",
                "lab",
                &Identity::new("0xother"),
            )
            .await
            .unwrap();

        // First-attempt rejection with no prior timeout is a genuine
        // duplicate, surfaced as-is.
        let result = anchor_with_recheck(
            &inner,
            &RetryConfig::default(),
            &record_id,
            &ContentId::new("cid_ours"),
            b"ours",
            "lab",
            &Identity::new("0xpatient"),
        )
        .await;

        assert!(matches!(result, Err(MedivaultError::LedgerRejected(_))));
    }
}
