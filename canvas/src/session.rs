//! Persistence collaborator and the submission lifecycle.
//!
//! The core never talks to a network directly. Hosts implement [`TestStore`]
//! (HTTP client, local directory, test mock) and the core drives it: saving an
//! authored test and submitting a student's answers.
//!
//! Submission is guarded by [`Submitter`]: at most one submission is in
//! flight at a time, and a failed one releases the guard so it can be
//! retried.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::authoring::AuthoringState;
use crate::error::ErrorCode;
use crate::persist::{PersistedTest, SaveError, to_persisted};
use crate::placement::{PlacementMap, PlacementRuntime};

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unreachable: {0}")]
    Transport(String),
    #[error("store rejected the request: {0}")]
    Rejected(String),
    #[error("store payload malformed: {0}")]
    Codec(#[from] serde_json::Error),
}

impl ErrorCode for StoreError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Transport(_) => "E_STORE_TRANSPORT",
            Self::Rejected(_) => "E_STORE_REJECTED",
            Self::Codec(_) => "E_STORE_CODEC",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("a submission is already in flight")]
    AlreadySubmitting,
    #[error("{placed} of {total} labels placed")]
    Incomplete { placed: usize, total: usize },
    #[error("submission failed: {0}")]
    Store(#[from] StoreError),
}

impl ErrorCode for SubmitError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::AlreadySubmitting => "E_SUBMITTING",
            Self::Incomplete { .. } => "E_INCOMPLETE",
            Self::Store(e) => e.error_code(),
        }
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistReceipt {
    pub test_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitReceipt {
    pub success: bool,
    pub score: u32,
}

/// Wall-clock bounds of one attempt, supplied by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTiming {
    pub started_at: OffsetDateTime,
    pub submitted_at: OffsetDateTime,
}

impl SessionTiming {
    /// Whole seconds between start and submit; never negative.
    #[must_use]
    pub fn time_taken(&self) -> u64 {
        let secs = (self.submitted_at - self.started_at).whole_seconds();
        u64::try_from(secs).unwrap_or(0)
    }
}

/// Anti-cheat counters collected by the host. Passed through untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegritySignals {
    pub caught_cheating: bool,
    pub visibility_change_times: u32,
}

/// Result record sent to the store on submit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionPayload {
    pub test_id: String,
    pub answers: PlacementMap,
    pub score: u32,
    #[serde(rename = "maxScore")]
    pub max_score: u32,
    pub time_taken: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub submitted_at: OffsetDateTime,
    pub caught_cheating: bool,
    pub visibility_change_times: u32,
}

// =============================================================================
// STORE TRAIT
// =============================================================================

/// Persistence collaborator. Transport, auth and retries belong to the
/// implementor.
#[async_trait::async_trait]
pub trait TestStore: Send + Sync {
    /// Store an authored test.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the store is unreachable or refuses the
    /// test.
    async fn persist_test(&self, test: &PersistedTest) -> Result<PersistReceipt, StoreError>;

    /// Record a student's result.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the store is unreachable or refuses the
    /// submission.
    async fn submit_result(&self, payload: &SubmissionPayload) -> Result<SubmitReceipt, StoreError>;
}

// =============================================================================
// SAVE
// =============================================================================

/// Validate, convert and persist the authored test.
///
/// Local state is untouched on failure so the author can retry.
///
/// # Errors
///
/// Returns [`SaveError`] for validation failures or a store failure.
pub async fn save_test<S>(store: &S, state: &AuthoringState) -> Result<PersistReceipt, SaveError>
where
    S: TestStore + ?Sized,
{
    let test = to_persisted(state)?;
    match store.persist_test(&test).await {
        Ok(receipt) => {
            info!(test_id = %receipt.test_id, blocks = test.blocks.len(), "test saved");
            Ok(receipt)
        }
        Err(e) => {
            warn!(error = %e, "test save failed");
            Err(e.into())
        }
    }
}

// =============================================================================
// SUBMIT
// =============================================================================

impl PlacementRuntime {
    /// Build the submission record for the current placements.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError::Incomplete`] until every label is placed.
    pub fn submission_payload(
        &self,
        test_id: impl Into<String>,
        timing: SessionTiming,
        signals: IntegritySignals,
    ) -> Result<SubmissionPayload, SubmitError> {
        if !self.can_submit() {
            return Err(SubmitError::Incomplete { placed: self.placements().len(), total: self.labels().len() });
        }
        let report = self.score();
        Ok(SubmissionPayload {
            test_id: test_id.into(),
            answers: self.placements().clone(),
            score: report.score,
            max_score: report.max_score,
            time_taken: timing.time_taken(),
            started_at: timing.started_at,
            submitted_at: timing.submitted_at,
            caught_cheating: signals.caught_cheating,
            visibility_change_times: signals.visibility_change_times,
        })
    }
}

/// Single-flight submission gate.
#[derive(Debug, Default)]
pub struct Submitter {
    in_flight: AtomicBool,
}

/// Clears the in-flight flag when the submission future completes or is
/// dropped.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Submitter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Send `payload` to the store unless another submission is in flight.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError::AlreadySubmitting`] while another call is
    /// pending, or [`SubmitError::Store`] when the store fails or reports the
    /// submission as unsuccessful.
    pub async fn submit<S>(&self, store: &S, payload: &SubmissionPayload) -> Result<SubmitReceipt, SubmitError>
    where
        S: TestStore + ?Sized,
    {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!(test_id = %payload.test_id, "duplicate submission ignored");
            return Err(SubmitError::AlreadySubmitting);
        }
        let _guard = InFlight(&self.in_flight);

        info!(test_id = %payload.test_id, score = payload.score, max_score = payload.max_score, "submitting result");
        let receipt = store.submit_result(payload).await.inspect_err(|e| {
            warn!(test_id = %payload.test_id, error = %e, "submission failed");
        })?;
        if !receipt.success {
            warn!(test_id = %payload.test_id, "store reported submission as unsuccessful");
            return Err(StoreError::Rejected(format!("test {}", payload.test_id)).into());
        }
        info!(test_id = %payload.test_id, score = receipt.score, "submission accepted");
        Ok(receipt)
    }
}
