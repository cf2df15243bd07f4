//! Result poller: wait for an analysis job to reach a terminal state.
//!
//! ```text
//!            ┌──────── sleep(interval) ─── GET handle ────────┐
//!            ▼                                                │
//!   notStarted / running ──────────────────────────────────────┘
//!            │
//!            ├── succeeded ─▶ Ok(body)
//!            ├── failed    ─▶ Err(AnalysisFailed)
//!            └── attempt budget spent ─▶ Err(PollingTimeout)
//! ```
//!
//! The delay is fixed; there is no backoff growth. Every request is
//! preceded by one sleep, and at most `max_poll_attempts` GETs are issued.
//! The loop observes a [`CancellationToken`] during both the sleep and the
//! request so a torn-down caller abandons the job promptly.

use crate::error::CardScanError;
use crate::pipeline::analyze::{AnalysisClient, AnalysisJobHandle};
use serde_json::Value;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// The vendor's raw JSON body of a succeeded job.
pub type AnalysisResult = Value;

/// Status of a remote analysis job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    NotStarted,
    Running,
    Succeeded,
    Failed,
    /// A status this client does not know; treated as still pending.
    Other(String),
}

impl JobStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "notStarted" => JobStatus::NotStarted,
            "running" => JobStatus::Running,
            "succeeded" => JobStatus::Succeeded,
            "failed" => JobStatus::Failed,
            other => JobStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::NotStarted => "notStarted",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
            JobStatus::Other(s) => s,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

/// A finished job together with how many polls it took.
#[derive(Debug, Clone)]
pub struct PollOutcome {
    pub result: AnalysisResult,
    pub attempts: u32,
}

/// Poll `handle` until the job succeeds, fails, or the attempt budget runs out.
pub async fn poll(
    client: &AnalysisClient,
    handle: &AnalysisJobHandle,
    cancel: &CancellationToken,
) -> Result<PollOutcome, CardScanError> {
    let config = client.config();
    let max_attempts = config.max_poll_attempts;
    let interval = config.poll_interval();

    for attempt in 1..=max_attempts {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(CardScanError::Cancelled),
            _ = sleep(interval) => {}
        }

        let reply = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(CardScanError::Cancelled),
            reply = client.transport().get(handle.as_str(), &config.api_key) => reply?,
        };

        if !reply.is_success() {
            return Err(CardScanError::RemoteService {
                status: reply.status,
                body: reply.body_text(),
            });
        }

        let body: Value = serde_json::from_slice(&reply.body).map_err(|e| {
            CardScanError::MalformedResponse(format!("poll body is not JSON: {e}"))
        })?;
        let status = body
            .get("status")
            .and_then(Value::as_str)
            .map(JobStatus::parse)
            .ok_or_else(|| {
                CardScanError::MalformedResponse("poll body has no 'status' field".into())
            })?;

        if let Some(ref cb) = config.progress_callback {
            cb.on_poll(attempt, max_attempts, status.as_str());
        }

        match status {
            JobStatus::Succeeded => {
                debug!("Job succeeded after {} poll(s)", attempt);
                return Ok(PollOutcome {
                    result: body,
                    attempts: attempt,
                });
            }
            JobStatus::Failed => {
                return Err(CardScanError::AnalysisFailed {
                    message: failure_message(&body),
                });
            }
            JobStatus::Other(ref s) => {
                warn!("Poll {}/{}: unknown job status '{}'", attempt, max_attempts, s);
            }
            JobStatus::NotStarted | JobStatus::Running => {
                debug!("Poll {}/{}: {}", attempt, max_attempts, status.as_str());
            }
        }
    }

    Err(CardScanError::PollingTimeout {
        attempts: max_attempts,
    })
}

/// Best description of why a job failed: `error.message`, nested
/// `error.innererror.message`, or the error code.
fn failure_message(body: &Value) -> String {
    let error = body.get("error");
    let pick = |v: Option<&Value>, key: &str| {
        v.and_then(|e| e.get(key))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    pick(error, "message")
        .or_else(|| pick(error.and_then(|e| e.get("innererror")), "message"))
        .or_else(|| pick(error, "code"))
        .unwrap_or_else(|| "no error details returned".to_string())
}
