//! Classification collaborator -- request building, the client seam, and
//! reconciliation of whatever comes back.

pub mod gemini;
pub mod reconcile;
pub mod request;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub use self::reconcile::{merge_verdicts, parse_response, reconcile, AssessedRecord, FallbackPolicy};
pub use self::request::ClassificationRequest;

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("classifier API key is not configured")]
    MissingApiKey,

    #[error("request to classifier failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("classifier returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("classifier response had no text content")]
    EmptyResponse,

    #[error("classifier did not answer within {0:?}")]
    Timeout(Duration),
}

/// Risk tier assigned to a single record or to a whole batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOW" => Ok(RiskLevel::Low),
            "MEDIUM" => Ok(RiskLevel::Medium),
            "HIGH" => Ok(RiskLevel::High),
            other => Err(format!("unknown risk level '{}'", other)),
        }
    }
}

/// The collaborator's judgment for one record, addressed by position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub log_index: usize,
    pub risk_level: RiskLevel,
    pub risk_factors: Vec<String>,
    pub explanation: String,
}

/// Schema-complete classification result. Either what the collaborator said,
/// or a fallback synthesized from [`FallbackPolicy`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub overall_risk_score: RiskLevel,
    pub risk_summary: String,
    pub log_analysis: Vec<Verdict>,
    pub recommendations: Vec<String>,
}

/// Outcome of one exchange with the collaborator.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifierOutcome {
    /// A structured result was found in the response.
    Parsed(ClassificationResult),
    /// The collaborator answered, but nothing usable could be extracted.
    Unparsed(String),
    /// No answer: transport, auth, quota, or timeout failure.
    CallFailed(String),
}

impl ClassifierOutcome {
    pub fn kind(&self) -> &'static str {
        match self {
            ClassifierOutcome::Parsed(_) => "parsed",
            ClassifierOutcome::Unparsed(_) => "unparsed",
            ClassifierOutcome::CallFailed(_) => "call_failed",
        }
    }
}

/// A text-completion collaborator. Each call is an independent exchange.
#[async_trait::async_trait]
pub trait Classifier: Send + Sync {
    /// Short identifier used in logs, e.g. `"gemini:gemini-2.0-flash"`.
    fn name(&self) -> String;

    /// Send one request and return the raw response text.
    async fn complete(&self, request: &ClassificationRequest) -> Result<String, ClassifyError>;
}

/// Run one classification exchange under an explicit timeout and tag the
/// result. Never returns an error; failures become [`ClassifierOutcome::CallFailed`].
pub async fn classify(
    classifier: &dyn Classifier,
    request: &ClassificationRequest,
    timeout: Duration,
) -> ClassifierOutcome {
    let started = std::time::Instant::now();
    let result = match tokio::time::timeout(timeout, classifier.complete(request)).await {
        Ok(r) => r,
        Err(_) => Err(ClassifyError::Timeout(timeout)),
    };

    let outcome = match result {
        Ok(text) => parse_response(&text),
        Err(e) => {
            tracing::error!(classifier = %classifier.name(), error = %e, "classifier call failed");
            ClassifierOutcome::CallFailed(e.to_string())
        }
    };
    tracing::info!(
        classifier = %classifier.name(),
        outcome = outcome.kind(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "classification exchange finished"
    );
    outcome
}

/// Send a trivial prompt to confirm the collaborator is reachable and the
/// credentials work.
pub async fn check_connectivity(
    classifier: &dyn Classifier,
    timeout: Duration,
) -> Result<String, ClassifyError> {
    let request = ClassificationRequest::connectivity_check();
    match tokio::time::timeout(timeout, classifier.complete(&request)).await {
        Ok(r) => r,
        Err(_) => Err(ClassifyError::Timeout(timeout)),
    }
}
