//! Shared fixtures for integration tests.
#![allow(dead_code)]

use logsentinel::analysis::AnalysisPipeline;
use logsentinel::classify::{ClassificationRequest, Classifier, ClassifyError, FallbackPolicy};
use logsentinel::storage::SqliteStore;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub const ALICE_LINE: &str = "2024-01-15T02:00:00|alice|10.0.0.5|Unknown|Unknown Device|failed";

pub const ALICE_HIGH_RESPONSE: &str = r#"```json
{
  "overall_risk_score": "HIGH",
  "risk_summary": "Failed login at an unusual hour from an unknown device.",
  "log_analysis": [
    {
      "log_index": 0,
      "risk_level": "HIGH",
      "risk_factors": ["unusual login time"],
      "explanation": "Login attempt at 02:00 from an unrecognized device."
    }
  ],
  "recommendations": ["Reset alice's password", "Enable MFA"]
}
```"#;

/// Canned collaborator that counts how often it is asked.
pub struct StubClassifier {
    reply: Result<String, (u16, String)>,
    calls: AtomicUsize,
}

impl StubClassifier {
    pub fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(text.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(status: u16, body: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Err((status, body.to_string())),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Classifier for StubClassifier {
    fn name(&self) -> String {
        "stub".to_string()
    }

    async fn complete(&self, _request: &ClassificationRequest) -> Result<String, ClassifyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err((status, body)) => Err(ClassifyError::Status {
                status: *status,
                body: body.clone(),
            }),
        }
    }
}

/// Pipeline over a throwaway SQLite file. Keep the `TempDir` alive for the test.
pub fn pipeline_with(classifier: Arc<StubClassifier>) -> (AnalysisPipeline, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open(&dir.path().join("analyses.db")).unwrap();
    let pipeline = AnalysisPipeline::new(
        classifier,
        Arc::new(store),
        FallbackPolicy::default(),
        Duration::from_secs(5),
    );
    (pipeline, dir)
}
