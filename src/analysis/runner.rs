//! The analysis pipeline:
//! 1. Normalize the input batch (reject it when nothing survives)
//! 2. Build the classification request and make the single collaborator call
//! 3. Reconcile the response into a schema-complete result
//! 4. Persist the analysis
//! 5. Bucket the merged records for the caller

use super::{Analysis, RiskBuckets};
use crate::classify::{self, ClassificationRequest, Classifier, FallbackPolicy};
use crate::config::AppConfig;
use crate::ingest::{self, InputFormat};
use crate::storage::{AnalysisStore, StoreError};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("No valid log entries found in {format} input")]
    EmptyBatch { format: InputFormat },

    #[error("failed to persist analysis: {0}")]
    Storage(#[from] StoreError),
}

/// A finished, persisted analysis plus its bucketed view.
#[derive(Debug, Clone)]
pub struct AnalysisRun {
    pub analysis: Analysis,
    pub buckets: RiskBuckets,
}

/// Owns the collaborators for the ingest -> classify -> persist flow.
/// Cheap to share behind an `Arc`; holds no per-request state.
pub struct AnalysisPipeline {
    classifier: Arc<dyn Classifier>,
    store: Arc<dyn AnalysisStore>,
    fallback: FallbackPolicy,
    timeout: Duration,
}

impl AnalysisPipeline {
    pub fn new(
        classifier: Arc<dyn Classifier>,
        store: Arc<dyn AnalysisStore>,
        fallback: FallbackPolicy,
        timeout: Duration,
    ) -> Self {
        Self {
            classifier,
            store,
            fallback,
            timeout,
        }
    }

    pub fn from_config(
        classifier: Arc<dyn Classifier>,
        store: Arc<dyn AnalysisStore>,
        config: &AppConfig,
    ) -> Self {
        Self::new(
            classifier,
            store,
            config.fallback.clone(),
            Duration::from_secs(config.classifier.timeout_secs),
        )
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    pub fn store(&self) -> &dyn AnalysisStore {
        self.store.as_ref()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run the full pipeline on one input batch.
    pub async fn run(&self, input: &str, format: InputFormat) -> Result<AnalysisRun, PipelineError> {
        // 1. Normalize
        let logs = ingest::normalize(input, format);
        if logs.is_empty() {
            warn!(%format, "rejecting batch with no valid log entries");
            return Err(PipelineError::EmptyBatch { format });
        }
        info!(%format, records = logs.len(), "Starting log analysis");

        // 2. Classify
        let request = ClassificationRequest::for_records(&logs);
        let outcome = classify::classify(self.classifier.as_ref(), &request, self.timeout).await;

        // 3. Reconcile
        let result = classify::reconcile(outcome, &self.fallback);

        // 4. Persist
        let analysis = Analysis::new(format, logs, result);
        self.store.insert(&analysis).await?;

        // 5. Bucket
        let buckets = analysis.buckets();
        let counts = buckets.counts();
        info!(
            analysis_id = %analysis.analysis_id,
            overall = %analysis.analysis_result.overall_risk_score,
            high = counts.high,
            medium = counts.medium,
            low = counts.low,
            "Analysis complete"
        );

        Ok(AnalysisRun { analysis, buckets })
    }
}
