//! Analysis records and the pipeline that produces them.

pub mod bucket;
pub mod runner;

use crate::classify::{merge_verdicts, AssessedRecord, ClassificationResult};
use crate::ingest::{InputFormat, LogRecord};
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use self::bucket::{BucketCounts, RiskBuckets};
pub use self::runner::{AnalysisPipeline, AnalysisRun, PipelineError};

/// Display format for analysis timestamps in exports.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One persisted unit of work. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub analysis_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub source_format: InputFormat,
    pub logs_count: usize,
    pub logs: Vec<LogRecord>,
    pub analysis_result: ClassificationResult,
}

impl Analysis {
    pub fn new(source_format: InputFormat, logs: Vec<LogRecord>, result: ClassificationResult) -> Self {
        Self {
            analysis_id: Uuid::new_v4(),
            // Storage keeps microseconds; match it so a stored analysis reads back equal.
            created_at: Utc::now().trunc_subsecs(6),
            source_format,
            logs_count: logs.len(),
            logs,
            analysis_result: result,
        }
    }

    /// First 8 characters of the identifier, used in export file names.
    pub fn short_id(&self) -> String {
        self.analysis_id.to_string().chars().take(8).collect()
    }

    pub fn formatted_date(&self) -> String {
        self.created_at.format(DATE_FORMAT).to_string()
    }

    /// Records with their verdicts applied, in index order.
    pub fn assessed_records(&self) -> Vec<AssessedRecord> {
        merge_verdicts(&self.logs, &self.analysis_result.log_analysis)
    }

    pub fn buckets(&self) -> RiskBuckets {
        RiskBuckets::from_assessed(self.assessed_records())
    }
}
