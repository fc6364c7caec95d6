//! Response reconciliation: strict extraction of the structured result,
//! fallback synthesis, and the positional merge back onto records.

use super::{ClassificationResult, ClassifierOutcome, RiskLevel, Verdict};
use crate::ingest::LogRecord;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::{debug, warn};

pub const DEFAULT_SUMMARY_TRUNCATE_CHARS: usize = 200;
pub const NO_RISK_EXPLANATION: &str = "No specific risks identified";
const MISSING_SUMMARY: &str = "Analysis completed";

/// Tuning constants for synthesized results. The defaults are kept for
/// behavioral compatibility with earlier deployments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackPolicy {
    /// Longest raw-response prefix kept as the summary of an unparsed answer.
    pub summary_truncate_chars: usize,
    /// Recommendations used when the collaborator answered unusably.
    pub parse_recommendations: Vec<String>,
    /// Recommendations used when the collaborator could not be reached.
    pub call_failure_recommendations: Vec<String>,
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self {
            summary_truncate_chars: DEFAULT_SUMMARY_TRUNCATE_CHARS,
            parse_recommendations: vec![
                "Review all login attempts".to_string(),
                "Enable multi-factor authentication".to_string(),
            ],
            call_failure_recommendations: vec![
                "Manual review required".to_string(),
                "Check API configuration".to_string(),
            ],
        }
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Locate the first balanced `{ ... }` span. Braces inside JSON strings do
/// not count toward nesting.
pub fn extract_json_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Classify a raw response as parsed or unparsed.
pub fn parse_response(text: &str) -> ClassifierOutcome {
    let Some(span) = extract_json_span(text) else {
        debug!(len = text.len(), "no structured span in classifier response");
        return ClassifierOutcome::Unparsed(text.to_string());
    };
    match serde_json::from_str::<Value>(span) {
        Ok(Value::Object(map)) => ClassifierOutcome::Parsed(result_from_object(&map)),
        Ok(_) => {
            debug!("structured span is not an object");
            ClassifierOutcome::Unparsed(text.to_string())
        }
        Err(e) => {
            debug!(error = %e, "structured span failed to parse");
            ClassifierOutcome::Unparsed(text.to_string())
        }
    }
}

/// Lenient field extraction. Missing fields take defaults; verdicts without a
/// usable `log_index` are discarded.
fn result_from_object(map: &Map<String, Value>) -> ClassificationResult {
    let overall_risk_score = map
        .get("overall_risk_score")
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok())
        .unwrap_or(RiskLevel::Medium);

    let risk_summary = map
        .get("risk_summary")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| MISSING_SUMMARY.to_string());

    let log_analysis = match map.get("log_analysis") {
        Some(Value::Array(items)) => items.iter().filter_map(verdict_from_value).collect(),
        _ => Vec::new(),
    };

    let recommendations = map
        .get("recommendations")
        .map(string_list)
        .unwrap_or_default();

    ClassificationResult {
        overall_risk_score,
        risk_summary,
        log_analysis,
        recommendations,
    }
}

fn verdict_from_value(value: &Value) -> Option<Verdict> {
    let obj = value.as_object()?;
    let Some(log_index) = obj.get("log_index").and_then(index_from_value) else {
        debug!(entry = %value, "discarding verdict without a usable log_index");
        return None;
    };

    let risk_level = obj
        .get("risk_level")
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok())
        .unwrap_or(RiskLevel::Low);

    Some(Verdict {
        log_index,
        risk_level,
        risk_factors: obj.get("risk_factors").map(string_list).unwrap_or_default(),
        explanation: obj
            .get("explanation")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    })
}

fn index_from_value(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0 && f.fract() == 0.0).map(|f| f as u64))
            .and_then(|i| usize::try_from(i).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        Value::String(s) if !s.is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// Fallback
// ---------------------------------------------------------------------------

/// Collapse any outcome into a schema-complete result.
pub fn reconcile(outcome: ClassifierOutcome, policy: &FallbackPolicy) -> ClassificationResult {
    match outcome {
        ClassifierOutcome::Parsed(result) => result,
        ClassifierOutcome::Unparsed(raw) => ClassificationResult {
            overall_risk_score: RiskLevel::Medium,
            risk_summary: truncate_summary(&raw, policy.summary_truncate_chars),
            log_analysis: Vec::new(),
            recommendations: policy.parse_recommendations.clone(),
        },
        ClassifierOutcome::CallFailed(cause) => ClassificationResult {
            overall_risk_score: RiskLevel::Medium,
            risk_summary: format!("Analysis error: {}", cause),
            log_analysis: Vec::new(),
            recommendations: policy.call_failure_recommendations.clone(),
        },
    }
}

fn truncate_summary(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

/// A record with the verdict applied (or the default when none matched).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessedRecord {
    pub log_index: usize,
    #[serde(flatten)]
    pub record: LogRecord,
    pub risk_level: RiskLevel,
    pub risk_factors: Vec<String>,
    pub explanation: String,
}

impl AssessedRecord {
    fn with_verdict(log_index: usize, record: &LogRecord, verdict: &Verdict) -> Self {
        Self {
            log_index,
            record: record.clone(),
            risk_level: verdict.risk_level,
            risk_factors: verdict.risk_factors.clone(),
            explanation: verdict.explanation.clone(),
        }
    }

    fn unassessed(log_index: usize, record: &LogRecord) -> Self {
        Self {
            log_index,
            record: record.clone(),
            risk_level: RiskLevel::Low,
            risk_factors: Vec::new(),
            explanation: NO_RISK_EXPLANATION.to_string(),
        }
    }
}

/// Index verdicts by position. Out-of-range indices are dropped and the first
/// verdict for a position wins.
pub fn index_verdicts(record_count: usize, verdicts: &[Verdict]) -> HashMap<usize, &Verdict> {
    let mut by_index = HashMap::with_capacity(verdicts.len());
    for verdict in verdicts {
        if verdict.log_index >= record_count {
            warn!(
                log_index = verdict.log_index,
                record_count, "ignoring verdict for out-of-range log_index"
            );
            continue;
        }
        by_index.entry(verdict.log_index).or_insert(verdict);
    }
    by_index
}

/// Apply verdicts to records by position. Every record appears exactly once,
/// in index order.
pub fn merge_verdicts(records: &[LogRecord], verdicts: &[Verdict]) -> Vec<AssessedRecord> {
    let by_index = index_verdicts(records.len(), verdicts);
    records
        .iter()
        .enumerate()
        .map(|(i, record)| match by_index.get(&i) {
            Some(verdict) => AssessedRecord::with_verdict(i, record, verdict),
            None => AssessedRecord::unassessed(i, record),
        })
        .collect()
}
