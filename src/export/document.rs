//! Renderer-independent model of the paginated report.

use crate::analysis::Analysis;
use crate::classify::RiskLevel;
use crate::ingest::LogRecord;

use super::tabular::FACTOR_SEPARATOR;

pub const REPORT_TITLE: &str = "Security Log Analysis Report";

#[derive(Debug, Clone, PartialEq)]
pub struct StatisticsRow {
    pub tier: RiskLevel,
    pub count: usize,
    /// Share of `logs_count`, one decimal place, e.g. `"33.3%"`.
    pub percentage: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HighRiskDetail {
    /// 1-based position of the record in the original batch.
    pub log_number: usize,
    pub record: LogRecord,
    pub risk_factors: String,
}

/// Everything the PDF shows, in display order.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportDocument {
    pub title: String,
    pub metadata: Vec<(String, String)>,
    pub risk_summary: String,
    pub statistics: Vec<StatisticsRow>,
    pub recommendations: Vec<String>,
    /// Empty when no record is HIGH; the section is then omitted.
    pub high_risk_details: Vec<HighRiskDetail>,
}

fn percentage(count: usize, total: usize) -> String {
    if total == 0 {
        return "0.0%".to_string();
    }
    format!("{:.1}%", count as f64 / total as f64 * 100.0)
}

impl ReportDocument {
    pub fn from_analysis(analysis: &Analysis) -> Self {
        let result = &analysis.analysis_result;
        let buckets = analysis.buckets();
        let counts = buckets.counts();

        let metadata = vec![
            ("Analysis ID".to_string(), analysis.analysis_id.to_string()),
            ("Date".to_string(), analysis.formatted_date()),
            ("Total Logs".to_string(), analysis.logs_count.to_string()),
            ("Overall Risk".to_string(), result.overall_risk_score.to_string()),
        ];

        let statistics = [RiskLevel::High, RiskLevel::Medium, RiskLevel::Low]
            .into_iter()
            .map(|tier| StatisticsRow {
                tier,
                count: counts.get(tier),
                percentage: percentage(counts.get(tier), analysis.logs_count),
            })
            .collect();

        let high_risk_details = buckets
            .high
            .into_iter()
            .map(|r| HighRiskDetail {
                log_number: r.log_index + 1,
                risk_factors: r.risk_factors.join(FACTOR_SEPARATOR),
                record: r.record,
            })
            .collect();

        Self {
            title: REPORT_TITLE.to_string(),
            metadata,
            risk_summary: result.risk_summary.clone(),
            statistics,
            recommendations: result.recommendations.clone(),
            high_risk_details,
        }
    }
}
