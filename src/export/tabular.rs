//! Flat CSV export: one row per record with a collaborator verdict, then a
//! summary block and a numbered recommendations block.

use super::ExportError;
use crate::analysis::Analysis;
use crate::classify::reconcile::index_verdicts;
use ::csv::{Writer, WriterBuilder};

pub const HEADER: [&str; 10] = [
    "Log_Number",
    "Username",
    "IP_Address",
    "Timestamp",
    "Location",
    "Device",
    "Login_Status",
    "Risk_Level",
    "Risk_Factors",
    "Explanation",
];

pub const FACTOR_SEPARATOR: &str = "; ";

/// Render the CSV export. Output depends only on `analysis`, so repeated
/// renders are byte-identical. Blocks are separated by a bare blank line.
pub fn render(analysis: &Analysis) -> Result<Vec<u8>, ExportError> {
    let mut out = record_block(analysis)?;
    for block in [summary_block(analysis)?, recommendation_block(analysis)?] {
        out.push(b'\n');
        out.extend_from_slice(&block);
    }
    Ok(out)
}

fn block_writer() -> Writer<Vec<u8>> {
    WriterBuilder::new().flexible(true).from_writer(Vec::new())
}

fn finish(wtr: Writer<Vec<u8>>) -> Result<Vec<u8>, ExportError> {
    wtr.into_inner().map_err(|e| ExportError::Io(e.into_error()))
}

fn record_block(analysis: &Analysis) -> Result<Vec<u8>, ExportError> {
    let mut wtr = block_writer();
    wtr.write_record(HEADER)?;

    let verdicts = index_verdicts(analysis.logs.len(), &analysis.analysis_result.log_analysis);
    let mut log_number = 0usize;
    for (index, log) in analysis.logs.iter().enumerate() {
        let Some(verdict) = verdicts.get(&index) else {
            continue;
        };
        log_number += 1;
        let number = log_number.to_string();
        let factors = verdict.risk_factors.join(FACTOR_SEPARATOR);
        let row: [&str; 10] = [
            &number,
            &log.username,
            &log.ip_address,
            &log.timestamp,
            &log.location,
            &log.device,
            &log.login_status,
            verdict.risk_level.as_str(),
            &factors,
            &verdict.explanation,
        ];
        wtr.write_record(row)?;
    }
    finish(wtr)
}

fn summary_block(analysis: &Analysis) -> Result<Vec<u8>, ExportError> {
    let result = &analysis.analysis_result;
    let mut wtr = block_writer();
    wtr.write_record(["Overall Risk Level", result.overall_risk_score.as_str()])?;
    wtr.write_record(["Risk Summary", result.risk_summary.as_str()])?;
    wtr.write_record(["Analysis Date", analysis.formatted_date().as_str()])?;
    finish(wtr)
}

fn recommendation_block(analysis: &Analysis) -> Result<Vec<u8>, ExportError> {
    let mut wtr = block_writer();
    wtr.write_record(["Recommendations"])?;
    for (i, recommendation) in analysis.analysis_result.recommendations.iter().enumerate() {
        wtr.write_record([(i + 1).to_string().as_str(), recommendation.as_str()])?;
    }
    finish(wtr)
}
