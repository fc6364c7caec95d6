//! Export rendering. Both formats derive from a persisted [`Analysis`] alone;
//! rendering never calls the classifier and has no side effects.

pub mod document;
pub mod pdf;
pub mod tabular;

use crate::analysis::Analysis;
use crate::config::ExportConfig;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub use self::document::ReportDocument;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV encoding failed: {0}")]
    Csv(#[from] ::csv::Error),

    #[error("I/O error while rendering export: {0}")]
    Io(#[from] std::io::Error),

    #[error("no usable '{family}' fonts found (searched: {searched})")]
    FontsUnavailable { family: String, searched: String },

    #[error("PDF rendering failed: {0}")]
    Pdf(#[from] genpdf::error::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Pdf,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Pdf => "pdf",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Pdf => "application/pdf",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "pdf" => Ok(ExportFormat::Pdf),
            other => Err(format!("unknown export format '{}': expected csv or pdf", other)),
        }
    }
}

/// `log_analysis_<first 8 chars of id>.<ext>`
pub fn file_name(analysis: &Analysis, format: ExportFormat) -> String {
    format!("log_analysis_{}.{}", analysis.short_id(), format.extension())
}

/// Render `analysis` in the requested format.
pub fn render(
    analysis: &Analysis,
    format: ExportFormat,
    config: &ExportConfig,
) -> Result<Vec<u8>, ExportError> {
    let bytes = match format {
        ExportFormat::Csv => tabular::render(analysis)?,
        ExportFormat::Pdf => pdf::render(&ReportDocument::from_analysis(analysis), config)?,
    };
    tracing::debug!(analysis_id = %analysis.analysis_id, %format, bytes = bytes.len(), "rendered export");
    Ok(bytes)
}
