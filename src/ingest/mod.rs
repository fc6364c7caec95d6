//! Log normalization -- turns uploaded CSV or pipe-delimited text into an
//! ordered sequence of [`LogRecord`]s.
//!
//! The position of a record in the returned vector is its identity for the
//! rest of the pipeline. Nothing downstream re-sorts it.

pub mod csv;
pub mod delimited;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One authentication event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub username: String,
    pub ip_address: String,
    /// Free-form, kept exactly as supplied.
    pub timestamp: String,
    pub location: String,
    pub device: String,
    pub login_status: String,
}

/// Declared format of an input batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    Csv,
    Delimited,
}

impl fmt::Display for InputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputFormat::Csv => write!(f, "csv"),
            InputFormat::Delimited => write!(f, "delimited"),
        }
    }
}

impl FromStr for InputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(InputFormat::Csv),
            "delimited" | "raw" | "text" => Ok(InputFormat::Delimited),
            other => Err(format!("unknown input format '{}': expected csv or delimited", other)),
        }
    }
}

/// Parse `input` according to `format`, skipping rows that cannot be parsed.
pub fn normalize(input: &str, format: InputFormat) -> Vec<LogRecord> {
    let records = match format {
        InputFormat::Csv => csv::parse(input),
        InputFormat::Delimited => delimited::parse(input),
    };
    tracing::debug!(%format, records = records.len(), "normalized input batch");
    records
}
