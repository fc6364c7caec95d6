//! Raw-text path: one event per line, pipe separated, fixed field order.
//!
//! `timestamp|username|ip_address|location|device|login_status`

use super::LogRecord;

pub const SEPARATOR: char = '|';
const MIN_FIELDS: usize = 6;

/// Parse delimited text. Blank lines and lines with fewer than six fields
/// are skipped; extra fields are ignored.
pub fn parse(input: &str) -> Vec<LogRecord> {
    input
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(parse_line)
        .collect()
}

fn parse_line(line: &str) -> Option<LogRecord> {
    let parts: Vec<&str> = line.split(SEPARATOR).map(str::trim).collect();
    if parts.len() < MIN_FIELDS {
        return None;
    }
    Some(LogRecord {
        timestamp: parts[0].to_string(),
        username: parts[1].to_string(),
        ip_address: parts[2].to_string(),
        location: parts[3].to_string(),
        device: parts[4].to_string(),
        login_status: parts[5].to_string(),
    })
}
