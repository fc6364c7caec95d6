//! CSV path: header row plus one event per data row, columns matched by name.

use super::LogRecord;
use tracing::warn;

const DEFAULT_LOGIN_STATUS: &str = "success";

/// Column positions resolved from the header row.
struct Columns {
    username: Option<usize>,
    ip_address: Option<usize>,
    timestamp: Option<usize>,
    location: Option<usize>,
    device: Option<usize>,
    login_status: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &::csv::StringRecord) -> Self {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);
        Self {
            username: find("username"),
            ip_address: find("ip_address"),
            timestamp: find("timestamp"),
            location: find("location"),
            device: find("device"),
            login_status: find("login_status"),
        }
    }

    fn resolved(&self) -> impl Iterator<Item = usize> {
        [
            self.username,
            self.ip_address,
            self.timestamp,
            self.location,
            self.device,
            self.login_status,
        ]
        .into_iter()
        .flatten()
    }

    /// Build a record from a data row. A row too short to reach one of the
    /// named columns is rejected; unused trailing columns may be absent.
    fn build(&self, row: &::csv::StringRecord) -> Option<LogRecord> {
        if self.resolved().any(|i| i >= row.len()) {
            return None;
        }
        let get = |col: Option<usize>, default: &str| -> String {
            col.and_then(|i| row.get(i))
                .unwrap_or(default)
                .to_string()
        };
        Some(LogRecord {
            username: get(self.username, ""),
            ip_address: get(self.ip_address, ""),
            timestamp: get(self.timestamp, ""),
            location: get(self.location, ""),
            device: get(self.device, ""),
            login_status: get(self.login_status, DEFAULT_LOGIN_STATUS),
        })
    }
}

/// Parse CSV text with a header row. Rows that fail to decode or construct
/// are logged and dropped.
pub fn parse(input: &str) -> Vec<LogRecord> {
    let mut reader = ::csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(input.as_bytes());

    let headers = match reader.headers() {
        Ok(h) => h.clone(),
        Err(e) => {
            warn!(error = %e, "failed to read CSV header row");
            return Vec::new();
        }
    };
    let columns = Columns::from_headers(&headers);

    let mut records = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        match result {
            Ok(row) => match columns.build(&row) {
                Some(record) => records.push(record),
                None => warn!(
                    row = row_no + 1,
                    fields = row.len(),
                    expected = headers.len(),
                    "skipping CSV row with missing fields"
                ),
            },
            Err(e) => warn!(row = row_no + 1, error = %e, "skipping unreadable CSV row"),
        }
    }
    records
}
