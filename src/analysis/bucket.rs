//! Partition of assessed records into HIGH / MEDIUM / LOW tiers.

use crate::classify::{AssessedRecord, RiskLevel};
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RiskBuckets {
    pub high: Vec<AssessedRecord>,
    pub medium: Vec<AssessedRecord>,
    pub low: Vec<AssessedRecord>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BucketCounts {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl BucketCounts {
    pub fn total(&self) -> usize {
        self.high + self.medium + self.low
    }

    pub fn get(&self, level: RiskLevel) -> usize {
        match level {
            RiskLevel::High => self.high,
            RiskLevel::Medium => self.medium,
            RiskLevel::Low => self.low,
        }
    }
}

impl RiskBuckets {
    /// Bucket records by their risk level. Input order is kept within each
    /// bucket, so index-ordered input gives index-ordered buckets.
    pub fn from_assessed(records: Vec<AssessedRecord>) -> Self {
        let mut buckets = Self::default();
        for record in records {
            match record.risk_level {
                RiskLevel::High => buckets.high.push(record),
                RiskLevel::Medium => buckets.medium.push(record),
                RiskLevel::Low => buckets.low.push(record),
            }
        }
        buckets
    }

    pub fn counts(&self) -> BucketCounts {
        BucketCounts {
            high: self.high.len(),
            medium: self.medium.len(),
            low: self.low.len(),
        }
    }

    /// Reassemble the full record set in index order.
    pub fn into_records(self) -> Vec<AssessedRecord> {
        let mut all: Vec<AssessedRecord> = self
            .high
            .into_iter()
            .chain(self.medium)
            .chain(self.low)
            .collect();
        all.sort_by_key(|r| r.log_index);
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{merge_verdicts, Verdict};
    use crate::ingest::LogRecord;

    fn records(n: usize) -> Vec<LogRecord> {
        (0..n)
            .map(|i| LogRecord {
                username: format!("user{i}"),
                ip_address: format!("10.0.0.{i}"),
                timestamp: format!("2024-01-15T0{}:00:00", i % 10),
                location: "Somewhere".to_string(),
                device: "Laptop".to_string(),
                login_status: if i % 3 == 0 { "failed" } else { "success" }.to_string(),
            })
            .collect()
    }

    fn verdict(i: usize, level: RiskLevel) -> Verdict {
        Verdict {
            log_index: i,
            risk_level: level,
            risk_factors: vec![],
            explanation: String::new(),
        }
    }

    #[test]
    fn test_partition_keeps_index_order() {
        let recs = records(6);
        let verdicts = vec![
            verdict(4, RiskLevel::High),
            verdict(1, RiskLevel::High),
            verdict(2, RiskLevel::Medium),
        ];
        let buckets = RiskBuckets::from_assessed(merge_verdicts(&recs, &verdicts));

        let high: Vec<usize> = buckets.high.iter().map(|r| r.log_index).collect();
        let medium: Vec<usize> = buckets.medium.iter().map(|r| r.log_index).collect();
        let low: Vec<usize> = buckets.low.iter().map(|r| r.log_index).collect();
        assert_eq!(high, vec![1, 4]);
        assert_eq!(medium, vec![2]);
        assert_eq!(low, vec![0, 3, 5]);
        assert_eq!(
            buckets.counts(),
            BucketCounts {
                high: 2,
                medium: 1,
                low: 3
            }
        );
    }

    #[test]
    fn test_reunion_reproduces_merged_set() {
        let recs = records(25);
        let levels = [RiskLevel::High, RiskLevel::Medium, RiskLevel::Low];
        // Sparse, unordered, partly out of range.
        let verdicts: Vec<Verdict> = (0..40)
            .rev()
            .step_by(3)
            .map(|i| verdict(i, levels[i % 3]))
            .collect();
        let merged = merge_verdicts(&recs, &verdicts);
        let buckets = RiskBuckets::from_assessed(merged.clone());
        assert_eq!(buckets.counts().total(), recs.len());
        assert_eq!(buckets.into_records(), merged);
    }

    #[test]
    fn test_empty_input() {
        let buckets = RiskBuckets::from_assessed(Vec::new());
        assert_eq!(buckets.counts().total(), 0);
        assert_eq!(buckets.counts().get(RiskLevel::High), 0);
    }
}
