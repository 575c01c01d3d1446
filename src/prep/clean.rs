//! Row cleaning.
//!
//! Bill and payment amounts are physically non-negative; any row with a negative
//! monetary field is discarded before encoding.

use crate::domain::CreditRecord;

/// Cleaner output: kept rows (original order) and how many were dropped.
#[derive(Debug, Clone)]
pub struct CleanedRecords {
    pub records: Vec<CreditRecord>,
    pub dropped: usize,
}

pub fn has_negative_monetary(record: &CreditRecord) -> bool {
    record.monetary_values().any(|v| v < 0.0)
}

/// Drop every row with a negative bill or payment amount.
///
/// Zero surviving rows is not an error here; downstream stages decide.
pub fn drop_negative_monetary(records: Vec<CreditRecord>) -> CleanedRecords {
    let before = records.len();
    let records: Vec<CreditRecord> = records.into_iter().filter(|r| !has_negative_monetary(r)).collect();
    CleanedRecords {
        dropped: before - records.len(),
        records,
    }
}
