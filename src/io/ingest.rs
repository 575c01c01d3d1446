//! CSV ingest for the credit-card default dataset.
//!
//! - **Strict schema**: every feature column plus the label must be present; an
//!   `id` column is tolerated; any other column means the file is not the
//!   dataset this pipeline was built for (exit code 2).
//! - **Row-level validation**: unparseable rows are skipped and reported.
//! - No cleaning here; negative amounts are the cleaner's job.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use tracing::{info, warn};

use crate::domain::{
    BILL_AMOUNT_COLUMNS, CategoricalField, CreditRecord, LABEL_COLUMN, NUMERIC_COLUMNS, PAY_AMOUNT_COLUMNS,
    PAY_STATUS_COLUMNS,
};
use crate::error::AppError;

/// Accepted alternative name for the label column.
const LABEL_ALIAS: &str = "default";
const ID_COLUMN: &str = "id";

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub id: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct IngestedData {
    pub records: Vec<CreditRecord>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

pub fn load_records(path: &Path) -> Result<IngestedData, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;
    let data = read_records(file)?;
    info!(
        path = %path.display(),
        rows_read = data.rows_read,
        rows_used = data.records.len(),
        row_errors = data.row_errors.len(),
        "dataset loaded"
    );
    Ok(data)
}

pub fn read_records<R: Read>(reader: R) -> Result<IngestedData, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();
    let columns = Columns::resolve(&headers)?;

    let mut records = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // records() starts after the header line; CSV lines are 1-based.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    id: None,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match columns.parse_row(&record) {
            Ok(row) => records.push(row),
            Err(message) => row_errors.push(RowError {
                line,
                id: columns.id(&record),
                message,
            }),
        }
    }

    if !row_errors.is_empty() {
        warn!(skipped = row_errors.len(), "rows skipped during ingest");
    }

    Ok(IngestedData {
        records,
        row_errors,
        rows_read,
    })
}

/// Column indices resolved from the header line.
struct Columns {
    limit_bal: usize,
    age: usize,
    sex: usize,
    education: usize,
    marriage: usize,
    pay_status: [usize; 6],
    bill_amt: [usize; 6],
    pay_amt: [usize; 6],
    label: usize,
    id: Option<usize>,
}

impl Columns {
    fn resolve(headers: &StringRecord) -> Result<Self, AppError> {
        let header_map = build_header_map(headers)?;

        let label_name = if header_map.contains_key(LABEL_COLUMN) {
            LABEL_COLUMN
        } else {
            LABEL_ALIAS
        };

        let mut known: Vec<&str> = NUMERIC_COLUMNS.to_vec();
        known.extend(CategoricalField::ALL.map(CategoricalField::name));
        known.push(label_name);

        let missing: Vec<&str> = known
            .iter()
            .copied()
            .filter(|c| !header_map.contains_key(*c))
            .collect();
        if !missing.is_empty() {
            return Err(AppError::new(
                2,
                format!("Missing required column(s): {}", missing.join(", ")),
            ));
        }

        let mut unexpected: Vec<&str> = header_map
            .keys()
            .map(String::as_str)
            .filter(|c| *c != ID_COLUMN && !known.contains(c))
            .collect();
        if !unexpected.is_empty() {
            unexpected.sort_unstable();
            return Err(AppError::new(
                2,
                format!(
                    "Unexpected column(s): {}. The dataset schema has changed; refusing to train.",
                    unexpected.join(", ")
                ),
            ));
        }

        // Every lookup below is guaranteed by the checks above.
        let idx = |name: &str| header_map.get(name).copied().unwrap_or_default();
        Ok(Self {
            limit_bal: idx("limit_bal"),
            age: idx("age"),
            sex: idx(CategoricalField::Sex.name()),
            education: idx(CategoricalField::Education.name()),
            marriage: idx(CategoricalField::Marriage.name()),
            pay_status: PAY_STATUS_COLUMNS.map(idx),
            bill_amt: BILL_AMOUNT_COLUMNS.map(idx),
            pay_amt: PAY_AMOUNT_COLUMNS.map(idx),
            label: idx(label_name),
            id: header_map.get(ID_COLUMN).copied(),
        })
    }

    fn id(&self, record: &StringRecord) -> Option<String> {
        let idx = self.id?;
        record.get(idx).filter(|s| !s.is_empty()).map(str::to_string)
    }

    fn parse_row(&self, record: &StringRecord) -> Result<CreditRecord, String> {
        let label = parse_int(record, self.label, "label")?;
        let default = match label {
            0 => 0,
            1 => 1,
            other => return Err(format!("label must be 0 or 1, got {other}")),
        };

        let mut pay_status = [0; 6];
        for (slot, (&idx, name)) in pay_status.iter_mut().zip(self.pay_status.iter().zip(PAY_STATUS_COLUMNS)) {
            *slot = parse_int(record, idx, name)?;
        }
        let mut bill_amt = [0.0; 6];
        for (slot, (&idx, name)) in bill_amt.iter_mut().zip(self.bill_amt.iter().zip(BILL_AMOUNT_COLUMNS)) {
            *slot = parse_f64(record, idx, name)?;
        }
        let mut pay_amt = [0.0; 6];
        for (slot, (&idx, name)) in pay_amt.iter_mut().zip(self.pay_amt.iter().zip(PAY_AMOUNT_COLUMNS)) {
            *slot = parse_f64(record, idx, name)?;
        }

        Ok(CreditRecord {
            limit_bal: parse_f64(record, self.limit_bal, "limit_bal")?,
            sex: parse_int(record, self.sex, "sex")?,
            education: parse_int(record, self.education, "education")?,
            marriage: parse_int(record, self.marriage, "marriage")?,
            age: parse_f64(record, self.age, "age")?,
            pay_status,
            bill_amt,
            pay_amt,
            default,
        })
    }
}

fn build_header_map(headers: &StringRecord) -> Result<HashMap<String, usize>, AppError> {
    let mut map = HashMap::with_capacity(headers.len());
    for (idx, name) in headers.iter().enumerate() {
        let name = normalize_header_name(name);
        if map.insert(name.clone(), idx).is_some() {
            return Err(AppError::new(2, format!("Duplicate column '{name}'")));
        }
    }
    Ok(map)
}

/// `"\u{feff}LIMIT_BAL"` → `limit_bal`, `"default payment next month"` → `default_payment_next_month`.
fn normalize_header_name(name: &str) -> String {
    let name = name.trim().trim_start_matches('\u{feff}').trim();
    name.chars()
        .map(|c| if c == ' ' || c == '.' { '_' } else { c.to_ascii_lowercase() })
        .collect()
}

fn field<'a>(record: &'a StringRecord, idx: usize, name: &str) -> Result<&'a str, String> {
    record
        .get(idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("missing value for '{name}'"))
}

fn parse_f64(record: &StringRecord, idx: usize, name: &str) -> Result<f64, String> {
    let s = field(record, idx, name)?;
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(format!("invalid number '{s}' for '{name}'")),
    }
}

/// Integer codes; `2.0` is accepted, `2.5` is not.
fn parse_int(record: &StringRecord, idx: usize, name: &str) -> Result<i32, String> {
    let s = field(record, idx, name)?;
    if let Ok(v) = s.parse::<i32>() {
        return Ok(v);
    }
    match s.parse::<f64>() {
        Ok(v) if v.fract() == 0.0 && v.abs() <= f64::from(i32::MAX) => Ok(v as i32),
        _ => Err(format!("invalid integer code '{s}' for '{name}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "ID,LIMIT_BAL,SEX,EDUCATION,MARRIAGE,AGE,PAY_0,PAY_2,PAY_3,PAY_4,PAY_5,PAY_6,\
BILL_AMT1,BILL_AMT2,BILL_AMT3,BILL_AMT4,BILL_AMT5,BILL_AMT6,\
PAY_AMT1,PAY_AMT2,PAY_AMT3,PAY_AMT4,PAY_AMT5,PAY_AMT6,default payment next month";

    const ROW: &str = "1,20000,2,2,1,24,2,2,-1,-1,-2,-2,3913,3102,689,0,0,0,0,689,0,0,0,0,1";

    #[test]
    fn reads_uci_layout() {
        let csv = format!("\u{feff}{HEADER}\n{ROW}\n");
        let data = read_records(csv.as_bytes()).unwrap();
        assert_eq!(data.rows_read, 1);
        assert!(data.row_errors.is_empty());
        let r = &data.records[0];
        assert_eq!(r.limit_bal, 20_000.0);
        assert_eq!((r.sex, r.education, r.marriage), (2, 2, 1));
        assert_eq!(r.pay_status, [2, 2, -1, -1, -2, -2]);
        assert_eq!(r.bill_amt[0], 3913.0);
        assert_eq!(r.pay_amt[1], 689.0);
        assert_eq!(r.default, 1);
    }

    #[test]
    fn label_alias_and_missing_id_are_accepted() {
        let header = HEADER.replace("ID,", "").replace("default payment next month", "default");
        let row = ROW.split_once(',').map(|(_, rest)| rest).unwrap();
        let data = read_records(format!("{header}\n{row}\n").as_bytes()).unwrap();
        assert_eq!(data.records.len(), 1);
    }

    #[test]
    fn bad_rows_are_reported_and_skipped() {
        let bad_label = format!("{},7", ROW.strip_suffix(",1").unwrap());
        let bad_amount = ROW.replacen("20000", "lots", 1);
        let csv = format!("{HEADER}\n{ROW}\n{bad_amount}\n{bad_label}\n");
        let data = read_records(csv.as_bytes()).unwrap();
        assert_eq!(data.rows_read, 3);
        assert_eq!(data.records.len(), 1);
        assert_eq!(data.row_errors.len(), 2);
        assert_eq!(data.row_errors[0].line, 3);
        assert_eq!(data.row_errors[0].id.as_deref(), Some("1"));
        assert!(data.row_errors[0].message.contains("limit_bal"));
        assert!(data.row_errors[1].message.contains("label"));
    }

    #[test]
    fn extra_columns_are_a_schema_change() {
        let csv = format!("{HEADER},SCORE\n{ROW},5\n");
        let err = read_records(csv.as_bytes()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("score"));
    }

    #[test]
    fn missing_columns_are_rejected() {
        let header = HEADER.replace(",PAY_AMT6", "");
        let err = read_records(format!("{header}\n").as_bytes()).unwrap_err();
        assert!(err.to_string().contains("pay_amt6"));
    }

    #[test]
    fn header_normalization() {
        assert_eq!(normalize_header_name("\u{feff} PAY.AMT1 "), "pay_amt1");
        assert_eq!(
            normalize_header_name("default payment next month"),
            "default_payment_next_month"
        );
    }
}
