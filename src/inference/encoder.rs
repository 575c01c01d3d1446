//! Request → feature vector, against the frozen training schema.
//!
//! The form collects six values; the schema has dozens of columns. The gap is
//! closed by explicit rules, never by silently defaulting whatever is absent:
//!
//! - `limit_bal`, `age`, `pay_0` come from the request
//! - each categorical group gets 1 on the chosen indicator and 0 elsewhere
//!   (rare levels seen only in training are therefore 0)
//! - `UNCOLLECTED_COLUMNS` are 0
//!
//! Anything left over, in either direction, is a schema mismatch.

use std::collections::BTreeMap;

use tracing::error;

use crate::domain::{CategoricalField, InferenceRequest, ParsedRequest, UNCOLLECTED_COLUMNS};
use crate::error::PredictError;
use crate::prep::FeatureSchema;

#[derive(Debug, Clone, Copy)]
pub struct InferenceEncoder<'a> {
    schema: &'a FeatureSchema,
}

impl<'a> InferenceEncoder<'a> {
    pub fn new(schema: &'a FeatureSchema) -> Self {
        Self { schema }
    }

    /// Validate the raw request, then encode it.
    pub fn encode(&self, request: &InferenceRequest) -> Result<Vec<f64>, PredictError> {
        let parsed = request.parse()?;
        self.encode_parsed(&parsed)
    }

    /// One vector in schema order. Pure: the same request always yields the same vector.
    pub fn encode_parsed(&self, request: &ParsedRequest) -> Result<Vec<f64>, PredictError> {
        let mut assembled: BTreeMap<String, f64> = BTreeMap::new();
        assembled.insert("limit_bal".to_string(), request.credit_limit);
        assembled.insert("age".to_string(), request.age);
        assembled.insert("pay_0".to_string(), f64::from(request.repayment_status.code()));

        let chosen = [
            (CategoricalField::Sex, request.gender.code()),
            (CategoricalField::Education, request.education.code()),
            (CategoricalField::Marriage, request.marital_status.code()),
        ];
        for (field, level) in chosen {
            self.assign_group(field, level, &mut assembled);
        }

        for column in UNCOLLECTED_COLUMNS {
            if self.schema.contains(column) {
                assembled.entry(column.to_string()).or_insert(0.0);
            }
        }

        let names: Vec<String> = assembled.keys().cloned().collect();
        let (missing, unexpected) = self.schema.diff(&names);
        if !missing.is_empty() || !unexpected.is_empty() {
            error!(?missing, ?unexpected, "inference encoding does not match the training schema");
            return Err(PredictError::SchemaMismatch {
                missing,
                unexpected,
                detail: "assembled columns differ from the training schema".to_string(),
            });
        }

        let row: Vec<f64> = self
            .schema
            .columns()
            .iter()
            .filter_map(|c| assembled.get(c).copied())
            .collect();
        if row.len() != self.schema.len() {
            error!(expected = self.schema.len(), got = row.len(), "inference vector has the wrong width");
            return Err(PredictError::SchemaMismatch {
                missing: Vec::new(),
                unexpected: Vec::new(),
                detail: format!("vector width {} != schema width {}", row.len(), self.schema.len()),
            });
        }
        Ok(row)
    }

    /// Write every indicator of `field`'s group.
    ///
    /// A level that is neither the reference nor encoded still gets its column
    /// written, so validation reports it instead of it vanishing.
    fn assign_group(&self, field: CategoricalField, chosen: i32, out: &mut BTreeMap<String, f64>) {
        let Some(levels) = self.schema.categorical(field) else {
            out.insert(field.indicator_column(chosen), 1.0);
            return;
        };
        for &level in &levels.encoded {
            out.insert(field.indicator_column(level), if level == chosen { 1.0 } else { 0.0 });
        }
        if !levels.is_known(chosen) {
            out.insert(field.indicator_column(chosen), 1.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CreditRecord;
    use crate::prep::CategoricalEncoder;

    fn record(sex: i32, education: i32, marriage: i32) -> CreditRecord {
        CreditRecord {
            limit_bal: 80_000.0,
            sex,
            education,
            marriage,
            age: 41.0,
            pay_status: [1; 6],
            bill_amt: [2000.0; 6],
            pay_amt: [500.0; 6],
            default: 0,
        }
    }

    fn schema_from(records: &[CreditRecord]) -> FeatureSchema {
        CategoricalEncoder::fit(records).unwrap().into_schema()
    }

    /// Form levels plus the rare education 6 and marriage 0.
    fn full_schema() -> FeatureSchema {
        schema_from(&[
            record(1, 1, 1),
            record(2, 2, 2),
            record(1, 3, 3),
            record(2, 4, 1),
            record(1, 6, 0),
        ])
    }

    fn request() -> InferenceRequest {
        InferenceRequest {
            credit_limit: "20000".to_string(),
            age: "25".to_string(),
            gender: Some("Male".to_string()),
            education: Some("University".to_string()),
            marital_status: Some("Single".to_string()),
            repayment_status: Some("Pay Duly".to_string()),
        }
    }

    fn value(schema: &FeatureSchema, row: &[f64], column: &str) -> f64 {
        row[schema.position(column).unwrap()]
    }

    #[test]
    fn form_request_maps_onto_the_schema() {
        let schema = full_schema();
        let row = InferenceEncoder::new(&schema).encode(&request()).unwrap();
        assert_eq!(row.len(), schema.len());

        assert_eq!(value(&schema, &row, "limit_bal"), 20_000.0);
        assert_eq!(value(&schema, &row, "age"), 25.0);
        assert_eq!(value(&schema, &row, "pay_0"), -1.0);
        assert_eq!(value(&schema, &row, "sex_2"), 0.0);
        assert_eq!(value(&schema, &row, "education_2"), 1.0);
        for other in ["education_3", "education_4", "education_6"] {
            assert_eq!(value(&schema, &row, other), 0.0, "{other}");
        }
        assert_eq!(value(&schema, &row, "marriage_2"), 1.0);
        for other in ["marriage_1", "marriage_3"] {
            assert_eq!(value(&schema, &row, other), 0.0, "{other}");
        }
        for column in UNCOLLECTED_COLUMNS {
            assert_eq!(value(&schema, &row, column), 0.0, "{column}");
        }
    }

    #[test]
    fn reference_level_sets_no_indicator() {
        let schema = full_schema();
        let mut req = request();
        req.education = Some("Graduate School".to_string());
        let row = InferenceEncoder::new(&schema).encode(&req).unwrap();
        let education_sum: f64 = schema
            .categorical(CategoricalField::Education)
            .unwrap()
            .indicator_columns()
            .map(|c| value(&schema, &row, &c))
            .sum();
        assert_eq!(education_sum, 0.0);
    }

    #[test]
    fn encoding_is_idempotent() {
        let schema = full_schema();
        let encoder = InferenceEncoder::new(&schema);
        assert_eq!(encoder.encode(&request()).unwrap(), encoder.encode(&request()).unwrap());
    }

    #[test]
    fn level_missing_from_training_is_a_schema_mismatch() {
        // No education 4 in training, so "Others" has no column.
        let schema = schema_from(&[record(1, 1, 1), record(2, 2, 2), record(1, 3, 3)]);
        let mut req = request();
        req.education = Some("Others".to_string());
        let err = InferenceEncoder::new(&schema).encode(&req).unwrap_err();
        match err {
            PredictError::SchemaMismatch { missing, unexpected, .. } => {
                assert!(missing.is_empty());
                assert_eq!(unexpected, vec!["education_4".to_string()]);
            }
            other => panic!("expected a schema mismatch, got {other:?}"),
        }
    }

    #[test]
    fn unknown_schema_column_is_never_zero_filled() {
        let base = full_schema();
        let mut columns = base.columns().to_vec();
        columns.push("utilization".to_string());
        let schema = FeatureSchema::new(columns, base.categoricals().to_vec()).unwrap();
        let err = InferenceEncoder::new(&schema).encode(&request()).unwrap_err();
        assert!(!err.is_user_error());
        assert!(err.to_string().contains("utilization"));
    }

    #[test]
    fn user_errors_surface_before_encoding() {
        let schema = full_schema();
        let mut req = request();
        req.credit_limit = "abc".to_string();
        let err = InferenceEncoder::new(&schema).encode(&req).unwrap_err();
        assert_eq!(err.kind(), "validation");
        assert_eq!(err.field(), Some("credit_limit"));

        let mut req = request();
        req.marital_status = None;
        let err = InferenceEncoder::new(&schema).encode(&req).unwrap_err();
        assert_eq!(err.kind(), "selection");
        assert_eq!(err.field(), Some("marital_status"));
    }
}
