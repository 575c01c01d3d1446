//! Categorical expansion.
//!
//! Each categorical field (sex, education, marriage, in that order) is replaced by
//! one indicator column per observed level except the lowest, which is withheld as
//! the reference level. Output columns: `NUMERIC_COLUMNS` first, then indicator
//! groups in field order with levels ascending.

use std::collections::BTreeSet;

use nalgebra::DMatrix;
use tracing::debug;

use crate::domain::{CategoricalField, CreditRecord, NUMERIC_COLUMNS};
use crate::error::PipelineError;
use crate::prep::schema::{CategoricalLevels, FeatureSchema};

/// Encoded rows aligned with a `FeatureSchema`, plus labels.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedData {
    pub features: DMatrix<f64>,
    pub labels: Vec<u8>,
}

impl EncodedData {
    pub fn n_rows(&self) -> usize {
        self.features.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    pub fn positives(&self) -> usize {
        self.labels.iter().filter(|&&l| l == 1).count()
    }

    pub fn row(&self, idx: usize) -> Vec<f64> {
        self.features.row(idx).iter().copied().collect()
    }

    /// Build from row vectors; every row must have `width` values.
    pub fn from_rows(rows: &[Vec<f64>], labels: Vec<u8>, width: usize) -> Result<Self, PipelineError> {
        if let Some(bad) = rows.iter().find(|r| r.len() != width) {
            return Err(PipelineError::WidthMismatch {
                expected: width,
                got: bad.len(),
            });
        }
        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        Ok(Self {
            features: DMatrix::from_row_slice(rows.len(), width, &flat),
            labels,
        })
    }
}

/// Fitted categorical encoder. Owns the frozen schema.
#[derive(Debug, Clone)]
pub struct CategoricalEncoder {
    schema: FeatureSchema,
}

impl CategoricalEncoder {
    /// Learn levels from `records` and freeze the schema.
    pub fn fit(records: &[CreditRecord]) -> Result<Self, PipelineError> {
        if records.is_empty() {
            return Err(PipelineError::EmptyData(
                "Cannot fit the categorical encoder on zero rows".to_string(),
            ));
        }

        let mut columns: Vec<String> = NUMERIC_COLUMNS.iter().map(|c| c.to_string()).collect();
        let mut categoricals = Vec::with_capacity(CategoricalField::ALL.len());

        for field in CategoricalField::ALL {
            let observed: BTreeSet<i32> = records.iter().map(|r| r.categorical(field)).collect();
            let mut levels = observed.into_iter();
            // Non-empty input guarantees at least one level.
            let Some(reference) = levels.next() else {
                return Err(PipelineError::EmptyData(format!("No levels observed for `{}`", field.name())));
            };
            let encoded: Vec<i32> = levels.collect();

            let group = CategoricalLevels {
                field,
                reference,
                encoded,
            };
            columns.extend(group.indicator_columns());
            debug!(
                field = field.name(),
                reference,
                indicators = group.encoded.len(),
                "encoded categorical field"
            );
            categoricals.push(group);
        }

        Ok(Self {
            schema: FeatureSchema::new(columns, categoricals)?,
        })
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn into_schema(self) -> FeatureSchema {
        self.schema
    }

    /// Encode one record against the frozen schema.
    pub fn encode_record(&self, record: &CreditRecord) -> Result<Vec<f64>, PipelineError> {
        encode_record(&self.schema, record)
    }

    /// Encode a batch of records; labels are carried through.
    pub fn transform(&self, records: &[CreditRecord]) -> Result<EncodedData, PipelineError> {
        let width = self.schema.len();
        let mut flat = Vec::with_capacity(records.len() * width);
        let mut labels = Vec::with_capacity(records.len());
        for record in records {
            flat.extend(self.encode_record(record)?);
            labels.push(record.default);
        }
        Ok(EncodedData {
            features: DMatrix::from_row_slice(records.len(), width, &flat),
            labels,
        })
    }
}

fn encode_record(schema: &FeatureSchema, record: &CreditRecord) -> Result<Vec<f64>, PipelineError> {
    let mut out = Vec::with_capacity(schema.len());
    out.extend(record.numeric_values());

    for group in schema.categoricals() {
        let level = record.categorical(group.field);
        if !group.is_known(level) {
            return Err(PipelineError::UnknownLevel {
                column: group.field.indicator_column(level),
            });
        }
        out.extend(group.encoded.iter().map(|&l| if l == level { 1.0 } else { 0.0 }));
    }

    if out.len() != schema.len() {
        return Err(PipelineError::WidthMismatch {
            expected: schema.len(),
            got: out.len(),
        });
    }
    Ok(out)
}
