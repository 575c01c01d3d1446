//! The frozen training schema.
//!
//! A `FeatureSchema` is built exactly once, by `CategoricalEncoder::fit`, and has
//! no mutating API afterwards. Every later encoding (evaluation rows, inference
//! requests) must produce vectors with the same names in the same order.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::domain::CategoricalField;
use crate::error::PipelineError;

/// Encoding metadata for one categorical field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoricalLevels {
    pub field: CategoricalField,
    /// Withheld level (no indicator column).
    pub reference: i32,
    /// Levels that own an indicator column, ascending.
    pub encoded: Vec<i32>,
}

impl CategoricalLevels {
    pub fn indicator_columns(&self) -> impl Iterator<Item = String> + '_ {
        self.encoded.iter().map(|&level| self.field.indicator_column(level))
    }

    pub fn is_known(&self, level: i32) -> bool {
        level == self.reference || self.encoded.contains(&level)
    }
}

/// Ordered, de-duplicated column list plus categorical metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SchemaParts")]
pub struct FeatureSchema {
    columns: Vec<String>,
    categoricals: Vec<CategoricalLevels>,
}

#[derive(Deserialize)]
struct SchemaParts {
    columns: Vec<String>,
    categoricals: Vec<CategoricalLevels>,
}

impl TryFrom<SchemaParts> for FeatureSchema {
    type Error = PipelineError;

    fn try_from(parts: SchemaParts) -> Result<Self, Self::Error> {
        FeatureSchema::new(parts.columns, parts.categoricals)
    }
}

impl FeatureSchema {
    pub(crate) fn new(columns: Vec<String>, categoricals: Vec<CategoricalLevels>) -> Result<Self, PipelineError> {
        let mut seen = HashSet::with_capacity(columns.len());
        for name in &columns {
            if !seen.insert(name.as_str()) {
                return Err(PipelineError::DuplicateColumn(name.clone()));
            }
        }
        Ok(Self { columns, categoricals })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn categorical(&self, field: CategoricalField) -> Option<&CategoricalLevels> {
        self.categoricals.iter().find(|c| c.field == field)
    }

    pub fn categoricals(&self) -> &[CategoricalLevels] {
        &self.categoricals
    }

    /// Compare against another column list; returns `(missing, unexpected)`.
    pub fn diff(&self, other: &[String]) -> (Vec<String>, Vec<String>) {
        let mine: HashSet<&str> = self.columns.iter().map(String::as_str).collect();
        let theirs: HashSet<&str> = other.iter().map(String::as_str).collect();
        let missing = self
            .columns
            .iter()
            .filter(|c| !theirs.contains(c.as_str()))
            .cloned()
            .collect();
        let unexpected = other
            .iter()
            .filter(|c| !mine.contains(c.as_str()))
            .cloned()
            .collect();
        (missing, unexpected)
    }
}
