//! Shared domain types.
//!
//! This module defines:
//!
//! - the fixed dataset column layout and the raw `CreditRecord`
//! - the three categorical fields and the form choices that map onto them
//! - the raw `InferenceRequest` and its parsed form
//! - the binary `Verdict`
//! - run configuration (`PipelineConfig`, `BoostParams`)

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, PredictError};

/// Repayment-status columns, month 1 first. The dataset skips `pay_1`.
pub const PAY_STATUS_COLUMNS: [&str; 6] = ["pay_0", "pay_2", "pay_3", "pay_4", "pay_5", "pay_6"];

pub const BILL_AMOUNT_COLUMNS: [&str; 6] = [
    "bill_amt1", "bill_amt2", "bill_amt3", "bill_amt4", "bill_amt5", "bill_amt6",
];

pub const PAY_AMOUNT_COLUMNS: [&str; 6] = [
    "pay_amt1", "pay_amt2", "pay_amt3", "pay_amt4", "pay_amt5", "pay_amt6",
];

/// Normalized name of the outcome label column.
pub const LABEL_COLUMN: &str = "default_payment_next_month";

/// Non-categorical feature columns, in dataset order.
///
/// These lead every encoded feature vector; indicator columns follow.
pub const NUMERIC_COLUMNS: [&str; 20] = [
    "limit_bal",
    "age",
    "pay_0",
    "pay_2",
    "pay_3",
    "pay_4",
    "pay_5",
    "pay_6",
    "bill_amt1",
    "bill_amt2",
    "bill_amt3",
    "bill_amt4",
    "bill_amt5",
    "bill_amt6",
    "pay_amt1",
    "pay_amt2",
    "pay_amt3",
    "pay_amt4",
    "pay_amt5",
    "pay_amt6",
];

/// Schema columns the inference form never collects; they are assumed neutral (0).
pub const UNCOLLECTED_COLUMNS: [&str; 17] = [
    "pay_2",
    "pay_3",
    "pay_4",
    "pay_5",
    "pay_6",
    "bill_amt1",
    "bill_amt2",
    "bill_amt3",
    "bill_amt4",
    "bill_amt5",
    "bill_amt6",
    "pay_amt1",
    "pay_amt2",
    "pay_amt3",
    "pay_amt4",
    "pay_amt5",
    "pay_amt6",
];

/// One raw dataset row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditRecord {
    pub limit_bal: f64,
    pub sex: i32,
    pub education: i32,
    pub marriage: i32,
    pub age: f64,
    /// Repayment status codes, month 1 (`pay_0`) first.
    pub pay_status: [i32; 6],
    pub bill_amt: [f64; 6],
    pub pay_amt: [f64; 6],
    /// 1 = defaulted next month.
    pub default: u8,
}

impl CreditRecord {
    /// Non-categorical values in `NUMERIC_COLUMNS` order.
    pub fn numeric_values(&self) -> [f64; 20] {
        let mut out = [0.0; 20];
        out[0] = self.limit_bal;
        out[1] = self.age;
        for (i, v) in self.pay_status.iter().enumerate() {
            out[2 + i] = f64::from(*v);
        }
        out[8..14].copy_from_slice(&self.bill_amt);
        out[14..20].copy_from_slice(&self.pay_amt);
        out
    }

    /// The twelve monetary fields (bills then payments).
    pub fn monetary_values(&self) -> impl Iterator<Item = f64> + '_ {
        self.bill_amt.iter().chain(self.pay_amt.iter()).copied()
    }

    pub fn categorical(&self, field: CategoricalField) -> i32 {
        match field {
            CategoricalField::Sex => self.sex,
            CategoricalField::Education => self.education,
            CategoricalField::Marriage => self.marriage,
        }
    }
}

/// Categorical dataset fields, in encoding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoricalField {
    Sex,
    Education,
    Marriage,
}

impl CategoricalField {
    pub const ALL: [CategoricalField; 3] = [
        CategoricalField::Sex,
        CategoricalField::Education,
        CategoricalField::Marriage,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CategoricalField::Sex => "sex",
            CategoricalField::Education => "education",
            CategoricalField::Marriage => "marriage",
        }
    }

    /// Indicator column name for one level: `<field>_<level>`.
    pub fn indicator_column(self, level: i32) -> String {
        format!("{}_{}", self.name(), level)
    }
}

/// A fixed set of labelled options offered by the form.
pub trait Choice: Copy + Sized + 'static {
    const ALL: &'static [Self];

    fn label(self) -> &'static str;

    /// Extra accepted spellings besides the label.
    fn aliases(self) -> &'static [&'static str] {
        &[]
    }
}

/// Parse a form selection. Matching ignores case, spaces and punctuation.
pub fn parse_choice<T: Choice>(field: &'static str, raw: Option<&str>) -> Result<T, PredictError> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty());
    let Some(raw) = raw else {
        return Err(PredictError::selection(field, "no option selected"));
    };

    let wanted = normalize_choice(raw);
    T::ALL
        .iter()
        .copied()
        .find(|c| {
            normalize_choice(c.label()) == wanted
                || c.aliases().iter().any(|a| normalize_choice(a) == wanted)
        })
        .ok_or_else(|| {
            let options: Vec<&str> = T::ALL.iter().map(|c| c.label()).collect();
            PredictError::selection(
                field,
                format!("unknown option '{raw}' (expected one of: {})", options.join(", ")),
            )
        })
}

fn normalize_choice(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    /// Dataset `sex` code.
    pub fn code(self) -> i32 {
        match self {
            Gender::Male => 1,
            Gender::Female => 2,
        }
    }
}

impl Choice for Gender {
    const ALL: &'static [Self] = &[Gender::Male, Gender::Female];

    fn label(self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }

    fn aliases(self) -> &'static [&'static str] {
        match self {
            Gender::Male => &["m"],
            Gender::Female => &["f"],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EducationLevel {
    GraduateSchool,
    University,
    HighSchool,
    Others,
}

impl EducationLevel {
    /// Dataset `education` code.
    pub fn code(self) -> i32 {
        match self {
            EducationLevel::GraduateSchool => 1,
            EducationLevel::University => 2,
            EducationLevel::HighSchool => 3,
            EducationLevel::Others => 4,
        }
    }
}

impl Choice for EducationLevel {
    const ALL: &'static [Self] = &[
        EducationLevel::GraduateSchool,
        EducationLevel::University,
        EducationLevel::HighSchool,
        EducationLevel::Others,
    ];

    fn label(self) -> &'static str {
        match self {
            EducationLevel::GraduateSchool => "Graduate School",
            EducationLevel::University => "University",
            EducationLevel::HighSchool => "High School",
            EducationLevel::Others => "Others",
        }
    }

    fn aliases(self) -> &'static [&'static str] {
        match self {
            EducationLevel::GraduateSchool => &["graduate"],
            EducationLevel::Others => &["other"],
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaritalStatus {
    Married,
    Single,
    Others,
}

impl MaritalStatus {
    /// Dataset `marriage` code.
    pub fn code(self) -> i32 {
        match self {
            MaritalStatus::Married => 1,
            MaritalStatus::Single => 2,
            MaritalStatus::Others => 3,
        }
    }
}

impl Choice for MaritalStatus {
    const ALL: &'static [Self] = &[MaritalStatus::Married, MaritalStatus::Single, MaritalStatus::Others];

    fn label(self) -> &'static str {
        match self {
            MaritalStatus::Married => "Married",
            MaritalStatus::Single => "Single",
            MaritalStatus::Others => "Others",
        }
    }

    fn aliases(self) -> &'static [&'static str] {
        match self {
            MaritalStatus::Others => &["other"],
            _ => &[],
        }
    }
}

/// Repayment status for the most recent month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepaymentStatus {
    PayDuly,
    NoConsumption,
    DelayOneMonth,
    DelayTwoMonths,
    DelayThreeMonths,
}

impl RepaymentStatus {
    /// Signed status code: duly = -1, no consumption = 0, delay by N months = N.
    pub fn code(self) -> i32 {
        match self {
            RepaymentStatus::PayDuly => -1,
            RepaymentStatus::NoConsumption => 0,
            RepaymentStatus::DelayOneMonth => 1,
            RepaymentStatus::DelayTwoMonths => 2,
            RepaymentStatus::DelayThreeMonths => 3,
        }
    }
}

impl Choice for RepaymentStatus {
    const ALL: &'static [Self] = &[
        RepaymentStatus::PayDuly,
        RepaymentStatus::NoConsumption,
        RepaymentStatus::DelayOneMonth,
        RepaymentStatus::DelayTwoMonths,
        RepaymentStatus::DelayThreeMonths,
    ];

    fn label(self) -> &'static str {
        match self {
            RepaymentStatus::PayDuly => "Pay Duly",
            RepaymentStatus::NoConsumption => "No Consumption",
            RepaymentStatus::DelayOneMonth => "Payment Delay for 1 Month",
            RepaymentStatus::DelayTwoMonths => "Payment Delay for 2 Months",
            RepaymentStatus::DelayThreeMonths => "Payment Delay for 3 Months",
        }
    }

    fn aliases(self) -> &'static [&'static str] {
        match self {
            RepaymentStatus::PayDuly => &["duly"],
            RepaymentStatus::NoConsumption => &[],
            RepaymentStatus::DelayOneMonth => &["delay 1"],
            RepaymentStatus::DelayTwoMonths => &["delay 2"],
            RepaymentStatus::DelayThreeMonths => &["delay 3"],
        }
    }
}

/// Raw values as entered on the form. Consumed once per prediction call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceRequest {
    #[serde(deserialize_with = "text_or_number")]
    pub credit_limit: String,
    #[serde(deserialize_with = "text_or_number")]
    pub age: String,
    pub gender: Option<String>,
    pub education: Option<String>,
    pub marital_status: Option<String>,
    pub repayment_status: Option<String>,
}

/// A request whose numeric fields parsed and whose choices resolved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParsedRequest {
    pub credit_limit: f64,
    pub age: f64,
    pub gender: Gender,
    pub education: EducationLevel,
    pub marital_status: MaritalStatus,
    pub repayment_status: RepaymentStatus,
}

impl InferenceRequest {
    /// Validate and resolve every field. Numeric fields are checked first.
    pub fn parse(&self) -> Result<ParsedRequest, PredictError> {
        let credit_limit = parse_amount("credit_limit", &self.credit_limit)?;
        let age = parse_amount("age", &self.age)?;

        Ok(ParsedRequest {
            credit_limit,
            age,
            gender: parse_choice("gender", self.gender.as_deref())?,
            education: parse_choice("education", self.education.as_deref())?,
            marital_status: parse_choice("marital_status", self.marital_status.as_deref())?,
            repayment_status: parse_choice("repayment_status", self.repayment_status.as_deref())?,
        })
    }
}

/// Numeric form fields arrive as text from the form and as numbers from JSON
/// clients. Either way they are kept as text and validated by `parse`.
fn text_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(text) => text,
        Raw::Number(n) => n.to_string(),
    })
}

fn parse_amount(field: &'static str, raw: &str) -> Result<f64, PredictError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(PredictError::validation(field, "a number is required"));
    }
    let value: f64 = raw
        .parse()
        .map_err(|_| PredictError::validation(field, format!("'{raw}' is not a number")))?;
    if !value.is_finite() {
        return Err(PredictError::validation(field, format!("'{raw}' is not a finite number")));
    }
    if value < 0.0 {
        return Err(PredictError::validation(field, "must not be negative"));
    }
    Ok(value)
}

/// Binary prediction outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    WillRepay,
    WillNotRepay,
}

impl Verdict {
    /// Label 0 = repay, anything else = default.
    pub fn from_label(label: u8) -> Self {
        if label == 0 {
            Verdict::WillRepay
        } else {
            Verdict::WillNotRepay
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::WillRepay => "WILL_REPAY",
            Verdict::WillNotRepay => "WILL_NOT_REPAY",
        }
    }

    /// Outcome string shown to the user.
    pub fn message(self) -> &'static str {
        match self {
            Verdict::WillRepay => "Customer will repay the debt",
            Verdict::WillNotRepay => "Customer will not repay the debt",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gradient boosting hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostParams {
    pub n_rounds: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    /// L2 penalty on leaf values.
    pub lambda: f64,
    /// Minimum summed hessian in a child.
    pub min_child_weight: f64,
    /// Upper bound on histogram bins per feature.
    pub max_bins: usize,
    /// Probability cut-off for label 1.
    pub threshold: f64,
}

impl Default for BoostParams {
    fn default() -> Self {
        Self {
            n_rounds: 100,
            learning_rate: 0.3,
            max_depth: 6,
            lambda: 1.0,
            min_child_weight: 1.0,
            max_bins: 256,
            threshold: 0.5,
        }
    }
}

/// A full training run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults and `.env`).
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub data_path: PathBuf,
    /// Shared by the splitter, the balancer and the trainer.
    pub seed: u64,
    pub test_fraction: f64,
    pub smote_k: usize,
    /// Minority/majority ratio the interpolation step targets.
    pub balance_ratio: f64,
    pub boost: BoostParams,
    pub export_metrics: Option<PathBuf>,
}

impl PipelineConfig {
    pub fn new(data_path: impl Into<PathBuf>) -> Self {
        Self {
            data_path: data_path.into(),
            seed: 42,
            test_fraction: 0.2,
            smote_k: 5,
            balance_ratio: 1.0,
            boost: BoostParams::default(),
            export_metrics: None,
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(AppError::new(2, "Test fraction must be in (0, 1)."));
        }
        if self.smote_k == 0 {
            return Err(AppError::new(2, "SMOTE neighbour count must be > 0."));
        }
        if !(self.balance_ratio > 0.0 && self.balance_ratio <= 1.0) {
            return Err(AppError::new(2, "Balance ratio must be in (0, 1]."));
        }
        let b = &self.boost;
        if b.n_rounds == 0 || b.max_depth == 0 {
            return Err(AppError::new(2, "Boosting rounds and max depth must be > 0."));
        }
        if !(b.learning_rate > 0.0 && b.learning_rate.is_finite()) {
            return Err(AppError::new(2, "Learning rate must be finite and > 0."));
        }
        if !(b.lambda >= 0.0 && b.min_child_weight >= 0.0) {
            return Err(AppError::new(2, "Lambda and min child weight must be >= 0."));
        }
        if !(2..=u16::MAX as usize).contains(&b.max_bins) {
            return Err(AppError::new(2, "Max bins must be in [2, 65535]."));
        }
        if !(b.threshold > 0.0 && b.threshold < 1.0) {
            return Err(AppError::new(2, "Decision threshold must be in (0, 1)."));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(limit: &str, age: &str) -> InferenceRequest {
        InferenceRequest {
            credit_limit: limit.to_string(),
            age: age.to_string(),
            gender: Some("Male".to_string()),
            education: Some("University".to_string()),
            marital_status: Some("Single".to_string()),
            repayment_status: Some("Pay Duly".to_string()),
        }
    }

    #[test]
    fn parses_a_complete_request() {
        let parsed = request("20000", "25").parse().unwrap();
        assert_eq!(parsed.credit_limit, 20000.0);
        assert_eq!(parsed.gender, Gender::Male);
        assert_eq!(parsed.education, EducationLevel::University);
        assert_eq!(parsed.marital_status, MaritalStatus::Single);
        assert_eq!(parsed.repayment_status.code(), -1);
    }

    #[test]
    fn json_numbers_are_accepted_for_numeric_fields() {
        let req: InferenceRequest = serde_json::from_str(
            r#"{"credit_limit":20000,"age":25.5,"gender":"Male","education":"University","marital_status":"Single","repayment_status":"Pay Duly"}"#,
        )
        .unwrap();
        assert_eq!(req.credit_limit, "20000");
        let parsed = req.parse().unwrap();
        assert_eq!(parsed.credit_limit, 20000.0);
        assert_eq!(parsed.age, 25.5);

        let negative: InferenceRequest = serde_json::from_str(r#"{"credit_limit":-5,"age":"25"}"#).unwrap();
        let err = negative.parse().unwrap_err();
        assert!(matches!(err, PredictError::Validation { field: "credit_limit", .. }));
    }

    #[test]
    fn non_numeric_credit_limit_is_a_validation_error() {
        let err = request("abc", "25").parse().unwrap_err();
        assert!(matches!(err, PredictError::Validation { field: "credit_limit", .. }));
    }

    #[test]
    fn missing_choice_is_a_selection_error() {
        let mut req = request("20000", "25");
        req.education = None;
        let err = req.parse().unwrap_err();
        assert!(matches!(err, PredictError::Selection { field: "education", .. }));

        req.education = Some("Kindergarten".to_string());
        let err = req.parse().unwrap_err();
        assert!(err.to_string().contains("Kindergarten"));
    }

    #[test]
    fn choices_ignore_case_and_spacing() {
        let s: RepaymentStatus = parse_choice("repayment_status", Some("payment delay for 2 months")).unwrap();
        assert_eq!(s.code(), 2);
        let e: EducationLevel = parse_choice("education", Some("HIGH-SCHOOL")).unwrap();
        assert_eq!(e.code(), 3);
    }

    #[test]
    fn numeric_values_follow_column_order() {
        let r = CreditRecord {
            limit_bal: 1000.0,
            sex: 2,
            education: 1,
            marriage: 1,
            age: 30.0,
            pay_status: [-1, 0, 1, 2, 3, 4],
            bill_amt: [10.0, 11.0, 12.0, 13.0, 14.0, 15.0],
            pay_amt: [20.0, 21.0, 22.0, 23.0, 24.0, 25.0],
            default: 0,
        };
        let v = r.numeric_values();
        assert_eq!(v[NUMERIC_COLUMNS.iter().position(|c| *c == "pay_0").unwrap()], -1.0);
        assert_eq!(v[NUMERIC_COLUMNS.iter().position(|c| *c == "bill_amt3").unwrap()], 12.0);
        assert_eq!(v[NUMERIC_COLUMNS.iter().position(|c| *c == "pay_amt6").unwrap()], 25.0);
        assert_eq!(r.monetary_values().count(), 12);
    }

    #[test]
    fn default_config_is_valid() {
        assert!(PipelineConfig::new("data.csv").validate().is_ok());
        let mut cfg = PipelineConfig::new("data.csv");
        cfg.test_fraction = 1.0;
        assert_eq!(cfg.validate().unwrap_err().exit_code(), 2);
    }
}
