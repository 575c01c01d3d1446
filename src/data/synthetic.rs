//! Synthetic credit-card dataset generation.
//!
//! Rows follow the UCI "default of credit card clients" layout. A latent risk
//! score per client drives the repayment history, utilization and the default
//! label, so the label is learnable but noisy. Rare education/marital codes and
//! a small share of negative bill amounts are included on purpose: real exports
//! contain both.

use std::io::Write;
use std::path::Path;

use rand::distributions::WeightedIndex;
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::{LogNormal, Normal};

use crate::domain::CreditRecord;
use crate::error::AppError;

/// `(code, weight)` pairs, roughly the published level frequencies.
const EDUCATION_LEVELS: [(i32, f64); 7] = [
    (1, 0.35),
    (2, 0.46),
    (3, 0.16),
    (4, 0.01),
    (5, 0.012),
    (6, 0.005),
    (0, 0.003),
];
const MARRIAGE_LEVELS: [(i32, f64); 4] = [(1, 0.45), (2, 0.53), (3, 0.015), (0, 0.005)];

/// Share of rows given one negative bill (a refund/overpayment).
const NEGATIVE_BILL_RATE: f64 = 0.02;

pub const CSV_HEADER: [&str; 25] = [
    "ID",
    "LIMIT_BAL",
    "SEX",
    "EDUCATION",
    "MARRIAGE",
    "AGE",
    "PAY_0",
    "PAY_2",
    "PAY_3",
    "PAY_4",
    "PAY_5",
    "PAY_6",
    "BILL_AMT1",
    "BILL_AMT2",
    "BILL_AMT3",
    "BILL_AMT4",
    "BILL_AMT5",
    "BILL_AMT6",
    "PAY_AMT1",
    "PAY_AMT2",
    "PAY_AMT3",
    "PAY_AMT4",
    "PAY_AMT5",
    "PAY_AMT6",
    "default payment next month",
];

pub fn generate_dataset(n: usize, seed: u64) -> Result<Vec<CreditRecord>, AppError> {
    if n == 0 {
        return Err(AppError::new(2, "Row count must be > 0."));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let dist_err = |e: rand_distr::NormalError| AppError::new(4, format!("Distribution error: {e}"));
    let normal = Normal::new(0.0, 1.0).map_err(dist_err)?;
    let limit_dist = LogNormal::new(120_000f64.ln(), 0.75).map_err(dist_err)?;
    let age_dist = Normal::new(35.5f64, 9.2).map_err(dist_err)?;
    let weights_err = |e: rand::distributions::WeightedError| AppError::new(4, format!("Distribution error: {e}"));
    let education_dist = WeightedIndex::new(EDUCATION_LEVELS.map(|(_, w)| w)).map_err(weights_err)?;
    let marriage_dist = WeightedIndex::new(MARRIAGE_LEVELS.map(|(_, w)| w)).map_err(weights_err)?;

    let mut records = Vec::with_capacity(n);
    for _ in 0..n {
        let risk: f64 = normal.sample(&mut rng);

        let limit_bal = (limit_dist.sample(&mut rng) / 10_000.0).round().clamp(1.0, 100.0) * 10_000.0;
        let sex = if rng.gen_bool(0.6) { 2 } else { 1 };
        let education = EDUCATION_LEVELS[education_dist.sample(&mut rng)].0;
        let marriage = MARRIAGE_LEVELS[marriage_dist.sample(&mut rng)].0;
        let age = age_dist.sample(&mut rng).round().clamp(21.0, 79.0);

        let mut pay_status = [0; 6];
        for status in pay_status.iter_mut() {
            let month_risk = risk + 0.4 * normal.sample(&mut rng);
            *status = repayment_code(&mut rng, month_risk);
        }

        let utilization = logistic(0.8 * risk - 0.3 + 0.5 * normal.sample(&mut rng));
        let mut bill_amt = [0.0; 6];
        let mut pay_amt = [0.0; 6];
        for month in 0..6 {
            let drift = 1.0 + 0.08 * normal.sample(&mut rng);
            let bill = (limit_bal * utilization * drift).max(0.0).round();
            bill_amt[month] = bill;
            let paid_share = if pay_status[month] > 0 {
                0.02 * rng.r#gen::<f64>()
            } else {
                0.05 + 0.4 * rng.r#gen::<f64>()
            };
            pay_amt[month] = (bill * paid_share).round();
        }
        if rng.gen_bool(NEGATIVE_BILL_RATE) {
            let month = rng.gen_range(0..6);
            bill_amt[month] = -(rng.gen_range(1.0..2_000.0f64)).round();
        }

        let recent_delay = f64::from(pay_status[0].max(0));
        let score = -1.9 + 0.8 * recent_delay + 0.6 * risk - 0.25 * (limit_bal / 100_000.0 - 1.5);
        let default = u8::from(rng.gen_bool(logistic(score)));

        records.push(CreditRecord {
            limit_bal,
            sex,
            education,
            marriage,
            age,
            pay_status,
            bill_amt,
            pay_amt,
            default,
        });
    }

    Ok(records)
}

/// -2 (no consumption) .. 3 (three months late), later codes for higher risk.
fn repayment_code(rng: &mut StdRng, risk: f64) -> i32 {
    if rng.gen_bool(logistic(risk - 1.4)) {
        // Delinquent: 1..=3 months, mostly 1 or 2.
        if risk > 1.5 {
            rng.gen_range(2..=3)
        } else {
            rng.gen_range(1..=2)
        }
    } else {
        [-2, -1, 0, 0][rng.gen_range(0..4)]
    }
}

fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Write `records` with the UCI upper-case header and a 1-based `ID` column.
pub fn write_dataset_csv<W: Write>(writer: W, records: &[CreditRecord]) -> Result<(), AppError> {
    let write_err = |e: csv::Error| AppError::new(2, format!("Failed to write dataset CSV: {e}"));
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(CSV_HEADER).map_err(write_err)?;

    for (i, r) in records.iter().enumerate() {
        let mut row: Vec<String> = Vec::with_capacity(CSV_HEADER.len());
        row.push((i + 1).to_string());
        row.push(r.limit_bal.to_string());
        row.push(r.sex.to_string());
        row.push(r.education.to_string());
        row.push(r.marriage.to_string());
        row.push(r.age.to_string());
        row.extend(r.pay_status.iter().map(i32::to_string));
        row.extend(r.bill_amt.iter().map(f64::to_string));
        row.extend(r.pay_amt.iter().map(f64::to_string));
        row.push(r.default.to_string());
        out.write_record(&row).map_err(write_err)?;
    }

    out.flush()
        .map_err(|e| AppError::new(2, format!("Failed to write dataset CSV: {e}")))
}

pub fn write_dataset_file(path: &Path, records: &[CreditRecord]) -> Result<(), AppError> {
    let file = std::fs::File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create dataset CSV '{}': {e}", path.display())))?;
    write_dataset_csv(file, records)
}
