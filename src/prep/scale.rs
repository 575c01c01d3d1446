//! Standard scaler (z-score).
//!
//! `z = (x - mean) / std`, with statistics fixed at fit time (population std).
//! A column that was constant during fit has no meaningful z-score; it maps to 0
//! for every later input.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Relative tolerance under which a fitted std counts as zero.
const ZERO_STD_TOL: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    /// 0.0 marks a zero-variance column.
    std: Vec<f64>,
}

impl StandardScaler {
    /// Compute per-column mean and population standard deviation.
    pub fn fit(features: &DMatrix<f64>) -> Result<Self, PipelineError> {
        let n = features.nrows();
        if n == 0 {
            return Err(PipelineError::EmptyData("Cannot fit the scaler on zero rows".to_string()));
        }

        let mut mean = Vec::with_capacity(features.ncols());
        let mut std = Vec::with_capacity(features.ncols());
        for col in features.column_iter() {
            let m = col.sum() / n as f64;
            let var = col.iter().map(|x| (x - m) * (x - m)).sum::<f64>() / n as f64;
            let s = var.sqrt();
            mean.push(m);
            std.push(if s <= ZERO_STD_TOL * (1.0 + m.abs()) { 0.0 } else { s });
        }

        Ok(Self { mean, std })
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn std(&self) -> &[f64] {
        &self.std
    }

    /// Columns that were constant at fit time.
    pub fn zero_variance_columns(&self) -> Vec<usize> {
        self.std
            .iter()
            .enumerate()
            .filter(|(_, s)| **s == 0.0)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>, PipelineError> {
        self.check_width(row.len())?;
        Ok(row
            .iter()
            .zip(self.mean.iter().zip(&self.std))
            .map(|(x, (m, s))| if *s == 0.0 { 0.0 } else { (x - m) / s })
            .collect())
    }

    pub fn transform(&self, features: &DMatrix<f64>) -> Result<DMatrix<f64>, PipelineError> {
        self.check_width(features.ncols())?;
        let mut out = features.clone();
        for (j, mut col) in out.column_iter_mut().enumerate() {
            let (m, s) = (self.mean[j], self.std[j]);
            if s == 0.0 {
                col.fill(0.0);
            } else {
                col.apply(|x| *x = (*x - m) / s);
            }
        }
        Ok(out)
    }

    /// Undo `transform_row`. Zero-variance columns come back as the fitted mean.
    pub fn inverse_transform_row(&self, row: &[f64]) -> Result<Vec<f64>, PipelineError> {
        self.check_width(row.len())?;
        Ok(row
            .iter()
            .zip(self.mean.iter().zip(&self.std))
            .map(|(z, (m, s))| z * s + m)
            .collect())
    }

    fn check_width(&self, got: usize) -> Result<(), PipelineError> {
        if got != self.n_features() {
            return Err(PipelineError::WidthMismatch {
                expected: self.n_features(),
                got,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DMatrix<f64> {
        DMatrix::from_row_slice(4, 3, &[
            1.0, 10.0, 5.0, //
            2.0, 20.0, 5.0, //
            3.0, 30.0, 5.0, //
            4.0, 40.0, 5.0,
        ])
    }

    #[test]
    fn fit_uses_population_statistics() {
        let scaler = StandardScaler::fit(&sample()).unwrap();
        assert!((scaler.mean()[0] - 2.5).abs() < 1e-12);
        assert!((scaler.std()[0] - 1.25f64.sqrt()).abs() < 1e-12);
        assert_eq!(scaler.zero_variance_columns(), vec![2]);
    }

    #[test]
    fn scaled_training_columns_have_zero_mean_unit_std() {
        let data = sample();
        let scaler = StandardScaler::fit(&data).unwrap();
        let z = scaler.transform(&data).unwrap();
        for j in 0..2 {
            let col = z.column(j);
            let mean = col.sum() / 4.0;
            let var = col.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / 4.0;
            assert!(mean.abs() < 1e-12);
            assert!((var - 1.0).abs() < 1e-12);
        }
        assert!(z.column(2).iter().all(|&x| x == 0.0));
    }

    #[test]
    fn apply_never_refits() {
        let scaler = StandardScaler::fit(&sample()).unwrap();
        let z = scaler.transform_row(&[2.5, 25.0, 99.0]).unwrap();
        assert_eq!(z, vec![0.0, 0.0, 0.0]);
        let z = scaler.transform_row(&[5.0, 10.0, -3.0]).unwrap();
        assert!(z[0] > 2.0);
        assert_eq!(z[2], 0.0);
    }

    #[test]
    fn round_trip_on_fit_rows() {
        let data = sample();
        let scaler = StandardScaler::fit(&data).unwrap();
        for i in 0..data.nrows() {
            let row: Vec<f64> = data.row(i).iter().copied().collect();
            let back = scaler.inverse_transform_row(&scaler.transform_row(&row).unwrap()).unwrap();
            for j in 0..2 {
                assert!((back[j] - row[j]).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn matrix_and_row_paths_agree() {
        let data = sample();
        let scaler = StandardScaler::fit(&data).unwrap();
        let z = scaler.transform(&data).unwrap();
        let row: Vec<f64> = data.row(1).iter().copied().collect();
        let zr = scaler.transform_row(&row).unwrap();
        for j in 0..3 {
            assert_eq!(z[(1, j)], zr[j]);
        }
    }

    #[test]
    fn width_mismatch_is_rejected() {
        let scaler = StandardScaler::fit(&sample()).unwrap();
        assert_eq!(
            scaler.transform_row(&[1.0]).unwrap_err(),
            PipelineError::WidthMismatch { expected: 3, got: 1 }
        );
    }

    #[test]
    fn empty_fit_is_rejected() {
        assert!(StandardScaler::fit(&DMatrix::zeros(0, 3)).is_err());
    }
}
