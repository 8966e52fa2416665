//! Per-column standardization: `(x - mean) / std`.

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::model::ModelError;

/// Standard scaler fitted on training rows only.
///
/// Uses the population standard deviation. A constant column gets scale 1.0,
/// so it maps to zero instead of dividing by zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Array1<f64>,
    scale: Array1<f64>,
}

impl StandardScaler {
    pub fn fit(x: &Array2<f64>) -> Result<Self, ModelError> {
        let mean = x.mean_axis(Axis(0)).ok_or(ModelError::EmptyTrainingSet)?;
        let scale = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s.is_finite() && s > 0.0 { s } else { 1.0 });
        Ok(Self { mean, scale })
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    pub fn scale(&self) -> &Array1<f64> {
        &self.scale
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>, ModelError> {
        if x.ncols() != self.n_features() {
            return Err(ModelError::DimensionMismatch {
                expected: self.n_features(),
                got: x.ncols(),
            });
        }
        Ok((x - &self.mean) / &self.scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn centers_and_scales() {
        let x = array![[1.0, 10.0], [3.0, 10.0], [5.0, 10.0]];
        let scaler = StandardScaler::fit(&x).unwrap();
        assert_eq!(scaler.mean(), &array![3.0, 10.0]);

        let z = scaler.transform(&x).unwrap();
        let col_mean = z.column(0).sum() / 3.0;
        assert!(col_mean.abs() < 1e-12);
        let var = z.column(0).mapv(|v| v * v).sum() / 3.0;
        assert!((var - 1.0).abs() < 1e-12);
    }

    #[test]
    fn constant_column_maps_to_zero() {
        let x = array![[1.0, 7.0], [2.0, 7.0]];
        let scaler = StandardScaler::fit(&x).unwrap();
        assert_eq!(scaler.scale()[1], 1.0);
        let z = scaler.transform(&x).unwrap();
        assert!(z.column(1).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn unseen_rows_use_training_statistics() {
        let train = array![[0.0], [2.0]];
        let scaler = StandardScaler::fit(&train).unwrap();
        let z = scaler.transform(&array![[4.0]]).unwrap();
        assert_eq!(z[[0, 0]], 3.0);
    }

    #[test]
    fn empty_fit_is_rejected() {
        let x = Array2::<f64>::zeros((0, 3));
        assert!(matches!(
            StandardScaler::fit(&x),
            Err(ModelError::EmptyTrainingSet)
        ));
    }

    #[test]
    fn column_count_is_checked() {
        let scaler = StandardScaler::fit(&array![[1.0, 2.0]]).unwrap();
        assert!(matches!(
            scaler.transform(&array![[1.0]]),
            Err(ModelError::DimensionMismatch { expected: 2, got: 1 })
        ));
    }
}
