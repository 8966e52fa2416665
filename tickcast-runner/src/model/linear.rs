//! Ordinary least squares with several outputs sharing one design matrix.
//!
//! Solves the centered normal equations `(XᵀX + λI) B = XᵀY` by Cholesky
//! decomposition. λ starts negligible and grows only when the system is not
//! positive definite (collinear or constant feature columns).

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{check_columns, ModelError};

const INITIAL_RIDGE: f64 = 1e-10;
const RIDGE_GROWTH: f64 = 100.0;
const MAX_RIDGE_STEPS: usize = 12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearRegression {
    /// `n_features x n_outputs`.
    coefficients: Array2<f64>,
    /// One per output.
    intercept: Array1<f64>,
}

impl LinearRegression {
    pub fn fit(x: &Array2<f64>, y: &Array2<f64>) -> Result<Self, ModelError> {
        if x.nrows() == 0 {
            return Err(ModelError::EmptyTrainingSet);
        }
        if x.nrows() != y.nrows() {
            return Err(ModelError::DimensionMismatch {
                expected: x.nrows(),
                got: y.nrows(),
            });
        }

        let x_mean = x.mean_axis(Axis(0)).ok_or(ModelError::EmptyTrainingSet)?;
        let y_mean = y.mean_axis(Axis(0)).ok_or(ModelError::EmptyTrainingSet)?;
        let xc = x - &x_mean;
        let yc = y - &y_mean;

        let xtx = xc.t().dot(&xc);
        let xty = xc.t().dot(&yc);

        let p = xtx.nrows();
        let base = if p == 0 {
            1.0
        } else {
            (xtx.diag().sum() / p as f64).max(1.0)
        };

        let mut ridge = INITIAL_RIDGE * base;
        let mut factor = None;
        for _ in 0..MAX_RIDGE_STEPS {
            let mut a = xtx.clone();
            a.diag_mut().mapv_inplace(|d| d + ridge);
            if let Some(l) = cholesky(&a) {
                factor = Some(l);
                break;
            }
            ridge *= RIDGE_GROWTH;
        }
        let l = factor.ok_or(ModelError::Singular)?;
        debug!(ridge, features = p, outputs = y.ncols(), "least squares solved");

        let mut coefficients = Array2::zeros((p, y.ncols()));
        for (j, rhs) in xty.axis_iter(Axis(1)).enumerate() {
            let beta = cholesky_solve(&l, &rhs.to_owned());
            coefficients.column_mut(j).assign(&beta);
        }
        let intercept = &y_mean - &x_mean.dot(&coefficients);

        if coefficients.iter().chain(intercept.iter()).any(|v| !v.is_finite()) {
            return Err(ModelError::NonFinite);
        }
        Ok(Self {
            coefficients,
            intercept,
        })
    }

    pub fn n_features(&self) -> usize {
        self.coefficients.nrows()
    }

    pub fn n_outputs(&self) -> usize {
        self.coefficients.ncols()
    }

    pub fn coefficients(&self) -> &Array2<f64> {
        &self.coefficients
    }

    pub fn intercept(&self) -> &Array1<f64> {
        &self.intercept
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array2<f64>, ModelError> {
        check_columns(x, self.n_features())?;
        Ok(x.dot(&self.coefficients) + &self.intercept)
    }
}

/// Lower-triangular `L` with `A = L Lᵀ`, or `None` if `A` is not positive definite.
fn cholesky(a: &Array2<f64>) -> Option<Array2<f64>> {
    let n = a.nrows();
    let mut l = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }
            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= 0.0 || !diag.is_finite() {
                    return None;
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }
    Some(l)
}

/// Solve `L Lᵀ x = b` by forward then backward substitution.
fn cholesky_solve(l: &Array2<f64>, b: &Array1<f64>) -> Array1<f64> {
    let n = l.nrows();
    let mut z = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * z[j];
        }
        z[i] = (b[i] - sum) / l[[i, i]];
    }

    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * x[j];
        }
        x[i] = (z[i] - sum) / l[[i, i]];
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn recovers_exact_linear_relation() {
        // y0 = 2a - b + 1, y1 = 0.5a + 3
        let x = array![[0.0, 1.0], [1.0, 0.0], [2.0, 5.0], [3.0, 2.0], [4.0, 4.0]];
        let y = Array2::from_shape_fn((5, 2), |(i, j)| {
            let (a, b) = (x[[i, 0]], x[[i, 1]]);
            if j == 0 {
                2.0 * a - b + 1.0
            } else {
                0.5 * a + 3.0
            }
        });
        let model = LinearRegression::fit(&x, &y).unwrap();
        let c = model.coefficients();
        assert!((c[[0, 0]] - 2.0).abs() < 1e-6);
        assert!((c[[1, 0]] + 1.0).abs() < 1e-6);
        assert!((c[[0, 1]] - 0.5).abs() < 1e-6);
        assert!(c[[1, 1]].abs() < 1e-6);
        assert!((model.intercept()[0] - 1.0).abs() < 1e-6);
        assert!((model.intercept()[1] - 3.0).abs() < 1e-6);

        let pred = model.predict(&x).unwrap();
        for (p, t) in pred.iter().zip(y.iter()) {
            assert!((p - t).abs() < 1e-6);
        }
    }

    #[test]
    fn constant_column_gets_zero_weight() {
        let x = array![[1.0, 5.0], [2.0, 5.0], [3.0, 5.0]];
        let y = array![[2.0], [4.0], [6.0]];
        let model = LinearRegression::fit(&x, &y).unwrap();
        assert!(model.coefficients()[[1, 0]].abs() < 1e-9);
        assert!((model.coefficients()[[0, 0]] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn collinear_columns_still_fit() {
        let x = array![[1.0, 2.0], [2.0, 4.0], [3.0, 6.0], [4.0, 8.0]];
        let y = array![[1.0], [2.0], [3.0], [4.0]];
        let model = LinearRegression::fit(&x, &y).unwrap();
        let pred = model.predict(&x).unwrap();
        for (p, t) in pred.iter().zip(y.iter()) {
            assert!((p - t).abs() < 1e-4, "{p} vs {t}");
        }
    }

    #[test]
    fn single_row_predicts_its_target() {
        let model = LinearRegression::fit(&array![[3.0, 1.0]], &array![[7.0, 8.0, 9.0]]).unwrap();
        let pred = model.predict(&array![[100.0, -4.0]]).unwrap();
        assert_eq!(pred.shape(), &[1, 3]);
        assert!((pred[[0, 0]] - 7.0).abs() < 1e-9);
    }

    #[test]
    fn empty_and_mismatched_inputs() {
        let empty = Array2::<f64>::zeros((0, 2));
        assert_eq!(
            LinearRegression::fit(&empty, &Array2::zeros((0, 1))).unwrap_err(),
            ModelError::EmptyTrainingSet
        );
        assert!(matches!(
            LinearRegression::fit(&array![[1.0]], &array![[1.0], [2.0]]),
            Err(ModelError::DimensionMismatch { .. })
        ));
    }
}
