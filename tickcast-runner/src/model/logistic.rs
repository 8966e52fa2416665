//! Multinomial logistic regression over the three candle directions.
//!
//! Full-batch gradient descent on the mean cross-entropy with a small L2
//! penalty on the weights (not the biases). Parameters start at zero, so a fit
//! is fully deterministic.

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{check_columns, ModelError};
use crate::dataset::Direction;

const LEARNING_RATE: f64 = 0.5;
const MAX_ITER: usize = 400;
const TOLERANCE: f64 = 1e-6;
/// Inverse regularization strength, per sample.
const C: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// `n_classes x n_features`.
    weights: Array2<f64>,
    bias: Array1<f64>,
}

impl LogisticRegression {
    pub fn fit(x: &Array2<f64>, y: &[Direction]) -> Result<Self, ModelError> {
        let n = x.nrows();
        if n == 0 {
            return Err(ModelError::EmptyTrainingSet);
        }
        if n != y.len() {
            return Err(ModelError::DimensionMismatch {
                expected: n,
                got: y.len(),
            });
        }

        let k = Direction::COUNT;
        let mut onehot = Array2::<f64>::zeros((n, k));
        for (i, d) in y.iter().enumerate() {
            onehot[[i, d.index()]] = 1.0;
        }

        let mut model = Self {
            weights: Array2::zeros((k, x.ncols())),
            bias: Array1::zeros(k),
        };
        let l2 = 1.0 / (C * n as f64);

        let mut iterations = 0;
        for _ in 0..MAX_ITER {
            iterations += 1;
            let errors = model.probabilities(x) - &onehot;
            let grad_w = errors.t().dot(x) / n as f64 + &model.weights * l2;
            let grad_b = errors.sum_axis(Axis(0)) / n as f64;

            model.weights.scaled_add(-LEARNING_RATE, &grad_w);
            model.bias.scaled_add(-LEARNING_RATE, &grad_b);

            let step = grad_w
                .iter()
                .chain(grad_b.iter())
                .fold(0.0_f64, |acc, g| acc.max(g.abs()));
            if step < TOLERANCE {
                break;
            }
        }
        debug!(iterations, rows = n, "logistic regression fitted");

        if model
            .weights
            .iter()
            .chain(model.bias.iter())
            .any(|v| !v.is_finite())
        {
            return Err(ModelError::NonFinite);
        }
        Ok(model)
    }

    pub fn n_features(&self) -> usize {
        self.weights.ncols()
    }

    pub fn weights(&self) -> &Array2<f64> {
        &self.weights
    }

    pub fn bias(&self) -> &Array1<f64> {
        &self.bias
    }

    /// Class probabilities, one row per input row, columns in [`Direction::index`] order.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>, ModelError> {
        check_columns(x, self.n_features())?;
        Ok(self.probabilities(x))
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Vec<Direction>, ModelError> {
        let proba = self.predict_proba(x)?;
        Ok(proba
            .axis_iter(Axis(0))
            .map(|row| {
                let best = row
                    .iter()
                    .enumerate()
                    .fold((0, f64::NEG_INFINITY), |(bi, bv), (i, &v)| {
                        if v > bv {
                            (i, v)
                        } else {
                            (bi, bv)
                        }
                    })
                    .0;
                Direction::from_index(best).unwrap_or(Direction::Flat)
            })
            .collect())
    }

    fn probabilities(&self, x: &Array2<f64>) -> Array2<f64> {
        let mut logits = x.dot(&self.weights.t()) + &self.bias;
        for mut row in logits.axis_iter_mut(Axis(0)) {
            let max = row.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
            row.mapv_inplace(|v| (v - max).exp());
            let sum = row.sum();
            row.mapv_inplace(|v| v / sum);
        }
        logits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn separates_three_clusters() {
        let x = array![
            [-3.0, 0.0],
            [-2.5, 0.2],
            [-2.8, -0.1],
            [0.0, 0.1],
            [0.1, -0.2],
            [-0.1, 0.0],
            [3.0, 0.0],
            [2.7, 0.1],
            [2.9, -0.2]
        ];
        let y = [
            Direction::Down,
            Direction::Down,
            Direction::Down,
            Direction::Flat,
            Direction::Flat,
            Direction::Flat,
            Direction::Up,
            Direction::Up,
            Direction::Up,
        ];
        let model = LogisticRegression::fit(&x, &y).unwrap();
        assert_eq!(model.predict(&x).unwrap(), y.to_vec());
        assert_eq!(
            model.predict(&array![[-4.0, 0.0], [4.0, 0.0]]).unwrap(),
            vec![Direction::Down, Direction::Up]
        );
    }

    #[test]
    fn probabilities_sum_to_one() {
        let x = array![[1.0, -1.0], [0.5, 2.0], [-1.0, 0.0]];
        let y = [Direction::Up, Direction::Down, Direction::Flat];
        let model = LogisticRegression::fit(&x, &y).unwrap();
        let proba = model.predict_proba(&x).unwrap();
        for row in proba.axis_iter(Axis(0)) {
            assert!((row.sum() - 1.0).abs() < 1e-12);
            assert!(row.iter().all(|p| *p > 0.0));
        }
    }

    #[test]
    fn single_class_predicts_that_class() {
        let x = array![[0.0], [1.0], [2.0], [3.0]];
        let y = [Direction::Up; 4];
        let model = LogisticRegression::fit(&x, &y).unwrap();
        assert!(model
            .predict(&array![[0.5], [2.5]])
            .unwrap()
            .iter()
            .all(|d| *d == Direction::Up));
    }

    #[test]
    fn fit_is_deterministic() {
        let x = array![[0.3, 1.0], [1.2, -0.4], [-0.7, 0.2], [0.0, 0.0]];
        let y = [Direction::Up, Direction::Down, Direction::Flat, Direction::Up];
        let a = LogisticRegression::fit(&x, &y).unwrap();
        let b = LogisticRegression::fit(&x, &y).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_wrong_width() {
        let model = LogisticRegression::fit(&array![[1.0, 2.0]], &[Direction::Up]).unwrap();
        assert!(matches!(
            model.predict(&array![[1.0]]),
            Err(ModelError::DimensionMismatch { expected: 2, got: 1 })
        ));
    }
}
