//! Savitzky-Golay smoothing.
//!
//! Every output point is the value of a least-squares polynomial fitted to a
//! window of input points. The first and last `window / 2` points, where no
//! centred window fits, are evaluated from the fit of the first and last full
//! window instead.
use crate::error::Error;

/// Used when smoothing is requested without parameters.
pub const DEFAULT_WINDOW: usize = 101;
pub const DEFAULT_ORDER: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavitzkyGolay {
    window: usize,
    order: usize,
}

impl Default for SavitzkyGolay {
    fn default() -> Self {
        SavitzkyGolay {
            window: DEFAULT_WINDOW,
            order: DEFAULT_ORDER,
        }
    }
}

impl SavitzkyGolay {
    /// `window` must be odd and larger than `order`.
    pub fn new(window: usize, order: usize) -> Result<Self, Error> {
        if window % 2 == 0 || order >= window {
            return Err(Error::InvalidSmoothing {
                window,
                order,
                len: 0,
            });
        }
        Ok(SavitzkyGolay { window, order })
    }

    pub fn apply(&self, samples: &[f64]) -> Result<Vec<f64>, Error> {
        let len = samples.len();
        if self.window > len {
            return Err(Error::InvalidSmoothing {
                window: self.window,
                order: self.order,
                len,
            });
        }

        let half = self.window / 2;
        // table[j]: weights evaluating the window fit at window position j
        let table: Vec<Vec<f64>> = (0..self.window).map(|j| self.weights(j)).collect();

        let head = &samples[..self.window];
        let tail = &samples[len - self.window..];
        let smoothed = (0..len)
            .map(|i| {
                if i < half {
                    dot(&table[i], head)
                } else if i >= len - half {
                    dot(&table[i + self.window - len], tail)
                } else {
                    dot(&table[half], &samples[i - half..=i + half])
                }
            })
            .collect();
        Ok(smoothed)
    }

    /// Weights `w` such that `sum(w[k] * y[k])` is the least-squares
    /// polynomial through the window, evaluated at window position `at`.
    fn weights(&self, at: usize) -> Vec<f64> {
        let half = self.window / 2;
        // Positions scaled into [-1, 1] keep the normal equations well conditioned
        let scale = half.max(1) as f64;
        let position = |k: usize| (k as f64 - half as f64) / scale;
        let terms = self.order + 1;

        let mut normal = vec![vec![0.0; terms]; terms];
        for k in 0..self.window {
            let x = position(k);
            for (r, row) in normal.iter_mut().enumerate() {
                for (c, cell) in row.iter_mut().enumerate() {
                    *cell += x.powi((r + c) as i32);
                }
            }
        }

        let u = position(at);
        let rhs: Vec<f64> = (0..terms).map(|p| u.powi(p as i32)).collect();
        let coefficients = solve(normal, rhs);

        (0..self.window)
            .map(|k| {
                let x = position(k);
                coefficients
                    .iter()
                    .enumerate()
                    .map(|(p, a)| a * x.powi(p as i32))
                    .sum()
            })
            .collect()
    }
}

fn dot(weights: &[f64], values: &[f64]) -> f64 {
    weights.iter().zip(values).map(|(w, v)| w * v).sum()
}

/// Gaussian elimination with partial pivoting. `a` is the symmetric positive
/// definite normal matrix, so a pivot is always found.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Vec<f64> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .unwrap_or(col);
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    x
}
