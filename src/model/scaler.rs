use serde::{Deserialize, Serialize};

/// Scales below this are treated as zero variance and left at 1.
const MIN_SCALE: f64 = 10.0 * f64::EPSILON;

/// Per-column z-score parameters: `(x - mean) / scale`.
///
/// Fitted once on training rows and stored with the classifier; inference
/// only ever calls [`StandardScaler::transform_row`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub means: Vec<f64>,
    pub scales: Vec<f64>,
}

impl StandardScaler {
    /// Fit mean and population standard deviation per column.
    pub fn fit(rows: &[Vec<f64>], dim: usize) -> Self {
        let n = rows.len();
        let mut means = vec![0.0_f64; dim];
        let mut vars = vec![0.0_f64; dim];

        if n == 0 {
            return Self {
                means,
                scales: vec![1.0; dim],
            };
        }

        for row in rows {
            for (d, &val) in row.iter().enumerate().take(dim) {
                means[d] += val;
            }
        }
        for m in &mut means {
            *m /= n as f64;
        }

        for row in rows {
            for (d, &val) in row.iter().enumerate().take(dim) {
                let diff = val - means[d];
                vars[d] += diff * diff;
            }
        }
        let scales = vars
            .iter()
            .map(|v| {
                let std = (v / n as f64).sqrt();
                if std < MIN_SCALE { 1.0 } else { std }
            })
            .collect();

        Self { means, scales }
    }

    pub fn dim(&self) -> usize {
        self.means.len()
    }

    pub fn transform_row(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.means.iter().zip(&self.scales))
            .map(|(&x, (&m, &s))| (x - m) / s)
            .collect()
    }

    pub fn transform(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        rows.iter().map(|r| self.transform_row(r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_transform() {
        let rows = vec![
            vec![10.0, 100.0],
            vec![20.0, 200.0],
            vec![30.0, 300.0],
        ];
        let scaler = StandardScaler::fit(&rows, 2);
        let normed = scaler.transform(&rows);

        let mean_0: f64 = normed.iter().map(|v| v[0]).sum::<f64>() / 3.0;
        let mean_1: f64 = normed.iter().map(|v| v[1]).sum::<f64>() / 3.0;
        assert!(mean_0.abs() < 1e-10);
        assert!(mean_1.abs() < 1e-10);

        // Same relative position in both columns despite different scales
        assert!((normed[0][0] - normed[0][1]).abs() < 1e-10);
        assert!((normed[2][0] - (1.5_f64).sqrt()).abs() < 1e-10);
    }

    #[test]
    fn test_constant_column_keeps_unit_scale() {
        let rows = vec![vec![5.0, 1.0], vec![5.0, 3.0]];
        let scaler = StandardScaler::fit(&rows, 2);
        assert_eq!(scaler.scales[0], 1.0);
        assert_eq!(scaler.transform_row(&[7.0, 2.0]), vec![2.0, 0.0]);
    }

    #[test]
    fn test_transform_uses_fitted_parameters() {
        let scaler = StandardScaler::fit(&[vec![0.0], vec![2.0]], 1);
        // Unseen values are scaled with the training mean/std, not refitted
        assert_eq!(scaler.transform_row(&[4.0]), vec![3.0]);
        assert_eq!(scaler.transform_row(&[4.0]), scaler.transform_row(&[4.0]));
    }
}
