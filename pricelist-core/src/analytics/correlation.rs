//! Pearson correlation over partially observed series.

use crate::data::LongitudinalDataset;
use crate::domain::CanonicalColumn;
use serde::{Deserialize, Serialize};

/// Pearson correlation using only the positions where both values exist.
///
/// Returns `None` with fewer than two complete pairs, or when either side has
/// zero variance over those pairs.
pub fn pearson(xs: &[Option<f64>], ys: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some((cov / (var_x * var_y).sqrt()).clamp(-1.0, 1.0))
}

/// Symmetric correlation matrix over the dataset's numeric columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<CanonicalColumn>,
    /// Row-major, `columns.len()` × `columns.len()`.
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn compute(dataset: &LongitudinalDataset) -> Self {
        let columns: Vec<CanonicalColumn> = dataset.columns().collect();
        let series: Vec<Vec<Option<f64>>> = columns
            .iter()
            .map(|&c| dataset.iter().map(|r| r.value(c)).collect())
            .collect();

        let k = columns.len();
        let mut values = vec![vec![None; k]; k];
        for i in 0..k {
            for j in i..k {
                let r = pearson(&series[i], &series[j]);
                // A defined self-correlation is exactly 1.
                let r = if i == j { r.map(|_| 1.0) } else { r };
                values[i][j] = r;
                values[j][i] = r;
            }
        }
        Self { columns, values }
    }

    pub fn get(&self, a: CanonicalColumn, b: CanonicalColumn) -> Option<f64> {
        let i = self.columns.iter().position(|&c| c == a)?;
        let j = self.columns.iter().position(|&c| c == b)?;
        self.values[i][j]
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
