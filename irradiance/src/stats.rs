use std::fmt;

use ndarray::ArrayView1;

/// Min, mean, median and max of a per-channel error vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SummaryStats {
    pub min: f64,
    pub mean: f64,
    pub median: f64,
    pub max: f64,
}

impl SummaryStats {
    /// Summarizes `values`. Any `NaN` makes every statistic `NaN`.
    ///
    /// # Returns
    /// The statistics or `None` if `values` is empty.
    pub fn of(values: ArrayView1<f64>) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        if values.iter().any(|v| v.is_nan()) {
            return Some(Self {
                min: f64::NAN,
                mean: f64::NAN,
                median: f64::NAN,
                max: f64::NAN,
            });
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let n = sorted.len();
        let median = if n % 2 == 1 {
            sorted[n / 2]
        } else {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        };

        Some(Self {
            min: sorted[0],
            mean: sorted.iter().sum::<f64>() / n as f64,
            median,
            max: sorted[n - 1],
        })
    }
}

impl fmt::Display for SummaryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Min: {:.4} Mean: {:.4} Median: {:.4} Max: {:.4}",
            self.min, self.mean, self.median, self.max
        )
    }
}
