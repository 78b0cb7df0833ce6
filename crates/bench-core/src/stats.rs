// ── Percentile helpers ────────────────────────────────────────────────────────

/// Linearly interpolated percentile of an ascending slice, `p` in `[0, 100]`.
///
/// Same estimator as NumPy's default `percentile` and pandas' `quantile`.
/// An empty slice yields `0.0`.
pub fn percentile(sorted_data: &[f64], p: f64) -> f64 {
    if sorted_data.is_empty() {
        return 0.0;
    }
    let last_index = sorted_data.len() - 1;
    let position = (p / 100.0).clamp(0.0, 1.0) * last_index as f64;
    let below = position.floor() as usize;
    let weight = position - below as f64;
    let lower = sorted_data[below];
    if weight == 0.0 {
        return lower;
    }
    let upper = sorted_data[(below + 1).min(last_index)];
    lower + weight * (upper - lower)
}

/// [`percentile`] with `q` expressed as a fraction in `[0, 1]`.
pub fn quantile(sorted_data: &[f64], q: f64) -> f64 {
    percentile(sorted_data, q * 100.0)
}

/// Sort a copy of `values`, dropping NaNs.
pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut v: Vec<f64> = values.iter().copied().filter(|x| !x.is_nan()).collect();
    v.sort_by(|a, b| a.total_cmp(b));
    v
}

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

// ── PercentileBand ────────────────────────────────────────────────────────────

/// Inclusive acceptance band between two quantiles of a sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PercentileBand {
    pub low: f64,
    pub high: f64,
}

impl PercentileBand {
    /// Band between the `lower_q` and `upper_q` quantiles of `values`.
    ///
    /// Returns `None` when `values` holds no finite sample.
    pub fn from_values(values: &[f64], lower_q: f64, upper_q: f64) -> Option<Self> {
        let data = sorted(values);
        if data.is_empty() {
            return None;
        }
        Some(Self {
            low: quantile(&data, lower_q),
            high: quantile(&data, upper_q),
        })
    }

    /// `true` when `value` lies strictly outside the band.
    pub fn is_outlier(&self, value: f64) -> bool {
        value < self.low || value > self.high
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
