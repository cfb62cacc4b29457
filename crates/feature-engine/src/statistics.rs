//! Time-Domain Statistical Features

use crate::linalg::least_squares;
use crate::sanitize;

/// Values in a time-domain block
pub const TIME_DOMAIN_FEATURES: usize = 15;

/// Autoregressive model order
pub const AR_ORDER: usize = 4;

/// Histogram bins used for the entropy estimate
pub const ENTROPY_BINS: usize = 30;

/// Column suffixes of a time-domain block, in output order
pub const TIME_FEATURE_NAMES: [&str; TIME_DOMAIN_FEATURES] = [
    "mean",
    "std",
    "mad",
    "max",
    "min",
    "sma",
    "energy",
    "iqr",
    "entropy",
    "arCoeff1",
    "arCoeff2",
    "arCoeff3",
    "arCoeff4",
    "skewness",
    "kurtosis",
];

/// Statistical features for a scalar signal
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatisticalFeatures {
    /// Mean value
    pub mean: f64,
    /// Population standard deviation
    pub std_dev: f64,
    /// Median absolute deviation from the median
    pub mad: f64,
    /// Maximum value
    pub max: f64,
    /// Minimum value
    pub min: f64,
    /// Mean absolute value (signal magnitude area)
    pub sma: f64,
    /// Mean of squares
    pub energy: f64,
    /// 75th minus 25th percentile
    pub iqr: f64,
    /// Shannon entropy of the value histogram (bits)
    pub entropy: f64,
    /// Least-squares AR coefficients, lag 1 first
    pub ar: [f64; AR_ORDER],
    /// Skewness (asymmetry)
    pub skewness: f64,
    /// Excess kurtosis (tailedness)
    pub kurtosis: f64,
}

impl StatisticalFeatures {
    /// Compute statistical features from a slice of values.
    ///
    /// Empty and constant signals yield all zeros; any non-finite feature is
    /// replaced by 0.0.
    pub fn compute(values: &[f64]) -> Self {
        let Some(&first) = values.first() else {
            return Self::default();
        };
        if values.iter().all(|&v| v == first) {
            return Self::default();
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);

        let med = median(values);
        let deviations: Vec<f64> = values.iter().map(|v| (v - med).abs()).collect();

        let mut features = Self {
            mean,
            std_dev: variance.sqrt(),
            mad: median(&deviations),
            max,
            min,
            sma: values.iter().map(|v| v.abs()).sum::<f64>() / n,
            energy: values.iter().map(|v| v * v).sum::<f64>() / (n + 1e-12),
            iqr: percentile(values, 75.0) - percentile(values, 25.0),
            entropy: entropy(values, ENTROPY_BINS),
            ar: ar_coefficients(values),
            skewness: skewness(values),
            kurtosis: kurtosis(values),
        };
        features.sanitize();
        features
    }

    /// Flatten into output order
    pub fn to_array(&self) -> [f64; TIME_DOMAIN_FEATURES] {
        [
            self.mean,
            self.std_dev,
            self.mad,
            self.max,
            self.min,
            self.sma,
            self.energy,
            self.iqr,
            self.entropy,
            self.ar[0],
            self.ar[1],
            self.ar[2],
            self.ar[3],
            self.skewness,
            self.kurtosis,
        ]
    }

    fn sanitize(&mut self) {
        let mut flat = self.to_array();
        if sanitize(&mut flat) > 0 {
            *self = Self {
                mean: flat[0],
                std_dev: flat[1],
                mad: flat[2],
                max: flat[3],
                min: flat[4],
                sma: flat[5],
                energy: flat[6],
                iqr: flat[7],
                entropy: flat[8],
                ar: [flat[9], flat[10], flat[11], flat[12]],
                skewness: flat[13],
                kurtosis: flat[14],
            };
        }
    }
}

/// Percentile with linear interpolation between order statistics
pub(crate) fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let pos = (q / 100.0) * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

pub(crate) fn median(values: &[f64]) -> f64 {
    percentile(values, 50.0)
}

/// Second, third and fourth central moments of the finite values, with their mean
fn moments(values: &[f64]) -> Option<(f64, f64, f64, f64)> {
    let finite: Vec<f64> = values.iter().cloned().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return None;
    }
    let n = finite.len() as f64;
    let mean = finite.iter().sum::<f64>() / n;
    let (mut m2, mut m3, mut m4) = (0.0, 0.0, 0.0);
    for v in &finite {
        let d = v - mean;
        m2 += d * d;
        m3 += d * d * d;
        m4 += d * d * d * d;
    }
    Some((mean, m2 / n, m3 / n, m4 / n))
}

/// Variance too small to distinguish from rounding noise around the mean
fn negligible_variance(mean: f64, m2: f64) -> bool {
    m2 <= (1e-14 * mean).powi(2)
}

/// Population skewness `m3 / m2^1.5`; NaN when the variance vanishes
pub(crate) fn skewness(values: &[f64]) -> f64 {
    match moments(values) {
        Some((mean, m2, m3, _)) if !negligible_variance(mean, m2) => m3 / m2.powf(1.5),
        _ => f64::NAN,
    }
}

/// Fisher excess kurtosis `m4 / m2² − 3`; NaN when the variance vanishes
pub(crate) fn kurtosis(values: &[f64]) -> f64 {
    match moments(values) {
        Some((mean, m2, _, m4)) if !negligible_variance(mean, m2) => m4 / (m2 * m2) - 3.0,
        _ => f64::NAN,
    }
}

/// Shannon entropy (bits) of an equal-width, density-normalized histogram
/// over `[min, max]`
pub(crate) fn entropy(values: &[f64], bins: usize) -> f64 {
    if values.is_empty() || bins == 0 || values.iter().any(|v| !v.is_finite()) {
        return 0.0;
    }
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    // A degenerate range is widened to [min - 0.5, max + 0.5]
    let (lo, hi) = if min == max {
        (min - 0.5, max + 0.5)
    } else {
        (min, max)
    };

    let edges: Vec<f64> = (0..=bins)
        .map(|i| lo + (hi - lo) * i as f64 / bins as f64)
        .collect();
    let scale = bins as f64 / (hi - lo);

    let mut counts = vec![0usize; bins];
    for &v in values {
        let mut idx = (((v - lo) * scale) as usize).min(bins - 1);
        // Rounding can misplace values that sit on an edge
        if v < edges[idx] && idx > 0 {
            idx -= 1;
        } else if idx + 1 < bins && v >= edges[idx + 1] {
            idx += 1;
        }
        counts[idx] += 1;
    }

    let total = values.len() as f64;
    let h = -counts
        .iter()
        .zip(edges.windows(2))
        .filter(|(c, _)| **c > 0)
        .map(|(&c, edge)| {
            let p = c as f64 / (total * (edge[1] - edge[0]));
            p * (p + 1e-12).log2()
        })
        .sum::<f64>();

    if h.is_finite() {
        h
    } else {
        0.0
    }
}

/// Least-squares AR coefficients predicting `x[t]` from `x[t-1..=t-AR_ORDER]`
pub(crate) fn ar_coefficients(values: &[f64]) -> [f64; AR_ORDER] {
    let n = values.len();
    let mut coeffs = [0.0; AR_ORDER];
    if n <= AR_ORDER {
        return coeffs;
    }

    let target = &values[AR_ORDER..];
    let lags: Vec<Vec<f64>> = (1..=AR_ORDER)
        .map(|k| values[AR_ORDER - k..n - k].to_vec())
        .collect();
    for (dst, src) in coeffs.iter_mut().zip(least_squares(&lags, target)) {
        *dst = src;
    }
    coeffs
}
