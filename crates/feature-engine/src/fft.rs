//! FFT-based Frequency Analysis

use std::f64::consts::PI;

use rustfft::{num_complex::Complex, FftPlanner};

use crate::sanitize;
use crate::statistics::{kurtosis, skewness};

/// Values in a frequency-domain block
pub const FREQ_DOMAIN_FEATURES: usize = 12;

/// Number of equal-width PSD bands
pub const SPECTRAL_BANDS: usize = 8;

/// Column suffixes of a frequency-domain block, in output order
pub const SPECTRAL_FEATURE_NAMES: [&str; FREQ_DOMAIN_FEATURES] = [
    "fft.meanFreq",
    "fft.maxFreq",
    "fft.skewness",
    "fft.kurtosis",
    "fft.bandEnergy1",
    "fft.bandEnergy2",
    "fft.bandEnergy3",
    "fft.bandEnergy4",
    "fft.bandEnergy5",
    "fft.bandEnergy6",
    "fft.bandEnergy7",
    "fft.bandEnergy8",
];

/// Spectral descriptors of a scalar signal
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpectralFeatures {
    /// Power-weighted mean frequency (Hz)
    pub mean_frequency: f64,
    /// Frequency of the first PSD maximum (Hz)
    pub peak_frequency: f64,
    /// Skewness of the PSD values
    pub psd_skewness: f64,
    /// Excess kurtosis of the PSD values
    pub psd_kurtosis: f64,
    /// Summed PSD in each of the equal-width bin bands
    pub band_energy: [f64; SPECTRAL_BANDS],
}

impl SpectralFeatures {
    /// Flatten into output order
    pub fn to_array(&self) -> [f64; FREQ_DOMAIN_FEATURES] {
        let mut out = [0.0; FREQ_DOMAIN_FEATURES];
        out[0] = self.mean_frequency;
        out[1] = self.peak_frequency;
        out[2] = self.psd_skewness;
        out[3] = self.psd_kurtosis;
        out[4..].copy_from_slice(&self.band_energy);
        out
    }
}

/// FFT Analyzer for frequency domain features
pub struct FftAnalyzer {
    /// FFT planner for efficient computation
    planner: FftPlanner<f64>,
    /// Sampling frequency (Hz)
    sample_rate: f64,
}

impl FftAnalyzer {
    /// Create a new FFT analyzer
    pub fn new(sample_rate: f64) -> Self {
        Self {
            planner: FftPlanner::new(),
            sample_rate,
        }
    }

    /// Sampling frequency (Hz)
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Symmetric Hann window of length `n`
    pub fn hann_window(n: usize) -> Vec<f64> {
        match n {
            0 => Vec::new(),
            1 => vec![1.0],
            _ => (0..n)
                .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f64 / (n - 1) as f64).cos())
                .collect(),
        }
    }

    /// Frequencies (Hz) of the one-sided bins for a signal of length `n`
    pub fn frequencies(&self, n: usize) -> Vec<f64> {
        if n == 0 {
            return Vec::new();
        }
        (0..=n / 2)
            .map(|k| k as f64 * self.sample_rate / n as f64)
            .collect()
    }

    /// One-sided spectrum (bins `0..=n/2`) of the Hann-windowed signal
    fn spectrum(&mut self, signal: &[f64]) -> Vec<Complex<f64>> {
        let n = signal.len();
        if n == 0 {
            return Vec::new();
        }

        let mut buffer: Vec<Complex<f64>> = signal
            .iter()
            .zip(Self::hann_window(n))
            .map(|(&v, w)| Complex::new(v * w, 0.0))
            .collect();

        let fft = self.planner.plan_fft_forward(n);
        fft.process(&mut buffer);
        buffer.truncate(n / 2 + 1);
        buffer
    }

    /// Power spectral density `|X|²` of the Hann-windowed signal
    pub fn power_spectrum(&mut self, signal: &[f64]) -> Vec<f64> {
        self.spectrum(signal).iter().map(|c| c.norm_sqr()).collect()
    }

    /// Magnitude spectrum `|X|` of the Hann-windowed signal
    pub fn magnitude_spectrum(&mut self, signal: &[f64]) -> Vec<f64> {
        self.spectrum(signal).iter().map(|c| c.norm()).collect()
    }

    /// Compute spectral features from a signal.
    ///
    /// Empty signals and signals with zero spectral power yield all zeros.
    pub fn analyze(&mut self, signal: &[f64]) -> SpectralFeatures {
        let psd = self.power_spectrum(signal);
        let total: f64 = psd.iter().sum();
        if psd.is_empty() || total == 0.0 {
            return SpectralFeatures::default();
        }

        let freqs = self.frequencies(signal.len());
        let mean_frequency =
            freqs.iter().zip(&psd).map(|(f, p)| f * p).sum::<f64>() / (total + 1e-12);

        let mut peak = 0;
        for (i, &p) in psd.iter().enumerate() {
            if p > psd[peak] {
                peak = i;
            }
        }

        let len = psd.len();
        let mut band_energy = [0.0; SPECTRAL_BANDS];
        for (b, energy) in band_energy.iter_mut().enumerate() {
            let lo = b * len / SPECTRAL_BANDS;
            let hi = (b + 1) * len / SPECTRAL_BANDS;
            *energy = psd[lo..hi].iter().sum();
        }

        let mut flat = SpectralFeatures {
            mean_frequency,
            peak_frequency: freqs[peak],
            psd_skewness: skewness(&psd),
            psd_kurtosis: kurtosis(&psd),
            band_energy,
        }
        .to_array();
        sanitize(&mut flat);

        let mut band_energy = [0.0; SPECTRAL_BANDS];
        band_energy.copy_from_slice(&flat[4..]);
        SpectralFeatures {
            mean_frequency: flat[0],
            peak_frequency: flat[1],
            psd_skewness: flat[2],
            psd_kurtosis: flat[3],
            band_energy,
        }
    }
}
