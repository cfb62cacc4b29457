//! Zero-Phase Butterworth Low-Pass Filter
//!
//! Digital design goes analog prototype -> pre-warp -> bilinear transform ->
//! transfer function. Filtering runs forward then backward over an
//! odd-extended copy of the signal, starting each pass from the filter's
//! steady state scaled by the first sample.

use std::f64::consts::PI;

use rustfft::num_complex::Complex;
use tracing::debug;

use crate::FeatureError;

/// Butterworth low-pass with zero-phase (forward-backward) application
#[derive(Debug, Clone)]
pub struct ButterworthLowPass {
    order: usize,
    cutoff_hz: f64,
    sample_rate: f64,
    /// Numerator coefficients
    b: Vec<f64>,
    /// Denominator coefficients, `a[0] == 1`
    a: Vec<f64>,
}

impl ButterworthLowPass {
    /// Design a filter of the given order and cutoff
    pub fn new(order: usize, cutoff_hz: f64, sample_rate: f64) -> Result<Self, FeatureError> {
        if order == 0 {
            return Err(FeatureError::InvalidFilter(
                "order must be at least 1".to_string(),
            ));
        }
        let nyquist = 0.5 * sample_rate;
        let wn = cutoff_hz / nyquist;
        if !(wn > 0.0 && wn < 1.0) {
            return Err(FeatureError::InvalidFilter(format!(
                "cutoff {} Hz must lie strictly between 0 and Nyquist ({} Hz)",
                cutoff_hz, nyquist
            )));
        }

        let (b, a) = design(order, wn);
        debug!(
            "Designed order-{} Butterworth low-pass at {} Hz (fs={} Hz)",
            order, cutoff_hz, sample_rate
        );

        Ok(Self {
            order,
            cutoff_hz,
            sample_rate,
            b,
            a,
        })
    }

    /// Filter order
    pub fn order(&self) -> usize {
        self.order
    }

    /// Cutoff frequency (Hz)
    pub fn cutoff_hz(&self) -> f64 {
        self.cutoff_hz
    }

    /// Sampling frequency (Hz)
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Numerator and denominator coefficients
    pub fn coefficients(&self) -> (&[f64], &[f64]) {
        (&self.b, &self.a)
    }

    /// Samples of odd extension added at each end
    pub fn padding(&self) -> usize {
        3 * self.a.len().max(self.b.len())
    }

    /// Shortest signal the forward-backward pass accepts
    pub fn min_len(&self) -> usize {
        self.padding() + 1
    }

    /// Apply the filter forward and backward with zero phase shift
    pub fn filtfilt(&self, signal: &[f64]) -> Result<Vec<f64>, FeatureError> {
        let padlen = self.padding();
        let n = signal.len();
        if n <= padlen {
            return Err(FeatureError::FilterUnderflow {
                required: self.min_len(),
                actual: n,
            });
        }

        let mut extended = Vec::with_capacity(n + 2 * padlen);
        extended.extend((1..=padlen).rev().map(|i| 2.0 * signal[0] - signal[i]));
        extended.extend_from_slice(signal);
        extended.extend((1..=padlen).map(|i| 2.0 * signal[n - 1] - signal[n - 1 - i]));

        let zi = self.steady_state();

        let initial: Vec<f64> = zi.iter().map(|z| z * extended[0]).collect();
        let mut forward = self.lfilter(&extended, &initial);
        forward.reverse();

        let initial: Vec<f64> = zi.iter().map(|z| z * forward[0]).collect();
        let mut backward = self.lfilter(&forward, &initial);
        backward.reverse();

        Ok(backward[padlen..padlen + n].to_vec())
    }

    /// Direct-form II transposed filtering from the given state
    fn lfilter(&self, signal: &[f64], initial: &[f64]) -> Vec<f64> {
        let (b, a) = (&self.b, &self.a);
        let order = a.len() - 1;
        let mut z = initial.to_vec();

        signal
            .iter()
            .map(|&x| {
                let y = b[0] * x + z[0];
                for i in 0..order - 1 {
                    z[i] = b[i + 1] * x + z[i + 1] - a[i + 1] * y;
                }
                z[order - 1] = b[order] * x - a[order] * y;
                y
            })
            .collect()
    }

    /// Filter state reached after a unit step has settled
    fn steady_state(&self) -> Vec<f64> {
        let (b, a) = (&self.b, &self.a);
        let order = a.len() - 1;
        let dc_gain = b.iter().sum::<f64>() / a.iter().sum::<f64>();

        let mut zi = vec![0.0; order];
        zi[order - 1] = b[order] - a[order] * dc_gain;
        for i in (0..order - 1).rev() {
            zi[i] = b[i + 1] - a[i + 1] * dc_gain + zi[i + 1];
        }
        zi
    }
}

/// Butterworth low-pass coefficients for a cutoff normalized to Nyquist
fn design(order: usize, wn: f64) -> (Vec<f64>, Vec<f64>) {
    // Digital design is carried out at a nominal fs of 2
    let fs = 2.0;
    let warped = 2.0 * fs * (PI * wn / fs).tan();
    let n = order as f64;

    // Analog prototype poles, scaled to the warped cutoff
    let poles: Vec<Complex<f64>> = (0..order)
        .map(|k| {
            let m = 2.0 * k as f64 - n + 1.0;
            let theta = PI * m / (2.0 * n);
            -Complex::new(theta.cos(), theta.sin()) * warped
        })
        .collect();

    // Bilinear transform: every analog zero at infinity lands on z = -1
    let fs2 = Complex::new(2.0 * fs, 0.0);
    let digital_poles: Vec<Complex<f64>> =
        poles.iter().map(|&p| (fs2 + p) / (fs2 - p)).collect();
    let denom = poles
        .iter()
        .fold(Complex::new(1.0, 0.0), |acc, &p| acc * (fs2 - p));
    let gain = warped.powi(order as i32) * (Complex::new(1.0, 0.0) / denom).re;

    let zeros = vec![Complex::new(-1.0, 0.0); order];
    let b = poly(&zeros).iter().map(|c| c.re * gain).collect();
    let a = poly(&digital_poles).iter().map(|c| c.re).collect();
    (b, a)
}

/// Monic polynomial coefficients (highest power first) with the given roots
fn poly(roots: &[Complex<f64>]) -> Vec<Complex<f64>> {
    let mut coeffs = vec![Complex::new(1.0, 0.0)];
    for &root in roots {
        let mut next = vec![Complex::new(0.0, 0.0); coeffs.len() + 1];
        for (i, &c) in coeffs.iter().enumerate() {
            next[i] += c;
            next[i + 1] -= c * root;
        }
        coeffs = next;
    }
    coeffs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_order_coefficients() {
        // Closed-form bilinear Butterworth at Wn = 0.5: wc = tan(pi/4) = 1
        let filter = ButterworthLowPass::new(2, 25.0, 100.0).unwrap();
        let (b, a) = filter.coefficients();
        let k = 1.0 + std::f64::consts::SQRT_2 + 1.0;
        let expected_b = [1.0 / k, 2.0 / k, 1.0 / k];
        let expected_a = [1.0, 0.0, (2.0 - std::f64::consts::SQRT_2) / k];
        for (got, want) in b.iter().zip(expected_b.iter()) {
            assert!((got - want).abs() < 1e-12, "b: {} vs {}", got, want);
        }
        for (got, want) in a.iter().zip(expected_a.iter()) {
            assert!((got - want).abs() < 1e-12, "a: {} vs {}", got, want);
        }
    }

    #[test]
    fn test_unity_dc_gain() {
        let filter = ButterworthLowPass::new(4, 0.3, 50.0).unwrap();
        let (b, a) = filter.coefficients();
        assert_eq!(b.len(), 5);
        assert_eq!(a.len(), 5);
        assert!((a[0] - 1.0).abs() < 1e-15);
        let gain = b.iter().sum::<f64>() / a.iter().sum::<f64>();
        assert!((gain - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_constant_signal_passes_unchanged() {
        let filter = ButterworthLowPass::new(4, 0.3, 50.0).unwrap();
        let signal = vec![9.81; 128];
        let out = filter.filtfilt(&signal).unwrap();
        assert_eq!(out.len(), 128);
        for v in out {
            assert!((v - 9.81).abs() < 1e-6);
        }
    }

    #[test]
    fn test_high_frequency_attenuated() {
        let filter = ButterworthLowPass::new(4, 0.3, 50.0).unwrap();
        let signal: Vec<f64> = (0..128)
            .map(|i| 1.0 + (2.0 * PI * 5.0 * i as f64 / 50.0).sin())
            .collect();
        let out = filter.filtfilt(&signal).unwrap();
        // The 5 Hz component is far above the 0.3 Hz cutoff; only the offset survives
        for v in &out[16..112] {
            assert!((v - 1.0).abs() < 0.05, "residual {}", v);
        }
    }

    #[test]
    fn test_filter_underflow() {
        let filter = ButterworthLowPass::new(4, 0.3, 50.0).unwrap();
        assert_eq!(filter.min_len(), 16);
        assert_eq!(
            filter.filtfilt(&[0.0; 15]),
            Err(FeatureError::FilterUnderflow {
                required: 16,
                actual: 15
            })
        );
        assert!(filter.filtfilt(&[0.0; 16]).is_ok());
    }

    #[test]
    fn test_third_order_minimum() {
        let filter = ButterworthLowPass::new(3, 0.3, 50.0).unwrap();
        assert_eq!(filter.min_len(), 13);
    }

    #[test]
    fn test_invalid_design() {
        assert!(ButterworthLowPass::new(0, 0.3, 50.0).is_err());
        assert!(ButterworthLowPass::new(4, 30.0, 50.0).is_err());
        assert!(ButterworthLowPass::new(4, 0.0, 50.0).is_err());
    }

    #[test]
    fn test_input_not_mutated() {
        let filter = ButterworthLowPass::new(4, 0.3, 50.0).unwrap();
        let signal: Vec<f64> = (0..64).map(|i| (i as f64).sin()).collect();
        let copy = signal.clone();
        let _ = filter.filtfilt(&signal).unwrap();
        assert_eq!(signal, copy);
    }
}
