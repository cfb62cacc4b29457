//! Derived Signal Generation
//!
//! Separates gravity from the raw accelerometer with the zero-phase low-pass,
//! then derives body acceleration and jerk for both sensors.

use sensor_window::{SensorWindow, TriaxialSignal};
use tracing::trace;

use crate::features::{BodySource, FeatureConfig, SignalKind};
use crate::filter::ButterworthLowPass;
use crate::FeatureError;

/// Numerical gradient with unit spacing: central differences in the interior,
/// one-sided first differences at both ends
pub fn gradient(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    if n < 2 {
        return vec![0.0; n];
    }

    let mut out = Vec::with_capacity(n);
    out.push(values[1] - values[0]);
    out.extend(values.windows(3).map(|w| (w[2] - w[0]) / 2.0));
    out.push(values[n - 1] - values[n - 2]);
    out
}

/// All physical signals derived from one window
#[derive(Debug, Clone)]
pub struct DerivedSignals {
    /// Accelerometer as recorded (gravity included)
    pub accel: TriaxialSignal,
    /// Low-frequency gravity component
    pub gravity: TriaxialSignal,
    /// Accelerometer minus gravity
    pub body: TriaxialSignal,
    /// Jerk of the body-slot accelerometer signal
    pub acc_jerk: TriaxialSignal,
    /// Gyroscope as recorded
    pub gyro: TriaxialSignal,
    /// Angular jerk
    pub gyro_jerk: TriaxialSignal,
    /// Which accelerometer signal fills the body slots
    pub body_source: BodySource,
}

impl DerivedSignals {
    /// Triaxial signal behind a feature slot
    pub fn signal(&self, kind: SignalKind) -> &TriaxialSignal {
        match kind {
            SignalKind::BodyAcc => match self.body_source {
                BodySource::Total => &self.accel,
                BodySource::GravityRemoved => &self.body,
            },
            SignalKind::GravityAcc => &self.gravity,
            SignalKind::BodyAccJerk => &self.acc_jerk,
            SignalKind::BodyGyro => &self.gyro,
            SignalKind::BodyGyroJerk => &self.gyro_jerk,
        }
    }

    /// Per-sample magnitude of the signal behind a feature slot
    pub fn magnitude(&self, kind: SignalKind) -> Vec<f64> {
        self.signal(kind).magnitude()
    }
}

/// Produces derived signals from raw windows
#[derive(Debug, Clone)]
pub struct SignalGenerator {
    lowpass: ButterworthLowPass,
    sample_rate: f64,
    body_source: BodySource,
}

impl SignalGenerator {
    /// Design the gravity filter for the given configuration
    pub fn new(config: &FeatureConfig) -> Result<Self, FeatureError> {
        let lowpass = ButterworthLowPass::new(
            config.filter_order,
            config.gravity_cutoff_hz,
            config.sample_rate,
        )?;
        Ok(Self {
            lowpass,
            sample_rate: config.sample_rate,
            body_source: config.body_source,
        })
    }

    /// Shortest window the gravity filter accepts
    pub fn min_window_len(&self) -> usize {
        self.lowpass.min_len()
    }

    /// Gravity component, per axis
    pub fn gravity(&self, accel: &TriaxialSignal) -> Result<TriaxialSignal, FeatureError> {
        accel.map_axes(|axis| self.lowpass.filtfilt(axis))
    }

    /// Body acceleration: accelerometer minus gravity
    pub fn body(
        &self,
        accel: &TriaxialSignal,
        gravity: &TriaxialSignal,
    ) -> Result<TriaxialSignal, FeatureError> {
        Ok(accel.difference(gravity)?)
    }

    /// Time derivative per axis, scaled to units per second
    pub fn jerk(&self, signal: &TriaxialSignal) -> Result<TriaxialSignal, FeatureError> {
        signal.map_axes(|axis| {
            Ok::<_, FeatureError>(
                gradient(axis)
                    .into_iter()
                    .map(|d| d * self.sample_rate)
                    .collect(),
            )
        })
    }

    /// Derive every signal the feature assembly needs
    pub fn derive(&self, window: &SensorWindow) -> Result<DerivedSignals, FeatureError> {
        let gravity = self.gravity(&window.accel)?;
        let body = self.body(&window.accel, &gravity)?;
        let acc_jerk = match self.body_source {
            BodySource::Total => self.jerk(&window.accel)?,
            BodySource::GravityRemoved => self.jerk(&body)?,
        };
        let gyro_jerk = self.jerk(&window.gyro)?;

        trace!(
            "Derived signals for window {} ({} samples)",
            window.index,
            window.len()
        );

        Ok(DerivedSignals {
            accel: window.accel.clone(),
            gravity,
            body,
            acc_jerk,
            gyro: window.gyro.clone(),
            gyro_jerk,
            body_source: self.body_source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensor_window::SpatialAxis;

    fn window(
        n: usize,
        accel: impl Fn(usize) -> [f64; 3],
        gyro: impl Fn(usize) -> [f64; 3],
    ) -> SensorWindow {
        let a: Vec<[f64; 3]> = (0..n).map(accel).collect();
        let g: Vec<[f64; 3]> = (0..n).map(gyro).collect();
        SensorWindow::new(
            0,
            0,
            TriaxialSignal::from_rows(&a),
            TriaxialSignal::from_rows(&g),
        )
        .unwrap()
    }

    #[test]
    fn test_gradient() {
        assert_eq!(gradient(&[1.0, 2.0, 4.0, 7.0]), vec![1.0, 1.5, 2.5, 3.0]);
        assert_eq!(gradient(&[3.0, 5.0]), vec![2.0, 2.0]);
        assert_eq!(gradient(&[3.0]), vec![0.0]);
        assert!(gradient(&[]).is_empty());
    }

    #[test]
    fn test_jerk_of_ramp() {
        let generator = SignalGenerator::new(&FeatureConfig::default()).unwrap();
        // Slope 0.1 per sample at 50 Hz = 5 units/s
        let ramp = TriaxialSignal::from_rows(
            &(0..32).map(|i| [0.1 * i as f64, 0.0, -0.2 * i as f64]).collect::<Vec<_>>(),
        );
        let jerk = generator.jerk(&ramp).unwrap();
        assert!(jerk.axis(SpatialAxis::X).iter().all(|v| (v - 5.0).abs() < 1e-9));
        assert!(jerk.axis(SpatialAxis::Y).iter().all(|&v| v == 0.0));
        assert!(jerk.axis(SpatialAxis::Z).iter().all(|v| (v + 10.0).abs() < 1e-9));
    }

    #[test]
    fn test_stationary_gravity() {
        let generator = SignalGenerator::new(&FeatureConfig::default()).unwrap();
        let w = window(128, |_| [0.0, 0.0, 9.81], |_| [0.0; 3]);
        let derived = generator.derive(&w).unwrap();

        for v in derived.gravity.axis(SpatialAxis::Z) {
            assert!((v - 9.81).abs() < 1e-6);
        }
        for v in derived.body.axis(SpatialAxis::Z) {
            assert!(v.abs() < 1e-6);
        }
        assert!(derived.gyro_jerk.axis(SpatialAxis::X).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_body_slot_follows_source() {
        let w = window(
            64,
            |i| [(i as f64 * 0.7).sin(), 0.0, 9.81],
            |i| [0.0, (i as f64 * 0.3).cos(), 0.0],
        );

        let total = SignalGenerator::new(&FeatureConfig::default())
            .unwrap()
            .derive(&w)
            .unwrap();
        assert_eq!(total.signal(SignalKind::BodyAcc), &w.accel);
        assert_eq!(total.signal(SignalKind::BodyGyro), &w.gyro);

        let config = FeatureConfig {
            body_source: BodySource::GravityRemoved,
            ..Default::default()
        };
        let removed = SignalGenerator::new(&config).unwrap().derive(&w).unwrap();
        assert_eq!(removed.signal(SignalKind::BodyAcc), &removed.body);
        assert_ne!(
            total.signal(SignalKind::BodyAccJerk),
            removed.signal(SignalKind::BodyAccJerk)
        );
    }

    #[test]
    fn test_magnitude_of_slot() {
        let generator = SignalGenerator::new(&FeatureConfig::default()).unwrap();
        let w = window(32, |_| [3.0, 4.0, 0.0], |_| [0.0, 0.0, 2.0]);
        let derived = generator.derive(&w).unwrap();
        assert!(derived.magnitude(SignalKind::BodyAcc).iter().all(|&m| m == 5.0));
        assert!(derived.magnitude(SignalKind::BodyGyro).iter().all(|&m| m == 2.0));
    }

    #[test]
    fn test_short_window_underflow() {
        let generator = SignalGenerator::new(&FeatureConfig::default()).unwrap();
        assert_eq!(generator.min_window_len(), 16);
        let w = window(15, |_| [0.0; 3], |_| [0.0; 3]);
        assert_eq!(
            generator.derive(&w).unwrap_err(),
            FeatureError::FilterUnderflow {
                required: 16,
                actual: 15
            }
        );
    }

    #[test]
    fn test_window_not_mutated() {
        let generator = SignalGenerator::new(&FeatureConfig::default()).unwrap();
        let w = window(40, |i| [i as f64, 1.0, 2.0], |i| [0.0, i as f64, 0.0]);
        let copy = w.clone();
        let _ = generator.derive(&w).unwrap();
        assert_eq!(w, copy);
    }
}
