//! # Pitch Detection Module
//!
//! McLeod pitch method front end built on the `pitch-detection` crate. It
//! maps a window of time-domain samples to a `(frequency, clarity)` pair,
//! reporting `(0.0, 0.0)` when the window is silent or has no clear period.
//! Callers apply their own clarity and range thresholds.
//!
//! ## Features
//! - Volume gate in decibels (RMS of the window)
//! - Normalised square difference function computed by the crate's FFT
//!   internals, buffers reused between calls
//! - Key maximum chosen relative to the highest maximum, refined with a
//!   parabolic fit

use pitch_detection::detector::internals::{DetectorInternals, normalized_square_difference};
use pitch_detection::utils::peak::{PeakCorrection, correct_peak, detect_peaks};

/// The chosen key maximum is the first one reaching this fraction of the
/// highest key maximum in the window.
const KEY_MAXIMUM_CUTOFF: f32 = 0.9;

/// Pitch estimator over windows of a fixed length.
pub struct PitchEstimator {
    internals: DetectorInternals<f32>,
    nsdf: Vec<f32>,
    input_length: usize,
    min_volume_decibels: f32,
}

impl PitchEstimator {
    /// Creates an estimator for windows of exactly `input_length` samples.
    ///
    /// # Arguments
    /// * `input_length` - Window size in samples
    /// * `min_volume_decibels` - Windows quieter than this report no pitch
    pub fn new(input_length: usize, min_volume_decibels: f32) -> Self {
        let padding = input_length / 2;
        Self {
            internals: DetectorInternals::new(input_length, padding),
            nsdf: vec![0.0; input_length + padding],
            input_length,
            min_volume_decibels,
        }
    }

    /// Estimates the fundamental of a window.
    ///
    /// # Arguments
    /// * `input` - Time-domain samples, `input_length` long
    /// * `sample_rate` - Sample rate in Hz
    ///
    /// # Returns
    /// * `(frequency, clarity)` - Frequency in Hz and clarity in 0.0..=1.0,
    ///   or `(0.0, 0.0)` when no pitch is found
    pub fn find_pitch(&mut self, input: &[f32], sample_rate: u32) -> (f32, f32) {
        if input.len() != self.input_length || input.len() < 2 || sample_rate == 0 {
            log::warn!(
                "[PITCH] Expected {} samples, got {}",
                self.input_length,
                input.len()
            );
            return (0.0, 0.0);
        }

        if volume_decibels(input) < self.min_volume_decibels {
            return (0.0, 0.0);
        }

        normalized_square_difference(input, &mut self.internals.buffers, &mut self.nsdf);
        let zero_lag = self.nsdf[0];
        if !(zero_lag.is_finite() && zero_lag > 0.0) {
            return (0.0, 0.0);
        }

        // Lags past the padding wrap around in the circular autocorrelation.
        let valid_lags = &self.nsdf[..=self.input_length / 2];
        let key_maxima: Vec<(usize, f32)> = detect_peaks(valid_lags).collect();
        let highest = key_maxima
            .iter()
            .map(|&(_, value)| value)
            .fold(f32::NEG_INFINITY, f32::max);
        if !(highest.is_finite() && highest > 0.0) {
            return (0.0, 0.0);
        }

        let cutoff = KEY_MAXIMUM_CUTOFF * highest;
        let Some(&key_maximum) = key_maxima.iter().find(|&&(_, value)| value >= cutoff) else {
            return (0.0, 0.0);
        };

        let (period, peak) = correct_peak(key_maximum, &self.nsdf, PeakCorrection::Quadratic);
        let frequency = sample_rate as f32 / period;
        let clarity = peak / zero_lag;
        if frequency.is_finite() && clarity.is_finite() && period > 0.0 {
            (frequency, clarity.clamp(0.0, 1.0))
        } else {
            (0.0, 0.0)
        }
    }
}

/// Root-mean-square level of a window in decibels full scale.
///
/// Silence maps to negative infinity.
pub fn volume_decibels(signal: &[f32]) -> f32 {
    if signal.is_empty() {
        return f32::NEG_INFINITY;
    }
    let rms = (signal.iter().map(|&s| s * s).sum::<f32>() / signal.len() as f32).sqrt();
    20.0 * rms.log10()
}
