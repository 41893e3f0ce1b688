//! # Band-Limiting Filters
//!
//! Biquad low-pass and high-pass filters used to restrict the microphone
//! signal to the tuner's frequency range before pitch estimation.
//! Coefficients follow the Audio EQ Cookbook.

use std::f64::consts::{FRAC_1_SQRT_2, PI};

/// Normalised biquad coefficients (a0 = 1).
#[derive(Debug, Clone, Copy)]
struct Coefficients {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl Coefficients {
    fn lowpass(cutoff: f64, sample_rate: f64) -> Self {
        let (cos_omega, alpha) = Self::omega(cutoff, sample_rate);
        let a0 = 1.0 + alpha;
        Self {
            b0: (1.0 - cos_omega) / 2.0 / a0,
            b1: (1.0 - cos_omega) / a0,
            b2: (1.0 - cos_omega) / 2.0 / a0,
            a1: -2.0 * cos_omega / a0,
            a2: (1.0 - alpha) / a0,
        }
    }

    fn highpass(cutoff: f64, sample_rate: f64) -> Self {
        let (cos_omega, alpha) = Self::omega(cutoff, sample_rate);
        let a0 = 1.0 + alpha;
        Self {
            b0: (1.0 + cos_omega) / 2.0 / a0,
            b1: -(1.0 + cos_omega) / a0,
            b2: (1.0 + cos_omega) / 2.0 / a0,
            a1: -2.0 * cos_omega / a0,
            a2: (1.0 - alpha) / a0,
        }
    }

    /// Butterworth response: Q = 1/sqrt(2).
    fn omega(cutoff: f64, sample_rate: f64) -> (f64, f64) {
        // Keep the cutoff below Nyquist so the coefficients stay stable.
        let cutoff = cutoff.clamp(1.0, sample_rate * 0.49);
        let omega = 2.0 * PI * cutoff / sample_rate;
        (omega.cos(), omega.sin() / (2.0 * FRAC_1_SQRT_2))
    }
}

/// A second-order IIR filter in transposed direct form II.
#[derive(Debug, Clone)]
pub struct BiquadFilter {
    coeffs: Coefficients,
    z1: f64,
    z2: f64,
}

impl BiquadFilter {
    pub fn lowpass(cutoff: f64, sample_rate: f64) -> Self {
        Self::with_coefficients(Coefficients::lowpass(cutoff, sample_rate))
    }

    pub fn highpass(cutoff: f64, sample_rate: f64) -> Self {
        Self::with_coefficients(Coefficients::highpass(cutoff, sample_rate))
    }

    fn with_coefficients(coeffs: Coefficients) -> Self {
        Self {
            coeffs,
            z1: 0.0,
            z2: 0.0,
        }
    }

    pub fn process(&mut self, input: f32) -> f32 {
        let x = input as f64;
        let c = &self.coeffs;
        let y = c.b0 * x + self.z1;
        self.z1 = c.b1 * x - c.a1 * y + self.z2;
        self.z2 = c.b2 * x - c.a2 * y;
        y as f32
    }

    /// Filters a block in place.
    pub fn process_block(&mut self, block: &mut [f32]) {
        for sample in block.iter_mut() {
            *sample = self.process(*sample);
        }
    }
}
