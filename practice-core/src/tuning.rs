//! # Musical Tuning Module
//!
//! Converts a detected fundamental frequency into the nearest note of the
//! 12-tone equal-tempered scale.
//!
//! ## Features
//! - MIDI-style absolute semitone numbering (A4 = 69)
//! - Adjustable reference pitch (A4 = 440 Hz by default)
//! - Signed cent deviation from the nearest semitone
//!
//! Cents are truncated toward negative infinity rather than rounded. A pitch
//! a hair flat of a semitone therefore reads `-1`, and the lowest possible
//! reading is `-50`; the highest is `50`.

/// Absolute semitone number of the reference note (A4 in MIDI numbering).
pub const REFERENCE_SEMITONE: i32 = 69;

/// Pitch-class labels indexed by `semitone mod 12`.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C♯", "D", "D♯", "E", "F", "F♯", "G", "G♯", "A", "A♯", "B",
];

/// A resolved musical note.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    /// Input fundamental frequency in Hz
    pub frequency: f64,
    /// Pitch-class name of the nearest semitone (e.g. "A", "C♯")
    pub name: &'static str,
    /// Absolute semitone number, 69 for A4
    pub value: i32,
    /// Signed deviation from the nearest semitone in cents
    pub cents: i32,
    /// Scientific pitch octave
    pub octave: i32,
    /// Detector confidence in the range 0.0 to 1.0
    pub clarity: f64,
}

/// Resolves a frequency to the nearest equal-tempered note.
///
/// # Arguments
/// * `frequency` - Detected fundamental in Hz, must be positive
/// * `clarity` - Detector confidence, passed through unchanged
/// * `reference_pitch` - Frequency of A4 in Hz
///
/// # Returns
/// * `Note` - Nearest semitone with name, octave and cent offset
pub fn resolve(frequency: f64, clarity: f64, reference_pitch: f64) -> Note {
    let semitone_offset = (12.0 * (frequency / reference_pitch).log2()).round() as i32;
    let value = semitone_offset + REFERENCE_SEMITONE;
    let standard_frequency = semitone_frequency(value, reference_pitch);
    // Rounding error can push a half-semitone input a hair past ±50.
    let cents = calculate_cents_deviation(frequency, standard_frequency)
        .clamp(-50.0, 50.0)
        .floor() as i32;

    Note {
        frequency,
        name: NOTE_NAMES[value.rem_euclid(12) as usize],
        value,
        cents,
        octave: value.div_euclid(12) - 1,
        clarity,
    }
}

/// Returns the equal-tempered frequency of an absolute semitone number.
pub fn semitone_frequency(value: i32, reference_pitch: f64) -> f64 {
    reference_pitch * 2.0_f64.powf((value - REFERENCE_SEMITONE) as f64 / 12.0)
}

/// Calculates the deviation from a target frequency in cents.
///
/// Positive values are sharp, negative values flat. 100 cents make one
/// semitone and 1200 cents one octave.
pub fn calculate_cents_deviation(freq: f64, target_freq: f64) -> f64 {
    1200.0 * (freq / target_freq).log2()
}
