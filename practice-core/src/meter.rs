//! # Cent Meter Banding
//!
//! Maps a cent deviation onto the tuner's segmented meter: 21 segments
//! spanning -50 to +50 cents in 5 cent steps, with segment 10 in the centre.
//! The highlighted segment is coloured by how far off the pitch is.

use crate::tuning::Note;

/// Number of segments in the meter.
pub const SEGMENTS: usize = 21;

/// Index of the centre (in tune) segment.
pub const CENTER_SEGMENT: usize = SEGMENTS / 2;

/// Cents covered by a single segment.
const CENTS_PER_SEGMENT: f64 = 5.0;

/// Deviation below which the centre segment reads as in tune.
const IN_TUNE_CENTS: f64 = 2.5;
const CLOSE_CENTS: f64 = 15.0;
const OFF_CENTS: f64 = 25.0;

/// Accuracy band of the highlighted segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CentBand {
    /// Within 2.5 cents, shown on the centre segment
    InTune,
    /// Under 15 cents off
    Close,
    /// Under 25 cents off
    Off,
    /// 25 cents or more off
    Far,
}

/// The meter state for one detected note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeterReading {
    pub cents: i32,
    pub segment: usize,
    pub band: CentBand,
}

impl MeterReading {
    pub fn from_cents(cents: i32) -> Self {
        let segment = highlighted_segment(cents);
        Self {
            cents,
            segment,
            band: band_for(cents, segment),
        }
    }

    pub fn from_note(note: &Note) -> Self {
        Self::from_cents(note.cents)
    }

    /// Whether `index` is the highlighted segment.
    pub fn highlights(&self, index: usize) -> bool {
        self.segment == index
    }
}

/// Returns the segment index highlighted for a cent deviation.
pub fn highlighted_segment(cents: i32) -> usize {
    let index = ((cents as f64 + 50.0) / CENTS_PER_SEGMENT).round();
    index.clamp(0.0, (SEGMENTS - 1) as f64) as usize
}

fn band_for(cents: i32, segment: usize) -> CentBand {
    let abs_cents = (cents as f64).abs();
    if abs_cents < IN_TUNE_CENTS && segment == CENTER_SEGMENT {
        CentBand::InTune
    } else if abs_cents < CLOSE_CENTS {
        CentBand::Close
    } else if abs_cents < OFF_CENTS {
        CentBand::Off
    } else {
        CentBand::Far
    }
}

/// Text shown above the meter.
pub fn cents_label(note: Option<&Note>) -> String {
    match note {
        Some(note) => format!("{} cents", note.cents),
        None => "0 cents".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning::resolve;

    #[test]
    fn zero_cents_lights_the_centre_green() {
        let reading = MeterReading::from_cents(0);
        assert_eq!(reading.segment, CENTER_SEGMENT);
        assert_eq!(reading.band, CentBand::InTune);
    }

    #[test]
    fn small_deviations_stay_on_centre() {
        for cents in -2..=2 {
            let reading = MeterReading::from_cents(cents);
            assert_eq!(reading.segment, CENTER_SEGMENT, "{cents} cents");
            assert_eq!(reading.band, CentBand::InTune, "{cents} cents");
        }
        let reading = MeterReading::from_cents(3);
        assert_eq!(reading.segment, 11);
        assert_eq!(reading.band, CentBand::Close);
        assert_eq!(MeterReading::from_cents(-3).segment, 9);
    }

    #[test]
    fn bands_follow_distance_from_pitch() {
        assert_eq!(MeterReading::from_cents(14).band, CentBand::Close);
        assert_eq!(MeterReading::from_cents(-15).band, CentBand::Off);
        assert_eq!(MeterReading::from_cents(24).band, CentBand::Off);
        assert_eq!(MeterReading::from_cents(25).band, CentBand::Far);
        assert_eq!(MeterReading::from_cents(-50).band, CentBand::Far);
    }

    #[test]
    fn extremes_map_to_outer_segments() {
        assert_eq!(highlighted_segment(-50), 0);
        assert_eq!(highlighted_segment(50), SEGMENTS - 1);
        assert_eq!(highlighted_segment(-80), 0);
        assert_eq!(highlighted_segment(80), SEGMENTS - 1);
    }

    #[test]
    fn label_defaults_to_zero_without_a_note() {
        assert_eq!(cents_label(None), "0 cents");
        let note = resolve(450.0, 0.9, 440.0);
        assert_eq!(cents_label(Some(&note)), "38 cents");
        assert!(MeterReading::from_note(&note).highlights(18));
    }
}
