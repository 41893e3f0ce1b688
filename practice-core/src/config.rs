//! # Configuration
//!
//! Settings for the three practice tools, stored as pretty-printed JSON.
//! Every field has a default, so a partial file (or none at all) is valid.

use crate::click::ClickVoice;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Smallest tempo the metronome accepts; keeps the beat interval finite.
pub const MIN_BPM: u32 = 1;

/// Settings for the tuner's capture and analysis chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerConfig {
    /// Reference pitch of A4 in Hz
    pub a4: f64,
    /// Minimum detector clarity for a note to be reported
    pub clarity_threshold: f32,
    /// Windows quieter than this level report no pitch
    pub min_volume_decibels: f32,
    /// Analysis window length in samples
    pub buffer_size: usize,
    /// Lowest accepted frequency and high-pass cutoff (A0)
    pub min_frequency: f32,
    /// Highest accepted frequency and low-pass cutoff (C8)
    pub max_frequency: f32,
    /// Analysis polling period in milliseconds
    pub update_interval_ms: u64,
    /// Requested capture sample rate in Hz
    pub sample_rate: u32,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            a4: 440.0,
            clarity_threshold: 0.9,
            min_volume_decibels: -1000.0,
            buffer_size: 8192,
            min_frequency: 27.5,
            max_frequency: 4186.01,
            update_interval_ms: 50,
            sample_rate: 44100,
        }
    }
}

impl TunerConfig {
    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms.max(1))
    }
}

/// Upper bound on the metronome tempo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BpmLimit {
    /// Reject tempos above the given value
    Capped(u32),
    /// Accept any tempo of at least [`MIN_BPM`]
    Unbounded,
}

impl BpmLimit {
    pub fn accepts(&self, bpm: u32) -> bool {
        bpm >= MIN_BPM
            && match self {
                BpmLimit::Capped(max) => bpm <= *max,
                BpmLimit::Unbounded => true,
            }
    }

    /// Nearest tempo this limit accepts.
    pub fn clamp(&self, bpm: u32) -> u32 {
        match self {
            BpmLimit::Capped(max) => bpm.min(*max).max(MIN_BPM),
            BpmLimit::Unbounded => bpm.max(MIN_BPM),
        }
    }
}

/// How the visual beat counter advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BeatCounting {
    /// Count 1..=beats_per_measure, then wrap back to 1
    WrapAtMeasure,
    /// Count up without bound
    Unbounded,
}

/// Settings for the metronome transport and click sound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetronomeConfig {
    pub bpm: u32,
    pub beats_per_measure: u32,
    pub bpm_limit: BpmLimit,
    pub beat_counting: BeatCounting,
    /// Window ahead of the audio clock in which beats are scheduled
    pub lookahead_secs: f64,
    /// Scheduler polling period in milliseconds
    pub tick_interval_ms: u64,
    pub click_frequency: f64,
    pub click_duration_secs: f64,
}

impl Default for MetronomeConfig {
    fn default() -> Self {
        Self {
            bpm: 120,
            beats_per_measure: 4,
            bpm_limit: BpmLimit::Capped(300),
            beat_counting: BeatCounting::WrapAtMeasure,
            lookahead_secs: 0.1,
            tick_interval_ms: 25,
            click_frequency: 880.0,
            click_duration_secs: 0.05,
        }
    }
}

impl MetronomeConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn click_voice(&self) -> ClickVoice {
        ClickVoice {
            frequency: self.click_frequency,
            duration_secs: self.click_duration_secs,
            ..ClickVoice::default()
        }
    }
}

/// Settings for the Songs page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SongConfig {
    pub path: PathBuf,
}

impl Default for SongConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("assets/songs/chill-funk.wav"),
        }
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub tuner: TunerConfig,
    pub metronome: MetronomeConfig,
    pub songs: SongConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            // The tuner page is more forgiving than the analysis default.
            tuner: TunerConfig {
                clarity_threshold: 0.7,
                ..TunerConfig::default()
            },
            metronome: MetronomeConfig::default(),
            songs: SongConfig::default(),
        }
    }
}

/// Saves the configuration to a JSON file.
///
/// # Arguments
/// * `config` - The configuration to save
/// * `path` - Destination file, created or truncated
pub fn save_config(config: &AppConfig, path: &Path) -> Result<(), ConfigError> {
    let json_string = serde_json::to_string_pretty(config)?;
    let mut file = File::create(path)?;
    file.write_all(json_string.as_bytes())?;
    Ok(())
}

/// Loads the configuration from a JSON file.
///
/// A missing file yields the defaults; any other I/O or parse failure is an
/// error.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            log::info!("[CONFIG] {} not found, using defaults", path.display());
            return Ok(AppConfig::default());
        }
        Err(e) => return Err(e.into()),
    };
    let mut data = String::new();
    file.read_to_string(&mut data)?;
    Ok(serde_json::from_str(&data)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.tuner.clarity_threshold, 0.7);
        assert_eq!(config.metronome.bpm, 120);
    }

    #[test]
    fn saved_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("practice.json");
        let mut config = AppConfig::default();
        config.tuner.a4 = 442.0;
        config.metronome.bpm_limit = BpmLimit::Unbounded;
        config.metronome.beat_counting = BeatCounting::Unbounded;

        save_config(&config, &path).unwrap();
        assert_eq!(load_config(&path).unwrap(), config);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("practice.json");
        std::fs::write(&path, r#"{ "metronome": { "bpm": 90 } }"#).unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.metronome.bpm, 90);
        assert_eq!(config.metronome.beats_per_measure, 4);
        assert_eq!(config.tuner, AppConfig::default().tuner);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("practice.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn bpm_limits() {
        assert!(BpmLimit::Capped(300).accepts(300));
        assert!(!BpmLimit::Capped(300).accepts(301));
        assert!(!BpmLimit::Capped(300).accepts(0));
        assert!(BpmLimit::Unbounded.accepts(1000));
        assert!(!BpmLimit::Unbounded.accepts(0));
    }

    #[test]
    fn out_of_range_tempos_clamp_to_the_limit() {
        assert_eq!(BpmLimit::Capped(300).clamp(1000), 300);
        assert_eq!(BpmLimit::Capped(300).clamp(0), MIN_BPM);
        assert_eq!(BpmLimit::Capped(300).clamp(120), 120);
        assert_eq!(BpmLimit::Unbounded.clamp(1000), 1000);
    }
}
