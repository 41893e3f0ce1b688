//! # Error Types
//!
//! Device acquisition is the only operation in the toolkit that can fail at
//! runtime. Everything it can report is folded into [`DeviceAccessError`] so
//! that callers have a single thing to surface to the user before tearing the
//! session down. Song asset loading and config file access get their own
//! small enums.

use std::fmt;
use thiserror::Error;

/// Which side of the audio device an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Input => write!(f, "input"),
            Direction::Output => write!(f, "output"),
        }
    }
}

/// Failure to acquire or start an audio device.
#[derive(Debug, Error)]
pub enum DeviceAccessError {
    #[error("no {0} device available")]
    NoDevice(Direction),

    #[error("could not read the supported stream configurations: {0}")]
    SupportedConfigs(#[from] cpal::SupportedStreamConfigsError),

    #[error("could not read the default stream configuration: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("the {0} device offers no 32-bit float stream format")]
    UnsupportedFormat(Direction),

    #[error("failed to build the audio stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start the audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("failed to spawn the audio worker thread: {0}")]
    WorkerSpawn(#[from] std::io::Error),

    #[error("the audio worker exited before the stream was ready")]
    WorkerLost,
}

/// Failure to load the bundled song.
#[derive(Debug, Error)]
pub enum SongError {
    #[error("could not decode song file: {0}")]
    Decode(#[from] hound::Error),

    #[error("song file contains no audio")]
    Empty,
}

/// Failure to read or write the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("config file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}
