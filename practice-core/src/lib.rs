//! The core logic for the guitar practice app.
//! This crate is responsible for audio capture and playback, pitch
//! detection, note resolution and metronome timing. It is completely
//! headless and contains no GUI code.

pub mod audio;
pub mod click;
pub mod config;
pub mod error;
pub mod filter;
pub mod meter;
pub mod metronome;
pub mod pitch;
pub mod song;
pub mod tuner;
pub mod tuning;

pub use config::{AppConfig, MetronomeConfig, SongConfig, TunerConfig};
pub use error::{ConfigError, DeviceAccessError, SongError};
pub use meter::{CentBand, MeterReading};
pub use metronome::{Beat, Metronome, TransportState};
pub use song::SongPlayer;
pub use tuner::TunerSession;
pub use tuning::Note;
