//! # Song Playback
//!
//! A single, explicitly owned playback session for the bundled practice
//! track. The song is decoded once into memory; the output stream is opened
//! on the first `play` and released by `close` (or on drop).

use crate::audio::{self, StreamFormat, StreamWorker};
use crate::error::{DeviceAccessError, SongError};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Decoded mono audio.
#[derive(Debug, Clone, PartialEq)]
pub struct Song {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl Song {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Result<Self, SongError> {
        if samples.is_empty() || sample_rate == 0 {
            return Err(SongError::Empty);
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Decodes a WAV file into mono `f32` samples.
///
/// Integer formats are scaled to -1.0..1.0 and multi-channel files are
/// averaged down to one channel.
pub fn load_wav(path: &Path) -> Result<Song, SongError> {
    let reader = hound::WavReader::open(path)?;
    let header = reader.spec();

    let interleaved: Vec<f32> = match header.sample_format {
        hound::SampleFormat::Float => reader.into_samples::<f32>().collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1i64 << (header.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<_, _>>()?
        }
    };

    let samples = audio::downmix(&interleaved, header.channels.max(1) as usize);
    log::info!(
        "[SONG] Loaded {} ({} Hz, {} channel(s), {:.1}s)",
        path.display(),
        header.sample_rate,
        header.channels,
        samples.len() as f64 / header.sample_rate.max(1) as f64
    );
    Song::new(samples, header.sample_rate)
}

/// Playback position and run state shared with the output callback.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlaybackCursor {
    /// Position in song frames; fractional when resampling
    pub position: f64,
    pub playing: bool,
}

/// Fills an interleaved output block from the song, advancing the cursor.
///
/// Resamples by linear interpolation when the device rate differs from the
/// song's. Reaching the end stops playback and rewinds to the start.
pub fn render_song(
    song: &Song,
    cursor: &mut PlaybackCursor,
    format: StreamFormat,
    out: &mut [f32],
) {
    let channels = format.channels.max(1) as usize;
    let step = song.sample_rate as f64 / format.sample_rate.max(1) as f64;

    for frame in out.chunks_mut(channels) {
        let sample = if cursor.playing {
            let index = cursor.position as usize;
            match song.samples.get(index) {
                Some(&current) => {
                    let next = song.samples.get(index + 1).copied().unwrap_or(current);
                    let frac = (cursor.position - index as f64) as f32;
                    cursor.position += step;
                    current + (next - current) * frac
                }
                None => {
                    cursor.playing = false;
                    cursor.position = 0.0;
                    0.0
                }
            }
        } else {
            0.0
        };
        frame.fill(sample);
    }
}

/// The song playback session.
pub struct SongPlayer {
    song: Arc<Song>,
    cursor: Arc<Mutex<PlaybackCursor>>,
    output: Option<StreamWorker>,
}

impl SongPlayer {
    pub fn new(song: Song) -> Self {
        Self {
            song: Arc::new(song),
            cursor: Arc::new(Mutex::new(PlaybackCursor::default())),
            output: None,
        }
    }

    /// Loads the song at `path` into a new, paused session.
    pub fn open(path: &Path) -> Result<Self, SongError> {
        Ok(Self::new(load_wav(path)?))
    }

    fn cursor(&self) -> MutexGuard<'_, PlaybackCursor> {
        match self.cursor.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn is_playing(&self) -> bool {
        self.cursor().playing
    }

    pub fn position_secs(&self) -> f64 {
        self.cursor().position / self.song.sample_rate as f64
    }

    pub fn duration_secs(&self) -> f64 {
        self.song.duration_secs()
    }

    /// Starts or resumes playback, opening the output device if needed.
    pub fn play(&mut self) -> Result<(), DeviceAccessError> {
        if self.output.is_none() {
            let song = Arc::clone(&self.song);
            let cursor = Arc::clone(&self.cursor);
            let worker = audio::start_audio_output(move |format| {
                move |out: &mut [f32]| match cursor.try_lock() {
                    Ok(mut cursor) => render_song(&song, &mut cursor, format, out),
                    Err(_) => out.fill(0.0),
                }
            })?;
            self.output = Some(worker);
        }
        self.cursor().playing = true;
        log::info!("[SONG] Playing from {:.1}s", self.position_secs());
        Ok(())
    }

    pub fn pause(&mut self) {
        self.cursor().playing = false;
    }

    /// Pauses and rewinds to the start.
    pub fn stop(&mut self) {
        let mut cursor = self.cursor();
        cursor.playing = false;
        cursor.position = 0.0;
    }

    /// Plays when paused and pauses when playing.
    pub fn toggle(&mut self) -> Result<(), DeviceAccessError> {
        if self.is_playing() {
            self.pause();
            Ok(())
        } else {
            self.play()
        }
    }

    /// Pauses and releases the output device. The position is kept.
    pub fn close(&mut self) {
        self.pause();
        if self.output.take().is_some() {
            log::info!("[SONG] Released playback device");
        }
    }
}

impl Drop for SongPlayer {
    fn drop(&mut self) {
        self.close();
    }
}
