//! # Click Synthesis
//!
//! Renders metronome clicks at precise audio-clock timestamps. The scheduler
//! hands over the start time of every click ahead of time; the output
//! callback renders each one at sample accuracy as the clock passes it.
//!
//! The audio clock is the number of frames the output stream has rendered,
//! expressed in seconds, so a click scheduled for `t` starts on the frame
//! whose timestamp first reaches `t`.

use crate::audio::{self, StreamFormat, StreamWorker};
use crate::error::DeviceAccessError;
use std::f64::consts::TAU;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Running time of an audio output, in seconds.
pub trait AudioClock {
    fn current_time(&self) -> f64;
}

/// Accepts clicks scheduled on the audio clock.
pub trait ClickSink {
    fn schedule_click(&mut self, start_time: f64);
}

/// An output that can be opened on demand to play clicks.
pub trait ClickBackend: AudioClock + ClickSink + Sized {
    fn open(voice: ClickVoice) -> Result<Self, DeviceAccessError>;
}

/// Shape of a single click: a sine burst with an exponential decay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClickVoice {
    pub frequency: f64,
    pub duration_secs: f64,
    pub start_gain: f64,
    pub end_gain: f64,
}

impl Default for ClickVoice {
    fn default() -> Self {
        Self {
            frequency: 880.0,
            duration_secs: 0.05,
            start_gain: 1.0,
            end_gain: 0.001,
        }
    }
}

impl ClickVoice {
    /// Sample value `elapsed` seconds after the click started.
    ///
    /// Silent before the start and from `duration_secs` on.
    pub fn sample_at(&self, elapsed: f64) -> f32 {
        if elapsed < 0.0 || elapsed >= self.duration_secs {
            return 0.0;
        }
        let gain = self.start_gain
            * (self.end_gain / self.start_gain).powf(elapsed / self.duration_secs);
        (gain * (TAU * self.frequency * elapsed).sin()) as f32
    }
}

/// State shared between the scheduling side and the output callback.
#[derive(Debug, Default)]
struct ClickShared {
    pending: Mutex<Vec<f64>>,
    frames_rendered: AtomicU64,
}

/// Mixes scheduled clicks into interleaved output blocks.
struct ClickRenderer {
    voice: ClickVoice,
    format: StreamFormat,
    active: Vec<f64>,
    shared: Arc<ClickShared>,
}

impl ClickRenderer {
    fn render(&mut self, out: &mut [f32]) {
        // Never block the audio thread; late clicks are picked up next block.
        if let Ok(mut pending) = self.shared.pending.try_lock() {
            self.active.append(&mut pending);
        }

        let channels = self.format.channels.max(1) as usize;
        let rate = self.format.sample_rate as f64;
        let base_frame = self.shared.frames_rendered.load(Ordering::Acquire);
        let frames = out.len() / channels;

        render_clicks(&self.voice, &self.active, base_frame, rate, channels, out);

        let block_end = (base_frame + frames as u64) as f64 / rate;
        let duration = self.voice.duration_secs;
        self.active.retain(|&start| start + duration > block_end);

        self.shared
            .frames_rendered
            .fetch_add(frames as u64, Ordering::Release);
    }
}

/// Writes the sum of all clicks sounding during a block into `out`.
///
/// # Arguments
/// * `voice` - Click shape
/// * `starts` - Start times of the clicks, in seconds on the audio clock
/// * `base_frame` - Audio clock position of the first frame, in frames
/// * `sample_rate` - Output rate in Hz
/// * `channels` - Interleaved channel count
/// * `out` - Output block, overwritten
pub fn render_clicks(
    voice: &ClickVoice,
    starts: &[f64],
    base_frame: u64,
    sample_rate: f64,
    channels: usize,
    out: &mut [f32],
) {
    for (i, frame) in out.chunks_mut(channels).enumerate() {
        let t = (base_frame + i as u64) as f64 / sample_rate;
        let sample: f32 = starts.iter().map(|&start| voice.sample_at(t - start)).sum();
        frame.fill(sample);
    }
}

/// Click output on the default audio device.
pub struct ClickEngine {
    shared: Arc<ClickShared>,
    sample_rate: u32,
    _worker: StreamWorker,
}

impl ClickBackend for ClickEngine {
    fn open(voice: ClickVoice) -> Result<Self, DeviceAccessError> {
        let shared = Arc::new(ClickShared::default());
        let render_shared = Arc::clone(&shared);

        let worker = audio::start_audio_output(move |format| {
            let mut renderer = ClickRenderer {
                voice,
                format,
                active: Vec::new(),
                shared: render_shared,
            };
            move |out: &mut [f32]| renderer.render(out)
        })?;

        let sample_rate = worker.format().sample_rate;
        log::info!("[CLICK] Click output opened at {} Hz", sample_rate);

        Ok(Self {
            shared,
            sample_rate,
            _worker: worker,
        })
    }
}

impl AudioClock for ClickEngine {
    fn current_time(&self) -> f64 {
        self.shared.frames_rendered.load(Ordering::Acquire) as f64 / self.sample_rate as f64
    }
}

impl ClickSink for ClickEngine {
    fn schedule_click(&mut self, start_time: f64) {
        let mut pending = match self.shared.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        pending.push(start_time);
    }
}
