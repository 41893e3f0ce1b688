//! # Tuner Session
//!
//! Owns everything the tuner acquires while it is running: the microphone
//! stream, the band-limiting filters, the rolling analysis window and the
//! pitch estimator. `start` acquires them together and `stop` releases them
//! together; a failed start releases whatever was acquired before returning
//! the error.
//!
//! ## Pipeline
//! 1. Microphone blocks arrive on a channel, already downmixed to mono
//! 2. Low-pass at `max_frequency`, then high-pass at `min_frequency`
//! 3. The most recent `buffer_size` samples form the analysis window
//! 4. Each `process` call estimates the pitch of the window and resolves it
//!    to a note if it is clear enough and inside the frequency range

use crate::audio::{self, CAPTURE_QUEUE_DEPTH, StreamWorker};
use crate::config::TunerConfig;
use crate::error::DeviceAccessError;
use crate::filter::BiquadFilter;
use crate::pitch::PitchEstimator;
use crate::tuning::{self, Note};
use crossbeam_channel::Receiver;
use std::collections::VecDeque;

/// Filters, analysis window and estimator for one capture session.
pub struct AnalysisChain {
    lowpass: BiquadFilter,
    highpass: BiquadFilter,
    window: VecDeque<f32>,
    input_buffer: Vec<f32>,
    estimator: PitchEstimator,
    sample_rate: u32,
}

impl AnalysisChain {
    pub fn new(config: &TunerConfig, sample_rate: u32) -> Self {
        let rate = sample_rate as f64;
        let size = config.buffer_size.max(2);
        Self {
            lowpass: BiquadFilter::lowpass(config.max_frequency as f64, rate),
            highpass: BiquadFilter::highpass(config.min_frequency as f64, rate),
            // Starts silent, like an analyser that has not heard anything yet.
            window: std::iter::repeat_n(0.0, size).collect(),
            input_buffer: vec![0.0; size],
            estimator: PitchEstimator::new(size, config.min_volume_decibels),
            sample_rate,
        }
    }

    /// Filters a block of mono samples into the analysis window.
    pub fn push_samples(&mut self, block: &[f32]) {
        let size = self.input_buffer.len();
        for &sample in block {
            let filtered = self.highpass.process(self.lowpass.process(sample));
            if self.window.len() == size {
                self.window.pop_front();
            }
            self.window.push_back(filtered);
        }
    }

    /// Estimates the pitch of the current window and resolves it to a note.
    pub fn analyse(&mut self, config: &TunerConfig) -> Option<Note> {
        for (slot, &sample) in self.input_buffer.iter_mut().zip(self.window.iter()) {
            *slot = sample;
        }
        let (frequency, clarity) = self
            .estimator
            .find_pitch(&self.input_buffer, self.sample_rate);
        select_note(frequency, clarity, config)
    }
}

/// Resolves a detector reading to a note if it passes the clarity and range
/// checks.
pub fn select_note(frequency: f32, clarity: f32, config: &TunerConfig) -> Option<Note> {
    if clarity > config.clarity_threshold
        && frequency > config.min_frequency
        && frequency < config.max_frequency
    {
        Some(tuning::resolve(frequency as f64, clarity as f64, config.a4))
    } else {
        None
    }
}

/// Device and analysis resources held while the tuner runs.
struct CaptureResources {
    // Declared first so the microphone is released before the rest.
    _worker: StreamWorker,
    receiver: Receiver<Vec<f32>>,
    chain: AnalysisChain,
}

/// The tuner tool: start, poll, stop.
pub struct TunerSession {
    config: TunerConfig,
    resources: Option<CaptureResources>,
    current_note: Option<Note>,
}

impl TunerSession {
    pub fn new(config: TunerConfig) -> Self {
        Self {
            config,
            resources: None,
            current_note: None,
        }
    }

    pub fn config(&self) -> &TunerConfig {
        &self.config
    }

    pub fn is_active(&self) -> bool {
        self.resources.is_some()
    }

    pub fn current_note(&self) -> Option<&Note> {
        self.current_note.as_ref()
    }

    /// Acquires the microphone and builds the analysis chain.
    ///
    /// Starting an active session does nothing. On failure every partially
    /// acquired resource is released and the session stays inactive.
    pub fn start(&mut self) -> Result<(), DeviceAccessError> {
        if self.is_active() {
            return Ok(());
        }

        let (block_tx, block_rx) = crossbeam_channel::bounded(CAPTURE_QUEUE_DEPTH);
        let worker = match audio::start_audio_capture(block_tx, self.config.sample_rate) {
            Ok(worker) => worker,
            Err(e) => {
                log::error!("[TUNER] Microphone access failed: {}", e);
                self.stop();
                return Err(e);
            }
        };

        let sample_rate = worker.format().sample_rate;
        self.resources = Some(CaptureResources {
            _worker: worker,
            receiver: block_rx,
            chain: AnalysisChain::new(&self.config, sample_rate),
        });
        log::info!("[TUNER] Started at {} Hz", sample_rate);
        Ok(())
    }

    /// Drains captured audio and analyses the latest window.
    ///
    /// # Returns
    /// * The note heard in the latest window, or `None` if nothing clear was
    ///   heard or the session is stopped
    pub fn process(&mut self) -> Option<&Note> {
        let Some(resources) = self.resources.as_mut() else {
            self.current_note = None;
            return None;
        };

        while let Ok(block) = resources.receiver.try_recv() {
            resources.chain.push_samples(&block);
        }

        self.current_note = resources.chain.analyse(&self.config);
        self.current_note.as_ref()
    }

    /// Releases the microphone and analysis resources. Stopping an inactive
    /// session does nothing beyond clearing the current note.
    pub fn stop(&mut self) {
        if self.resources.take().is_some() {
            log::info!("[TUNER] Stopped");
        }
        self.current_note = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use std::f32::consts::PI;

    fn sine_blocks(freq: f32, sample_rate: u32, total: usize) -> Vec<Vec<f32>> {
        let samples: Vec<f32> = (0..total)
            .map(|i| 0.5 * (2.0 * PI * freq * i as f32 / sample_rate as f32).sin())
            .collect();
        samples.chunks(512).map(|c| c.to_vec()).collect()
    }

    #[test]
    fn chain_hears_concert_a() {
        let config = TunerConfig::default();
        let mut chain = AnalysisChain::new(&config, 44100);
        for block in sine_blocks(440.0, 44100, 16384) {
            chain.push_samples(&block);
        }
        let note = chain.analyse(&config).expect("a clear tone should resolve");
        assert_eq!(note.name, "A");
        assert_eq!(note.octave, 4);
        assert!(note.cents.abs() <= 5, "cents {}", note.cents);
        assert!(note.clarity > 0.9);
    }

    #[test]
    fn chain_hears_the_low_e_string() {
        let config = TunerConfig::default();
        let mut chain = AnalysisChain::new(&config, 44100);
        for block in sine_blocks(82.41, 44100, 16384) {
            chain.push_samples(&block);
        }
        let note = chain.analyse(&config).expect("a clear tone should resolve");
        assert_eq!((note.name, note.octave), ("E", 2));
    }

    #[test]
    fn page_threshold_accepts_a_moderately_clear_tone() {
        let page = AppConfig::default().tuner;
        let mut estimator = PitchEstimator::new(page.buffer_size, page.min_volume_decibels);

        let mut state: u32 = 0x2468_ace0;
        let signal: Vec<f32> = sine_blocks(196.0, 44100, page.buffer_size)
            .concat()
            .into_iter()
            .map(|s| {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                let unit = (state >> 8) as f32 / (1u32 << 24) as f32;
                s + 0.3 * (2.0 * unit - 1.0)
            })
            .collect();

        let (frequency, clarity) = estimator.find_pitch(&signal, 44100);
        assert!(clarity > 0.7 && clarity < 0.9, "clarity {clarity}");
        let note = select_note(frequency, clarity, &page).expect("page threshold is 0.7");
        assert_eq!((note.name, note.octave), ("G", 3));
        assert!(select_note(frequency, clarity, &TunerConfig::default()).is_none());
    }

    #[test]
    fn silent_chain_reports_nothing() {
        let config = TunerConfig::default();
        let mut chain = AnalysisChain::new(&config, 44100);
        assert!(chain.analyse(&config).is_none());
    }

    #[test]
    fn readings_are_gated_by_clarity_and_range() {
        let config = TunerConfig::default();
        assert!(select_note(440.0, 0.95, &config).is_some());
        assert!(select_note(440.0, 0.9, &config).is_none());
        assert!(select_note(20.0, 0.99, &config).is_none());
        assert!(select_note(5000.0, 0.99, &config).is_none());
        assert!(select_note(0.0, 0.0, &config).is_none());
    }

    #[test]
    fn reference_pitch_comes_from_config() {
        let config = TunerConfig {
            a4: 432.0,
            ..TunerConfig::default()
        };
        let note = select_note(432.0, 0.95, &config).unwrap();
        assert_eq!((note.name, note.cents), ("A", 0));
    }

    #[test]
    fn inactive_session_processes_nothing() {
        let mut session = TunerSession::new(TunerConfig::default());
        assert!(!session.is_active());
        assert!(session.process().is_none());
        session.stop();
        assert!(session.current_note().is_none());
    }
}
