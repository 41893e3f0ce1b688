//! # Metronome Module
//!
//! Lookahead beat scheduling on top of a click output.
//!
//! The UI polls [`Metronome::tick`] on a coarse timer (25 ms by default).
//! Each tick drains every beat that falls inside the lookahead window and
//! hands its exact start time to the click output, which renders it at
//! sample accuracy. The only state carried between ticks is the beat cursor
//! and the visual beat counter.
//!
//! ## Transport
//! - `Stopped -> Running`: open the click output, reset the cursor to the
//!   output's current time
//! - `Running -> Stopped`: reset the beat counter, keep the tempo, release
//!   the click output once the clicks already scheduled have finished

use crate::click::{AudioClock, ClickBackend, ClickEngine, ClickSink};
use crate::config::{BeatCounting, MIN_BPM, MetronomeConfig};
use crate::error::DeviceAccessError;
use std::time::Duration;

/// A beat emitted by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Beat {
    /// Start time on the audio clock, in seconds
    pub time: f64,
    /// Beat counter value after this beat
    pub number: u32,
}

/// Forward-only beat cursor with a bounded lookahead window.
#[derive(Debug, Clone)]
pub struct BeatScheduler {
    next_beat_time: f64,
    bpm: u32,
    lookahead: f64,
    beat_number: u32,
    beats_per_measure: u32,
    counting: BeatCounting,
}

impl BeatScheduler {
    pub fn new(config: &MetronomeConfig) -> Self {
        Self {
            next_beat_time: 0.0,
            bpm: config.bpm_limit.clamp(config.bpm),
            lookahead: config.lookahead_secs,
            beat_number: 0,
            beats_per_measure: config.beats_per_measure.max(1),
            counting: config.beat_counting,
        }
    }

    pub fn bpm(&self) -> u32 {
        self.bpm
    }

    pub fn next_beat_time(&self) -> f64 {
        self.next_beat_time
    }

    /// Current beat counter; 0 until the first beat.
    pub fn beat_number(&self) -> u32 {
        self.beat_number
    }

    pub fn seconds_per_beat(&self) -> f64 {
        60.0 / self.bpm as f64
    }

    /// Sets the tempo used for subsequent beats. Values below 1 are raised to 1.
    pub fn set_bpm(&mut self, bpm: u32) {
        self.bpm = bpm.max(MIN_BPM);
    }

    /// Moves the cursor so the next beat is due at `now`.
    pub fn reset_cursor(&mut self, now: f64) {
        self.next_beat_time = now;
    }

    pub fn reset_counter(&mut self) {
        self.beat_number = 0;
    }

    /// Emits every beat due before `now + lookahead`.
    ///
    /// # Arguments
    /// * `now` - Current audio clock time in seconds
    /// * `sink` - Receives one click per emitted beat
    ///
    /// # Returns
    /// * The emitted beats in scheduled order
    pub fn tick(&mut self, now: f64, sink: &mut impl ClickSink) -> Vec<Beat> {
        let mut beats = Vec::new();
        while self.next_beat_time < now + self.lookahead {
            sink.schedule_click(self.next_beat_time);
            self.advance_counter();
            beats.push(Beat {
                time: self.next_beat_time,
                number: self.beat_number,
            });
            self.next_beat_time += self.seconds_per_beat();
        }
        beats
    }

    fn advance_counter(&mut self) {
        self.beat_number = match self.counting {
            BeatCounting::WrapAtMeasure if self.beat_number >= self.beats_per_measure => 1,
            _ => self.beat_number.saturating_add(1),
        };
    }
}

/// Transport state of the metronome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Stopped,
    Running,
}

/// Metronome transport: the beat scheduler plus the click output it drives.
///
/// After `stop` the output is held until every click already handed to it
/// has finished sounding, then released on a later `tick`. Starting again
/// before that reuses the held output.
pub struct Metronome<B = ClickEngine> {
    config: MetronomeConfig,
    scheduler: BeatScheduler,
    output: Option<B>,
    running: bool,
    /// Audio time at which the last scheduled click has finished
    clicks_end: f64,
}

impl<B: ClickBackend> Metronome<B> {
    pub fn new(config: MetronomeConfig) -> Self {
        if !config.bpm_limit.accepts(config.bpm) {
            log::warn!(
                "[METRONOME] Configured tempo {} is outside {:?}, using {}",
                config.bpm,
                config.bpm_limit,
                config.bpm_limit.clamp(config.bpm)
            );
        }
        Self {
            scheduler: BeatScheduler::new(&config),
            config,
            output: None,
            running: false,
            clicks_end: 0.0,
        }
    }

    pub fn state(&self) -> TransportState {
        if self.running {
            TransportState::Running
        } else {
            TransportState::Stopped
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Whether a click output is open, either running or letting its last
    /// clicks ring out.
    pub fn holds_output(&self) -> bool {
        self.output.is_some()
    }

    pub fn bpm(&self) -> u32 {
        self.scheduler.bpm()
    }

    pub fn beat_number(&self) -> u32 {
        self.scheduler.beat_number()
    }

    pub fn beats_per_measure(&self) -> u32 {
        self.config.beats_per_measure
    }

    pub fn tick_interval(&self) -> Duration {
        self.config.tick_interval()
    }

    pub fn scheduler(&self) -> &BeatScheduler {
        &self.scheduler
    }

    /// Opens the click output if none is held and starts scheduling. No-op
    /// while running.
    pub fn start(&mut self) -> Result<(), DeviceAccessError> {
        if self.running {
            return Ok(());
        }
        let output = match self.output.take() {
            Some(output) => output,
            None => B::open(self.config.click_voice())?,
        };
        self.start_with(output);
        Ok(())
    }

    /// Starts scheduling against an already opened output.
    pub fn start_with(&mut self, output: B) {
        self.scheduler.reset_cursor(output.current_time());
        self.output = Some(output);
        self.running = true;
        log::info!("[METRONOME] Started at {} bpm", self.bpm());
    }

    /// Stops scheduling and resets the beat counter, keeping the tempo.
    /// Clicks already handed to the output still play; the output is
    /// released once they have finished. No-op while stopped.
    pub fn stop(&mut self) {
        if self.running {
            self.running = false;
            log::info!("[METRONOME] Stopped");
        }
        self.scheduler.reset_counter();
        self.release_finished_output();
    }

    /// Drains due beats while running. While stopped, releases the output
    /// once its last click has finished and returns nothing.
    pub fn tick(&mut self) -> Vec<Beat> {
        if !self.running {
            self.release_finished_output();
            return Vec::new();
        }
        let Some(output) = self.output.as_mut() else {
            return Vec::new();
        };

        let now = output.current_time();
        let beats = self.scheduler.tick(now, output);
        if let Some(last) = beats.last() {
            self.clicks_end = last.time + self.config.click_duration_secs;
            log::trace!("[METRONOME] Scheduled {} beat(s) at {:.3}s", beats.len(), now);
        }
        beats
    }

    fn release_finished_output(&mut self) {
        let finished = self
            .output
            .as_ref()
            .is_some_and(|output| output.current_time() >= self.clicks_end);
        if !self.running && finished {
            self.output = None;
            log::info!("[METRONOME] Released click output");
        }
    }

    /// Applies a new tempo if the configured limit accepts it.
    ///
    /// While running the cursor restarts at the current audio time so the
    /// new tempo takes effect immediately.
    ///
    /// # Returns
    /// * `true` if the tempo changed
    pub fn set_bpm(&mut self, bpm: u32) -> bool {
        if !self.config.bpm_limit.accepts(bpm) {
            log::debug!("[METRONOME] Rejected tempo {}", bpm);
            return false;
        }
        if bpm == self.scheduler.bpm() {
            return false;
        }
        self.scheduler.set_bpm(bpm);
        if let (true, Some(output)) = (self.running, &self.output) {
            self.scheduler.reset_cursor(output.current_time());
        }
        true
    }

    pub fn increment_bpm(&mut self) -> bool {
        self.set_bpm(self.bpm().saturating_add(1))
    }

    pub fn decrement_bpm(&mut self) -> bool {
        self.set_bpm(self.bpm().saturating_sub(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::click::ClickVoice;
    use crate::config::BpmLimit;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    #[derive(Default)]
    struct RecordingSink(Vec<f64>);

    impl ClickSink for RecordingSink {
        fn schedule_click(&mut self, start_time: f64) {
            self.0.push(start_time);
        }
    }

    /// Click output with a hand-driven clock.
    struct FakeOutput {
        clock: Rc<Cell<f64>>,
        clicks: Rc<RefCell<Vec<f64>>>,
        released: Rc<Cell<bool>>,
    }

    impl Drop for FakeOutput {
        fn drop(&mut self) {
            self.released.set(true);
        }
    }

    impl AudioClock for FakeOutput {
        fn current_time(&self) -> f64 {
            self.clock.get()
        }
    }

    impl ClickSink for FakeOutput {
        fn schedule_click(&mut self, start_time: f64) {
            self.clicks.borrow_mut().push(start_time);
        }
    }

    impl ClickBackend for FakeOutput {
        fn open(_voice: ClickVoice) -> Result<Self, DeviceAccessError> {
            Err(DeviceAccessError::WorkerLost)
        }
    }

    fn fake() -> (FakeOutput, Rc<Cell<f64>>, Rc<RefCell<Vec<f64>>>) {
        let clock = Rc::new(Cell::new(0.0));
        let clicks = Rc::new(RefCell::new(Vec::new()));
        let output = FakeOutput {
            clock: Rc::clone(&clock),
            clicks: Rc::clone(&clicks),
            released: Rc::new(Cell::new(false)),
        };
        (output, clock, clicks)
    }

    fn scheduler_at(bpm: u32) -> BeatScheduler {
        BeatScheduler::new(&MetronomeConfig {
            bpm,
            ..MetronomeConfig::default()
        })
    }

    /// Polls the scheduler every 25 ms from `start` for `duration` seconds.
    fn poll(scheduler: &mut BeatScheduler, start: f64, duration: f64) -> Vec<f64> {
        let mut sink = RecordingSink::default();
        let mut now = start;
        while now <= start + duration {
            for beat in scheduler.tick(now, &mut sink) {
                assert!(beat.time < now + 0.1 + 1e-9, "beat {} too early at {}", beat.time, now);
            }
            now += 0.025;
        }
        sink.0
    }

    fn assert_spacing(times: &[f64], expected: f64) {
        for pair in times.windows(2) {
            assert!(
                (pair[1] - pair[0] - expected).abs() < 1e-9,
                "spacing {} != {}",
                pair[1] - pair[0],
                expected
            );
        }
    }

    #[test]
    fn beats_at_60_bpm_are_one_second_apart() {
        let mut scheduler = scheduler_at(60);
        let times = poll(&mut scheduler, 0.0, 5.0);
        assert!(times.len() >= 5);
        assert_spacing(&times, 1.0);
    }

    #[test]
    fn beats_at_120_bpm_are_half_a_second_apart() {
        let mut scheduler = scheduler_at(120);
        let times = poll(&mut scheduler, 0.0, 5.0);
        assert!(times.len() >= 10);
        assert_spacing(&times, 0.5);
    }

    #[test]
    fn no_beat_is_skipped() {
        for bpm in [40, 60, 97, 120, 200, 300] {
            let mut scheduler = scheduler_at(bpm);
            let duration = 10.0;
            let times = poll(&mut scheduler, 0.0, duration);
            let expected = (duration / (60.0 / bpm as f64)).floor() as i64;
            assert!(
                (times.len() as i64 - expected).abs() <= 1,
                "{} bpm: {} beats, expected about {}",
                bpm,
                times.len(),
                expected
            );
        }
    }

    #[test]
    fn first_tick_drains_only_the_lookahead_window() {
        let mut scheduler = scheduler_at(120);
        scheduler.reset_cursor(2.0);
        let mut sink = RecordingSink::default();
        let beats = scheduler.tick(2.0, &mut sink);
        assert_eq!(beats.len(), 1);
        assert_eq!(beats[0].time, 2.0);
        assert_eq!(scheduler.next_beat_time(), 2.5);

        assert!(scheduler.tick(2.3, &mut sink).is_empty());
        assert_eq!(scheduler.tick(2.41, &mut sink).len(), 1);
    }

    #[test]
    fn delayed_tick_catches_up_in_order() {
        let mut scheduler = scheduler_at(120);
        let mut sink = RecordingSink::default();
        scheduler.tick(0.0, &mut sink);
        // The timer stalls for two seconds.
        let beats = scheduler.tick(2.0, &mut sink);
        assert_eq!(beats.len(), 4);
        assert!(beats.windows(2).all(|w| w[0].time <= w[1].time));
        assert_eq!(sink.0, vec![0.0, 0.5, 1.0, 1.5, 2.0]);
    }

    #[test]
    fn counter_wraps_at_the_measure() {
        let mut scheduler = scheduler_at(60);
        let mut sink = RecordingSink::default();
        let numbers: Vec<u32> = (0..6)
            .flat_map(|second| scheduler.tick(second as f64, &mut sink))
            .map(|beat| beat.number)
            .collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 1, 2]);
    }

    #[test]
    fn unbounded_counter_keeps_counting() {
        let mut scheduler = BeatScheduler::new(&MetronomeConfig {
            bpm: 60,
            beat_counting: BeatCounting::Unbounded,
            ..MetronomeConfig::default()
        });
        let mut sink = RecordingSink::default();
        for second in 0..6 {
            scheduler.tick(second as f64, &mut sink);
        }
        assert_eq!(scheduler.beat_number(), 6);
    }

    #[test]
    fn restart_resets_the_cursor_to_the_new_start_time() {
        let mut metronome: Metronome<FakeOutput> = Metronome::new(MetronomeConfig::default());
        let (output, clock, _) = fake();
        metronome.start_with(output);
        clock.set(3.0);
        metronome.tick();
        assert!(metronome.scheduler().next_beat_time() > 3.0);

        metronome.stop();
        assert_eq!(metronome.state(), TransportState::Stopped);
        assert_eq!(metronome.beat_number(), 0);

        let (output, clock, clicks) = fake();
        clock.set(10.0);
        metronome.start_with(output);
        assert_eq!(metronome.scheduler().next_beat_time(), 10.0);
        let beats = metronome.tick();
        assert_eq!(beats[0].time, 10.0);
        assert_eq!(clicks.borrow()[0], 10.0);
    }

    #[test]
    fn stopped_metronome_schedules_nothing() {
        let mut metronome: Metronome<FakeOutput> = Metronome::new(MetronomeConfig::default());
        assert!(metronome.tick().is_empty());
        assert_eq!(metronome.state(), TransportState::Stopped);
    }

    #[test]
    fn failed_start_leaves_the_transport_stopped() {
        let mut metronome: Metronome<FakeOutput> = Metronome::new(MetronomeConfig::default());
        assert!(metronome.start().is_err());
        assert!(!metronome.is_running());
    }

    #[test]
    fn tempo_change_while_running_restarts_the_cursor() {
        let mut metronome: Metronome<FakeOutput> = Metronome::new(MetronomeConfig::default());
        let (output, clock, _) = fake();
        metronome.start_with(output);
        metronome.tick();
        clock.set(0.3);
        assert!(metronome.set_bpm(60));
        assert_eq!(metronome.scheduler().next_beat_time(), 0.3);
        assert_eq!(metronome.bpm(), 60);
    }

    #[test]
    fn stop_keeps_the_tempo() {
        let mut metronome: Metronome<FakeOutput> = Metronome::new(MetronomeConfig::default());
        let (output, _, _) = fake();
        metronome.start_with(output);
        metronome.set_bpm(90);
        metronome.stop();
        assert_eq!(metronome.bpm(), 90);
    }

    #[test]
    fn tempo_limit_is_configurable() {
        let mut capped: Metronome<FakeOutput> = Metronome::new(MetronomeConfig {
            bpm: 300,
            ..MetronomeConfig::default()
        });
        assert!(!capped.increment_bpm());
        assert_eq!(capped.bpm(), 300);
        assert!(!capped.set_bpm(0));

        let mut unbounded: Metronome<FakeOutput> = Metronome::new(MetronomeConfig {
            bpm: 300,
            bpm_limit: BpmLimit::Unbounded,
            ..MetronomeConfig::default()
        });
        assert!(unbounded.increment_bpm());
        assert_eq!(unbounded.bpm(), 301);
    }

    #[test]
    fn clicks_scheduled_before_stop_still_play() {
        let mut metronome: Metronome<FakeOutput> = Metronome::new(MetronomeConfig::default());
        let (output, clock, clicks) = fake();
        let released = Rc::clone(&output.released);
        metronome.start_with(output);

        clock.set(0.45);
        let beats = metronome.tick();
        assert_eq!(beats.last().map(|b| b.time), Some(0.5));
        metronome.stop();

        // The click at 0.5 s is still ahead of the clock, so the output stays open.
        assert!(!metronome.is_running());
        assert!(metronome.holds_output());
        assert!(!released.get());

        clock.set(0.52);
        assert!(metronome.tick().is_empty());
        assert!(!released.get(), "click at 0.5 s is still ringing");

        clock.set(0.56);
        metronome.tick();
        assert!(released.get());
        assert!(!metronome.holds_output());
        assert_eq!(*clicks.borrow(), vec![0.0, 0.5]);
    }

    #[test]
    fn idle_output_is_released_on_stop() {
        let mut metronome: Metronome<FakeOutput> = Metronome::new(MetronomeConfig::default());
        let (output, clock, _) = fake();
        let released = Rc::clone(&output.released);
        metronome.start_with(output);
        metronome.tick();
        clock.set(0.2);
        metronome.stop();
        assert!(released.get());
    }

    #[test]
    fn restart_while_clicks_ring_out_reuses_the_output() {
        let mut metronome: Metronome<FakeOutput> = Metronome::new(MetronomeConfig::default());
        let (output, clock, clicks) = fake();
        let released = Rc::clone(&output.released);
        metronome.start_with(output);
        metronome.tick();
        metronome.stop();

        clock.set(0.01);
        // Opening a device always fails for the fake, so success means reuse.
        assert!(metronome.start().is_ok());
        assert!(metronome.is_running());
        assert!(!released.get());
        assert_eq!(metronome.scheduler().next_beat_time(), 0.01);
        metronome.tick();
        assert_eq!(*clicks.borrow(), vec![0.0, 0.01]);
    }

    #[test]
    fn configured_tempo_is_clamped_to_the_limit() {
        let metronome: Metronome<FakeOutput> = Metronome::new(MetronomeConfig {
            bpm: 1000,
            ..MetronomeConfig::default()
        });
        assert_eq!(metronome.bpm(), 300);
    }
}
