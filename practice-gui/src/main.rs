//! # Guitar Practice - Desktop GUI
//!
//! Three practice tools behind a bottom navbar: a chromatic tuner, a
//! metronome and a song player. Only the visible page may hold an audio
//! device; switching pages tears the previous page's session down.
//!
//! ## Architecture
//! - **Main Thread**: Iced GUI application with dark theme
//! - **Audio Threads**: one cpal worker per open stream, owned by the core
//!   sessions
//! - **Updates**: per-tool timer subscriptions, active while that tool holds
//!   a device or has a song loaded

mod ui;

use anyhow::Context;
use iced::{Element, Subscription, Task, Theme};
use practice_core::config::{self, AppConfig};
use practice_core::{Metronome, SongPlayer, TunerSession};
use std::fmt::Display;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable naming an alternative configuration file.
const CONFIG_ENV: &str = "PRACTICE_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "practice.json";
const SONG_REFRESH_INTERVAL: Duration = Duration::from_millis(250);

pub fn main() -> anyhow::Result<()> {
    env_logger::init();
    log::info!("[MAIN] Starting Guitar Practice...");

    let config_path = std::env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let config = config::load_config(&config_path)
        .with_context(|| format!("failed to load configuration from {}", config_path.display()))?;

    iced::application("Guitar Practice", PracticeApp::update, PracticeApp::view)
        .subscription(PracticeApp::subscription)
        .theme(PracticeApp::theme)
        .run_with(move || PracticeApp::new(config))?;

    log::info!("[MAIN] Application finished");
    Ok(())
}

/// The practice tools, one per page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Tuner,
    Metronome,
    Songs,
}

impl Page {
    pub const ALL: [Page; 3] = [Page::Tuner, Page::Metronome, Page::Songs];

    pub fn label(self) -> &'static str {
        match self {
            Page::Tuner => "Tuner",
            Page::Metronome => "Metronome",
            Page::Songs => "Songs",
        }
    }
}

#[derive(Debug, Clone)]
pub enum Message {
    Navigate(Page),

    // Tuner
    ToggleTuner,
    TunerTick,

    // Metronome
    ToggleMetronome,
    MetronomeTick,
    BpmDecrement,
    BpmIncrement,
    BpmInput(String),

    // Songs
    ToggleSong,
    SongTick,

    NoticeDismissed,
}

struct PracticeApp {
    config: AppConfig,
    page: Page,
    tuner: TunerSession,
    metronome: Metronome,
    /// Text currently in the tempo field
    bpm_input: String,
    /// Loaded on first play
    song: Option<SongPlayer>,
}

impl PracticeApp {
    fn new(config: AppConfig) -> (Self, Task<Message>) {
        let metronome = Metronome::new(config.metronome.clone());
        let app = Self {
            tuner: TunerSession::new(config.tuner.clone()),
            bpm_input: metronome.bpm().to_string(),
            metronome,
            song: None,
            page: Page::Tuner,
            config,
        };
        (app, Task::none())
    }

    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Navigate(page) => {
                if page != self.page {
                    log::info!("[MAIN] Switching to {}", page.label());
                    self.release_audio();
                    self.page = page;
                }
            }
            Message::ToggleTuner => {
                if self.tuner.is_active() {
                    self.tuner.stop();
                } else if let Err(e) = self.tuner.start() {
                    return device_notice("Microphone unavailable", e);
                }
            }
            Message::TunerTick => {
                self.tuner.process();
            }
            Message::ToggleMetronome => {
                if self.metronome.is_running() {
                    self.metronome.stop();
                } else if let Err(e) = self.metronome.start() {
                    log::error!("[MAIN] Failed to start metronome: {}", e);
                    return device_notice("Audio output unavailable", e);
                }
            }
            Message::MetronomeTick => {
                self.metronome.tick();
            }
            Message::BpmDecrement => {
                self.metronome.decrement_bpm();
                self.bpm_input = self.metronome.bpm().to_string();
            }
            Message::BpmIncrement => {
                self.metronome.increment_bpm();
                self.bpm_input = self.metronome.bpm().to_string();
            }
            Message::BpmInput(value) => {
                // Clearing the field is allowed so a new tempo can be typed.
                if value.is_empty() {
                    self.bpm_input = value;
                } else if let Ok(bpm) = value.trim().parse::<u32>() {
                    if self.metronome.set_bpm(bpm) || bpm == self.metronome.bpm() {
                        self.bpm_input = value;
                    }
                }
            }
            Message::ToggleSong => return self.toggle_song(),
            Message::SongTick => {}
            Message::NoticeDismissed => {}
        }
        Task::none()
    }

    fn toggle_song(&mut self) -> Task<Message> {
        if self.song.is_none() {
            match SongPlayer::open(&self.config.songs.path) {
                Ok(player) => self.song = Some(player),
                Err(e) => {
                    log::error!("[MAIN] Failed to load song: {}", e);
                    return device_notice("Song unavailable", e);
                }
            }
        }
        if let Some(player) = self.song.as_mut() {
            if let Err(e) = player.toggle() {
                player.close();
                return device_notice("Audio output unavailable", e);
            }
        }
        Task::none()
    }

    /// Stops every tool and releases its device.
    fn release_audio(&mut self) {
        self.tuner.stop();
        self.metronome.stop();
        if let Some(player) = self.song.as_mut() {
            player.close();
        }
    }

    fn view(&self) -> Element<'_, Message> {
        let page = match self.page {
            Page::Tuner => ui::tuner_view::view(&self.tuner),
            Page::Metronome => ui::metronome_view::view(&self.metronome, &self.bpm_input),
            Page::Songs => ui::songs_view::view(&self.config.songs.path, self.song.as_ref()),
        };
        ui::layout(page, self.page)
    }

    fn subscription(&self) -> Subscription<Message> {
        let mut subscriptions = Vec::new();
        if self.tuner.is_active() {
            subscriptions.push(
                iced::time::every(self.tuner.config().update_interval())
                    .map(|_| Message::TunerTick),
            );
        }
        // Keeps ticking after stop until the last clicks have rung out.
        if self.metronome.holds_output() {
            subscriptions.push(
                iced::time::every(self.metronome.tick_interval()).map(|_| Message::MetronomeTick),
            );
        }
        // Also refreshes while paused so the end of the track shows up.
        if self.page == Page::Songs && self.song.is_some() {
            subscriptions.push(iced::time::every(SONG_REFRESH_INTERVAL).map(|_| Message::SongTick));
        }
        Subscription::batch(subscriptions)
    }

    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

/// Shows a non-blocking error dialog for a failed device or file access.
fn device_notice(title: &str, error: impl Display) -> Task<Message> {
    let dialog = rfd::AsyncMessageDialog::new()
        .set_level(rfd::MessageLevel::Error)
        .set_title(title)
        .set_description(error.to_string())
        .set_buttons(rfd::MessageButtons::Ok);
    Task::perform(dialog.show(), |_| Message::NoticeDismissed)
}
