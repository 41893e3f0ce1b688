//! Songs page: the bundled backing track with a single play/pause button.

use crate::Message;
use iced::widget::{Space, column, text};
use iced::{Alignment, Element};
use practice_core::SongPlayer;
use std::path::Path;

fn format_time(secs: f64) -> String {
    let total = secs.max(0.0) as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

/// Title shown for a song file, e.g. `chill-funk.wav` becomes "Chill Funk".
fn song_title(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    stem.split(['-', '_'])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn view<'a>(path: &'a Path, player: Option<&'a SongPlayer>) -> Element<'a, Message> {
    let playing = player.is_some_and(|p| p.is_playing());
    let progress = match player {
        Some(p) => format!(
            "{} / {}",
            format_time(p.position_secs()),
            format_time(p.duration_secs())
        ),
        None => "--:-- / --:--".to_string(),
    };

    column![
        super::page_title("Songs"),
        text(song_title(path)).size(32),
        text(progress).size(16),
        Space::with_height(30),
        super::power_button(
            playing,
            if playing { "Pause" } else { "Play" },
            Message::ToggleSong
        ),
    ]
    .align_x(Alignment::Center)
    .spacing(10)
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn titles_are_derived_from_the_file_name() {
        assert_eq!(song_title(Path::new("assets/songs/chill-funk.wav")), "Chill Funk");
        assert_eq!(song_title(Path::new("blues_in_a.wav")), "Blues In A");
    }

    #[test]
    fn times_are_minutes_and_seconds() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(75.9), "1:15");
    }
}
