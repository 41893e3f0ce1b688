//! Metronome page: tempo controls, beat indicator and transport button.

use crate::Message;
use iced::widget::{Space, button, column, container, row, text, text_input};
use iced::{Alignment, Background, Border, Color, Element, Length};
use practice_core::Metronome;

const DOT_SIZE: f32 = 22.0;
const DOT_LIT: Color = Color::from_rgb(1.0, 0.76, 0.0);
const DOT_UNLIT: Color = Color::from_rgb(0.3, 0.3, 0.32);

pub fn view<'a>(metronome: &Metronome, bpm_input: &'a str) -> Element<'a, Message> {
    let tempo = row![
        button(text("-").size(24).center())
            .width(Length::Fixed(48.0))
            .on_press(Message::BpmDecrement),
        text_input("bpm", bpm_input)
            .on_input(Message::BpmInput)
            .size(24)
            .width(Length::Fixed(100.0)),
        button(text("+").size(24).center())
            .width(Length::Fixed(48.0))
            .on_press(Message::BpmIncrement),
    ]
    .spacing(10)
    .align_y(Alignment::Center);

    column![
        super::page_title("Metronome"),
        text(format!("{} BPM", metronome.bpm())).size(48),
        tempo,
        Space::with_height(20),
        beat_dots(metronome.beat_number(), metronome.beats_per_measure()),
        Space::with_height(30),
        super::power_button(metronome.is_running(), "Start", Message::ToggleMetronome),
    ]
    .align_x(Alignment::Center)
    .spacing(10)
    .into()
}

/// One dot per beat of the measure; the current beat is lit. A counter of 0
/// (stopped) lights nothing.
fn beat_dots(beat_number: u32, beats_per_measure: u32) -> Element<'static, Message> {
    let beats = beats_per_measure.max(1);
    let current = (beat_number > 0).then(|| (beat_number - 1) % beats + 1);

    let dots = (1..=beats).map(|beat| -> Element<'static, Message> {
        let color = if Some(beat) == current { DOT_LIT } else { DOT_UNLIT };
        container(Space::new(Length::Fixed(DOT_SIZE), Length::Fixed(DOT_SIZE)))
            .style(move |_theme| container::Style {
                background: Some(Background::Color(color)),
                border: Border {
                    radius: (DOT_SIZE / 2.0).into(),
                    ..Border::default()
                },
                ..container::Style::default()
            })
            .into()
    });

    row(dots).spacing(16).into()
}
