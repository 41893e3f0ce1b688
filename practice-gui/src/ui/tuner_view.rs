//! Tuner page: detected note, cent readout and the segmented meter.

use super::cent_meter::CentMeter;
use crate::Message;
use iced::widget::{Space, column, container, row, text};
use iced::{Alignment, Element, Length};
use practice_core::meter::{self, MeterReading};
use practice_core::TunerSession;

pub fn view(tuner: &TunerSession) -> Element<'_, Message> {
    let note = tuner.current_note();

    let (note_name, detail) = match note {
        Some(note) => (
            note.name.to_string(),
            format!("octave {}  |  {:.2} Hz", note.octave, note.frequency),
        ),
        None => ("--".to_string(), String::new()),
    };

    let readout = column![
        row![
            text(note_name).size(72),
            Space::with_width(10),
            text(meter::cents_label(note)).size(20),
        ]
        .align_y(Alignment::Center),
        text(detail).size(14),
    ]
    .align_x(Alignment::Center)
    .spacing(4);

    let meter = CentMeter::new(note.map(MeterReading::from_note)).view();

    let content = column![
        super::page_title("Tuner"),
        readout,
        Space::with_height(20),
        container(meter).width(Length::Fixed(520.0)),
        Space::with_height(30),
        super::power_button(tuner.is_active(), "Power", Message::ToggleTuner),
    ]
    .align_x(Alignment::Center)
    .spacing(10);

    content.into()
}
