//! # Cent Meter Widget
//!
//! A row of segments spanning -50 to +50 cents. The segment nearest the
//! current deviation lights up in the colour of its accuracy band; the centre
//! segment is drawn taller.

use iced::widget::canvas::{self, Geometry, Path};
use iced::widget::container;
use iced::{Color, Element, Point, Rectangle, Renderer, Size, Theme, mouse};
use practice_core::meter::{CENTER_SEGMENT, SEGMENTS};
use practice_core::{CentBand, MeterReading};

const SEGMENT_GAP: f32 = 4.0;
const UNLIT: Color = Color::from_rgb(0.25, 0.25, 0.27);

pub struct CentMeter {
    reading: Option<MeterReading>,
}

impl CentMeter {
    pub fn new(reading: Option<MeterReading>) -> Self {
        Self { reading }
    }

    pub fn view(self) -> Element<'static, crate::Message> {
        container(
            canvas::Canvas::new(self)
                .width(iced::Length::Fill)
                .height(iced::Length::Fixed(80.0)),
        )
        .into()
    }
}

fn band_color(band: CentBand) -> Color {
    match band {
        CentBand::InTune => Color::from_rgb8(0x34, 0xDB, 0x98),
        CentBand::Close => Color::from_rgb8(0xFF, 0xC3, 0x00),
        CentBand::Off => Color::from_rgb8(0xFF, 0x8C, 0x1A),
        CentBand::Far => Color::from_rgb8(0xFF, 0x33, 0x33),
    }
}

impl<Message> canvas::Program<Message> for CentMeter {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = canvas::Frame::new(renderer, bounds.size());

        let segment_width =
            (bounds.width - SEGMENT_GAP * (SEGMENTS - 1) as f32) / SEGMENTS as f32;
        let side_height = bounds.height * 0.6;

        for index in 0..SEGMENTS {
            let height = if index == CENTER_SEGMENT {
                bounds.height
            } else {
                side_height
            };
            let x = index as f32 * (segment_width + SEGMENT_GAP);
            let y = (bounds.height - height) / 2.0;

            let color = match self.reading {
                Some(reading) if reading.highlights(index) => band_color(reading.band),
                _ => UNLIT,
            };

            let segment = Path::rectangle(Point::new(x, y), Size::new(segment_width, height));
            frame.fill(&segment, color);
        }

        vec![frame.into_geometry()]
    }
}
