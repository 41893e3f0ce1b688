//! # UI Module
//!
//! Page views and shared widgets for the guitar practice app.

pub mod cent_meter;
pub mod metronome_view;
pub mod songs_view;
pub mod tuner_view;

use crate::{Message, Page};
use iced::widget::{Space, button, column, container, row, text};
use iced::{Alignment, Background, Border, Color, Element, Length, Shadow, Vector};

const ACTIVE_GLOW: Color = Color::from_rgb(0.2, 0.85, 0.4);
const INACTIVE_GLOW: Color = Color::from_rgb(0.85, 0.2, 0.2);
const NAV_HIGHLIGHT: Color = Color::from_rgb(0.25, 0.45, 0.8);
const NAV_BACKGROUND: Color = Color::from_rgb(0.18, 0.18, 0.2);

/// Places a page above the navbar.
pub fn layout(page: Element<'_, Message>, current: Page) -> Element<'_, Message> {
    column![
        container(page)
            .width(Length::Fill)
            .height(Length::Fill)
            .center_x(Length::Fill)
            .center_y(Length::Fill)
            .padding(20),
        navbar(current),
    ]
    .into()
}

/// Bottom navigation with the current page highlighted.
fn navbar(current: Page) -> Element<'static, Message> {
    let buttons = Page::ALL.into_iter().map(|page| -> Element<'static, Message> {
        let is_current = page == current;
        button(text(page.label()).size(16).width(Length::Fill).center())
            .width(Length::Fill)
            .padding([10, 0])
            .style(move |_theme, _status| button::Style {
                background: Some(Background::Color(if is_current {
                    NAV_HIGHLIGHT
                } else {
                    NAV_BACKGROUND
                })),
                text_color: Color::WHITE,
                ..button::Style::default()
            })
            .on_press(Message::Navigate(page))
            .into()
    });

    row(buttons).spacing(2).width(Length::Fill).into()
}

/// Round power button that glows green while the tool runs and red while
/// it is stopped.
pub fn power_button(active: bool, label: &str, on_press: Message) -> Element<'static, Message> {
    const DIAMETER: f32 = 96.0;
    let glow = if active { ACTIVE_GLOW } else { INACTIVE_GLOW };

    button(
        text(label.to_string())
            .size(18)
            .width(Length::Fill)
            .height(Length::Fill)
            .center(),
    )
    .width(Length::Fixed(DIAMETER))
    .height(Length::Fixed(DIAMETER))
    .style(move |_theme, _status| button::Style {
        background: Some(Background::Color(Color::from_rgb(0.12, 0.12, 0.14))),
        text_color: glow,
        border: Border {
            color: glow,
            width: 3.0,
            radius: (DIAMETER / 2.0).into(),
        },
        shadow: Shadow {
            color: glow,
            offset: Vector::new(0.0, 0.0),
            blur_radius: 18.0,
        },
    })
    .on_press(on_press)
    .into()
}

/// A page title with some breathing room below it.
pub fn page_title(title: &str) -> Element<'static, Message> {
    column![text(title.to_string()).size(28), Space::with_height(10)]
        .align_x(Alignment::Center)
        .into()
}
