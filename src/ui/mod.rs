mod help;
mod list;
mod map;
mod rating;

pub use map::panel_point;

use crate::app::App;
use crate::navigator::Mode;
use crate::store::BlockDevice;
use ratatui::{
    Frame,
    style::{Color, Modifier, Style},
    text::Span,
};

/// Top-level render dispatch.
pub fn render<D: BlockDevice>(app: &App<D>, frame: &mut Frame) {
    match app.state().mode {
        Mode::Browse => map::render(app, frame),
        Mode::List => list::render(app, frame),
    }

    // Render help overlay on top if active
    if app.show_help {
        help::render(frame);
    }
}

/// `rating` as a run of stars; stored ratings 0..=4 show as 1..=5 stars.
pub fn stars(rating: u8) -> String {
    "★".repeat(usize::from(rating) + 1)
}

/// Bold cyan key hint for status bars.
fn key_hint(key: &str) -> Span<'_> {
    Span::styled(
        key,
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )
}
