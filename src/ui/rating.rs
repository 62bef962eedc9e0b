use crate::rating::{BUTTON_COUNT, RatingSelector};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Paragraph},
};

fn panel_block() -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Min ")
}

/// Area inside the panel border that the buttons share.
pub fn buttons_area(panel: Rect) -> Rect {
    panel_block().inner(panel)
}

/// Five stacked buttons; the selected one and every stricter one above it
/// are lit.
pub fn render(min_rating: u8, frame: &mut Frame, area: Rect) {
    let inner = buttons_area(area);
    frame.render_widget(panel_block(), area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Ratio(1, BUTTON_COUNT as u32); BUTTON_COUNT])
        .split(inner);

    let selected = RatingSelector::button_for_threshold(min_rating);
    for (button, row) in rows.iter().enumerate() {
        let threshold = RatingSelector::threshold_for_button(button);
        let style = if button <= selected {
            Style::default()
                .fg(Color::Black)
                .bg(Color::White)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Red)
        };
        let label = Paragraph::new(super::stars(threshold))
            .style(style)
            .alignment(Alignment::Center);
        // Vertically centre the label in its band
        let line = Rect {
            y: row.y + row.height / 2,
            height: row.height.min(1),
            ..*row
        };
        frame.render_widget(label, line);
    }
}
