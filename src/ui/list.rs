use crate::app::App;
use crate::store::BlockDevice;
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};
use unicode_width::UnicodeWidthChar;

pub fn render<D: BlockDevice>(app: &App<D>, frame: &mut Frame) {
    let area = frame.area();
    let state = app.state();

    // Layout: header(3) + list(min) + status(1)
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(1),
        ])
        .split(area);

    // ── Header ──
    let focal = state.viewport.focal_point();
    let header_text = format!(
        " Nearby places   [{} rated {}+ from ({}, {})]",
        state.count,
        state.min_rating + 1,
        focal.x,
        focal.y
    );
    let header = Paragraph::new(header_text)
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Left)
        .block(
            Block::default()
                .borders(Borders::BOTTOM)
                .border_style(Style::default().fg(Color::DarkGray)),
        );
    frame.render_widget(header, chunks[0]);

    // ── List ──
    let list_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Results ");

    if state.count == 0 {
        let empty = Paragraph::new("No results. Press Enter to return to the map.")
            .style(Style::default().fg(Color::Yellow))
            .alignment(Alignment::Center)
            .block(list_block);
        frame.render_widget(empty, chunks[1]);
    } else {
        let name_width = (area.width as usize).saturating_sub(32);
        let items: Vec<ListItem> = app
            .page_rows
            .iter()
            .map(|row| {
                let line = Line::from(vec![
                    Span::styled(
                        format!("{:>4} ", row.position + 1),
                        Style::default().fg(Color::DarkGray),
                    ),
                    Span::styled(
                        format!("{:<5} ", super::stars(row.rating)),
                        Style::default().fg(Color::Yellow),
                    ),
                    Span::raw(truncate_str(&row.name, name_width)),
                    Span::styled(
                        format!("  {} px", row.distance),
                        Style::default().fg(Color::DarkGray),
                    ),
                ]);
                ListItem::new(line)
            })
            .collect();

        let range = app.navigator.page_range();
        let pages = state.count.div_ceil(app.navigator.page_size());
        let page_info = format!(
            " {}-{} of {}  page {}/{} ",
            range.start + 1,
            range.end,
            state.count,
            state.page + 1,
            pages
        );

        let list_widget = List::new(items)
            .block(list_block.title_bottom(Line::from(page_info).alignment(Alignment::Right)))
            .highlight_style(
                Style::default()
                    .bg(Color::DarkGray)
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("▸ ");

        let mut list_state = ListState::default();
        list_state.select(Some(state.highlighted.saturating_sub(range.start)));
        frame.render_stateful_widget(list_widget, chunks[1], &mut list_state);
    }

    // ── Status bar ──
    let status_line = Line::from(vec![
        super::key_hint(" ↑↓"),
        Span::raw(" Navigate  "),
        super::key_hint("Enter"),
        Span::raw(" Show on map  "),
        super::key_hint("?"),
        Span::raw(" Help  "),
        super::key_hint("q"),
        Span::raw(" Quit  "),
        Span::styled(&app.status_msg, Style::default().fg(Color::DarkGray)),
    ]);
    frame.render_widget(Paragraph::new(status_line), chunks[2]);
}

/// Truncate a string to `max_width` display columns, adding "…" if truncated.
pub fn truncate_str(s: &str, max_width: usize) -> String {
    let width: usize = s.chars().filter_map(|c| c.width()).sum();
    if width <= max_width {
        return s.to_string();
    }
    let budget = max_width.saturating_sub(1);
    let mut used = 0;
    let mut result = String::new();
    for c in s.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        result.push(c);
    }
    result.push('…');
    result
}
