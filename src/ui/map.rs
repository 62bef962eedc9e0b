use crate::app::App;
use crate::config::DisplayConfig;
use crate::geometry::Point;
use crate::store::BlockDevice;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        Block, Borders, Paragraph,
        canvas::{Canvas, Points, Rectangle},
    },
};

/// Width of the rating panel in terminal cells.
const PANEL_COLUMNS: u16 = 12;

struct BrowseLayout {
    map: Rect,
    panel: Rect,
    status: Rect,
}

fn layout(area: Rect) -> BrowseLayout {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(1)])
        .split(area);
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(10), Constraint::Length(PANEL_COLUMNS)])
        .split(rows[0]);
    BrowseLayout {
        map: columns[0],
        panel: columns[1],
        status: rows[1],
    }
}

/// Screen coordinate of a click on terminal cell (`column`, `row`), if the
/// cell lies inside the rating panel.
pub fn panel_point(area: Rect, column: u16, row: u16, display: &DisplayConfig) -> Option<Point> {
    let inner = super::rating::buttons_area(layout(area).panel);
    if inner.height == 0
        || column < inner.x
        || column >= inner.x + inner.width
        || row < inner.y
        || row >= inner.y + inner.height
    {
        return None;
    }
    // Centre of the clicked row, scaled to the screen height
    let offset = i32::from(row - inner.y) * 2 + 1;
    let y = offset * display.screen_height / (i32::from(inner.height) * 2);
    Some(Point::new(display.screen_width - display.rating_panel_width / 2, y))
}

pub fn render<D: BlockDevice>(app: &App<D>, frame: &mut Frame) {
    let areas = layout(frame.area());
    let state = app.state();
    let window = app.navigator.geometry().window;
    let (w, h) = (f64::from(window.width), f64::from(window.height));

    // ── Map window ──
    let mut matching = Vec::new();
    let mut filtered = Vec::new();
    for marker in &app.markers {
        // Canvas y grows upward
        let point = (f64::from(marker.at.x), h - f64::from(marker.at.y));
        if marker.rating >= state.min_rating {
            matching.push(point);
        } else {
            filtered.push(point);
        }
    }
    let cursor = state.viewport.cursor;
    let size = f64::from(app.config.display.cursor_size);
    let half = size / 2.0;

    let title = format!(
        " Map @ {},{} ",
        state.viewport.origin.x, state.viewport.origin.y
    );
    let canvas = Canvas::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(title),
        )
        .marker(Marker::Braille)
        .x_bounds([0.0, w])
        .y_bounds([0.0, h])
        .paint(|ctx| {
            ctx.draw(&Points {
                coords: &filtered,
                color: Color::DarkGray,
            });
            ctx.draw(&Points {
                coords: &matching,
                color: Color::Yellow,
            });
            ctx.draw(&Rectangle {
                x: f64::from(cursor.x) - half,
                y: h - f64::from(cursor.y) - half,
                width: size,
                height: size,
                color: Color::Red,
            });
        });
    frame.render_widget(canvas, areas.map);

    // ── Rating panel ──
    super::rating::render(state.min_rating, frame, areas.panel);

    // ── Status bar ──
    let focal = state.viewport.focal_point();
    let status_line = Line::from(vec![
        super::key_hint(" ←↑↓→"),
        Span::raw(" Move  "),
        super::key_hint("Enter"),
        Span::raw(" Nearby  "),
        super::key_hint("1-5"),
        Span::raw(" Rating  "),
        super::key_hint("?"),
        Span::raw(" Help  "),
        Span::styled(
            format!("({}, {})  ", focal.x, focal.y),
            Style::default().fg(Color::White),
        ),
        Span::styled(&app.status_msg, Style::default().fg(Color::DarkGray)),
    ]);
    frame.render_widget(Paragraph::new(status_line), areas.status);
}
