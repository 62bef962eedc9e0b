use tracing::{debug, warn};

use crate::config::Config;
use crate::geometry::Point;
use crate::input::{ButtonTracker, InputFrame};
use crate::navigator::{Mode, NavEvent, NavGeometry, NavState, Navigator};
use crate::projection::{LinearProjection, Projection};
use crate::rating::{BUTTON_COUNT, PointerEvent, RatingSelector};
use crate::store::{BlockDevice, RecordStore, StoreError};

/// Pressure reported for simulated touches.
pub const SIMULATED_PRESSURE: i32 = 500;

/// A catalog entry visible in the current map window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    /// Offset inside the map window.
    pub at: Point,
    pub rating: u8,
}

/// One painted row of the list page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRow {
    pub position: usize,
    pub name: String,
    pub rating: u8,
    pub distance: u32,
}

/// Main application state: the device core plus what the screen shows.
pub struct App<D> {
    pub config: Config,
    pub store: RecordStore<D>,
    pub projection: LinearProjection,
    pub navigator: Navigator,
    pub selector: RatingSelector,
    pub select_button: ButtonTracker,
    pub should_quit: bool,
    pub show_help: bool,

    // Repainted on scroll, page turn and list open
    pub markers: Vec<Marker>,
    pub page_rows: Vec<ListRow>,

    pub status_msg: String,
}

impl<D: BlockDevice> App<D> {
    pub fn new(config: Config, store: RecordStore<D>) -> Self {
        let navigator = Navigator::new(
            NavGeometry::from_config(&config),
            config.joystick.clone(),
            config.list.page_size,
            store.len(),
        );
        let selector = RatingSelector::new(config.touch.clone(), config.display.clone());
        let status_msg = format!("{} places loaded", store.len());
        Self {
            projection: config.map,
            config,
            store,
            navigator,
            selector,
            select_button: ButtonTracker::default(),
            should_quit: false,
            show_help: false,
            markers: Vec::new(),
            page_rows: Vec::new(),
            status_msg,
        }
    }

    /// Initial paint of the map window.
    pub fn init(&mut self) {
        self.refresh_markers();
    }

    pub fn state(&self) -> &NavState {
        self.navigator.state()
    }

    /// Run one pass of the control loop.
    pub fn poll(&mut self, frame: InputFrame) {
        if let Some(pointer) = frame.pointer {
            self.touch(&pointer);
        }

        match self.navigator.step(&frame, &mut self.store, &self.projection) {
            Ok(Some(event)) => self.apply(event),
            Ok(None) => {}
            Err(e) => self.storage_fault(&e),
        }
    }

    /// Touch events only drive the rating panel while browsing the map.
    fn touch(&mut self, pointer: &PointerEvent) {
        if self.navigator.state().mode != Mode::Browse {
            return;
        }
        let threshold = &mut self.navigator.state_mut().min_rating;
        if self.selector.update_threshold(threshold, pointer) {
            self.status_msg = format!("Showing places rated {}+", *threshold + 1);
        }
    }

    /// Simulated touch at a screen point.
    pub fn touch_screen(&self, at: Point) -> InputFrame {
        let mut frame = InputFrame::idle(&self.config.joystick);
        frame.pointer = Some(self.selector.from_screen(at, SIMULATED_PRESSURE));
        frame
    }

    /// Simulated tap on rating button `button` (0 = top).
    pub fn tap_button(&self, button: usize) -> InputFrame {
        let centre = self.selector.button_centre(button.min(BUTTON_COUNT - 1));
        self.touch_screen(centre)
    }

    fn apply(&mut self, event: NavEvent) {
        debug!(?event, "navigator event");
        match event {
            NavEvent::Scrolled | NavEvent::ListClosed => self.refresh_markers(),
            NavEvent::Recentered { index } => {
                self.refresh_markers();
                if let Ok(record) = self.store.fetch(index) {
                    self.status_msg = format!("Centred on {}", record.name());
                }
            }
            NavEvent::ListOpened { count } => {
                self.refresh_page();
                self.status_msg = if count == 0 {
                    "No places match the rating filter".to_string()
                } else {
                    format!("{} places by distance", count)
                };
            }
            NavEvent::PageTurned { .. } => self.refresh_page(),
            NavEvent::CursorMoved { .. } | NavEvent::HighlightMoved { .. } => {}
        }
    }

    fn storage_fault(&mut self, e: &StoreError) {
        warn!(error = %e, "storage fault surfaced to navigator");
        self.status_msg = e.user_message();
    }

    /// Collect the records that fall inside the map window.
    pub fn refresh_markers(&mut self) {
        self.markers.clear();
        let viewport = self.navigator.state().viewport;
        let window = self.navigator.geometry().window;
        for index in 0..self.store.len() {
            let record = match self.store.fetch(index) {
                Ok(record) => record,
                Err(e) => return self.storage_fault(&e),
            };
            let p = self.projection.project(record.lat, record.lon);
            let at = Point::new(p.x - viewport.origin.x, p.y - viewport.origin.y);
            if (0..window.width).contains(&at.x) && (0..window.height).contains(&at.y) {
                self.markers.push(Marker {
                    at,
                    rating: record.rating,
                });
            }
        }
    }

    /// Fetch the names shown on the current list page.
    pub fn refresh_page(&mut self) {
        self.page_rows.clear();
        for position in self.navigator.page_range() {
            let candidate = self.navigator.candidates()[position];
            match self.store.fetch(candidate.index) {
                Ok(record) => self.page_rows.push(ListRow {
                    position,
                    name: record.name().into_owned(),
                    rating: record.rating,
                    distance: candidate.distance,
                }),
                Err(e) => return self.storage_fault(&e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::ButtonEdge;
    use crate::store::tests::image_with;
    use crate::store::{MemBlockDevice, Record};

    fn app_with(records: &[Record]) -> App<MemBlockDevice> {
        let store = RecordStore::new(image_with(records, 0), 0, records.len(), 2);
        let mut app = App::new(Config::default(), store);
        app.init();
        app
    }

    /// Records near the map centre, ratings cycling 0..=4.
    fn central_records(n: usize) -> Vec<Record> {
        let p = LinearProjection::default();
        (0..n)
            .map(|i| {
                let lat = (p.lat_north + p.lat_south) / 2 + i as i32 * 10;
                let lon = (p.lon_west + p.lon_east) / 2 + i as i32 * 10;
                Record::new(&format!("place {i}"), lat, lon, (i % 5) as u8)
            })
            .collect()
    }

    fn press(app: &App<MemBlockDevice>) -> InputFrame {
        InputFrame {
            select: Some(ButtonEdge::Pressed),
            ..InputFrame::idle(&app.config.joystick)
        }
    }

    #[test]
    fn test_markers_in_window() {
        let app = app_with(&central_records(5));
        assert_eq!(app.markers.len(), 5);
        let window = app.config.display.window();
        assert!(app.markers.iter().all(|m| m.at.x < window.width && m.at.y < window.height));
    }

    #[test]
    fn test_rating_tap_then_list() {
        let mut app = app_with(&central_records(40));
        // Second button from the top: rated 3 or better
        let tap = app.tap_button(1);
        app.poll(tap);
        assert_eq!(app.state().min_rating, 3);
        assert!(app.status_msg.contains("4+"));

        let press = press(&app);
        app.poll(press);
        assert_eq!(app.state().mode, Mode::List);
        assert_eq!(app.state().count, 16);
        assert_eq!(app.page_rows.len(), 16);
        assert!(app.page_rows.iter().all(|row| row.rating >= 3));
        assert!(app.page_rows.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn test_taps_ignored_in_list() {
        let mut app = app_with(&central_records(3));
        let press = press(&app);
        app.poll(press);
        let tap = app.tap_button(0);
        app.poll(tap);
        assert_eq!(app.state().min_rating, 0);
    }

    #[test]
    fn test_page_rows_follow_page() {
        let mut app = app_with(&central_records(45));
        let press = press(&app);
        app.poll(press);
        assert_eq!(app.page_rows.len(), 30);

        let down = InputFrame {
            axes: crate::input::AxisSample { horizontal: 512, vertical: 1023 },
            ..InputFrame::idle(&app.config.joystick)
        };
        for _ in 0..30 {
            app.poll(down);
        }
        assert_eq!(app.state().page, 1);
        assert_eq!(app.page_rows.len(), 15);
        assert_eq!(app.page_rows[0].position, 30);
    }

    #[test]
    fn test_empty_result_message() {
        let records = [Record::new("dud", 5_350_000, -11_350_000, 0)];
        let mut app = app_with(&records);
        let tap = app.tap_button(0);
        app.poll(tap);
        let press = press(&app);
        app.poll(press);
        assert_eq!(app.state().mode, Mode::List);
        assert!(app.page_rows.is_empty());
        assert!(app.status_msg.contains("No places"));
    }

    #[test]
    fn test_fault_reported_and_recoverable() {
        let mut app = app_with(&central_records(20));
        app.store.device_mut().fail_next(2);
        let press = press(&app);
        app.poll(press);
        assert_eq!(app.state().mode, Mode::Browse);
        assert!(app.status_msg.contains("Storage fault"));

        app.poll(press);
        assert_eq!(app.state().mode, Mode::List);
    }

    #[test]
    fn test_pick_recentres_status() {
        let mut app = app_with(&central_records(3));
        let press = press(&app);
        app.poll(press);
        app.poll(press);
        assert_eq!(app.state().mode, Mode::Browse);
        assert!(app.status_msg.starts_with("Centred on place"));
    }
}
