use tracing::{debug, info};

use crate::config::{Config, JoystickConfig};
use crate::geometry::{Extent, Point};
use crate::input::{AxisSample, InputFrame};
use crate::projection::Projection;
use crate::rank::{Candidate, RankingEngine};
use crate::store::{BlockDevice, RecordStore, StoreError};

/// Which view is currently active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Browse,
    List,
}

/// Visible map window and the cursor inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub origin: Point,
    pub cursor: Point,
}

impl Viewport {
    /// The absolute map point under the cursor.
    pub fn focal_point(&self) -> Point {
        self.origin + self.cursor
    }
}

/// Everything the control loop mutates between polls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavState {
    pub mode: Mode,
    pub viewport: Viewport,
    pub min_rating: u8,
    pub highlighted: usize,
    pub page: usize,
    pub count: usize,
}

/// What the display has to repaint after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavEvent {
    CursorMoved { from: Point, to: Point },
    Scrolled,
    ListOpened { count: usize },
    HighlightMoved { from: usize, to: usize },
    PageTurned { page: usize },
    Recentered { index: usize },
    ListClosed,
}

/// Fixed pixel geometry the navigator clamps against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavGeometry {
    pub map: Extent,
    pub window: Extent,
    pub half_cursor: i32,
}

impl NavGeometry {
    pub fn from_config(config: &Config) -> Self {
        Self {
            map: config.map_extent(),
            window: config.display.window(),
            half_cursor: config.display.cursor_size / 2,
        }
    }

    fn cursor_bounds_x(&self) -> (i32, i32) {
        (self.half_cursor, self.window.width - self.half_cursor - 1)
    }

    fn cursor_bounds_y(&self) -> (i32, i32) {
        (self.half_cursor, self.window.height - self.half_cursor - 1)
    }

    fn clamp_origin(&self, origin: Point) -> Point {
        Point::new(
            origin.x.clamp(0, self.map.width - self.window.width),
            origin.y.clamp(0, self.map.height - self.window.height),
        )
    }

    fn clamp_cursor(&self, cursor: Point) -> Point {
        let (lo_x, hi_x) = self.cursor_bounds_x();
        let (lo_y, hi_y) = self.cursor_bounds_y();
        Point::new(cursor.x.clamp(lo_x, hi_x), cursor.y.clamp(lo_y, hi_y))
    }

    /// Cursor at the window centre, origin on the middle whole window of
    /// the map.
    pub fn initial_viewport(&self) -> Viewport {
        let (w, h) = (self.window.width, self.window.height);
        Viewport {
            origin: Point::new((self.map.width / w) / 2 * w, (self.map.height / h) / 2 * h),
            cursor: Point::new(w / 2, h / 2),
        }
    }
}

/// One axis worth of nudge scrolling. Returns whether the origin moved
/// a window.
fn nudge_axis(origin: &mut i32, cursor: &mut i32, lo: i32, hi: i32, window: i32, map: i32) -> bool {
    if *cursor == hi && *origin != map - window {
        *origin += window;
    } else if *cursor == lo && *origin != 0 {
        *origin -= window;
    } else {
        return false;
    }
    *cursor = window / 2;
    true
}

/// Two-mode controller over the map viewport and the ranked list.
pub struct Navigator {
    state: NavState,
    geometry: NavGeometry,
    joystick: JoystickConfig,
    page_size: usize,
    engine: RankingEngine,
}

impl Navigator {
    pub fn new(geometry: NavGeometry, joystick: JoystickConfig, page_size: usize, catalog_len: usize) -> Self {
        Self {
            state: NavState {
                mode: Mode::Browse,
                viewport: geometry.initial_viewport(),
                min_rating: 0,
                highlighted: 0,
                page: 0,
                count: 0,
            },
            geometry,
            joystick,
            page_size: page_size.max(1),
            engine: RankingEngine::with_capacity(catalog_len),
        }
    }

    pub fn state(&self) -> &NavState {
        &self.state
    }

    /// Mutable access for collaborators that own part of the state, such as
    /// the rating selector's threshold.
    pub fn state_mut(&mut self) -> &mut NavState {
        &mut self.state
    }

    pub fn geometry(&self) -> &NavGeometry {
        &self.geometry
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Ranked candidates of the active list.
    pub fn candidates(&self) -> &[Candidate] {
        self.engine.candidates()
    }

    /// Range of candidate positions on the current page.
    pub fn page_range(&self) -> std::ops::Range<usize> {
        let start = self.state.page * self.page_size;
        start.min(self.state.count)..(start + self.page_size).min(self.state.count)
    }

    /// Process one poll. Axis movement is applied before a press.
    ///
    /// A storage error aborts the action in progress and leaves the state as
    /// it was before the press.
    pub fn step<D: BlockDevice, P: Projection>(
        &mut self,
        frame: &InputFrame,
        store: &mut RecordStore<D>,
        projection: &P,
    ) -> Result<Option<NavEvent>, StoreError> {
        let moved = match self.state.mode {
            Mode::Browse => self.move_cursor(frame.axes),
            Mode::List => self.move_highlight(frame.axes),
        };
        if frame.pressed() {
            return self.select(store, projection).map(Some);
        }
        Ok(moved)
    }

    /// BROWSE: move the cursor and nudge-scroll at the window edges.
    pub fn move_cursor(&mut self, axes: AxisSample) -> Option<NavEvent> {
        if self.state.mode != Mode::Browse {
            return None;
        }
        let g = self.geometry;
        let vp = &mut self.state.viewport;
        let from = vp.cursor;
        let (lo_x, hi_x) = g.cursor_bounds_x();
        let (lo_y, hi_y) = g.cursor_bounds_y();

        let dy = self.joystick.deflection(axes.vertical);
        if let Some(dy) = dy {
            vp.cursor.y = (vp.cursor.y + dy).clamp(lo_y, hi_y);
        }
        let mut dx = self.joystick.deflection(axes.horizontal);
        if self.joystick.invert_horizontal {
            dx = dx.map(|d| -d);
        }
        if let Some(dx) = dx {
            vp.cursor.x = (vp.cursor.x + dx).clamp(lo_x, hi_x);
        }

        let mut scrolled = false;
        if dx.is_some() {
            scrolled |= nudge_axis(&mut vp.origin.x, &mut vp.cursor.x, lo_x, hi_x, g.window.width, g.map.width);
        }
        if dy.is_some() {
            scrolled |= nudge_axis(&mut vp.origin.y, &mut vp.cursor.y, lo_y, hi_y, g.window.height, g.map.height);
        }
        if scrolled {
            vp.origin = g.clamp_origin(vp.origin);
            debug!(x = vp.origin.x, y = vp.origin.y, "viewport scrolled");
            return Some(NavEvent::Scrolled);
        }

        (vp.cursor != from).then_some(NavEvent::CursorMoved { from, to: vp.cursor })
    }

    /// LIST: step the highlight by one and turn pages at their boundaries.
    pub fn move_highlight(&mut self, axes: AxisSample) -> Option<NavEvent> {
        if self.state.mode != Mode::List || self.state.count == 0 {
            return None;
        }
        let step = self.joystick.direction(axes.vertical);
        let from = self.state.highlighted;
        let to = from
            .saturating_add_signed(step as isize)
            .min(self.state.count - 1);
        if to == from {
            return None;
        }
        self.state.highlighted = to;

        let page = to / self.page_size;
        if page != self.state.page {
            self.state.page = page;
            debug!(page, "list page turned");
            return Some(NavEvent::PageTurned { page });
        }
        Some(NavEvent::HighlightMoved { from, to })
    }

    /// Handle a select press in the current mode.
    pub fn select<D: BlockDevice, P: Projection>(
        &mut self,
        store: &mut RecordStore<D>,
        projection: &P,
    ) -> Result<NavEvent, StoreError> {
        match self.state.mode {
            Mode::Browse => self.open_list(store, projection),
            Mode::List => self.pick_highlighted(store, projection),
        }
    }

    fn open_list<D: BlockDevice, P: Projection>(
        &mut self,
        store: &mut RecordStore<D>,
        projection: &P,
    ) -> Result<NavEvent, StoreError> {
        let focal = self.state.viewport.focal_point();
        let count = self
            .engine
            .rank(store, projection, focal, self.state.min_rating)?
            .len();
        self.state.count = count;
        self.state.highlighted = 0;
        self.state.page = 0;
        self.state.mode = Mode::List;
        info!(count, min_rating = self.state.min_rating, "list opened");
        Ok(NavEvent::ListOpened { count })
    }

    fn pick_highlighted<D: BlockDevice, P: Projection>(
        &mut self,
        store: &mut RecordStore<D>,
        projection: &P,
    ) -> Result<NavEvent, StoreError> {
        let Some(candidate) = self.candidates().get(self.state.highlighted).copied() else {
            self.state.mode = Mode::Browse;
            return Ok(NavEvent::ListClosed);
        };
        let record = store.fetch(candidate.index)?;
        let target = projection.project(record.lat, record.lon);

        let g = self.geometry;
        let origin = g.clamp_origin(Point::new(
            target.x - g.window.width / 2,
            target.y - g.window.height / 2,
        ));
        let cursor = g.clamp_cursor(Point::new(target.x - origin.x, target.y - origin.y));
        self.state.viewport = Viewport { origin, cursor };
        self.state.mode = Mode::Browse;
        info!(index = candidate.index, name = %record.name(), "recentred on record");
        Ok(NavEvent::Recentered { index: candidate.index })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::ButtonEdge;
    use crate::store::tests::image_with;
    use crate::store::{MemBlockDevice, Record};
    use proptest::prelude::*;

    struct Identity;

    impl Projection for Identity {
        fn x_from_longitude(&self, lon: i32) -> i32 {
            lon
        }
        fn y_from_latitude(&self, lat: i32) -> i32 {
            lat
        }
    }

    const W: i32 = 272;
    const H: i32 = 240;

    fn geometry(map_w: i32, map_h: i32) -> NavGeometry {
        NavGeometry {
            map: Extent::new(map_w, map_h),
            window: Extent::new(W, H),
            half_cursor: 4,
        }
    }

    fn navigator(map_w: i32, map_h: i32) -> Navigator {
        Navigator::new(geometry(map_w, map_h), JoystickConfig::default(), 30, 64)
    }

    fn axes(horizontal: i32, vertical: i32) -> AxisSample {
        AxisSample { horizontal, vertical }
    }

    // Horizontal axis is inverted: low readings push right.
    const RIGHT: i32 = 0;
    const LEFT: i32 = 1023;
    const DOWN: i32 = 1023;
    const UP: i32 = 0;
    const REST: i32 = 512;

    fn store_of(records: &[Record]) -> RecordStore<MemBlockDevice> {
        RecordStore::new(image_with(records, 0), 0, records.len(), 1)
    }

    fn press() -> InputFrame {
        InputFrame {
            axes: axes(REST, REST),
            select: Some(ButtonEdge::Pressed),
            pointer: None,
        }
    }

    #[test]
    fn test_initial_viewport() {
        let nav = navigator(2048, 2048);
        let vp = nav.state().viewport;
        assert_eq!(vp.origin, Point::new(816, 960));
        assert_eq!(vp.cursor, Point::new(136, 120));
        assert_eq!(nav.state().mode, Mode::Browse);
    }

    #[test]
    fn test_cursor_moves_and_clamps() {
        let mut nav = navigator(2048, 2048);
        let ev = nav.move_cursor(axes(REST, DOWN));
        assert_eq!(
            ev,
            Some(NavEvent::CursorMoved {
                from: Point::new(136, 120),
                to: Point::new(136, 127)
            })
        );
        // Inside the dead zone nothing happens
        assert_eq!(nav.move_cursor(axes(560, 470)), None);
    }

    #[test]
    fn test_right_boundary_scrolls_one_window() {
        let mut nav = navigator(2048, 2048);
        nav.state_mut().viewport = Viewport {
            origin: Point::new(0, 0),
            cursor: Point::new(W - 4 - 1, 120),
        };
        assert_eq!(nav.move_cursor(axes(RIGHT, REST)), Some(NavEvent::Scrolled));
        let vp = nav.state().viewport;
        assert_eq!(vp.origin, Point::new(W, 0));
        assert_eq!(vp.cursor, Point::new(W / 2, 120));
    }

    #[test]
    fn test_scroll_reclamps_on_narrow_map() {
        // Narrower than two windows
        let mut nav = navigator(400, 2048);
        nav.state_mut().viewport = Viewport {
            origin: Point::new(0, 0),
            cursor: Point::new(W - 5, 120),
        };
        assert_eq!(nav.move_cursor(axes(RIGHT, REST)), Some(NavEvent::Scrolled));
        let vp = nav.state().viewport;
        assert_eq!(vp.origin.x, 400 - W);
        assert_eq!(vp.cursor.x, W / 2);
    }

    #[test]
    fn test_no_scroll_past_map_edge() {
        let mut nav = navigator(2048, 2048);
        nav.state_mut().viewport = Viewport {
            origin: Point::new(0, 0),
            cursor: Point::new(10, 120),
        };
        let ev = nav.move_cursor(axes(LEFT, REST));
        assert_eq!(ev, Some(NavEvent::CursorMoved { from: Point::new(10, 120), to: Point::new(4, 120) }));
        // Pushing against the edge again does not scroll
        assert_eq!(nav.move_cursor(axes(LEFT, REST)), None);
        assert_eq!(nav.state().viewport.origin, Point::new(0, 0));
    }

    #[test]
    fn test_top_boundary_scrolls_up() {
        let mut nav = navigator(2048, 2048);
        nav.state_mut().viewport.cursor.y = 6;
        assert_eq!(nav.move_cursor(axes(REST, UP)), Some(NavEvent::Scrolled));
        let vp = nav.state().viewport;
        assert_eq!(vp.origin.y, 960 - H);
        assert_eq!(vp.cursor.y, H / 2);
    }

    #[test]
    fn test_select_opens_ranked_list() {
        // Focal point starts at (816 + 136, 960 + 120)
        let records = [
            Record::new("far", 1080, 1002, 4),
            Record::new("low", 1080, 962, 2),
            Record::new("mid", 1080, 982, 4),
        ];
        let mut store = store_of(&records);
        let mut nav = navigator(2048, 2048);
        nav.state_mut().min_rating = 3;

        let ev = nav.step(&press(), &mut store, &Identity).unwrap();
        assert_eq!(ev, Some(NavEvent::ListOpened { count: 2 }));
        let s = nav.state();
        assert_eq!(s.mode, Mode::List);
        assert_eq!((s.highlighted, s.page, s.count), (0, 0, 2));
        let order: Vec<usize> = nav.candidates().iter().map(|c| c.index).collect();
        assert_eq!(order, vec![2, 0]);
    }

    #[test]
    fn test_empty_list_is_safe() {
        let records = [Record::new("x", 0, 0, 0)];
        let mut store = store_of(&records);
        let mut nav = navigator(2048, 2048);
        nav.state_mut().min_rating = 4;
        nav.select(&mut store, &Identity).unwrap();
        assert_eq!(nav.state().count, 0);
        assert_eq!(nav.page_range(), 0..0);
        assert_eq!(nav.move_highlight(axes(REST, DOWN)), None);

        let before = nav.state().viewport;
        assert_eq!(nav.select(&mut store, &Identity).unwrap(), NavEvent::ListClosed);
        assert_eq!(nav.state().mode, Mode::Browse);
        assert_eq!(nav.state().viewport, before);
    }

    fn list_of(n: usize) -> (Navigator, RecordStore<MemBlockDevice>) {
        let records: Vec<Record> = (0..n).map(|i| Record::new("p", 0, i as i32, 0)).collect();
        let mut store = store_of(&records);
        let mut nav = navigator(2048, 2048);
        nav.select(&mut store, &Identity).unwrap();
        (nav, store)
    }

    #[test]
    fn test_page_boundaries() {
        let (mut nav, _store) = list_of(70);
        for _ in 0..28 {
            nav.move_highlight(axes(REST, DOWN));
        }
        assert_eq!(
            nav.move_highlight(axes(REST, DOWN)),
            Some(NavEvent::HighlightMoved { from: 28, to: 29 })
        );
        assert_eq!(nav.state().page, 0);
        assert_eq!(nav.page_range(), 0..30);

        assert_eq!(nav.move_highlight(axes(REST, DOWN)), Some(NavEvent::PageTurned { page: 1 }));
        assert_eq!(nav.state().highlighted, 30);
        assert_eq!(nav.page_range(), 30..60);

        assert_eq!(nav.move_highlight(axes(REST, UP)), Some(NavEvent::PageTurned { page: 0 }));
        assert_eq!(nav.state().highlighted, 29);
    }

    #[test]
    fn test_highlight_clamps_at_ends() {
        let (mut nav, _store) = list_of(3);
        assert_eq!(nav.move_highlight(axes(REST, UP)), None);
        nav.move_highlight(axes(REST, DOWN));
        nav.move_highlight(axes(REST, DOWN));
        assert_eq!(nav.move_highlight(axes(REST, DOWN)), None);
        assert_eq!(nav.state().highlighted, 2);
    }

    #[test]
    fn test_last_partial_page() {
        let (mut nav, _store) = list_of(35);
        for _ in 0..40 {
            nav.move_highlight(axes(REST, DOWN));
        }
        assert_eq!(nav.state().highlighted, 34);
        assert_eq!(nav.page_range(), 30..35);
    }

    #[test]
    fn test_pick_recentres_and_returns_to_browse() {
        let records = [Record::new("target", 1500, 1000, 0)];
        let mut store = store_of(&records);
        let mut nav = navigator(2048, 2048);
        nav.select(&mut store, &Identity).unwrap();

        let ev = nav.step(&press(), &mut store, &Identity).unwrap();
        assert_eq!(ev, Some(NavEvent::Recentered { index: 0 }));
        let s = nav.state();
        assert_eq!(s.mode, Mode::Browse);
        assert_eq!(s.viewport.origin, Point::new(1000 - W / 2, 1500 - H / 2));
        assert_eq!(s.viewport.focal_point(), Point::new(1000, 1500));
    }

    #[test]
    fn test_pick_near_map_corner_clamps() {
        let records = [Record::new("corner", 1, 2046, 0)];
        let mut store = store_of(&records);
        let mut nav = navigator(2048, 2048);
        nav.select(&mut store, &Identity).unwrap();
        nav.select(&mut store, &Identity).unwrap();

        let vp = nav.state().viewport;
        assert_eq!(vp.origin, Point::new(2048 - W, 0));
        assert_eq!(vp.cursor, Point::new(W - 5, 4));
    }

    #[test]
    fn test_storage_fault_keeps_browse() {
        let records: Vec<Record> = (0..10).map(|i| Record::new("p", i, i, 0)).collect();
        let mut store = store_of(&records);
        store.device_mut().fail_next(1);
        let mut nav = navigator(2048, 2048);
        let before = nav.state().clone();

        let err = nav.step(&press(), &mut store, &Identity);
        assert!(matches!(err, Err(StoreError::BlockRead { .. })));
        assert_eq!(nav.state(), &before);

        // Device recovered: the next press works
        assert!(nav.step(&press(), &mut store, &Identity).is_ok());
        assert_eq!(nav.state().mode, Mode::List);
    }

    #[test]
    fn test_held_button_does_not_reselect() {
        let records = [Record::new("p", 0, 0, 0)];
        let mut store = store_of(&records);
        let mut nav = navigator(2048, 2048);
        nav.step(&press(), &mut store, &Identity).unwrap();
        // Still held: no edge, stays in the list
        let held = InputFrame { select: None, ..press() };
        nav.step(&held, &mut store, &Identity).unwrap();
        let released = InputFrame { select: Some(ButtonEdge::Released), ..press() };
        nav.step(&released, &mut store, &Identity).unwrap();
        assert_eq!(nav.state().mode, Mode::List);
    }

    proptest! {
        #[test]
        fn prop_viewport_invariants(
            moves in proptest::collection::vec((0i32..1024, 0i32..1024), 1..300),
            map_w in 272i32..1200,
            map_h in 240i32..1200,
        ) {
            let mut nav = navigator(map_w, map_h);
            for (h, v) in moves {
                nav.move_cursor(axes(h, v));
                let vp = nav.state().viewport;
                prop_assert!(vp.origin.x >= 0 && vp.origin.x <= map_w - W);
                prop_assert!(vp.origin.y >= 0 && vp.origin.y <= map_h - H);
                prop_assert!(vp.cursor.x >= 4 && vp.cursor.x <= W - 4 - 1);
                prop_assert!(vp.cursor.y >= 4 && vp.cursor.y <= H - 4 - 1);
            }
        }
    }
}
