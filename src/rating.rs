use tracing::debug;

use crate::config::{DisplayConfig, TouchConfig};
use crate::geometry::Point;
use crate::projection::linear_map;
use crate::store::MAX_RATING;

/// Number of rating buttons stacked in the side panel.
pub const BUTTON_COUNT: usize = MAX_RATING as usize + 1;

/// A raw touch-panel sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerEvent {
    pub x: i32,
    pub y: i32,
    pub pressure: i32,
}

/// Maps touch events onto the five rating buttons.
///
/// Button 0 is at the top and selects the strictest threshold; button `i`
/// selects a minimum rating of `MAX_RATING - i`.
#[derive(Debug, Clone)]
pub struct RatingSelector {
    touch: TouchConfig,
    display: DisplayConfig,
}

impl RatingSelector {
    pub fn new(touch: TouchConfig, display: DisplayConfig) -> Self {
        Self { touch, display }
    }

    pub fn threshold_for_button(button: usize) -> u8 {
        MAX_RATING - button.min(BUTTON_COUNT - 1) as u8
    }

    pub fn button_for_threshold(threshold: u8) -> usize {
        usize::from(MAX_RATING - threshold.min(MAX_RATING))
    }

    /// Centre of button `i` in screen coordinates.
    pub fn button_centre(&self, button: usize) -> Point {
        let d = &self.display;
        Point::new(
            d.screen_width - d.rating_panel_width / 2,
            d.button_radius + (d.button_gap + d.button_radius * 2) * button as i32,
        )
    }

    /// Screen position of a raw event, or `None` when the pressure reading
    /// says nothing is touching the panel.
    pub fn to_screen(&self, event: &PointerEvent) -> Option<Point> {
        let t = &self.touch;
        if event.pressure < t.min_pressure || event.pressure > t.max_pressure {
            return None;
        }
        // The digitizer is mounted rotated: raw x runs down the screen and
        // raw y runs right-to-left.
        let d = &self.display;
        let y = linear_map(event.x, t.raw_min_x, t.raw_max_x, 0, d.screen_height - 1);
        let x = linear_map(event.y, t.raw_min_y, t.raw_max_y, d.screen_width - 1, 0);
        Some(Point::new(x, y))
    }

    /// Raw event that lands on screen point `at`. Inverse of `to_screen`
    /// up to rounding.
    pub fn from_screen(&self, at: Point, pressure: i32) -> PointerEvent {
        let t = &self.touch;
        let d = &self.display;
        PointerEvent {
            x: linear_map(at.y, 0, d.screen_height - 1, t.raw_min_x, t.raw_max_x),
            y: linear_map(at.x, d.screen_width - 1, 0, t.raw_min_y, t.raw_max_y),
            pressure,
        }
    }

    /// Button under screen point `at`, if any.
    pub fn hit_test(&self, at: Point) -> Option<usize> {
        let d = &self.display;
        if at.x < d.screen_width - d.rating_panel_width {
            return None;
        }
        let half = d.screen_height / 2;
        let r2 = d.button_radius * d.button_radius;
        (0..BUTTON_COUNT).find(|&i| {
            // The outer buttons only answer on their own half of the screen
            let in_half = match i {
                0 => at.y < half,
                i if i == BUTTON_COUNT - 1 => at.y > half,
                _ => true,
            };
            let c = self.button_centre(i);
            let (dx, dy) = (c.x - at.x, c.y - at.y);
            in_half && dx * dx + dy * dy <= r2
        })
    }

    /// Apply a touch to `threshold`. Returns whether it changed.
    pub fn update_threshold(&self, threshold: &mut u8, event: &PointerEvent) -> bool {
        let Some(at) = self.to_screen(event) else {
            return false;
        };
        let Some(button) = self.hit_test(at) else {
            return false;
        };
        let selected = Self::threshold_for_button(button);
        if selected == *threshold {
            return false;
        }
        debug!(button, from = *threshold, to = selected, "rating threshold changed");
        *threshold = selected;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selector() -> RatingSelector {
        RatingSelector::new(TouchConfig::default(), DisplayConfig::default())
    }

    #[test]
    fn test_button_layout() {
        let s = selector();
        assert_eq!(s.button_centre(0), Point::new(296, 20));
        assert_eq!(s.button_centre(4), Point::new(296, 212));
    }

    #[test]
    fn test_threshold_button_mapping() {
        assert_eq!(RatingSelector::threshold_for_button(0), 4);
        assert_eq!(RatingSelector::threshold_for_button(4), 0);
        for t in 0..=MAX_RATING {
            let b = RatingSelector::button_for_threshold(t);
            assert_eq!(RatingSelector::threshold_for_button(b), t);
        }
    }

    #[test]
    fn test_pressure_window() {
        let s = selector();
        let at = s.button_centre(1);
        let mut event = s.from_screen(at, 5);
        assert_eq!(s.to_screen(&event), None);
        event.pressure = 1001;
        assert_eq!(s.to_screen(&event), None);
        event.pressure = 10;
        assert!(s.to_screen(&event).is_some());
    }

    #[test]
    fn test_calibration_corners() {
        let s = selector();
        let top_left = PointerEvent { x: 150, y: 940, pressure: 500 };
        assert_eq!(s.to_screen(&top_left), Some(Point::new(0, 0)));
        let bottom_right = PointerEvent { x: 920, y: 120, pressure: 500 };
        assert_eq!(s.to_screen(&bottom_right), Some(Point::new(319, 239)));
    }

    #[test]
    fn test_press_each_button() {
        let s = selector();
        let mut threshold = 0;
        for button in 0..BUTTON_COUNT - 1 {
            let event = s.from_screen(s.button_centre(button), 500);
            assert!(s.update_threshold(&mut threshold, &event));
            assert_eq!(threshold, RatingSelector::threshold_for_button(button));
        }
    }

    #[test]
    fn test_same_button_is_not_a_change() {
        let s = selector();
        let mut threshold = 2;
        let event = s.from_screen(s.button_centre(2), 500);
        assert!(!s.update_threshold(&mut threshold, &event));
        assert_eq!(threshold, 2);
    }

    #[test]
    fn test_miss_outside_panel_and_between_buttons() {
        let s = selector();
        assert_eq!(s.hit_test(Point::new(100, 20)), None);
        // Gap between button 0 (ends at y=40) and button 1 (starts at y=48)
        assert_eq!(s.hit_test(Point::new(296, 44)), None);
        assert_eq!(s.hit_test(Point::new(296, 68)), Some(1));
        // Panel edge but outside the circle's radius
        assert_eq!(s.hit_test(Point::new(272, 20)), None);
    }

    #[test]
    fn test_outer_buttons_need_their_half() {
        let mut display = DisplayConfig::default();
        // A short screen puts button 4 above the midline
        display.screen_height = 460;
        let s = RatingSelector::new(TouchConfig::default(), display);
        assert_eq!(s.hit_test(s.button_centre(4)), None);
        assert_eq!(s.hit_test(s.button_centre(0)), Some(0));
    }
}
