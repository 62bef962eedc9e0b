use serde::{Deserialize, Serialize};

use crate::geometry::Point;

/// Maps geographic fixed-point coordinates into map pixel space.
pub trait Projection {
    fn x_from_longitude(&self, lon: i32) -> i32;
    fn y_from_latitude(&self, lat: i32) -> i32;

    fn project(&self, lat: i32, lon: i32) -> Point {
        Point::new(self.x_from_longitude(lon), self.y_from_latitude(lat))
    }
}

/// Linear interpolation between the map's geographic bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearProjection {
    pub lat_north: i32,
    pub lat_south: i32,
    pub lon_west: i32,
    pub lon_east: i32,
    pub map_width: i32,
    pub map_height: i32,
}

impl Default for LinearProjection {
    fn default() -> Self {
        Self {
            lat_north: 5_361_858,
            lat_south: 5_340_953,
            lon_west: -11_368_652,
            lon_east: -11_333_496,
            map_width: 2048,
            map_height: 2048,
        }
    }
}

impl Projection for LinearProjection {
    fn x_from_longitude(&self, lon: i32) -> i32 {
        linear_map(lon, self.lon_west, self.lon_east, 0, self.map_width)
    }

    fn y_from_latitude(&self, lat: i32) -> i32 {
        linear_map(lat, self.lat_north, self.lat_south, 0, self.map_height)
    }
}

/// Re-map `value` from `[in_lo, in_hi]` onto `[out_lo, out_hi]` with
/// truncating integer division. Either range may be descending.
pub fn linear_map(value: i32, in_lo: i32, in_hi: i32, out_lo: i32, out_hi: i32) -> i32 {
    let span = i64::from(in_hi) - i64::from(in_lo);
    if span == 0 {
        return out_lo;
    }
    let scaled = (i64::from(value) - i64::from(in_lo)) * (i64::from(out_hi) - i64::from(out_lo))
        / span
        + i64::from(out_lo);
    scaled.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}
