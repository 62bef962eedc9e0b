use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::geometry::Extent;
use crate::projection::LinearProjection;

/// Errors raised while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not determine home directory")]
    NoHomeDir,

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

impl ConfigError {
    pub fn user_message(&self) -> String {
        match self {
            ConfigError::NoHomeDir => "No home directory to keep settings in".to_string(),
            ConfigError::Invalid(msg) => format!("Configuration rejected: {}", msg),
            ConfigError::Io(e) => format!("File system error: {}", e),
            ConfigError::Parse(e) => format!("Config file is malformed: {}", e),
            ConfigError::Serialize(e) => format!("Could not write config: {}", e),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub joystick: JoystickConfig,
    #[serde(default)]
    pub touch: TouchConfig,
    #[serde(default)]
    pub map: LinearProjection,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub list: ListConfig,
}

/// Screen layout: map window on the left, rating panel on the right.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_screen_width")]
    pub screen_width: i32,
    #[serde(default = "default_screen_height")]
    pub screen_height: i32,
    #[serde(default = "default_rating_panel_width")]
    pub rating_panel_width: i32,
    /// Odd sizes keep the cursor centred on its pixel.
    #[serde(default = "default_cursor_size")]
    pub cursor_size: i32,
    #[serde(default = "default_button_radius")]
    pub button_radius: i32,
    #[serde(default = "default_button_gap")]
    pub button_gap: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoystickConfig {
    #[serde(default = "default_joy_centre")]
    pub centre: i32,
    #[serde(default = "default_joy_dead_zone")]
    pub dead_zone: i32,
    #[serde(default = "default_joy_steps_per_pixel")]
    pub steps_per_pixel: i32,
    /// The stick's horizontal axis reads high when pushed left.
    #[serde(default = "default_invert_horizontal")]
    pub invert_horizontal: bool,
}

/// Raw digitizer range and pressure window of the touch panel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TouchConfig {
    #[serde(default = "default_touch_min_x")]
    pub raw_min_x: i32,
    #[serde(default = "default_touch_max_x")]
    pub raw_max_x: i32,
    #[serde(default = "default_touch_min_y")]
    pub raw_min_y: i32,
    #[serde(default = "default_touch_max_y")]
    pub raw_max_y: i32,
    #[serde(default = "default_min_pressure")]
    pub min_pressure: i32,
    #[serde(default = "default_max_pressure")]
    pub max_pressure: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Packed catalog image opened by `run` when no path is given.
    #[serde(default = "default_catalog_path")]
    pub catalog: PathBuf,
    #[serde(default = "default_read_attempts")]
    pub read_attempts: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            screen_width: default_screen_width(),
            screen_height: default_screen_height(),
            rating_panel_width: default_rating_panel_width(),
            cursor_size: default_cursor_size(),
            button_radius: default_button_radius(),
            button_gap: default_button_gap(),
        }
    }
}

impl Default for JoystickConfig {
    fn default() -> Self {
        Self {
            centre: default_joy_centre(),
            dead_zone: default_joy_dead_zone(),
            steps_per_pixel: default_joy_steps_per_pixel(),
            invert_horizontal: default_invert_horizontal(),
        }
    }
}

impl Default for TouchConfig {
    fn default() -> Self {
        Self {
            raw_min_x: default_touch_min_x(),
            raw_max_x: default_touch_max_x(),
            raw_min_y: default_touch_min_y(),
            raw_max_y: default_touch_max_y(),
            min_pressure: default_min_pressure(),
            max_pressure: default_max_pressure(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            catalog: default_catalog_path(),
            read_attempts: default_read_attempts(),
        }
    }
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

fn default_screen_width() -> i32 {
    320
}

fn default_screen_height() -> i32 {
    240
}

fn default_rating_panel_width() -> i32 {
    48
}

fn default_cursor_size() -> i32 {
    9
}

fn default_button_radius() -> i32 {
    20
}

fn default_button_gap() -> i32 {
    8
}

fn default_joy_centre() -> i32 {
    512
}

fn default_joy_dead_zone() -> i32 {
    64
}

fn default_joy_steps_per_pixel() -> i32 {
    64
}

fn default_invert_horizontal() -> bool {
    true
}

fn default_touch_min_x() -> i32 {
    150
}

fn default_touch_max_x() -> i32 {
    920
}

fn default_touch_min_y() -> i32 {
    120
}

fn default_touch_max_y() -> i32 {
    940
}

fn default_min_pressure() -> i32 {
    10
}

fn default_max_pressure() -> i32 {
    1000
}

fn default_read_attempts() -> u32 {
    3
}

fn default_page_size() -> usize {
    30
}

fn default_catalog_path() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().join("catalog.img"))
        .unwrap_or_else(|| PathBuf::from("catalog.img"))
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("org", "poi-browser", "poi-browser")
}

/// Directory for the log file and default catalog image.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    project_dirs()
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or(ConfigError::NoHomeDir)
}

impl DisplayConfig {
    /// Size of the map window left of the rating panel.
    pub fn window(&self) -> Extent {
        Extent::new(self.screen_width - self.rating_panel_width, self.screen_height)
    }
}

impl Config {
    /// Load from the default location, writing defaults out on first run.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path()?;
        if !path.exists() {
            let config = Self::default();
            config.save(&path)?;
            return Ok(config);
        }
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf, ConfigError> {
        project_dirs()
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .ok_or(ConfigError::NoHomeDir)
    }

    pub fn map_extent(&self) -> Extent {
        Extent::new(self.map.map_width, self.map.map_height)
    }

    /// Reject geometry the navigator cannot honour.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let window = self.display.window();
        let map = self.map_extent();
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if window.width <= 0 || window.height <= 0 {
            return invalid("map window has no area");
        }
        if window.width > map.width || window.height > map.height {
            return invalid("map window is larger than the map");
        }
        if self.display.cursor_size <= 0
            || self.display.cursor_size > window.width
            || self.display.cursor_size > window.height
        {
            return invalid("cursor does not fit the map window");
        }
        if self.joystick.steps_per_pixel <= 0 {
            return invalid("joystick steps_per_pixel must be positive");
        }
        if self.joystick.dead_zone < 0 {
            return invalid("joystick dead_zone must not be negative");
        }
        if self.touch.raw_min_x >= self.touch.raw_max_x
            || self.touch.raw_min_y >= self.touch.raw_max_y
        {
            return invalid("touch calibration ranges are empty or inverted");
        }
        if self.touch.min_pressure > self.touch.max_pressure {
            return invalid("touch pressure window is inverted");
        }
        if self.map.lat_north == self.map.lat_south || self.map.lon_west == self.map.lon_east {
            return invalid("map geographic bounds are degenerate");
        }
        if self.list.page_size == 0 {
            return invalid("list page_size must be positive");
        }
        if self.storage.read_attempts == 0 {
            return invalid("storage read_attempts must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.display.window(), Extent::new(272, 240));
        assert_eq!(config.map_extent(), Extent::new(2048, 2048));
        assert_eq!(config.list.page_size, 30);
        assert_eq!(config.storage.read_attempts, 3);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = toml::from_str(
            "[list]\npage_size = 12\n\n[joystick]\ndead_zone = 100\n",
        )
        .unwrap();
        assert_eq!(config.list.page_size, 12);
        assert_eq!(config.joystick.dead_zone, 100);
        assert_eq!(config.joystick.centre, 512);
        assert_eq!(config.touch.max_pressure, 1000);
        assert_eq!(config.map.map_width, 2048);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.storage.read_attempts = 7;
        config.save(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.storage.read_attempts, 7);
    }

    #[test]
    fn test_validate_rejects_bad_geometry() {
        let mut config = Config::default();
        config.map.map_width = 100;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = Config::default();
        config.list.page_size = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.touch.raw_min_x = 2000;
        let err = config.validate().unwrap_err();
        assert!(err.user_message().contains("touch calibration"));
    }
}
