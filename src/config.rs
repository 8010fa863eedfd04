//! User configuration and viewer preferences.
//!
//! Both live in the OS config directory:
//! - `config.json`: drag threshold, default sprint length, grid metrics and
//!   the board file to open at start-up.
//! - `view.json`: sprint widths, lane heights and lane header width the
//!   viewer dragged to. Losing it only resets the layout.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ConfigError;
use crate::geometry::{GridMetrics, SizeOverrides};
use crate::interaction::DEFAULT_DRAG_THRESHOLD;

const APP_NAME: &str = "RoadmapGrid";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Pointer travel, in points, before a press becomes a drag.
    pub drag_threshold: f32,
    pub default_sprint_days: i64,
    pub metrics: GridMetrics,
    /// Board opened at start-up; the sample board is shown when unset.
    pub board_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            drag_threshold: DEFAULT_DRAG_THRESHOLD,
            default_sprint_days: 14,
            metrics: GridMetrics::default(),
            board_path: None,
        }
    }
}

impl Config {
    /// Read a config file. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(json) => Ok(serde_json::from_str(&json)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Like [`Config::load_from`], falling back to defaults on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load_from(path).unwrap_or_else(|err| {
            warn!(%err, path = %path.display(), "using default configuration");
            Self::default()
        })
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        write_json(path, &serde_json::to_string_pretty(self)?)
    }
}

/// Where configuration, preferences and logs are kept.
#[derive(Debug, Clone)]
pub struct Paths {
    pub config_file: PathBuf,
    pub view_file: PathBuf,
    pub log_dir: PathBuf,
}

impl Paths {
    pub fn discover() -> Result<Self, ConfigError> {
        let dirs = directories::ProjectDirs::from("", "", APP_NAME).ok_or(ConfigError::NoConfigDir)?;
        Ok(Self::in_dirs(dirs.config_dir(), dirs.data_dir()))
    }

    pub fn in_dirs(config_dir: &Path, data_dir: &Path) -> Self {
        Self {
            config_file: config_dir.join("config.json"),
            view_file: config_dir.join("view.json"),
            log_dir: data_dir.join("logs"),
        }
    }

    /// Fallback when the OS offers no config directory.
    pub fn local() -> Self {
        let dir = PathBuf::from(".");
        Self::in_dirs(&dir, &dir)
    }
}

pub fn load_overrides(path: &Path) -> SizeOverrides {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default()
}

pub fn save_overrides(path: &Path, overrides: &SizeOverrides) -> Result<(), ConfigError> {
    write_json(path, &serde_json::to_string_pretty(overrides)?)
}

fn write_json(path: &Path, json: &str) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, json).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn partial_config_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "drag_threshold": 8.0, "metrics": { "sprint_width": 240.0 } }"#)
            .unwrap();
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg.drag_threshold, 8.0);
        assert_eq!(cfg.metrics.sprint_width, 240.0);
        assert_eq!(cfg.metrics.lane_height, GridMetrics::default().lane_height);
        assert_eq!(cfg.default_sprint_days, 14);
    }

    #[test]
    fn malformed_config_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ nope").unwrap();
        assert!(Config::load_from(&path).is_err());
        assert_eq!(Config::load_or_default(&path), Config::default());
    }

    #[test]
    fn overrides_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::in_dirs(dir.path(), dir.path());
        let mut overrides = SizeOverrides::default();
        overrides.lane_header_width = Some(210.0);
        overrides.sprint_widths.insert(uuid::Uuid::new_v4(), 120.0);
        save_overrides(&paths.view_file, &overrides).unwrap();
        assert_eq!(load_overrides(&paths.view_file), overrides);
    }
}
