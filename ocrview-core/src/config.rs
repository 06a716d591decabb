use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};

use crate::error::ViewerError;
use crate::layout::DEFAULT_PAGE_GAP;
use crate::toolbar::ToolbarBreakpoints;
use crate::viewport::{ZoomLimits, DEFAULT_FIT_MARGIN};

#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "scroll_debounce_ms")]
    pub scroll_debounce: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "suppression_window_ms")]
    pub suppression_window: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "smooth_scroll_ms")]
    pub smooth_scroll: Duration,
    pub page_gap: f32,
    pub fit_margin: f32,
    pub zoom_step_fraction: f32,
    pub min_zoom_fraction: f32,
    pub max_zoom_fraction: f32,
    /// Distance moved by one keyboard or wheel scroll step.
    pub scroll_step: f32,
    pub toolbar: ToolbarBreakpoints,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        let zoom = ZoomLimits::default();
        Self {
            scroll_debounce: Duration::from_millis(100),
            suppression_window: Duration::from_millis(500),
            smooth_scroll: Duration::from_millis(400),
            page_gap: DEFAULT_PAGE_GAP,
            fit_margin: DEFAULT_FIT_MARGIN,
            zoom_step_fraction: zoom.step_fraction,
            min_zoom_fraction: zoom.min_fraction,
            max_zoom_fraction: zoom.max_fraction,
            scroll_step: 48.0,
            toolbar: ToolbarBreakpoints::default(),
        }
    }
}

impl ViewerConfig {
    /// Reads `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, ViewerError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => return Err(err.into()),
        };
        toml::from_str(&raw).map_err(|source| ViewerError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn zoom_limits(&self) -> ZoomLimits {
        ZoomLimits {
            step_fraction: self.zoom_step_fraction,
            min_fraction: self.min_zoom_fraction,
            max_fraction: self.max_zoom_fraction,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = ViewerConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, ViewerConfig::default());
    }

    #[test]
    fn partial_file_overrides_selected_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "suppression_window_ms = 750\npage_gap = 8.0\n\n[toolbar]\nstack_layout = 200.0\n",
        )
        .unwrap();

        let config = ViewerConfig::load(&path).unwrap();
        assert_eq!(config.suppression_window, Duration::from_millis(750));
        assert_eq!(config.page_gap, 8.0);
        assert_eq!(config.toolbar.stack_layout, 200.0);
        assert_eq!(config.toolbar.hide_navigation, 300.0);
        assert_eq!(config.scroll_debounce, Duration::from_millis(100));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "page_gap = \"wide\"").unwrap();
        assert!(matches!(
            ViewerConfig::load(&path),
            Err(ViewerError::Config { .. })
        ));
    }
}
