use serde::{Deserialize, Serialize};

/// Width thresholds (in pixels) for collapsing toolbar sections.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolbarBreakpoints {
    pub hide_reset_zoom: f32,
    pub hide_navigation: f32,
    pub stack_layout: f32,
}

impl Default for ToolbarBreakpoints {
    fn default() -> Self {
        Self {
            hide_reset_zoom: 400.0,
            hide_navigation: 300.0,
            stack_layout: 250.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolbarMode {
    Full,
    NavigationHidden,
    Stacked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolbarLayout {
    pub mode: ToolbarMode,
    pub show_navigation: bool,
    pub show_reset_zoom: bool,
}

impl ToolbarLayout {
    pub fn classify(width: f32, breakpoints: &ToolbarBreakpoints) -> Self {
        let show_navigation = width > breakpoints.hide_navigation;
        let stacked = width <= breakpoints.stack_layout;
        let mode = if stacked {
            ToolbarMode::Stacked
        } else if show_navigation {
            ToolbarMode::Full
        } else {
            ToolbarMode::NavigationHidden
        };
        Self {
            mode,
            show_navigation,
            show_reset_zoom: width > breakpoints.hide_reset_zoom,
        }
    }
}

impl Default for ToolbarLayout {
    fn default() -> Self {
        Self {
            mode: ToolbarMode::Full,
            show_navigation: true,
            show_reset_zoom: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breakpoints_select_layout() {
        let bp = ToolbarBreakpoints::default();

        let wide = ToolbarLayout::classify(800.0, &bp);
        assert_eq!(wide.mode, ToolbarMode::Full);
        assert!(wide.show_reset_zoom);

        let medium = ToolbarLayout::classify(350.0, &bp);
        assert_eq!(medium.mode, ToolbarMode::Full);
        assert!(!medium.show_reset_zoom);

        let narrow = ToolbarLayout::classify(280.0, &bp);
        assert_eq!(narrow.mode, ToolbarMode::NavigationHidden);
        assert!(!narrow.show_navigation);

        let tiny = ToolbarLayout::classify(250.0, &bp);
        assert_eq!(tiny.mode, ToolbarMode::Stacked);
    }
}
