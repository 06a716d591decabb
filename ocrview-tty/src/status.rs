//! Text for the toolbar and status rows.

use ocrview_core::{Field, ToolbarLayout, ToolbarMode};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolbarState {
    pub layout: ToolbarLayout,
    pub current_page: usize,
    pub page_count: usize,
    pub zoom_percent: u32,
    pub can_go_prev: bool,
    pub can_go_next: bool,
}

const GROUP_SEPARATOR: &str = "   ";

/// Toolbar rows for the current layout: one row normally, one row per
/// control group when stacked.
pub fn toolbar_lines(state: &ToolbarState) -> Vec<String> {
    let mut groups = Vec::with_capacity(3);
    if state.layout.show_navigation {
        let prev = if state.can_go_prev { '‹' } else { ' ' };
        let next = if state.can_go_next { '›' } else { ' ' };
        groups.push(format!(
            "{prev} {} of {} {next}",
            state.current_page, state.page_count
        ));
    }
    if state.layout.show_reset_zoom {
        groups.push(format!("− {}% +", state.zoom_percent));
    } else {
        groups.push("− +".to_owned());
    }
    groups.push("⤓".to_owned());

    match state.layout.mode {
        ToolbarMode::Stacked => groups,
        ToolbarMode::Full | ToolbarMode::NavigationHidden => vec![groups.join(GROUP_SEPARATOR)],
    }
}

pub fn field_line(field: &Field) -> String {
    let value = if field.value.is_empty() {
        "(blank)"
    } else {
        field.value.as_str()
    };
    format!(
        "{}: {} ({})",
        field.key,
        value,
        field.confidence_band().describe(field.confidence)
    )
}

/// `[#####----]  50%` filling `width` columns.
pub fn progress_bar(progress: f32, width: usize) -> String {
    let progress = if progress.is_finite() {
        progress.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let label = format!(" {:>3}%", (progress * 100.0).round() as u32);
    let inner = width.saturating_sub(label.len() + 2).max(1);
    let filled = ((progress * inner as f32).round() as usize).min(inner);
    format!(
        "[{}{}]{}",
        "#".repeat(filled),
        "-".repeat(inner - filled),
        label
    )
}

pub fn combine_status(base: Option<String>, pending_input: Option<&str>) -> Option<String> {
    match (base, pending_input.filter(|s| !s.is_empty())) {
        (Some(mut base), Some(pending)) => {
            base.push_str(" | ");
            base.push_str(pending);
            Some(base)
        }
        (Some(base), None) => Some(base),
        (None, Some(pending)) => Some(pending.to_string()),
        (None, None) => None,
    }
}

/// Fits `text` to exactly `width` columns.
pub fn truncate_with_ellipsis(text: &str, width: usize) -> String {
    let len = text.chars().count();
    let mut out: String = if len > width {
        if width <= 3 {
            text.chars().take(width).collect()
        } else {
            let mut truncated: String = text.chars().take(width - 3).collect();
            truncated.push_str("...");
            truncated
        }
    } else {
        text.to_owned()
    };
    let out_len = out.chars().count();
    if out_len < width {
        out.push_str(&" ".repeat(width - out_len));
    }
    out
}
