//! Extracted key/value fields and the editor shared by the validation and
//! edit screens.
//!
//! The viewer never sees a [`Field`]; it only receives a [`FieldFocus`] for
//! the hovered field and calls the editor back through [`OverlayRenderer`] to
//! obtain highlight regions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::controller::OverlayRenderer;
use crate::error::ViewerError;
use crate::geometry::{NormalizedBox, PageDims, PixelRect};
use crate::regions::to_pixel_rect;

/// Confidence assigned to a field once a user has touched it.
pub const MANUAL_CONFIDENCE: f32 = 101.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "Value", default)]
    pub value: String,
    #[serde(rename = "Confidence", default)]
    pub confidence: f32,
    #[serde(rename = "BBox", default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<NormalizedBox>,
    #[serde(rename = "PageNumber", default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<usize>,
}

impl Field {
    pub fn manual(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            confidence: MANUAL_CONFIDENCE,
            bounding_box: None,
            page_number: None,
        }
    }

    pub fn confidence_band(&self) -> ConfidenceBand {
        ConfidenceBand::classify(self.confidence)
    }

    /// The viewer signal for this field; `None` without a box. A box without a
    /// page number is taken to be on page 1.
    pub fn focus(&self) -> Option<FieldFocus> {
        self.bounding_box.map(|bounding_box| FieldFocus {
            page_number: self.page_number.unwrap_or(1),
            bounding_box,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceBand {
    Low,
    BelowAverage,
    Average,
    High,
    Manual,
}

impl ConfidenceBand {
    pub fn classify(confidence: f32) -> Self {
        if confidence < 70.0 {
            ConfidenceBand::Low
        } else if confidence < 80.0 {
            ConfidenceBand::BelowAverage
        } else if confidence < 90.0 {
            ConfidenceBand::Average
        } else if confidence <= 100.0 {
            ConfidenceBand::High
        } else {
            ConfidenceBand::Manual
        }
    }

    pub fn describe(&self, confidence: f32) -> String {
        match self {
            ConfidenceBand::Manual => "Manually modified field".to_string(),
            _ => format!("Confidence: {confidence:.2}%"),
        }
    }
}

/// The hovered-field signal consumed by the viewer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldFocus {
    pub page_number: usize,
    pub bounding_box: NormalizedBox,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldPolicy {
    /// Blank out values at or below `blank_threshold` when the list is first
    /// loaded. Later edits are never second-guessed.
    pub blank_low_confidence_on_load: bool,
    pub blank_threshold: f32,
}

impl FieldPolicy {
    /// Fresh OCR output under review.
    pub fn validation() -> Self {
        Self {
            blank_low_confidence_on_load: true,
            blank_threshold: 10.0,
        }
    }

    /// Previously saved fields.
    pub fn edit() -> Self {
        Self {
            blank_low_confidence_on_load: false,
            blank_threshold: 10.0,
        }
    }
}

/// One highlight box drawn over a page, in page-local pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HighlightRegion {
    pub field_index: usize,
    pub rect: PixelRect,
    pub hovered: bool,
}

#[derive(Debug, Clone)]
pub struct FieldListEditor {
    fields: Vec<Field>,
    hovered: Option<usize>,
}

impl FieldListEditor {
    pub fn new(mut fields: Vec<Field>, policy: FieldPolicy) -> Self {
        if policy.blank_low_confidence_on_load {
            for field in &mut fields {
                if field.confidence <= policy.blank_threshold {
                    field.value.clear();
                }
            }
        }
        Self {
            fields,
            hovered: None,
        }
    }

    pub fn from_json(raw: &str, policy: FieldPolicy) -> Result<Self, ViewerError> {
        let fields: Vec<Field> = serde_json::from_str(raw)?;
        Ok(Self::new(fields, policy))
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn set_value(&mut self, index: usize, value: impl Into<String>) -> bool {
        let Some(field) = self.fields.get_mut(index) else {
            return false;
        };
        field.value = value.into();
        field.confidence = MANUAL_CONFIDENCE;
        true
    }

    pub fn rename_key(&mut self, index: usize, key: impl Into<String>) -> bool {
        let Some(field) = self.fields.get_mut(index) else {
            return false;
        };
        let key = key.into();
        if field.key != key {
            field.key = key;
            field.confidence = MANUAL_CONFIDENCE;
        }
        true
    }

    pub fn add_field(&mut self) -> usize {
        self.fields.push(Field::manual("New Field", ""));
        self.fields.len() - 1
    }

    pub fn remove(&mut self, index: usize) -> Option<Field> {
        if index >= self.fields.len() {
            return None;
        }
        self.hovered = match self.hovered {
            Some(hovered) if hovered == index => None,
            Some(hovered) if hovered > index => Some(hovered - 1),
            other => other,
        };
        Some(self.fields.remove(index))
    }

    /// Key/value pairs for saving; a repeated key keeps its last value.
    pub fn metadata(&self) -> BTreeMap<String, String> {
        self.fields
            .iter()
            .map(|field| (field.key.clone(), field.value.clone()))
            .collect()
    }

    pub fn to_json(&self) -> Result<String, ViewerError> {
        Ok(serde_json::to_string_pretty(&self.fields)?)
    }

    pub fn hovered(&self) -> Option<usize> {
        self.hovered
    }

    pub fn hovered_field(&self) -> Option<&Field> {
        self.hovered.and_then(|idx| self.fields.get(idx))
    }

    pub fn hover(&mut self, index: Option<usize>) {
        self.hovered = index.filter(|idx| *idx < self.fields.len());
    }

    pub fn focus(&self) -> Option<FieldFocus> {
        self.hovered_field().and_then(Field::focus)
    }

    pub fn hover_next(&mut self) -> Option<usize> {
        if self.fields.is_empty() {
            return None;
        }
        let next = match self.hovered {
            Some(idx) => (idx + 1) % self.fields.len(),
            None => 0,
        };
        self.hovered = Some(next);
        self.hovered
    }

    pub fn hover_prev(&mut self) -> Option<usize> {
        if self.fields.is_empty() {
            return None;
        }
        let len = self.fields.len();
        let prev = match self.hovered {
            Some(idx) => (idx + len - 1) % len,
            None => len - 1,
        };
        self.hovered = Some(prev);
        self.hovered
    }

    pub fn regions_for_page(&self, page_number: usize, dims: PageDims) -> Vec<HighlightRegion> {
        self.fields
            .iter()
            .enumerate()
            .filter(|(_, field)| field.page_number == Some(page_number))
            .filter_map(|(idx, field)| {
                field.bounding_box.map(|bbox| HighlightRegion {
                    field_index: idx,
                    rect: to_pixel_rect(&bbox, dims),
                    hovered: self.hovered == Some(idx),
                })
            })
            .collect()
    }
}

impl OverlayRenderer for FieldListEditor {
    type Output = Vec<HighlightRegion>;

    fn render_overlay(&self, page_number: usize, dims: PageDims) -> Self::Output {
        self.regions_for_page(page_number, dims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Size;

    const SAMPLE: &str = r#"[
        {"Key": "Name", "Value": "Ada", "Confidence": 97.5,
         "BBox": {"Left": 0.1, "Top": 0.1, "Width": 0.2, "Height": 0.05}, "PageNumber": 1},
        {"Key": "Date", "Value": "l0/0l", "Confidence": 4.2,
         "BBox": {"Left": 0.5, "Top": 0.5, "Width": 0.1, "Height": 0.05}, "PageNumber": 2},
        {"Key": "Notes", "Value": "", "Confidence": 55.0}
    ]"#;

    #[test]
    fn validation_policy_blanks_low_confidence_once() {
        let editor = FieldListEditor::from_json(SAMPLE, FieldPolicy::validation()).unwrap();
        assert_eq!(editor.fields()[0].value, "Ada");
        assert_eq!(editor.fields()[1].value, "");

        let kept = FieldListEditor::from_json(SAMPLE, FieldPolicy::edit()).unwrap();
        assert_eq!(kept.fields()[1].value, "l0/0l");
    }

    #[test]
    fn edits_mark_fields_manual() {
        let mut editor = FieldListEditor::from_json(SAMPLE, FieldPolicy::edit()).unwrap();
        editor.rename_key(0, "Name");
        assert_eq!(editor.fields()[0].confidence, 97.5);
        editor.rename_key(0, "Full name");
        assert_eq!(editor.fields()[0].confidence_band(), ConfidenceBand::Manual);

        editor.set_value(2, "see attached");
        assert_eq!(editor.fields()[2].confidence, MANUAL_CONFIDENCE);
        assert!(!editor.set_value(10, "nope"));
    }

    #[test]
    fn add_and_remove_keep_hover_consistent() {
        let mut editor = FieldListEditor::from_json(SAMPLE, FieldPolicy::edit()).unwrap();
        let added = editor.add_field();
        assert_eq!(editor.fields()[added].key, "New Field");
        assert_eq!(editor.fields()[added].confidence, MANUAL_CONFIDENCE);

        editor.hover(Some(2));
        editor.remove(0);
        assert_eq!(editor.hovered(), Some(1));
        editor.remove(1);
        assert_eq!(editor.hovered(), None);
        assert!(editor.remove(99).is_none());
    }

    #[test]
    fn metadata_keeps_last_duplicate() {
        let mut editor = FieldListEditor::new(
            vec![Field::manual("Total", "10"), Field::manual("Total", "12")],
            FieldPolicy::edit(),
        );
        editor.add_field();
        let metadata = editor.metadata();
        assert_eq!(metadata.get("Total").map(String::as_str), Some("12"));
        assert_eq!(metadata.len(), 2);
    }

    #[test]
    fn confidence_bands_follow_thresholds() {
        assert_eq!(ConfidenceBand::classify(69.99), ConfidenceBand::Low);
        assert_eq!(ConfidenceBand::classify(70.0), ConfidenceBand::BelowAverage);
        assert_eq!(ConfidenceBand::classify(85.0), ConfidenceBand::Average);
        assert_eq!(ConfidenceBand::classify(100.0), ConfidenceBand::High);
        assert_eq!(ConfidenceBand::classify(101.0), ConfidenceBand::Manual);
        assert_eq!(ConfidenceBand::High.describe(97.5), "Confidence: 97.50%");
    }

    #[test]
    fn hover_cycles_and_exposes_focus() {
        let mut editor = FieldListEditor::from_json(SAMPLE, FieldPolicy::edit()).unwrap();
        assert_eq!(editor.hover_next(), Some(0));
        assert_eq!(editor.focus().unwrap().page_number, 1);
        assert_eq!(editor.hover_prev(), Some(2));
        assert!(editor.focus().is_none());
        assert_eq!(editor.hover_next(), Some(0));
    }

    #[test]
    fn overlay_only_includes_fields_on_page() {
        let mut editor = FieldListEditor::from_json(SAMPLE, FieldPolicy::edit()).unwrap();
        editor.hover(Some(1));
        let regions = editor.render_overlay(2, Size::new(800.0, 1000.0));
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].field_index, 1);
        assert!(regions[0].hovered);
        assert_eq!(regions[0].rect, PixelRect::new(400.0, 500.0, 80.0, 50.0));
    }
}
