use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEvent, MouseEventKind,
};
use ocrview_core::{Command, Point, Size};

mod kitty;
mod status;

pub use kitty::{DrawParams, KittyRenderer};
pub use status::{
    combine_status, field_line, progress_bar, toolbar_lines, truncate_with_ellipsis, ToolbarState,
};

#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    Command(Command),
    HoverNextField,
    HoverPrevField,
    ClearHover,
    Download,
    Resized,
    Quit,
    None,
}

/// Turns terminal input into viewer commands. Digits typed before a command
/// act as a count, vi-style.
#[derive(Debug)]
pub struct EventMapper {
    pending_count: Option<usize>,
    pending_digits: String,
    scroll_step: f32,
    cell: Size,
    /// First terminal row of the page area.
    content_row: u16,
}

impl Default for EventMapper {
    fn default() -> Self {
        Self {
            pending_count: None,
            pending_digits: String::new(),
            scroll_step: Self::DEFAULT_SCROLL_STEP,
            cell: Size::new(1.0, 1.0),
            content_row: 0,
        }
    }
}

impl EventMapper {
    pub const DEFAULT_SCROLL_STEP: f32 = 48.0;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scroll_step(scroll_step: f32) -> Self {
        Self {
            scroll_step,
            ..Self::default()
        }
    }

    /// Pixel size of one cell and where the page area starts, used to turn
    /// mouse positions into zoom anchors.
    pub fn set_geometry(&mut self, cell: Size, content_row: u16) {
        self.cell = cell;
        self.content_row = content_row;
    }

    pub fn map_event(&mut self, event: Event) -> UiEvent {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Release => UiEvent::None,
            Event::Key(key) => self.map_key(key),
            Event::Mouse(mouse) => self.map_mouse(mouse),
            Event::Resize(..) => UiEvent::Resized,
            _ => UiEvent::None,
        }
    }

    fn map_key(&mut self, KeyEvent { code, modifiers, .. }: KeyEvent) -> UiEvent {
        match (code, modifiers) {
            (KeyCode::Char('0'), KeyModifiers::NONE) if self.pending_count.is_none() => {
                UiEvent::Command(Command::ResetZoom)
            }
            (KeyCode::Char(c), KeyModifiers::NONE) if c.is_ascii_digit() => {
                if let Some(digit) = c.to_digit(10) {
                    self.push_digit(digit as usize);
                }
                UiEvent::None
            }
            (KeyCode::Char('j'), KeyModifiers::NONE) | (KeyCode::Down, _) => {
                self.scroll(0.0, self.scroll_step)
            }
            (KeyCode::Char('k'), KeyModifiers::NONE) | (KeyCode::Up, _) => {
                self.scroll(0.0, -self.scroll_step)
            }
            (KeyCode::Char('h'), KeyModifiers::NONE) | (KeyCode::Left, _) => {
                self.scroll(-self.scroll_step, 0.0)
            }
            (KeyCode::Char('l'), KeyModifiers::NONE) | (KeyCode::Right, _) => {
                self.scroll(self.scroll_step, 0.0)
            }
            (KeyCode::Char('n'), KeyModifiers::NONE) | (KeyCode::PageDown, _) => {
                let count = self.take_count();
                UiEvent::Command(Command::NextPage { count })
            }
            (KeyCode::Char('p'), KeyModifiers::NONE) | (KeyCode::PageUp, _) => {
                let count = self.take_count();
                UiEvent::Command(Command::PrevPage { count })
            }
            (KeyCode::Char('g'), KeyModifiers::NONE) | (KeyCode::Home, _) => {
                let page = self.take_count();
                UiEvent::Command(Command::GotoPage { page })
            }
            (KeyCode::Char('G'), modifiers)
                if modifiers.is_empty() || modifiers == KeyModifiers::SHIFT =>
            {
                self.reset_count();
                UiEvent::Command(Command::GotoPage { page: usize::MAX })
            }
            (KeyCode::End, _) => {
                self.reset_count();
                UiEvent::Command(Command::GotoPage { page: usize::MAX })
            }
            (KeyCode::Char('+'), _) | (KeyCode::Char('='), _) => {
                self.reset_count();
                UiEvent::Command(Command::ZoomIn)
            }
            (KeyCode::Char('-'), _) => {
                self.reset_count();
                UiEvent::Command(Command::ZoomOut)
            }
            (KeyCode::Tab, _) => {
                self.reset_count();
                UiEvent::HoverNextField
            }
            (KeyCode::BackTab, _) => {
                self.reset_count();
                UiEvent::HoverPrevField
            }
            (KeyCode::Esc, _) => {
                self.reset_count();
                UiEvent::ClearHover
            }
            (KeyCode::Char('s'), KeyModifiers::NONE) => {
                self.reset_count();
                UiEvent::Download
            }
            (KeyCode::Char('q'), _) => {
                self.reset_count();
                UiEvent::Quit
            }
            (KeyCode::Char('c'), modifiers) if modifiers.contains(KeyModifiers::CONTROL) => {
                UiEvent::Quit
            }
            _ => {
                self.reset_count();
                UiEvent::None
            }
        }
    }

    fn map_mouse(&mut self, mouse: MouseEvent) -> UiEvent {
        let delta_y = match mouse.kind {
            MouseEventKind::ScrollUp => -1.0,
            MouseEventKind::ScrollDown => 1.0,
            _ => return UiEvent::None,
        };
        self.reset_count();
        if mouse.modifiers.contains(KeyModifiers::CONTROL) {
            let anchor = self.anchor_for(mouse.column, mouse.row);
            UiEvent::Command(Command::WheelZoom { anchor, delta_y })
        } else {
            UiEvent::Command(Command::ScrollBy {
                delta_x: 0.0,
                delta_y: delta_y * self.scroll_step,
            })
        }
    }

    /// Centre of the cell under the pointer, relative to the page area.
    fn anchor_for(&self, column: u16, row: u16) -> Point {
        let row = row.saturating_sub(self.content_row);
        Point::new(
            (column as f32 + 0.5) * self.cell.width,
            (row as f32 + 0.5) * self.cell.height,
        )
    }

    fn scroll(&mut self, delta_x: f32, delta_y: f32) -> UiEvent {
        let multiplier = self.take_count() as f32;
        UiEvent::Command(Command::ScrollBy {
            delta_x: delta_x * multiplier,
            delta_y: delta_y * multiplier,
        })
    }

    fn push_digit(&mut self, digit: usize) {
        let current = self.pending_count.unwrap_or(0);
        let next = current.saturating_mul(10).saturating_add(digit);
        self.pending_count = Some(next);
        if let Some(c) = char::from_digit(digit as u32, 10) {
            self.pending_digits.push(c);
        }
    }

    fn take_count(&mut self) -> usize {
        let count = self
            .pending_count
            .take()
            .filter(|&count| count > 0)
            .unwrap_or(1);
        self.pending_digits.clear();
        count
    }

    fn reset_count(&mut self) {
        self.pending_count = None;
        self.pending_digits.clear();
    }

    pub fn pending_input(&self) -> Option<String> {
        if self.pending_digits.is_empty() {
            None
        } else {
            Some(self.pending_digits.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn key_event(code: KeyCode) -> Event {
        key_event_with_modifiers(code, KeyModifiers::NONE)
    }

    fn key_event_with_modifiers(code: KeyCode, modifiers: KeyModifiers) -> Event {
        Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        })
    }

    fn wheel(kind: MouseEventKind, column: u16, row: u16, modifiers: KeyModifiers) -> Event {
        Event::Mouse(MouseEvent {
            kind,
            column,
            row,
            modifiers,
        })
    }

    #[test]
    fn numeric_prefix_goes_to_page() {
        let mut mapper = EventMapper::new();
        assert_eq!(mapper.map_event(key_event(KeyCode::Char('1'))), UiEvent::None);
        assert_eq!(mapper.map_event(key_event(KeyCode::Char('2'))), UiEvent::None);
        assert_eq!(mapper.pending_input().as_deref(), Some("12"));

        assert_eq!(
            mapper.map_event(key_event(KeyCode::Char('g'))),
            UiEvent::Command(Command::GotoPage { page: 12 })
        );
        assert!(mapper.pending_input().is_none());
        assert_eq!(
            mapper.map_event(key_event(KeyCode::Char('g'))),
            UiEvent::Command(Command::GotoPage { page: 1 })
        );
    }

    #[test]
    fn zero_resets_zoom_unless_counting() {
        let mut mapper = EventMapper::new();
        assert_eq!(
            mapper.map_event(key_event(KeyCode::Char('0'))),
            UiEvent::Command(Command::ResetZoom)
        );

        mapper.map_event(key_event(KeyCode::Char('1')));
        assert_eq!(mapper.map_event(key_event(KeyCode::Char('0'))), UiEvent::None);
        assert_eq!(
            mapper.map_event(key_event(KeyCode::Char('n'))),
            UiEvent::Command(Command::NextPage { count: 10 })
        );
    }

    #[test]
    fn prefix_scales_scroll_and_is_dropped_by_other_keys() {
        let mut mapper = EventMapper::with_scroll_step(10.0);
        mapper.map_event(key_event(KeyCode::Char('3')));
        assert_eq!(
            mapper.map_event(key_event(KeyCode::Char('j'))),
            UiEvent::Command(Command::ScrollBy {
                delta_x: 0.0,
                delta_y: 30.0
            })
        );

        mapper.map_event(key_event(KeyCode::Char('4')));
        assert_eq!(mapper.map_event(key_event(KeyCode::Char('x'))), UiEvent::None);
        assert_eq!(
            mapper.map_event(key_event(KeyCode::Left)),
            UiEvent::Command(Command::ScrollBy {
                delta_x: -10.0,
                delta_y: 0.0
            })
        );
    }

    #[test]
    fn page_keys_and_zoom_keys() {
        let mut mapper = EventMapper::new();
        assert_eq!(
            mapper.map_event(key_event(KeyCode::PageUp)),
            UiEvent::Command(Command::PrevPage { count: 1 })
        );
        assert_eq!(
            mapper.map_event(key_event(KeyCode::Char('='))),
            UiEvent::Command(Command::ZoomIn)
        );
        assert_eq!(
            mapper.map_event(key_event(KeyCode::Char('-'))),
            UiEvent::Command(Command::ZoomOut)
        );
        assert_eq!(
            mapper.map_event(key_event_with_modifiers(KeyCode::Char('G'), KeyModifiers::SHIFT)),
            UiEvent::Command(Command::GotoPage { page: usize::MAX })
        );
    }

    #[test]
    fn field_and_app_keys() {
        let mut mapper = EventMapper::new();
        assert_eq!(mapper.map_event(key_event(KeyCode::Tab)), UiEvent::HoverNextField);
        assert_eq!(
            mapper.map_event(key_event_with_modifiers(KeyCode::BackTab, KeyModifiers::SHIFT)),
            UiEvent::HoverPrevField
        );
        assert_eq!(mapper.map_event(key_event(KeyCode::Esc)), UiEvent::ClearHover);
        assert_eq!(mapper.map_event(key_event(KeyCode::Char('s'))), UiEvent::Download);
        assert_eq!(mapper.map_event(key_event(KeyCode::Char('q'))), UiEvent::Quit);
        assert_eq!(mapper.map_event(Event::Resize(80, 24)), UiEvent::Resized);
    }

    #[test]
    fn ctrl_wheel_zooms_at_pointer() {
        let mut mapper = EventMapper::new();
        mapper.set_geometry(Size::new(10.0, 20.0), 1);

        assert_eq!(
            mapper.map_event(wheel(MouseEventKind::ScrollUp, 4, 3, KeyModifiers::CONTROL)),
            UiEvent::Command(Command::WheelZoom {
                anchor: Point::new(45.0, 50.0),
                delta_y: -1.0
            })
        );
        assert_eq!(
            mapper.map_event(wheel(MouseEventKind::ScrollDown, 0, 0, KeyModifiers::NONE)),
            UiEvent::Command(Command::ScrollBy {
                delta_x: 0.0,
                delta_y: EventMapper::DEFAULT_SCROLL_STEP
            })
        );
    }
}
