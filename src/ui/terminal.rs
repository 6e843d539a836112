// Terminal as the touch field: mouse drags are touches, keys are buttons
//
// Controls: drag with the left button = steer, C/Esc = cancel touch,
// S/Space = send stop, I = clamp to interval, E = clamp to each other,
// R = restart SDK, Q/Ctrl+C = quit

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEventKind};

use crate::drive::{TouchPhase, Vec2};

/// What the user asked for
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UiAction {
    Touch(TouchPhase, Vec2),
    CancelTouch,
    SendStop,
    ToggleClampToInterval,
    ToggleClampToEachOther,
    RestartSdk,
    Resize { cols: u16, rows: u16 },
    Quit,
}

/// Maps terminal cells to touch-field coordinates
///
/// The pivot sits at the center of the terminal, +y points up and rows are
/// stretched by the cell aspect ratio so the field stays circular.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerminalSurface {
    center_col: f32,
    center_row: f32,
    cell_aspect: f32,
    height: f32,
}

impl TerminalSurface {
    pub fn new(cols: u16, rows: u16, cell_aspect: f32) -> Self {
        // Top row is the status line
        let field_rows = rows.saturating_sub(1);
        Self {
            center_col: f32::from(cols) / 2.0,
            center_row: 1.0 + f32::from(field_rows) / 2.0,
            cell_aspect,
            height: f32::from(field_rows) * cell_aspect,
        }
    }

    /// Field height in column units
    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn to_field(&self, col: u16, row: u16) -> Vec2 {
        Vec2::new(
            f32::from(col) - self.center_col,
            (self.center_row - f32::from(row)) * self.cell_aspect,
        )
    }
}

pub fn map_event(event: &Event, surface: &TerminalSurface) -> Option<UiAction> {
    match event {
        Event::Mouse(mouse) => {
            let phase = match mouse.kind {
                MouseEventKind::Down(MouseButton::Left) => TouchPhase::Began,
                MouseEventKind::Drag(MouseButton::Left) => TouchPhase::Moved,
                MouseEventKind::Up(MouseButton::Left) => TouchPhase::Ended,
                _ => return None,
            };
            Some(UiAction::Touch(phase, surface.to_field(mouse.column, mouse.row)))
        }
        Event::Key(key) => map_key(key),
        Event::Resize(cols, rows) => Some(UiAction::Resize {
            cols: *cols,
            rows: *rows,
        }),
        _ => None,
    }
}

fn map_key(key: &KeyEvent) -> Option<UiAction> {
    if key.kind != KeyEventKind::Press {
        return None;
    }

    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(UiAction::Quit),
        KeyCode::Char('q') => Some(UiAction::Quit),
        KeyCode::Char('c') | KeyCode::Esc => Some(UiAction::CancelTouch),
        KeyCode::Char('s') | KeyCode::Char(' ') => Some(UiAction::SendStop),
        KeyCode::Char('i') => Some(UiAction::ToggleClampToInterval),
        KeyCode::Char('e') => Some(UiAction::ToggleClampToEachOther),
        KeyCode::Char('r') => Some(UiAction::RestartSdk),
        _ => None,
    }
}
