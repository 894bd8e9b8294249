//! Input adapter: keys and mouse clicks become board intents.

use crate::board::{BOARD_HEIGHT, BOARD_WIDTH, TILE_SIZE};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

/// Terminal columns per board tile.
pub const TILE_COLS: u16 = 4;
/// Terminal rows per board tile (two half-block pixels of 16 each).
pub const TILE_ROWS: u16 = 1;

/// The only two moves the simulation accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    RotateRow(usize),
    InvertColumn(usize),
}

/// Action from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CursorLeft,
    CursorRight,
    CursorUp,
    CursorDown,
    RotateRow,
    InvertColumn,
    Pause,
    Restart,
    Quit,
    None,
}

/// Map key event to action. Arrows and vim keys both move the cursor.
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent { code, modifiers, .. } = key;
    let no_mod = modifiers.is_empty() || modifiers == KeyModifiers::SHIFT;
    if modifiers == KeyModifiers::CONTROL && code == KeyCode::Char('c') {
        return Action::Quit;
    }
    if !no_mod {
        return Action::None;
    }
    match code {
        KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('p') => Action::Pause,
        KeyCode::Char('r') => Action::Restart,
        KeyCode::Left | KeyCode::Char('h') => Action::CursorLeft,
        KeyCode::Right | KeyCode::Char('l') => Action::CursorRight,
        KeyCode::Up | KeyCode::Char('k') => Action::CursorUp,
        KeyCode::Down | KeyCode::Char('j') => Action::CursorDown,
        KeyCode::Char(' ') | KeyCode::Enter => Action::RotateRow,
        KeyCode::Char('x') | KeyCode::Char('i') | KeyCode::Tab => Action::InvertColumn,
        _ => Action::None,
    }
}

/// Board cursor for keyboard play. Always inside the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub x: usize,
    pub y: usize,
}

impl Default for Cursor {
    fn default() -> Self {
        Self {
            x: BOARD_WIDTH / 2,
            y: BOARD_HEIGHT - 1,
        }
    }
}

impl Cursor {
    /// Moves the cursor, or turns a board action into an intent at the cursor.
    pub fn apply(&mut self, action: Action) -> Option<Intent> {
        match action {
            Action::CursorLeft => self.x = self.x.saturating_sub(1),
            Action::CursorRight => self.x = (self.x + 1).min(BOARD_WIDTH - 1),
            Action::CursorUp => self.y = self.y.saturating_sub(1),
            Action::CursorDown => self.y = (self.y + 1).min(BOARD_HEIGHT - 1),
            Action::RotateRow => return Some(Intent::RotateRow(self.y)),
            Action::InvertColumn => return Some(Intent::InvertColumn(self.x)),
            _ => {}
        }
        None
    }
}

/// Tile under a terminal position, accounting for the rising board offset.
/// `None` outside the board or over the incoming row strip.
pub fn tile_at(board_area: Rect, column: u16, row: u16, new_row_delta: f32) -> Option<(usize, usize)> {
    if column < board_area.x || row < board_area.y {
        return None;
    }
    let tx = usize::from((column - board_area.x) / TILE_COLS);
    let term_row = row - board_area.y;
    if tx >= BOARD_WIDTH || term_row >= BOARD_HEIGHT as u16 * TILE_ROWS {
        return None;
    }
    // Centre of the terminal cell in board pixels.
    let py = (f32::from(term_row) + 0.5) * TILE_SIZE / f32::from(TILE_ROWS);
    let ty = ((py + new_row_delta) / TILE_SIZE) as usize;
    (ty < BOARD_HEIGHT).then_some((tx, ty))
}

/// Left click rotates the row under the pointer, right click inverts the column.
pub fn pointer_to_intent(mouse: MouseEvent, board_area: Rect, new_row_delta: f32) -> Option<Intent> {
    let button = match mouse.kind {
        MouseEventKind::Up(button) => button,
        _ => return None,
    };
    let (x, y) = tile_at(board_area, mouse.column, mouse.row, new_row_delta)?;
    match button {
        MouseButton::Left => Some(Intent::RotateRow(y)),
        MouseButton::Right => Some(Intent::InvertColumn(x)),
        MouseButton::Middle => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn click(kind: MouseEventKind, column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    const AREA: Rect = Rect {
        x: 2,
        y: 1,
        width: 40,
        height: 15,
    };

    #[test]
    fn test_keys_map_to_actions() {
        let k = |c| KeyEvent::new(c, KeyModifiers::NONE);
        assert_eq!(key_to_action(k(KeyCode::Char('h'))), Action::CursorLeft);
        assert_eq!(key_to_action(k(KeyCode::Down)), Action::CursorDown);
        assert_eq!(key_to_action(k(KeyCode::Char(' '))), Action::RotateRow);
        assert_eq!(key_to_action(k(KeyCode::Char('x'))), Action::InvertColumn);
        assert_eq!(key_to_action(k(KeyCode::Char('z'))), Action::None);
        assert_eq!(
            key_to_action(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Action::Quit
        );
    }

    #[test]
    fn test_cursor_stays_on_board() {
        let mut c = Cursor { x: 0, y: 0 };
        assert_eq!(c.apply(Action::CursorLeft), None);
        c.apply(Action::CursorUp);
        assert_eq!(c, Cursor { x: 0, y: 0 });
        for _ in 0..40 {
            c.apply(Action::CursorRight);
            c.apply(Action::CursorDown);
        }
        assert_eq!(c, Cursor { x: BOARD_WIDTH - 1, y: BOARD_HEIGHT - 1 });
        assert_eq!(c.apply(Action::RotateRow), Some(Intent::RotateRow(BOARD_HEIGHT - 1)));
        assert_eq!(c.apply(Action::InvertColumn), Some(Intent::InvertColumn(BOARD_WIDTH - 1)));
    }

    #[test]
    fn test_clicks_map_to_intents() {
        let left = click(MouseEventKind::Up(MouseButton::Left), 2 + 9, 1 + 4);
        assert_eq!(pointer_to_intent(left, AREA, 0.0), Some(Intent::RotateRow(4)));
        let right = click(MouseEventKind::Up(MouseButton::Right), 2 + 9, 1 + 4);
        assert_eq!(pointer_to_intent(right, AREA, 0.0), Some(Intent::InvertColumn(2)));
        let down = click(MouseEventKind::Down(MouseButton::Left), 2 + 9, 1 + 4);
        assert_eq!(pointer_to_intent(down, AREA, 0.0), None);
    }

    #[test]
    fn test_rising_offset_shifts_row() {
        // The middle of terminal row 4 lands in board row 5 once the board has risen 20 px.
        assert_eq!(tile_at(AREA, 2, 1 + 4, 20.0), Some((0, 5)));
        assert_eq!(tile_at(AREA, 2, 1 + 4, 10.0), Some((0, 4)));
    }

    #[test]
    fn test_clicks_outside_board_rejected() {
        assert_eq!(tile_at(AREA, 1, 3, 0.0), None);
        assert_eq!(tile_at(AREA, 2 + 40, 3, 0.0), None);
        assert_eq!(tile_at(AREA, 3, 1 + 15, 0.0), None);
        // Bottom row over the incoming strip once mostly risen.
        assert_eq!(tile_at(AREA, 3, 1 + 14, 20.0), None);
    }
}
