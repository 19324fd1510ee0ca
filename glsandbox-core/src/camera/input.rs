//! What the cameras need from the windowing layer.

use glam::Vec2;

/// Directions the free-fly camera can move in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Movement {
    Forward,
    Backward,
    Left,
    Right,
    Up,
    Down,
}

/// Mouse buttons the cameras can react to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

/// Cursor visibility.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CursorMode {
    Normal,
    Hidden,
}

/// Keyboard and mouse state of the window, sampled once per frame.
pub trait InputSource {
    /// Whether the key bound to `movement` is held down.
    fn is_held(&self, movement: Movement) -> bool;

    fn is_button_down(&self, button: MouseButton) -> bool;

    /// Cursor position in window pixels, origin at the top-left corner.
    fn cursor_position(&self) -> Vec2;

    /// Warps the cursor. Subsequent `cursor_position` calls return `position`.
    fn set_cursor_position(&mut self, position: Vec2);

    fn set_cursor_mode(&mut self, mode: CursorMode);
}
