use std::collections::HashSet;

use glam::Vec2;
use glsandbox_core::camera::{CursorMode, InputSource, MouseButton, Movement};
use sdl2::{event::Event, keyboard::Keycode, mouse::MouseUtil, video::Window};

/// The current state of the keyboard.
#[derive(Default)]
pub struct KeyboardState {
    pub down: HashSet<Keycode>,
    pub pressed: HashSet<Keycode>,
    pub released: HashSet<Keycode>,
}

/// The current state of the mouse.
#[derive(Default)]
pub struct MouseState {
    pub position: Vec2,
    pub delta: Vec2,
    pub down: HashSet<sdl2::mouse::MouseButton>,
    pub pressed: HashSet<sdl2::mouse::MouseButton>,
    pub released: HashSet<sdl2::mouse::MouseButton>,
    pub scroll_delta: Vec2,
}

/// Keyboard and mouse state folded from SDL events.
#[derive(Default)]
pub struct InputState {
    pub keyboard: KeyboardState,
    pub mouse: MouseState,
}

impl InputState {
    /// Clears the per-frame edges. Call before polling the frame's events.
    pub fn begin_frame(&mut self) {
        self.mouse.delta = Vec2::ZERO;
        self.mouse.scroll_delta = Vec2::ZERO;
        self.mouse.pressed.clear();
        self.mouse.released.clear();
        self.keyboard.pressed.clear();
        self.keyboard.released.clear();
    }

    pub fn handle_event(&mut self, event: &Event) {
        match *event {
            Event::MouseMotion {
                x, y, xrel, yrel, ..
            } => {
                self.mouse.position = Vec2::new(x as f32, y as f32);
                self.mouse.delta += Vec2::new(xrel as f32, yrel as f32);
            }
            Event::MouseWheel { x, y, .. } => {
                self.mouse.scroll_delta += Vec2::new(x as f32, y as f32);
            }
            Event::MouseButtonDown { mouse_btn, .. } => {
                self.mouse.down.insert(mouse_btn);
                self.mouse.pressed.insert(mouse_btn);
            }
            Event::MouseButtonUp { mouse_btn, .. } => {
                self.mouse.down.remove(&mouse_btn);
                self.mouse.released.insert(mouse_btn);
            }
            Event::KeyDown {
                keycode: Some(keycode),
                repeat: false,
                ..
            } => {
                self.keyboard.down.insert(keycode);
                self.keyboard.pressed.insert(keycode);
            }
            Event::KeyUp {
                keycode: Some(keycode),
                repeat: false,
                ..
            } => {
                self.keyboard.down.remove(&keycode);
                self.keyboard.released.insert(keycode);
            }
            _ => {}
        }
    }

    /// Drops held keys and buttons, e.g. when the window loses focus and the
    /// matching release events will never arrive.
    pub fn release_all(&mut self) {
        self.keyboard.down.clear();
        self.mouse.down.clear();
    }
}

fn movement_keys(movement: Movement) -> &'static [Keycode] {
    match movement {
        Movement::Forward => &[Keycode::W],
        Movement::Backward => &[Keycode::S],
        Movement::Left => &[Keycode::A],
        Movement::Right => &[Keycode::D],
        Movement::Up => &[Keycode::E, Keycode::Space],
        Movement::Down => &[Keycode::Q, Keycode::LCtrl],
    }
}

fn sdl_button(button: MouseButton) -> sdl2::mouse::MouseButton {
    match button {
        MouseButton::Left => sdl2::mouse::MouseButton::Left,
        MouseButton::Middle => sdl2::mouse::MouseButton::Middle,
        MouseButton::Right => sdl2::mouse::MouseButton::Right,
    }
}

/// [`InputSource`] over the SDL window, borrowed for one frame.
pub struct SdlInput<'a> {
    state: &'a mut InputState,
    window: &'a Window,
    mouse: MouseUtil,
}

impl<'a> SdlInput<'a> {
    pub fn new(state: &'a mut InputState, window: &'a Window, mouse: MouseUtil) -> Self {
        Self { state, window, mouse }
    }

    pub fn state(&self) -> &InputState {
        self.state
    }
}

impl InputSource for SdlInput<'_> {
    fn is_held(&self, movement: Movement) -> bool {
        movement_keys(movement)
            .iter()
            .any(|key| self.state.keyboard.down.contains(key))
    }

    fn is_button_down(&self, button: MouseButton) -> bool {
        self.state.mouse.down.contains(&sdl_button(button))
    }

    fn cursor_position(&self) -> Vec2 {
        self.state.mouse.position
    }

    fn set_cursor_position(&mut self, position: Vec2) {
        self.mouse.warp_mouse_in_window(self.window, position.x as i32, position.y as i32);
        self.state.mouse.position = position;
    }

    fn set_cursor_mode(&mut self, mode: CursorMode) {
        self.mouse.show_cursor(mode == CursorMode::Normal);
    }
}
