//! Immediate-mode UI drawn on top of the scene.
//!
//! A frame is bracketed by [`Overlay::begin_frame`] and [`Overlay::end_frame`];
//! [`Overlay::render`] then paints whatever was built in between.

use std::{sync::Arc, time::Instant};

use anyhow::anyhow;
use egui::{Modifiers, PointerButton, Pos2, RawInput, Rect, vec2};
use sdl2::{
    event::{Event, WindowEvent},
    keyboard::{Keycode, Mod},
    mouse::MouseButton,
};

pub struct Overlay {
    ctx: egui::Context,
    painter: egui_glow::Painter,
    events: Vec<egui::Event>,
    modifiers: Modifiers,
    started: Instant,
    screen_size: (u32, u32),
    output: Option<egui::FullOutput>,
}

impl Overlay {
    pub fn new(gl: &Arc<glow::Context>, width: u32, height: u32) -> anyhow::Result<Self> {
        let painter = egui_glow::Painter::new(Arc::clone(gl), "", None, false)
            .map_err(|err| anyhow!("Failed to create the UI painter: {err:?}"))?;
        log::debug!("UI painter created");

        Ok(Self {
            ctx: egui::Context::default(),
            painter,
            events: Vec::new(),
            modifiers: Modifiers::default(),
            started: Instant::now(),
            screen_size: (width, height),
            output: None,
        })
    }

    pub fn set_screen_size(&mut self, width: u32, height: u32) {
        self.screen_size = (width, height);
    }

    /// Queues `event` for the next frame.
    pub fn handle_event(&mut self, event: &Event) {
        if let Some(modifiers) = event_modifiers(event) {
            self.modifiers = modifiers;
        }
        match translate_event(event, self.modifiers) {
            Some(event) => self.events.push(event),
            None => {
                if let Event::Window {
                    win_event: WindowEvent::Leave,
                    ..
                } = event
                {
                    self.events.push(egui::Event::PointerGone);
                }
            }
        }
    }

    /// Starts a UI frame. Widgets are added through the returned context
    /// until [`end_frame`](Self::end_frame).
    pub fn begin_frame(&mut self) -> egui::Context {
        let (width, height) = self.screen_size;
        let input = RawInput {
            screen_rect: Some(Rect::from_min_size(
                Pos2::ZERO,
                vec2(width as f32, height as f32),
            )),
            time: Some(self.started.elapsed().as_secs_f64()),
            modifiers: self.modifiers,
            events: std::mem::take(&mut self.events),
            ..Default::default()
        };
        self.ctx.begin_pass(input);
        self.ctx.clone()
    }

    pub fn end_frame(&mut self) {
        self.output = Some(self.ctx.end_pass());
    }

    /// Paints the last finished frame onto the current framebuffer.
    pub fn render(&mut self) {
        let Some(output) = self.output.take() else {
            return;
        };
        let primitives = self.ctx.tessellate(output.shapes, output.pixels_per_point);
        let (width, height) = self.screen_size;
        self.painter.paint_and_update_textures(
            [width, height],
            output.pixels_per_point,
            &primitives,
            &output.textures_delta,
        );
    }

    /// Whether the UI is using the pointer, so the scene should ignore it.
    pub fn wants_pointer(&self) -> bool {
        self.ctx.wants_pointer_input() || self.ctx.is_pointer_over_area()
    }

    pub fn wants_keyboard(&self) -> bool {
        self.ctx.wants_keyboard_input()
    }
}

impl Drop for Overlay {
    fn drop(&mut self) {
        self.painter.destroy();
    }
}

fn event_modifiers(event: &Event) -> Option<Modifiers> {
    let keymod = match event {
        Event::KeyDown { keymod, .. } | Event::KeyUp { keymod, .. } => *keymod,
        _ => return None,
    };
    let ctrl = keymod.intersects(Mod::LCTRLMOD | Mod::RCTRLMOD);
    Some(Modifiers {
        alt: keymod.intersects(Mod::LALTMOD | Mod::RALTMOD),
        ctrl,
        shift: keymod.intersects(Mod::LSHIFTMOD | Mod::RSHIFTMOD),
        mac_cmd: false,
        command: ctrl,
    })
}

fn pointer_button(button: MouseButton) -> Option<PointerButton> {
    match button {
        MouseButton::Left => Some(PointerButton::Primary),
        MouseButton::Right => Some(PointerButton::Secondary),
        MouseButton::Middle => Some(PointerButton::Middle),
        MouseButton::X1 => Some(PointerButton::Extra1),
        MouseButton::X2 => Some(PointerButton::Extra2),
        MouseButton::Unknown => None,
    }
}

fn key(keycode: Keycode) -> Option<egui::Key> {
    use egui::Key;

    Some(match keycode {
        Keycode::Backspace => Key::Backspace,
        Keycode::Delete => Key::Delete,
        Keycode::Return => Key::Enter,
        Keycode::Tab => Key::Tab,
        Keycode::Escape => Key::Escape,
        Keycode::Left => Key::ArrowLeft,
        Keycode::Right => Key::ArrowRight,
        Keycode::Up => Key::ArrowUp,
        Keycode::Down => Key::ArrowDown,
        Keycode::Home => Key::Home,
        Keycode::End => Key::End,
        Keycode::A => Key::A,
        Keycode::C => Key::C,
        Keycode::V => Key::V,
        Keycode::X => Key::X,
        Keycode::Z => Key::Z,
        _ => return None,
    })
}

/// Converts an SDL event to its egui counterpart.
fn translate_event(event: &Event, modifiers: Modifiers) -> Option<egui::Event> {
    match *event {
        Event::MouseMotion { x, y, .. } => {
            Some(egui::Event::PointerMoved(Pos2::new(x as f32, y as f32)))
        }
        Event::MouseButtonDown {
            mouse_btn, x, y, ..
        }
        | Event::MouseButtonUp {
            mouse_btn, x, y, ..
        } => Some(egui::Event::PointerButton {
            pos: Pos2::new(x as f32, y as f32),
            button: pointer_button(mouse_btn)?,
            pressed: matches!(event, Event::MouseButtonDown { .. }),
            modifiers,
        }),
        Event::MouseWheel { x, y, .. } => Some(egui::Event::MouseWheel {
            unit: egui::MouseWheelUnit::Line,
            delta: vec2(x as f32, y as f32),
            modifiers,
        }),
        Event::TextInput { ref text, .. } => Some(egui::Event::Text(text.clone())),
        Event::KeyDown {
            keycode: Some(keycode),
            repeat,
            ..
        } => Some(egui::Event::Key {
            key: key(keycode)?,
            physical_key: None,
            pressed: true,
            repeat,
            modifiers,
        }),
        Event::KeyUp {
            keycode: Some(keycode),
            ..
        } => Some(egui::Event::Key {
            key: key(keycode)?,
            physical_key: None,
            pressed: false,
            repeat: false,
            modifiers,
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn button_event(pressed: bool, mouse_btn: MouseButton) -> Event {
        if pressed {
            Event::MouseButtonDown {
                timestamp: 0,
                window_id: 0,
                which: 0,
                mouse_btn,
                clicks: 1,
                x: 30,
                y: 40,
            }
        } else {
            Event::MouseButtonUp {
                timestamp: 0,
                window_id: 0,
                which: 0,
                mouse_btn,
                clicks: 1,
                x: 30,
                y: 40,
            }
        }
    }

    #[test]
    fn mouse_buttons_become_pointer_events() {
        let down = translate_event(&button_event(true, MouseButton::Left), Modifiers::NONE);
        let up = translate_event(&button_event(false, MouseButton::Right), Modifiers::NONE);

        assert_eq!(
            down,
            Some(egui::Event::PointerButton {
                pos: Pos2::new(30.0, 40.0),
                button: PointerButton::Primary,
                pressed: true,
                modifiers: Modifiers::NONE,
            })
        );
        assert!(matches!(
            up,
            Some(egui::Event::PointerButton {
                button: PointerButton::Secondary,
                pressed: false,
                ..
            })
        ));
        assert_eq!(
            translate_event(&button_event(true, MouseButton::Unknown), Modifiers::NONE),
            None
        );
    }

    #[test]
    fn control_keys_set_command_modifier() {
        let event = Event::KeyDown {
            timestamp: 0,
            window_id: 0,
            keycode: Some(Keycode::C),
            scancode: None,
            keymod: Mod::LCTRLMOD,
            repeat: false,
        };

        let modifiers = event_modifiers(&event).unwrap();
        assert!(modifiers.ctrl && modifiers.command);
        assert!(matches!(
            translate_event(&event, modifiers),
            Some(egui::Event::Key {
                key: egui::Key::C,
                pressed: true,
                ..
            })
        ));
    }

    #[test]
    fn unmapped_keys_are_ignored() {
        let event = Event::KeyDown {
            timestamp: 0,
            window_id: 0,
            keycode: Some(Keycode::F7),
            scancode: None,
            keymod: Mod::NOMOD,
            repeat: false,
        };

        assert_eq!(translate_event(&event, Modifiers::NONE), None);
    }
}
