//! Free-fly perspective camera.

use std::f32::consts::FRAC_PI_2;

use glam::{Mat4, Quat, Vec2, Vec3};

use super::{CursorMode, InputSource, MouseButton, Movement};
use crate::gfx::ActiveProgram;

/// How close to straight up or down the camera may look, in degrees.
const POLE_MARGIN_DEGREES: f32 = 5.0;

/// A perspective camera moved with the keyboard and turned with the mouse.
///
/// Movement is scaled by the frame time, so `speed` is in world units per
/// second.
pub struct FreeFlyCamera {
    pub position: Vec3,
    /// Viewing direction, kept at unit length.
    pub orientation: Vec3,
    pub up: Vec3,
    pub speed: f32,
    /// Degrees turned when the cursor moves one viewport height.
    pub sensitivity: f32,
    /// Button that must be held to look around.
    pub look_button: MouseButton,
    width: u32,
    height: u32,
    first_click: bool,
}

impl FreeFlyCamera {
    pub fn new(width: u32, height: u32, position: Vec3) -> Self {
        Self {
            position,
            orientation: Vec3::NEG_Z,
            up: Vec3::Y,
            speed: 6.0,
            sensitivity: 100.0,
            look_button: MouseButton::Right,
            width,
            height,
            first_click: true,
        }
    }

    pub fn set_viewport_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    pub fn viewport_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }

    /// Unit vector to the right of the viewing direction, or zero when looking
    /// straight along `up`.
    pub fn right(&self) -> Vec3 {
        self.orientation.cross(self.up).normalize_or_zero()
    }

    /// Whether the look button is currently captured.
    pub fn is_looking(&self) -> bool {
        !self.first_click
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.orientation, self.up)
    }

    pub fn projection(&self, fov_degrees: f32, near: f32, far: f32) -> Mat4 {
        Mat4::perspective_rh_gl(fov_degrees.to_radians(), self.aspect_ratio(), near, far)
    }

    /// Projection times view.
    pub fn view_projection(&self, fov_degrees: f32, near: f32, far: f32) -> Mat4 {
        self.projection(fov_degrees, near, far) * self.view()
    }

    /// Writes [`view_projection`](Self::view_projection) into `uniform` of the
    /// active program. Returns `false` if the program has no such uniform.
    pub fn matrix(
        &self,
        fov_degrees: f32,
        near: f32,
        far: f32,
        program: &ActiveProgram,
        uniform: &str,
    ) -> bool {
        program.set_uniform(uniform, self.view_projection(fov_degrees, near, far))
    }

    /// Applies one frame of keyboard and mouse input.
    pub fn inputs(&mut self, input: &mut impl InputSource, delta_time: f32) {
        self.translate(input, delta_time);
        self.look(input);
    }

    fn translate(&mut self, input: &impl InputSource, delta_time: f32) {
        let step = self.speed * delta_time;
        let right = self.right();

        if input.is_held(Movement::Forward) {
            self.position += step * self.orientation;
        }
        if input.is_held(Movement::Backward) {
            self.position -= step * self.orientation;
        }
        if input.is_held(Movement::Left) {
            self.position -= step * right;
        }
        if input.is_held(Movement::Right) {
            self.position += step * right;
        }
        if input.is_held(Movement::Up) {
            self.position += step * self.up;
        }
        if input.is_held(Movement::Down) {
            self.position -= step * self.up;
        }
    }

    fn look(&mut self, input: &mut impl InputSource) {
        if !input.is_button_down(self.look_button) {
            if !self.first_click {
                input.set_cursor_mode(CursorMode::Normal);
                self.first_click = true;
            }
            return;
        }

        let center = Vec2::new(self.width as f32 / 2.0, self.height as f32 / 2.0);
        input.set_cursor_mode(CursorMode::Hidden);
        if self.first_click {
            input.set_cursor_position(center);
            self.first_click = false;
        }

        let cursor = input.cursor_position();
        let height = self.height.max(1) as f32;
        let rot_x = self.sensitivity * (cursor.y - center.y) / height;
        let rot_y = self.sensitivity * (cursor.x - center.x) / height;

        self.pitch((-rot_x).to_radians());
        self.yaw((-rot_y).to_radians());
        self.orientation = self.orientation.normalize();

        input.set_cursor_position(center);
    }

    /// Rotates around the right vector. Rejected, returning `false`, if the
    /// result would come within the pole margin of `up` or cross over it.
    fn pitch(&mut self, angle: f32) -> bool {
        let right = self.right();
        if right == Vec3::ZERO {
            return false;
        }

        let elevation = FRAC_PI_2 - self.orientation.angle_between(self.up);
        let limit = FRAC_PI_2 - POLE_MARGIN_DEGREES.to_radians();
        if (elevation + angle).abs() >= limit {
            return false;
        }

        self.orientation = Quat::from_axis_angle(right, angle) * self.orientation;
        true
    }

    fn yaw(&mut self, angle: f32) {
        self.orientation = Quat::from_axis_angle(self.up.normalize(), angle) * self.orientation;
    }
}
