//! Orthographic 2D camera.
//!
//! One world unit maps to one pixel at zoom 1. The visible region is centered
//! on the camera position and shrinks as the zoom grows. Matrices are cached
//! and only rebuilt after a setter changed the camera.

use glam::{Mat3, Vec2, Vec3};

use crate::gfx::ActiveProgram;

/// Smallest zoom the camera accepts.
pub const MIN_ZOOM: f32 = 0.1;

/// Orthographic bounds at zoom 1, relative to the camera position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrthoBounds {
    pub left: f32,
    pub right: f32,
    pub bottom: f32,
    pub top: f32,
}

pub struct OrthoCamera2D {
    position: Vec2,
    zoom: f32,
    rotation: f32,
    width: u32,
    height: u32,
    bounds: OrthoBounds,
    projection: Mat3,
    view: Mat3,
    dirty: bool,
    generation: u64,
}

impl OrthoCamera2D {
    pub fn new(width: u32, height: u32, position: Vec2) -> Self {
        let mut camera = Self {
            position,
            zoom: 1.0,
            rotation: 0.0,
            width,
            height,
            bounds: OrthoBounds {
                left: 0.0,
                right: 0.0,
                bottom: 0.0,
                top: 0.0,
            },
            projection: Mat3::IDENTITY,
            view: Mat3::IDENTITY,
            dirty: true,
            generation: 0,
        };
        camera.set_viewport_size(width, height);
        camera
    }

    /// Recomputes the orthographic bounds from the viewport's aspect ratio.
    pub fn set_viewport_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;

        // A minimised window reports zero; keep the bounds non-degenerate.
        let (width, height) = (width.max(1) as f32, height.max(1) as f32);
        let aspect_ratio = width / height;
        let half_height = height / 2.0;
        let half_width = half_height * aspect_ratio;

        self.bounds = OrthoBounds {
            left: -half_width,
            right: half_width,
            bottom: -half_height,
            top: half_height,
        };
        self.dirty = true;
    }

    /// Sets the zoom, clamped to [`MIN_ZOOM`].
    pub fn set_zoom(&mut self, zoom: f32) {
        // `max` alone would let NaN through.
        self.zoom = if zoom.is_nan() { MIN_ZOOM } else { zoom.max(MIN_ZOOM) };
        self.dirty = true;
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
        self.dirty = true;
    }

    pub fn translate(&mut self, delta: Vec2) {
        self.position += delta;
        self.dirty = true;
    }

    /// Sets the rotation in radians.
    pub fn set_rotation(&mut self, rotation: f32) {
        self.rotation = rotation;
        self.dirty = true;
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    pub fn viewport_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn bounds(&self) -> OrthoBounds {
        self.bounds
    }

    /// Half the visible width and height in world units.
    pub fn visible_half_extents(&self) -> Vec2 {
        Vec2::new(self.bounds.right, self.bounds.top) / self.zoom
    }

    /// Number of times the matrices have been rebuilt.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Rebuilds the projection and view matrices if a setter changed the
    /// camera since the last call.
    pub fn update_matrices(&mut self) {
        if !self.dirty {
            return;
        }
        self.projection = self.calculate_projection();
        self.view = self.calculate_view();
        self.dirty = false;
        self.generation += 1;
    }

    fn calculate_projection(&self) -> Mat3 {
        let left = self.bounds.left / self.zoom;
        let right = self.bounds.right / self.zoom;
        let bottom = self.bounds.bottom / self.zoom;
        let top = self.bounds.top / self.zoom;

        Mat3::from_cols(
            Vec3::new(2.0 / (right - left), 0.0, 0.0),
            Vec3::new(0.0, 2.0 / (top - bottom), 0.0),
            Vec3::new(
                -(right + left) / (right - left),
                -(top + bottom) / (top - bottom),
                1.0,
            ),
        )
    }

    fn calculate_view(&self) -> Mat3 {
        let translation = Mat3::from_translation(-self.position);
        if self.rotation != 0.0 {
            Mat3::from_angle(-self.rotation) * translation
        } else {
            translation
        }
    }

    pub fn projection(&mut self) -> Mat3 {
        self.update_matrices();
        self.projection
    }

    pub fn view(&mut self) -> Mat3 {
        self.update_matrices();
        self.view
    }

    /// Projection times view: world coordinates to normalized device coordinates.
    pub fn view_projection(&mut self) -> Mat3 {
        self.update_matrices();
        self.projection * self.view
    }

    /// Uploads `projection2D` and `view2D` to the active program.
    pub fn set_matrices(&mut self, program: &ActiveProgram) {
        self.update_matrices();
        program.set_uniform("projection2D", self.projection);
        program.set_uniform("view2D", self.view);
    }

    /// Converts a window pixel (origin top-left, y down) to world coordinates.
    pub fn screen_to_world(&self, screen: Vec2) -> Vec2 {
        let size = self.screen_size();
        let ndc = Vec2::new(2.0 * screen.x / size.x - 1.0, 1.0 - 2.0 * screen.y / size.y);
        let local = ndc * self.visible_half_extents();
        Vec2::from_angle(self.rotation).rotate(local) + self.position
    }

    /// Converts world coordinates to a window pixel. Inverse of
    /// [`screen_to_world`](Self::screen_to_world).
    pub fn world_to_screen(&self, world: Vec2) -> Vec2 {
        let size = self.screen_size();
        let local = Vec2::from_angle(-self.rotation).rotate(world - self.position);
        let ndc = local / self.visible_half_extents();
        Vec2::new((ndc.x + 1.0) * size.x / 2.0, (1.0 - ndc.y) * size.y / 2.0)
    }

    fn screen_size(&self) -> Vec2 {
        Vec2::new(self.width.max(1) as f32, self.height.max(1) as f32)
    }
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng, rngs::StdRng};

    use super::*;
    use crate::gfx::{
        ShaderProgram, UniformValue,
        testing::{Call, RecordingDevice},
    };

    #[test]
    fn screen_center_maps_to_camera_position() {
        let camera = OrthoCamera2D::new(800, 600, Vec2::ZERO);

        let world = camera.screen_to_world(Vec2::new(400.0, 300.0));

        assert!(world.abs_diff_eq(Vec2::ZERO, 1e-5));
    }

    #[test]
    fn screen_corners_map_to_bounds() {
        let mut camera = OrthoCamera2D::new(800, 600, Vec2::new(10.0, -5.0));
        camera.set_zoom(2.0);

        let top_left = camera.screen_to_world(Vec2::ZERO);
        let bottom_right = camera.screen_to_world(Vec2::new(800.0, 600.0));

        assert!(top_left.abs_diff_eq(Vec2::new(10.0 - 200.0, -5.0 + 150.0), 1e-4));
        assert!(bottom_right.abs_diff_eq(Vec2::new(10.0 + 200.0, -5.0 - 150.0), 1e-4));
    }

    #[test]
    fn higher_zoom_shows_less() {
        let mut camera = OrthoCamera2D::new(1280, 720, Vec2::ZERO);
        let mut previous = camera.visible_half_extents();

        for zoom in [1.5, 2.0, 3.25, 10.0, 400.0] {
            camera.set_zoom(zoom);
            let extents = camera.visible_half_extents();
            assert!(extents.x < previous.x && extents.y < previous.y);
            previous = extents;
        }
    }

    #[test]
    fn zoom_is_clamped_to_a_positive_minimum() {
        let mut camera = OrthoCamera2D::new(800, 600, Vec2::ZERO);

        camera.set_zoom(0.0);
        assert_eq!(camera.zoom(), MIN_ZOOM);

        camera.set_zoom(-5.0);
        assert_eq!(camera.zoom(), MIN_ZOOM);

        camera.set_zoom(f32::NAN);
        assert_eq!(camera.zoom(), MIN_ZOOM);
    }

    #[test]
    fn zero_height_viewport_stays_finite() {
        let mut camera = OrthoCamera2D::new(800, 0, Vec2::ZERO);

        let projection = camera.projection();
        assert!(projection.is_finite(), "{projection:?}");
        assert!(camera.visible_half_extents().cmpgt(Vec2::ZERO).all());

        let screen = Vec2::new(400.0, 0.0);
        let back = camera.world_to_screen(camera.screen_to_world(screen));
        assert!(back.abs_diff_eq(screen, 1e-3), "{screen} came back as {back}");
    }

    #[test]
    fn screen_world_round_trip() {
        let mut rng = StdRng::seed_from_u64(0x5eed);

        for _ in 0..200 {
            let width = rng.random_range(1..4000);
            let height = rng.random_range(1..4000);
            let position = Vec2::new(rng.random_range(-1e3..1e3), rng.random_range(-1e3..1e3));
            let mut camera = OrthoCamera2D::new(width, height, position);
            camera.set_zoom(rng.random_range(0.1..20.0));
            camera.set_rotation(rng.random_range(-3.2..3.2));

            let screen = Vec2::new(
                rng.random_range(0.0..width as f32),
                rng.random_range(0.0..height as f32),
            );
            let back = camera.world_to_screen(camera.screen_to_world(screen));

            assert!(
                back.abs_diff_eq(screen, 1e-2),
                "{screen} came back as {back} ({width}x{height})"
            );
        }
    }

    #[test]
    fn conversions_agree_with_the_matrices() {
        let mut camera = OrthoCamera2D::new(800, 600, Vec2::new(3.0, 4.0));
        camera.set_zoom(1.5);
        camera.set_rotation(0.7);
        let world = camera.screen_to_world(Vec2::new(120.0, 470.0));

        let ndc = camera.view_projection() * world.extend(1.0);

        let expected = Vec2::new(2.0 * 120.0 / 800.0 - 1.0, 1.0 - 2.0 * 470.0 / 600.0);
        assert!(ndc.truncate().abs_diff_eq(expected, 1e-4));
    }

    #[test]
    fn matrices_are_rebuilt_once_per_change() {
        let mut camera = OrthoCamera2D::new(800, 600, Vec2::ZERO);

        camera.update_matrices();
        camera.update_matrices();
        assert_eq!(camera.generation(), 1);

        camera.translate(Vec2::new(1.0, 0.0));
        camera.update_matrices();
        let _ = camera.view_projection();
        assert_eq!(camera.generation(), 2);

        for change in 0..4 {
            match change {
                0 => camera.set_zoom(2.0),
                1 => camera.set_rotation(0.5),
                2 => camera.set_viewport_size(1024, 768),
                _ => camera.set_position(Vec2::splat(7.0)),
            }
            camera.update_matrices();
            camera.update_matrices();
        }
        assert_eq!(camera.generation(), 6);
    }

    #[test]
    fn view_applies_rotation_only_when_set() {
        let mut camera = OrthoCamera2D::new(800, 600, Vec2::new(5.0, 0.0));
        assert_eq!(camera.view(), Mat3::from_translation(Vec2::new(-5.0, 0.0)));

        camera.set_rotation(std::f32::consts::FRAC_PI_2);
        let rotated = camera.view().transform_point2(Vec2::new(5.0, 1.0));
        assert!(rotated.abs_diff_eq(Vec2::new(1.0, 0.0), 1e-5));
    }

    #[test]
    fn set_matrices_uploads_both_uniforms() {
        let (ctx, device, _) = RecordingDevice::context();
        device.declare_uniforms(&["projection2D", "view2D"]);
        let program = ShaderProgram::new(&ctx, "", "").unwrap();
        let mut camera = OrthoCamera2D::new(800, 600, Vec2::ZERO);

        camera.set_matrices(&program.activate());

        let projection = camera.projection();
        let uploaded: Vec<_> = device
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::SetUniform(_, value) => Some(value),
                _ => None,
            })
            .collect();
        assert_eq!(
            uploaded,
            vec![UniformValue::Mat3(projection), UniformValue::Mat3(Mat3::IDENTITY)]
        );
    }
}
