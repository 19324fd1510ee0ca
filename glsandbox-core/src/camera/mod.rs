//! Cameras for the 3D scene and for 2D overlays.

pub mod free_fly;
pub mod input;
pub mod ortho2d;

pub use free_fly::FreeFlyCamera;
pub use input::{CursorMode, InputSource, MouseButton, Movement};
pub use ortho2d::{MIN_ZOOM, OrthoBounds, OrthoCamera2D};
