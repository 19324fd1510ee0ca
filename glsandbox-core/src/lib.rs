//! Core of the rendering sandbox.
//!
//! This crate owns everything that touches GPU resources or camera math: the
//! [`gfx`] module wraps OpenGL buffers, vertex arrays, shader programs and
//! offscreen render targets behind owned handles, and the [`camera`] module
//! provides a free-fly 3D camera and an orthographic 2D camera.
//!
//! Windowing, event polling and UI live in the client crate and reach the core
//! only through [`camera::InputSource`], [`gfx::Device`] and
//! [`diagnostics::Diagnostics`].

pub mod camera;
pub mod diagnostics;
pub mod gfx;

pub use diagnostics::{DiagnosticSink, Diagnostics, LogSink, MemorySink};
