//! SDL2 and OpenGL application management.
//!
//! This module defines the [`App`] struct which owns the SDL2 window, its
//! OpenGL context and the event pump.

use std::sync::Arc;

use anyhow::anyhow;
use glow::HasContext;

use crate::config::WindowConfig;

/// The [`App`] struct encapsulates the SDL2 and OpenGL context.
pub struct App {
    pub sdl: sdl2::Sdl,
    pub video_subsystem: sdl2::VideoSubsystem,
    pub window: sdl2::video::Window,
    pub gl_context: sdl2::video::GLContext,
    pub gl: Arc<glow::Context>,
    pub event_pump: sdl2::EventPump,
}

impl App {
    /// Opens a window with an OpenGL 3.3 core context.
    /// The configured size is ignored if `fullscreen` is set.
    pub fn new(config: &WindowConfig) -> anyhow::Result<Self> {
        let sdl = sdl2::init().map_err(|e| anyhow!("Failed to initialize SDL: {e}"))?;
        let video_subsystem = sdl
            .video()
            .map_err(|e| anyhow!("Failed to initialize the SDL video subsystem: {e}"))?;
        let version = sdl2::version::version();
        log::debug!("SDL initialized ({version})");

        let gl_attr = video_subsystem.gl_attr();
        gl_attr.set_context_profile(sdl2::video::GLProfile::Core);
        gl_attr.set_context_version(3, 3);
        gl_attr.set_depth_size(24);
        gl_attr.set_stencil_size(8);

        let (width, height) = if config.fullscreen {
            let display_mode = video_subsystem
                .current_display_mode(0)
                .map_err(|e| anyhow!("Failed to query the display mode: {e}"))?;
            (display_mode.w as u32, display_mode.h as u32)
        } else {
            (config.width, config.height)
        };

        log::info!("Creating window...");
        let mut window = video_subsystem
            .window(&config.title, width, height)
            .opengl()
            .resizable()
            .build()
            .map_err(|e| anyhow!("Failed to create the window: {e}"))?;
        window
            .set_fullscreen(if config.fullscreen {
                sdl2::video::FullscreenType::Desktop
            } else {
                sdl2::video::FullscreenType::Off
            })
            .map_err(|e| anyhow!("Failed to set the fullscreen mode: {e}"))?;

        let gl_context = window
            .gl_create_context()
            .map_err(|e| anyhow!("Failed to create the OpenGL context: {e}"))?;
        window
            .gl_make_current(&gl_context)
            .map_err(|e| anyhow!("Failed to activate the OpenGL context: {e}"))?;
        let gl = unsafe {
            glow::Context::from_loader_function(|s| {
                video_subsystem.gl_get_proc_address(s) as *const _
            })
        };

        let event_pump = sdl
            .event_pump()
            .map_err(|e| anyhow!("Failed to create the event pump: {e}"))?;

        let gl = Arc::new(gl);
        unsafe {
            log::info!("OpenGL version: {}", gl.get_parameter_string(glow::VERSION));
            log::info!("OpenGL renderer: {}", gl.get_parameter_string(glow::RENDERER));
        }

        Ok(Self {
            sdl,
            video_subsystem,
            window,
            gl_context,
            gl,
            event_pump,
        })
    }

    /// Size of the window's drawable area in pixels.
    pub fn drawable_size(&self) -> (u32, u32) {
        self.window.drawable_size()
    }
}
