use std::{path::PathBuf, sync::Arc, time::Instant};

use glsandbox_core::{Diagnostics, gfx::GpuContext};
use sdl2::event::{Event, WindowEvent};

use crate::{
    app::App,
    config::{Config, DEFAULT_CONFIG_FILE},
    input::{InputState, SdlInput},
    overlay::Overlay,
    sandbox::Sandbox,
};

mod app;
mod assets;
mod config;
mod input;
mod logging;
mod overlay;
mod sandbox;
mod scene;

fn main() -> anyhow::Result<()> {
    let config_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let loaded = Config::load(&config_path)?;
    let found = loaded.is_some();
    let config = loaded.unwrap_or_default();

    logging::init(&config.logging)?;
    if !found {
        log::warn!("Config file {} not found, using defaults", config_path.display());
    }

    log::info!("Application starting...");
    if let Err(err) = run(&config) {
        log::error!("{err:#}");
        return Err(err);
    }
    log::info!("Application terminated normally");
    Ok(())
}

fn run(config: &Config) -> anyhow::Result<()> {
    let mut app = App::new(&config.window)?;
    let (width, height) = app.drawable_size();

    let ctx = GpuContext::new(Arc::clone(&app.gl), Diagnostics::default());
    let mut overlay = Overlay::new(&app.gl, width, height)?;
    let mut sandbox = Sandbox::new(&ctx, &app.gl, config, width, height)?;
    sandbox.resize(width, height);

    let mut input = InputState::default();
    let mut last_frame_time = Instant::now();

    log::info!("Entering main rendering loop");
    'running: loop {
        let now = Instant::now();
        let delta_time = now.duration_since(last_frame_time).as_secs_f32();
        last_frame_time = now;

        input.begin_frame();
        for event in app.event_pump.poll_iter() {
            overlay.handle_event(&event);
            input.handle_event(&event);
            match event {
                Event::Quit { .. } => break 'running,
                Event::Window {
                    win_event: WindowEvent::SizeChanged(..),
                    ..
                } => {
                    let (width, height) = app.window.drawable_size();
                    overlay.set_screen_size(width, height);
                    sandbox.resize(width, height);
                }
                Event::Window {
                    win_event: WindowEvent::FocusLost,
                    ..
                } => input.release_all(),
                _ => {}
            }
        }

        sandbox.sync_offscreen();
        let ui = overlay.begin_frame();
        sandbox.ui(&ui);
        overlay.end_frame();

        let ui_owns_input = overlay.wants_pointer() || overlay.wants_keyboard();
        let mut sdl_input = SdlInput::new(&mut input, &app.window, app.sdl.mouse());
        sandbox.update(&mut sdl_input, delta_time, ui_owns_input);

        sandbox.render();
        overlay.render();
        // The painter binds its own objects.
        ctx.forget_bindings();

        app.window.gl_swap_window();
    }

    log::info!("Cleaning up resources...");
    Ok(())
}
