use glutin::{
    config::{Config, ConfigTemplateBuilder},
    context::{ContextApi, ContextAttributesBuilder, GlProfile, PossiblyCurrentContext, Version},
    display::{GetGlDisplay, GlDisplay},
    prelude::*,
    surface::{Surface, SwapInterval, WindowSurface},
};
use glutin_winit::{DisplayBuilder, GlWindow};
use log::{debug, error, info, warn, LevelFilter};
use raw_window_handle::HasRawWindowHandle;
use simple_logger::SimpleLogger;
use std::{ffi::CString, num::NonZeroU32, process, ptr};
use winit::{
    dpi::LogicalSize,
    event::{Event, WindowEvent},
    event_loop::EventLoop,
    window::{Window, WindowBuilder},
};

use quadshader::{
    render::DrawBackend, AppConfig, GlBackend, InitError, Renderer, ShaderProgramSource,
};

struct App {
    window: Window,
    gl_context: PossiblyCurrentContext,
    gl_surface: Surface<WindowSurface>,
    backend: GlBackend,
    renderer: Option<Renderer<GlBackend>>,
}

impl App {
    fn new(config: &AppConfig, event_loop: &EventLoop<()>) -> Result<Self, InitError> {
        let window_builder = WindowBuilder::new()
            .with_title(config.window.title.as_str())
            .with_inner_size(LogicalSize::new(config.window.width, config.window.height));

        let template = ConfigTemplateBuilder::new().with_alpha_size(8);
        let samples = config.window.samples;

        let display_builder = DisplayBuilder::new().with_window_builder(Some(window_builder));
        let (window, gl_config) = display_builder
            .build(event_loop, template, |configs| pick_config(configs, samples))
            .map_err(|e| InitError::Window(e.to_string()))?;

        let window = window.ok_or_else(|| InitError::Window("no window was created".to_string()))?;
        let raw_window_handle = window.raw_window_handle();
        debug!("Picked GL config with {} samples", gl_config.num_samples());

        let [major, minor] = config.render.gl_version;
        let context_attributes = ContextAttributesBuilder::new()
            .with_context_api(ContextApi::OpenGl(Some(Version::new(major, minor))))
            .with_profile(GlProfile::Compatibility)
            .build(Some(raw_window_handle));

        let gl_display = gl_config.display();

        let not_current = unsafe { gl_display.create_context(&gl_config, &context_attributes) }
            .map_err(|e| InitError::Context(e.to_string()))?;

        let attrs = window.build_surface_attributes(<_>::default());
        let gl_surface = unsafe { gl_display.create_window_surface(&gl_config, &attrs) }
            .map_err(|e| InitError::Surface(e.to_string()))?;

        let gl_context = not_current
            .make_current(&gl_surface)
            .map_err(|e| InitError::Context(e.to_string()))?;

        if config.window.vsync {
            if let Err(e) = gl_surface.set_swap_interval(&gl_context, SwapInterval::Wait(NonZeroU32::MIN)) {
                warn!("Failed to enable vsync: {}", e);
            }
        }

        // Load OpenGL functions
        let backend = GlBackend::load(|symbol| match CString::new(symbol) {
            Ok(symbol) => gl_display.get_proc_address(symbol.as_c_str()) as *const _,
            Err(_) => ptr::null(),
        });

        if !backend.is_loaded() {
            error!("OpenGL functions not loaded");
        }
        info!("OpenGL {}", backend.version().unwrap_or_else(|| "unknown".to_string()));
        if let Some(renderer) = backend.renderer() {
            info!("Renderer: {}", renderer);
        }

        let size = window.inner_size();
        backend.viewport(size.width as i32, size.height as i32);

        let renderer = match Self::create_renderer(config, backend) {
            Ok(renderer) => Some(renderer),
            Err(e) => {
                error!("{:#}", e);
                backend.set_clear_color(config.render.clear_color);
                None
            }
        };

        Ok(Self {
            window,
            gl_context,
            gl_surface,
            backend,
            renderer,
        })
    }

    fn create_renderer(config: &AppConfig, backend: GlBackend) -> anyhow::Result<Renderer<GlBackend>> {
        use anyhow::Context;

        let source = ShaderProgramSource::from_file(&config.shader_path)?;
        Renderer::new(backend, &config.render, &source)
            .with_context(|| format!("Failed to build shader program from {:?}", config.shader_path))
    }

    fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::CloseRequested => true,
            WindowEvent::Resized(size) => {
                if let (Some(width), Some(height)) = (NonZeroU32::new(size.width), NonZeroU32::new(size.height)) {
                    self.gl_surface.resize(&self.gl_context, width, height);
                    match &self.renderer {
                        Some(renderer) => renderer.resize(size.width, size.height),
                        None => self.backend.viewport(size.width as i32, size.height as i32),
                    }
                }
                false
            }
            WindowEvent::RedrawRequested => {
                self.draw_frame();
                false
            }
            _ => false,
        }
    }

    fn draw_frame(&self) {
        match &self.renderer {
            Some(renderer) => renderer.render_frame(),
            None => self.backend.clear_color_buffer(),
        }

        if let Err(e) = self.gl_surface.swap_buffers(&self.gl_context) {
            error!("Failed to swap buffers: {}", e);
        }
    }

    fn cleanup(&mut self) {
        // GL objects go while the context is still current
        if let Err(e) = self.gl_context.make_current(&self.gl_surface) {
            warn!("Failed to make context current for cleanup: {}", e);
        }
        self.renderer = None;
    }
}

/// Prefers the config closest to the requested sample count without going over.
fn pick_config(configs: Box<dyn Iterator<Item = Config> + '_>, samples: u8) -> Config {
    closest_samples(configs, |config| config.num_samples(), samples)
        .expect("glutin offers at least one config")
}

fn closest_samples<T, I, F>(items: I, samples_of: F, requested: u8) -> Option<T>
where
    I: Iterator<Item = T>,
    F: Fn(&T) -> u8,
{
    items.reduce(|best, item| {
        if sample_score(samples_of(&item), requested) > sample_score(samples_of(&best), requested) {
            item
        } else {
            best
        }
    })
}

fn sample_score(available: u8, requested: u8) -> (bool, i16) {
    if available <= requested {
        (true, available as i16)
    } else {
        (false, -(available as i16))
    }
}

fn main() {
    let config = AppConfig::load_or_default();
    let level = config
        .as_ref()
        .ok()
        .and_then(|config| config.log_level_filter().ok())
        .unwrap_or(LevelFilter::Info);
    if let Err(e) = SimpleLogger::new().with_level(level).init() {
        eprintln!("Failed to initialize logger: {}", e);
    }

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            process::exit(-1);
        }
    };
    match &config.source {
        Some(path) => info!("Loaded config from {:?}", path),
        None => info!("Using default config"),
    }

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            error!("{}", InitError::EventLoop(e.to_string()));
            process::exit(-1);
        }
    };

    let mut app = match App::new(&config, &event_loop) {
        Ok(app) => app,
        Err(e) => {
            error!("{}", e);
            process::exit(-1);
        }
    };

    let result = event_loop.run(move |event, elwt| match event {
        Event::WindowEvent { event, .. } => {
            if app.handle_window_event(&event) {
                info!("Close requested, shutting down");
                app.cleanup();
                elwt.exit();
            }
        }
        Event::AboutToWait => {
            app.window.request_redraw();
        }
        _ => (),
    });

    if let Err(e) = result {
        error!("Event loop error: {}", e);
        process::exit(-1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_score_prefers_requested() {
        let mut offered = [0u8, 8, 4, 2, 16];
        offered.sort_by_key(|&n| sample_score(n, 4));
        assert_eq!(offered.last(), Some(&4));
    }

    #[test]
    fn test_sample_score_all_above_request() {
        let best = closest_samples([16u8, 8].into_iter(), |&n| n, 4);
        assert_eq!(best, Some(8));
    }

    #[test]
    fn test_closest_samples() {
        assert_eq!(closest_samples([0u8, 8, 4, 2, 16].into_iter(), |&n| n, 4), Some(4));
        assert_eq!(closest_samples([0u8, 2].into_iter(), |&n| n, 4), Some(2));
        assert_eq!(closest_samples(std::iter::empty::<u8>(), |&n| n, 4), None);
    }
}
