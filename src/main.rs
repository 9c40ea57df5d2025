use std::sync::Arc;

use clap::Parser;
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use space_scene::camera::Camera;
use space_scene::cli::Cli;
use space_scene::core::{wheel_delta_pixels, Clock, WinitController};
use space_scene::renderer::Renderer;
use space_scene::scenes::create_portfolio_scene;
use space_scene::state::AppState;

// === Constants ===

const FPS_UPDATE_INTERVAL: f32 = 1.0;
const INITIAL_WINDOW_WIDTH: u32 = 1280;
const INITIAL_WINDOW_HEIGHT: u32 = 720;
const CAMERA_FOV_DEGREES: f32 = 75.0;

// === Type Aliases ===

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

// === Application ===

struct App {
    cli: Cli,
    window: Option<Arc<Window>>,
    renderer: Option<Renderer>,
    state: AppState,
    input: WinitController,
    clock: Clock,
    frame_count: u32,
    fps: f32,
    fps_update_timer: f32,
}

impl App {
    fn new(cli: Cli) -> Self {
        let (scene, handles) = create_portfolio_scene(&cli.assets);
        let camera = Camera::new(
            CAMERA_FOV_DEGREES,
            INITIAL_WINDOW_WIDTH as f32 / INITIAL_WINDOW_HEIGHT as f32,
        );

        Self {
            cli,
            window: None,
            renderer: None,
            state: AppState::new(scene, camera, handles),
            input: WinitController::new(),
            clock: Clock::new(),
            frame_count: 0,
            fps: 0.0,
            fps_update_timer: 0.0,
        }
    }

    fn update_fps(&mut self, delta: f32) {
        self.frame_count += 1;
        self.fps_update_timer += delta;

        if self.fps_update_timer >= FPS_UPDATE_INTERVAL {
            self.fps = self.frame_count as f32 / self.fps_update_timer;
            if !self.cli.no_ui {
                println!("FPS: {:.1}", self.fps);
            }
            self.frame_count = 0;
            self.fps_update_timer = 0.0;
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            let window = match event_loop.create_window(
                Window::default_attributes()
                    .with_title("Space Scene")
                    .with_inner_size(winit::dpi::LogicalSize::new(
                        INITIAL_WINDOW_WIDTH,
                        INITIAL_WINDOW_HEIGHT,
                    )),
            ) {
                Ok(w) => Arc::new(w),
                Err(e) => {
                    eprintln!("Failed to create window: {}", e);
                    event_loop.exit();
                    return;
                }
            };

            let renderer = match pollster::block_on(Renderer::new(
                window.clone(),
                &self.state.scene,
                self.cli.no_ui,
            )) {
                Ok(r) => r,
                Err(e) => {
                    eprintln!("Failed to initialize renderer: {}", e);
                    event_loop.exit();
                    return;
                }
            };

            let size = window.inner_size();
            self.state.camera.set_aspect(size.width, size.height);

            self.window = Some(window);
            self.renderer = Some(renderer);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        // Let egui handle the event first
        if let (Some(renderer), Some(window)) = (&mut self.renderer, &self.window) {
            if renderer.handle_event(window, &event) {
                return; // egui consumed the event
            }
        }

        self.input.process_event(&event);

        match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        ..
                    },
                ..
            } => event_loop.exit(),
            WindowEvent::MouseWheel { delta, .. } => {
                // One wheel event = one scroll event, so the per-event mesh
                // nudges fire at the same cadence the mapping expects.
                self.state.scroll_by(wheel_delta_pixels(&delta));
            }
            WindowEvent::Resized(size) => {
                self.state.camera.set_aspect(size.width, size.height);
                if let Some(renderer) = &mut self.renderer {
                    renderer.resize(size);
                }
            }
            WindowEvent::RedrawRequested => {
                let delta = self.clock.tick();
                self.update_fps(delta);

                let (rotate, dolly) = self.input.orbit_deltas();
                self.state.advance_frame(rotate, dolly);
                self.input.reset_deltas();

                if let (Some(renderer), Some(window)) = (&mut self.renderer, &self.window) {
                    match renderer.render(&self.state, window, self.fps) {
                        Ok(()) => {}
                        Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                            renderer.reconfigure();
                        }
                        Err(wgpu::SurfaceError::OutOfMemory) => {
                            eprintln!("Out of GPU memory");
                            event_loop.exit();
                        }
                        Err(e) => eprintln!("Render error: {}", e),
                    }
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let event_loop = EventLoop::new()?;
    let mut app = App::new(cli.clone());

    if !cli.no_ui {
        println!("Space Scene - Controls: wheel to scroll, drag to orbit, Escape to quit");
    }
    event_loop.run_app(&mut app)?;

    Ok(())
}
