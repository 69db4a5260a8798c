mod session;

use anyhow::Result;
use clap::Parser;
use ember_assets::SceneDescription;
use ember_input::{Key, KeyBindings};
use ember_render::RendererConfig;
use ember_render_wgpu::{BackendSettings, WgpuBackend};
use session::Session;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

#[derive(Parser)]
#[command(name = "ember-desktop", about = "Run a scene through the deferred renderer")]
struct Cli {
    /// Scene description to load
    #[arg(default_value = "scenes/yard.json")]
    scene: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Window width, overriding the scene's renderer section
    #[arg(long)]
    width: Option<u32>,

    /// Window height, overriding the scene's renderer section
    #[arg(long)]
    height: Option<u32>,

    /// Camera speed in world units per second of scaled time
    #[arg(long, default_value = "8.0")]
    move_step: f32,

    /// Camera turn rate in radians per second of scaled time
    #[arg(long, default_value = "1.5")]
    turn_step: f32,
}

fn key_of(code: KeyCode) -> Option<Key> {
    let key = match code {
        KeyCode::F1 => Key::F1,
        KeyCode::F2 => Key::F2,
        KeyCode::Digit0 => Key::Digit(0),
        KeyCode::Digit1 => Key::Digit(1),
        KeyCode::Digit2 => Key::Digit(2),
        KeyCode::Digit3 => Key::Digit(3),
        KeyCode::Digit4 => Key::Digit(4),
        KeyCode::Digit5 => Key::Digit(5),
        KeyCode::Digit6 => Key::Digit(6),
        KeyCode::Digit7 => Key::Digit(7),
        KeyCode::Digit8 => Key::Digit(8),
        KeyCode::Digit9 => Key::Digit(9),
        KeyCode::Equal | KeyCode::NumpadAdd => Key::Plus,
        KeyCode::Minus | KeyCode::NumpadSubtract => Key::Minus,
        KeyCode::KeyW => Key::W,
        KeyCode::KeyA => Key::A,
        KeyCode::KeyS => Key::S,
        KeyCode::KeyD => Key::D,
        KeyCode::KeyQ => Key::Q,
        KeyCode::KeyE => Key::E,
        KeyCode::ArrowUp => Key::Up,
        KeyCode::ArrowDown => Key::Down,
        KeyCode::ArrowLeft => Key::Left,
        KeyCode::ArrowRight => Key::Right,
        _ => return None,
    };
    Some(key)
}

struct App {
    description: SceneDescription,
    config: RendererConfig,
    bindings: KeyBindings,
    window: Option<Arc<Window>>,
    session: Option<Session<WgpuBackend>>,
    failure: Option<anyhow::Error>,
}

impl App {
    fn new(description: SceneDescription, config: RendererConfig, bindings: KeyBindings) -> Self {
        Self {
            description,
            config,
            bindings,
            window: None,
            session: None,
            failure: None,
        }
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title("Ember")
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height));
        let window = Arc::new(event_loop.create_window(attrs)?);

        let size = window.inner_size();
        self.config.width = size.width.max(1);
        self.config.height = size.height.max(1);
        let backend = WgpuBackend::with_surface(window.clone(), BackendSettings::from_config(&self.config))?;
        if !backend.supports_wireframe() {
            tracing::warn!("adapter lacks line polygon mode; wireframe draws solid");
        }
        self.session = Some(Session::start(&self.description, self.config.clone(), backend)?);
        self.window = Some(window);
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        tracing::error!("{error:#}");
        self.failure = Some(error);
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.start(event_loop) {
            self.fail(event_loop, e);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let Some(session) = &mut self.session else {
            return;
        };
        let outcome = match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
                Ok(())
            }
            WindowEvent::Resized(size) => session.resize(size.width, size.height),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => match key_of(code) {
                Some(key) => session.apply(self.bindings.resolve(key)),
                None => Ok(()),
            },
            WindowEvent::RedrawRequested => session.frame().map(|stats| {
                tracing::trace!(?stats, "frame");
            }),
            _ => Ok(()),
        };
        if let Err(e) = outcome {
            self.fail(event_loop, e);
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    tracing::info!(scene = %cli.scene.display(), "ember-desktop starting");
    let description = SceneDescription::load(&cli.scene)?;
    let mut config = description.renderer_config();
    if let Some(width) = cli.width {
        config.width = width;
    }
    if let Some(height) = cli.height {
        config.height = height;
    }
    let bindings = KeyBindings::default()
        .with_move_step(cli.move_step)
        .with_turn_step(cli.turn_step);

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(description, config, bindings);
    event_loop.run_app(&mut app)?;

    match app.failure {
        Some(error) => Err(error),
        None => Ok(()),
    }
}
