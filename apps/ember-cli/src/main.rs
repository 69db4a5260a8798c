use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ember_assets::{BuiltScene, SceneDescription, load_scene};
use ember_ecs::{ComponentKind, ComponentMask};
use ember_input::KeyBindings;
use ember_kernel::{CameraDirector, FrameClock};
use ember_render::{DeferredRenderer, MrtMode, RecordingBackend, RenderMode, RendererConfig};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ember-cli", about = "Headless tooling for ember scenes")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print engine version and crate info
    Info,
    /// Load a scene, awake it and initialize the renderer against it
    Validate {
        /// Scene description
        scene: PathBuf,
    },
    /// Record one frame and print every backend command
    Frame {
        /// Scene description
        scene: PathBuf,
        /// Times to advance the render mode first
        #[arg(long, default_value = "0")]
        render_steps: usize,
        /// Times to advance the MRT mode first
        #[arg(long, default_value = "0")]
        mrt_steps: usize,
        /// Index of the camera to draw from
        #[arg(long, default_value = "0")]
        camera: usize,
        /// Print draws only
        #[arg(long)]
        draws: bool,
    },
    /// Walk the render mode and MRT mode rings
    Modes,
    /// List the default key bindings
    Keys,
    /// Print the default renderer configuration as JSON
    Config,
}

/// An awake scene with an initialized renderer recording into memory.
struct Prepared {
    built: BuiltScene,
    director: CameraDirector,
    renderer: DeferredRenderer<RecordingBackend>,
}

fn prepare(path: &Path) -> Result<Prepared> {
    let description = SceneDescription::load(path).with_context(|| format!("reading {}", path.display()))?;
    let config = description.renderer_config();
    let mut backend = RecordingBackend::new(config.width, config.height);
    let built = load_scene(&description, &mut backend)?;
    let director = CameraDirector::from_scene(&built.scene);
    let mut renderer = DeferredRenderer::new(backend, config);
    renderer.initialize(&built.scene)?;
    tracing::info!(
        scene = %path.display(),
        entities = built.scene.len(),
        cameras = director.cameras().len(),
        "scene prepared"
    );
    Ok(Prepared {
        built,
        director,
        renderer,
    })
}

fn validate(path: &Path) -> Result<()> {
    let prepared = prepare(path)?;
    let scene = &prepared.built.scene;
    println!("scene: {}", path.display());
    println!("  entities:    {}", scene.len());
    println!("  cameras:     {}", prepared.director.cameras().len());
    println!("  renderables: {}", scene.filter(ComponentMask::RENDERABLE).len());
    println!("  emitters:    {}", scene.filter(ComponentMask::EMITTER).len());
    println!(
        "  meshes:      {} ({} textures)",
        prepared.built.library.mesh_count(),
        prepared.built.library.texture_count()
    );
    for &id in prepared.renderer.lights() {
        let name = scene.get(id).map_or("?", |e| e.name());
        println!("  light:       {name} ({id})");
    }
    if let Some(quads) = prepared.renderer.pass_quads() {
        println!(
            "  pass quads:  light {} / bright {} / blur {} / composite {}",
            quads.light, quads.bright, quads.blur, quads.composite
        );
    }
    for entity in scene.entities() {
        let kinds: Vec<&str> = entity
            .kinds()
            .filter(|k| *k != ComponentKind::None)
            .map(ComponentKind::name)
            .collect();
        println!("  {:>4} {:<16} {}", entity.id().to_string(), entity.name(), kinds.join(", "));
    }
    if prepared.director.cameras().is_empty() {
        tracing::warn!(scene = %path.display(), "scene has no camera; nothing can be drawn");
    }
    println!("OK");
    Ok(())
}

fn frame(path: &Path, render_steps: usize, mrt_steps: usize, camera: usize, draws_only: bool) -> Result<()> {
    let mut prepared = prepare(path)?;
    for _ in 0..render_steps {
        prepared.renderer.advance_render_mode()?;
    }
    for _ in 0..mrt_steps {
        prepared.renderer.advance_mrt_mode()?;
    }
    if !prepared.director.select(camera) {
        anyhow::bail!("scene has no camera {camera}");
    }
    prepared.renderer.backend_mut().clear_commands();
    tracing::debug!(render_steps, mrt_steps, camera, "recording one frame");

    let mut clock = FrameClock::new();
    clock.tick();
    let scene = &prepared.built.scene;
    let active = prepared
        .director
        .active_camera(scene)
        .context("scene has no camera")?;
    let stats = prepared.renderer.render_frame(scene, active, &clock)?;

    println!(
        "render mode: {} | mrt mode: {}",
        prepared.renderer.render_mode(),
        prepared.renderer.mrt_mode()
    );
    let backend = prepared.renderer.backend();
    if draws_only {
        for (i, draw) in backend.draws().iter().enumerate() {
            let program = draw.program.map_or("-", |p| p.name());
            println!(
                "{i:>4} {program:<22} {:?} count={} instances={}",
                draw.targets, draw.count, draw.instances
            );
        }
    } else {
        for (i, command) in backend.commands().iter().enumerate() {
            println!("{i:>5} {command}");
        }
    }
    println!(
        "geometry={} shadow={} particles={} post={} raw={}",
        stats.geometry_draws, stats.shadow_draws, stats.particle_draws, stats.post_draws, stats.raw_view
    );
    Ok(())
}

fn modes() {
    let mut mode = RenderMode::default();
    println!("render modes:");
    for _ in 0..RenderMode::ALL.len() {
        let flags = mode.state_flags();
        println!("  {mode:<32} textured={} displaced={}", flags.x, flags.y);
        mode = mode.next();
    }
    let mut mrt = MrtMode::default();
    println!("mrt modes:");
    for _ in 0..MrtMode::ALL.len() {
        let route = if mrt.routes_to_back_buffer() { "raw" } else { "post chain" };
        println!("  {:>2} {mrt:<16} {route}", mrt.index());
        mrt = mrt.next();
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("ember-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("ecs: {}", ember_ecs::crate_info());
            println!("kernel: {}", ember_kernel::crate_info());
            println!("render: {}", ember_render::crate_info());
            println!("render-wgpu: {}", ember_render_wgpu::crate_info());
            println!("input: {}", ember_input::crate_info());
            println!("assets: {}", ember_assets::crate_info());
            println!("shader programs: {}", ember_common::ShaderProgram::ALL.len());
        }
        Commands::Validate { scene } => validate(&scene)?,
        Commands::Frame {
            scene,
            render_steps,
            mrt_steps,
            camera,
            draws,
        } => frame(&scene, render_steps, mrt_steps, camera, draws)?,
        Commands::Modes => modes(),
        Commands::Keys => {
            for (key, action) in KeyBindings::default().iter() {
                println!("{key:>5}  {action:?}");
            }
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&RendererConfig::default())?);
        }
    }

    Ok(())
}
