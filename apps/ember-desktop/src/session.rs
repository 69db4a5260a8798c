use anyhow::{Context, Result};
use ember_assets::{SceneDescription, load_scene};
use ember_input::Action;
use ember_kernel::{CameraDirector, FrameClock, Scene};
use ember_render::{DeferredRenderer, FrameStats, RenderBackend, RendererConfig};
use std::time::Instant;

/// Everything one running scene needs between frames.
pub struct Session<B: RenderBackend> {
    scene: Scene,
    director: CameraDirector,
    clock: FrameClock,
    renderer: DeferredRenderer<B>,
}

impl<B: RenderBackend> Session<B> {
    /// Build and awake the described scene on `backend`, then initialize the
    /// renderer against it.
    pub fn start(description: &SceneDescription, config: RendererConfig, mut backend: B) -> Result<Self> {
        let built = load_scene(description, &mut backend).context("loading scene")?;
        let director = CameraDirector::from_scene(&built.scene);
        if director.active().is_none() {
            anyhow::bail!("scene has no camera");
        }
        let mut renderer = DeferredRenderer::new(backend, config);
        renderer
            .initialize(&built.scene)
            .context("initializing renderer")?;
        tracing::info!(
            entities = built.scene.len(),
            cameras = director.cameras().len(),
            "session started"
        );
        Ok(Self {
            scene: built.scene,
            director,
            clock: FrameClock::new(),
            renderer,
        })
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn director(&self) -> &CameraDirector {
        &self.director
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    pub fn renderer(&self) -> &DeferredRenderer<B> {
        &self.renderer
    }

    /// Advance the clock and draw one frame from the active camera.
    pub fn frame(&mut self) -> Result<FrameStats> {
        self.frame_at(Instant::now())
    }

    pub fn frame_at(&mut self, now: Instant) -> Result<FrameStats> {
        self.clock.tick_at(now);
        let camera = self
            .director
            .active_camera(&self.scene)
            .context("active camera vanished")?;
        Ok(self.renderer.render_frame(&self.scene, camera, &self.clock)?)
    }

    /// Apply an operator action. Camera motion is a rate, scaled by the last
    /// frame's delta, so the time multiplier speeds it up or slows it down.
    pub fn apply(&mut self, action: Action) -> Result<()> {
        match action.scaled(self.clock.delta()) {
            Action::AdvanceRenderMode => {
                let mode = self.renderer.advance_render_mode()?;
                tracing::info!(?mode, "render mode");
            }
            Action::AdvanceMrtMode => {
                let mode = self.renderer.advance_mrt_mode()?;
                tracing::info!(?mode, "mrt mode");
            }
            Action::SelectCamera(index) => {
                self.director.select(index);
            }
            Action::SpeedUp => {
                self.clock.speed_up();
            }
            Action::SlowDown => {
                self.clock.slow_down();
            }
            Action::MoveCamera(delta) => {
                let notified = self.director.move_active(&mut self.scene, delta)?;
                tracing::trace!(?delta, notified, "camera moved");
            }
            Action::RotateCamera(angles) => {
                self.director.rotate_active(&mut self.scene, angles)?;
            }
            Action::Noop => {}
        }
        Ok(())
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.director.resize(&mut self.scene, width, height);
        self.renderer.resize(width, height)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_input::{Key, KeyBindings};
    use ember_render::{MrtMode, RecordingBackend, RenderMode};
    use glam::Vec3;
    use std::time::Duration;

    const YARD: &str = include_str!("../../../scenes/yard.json");

    fn session() -> Session<RecordingBackend> {
        let description = SceneDescription::from_json(YARD).unwrap();
        let config = description.renderer_config();
        Session::start(&description, config, RecordingBackend::new(1280, 720)).unwrap()
    }

    fn position(scene: &Scene, name: &str) -> Vec3 {
        let entity = scene.entities().find(|e| e.name() == name).unwrap();
        scene.world_position(entity.id()).unwrap()
    }

    #[test]
    fn sample_scene_renders() {
        let mut session = session();
        let stats = session.frame().unwrap();
        assert_eq!(stats.geometry_draws, 4);
        assert_eq!(stats.shadow_draws, 8);
        assert_eq!(stats.particle_draws, 1);
        assert_eq!(session.director().cameras().len(), 2);
    }

    #[test]
    fn display_keys_cycle_modes() {
        let mut session = session();
        let bindings = KeyBindings::default();
        session.apply(bindings.resolve(Key::F1)).unwrap();
        assert_eq!(session.renderer().render_mode(), RenderMode::default().next());
        session.apply(bindings.resolve(Key::F2)).unwrap();
        assert_eq!(session.renderer().mrt_mode(), MrtMode::default().next());
        session.frame().unwrap();
    }

    /// Run two frames `gap` apart so the clock holds a known delta.
    fn settle(session: &mut Session<RecordingBackend>, gap: Duration) {
        let t0 = Instant::now();
        session.frame_at(t0).unwrap();
        session.frame_at(t0 + gap).unwrap();
    }

    fn moved_by(multiplier_steps: usize) -> f32 {
        let mut session = session();
        for _ in 0..multiplier_steps {
            session.apply(Action::SpeedUp).unwrap();
            std::thread::sleep(FrameClock::DEBOUNCE + Duration::from_millis(4));
        }
        settle(&mut session, Duration::from_millis(100));
        let before = position(session.scene(), "overview");
        session.apply(Action::MoveCamera(Vec3::X)).unwrap();
        (position(session.scene(), "overview") - before).x
    }

    #[test]
    fn movement_is_scaled_by_frame_time() {
        let mut session = session();
        settle(&mut session, Duration::from_millis(250));
        let delta = session.clock().delta();
        assert!((delta - 0.25).abs() < 1e-4);

        let before = position(session.scene(), "overview");
        session.apply(Action::MoveCamera(Vec3::new(2.0, 0.0, 0.0))).unwrap();
        let moved = position(session.scene(), "overview") - before;
        assert!(moved.abs_diff_eq(Vec3::new(2.0 * delta, 0.0, 0.0), 1e-5));
    }

    #[test]
    fn multiplier_changes_camera_speed() {
        let normal = moved_by(0);
        let faster = moved_by(2);
        assert!((normal - 0.1).abs() < 1e-4);
        assert!((faster - 0.12).abs() < 1e-4);
    }

    #[test]
    fn motion_before_the_first_frame_is_still() {
        let mut session = session();
        let before = position(session.scene(), "overview");
        session.apply(Action::MoveCamera(Vec3::X)).unwrap();
        assert_eq!(position(session.scene(), "overview"), before);
    }

    #[test]
    fn arrow_keys_turn_the_active_camera() {
        let mut session = session();
        settle(&mut session, Duration::from_millis(500));
        let view_before = session.director().active_camera(session.scene()).unwrap().view();
        session.apply(KeyBindings::default().resolve(Key::Right)).unwrap();
        let camera = session.director().active_camera(session.scene()).unwrap();
        assert_ne!(camera.view(), view_before);
        let id = session.director().active().unwrap();
        let turned = session.scene().transform(id).unwrap().local_orientation();
        assert!((turned.y - 0.5).abs() < 1e-4);
    }

    #[test]
    fn camera_selection_and_time() {
        let mut session = session();
        session.apply(Action::SelectCamera(1)).unwrap();
        assert_eq!(session.director().active_index(), 1);
        session.apply(Action::SelectCamera(7)).unwrap();
        assert_eq!(session.director().active_index(), 1);
        session.apply(Action::SpeedUp).unwrap();
        assert!(session.clock().multiplier() > 1.0);
        session.frame().unwrap();
    }

    #[test]
    fn zero_sized_resize_is_ignored() {
        let mut session = session();
        session.resize(0, 0).unwrap();
        assert_eq!(session.renderer().config().width, 1280);
        session.resize(640, 480).unwrap();
        assert_eq!(session.renderer().config().width, 640);
    }

    #[test]
    fn scene_without_camera_is_rejected() {
        let description = SceneDescription::from_json(r#"{ "entities": [] }"#).unwrap();
        let result = Session::start(&description, RendererConfig::default(), RecordingBackend::new(64, 64));
        assert!(result.is_err());
    }
}
