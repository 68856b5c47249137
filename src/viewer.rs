//! The viewer ties controls, scene and renderer together and owns the
//! frame loop. It has no window of its own, so headless export and tests
//! drive it directly.

use crate::assets::TextureSet;
use crate::config::ViewerConfig;
use crate::controls::{BindingOutput, ControlBinding, ControlError, ControlId, ControlValue};
use crate::encoding::screenshot_file_name;
use crate::render::{save_png, ExportError, RenderSettings, SoftwareRenderer};
use crate::scene::{SceneGraph, SceneTarget};
use image::RgbaImage;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Where an exported screenshot goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportTarget {
    /// Write `<directory>/<encoded camera state>.png`.
    Directory(PathBuf),
    /// Write to exactly this path.
    File(PathBuf),
}

struct CachedFrame {
    revision: u64,
    size: (u32, u32),
    image: RgbaImage,
}

pub struct Viewer {
    config: ViewerConfig,
    scene: SceneGraph,
    controls: ControlBinding,
    renderer: SoftwareRenderer,
    viewport: (u32, u32),
    frame: Option<CachedFrame>,
    frames_rendered: u64,
}

impl Viewer {
    pub fn new(config: ViewerConfig, textures: Arc<TextureSet>) -> Self {
        let mut scene = SceneGraph::new(&config, textures);
        let mut controls = ControlBinding::new(&config.initial, &config.latitude);
        scene.apply_all(&controls.sync_all());
        let renderer = SoftwareRenderer::new(RenderSettings::from_config(&config));
        let viewport = config.viewport.initial_size();
        log::info!(
            "Viewer ready: {}x{} viewport, sphere radius {}",
            viewport.0,
            viewport.1,
            config.sphere_radius
        );
        Self {
            config,
            scene,
            controls,
            renderer,
            viewport,
            frame: None,
            frames_rendered: 0,
        }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn controls(&self) -> &ControlBinding {
        &self.controls
    }

    /// Scene resolution in pixels.
    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// Updates one control and applies its binding. `None` when the control is
    /// not offered or the value was rejected.
    pub fn set_control(&mut self, id: ControlId, value: ControlValue) -> Option<BindingOutput> {
        let output = self.controls.set(id, value)?;
        self.scene.apply_all(&output.mutations);
        Some(output)
    }

    /// Applies a `name=value` assignment such as `camera.radius=4500`.
    pub fn apply_assignment(&mut self, text: &str) -> Result<BindingOutput, ControlError> {
        let (id, value) = self.controls.parse_assignment(text)?;
        self.set_control(id, value).ok_or(ControlError::NotOffered(id))
    }

    /// Follows the window size when the viewport tracks it.
    pub fn resize_window(&mut self, width: u32, height: u32) {
        let size = self.config.viewport.scene_size(width, height);
        if size != self.viewport {
            self.viewport = size;
            self.scene.set_viewport_aspect(size.0, size.1);
            log::debug!("Scene viewport {}x{}", size.0, size.1);
        }
    }

    /// Renders exactly one frame of the current scene at `scale` times the
    /// viewport resolution.
    pub fn render_frame(&mut self, scale: f32) -> &RgbaImage {
        let frame = self.draw(scaled(self.viewport, scale));
        &self.frame.insert(frame).image
    }

    /// The last frame if it still matches the scene, otherwise a new one.
    pub fn current_frame(&mut self, scale: f32) -> &RgbaImage {
        let size = scaled(self.viewport, scale);
        let revision = self.scene.revision();
        let frame = match self.frame.take() {
            Some(frame) if frame.revision == revision && frame.size == size => frame,
            _ => self.draw(size),
        };
        &self.frame.insert(frame).image
    }

    fn draw(&mut self, size: (u32, u32)) -> CachedFrame {
        let image = self.renderer.render(&self.scene, size.0, size.1);
        self.frames_rendered += 1;
        CachedFrame {
            revision: self.scene.revision(),
            size,
            image,
        }
    }

    pub fn screenshot_file_name(&self) -> String {
        let light = self.controls.light();
        screenshot_file_name(&self.scene.camera.pose(), light.longitude, light.latitude)
    }

    /// Renders a full-resolution frame of the current state, then writes it as PNG.
    pub fn export_screenshot(&mut self, target: &ExportTarget) -> Result<PathBuf, ExportError> {
        let path = match target {
            ExportTarget::Directory(dir) => dir.join(self.screenshot_file_name()),
            ExportTarget::File(path) => path.clone(),
        };
        let image = self.render_frame(1.0);
        save_png(&path, image)?;
        log::info!("Screenshot saved to {}", path.display());
        Ok(path)
    }
}

fn scaled((width, height): (u32, u32), scale: f32) -> (u32, u32) {
    let scale = if scale.is_finite() { scale.clamp(0.05, 1.0) } else { 1.0 };
    (
        ((width as f32 * scale).round() as u32).max(1),
        ((height as f32 * scale).round() as u32).max(1),
    )
}

/// Raised once to stop the frame loop.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal(Arc<AtomicBool>);

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Cooperative frame scheduler. Hands out frame indices until shutdown is raised;
/// the caller draws one frame per index.
pub struct FrameLoop {
    shutdown: ShutdownSignal,
    frame_index: u64,
}

impl FrameLoop {
    pub fn new(shutdown: ShutdownSignal) -> Self {
        Self {
            shutdown,
            frame_index: 0,
        }
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Index of the frame to draw next, or `None` once shutdown was requested.
    pub fn next_frame(&mut self) -> Option<u64> {
        if self.shutdown.is_raised() {
            return None;
        }
        let index = self.frame_index;
        self.frame_index += 1;
        Some(index)
    }
}

#[cfg(test)]
mod tests {
    use super::{ExportTarget, FrameLoop, ShutdownSignal, Viewer};
    use crate::assets::TextureSet;
    use crate::config::{ViewerConfig, ViewportMode};
    use crate::controls::{ControlId, ControlValue};
    use glam::DVec3;
    use std::sync::Arc;

    fn small_config() -> ViewerConfig {
        ViewerConfig {
            viewport: ViewportMode::Fixed { size: 24 },
            ..ViewerConfig::default()
        }
    }

    fn viewer() -> Viewer {
        Viewer::new(small_config(), Arc::new(TextureSet::neutral()))
    }

    fn temp_dir(tag: &str) -> std::path::PathBuf {
        let nonce = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("moonviz_{}_{}_{}", tag, std::process::id(), nonce))
    }

    #[test]
    fn initial_scene_matches_initial_controls() {
        let viewer = viewer();
        let camera = &viewer.scene().camera;
        assert!((camera.position - DVec3::new(3000.0, 0.0, 0.0)).length() < 1e-9);
        assert!((camera.world_direction() - DVec3::NEG_X).length() < 1e-12);
        assert_eq!(viewer.scene().light.intensity, 5.0);
        assert!((viewer.scene().light.direction() - DVec3::X).length() < 1e-12);
        assert!(!viewer.controls().rotation_controls_enabled());
    }

    #[test]
    fn same_camera_state_twice_is_bit_identical() {
        let mut viewer = viewer();
        viewer.set_control(ControlId::CameraLongitude, ControlValue::Number(41.5));
        let first = (viewer.scene().camera.position, viewer.scene().camera.quaternion());
        viewer.set_control(ControlId::CameraLongitude, ControlValue::Number(41.5));
        let second = (viewer.scene().camera.position, viewer.scene().camera.quaternion());
        assert_eq!(first, second);
    }

    #[test]
    fn look_at_mode_ignores_stored_rotation() {
        let mut viewer = viewer();
        viewer.set_control(ControlId::CameraRotationX, ControlValue::Number(60.0));
        viewer.set_control(ControlId::CameraLatitude, ControlValue::Number(30.0));
        let camera = &viewer.scene().camera;
        let to_origin = (-camera.position).normalize();
        assert!((camera.world_direction() - to_origin).length() < 1e-9);
    }

    #[test]
    fn toggling_look_at_round_trips_rotation_state() {
        let mut viewer = viewer();
        viewer.set_control(ControlId::CameraRotationZ, ControlValue::Number(15.0));

        let off = viewer
            .set_control(ControlId::CameraLookAtCenter, ControlValue::Toggle(false))
            .unwrap();
        assert_eq!(off.rotation_controls_enabled, Some(true));
        let expected = viewer.controls().camera().rotation_radians();
        assert!((viewer.scene().camera.rotation() - expected).length() < 1e-12);

        let on = viewer
            .set_control(ControlId::CameraLookAtCenter, ControlValue::Toggle(true))
            .unwrap();
        assert_eq!(on.rotation_controls_enabled, Some(false));
        assert_eq!(viewer.controls().camera().rotation_z, 15.0);
        assert_eq!(viewer.controls().camera().rotation_y, 90.0);
    }

    #[test]
    fn assignments_go_through_control_bounds() {
        let mut viewer = viewer();
        viewer.apply_assignment("camera.radius=99999").unwrap();
        assert_eq!(viewer.controls().camera().radius, 10_000.0);
        assert!(viewer.apply_assignment("camera.zoom=2").is_err());
    }

    #[test]
    fn current_frame_is_reused_until_scene_changes() {
        let mut viewer = viewer();
        viewer.current_frame(1.0);
        viewer.current_frame(1.0);
        assert_eq!(viewer.frames_rendered(), 1);
        viewer.set_control(ControlId::LightIntensity, ControlValue::Number(2.0));
        viewer.current_frame(1.0);
        assert_eq!(viewer.frames_rendered(), 2);
        assert_eq!(viewer.current_frame(0.5).dimensions(), (12, 12));
    }

    #[test]
    fn export_renders_then_writes_named_png() {
        let mut viewer = viewer();
        let dir = temp_dir("export");
        let before = viewer.frames_rendered();

        let path = viewer.export_screenshot(&ExportTarget::Directory(dir.clone())).unwrap();

        assert_eq!(viewer.frames_rendered(), before + 1);
        let name = path.file_name().unwrap().to_str().unwrap().to_string();
        assert_eq!(name, viewer.screenshot_file_name());
        assert!(name.ends_with(".png"));
        assert_eq!(name.trim_end_matches(".png").split('_').count(), 11);
        let written = image::open(&path).unwrap();
        assert_eq!((written.width(), written.height()), (24, 24));

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn window_viewport_tracks_resizes() {
        let config = ViewerConfig {
            viewport: ViewportMode::Window,
            ..ViewerConfig::default()
        };
        let mut viewer = Viewer::new(config, Arc::new(TextureSet::neutral()));
        viewer.resize_window(300, 100);
        assert_eq!(viewer.viewport(), (300, 100));
        assert!((viewer.scene().camera.aspect - 3.0).abs() < 1e-12);
    }

    #[test]
    fn frame_loop_runs_until_shutdown() {
        let shutdown = ShutdownSignal::new();
        let mut frame_loop = FrameLoop::new(shutdown.clone());
        let mut seen = Vec::new();
        while let Some(index) = frame_loop.next_frame() {
            seen.push(index);
            if index == 2 {
                shutdown.raise();
            }
        }
        assert_eq!(seen, vec![0, 1, 2]);
        assert_eq!(frame_loop.frame_index(), 3);
        assert_eq!(frame_loop.next_frame(), None);
    }
}
