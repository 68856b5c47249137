//! CPU renderer for the moon scene.
//!
//! Each pixel casts a perspective ray, marches the displaced shell in mesh
//! space and shades the hit with a single directional light. Rows are shaded
//! in parallel; the call returns once the whole frame is done.

mod egui_overlay;
mod shading;

pub use egui_overlay::EguiOverlay;

use crate::assets::TextureSet;
use crate::config::{ToneMapping, ViewerConfig};
use crate::scene::SceneGraph;
use glam::{DQuat, DVec3, Vec2, Vec3};
use image::RgbaImage;
use rayon::prelude::*;
use std::path::Path;

const MARCH_STEPS: u32 = 48;
const REFINE_STEPS: u32 = 8;
const BACKGROUND: [u8; 4] = [0, 0, 0, 255];

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed creating screenshot directory '{path}': {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed writing screenshot '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: image::ImageError,
    },
    #[error("frame is empty ({0}x{1})")]
    EmptyFrame(u32, u32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSettings {
    pub tone_mapping: ToneMapping,
    pub exposure: f32,
}

impl RenderSettings {
    pub fn from_config(config: &ViewerConfig) -> Self {
        Self {
            tone_mapping: config.tone_mapping,
            exposure: config.exposure,
        }
    }
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            tone_mapping: ToneMapping::AcesFilmic,
            exposure: 1.0,
        }
    }
}

/// Per-frame constants, all expressed in the mesh's local frame.
struct FrameSetup<'a> {
    origin: DVec3,
    to_local: DQuat,
    forward: DVec3,
    tan_half_fov: f64,
    aspect: f64,
    near: f64,
    far: f64,
    radius: f64,
    displacement_scale: f64,
    normal_scale: Vec2,
    light_dir: Vec3,
    radiance: Vec3,
    textures: &'a TextureSet,
}

impl FrameSetup<'_> {
    fn surface_radius(&self, point: DVec3) -> f64 {
        let (u, t) = shading::sphere_uv(point.normalize().as_vec3());
        self.radius + self.textures.displacement.sample(u, t) as f64 * self.displacement_scale
    }

    fn below_surface(&self, t: f64, dir: DVec3) -> bool {
        let point = self.origin + dir * t;
        point.length() <= self.surface_radius(point)
    }
}

/// Entry and exit distances of a ray against a sphere centered at the origin.
fn ray_sphere(origin: DVec3, dir: DVec3, radius: f64) -> Option<(f64, f64)> {
    let b = origin.dot(dir);
    let c = origin.length_squared() - radius * radius;
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let s = disc.sqrt();
    Some((-b - s, -b + s))
}

pub struct SoftwareRenderer {
    settings: RenderSettings,
}

impl SoftwareRenderer {
    pub fn new(settings: RenderSettings) -> Self {
        Self { settings }
    }

    pub fn render(&self, scene: &SceneGraph, width: u32, height: u32) -> RgbaImage {
        let width = width.max(1);
        let height = height.max(1);
        let mut frame = vec![0u8; (width as usize) * (height as usize) * 4];
        self.render_into(scene, &mut frame, width, height);
        RgbaImage::from_raw(width, height, frame)
            .unwrap_or_else(|| RgbaImage::from_pixel(width, height, image::Rgba(BACKGROUND)))
    }

    /// Shades `frame` (tightly packed RGBA8, `width * height * 4` bytes).
    pub fn render_into(&self, scene: &SceneGraph, frame: &mut [u8], width: u32, height: u32) {
        let setup = frame_setup(scene);
        frame
            .par_chunks_exact_mut((width * 4) as usize)
            .enumerate()
            .for_each(|(y, row)| {
                for x in 0..width {
                    let rgb = self.trace(&setup, x, y as u32, width, height);
                    let idx = (x * 4) as usize;
                    row[idx..idx + 4].copy_from_slice(&rgb);
                }
            });
    }

    fn trace(&self, setup: &FrameSetup<'_>, x: u32, y: u32, width: u32, height: u32) -> [u8; 4] {
        let ndc_x = 2.0 * (x as f64 + 0.5) / width as f64 - 1.0;
        let ndc_y = 1.0 - 2.0 * (y as f64 + 0.5) / height as f64;
        let view_dir = DVec3::new(
            ndc_x * setup.tan_half_fov * setup.aspect,
            ndc_y * setup.tan_half_fov,
            -1.0,
        );
        let dir = (setup.to_local * view_dir).normalize();
        let Some(t) = intersect(setup, dir) else {
            return BACKGROUND;
        };
        let depth = t * dir.dot(setup.forward);
        if depth < setup.near || depth > setup.far {
            return BACKGROUND;
        }
        let point = setup.origin + dir * t;
        let [r, g, b] = self.shade(setup, point.normalize().as_vec3());
        [r, g, b, 255]
    }

    fn shade(&self, setup: &FrameSetup<'_>, normal: Vec3) -> [u8; 3] {
        let (u, t) = shading::sphere_uv(normal);
        let albedo = setup.textures.albedo.sample(u, t);

        let mut perturb = setup.textures.normal.sample(u, t) * 2.0 - Vec3::ONE;
        perturb.x *= setup.normal_scale.x;
        perturb.y *= setup.normal_scale.y;
        let (tangent, bitangent) = shading::tangent_frame(u, t);
        let shading_normal =
            (tangent * perturb.x + bitangent * perturb.y + normal * perturb.z).normalize_or(normal);

        let n_dot_l = shading_normal.dot(setup.light_dir).max(0.0);
        let color = albedo * setup.radiance * n_dot_l / std::f32::consts::PI;
        shading::encode_srgb(shading::tone_map(
            color,
            self.settings.tone_mapping,
            self.settings.exposure,
        ))
    }
}

fn frame_setup(scene: &SceneGraph) -> FrameSetup<'_> {
    let to_mesh = scene.mesh.quaternion().inverse();
    let to_local = to_mesh * scene.camera.quaternion();
    let material = &scene.mesh.material;
    let [r, g, b] = scene.light.color;
    FrameSetup {
        origin: to_mesh * scene.camera.position,
        to_local,
        forward: to_local * DVec3::NEG_Z,
        tan_half_fov: (scene.camera.fov_deg.to_radians() * 0.5).tan(),
        aspect: scene.camera.aspect,
        near: scene.camera.near,
        far: scene.camera.far,
        radius: scene.mesh.radius,
        displacement_scale: material.displacement_scale,
        normal_scale: material.normal_scale.as_vec2(),
        light_dir: (to_mesh * scene.light.direction()).as_vec3(),
        radiance: Vec3::new(r, g, b) * scene.light.intensity as f32,
        textures: &material.textures,
    }
}

/// Nearest hit of `dir` (from the camera) with the displaced surface.
fn intersect(setup: &FrameSetup<'_>, dir: DVec3) -> Option<f64> {
    let relief = setup.displacement_scale.max(0.0);
    let (shell_in, shell_out) = ray_sphere(setup.origin, dir, setup.radius + relief)?;
    if shell_out < 0.0 {
        return None;
    }
    let base = ray_sphere(setup.origin, dir, setup.radius).filter(|(t0, _)| *t0 >= 0.0);
    if relief == 0.0 {
        return base.map(|(t0, _)| t0);
    }

    let start = shell_in.max(0.0);
    let end = match base {
        Some((t0, _)) if t0 > start => t0,
        _ => shell_out,
    };
    if setup.below_surface(start, dir) {
        return Some(start);
    }
    let step = (end - start) / MARCH_STEPS as f64;
    let mut prev = start;
    for i in 1..=MARCH_STEPS {
        let t = start + step * i as f64;
        if setup.below_surface(t, dir) {
            return Some(refine(setup, dir, prev, t));
        }
        prev = t;
    }
    base.map(|(t0, _)| t0)
}

fn refine(setup: &FrameSetup<'_>, dir: DVec3, mut outside: f64, mut inside: f64) -> f64 {
    for _ in 0..REFINE_STEPS {
        let mid = 0.5 * (outside + inside);
        if setup.below_surface(mid, dir) {
            inside = mid;
        } else {
            outside = mid;
        }
    }
    inside
}

pub fn save_png(path: &Path, image: &RgbaImage) -> Result<(), ExportError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(ExportError::EmptyFrame(width, height));
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|source| ExportError::CreateDir {
                path: parent.display().to_string(),
                source,
            })?;
        }
    }

    image::save_buffer_with_format(
        path,
        image.as_raw(),
        width,
        height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .map_err(|source| ExportError::Write {
        path: path.display().to_string(),
        source,
    })
}

/// Nearest-neighbour copy of `src` into the center of a `dst_width` x
/// `dst_height` RGBA frame, preserving aspect ratio.
pub fn blit_fit(src: &RgbaImage, dst: &mut [u8], dst_width: u32, dst_height: u32) {
    let (src_w, src_h) = src.dimensions();
    if src_w == 0 || src_h == 0 || dst_width == 0 || dst_height == 0 {
        return;
    }
    let scale = (dst_width as f64 / src_w as f64).min(dst_height as f64 / src_h as f64);
    let out_w = ((src_w as f64 * scale).round() as u32).clamp(1, dst_width);
    let out_h = ((src_h as f64 * scale).round() as u32).clamp(1, dst_height);
    let off_x = (dst_width - out_w) / 2;
    let off_y = (dst_height - out_h) / 2;

    for (y, row) in dst.chunks_exact_mut((dst_width * 4) as usize).enumerate() {
        let y = y as u32;
        let inside_y = y >= off_y && y < off_y + out_h;
        let sy = if inside_y {
            (((y - off_y) as u64 * src_h as u64) / out_h as u64) as u32
        } else {
            0
        };
        for x in 0..dst_width {
            let idx = (x * 4) as usize;
            if !inside_y || x < off_x || x >= off_x + out_w {
                row[idx..idx + 4].copy_from_slice(&BACKGROUND);
                continue;
            }
            let sx = (((x - off_x) as u64 * src_w as u64) / out_w as u64) as u32;
            row[idx..idx + 4].copy_from_slice(&src.get_pixel(sx, sy).0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{blit_fit, ray_sphere, save_png, ExportError, RenderSettings, SoftwareRenderer};
    use crate::assets::TextureSet;
    use crate::config::{ToneMapping, ViewerConfig};
    use crate::controls::ControlBinding;
    use crate::scene::{SceneGraph, SceneTarget};
    use glam::DVec3;
    use image::RgbaImage;
    use std::sync::Arc;

    fn synced_scene(config: &ViewerConfig) -> SceneGraph {
        let mut scene = SceneGraph::new(config, Arc::new(TextureSet::neutral()));
        let mut controls = ControlBinding::new(&config.initial, &config.latitude);
        scene.apply_all(&controls.sync_all());
        scene
    }

    fn luminance(image: &RgbaImage, x: u32, y: u32) -> u32 {
        let [r, g, b, _] = image.get_pixel(x, y).0;
        r as u32 + g as u32 + b as u32
    }

    #[test]
    fn ray_sphere_hits_front_and_back() {
        let (t0, t1) = ray_sphere(DVec3::new(0.0, 0.0, 10.0), DVec3::NEG_Z, 2.0).unwrap();
        assert!((t0 - 8.0).abs() < 1e-12);
        assert!((t1 - 12.0).abs() < 1e-12);
        assert!(ray_sphere(DVec3::new(5.0, 0.0, 10.0), DVec3::NEG_Z, 2.0).is_none());
    }

    #[test]
    fn lit_moon_on_black_background() {
        let mut config = ViewerConfig::default();
        config.initial.camera.radius = 6000.0;
        let scene = synced_scene(&config);
        let renderer = SoftwareRenderer::new(RenderSettings::from_config(&config));
        let image = renderer.render(&scene, 64, 64);
        assert_eq!(image.get_pixel(0, 0).0, [0, 0, 0, 255]);
        assert!(luminance(&image, 32, 32) > 0);
        assert_eq!(image.get_pixel(32, 32).0[3], 255);
    }

    #[test]
    fn light_behind_the_moon_leaves_the_visible_side_dark() {
        let mut config = ViewerConfig::default();
        config.initial.light.longitude = 180.0;
        config.tone_mapping = ToneMapping::None;
        let scene = synced_scene(&config);
        let renderer = SoftwareRenderer::new(RenderSettings::from_config(&config));
        let image = renderer.render(&scene, 32, 32);
        assert_eq!(luminance(&image, 16, 16), 0);
    }

    #[test]
    fn camera_inside_the_moon_sees_nothing() {
        let mut config = ViewerConfig::default();
        config.initial.camera.radius = 100.0;
        let scene = synced_scene(&config);
        let image = SoftwareRenderer::new(RenderSettings::default()).render(&scene, 16, 16);
        assert!(image.pixels().all(|p| p.0 == [0, 0, 0, 255]));
    }

    #[test]
    fn moon_beyond_far_plane_is_clipped() {
        let mut config = ViewerConfig::default();
        config.camera.far = 500.0;
        let scene = synced_scene(&config);
        let image = SoftwareRenderer::new(RenderSettings::default()).render(&scene, 16, 16);
        assert_eq!(image.get_pixel(8, 8).0, [0, 0, 0, 255]);
    }

    #[test]
    fn displacement_relief_changes_silhouette() {
        let mut textures = TextureSet::neutral();
        textures.displacement = crate::assets::ScalarTexture::solid(1.0);
        let mut far_away = ViewerConfig::default();
        far_away.initial.camera.radius = 8000.0;
        let mut config = far_away.clone();
        config.initial.mesh.displacement_scale = 800.0;
        let mut scene = SceneGraph::new(&config, Arc::new(textures));
        let mut controls = ControlBinding::new(&config.initial, &config.latitude);
        scene.apply_all(&controls.sync_all());
        let flat = synced_scene(&far_away);

        let renderer = SoftwareRenderer::new(RenderSettings::default());
        let raised = renderer.render(&scene, 48, 48);
        let smooth = renderer.render(&flat, 48, 48);
        let covered = |image: &RgbaImage| image.pixels().filter(|p| p.0 != [0, 0, 0, 255]).count();
        assert!(covered(&raised) > covered(&smooth));
    }

    #[test]
    fn blit_letterboxes_square_into_wide_frame() {
        let src = RgbaImage::from_pixel(2, 2, image::Rgba([255, 255, 255, 255]));
        let mut dst = vec![7u8; 4 * 2 * 4];
        blit_fit(&src, &mut dst, 4, 2);
        assert_eq!(&dst[0..4], &[0, 0, 0, 255]);
        assert_eq!(&dst[4..8], &[255, 255, 255, 255]);
        assert_eq!(&dst[12..16], &[0, 0, 0, 255]);
    }

    #[test]
    fn save_png_creates_parent_directory() {
        let nonce = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let dir = std::env::temp_dir()
            .join(format!("moonviz_render_{}_{}", std::process::id(), nonce));
        let path = dir.join("nested").join("frame.png");
        let image = RgbaImage::from_pixel(3, 2, image::Rgba([10, 20, 30, 255]));

        save_png(&path, &image).unwrap();
        let loaded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(loaded, image);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn save_png_rejects_empty_frame() {
        let err = save_png(std::path::Path::new("unused.png"), &RgbaImage::new(0, 0)).unwrap_err();
        assert!(matches!(err, ExportError::EmptyFrame(0, 0)));
    }
}
