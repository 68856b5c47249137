mod camera;

pub use camera::PerspectiveCamera;

use crate::assets::TextureSet;
use crate::config::ViewerConfig;
use glam::{DQuat, DVec2, DVec3, EulerRot};
use std::sync::Arc;

/// Directional light. Only the direction from the origin to `position` matters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    pub position: DVec3,
    pub intensity: f64,
    pub color: [f32; 3],
}

impl DirectionalLight {
    pub fn direction(&self) -> DVec3 {
        self.position.normalize_or_zero()
    }
}

#[derive(Clone)]
pub struct MoonMaterial {
    pub displacement_scale: f64,
    pub normal_scale: DVec2,
    pub textures: Arc<TextureSet>,
}

#[derive(Clone)]
pub struct MoonMesh {
    pub radius: f64,
    rotation: DVec3,
    quaternion: DQuat,
    pub material: MoonMaterial,
}

impl MoonMesh {
    pub fn new(radius: f64, material: MoonMaterial) -> Self {
        Self {
            radius,
            rotation: DVec3::ZERO,
            quaternion: DQuat::IDENTITY,
            material,
        }
    }

    /// Euler angles (radians, XYZ order).
    pub fn rotation(&self) -> DVec3 {
        self.rotation
    }

    pub fn quaternion(&self) -> DQuat {
        self.quaternion
    }

    pub fn set_rotation(&mut self, rotation: DVec3) {
        self.rotation = rotation;
        self.quaternion = DQuat::from_euler(EulerRot::XYZ, rotation.x, rotation.y, rotation.z);
    }
}

/// How the camera orientation is derived after a control change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CameraOrientation {
    /// Aim local -Z at the world origin.
    LookAtOrigin,
    /// Euler angles in radians.
    Euler(DVec3),
}

/// A single in-place edit of the scene graph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SceneMutation {
    LightPosition(DVec3),
    LightIntensity(f64),
    CameraPosition(DVec3),
    CameraOrientation(CameraOrientation),
    RefreshProjection,
    MeshRotation(DVec3),
    DisplacementScale(f64),
    NormalScale(DVec2),
}

/// Anything that accepts scene mutations; the viewer injects its scene graph.
pub trait SceneTarget {
    fn apply(&mut self, mutation: &SceneMutation);

    fn apply_all(&mut self, mutations: &[SceneMutation]) {
        for mutation in mutations {
            self.apply(mutation);
        }
    }
}

/// Camera, light and moon mesh, created once and mutated for the viewer lifetime.
#[derive(Clone)]
pub struct SceneGraph {
    pub camera: PerspectiveCamera,
    pub light: DirectionalLight,
    pub mesh: MoonMesh,
    revision: u64,
}

impl SceneGraph {
    pub fn new(config: &ViewerConfig, textures: Arc<TextureSet>) -> Self {
        let (width, height) = config.viewport.initial_size();
        let aspect = width as f64 / height.max(1) as f64;
        let camera = PerspectiveCamera::new(
            config.camera.fov_deg,
            aspect,
            config.camera.near,
            config.camera.far,
        );
        let light = DirectionalLight {
            position: DVec3::new(2000.0, 0.0, 2000.0),
            intensity: config.initial.light.intensity,
            color: [1.0, 1.0, 1.0],
        };
        let material = MoonMaterial {
            displacement_scale: config.initial.mesh.displacement_scale,
            normal_scale: DVec2::splat(config.initial.mesh.normal_scale.unwrap_or(1.0)),
            textures,
        };
        Self {
            camera,
            light,
            mesh: MoonMesh::new(config.sphere_radius, material),
            revision: 0,
        }
    }

    /// Increments on every applied mutation; the renderer caches by it.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn set_viewport_aspect(&mut self, width: u32, height: u32) {
        self.camera.set_aspect(width as f64 / height.max(1) as f64);
        self.revision += 1;
    }
}

impl SceneTarget for SceneGraph {
    fn apply(&mut self, mutation: &SceneMutation) {
        match *mutation {
            SceneMutation::LightPosition(position) => self.light.position = position,
            SceneMutation::LightIntensity(intensity) => self.light.intensity = intensity,
            SceneMutation::CameraPosition(position) => self.camera.position = position,
            SceneMutation::CameraOrientation(CameraOrientation::LookAtOrigin) => {
                self.camera.look_at(DVec3::ZERO)
            }
            SceneMutation::CameraOrientation(CameraOrientation::Euler(rotation)) => {
                self.camera.set_rotation(rotation)
            }
            SceneMutation::RefreshProjection => self.camera.update_projection(),
            SceneMutation::MeshRotation(rotation) => self.mesh.set_rotation(rotation),
            SceneMutation::DisplacementScale(scale) => {
                self.mesh.material.displacement_scale = scale
            }
            SceneMutation::NormalScale(scale) => self.mesh.material.normal_scale = scale,
        }
        self.revision += 1;
    }
}
