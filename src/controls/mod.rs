//! Named, ranged controls and their dispatch onto scene bindings.

pub mod binding;
pub mod state;

pub use binding::{
    apply_camera_position, apply_camera_rotation, apply_light_controls, apply_mesh_controls,
    BindingOutput,
};
pub use state::{CameraControlState, InitialControls, LightControlState, MeshControlState};

use crate::config::ControlBounds;
use crate::scene::SceneMutation;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlGroup {
    Light,
    Camera,
    Mesh,
}

impl ControlGroup {
    pub const ALL: [ControlGroup; 3] =
        [ControlGroup::Light, ControlGroup::Camera, ControlGroup::Mesh];

    pub fn title(self) -> &'static str {
        match self {
            ControlGroup::Light => "Light Controls",
            ControlGroup::Camera => "Camera Controls",
            ControlGroup::Mesh => "Mesh Controls",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlId {
    LightLongitude,
    LightLatitude,
    LightIntensity,
    CameraLongitude,
    CameraLatitude,
    CameraRadius,
    CameraLookAtCenter,
    CameraRotationX,
    CameraRotationY,
    CameraRotationZ,
    MeshRotationX,
    MeshRotationY,
    MeshRotationZ,
    MeshDisplacementScale,
    MeshNormalScale,
}

/// Which binding a control change triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingOp {
    Light,
    CameraPosition,
    CameraRotation,
    Mesh,
}

impl ControlId {
    pub const ALL: [ControlId; 15] = [
        ControlId::LightLongitude,
        ControlId::LightLatitude,
        ControlId::LightIntensity,
        ControlId::CameraLongitude,
        ControlId::CameraLatitude,
        ControlId::CameraRadius,
        ControlId::CameraLookAtCenter,
        ControlId::CameraRotationX,
        ControlId::CameraRotationY,
        ControlId::CameraRotationZ,
        ControlId::MeshRotationX,
        ControlId::MeshRotationY,
        ControlId::MeshRotationZ,
        ControlId::MeshDisplacementScale,
        ControlId::MeshNormalScale,
    ];

    /// Dotted key used on the command line, e.g. `camera.longitude`.
    pub fn key(self) -> &'static str {
        match self {
            ControlId::LightLongitude => "light.longitude",
            ControlId::LightLatitude => "light.latitude",
            ControlId::LightIntensity => "light.intensity",
            ControlId::CameraLongitude => "camera.longitude",
            ControlId::CameraLatitude => "camera.latitude",
            ControlId::CameraRadius => "camera.radius",
            ControlId::CameraLookAtCenter => "camera.look_at_center",
            ControlId::CameraRotationX => "camera.rotation_x",
            ControlId::CameraRotationY => "camera.rotation_y",
            ControlId::CameraRotationZ => "camera.rotation_z",
            ControlId::MeshRotationX => "mesh.rotation_x",
            ControlId::MeshRotationY => "mesh.rotation_y",
            ControlId::MeshRotationZ => "mesh.rotation_z",
            ControlId::MeshDisplacementScale => "mesh.displacement_scale",
            ControlId::MeshNormalScale => "mesh.normal_scale",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ControlId::LightLongitude | ControlId::CameraLongitude => "Longitude",
            ControlId::LightLatitude | ControlId::CameraLatitude => "Latitude",
            ControlId::LightIntensity => "Intensity",
            ControlId::CameraRadius => "Radius",
            ControlId::CameraLookAtCenter => "Look At Center",
            ControlId::CameraRotationX | ControlId::MeshRotationX => "X Rotation",
            ControlId::CameraRotationY | ControlId::MeshRotationY => "Y Rotation",
            ControlId::CameraRotationZ | ControlId::MeshRotationZ => "Z Rotation",
            ControlId::MeshDisplacementScale => "Displacement Scale",
            ControlId::MeshNormalScale => "Normal Scale",
        }
    }

    pub fn from_key(key: &str) -> Option<ControlId> {
        ControlId::ALL.into_iter().find(|id| id.key() == key)
    }

    pub fn group(self) -> ControlGroup {
        match self {
            ControlId::LightLongitude | ControlId::LightLatitude | ControlId::LightIntensity => {
                ControlGroup::Light
            }
            ControlId::CameraLongitude
            | ControlId::CameraLatitude
            | ControlId::CameraRadius
            | ControlId::CameraLookAtCenter
            | ControlId::CameraRotationX
            | ControlId::CameraRotationY
            | ControlId::CameraRotationZ => ControlGroup::Camera,
            ControlId::MeshRotationX
            | ControlId::MeshRotationY
            | ControlId::MeshRotationZ
            | ControlId::MeshDisplacementScale
            | ControlId::MeshNormalScale => ControlGroup::Mesh,
        }
    }

    pub fn binding(self) -> BindingOp {
        match self {
            ControlId::LightLongitude | ControlId::LightLatitude | ControlId::LightIntensity => {
                BindingOp::Light
            }
            ControlId::CameraLongitude
            | ControlId::CameraLatitude
            | ControlId::CameraRadius
            | ControlId::CameraLookAtCenter => BindingOp::CameraPosition,
            ControlId::CameraRotationX
            | ControlId::CameraRotationY
            | ControlId::CameraRotationZ => BindingOp::CameraRotation,
            ControlId::MeshRotationX
            | ControlId::MeshRotationY
            | ControlId::MeshRotationZ
            | ControlId::MeshDisplacementScale
            | ControlId::MeshNormalScale => BindingOp::Mesh,
        }
    }

    pub fn is_camera_rotation(self) -> bool {
        self.binding() == BindingOp::CameraRotation
    }
}

impl fmt::Display for ControlId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlKind {
    Slider { min: f64, max: f64 },
    Toggle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlValue {
    Number(f64),
    Toggle(bool),
}

impl fmt::Display for ControlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlValue::Number(value) => write!(f, "{value}"),
            ControlValue::Toggle(value) => write!(f, "{value}"),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ControlError {
    #[error("unknown control '{0}'")]
    UnknownControl(String),
    #[error("control '{0}' is not offered by this configuration")]
    NotOffered(ControlId),
    #[error("invalid value '{value}' for control '{id}'")]
    InvalidValue { id: ControlId, value: String },
    #[error("expected NAME=VALUE, got '{0}'")]
    MalformedAssignment(String),
}

/// A control as presented on the panel: its identity and its input range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlSpec {
    pub id: ControlId,
    pub kind: ControlKind,
}

impl ControlSpec {
    pub fn slider(id: ControlId, min: f64, max: f64) -> Self {
        Self {
            id,
            kind: ControlKind::Slider { min, max },
        }
    }

    pub fn toggle(id: ControlId) -> Self {
        Self {
            id,
            kind: ControlKind::Toggle,
        }
    }

    /// Range enforcement at the input boundary. Non-finite numbers and
    /// mismatched kinds are rejected.
    pub fn admit(&self, value: ControlValue) -> Option<ControlValue> {
        match (self.kind, value) {
            (ControlKind::Slider { min, max }, ControlValue::Number(v)) if v.is_finite() => {
                Some(ControlValue::Number(v.clamp(min, max)))
            }
            (ControlKind::Toggle, ControlValue::Toggle(v)) => Some(ControlValue::Toggle(v)),
            _ => None,
        }
    }

    pub fn parse(&self, text: &str) -> Result<ControlValue, ControlError> {
        let invalid = || ControlError::InvalidValue {
            id: self.id,
            value: text.to_string(),
        };
        let value = match self.kind {
            ControlKind::Slider { .. } => {
                ControlValue::Number(text.trim().parse::<f64>().map_err(|_| invalid())?)
            }
            ControlKind::Toggle => {
                ControlValue::Toggle(text.trim().parse::<bool>().map_err(|_| invalid())?)
            }
        };
        self.admit(value).ok_or_else(invalid)
    }
}

/// Builds the panel layout. The normal-scale slider only exists when the mesh
/// state carries a normal scale.
pub fn control_specs(bounds: &ControlBounds, with_normal_scale: bool) -> Vec<ControlSpec> {
    let (light_lat_min, light_lat_max) = bounds.light_latitude.range();
    let (camera_lat_min, camera_lat_max) = bounds.camera_latitude.range();
    let mut specs = vec![
        ControlSpec::slider(ControlId::LightLongitude, -180.0, 180.0),
        ControlSpec::slider(ControlId::LightLatitude, light_lat_min, light_lat_max),
        ControlSpec::slider(ControlId::LightIntensity, 0.0, 10.0),
        ControlSpec::slider(ControlId::CameraLongitude, -180.0, 180.0),
        ControlSpec::slider(ControlId::CameraLatitude, camera_lat_min, camera_lat_max),
        ControlSpec::slider(ControlId::CameraRadius, 0.0, 10_000.0),
        ControlSpec::toggle(ControlId::CameraLookAtCenter),
        ControlSpec::slider(ControlId::CameraRotationX, -180.0, 180.0),
        ControlSpec::slider(ControlId::CameraRotationY, -180.0, 180.0),
        ControlSpec::slider(ControlId::CameraRotationZ, -180.0, 180.0),
        ControlSpec::slider(ControlId::MeshRotationX, -180.0, 180.0),
        ControlSpec::slider(ControlId::MeshRotationY, -180.0, 180.0),
        ControlSpec::slider(ControlId::MeshRotationZ, -180.0, 180.0),
        ControlSpec::slider(ControlId::MeshDisplacementScale, 0.0, 2000.0),
    ];
    if with_normal_scale {
        specs.push(ControlSpec::slider(ControlId::MeshNormalScale, 0.0, 10.0));
    }
    specs
}

/// Current control values plus the derived rotation-slider enablement.
#[derive(Debug, Clone)]
pub struct ControlBinding {
    light: LightControlState,
    camera: CameraControlState,
    mesh: MeshControlState,
    specs: Vec<ControlSpec>,
    rotation_controls_enabled: bool,
}

impl ControlBinding {
    pub fn new(initial: &InitialControls, bounds: &ControlBounds) -> Self {
        let specs = control_specs(bounds, initial.mesh.normal_scale.is_some());
        let mut binding = Self {
            light: initial.light,
            camera: initial.camera,
            mesh: initial.mesh,
            specs,
            rotation_controls_enabled: !initial.camera.look_at_center,
        };
        // Initial values go through the same boundary as later edits.
        for spec in binding.specs.clone() {
            if let Some(value) = spec.admit(binding.value(spec.id)) {
                binding.store(spec.id, value);
            }
        }
        binding
    }

    pub fn light(&self) -> &LightControlState {
        &self.light
    }

    pub fn camera(&self) -> &CameraControlState {
        &self.camera
    }

    pub fn mesh(&self) -> &MeshControlState {
        &self.mesh
    }

    pub fn specs_in(&self, group: ControlGroup) -> impl Iterator<Item = &ControlSpec> + '_ {
        self.specs.iter().filter(move |spec| spec.id.group() == group)
    }

    pub fn spec(&self, id: ControlId) -> Option<&ControlSpec> {
        self.specs.iter().find(|spec| spec.id == id)
    }

    pub fn rotation_controls_enabled(&self) -> bool {
        self.rotation_controls_enabled
    }

    /// Whether the panel should accept input for `id` right now.
    pub fn is_enabled(&self, id: ControlId) -> bool {
        !id.is_camera_rotation() || self.rotation_controls_enabled
    }

    pub fn value(&self, id: ControlId) -> ControlValue {
        use ControlValue::{Number, Toggle};
        match id {
            ControlId::LightLongitude => Number(self.light.longitude),
            ControlId::LightLatitude => Number(self.light.latitude),
            ControlId::LightIntensity => Number(self.light.intensity),
            ControlId::CameraLongitude => Number(self.camera.longitude),
            ControlId::CameraLatitude => Number(self.camera.latitude),
            ControlId::CameraRadius => Number(self.camera.radius),
            ControlId::CameraLookAtCenter => Toggle(self.camera.look_at_center),
            ControlId::CameraRotationX => Number(self.camera.rotation_x),
            ControlId::CameraRotationY => Number(self.camera.rotation_y),
            ControlId::CameraRotationZ => Number(self.camera.rotation_z),
            ControlId::MeshRotationX => Number(self.mesh.rotation_x),
            ControlId::MeshRotationY => Number(self.mesh.rotation_y),
            ControlId::MeshRotationZ => Number(self.mesh.rotation_z),
            ControlId::MeshDisplacementScale => Number(self.mesh.displacement_scale),
            ControlId::MeshNormalScale => Number(self.mesh.normal_scale.unwrap_or(0.0)),
        }
    }

    fn store(&mut self, id: ControlId, value: ControlValue) {
        match (id, value) {
            (ControlId::CameraLookAtCenter, ControlValue::Toggle(v)) => {
                self.camera.look_at_center = v
            }
            (_, ControlValue::Toggle(_)) => {}
            (id, ControlValue::Number(v)) => {
                let slot = match id {
                    ControlId::LightLongitude => &mut self.light.longitude,
                    ControlId::LightLatitude => &mut self.light.latitude,
                    ControlId::LightIntensity => &mut self.light.intensity,
                    ControlId::CameraLongitude => &mut self.camera.longitude,
                    ControlId::CameraLatitude => &mut self.camera.latitude,
                    ControlId::CameraRadius => &mut self.camera.radius,
                    ControlId::CameraRotationX => &mut self.camera.rotation_x,
                    ControlId::CameraRotationY => &mut self.camera.rotation_y,
                    ControlId::CameraRotationZ => &mut self.camera.rotation_z,
                    ControlId::MeshRotationX => &mut self.mesh.rotation_x,
                    ControlId::MeshRotationY => &mut self.mesh.rotation_y,
                    ControlId::MeshRotationZ => &mut self.mesh.rotation_z,
                    ControlId::MeshDisplacementScale => &mut self.mesh.displacement_scale,
                    ControlId::MeshNormalScale => match self.mesh.normal_scale.as_mut() {
                        Some(slot) => slot,
                        None => return,
                    },
                    ControlId::CameraLookAtCenter => return,
                };
                *slot = v;
            }
        }
    }

    fn run(&mut self, op: BindingOp) -> BindingOutput {
        let output = match op {
            BindingOp::Light => apply_light_controls(&self.light),
            BindingOp::CameraPosition => apply_camera_position(&self.camera),
            BindingOp::CameraRotation => apply_camera_rotation(&self.camera),
            BindingOp::Mesh => apply_mesh_controls(&self.mesh),
        };
        if let Some(enabled) = output.rotation_controls_enabled {
            self.rotation_controls_enabled = enabled;
        }
        output
    }

    /// Stores a new value and returns the edits of the one binding it drives.
    ///
    /// Returns `None` when the control is not offered or the value has the
    /// wrong kind; out-of-range numbers are clamped.
    pub fn set(&mut self, id: ControlId, value: ControlValue) -> Option<BindingOutput> {
        let spec = self.spec(id)?;
        let Some(admitted) = spec.admit(value) else {
            log::debug!("Rejected value {} for {}", value, id);
            return None;
        };
        self.store(id, admitted);
        log::debug!("{} = {}", id, admitted);
        Some(self.run(id.binding()))
    }

    /// Edits that bring a fresh scene in line with every control.
    pub fn sync_all(&mut self) -> Vec<SceneMutation> {
        let mut mutations = Vec::new();
        for op in [BindingOp::Light, BindingOp::Mesh, BindingOp::CameraPosition] {
            mutations.extend(self.run(op).mutations);
        }
        mutations
    }

    /// Parses `NAME=VALUE` as accepted by the command line.
    pub fn parse_assignment(&self, text: &str) -> Result<(ControlId, ControlValue), ControlError> {
        let (name, value) = text
            .split_once('=')
            .ok_or_else(|| ControlError::MalformedAssignment(text.to_string()))?;
        let id = ControlId::from_key(name.trim())
            .ok_or_else(|| ControlError::UnknownControl(name.trim().to_string()))?;
        let spec = self.spec(id).ok_or(ControlError::NotOffered(id))?;
        Ok((id, spec.parse(value)?))
    }
}
