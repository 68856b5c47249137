use glam::DVec3;

/// Light sliders. The light sits on the unit sphere; only its direction matters.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct LightControlState {
    pub longitude: f64,
    pub latitude: f64,
    pub intensity: f64,
}

impl Default for LightControlState {
    fn default() -> Self {
        Self {
            longitude: 0.0,
            latitude: 0.0,
            intensity: 5.0,
        }
    }
}

/// Camera sliders. Rotations are degrees and only drive the camera while
/// `look_at_center` is off; they are kept untouched while it is on.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CameraControlState {
    pub longitude: f64,
    pub latitude: f64,
    pub radius: f64,
    pub look_at_center: bool,
    pub rotation_x: f64,
    pub rotation_y: f64,
    pub rotation_z: f64,
}

impl Default for CameraControlState {
    fn default() -> Self {
        Self {
            longitude: 0.0,
            latitude: 0.0,
            radius: 3000.0,
            look_at_center: true,
            rotation_x: 0.0,
            rotation_y: 90.0,
            rotation_z: 0.0,
        }
    }
}

impl CameraControlState {
    pub fn rotation_radians(&self) -> DVec3 {
        degrees_to_radians(self.rotation_x, self.rotation_y, self.rotation_z)
    }
}

/// Mesh sliders. `normal_scale` is `None` when the normal-map strength control
/// is not offered.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct MeshControlState {
    pub rotation_x: f64,
    pub rotation_y: f64,
    pub rotation_z: f64,
    pub displacement_scale: f64,
    pub normal_scale: Option<f64>,
}

impl Default for MeshControlState {
    fn default() -> Self {
        Self {
            rotation_x: 0.0,
            rotation_y: 0.0,
            rotation_z: 0.0,
            displacement_scale: 19.87,
            normal_scale: Some(1.0),
        }
    }
}

impl MeshControlState {
    pub fn rotation_radians(&self) -> DVec3 {
        degrees_to_radians(self.rotation_x, self.rotation_y, self.rotation_z)
    }
}

fn degrees_to_radians(x: f64, y: f64, z: f64) -> DVec3 {
    let factor = std::f64::consts::PI / 180.0;
    DVec3::new(x * factor, y * factor, z * factor)
}

/// Starting values for all three control groups.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct InitialControls {
    pub light: LightControlState,
    pub camera: CameraControlState,
    pub mesh: MeshControlState,
}
