//! Pure control-to-scene bindings.
//!
//! Each function reads one control group and returns the scene edits that
//! bring the scene graph in line with it. Re-running a binding on the same
//! state yields the same edits.

use super::state::{CameraControlState, LightControlState, MeshControlState};
use crate::geometry::{direction_from_angles, to_cartesian};
use crate::scene::{CameraOrientation, SceneMutation};
use glam::DVec2;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BindingOutput {
    pub mutations: Vec<SceneMutation>,
    /// Set when the binding decides whether the camera rotation sliders are live.
    pub rotation_controls_enabled: Option<bool>,
}

fn camera_orientation(state: &CameraControlState) -> CameraOrientation {
    if state.look_at_center {
        CameraOrientation::LookAtOrigin
    } else {
        CameraOrientation::Euler(state.rotation_radians())
    }
}

pub fn apply_light_controls(state: &LightControlState) -> BindingOutput {
    BindingOutput {
        mutations: vec![
            SceneMutation::LightIntensity(state.intensity),
            SceneMutation::LightPosition(direction_from_angles(state.longitude, state.latitude)),
        ],
        rotation_controls_enabled: None,
    }
}

/// Places the camera on its sphere and, in look-at mode, aims it at the origin.
///
/// Outside look-at mode the stored rotation angles are re-applied, so turning
/// look-at off brings back the orientation those sliders describe.
pub fn apply_camera_position(state: &CameraControlState) -> BindingOutput {
    BindingOutput {
        mutations: vec![
            SceneMutation::CameraPosition(to_cartesian(
                state.longitude,
                state.latitude,
                state.radius,
            )),
            SceneMutation::CameraOrientation(camera_orientation(state)),
            SceneMutation::RefreshProjection,
        ],
        rotation_controls_enabled: Some(!state.look_at_center),
    }
}

/// Applies the rotation sliders. In look-at mode the origin stays in view.
pub fn apply_camera_rotation(state: &CameraControlState) -> BindingOutput {
    BindingOutput {
        mutations: vec![
            SceneMutation::CameraOrientation(camera_orientation(state)),
            SceneMutation::RefreshProjection,
        ],
        rotation_controls_enabled: None,
    }
}

pub fn apply_mesh_controls(state: &MeshControlState) -> BindingOutput {
    let mut mutations = vec![
        SceneMutation::MeshRotation(state.rotation_radians()),
        SceneMutation::DisplacementScale(state.displacement_scale),
    ];
    if let Some(scale) = state.normal_scale {
        mutations.push(SceneMutation::NormalScale(DVec2::splat(scale)));
    }
    BindingOutput {
        mutations,
        rotation_controls_enabled: None,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        apply_camera_position, apply_camera_rotation, apply_light_controls, apply_mesh_controls,
    };
    use crate::controls::state::{CameraControlState, LightControlState, MeshControlState};
    use crate::scene::{CameraOrientation, SceneMutation};
    use glam::{DVec2, DVec3};

    #[test]
    fn light_binding_uses_unit_radius_and_raw_intensity() {
        let output = apply_light_controls(&LightControlState {
            longitude: 90.0,
            latitude: 0.0,
            intensity: 7.5,
        });
        assert_eq!(output.rotation_controls_enabled, None);
        assert_eq!(output.mutations[0], SceneMutation::LightIntensity(7.5));
        match output.mutations[1] {
            SceneMutation::LightPosition(position) => {
                assert!((position - DVec3::NEG_Z).length() < 1e-12);
            }
            other => panic!("unexpected mutation {other:?}"),
        }
    }

    #[test]
    fn camera_position_in_look_at_mode_disables_rotation() {
        let output = apply_camera_position(&CameraControlState::default());
        assert_eq!(output.rotation_controls_enabled, Some(false));
        assert_eq!(
            output.mutations[1],
            SceneMutation::CameraOrientation(CameraOrientation::LookAtOrigin)
        );
        assert_eq!(output.mutations[2], SceneMutation::RefreshProjection);
    }

    #[test]
    fn camera_position_without_look_at_restores_rotation() {
        let state = CameraControlState {
            look_at_center: false,
            rotation_x: 10.0,
            rotation_y: 20.0,
            rotation_z: -30.0,
            ..CameraControlState::default()
        };
        let output = apply_camera_position(&state);
        assert_eq!(output.rotation_controls_enabled, Some(true));
        assert_eq!(
            output.mutations[1],
            SceneMutation::CameraOrientation(CameraOrientation::Euler(state.rotation_radians()))
        );
    }

    #[test]
    fn camera_rotation_is_inert_in_look_at_mode() {
        let state = CameraControlState {
            rotation_x: 45.0,
            ..CameraControlState::default()
        };
        let output = apply_camera_rotation(&state);
        assert_eq!(
            output.mutations[0],
            SceneMutation::CameraOrientation(CameraOrientation::LookAtOrigin)
        );
    }

    #[test]
    fn mesh_binding_converts_degrees_and_scales() {
        let output = apply_mesh_controls(&MeshControlState {
            rotation_x: 180.0,
            rotation_y: -90.0,
            rotation_z: 0.0,
            displacement_scale: 250.0,
            normal_scale: Some(2.0),
        });
        match output.mutations[0] {
            SceneMutation::MeshRotation(rotation) => {
                let expected = DVec3::new(std::f64::consts::PI, -std::f64::consts::FRAC_PI_2, 0.0);
                assert!((rotation - expected).length() < 1e-12);
            }
            other => panic!("unexpected mutation {other:?}"),
        }
        assert_eq!(output.mutations[1], SceneMutation::DisplacementScale(250.0));
        assert_eq!(output.mutations[2], SceneMutation::NormalScale(DVec2::splat(2.0)));
    }

    #[test]
    fn mesh_binding_skips_normal_scale_when_not_offered() {
        let output = apply_mesh_controls(&MeshControlState {
            normal_scale: None,
            ..MeshControlState::default()
        });
        assert_eq!(output.mutations.len(), 2);
    }

    #[test]
    fn bindings_are_idempotent() {
        let state = CameraControlState {
            longitude: 33.3,
            latitude: -12.0,
            radius: 4200.0,
            ..CameraControlState::default()
        };
        assert_eq!(apply_camera_position(&state), apply_camera_position(&state));
    }
}
