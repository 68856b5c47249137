use crate::encoding::CameraPose;
use glam::{DMat3, DMat4, DQuat, DVec3, EulerRot};

/// Perspective camera with an Euler/quaternion pair kept in sync.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveCamera {
    pub position: DVec3,
    rotation: DVec3,
    quaternion: DQuat,
    pub up: DVec3,
    pub fov_deg: f64,
    pub aspect: f64,
    pub near: f64,
    pub far: f64,
    projection: DMat4,
}

impl PerspectiveCamera {
    pub fn new(fov_deg: f64, aspect: f64, near: f64, far: f64) -> Self {
        let mut camera = Self {
            position: DVec3::ZERO,
            rotation: DVec3::ZERO,
            quaternion: DQuat::IDENTITY,
            up: DVec3::Y,
            fov_deg,
            aspect,
            near,
            far,
            projection: DMat4::IDENTITY,
        };
        camera.update_projection();
        camera
    }

    /// Euler angles (radians, XYZ order).
    pub fn rotation(&self) -> DVec3 {
        self.rotation
    }

    pub fn quaternion(&self) -> DQuat {
        self.quaternion
    }

    pub fn projection(&self) -> DMat4 {
        self.projection
    }

    pub fn set_rotation(&mut self, rotation: DVec3) {
        self.rotation = rotation;
        self.quaternion = DQuat::from_euler(EulerRot::XYZ, rotation.x, rotation.y, rotation.z);
    }

    /// Turns the camera so local -Z faces `target`, using `self.up` as reference.
    ///
    /// When the eye sits on the target the camera faces down -Z; when the view
    /// line is parallel to `up` the forward axis is nudged by 1e-4 before the
    /// basis is rebuilt.
    pub fn look_at(&mut self, target: DVec3) {
        let mut z = self.position - target;
        if z.length_squared() == 0.0 {
            z.z = 1.0;
        }
        z = z.normalize();

        let mut x = self.up.cross(z);
        if x.length_squared() == 0.0 {
            if self.up.z.abs() == 1.0 {
                z.x += 0.0001;
            } else {
                z.z += 0.0001;
            }
            z = z.normalize();
            x = self.up.cross(z);
        }
        x = x.normalize();
        let y = z.cross(x);

        self.quaternion = DQuat::from_mat3(&DMat3::from_cols(x, y, z)).normalize();
        let (rx, ry, rz) = self.quaternion.to_euler(EulerRot::XYZ);
        self.rotation = DVec3::new(rx, ry, rz);
    }

    pub fn update_projection(&mut self) {
        self.projection = DMat4::perspective_rh_gl(
            self.fov_deg.to_radians(),
            self.aspect.max(f64::EPSILON),
            self.near,
            self.far,
        );
    }

    pub fn set_aspect(&mut self, aspect: f64) {
        self.aspect = aspect;
        self.update_projection();
    }

    pub fn world_direction(&self) -> DVec3 {
        (self.quaternion * DVec3::NEG_Z).normalize()
    }

    /// The camera has no parent, so local and world transforms coincide.
    pub fn pose(&self) -> CameraPose {
        CameraPose {
            position: self.position,
            direction: self.world_direction(),
            orientation: self.quaternion,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::PerspectiveCamera;
    use glam::DVec3;

    fn camera() -> PerspectiveCamera {
        PerspectiveCamera::new(45.0, 1.0, 0.1, 10_000.0)
    }

    #[test]
    fn default_camera_looks_down_negative_z() {
        let cam = camera();
        assert!((cam.world_direction() - DVec3::NEG_Z).length() < 1e-12);
    }

    #[test]
    fn look_at_points_toward_target() {
        let mut cam = camera();
        cam.position = DVec3::new(1200.0, -300.0, 2500.0);
        cam.look_at(DVec3::ZERO);
        let expected = (-cam.position).normalize();
        assert!((cam.world_direction() - expected).length() < 1e-9);
        let up = cam.quaternion() * DVec3::Y;
        assert!(up.y > 0.0);
    }

    #[test]
    fn look_at_from_pole_stays_finite() {
        let mut cam = camera();
        cam.position = DVec3::new(0.0, 3000.0, 0.0);
        cam.look_at(DVec3::ZERO);
        let dir = cam.world_direction();
        assert!(dir.is_finite());
        assert!(dir.y < -0.999);
    }

    #[test]
    fn look_at_from_target_faces_negative_z() {
        let mut cam = camera();
        cam.look_at(DVec3::ZERO);
        assert!((cam.world_direction() - DVec3::NEG_Z).length() < 1e-12);
    }

    #[test]
    fn look_at_syncs_euler_angles() {
        let mut cam = camera();
        cam.position = DVec3::new(500.0, 800.0, -900.0);
        cam.look_at(DVec3::ZERO);
        let looked = cam.world_direction();
        let mut copy = camera();
        copy.set_rotation(cam.rotation());
        assert!((copy.world_direction() - looked).length() < 1e-9);
    }

    #[test]
    fn euler_rotation_about_y_turns_view() {
        let mut cam = camera();
        cam.set_rotation(DVec3::new(0.0, std::f64::consts::FRAC_PI_2, 0.0));
        assert!((cam.world_direction() - DVec3::NEG_X).length() < 1e-12);
    }

    #[test]
    fn aspect_change_refreshes_projection() {
        let mut cam = camera();
        let before = cam.projection();
        cam.set_aspect(2.0);
        assert_ne!(before, cam.projection());
    }
}
