//! Spherical to cartesian conversion shared by camera and light placement.

use glam::DVec3;

/// Converts (longitude, latitude, radius) to a point in the renderer's Y-up frame.
///
/// The polar axis is +Y and the azimuth runs opposite to longitude, so that
/// increasing longitude follows the moon texture's east direction. Latitudes
/// outside [-90, 90] are not rejected; they wrap through the pole.
pub fn to_cartesian(longitude: f64, latitude: f64, radius: f64) -> DVec3 {
    let phi = (90.0 - latitude) * (std::f64::consts::PI / 180.0);
    let theta = (360.0 - longitude) * (std::f64::consts::PI / 180.0);

    let x = radius * phi.sin() * theta.cos();
    let y = radius * phi.cos();
    let z = radius * phi.sin() * theta.sin();

    DVec3::new(x, y, z)
}

/// Unit direction for a directional light placed on the unit sphere.
pub fn direction_from_angles(longitude: f64, latitude: f64) -> DVec3 {
    to_cartesian(longitude, latitude, 1.0)
}
