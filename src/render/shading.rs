use crate::config::ToneMapping;
use glam::{Mat3, Vec3};

/// Equirectangular coordinates of a unit direction in mesh space, laid out
/// like a sphere mesh whose seam sits on -X: `u` grows with azimuth, `t` is 0
/// at the north pole (top image row) and 1 at the south pole.
pub fn sphere_uv(n: Vec3) -> (f32, f32) {
    let mut phi = n.z.atan2(-n.x);
    if phi < 0.0 {
        phi += std::f32::consts::TAU;
    }
    let theta = n.y.clamp(-1.0, 1.0).acos();
    (
        phi / std::f32::consts::TAU,
        theta / std::f32::consts::PI,
    )
}

/// Tangent (increasing `u`) and bitangent (towards the north pole) at `(u, t)`.
pub fn tangent_frame(u: f32, t: f32) -> (Vec3, Vec3) {
    let phi = u * std::f32::consts::TAU;
    let theta = t * std::f32::consts::PI;
    let (sin_phi, cos_phi) = phi.sin_cos();
    let (sin_theta, cos_theta) = theta.sin_cos();
    let tangent = Vec3::new(sin_phi, 0.0, cos_phi);
    let bitangent = Vec3::new(cos_phi * cos_theta, sin_theta, -sin_phi * cos_theta);
    (tangent, bitangent)
}

/// Narkowicz-style ACES fit as used by three.js `ACESFilmicToneMapping`.
fn aces_filmic(color: Vec3) -> Vec3 {
    let input = Mat3::from_cols(
        Vec3::new(0.59719, 0.07600, 0.02840),
        Vec3::new(0.35458, 0.90834, 0.13383),
        Vec3::new(0.04823, 0.01566, 0.83777),
    );
    let output = Mat3::from_cols(
        Vec3::new(1.60475, -0.10208, -0.00327),
        Vec3::new(-0.53108, 1.10813, -0.07276),
        Vec3::new(-0.07367, -0.00605, 1.07602),
    );
    let v = input * (color / 0.6);
    let a = v * (v + 0.0245786) - 0.000090537;
    let b = v * (0.983729 * v + 0.4329510) + 0.238081;
    (output * (a / b)).clamp(Vec3::ZERO, Vec3::ONE)
}

pub fn tone_map(color: Vec3, mapping: ToneMapping, exposure: f32) -> Vec3 {
    let exposed = color * exposure;
    match mapping {
        ToneMapping::None => exposed.clamp(Vec3::ZERO, Vec3::ONE),
        ToneMapping::AcesFilmic => aces_filmic(exposed),
    }
}

fn linear_to_srgb_channel(c: f32) -> u8 {
    let c = c.clamp(0.0, 1.0);
    let encoded = if c <= 0.0031308 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    };
    (encoded * 255.0 + 0.5) as u8
}

pub fn encode_srgb(color: Vec3) -> [u8; 3] {
    [
        linear_to_srgb_channel(color.x),
        linear_to_srgb_channel(color.y),
        linear_to_srgb_channel(color.z),
    ]
}

#[cfg(test)]
mod tests {
    use super::{encode_srgb, sphere_uv, tangent_frame, tone_map};
    use crate::config::ToneMapping;
    use crate::geometry::to_cartesian;
    use glam::Vec3;

    #[test]
    fn prime_meridian_samples_texture_center() {
        let (u, t) = sphere_uv(Vec3::X);
        assert!((u - 0.5).abs() < 1e-6);
        assert!((t - 0.5).abs() < 1e-6);
    }

    #[test]
    fn east_longitude_moves_right_in_texture() {
        let east = to_cartesian(90.0, 0.0, 1.0).as_vec3();
        let (u, _) = sphere_uv(east);
        assert!((u - 0.75).abs() < 1e-5);
        let (_, t) = sphere_uv(to_cartesian(0.0, 60.0, 1.0).as_vec3());
        assert!(t < 0.5);
    }

    #[test]
    fn tangent_frame_is_right_handed_with_outward_normal() {
        for (u, t) in [(0.5, 0.5), (0.1, 0.3), (0.8, 0.7)] {
            let (tangent, bitangent) = tangent_frame(u, t);
            let phi = u * std::f32::consts::TAU;
            let theta = t * std::f32::consts::PI;
            let normal = Vec3::new(-phi.cos() * theta.sin(), theta.cos(), phi.sin() * theta.sin());
            assert!((tangent.cross(bitangent) - normal).length() < 1e-5);
        }
    }

    #[test]
    fn tone_mapping_stays_in_unit_range() {
        let bright = Vec3::splat(50.0);
        for mapping in [ToneMapping::None, ToneMapping::AcesFilmic] {
            let mapped = tone_map(bright, mapping, 1.0);
            assert!(mapped.max_element() <= 1.0 && mapped.min_element() >= 0.0);
        }
        assert_eq!(tone_map(Vec3::ZERO, ToneMapping::None, 1.0), Vec3::ZERO);
    }

    #[test]
    fn srgb_encoding_endpoints() {
        assert_eq!(encode_srgb(Vec3::ZERO), [0, 0, 0]);
        assert_eq!(encode_srgb(Vec3::ONE), [255, 255, 255]);
        assert_eq!(encode_srgb(Vec3::splat(0.5))[0], 188);
    }
}
