//! Camera state encoding used to name exported screenshots.
//!
//! The renderer works in a Y-up frame; file names use the selenographic Z-up
//! frame (`x = x`, `y = -z`, `z = y`). Every scalar is printed with exactly
//! four decimals using the same rounding rules as JavaScript's `toFixed(4)`,
//! so names produced here line up with ones produced by the earlier web viewer.

use glam::{DQuat, DVec3};

/// World-space camera state needed for encoding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub position: DVec3,
    /// Unit view direction (local -Z in world space).
    pub direction: DVec3,
    pub orientation: DQuat,
}

impl CameraPose {
    /// Local "down" rotated into world space. Encoded in the `up` slots.
    pub fn encoded_up(&self) -> DVec3 {
        self.orientation * DVec3::NEG_Y
    }
}

/// Remaps a renderer-frame vector to the selenographic frame.
pub fn to_domain_axes(native: DVec3) -> DVec3 {
    DVec3::new(native.x, -native.z, native.y)
}

/// Formats `value` with four decimals following `Number.prototype.toFixed(4)`.
///
/// Zero of either sign prints as `0.0000`, negatives that round to zero keep
/// their sign, and exact halfway cases round away from zero.
pub fn to_fixed4(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 {
        return "0.0000".to_string();
    }
    if value < 0.0 {
        return format!("-{}", to_fixed4(-value));
    }

    // A double sits exactly halfway between two 4-decimal values only when it
    // is an odd multiple of 1/32. std formatting breaks those ties to even.
    let scaled = value * 32.0;
    if scaled < 9_007_199_254_740_992.0 && scaled.fract() == 0.0 && scaled % 2.0 == 1.0 {
        let units = (value * 10_000.0 + 0.5) as u64;
        return format!("{}.{:04}", units / 10_000, units % 10_000);
    }

    format!("{value:.4}")
}

/// Formats, negates the formatted number, and formats again.
///
/// Existing screenshot names negate the already rounded text, so a value rounding to
/// `-0.0000` encodes as `0.0000`. Kept for file name compatibility.
pub fn negated_fixed4(value: f64) -> String {
    let rounded = to_fixed4(value);
    let parsed: f64 = rounded.parse().unwrap_or(value);
    to_fixed4(-parsed)
}

fn remapped_fields(native: DVec3) -> [String; 3] {
    [
        to_fixed4(native.x),
        negated_fixed4(native.z),
        to_fixed4(native.y),
    ]
}

/// `posX_posY_posZ_dirX_dirY_dirZ_upX_upY_upZ` in the selenographic frame.
pub fn encode_camera_state(pose: &CameraPose) -> String {
    let mut fields = Vec::with_capacity(9);
    fields.extend(remapped_fields(pose.position));
    fields.extend(remapped_fields(pose.direction));
    fields.extend(remapped_fields(pose.encoded_up()));
    fields.join("_")
}

/// Export file name: camera encoding followed by light longitude and latitude.
pub fn screenshot_file_name(
    pose: &CameraPose,
    light_longitude: f64,
    light_latitude: f64,
) -> String {
    format!(
        "{}_{}_{}.png",
        encode_camera_state(pose),
        to_fixed4(light_longitude),
        to_fixed4(light_latitude)
    )
}

#[cfg(test)]
mod tests {
    use super::{
        encode_camera_state, negated_fixed4, screenshot_file_name, to_domain_axes, to_fixed4,
        CameraPose,
    };
    use glam::{DQuat, DVec3};

    fn identity_pose(position: DVec3) -> CameraPose {
        CameraPose {
            position,
            direction: DVec3::NEG_Z,
            orientation: DQuat::IDENTITY,
        }
    }

    fn has_four_decimals(field: &str) -> bool {
        let digits = field.strip_prefix('-').unwrap_or(field);
        match digits.split_once('.') {
            Some((whole, frac)) => {
                !whole.is_empty()
                    && whole.chars().all(|c| c.is_ascii_digit())
                    && frac.len() == 4
                    && frac.chars().all(|c| c.is_ascii_digit())
            }
            None => false,
        }
    }

    #[test]
    fn fixed4_matches_to_fixed_rounding() {
        assert_eq!(to_fixed4(1.0), "1.0000");
        assert_eq!(to_fixed4(3000.0), "3000.0000");
        assert_eq!(to_fixed4(0.00005), "0.0001");
        assert_eq!(to_fixed4(-2.5), "-2.5000");
        assert_eq!(to_fixed4(1.03125), "1.0313");
        assert_eq!(to_fixed4(-1.03125), "-1.0313");
        assert_eq!(to_fixed4(0.15625), "0.1563");
    }

    #[test]
    fn fixed4_zero_handling() {
        assert_eq!(to_fixed4(0.0), "0.0000");
        assert_eq!(to_fixed4(-0.0), "0.0000");
        assert_eq!(to_fixed4(-0.00001), "-0.0000");
    }

    #[test]
    fn negation_happens_after_rounding() {
        assert_eq!(negated_fixed4(2.0), "-2.0000");
        assert_eq!(negated_fixed4(-3000.0), "3000.0000");
        assert_eq!(negated_fixed4(0.00001), "0.0000");
        assert_eq!(negated_fixed4(-0.00001), "0.0000");
        assert_eq!(negated_fixed4(0.0), "0.0000");
    }

    #[test]
    fn identity_camera_encoding_uses_domain_axes() {
        let encoded = encode_camera_state(&identity_pose(DVec3::new(1.0, 2.0, 3.0)));
        assert_eq!(
            encoded,
            "1.0000_-3.0000_2.0000_0.0000_1.0000_0.0000_0.0000_0.0000_-1.0000"
        );
    }

    #[test]
    fn every_field_has_four_decimals() {
        let encoded = encode_camera_state(&identity_pose(DVec3::new(1.00005, 0.0, 0.0)));
        let fields: Vec<&str> = encoded.split('_').collect();
        assert_eq!(fields.len(), 9);
        assert!(fields.iter().all(|field| has_four_decimals(field)), "{encoded}");
        assert_eq!(fields[1], "0.0000");
        assert_eq!(fields[2], "0.0000");
        assert_eq!(fields[4], "1.0000");
    }

    #[test]
    fn up_slot_is_rotated_local_down() {
        let orientation = DQuat::from_rotation_x(std::f64::consts::FRAC_PI_2);
        let pose = CameraPose {
            position: DVec3::ZERO,
            direction: orientation * DVec3::NEG_Z,
            orientation,
        };
        let up = to_domain_axes(pose.encoded_up());
        let encoded = encode_camera_state(&pose);
        let fields: Vec<&str> = encoded.split('_').collect();
        assert_eq!(fields[6], to_fixed4(up.x));
        assert_eq!(fields[8], to_fixed4(up.z));
        // local -Y rotated +90 deg about X points to native -Z, domain +Y.
        assert_eq!(fields[7], "1.0000");
    }

    #[test]
    fn screenshot_name_has_eleven_fixed_fields() {
        let name = screenshot_file_name(&identity_pose(DVec3::new(0.0, 0.0, 3000.0)), -12.5, 45.0);
        let stem = name.strip_suffix(".png").expect("png suffix");
        let fields: Vec<&str> = stem.split('_').collect();
        assert_eq!(fields.len(), 11);
        assert!(fields.iter().all(|field| has_four_decimals(field)), "{name}");
        assert_eq!(fields[9], "-12.5000");
        assert_eq!(fields[10], "45.0000");
    }
}
