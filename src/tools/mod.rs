//! Offline preparation of the moon rasters: displacement normalization,
//! normal-map baking and format conversion.

use crate::assets::{open_image, AssetError};
use image::{DynamicImage, ImageBuffer, Luma, RgbImage};
use std::path::{Path, PathBuf};

pub type HeightField = ImageBuffer<Luma<f32>, Vec<f32>>;

#[derive(Debug, thiserror::Error)]
pub enum MapToolError {
    #[error(transparent)]
    Asset(#[from] AssetError),
    #[error("failed writing {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: image::ImageError,
    },
}

fn write_error(path: &Path) -> impl FnOnce(image::ImageError) -> MapToolError + '_ {
    move |source| MapToolError::Write {
        path: path.display().to_string(),
        source,
    }
}

pub fn load_height_field(path: &Path) -> Result<HeightField, MapToolError> {
    Ok(open_image(path)?.to_luma32f())
}

/// Min-max normalizes heights into [0, 1] as 16-bit gray. A constant field maps to 0.
pub fn normalize_heights(field: &HeightField) -> ImageBuffer<Luma<u16>, Vec<u16>> {
    let (min, max) = field
        .as_raw()
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let span = max - min;
    ImageBuffer::from_fn(field.width(), field.height(), |x, y| {
        let v = field.get_pixel(x, y).0[0];
        let unit = if span > 0.0 { (v - min) / span } else { 0.0 };
        Luma([(unit * u16::MAX as f32).round() as u16])
    })
}

/// Derivative at `i` of a sequence of `len` samples: central differences
/// inside, one-sided at both ends.
fn gradient(len: u32, i: u32, sample: impl Fn(u32) -> f32) -> f32 {
    if len < 2 {
        0.0
    } else if i == 0 {
        sample(1) - sample(0)
    } else if i == len - 1 {
        sample(i) - sample(i - 1)
    } else {
        (sample(i + 1) - sample(i - 1)) * 0.5
    }
}

/// Bakes a tangent-space normal map: `n = normalize(-dz/dx, -dz/dy, 1)`,
/// stored as `(n + 1) * 127.5` truncated to bytes.
pub fn normal_map(field: &HeightField, height_scale: f32) -> RgbImage {
    let (width, height) = field.dimensions();
    let z = |x: u32, y: u32| field.get_pixel(x, y).0[0] * height_scale;
    RgbImage::from_fn(width, height, |x, y| {
        let dz_dx = gradient(width, x, |i| z(i, y));
        let dz_dy = gradient(height, y, |j| z(x, j));
        let n = glam::Vec3::new(-dz_dx, -dz_dy, 1.0).normalize();
        let encode = |c: f32| ((c + 1.0) * 127.5) as u8;
        image::Rgb([encode(n.x), encode(n.y), encode(n.z)])
    })
}

pub fn scale_displacement(input: &Path, output: &Path) -> Result<(), MapToolError> {
    let field = load_height_field(input)?;
    normalize_heights(&field)
        .save_with_format(output, image::ImageFormat::Png)
        .map_err(write_error(output))?;
    log::info!("Normalized displacement written to {}", output.display());
    Ok(())
}

pub fn displacement_to_normal_map(
    input: &Path,
    output: &Path,
    height_scale: f32,
) -> Result<(), MapToolError> {
    let field = load_height_field(input)?;
    log::info!("Calculating normal map for {}x{} field", field.width(), field.height());
    normal_map(&field, height_scale)
        .save_with_format(output, image::ImageFormat::Png)
        .map_err(write_error(output))?;
    log::info!("Normal map written to {}", output.display());
    Ok(())
}

/// `output` with a `.png` extension added unless it already has one.
pub fn png_path(output: &Path) -> PathBuf {
    let is_png = output
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
    if is_png {
        output.to_path_buf()
    } else {
        let mut name = output.as_os_str().to_owned();
        name.push(".png");
        PathBuf::from(name)
    }
}

/// Re-encodes any readable raster as PNG and returns the written path.
pub fn convert_to_png(input: &Path, output: &Path) -> Result<PathBuf, MapToolError> {
    let image = open_image(input)?;
    // PNG has no float pixel formats.
    let image = match image {
        DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_) => {
            DynamicImage::ImageRgba16(image.to_rgba16())
        }
        other => other,
    };
    let path = png_path(output);
    image
        .save_with_format(&path, image::ImageFormat::Png)
        .map_err(write_error(&path))?;
    log::info!("Converted {} to {}", input.display(), path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::{
        convert_to_png, normal_map, normalize_heights, png_path, scale_displacement, HeightField,
    };
    use image::{GrayImage, Luma};
    use std::path::Path;

    fn temp_path(name: &str) -> std::path::PathBuf {
        let nonce = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("moonviz_{}_{}_{}", std::process::id(), nonce, name))
    }

    #[test]
    fn normalization_spans_full_range() {
        let field = HeightField::from_fn(3, 1, |x, _| Luma([-2.0 + x as f32 * 3.0]));
        let scaled = normalize_heights(&field);
        assert_eq!(scaled.get_pixel(0, 0).0[0], 0);
        assert_eq!(scaled.get_pixel(1, 0).0[0], 32768);
        assert_eq!(scaled.get_pixel(2, 0).0[0], u16::MAX);
    }

    #[test]
    fn constant_field_normalizes_to_zero() {
        let field = HeightField::from_pixel(4, 4, Luma([7.0]));
        assert!(normalize_heights(&field).pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn flat_field_points_straight_out() {
        let field = HeightField::from_pixel(3, 3, Luma([0.25]));
        let normals = normal_map(&field, 1.0);
        assert!(normals.pixels().all(|p| p.0 == [127, 127, 255]));
    }

    #[test]
    fn ramp_tilts_normal_against_slope() {
        // z = x: dz/dx = 1 everywhere, including the one-sided edges.
        let field = HeightField::from_fn(4, 2, |x, _| Luma([x as f32]));
        let normals = normal_map(&field, 1.0);
        let inv_sqrt2 = std::f32::consts::FRAC_1_SQRT_2;
        let expected = [
            ((1.0 - inv_sqrt2) * 127.5) as u8,
            127,
            ((1.0 + inv_sqrt2) * 127.5) as u8,
        ];
        for x in 0..4 {
            assert_eq!(normals.get_pixel(x, 1).0, expected);
        }
    }

    #[test]
    fn height_scale_steepens_normals() {
        let field = HeightField::from_fn(3, 3, |_, y| Luma([y as f32 * 0.1]));
        let gentle = normal_map(&field, 1.0).get_pixel(1, 1).0[1];
        let steep = normal_map(&field, 20.0).get_pixel(1, 1).0[1];
        assert!(steep < gentle);
    }

    #[test]
    fn png_extension_is_appended_once() {
        assert_eq!(png_path(Path::new("out/moon")), Path::new("out/moon.png"));
        assert_eq!(png_path(Path::new("moon.PNG")), Path::new("moon.PNG"));
        assert_eq!(png_path(Path::new("moon.tif")), Path::new("moon.tif.png"));
    }

    #[test]
    fn scale_and_convert_via_files() {
        let source = temp_path("source.png");
        GrayImage::from_fn(4, 1, |x, _| Luma([(x * 60) as u8]))
            .save(&source)
            .unwrap();

        let scaled = temp_path("scaled.png");
        scale_displacement(&source, &scaled).unwrap();
        let reloaded = image::open(&scaled).unwrap().to_luma16();
        assert_eq!(reloaded.get_pixel(0, 0).0[0], 0);
        assert_eq!(reloaded.get_pixel(3, 0).0[0], u16::MAX);

        let converted = convert_to_png(&source, &temp_path("converted")).unwrap();
        assert_eq!(converted.extension().unwrap(), "png");
        assert_eq!(image::open(&converted).unwrap().to_luma8().get_pixel(2, 0).0[0], 120);

        for path in [source, scaled, converted] {
            let _ = std::fs::remove_file(path);
        }
    }

    #[test]
    fn missing_input_is_reported() {
        let err = scale_displacement(Path::new("no/such/map.tif"), Path::new("unused.png"))
            .unwrap_err();
        assert!(err.to_string().contains("no/such/map.tif"));
    }
}
