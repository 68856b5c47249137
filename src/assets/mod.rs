//! Moon surface textures: albedo, displacement and normal map.

use glam::Vec3;
use image::{GrayImage, RgbImage};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to read texture at {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode texture at {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: image::ImageError,
    },
    #[error("texture at {path} has no pixels")]
    Empty { path: String },
}

/// Paths of the three moon rasters.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TexturePaths {
    pub albedo: PathBuf,
    pub displacement: PathBuf,
    pub normal: PathBuf,
}

impl Default for TexturePaths {
    fn default() -> Self {
        Self {
            albedo: PathBuf::from("assets/moon_texture.png"),
            displacement: PathBuf::from("assets/scaled_moon_displacement.png"),
            normal: PathBuf::from("assets/moon_normal_map.png"),
        }
    }
}

/// 8-bit RGB raster sampled bilinearly with clamp-to-edge addressing.
#[derive(Debug, Clone)]
pub struct ColorTexture {
    image: RgbImage,
    srgb: bool,
}

/// Single-channel float raster, values nominally in [0, 1].
#[derive(Debug, Clone)]
pub struct ScalarTexture {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

pub struct TextureSet {
    pub albedo: ColorTexture,
    pub displacement: ScalarTexture,
    pub normal: ColorTexture,
}

fn srgb_to_linear_lut() -> &'static [f32; 256] {
    static LUT: OnceLock<[f32; 256]> = OnceLock::new();
    LUT.get_or_init(|| {
        let mut lut = [0.0f32; 256];
        for (i, value) in lut.iter_mut().enumerate() {
            let c = i as f32 / 255.0;
            *value = if c <= 0.04045 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            };
        }
        lut
    })
}

/// Pixel-center bilinear footprint for a normalized coordinate.
fn footprint(coord: f32, size: u32) -> (u32, u32, f32) {
    let max = size.saturating_sub(1);
    let texel = (coord * size as f32 - 0.5).clamp(0.0, max as f32);
    let i0 = texel.floor() as u32;
    let i1 = (i0 + 1).min(max);
    (i0, i1, texel - i0 as f32)
}

impl ColorTexture {
    pub fn new(image: RgbImage, srgb: bool) -> Self {
        Self { image, srgb }
    }

    /// Single texel texture, e.g. a flat normal or plain white albedo.
    pub fn solid(rgb: [u8; 3], srgb: bool) -> Self {
        Self::new(RgbImage::from_pixel(1, 1, image::Rgb(rgb)), srgb)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    fn texel(&self, x: u32, y: u32) -> Vec3 {
        let [r, g, b] = self.image.get_pixel(x, y).0;
        if self.srgb {
            let lut = srgb_to_linear_lut();
            Vec3::new(lut[r as usize], lut[g as usize], lut[b as usize])
        } else {
            Vec3::new(r as f32, g as f32, b as f32) / 255.0
        }
    }

    /// `u` runs left to right, `t` runs top row to bottom row.
    pub fn sample(&self, u: f32, t: f32) -> Vec3 {
        let (w, h) = self.image.dimensions();
        let (x0, x1, fx) = footprint(u, w);
        let (y0, y1, fy) = footprint(t, h);
        let top = self.texel(x0, y0).lerp(self.texel(x1, y0), fx);
        let bottom = self.texel(x0, y1).lerp(self.texel(x1, y1), fx);
        top.lerp(bottom, fy)
    }
}

impl ScalarTexture {
    pub fn new(width: u32, height: u32, values: Vec<f32>) -> Self {
        debug_assert_eq!(values.len(), (width as usize) * (height as usize));
        Self {
            width,
            height,
            values,
        }
    }

    pub fn solid(value: f32) -> Self {
        Self::new(1, 1, vec![value])
    }

    pub fn from_gray(image: &GrayImage) -> Self {
        let (width, height) = image.dimensions();
        let values = image.pixels().map(|p| p.0[0] as f32 / 255.0).collect();
        Self::new(width, height, values)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn texel(&self, x: u32, y: u32) -> f32 {
        self.values[(y as usize) * (self.width as usize) + (x as usize)]
    }

    pub fn sample(&self, u: f32, t: f32) -> f32 {
        let (x0, x1, fx) = footprint(u, self.width);
        let (y0, y1, fy) = footprint(t, self.height);
        let top = self.texel(x0, y0) + (self.texel(x1, y0) - self.texel(x0, y0)) * fx;
        let bottom = self.texel(x0, y1) + (self.texel(x1, y1) - self.texel(x0, y1)) * fx;
        top + (bottom - top) * fy
    }
}

impl TextureSet {
    /// White albedo, no relief, flat normals.
    pub fn neutral() -> Self {
        Self {
            albedo: ColorTexture::solid([255, 255, 255], true),
            displacement: ScalarTexture::solid(0.0),
            normal: ColorTexture::solid([128, 128, 255], false),
        }
    }

    /// Loads all three rasters, substituting the neutral texture for any that fail.
    pub fn load_or_neutral(paths: &TexturePaths) -> Self {
        let neutral = Self::neutral();
        let albedo = load_color_texture(&paths.albedo, true).unwrap_or_else(|err| {
            log::warn!("Albedo unavailable, using white: {}", err);
            neutral.albedo
        });
        let displacement = load_scalar_texture(&paths.displacement).unwrap_or_else(|err| {
            log::warn!("Displacement unavailable, surface will be smooth: {}", err);
            neutral.displacement
        });
        let normal = load_color_texture(&paths.normal, false).unwrap_or_else(|err| {
            log::warn!("Normal map unavailable, using flat normals: {}", err);
            neutral.normal
        });
        Self {
            albedo,
            displacement,
            normal,
        }
    }
}

pub(crate) fn open_image(path: &Path) -> Result<image::DynamicImage, AssetError> {
    let display = path.display().to_string();
    let read_error = |source| AssetError::Read {
        path: display.clone(),
        source,
    };
    let mut reader = image::ImageReader::open(path)
        .map_err(read_error)?
        .with_guessed_format()
        .map_err(read_error)?;
    // Lunar rasters routinely exceed the decoder's default allocation limit.
    reader.no_limits();
    let image = reader.decode().map_err(|source| AssetError::Decode {
        path: display.clone(),
        source,
    })?;
    if image.width() == 0 || image.height() == 0 {
        return Err(AssetError::Empty { path: display });
    }
    Ok(image)
}

pub fn load_color_texture(path: &Path, srgb: bool) -> Result<ColorTexture, AssetError> {
    let image = open_image(path)?;
    log::info!(
        "Loaded texture {} ({}x{})",
        path.display(),
        image.width(),
        image.height()
    );
    Ok(ColorTexture::new(image.to_rgb8(), srgb))
}

pub fn load_scalar_texture(path: &Path) -> Result<ScalarTexture, AssetError> {
    let image = open_image(path)?.to_luma32f();
    let (width, height) = image.dimensions();
    log::info!("Loaded displacement {} ({}x{})", path.display(), width, height);
    Ok(ScalarTexture::new(width, height, image.into_raw()))
}
