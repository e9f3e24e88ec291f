//! Colour handling and preprocessing
//!
//! Specimen photographs are decoded into RGB, lightly denoised and converted
//! into an 8-bit hue/saturation/value raster: hue in `[0, 180)`, saturation
//! and value in `[0, 255]`.

use image::{DynamicImage, GenericImageView, ImageBuffer, Rgb, RgbImage};
use serde::{Deserialize, Serialize};

use crate::error::{GradeError, Result};

/// Largest hue value in the 8-bit encoding (exclusive upper bound is 180)
pub const HUE_MAX: u8 = 180;

/// An 8-bit HSV raster
///
/// Channel 0 is hue, channel 1 saturation, channel 2 value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HsvImage {
    buffer: ImageBuffer<Rgb<u8>, Vec<u8>>,
}

impl HsvImage {
    /// An all-zero raster
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            buffer: ImageBuffer::new(width, height),
        }
    }

    /// Convert an RGB raster
    pub fn from_rgb(image: &RgbImage) -> Self {
        let buffer = imageproc::map::map_colors(image, |p| Rgb(rgb_to_hsv(p.0)));
        Self { buffer }
    }

    /// Wrap raw HSV channel triples laid out row by row
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        ImageBuffer::from_raw(width, height, data)
            .map(|buffer| Self { buffer })
            .ok_or_else(|| {
                GradeError::InvalidImage(format!(
                    "HSV buffer length does not match {width}x{height}x3"
                ))
            })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.buffer.dimensions()
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    /// HSV triple at `(x, y)`
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        self.buffer.get_pixel(x, y).0
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, hsv: [u8; 3]) {
        self.buffer.put_pixel(x, y, Rgb(hsv));
    }

    pub(crate) fn buffer_mut(&mut self) -> &mut ImageBuffer<Rgb<u8>, Vec<u8>> {
        &mut self.buffer
    }

    /// Convert back to RGB for display
    pub fn to_rgb(&self) -> RgbImage {
        imageproc::map::map_colors(&self.buffer, |p| Rgb(hsv_to_rgb(p.0)))
    }
}

/// Convert one RGB pixel to 8-bit HSV
pub fn rgb_to_hsv(rgb: [u8; 3]) -> [u8; 3] {
    let [r, g, b] = rgb.map(f64::from);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let saturation = if max > 0.0 { 255.0 * delta / max } else { 0.0 };

    let mut hue = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (g - b) / delta
    } else if max == g {
        120.0 + 60.0 * (b - r) / delta
    } else {
        240.0 + 60.0 * (r - g) / delta
    };
    if hue < 0.0 {
        hue += 360.0;
    }

    let hue = (hue / 2.0).round() % f64::from(HUE_MAX);

    [hue as u8, saturation.round() as u8, max as u8]
}

/// Convert one 8-bit HSV pixel back to RGB
pub fn hsv_to_rgb(hsv: [u8; 3]) -> [u8; 3] {
    let hue = f64::from(hsv[0]) * 2.0;
    let saturation = f64::from(hsv[1]) / 255.0;
    let value = f64::from(hsv[2]);

    let chroma = value * saturation;
    let sector = (hue / 60.0) % 6.0;
    let x = chroma * (1.0 - ((sector % 2.0) - 1.0).abs());
    let m = value - chroma;

    let (r, g, b) = match sector as u32 {
        0 => (chroma, x, 0.0),
        1 => (x, chroma, 0.0),
        2 => (0.0, chroma, x),
        3 => (0.0, x, chroma),
        4 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };

    [
        (r + m).round().clamp(0.0, 255.0) as u8,
        (g + m).round().clamp(0.0, 255.0) as u8,
        (b + m).round().clamp(0.0, 255.0) as u8,
    ]
}

/// An inclusive box in HSV space, used as a colour band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HsvRange {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl HsvRange {
    pub const fn new(lower: [u8; 3], upper: [u8; 3]) -> Self {
        Self { lower, upper }
    }

    /// True if every channel lies within the band
    pub fn contains(&self, hsv: [u8; 3]) -> bool {
        (0..3).all(|c| self.lower[c] <= hsv[c] && hsv[c] <= self.upper[c])
    }
}

/// Settings for turning a decoded photograph into an HSV raster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Exact resize applied before anything else
    pub target_size: Option<(u32, u32)>,
    /// Sigma of the denoising blur; `None` disables it
    pub denoise_sigma: Option<f32>,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            target_size: None,
            denoise_sigma: Some(0.8),
        }
    }
}

/// Decode an encoded photograph
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    if bytes.is_empty() {
        return Err(GradeError::InvalidImage("empty image data".to_string()));
    }
    Ok(image::load_from_memory(bytes)?)
}

/// Resize, denoise and convert a photograph to HSV
pub fn preprocess(image: &DynamicImage, config: &PreprocessConfig) -> Result<HsvImage> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(GradeError::InvalidImage(format!(
            "image has zero area ({width}x{height})"
        )));
    }

    let mut rgb = image.to_rgb8();

    if let Some((target_width, target_height)) = config.target_size {
        if target_width == 0 || target_height == 0 {
            return Err(GradeError::InvalidConfig(format!(
                "target size must be non-zero, got {target_width}x{target_height}"
            )));
        }
        rgb = image::imageops::resize(
            &rgb,
            target_width,
            target_height,
            image::imageops::FilterType::Triangle,
        );
    }

    if let Some(sigma) = config.denoise_sigma {
        if !(sigma > 0.0) {
            return Err(GradeError::InvalidConfig(format!(
                "denoise sigma must be positive, got {sigma}"
            )));
        }
        rgb = imageproc::filter::gaussian_blur_f32(&rgb, sigma);
    }

    Ok(HsvImage::from_rgb(&rgb))
}
