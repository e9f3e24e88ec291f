//! Colour-band segmentation of a single specimen
//!
//! The specimen is separated from its backdrop by hue bands, cleaned with
//! morphology and reduced to its single largest 8-connected region.

use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::color::{HsvImage, HsvRange};
use crate::error::{GradeError, Result};
use crate::mask::{BinaryMask, BACKGROUND, FOREGROUND};

/// Fringe suppression around the specimen outline
///
/// A pixel is cleared only where the blurred, dilated fringe band is at full
/// intensity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HaloConfig {
    /// Moderately bright, weakly saturated pixels forming the fringe
    pub band: HsvRange,
    /// Sigma of the blur that widens the fringe band
    pub blur_sigma: f32,
    /// Extra dilation of the fringe band, in pixels
    pub dilate_radius: u8,
}

impl Default for HaloConfig {
    fn default() -> Self {
        Self {
            band: HsvRange::new([0, 0, 130], [180, 70, 255]),
            blur_sigma: 1.1,
            dilate_radius: 1,
        }
    }
}

/// Configuration for specimen segmentation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Plausible specimen colours; their union forms the candidate mask
    pub specimen_bands: Vec<HsvRange>,
    /// Backdrop colours removed from the candidate mask
    pub background_bands: Vec<HsvRange>,
    /// Radius of the closing pass (3x3 square element applied `radius` times)
    pub close_radius: u8,
    /// Radius of the opening pass
    pub open_radius: u8,
    pub halo: Option<HaloConfig>,
    /// Sigma of the final outline smoothing; `None` disables it
    pub smoothing_sigma: Option<f32>,
    /// Intensity the smoothed mask must exceed to stay foreground
    pub smoothing_threshold: u8,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            specimen_bands: vec![
                // red skin, both sides of the hue wrap
                HsvRange::new([0, 40, 40], [15, 255, 255]),
                HsvRange::new([160, 40, 40], [180, 255, 255]),
                // green bracts
                HsvRange::new([35, 40, 40], [90, 255, 255]),
                // yellow varieties
                HsvRange::new([20, 40, 40], [45, 255, 255]),
            ],
            background_bands: vec![
                HsvRange::new([0, 0, 160], [180, 60, 255]),
                HsvRange::new([0, 0, 0], [180, 100, 50]),
            ],
            close_radius: 2,
            open_radius: 1,
            halo: Some(HaloConfig::default()),
            smoothing_sigma: Some(0.8),
            smoothing_threshold: 100,
        }
    }
}

impl SegmentationConfig {
    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.specimen_bands.is_empty() {
            return Err(GradeError::InvalidConfig(
                "at least one specimen colour band is required".to_string(),
            ));
        }

        if let Some(halo) = &self.halo {
            if !(halo.blur_sigma > 0.0) {
                return Err(GradeError::InvalidConfig(format!(
                    "halo blur sigma must be positive, got {}",
                    halo.blur_sigma
                )));
            }
        }

        if let Some(sigma) = self.smoothing_sigma {
            if !(sigma > 0.0) {
                return Err(GradeError::InvalidConfig(format!(
                    "smoothing sigma must be positive, got {sigma}"
                )));
            }
        }

        Ok(())
    }
}

/// Output of segmentation
#[derive(Debug, Clone)]
pub struct Segmentation {
    /// The HSV input with every non-specimen pixel zeroed
    pub segmented: HsvImage,
    /// At most one solid foreground region
    pub mask: BinaryMask,
}

impl Segmentation {
    /// True if a specimen survived segmentation
    pub fn found_specimen(&self) -> bool {
        !self.mask.is_empty()
    }
}

/// Colour-band specimen segmenter
#[derive(Debug, Clone, Default)]
pub struct Segmenter {
    config: SegmentationConfig,
}

impl Segmenter {
    /// Create a segmenter from a validated configuration
    pub fn new(config: SegmentationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SegmentationConfig {
        &self.config
    }

    /// Isolate the specimen from its background
    ///
    /// An image without any specimen-coloured region yields an empty mask and
    /// an all-zero segmented image.
    pub fn segment(&self, image: &HsvImage) -> Segmentation {
        let candidate = self.band_mask(image);
        debug!("candidate mask: {} px", candidate.foreground_count());

        let cleaned = self.morphology(&candidate);

        let cleaned = match &self.config.halo {
            Some(halo) => cleaned.subtract(&halo_mask(image, halo)),
            None => cleaned,
        };
        debug!("after morphology and halo: {} px", cleaned.foreground_count());

        let mut mask = cleaned.largest_filled();

        if let Some(sigma) = self.config.smoothing_sigma {
            if !mask.is_empty() {
                let blurred = imageproc::filter::gaussian_blur_f32(mask.as_gray(), sigma);
                let smoothed =
                    imageproc::contrast::threshold(&blurred, self.config.smoothing_threshold);
                // smoothing can pinch off thin necks
                mask = BinaryMask::from_gray(&smoothed).largest_filled();
            }
        }
        debug!("final mask: {} px", mask.foreground_count());

        let segmented = apply_mask(image, &mask);
        Segmentation { segmented, mask }
    }

    /// Specimen colours minus backdrop colours
    fn band_mask(&self, image: &HsvImage) -> BinaryMask {
        let (width, height) = image.dimensions();
        BinaryMask::from_fn(width, height, |x, y| {
            let hsv = image.pixel(x, y);
            self.config.specimen_bands.iter().any(|b| b.contains(hsv))
                && !self.config.background_bands.iter().any(|b| b.contains(hsv))
        })
    }

    /// Closing bridges small gaps, opening removes speckle
    fn morphology(&self, mask: &BinaryMask) -> BinaryMask {
        let mut gray = mask.as_gray().clone();
        if self.config.close_radius > 0 {
            gray = imageproc::morphology::close(&gray, Norm::LInf, self.config.close_radius);
        }
        if self.config.open_radius > 0 {
            gray = imageproc::morphology::open(&gray, Norm::LInf, self.config.open_radius);
        }
        BinaryMask::from_gray(&gray)
    }
}

fn halo_mask(image: &HsvImage, halo: &HaloConfig) -> BinaryMask {
    let (width, height) = image.dimensions();
    let band = GrayImage::from_fn(width, height, |x, y| {
        Luma([if halo.band.contains(image.pixel(x, y)) {
            FOREGROUND
        } else {
            BACKGROUND
        }])
    });

    let mut widened = imageproc::filter::gaussian_blur_f32(&band, halo.blur_sigma);
    if halo.dilate_radius > 0 {
        widened = imageproc::morphology::dilate(&widened, Norm::LInf, halo.dilate_radius);
    }

    // only saturated fringe counts; partial values still touch the specimen
    BinaryMask::from_fn(width, height, |x, y| widened.get_pixel(x, y)[0] == FOREGROUND)
}

/// Zero every pixel outside the mask
pub fn apply_mask(image: &HsvImage, mask: &BinaryMask) -> HsvImage {
    let mut segmented = image.clone();
    for (x, y, pixel) in segmented.buffer_mut().enumerate_pixels_mut() {
        if !mask.get(x, y) {
            pixel.0 = [0, 0, 0];
        }
    }
    segmented
}
