use std::f64::consts::PI;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::calibration::{CalibrationProfile, WeightModel};
use crate::color::{HsvImage, HUE_MAX};
use crate::mask::{BinaryMask, PixelBounds};
use crate::segmentation::Segmentation;

/// Grey levels used for the co-occurrence texture measure
pub const TEXTURE_LEVELS: usize = 64;

/// Specimens smaller than this many pixels get no texture score
pub const MIN_TEXTURE_PIXELS: u64 = 10;

/// Calibrated physical measurements of a specimen
///
/// All fields are finite and non-negative. `ratio` is `length_cm /
/// diameter_cm`, or 0 when the diameter is 0.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeometricMeasurement {
    pub length_cm: f64,
    pub diameter_cm: f64,
    pub weight_est_g: f64,
    pub ratio: f64,
}

impl GeometricMeasurement {
    /// Build a measurement, deriving the length/diameter ratio
    pub fn new(length_cm: f64, diameter_cm: f64, weight_est_g: f64) -> Self {
        let length_cm = non_negative(length_cm);
        let diameter_cm = non_negative(diameter_cm);
        let ratio = if diameter_cm > 0.0 {
            length_cm / diameter_cm
        } else {
            0.0
        };
        Self {
            length_cm,
            diameter_cm,
            weight_est_g: non_negative(weight_est_g),
            ratio,
        }
    }

    /// The measurement of "no specimen"
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn is_zero(&self) -> bool {
        self.length_cm == 0.0 && self.diameter_cm == 0.0 && self.weight_est_g == 0.0
    }
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Colour and surface descriptors of a specimen
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AppearanceFeatures {
    /// Mean hue over the specimen, scaled to `[0, 1]`
    pub hue_mean: f64,
    /// Co-occurrence smoothness of the saturation channel, in `[0, 1]`
    pub texture_score: f64,
}

/// Everything extracted from one segmented photograph
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SpecimenFeatures {
    pub geometry: GeometricMeasurement,
    pub appearance: AppearanceFeatures,
}

/// Extract geometry and appearance from a segmentation
pub fn extract(segmentation: &Segmentation, calibration: &CalibrationProfile) -> SpecimenFeatures {
    SpecimenFeatures {
        geometry: measure_geometry(&segmentation.mask, calibration),
        appearance: extract_appearance(&segmentation.segmented, &segmentation.mask),
    }
}

/// Measure the largest foreground region of a mask in physical units
///
/// An empty mask measures as all zeros.
pub fn measure_geometry(mask: &BinaryMask, calibration: &CalibrationProfile) -> GeometricMeasurement {
    let Some(component) = mask.largest_component() else {
        return GeometricMeasurement::zero();
    };

    let cm_per_pixel = calibration.cm_per_pixel();
    let width_cm = f64::from(component.bounds.width()) * cm_per_pixel * calibration.bbox_shrink;
    let height_cm = f64::from(component.bounds.height()) * cm_per_pixel * calibration.bbox_shrink;

    let length_cm = width_cm.max(height_cm);
    let diameter_cm = width_cm.min(height_cm);

    let weight_g = match calibration.weight_model {
        WeightModel::Cylinder => {
            let radius_cm = diameter_cm / 2.0;
            let volume_cm3 = PI * radius_cm * radius_cm * length_cm;
            calibration.density_g_per_cm3 * volume_cm3 * calibration.scale_factor
        }
        WeightModel::AreaPowerLaw { k, exponent } => {
            let area_cm2 = component.area as f64 * cm_per_pixel * cm_per_pixel;
            k * area_cm2.powf(exponent)
        }
    };

    debug!(
        "largest region {}x{} px, {} px area -> {:.3} x {:.3} cm, {:.3} g",
        component.bounds.width(),
        component.bounds.height(),
        component.area,
        length_cm,
        diameter_cm,
        weight_g
    );

    GeometricMeasurement::new(length_cm, diameter_cm, weight_g.max(0.0))
}

/// Mean hue and co-occurrence texture of the masked specimen
pub fn extract_appearance(segmented: &HsvImage, mask: &BinaryMask) -> AppearanceFeatures {
    let Some(component) = mask.largest_component() else {
        return AppearanceFeatures::default();
    };

    let bounds = component.bounds;
    let mut hue_sum = 0.0;
    let mut count = 0u64;
    for y in bounds.min_y..=bounds.max_y {
        for x in bounds.min_x..=bounds.max_x {
            if mask.get(x, y) {
                hue_sum += f64::from(segmented.pixel(x, y)[0]);
                count += 1;
            }
        }
    }
    let hue_mean = if count > 0 {
        (hue_sum / count as f64 / f64::from(HUE_MAX)).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let texture_score = if count < MIN_TEXTURE_PIXELS {
        0.0
    } else {
        texture_score(segmented, mask, &bounds)
    };

    AppearanceFeatures {
        hue_mean,
        texture_score,
    }
}

/// Quantize the saturation channel inside `bounds` to [`TEXTURE_LEVELS`]
/// levels, with everything outside the mask at level 0
fn quantized_saturation(segmented: &HsvImage, mask: &BinaryMask, bounds: &PixelBounds) -> Vec<Vec<usize>> {
    let mut min = u8::MAX;
    let mut max = u8::MIN;
    for y in bounds.min_y..=bounds.max_y {
        for x in bounds.min_x..=bounds.max_x {
            let s = segmented.pixel(x, y)[1];
            min = min.min(s);
            max = max.max(s);
        }
    }

    let span = f64::from(max) - f64::from(min);
    let top = (TEXTURE_LEVELS - 1) as f64;

    (bounds.min_y..=bounds.max_y)
        .map(|y| {
            (bounds.min_x..=bounds.max_x)
                .map(|x| {
                    if !mask.get(x, y) || span == 0.0 {
                        return 0;
                    }
                    let s = f64::from(segmented.pixel(x, y)[1]);
                    ((s - f64::from(min)) * top / span).round() as usize
                })
                .collect()
        })
        .collect()
}

/// `(homogeneity + energy) / 2 · (1 − contrast / (contrast + 1))`, averaged
/// over distances {1, 2} and angles {0, π/4, π/2}
fn texture_score(segmented: &HsvImage, mask: &BinaryMask, bounds: &PixelBounds) -> f64 {
    let levels = quantized_saturation(segmented, mask, bounds);
    let rows = levels.len() as i64;
    let cols = levels.first().map_or(0, Vec::len) as i64;

    let mut contrast = 0.0;
    let mut homogeneity = 0.0;
    let mut energy = 0.0;
    let mut matrices = 0u32;

    for distance in [1.0_f64, 2.0] {
        for angle in [0.0, PI / 4.0, PI / 2.0] {
            let dr = (angle.sin() * distance).round() as i64;
            let dc = (angle.cos() * distance).round() as i64;

            let mut glcm = vec![0.0_f64; TEXTURE_LEVELS * TEXTURE_LEVELS];
            let mut total = 0.0;
            for r in 0..rows {
                for c in 0..cols {
                    let (r2, c2) = (r + dr, c + dc);
                    if r2 < 0 || r2 >= rows || c2 < 0 || c2 >= cols {
                        continue;
                    }
                    let i = levels[r as usize][c as usize];
                    let j = levels[r2 as usize][c2 as usize];
                    glcm[i * TEXTURE_LEVELS + j] += 1.0;
                    glcm[j * TEXTURE_LEVELS + i] += 1.0;
                    total += 2.0;
                }
            }
            if total == 0.0 {
                continue;
            }

            let mut m_contrast = 0.0;
            let mut m_homogeneity = 0.0;
            let mut m_energy = 0.0;
            for i in 0..TEXTURE_LEVELS {
                for j in 0..TEXTURE_LEVELS {
                    let p = glcm[i * TEXTURE_LEVELS + j] / total;
                    if p == 0.0 {
                        continue;
                    }
                    let diff = i as f64 - j as f64;
                    m_contrast += p * diff * diff;
                    m_homogeneity += p / (1.0 + diff * diff);
                    m_energy += p * p;
                }
            }

            contrast += m_contrast;
            homogeneity += m_homogeneity;
            energy += m_energy.sqrt();
            matrices += 1;
        }
    }

    if matrices == 0 {
        return 0.0;
    }

    let n = f64::from(matrices);
    let (contrast, homogeneity, energy) = (contrast / n, homogeneity / n, energy / n);
    let score = (homogeneity + energy) / 2.0 * (1.0 - contrast / (contrast + 1.0));
    score.clamp(0.0, 1.0)
}
