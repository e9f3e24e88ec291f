use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config;
use crate::error::{GradeError, Result};

/// Default pixel density of the reference rig (3060 px across a 30 cm board)
pub const DEFAULT_PIXEL_PER_CM: f64 = 102.0;

/// Default specimen density in g/cm³
pub const DEFAULT_DENSITY_G_PER_CM3: f64 = 0.22;

/// Default empirical correction applied to the volumetric weight
pub const DEFAULT_SCALE_FACTOR: f64 = 1.32;

/// Default shrink applied to bounding-box sides to approximate the silhouette
pub const DEFAULT_BBOX_SHRINK: f64 = 0.9;

/// A closed `[lo, hi]` interval used for fixed-range normalization
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FixedRange {
    pub lo: f64,
    pub hi: f64,
}

impl FixedRange {
    pub const fn new(lo: f64, hi: f64) -> Self {
        Self { lo, hi }
    }

    /// A usable range has finite bounds with `hi > lo`
    pub fn is_usable(&self) -> bool {
        self.lo.is_finite() && self.hi.is_finite() && self.hi > self.lo
    }
}

/// Fixed normalization bounds for every graded feature
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureBounds {
    pub length_cm: FixedRange,
    pub diameter_cm: FixedRange,
    pub weight_g: FixedRange,
    pub ratio: FixedRange,
}

impl Default for FeatureBounds {
    fn default() -> Self {
        Self {
            length_cm: FixedRange::new(5.0, 18.0),
            diameter_cm: FixedRange::new(3.0, 12.0),
            weight_g: FixedRange::new(150.0, 650.0),
            ratio: FixedRange::new(1.0, 1.8),
        }
    }
}

/// Model used to turn calibrated geometry into an estimated weight
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WeightModel {
    /// `density · π · r² · length · scale_factor`
    #[default]
    Cylinder,
    /// `k · area_cm² ^ exponent`, fitted against a load cell
    AreaPowerLaw { k: f64, exponent: f64 },
}

/// Empirical constants mapping image-space measurements to physical units
///
/// Loaded once at startup and shared read-only between grading calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationProfile {
    /// Pixels per centimetre at the specimen plane
    pub pixel_per_cm: f64,
    /// Specimen density in g/cm³
    pub density_g_per_cm3: f64,
    /// Empirical multiplier on the volumetric weight
    pub scale_factor: f64,
    /// Correction for bounding-box overestimation of the silhouette
    pub bbox_shrink: f64,
    pub weight_model: WeightModel,
    pub bounds: FeatureBounds,
}

impl Default for CalibrationProfile {
    fn default() -> Self {
        Self {
            pixel_per_cm: DEFAULT_PIXEL_PER_CM,
            density_g_per_cm3: DEFAULT_DENSITY_G_PER_CM3,
            scale_factor: DEFAULT_SCALE_FACTOR,
            bbox_shrink: DEFAULT_BBOX_SHRINK,
            weight_model: WeightModel::default(),
            bounds: FeatureBounds::default(),
        }
    }
}

impl CalibrationProfile {
    /// Set the pixel density
    pub fn with_pixel_per_cm(mut self, pixel_per_cm: f64) -> Self {
        self.pixel_per_cm = pixel_per_cm;
        self
    }

    /// Set density and empirical scale
    pub fn with_density(mut self, density_g_per_cm3: f64, scale_factor: f64) -> Self {
        self.density_g_per_cm3 = density_g_per_cm3;
        self.scale_factor = scale_factor;
        self
    }

    /// Set the weight model
    pub fn with_weight_model(mut self, model: WeightModel) -> Self {
        self.weight_model = model;
        self
    }

    /// Centimetres covered by one pixel
    pub fn cm_per_pixel(&self) -> f64 {
        1.0 / self.pixel_per_cm
    }

    /// Load and validate a profile from a TOML, JSON or YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let profile: Self = config::load(path)?;
        profile.validate()?;
        Ok(profile)
    }

    /// Validate profile consistency
    pub fn validate(&self) -> Result<()> {
        if !self.pixel_per_cm.is_finite() || self.pixel_per_cm <= 0.0 {
            return Err(GradeError::InvalidCalibration(format!(
                "pixel_per_cm must be finite and positive, got {}",
                self.pixel_per_cm
            )));
        }

        if !self.density_g_per_cm3.is_finite() || self.density_g_per_cm3 < 0.0 {
            return Err(GradeError::InvalidCalibration(format!(
                "density_g_per_cm3 must be finite and non-negative, got {}",
                self.density_g_per_cm3
            )));
        }

        if !self.scale_factor.is_finite() || self.scale_factor < 0.0 {
            return Err(GradeError::InvalidCalibration(format!(
                "scale_factor must be finite and non-negative, got {}",
                self.scale_factor
            )));
        }

        if !(self.bbox_shrink > 0.0 && self.bbox_shrink <= 1.0) {
            return Err(GradeError::InvalidCalibration(format!(
                "bbox_shrink must lie in (0, 1], got {}",
                self.bbox_shrink
            )));
        }

        if let WeightModel::AreaPowerLaw { k, exponent } = self.weight_model {
            if !k.is_finite() || k < 0.0 || !exponent.is_finite() || exponent <= 0.0 {
                return Err(GradeError::InvalidCalibration(format!(
                    "area power law needs k >= 0 and exponent > 0, got k={k}, exponent={exponent}"
                )));
            }
        }

        let ranges = [
            ("length_cm", self.bounds.length_cm),
            ("diameter_cm", self.bounds.diameter_cm),
            ("weight_g", self.bounds.weight_g),
            ("ratio", self.bounds.ratio),
        ];
        for (name, range) in ranges {
            if !range.is_usable() {
                return Err(GradeError::InvalidCalibration(format!(
                    "bounds.{name} must be finite with hi > lo, got [{}, {}]",
                    range.lo, range.hi
                )));
            }
        }

        Ok(())
    }
}
