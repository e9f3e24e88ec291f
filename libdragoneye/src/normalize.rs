//! Mapping raw measurements into `[0, 1]`
//!
//! Each feature is scaled against the 5th/95th percentiles of a reference
//! population when one is available and usable, otherwise against fixed
//! calibration bounds. When neither applies the feature normalizes to 0.
//! None of these paths fail.

use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::calibration::{FeatureBounds, FixedRange};
use crate::config;
use crate::error::Result;
use crate::features::GeometricMeasurement;

/// Guards the division when `hi == lo`
pub const NORMALIZE_EPSILON: f64 = 1e-9;

/// Lower percentile of the reference range
pub const LOW_PERCENTILE: f64 = 5.0;

/// Upper percentile of the reference range
pub const HIGH_PERCENTILE: f64 = 95.0;

/// `clip((value - lo) / (hi - lo + ε), 0, 1)`; non-finite values map to 0
pub fn normalize_fixed(value: f64, range: FixedRange) -> f64 {
    let scaled = (value - range.lo) / (range.hi - range.lo + NORMALIZE_EPSILON);
    if scaled.is_nan() {
        return 0.0;
    }
    scaled.clamp(0.0, 1.0)
}

/// Percentile of a sample with linear interpolation between order statistics
///
/// Non-finite samples are ignored. Returns `None` for an empty sample.
pub fn percentile(samples: &[f64], pct: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = samples.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);

    let rank = (pct.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let below = rank.floor() as usize;
    let above = rank.ceil() as usize;
    let fraction = rank - below as f64;
    Some(sorted[below] + (sorted[above] - sorted[below]) * fraction)
}

/// The 5th–95th percentile range of a sample, if it is usable
///
/// A sample is degenerate with fewer than two finite values or when its upper
/// percentile does not exceed its lower one.
pub fn percentile_range(samples: &[f64]) -> Option<FixedRange> {
    if samples.iter().filter(|v| v.is_finite()).count() < 2 {
        return None;
    }
    let lo = percentile(samples, LOW_PERCENTILE)?;
    let hi = percentile(samples, HIGH_PERCENTILE)?;
    let range = FixedRange::new(lo, hi);
    range.is_usable().then_some(range)
}

/// Which strategy produced a normalized value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationSource {
    Percentile,
    Fixed,
    Unavailable,
}

/// A normalized value and how it was obtained
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Normalized {
    pub value: f64,
    pub source: NormalizationSource,
}

/// Normalize with the percentile → fixed → zero fallback chain
pub fn normalize(value: f64, reference: Option<FixedRange>, fixed: Option<FixedRange>) -> Normalized {
    if let Some(range) = reference.filter(FixedRange::is_usable) {
        return Normalized {
            value: normalize_fixed(value, range),
            source: NormalizationSource::Percentile,
        };
    }

    if let Some(range) = fixed.filter(FixedRange::is_usable) {
        return Normalized {
            value: normalize_fixed(value, range),
            source: NormalizationSource::Fixed,
        };
    }

    Normalized {
        value: 0.0,
        source: NormalizationSource::Unavailable,
    }
}

/// Prior measurements used for percentile normalization
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferencePopulation {
    pub length_cm: Vec<f64>,
    pub diameter_cm: Vec<f64>,
    pub weight_est_g: Vec<f64>,
    /// Derived from length and diameter when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratio: Option<Vec<f64>>,
}

impl ReferencePopulation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect a population from measurements
    pub fn from_measurements<'a>(measurements: impl IntoIterator<Item = &'a GeometricMeasurement>) -> Self {
        let mut population = Self {
            ratio: Some(Vec::new()),
            ..Self::default()
        };
        for measurement in measurements {
            population.push(measurement);
        }
        population
    }

    /// Append one measurement
    pub fn push(&mut self, measurement: &GeometricMeasurement) {
        self.length_cm.push(measurement.length_cm);
        self.diameter_cm.push(measurement.diameter_cm);
        self.weight_est_g.push(measurement.weight_est_g);
        if let Some(ratio) = &mut self.ratio {
            ratio.push(measurement.ratio);
        }
    }

    /// Number of weight samples
    pub fn len(&self) -> usize {
        self.weight_est_g.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ratio samples, derived as `length / (diameter + ε)` if not recorded
    pub fn ratio_samples(&self) -> Vec<f64> {
        match &self.ratio {
            Some(ratio) if !ratio.is_empty() => ratio.clone(),
            _ => self
                .length_cm
                .iter()
                .zip(&self.diameter_cm)
                .map(|(length, diameter)| length / (diameter + NORMALIZE_EPSILON))
                .collect(),
        }
    }

    /// Load a population from a TOML, JSON or YAML file
    pub fn load(path: &Path) -> Result<Self> {
        config::load(path)
    }

    /// Write the population to a TOML, JSON or YAML file
    pub fn save(&self, path: &Path) -> Result<()> {
        config::save(self, path)
    }
}

/// Percentile ranges of a reference population, computed once per population
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ReferenceRanges {
    pub length_cm: Option<FixedRange>,
    pub diameter_cm: Option<FixedRange>,
    pub weight_g: Option<FixedRange>,
    pub ratio: Option<FixedRange>,
}

impl ReferenceRanges {
    pub fn from_population(population: &ReferencePopulation) -> Self {
        let ranges = Self {
            length_cm: percentile_range(&population.length_cm),
            diameter_cm: percentile_range(&population.diameter_cm),
            weight_g: percentile_range(&population.weight_est_g),
            ratio: percentile_range(&population.ratio_samples()),
        };

        if !population.is_empty() && ranges.weight_g.is_none() {
            warn!(
                "reference population of {} samples has a degenerate weight range, using fixed bounds",
                population.len()
            );
        }
        ranges
    }
}

/// Normalized graded features with their provenance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedFeatures {
    pub length: Normalized,
    pub diameter: Normalized,
    pub weight: Normalized,
    pub ratio: Normalized,
}

impl NormalizedFeatures {
    /// True if any feature fell back from percentile normalization
    pub fn used_fallback(&self) -> bool {
        [self.length, self.diameter, self.weight, self.ratio]
            .iter()
            .any(|n| n.source != NormalizationSource::Percentile)
    }
}

/// Normalize a measurement against optional reference ranges and fixed bounds
pub fn normalize_measurement(
    measurement: &GeometricMeasurement,
    reference: Option<&ReferenceRanges>,
    bounds: &FeatureBounds,
) -> NormalizedFeatures {
    let reference = reference.copied().unwrap_or_default();
    NormalizedFeatures {
        length: normalize(measurement.length_cm, reference.length_cm, Some(bounds.length_cm)),
        diameter: normalize(measurement.diameter_cm, reference.diameter_cm, Some(bounds.diameter_cm)),
        weight: normalize(measurement.weight_est_g, reference.weight_g, Some(bounds.weight_g)),
        ratio: normalize(measurement.ratio, reference.ratio, Some(bounds.ratio)),
    }
}
