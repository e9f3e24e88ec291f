//! End-to-end grading of a single photograph
//!
//! `image → HSV → mask → measurements → normalized features → fuzzy score →
//! grade`. A [`Grader`] holds only read-only configuration and compiled rule
//! bases, so one instance may grade any number of images concurrently.

use std::sync::Arc;

use image::DynamicImage;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::calibration::CalibrationProfile;
use crate::color::{preprocess, HsvImage, PreprocessConfig};
use crate::error::Result;
use crate::features::{self, AppearanceFeatures, GeometricMeasurement, SpecimenFeatures};
use crate::fuzzy::presets::{self, COLOUR, DIAMETER, LENGTH, RATIO, TEXTURE, WEIGHT};
use crate::fuzzy::{crisp_inputs, RuleBase};
use crate::grading::{ConditionGrade, Grade, GradeBasis, GradingPolicy};
use crate::normalize::{normalize_measurement, NormalizedFeatures, ReferencePopulation, ReferenceRanges};
use crate::segmentation::{Segmentation, SegmentationConfig, Segmenter};

/// How the pipeline reached its result
///
/// None of these conditions is an error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// False when segmentation found nothing and inference was skipped
    pub specimen_found: bool,
    /// True when no size rule fired and the score was forced to 0
    pub fuzzy_degenerate: bool,
    /// Normalized inputs of the size rule base and their sources
    pub normalization: NormalizedFeatures,
}

/// Outcome of grading one photograph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeResult {
    pub length_cm: f64,
    pub diameter_cm: f64,
    pub weight_est_g: f64,
    pub ratio: f64,
    /// Fuzzy size score in `[0, 100]`
    pub fuzzy_score: f64,
    pub final_grade: Grade,
    pub basis: GradeBasis,
    pub explanation: String,
    /// Condition score in `[0, 100]`, 0 without a specimen
    pub condition_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<ConditionGrade>,
    pub appearance: AppearanceFeatures,
    pub diagnostics: Diagnostics,
}

impl GradeResult {
    pub fn measurement(&self) -> GeometricMeasurement {
        GeometricMeasurement {
            length_cm: self.length_cm,
            diameter_cm: self.diameter_cm,
            weight_est_g: self.weight_est_g,
            ratio: self.ratio,
        }
    }
}

/// The configured grading pipeline
#[derive(Debug, Clone)]
pub struct Grader {
    calibration: CalibrationProfile,
    preprocess: PreprocessConfig,
    segmenter: Segmenter,
    policy: GradingPolicy,
    size_rules: Arc<RuleBase>,
    condition_rules: Arc<RuleBase>,
}

impl Default for Grader {
    fn default() -> Self {
        Self {
            calibration: CalibrationProfile::default(),
            preprocess: PreprocessConfig::default(),
            segmenter: Segmenter::default(),
            policy: GradingPolicy::default(),
            size_rules: presets::shared_size_rule_base(),
            condition_rules: presets::shared_condition_rule_base(),
        }
    }
}

impl Grader {
    /// Create a grader for a validated calibration profile
    pub fn new(calibration: CalibrationProfile) -> Result<Self> {
        calibration.validate()?;
        Ok(Self {
            calibration,
            ..Self::default()
        })
    }

    pub fn with_preprocess(mut self, config: PreprocessConfig) -> Self {
        self.preprocess = config;
        self
    }

    pub fn with_segmentation(mut self, config: SegmentationConfig) -> Result<Self> {
        self.segmenter = Segmenter::new(config)?;
        Ok(self)
    }

    pub fn with_policy(mut self, policy: GradingPolicy) -> Result<Self> {
        policy.validate()?;
        self.policy = policy;
        Ok(self)
    }

    /// Replace the size rule base; it must declare the `length`, `diameter`,
    /// `weight` and `ratio` antecedents
    pub fn with_size_rules(mut self, rules: Arc<RuleBase>) -> Self {
        self.size_rules = rules;
        self
    }

    /// Replace the condition rule base; it must declare the `colour` and
    /// `texture` antecedents
    pub fn with_condition_rules(mut self, rules: Arc<RuleBase>) -> Self {
        self.condition_rules = rules;
        self
    }

    pub fn calibration(&self) -> &CalibrationProfile {
        &self.calibration
    }

    pub fn policy(&self) -> &GradingPolicy {
        &self.policy
    }

    pub fn size_rules(&self) -> &RuleBase {
        &self.size_rules
    }

    /// Preprocess and segment a photograph
    pub fn segment(&self, image: &DynamicImage) -> Result<Segmentation> {
        let hsv = preprocess(image, &self.preprocess)?;
        Ok(self.segmenter.segment(&hsv))
    }

    /// Preprocess, segment and measure a photograph without grading it
    ///
    /// Returns `None` when no specimen is visible.
    pub fn measure(&self, image: &DynamicImage) -> Result<Option<SpecimenFeatures>> {
        let segmentation = self.segment(image)?;
        if !segmentation.found_specimen() {
            return Ok(None);
        }
        Ok(Some(features::extract(&segmentation, &self.calibration)))
    }

    /// Grade a decoded photograph
    ///
    /// Fails only when the image itself is unusable.
    pub fn grade_image(
        &self,
        image: &DynamicImage,
        reference: Option<&ReferencePopulation>,
        actual_weight_g: Option<f64>,
    ) -> Result<GradeResult> {
        let ranges = reference.map(ReferenceRanges::from_population);
        let segmentation = self.segment(image)?;
        self.grade_segmentation(&segmentation, ranges.as_ref(), actual_weight_g)
    }

    /// Grade an already preprocessed HSV raster
    pub fn grade_hsv(
        &self,
        image: &HsvImage,
        reference: Option<&ReferenceRanges>,
        actual_weight_g: Option<f64>,
    ) -> Result<GradeResult> {
        let segmentation = self.segmenter.segment(image);
        self.grade_segmentation(&segmentation, reference, actual_weight_g)
    }

    fn grade_segmentation(
        &self,
        segmentation: &Segmentation,
        reference: Option<&ReferenceRanges>,
        actual_weight_g: Option<f64>,
    ) -> Result<GradeResult> {
        let specimen_found = segmentation.found_specimen();
        let SpecimenFeatures {
            geometry,
            appearance,
        } = if specimen_found {
            features::extract(segmentation, &self.calibration)
        } else {
            debug!("no specimen found, skipping inference");
            SpecimenFeatures::default()
        };

        let normalization = normalize_measurement(&geometry, reference, &self.calibration.bounds);

        let (fuzzy_score, fuzzy_degenerate) = if specimen_found {
            let inference = self.size_rules.evaluate_detailed(&crisp_inputs([
                (LENGTH, normalization.length.value),
                (DIAMETER, normalization.diameter.value),
                (WEIGHT, normalization.weight.value),
                (RATIO, normalization.ratio.value),
            ]))?;
            (inference.output, inference.degenerate)
        } else {
            (0.0, false)
        };

        let (condition_score, condition) = if specimen_found {
            let score = self.condition_rules.evaluate(&crisp_inputs([
                (COLOUR, appearance.hue_mean),
                (TEXTURE, appearance.texture_score),
            ]))?;
            (score, Some(ConditionGrade::from_score(score)))
        } else {
            (0.0, None)
        };

        let decision = self.policy.grade(&geometry, fuzzy_score, actual_weight_g);
        debug!("{decision}");

        Ok(GradeResult {
            length_cm: geometry.length_cm,
            diameter_cm: geometry.diameter_cm,
            weight_est_g: geometry.weight_est_g,
            ratio: geometry.ratio,
            fuzzy_score,
            final_grade: decision.grade,
            basis: decision.basis,
            explanation: decision.to_string(),
            condition_score,
            condition,
            appearance,
            diagnostics: Diagnostics {
                specimen_found,
                fuzzy_degenerate,
                normalization,
            },
        })
    }
}

/// Grade one photograph with the default pipeline and a given calibration
pub fn grade_image(
    image: &DynamicImage,
    calibration: &CalibrationProfile,
    reference: Option<&ReferencePopulation>,
    actual_weight_g: Option<f64>,
) -> Result<GradeResult> {
    Grader::new(calibration.clone())?.grade_image(image, reference, actual_weight_g)
}
