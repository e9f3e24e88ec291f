#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::similar_names
)]

//! DragonEye - vision-based size grading of dragon fruit
//!
//! A single photograph is segmented by colour, the specimen's silhouette is
//! measured in calibrated physical units, the measurements are normalized and
//! scored by a Mamdani fuzzy rule base, and a grading policy reconciles the
//! score with weight thresholds to produce an A/B/C grade.
//!
//! The pipeline performs no I/O and keeps no global mutable state apart from
//! the one-time compilation of the built-in rule bases.

pub mod calibration;
pub mod color;
pub mod config;
pub mod error;
pub mod features;
pub mod fuzzy;
pub mod grading;
pub mod mask;
pub mod normalize;
pub mod pipeline;
pub mod segmentation;

pub use calibration::{CalibrationProfile, FeatureBounds, FixedRange, WeightModel};
pub use color::{decode_image, preprocess, HsvImage, HsvRange, PreprocessConfig};
pub use error::{GradeError, Result};
pub use features::{AppearanceFeatures, GeometricMeasurement, SpecimenFeatures};
pub use fuzzy::RuleBase;
pub use grading::{ConditionGrade, Grade, GradeBasis, GradeDecision, GradingPolicy};
pub use mask::BinaryMask;
pub use normalize::{NormalizationSource, NormalizedFeatures, ReferencePopulation, ReferenceRanges};
pub use pipeline::{grade_image, Diagnostics, GradeResult, Grader};
pub use segmentation::{Segmentation, SegmentationConfig, Segmenter};
