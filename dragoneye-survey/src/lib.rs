#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_precision_loss
)]

//! DragonEye survey library
//!
//! Measures and grades every specimen photograph in a directory and collects
//! the measurements into a [`ReferencePopulation`] for percentile
//! normalization. With scale readings for some of the photographs, the
//! predicted grades are also scored against the weighed grades. Photographs
//! are independent, so they are processed in parallel when the `parallel`
//! feature is enabled.

pub mod error;
pub mod evaluation;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use indicatif::ProgressBar;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use dragoneye::{decode_image, Grade, GradeResult, Grader, ReferencePopulation, SpecimenFeatures};

pub use error::{Result, SurveyError};
pub use evaluation::{evaluate, ClassMetrics, GradeMetrics, GradedSample};

/// File extensions treated as specimen photographs
pub const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// Scale readings in grams keyed by photograph file name
pub type ActualWeights = BTreeMap<String, f64>;

/// Measurements and grade of one photograph with a visible specimen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyRecord {
    pub file: PathBuf,
    /// Grade from vision and fuzzy scoring alone
    pub grade: Grade,
    pub fuzzy_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_weight_g: Option<f64>,
    pub features: SpecimenFeatures,
}

impl SurveyRecord {
    /// The record as an evaluation sample, if it has a scale reading
    pub fn graded_sample(&self) -> Option<GradedSample> {
        self.actual_weight_g.map(|actual_weight_g| GradedSample {
            predicted: self.grade,
            weight_est_g: self.features.geometry.weight_est_g,
            actual_weight_g,
        })
    }
}

/// A photograph that could not be measured
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyFailure {
    pub file: PathBuf,
    pub error: String,
}

/// Outcome of surveying a directory
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SurveyReport {
    /// Photographs in which no specimen was found
    pub skipped: Vec<PathBuf>,
    pub records: Vec<SurveyRecord>,
    pub failures: Vec<SurveyFailure>,
    pub population: ReferencePopulation,
    /// Present when scale readings were supplied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<GradeMetrics>,
}

impl SurveyReport {
    /// Number of photographs looked at
    pub fn total(&self) -> usize {
        self.records.len() + self.skipped.len() + self.failures.len()
    }

    /// Write the report to a TOML, JSON or YAML file
    pub fn save(&self, path: &Path) -> Result<()> {
        Ok(dragoneye::config::save(self, path)?)
    }
}

enum Outcome {
    Graded(GradeResult),
    Empty,
    Failed(String),
}

/// True if the path has one of the [`IMAGE_EXTENSIONS`]
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// Photographs directly inside `dir`, sorted by file name
pub fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(SurveyError::NotADirectory(dir.to_path_buf()));
    }

    let mut images = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_image_file(&path) {
            images.push(path);
        }
    }
    images.sort();
    Ok(images)
}

/// Read scale readings from a TOML, JSON or YAML map of file name to grams
pub fn load_actual_weights(path: &Path) -> Result<ActualWeights> {
    Ok(dragoneye::config::load(path)?)
}

/// Decode and grade one photograph with fixed-range normalization and no
/// scale reading
pub fn grade_file(path: &Path, grader: &Grader) -> Result<GradeResult> {
    let bytes = std::fs::read(path)?;
    let image = decode_image(&bytes)?;
    Ok(grader.grade_image(&image, None, None)?)
}

/// Survey every photograph directly inside `dir`
pub fn survey_directory(dir: &Path, grader: &Grader) -> Result<SurveyReport> {
    survey_with_progress(dir, grader, None, None)
}

/// Survey a directory and score its grades against scale readings
pub fn survey_with_weights(
    dir: &Path,
    grader: &Grader,
    actual_weights: &ActualWeights,
) -> Result<SurveyReport> {
    survey_with_progress(dir, grader, Some(actual_weights), None)
}

/// Survey a directory, ticking `progress` once per photograph
pub fn survey_with_progress(
    dir: &Path,
    grader: &Grader,
    actual_weights: Option<&ActualWeights>,
    progress: Option<&ProgressBar>,
) -> Result<SurveyReport> {
    let images = list_images(dir)?;
    if images.is_empty() {
        return Err(SurveyError::NoImages(dir.to_path_buf()));
    }
    info!("Surveying {} photographs in {}", images.len(), dir.display());

    if let Some(pb) = progress {
        pb.set_length(images.len() as u64);
    }

    let measure = |path: &PathBuf| {
        let outcome = match grade_file(path, grader) {
            Ok(result) if result.diagnostics.specimen_found => Outcome::Graded(result),
            Ok(_) => Outcome::Empty,
            Err(e) => Outcome::Failed(e.to_string()),
        };
        if let Some(pb) = progress {
            pb.inc(1);
        }
        outcome
    };

    #[cfg(feature = "parallel")]
    let outcomes: Vec<Outcome> = images.par_iter().map(measure).collect();
    #[cfg(not(feature = "parallel"))]
    let outcomes: Vec<Outcome> = images.iter().map(measure).collect();

    let mut report = SurveyReport::default();
    for (file, outcome) in images.into_iter().zip(outcomes) {
        match outcome {
            Outcome::Graded(result) => {
                debug!(
                    "{}: {:.2} x {:.2} cm, {:.1} g, grade {}",
                    file.display(),
                    result.length_cm,
                    result.diameter_cm,
                    result.weight_est_g,
                    result.final_grade
                );
                let actual_weight_g = actual_weights.and_then(|weights| weight_for(weights, &file));
                report.records.push(SurveyRecord {
                    file,
                    grade: result.final_grade,
                    fuzzy_score: result.fuzzy_score,
                    actual_weight_g,
                    features: SpecimenFeatures {
                        geometry: result.measurement(),
                        appearance: result.appearance,
                    },
                });
            }
            Outcome::Empty => {
                warn!("No specimen found in {}", file.display());
                report.skipped.push(file);
            }
            Outcome::Failed(error) => {
                warn!("Failed to measure {}: {}", file.display(), error);
                report.failures.push(SurveyFailure { file, error });
            }
        }
    }

    report.population =
        ReferencePopulation::from_measurements(report.records.iter().map(|r| &r.features.geometry));

    if let Some(weights) = actual_weights {
        let metrics = evaluate(
            report.records.iter().filter_map(SurveyRecord::graded_sample),
            grader.policy(),
        );
        if metrics.samples < weights.len() {
            warn!(
                "{} of {} scale readings were matched to a graded photograph and used",
                metrics.samples,
                weights.len()
            );
        }
        info!("Grade evaluation: {}", metrics);
        report.metrics = Some(metrics);
    }

    info!(
        "Measured {} of {} photographs ({} without specimen, {} failed)",
        report.records.len(),
        report.total(),
        report.skipped.len(),
        report.failures.len()
    );

    Ok(report)
}

fn weight_for(weights: &ActualWeights, file: &Path) -> Option<f64> {
    let name = file.file_name()?.to_str()?;
    weights.get(name).copied()
}
