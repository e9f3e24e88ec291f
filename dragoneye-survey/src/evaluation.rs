//! Scoring predicted grades against weighed ground truth
//!
//! The true grade of a specimen is the weight-threshold grade of its scale
//! reading. Predictions come from the pipeline run without that reading, so
//! the metrics show how well vision and fuzzy scoring stand in for a scale.

use std::fmt;

use serde::{Deserialize, Serialize};

use dragoneye::{Grade, GradingPolicy};

/// Grades in confusion-matrix order
pub const GRADES: [Grade; 3] = [Grade::A, Grade::B, Grade::C];

/// One graded photograph paired with a scale reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradedSample {
    /// Grade given without the scale reading
    pub predicted: Grade,
    pub weight_est_g: f64,
    pub actual_weight_g: f64,
}

/// Precision, recall and F1 of one grade
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub grade: Grade,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Samples whose weighed grade is this one
    pub support: usize,
}

/// Classification and weight-estimation quality over a set of samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeMetrics {
    pub samples: usize,
    pub accuracy: f64,
    pub macro_precision: f64,
    pub macro_recall: f64,
    pub macro_f1: f64,
    /// Mean absolute difference between estimated and weighed mass
    pub weight_mae_g: f64,
    /// Mean of `estimated - actual`; negative when estimates run light
    pub weight_bias_g: f64,
    /// Rows are weighed grades, columns predicted grades, both in [`GRADES`] order
    pub confusion: [[usize; 3]; 3],
    pub classes: Vec<ClassMetrics>,
}

impl GradeMetrics {
    /// Metrics of one grade
    pub fn class(&self, grade: Grade) -> Option<&ClassMetrics> {
        self.classes.iter().find(|c| c.grade == grade)
    }
}

impl fmt::Display for GradeMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} samples, accuracy {:.3}, macro F1 {:.3}, weight MAE {:.1} g (bias {:+.1} g)",
            self.samples, self.accuracy, self.macro_f1, self.weight_mae_g, self.weight_bias_g
        )
    }
}

/// Compare predicted grades with the grades implied by scale readings
///
/// Samples without a finite, positive reading are ignored. A grade that is
/// neither weighed nor predicted is left out of the macro averages; empty
/// ratios count as 0.
pub fn evaluate(samples: impl IntoIterator<Item = GradedSample>, policy: &GradingPolicy) -> GradeMetrics {
    let mut confusion = [[0usize; 3]; 3];
    let mut abs_error = 0.0;
    let mut signed_error = 0.0;
    let mut count = 0usize;

    for sample in samples {
        let actual = sample.actual_weight_g;
        if !(actual.is_finite() && actual > 0.0) {
            continue;
        }
        let truth = policy.grade_from_weight(actual);
        confusion[truth as usize][sample.predicted as usize] += 1;

        let error = sample.weight_est_g - actual;
        abs_error += error.abs();
        signed_error += error;
        count += 1;
    }

    let classes: Vec<ClassMetrics> = GRADES
        .iter()
        .enumerate()
        .map(|(k, &grade)| {
            let hits = confusion[k][k];
            let support: usize = confusion[k].iter().sum();
            let predicted: usize = confusion.iter().map(|row| row[k]).sum();
            let precision = ratio(hits, predicted);
            let recall = ratio(hits, support);
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };
            ClassMetrics {
                grade,
                precision,
                recall,
                f1,
                support,
            }
        })
        .collect();

    let present: Vec<ClassMetrics> = classes
        .iter()
        .enumerate()
        .filter(|(k, c)| c.support > 0 || confusion.iter().any(|row| row[*k] > 0))
        .map(|(_, c)| *c)
        .collect();
    let macro_average = |metric: fn(&ClassMetrics) -> f64| {
        if present.is_empty() {
            0.0
        } else {
            present.iter().map(metric).sum::<f64>() / present.len() as f64
        }
    };

    let correct: usize = (0..GRADES.len()).map(|k| confusion[k][k]).sum();
    let mean = |total: f64| if count > 0 { total / count as f64 } else { 0.0 };

    GradeMetrics {
        samples: count,
        accuracy: ratio(correct, count),
        macro_precision: macro_average(|c| c.precision),
        macro_recall: macro_average(|c| c.recall),
        macro_f1: macro_average(|c| c.f1),
        weight_mae_g: mean(abs_error),
        weight_bias_g: mean(signed_error),
        confusion,
        classes,
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
