use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{GradeError, Result};
use crate::features::GeometricMeasurement;

/// Size grade of a specimen
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
        };
        f.write_str(label)
    }
}

/// Skin condition derived from colour and texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionGrade {
    Good,
    Defect,
    Rotten,
}

impl ConditionGrade {
    /// Good from 60, Defect from 40, Rotten below
    pub fn from_score(score: f64) -> Self {
        if score >= 60.0 {
            Self::Good
        } else if score >= 40.0 {
            Self::Defect
        } else {
            Self::Rotten
        }
    }
}

impl fmt::Display for ConditionGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Good => "good",
            Self::Defect => "defect",
            Self::Rotten => "rotten",
        };
        f.write_str(label)
    }
}

/// Which input decided the final grade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradeBasis {
    /// Weight thresholds applied to an externally measured weight
    ActualWeight,
    /// Weight thresholds applied to the vision estimate
    EstimatedWeight,
    /// Score thresholds applied to the fuzzy composite
    FuzzyScore,
}

/// A final grade and the reason it was chosen
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradeDecision {
    pub grade: Grade,
    pub basis: GradeBasis,
    /// Grade the primary weight alone would have given
    pub weight_grade: Grade,
    /// Weight the thresholds were applied to
    pub primary_weight_g: f64,
    pub fuzzy_score: f64,
}

impl fmt::Display for GradeDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.basis {
            GradeBasis::ActualWeight => write!(
                f,
                "grade {} from measured weight {:.1} g",
                self.grade, self.primary_weight_g
            ),
            GradeBasis::EstimatedWeight => write!(
                f,
                "grade {} from estimated weight {:.1} g",
                self.grade, self.primary_weight_g
            ),
            GradeBasis::FuzzyScore => write!(
                f,
                "grade {} from fuzzy score {:.1} (estimated weight {:.1} g alone gives {})",
                self.grade, self.fuzzy_score, self.primary_weight_g, self.weight_grade
            ),
        }
    }
}

/// Thresholds deciding the final grade
///
/// Each band is closed below and open above, so a value sitting exactly on a
/// threshold takes the higher grade.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradingPolicy {
    /// Minimum weight for grade A, in grams
    pub weight_a_g: f64,
    /// Minimum weight for grade B, in grams
    pub weight_b_g: f64,
    /// Minimum fuzzy score for grade A
    pub score_a: f64,
    /// Minimum fuzzy score for grade B
    pub score_b: f64,
    /// Let the fuzzy score decide when no measured weight is available
    pub fuzzy_fallback: bool,
}

impl Default for GradingPolicy {
    fn default() -> Self {
        Self {
            weight_a_g: 350.0,
            weight_b_g: 250.0,
            score_a: 70.0,
            score_b: 45.0,
            fuzzy_fallback: true,
        }
    }
}

impl GradingPolicy {
    pub fn validate(&self) -> Result<()> {
        let ordered = |name: &str, lower: f64, upper: f64| {
            if lower.is_finite() && upper.is_finite() && lower <= upper {
                Ok(())
            } else {
                Err(GradeError::InvalidConfig(format!(
                    "{name} thresholds must be finite with B <= A, got B={lower} A={upper}"
                )))
            }
        };
        ordered("weight", self.weight_b_g, self.weight_a_g)?;
        ordered("score", self.score_b, self.score_a)
    }

    pub fn grade_from_weight(&self, weight_g: f64) -> Grade {
        if weight_g >= self.weight_a_g {
            Grade::A
        } else if weight_g >= self.weight_b_g {
            Grade::B
        } else {
            Grade::C
        }
    }

    pub fn grade_from_score(&self, score: f64) -> Grade {
        if score >= self.score_a {
            Grade::A
        } else if score >= self.score_b {
            Grade::B
        } else {
            Grade::C
        }
    }

    /// Reconcile the weight thresholds with the fuzzy score
    ///
    /// A measured weight is used only when it is finite and positive; `None`,
    /// zero, negative or NaN readings count as absent and leave the decision
    /// to the vision estimate and, with `fuzzy_fallback`, to the score.
    pub fn grade(
        &self,
        measurement: &GeometricMeasurement,
        fuzzy_score: f64,
        actual_weight_g: Option<f64>,
    ) -> GradeDecision {
        let actual = actual_weight_g.filter(|w| w.is_finite() && *w > 0.0);
        let primary_weight_g = actual.unwrap_or(measurement.weight_est_g);
        let weight_grade = self.grade_from_weight(primary_weight_g);

        let (grade, basis) = match actual {
            Some(_) => (weight_grade, GradeBasis::ActualWeight),
            None if self.fuzzy_fallback => (self.grade_from_score(fuzzy_score), GradeBasis::FuzzyScore),
            None => (weight_grade, GradeBasis::EstimatedWeight),
        };

        GradeDecision {
            grade,
            basis,
            weight_grade,
            primary_weight_g,
            fuzzy_score,
        }
    }
}
