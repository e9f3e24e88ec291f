use thiserror::Error;

/// Result type for DragonEye operations
pub type Result<T> = std::result::Result<T, GradeError>;

/// Errors that can occur while grading a specimen
///
/// A photograph without a visible specimen is not an error: it yields a
/// zero-measurement [`crate::GradeResult`]. Numeric degeneracies inside
/// normalization and fuzzy inference are resolved locally and surface only in
/// [`crate::Diagnostics`].
#[derive(Error, Debug)]
pub enum GradeError {
    #[error("Invalid input image: {0}")]
    InvalidImage(String),

    #[error("Image decoding error: {0}")]
    Decode(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid calibration profile: {0}")]
    InvalidCalibration(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown fuzzy variable: {0}")]
    UnknownVariable(String),

    #[error("Unknown term '{term}' for fuzzy variable '{variable}'")]
    UnknownTerm { variable: String, term: String },

    #[error("Missing crisp input for antecedent '{0}'")]
    MissingInput(String),

    #[error("Crisp input for '{variable}' is not finite: {value}")]
    NonFiniteInput { variable: String, value: f64 },

    #[error("Invalid membership function '{term}': breakpoints ({a}, {b}, {c}) must satisfy a <= b <= c")]
    InvalidMembership { term: String, a: f64, b: f64, c: f64 },

    #[error("Invalid rule base: {0}")]
    InvalidRuleBase(String),
}

impl GradeError {
    /// Returns true if the photograph itself could not be used
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::InvalidImage(_) | Self::Decode(_) | Self::Io(_))
    }

    /// Returns true if the error comes from a profile or rule base supplied at startup
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidCalibration(_)
                | Self::InvalidConfig(_)
                | Self::UnknownVariable(_)
                | Self::UnknownTerm { .. }
                | Self::InvalidMembership { .. }
                | Self::InvalidRuleBase(_)
        )
    }
}
