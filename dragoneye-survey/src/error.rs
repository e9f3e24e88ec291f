use std::path::PathBuf;

use thiserror::Error;

/// Result type for survey operations
pub type Result<T> = std::result::Result<T, SurveyError>;

/// Errors that stop a survey as a whole
///
/// A single unreadable photograph is not one of them; it is recorded as a
/// [`crate::SurveyFailure`] and the survey continues.
#[derive(Error, Debug)]
pub enum SurveyError {
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("No specimen photographs found in {0}")]
    NoImages(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Grade(#[from] dragoneye::GradeError),
}

impl SurveyError {
    /// Returns true if the error comes from the survey's input files
    pub fn is_input_error(&self) -> bool {
        match self {
            Self::NotADirectory(_) | Self::NoImages(_) | Self::Io(_) => true,
            Self::Grade(e) => e.is_input_error(),
        }
    }
}
