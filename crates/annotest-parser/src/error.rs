/// Error types for the feature-file parser

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("line {line}: malformed value for annotation '{key}': {message}")]
    MalformedAnnotationValue {
        line: usize,
        key: String,
        message: String,
    },

    #[error("line {line}: malformed feature file: {message}")]
    MalformedFeatureFile { line: usize, message: String },
}

impl ParseError {
    pub fn malformed(line: usize, message: impl Into<String>) -> Self {
        ParseError::MalformedFeatureFile {
            line,
            message: message.into(),
        }
    }

    /// The 1-based line the error was detected on
    pub fn line(&self) -> usize {
        match self {
            ParseError::MalformedAnnotationValue { line, .. }
            | ParseError::MalformedFeatureFile { line, .. } => *line,
        }
    }
}

/// Failure of the value coercer, before a line number is attached
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct CoerceError(pub String);
