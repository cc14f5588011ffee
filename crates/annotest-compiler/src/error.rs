/// Error types for the feature compiler

use std::path::PathBuf;
use annotest_parser::ParseError;
use thiserror::Error;

use crate::catalog::HookKind;

pub type Result<T> = std::result::Result<T, CompileError>;

#[derive(Error, Debug)]
pub enum CompileError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error in {file}: {source}")]
    Parse { file: PathBuf, source: ParseError },

    #[error("Unknown {kind} hook '{key}' in {file}")]
    UnknownHook {
        file: PathBuf,
        kind: HookKind,
        key: String,
    },

    #[error("Unknown step '{text}' in {file} (line {line})")]
    UnknownStep {
        file: PathBuf,
        text: String,
        line: usize,
    },

    #[error("Invalid step file {path}: {message}")]
    StepFile { path: PathBuf, message: String },

    #[error("Failed to write {path}: {source}")]
    OutputWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Code generation error: {0}")]
    Codegen(String),

    #[error("Multiple errors occurred:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Multiple(Vec<CompileError>),

    #[error("Formatting error: {0}")]
    Fmt(#[from] std::fmt::Error),
}

impl CompileError {
    pub fn parse(file: impl Into<PathBuf>, source: ParseError) -> Self {
        CompileError::Parse {
            file: file.into(),
            source,
        }
    }

    pub fn step_file(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        CompileError::StepFile {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for CompileError {
    fn from(e: serde_json::Error) -> Self {
        CompileError::Codegen(format!("failed to serialize annotations: {}", e))
    }
}
