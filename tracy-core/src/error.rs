//! Error taxonomy for the analysis pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the loaders and the analysis stages.
///
/// Every variant is fatal for the current run: the pipeline is a straight
/// sequence of required stages and nothing is retried.
#[derive(Debug, Error)]
pub enum TracyError {
    #[error("Input file is missing or empty: {}", path.display())]
    InputMissing { path: PathBuf },

    #[error("Unknown trace format: {0}")]
    UnknownFormat(String),

    #[error("No reference match: {support} agreeing k-mers, {required} required")]
    NoReferenceMatch { support: usize, required: usize },

    #[error("Allele decomposition failed: {0}")]
    Decomposition(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl TracyError {
    pub fn input_missing<P: Into<PathBuf>>(path: P) -> Self {
        Self::InputMissing { path: path.into() }
    }

    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration(message.into())
    }

    pub fn decomposition<S: Into<String>>(message: S) -> Self {
        Self::Decomposition(message.into())
    }
}

/// Result type for tracy operations
pub type Result<T> = std::result::Result<T, TracyError>;
