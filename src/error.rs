//! Error types shared across the engine.
//!
//! Every fallible operation returns [`SimilarityError`]. Each variant carries a
//! fixed set of detail fields so callers can inspect failures without parsing
//! strings; [`SimilarityError::code`] maps a variant to a stable machine code.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::evaluation::export::ExportFormat;
use crate::hybrid::WeightSlot;

/// Machine-readable error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidInput,
    InvalidWeights,
    InvalidThreshold,
    EmptyDataset,
    TrainingFailed,
    Io,
}

impl ErrorCode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::InvalidWeights => "INVALID_WEIGHTS",
            ErrorCode::InvalidThreshold => "INVALID_THRESHOLD",
            ErrorCode::EmptyDataset => "EMPTY_DATASET",
            ErrorCode::TrainingFailed => "TRAINING_FAILED",
            ErrorCode::Io => "IO_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors produced by validation, learning and export/import.
#[derive(Error, Debug)]
pub enum SimilarityError {
    /// A pair or parameter is empty or malformed
    #[error("invalid input: {field}{}: {reason}", fmt_index(.index))]
    InvalidInput {
        index: Option<usize>,
        field: &'static str,
        reason: String,
    },

    /// Weights are negative, non-finite, or sum to zero
    #[error("invalid weights: {}{reason} (got {actual})", fmt_slot(.slot))]
    InvalidWeights {
        slot: Option<WeightSlot>,
        actual: f64,
        reason: &'static str,
    },

    /// Threshold outside [0, 1]
    #[error("invalid threshold: {field} must be within [0, 1], got {actual}")]
    InvalidThreshold { field: &'static str, actual: f64 },

    /// Zero pairs handed to a batch or learning operation
    #[error("empty dataset: {operation} requires at least one pair")]
    EmptyDataset { operation: &'static str },

    /// Not enough labeled pairs for the requested fold count
    #[error("training failed: {folds}-fold validation needs at least {expected} pairs, got {actual}")]
    TrainingFailed {
        expected: usize,
        actual: usize,
        folds: usize,
    },

    /// Filesystem failure during export or import
    #[error("i/o error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed JSON/CSV content
    #[error("malformed {format} data{}: {reason}", fmt_line(.line))]
    Format {
        format: ExportFormat,
        line: Option<usize>,
        reason: String,
    },
}

fn fmt_index(index: &Option<usize>) -> String {
    index.map(|i| format!(" at pair {i}")).unwrap_or_default()
}

fn fmt_slot(slot: &Option<WeightSlot>) -> String {
    slot.map(|s| format!("{} ", s.name())).unwrap_or_default()
}

fn fmt_line(line: &Option<usize>) -> String {
    line.map(|l| format!(" at line {l}")).unwrap_or_default()
}

impl SimilarityError {
    /// Stable code for this error kind.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            SimilarityError::InvalidInput { .. } => ErrorCode::InvalidInput,
            SimilarityError::InvalidWeights { .. } => ErrorCode::InvalidWeights,
            SimilarityError::InvalidThreshold { .. } => ErrorCode::InvalidThreshold,
            SimilarityError::EmptyDataset { .. } => ErrorCode::EmptyDataset,
            SimilarityError::TrainingFailed { .. } => ErrorCode::TrainingFailed,
            SimilarityError::Io { .. } | SimilarityError::Format { .. } => ErrorCode::Io,
        }
    }

    pub(crate) fn invalid_input(index: Option<usize>, field: &'static str, reason: impl Into<String>) -> Self {
        SimilarityError::InvalidInput {
            index,
            field,
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SimilarityError::Io {
            path: path.into(),
            source,
        }
    }
}

impl SimilarityError {
    /// Like `From<serde_json::Error>`, but a failure of the underlying
    /// reader or writer stays an I/O error on `path`.
    pub(crate) fn from_json(err: serde_json::Error, path: &Path) -> Self {
        if err.is_io() {
            return SimilarityError::io(path, err.into());
        }
        err.into()
    }

    /// Like `From<csv::Error>` for `format`, keeping I/O failures as [`SimilarityError::Io`].
    pub(crate) fn from_csv(err: csv::Error, path: &Path, format: ExportFormat) -> Self {
        let line = err.position().map(|p| p.line() as usize);
        let reason = err.to_string();
        match err.into_kind() {
            csv::ErrorKind::Io(source) => SimilarityError::io(path, source),
            _ => SimilarityError::Format { format, line, reason },
        }
    }
}

impl From<csv::Error> for SimilarityError {
    fn from(err: csv::Error) -> Self {
        let line = err.position().map(|p| p.line() as usize);
        SimilarityError::Format {
            format: ExportFormat::Csv,
            line,
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for SimilarityError {
    fn from(err: serde_json::Error) -> Self {
        let line = (err.line() > 0).then_some(err.line());
        SimilarityError::Format {
            format: ExportFormat::Json,
            line,
            reason: err.to_string(),
        }
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, SimilarityError>;
