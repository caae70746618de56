//! Error types for the IFC reader.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

use crate::parser::step::InstanceId;

/// Failure reasons reported while reading IFC content.
///
/// Only [`ParsingError::MissingProject`] aborts a parse. Every other kind is
/// recorded in [`ParsingResult::errors`](crate::model::ParsingResult) next to
/// the best-effort result.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParsingError {
    /// The line is not shaped like `#<id>=<TYPE>(<params>);`.
    #[error("invalid instance format: {reason}")]
    InvalidInstanceFormat { reason: String },

    /// The instance id digits do not fit an id.
    #[error("invalid instance id '#{token}'")]
    InvalidInstanceId { token: String },

    /// No `IFC...` entity type follows the `=`.
    #[error("missing IFC entity type")]
    MissingEntityType,

    /// The DATA section holds no `IFCPROJECT` instance.
    #[error("no IFCPROJECT instance found")]
    MissingProject,

    /// A DATA line could not be decoded into an instance.
    #[error("line {line}: {cause}")]
    InstanceParsingFailed {
        line: usize,
        text: String,
        #[source]
        cause: Box<ParsingError>,
    },

    /// A building element was found but could not be extracted.
    #[error("element {id}: {cause}")]
    ElementExtractionFailed {
        id: InstanceId,
        #[source]
        cause: Box<ParsingError>,
    },

    /// A reference points at an id with no instance.
    #[error("reference {id} does not resolve to an instance")]
    UnresolvedReference { id: InstanceId },

    /// A point or direction carries a non-numeric coordinate.
    #[error("{id} has a non-numeric coordinate")]
    InvalidCoordinate { id: InstanceId },

    /// The placement chain is longer than the configured limit.
    #[error("placement chain at {id} exceeds {limit} levels")]
    PlacementTooDeep { id: InstanceId, limit: usize },
}

impl ParsingError {
    pub(crate) fn invalid_format(reason: impl Into<String>) -> Self {
        Self::InvalidInstanceFormat {
            reason: reason.into(),
        }
    }
}

/// Errors that abort reading an IFC file.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Failed to read the IFC file from disk.
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The content was read but cannot produce a result.
    #[error(transparent)]
    Fatal(#[from] ParsingError),
}

/// Failures while writing an export file.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to create file '{path}': {source}")]
    FileCreate {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),
}
