//! Error types for the decision core.

use thiserror::Error;

/// Result type alias using [`CoreError`].
pub type Result<T> = std::result::Result<T, CoreError>;

/// Top-level error type for decoding and validating battle data.
///
/// Only malformed input produces an error. Missing equipment, missing
/// opponents and the like are ordinary game situations, not failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A vector string was not of the form `X/Y/Z`.
    #[error("Malformed vector '{0}': expected three integers separated by '/'")]
    MalformedVector(String),

    /// A vector coordinate was outside [`COORDINATE_LIMIT`](crate::math::COORDINATE_LIMIT).
    #[error("Vector '{0}' has a coordinate outside the playable range")]
    CoordinateOutOfRange(String),

    /// An equipment block carried a kind tag we do not know.
    #[error("Unknown equipment kind: {0}")]
    UnknownEquipmentKind(String),

    /// An equipment block lacked a field its kind requires.
    #[error("Equipment block '{name}' of kind {kind} is missing field '{field}'")]
    MissingEquipmentField {
        /// Block name.
        name: String,
        /// Block kind.
        kind: &'static str,
        /// Missing field.
        field: &'static str,
    },
}
