//! Error types for the starfield core.

use thiserror::Error;

/// Errors produced by starfield operations.
///
/// Every variant is raised by the call that received the bad input; existing
/// field or schema state is never modified on the error path.
#[derive(Debug, Error)]
pub enum StarfieldError {
    /// A schema or schema patch was not an object, or held a malformed value.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// A particle was built without an attribute schema.
    #[error("particle requires an attribute schema")]
    MissingSchema,

    /// Viewport width or height was zero, negative, or not finite.
    #[error("invalid dimensions: width and height must be positive and finite")]
    InvalidDimensions,

    /// A color string could not be parsed.
    #[error("invalid color: {0}")]
    InvalidColor(String),

    /// A named schema preset does not exist.
    #[error("unknown preset: {0}")]
    UnknownPreset(String),

    /// Writing host output (e.g. a PNG snapshot) failed.
    #[error("i/o error: {0}")]
    Io(String),
}
