//! Error types shared across the vmesh workspace.

use thiserror::Error;

/// Library-wide error type.
///
/// Variant names mirror the error kinds named in the CLI's error handling
/// table: `ArgInvalid`, `IOOpen`, `InputParse`. `IndexOverflow` is
/// deliberately not a variant here — per the error handling contract it is a
/// logged warning, not a failure, so it never needs to flow through
/// `Result`.
#[derive(Error, Debug)]
pub enum Error {
    /// A command-line argument was missing, malformed, or out of range.
    #[error("invalid argument: {0}")]
    ArgInvalid(String),

    /// An input or output file could not be opened.
    #[error("could not open {path}: {source}")]
    IoOpen {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The mesh loader failed to parse its input.
    #[error("failed to parse mesh: {0}")]
    InputParse(String),

    /// Any other I/O failure (e.g. mid-stream read/write errors) not tied to
    /// opening a specific path.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
