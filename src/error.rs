//! Error types for the split pipeline.
//!
//! Every variant is fatal for the run that produced it. Classification never
//! errors: content that matches no rule is core.

use std::path::PathBuf;

/// Errors that abort an extraction run.
#[derive(Debug, thiserror::Error)]
pub enum SplitError {
    /// A classification rule failed to compile.
    #[error("invalid {kind} pattern `{pattern}`: {message}")]
    PatternCompile {
        /// Which rule table the pattern came from (header, content, path, module).
        kind: &'static str,
        /// The offending pattern text.
        pattern: String,
        /// Compiler diagnostic.
        message: String,
    },

    /// The document parser rejected a file.
    #[error("parse error in {path}: {message}")]
    Parse {
        /// Path relative to the source root.
        path: String,
        /// Description of the parse failure.
        message: String,
    },

    /// Reading a file or directory failed.
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        /// Path being read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Directory traversal failed.
    #[error("walk error under {}: {source}", .root.display())]
    Walk {
        /// Root of the traversal.
        root: PathBuf,
        /// Underlying walker error.
        #[source]
        source: ignore::Error,
    },

    /// The settings file is not a JSON object.
    #[error("malformed settings in {path}: {source}")]
    MalformedSettings {
        /// Path relative to the source root.
        path: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// An extractor found an inconsistency it cannot resolve to core or persona.
    #[error("structural error in {path}: {message}")]
    Structure {
        /// Path relative to the source root.
        path: String,
        /// What did not line up.
        message: String,
    },
}

impl SplitError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Convenience alias used across the library.
pub type Result<T> = std::result::Result<T, SplitError>;
