//! Error types for dbgraph operations.
//!
//! The analyzers themselves are total functions over a well-formed graph:
//! missing metadata is skipped, never reported. Errors only come from the
//! edges of the engine:
//!
//! - **Lookup**: asking for the impact of an object that is not in the graph
//! - **Input**: reading or parsing a schema snapshot, plan, or config file

use std::path::PathBuf;
use thiserror::Error;

/// Result type for dbgraph operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for dbgraph operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The requested object does not exist in the graph
    #[error("object not found in graph: {0}")]
    NodeNotFound(String),

    /// File system operation failed
    #[error("failed to read {path}")]
    Io {
        /// File that could not be read
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// Snapshot or plan JSON was malformed
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Config YAML was malformed
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Config parsed but holds an unusable value
    #[error("configuration error: {0}")]
    Config(String),

    /// A string could not be mapped onto one of the closed enums
    #[error("unknown {kind}: '{value}'")]
    InvalidValue {
        /// What was being parsed (e.g. "delete rule")
        kind: &'static str,
        /// The rejected input
        value: String,
    },
}

impl Error {
    /// Wrap an I/O failure with the path that caused it.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Build an `InvalidValue` error.
    #[must_use]
    pub fn invalid_value(kind: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            kind,
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_names_path_and_keeps_cause() {
        let error = Error::io(
            "schema.json",
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        );

        assert_eq!(error.to_string(), "failed to read schema.json");
        let cause = std::error::Error::source(&error).map(ToString::to_string);
        assert_eq!(cause.as_deref(), Some("no such file"));
    }

    #[test]
    fn invalid_value_names_kind_and_value() {
        let error = Error::invalid_value("delete rule", "EXPLODE");
        assert_eq!(error.to_string(), "unknown delete rule: 'EXPLODE'");
    }
}
