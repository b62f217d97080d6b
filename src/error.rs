//! Error types for scoretrack.
//!
//! Every inconsistency is fatal: stages return `Err` and the whole run
//! aborts. Variants follow the categories of failure the pipeline can
//! detect, so the CLI can print something actionable.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the conversion pipeline.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed input: a bad numeric literal, a missing token or field.
    #[error("{}: expected {expected}, found {found}", location(source_name, *line))]
    Malformed {
        source_name: String,
        /// 1-based line number, 0 when the input has no lines (e.g. an id string).
        line: usize,
        expected: String,
        found: String,
    },

    /// An internal sequence violated a stage precondition. Indicates a
    /// pipeline bug rather than bad user input.
    #[error("internal error: {0}")]
    Precondition(String),

    /// Geometric inconsistency while analysing one page.
    #[error("page {}: {message}", page.display())]
    Geometry { page: PathBuf, message: String },

    /// Notes and note heads do not line up across files.
    #[error("{message}{}", hint.as_ref().map(|h| format!("\n  hint: {h}")).unwrap_or_default())]
    CrossReference {
        message: String,
        hint: Option<String>,
    },

    /// A fixed-size field of the output format would overflow.
    #[error("can't handle more than {limit} {what}")]
    Capacity { what: &'static str, limit: usize },

    #[error("failed to access '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse '{}': {source}", path.display())]
    Xml {
        path: PathBuf,
        #[source]
        source: roxmltree::Error,
    },

    #[error("failed to write debug dump '{}': {source}", path.display())]
    Dump {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

fn location(source_name: &str, line: usize) -> String {
    match line {
        0 => source_name.to_string(),
        n => format!("{source_name}:{n}"),
    }
}

/// Convenience Result type using the scoretrack Error.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn malformed(
        source_name: impl Into<String>,
        line: usize,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Error::Malformed {
            source_name: source_name.into(),
            line,
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub(crate) fn geometry(page: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Error::Geometry {
            page: page.into(),
            message: message.into(),
        }
    }

    pub(crate) fn cross_reference(message: impl Into<String>, hint: Option<&str>) -> Self {
        Error::CrossReference {
            message: message.into(),
            hint: hint.map(String::from),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cross_reference_message_includes_hint() {
        let err = Error::cross_reference("note found in several pages", Some("unfold repeats"));
        assert_eq!(
            err.to_string(),
            "note found in several pages\n  hint: unfold repeats"
        );
    }

    #[test]
    fn malformed_reports_location() {
        let err = Error::malformed("song.notes", 12, "'stop-time:'", "'stop:'");
        assert_eq!(err.to_string(), "song.notes:12: expected 'stop-time:', found 'stop:'");

        let err = Error::malformed("track at byte 4", 0, "version 0", "7");
        assert_eq!(err.to_string(), "track at byte 4: expected version 0, found 7");
    }
}
