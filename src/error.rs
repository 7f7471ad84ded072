//! Error types for heading-range operations.
//!
//! Only one error belongs to the section search itself: [`Error::InvalidTest`],
//! raised before scanning when a test specification is neither text, a
//! pattern, nor a function. A missing section is not an error. The remaining
//! variants come from compiling patterns and from the configuration and I/O
//! around the core.

use thiserror::Error;

/// The error type for heading-range operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The test specification is not text, a pattern, or a function.
    ///
    /// Carries the rendering of the offending value (`null`, `undefined`, or
    /// its JSON form).
    #[error("Expected `string`, `regexp`, or `function` for `test`, not `{0}`")]
    InvalidTest(String),

    /// A textual test or pattern source failed to compile.
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Reading input or configuration failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A configuration file is not valid TOML for [`crate::Config`].
    #[error("Configuration error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON (de)serialization of options or trees failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias defaulting to [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// Whether this error was caused by the caller's test specification rather
    /// than by I/O or configuration.
    #[must_use]
    pub fn is_invalid_test(&self) -> bool {
        matches!(self, Self::InvalidTest(_) | Self::Pattern(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_test_message_names_value() {
        let err = Error::InvalidTest("null".to_string());
        assert_eq!(
            err.to_string(),
            "Expected `string`, `regexp`, or `function` for `test`, not `null`"
        );
        assert!(err.is_invalid_test());
    }

    #[test]
    fn io_errors_are_not_test_errors() {
        let err = Error::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert!(!err.is_invalid_test());
        assert_eq!(err.to_string(), "IO error: gone");
    }
}
