//! Autogeneration error types
//!
//! Autogeneration itself never fails: unsupported rules produce no rule.
//! These errors describe malformed payload fragments, which callers log and
//! skip.

/// Result type alias using [`AutogenError`]
pub type Result<T> = std::result::Result<T, AutogenError>;

/// Errors raised while reading rule payloads
#[derive(Debug, thiserror::Error)]
pub enum AutogenError {
    /// `anyPattern` is not a sequence of pattern trees
    #[error("anyPattern must be an array of patterns, found {found}")]
    MalformedPatternArray {
        /// JSON type found instead of an array
        found: &'static str,
    },
}
