use std::path::PathBuf;
use thiserror::Error;

/// Result type for filtering operations
pub type GrepResult<T> = Result<T, GrepError>;

/// Errors that can occur while building or running a filter
#[derive(Error, Debug)]
pub enum GrepError {
    #[error("invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },
    #[error("failed to read pattern source: {0}")]
    PatternSource(#[source] std::io::Error),
    #[error("pattern file not found: {0}")]
    PatternFileNotFound(PathBuf),
    #[error("configuration error: {0}")]
    ConfigError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl GrepError {
    pub fn invalid_pattern(pattern: impl Into<String>, source: regex::Error) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            source,
        }
    }

    pub fn pattern_source(source: std::io::Error) -> Self {
        Self::PatternSource(source)
    }

    pub fn pattern_file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::PatternFileNotFound(path.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_error_creation() {
        let bad = regex::bytes::Regex::new("a[").unwrap_err();
        let err = GrepError::invalid_pattern("a[", bad);
        assert!(matches!(err, GrepError::InvalidPattern { .. }));

        let err = GrepError::pattern_file_not_found(Path::new("patterns.txt"));
        assert!(matches!(err, GrepError::PatternFileNotFound(_)));

        let err = GrepError::config_error("missing required field");
        assert!(matches!(err, GrepError::ConfigError(_)));
    }

    #[test]
    fn test_error_messages() {
        let bad = regex::bytes::Regex::new("foo(").unwrap_err();
        let err = GrepError::invalid_pattern("foo(", bad);
        assert!(err.to_string().starts_with("invalid pattern \"foo(\":"));

        let err = GrepError::pattern_file_not_found("patterns.txt");
        assert_eq!(err.to_string(), "pattern file not found: patterns.txt");

        let err = GrepError::config_error("missing required field");
        assert_eq!(
            err.to_string(),
            "configuration error: missing required field"
        );
    }
}
