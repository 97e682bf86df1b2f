use std::fmt;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::debug;

use crate::errors::{GrepError, GrepResult};

/// The ordered collection of pattern sources for one matching request.
///
/// Patterns come from up to three origins: an inline pattern argument,
/// explicit pattern strings, and already-open line-oriented pattern
/// sources. The inline argument is used only when both other origins are
/// empty. Patterns may contain embedded newlines; each newline-separated
/// piece becomes an independent pattern. An empty pattern source
/// contributes zero patterns and therefore matches nothing.
#[derive(Default)]
pub struct PatternSet {
    pattern: String,
    regexps: Vec<String>,
    sources: Vec<Box<dyn BufRead + Send>>,
}

impl PatternSet {
    /// Creates a pattern set from an inline pattern argument. The argument
    /// may contain one or more patterns separated by newlines.
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            ..Default::default()
        }
    }

    /// Adds explicit patterns, each possibly newline-delimited. Once any
    /// explicit pattern or pattern source is present, the inline argument
    /// is ignored.
    pub fn with_regexps<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.regexps.extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Adds an already-open pattern source, one pattern per line
    pub fn with_source(mut self, source: impl BufRead + Send + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Opens a pattern file and adds it as a source
    pub fn with_file(self, path: impl AsRef<Path>) -> GrepResult<Self> {
        let path = path.as_ref();
        let file = fs::File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => GrepError::pattern_file_not_found(path),
            _ => GrepError::IoError(e),
        })?;
        Ok(self.with_source(BufReader::new(file)))
    }

    /// Resolves the set into the final ordered list of patterns, draining
    /// any pattern sources. A read failure on a source aborts resolution.
    pub fn resolve(self) -> GrepResult<Vec<String>> {
        let mut patterns = Vec::new();

        // The inline argument counts only when no explicit patterns or
        // pattern sources were supplied. Note that an empty inline string
        // still yields one (empty) pattern, which matches every line.
        if self.regexps.is_empty() && self.sources.is_empty() {
            patterns.extend(self.pattern.split('\n').map(str::to_string));
        }

        for pattern in &self.regexps {
            patterns.extend(pattern.split('\n').map(str::to_string));
        }

        for source in self.sources {
            for line in source.lines() {
                patterns.push(line.map_err(GrepError::pattern_source)?);
            }
        }

        debug!("resolved {} patterns", patterns.len());
        Ok(patterns)
    }
}

impl fmt::Debug for PatternSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternSet")
            .field("pattern", &self.pattern)
            .field("regexps", &self.regexps)
            .field("sources", &self.sources.len())
            .finish()
    }
}
