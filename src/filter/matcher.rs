use dashmap::DashMap;
use once_cell::sync::Lazy;
use regex::bytes::{Regex, RegexBuilder};
use std::sync::Arc;
use tracing::debug;

use crate::config::MatchOptions;
use crate::errors::{GrepError, GrepResult};

static PATTERN_CACHE: Lazy<DashMap<(String, bool), Arc<Regex>>> = Lazy::new(DashMap::new);

/// Compiles a single pattern in the regex crate's dialect.
///
/// When `ignore_case` is set the fold is applied to the parsed pattern
/// itself, so literals and character classes both fold; an inline `(?i)`
/// in the pattern is redundant but harmless. Compiled patterns are cached
/// process-wide, keyed by pattern text and fold flag.
pub fn compile(expr: &str, ignore_case: bool) -> GrepResult<Arc<Regex>> {
    let key = (expr.to_string(), ignore_case);
    if let Some(entry) = PATTERN_CACHE.get(&key) {
        return Ok(entry.clone());
    }

    debug!("compiling pattern {:?} (ignore_case: {})", expr, ignore_case);
    let regex = RegexBuilder::new(expr)
        .case_insensitive(ignore_case)
        .build()
        .map_err(|e| GrepError::invalid_pattern(expr, e))?;

    let regex = Arc::new(regex);
    PATTERN_CACHE.insert(key, regex.clone());
    Ok(regex)
}

/// Returns true for word-constituent bytes: ASCII letters, digits, and
/// the underscore
fn is_word_byte(b: u8) -> bool {
    b == b'_' || b.is_ascii_alphanumeric()
}

/// ASCII case-insensitive equality over raw bytes
fn fold_eq(a: &[u8], b: &[u8]) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// One compiled pattern plus the whole-word/whole-line refinement rules,
/// sharing the request's options record with every other matcher derived
/// from the same request
#[derive(Debug, Clone)]
pub struct LineMatcher {
    regex: Arc<Regex>,
    options: Arc<MatchOptions>,
}

impl LineMatcher {
    /// Compiles `expr` into a matcher bound to the given options
    pub fn new(expr: &str, options: Arc<MatchOptions>) -> GrepResult<Self> {
        let regex = compile(expr, options.ignore_case)?;
        Ok(Self { regex, options })
    }

    /// Tests a single line, applying whole-line or whole-word refinement
    /// on top of the raw regex match.
    ///
    /// Whole-line: the first match span must equal the entire line,
    /// byte-for-byte or fold-equal under `ignore_case`.
    ///
    /// Whole-word: some non-overlapping match span must either cover the
    /// whole line, start the line with a non-word-constituent byte after
    /// it, or end the line with a non-word-constituent byte before it.
    pub fn matches_line(&self, line: &[u8]) -> bool {
        let Some(first) = self.regex.find(line) else {
            return false;
        };

        // match lines only
        if self.options.line_regexp {
            let matched = first.as_bytes();
            if self.options.ignore_case {
                return fold_eq(matched, line);
            }
            return matched == line;
        }

        // match whole words only
        if self.options.word_regexp {
            for m in self.regex.find_iter(line) {
                let (begin, end) = (m.start(), m.end());
                if begin == 0 && end == line.len() {
                    return true;
                }
                if begin == 0 && !is_word_byte(line[end]) {
                    return true;
                }
                if end == line.len() && !is_word_byte(line[begin - 1]) {
                    return true;
                }
            }
            return false;
        }

        true
    }
}

/// The composite per-line predicate: an OR over every pattern's matcher,
/// followed by the invert-match transform
#[derive(Debug, Clone)]
pub struct MatcherSet {
    matchers: Vec<LineMatcher>,
    options: Arc<MatchOptions>,
}

impl MatcherSet {
    /// Compiles one matcher per pattern, in pattern-set order. Fails on
    /// the first invalid pattern.
    pub fn build(patterns: &[String], options: Arc<MatchOptions>) -> GrepResult<Self> {
        let mut matchers = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            matchers.push(LineMatcher::new(pattern, options.clone())?);
        }
        debug!("built matcher set with {} matchers", matchers.len());
        Ok(Self { matchers, options })
    }

    /// Evaluates the line against every matcher, short-circuiting on the
    /// first hit, then applies invert-match. An empty set matches no line,
    /// so with invert-match it selects every line.
    pub fn matches(&self, line: &[u8]) -> bool {
        let matched = self.matchers.iter().any(|m| m.matches_line(line));
        matched != self.options.invert_match
    }

    /// Number of compiled matchers in the set
    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    /// True when the set contains no matchers
    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }
}
