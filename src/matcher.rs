//! URL pattern matching for removal rules.

use regex::Regex;

/// Placeholders swapped in for wildcard tokens while the rest of the
/// pattern is regex-escaped. Control characters cannot appear in URL
/// patterns and pass through `regex::escape` unchanged.
const CROSS_SEGMENT: &str = "\u{1}";
const SINGLE_SEGMENT: &str = "\u{2}";

/// Compiled URL pattern.
pub enum UrlPattern {
    /// Exact string match
    Exact(String),
    /// Compiled wildcard match
    Wildcard(Regex),
}

impl UrlPattern {
    /// Compile a pattern string.
    ///
    /// Patterns without wildcards compare by string equality. In wildcard
    /// patterns `*` matches one or more characters within a path segment
    /// and `**` matches any sequence of characters, including `/` and the
    /// empty sequence. All other characters match literally.
    pub fn compile(pattern: &str) -> Result<Self, PatternError> {
        if !pattern.contains('*') {
            return Ok(Self::Exact(pattern.to_string()));
        }

        let tokenized = pattern
            .replace("**", CROSS_SEGMENT)
            .replace('*', SINGLE_SEGMENT);
        let expanded = regex::escape(&tokenized)
            .replace(CROSS_SEGMENT, ".*")
            .replace(SINGLE_SEGMENT, "[^/]+");
        let regex = Regex::new(&format!("^{expanded}$"))?;

        Ok(Self::Wildcard(regex))
    }

    /// Check whether a URL matches this pattern. Matching is
    /// case-sensitive and covers the whole URL.
    pub fn matches(&self, url: &str) -> bool {
        match self {
            Self::Exact(pattern) => url == pattern,
            Self::Wildcard(regex) => regex.is_match(url),
        }
    }
}

/// Errors that can occur during pattern compilation.
#[derive(Debug, thiserror::Error)]
pub enum PatternError {
    #[error("Invalid URL pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}
