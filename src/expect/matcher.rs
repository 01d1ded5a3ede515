//! Prompt matchers
//!
//! A matcher recognizes the next expected prompt in a child's terminal
//! output. Both kinds work on raw bytes, since installers are free to emit
//! output that is not valid UTF-8. Literals are compiled to escaped
//! patterns and share the regex searcher.

use regex::bytes::{Regex, RegexBuilder};
use std::fmt;
use std::ops::Range;

use crate::error::Result;

/// How the matcher text is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatcherKind {
    /// Plain substring
    Literal,
    /// Regular expression
    Regex,
}

/// Recognizes a prompt in terminal output
#[derive(Clone)]
pub struct PatternMatcher {
    source: String,
    kind: MatcherKind,
    /// `None` only for a literal too large to compile, which never matches
    regex: Option<Regex>,
}

impl PatternMatcher {
    /// Match `text` as a plain substring
    pub fn literal(text: impl Into<String>) -> Self {
        let source = text.into();
        let regex = RegexBuilder::new(&regex::escape(&source))
            .size_limit(usize::MAX)
            .build()
            .map_err(|e| warn!("literal prompt {:?} cannot be searched: {}", source, e))
            .ok();
        Self {
            source,
            kind: MatcherKind::Literal,
            regex,
        }
    }

    /// Match `pattern` as a regular expression
    pub fn regex(pattern: impl Into<String>) -> Result<Self> {
        let source = pattern.into();
        let regex = Regex::new(&source)?;
        Ok(Self {
            source,
            kind: MatcherKind::Regex,
            regex: Some(regex),
        })
    }

    /// Text the matcher was built from
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn kind(&self) -> MatcherKind {
        self.kind
    }

    /// Byte range of the first match in `haystack`
    pub fn find(&self, haystack: &[u8]) -> Option<Range<usize>> {
        self.regex.as_ref()?.find(haystack).map(|m| m.range())
    }
}

impl fmt::Debug for PatternMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternMatcher")
            .field("source", &self.source)
            .field("kind", &self.kind())
            .finish()
    }
}

impl fmt::Display for PatternMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            MatcherKind::Literal => write!(f, "{:?}", self.source),
            MatcherKind::Regex => write!(f, "/{}/", self.source),
        }
    }
}

impl PartialEq for PatternMatcher {
    fn eq(&self, other: &Self) -> bool {
        self.kind() == other.kind() && self.source == other.source
    }
}

impl Eq for PatternMatcher {}
