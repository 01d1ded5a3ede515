//! Output buffer with consume-on-match semantics
//!
//! Holds the part of the child's output that no step has matched yet. A
//! successful match discards everything up to and including the matched
//! text, so later steps can never re-match a stale prompt.

use super::matcher::PatternMatcher;

/// Unconsumed output kept before the oldest bytes are dropped
pub const DEFAULT_BUFFER_LIMIT: usize = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct OutputBuffer {
    pending: Vec<u8>,
    limit: usize,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_BUFFER_LIMIT)
    }

    /// Buffer retaining at most `limit` unconsumed bytes
    pub fn with_limit(limit: usize) -> Self {
        Self {
            pending: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Append freshly read output
    pub fn push(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
        if self.pending.len() > self.limit {
            let excess = self.pending.len() - self.limit;
            self.pending.drain(..excess);
        }
    }

    /// Find `matcher` in the unconsumed output and consume through the match
    ///
    /// Returns the matched text on success; the buffer is unchanged otherwise.
    pub fn consume_match(&mut self, matcher: &PatternMatcher) -> Option<String> {
        let range = matcher.find(&self.pending)?;
        let matched = String::from_utf8_lossy(&self.pending[range.clone()]).into_owned();
        self.pending.drain(..range.end);
        Some(matched)
    }

    /// Unconsumed output as text, keeping only the last `max_bytes`
    pub fn snapshot(&self, max_bytes: usize) -> String {
        let start = self.pending.len().saturating_sub(max_bytes);
        String::from_utf8_lossy(&self.pending[start..]).into_owned()
    }

    /// Discard all unconsumed output
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new()
    }
}
