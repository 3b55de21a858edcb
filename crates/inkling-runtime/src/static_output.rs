#![forbid(unsafe_code)]

//! Append-only history of committed static content.
//!
//! Static content is written once, above the live region, and never erased.
//! The accumulator keeps all of it so the compositor can re-emit the full
//! history when the live region is repainted from scratch (debug mode, or a
//! frame taller than the terminal).

use crate::frame::is_static_content;

/// Ordered concatenation of every static chunk seen.
#[derive(Debug, Default, Clone)]
pub struct StaticAccumulator {
    text: String,
    chunks: usize,
}

impl StaticAccumulator {
    /// Empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `chunk` if it is real static content.
    ///
    /// Returns whether anything was appended. The empty sentinel and empty
    /// strings are ignored.
    pub fn push(&mut self, chunk: &str) -> bool {
        if !is_static_content(chunk) {
            return false;
        }
        self.text.push_str(chunk);
        self.chunks += 1;
        true
    }

    /// Everything committed so far.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Number of chunks appended.
    #[inline]
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.chunks
    }

    /// Total length in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Whether nothing has been committed.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// History followed by `live`, as one string.
    #[must_use]
    pub fn with_live(&self, live: &str) -> String {
        let mut out = String::with_capacity(self.text.len() + live.len());
        out.push_str(&self.text);
        out.push_str(live);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_and_empty_are_ignored() {
        let mut acc = StaticAccumulator::new();
        assert!(!acc.push("\n"));
        assert!(!acc.push(""));
        assert!(acc.is_empty());
        assert_eq!(acc.chunk_count(), 0);
    }

    #[test]
    fn chunks_concatenate_in_order() {
        let mut acc = StaticAccumulator::new();
        assert!(acc.push("a\n"));
        assert!(acc.push("b\n"));
        assert_eq!(acc.as_str(), "a\nb\n");
        assert_eq!(acc.chunk_count(), 2);
        assert_eq!(acc.len(), 4);
    }

    #[test]
    fn with_live_prefixes_history() {
        let mut acc = StaticAccumulator::new();
        acc.push("Log1\n");
        assert_eq!(acc.with_live("X"), "Log1\nX");
    }
}
