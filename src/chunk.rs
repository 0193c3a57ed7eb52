//! Splits a snapshot into labeled slices that fit a prompt budget.

use std::fmt;

/// One labeled slice of a snapshot. Borrowed, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomChunk<'a> {
    /// 1-based position.
    pub index: usize,
    pub total: usize,
    pub text: &'a str,
}

impl fmt::Display for DomChunk<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "### DOM CHUNK {}/{}\n{}", self.index, self.total, self.text)
    }
}

/// Lazy iterator over the chunks of a text.
///
/// Lengths are counted in characters so a slice never splits a code point.
/// Chunks are contiguous: joining them in order yields the input.
#[derive(Debug, Clone)]
pub struct DomChunks<'a> {
    rest: &'a str,
    max_chars: usize,
    next_index: usize,
    total: usize,
}

/// Chunks `text` into slices of at most `max_chars` characters.
///
/// A `max_chars` of zero is treated as one. Empty text yields no chunks.
pub fn chunk_text(text: &str, max_chars: usize) -> DomChunks<'_> {
    let max_chars = max_chars.max(1);
    let total = text.chars().count().div_ceil(max_chars);
    DomChunks {
        rest: text,
        max_chars,
        next_index: 1,
        total,
    }
}

impl<'a> Iterator for DomChunks<'a> {
    type Item = DomChunk<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }
        let split = self
            .rest
            .char_indices()
            .nth(self.max_chars)
            .map_or(self.rest.len(), |(i, _)| i);
        let (text, rest) = self.rest.split_at(split);
        self.rest = rest;
        let chunk = DomChunk {
            index: self.next_index,
            total: self.total,
            text,
        };
        self.next_index += 1;
        Some(chunk)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total + 1 - self.next_index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for DomChunks<'_> {}

#[cfg(test)]
#[path = "chunk_tests.rs"]
mod tests;
