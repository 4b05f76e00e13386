//! Word-window chunking of document bodies.
//!
//! Long-form text embeds poorly as a single vector, so bodies are split into
//! windows of approximately `chunk_size` consecutive words before encoding.
//! Chunking is pure: no I/O, no failure modes, and the produced sequence is
//! finite and restartable (call [`Chunker::chunks`] again for a fresh pass).

/// Default window size in words.
pub const DEFAULT_CHUNK_SIZE: usize = 200;

/// Splits body text into fixed-size word windows.
#[derive(Clone, Copy, Debug)]
pub struct Chunker {
    chunk_size: usize,
}

impl Chunker {
    /// A chunker producing windows of `chunk_size` words. A size of zero is
    /// clamped to one so the sequence always terminates.
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Lazily yields word windows over `text`.
    ///
    /// Every chunk is the exact space-joined concatenation of `chunk_size`
    /// consecutive words from the source; the final chunk may be shorter.
    /// Empty or whitespace-only input yields an empty sequence.
    pub fn chunks(&self, text: &str) -> impl Iterator<Item = String> + use<> {
        let words: Vec<String> = text.split_whitespace().map(str::to_string).collect();
        let size = self.chunk_size;
        let mut start = 0;

        std::iter::from_fn(move || {
            if start >= words.len() {
                return None;
            }
            let end = (start + size).min(words.len());
            let chunk = words[start..end].join(" ");
            start = end;
            Some(chunk)
        })
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}
