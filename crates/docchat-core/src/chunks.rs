//! Splits document text into passages for embedding and retrieval.
//! Fixed windows measured in characters (never bytes), so a code point is never cut.

/// Default characters per passage.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// A contiguous piece of a document's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Passage {
    /// Position of this passage within the document (0, 1, 2, …).
    pub index: usize,
    pub text: String,
}

/// Window size and overlap, both in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkOptions {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: 0,
        }
    }
}

/// Split `text` into consecutive windows of `chunk_size` characters.
///
/// With `overlap == 0` the passages concatenate back to `text` exactly. With an
/// overlap, each window starts `chunk_size - overlap` characters after the previous
/// one; the overlap is clamped below `chunk_size`. The trailing window may be
/// shorter than `chunk_size`. A `chunk_size` of 0 disables splitting.
pub fn chunk(text: &str, chunk_size: usize, overlap: usize) -> Vec<Passage> {
    if text.is_empty() {
        return Vec::new();
    }
    if chunk_size == 0 {
        return vec![Passage {
            index: 0,
            text: text.to_string(),
        }];
    }
    let stride = chunk_size - overlap.min(chunk_size - 1);

    // Byte offset of every char boundary, including the end of the string.
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_count = bounds.len() - 1;

    let mut passages = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + chunk_size).min(char_count);
        passages.push(Passage {
            index: passages.len(),
            text: text[bounds[start]..bounds[end]].to_string(),
        });
        if end == char_count {
            break;
        }
        start += stride;
    }
    passages
}

/// Chunk with the given options.
pub fn chunk_with(text: &str, options: &ChunkOptions) -> Vec<Passage> {
    chunk(text, options.chunk_size, options.overlap)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(passages: &[Passage]) -> Vec<&str> {
        passages.iter().map(|p| p.text.as_str()).collect()
    }

    #[test]
    fn empty_text_has_no_passages() {
        assert!(chunk("", 10, 0).is_empty());
        assert!(chunk("", 0, 0).is_empty());
    }

    #[test]
    fn concatenation_reconstructs_text() {
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(23);
        for size in [1, 7, 64, 1000, 5000] {
            let passages = chunk(&text, size, 0);
            let joined: String = passages.iter().map(|p| p.text.as_str()).collect();
            assert_eq!(joined, text);
            let (last, rest) = passages.split_last().unwrap();
            assert!(rest.iter().all(|p| p.text.chars().count() == size));
            assert!(last.text.chars().count() <= size);
        }
    }

    #[test]
    fn trailing_window_kept_as_is() {
        let c = chunk("abcdefgh", 3, 0);
        assert_eq!(texts(&c), vec!["abc", "def", "gh"]);
        assert_eq!(c.iter().map(|p| p.index).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn multibyte_chars_are_not_split() {
        let c = chunk("héllo wörld ✓", 4, 0);
        assert_eq!(texts(&c), vec!["héll", "o wö", "rld ", "✓"]);
    }

    #[test]
    fn overlap_repeats_window_tail() {
        let c = chunk("abcdefghij", 4, 1);
        assert_eq!(texts(&c), vec!["abcd", "defg", "ghij"]);
    }

    #[test]
    fn overlap_is_clamped_below_chunk_size() {
        let c = chunk("abcd", 2, 5);
        assert_eq!(texts(&c), vec!["ab", "bc", "cd"]);
    }

    #[test]
    fn zero_chunk_size_keeps_whole_text() {
        let c = chunk("one passage only", 0, 0);
        assert_eq!(texts(&c), vec!["one passage only"]);
    }

    #[test]
    fn chunk_with_uses_options() {
        let opts = ChunkOptions {
            chunk_size: 2,
            overlap: 0,
        };
        assert_eq!(texts(&chunk_with("abcde", &opts)), vec!["ab", "cd", "e"]);
    }
}
