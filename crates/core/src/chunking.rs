use crate::error::IngestError;
use crate::models::{PipelineOptions, TextChunk};
use std::collections::VecDeque;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkingConfig {
    /// Target window length in characters.
    pub chunk_size: usize,
    /// Upper bound, in characters, on the text a window repeats from its predecessor.
    pub overlap: usize,
    pub separator: String,
}

impl From<&PipelineOptions> for ChunkingConfig {
    fn from(value: &PipelineOptions) -> Self {
        Self {
            chunk_size: value.chunk_size,
            overlap: value.chunk_overlap,
            separator: value.separator.clone(),
        }
    }
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize, overlap: usize, separator: impl Into<String>) -> Self {
        Self {
            chunk_size,
            overlap,
            separator: separator.into(),
        }
    }

    pub fn validate(&self) -> Result<(), IngestError> {
        if self.chunk_size == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "chunk_size must be positive".to_string(),
            ));
        }
        if self.overlap > self.chunk_size {
            return Err(IngestError::InvalidChunkConfig(format!(
                "overlap {} is larger than chunk_size {}",
                self.overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace('\u{a0}', " ")
}

/// A non-empty piece of the document between separators, in byte and character positions.
#[derive(Debug, Clone, Copy)]
struct Segment {
    start: usize,
    end: usize,
    char_start: usize,
    char_end: usize,
}

fn segments(text: &str, separator: &str) -> Vec<Segment> {
    if separator.is_empty() {
        return text
            .char_indices()
            .enumerate()
            .map(|(position, (start, ch))| Segment {
                start,
                end: start + ch.len_utf8(),
                char_start: position,
                char_end: position + 1,
            })
            .collect();
    }

    let separator_chars = separator.chars().count();
    let mut result = Vec::new();
    let mut start = 0;
    let mut char_start = 0;
    let mut push = |start: usize, end: usize, char_start: usize| {
        let char_end = char_start + text[start..end].chars().count();
        if end > start {
            result.push(Segment {
                start,
                end,
                char_start,
                char_end,
            });
        }
        char_end
    };
    for (index, _) in text.match_indices(separator) {
        char_start = push(start, index, char_start) + separator_chars;
        start = index + separator.len();
    }
    push(start, text.len(), char_start);
    result
}

/// Characters from the start of `first` to the end of `last`, separators included.
fn span(first: &Segment, last: &Segment) -> usize {
    last.char_end - first.char_start
}

/// Splits `text` on the separator and greedily packs the pieces into windows of at most
/// `chunk_size` characters, counting the separators between them as they appear in the
/// text. Each new window starts with the trailing pieces of the previous one, as many as
/// fit in `overlap` characters.
///
/// Separator runs never start or end a chunk, and a single piece longer than `chunk_size`
/// is emitted whole rather than cut.
pub fn split_text(text: &str, config: &ChunkingConfig) -> Vec<TextChunk> {
    let mut chunks = Vec::new();
    let mut window: VecDeque<Segment> = VecDeque::new();

    for segment in segments(text, &config.separator) {
        let overflows = window
            .front()
            .is_some_and(|front| span(front, &segment) > config.chunk_size);

        if overflows {
            push_window(text, &window, config, &mut chunks);

            while let (Some(front), Some(back)) = (window.front(), window.back()) {
                if span(front, back) <= config.overlap
                    && span(front, &segment) <= config.chunk_size
                {
                    break;
                }
                window.pop_front();
            }
        }

        window.push_back(segment);
    }

    push_window(text, &window, config, &mut chunks);
    chunks
}

fn push_window(
    text: &str,
    window: &VecDeque<Segment>,
    config: &ChunkingConfig,
    chunks: &mut Vec<TextChunk>,
) {
    let (Some(first), Some(last)) = (window.front(), window.back()) else {
        return;
    };
    let content = &text[first.start..last.end];
    if content.trim().is_empty() {
        return;
    }

    let length = span(first, last);
    if length > config.chunk_size {
        warn!(
            length,
            chunk_size = config.chunk_size,
            "emitting chunk longer than chunk_size"
        );
    }

    chunks.push(TextChunk {
        text: content.to_string(),
        offset: first.start,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Rebuilds the document from its chunks, checking that whatever falls between
    /// chunks is separator or whitespace only.
    fn reconstruct(chunks: &[TextChunk], text: &str) -> String {
        let mut output = String::new();
        let mut covered = 0usize;
        for chunk in chunks {
            if chunk.offset >= covered {
                let gap = &text[covered..chunk.offset];
                assert!(gap.trim().is_empty(), "text {gap:?} dropped before {chunk:?}");
                output.push_str(gap);
                output.push_str(&chunk.text);
            } else {
                output.push_str(&chunk.text[covered - chunk.offset..]);
            }
            covered = covered.max(chunk.end());
        }
        let tail = &text[covered..];
        assert!(tail.trim().is_empty(), "trailing text {tail:?} dropped");
        output.push_str(tail);
        output
    }

    fn texts(chunks: &[TextChunk]) -> Vec<&str> {
        chunks.iter().map(|chunk| chunk.text.as_str()).collect()
    }

    #[test]
    fn whitespace_is_normalized() {
        let input = "A  \t  lot\nof   spacing";
        let normalized = normalize_whitespace(input);
        assert_eq!(normalized, "A lot of spacing");
    }

    #[test]
    fn short_document_fits_in_one_chunk() {
        let text = "A cat sat.\nA dog ran.\nA bird flew.";
        let chunks = split_text(text, &ChunkingConfig::new(50, 5, "\n"));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, text);
        assert_eq!(chunks[0].offset, 0);
    }

    #[test]
    fn empty_input_produces_no_chunks() {
        assert!(split_text("", &ChunkingConfig::new(10, 2, "\n")).is_empty());
        assert!(split_text("\n\n\n", &ChunkingConfig::new(10, 2, "\n")).is_empty());
    }

    #[test]
    fn windows_carry_trailing_pieces_within_overlap() {
        let text = "alpha\nbravo\ncharlie\ndelta\necho";
        let chunks = split_text(text, &ChunkingConfig::new(13, 6, "\n"));
        assert_eq!(
            texts(&chunks),
            vec!["alpha\nbravo", "bravo\ncharlie", "delta\necho"]
        );
    }

    #[test]
    fn adjacent_chunks_share_at_most_overlap_characters() {
        let text = (0..40)
            .map(|index| format!("line number {index}"))
            .collect::<Vec<_>>()
            .join("\n");
        let config = ChunkingConfig::new(60, 20, "\n");
        let chunks = split_text(&text, &config);
        assert!(chunks.len() > 2);

        for pair in chunks.windows(2) {
            let (left, right) = (&pair[0], &pair[1]);
            if right.offset < left.end() {
                let shared = &left.text[right.offset - left.offset..];
                assert!(right.text.starts_with(shared));
                assert!(shared.chars().count() <= config.overlap);
            }
        }
    }

    #[test]
    fn chunks_respect_size_and_reconstruct_the_document() {
        let text = "The quick brown fox.\nJumps over the lazy dog.\nPack my box.\nWith five dozen liquor jugs.\nSphinx of black quartz.\nJudge my vow.";
        for (size, overlap) in [(30, 10), (45, 0), (30, 30), (80, 30)] {
            let chunks = split_text(text, &ChunkingConfig::new(size, overlap, "\n"));
            for chunk in &chunks {
                assert!(chunk.char_len() <= size, "chunk {:?} over {size}", chunk.text);
                assert_eq!(&text[chunk.offset..chunk.end()], chunk.text);
            }
            assert_eq!(reconstruct(&chunks, text), text);
        }
    }

    #[test]
    fn separator_runs_count_toward_chunk_size() {
        let text = "AAAAA\n\nBBBBB\nCCCCC";
        let chunks = split_text(text, &ChunkingConfig::new(5, 0, "\n"));
        assert_eq!(texts(&chunks), vec!["AAAAA", "BBBBB", "CCCCC"]);

        let chunks = split_text(text, &ChunkingConfig::new(12, 0, "\n"));
        assert_eq!(texts(&chunks), vec!["AAAAA\n\nBBBBB", "CCCCC"]);
        assert_eq!(chunks[1].offset, 13);
    }

    #[test]
    fn separator_runs_never_form_a_chunk() {
        let text = "AAAAA\n\n\n\n\nBBBBB";
        for (size, overlap) in [(5, 0), (5, 5), (7, 3)] {
            let chunks = split_text(text, &ChunkingConfig::new(size, overlap, "\n"));
            assert_eq!(
                texts(&chunks),
                vec!["AAAAA", "BBBBB"],
                "size {size} overlap {overlap}"
            );
        }
    }

    #[test]
    fn leading_trailing_and_doubled_separators_are_covered() {
        for text in ["a\n\nb\nc", "\nabc", "abc\n\n", "x\n\n\n\ny", "\n\nab\n\ncd\n"] {
            for (size, overlap) in [(1, 0), (2, 1), (3, 0), (4, 2), (6, 6), (20, 5)] {
                let chunks = split_text(text, &ChunkingConfig::new(size, overlap, "\n"));
                assert!(!chunks.is_empty(), "{text:?} produced no chunks");
                for chunk in &chunks {
                    assert!(!chunk.text.trim().is_empty(), "blank chunk from {text:?}");
                    assert!(
                        chunk.char_len() <= size || !chunk.text.contains('\n'),
                        "chunk {:?} of {text:?} over {size}",
                        chunk.text
                    );
                }
                assert_eq!(reconstruct(&chunks, text), text);
            }
        }
    }

    #[test]
    fn oversized_piece_is_emitted_whole() {
        let long = "x".repeat(40);
        let text = format!("short\n{long}\ntail");
        let chunks = split_text(&text, &ChunkingConfig::new(10, 2, "\n"));
        assert_eq!(texts(&chunks), vec!["short", long.as_str(), "tail"]);
        assert_eq!(reconstruct(&chunks, &text), text);
    }

    #[test]
    fn lengths_count_characters_not_bytes() {
        let text = "ééééé\nüüüüü";
        let chunks = split_text(text, &ChunkingConfig::new(11, 0, "\n"));
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn empty_separator_splits_characters() {
        let chunks = split_text("abcdef", &ChunkingConfig::new(4, 2, ""));
        assert_eq!(texts(&chunks), vec!["abcd", "cdef"]);
    }

    #[test]
    fn multi_character_separator_is_counted_in_full() {
        let text = "one || two || three";
        let chunks = split_text(text, &ChunkingConfig::new(10, 0, " || "));
        assert_eq!(texts(&chunks), vec!["one || two", "three"]);
    }

    #[test]
    fn invalid_configs_are_rejected() {
        assert!(ChunkingConfig::new(0, 0, "\n").validate().is_err());
        assert!(ChunkingConfig::new(10, 11, "\n").validate().is_err());
        assert!(ChunkingConfig::new(10, 10, "\n").validate().is_ok());
    }

    fn text_and_config() -> impl Strategy<Value = (String, usize, usize)> {
        ("[abé \n]{0,60}", 1usize..20)
            .prop_flat_map(|(text, size)| (Just(text), Just(size), 0..=size))
    }

    proptest! {
        #[test]
        fn chunking_keeps_every_character_within_bounds((text, size, overlap) in text_and_config()) {
            let chunks = split_text(&text, &ChunkingConfig::new(size, overlap, "\n"));

            for chunk in &chunks {
                prop_assert!(!chunk.text.trim().is_empty());
                prop_assert!(chunk.char_len() <= size || !chunk.text.contains('\n'));
                prop_assert_eq!(&text[chunk.offset..chunk.end()], chunk.text.as_str());
            }

            for pair in chunks.windows(2) {
                let (left, right) = (&pair[0], &pair[1]);
                prop_assert!(right.offset > left.offset);
                if right.offset < left.end() {
                    let shared = &left.text[right.offset - left.offset..];
                    prop_assert!(right.text.starts_with(shared));
                    prop_assert!(shared.chars().count() <= overlap);
                }
            }

            prop_assert_eq!(reconstruct(&chunks, &text), text);
        }
    }
}
