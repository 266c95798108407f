//! Recursive character splitter for prose.
//!
//! The text is first cut into pieces no longer than `chunk_size`, trying each
//! separator in turn (paragraphs, lines, words, then raw characters). Pieces
//! are then merged greedily into chunks; consecutive chunks share trailing
//! pieces totalling at most `chunk_overlap` characters. Every chunk is an
//! exact slice of the input, so the input is recoverable from the chunks and
//! their offsets.

use std::collections::VecDeque;

const DEFAULT_SEPARATORS: &[&str] = &["\n\n", "\n", " ", ""];

#[derive(Debug, Clone, PartialEq)]
pub struct TextChunk {
    pub content: String,
    /// Character offset of the chunk in the source text
    pub start_offset: usize,
}

#[derive(Debug, Clone)]
pub struct RecursiveSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<&'static str>,
}

/// Byte span plus its length in characters.
#[derive(Debug, Clone, Copy)]
struct Piece {
    start: usize,
    end: usize,
    chars: usize,
}

impl RecursiveSplitter {
    /// `chunk_overlap` is clamped below `chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
            separators: DEFAULT_SEPARATORS.to_vec(),
        }
    }

    pub fn split(&self, text: &str) -> Vec<TextChunk> {
        if text.is_empty() {
            return Vec::new();
        }

        let mut pieces = Vec::new();
        self.collect_pieces(text, 0, text.len(), &self.separators, &mut pieces);

        self.merge(text, &pieces)
    }

    fn collect_pieces(
        &self,
        text: &str,
        start: usize,
        end: usize,
        separators: &[&'static str],
        out: &mut Vec<Piece>,
    ) {
        let chars = text[start..end].chars().count();
        if chars <= self.chunk_size {
            if start < end {
                out.push(Piece { start, end, chars });
            }
            return;
        }

        let Some((&sep, rest)) = separators.split_first() else {
            self.hard_split(text, start, end, out);
            return;
        };
        if sep.is_empty() {
            self.hard_split(text, start, end, out);
            return;
        }

        let slice = &text[start..end];
        if !slice.contains(sep) {
            self.collect_pieces(text, start, end, rest, out);
            return;
        }

        // Separator stays attached to the end of the preceding piece.
        let mut cursor = start;
        for (idx, _) in slice.match_indices(sep) {
            let piece_end = start + idx + sep.len();
            self.collect_pieces(text, cursor, piece_end, rest, out);
            cursor = piece_end;
        }
        if cursor < end {
            self.collect_pieces(text, cursor, end, rest, out);
        }
    }

    fn hard_split(&self, text: &str, start: usize, end: usize, out: &mut Vec<Piece>) {
        let mut piece_start = start;
        let mut count = 0usize;
        for (idx, _) in text[start..end].char_indices() {
            if count == self.chunk_size {
                out.push(Piece {
                    start: piece_start,
                    end: start + idx,
                    chars: count,
                });
                piece_start = start + idx;
                count = 0;
            }
            count += 1;
        }
        if count > 0 {
            out.push(Piece {
                start: piece_start,
                end,
                chars: count,
            });
        }
    }

    fn merge(&self, text: &str, pieces: &[Piece]) -> Vec<TextChunk> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<Piece> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            if !window.is_empty() && total + piece.chars > self.chunk_size {
                chunks.push(make_chunk(text, &window));
                while let Some(front) = window.front() {
                    let too_much_overlap = total > self.chunk_overlap;
                    let no_room = total + piece.chars > self.chunk_size;
                    if !(too_much_overlap || no_room) {
                        break;
                    }
                    total -= front.chars;
                    window.pop_front();
                }
            }
            window.push_back(*piece);
            total += piece.chars;
        }

        if !window.is_empty() {
            chunks.push(make_chunk(text, &window));
        }
        chunks
    }
}

fn make_chunk(text: &str, window: &VecDeque<Piece>) -> TextChunk {
    let start = window.front().map(|p| p.start).unwrap_or(0);
    let end = window.back().map(|p| p.end).unwrap_or(start);
    TextChunk {
        content: text[start..end].to_string(),
        start_offset: text[..start].chars().count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article() -> String {
        (0..60)
            .map(|i| format!("Sentence number {i} talks about technical credit and design."))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Rebuild the source from chunks by skipping each chunk's overlap with
    /// the previous one.
    fn rejoin(chunks: &[TextChunk]) -> String {
        let mut out = String::new();
        let mut covered = 0usize;
        for c in chunks {
            let skip = covered - c.start_offset;
            out.extend(c.content.chars().skip(skip));
            covered = c.start_offset + c.content.chars().count();
        }
        out
    }

    #[test]
    fn test_empty_text() {
        assert!(RecursiveSplitter::new(100, 10).split("").is_empty());
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = RecursiveSplitter::new(1000, 100).split("short text");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "short text");
        assert_eq!(chunks[0].start_offset, 0);
    }

    #[test]
    fn test_chunks_respect_size() {
        let text = article();
        let chunks = RecursiveSplitter::new(200, 40).split(&text);
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(c.content.chars().count() <= 200, "{}", c.content.len());
        }
    }

    #[test]
    fn test_rejoin_reconstructs_source() {
        let text = article();
        let chunks = RecursiveSplitter::new(200, 40).split(&text);

        let total: usize = chunks.iter().map(|c| c.content.chars().count()).sum();
        let overlap: usize = chunks
            .windows(2)
            .map(|w| w[0].start_offset + w[0].content.chars().count() - w[1].start_offset)
            .sum();
        assert_eq!(total - overlap, text.chars().count());
        assert_eq!(rejoin(&chunks), text);
    }

    #[test]
    fn test_consecutive_chunks_overlap_within_limit() {
        let text = article();
        let chunks = RecursiveSplitter::new(200, 40).split(&text);
        for w in chunks.windows(2) {
            let prev_end = w[0].start_offset + w[0].content.chars().count();
            assert!(w[1].start_offset <= prev_end);
            assert!(prev_end - w[1].start_offset <= 40);
        }
    }

    #[test]
    fn test_prefers_paragraph_boundaries() {
        let para = "word ".repeat(30);
        let text = format!("{para}\n\n{para}\n\n{para}");
        let chunks = RecursiveSplitter::new(200, 0).split(&text);
        assert_eq!(chunks.len(), 3);
        assert!(chunks[0].content.ends_with("\n\n"));
    }

    #[test]
    fn test_hard_split_without_separators() {
        let text = "é".repeat(250);
        let chunks = RecursiveSplitter::new(100, 10).split(&text);
        assert!(chunks.iter().all(|c| c.content.chars().count() <= 100));
        assert_eq!(rejoin(&chunks), text);
    }
}
