//! Line-based splitter for code without a grammar.
//!
//! Paragraphs (runs of non-blank lines) are merged up to the budget; a
//! paragraph that is too large on its own is cut at line boundaries.

use super::ChunkOutput;

pub fn chunk_lines(content: &str, budget: usize) -> Vec<ChunkOutput> {
    let lines: Vec<&str> = content.lines().collect();
    let mut chunks = Vec::new();
    let mut current: Option<(usize, usize)> = None;
    let mut current_chars = 0usize;

    for (start, end) in paragraphs(&lines) {
        let chars = non_ws_chars(&lines[start..=end]);

        if chars > budget {
            if let Some((s, e)) = current.take() {
                chunks.push(make_chunk(&lines, s, e));
            }
            current_chars = 0;
            split_paragraph(&lines, start, end, budget, &mut chunks);
            continue;
        }

        match current {
            Some((s, e)) if current_chars + chars > budget => {
                chunks.push(make_chunk(&lines, s, e));
                current = Some((start, end));
                current_chars = chars;
            }
            Some((s, _)) => {
                current = Some((s, end));
                current_chars += chars;
            }
            None => {
                current = Some((start, end));
                current_chars = chars;
            }
        }
    }

    if let Some((s, e)) = current {
        chunks.push(make_chunk(&lines, s, e));
    }
    chunks
}

/// Inclusive row ranges of non-blank line runs.
fn paragraphs(lines: &[&str]) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    let mut start = None;
    for (i, line) in lines.iter().enumerate() {
        match (line.trim().is_empty(), start) {
            (true, Some(s)) => {
                out.push((s, i - 1));
                start = None;
            }
            (false, None) => start = Some(i),
            _ => {}
        }
    }
    if let Some(s) = start {
        out.push((s, lines.len() - 1));
    }
    out
}

fn split_paragraph(
    lines: &[&str],
    start: usize,
    end: usize,
    budget: usize,
    chunks: &mut Vec<ChunkOutput>,
) {
    let mut chunk_start = start;
    let mut chars = 0usize;
    for i in start..=end {
        let line_chars = non_ws_chars(&lines[i..=i]);
        if chars + line_chars > budget && i > chunk_start {
            chunks.push(make_chunk(lines, chunk_start, i - 1));
            chunk_start = i;
            chars = 0;
        }
        chars += line_chars;
    }
    chunks.push(make_chunk(lines, chunk_start, end));
}

fn make_chunk(lines: &[&str], start: usize, end: usize) -> ChunkOutput {
    ChunkOutput {
        content: lines[start..=end].join("\n"),
        start_line: start + 1,
        end_line: end + 1,
    }
}

fn non_ws_chars(lines: &[&str]) -> usize {
    lines
        .iter()
        .flat_map(|l| l.chars())
        .filter(|c| !c.is_whitespace())
        .count()
}
