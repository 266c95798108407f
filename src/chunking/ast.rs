//! Syntax-aware code splitting with tree-sitter.
//!
//! Top-level declarations are packed greedily into chunks of at most
//! `budget` non-whitespace characters. A declaration that alone exceeds the
//! budget is split along its children, recursively. Chunks always cover
//! whole lines.
//!
//! Returns `None` (caller falls back to line splitting) when the language has
//! no grammar, the file exceeds [`MAX_FILE_SIZE`], or more than
//! [`ERROR_THRESHOLD`] of the nodes are parse errors.

use super::{ChunkOutput, Language};

/// Files larger than this skip AST parsing entirely.
const MAX_FILE_SIZE: usize = 500 * 1024;

/// If more than this fraction of AST nodes are error nodes, fall back.
const ERROR_THRESHOLD: f64 = 0.30;

pub fn chunk_with_ast(content: &str, language: Language, budget: usize) -> Option<Vec<ChunkOutput>> {
    if content.len() > MAX_FILE_SIZE {
        return None;
    }

    let ts_language = language.tree_sitter_language()?;
    let mut parser = tree_sitter::Parser::new();
    parser.set_language(&ts_language).ok()?;
    let tree = parser.parse(content, None)?;
    let root = tree.root_node();

    let (total, errors) = count_nodes(root);
    if total > 0 && (errors as f64 / total as f64) > ERROR_THRESHOLD {
        tracing::warn!(
            "AST error rate {:.0}% for {:?}, falling back to line-based chunking",
            (errors as f64 / total as f64) * 100.0,
            language
        );
        return None;
    }

    let lines: Vec<&str> = content.lines().collect();
    let mut packer = Packer::new(&lines, budget);
    packer.pack_children(root);
    let chunks = packer.finish();

    if chunks.is_empty() {
        None
    } else {
        Some(chunks)
    }
}

/// Greedy row packer. Every row lands in at most one chunk; rows a node
/// shares with already-packed rows (a class header and its opening brace,
/// say) are not counted twice.
struct Packer<'a> {
    lines: &'a [&'a str],
    budget: usize,
    /// Row range of the chunk under construction.
    pending: Option<(usize, usize)>,
    chars: usize,
    /// Last row of the most recently emitted chunk.
    emitted: Option<usize>,
    chunks: Vec<ChunkOutput>,
}

impl<'a> Packer<'a> {
    fn new(lines: &'a [&'a str], budget: usize) -> Self {
        Self {
            lines,
            budget,
            pending: None,
            chars: 0,
            emitted: None,
            chunks: Vec::new(),
        }
    }

    /// First row not yet claimed by a chunk.
    fn next_row(&self) -> usize {
        self.pending
            .map(|(_, end)| end)
            .or(self.emitted)
            .map_or(0, |row| row + 1)
    }

    fn flush(&mut self) {
        if let Some((start, end)) = self.pending.take() {
            self.chunks.push(make_chunk(self.lines, start, end));
            self.emitted = Some(end);
        }
        self.chars = 0;
    }

    /// Extend the pending chunk through `end`. Gap lines (comments, blank
    /// lines) since the previous node come along.
    fn extend(&mut self, start: usize, end: usize, chars: usize) {
        self.pending = Some(match self.pending {
            Some((s, _)) => (s, end),
            None => (start, end),
        });
        self.chars += chars;
    }

    /// Pack `node`'s children. Pending rows carry into oversized children so
    /// a declaration's header joins its first body chunk.
    fn pack_children(&mut self, node: tree_sitter::Node) {
        let mut cursor = node.walk();
        let children: Vec<tree_sitter::Node> = node.children(&mut cursor).collect();

        for child in children {
            let (start, end) = (child.start_position().row, child.end_position().row);
            let from = match self.pending {
                Some(_) => self.next_row(),
                None => start.max(self.next_row()),
            };
            if from > end {
                continue;
            }
            let chars = non_ws_chars_in_range(self.lines, from, end);

            if chars > self.budget && child.child_count() > 0 {
                self.pack_children(child);
            } else if self.pending.is_some() && self.chars + chars > self.budget {
                self.flush();
                let from = start.max(self.next_row());
                if from <= end {
                    self.extend(from, end, non_ws_chars_in_range(self.lines, from, end));
                }
            } else {
                // An oversized leaf stands alone; the next sibling flushes it.
                self.extend(from, end, chars);
            }
        }
    }

    fn finish(mut self) -> Vec<ChunkOutput> {
        self.flush();
        self.chunks
    }
}

fn make_chunk(lines: &[&str], start: usize, end: usize) -> ChunkOutput {
    let content = (start..=end)
        .filter_map(|i| lines.get(i).copied())
        .collect::<Vec<&str>>()
        .join("\n");

    ChunkOutput {
        content,
        start_line: start + 1,
        end_line: end + 1,
    }
}

fn non_ws_chars_in_range(lines: &[&str], start: usize, end: usize) -> usize {
    (start..=end)
        .filter_map(|i| lines.get(i))
        .flat_map(|line| line.chars())
        .filter(|c| !c.is_whitespace())
        .count()
}

fn count_nodes(node: tree_sitter::Node) -> (usize, usize) {
    let mut total = 1usize;
    let mut errors = usize::from(node.is_error());

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        let (t, e) = count_nodes(child);
        total += t;
        errors += e;
    }

    (total, errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUDGET: usize = 800;

    #[test]
    fn test_small_java_methods_merge() {
        let source = r#"
public class Greeter {
    public String hello() {
        return "hello";
    }

    public String world() {
        return "world";
    }
}
"#;
        let chunks = chunk_with_ast(source, Language::Java, BUDGET).unwrap();
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].content.contains("hello()"));
        assert!(chunks[0].content.contains("world()"));
    }

    #[test]
    fn test_large_java_class_splits_into_methods() {
        let methods: String = (0..40)
            .map(|i| {
                format!(
                    "    public int method{i}(int x) {{\n        int y = x * {i};\n        return y + {i};\n    }}\n\n"
                )
            })
            .collect();
        let source = format!("public class Big {{\n{methods}}}\n");

        let chunks = chunk_with_ast(&source, Language::Java, BUDGET).unwrap();
        assert!(chunks.len() >= 2, "expected a split, got {} chunks", chunks.len());
        let all: String = chunks.iter().map(|c| c.content.as_str()).collect::<Vec<_>>().join("\n");
        assert!(all.contains("method0"));
        assert!(all.contains("method39"));
    }

    #[test]
    fn test_class_header_joins_first_body_chunk() {
        let methods: String = (0..40)
            .map(|i| {
                format!(
                    "    public int method{i}(int x) {{\n        int y = x * {i};\n        return y + {i};\n    }}\n\n"
                )
            })
            .collect();
        let source = format!(
            "package demo;\n\nimport java.util.List;\nimport java.util.Map;\n\npublic class Big {{\n{methods}}}\n"
        );

        let chunks = chunk_with_ast(&source, Language::Java, BUDGET).unwrap();
        assert!(chunks.len() >= 2);
        for pair in chunks.windows(2) {
            assert!(
                pair[0].end_line < pair[1].start_line,
                "rows {}-{} and {}-{} overlap",
                pair[0].start_line,
                pair[0].end_line,
                pair[1].start_line,
                pair[1].end_line
            );
        }
        assert!(chunks.iter().all(|c| c.start_line < c.end_line));

        let header = chunks
            .iter()
            .find(|c| c.content.contains("public class Big {"))
            .unwrap();
        assert!(header.content.contains("method0"));
        assert_eq!(
            chunks.iter().filter(|c| c.content.contains("class Big")).count(),
            1
        );
    }

    #[test]
    fn test_chunks_are_ordered_and_one_based() {
        let body: String = (0..150).map(|i| format!("    let var_{i} = {i};\n")).collect();
        let source = format!("fn big() {{\n{body}}}\n\nfn small() {{}}\n");

        let chunks = chunk_with_ast(&source, Language::Rust, BUDGET).unwrap();
        assert_eq!(chunks[0].start_line, 1);
        for pair in chunks.windows(2) {
            assert!(pair[0].end_line < pair[1].start_line);
        }
    }

    #[test]
    fn test_python_functions() {
        let source = "def a():\n    return 1\n\n\ndef b():\n    return 2\n";
        let chunks = chunk_with_ast(source, Language::Python, BUDGET).unwrap();
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].content.contains("def a"));
        assert!(chunks[0].content.contains("def b"));
    }

    #[test]
    fn test_typescript_declarations() {
        let source = r#"
interface Config {
    name: string;
}

export class Service {
    constructor(private config: Config) {}
}
"#;
        let chunks = chunk_with_ast(source, Language::TypeScript, BUDGET).unwrap();
        let all: String = chunks.iter().map(|c| c.content.as_str()).collect::<Vec<_>>().join("\n");
        assert!(all.contains("interface Config"));
        assert!(all.contains("class Service"));
    }

    #[test]
    fn test_skips_large_files() {
        let large = "x".repeat(MAX_FILE_SIZE + 1);
        assert!(chunk_with_ast(&large, Language::Java, BUDGET).is_none());
    }

    #[test]
    fn test_unsupported_language_returns_none() {
        assert!(chunk_with_ast("some text", Language::Unknown, BUDGET).is_none());
    }
}
