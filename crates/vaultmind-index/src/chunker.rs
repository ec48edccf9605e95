//! Heading-aware Markdown chunking.
//!
//! Notes are split on ATX heading structure into bounded chunks, each
//! carrying a heading-path label of the form `# H1 > ## H2`. Content before
//! the first heading is attributed to a synthetic top-level heading named
//! after the note title. Sections above the token budget are split at
//! paragraph boundaries; fenced code blocks are never split.
//!
//! Given the same input the output is byte-identical, which is what lets
//! chunk ids (derived from the text) remain stable across indexing runs.

use vaultmind_core::defaults;

/// Configuration for the Markdown chunker.
#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    /// Target token budget per chunk.
    pub token_budget: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            token_budget: defaults::CHUNK_TOKEN_BUDGET,
        }
    }
}

/// One chunk of a note: the serialized heading stack and the body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteChunk {
    /// Serialized heading stack, e.g. `# H1 > ## H2`.
    pub heading_path: String,
    pub text: String,
}

/// Heading-structure Markdown chunker.
#[derive(Debug, Clone, Default)]
pub struct MarkdownChunker {
    config: ChunkerConfig,
}

impl MarkdownChunker {
    /// Create a new chunker with the given configuration.
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    /// Split a note into an ordered sequence of chunks.
    pub fn chunk(&self, markdown: &str, title: &str) -> Vec<NoteChunk> {
        let mut chunks = Vec::new();
        // Stack of (level, heading text); empty while in the preamble.
        let mut stack: Vec<(usize, String)> = Vec::new();
        let mut section: Vec<&str> = Vec::new();
        let mut in_fence = false;

        let synthetic_root = format!("# {title}");

        for line in markdown.lines() {
            if line.trim_start().starts_with("```") {
                in_fence = !in_fence;
                section.push(line);
                continue;
            }

            if !in_fence {
                if let Some((level, text)) = parse_atx_heading(line) {
                    let path = serialize_path(&stack, &synthetic_root);
                    self.flush_section(&mut chunks, &path, &section);
                    section.clear();

                    while stack.last().is_some_and(|(l, _)| *l >= level) {
                        stack.pop();
                    }
                    stack.push((level, text));
                    continue;
                }
            }

            section.push(line);
        }

        let path = serialize_path(&stack, &synthetic_root);
        self.flush_section(&mut chunks, &path, &section);

        chunks
    }

    /// Emit zero or more chunks for a completed section.
    fn flush_section(&self, chunks: &mut Vec<NoteChunk>, heading_path: &str, lines: &[&str]) {
        let body = trim_blank_lines(lines);
        if body.is_empty() {
            return;
        }

        let text = body.join("\n");
        if approx_tokens(&text) <= self.config.token_budget {
            chunks.push(NoteChunk {
                heading_path: heading_path.to_string(),
                text,
            });
            return;
        }

        for part in self.pack_paragraphs(&split_paragraphs(&body)) {
            chunks.push(NoteChunk {
                heading_path: heading_path.to_string(),
                text: part,
            });
        }
    }

    /// Greedily pack paragraphs into chunks under the token budget. A
    /// single paragraph over the budget is emitted whole; the embedding
    /// stage decides whether it is indexable.
    fn pack_paragraphs(&self, paragraphs: &[String]) -> Vec<String> {
        let mut out = Vec::new();
        let mut current = String::new();

        for para in paragraphs {
            if current.is_empty() {
                current = para.clone();
                continue;
            }
            let candidate_tokens = approx_tokens(&current) + approx_tokens(para) + 1;
            if candidate_tokens > self.config.token_budget {
                out.push(std::mem::take(&mut current));
                current = para.clone();
            } else {
                current.push_str("\n\n");
                current.push_str(para);
            }
        }

        if !current.is_empty() {
            out.push(current);
        }
        out
    }
}

/// Estimate the token count of a text at ~4 characters per token.
pub fn approx_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(defaults::CHARS_PER_TOKEN)
}

/// Extract the note title: text of the first ATX heading, or the filename
/// stem when the note has no headings.
pub fn extract_title(markdown: &str, rel_path: &str) -> String {
    let mut in_fence = false;
    for line in markdown.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if !in_fence {
            if let Some((_, text)) = parse_atx_heading(line) {
                return text;
            }
        }
    }

    let filename = rel_path.rsplit('/').next().unwrap_or(rel_path);
    filename
        .strip_suffix(".md")
        .unwrap_or(filename)
        .to_string()
}

/// Parse an ATX heading line into (level, text). Requires 1-6 hashes
/// followed by whitespace; trailing closing hashes are stripped.
fn parse_atx_heading(line: &str) -> Option<(usize, String)> {
    let trimmed = line.trim_start();
    let level = trimmed.chars().take_while(|c| *c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = &trimmed[level..];
    if !rest.starts_with(' ') && !rest.starts_with('\t') && !rest.is_empty() {
        return None;
    }
    let text = rest.trim().trim_end_matches('#').trim_end();
    Some((level, text.to_string()))
}

/// Serialize the heading stack as `# H1 > ## H2 > …`. An empty stack means
/// preamble content, labeled with the synthetic root heading.
fn serialize_path(stack: &[(usize, String)], synthetic_root: &str) -> String {
    if stack.is_empty() {
        return synthetic_root.to_string();
    }
    stack
        .iter()
        .map(|(level, text)| format!("{} {}", "#".repeat(*level), text))
        .collect::<Vec<_>>()
        .join(" > ")
}

/// Strip whitespace-only lines from the top and bottom of a section.
fn trim_blank_lines<'a>(lines: &[&'a str]) -> Vec<&'a str> {
    let start = lines.iter().position(|l| !l.trim().is_empty());
    let end = lines.iter().rposition(|l| !l.trim().is_empty());
    match (start, end) {
        (Some(s), Some(e)) => lines[s..=e].to_vec(),
        _ => Vec::new(),
    }
}

/// Split section lines into paragraphs at blank lines, keeping fenced code
/// blocks atomic. Blank lines inside fences do not end a paragraph.
fn split_paragraphs(lines: &[&str]) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut in_fence = false;

    for line in lines {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            current.push(line);
            continue;
        }
        if !in_fence && line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join("\n"));
                current.clear();
            }
            continue;
        }
        current.push(line);
    }

    if !current.is_empty() {
        paragraphs.push(current.join("\n"));
    }
    paragraphs
}
