//! Document chunking for embedding

/// Chunking configuration
pub const CHUNK_SIZE_CHARS: usize = 1000;
pub const CHUNK_OVERLAP_CHARS: usize = 200;

/// Break points tried in priority order when closing a chunk:
/// paragraph, line, sentence, word. Character split is the implicit last
/// resort.
const SEPARATORS: &[&str] = &["\n\n", "\n", ". ", " "];

/// A bounded span of source text
#[derive(Debug, Clone)]
pub struct Chunk {
    pub text: String,
    pub position: usize,
}

/// Find a valid char boundary at or before the given byte index
fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Find a valid char boundary at or after the given byte index
fn ceil_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i < s.len() && !s.is_char_boundary(i) {
        i += 1;
    }
    i
}

/// Split text into overlapping chunks, preferring semantic break points
pub fn split_text(content: &str, chunk_size: usize, overlap: usize) -> Vec<Chunk> {
    if content.is_empty() {
        return Vec::new();
    }
    if content.len() <= chunk_size {
        return vec![Chunk {
            text: content.to_string(),
            position: 0,
        }];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < content.len() {
        let raw_end = (start + chunk_size).min(content.len());
        let end = floor_char_boundary(content, raw_end);
        let mut chunk_end = end;

        // Look for the highest-priority separator in the last 30% of the
        // window; fall back to a plain character split when none is found
        if end < content.len() {
            let search_start_raw = start + (chunk_size * 70 / 100);
            let search_start = ceil_char_boundary(content, search_start_raw);

            if search_start < end {
                let search_region = &content[search_start..end];
                for sep in SEPARATORS {
                    if let Some(pos) = search_region.rfind(sep) {
                        chunk_end = search_start + pos + sep.len();
                        break;
                    }
                }
            }
        }

        chunk_end = floor_char_boundary(content, chunk_end);

        let text = content[start..chunk_end].trim();
        if !text.is_empty() {
            chunks.push(Chunk {
                text: text.to_string(),
                position: start,
            });
        }

        if chunk_end >= content.len() {
            break;
        }

        let new_start_raw = chunk_end.saturating_sub(overlap);
        start = ceil_char_boundary(content, new_start_raw);
    }

    chunks
}
