use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkConfig {
    pub max_chunk_size: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: 800,
        }
    }
}

/// Paragraph-aware splitter: packs blank-line separated blocks into chunks of
/// at most `max_chunk_size` characters. Oversized paragraphs are split on
/// word boundaries.
pub struct ChunkEngine {
    config: ChunkConfig,
}

impl ChunkEngine {
    pub fn new(config: ChunkConfig) -> Self {
        Self { config }
    }

    pub fn chunk_text(&self, text: &str) -> Vec<String> {
        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }

        let max = self.config.max_chunk_size.max(1);
        let mut chunks = Vec::new();
        let mut current = String::new();

        for paragraph in split_paragraphs(text) {
            for piece in split_oversized(&paragraph, max) {
                let joined_len = current.chars().count() + piece.chars().count() + 2;
                if !current.is_empty() && joined_len > max {
                    chunks.push(std::mem::take(&mut current));
                }
                if !current.is_empty() {
                    current.push_str("\n\n");
                }
                current.push_str(&piece);
            }
        }

        if !current.trim().is_empty() {
            chunks.push(current);
        }
        chunks
    }
}

fn split_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line.trim_end());
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join("\n"));
    }
    paragraphs
}

fn split_oversized(paragraph: &str, max: usize) -> Vec<String> {
    if paragraph.chars().count() <= max {
        return vec![paragraph.to_string()];
    }

    let mut pieces = Vec::new();
    let mut current = String::new();
    for word in paragraph.split_whitespace() {
        let word_len = word.chars().count();
        if !current.is_empty() && current.chars().count() + 1 + word_len > max {
            pieces.push(std::mem::take(&mut current));
        }
        if word_len > max {
            // A single unbroken token longer than a chunk gets hard-split.
            let chars: Vec<char> = word.chars().collect();
            for slice in chars.chunks(max) {
                pieces.push(slice.iter().collect());
            }
            continue;
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(max: usize) -> ChunkEngine {
        ChunkEngine::new(ChunkConfig {
            max_chunk_size: max,
        })
    }

    #[test]
    fn test_empty_text_has_no_chunks() {
        assert!(engine(100).chunk_text("  \n ").is_empty());
    }

    #[test]
    fn test_small_paragraphs_are_packed_together() {
        let chunks = engine(100).chunk_text("Req 1: login.\n\nReq 2: logout.");
        assert_eq!(chunks, vec!["Req 1: login.\n\nReq 2: logout.".to_string()]);
    }

    #[test]
    fn test_paragraphs_split_when_chunk_is_full() {
        let first = "a".repeat(60);
        let second = "b".repeat(60);
        let chunks = engine(100).chunk_text(&format!("{}\n\n{}", first, second));
        assert_eq!(chunks, vec![first, second]);
    }

    #[test]
    fn test_oversized_paragraph_is_split_on_words() {
        let paragraph = vec!["word"; 50].join(" ");
        let chunks = engine(40).chunk_text(&paragraph);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|chunk| chunk.chars().count() <= 40));
    }

    #[test]
    fn test_unbroken_token_is_hard_split() {
        let chunks = engine(10).chunk_text(&"x".repeat(25));
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|chunk| chunk.chars().count() <= 10));
    }
}
