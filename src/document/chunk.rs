use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::Config;

/// Tried in order; the first one present in the text is used to split it.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub content: String,
}

impl Chunk {
    pub fn new(content: String) -> Self {
        Self {
            content,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitStrategy {
    /// Prefer paragraph, line and word boundaries, falling back to single characters.
    #[default]
    Recursive,
    /// Plain character windows sharing exactly `chunk_overlap` characters.
    Fixed,
}

/// Splits text into chunks of at most `chunk_size` characters.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    strategy: SplitStrategy,
}

impl TextSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize, strategy: SplitStrategy) -> anyhow::Result<Self> {
        anyhow::ensure!(chunk_size > 0, "chunk_size must be greater than zero");
        anyhow::ensure!(
            chunk_overlap < chunk_size,
            "chunk_overlap ({}) must be smaller than chunk_size ({})",
            chunk_overlap,
            chunk_size
        );
        Ok(Self { chunk_size, chunk_overlap, strategy })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap, config.chunk_strategy)
    }

    pub fn split(&self, text: &str) -> Vec<Chunk> {
        let pieces = match self.strategy {
            SplitStrategy::Recursive => self.split_recursive(text, &SEPARATORS),
            SplitStrategy::Fixed => self.split_fixed(text),
        };
        pieces.into_iter().map(Chunk::new).collect()
    }

    fn split_fixed(&self, text: &str) -> Vec<String> {
        // Byte offsets of every char boundary, including the end of the text.
        let bounds: Vec<usize> = text
            .char_indices()
            .map(|(pos, _)| pos)
            .chain(std::iter::once(text.len()))
            .collect();
        let len = bounds.len() - 1;
        let step = self.chunk_size - self.chunk_overlap;

        let mut chunks = Vec::new();
        let mut start = 0;
        while start < len {
            let end = (start + self.chunk_size).min(len);
            chunks.push(text[bounds[start]..bounds[end]].to_string());
            if end == len {
                break;
            }
            start += step;
        }
        chunks
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let mut separator = separators[separators.len() - 1];
        let mut remaining: &[&str] = &[];
        for (i, &sep) in separators.iter().enumerate() {
            if sep.is_empty() {
                separator = sep;
                break;
            }
            if text.contains(sep) {
                separator = sep;
                remaining = &separators[i + 1..];
                break;
            }
        }

        let mut chunks = Vec::new();
        let mut good: Vec<&str> = Vec::new();
        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.chunk_size {
                good.push(piece);
                continue;
            }
            if !good.is_empty() {
                chunks.extend(self.merge(&good));
                good.clear();
            }
            if remaining.is_empty() {
                chunks.push(piece.to_string());
            } else {
                chunks.extend(self.split_recursive(piece, remaining));
            }
        }
        if !good.is_empty() {
            chunks.extend(self.merge(&good));
        }
        chunks
    }

    /// Greedily packs pieces into chunks, carrying up to `chunk_overlap`
    /// characters of trailing pieces into the next chunk.
    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0;

        for &piece in pieces {
            let len = char_len(piece);
            if total + len > self.chunk_size && !window.is_empty() {
                push_joined(&mut chunks, &window);
                while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                    match window.pop_front() {
                        Some((_, front)) => total -= front,
                        None => break,
                    }
                }
            }
            window.push_back((piece, len));
            total += len;
        }
        push_joined(&mut chunks, &window);
        chunks
    }
}

/// Splits on `separator`, attaching it to the front of the following piece.
/// An empty separator splits into single characters. Empty pieces are dropped.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(pos, c)| &text[pos..pos + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (pos, _) in text.match_indices(separator) {
        if pos > start {
            pieces.push(&text[start..pos]);
        }
        start = pos;
    }
    // `start` sits on the last separator, which stays attached to the tail.
    let tail = &text[start..];
    if !tail.is_empty() {
        pieces.push(tail);
    }
    pieces
}

fn push_joined(chunks: &mut Vec<String>, window: &VecDeque<(&str, usize)>) {
    let joined: String = window.iter().map(|(piece, _)| *piece).collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents(chunks: Vec<Chunk>) -> Vec<String> {
        chunks.into_iter().map(|c| c.content).collect()
    }

    #[test]
    fn test_empty_input() -> anyhow::Result<()> {
        for strategy in [SplitStrategy::Recursive, SplitStrategy::Fixed] {
            let splitter = TextSplitter::new(10, 2, strategy)?;
            assert!(splitter.split("").is_empty());
        }
        assert!(TextSplitter::new(10, 2, SplitStrategy::Recursive)?.split(" \n\n  \n").is_empty());
        Ok(())
    }

    #[test]
    fn test_short_text_is_one_chunk() -> anyhow::Result<()> {
        let text = "Harry Potter lost his parents as a baby.";
        for strategy in [SplitStrategy::Recursive, SplitStrategy::Fixed] {
            let splitter = TextSplitter::new(10000, 1000, strategy)?;
            assert_eq!(contents(splitter.split(text)), vec![text.to_string()]);
        }
        Ok(())
    }

    #[test]
    fn test_recursive_word_overlap() -> anyhow::Result<()> {
        let splitter = TextSplitter::new(10, 5, SplitStrategy::Recursive)?;
        let chunks = contents(splitter.split("aaaa bbbb cccc dddd"));
        assert_eq!(chunks, vec!["aaaa bbbb", "bbbb cccc", "cccc dddd"]);
        Ok(())
    }

    #[test]
    fn test_recursive_prefers_paragraphs() -> anyhow::Result<()> {
        let splitter = TextSplitter::new(12, 0, SplitStrategy::Recursive)?;
        let chunks = contents(splitter.split("para one.\n\npara two."));
        assert_eq!(chunks, vec!["para one.", "para two."]);
        Ok(())
    }

    #[test]
    fn test_recursive_falls_back_to_characters() -> anyhow::Result<()> {
        let splitter = TextSplitter::new(4, 1, SplitStrategy::Recursive)?;
        let chunks = contents(splitter.split("abcdefghij"));
        assert_eq!(chunks, vec!["abcd", "defg", "ghij"]);
        Ok(())
    }

    #[test]
    fn test_recursive_chunks_are_bounded() -> anyhow::Result<()> {
        let text = "The quick brown fox jumps over the lazy dog.\n".repeat(40)
            + &"Pack my box with five dozen liquor jugs. ".repeat(30);
        let splitter = TextSplitter::new(120, 20, SplitStrategy::Recursive)?;
        let chunks = contents(splitter.split(&text));

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(char_len(chunk) <= 120, "chunk too long: {chunk:?}");
            assert!(!chunk.is_empty());
            assert!(text.contains(chunk.as_str()));
        }
        Ok(())
    }

    #[test]
    fn test_fixed_windows_cover_input_with_exact_overlap() -> anyhow::Result<()> {
        let text: String = ('a'..='z').cycle().take(95).collect();
        let splitter = TextSplitter::new(20, 5, SplitStrategy::Fixed)?;
        let chunks = contents(splitter.split(&text));

        assert_eq!(chunks.len(), 6);
        for pair in chunks.windows(2) {
            let prev: Vec<char> = pair[0].chars().collect();
            let tail: String = prev[prev.len() - 5..].iter().collect();
            assert!(pair[1].starts_with(&tail));
        }

        let mut rebuilt = chunks[0].clone();
        for chunk in &chunks[1..] {
            rebuilt.extend(chunk.chars().skip(5));
        }
        assert_eq!(rebuilt, text);
        Ok(())
    }

    #[test]
    fn test_multibyte_characters() -> anyhow::Result<()> {
        let text = "哈利·波特从小失去双亲，被寄养在姨妈家里。";
        let splitter = TextSplitter::new(8, 2, SplitStrategy::Fixed)?;
        let chunks = contents(splitter.split(text));
        assert!(chunks.iter().all(|c| char_len(c) <= 8));
        assert_eq!(chunks[0], "哈利·波特从小失");
        assert!(chunks[1].starts_with("小失"));

        let splitter = TextSplitter::new(8, 2, SplitStrategy::Recursive)?;
        assert!(splitter.split(text).iter().all(|c| char_len(&c.content) <= 8));
        Ok(())
    }

    #[test]
    fn test_invalid_overlap() {
        assert!(TextSplitter::new(100, 100, SplitStrategy::Recursive).is_err());
        assert!(TextSplitter::new(0, 0, SplitStrategy::Fixed).is_err());
    }
}
