/*!
 * Script chunking for speech synthesis.
 *
 * Text is split into paragraphs (blank lines, then single newlines, then
 * sentence ends, whichever first yields more than one unit), and the units
 * are packed greedily into chunks of at most `max_chars` characters.
 * Oversized units fall back to word boundaries, and oversized words to raw
 * character runs, so every chunk respects the budget.
 */

use once_cell::sync::Lazy;
use regex::Regex;

use crate::language_utils::{Language, detect_language};

/// Default character budget per chunk
pub const DEFAULT_MAX_CHARS: usize = 4500;

/// Separator cost counted between packed paragraphs
const PARAGRAPH_JOINER: &str = "\n\n";

static SENTENCE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]+\s+").unwrap());

/// A bounded piece of the script, tagged with its detected language
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// Position in the script, starting at 0
    pub ordinal: usize,
    /// Chunk text, trimmed and never empty
    pub text: String,
    /// Language detected from this chunk alone
    pub language: Language,
}

/// Splits scripts into synthesis-sized chunks
#[derive(Debug, Clone, Copy)]
pub struct TextChunker {
    max_chars: usize,
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CHARS)
    }
}

impl TextChunker {
    /// Create a chunker with the given character budget (at least 1)
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars: max_chars.max(1) }
    }

    /// Character budget per chunk
    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Split a script into ordered, language-tagged chunks
    pub fn split(&self, text: &str) -> Vec<TextChunk> {
        self.split_text(text)
            .into_iter()
            .enumerate()
            .map(|(ordinal, text)| {
                let language = detect_language(&text);
                TextChunk { ordinal, text, language }
            })
            .collect()
    }

    /// Split a script into ordered chunk strings
    pub fn split_text(&self, text: &str) -> Vec<String> {
        let mut packer = Packer::new(self.max_chars);
        for unit in split_units(text) {
            packer.push_paragraph(unit);
        }
        packer.finish()
    }
}

/// Break text into paragraph-like units, trying coarser separators first
fn split_units(text: &str) -> Vec<&str> {
    let mut units: Vec<&str> = text.split("\n\n").collect();
    if units.len() == 1 {
        units = text.split('\n').collect();
    }
    if units.len() == 1 {
        units = split_sentences(text);
    }

    units.into_iter().map(str::trim).filter(|unit| !unit.is_empty()).collect()
}

/// Split on sentence-ending punctuation, keeping the punctuation
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for found in SENTENCE_END.find_iter(text) {
        let end = found.start() + found.as_str().trim_end().len();
        sentences.push(&text[start..end]);
        start = found.end();
    }
    sentences.push(&text[start..]);
    sentences
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Greedy chunk accumulator
struct Packer {
    max_chars: usize,
    chunks: Vec<String>,
    current: String,
    current_len: usize,
}

impl Packer {
    fn new(max_chars: usize) -> Self {
        Self { max_chars, chunks: Vec::new(), current: String::new(), current_len: 0 }
    }

    fn flush(&mut self) {
        let chunk = self.current.trim();
        if !chunk.is_empty() {
            self.chunks.push(chunk.to_string());
        }
        self.current.clear();
        self.current_len = 0;
    }

    fn append(&mut self, joiner: &str, piece: &str) {
        if !self.current.is_empty() {
            self.current.push_str(joiner);
            self.current_len += char_len(joiner);
        }
        self.current.push_str(piece);
        self.current_len += char_len(piece);
    }

    fn fits(&self, joiner: &str, piece: &str) -> bool {
        let joiner_len = if self.current.is_empty() { 0 } else { char_len(joiner) };
        self.current_len + joiner_len + char_len(piece) <= self.max_chars
    }

    fn push_paragraph(&mut self, paragraph: &str) {
        if self.fits(PARAGRAPH_JOINER, paragraph) {
            self.append(PARAGRAPH_JOINER, paragraph);
            return;
        }

        self.flush();
        if char_len(paragraph) <= self.max_chars {
            self.append(PARAGRAPH_JOINER, paragraph);
            return;
        }

        for word in paragraph.split_whitespace() {
            self.push_word(word);
        }
    }

    fn push_word(&mut self, word: &str) {
        if self.fits(" ", word) {
            self.append(" ", word);
            return;
        }

        self.flush();
        if char_len(word) <= self.max_chars {
            self.append(" ", word);
            return;
        }

        // A single word longer than the budget is cut into raw runs
        let chars: Vec<char> = word.chars().collect();
        for run in chars.chunks(self.max_chars) {
            self.flush();
            self.current = run.iter().collect();
            self.current_len = run.len();
        }
    }

    fn finish(mut self) -> Vec<String> {
        self.flush();
        self.chunks
    }
}
