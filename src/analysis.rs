//! Text analysis for the lexical index.
//!
//! The lexical corpus is often source code or API documentation, where the
//! interesting terms are dotted or parenthesized identifiers like
//! `os.path.join(...)`. The default tokenizer therefore splits on a fixed
//! punctuation set in addition to whitespace, after lowercasing.

/// Trait for tokenizers that convert text into lowercase terms.
pub trait Tokenizer: Send + Sync {
    /// Tokenize the given text into a sequence of terms.
    fn tokenize(&self, text: &str) -> Vec<String>;

    /// Get the name of this tokenizer.
    fn name(&self) -> &'static str;
}

/// Characters treated as term separators in addition to whitespace.
const SEPARATORS: &[char] = &['(', ')', '.', ',', ';', ':', '[', ']', '{', '}', '"', '\''];

/// Tokenizer for mixed code and prose.
///
/// Lowercases the input, then splits on whitespace and on a fixed set of
/// punctuation characters, so `Path.join(base)` yields `path`, `join`,
/// `base`.
#[derive(Debug, Clone, Default)]
pub struct CodeTokenizer;

impl CodeTokenizer {
    /// Create a new code tokenizer.
    pub fn new() -> Self {
        Self
    }
}

impl Tokenizer for CodeTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        text.to_lowercase()
            .split(|c: char| c.is_whitespace() || SEPARATORS.contains(&c))
            .filter(|t| !t.is_empty())
            .map(|t| t.to_string())
            .collect()
    }

    fn name(&self) -> &'static str {
        "code"
    }
}
