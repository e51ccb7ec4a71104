//! Token counting.
//!
//! Default mode is a word-based approximation (1.3 tokens per
//! unicode-whitespace-separated word). Exact mode uses the cl100k
//! tokenizer when it can be constructed, falling back to the
//! approximation otherwise. Counts are always taken on the exact final
//! string handed back to the caller.

use std::sync::OnceLock;
use tiktoken_rs::CoreBPE;
use tracing::warn;

/// Average tokens per word, empirically observed on API reference prose.
const TOKENS_PER_WORD: f64 = 1.3;

/// Counting mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountMode {
    Approximate,
    Exact,
}

/// Token counter with approximate and exact paths.
#[derive(Debug, Clone, Copy)]
pub struct TokenManager {
    mode: CountMode,
}

impl TokenManager {
    pub fn new(accurate: bool) -> Self {
        Self {
            mode: if accurate {
                CountMode::Exact
            } else {
                CountMode::Approximate
            },
        }
    }

    pub fn mode(&self) -> CountMode {
        self.mode
    }

    /// Count tokens in `text` using the configured mode.
    pub fn count(&self, text: &str) -> usize {
        match self.mode {
            CountMode::Approximate => Self::approximate(text),
            CountMode::Exact => Self::exact(text).unwrap_or_else(|| Self::approximate(text)),
        }
    }

    /// Word-based approximation, O(n) in the input length.
    pub fn approximate(text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        let words = text.split_whitespace().count();
        (words as f64 * TOKENS_PER_WORD) as usize
    }

    /// Exact count via the cl100k tokenizer, when available.
    fn exact(text: &str) -> Option<usize> {
        static ENCODER: OnceLock<Option<CoreBPE>> = OnceLock::new();
        let encoder = ENCODER.get_or_init(|| match tiktoken_rs::cl100k_base() {
            Ok(bpe) => Some(bpe),
            Err(e) => {
                warn!(error = %e, "tokenizer unavailable, falling back to approximation");
                None
            }
        });
        encoder
            .as_ref()
            .map(|bpe| bpe.encode_with_special_tokens(text).len())
    }
}

impl Default for TokenManager {
    fn default() -> Self {
        Self::new(false)
    }
}
