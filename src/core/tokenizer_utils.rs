/*
 * This module provides utilities for token counting.
 * It defines an abstraction `TokenCounterOperations` for counting tokens in a
 * string, and concrete implementations: `CoreTikTokenCounter` that uses the
 * `tiktoken-rs` library and `SimpleWhitespaceTokenCounter` for a basic word
 * count. This decouples the token counting logic from its consumers and
 * facilitates easier testing and strategy selection.
 */
use std::sync::OnceLock;
use tiktoken_rs::{CoreBPE, cl100k_base};

#[derive(Debug)]
pub enum TokenizerError {
    EncodingInit(String),
}

impl std::fmt::Display for TokenizerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenizerError::EncodingInit(e) => {
                write!(f, "Failed to initialize token encoding: {e}")
            }
        }
    }
}

impl std::error::Error for TokenizerError {}

pub type Result<T> = std::result::Result<T, TokenizerError>;

/*
 * Defines the contract for a service that can count tokens in a given text
 * string. The count must be deterministic: the same text always yields the
 * same count for the same encoding scheme version. Errors are per-call and
 * treated by the pipeline as "skip this file".
 */
pub trait TokenCounterOperations: Send + Sync {
    fn count_tokens(&self, text: &str) -> Result<usize>;
}

/*
 * A concrete implementation of `TokenCounterOperations` that uses the
 * `tiktoken-rs` library with the "cl100k_base" encoding. The BPE tables are
 * expensive to build, so they are initialized lazily on first use and cached
 * for the lifetime of the counter (one counter per run). An initialization
 * failure is remembered and re-surfaced on every subsequent call.
 */
pub struct CoreTikTokenCounter {
    bpe: OnceLock<std::result::Result<CoreBPE, String>>,
}

impl CoreTikTokenCounter {
    pub fn new() -> Self {
        CoreTikTokenCounter {
            bpe: OnceLock::new(),
        }
    }

    fn encoding(&self) -> Result<&CoreBPE> {
        match self.bpe.get_or_init(|| {
            log::debug!("CoreTikTokenCounter: Initializing cl100k_base encoding.");
            cl100k_base().map_err(|e| e.to_string())
        }) {
            Ok(bpe) => Ok(bpe),
            Err(e) => {
                log::error!("CoreTikTokenCounter: cl100k_base unavailable: {e}");
                Err(TokenizerError::EncodingInit(e.clone()))
            }
        }
    }
}

impl Default for CoreTikTokenCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenCounterOperations for CoreTikTokenCounter {
    /*
     * Counts tokens in the given text according to `cl100k_base`. An empty
     * string counts as zero tokens.
     */
    fn count_tokens(&self, text: &str) -> Result<usize> {
        Ok(self.encoding()?.encode_with_special_tokens(text).len())
    }
}

/*
 * A concrete implementation of `TokenCounterOperations` that estimates tokens
 * by counting words separated by whitespace. A very basic estimation, but
 * infallible and cheap; useful in tests and as a coarse fallback strategy.
 */
pub struct SimpleWhitespaceTokenCounter;

impl SimpleWhitespaceTokenCounter {
    pub fn new() -> Self {
        SimpleWhitespaceTokenCounter
    }
}

impl TokenCounterOperations for SimpleWhitespaceTokenCounter {
    fn count_tokens(&self, text: &str) -> Result<usize> {
        Ok(text.split_whitespace().count())
    }
}
