use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;
use stop_words::{get, LANGUAGE};

use crate::config::TokenizerConfig;

/// Text tokenizer with optional stopword removal and stemming
///
/// Token boundaries are fixed: ASCII alphanumerics are accumulated
/// lowercased, any other byte ends the current token. Tokenization is total;
/// it cannot fail on any input.
pub struct Tokenizer {
    config: TokenizerConfig,
    stemmer: Option<Stemmer>,
    stopwords: HashSet<String>,
}

impl Tokenizer {
    /// Create a new tokenizer from configuration
    pub fn new(config: &TokenizerConfig) -> Self {
        let stemmer = if config.stem {
            Some(Stemmer::create(Algorithm::English))
        } else {
            None
        };

        let stopwords = if config.remove_stopwords {
            get(LANGUAGE::English)
                .into_iter()
                .map(|s| s.to_lowercase())
                .collect()
        } else {
            HashSet::new()
        };

        Self {
            config: config.clone(),
            stemmer,
            stopwords,
        }
    }

    /// Tokenize text into an ordered vector of terms
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let mut tokens = Vec::new();
        let mut token = String::new();

        for byte in text.bytes() {
            if byte.is_ascii_alphanumeric() {
                token.push(byte.to_ascii_lowercase() as char);
            } else if !token.is_empty() {
                self.emit(&mut tokens, std::mem::take(&mut token));
            }
        }
        if !token.is_empty() {
            self.emit(&mut tokens, token);
        }

        tokens
    }

    fn emit(&self, tokens: &mut Vec<String>, token: String) {
        if token.len() < self.config.min_token_length || self.stopwords.contains(&token) {
            return;
        }
        match &self.stemmer {
            Some(stemmer) => tokens.push(stemmer.stem(&token).into_owned()),
            None => tokens.push(token),
        }
    }
}
