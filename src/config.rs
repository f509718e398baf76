use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Postings buffered in memory before the builder spills a sorted run
pub const DEFAULT_MAX_BUFFER_POSTINGS: usize = 10_000_000;

/// Tokenizer configuration
///
/// A given index must be built and queried with the same configuration;
/// mixing variants is not detected.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenizerConfig {
    pub remove_stopwords: bool,
    pub stem: bool,
    pub min_token_length: usize,
}

impl TokenizerConfig {
    /// Bare ASCII-alphanumeric lowercasing, no filtering
    pub fn basic() -> Self {
        Self {
            remove_stopwords: false,
            stem: false,
            min_token_length: 1,
        }
    }

    /// Lowercasing plus single-character drop, stopword removal, and stemming
    pub fn enriched() -> Self {
        Self {
            remove_stopwords: true,
            stem: true,
            min_token_length: 2,
        }
    }
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self::enriched()
    }
}

/// Build- and query-time locations plus ingest limits
#[derive(Clone, Debug)]
pub struct IndexConfig {
    /// Directory holding the final index files
    pub index_dir: PathBuf,
    /// Directory holding intermediate sorted runs
    pub runs_dir: PathBuf,
    /// Spill threshold for the in-memory posting buffer
    pub max_buffer_postings: usize,
    pub tokenizer: TokenizerConfig,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            index_dir: PathBuf::from("index"),
            runs_dir: PathBuf::from("partial"),
            max_buffer_postings: DEFAULT_MAX_BUFFER_POSTINGS,
            tokenizer: TokenizerConfig::default(),
        }
    }
}

impl IndexConfig {
    pub fn new(index_dir: impl Into<PathBuf>, runs_dir: impl Into<PathBuf>) -> Self {
        Self {
            index_dir: index_dir.into(),
            runs_dir: runs_dir.into(),
            ..Default::default()
        }
    }

    pub fn with_tokenizer(mut self, tokenizer: TokenizerConfig) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    pub fn with_max_buffer_postings(mut self, cap: usize) -> Self {
        self.max_buffer_postings = cap;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_configs() {
        let config = IndexConfig::default();
        assert_eq!(config.index_dir, PathBuf::from("index"));
        assert_eq!(config.max_buffer_postings, DEFAULT_MAX_BUFFER_POSTINGS);
        assert!(config.tokenizer.remove_stopwords);
        assert!(config.tokenizer.stem);
    }

    #[test]
    fn test_tokenizer_variants() {
        let basic = TokenizerConfig::basic();
        assert!(!basic.remove_stopwords);
        assert!(!basic.stem);
        assert_eq!(basic.min_token_length, 1);

        let enriched = TokenizerConfig::enriched();
        assert!(enriched.remove_stopwords);
        assert!(enriched.stem);
        assert_eq!(enriched.min_token_length, 2);
    }

    #[test]
    fn test_config_builder() {
        let config = IndexConfig::new("idx", "runs")
            .with_tokenizer(TokenizerConfig::basic())
            .with_max_buffer_postings(1000);

        assert_eq!(config.runs_dir, PathBuf::from("runs"));
        assert_eq!(config.max_buffer_postings, 1000);
        assert!(!config.tokenizer.stem);
    }
}
