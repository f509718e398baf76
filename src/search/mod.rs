//! BM25 ranking, snippet extraction, hybrid fusion, and batch execution

mod batch;
mod hybrid;
mod scoring;
mod searcher;
pub mod snippet;

pub use batch::{run_batch, run_hybrid_batch};
pub use hybrid::{reciprocal_rank_fusion, DenseStore, EMBEDDING_DIM, RRF_K};
pub use scoring::{bm25_weight, BM25_B, BM25_K1};
pub use searcher::{QueryMode, ScoredDoc, Searcher, TOP_K};
