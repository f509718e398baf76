//! External-memory inverted-index construction and query-time access
//!
//! Two pipelines share one on-disk format:
//!
//! - build: `IndexBuilder` spills sorted runs, `merge` k-way merges them
//!   into the compressed inverted file with lexicon and skip metadata
//! - query: `Index` loads the derived tables once and hands out
//!   `PostingCursor`s over the immutable files

mod builder;
mod cursor;
mod merger;
mod postings;
mod reader;
mod store;
mod types;

pub use builder::{BuildSummary, IndexBuilder};
pub use cursor::PostingCursor;
pub use merger::{merge, MergeSummary};
pub use postings::{decode_block, decode_vbyte, encode_block, encode_vbyte};
pub use reader::Index;
pub use store::{DocStore, DocStoreWriter};
pub use types::{DocId, LexiconEntry, SkipTable, BLOCK_SIZE};

use std::path::{Path, PathBuf};

/// Concatenated compressed posting blocks in merge order
pub const INVERTED_FILE: &str = "inverted_index.bin";
/// One `term \t start_offset \t start_block \t total_postings \t df` line per term
pub const LEXICON_FILE: &str = "lexicon.txt";
/// Block count plus the three parallel skip arrays
pub const METADATA_FILE: &str = "metadata.bin";
/// `doc_id \t token_count` per document
pub const DOC_LENGTHS_FILE: &str = "doc_lengths.txt";
/// `doc_id \t external_id` per document
pub const PAGE_TABLE_FILE: &str = "page_table.txt";
/// Raw concatenated passage bytes
pub const DOC_STORE_FILE: &str = "documents.dat";
/// Packed `(u64 offset, u32 length)` per document
pub const DOC_STORE_INDEX_FILE: &str = "documents.idx";
/// Build totals: `total_documents`, `total_runs`
pub const INDEXER_META_FILE: &str = "indexer_meta.txt";
/// Merge totals: `total_terms`, `total_blocks`
pub const COLLECTION_STATS_FILE: &str = "collection_stats.txt";

/// Path of spill run `run` under `runs_dir`
pub fn run_path(runs_dir: &Path, run: u32) -> PathBuf {
    runs_dir.join(format!("run_{}.bin", run))
}
