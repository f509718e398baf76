//! Batch query execution with TREC-style output
//!
//! A fixed worker pool pulls query lines off a shared atomic counter; each
//! worker buffers its output lines locally and flushes them under a single
//! mutex. The index itself is read-only, so workers share it by reference.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use tracing::info;

use crate::error::{Result, TrawlerError};
use crate::index::Index;
use crate::tokenizer::Tokenizer;

use super::hybrid::{reciprocal_rank_fusion, DenseStore};
use super::searcher::{QueryMode, Searcher, TOP_K};

/// One parsed `query_external_id \t query_text` line
struct QueryLine {
    id: String,
    text: String,
}

fn read_query_lines(path: &Path) -> Result<Vec<QueryLine>> {
    let raw = std::fs::read_to_string(path).map_err(|e| TrawlerError::open(path, e))?;
    Ok(raw
        .lines()
        .filter_map(|line| {
            line.split_once('\t').map(|(id, text)| QueryLine {
                id: id.to_string(),
                text: text.to_string(),
            })
        })
        .collect())
}

fn trec_line(query_id: &str, doc_id: &str, rank: usize, score: f64, run_tag: &str) -> String {
    format!("{} Q0 {} {} {} {}", query_id, doc_id, rank, score, run_tag)
}

/// Run every query disjunctively and write TREC result lines to `output`
///
/// Returns the number of queries processed.
pub fn run_batch(
    index: &Index,
    tokenizer: &Tokenizer,
    queries_path: &Path,
    output_path: &Path,
) -> Result<usize> {
    let queries = read_query_lines(queries_path)?;
    let output = File::create(output_path).map_err(|e| TrawlerError::open(output_path, e))?;
    let sink = Mutex::new(BufWriter::new(output));
    let next = AtomicUsize::new(0);
    let workers = num_cpus::get().max(1);

    std::thread::scope(|scope| -> Result<()> {
        let mut handles = Vec::with_capacity(workers);
        for _ in 0..workers {
            handles.push(scope.spawn(|| -> Result<()> {
                let searcher = Searcher::new(index);
                let mut local = Vec::new();

                loop {
                    let i = next.fetch_add(1, Ordering::Relaxed);
                    let Some(query) = queries.get(i) else {
                        break;
                    };

                    let terms = tokenizer.tokenize(&query.text);
                    let mut results = searcher.search(&terms, QueryMode::Or)?;
                    results.truncate(TOP_K);

                    for (rank, result) in results.iter().enumerate() {
                        let external = index.external_id(result.doc_id).unwrap_or("");
                        local.push(trec_line(
                            &query.id,
                            external,
                            rank + 1,
                            result.score,
                            "bm25",
                        ));
                    }
                }

                let mut out = sink.lock();
                for line in &local {
                    writeln!(out, "{}", line)?;
                }
                Ok(())
            }));
        }
        for handle in handles {
            handle
                .join()
                .map_err(|_| TrawlerError::corrupt("batch worker panicked"))??;
        }
        Ok(())
    })?;

    let mut out = sink.into_inner();
    out.flush()?;
    info!(
        queries = queries.len(),
        workers,
        output = %output_path.display(),
        "batch run finished"
    );
    Ok(queries.len())
}

/// Run every query through BM25 + dense ranking fused with RRF
///
/// Queries without an embedding row fuse against an empty dense list.
pub fn run_hybrid_batch(
    index: &Index,
    tokenizer: &Tokenizer,
    dense: &DenseStore,
    queries_path: &Path,
    output_path: &Path,
    run_tag: &str,
) -> Result<usize> {
    let queries = read_query_lines(queries_path)?;
    let output = File::create(output_path).map_err(|e| TrawlerError::open(output_path, e))?;
    let mut out = BufWriter::new(output);
    let searcher = Searcher::new(index);

    for query in &queries {
        let terms = tokenizer.tokenize(&query.text);
        let mut lexical = searcher.search(&terms, QueryMode::Or)?;
        lexical.truncate(TOP_K);
        let lexical_ids: Vec<String> = lexical
            .iter()
            .filter_map(|r| index.external_id(r.doc_id).map(|s| s.to_string()))
            .collect();

        let dense_ids = match dense.query_row(&query.id) {
            Some(row) => dense.rank(row, TOP_K),
            None => Vec::new(),
        };

        let fused = reciprocal_rank_fusion(&lexical_ids, &dense_ids, TOP_K);
        for (rank, (doc_id, score)) in fused.iter().enumerate() {
            writeln!(
                out,
                "{}",
                trec_line(&query.id, doc_id, rank + 1, *score, run_tag)
            )?;
        }
    }

    out.flush()?;
    info!(
        queries = queries.len(),
        output = %output_path.display(),
        "hybrid batch run finished"
    );
    Ok(queries.len())
}
