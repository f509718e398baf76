//! Dense-store loading and BM25 + dense RRF fusion end to end

use std::path::Path;

use tempfile::TempDir;

use trawler::index::{merge, Index, IndexBuilder};
use trawler::search::{run_hybrid_batch, DenseStore, EMBEDDING_DIM};
use trawler::{IndexConfig, Tokenizer, TokenizerConfig};

fn build_index(lines: &[&str], tmp: &Path) -> Index {
    let config = IndexConfig::new(tmp.join("index"), tmp.join("partial"))
        .with_tokenizer(TokenizerConfig::basic());

    let mut builder = IndexBuilder::new(config.clone()).unwrap();
    for line in lines {
        builder.ingest_line(line).unwrap();
    }
    let build = builder.finish().unwrap();
    merge(build.total_runs, &config).unwrap();

    Index::open(tmp.join("index")).unwrap()
}

fn write_embeddings(path: &Path, rows: &[Vec<f32>]) {
    let mut raw = Vec::new();
    raw.extend_from_slice(&(rows.len() as u32).to_le_bytes());
    for row in rows {
        assert_eq!(row.len(), EMBEDDING_DIM);
        for value in row {
            raw.extend_from_slice(&value.to_le_bytes());
        }
    }
    std::fs::write(path, raw).unwrap();
}

fn one_hot(dim: usize) -> Vec<f32> {
    let mut row = vec![0.0f32; EMBEDDING_DIM];
    row[dim] = 1.0;
    row
}

/// Passage rows A, B, D one-hot at dims 0..2; the query prefers dim 2
fn write_dense_fixture(dir: &Path) {
    write_embeddings(
        &dir.join("embeddings_test.bin"),
        &[one_hot(0), one_hot(1), one_hot(2)],
    );
    std::fs::write(dir.join("passage_ids_test.txt"), "A\nB\nD\n").unwrap();

    let mut query = vec![0.0f32; EMBEDDING_DIM];
    query[0] = 0.2;
    query[1] = 0.3;
    query[2] = 0.9;
    write_embeddings(&dir.join("query_embeddings.bin"), &[query]);
    std::fs::write(dir.join("query_ids.txt"), "q1\n").unwrap();
}

#[test]
fn dense_store_ranks_by_dot_product() {
    let tmp = TempDir::new().unwrap();
    write_dense_fixture(tmp.path());

    let dense = DenseStore::open(tmp.path(), "test").unwrap();
    assert_eq!(dense.num_passages(), 3);

    let row = dense.query_row("q1").unwrap();
    assert_eq!(dense.rank(row, 10), vec!["D", "B", "A"]);
    assert_eq!(dense.rank(row, 2), vec!["D", "B"]);
    assert!(dense.query_row("unknown").is_none());
}

#[test]
fn dense_store_rejects_mismatched_tables() {
    let tmp = TempDir::new().unwrap();
    write_dense_fixture(tmp.path());
    std::fs::write(tmp.path().join("passage_ids_test.txt"), "A\nB\n").unwrap();

    assert!(DenseStore::open(tmp.path(), "test").is_err());
}

#[test]
fn dense_store_rejects_truncated_embeddings() {
    let tmp = TempDir::new().unwrap();
    write_dense_fixture(tmp.path());

    let raw = std::fs::read(tmp.path().join("embeddings_test.bin")).unwrap();
    std::fs::write(tmp.path().join("embeddings_test.bin"), &raw[..raw.len() - 8]).unwrap();

    assert!(DenseStore::open(tmp.path(), "test").is_err());
}

#[test]
fn hybrid_batch_fuses_both_rankings() {
    let tmp = TempDir::new().unwrap();
    let index = build_index(
        &[
            "A\tthe quick brown fox",
            "B\tquick brown dogs",
            "C\tlazy fox jumps over",
            "D\tthe lazy dog",
        ],
        tmp.path(),
    );
    write_dense_fixture(tmp.path());

    let queries_path = tmp.path().join("queries.tsv");
    std::fs::write(&queries_path, "q1\tlazy dog\nq2\tdogs\n").unwrap();
    let output_path = tmp.path().join("hybrid_results.txt");

    let tokenizer = Tokenizer::new(&TokenizerConfig::basic());
    let dense = DenseStore::open(tmp.path(), "test").unwrap();
    let count = run_hybrid_batch(
        &index,
        &tokenizer,
        &dense,
        &queries_path,
        &output_path,
        "hybrid_test",
    )
    .unwrap();
    assert_eq!(count, 2);

    let output = std::fs::read_to_string(&output_path).unwrap();

    // q1 lexical ranking is [D, C]; dense is [D, B, A]. D tops both lists.
    let q1_lines: Vec<&str> = output.lines().filter(|l| l.starts_with("q1 ")).collect();
    assert_eq!(q1_lines.len(), 4);
    let first: Vec<&str> = q1_lines[0].split(' ').collect();
    assert_eq!(first[2], "D");
    assert_eq!(first[3], "1");
    assert_eq!(first[5], "hybrid_test");

    // q2 has no embedding row: fusion degenerates to the BM25 list
    let q2_lines: Vec<&str> = output.lines().filter(|l| l.starts_with("q2 ")).collect();
    assert_eq!(q2_lines.len(), 1);
    let q2_first: Vec<&str> = q2_lines[0].split(' ').collect();
    assert_eq!(q2_first[2], "B");
}
