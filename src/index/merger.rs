//! K-way merge of sorted runs into the final compressed inverted file
//!
//! A min-heap over run cursors yields `(term, doc_id, freq)` records in
//! global order. Postings of the current term accumulate into an in-flight
//! block; full blocks are compressed and appended to the inverted file, and
//! each term transition emits one lexicon line. Every `(term, doc_id)` pair
//! occurs in exactly one run, so `(term, doc_id)` ordering needs no further
//! tie-break.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use tracing::info;

use crate::config::IndexConfig;
use crate::error::{Result, TrawlerError};

use super::postings::encode_block;
use super::types::{DocId, SkipTable, BLOCK_SIZE};
use super::{run_path, COLLECTION_STATS_FILE, INVERTED_FILE, LEXICON_FILE, METADATA_FILE};

const PROGRESS_EVERY_TERMS: u64 = 50_000;

/// Totals reported after a completed merge
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MergeSummary {
    pub total_terms: u64,
    pub total_blocks: u64,
    pub total_postings: u64,
}

/// One record popped from the heap; ordering is `(term, doc_id)` ascending
#[derive(PartialEq, Eq, PartialOrd, Ord)]
struct HeapEntry {
    term: String,
    doc_id: DocId,
    term_frequency: u32,
    run: usize,
}

/// Sequential reader over one spilled run file
struct RunCursor {
    reader: BufReader<File>,
}

impl RunCursor {
    fn open(runs_dir: &Path, run: u32) -> Result<Self> {
        let path = run_path(runs_dir, run);
        let file = File::open(&path).map_err(|e| TrawlerError::open(path, e))?;
        Ok(Self {
            reader: BufReader::new(file),
        })
    }

    /// Read the next `(term, doc_id, freq)` record, or `None` at EOF
    fn read_next(&mut self) -> Result<Option<(String, DocId, u32)>> {
        let mut len_bytes = [0u8; 4];
        match self.reader.read_exact(&mut len_bytes) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }
        let term_len = u32::from_le_bytes(len_bytes) as usize;

        let mut term_bytes = vec![0u8; term_len];
        self.reader.read_exact(&mut term_bytes)?;
        let term = String::from_utf8(term_bytes)
            .map_err(|_| TrawlerError::corrupt("run record term is not valid UTF-8"))?;

        let mut doc_bytes = [0u8; 4];
        self.reader.read_exact(&mut doc_bytes)?;
        let mut freq_bytes = [0u8; 4];
        self.reader.read_exact(&mut freq_bytes)?;

        Ok(Some((
            term,
            u32::from_le_bytes(doc_bytes),
            u32::from_le_bytes(freq_bytes),
        )))
    }
}

/// Per-term accumulation state
#[derive(Default)]
struct TermState {
    docs: Vec<DocId>,
    freqs: Vec<u32>,
    start_offset: u64,
    start_block: u32,
    postings: u64,
    doc_frequency: u32,
}

/// Merge `num_runs` spill files into the final index files
pub fn merge(num_runs: u32, config: &IndexConfig) -> Result<MergeSummary> {
    let mut heap: BinaryHeap<Reverse<HeapEntry>> = BinaryHeap::new();
    let mut runs = Vec::with_capacity(num_runs as usize);
    for run in 0..num_runs {
        let mut cursor = RunCursor::open(&config.runs_dir, run)?;
        if let Some((term, doc_id, term_frequency)) = cursor.read_next()? {
            heap.push(Reverse(HeapEntry {
                term,
                doc_id,
                term_frequency,
                run: run as usize,
            }));
        }
        runs.push(cursor);
    }

    let inverted_path = config.index_dir.join(INVERTED_FILE);
    let inverted =
        File::create(&inverted_path).map_err(|e| TrawlerError::open(inverted_path, e))?;
    let mut inverted = BufWriter::new(inverted);
    let lexicon_path = config.index_dir.join(LEXICON_FILE);
    let lexicon = File::create(&lexicon_path).map_err(|e| TrawlerError::open(lexicon_path, e))?;
    let mut lexicon = BufWriter::new(lexicon);

    let mut skip = SkipTable::new();
    let mut offset = 0u64;
    let mut current_term: Option<String> = None;
    let mut state = TermState::default();
    let mut total_terms = 0u64;
    let mut total_postings = 0u64;

    while let Some(Reverse(entry)) = heap.pop() {
        if current_term.as_deref() != Some(entry.term.as_str()) {
            if let Some(term) = current_term.take() {
                finalize_term(&mut inverted, &mut lexicon, &mut skip, &mut offset, &term, &mut state)?;
                total_terms += 1;
                if total_terms % PROGRESS_EVERY_TERMS == 0 {
                    info!(terms = total_terms, "merge progress");
                }
            }
            current_term = Some(entry.term.clone());
            state.start_offset = offset;
            state.start_block = skip.len() as u32;
        }

        state.docs.push(entry.doc_id);
        state.freqs.push(entry.term_frequency);
        state.postings += 1;
        state.doc_frequency += 1;
        total_postings += 1;

        if state.docs.len() == BLOCK_SIZE {
            offset += write_block(&mut inverted, &state.docs, &state.freqs, &mut skip)?;
            state.docs.clear();
            state.freqs.clear();
        }

        let run = entry.run;
        if let Some((term, doc_id, term_frequency)) = runs[run].read_next()? {
            heap.push(Reverse(HeapEntry {
                term,
                doc_id,
                term_frequency,
                run,
            }));
        }
    }

    if let Some(term) = current_term.take() {
        finalize_term(&mut inverted, &mut lexicon, &mut skip, &mut offset, &term, &mut state)?;
        total_terms += 1;
    }

    inverted.flush()?;
    lexicon.flush()?;

    write_skip_table(&config.index_dir, &skip)?;

    let stats_path = config.index_dir.join(COLLECTION_STATS_FILE);
    let stats = File::create(&stats_path).map_err(|e| TrawlerError::open(stats_path, e))?;
    let mut stats = BufWriter::new(stats);
    writeln!(stats, "total_terms\t{}", total_terms)?;
    writeln!(stats, "total_blocks\t{}", skip.len())?;
    stats.flush()?;

    let summary = MergeSummary {
        total_terms,
        total_blocks: skip.len() as u64,
        total_postings,
    };
    info!(
        terms = summary.total_terms,
        blocks = summary.total_blocks,
        postings = summary.total_postings,
        "merge finished"
    );
    Ok(summary)
}

/// Flush the in-flight partial block and emit the term's lexicon line
fn finalize_term(
    inverted: &mut BufWriter<File>,
    lexicon: &mut BufWriter<File>,
    skip: &mut SkipTable,
    offset: &mut u64,
    term: &str,
    state: &mut TermState,
) -> Result<()> {
    if !state.docs.is_empty() {
        *offset += write_block(inverted, &state.docs, &state.freqs, skip)?;
    }
    writeln!(
        lexicon,
        "{}\t{}\t{}\t{}\t{}",
        term, state.start_offset, state.start_block, state.postings, state.doc_frequency
    )?;
    *state = TermState::default();
    Ok(())
}

/// Compress one block, append it to the inverted file, and record its skip
/// entry; returns the number of bytes written
fn write_block(
    out: &mut BufWriter<File>,
    docs: &[DocId],
    freqs: &[u32],
    skip: &mut SkipTable,
) -> Result<u64> {
    let (doc_data, freq_data) = encode_block(docs, freqs);

    out.write_all(&(doc_data.len() as u32).to_le_bytes())?;
    out.write_all(&doc_data)?;
    out.write_all(&(freq_data.len() as u32).to_le_bytes())?;
    out.write_all(&freq_data)?;

    skip.push(
        docs[docs.len() - 1],
        doc_data.len() as u32,
        freq_data.len() as u32,
    );
    Ok(8 + doc_data.len() as u64 + freq_data.len() as u64)
}

/// Persist the skip table: block count then the three parallel arrays
fn write_skip_table(index_dir: &Path, skip: &SkipTable) -> Result<()> {
    let path = index_dir.join(METADATA_FILE);
    let file = File::create(&path).map_err(|e| TrawlerError::open(path, e))?;
    let mut out = BufWriter::new(file);

    out.write_all(&(skip.len() as u32).to_le_bytes())?;
    for &last in &skip.last_doc_id {
        out.write_all(&last.to_le_bytes())?;
    }
    for &bytes in &skip.doc_bytes {
        out.write_all(&bytes.to_le_bytes())?;
    }
    for &bytes in &skip.freq_bytes {
        out.write_all(&bytes.to_le_bytes())?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TokenizerConfig;
    use crate::index::IndexBuilder;
    use tempfile::TempDir;

    fn build_and_merge(lines: &[&str], max_buffer: usize) -> (TempDir, MergeSummary) {
        let tmp = TempDir::new().unwrap();
        let config = IndexConfig::new(tmp.path().join("index"), tmp.path().join("partial"))
            .with_tokenizer(TokenizerConfig::basic())
            .with_max_buffer_postings(max_buffer);

        let mut builder = IndexBuilder::new(config.clone()).unwrap();
        for line in lines {
            builder.ingest_line(line).unwrap();
        }
        let build = builder.finish().unwrap();
        let summary = merge(build.total_runs, &config).unwrap();
        (tmp, summary)
    }

    #[test]
    fn test_merge_totals() {
        let (_tmp, summary) = build_and_merge(
            &[
                "A\tthe quick brown fox",
                "B\tquick brown dogs",
                "C\tlazy fox jumps over",
                "D\tthe lazy dog",
            ],
            1_000_000,
        );

        assert_eq!(summary.total_terms, 9);
        assert_eq!(summary.total_postings, 14);
        // One partial block per term
        assert_eq!(summary.total_blocks, 9);
    }

    #[test]
    fn test_lexicon_lines_are_sorted_and_complete() {
        let (tmp, _) = build_and_merge(
            &["A\tthe quick brown fox", "B\tquick brown dogs"],
            1_000_000,
        );

        let lexicon =
            std::fs::read_to_string(tmp.path().join("index").join(LEXICON_FILE)).unwrap();
        let terms: Vec<&str> = lexicon
            .lines()
            .map(|l| l.split('\t').next().unwrap())
            .collect();

        assert_eq!(terms, vec!["brown", "dogs", "fox", "quick", "the"]);
        let mut sorted = terms.clone();
        sorted.sort_unstable();
        assert_eq!(terms, sorted);

        for line in lexicon.lines() {
            let fields: Vec<&str> = line.split('\t').collect();
            assert_eq!(fields.len(), 5);
            // total_postings == df by construction
            assert_eq!(fields[3], fields[4]);
        }
    }

    #[test]
    fn test_merge_across_multiple_runs() {
        // A tiny buffer forces every document into its own run, so the heap
        // really interleaves
        let (tmp, summary) = build_and_merge(
            &[
                "A\tthe quick brown fox",
                "B\tquick brown dogs",
                "C\tlazy fox jumps over",
                "D\tthe lazy dog",
            ],
            1,
        );

        assert_eq!(summary.total_terms, 9);
        assert_eq!(summary.total_postings, 14);

        let lexicon =
            std::fs::read_to_string(tmp.path().join("index").join(LEXICON_FILE)).unwrap();
        let quick: Vec<&str> = lexicon
            .lines()
            .find(|l| l.starts_with("quick\t"))
            .unwrap()
            .split('\t')
            .collect();
        assert_eq!(quick[4], "2");
    }

    #[test]
    fn test_skip_table_matches_block_count() {
        let (tmp, summary) = build_and_merge(&["A\tred green", "B\tgreen"], 1_000_000);

        let raw = std::fs::read(tmp.path().join("index").join(METADATA_FILE)).unwrap();
        let mut count_bytes = [0u8; 4];
        count_bytes.copy_from_slice(&raw[..4]);
        let num_blocks = u32::from_le_bytes(count_bytes) as usize;

        assert_eq!(num_blocks as u64, summary.total_blocks);
        assert_eq!(raw.len(), 4 + num_blocks * 12);
    }

    #[test]
    fn test_merge_zero_runs() {
        let tmp = TempDir::new().unwrap();
        let config = IndexConfig::new(tmp.path().join("index"), tmp.path().join("partial"));
        std::fs::create_dir_all(&config.index_dir).unwrap();
        std::fs::create_dir_all(&config.runs_dir).unwrap();

        let summary = merge(0, &config).unwrap();
        assert_eq!(summary.total_terms, 0);
        assert_eq!(summary.total_blocks, 0);
        assert!(tmp.path().join("index").join(LEXICON_FILE).exists());
    }

    #[test]
    fn test_missing_run_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let config = IndexConfig::new(tmp.path().join("index"), tmp.path().join("partial"));
        std::fs::create_dir_all(&config.index_dir).unwrap();
        std::fs::create_dir_all(&config.runs_dir).unwrap();

        assert!(merge(1, &config).is_err());
    }
}
