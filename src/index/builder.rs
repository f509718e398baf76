//! Streaming corpus ingest: tokenize, count, buffer, spill sorted runs
//!
//! The builder holds at most `max_buffer_postings` postings in memory. When
//! the cap is hit the buffer is sorted by `(term, doc_id)` and written out
//! as one run file; the merger later k-way merges the runs into the final
//! compressed index.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use tracing::info;

use crate::config::IndexConfig;
use crate::error::{Result, TrawlerError};
use crate::tokenizer::Tokenizer;

use super::store::DocStoreWriter;
use super::types::DocId;
use super::{run_path, DOC_LENGTHS_FILE, INDEXER_META_FILE, PAGE_TABLE_FILE};

const PROGRESS_EVERY_DOCS: u32 = 100_000;

/// One buffered posting awaiting spill
struct BufferedPosting {
    term: String,
    doc_id: DocId,
    term_frequency: u32,
}

/// Totals reported after a completed build pass
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BuildSummary {
    pub total_documents: u32,
    pub total_runs: u32,
    pub skipped_lines: u64,
}

/// Streaming index builder
pub struct IndexBuilder {
    config: IndexConfig,
    tokenizer: Tokenizer,
    /// Ingest only documents whose external id is listed; `None` disables
    subset: Option<HashSet<String>>,
    buffer: Vec<BufferedPosting>,
    next_doc_id: DocId,
    run_count: u32,
    skipped_lines: u64,
    store: DocStoreWriter,
    page_table: BufWriter<File>,
    doc_lengths: BufWriter<File>,
}

impl IndexBuilder {
    pub fn new(config: IndexConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.index_dir)?;
        std::fs::create_dir_all(&config.runs_dir)?;

        let tokenizer = Tokenizer::new(&config.tokenizer);
        let store = DocStoreWriter::create(&config.index_dir)?;
        let page_table = create_text_file(&config.index_dir.join(PAGE_TABLE_FILE))?;
        let doc_lengths = create_text_file(&config.index_dir.join(DOC_LENGTHS_FILE))?;

        Ok(Self {
            config,
            tokenizer,
            subset: None,
            buffer: Vec::new(),
            next_doc_id: 0,
            run_count: 0,
            skipped_lines: 0,
            store,
            page_table,
            doc_lengths,
        })
    }

    /// Restrict ingest to the external ids listed one per line in `path`
    pub fn load_subset(&mut self, path: &Path) -> Result<usize> {
        let file = File::open(path).map_err(|e| TrawlerError::open(path, e))?;
        let mut ids = HashSet::new();
        for line in BufReader::new(file).lines() {
            let id = line?.trim().to_string();
            if !id.is_empty() {
                ids.insert(id);
            }
        }
        let count = ids.len();
        info!(ids = count, "loaded subset filter");
        self.subset = Some(ids);
        Ok(count)
    }

    /// Ingest an entire corpus file of `external_id \t text` lines
    pub fn ingest_corpus(&mut self, corpus_path: &Path) -> Result<()> {
        let file = File::open(corpus_path).map_err(|e| TrawlerError::open(corpus_path, e))?;
        let mut reader = BufReader::new(file);
        let mut raw = Vec::new();

        loop {
            raw.clear();
            if reader.read_until(b'\n', &mut raw)? == 0 {
                break;
            }
            if raw.last() == Some(&b'\n') {
                raw.pop();
                if raw.last() == Some(&b'\r') {
                    raw.pop();
                }
            }
            let line = String::from_utf8_lossy(&raw);
            self.ingest_line(&line)?;
        }
        Ok(())
    }

    /// Ingest one corpus line; malformed lines are counted and skipped
    pub fn ingest_line(&mut self, line: &str) -> Result<()> {
        let Some((external_id, text)) = line.split_once('\t') else {
            self.skipped_lines += 1;
            return Ok(());
        };
        if let Some(subset) = &self.subset {
            if !subset.contains(external_id) {
                return Ok(());
            }
        }
        self.index_document(external_id, text)
    }

    /// Tokenize one document and record all of its per-document tables
    ///
    /// Documents that analyze to no tokens are dropped entirely, so every
    /// table (doc store included) stays indexable by doc id.
    fn index_document(&mut self, external_id: &str, text: &str) -> Result<()> {
        let tokens = self.tokenizer.tokenize(text);
        if tokens.is_empty() {
            return Ok(());
        }

        let doc_id = self.next_doc_id;
        self.next_doc_id += 1;

        self.store.append(text)?;
        writeln!(self.page_table, "{}\t{}", doc_id, external_id)?;
        writeln!(self.doc_lengths, "{}\t{}", doc_id, tokens.len())?;

        let mut frequencies: HashMap<&str, u32> = HashMap::new();
        for token in &tokens {
            *frequencies.entry(token.as_str()).or_insert(0) += 1;
        }
        for (term, term_frequency) in frequencies {
            self.buffer.push(BufferedPosting {
                term: term.to_string(),
                doc_id,
                term_frequency,
            });
        }

        if self.next_doc_id % PROGRESS_EVERY_DOCS == 0 {
            info!(documents = self.next_doc_id, "indexing progress");
        }
        if self.buffer.len() >= self.config.max_buffer_postings {
            self.spill()?;
        }
        Ok(())
    }

    /// Sort the posting buffer by `(term, doc_id)` and write one run file
    fn spill(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        self.buffer
            .sort_unstable_by(|a, b| a.term.cmp(&b.term).then(a.doc_id.cmp(&b.doc_id)));

        let path = run_path(&self.config.runs_dir, self.run_count);
        let file = File::create(&path).map_err(|e| TrawlerError::open(path, e))?;
        let mut out = BufWriter::new(file);
        for posting in &self.buffer {
            let term = posting.term.as_bytes();
            out.write_all(&(term.len() as u32).to_le_bytes())?;
            out.write_all(term)?;
            out.write_all(&posting.doc_id.to_le_bytes())?;
            out.write_all(&posting.term_frequency.to_le_bytes())?;
        }
        out.flush()?;

        info!(
            run = self.run_count,
            postings = self.buffer.len(),
            "spilled run"
        );
        self.run_count += 1;
        self.buffer.clear();
        Ok(())
    }

    /// Spill the final partial run and write the build metadata
    pub fn finish(mut self) -> Result<BuildSummary> {
        self.spill()?;
        self.store.finish()?;
        self.page_table.flush()?;
        self.doc_lengths.flush()?;

        let meta_path = self.config.index_dir.join(INDEXER_META_FILE);
        let mut meta = create_text_file(&meta_path)?;
        writeln!(meta, "total_documents\t{}", self.next_doc_id)?;
        writeln!(meta, "total_runs\t{}", self.run_count)?;
        meta.flush()?;

        let summary = BuildSummary {
            total_documents: self.next_doc_id,
            total_runs: self.run_count,
            skipped_lines: self.skipped_lines,
        };
        info!(
            documents = summary.total_documents,
            runs = summary.total_runs,
            skipped = summary.skipped_lines,
            "build finished"
        );
        Ok(summary)
    }
}

fn create_text_file(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).map_err(|e| TrawlerError::open(path, e))?;
    Ok(BufWriter::new(file))
}
