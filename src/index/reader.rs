//! Immutable query-time view of a built index
//!
//! `Index::open` loads the lexicon, skip table, document lengths,
//! external-id table, and doc-store index once; the value is read-only
//! afterwards and safe to share by reference across concurrent queries.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{Result, TrawlerError};

use super::cursor::PostingCursor;
use super::store::DocStore;
use super::types::{DocId, LexiconEntry, SkipTable};
use super::{DOC_LENGTHS_FILE, INVERTED_FILE, LEXICON_FILE, METADATA_FILE, PAGE_TABLE_FILE};

/// Read-only search index
pub struct Index {
    inverted_path: PathBuf,
    lexicon: HashMap<String, LexiconEntry>,
    skip: SkipTable,
    doc_lengths: Vec<u32>,
    external_ids: Vec<String>,
    store: DocStore,
    avgdl: f64,
}

impl Index {
    /// Open an index directory, loading all derived in-memory tables
    pub fn open(index_dir: impl AsRef<Path>) -> Result<Self> {
        let dir = index_dir.as_ref();

        let lexicon = load_lexicon(&dir.join(LEXICON_FILE))?;
        let skip = load_skip_table(&dir.join(METADATA_FILE))?;
        let doc_lengths = load_doc_lengths(&dir.join(DOC_LENGTHS_FILE))?;
        let external_ids = load_page_table(&dir.join(PAGE_TABLE_FILE))?;
        let store = DocStore::open(dir)?;

        if external_ids.len() != doc_lengths.len() || store.len() != doc_lengths.len() {
            return Err(TrawlerError::corrupt(format!(
                "per-document tables disagree: {} lengths, {} external ids, {} stored documents",
                doc_lengths.len(),
                external_ids.len(),
                store.len()
            )));
        }

        let total_length: u64 = doc_lengths.iter().map(|&l| l as u64).sum();
        let avgdl = if doc_lengths.is_empty() {
            0.0
        } else {
            total_length as f64 / doc_lengths.len() as f64
        };

        info!(
            documents = doc_lengths.len(),
            terms = lexicon.len(),
            blocks = skip.len(),
            "index loaded"
        );

        Ok(Self {
            inverted_path: dir.join(INVERTED_FILE),
            lexicon,
            skip,
            doc_lengths,
            external_ids,
            store,
            avgdl,
        })
    }

    pub fn total_documents(&self) -> u32 {
        self.doc_lengths.len() as u32
    }

    pub fn avgdl(&self) -> f64 {
        self.avgdl
    }

    pub fn num_terms(&self) -> usize {
        self.lexicon.len()
    }

    pub fn lexicon_entry(&self, term: &str) -> Option<&LexiconEntry> {
        self.lexicon.get(term)
    }

    /// All indexed terms, in no particular order
    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.lexicon.keys().map(|s| s.as_str())
    }

    /// Document frequency of a term; 0 when absent
    pub fn doc_frequency(&self, term: &str) -> u32 {
        self.lexicon
            .get(term)
            .map(|e| e.doc_frequency)
            .unwrap_or(0)
    }

    pub fn doc_length(&self, doc_id: DocId) -> u32 {
        self.doc_lengths.get(doc_id as usize).copied().unwrap_or(0)
    }

    /// External corpus identifier for a doc id
    pub fn external_id(&self, doc_id: DocId) -> Option<&str> {
        self.external_ids.get(doc_id as usize).map(|s| s.as_str())
    }

    /// Fetch the stored passage text for snippet generation
    pub fn fetch_document(&self, doc_id: DocId) -> Result<String> {
        self.store.fetch(doc_id)
    }

    /// Open a posting cursor for `term`
    ///
    /// A term absent from the lexicon yields an immediately-exhausted
    /// cursor; no file handle is allocated for it.
    pub fn cursor(&self, term: &str) -> Result<PostingCursor<'_>> {
        match self.lexicon.get(term) {
            Some(entry) => {
                let file = File::open(&self.inverted_path)
                    .map_err(|e| TrawlerError::open(self.inverted_path.clone(), e))?;
                PostingCursor::new(file, &self.skip, *entry)
            }
            None => Ok(PostingCursor::empty(&self.skip)),
        }
    }
}

fn load_lexicon(path: &Path) -> Result<HashMap<String, LexiconEntry>> {
    let file = File::open(path).map_err(|e| TrawlerError::open(path, e))?;
    let mut lexicon = HashMap::new();

    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != 5 {
            return Err(TrawlerError::corrupt(format!(
                "{}: line {} has {} fields, expected 5",
                path.display(),
                line_no + 1,
                fields.len()
            )));
        }
        let entry = LexiconEntry {
            start_offset: parse_field(fields[1], path, line_no)?,
            start_block: parse_field(fields[2], path, line_no)?,
            total_postings: parse_field(fields[3], path, line_no)?,
            doc_frequency: parse_field(fields[4], path, line_no)?,
        };
        lexicon.insert(fields[0].to_string(), entry);
    }
    Ok(lexicon)
}

fn parse_field<T: std::str::FromStr>(field: &str, path: &Path, line_no: usize) -> Result<T> {
    field.parse().map_err(|_| {
        TrawlerError::corrupt(format!(
            "{}: line {} has unparseable field {:?}",
            path.display(),
            line_no + 1,
            field
        ))
    })
}

fn load_skip_table(path: &Path) -> Result<SkipTable> {
    let raw = std::fs::read(path).map_err(|e| TrawlerError::open(path, e))?;
    if raw.len() < 4 {
        return Err(TrawlerError::corrupt(format!(
            "{}: missing block count",
            path.display()
        )));
    }
    let mut count_bytes = [0u8; 4];
    count_bytes.copy_from_slice(&raw[..4]);
    let num_blocks = u32::from_le_bytes(count_bytes) as usize;

    let expected = 4 + num_blocks * 12;
    if raw.len() != expected {
        return Err(TrawlerError::corrupt(format!(
            "{}: {} blocks require {} bytes, file has {}",
            path.display(),
            num_blocks,
            expected,
            raw.len()
        )));
    }

    let read_array = |section: usize| -> Vec<u32> {
        let start = 4 + section * num_blocks * 4;
        raw[start..start + num_blocks * 4]
            .chunks_exact(4)
            .map(|c| {
                let mut bytes = [0u8; 4];
                bytes.copy_from_slice(c);
                u32::from_le_bytes(bytes)
            })
            .collect()
    };

    Ok(SkipTable {
        last_doc_id: read_array(0),
        doc_bytes: read_array(1),
        freq_bytes: read_array(2),
    })
}

fn load_doc_lengths(path: &Path) -> Result<Vec<u32>> {
    let file = File::open(path).map_err(|e| TrawlerError::open(path, e))?;
    let mut lengths = Vec::new();

    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let Some((doc_id, length)) = line.split_once('\t') else {
            return Err(TrawlerError::corrupt(format!(
                "{}: line {} is not tab-separated",
                path.display(),
                line_no + 1
            )));
        };
        let doc_id: u32 = parse_field(doc_id, path, line_no)?;
        if doc_id as usize != lengths.len() {
            return Err(TrawlerError::corrupt(format!(
                "{}: line {} has doc id {}, expected {}",
                path.display(),
                line_no + 1,
                doc_id,
                lengths.len()
            )));
        }
        lengths.push(parse_field(length, path, line_no)?);
    }
    Ok(lengths)
}

fn load_page_table(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path).map_err(|e| TrawlerError::open(path, e))?;
    let mut external_ids = Vec::new();

    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let Some((doc_id, external_id)) = line.split_once('\t') else {
            return Err(TrawlerError::corrupt(format!(
                "{}: line {} is not tab-separated",
                path.display(),
                line_no + 1
            )));
        };
        let doc_id: u32 = parse_field(doc_id, path, line_no)?;
        if doc_id as usize != external_ids.len() {
            return Err(TrawlerError::corrupt(format!(
                "{}: line {} has doc id {}, expected {}",
                path.display(),
                line_no + 1,
                doc_id,
                external_ids.len()
            )));
        }
        external_ids.push(external_id.to_string());
    }
    Ok(external_ids)
}
