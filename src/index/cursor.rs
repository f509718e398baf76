//! Random-access posting-list cursor over the compressed inverted file
//!
//! Each cursor owns its own file handle, so concurrent queries never share a
//! seek position. `next_geq` consults the in-memory skip table to pass over
//! whole blocks without decompressing them.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};

use crate::error::{Result, TrawlerError};

use super::postings::decode_block;
use super::types::{DocId, LexiconEntry, SkipTable};

/// Cursor over one term's posting list
///
/// `doc()` and `freq()` may only be called while `valid()` holds. Postings
/// are produced exactly once each, in strictly increasing doc-id order.
pub struct PostingCursor<'a> {
    /// `None` for terms absent from the lexicon
    file: Option<File>,
    skip: &'a SkipTable,
    entry: LexiconEntry,
    block_idx: u32,
    docs: Vec<DocId>,
    freqs: Vec<u32>,
    pos: usize,
    needs_load: bool,
    exhausted: bool,
}

impl<'a> PostingCursor<'a> {
    /// Cursor over a term present in the lexicon; positions on the first
    /// posting
    pub fn new(file: File, skip: &'a SkipTable, entry: LexiconEntry) -> Result<Self> {
        let mut cursor = Self {
            file: Some(file),
            skip,
            entry,
            block_idx: entry.start_block,
            docs: Vec::new(),
            freqs: Vec::new(),
            pos: 0,
            needs_load: true,
            exhausted: false,
        };
        cursor.load_block()?;
        Ok(cursor)
    }

    /// Immediately-exhausted cursor for a term absent from the lexicon
    pub fn empty(skip: &'a SkipTable) -> Self {
        Self {
            file: None,
            skip,
            entry: LexiconEntry {
                start_offset: 0,
                start_block: 0,
                total_postings: 0,
                doc_frequency: 0,
            },
            block_idx: 0,
            docs: Vec::new(),
            freqs: Vec::new(),
            pos: 0,
            needs_load: false,
            exhausted: true,
        }
    }

    pub fn valid(&self) -> bool {
        !self.exhausted && self.pos < self.docs.len()
    }

    /// Current doc id; requires `valid()`
    pub fn doc(&self) -> DocId {
        self.docs[self.pos]
    }

    /// Current term frequency; requires `valid()`
    pub fn freq(&self) -> u32 {
        self.freqs[self.pos]
    }

    pub fn doc_frequency(&self) -> u32 {
        self.entry.doc_frequency
    }

    /// Step to the next posting, crossing block boundaries as needed
    pub fn advance(&mut self) -> Result<()> {
        if self.exhausted {
            return Ok(());
        }
        self.pos += 1;
        if self.pos >= self.docs.len() {
            self.block_idx += 1;
            self.needs_load = true;
            self.load_block()?;
        }
        Ok(())
    }

    /// Position on the first posting with `doc() >= target`
    ///
    /// Monotonic in `target`; a target at or below the current doc id is a
    /// no-op. Returns `true` iff such a posting exists.
    pub fn next_geq(&mut self, target: DocId) -> Result<bool> {
        if self.exhausted {
            return Ok(false);
        }
        if self.pos < self.docs.len() && self.docs[self.pos] >= target {
            return Ok(true);
        }

        loop {
            // Pass over whole blocks that cannot contain the target
            let last_block = self.entry.last_block_exclusive();
            while self.block_idx < last_block
                && self.skip.last_doc_id[self.block_idx as usize] < target
            {
                self.block_idx += 1;
                self.needs_load = true;
            }
            if self.block_idx >= last_block {
                self.exhausted = true;
                return Ok(false);
            }

            if self.needs_load {
                self.load_block()?;
                if self.exhausted {
                    return Ok(false);
                }
            }

            while self.pos < self.docs.len() {
                if self.docs[self.pos] >= target {
                    return Ok(true);
                }
                self.pos += 1;
            }

            self.block_idx += 1;
            self.needs_load = true;
        }
    }

    /// Decompress block `block_idx` into memory, or mark the cursor
    /// exhausted past the term's last block
    fn load_block(&mut self) -> Result<()> {
        self.needs_load = false;
        self.pos = 0;

        if self.block_idx >= self.entry.last_block_exclusive() {
            self.exhausted = true;
            return Ok(());
        }
        let Some(file) = self.file.as_mut() else {
            self.exhausted = true;
            return Ok(());
        };

        let offset =
            self.skip
                .block_offset(self.entry.start_offset, self.entry.start_block, self.block_idx);
        file.seek(SeekFrom::Start(offset))?;

        let doc_data = read_sized_section(
            file,
            self.skip.doc_bytes[self.block_idx as usize],
            self.block_idx,
            "doc",
        )?;
        let freq_data = read_sized_section(
            file,
            self.skip.freq_bytes[self.block_idx as usize],
            self.block_idx,
            "freq",
        )?;

        let (docs, freqs) = decode_block(&doc_data, &freq_data)?;
        self.docs = docs;
        self.freqs = freqs;
        Ok(())
    }
}

/// Read a `u32` length prefix plus payload, checking it against the skip
/// table
fn read_sized_section(
    file: &mut File,
    expected: u32,
    block_idx: u32,
    stream: &str,
) -> Result<Vec<u8>> {
    let mut len_bytes = [0u8; 4];
    file.read_exact(&mut len_bytes)?;
    let stored = u32::from_le_bytes(len_bytes);
    if stored != expected {
        return Err(TrawlerError::corrupt(format!(
            "block {}: stored {} size {} disagrees with skip table {}",
            block_idx, stream, stored, expected
        )));
    }
    let mut data = vec![0u8; stored as usize];
    file.read_exact(&mut data)?;
    Ok(data)
}
