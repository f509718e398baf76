//! Raw document store: concatenated passage bytes plus a fixed-record index
//!
//! `documents.dat` holds the passages back to back in doc-id order;
//! `documents.idx` holds one packed `(u64 offset, u32 length)` record per
//! document, making single-document fetches O(1).

use std::fs::File;
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::{Result, TrawlerError};
use crate::index::{DOC_STORE_FILE, DOC_STORE_INDEX_FILE};

use super::types::DocId;

const IDX_RECORD_BYTES: usize = 12;

/// Append-only writer used during the build pass
pub struct DocStoreWriter {
    data: BufWriter<File>,
    index: BufWriter<File>,
    offset: u64,
}

impl DocStoreWriter {
    pub fn create(index_dir: &Path) -> Result<Self> {
        let data_path = index_dir.join(DOC_STORE_FILE);
        let index_path = index_dir.join(DOC_STORE_INDEX_FILE);
        let data = File::create(&data_path).map_err(|e| TrawlerError::open(data_path, e))?;
        let index = File::create(&index_path).map_err(|e| TrawlerError::open(index_path, e))?;

        Ok(Self {
            data: BufWriter::new(data),
            index: BufWriter::new(index),
            offset: 0,
        })
    }

    /// Append one document's bytes and its index record
    pub fn append(&mut self, text: &str) -> Result<()> {
        let bytes = text.as_bytes();
        self.data.write_all(bytes)?;
        self.index.write_all(&self.offset.to_le_bytes())?;
        self.index.write_all(&(bytes.len() as u32).to_le_bytes())?;
        self.offset += bytes.len() as u64;
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        self.data.flush()?;
        self.index.flush()?;
        Ok(())
    }
}

/// Read-only view over a finished document store
pub struct DocStore {
    data_path: PathBuf,
    records: Vec<(u64, u32)>,
}

impl DocStore {
    pub fn open(index_dir: &Path) -> Result<Self> {
        let index_path = index_dir.join(DOC_STORE_INDEX_FILE);
        let raw =
            std::fs::read(&index_path).map_err(|e| TrawlerError::open(index_path.clone(), e))?;
        if raw.len() % IDX_RECORD_BYTES != 0 {
            return Err(TrawlerError::corrupt(format!(
                "{}: size {} is not a multiple of {} bytes",
                index_path.display(),
                raw.len(),
                IDX_RECORD_BYTES
            )));
        }

        let records = raw
            .chunks_exact(IDX_RECORD_BYTES)
            .map(|rec| {
                let mut offset = [0u8; 8];
                let mut length = [0u8; 4];
                offset.copy_from_slice(&rec[..8]);
                length.copy_from_slice(&rec[8..]);
                (u64::from_le_bytes(offset), u32::from_le_bytes(length))
            })
            .collect();

        Ok(Self {
            data_path: index_dir.join(DOC_STORE_FILE),
            records,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Fetch one document's text
    ///
    /// Opens its own handle so concurrent fetches never share a seek
    /// position.
    pub fn fetch(&self, doc_id: DocId) -> Result<String> {
        let (offset, length) = *self
            .records
            .get(doc_id as usize)
            .ok_or_else(|| TrawlerError::InvalidRequest(format!("unknown doc id {}", doc_id)))?;

        let mut file =
            File::open(&self.data_path).map_err(|e| TrawlerError::open(self.data_path.clone(), e))?;
        file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; length as usize];
        file.read_exact(&mut buf)?;

        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}
