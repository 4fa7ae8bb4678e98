use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub id: String,
    pub text: String,
    pub vector: Vec<f32>,
}

/// The precomputed document corpus. Loaded once at startup and read-only
/// afterwards; any malformed record rejects the whole load, never a
/// partial store.
#[derive(Debug, Default)]
pub struct EmbeddingStore {
    records: Vec<EmbeddingRecord>,
}

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("failed to read corpus file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("corpus file is not a valid record collection: {0}")]
    Parse(serde_json::Error),
    #[error("corpus record '{id}' has an empty embedding vector")]
    EmptyVector { id: String },
}

impl EmbeddingStore {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<EmbeddingRecord>) -> Self {
        Self { records }
    }

    pub fn load(path: &Path) -> Result<Self, CorpusError> {
        let raw = fs::read_to_string(path).map_err(|source| CorpusError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        parse_records(&raw).map(Self::from_records)
    }

    pub fn records(&self) -> &[EmbeddingRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn parse_records(raw: &str) -> Result<Vec<EmbeddingRecord>, CorpusError> {
    let records: Vec<EmbeddingRecord> = serde_json::from_str(raw).map_err(CorpusError::Parse)?;

    for record in &records {
        if record.vector.is_empty() {
            return Err(CorpusError::EmptyVector {
                id: record.id.clone(),
            });
        }
    }

    Ok(records)
}
