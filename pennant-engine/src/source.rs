//! Snapshot sources

use std::path::{Path, PathBuf};

use pennant_evaluation::Document;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{EngineError, EngineResult};

/// Produces flag documents for the engine
pub trait Fetcher: Send {
    /// Next document, or `None` when nothing changed since the last fetch
    fn fetch(&mut self) -> EngineResult<Option<Document>>;

    /// Forget change-detection state so the next fetch yields a document
    fn reset(&mut self) {}
}

/// Inline document supplied with the engine options
#[derive(Debug)]
pub struct LocalFetcher {
    document: Option<Document>,
}

impl LocalFetcher {
    pub fn new(document: Option<Document>) -> Self {
        Self {
            document: Some(document.unwrap_or_default()),
        }
    }
}

impl Fetcher for LocalFetcher {
    fn fetch(&mut self) -> EngineResult<Option<Document>> {
        Ok(self.document.take())
    }
}

/// Document read from a file on every fetch
#[derive(Debug)]
pub struct FileFetcher {
    path: PathBuf,
    digest: Option<[u8; 32]>,
}

impl FileFetcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            digest: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Fetcher for FileFetcher {
    fn fetch(&mut self) -> EngineResult<Option<Document>> {
        let bytes = std::fs::read(&self.path).map_err(|source| EngineError::Io {
            path: self.path.display().to_string(),
            source,
        })?;

        let digest: [u8; 32] = Sha256::digest(&bytes).into();
        if self.digest == Some(digest) {
            debug!(path = %self.path.display(), "Snapshot unchanged");
            return Ok(None);
        }

        let document: Document = serde_json::from_slice(&bytes)
            .map_err(pennant_evaluation::EvaluationError::from)?;
        self.digest = Some(digest);
        Ok(Some(document))
    }

    fn reset(&mut self) {
        self.digest = None;
    }
}
