//! Read-only access to the extracted knowledge file.
//!
//! The responder serves from an immutable [`KnowledgeBase`] snapshot. By
//! default the snapshot is taken once at startup; with
//! `server.reload_per_request` the file is re-read for every request.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::config::Config;
use crate::models::KnowledgeChunk;

#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("knowledge file not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to read knowledge file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse knowledge file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Reads a chunk collection from disk.
pub fn load_chunks(path: &Path) -> Result<Vec<KnowledgeChunk>, KnowledgeError> {
    if !path.exists() {
        return Err(KnowledgeError::NotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path).map_err(|source| KnowledgeError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| KnowledgeError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// An immutable view of the knowledge file.
#[derive(Debug, Clone)]
pub enum KnowledgeBase {
    Loaded(Vec<KnowledgeChunk>),
    Missing(PathBuf),
}

impl KnowledgeBase {
    pub fn len(&self) -> usize {
        match self {
            KnowledgeBase::Loaded(chunks) => chunks.len(),
            KnowledgeBase::Missing(_) => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Loads from `path`. A missing file becomes [`KnowledgeBase::Missing`];
    /// unreadable or malformed files are errors.
    pub fn load(path: &Path) -> Result<Self, KnowledgeError> {
        match load_chunks(path) {
            Ok(chunks) => Ok(KnowledgeBase::Loaded(chunks)),
            Err(KnowledgeError::NotFound(path)) => Ok(KnowledgeBase::Missing(path)),
            Err(e) => Err(e),
        }
    }
}

/// Hands out knowledge snapshots according to the configured load policy.
pub struct KnowledgeStore {
    path: PathBuf,
    snapshot: Option<Arc<KnowledgeBase>>,
}

impl KnowledgeStore {
    /// Builds a store for the configured knowledge file. Unless
    /// `reload_per_request` is set, the file is read now and a malformed
    /// file fails startup.
    pub fn open(config: &Config) -> Result<Self, KnowledgeError> {
        let path = config.paths.knowledge.clone();
        let snapshot = if config.server.reload_per_request {
            None
        } else {
            Some(Arc::new(KnowledgeBase::load(&path)?))
        };
        Ok(Self { path, snapshot })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot(&self) -> Arc<KnowledgeBase> {
        if let Some(snapshot) = &self.snapshot {
            return snapshot.clone();
        }
        match KnowledgeBase::load(&self.path) {
            Ok(kb) => Arc::new(kb),
            Err(e) => {
                tracing::warn!(error = %e, "treating knowledge file as missing");
                Arc::new(KnowledgeBase::Missing(self.path.clone()))
            }
        }
    }
}
