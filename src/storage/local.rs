//! Local filesystem storage implementation.
//!
//! Keeps one JSON file per document for development and testing.
//! Production deployments should use ElasticStore.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! └── twitter-YYYY.MM.DD/    # Partition
//!     └── tweet/             # Kind
//!         └── {id}.json      # Document
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::Document;
use crate::storage::{DocumentRef, DocumentStore, SearchQuery, SearchResults, partition_matches};

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root_dir: PathBuf,
}

impl LocalStore {
    /// Create a new LocalStore rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    /// Path of the file backing a document.
    fn path(&self, target: &DocumentRef) -> PathBuf {
        self.root_dir
            .join(&target.partition)
            .join(&target.kind)
            .join(format!("{}.json", target.id))
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        self.ensure_dir(path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// Write JSON data.
    async fn write_json<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(path, &bytes).await
    }

    /// Read JSON data, returning None if the file doesn't exist.
    async fn read_json(&self, path: &Path) -> Result<Option<Value>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Names of the subdirectories of `dir`; empty if it doesn't exist.
    async fn list_dirs(dir: &Path) -> Result<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AppError::Io(e)),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Document ids stored under `dir`.
    async fn list_ids(dir: &Path) -> Result<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AppError::Io(e)),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Some(id) = name.strip_suffix(".json") {
                ids.push(id.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Load a stored document as raw JSON.
    pub async fn get(&self, target: &DocumentRef) -> Result<Option<Value>> {
        self.read_json(&self.path(target)).await
    }
}

#[async_trait]
impl DocumentStore for LocalStore {
    async fn index(&self, target: &DocumentRef, document: &Document) -> Result<()> {
        let path = self.path(target);
        self.write_json(&path, document).await?;
        log::debug!("Indexed {} to {}", target, path.display());
        Ok(())
    }

    async fn search(
        &self,
        query: &SearchQuery,
        partitions: &[String],
        kinds: &[String],
    ) -> Result<SearchResults> {
        let mut results = SearchResults::default();

        for partition in Self::list_dirs(&self.root_dir).await? {
            if !partitions.iter().any(|p| partition_matches(p, &partition)) {
                continue;
            }

            for kind in kinds {
                let dir = self.root_dir.join(&partition).join(kind);
                for id in Self::list_ids(&dir).await? {
                    let target = DocumentRef {
                        partition: partition.clone(),
                        kind: kind.clone(),
                        id,
                    };
                    let Some(source) = self.get(&target).await? else {
                        continue;
                    };
                    if query.matches(&target.id, &source) {
                        results.hits.push(target);
                    }
                }
            }
        }

        results.total = results.hits.len() as u64;
        Ok(results)
    }

    async fn update(&self, target: &DocumentRef, patch: &Value) -> Result<()> {
        let path = self.path(target);
        let mut existing = self
            .read_json(&path)
            .await?
            .ok_or_else(|| AppError::update(&target.id, format!("{target} does not exist")))?;

        let (Some(fields), Some(changes)) = (existing.as_object_mut(), patch.as_object()) else {
            return Err(AppError::update(&target.id, "document and patch must be objects"));
        };
        for (key, value) in changes {
            fields.insert(key.clone(), value.clone());
        }

        self.write_json(&path, &existing).await
    }
}
