//! File-system provider
//!
//! The refresh engine only needs to list a directory and read text files.
//! [`DirectoryProvider`] serves a local directory; tests plug in their own.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::error::{ProviderError, SkipReason};
use crate::snapshot::SkippedFile;
use crate::types::RawFile;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Other,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub kind: EntryKind,
}

impl DirEntry {
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
        }
    }
}

#[async_trait]
pub trait FileSystemProvider: Send + Sync {
    async fn list_entries(&self) -> Result<Vec<DirEntry>, ProviderError>;
    async fn read_text(&self, entry: &DirEntry) -> Result<String, ProviderError>;
}

/// Local directory granted once per session.
#[derive(Clone, Debug)]
pub struct DirectoryProvider {
    root: PathBuf,
}

impl DirectoryProvider {
    /// Grant access to `path`. Fails when it is missing, unreadable or not a directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ProviderError> {
        let path = path.as_ref();
        let meta = std::fs::metadata(path).map_err(|e| ProviderError::access_denied(path, &e))?;
        if !meta.is_dir() {
            return Err(ProviderError::NotADirectory(path.to_path_buf()));
        }
        std::fs::read_dir(path).map_err(|e| ProviderError::access_denied(path, &e))?;
        log::info!("📂 Directory granted: {}", path.display());
        Ok(Self {
            root: path.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl FileSystemProvider for DirectoryProvider {
    async fn list_entries(&self) -> Result<Vec<DirEntry>, ProviderError> {
        let list_err = |e: std::io::Error| ProviderError::List {
            path: self.root.clone(),
            reason: e.to_string(),
        };

        let mut dir = tokio::fs::read_dir(&self.root).await.map_err(list_err)?;
        let mut entries = Vec::new();
        while let Some(entry) = dir.next_entry().await.map_err(list_err)? {
            let kind = match entry.file_type().await {
                Ok(t) if t.is_file() => EntryKind::File,
                Ok(t) if t.is_dir() => EntryKind::Directory,
                _ => EntryKind::Other,
            };
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                kind,
            });
        }
        // stable order so "last file wins" is the lexically last name
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn read_text(&self, entry: &DirEntry) -> Result<String, ProviderError> {
        tokio::fs::read_to_string(self.root.join(&entry.name))
            .await
            .map_err(|e| ProviderError::Read {
                name: entry.name.clone(),
                reason: e.to_string(),
            })
    }
}

/// Files read in one cycle, plus the ones that could not be read or parsed.
#[derive(Debug, Default)]
pub struct Batch {
    pub files: Vec<RawFile>,
    pub skipped: Vec<SkippedFile>,
}

/// List the directory and read every `.json` file in it.
///
/// Only a failed listing fails the batch. A file that cannot be read or is
/// not valid JSON (often one caught mid-write) is skipped on its own.
pub async fn read_batch(provider: &dyn FileSystemProvider) -> Result<Batch, ProviderError> {
    let entries = provider.list_entries().await?;
    let mut batch = Batch::default();

    for entry in entries
        .iter()
        .filter(|e| e.kind == EntryKind::File && e.name.ends_with(".json"))
    {
        let text = match provider.read_text(entry).await {
            Ok(text) => text,
            Err(e) => {
                log::warn!("⚠️ {e}");
                batch.skipped.push(SkippedFile {
                    name: entry.name.clone(),
                    reason: SkipReason::Read(e.to_string()),
                });
                continue;
            }
        };
        match serde_json::from_str(&text) {
            Ok(content) => batch.files.push(RawFile::new(entry.name.clone(), content)),
            Err(e) => {
                log::warn!("⚠️ Skipping {}: {e}", entry.name);
                batch.skipped.push(SkippedFile {
                    name: entry.name.clone(),
                    reason: SkipReason::Json(e.to_string()),
                });
            }
        }
    }

    log::debug!(
        "📄 Read {} files ({} skipped)",
        batch.files.len(),
        batch.skipped.len()
    );
    Ok(batch)
}
