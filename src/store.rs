use crate::error::Result;
use crate::sources::RawDocument;
use crate::sources::local::{MANIFEST_FILE, list_documents};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{info, instrument};

/// Directory used for documents whose publication year is unknown.
pub const UNKNOWN_YEAR_DIR: &str = "unknown";

#[async_trait]
pub trait AdvisoryStore {
    /// Persist one document, replacing any previous copy.
    async fn put(&self, document: &RawDocument) -> Result<PathBuf>;
    async fn contains(&self, year: Option<i32>, id: &str) -> Result<bool>;
    /// Rewrite the index of stored documents; returns its entry count.
    async fn write_manifest(&self) -> Result<usize>;
}

/// Stores documents under `<root>/<year>/<id>.json`.
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn document_path(&self, year: Option<i32>, id: &str) -> PathBuf {
        let year = year.map_or_else(|| UNKNOWN_YEAR_DIR.to_string(), |year| year.to_string());
        self.root.join(year).join(format!("{}.json", id))
    }
}

#[async_trait]
impl AdvisoryStore for DirectoryStore {
    #[instrument(skip(self, document), fields(id = %document.id))]
    async fn put(&self, document: &RawDocument) -> Result<PathBuf> {
        let path = self.document_path(document.year, &document.id);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &document.bytes).await?;
        info!("Saved {}", path.display());
        Ok(path)
    }

    async fn contains(&self, year: Option<i32>, id: &str) -> Result<bool> {
        Ok(tokio::fs::try_exists(self.document_path(year, id)).await?)
    }

    async fn write_manifest(&self) -> Result<usize> {
        let mut entries: Vec<String> = list_documents(&self.root)
            .await?
            .iter()
            .filter_map(|path| path.strip_prefix(&self.root).ok())
            .map(|relative| relative.to_string_lossy().replace('\\', "/"))
            .collect();
        entries.sort();

        let mut manifest = serde_json::to_vec(&entries)?;
        manifest.push(b'\n');
        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(self.root.join(MANIFEST_FILE), manifest).await?;

        info!("Wrote {} entries to {}", entries.len(), MANIFEST_FILE);
        Ok(entries.len())
    }
}
