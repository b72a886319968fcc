//! Cached documents on disk.
//!
//! Documents live under `<root>/<year>/<id>.json`, one directory per
//! publication year, alongside a `manifest.json` index at the root.

use super::{AdvisorySource, DocumentStream, RawDocument};
use crate::error::Result;
use futures_util::{StreamExt, stream};
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name of the index written next to the year directories.
pub const MANIFEST_FILE: &str = "manifest.json";

pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Read one document file.
    pub async fn read_document(path: &Path) -> Result<RawDocument> {
        let bytes = tokio::fs::read(path).await?;
        let id = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let year = path
            .parent()
            .and_then(Path::file_name)
            .and_then(|name| name.to_str())
            .and_then(|name| name.parse::<i32>().ok());

        Ok(RawDocument { id, year, bytes })
    }
}

/// Every `<root>/*/*.json` document path, sorted.
///
/// A missing root yields no documents.
pub async fn list_documents(root: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    let mut years = match tokio::fs::read_dir(root).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("Document root {} does not exist", root.display());
            return Ok(paths);
        }
        Err(e) => return Err(e.into()),
    };

    while let Some(year) = years.next_entry().await? {
        if !year.file_type().await?.is_dir() {
            continue;
        }

        let mut files = tokio::fs::read_dir(year.path()).await?;
        while let Some(file) = files.next_entry().await? {
            let path = file.path();
            let is_json = path.extension().is_some_and(|ext| ext == "json");
            let is_manifest = path.file_name().is_some_and(|name| name == MANIFEST_FILE);
            if is_json && !is_manifest && file.file_type().await?.is_file() {
                paths.push(path);
            }
        }
    }

    paths.sort();
    Ok(paths)
}

impl AdvisorySource for DirectorySource {
    fn documents(&self) -> DocumentStream<'_> {
        stream::once(list_documents(&self.root))
            .map(|listed| match listed {
                Ok(paths) => stream::try_unfold(paths.into_iter(), |mut remaining| async move {
                    match remaining.next() {
                        Some(path) => Self::read_document(&path)
                            .await
                            .map(|document| Some((document, remaining))),
                        None => Ok(None),
                    }
                })
                .boxed(),
                Err(e) => stream::once(async move { Err::<RawDocument, _>(e) }).boxed(),
            })
            .flatten()
            .boxed()
    }

    fn name(&self) -> &str {
        "Directory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::TryStreamExt;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    #[tokio::test]
    async fn test_documents_follow_year_layout() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "2024/FG-IR-24-007.json", "{}");
        write(dir.path(), "2022/FG-IR-22-398.json", "{}");
        write(dir.path(), "unknown/FG-IR-00-000.json", "{}");
        write(dir.path(), "2022/notes.txt", "ignored");
        write(dir.path(), MANIFEST_FILE, "[]");

        let source = DirectorySource::new(dir.path());
        let documents: Vec<RawDocument> = source.documents().try_collect().await.unwrap();

        let found: Vec<(String, Option<i32>)> = documents
            .into_iter()
            .map(|doc| (doc.id, doc.year))
            .collect();
        assert_eq!(
            found,
            vec![
                ("FG-IR-22-398".to_string(), Some(2022)),
                ("FG-IR-24-007".to_string(), Some(2024)),
                ("FG-IR-00-000".to_string(), None),
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_root_is_empty() {
        let dir = TempDir::new().unwrap();
        let source = DirectorySource::new(dir.path().join("absent"));
        let documents: Vec<RawDocument> = source.documents().try_collect().await.unwrap();
        assert!(documents.is_empty());
    }
}
