use crate::config::Config;
use crate::decoder;
use crate::error::Result;
use crate::filter::{AdvisoryFilter, FilterCriteria, is_affected};
use crate::models::Advisory;
use crate::sources::fortiguard::FortiGuardSource;
use crate::sources::local::DirectorySource;
use crate::sources::{AdvisorySource, RawDocument};
use crate::store::{AdvisoryStore, DirectoryStore};
use futures_util::TryStreamExt;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of [`AdvisoryManager::sync`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub fetched: usize,
    pub skipped: usize,
    pub manifest_entries: usize,
}

pub struct AdvisoryManager {
    store: Arc<dyn AdvisoryStore + Send + Sync>,
    local: DirectorySource,
    remote: FortiGuardSource,
    filter: AdvisoryFilter,
}

impl AdvisoryManager {
    pub fn new(config: &Config, filter: AdvisoryFilter) -> Result<Self> {
        Ok(Self {
            store: Arc::new(DirectoryStore::new(&config.data_dir)),
            local: DirectorySource::new(&config.data_dir),
            remote: FortiGuardSource::new(config)?,
            filter,
        })
    }

    /// Download every advisory the feed lists that is not cached yet.
    ///
    /// The first failed download aborts the sync; documents saved before it
    /// are kept.
    pub async fn sync(&self) -> Result<SyncReport> {
        info!("Starting FortiGuard sync...");

        let mut report = SyncReport::default();
        let mut missing = Vec::new();
        for entry in self.remote.feed_entries().await? {
            if self.store.contains(entry.year, &entry.id).await? {
                report.skipped += 1;
            } else {
                missing.push(entry);
            }
        }
        info!(
            "{} advisories to fetch, {} already cached",
            missing.len(),
            report.skipped
        );

        let mut documents = self.remote.documents_for(missing);
        while let Some(document) = documents.try_next().await? {
            self.store.put(&document).await?;
            report.fetched += 1;
        }

        report.manifest_entries = self.store.write_manifest().await?;
        info!("Sync completed: {:?}", report);
        Ok(report)
    }

    /// Decode every cached document.
    pub async fn load_local(&self) -> Result<Vec<Advisory>> {
        decode_all(&self.local).await
    }

    /// Decode every advisory currently listed by the feed.
    pub async fn fetch_remote(&self) -> Result<Vec<Advisory>> {
        decode_all(&self.remote).await
    }

    /// Advisories matching the criteria, in input order.
    pub fn query(&self, advisories: &[Advisory], criteria: &FilterCriteria) -> Vec<Advisory> {
        self.filter
            .apply(advisories, criteria)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Cached advisories that list `product`-`version` as a product
    /// identifier and whose score is in range. Product types are not
    /// consulted.
    pub async fn affected(
        &self,
        product: &str,
        version: &str,
        criteria: &FilterCriteria,
    ) -> Result<Vec<Advisory>> {
        let advisories = self.load_local().await?;
        Ok(advisories
            .into_iter()
            .filter(|advisory| is_affected(advisory, product, version))
            .filter(|advisory| self.filter.score_matches(advisory, criteria))
            .collect())
    }
}

/// Distinct product types across advisories, sorted.
pub fn product_types(advisories: &[Advisory]) -> BTreeSet<String> {
    advisories
        .iter()
        .flat_map(Advisory::product_types)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Decode a source's documents, skipping the ones that do not decode.
async fn decode_all(source: &dyn AdvisorySource) -> Result<Vec<Advisory>> {
    let mut advisories = Vec::new();
    let mut skipped = 0usize;

    let mut documents = source.documents();
    while let Some(document) = documents.try_next().await? {
        match decode_document(&document) {
            Ok(advisory) => advisories.push(advisory),
            Err(e) if e.is_document_error() => {
                warn!("Skipping {} from {}: {}", document.id, source.name(), e);
                skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    info!(
        "Decoded {} advisories from {} ({} skipped)",
        advisories.len(),
        source.name(),
        skipped
    );
    Ok(advisories)
}

fn decode_document(document: &RawDocument) -> Result<Advisory> {
    decoder::decode(&document.bytes)
}
