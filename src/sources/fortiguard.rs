//! FortiGuard PSIRT source.
//!
//! Advisory identifiers come from the PSIRT RSS feed; each advisory's CVRF
//! document is then downloaded one at a time, paced by a rate limiter so the
//! upstream service is not hammered.
//!
//! # Data Source
//!
//! - Feed: <https://filestore.fortinet.com/fortiguard/rss/ir.xml>
//! - Documents: `https://www.fortiguard.com/psirt/cvrf/<id>` (CVRF 1.1 XML)

use super::{AdvisorySource, DocumentStream, RawDocument};
use crate::config::Config;
use crate::error::{AdvisoryError, Result};
use crate::xml;
use chrono::{DateTime, Datelike};
use futures_util::{StreamExt, TryStreamExt, stream};
use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const SOURCE_NAME: &str = "FortiGuard";

/// One advisory announced by the RSS feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub id: String,
    pub year: Option<i32>,
}

pub struct FortiGuardSource {
    client: ClientWithMiddleware,
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>>,
    feed_url: String,
    cvrf_url: String,
}

impl FortiGuardSource {
    pub fn new(config: &Config) -> Result<Self> {
        let raw_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(config.user_agent.as_str())
            .build()?;

        // Retry policy: 3 retries with exponential backoff
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(3);
        let client = ClientBuilder::new(raw_client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        // One document request per interval, no burst.
        let quota = Quota::with_period(config.request_interval).ok_or_else(|| {
            AdvisoryError::config("request interval must be greater than zero")
        })?;
        let limiter = Arc::new(RateLimiter::direct(quota));

        Ok(Self {
            client,
            limiter,
            feed_url: config.feed_url.clone(),
            cvrf_url: config.cvrf_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch the RSS feed and list the advisories it announces.
    pub async fn feed_entries(&self) -> Result<Vec<FeedEntry>> {
        info!("Fetching FortiGuard PSIRT feed...");

        let response = self.client.get(&self.feed_url).send().await?;
        if !response.status().is_success() {
            return Err(AdvisoryError::source_fetch(
                SOURCE_NAME,
                format!("feed returned HTTP {}", response.status()),
            ));
        }

        let body = response.text().await?;
        let rss: Rss = quick_xml::de::from_str(&body)
            .map_err(|e| AdvisoryError::xml(format!("RSS feed: {}", e)))?;

        let mut entries = Vec::with_capacity(rss.channel.item.len());
        for item in rss.channel.item {
            let link = item.link.trim();
            if link.is_empty() {
                continue;
            }
            entries.push(FeedEntry {
                id: advisory_id(link)?,
                year: item.pub_date.as_deref().and_then(publication_year),
            });
        }

        info!("Feed lists {} advisories", entries.len());
        Ok(entries)
    }

    /// Download one advisory's CVRF document, waiting for the rate limiter.
    pub async fn fetch_document(&self, entry: &FeedEntry) -> Result<RawDocument> {
        self.limiter.until_ready().await;

        let url = format!("{}/{}", self.cvrf_url, entry.id);
        debug!("Fetching CVRF document {}", url);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AdvisoryError::source_fetch(
                SOURCE_NAME,
                format!(
                    "{}: HTTP {}: {}",
                    entry.id,
                    status,
                    body.chars().take(200).collect::<String>()
                ),
            ));
        }

        let body = response.bytes().await?;
        Ok(RawDocument {
            id: entry.id.clone(),
            year: entry.year,
            bytes: to_document_json(&body)?,
        })
    }

    /// Stream the documents of the given feed entries, in order.
    pub fn documents_for(&self, entries: Vec<FeedEntry>) -> DocumentStream<'_> {
        stream::try_unfold(entries.into_iter(), move |mut remaining| async move {
            match remaining.next() {
                Some(entry) => self
                    .fetch_document(&entry)
                    .await
                    .map(|document| Some((document, remaining))),
                None => Ok(None),
            }
        })
        .boxed()
    }
}

impl AdvisorySource for FortiGuardSource {
    fn documents(&self) -> DocumentStream<'_> {
        stream::once(self.feed_entries())
            .map_ok(move |entries| self.documents_for(entries))
            .try_flatten()
            .boxed()
    }

    fn name(&self) -> &str {
        SOURCE_NAME
    }
}

/// The advisory id is the last path segment of the item link.
fn advisory_id(link: &str) -> Result<String> {
    let url = reqwest::Url::parse(link).map_err(|e| {
        AdvisoryError::source_fetch(SOURCE_NAME, format!("invalid advisory link '{}': {}", link, e))
    })?;

    url.path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .map(str::to_string)
        .ok_or_else(|| {
            AdvisoryError::source_fetch(SOURCE_NAME, format!("advisory link '{}' has no id", link))
        })
}

/// Year of an RFC 2822 `pubDate` (e.g., "Tue, 12 Dec 2023 08:00:00 -0800").
fn publication_year(pub_date: &str) -> Option<i32> {
    DateTime::parse_from_rfc2822(pub_date.trim())
        .ok()
        .map(|date| date.year())
}

/// CVRF XML is projected to JSON; JSON bodies are kept as they are.
fn to_document_json(body: &[u8]) -> Result<Vec<u8>> {
    let first = body.iter().copied().find(|b| !b.is_ascii_whitespace());
    if first == Some(b'{') {
        return Ok(body.to_vec());
    }
    let value = xml::to_json(body)?;
    Ok(serde_json::to_vec_pretty(&value)?)
}

// Minimal RSS structs
#[derive(Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Deserialize)]
struct Channel {
    #[serde(default)]
    item: Vec<Item>,
    // Ignored: title, link, description, lastBuildDate, ...
}

#[derive(Deserialize)]
struct Item {
    #[serde(default)]
    link: String,
    #[serde(rename = "pubDate", default)]
    pub_date: Option<String>,
}
