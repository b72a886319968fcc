//! Advisory document sources.
//!
//! Sources only supply raw document bytes; decoding is the caller's business.
//! Each source implements the [`AdvisorySource`] trait.
//!
//! # Available Sources
//!
//! - [`fortiguard::FortiGuardSource`] - FortiGuard PSIRT RSS feed + CVRF endpoint
//! - [`local::DirectorySource`] - cached documents under `<root>/<year>/<id>.json`

pub mod fortiguard;
pub mod local;

use crate::error::Result;
use futures_util::stream::BoxStream;

/// One undecoded CVRF document in its XML-derived JSON form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDocument {
    /// Advisory identifier (e.g., "FG-IR-22-398").
    pub id: String,
    /// Publication year, when the source knows it.
    pub year: Option<i32>,
    pub bytes: Vec<u8>,
}

/// Documents yielded one at a time.
///
/// The stream ends right after the first error; the documents after a failed
/// one are never produced. Dropping the stream cancels the iteration.
pub type DocumentStream<'a> = BoxStream<'a, Result<RawDocument>>;

/// Trait for advisory document sources.
///
/// # Example
///
/// ```ignore
/// use cvrf_review::sources::{AdvisorySource, DocumentStream};
/// use futures_util::{StreamExt, stream};
///
/// struct NoDocuments;
///
/// impl AdvisorySource for NoDocuments {
///     fn documents(&self) -> DocumentStream<'_> {
///         stream::empty().boxed()
///     }
///
///     fn name(&self) -> &str {
///         "NoDocuments"
///     }
/// }
/// ```
pub trait AdvisorySource: Send + Sync {
    /// Stream every document this source offers.
    fn documents(&self) -> DocumentStream<'_>;

    /// Get the name of this source (used for logging).
    fn name(&self) -> &str;
}
