//! Port traits: the capabilities the redirect workflow needs from its host.
//!
//! Each trait is deliberately narrow. Infrastructure crates implement them
//! (`sanity` over HTTP, tests with in-memory fakes); the decision engine only
//! ever sees these traits.

use async_trait::async_trait;

use crate::errors::{PublishError, SourceError, WriteError};
use crate::{DocumentSnapshot, RecordId, RedirectKind, RedirectRecord, Toast};

/// Persists redirect records in the content store.
#[async_trait]
pub trait RedirectRecordWriter: Send + Sync {
    /// Creates `record` and returns its id once the store has acknowledged
    /// the write.
    ///
    /// # Errors
    ///
    /// Returns [`WriteError`] when the record is invalid or the store
    /// rejects or cannot receive the write.
    async fn create(&self, record: &RedirectRecord) -> Result<RecordId, WriteError>;
}

/// Publishes the pending draft of one document.
#[async_trait]
pub trait PublishExecutor: Send + Sync {
    /// Publishes the draft.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError`] when the store does not publish the draft.
    async fn execute(&self) -> Result<(), PublishError>;

    /// Signals the host that the publish action has finished. Called exactly
    /// once per publish, after [`execute`](Self::execute) returns or is
    /// abandoned.
    fn complete(&self) {}
}

/// Surfaces transient confirmation messages to the editor.
pub trait NotificationSink: Send + Sync {
    /// Shows `toast`.
    fn push(&self, toast: &Toast);
}

/// One persisted redirect as returned by the redirect query: the record's
/// own fields plus the dereferenced destination document.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectDocument {
    /// Source path as stored. Kept as a plain string: records edited by hand
    /// may not pass validation and are still reported.
    pub url: String,
    /// Stored redirect type, `None` if the field is missing or unrecognised.
    #[serde(default, deserialize_with = "lenient_kind")]
    pub redirect_type: Option<RedirectKind>,
    /// Destination document, `None` when the reference dangles.
    #[serde(default)]
    pub destination: Option<DocumentSnapshot>,
}

fn lenient_kind<'de, D>(deserializer: D) -> Result<Option<RedirectKind>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = serde::Deserialize::deserialize(deserializer)?;
    Ok(raw.and_then(|s| s.parse().ok()))
}

/// Reads persisted redirect records for the batch generator.
#[async_trait]
pub trait RedirectSource: Send + Sync {
    /// Runs `query` and returns every redirect it selects, in result order.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the store cannot be queried or the result
    /// cannot be decoded.
    async fn fetch_redirects(&self, query: &str) -> Result<Vec<RedirectDocument>, SourceError>;
}
