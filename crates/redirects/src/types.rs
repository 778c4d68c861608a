//! Shared value types for the redirect domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! values with invariants (a [`UrlPath`] always matches the relative-path
//! pattern, a [`RedirectDecision`] always has two distinct paths) and take part
//! in domain computations.

use std::sync::LazyLock;
use std::time::Duration;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::SchemaError;
use crate::{DocumentId, DocumentType};

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// Pattern every redirect source path must match: a leading `/`, then an
/// optional query and an optional fragment in that order.
pub const RELATIVE_URL_PATTERN: &str = r"^/[^?#]*(\?[^#]*)?(#.*)?$";

static RELATIVE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(RELATIVE_URL_PATTERN).expect("relative URL pattern compiles")
});

/// A canonical, site-relative URL path such as `/events/summer-gala`.
///
/// Never contains a scheme or host. Construct with [`UrlPath::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UrlPath(String);

impl UrlPath {
    /// Parses a relative path, rejecting anything that does not match
    /// [`RELATIVE_URL_PATTERN`].
    pub fn parse(value: impl Into<String>) -> Result<Self, SchemaError> {
        let v = value.into();
        if RELATIVE_URL.is_match(&v) {
            Ok(Self(v))
        } else {
            Err(SchemaError::InvalidUrlPath { value: v })
        }
    }

    /// Returns the path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UrlPath {
    type Error = SchemaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<UrlPath> for String {
    fn from(path: UrlPath) -> Self {
        path.0
    }
}

impl std::fmt::Display for UrlPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Redirect kind
// ---------------------------------------------------------------------------

/// Whether a redirect is permanent (301/308) or temporary (302/307).
///
/// Persisted as `"PERMANENT"` / `"TEMPORARY"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RedirectKind {
    /// The old path has moved for good. The default for every new redirect.
    #[default]
    Permanent,
    /// The old path points elsewhere for now.
    Temporary,
}

impl RedirectKind {
    /// All kinds, in the order a kind selector lists them.
    pub const ALL: [RedirectKind; 2] = [RedirectKind::Permanent, RedirectKind::Temporary];

    /// Returns the persisted representation.
    pub fn as_str(self) -> &'static str {
        match self {
            RedirectKind::Permanent => "PERMANENT",
            RedirectKind::Temporary => "TEMPORARY",
        }
    }

    /// Returns `true` for [`RedirectKind::Permanent`].
    pub fn is_permanent(self) -> bool {
        matches!(self, RedirectKind::Permanent)
    }
}

impl std::str::FromStr for RedirectKind {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PERMANENT" => Ok(RedirectKind::Permanent),
            "TEMPORARY" => Ok(RedirectKind::Temporary),
            _ => Err(SchemaError::UnknownRedirectKind {
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for RedirectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

/// A document at one point in time, as returned by the content store.
///
/// Only `_id`, `_type` and `_createdAt` are interpreted here; every other
/// attribute is kept verbatim in [`DocumentSnapshot::fields`] for the path
/// resolver registered for the document's type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    /// Document id. Drafts carry the `drafts.` prefix.
    #[serde(rename = "_id")]
    pub id: DocumentId,

    /// Document type.
    #[serde(rename = "_type")]
    pub doc_type: DocumentType,

    /// Creation time of the document, if the store reported one.
    #[serde(rename = "_createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,

    /// All remaining attributes.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl DocumentSnapshot {
    /// Creates a snapshot with no attributes beyond id and type.
    pub fn new(id: DocumentId, doc_type: DocumentType) -> Self {
        Self {
            id,
            doc_type,
            created_at: None,
            fields: Map::new(),
        }
    }

    /// Sets the creation time.
    pub fn with_created_at(mut self, created_at: Timestamp) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Sets a top-level attribute.
    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    /// Looks up an attribute by dotted path, e.g. `"slug.current"`.
    ///
    /// Returns `None` when any segment is missing or a non-object is traversed.
    pub fn field(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = self.fields.get(segments.next()?)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Returns the human-readable title stored under `title_key`, if it is a string.
    pub fn title(&self, title_key: &str) -> Option<&str> {
        self.field(title_key).and_then(Value::as_str)
    }

    /// Returns a reference to the published identity of this document.
    pub fn reference(&self) -> DocumentReference {
        DocumentReference {
            id: self.id.published(),
            doc_type: self.doc_type.clone(),
        }
    }
}

/// A pointer to a document: its published id and its type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentReference {
    /// Published id of the referenced document.
    pub id: DocumentId,
    /// Type of the referenced document.
    pub doc_type: DocumentType,
}

// ---------------------------------------------------------------------------
// Redirect decision and record
// ---------------------------------------------------------------------------

/// The outcome of detecting a path change: the document used to live at
/// `old_path` and is about to live at `new_path`.
///
/// Lives for one confirmation cycle only. `old_path` and `new_path` are
/// always different.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedirectDecision {
    /// Path currently served for the published document; becomes the redirect source.
    pub old_path: UrlPath,
    /// Path the draft will be served at once published.
    pub new_path: UrlPath,
    /// Kind proposed for the redirect. Starts as the configured default.
    pub redirect_kind: RedirectKind,
    /// The document the redirect will point at.
    pub destination: DocumentReference,
    /// Human-readable title of the destination, for display only.
    pub destination_title: Option<String>,
}

impl RedirectDecision {
    /// Builds a decision when the two paths differ.
    ///
    /// Returns `None` if `old_path == new_path`.
    pub fn between(
        old_path: UrlPath,
        new_path: UrlPath,
        redirect_kind: RedirectKind,
        destination: DocumentReference,
    ) -> Option<Self> {
        if old_path == new_path {
            return None;
        }
        Some(Self {
            old_path,
            new_path,
            redirect_kind,
            destination,
            destination_title: None,
        })
    }

    /// Attaches the destination title shown to the editor.
    pub fn with_destination_title(mut self, title: Option<String>) -> Self {
        self.destination_title = title;
        self
    }
}

/// A redirect record as persisted in the content store.
///
/// Created once per confirmed decision and never modified by this workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedirectRecord {
    /// Document type the record is stored under (the redirect schema name).
    pub record_type: DocumentType,
    /// Source path that should redirect.
    pub url: UrlPath,
    /// Document the source path redirects to.
    pub destination: DocumentReference,
    /// Permanence of the redirect.
    pub redirect_type: RedirectKind,
}

impl RedirectRecord {
    /// Shapes the record for a confirmed decision.
    pub fn for_decision(
        decision: &RedirectDecision,
        redirect_type: RedirectKind,
        record_type: DocumentType,
    ) -> Self {
        Self {
            record_type,
            url: decision.old_path.clone(),
            destination: decision.destination.clone(),
            redirect_type,
        }
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly; the underlying representation can change without affecting the
/// domain API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a [`Timestamp`] from a [`DateTime<Utc>`].
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Parses an RFC 3339 timestamp such as `2024-05-01T09:30:00Z`.
    pub fn parse_rfc3339(value: &str) -> Option<Self> {
        DateTime::parse_from_rfc3339(value)
            .ok()
            .map(|dt| Self(dt.with_timezone(&Utc)))
    }

    /// Returns the underlying [`DateTime<Utc>`].
    pub fn as_datetime(self) -> DateTime<Utc> {
        self.0
    }

    /// Time elapsed from `self` until `later`, clamped to zero when `later`
    /// is earlier.
    pub fn elapsed_until(self, later: Timestamp) -> Duration {
        (later.0 - self.0).to_std().unwrap_or(Duration::ZERO)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use serde_json::json;

    use super::*;

    #[test]
    fn url_path_accepts_relative_paths() {
        for ok in ["/", "/events/old-slug", "/a?b=c", "/a#frag", "/a?b=c#frag"] {
            assert!(UrlPath::parse(ok).is_ok(), "{ok} should be accepted");
        }
    }

    #[test]
    fn url_path_rejects_paths_without_leading_slash() {
        for bad in ["", "events", "events/a", "https://example.com/a", "?a=b", "#top"] {
            assert!(UrlPath::parse(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn url_path_deserialisation_validates() {
        let ok: Result<UrlPath, _> = serde_json::from_value(json!("/x"));
        assert!(ok.is_ok());
        let bad: Result<UrlPath, _> = serde_json::from_value(json!("x"));
        assert!(bad.is_err());
    }

    #[test]
    fn redirect_kind_round_trips_through_its_persisted_form() {
        assert_eq!(serde_json::to_value(RedirectKind::Permanent).unwrap(), json!("PERMANENT"));
        assert_eq!("temporary".parse::<RedirectKind>().unwrap(), RedirectKind::Temporary);
        assert!("forever".parse::<RedirectKind>().is_err());
        assert_eq!(RedirectKind::default(), RedirectKind::Permanent);
    }

    #[test]
    fn snapshot_deserialises_store_documents() {
        let doc: DocumentSnapshot = serde_json::from_value(json!({
            "_id": "drafts.e1",
            "_type": "event",
            "_createdAt": "2024-05-01T09:30:00Z",
            "title": "Summer gala",
            "slug": { "_type": "slug", "current": "summer-gala" }
        }))
        .unwrap();

        assert_eq!(doc.doc_type.as_str(), "event");
        assert_eq!(doc.field("slug.current"), Some(&json!("summer-gala")));
        assert_eq!(doc.field("slug.missing"), None);
        assert_eq!(doc.field("title.current"), None);
        assert_eq!(doc.title("title"), Some("Summer gala"));
        assert_eq!(
            doc.created_at,
            Timestamp::parse_rfc3339("2024-05-01T09:30:00Z")
        );

        let reference = doc.reference();
        assert_eq!(reference.id.as_str(), "e1");
        assert_eq!(reference.doc_type.as_str(), "event");
    }

    #[test]
    fn decision_requires_distinct_paths() {
        let dest = DocumentReference {
            id: DocumentId::new("e1").unwrap(),
            doc_type: DocumentType::new("event").unwrap(),
        };
        let same = UrlPath::parse("/events/a").unwrap();
        assert!(RedirectDecision::between(
            same.clone(),
            same,
            RedirectKind::Permanent,
            dest.clone()
        )
        .is_none());

        let decision = RedirectDecision::between(
            UrlPath::parse("/events/a").unwrap(),
            UrlPath::parse("/events/b").unwrap(),
            RedirectKind::Permanent,
            dest,
        )
        .unwrap();
        let record = RedirectRecord::for_decision(
            &decision,
            RedirectKind::Temporary,
            DocumentType::new("redirect").unwrap(),
        );
        assert_eq!(record.url.as_str(), "/events/a");
        assert_eq!(record.redirect_type, RedirectKind::Temporary);
        assert_eq!(record.destination.id.as_str(), "e1");
    }

    #[test]
    fn elapsed_time_is_clamped_at_zero() {
        let earlier = Timestamp::parse_rfc3339("2024-05-01T00:00:00Z").unwrap();
        let later = Timestamp::parse_rfc3339("2024-05-03T00:00:00Z").unwrap();
        assert_eq!(earlier.elapsed_until(later), Duration::from_secs(2 * 86_400));
        assert_eq!(later.elapsed_until(earlier), Duration::ZERO);
    }

    proptest! {
        #[test]
        fn url_path_validity_is_decided_by_the_leading_slash(path in "[^\n]{0,40}") {
            prop_assert_eq!(UrlPath::parse(path.clone()).is_ok(), path.starts_with('/'));
        }

        #[test]
        fn url_path_serialises_as_its_string(path in "/[a-z0-9/-]{0,30}") {
            let parsed = UrlPath::parse(path.clone()).unwrap();
            prop_assert_eq!(serde_json::to_value(&parsed).unwrap(), json!(path));
        }
    }
}
