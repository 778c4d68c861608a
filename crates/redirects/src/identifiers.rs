//! Newtype domain identifiers.
//!
//! Every concept with an identity is a distinct newtype wrapping a primitive, so
//! a [`DocumentId`] can never be passed where a [`DocumentType`] or a
//! [`RecordId`] is expected even though all three are strings underneath.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prefix the content store puts in front of the id of a document's draft.
pub const DRAFTS_PREFIX: &str = "drafts.";

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// String-backed identifiers (assigned by the content store)
// ---------------------------------------------------------------------------

string_id! {
    /// Identifies a document in the content store (`_id`).
    ///
    /// A draft carries the id of its published counterpart prefixed with
    /// [`DRAFTS_PREFIX`]; use [`DocumentId::published`] to get the stable id.
    DocumentId
}

impl DocumentId {
    /// Returns `true` if this is the id of a draft.
    pub fn is_draft(&self) -> bool {
        self.0.starts_with(DRAFTS_PREFIX)
    }

    /// Returns the id of the published document this id belongs to.
    ///
    /// Published ids are returned unchanged.
    pub fn published(&self) -> DocumentId {
        match self.0.strip_prefix(DRAFTS_PREFIX) {
            Some(rest) if !rest.is_empty() => Self(rest.to_string()),
            _ => self.clone(),
        }
    }

    /// Returns the id of the draft that belongs to this document.
    pub fn draft(&self) -> DocumentId {
        if self.is_draft() {
            self.clone()
        } else {
            Self(format!("{DRAFTS_PREFIX}{}", self.0))
        }
    }
}

string_id! {
    /// Identifies a document type (`_type`), e.g. `"event"` or `"page"`.
    ///
    /// The keys of the path resolver registry are document types; only types
    /// present there are redirect-tracked.
    DocumentType
}

string_id! {
    /// Identifies a redirect record created in the content store.
    ///
    /// Returned by [`crate::RedirectRecordWriter::create`] once the write is
    /// acknowledged.
    RecordId
}

// ---------------------------------------------------------------------------
// UUID-backed identifiers (internally generated)
// ---------------------------------------------------------------------------

/// Identifies one confirmation cycle: a single publish attempt traversing the
/// decision state machine from idle back to idle.
///
/// Generated fresh for every publish request and attached to every span and
/// event of that cycle so the write and the publish can be correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CycleId(Uuid);

impl CycleId {
    /// Generates a new random cycle identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a [`CycleId`] from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the underlying [`Uuid`].
    pub fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for CycleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_identifiers_are_rejected() {
        assert!(DocumentId::new("").is_none());
        assert!(DocumentType::new("").is_none());
        assert!(RecordId::new("").is_none());
    }

    #[test]
    fn draft_ids_map_to_their_published_id() {
        let draft = DocumentId::new("drafts.abc123").unwrap();
        assert!(draft.is_draft());
        assert_eq!(draft.published().as_str(), "abc123");
        assert_eq!(draft.draft(), draft);
    }

    #[test]
    fn published_ids_are_stable() {
        let published = DocumentId::new("abc123").unwrap();
        assert!(!published.is_draft());
        assert_eq!(published.published(), published);
        assert_eq!(published.draft().as_str(), "drafts.abc123");
    }

    #[test]
    fn bare_drafts_prefix_is_left_alone() {
        let odd = DocumentId::new("drafts.").unwrap();
        assert_eq!(odd.published().as_str(), "drafts.");
    }
}
