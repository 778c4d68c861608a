//! Path resolution: from a document snapshot to its canonical URL path.
//!
//! A [`PathResolverRegistry`] maps document types to [`PathResolver`]s. Its keys
//! are the complete set of redirect-tracked types; a type with no entry is
//! never intercepted and resolves to no path in the batch generator.
//!
//! Resolvers are pure: the same snapshot always yields the same path, and
//! resolving has no side effects. Two kinds are provided out of the box:
//! closures, and [`PathTemplate`]s such as `"/events/{slug}"` for
//! configuration-file driven setups.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::errors::{ConfigError, ResolutionError};
use crate::{DocumentSnapshot, DocumentType, UrlPath};

// ---------------------------------------------------------------------------
// Resolver trait
// ---------------------------------------------------------------------------

/// Computes the canonical path of a document of one type.
///
/// `Ok(None)` means the document has no path yet (e.g. its slug is empty).
/// `Err` means the resolver is misconfigured for this document shape.
pub trait PathResolver: Send + Sync {
    /// Resolves the path of `doc`. Must be deterministic and side-effect free.
    fn resolve(&self, doc: &DocumentSnapshot) -> Result<Option<String>, ResolutionError>;
}

impl<F> PathResolver for F
where
    F: Fn(&DocumentSnapshot) -> Result<Option<String>, ResolutionError> + Send + Sync,
{
    fn resolve(&self, doc: &DocumentSnapshot) -> Result<Option<String>, ResolutionError> {
        self(doc)
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Document type → path resolver.
#[derive(Clone, Default)]
pub struct PathResolverRegistry {
    resolvers: BTreeMap<DocumentType, Arc<dyn PathResolver>>,
}

impl PathResolverRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `resolver` for `doc_type`, replacing any previous one.
    pub fn register(&mut self, doc_type: DocumentType, resolver: impl PathResolver + 'static) {
        self.resolvers.insert(doc_type, Arc::new(resolver));
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, doc_type: DocumentType, resolver: impl PathResolver + 'static) -> Self {
        self.register(doc_type, resolver);
        self
    }

    /// Returns `true` if documents of `doc_type` are redirect-tracked.
    pub fn is_tracked(&self, doc_type: &DocumentType) -> bool {
        self.resolvers.contains_key(doc_type)
    }

    /// Returns the tracked document types in sorted order.
    pub fn types(&self) -> impl Iterator<Item = &DocumentType> {
        self.resolvers.keys()
    }

    /// Returns the number of tracked types.
    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    /// Returns `true` if no type is tracked.
    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }

    /// Resolves the canonical path of `doc`.
    ///
    /// Returns `Ok(None)` when the type is not tracked or the resolver
    /// produced no path. A produced string that is not a relative URL path is
    /// a [`ResolutionError::InvalidPath`].
    pub fn resolve_path(&self, doc: &DocumentSnapshot) -> Result<Option<UrlPath>, ResolutionError> {
        let Some(resolver) = self.resolvers.get(&doc.doc_type) else {
            return Ok(None);
        };
        match resolver.resolve(doc)? {
            None => Ok(None),
            Some(path) => UrlPath::parse(path.clone())
                .map(Some)
                .map_err(|_| ResolutionError::InvalidPath {
                    doc_type: doc.doc_type.clone(),
                    path,
                }),
        }
    }
}

impl std::fmt::Debug for PathResolverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathResolverRegistry")
            .field("types", &self.resolvers.keys().collect::<Vec<_>>())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Path templates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(String),
}

/// A resolver built from a template such as `"/events/{slug}"` or
/// `"/{language}/news/{metadata.slug.current}"`.
///
/// Placeholders name dotted field paths. When rendering:
///
/// - strings are inserted as-is, numbers and booleans in their JSON form;
/// - slug objects (objects with a `current` key) insert `current`;
/// - a missing, `null` or empty value means the path cannot be computed yet
///   and the template resolves to `None`;
/// - arrays and any other object are an unexpected shape.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct PathTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    /// Parses a template.
    pub fn parse(template: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidTemplate {
            template: template.to_string(),
            reason: reason.to_string(),
        };

        let mut segments = Vec::new();
        let mut rest = template;
        while let Some(open) = rest.find('{') {
            if rest[..open].contains('}') {
                return Err(invalid("unmatched '}'"));
            }
            if open > 0 {
                segments.push(Segment::Literal(rest[..open].to_string()));
            }
            let after = &rest[open + 1..];
            let close = after.find('}').ok_or_else(|| invalid("unclosed '{'"))?;
            let field = after[..close].trim();
            if field.is_empty() {
                return Err(invalid("empty placeholder"));
            }
            if field.contains('{') {
                return Err(invalid("nested '{'"));
            }
            if field.split('.').any(str::is_empty) {
                return Err(invalid("empty field path segment"));
            }
            segments.push(Segment::Field(field.to_string()));
            rest = &after[close + 1..];
        }
        if rest.contains('}') {
            return Err(invalid("unmatched '}'"));
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }
        if !matches!(segments.first(), Some(Segment::Literal(l)) if l.starts_with('/')) {
            return Err(invalid("must start with '/'"));
        }

        Ok(Self {
            source: template.to_string(),
            segments,
        })
    }

    /// Returns the template source.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    fn render_field(
        doc: &DocumentSnapshot,
        field: &str,
    ) -> Result<Option<String>, ResolutionError> {
        let unexpected = || ResolutionError::UnexpectedShape {
            doc_type: doc.doc_type.clone(),
            field: field.to_string(),
            expected: "a string, number, boolean, or slug",
        };
        let rendered = match doc.field(field) {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Bool(b)) => b.to_string(),
            Some(Value::Object(obj)) => match obj.get("current") {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) => return Ok(None),
                None | Some(_) => return Err(unexpected()),
            },
            Some(Value::Array(_)) => return Err(unexpected()),
        };
        Ok((!rendered.is_empty()).then_some(rendered))
    }
}

impl std::str::FromStr for PathTemplate {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PathTemplate {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl std::fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

impl PathResolver for PathTemplate {
    fn resolve(&self, doc: &DocumentSnapshot) -> Result<Option<String>, ResolutionError> {
        let mut path = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(literal) => path.push_str(literal),
                Segment::Field(field) => match Self::render_field(doc, field)? {
                    Some(value) => path.push_str(&value),
                    None => return Ok(None),
                },
            }
        }
        Ok(Some(path))
    }
}
