//! Batch redirect list generation.
//!
//! Projects every persisted redirect into the flat `{source, destination,
//! permanent}` form static hosts and frameworks consume, resolving each
//! destination document through the same [`PathResolverRegistry`] the publish
//! workflow uses.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::errors::{RedirectError, ResolutionError};
use crate::ports::{RedirectDocument, RedirectSource};
use crate::resolvers::PathResolverRegistry;
use crate::{DocumentType, RedirectKind};

/// One entry of the generated redirect list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectEntry {
    /// Path that redirects.
    pub source: String,
    /// Path it redirects to. `None` when the destination's type has no
    /// resolver, the reference dangles, or the resolver produced no path;
    /// the entry is still emitted so the caller can report it.
    pub destination: Option<String>,
    /// `true` iff the stored redirect type is `PERMANENT`.
    pub permanent: bool,
}

/// Query selecting every redirect record of `schema_name` with its
/// destination dereferenced.
pub fn default_redirect_query(schema_name: &DocumentType) -> String {
    format!("*[_type == '{schema_name}']{{..., destination->}}")
}

/// Projects fetched redirect documents, preserving their order.
///
/// # Errors
///
/// A destination whose registered resolver fails aborts the whole projection
/// with that [`ResolutionError`]; a partial list would hide the defect.
pub fn project_redirects(
    documents: &[RedirectDocument],
    resolvers: &PathResolverRegistry,
) -> Result<Vec<RedirectEntry>, ResolutionError> {
    documents
        .iter()
        .map(|doc| {
            let destination = match &doc.destination {
                Some(dest) => resolvers.resolve_path(dest)?.map(String::from),
                None => None,
            };
            if destination.is_none() {
                warn!(source = %doc.url, "Redirect has no resolvable destination");
            }
            Ok(RedirectEntry {
                source: doc.url.clone(),
                destination,
                permanent: doc.redirect_type == Some(RedirectKind::Permanent),
            })
        })
        .collect()
}

/// Fetches every redirect from `source` and projects it.
///
/// `query` overrides [`default_redirect_query`]; it must still project the
/// destination's `_id` and `_type`.
#[instrument(skip(source, resolvers))]
pub async fn generate_redirects(
    source: &dyn RedirectSource,
    resolvers: &PathResolverRegistry,
    schema_name: &DocumentType,
    query: Option<&str>,
) -> Result<Vec<RedirectEntry>, RedirectError> {
    let query = query
        .map(str::to_string)
        .unwrap_or_else(|| default_redirect_query(schema_name));
    let documents = source.fetch_redirects(&query).await?;
    debug!(count = documents.len(), "Fetched redirect documents");
    Ok(project_redirects(&documents, resolvers)?)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::errors::SourceError;
    use crate::resolvers::PathTemplate;

    struct FixedSource {
        documents: Vec<RedirectDocument>,
        queries: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl RedirectSource for FixedSource {
        async fn fetch_redirects(&self, query: &str) -> Result<Vec<RedirectDocument>, SourceError> {
            self.queries.lock().unwrap().push(query.to_string());
            Ok(self.documents.clone())
        }
    }

    fn registry() -> PathResolverRegistry {
        PathResolverRegistry::new().with(
            DocumentType::new("event").unwrap(),
            PathTemplate::parse("/events/{slug.current}").unwrap(),
        )
    }

    fn documents() -> Vec<RedirectDocument> {
        serde_json::from_value(json!([
            {
                "url": "/events/old-gala",
                "redirectType": "PERMANENT",
                "destination": { "_id": "e1", "_type": "event", "slug": { "current": "gala" } }
            },
            {
                "url": "/about-us",
                "redirectType": "TEMPORARY",
                "destination": { "_id": "p1", "_type": "page", "slug": { "current": "about" } }
            },
            {
                "url": "/events/gone",
                "redirectType": "PERMANENT",
                "destination": null
            },
            {
                "url": "/events/odd",
                "redirectType": "sometimes",
                "destination": { "_id": "e2", "_type": "event", "slug": { "current": "odd" } }
            }
        ]))
        .unwrap()
    }

    #[test]
    fn projection_keeps_order_and_emits_unresolved_destinations() {
        let entries = project_redirects(&documents(), &registry()).unwrap();
        assert_eq!(
            entries,
            vec![
                RedirectEntry {
                    source: "/events/old-gala".into(),
                    destination: Some("/events/gala".into()),
                    permanent: true,
                },
                RedirectEntry {
                    source: "/about-us".into(),
                    destination: None,
                    permanent: false,
                },
                RedirectEntry {
                    source: "/events/gone".into(),
                    destination: None,
                    permanent: true,
                },
                RedirectEntry {
                    source: "/events/odd".into(),
                    destination: Some("/events/odd".into()),
                    permanent: false,
                },
            ]
        );
    }

    #[test]
    fn resolver_failures_abort_the_projection() {
        let docs: Vec<RedirectDocument> = serde_json::from_value(json!([{
            "url": "/events/x",
            "redirectType": "PERMANENT",
            "destination": { "_id": "e1", "_type": "event", "slug": { "current": ["a"] } }
        }]))
        .unwrap();
        assert!(project_redirects(&docs, &registry()).is_err());
    }

    #[tokio::test]
    async fn generation_uses_the_default_query_unless_overridden() {
        let source = FixedSource {
            documents: documents(),
            queries: Mutex::new(Vec::new()),
        };
        let name = DocumentType::new("redirect").unwrap();

        let entries = generate_redirects(&source, &registry(), &name, None)
            .await
            .unwrap();
        assert_eq!(entries.len(), 4);

        generate_redirects(&source, &registry(), &name, Some("*[_type == 'r']"))
            .await
            .unwrap();

        let queries = source.queries.lock().unwrap();
        assert_eq!(queries[0], "*[_type == 'redirect']{..., destination->}");
        assert_eq!(queries[1], "*[_type == 'r']");
    }
}
