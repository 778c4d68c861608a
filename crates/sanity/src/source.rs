//! Reads: the redirect query for the batch generator and the draft/published
//! snapshot pair for a publish request.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

use redirects::{DocumentId, DocumentSnapshot, RedirectDocument, RedirectSource, SourceError};

use crate::client::{SanityClient, SanityError};

#[derive(Debug, Deserialize)]
struct QueryResponse<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
struct DocResponse {
    #[serde(default)]
    documents: Vec<DocumentSnapshot>,
}

/// Draft and published snapshots of one document, as a publish request
/// needs them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentVersions {
    /// The pending draft, if any.
    pub draft: Option<DocumentSnapshot>,
    /// The live version, if the document was ever published.
    pub published: Option<DocumentSnapshot>,
}

impl DocumentVersions {
    fn from_documents(documents: Vec<DocumentSnapshot>) -> Self {
        documents
            .into_iter()
            .fold(Self::default(), |mut versions, doc| {
                if doc.id.is_draft() {
                    versions.draft = Some(doc);
                } else {
                    versions.published = Some(doc);
                }
                versions
            })
    }
}

impl SanityClient {
    /// Fetches both versions of the document `id` (draft or published id).
    ///
    /// # Errors
    ///
    /// Any [`SanityError`] from the request or response decoding.
    #[instrument(skip(self), fields(document = %id))]
    pub async fn fetch_versions(&self, id: &DocumentId) -> Result<DocumentVersions, SanityError> {
        let draft = id.draft();
        let published = id.published();
        let url = self.doc_url(&[draft.as_str(), published.as_str()])?;
        let response: DocResponse = self.get_json(url).await?;
        let versions = DocumentVersions::from_documents(response.documents);
        debug!(
            has_draft = versions.draft.is_some(),
            has_published = versions.published.is_some(),
            "Fetched document versions"
        );
        Ok(versions)
    }
}

#[async_trait]
impl RedirectSource for SanityClient {
    #[instrument(skip(self))]
    async fn fetch_redirects(&self, query: &str) -> Result<Vec<RedirectDocument>, SourceError> {
        let url = self.query_url(query)?;
        let response: QueryResponse<Vec<RedirectDocument>> = self.get_json(url).await?;
        debug!(count = response.result.len(), "Fetched redirect records");
        Ok(response.result)
    }
}
