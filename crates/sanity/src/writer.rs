//! [`RedirectRecordWriter`] over the mutate endpoint.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use redirects::{RecordId, RedirectRecord, RedirectRecordWriter, WriteError};

use crate::client::SanityClient;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MutateResponse {
    #[serde(default)]
    transaction_id: Option<String>,
    #[serde(default)]
    results: Vec<MutationResult>,
}

#[derive(Debug, Deserialize)]
struct MutationResult {
    id: String,
}

/// Mutation body creating `record` as a new document. The destination is
/// stored as a strong reference to the published document.
pub fn create_mutation(record: &RedirectRecord) -> Value {
    json!({
        "mutations": [{
            "create": {
                "_type": record.record_type.as_str(),
                "url": record.url.as_str(),
                "destination": {
                    "_type": "reference",
                    "_ref": record.destination.id.published().as_str(),
                },
                "redirectType": record.redirect_type.as_str(),
            }
        }]
    })
}

#[async_trait]
impl RedirectRecordWriter for SanityClient {
    #[instrument(skip_all, fields(url = %record.url, destination = %record.destination.id))]
    async fn create(&self, record: &RedirectRecord) -> Result<RecordId, WriteError> {
        let url = self.mutate_url()?;
        let response: MutateResponse = self.post_json(url, &create_mutation(record)).await?;
        debug!(transaction = ?response.transaction_id, "Redirect mutation committed");
        response
            .results
            .into_iter()
            .next()
            .and_then(|r| RecordId::new(r.id))
            .ok_or_else(|| WriteError::Rejected {
                message: "mutation returned no document id".into(),
            })
    }
}
