//! [`PublishExecutor`] over the document actions endpoint.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info, instrument};

use redirects::{DocumentId, PublishError, PublishExecutor};

use crate::client::SanityClient;

const PUBLISH_ACTION: &str = "sanity.action.document.publish";

/// Action body publishing the draft of `id`.
pub fn publish_action(id: &DocumentId) -> Value {
    json!({
        "actions": [{
            "actionType": PUBLISH_ACTION,
            "draftId": id.draft().as_str(),
            "publishedId": id.published().as_str(),
        }]
    })
}

/// Publishes the draft of one document.
#[derive(Debug, Clone)]
pub struct SanityPublisher {
    client: SanityClient,
    document: DocumentId,
}

impl SanityPublisher {
    /// Publisher for `document` (draft or published id).
    pub fn new(client: SanityClient, document: DocumentId) -> Self {
        Self {
            document: document.published(),
            client,
        }
    }
}

#[async_trait]
impl PublishExecutor for SanityPublisher {
    #[instrument(skip(self), fields(document = %self.document))]
    async fn execute(&self) -> Result<(), PublishError> {
        let url = self.client.actions_url()?;
        let _: Value = self
            .client
            .post_json(url, &publish_action(&self.document))
            .await?;
        info!("Draft published");
        Ok(())
    }

    fn complete(&self) {
        debug!(document = %self.document, "Publish action finished");
    }
}
