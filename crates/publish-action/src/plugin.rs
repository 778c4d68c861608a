//! Plugin entry point: decides which publish actions are intercepted and
//! contributes the redirect schema.

use std::sync::Arc;

use redirects::{
    default_redirect_query, with_redirect_schema, DocumentReference, RedirectConfig, SchemaType,
};

use crate::engine::{ActionPorts, PublishAndCreateRedirect};
use crate::surface::{ConfirmationSurface, DefaultDialogBox};

/// Name the plugin registers under.
pub const PLUGIN_NAME: &str = "sanity-plugin-next-redirects";

/// Builds the confirmation surface for one document's action.
pub type DialogBoxFactory =
    Arc<dyn Fn(&DocumentReference) -> Arc<dyn ConfirmationSurface> + Send + Sync>;

/// The installed plugin.
#[derive(Clone)]
pub struct RedirectPlugin {
    config: Arc<RedirectConfig>,
    dialog_box: DialogBoxFactory,
}

impl RedirectPlugin {
    /// Installs the plugin with the default dialog.
    pub fn new(config: RedirectConfig) -> Self {
        Self {
            config: Arc::new(config),
            dialog_box: Arc::new(|_: &DocumentReference| -> Arc<dyn ConfirmationSurface> {
                DefaultDialogBox::shared()
            }),
        }
    }

    /// Replaces the default dialog.
    pub fn with_dialog_box(mut self, factory: DialogBoxFactory) -> Self {
        self.dialog_box = factory;
        self
    }

    /// The resolved configuration.
    pub fn config(&self) -> &Arc<RedirectConfig> {
        &self.config
    }

    /// Whether the publish action of `document` is intercepted.
    pub fn intercepts(&self, document: &DocumentReference) -> bool {
        self.config.resolvers().is_tracked(&document.doc_type)
    }

    /// Wraps the publish action of `document`.
    ///
    /// Returns `None` for untracked types: the host keeps its own publish
    /// action for those.
    pub fn publish_action(
        &self,
        document: DocumentReference,
        ports: ActionPorts,
    ) -> Option<PublishAndCreateRedirect> {
        if !self.intercepts(&document) {
            return None;
        }
        let surface = (self.dialog_box)(&document);
        Some(PublishAndCreateRedirect::new(
            document,
            Arc::clone(&self.config),
            ports,
            surface,
        ))
    }

    /// Adds the redirect document type to the host's schema.
    pub fn schema_types(&self, existing: Vec<SchemaType>) -> Vec<SchemaType> {
        with_redirect_schema(existing, &self.config)
    }

    /// Query the batch generator uses by default.
    pub fn redirect_query(&self) -> String {
        default_redirect_query(self.config.redirect_schema_name())
    }
}

impl std::fmt::Debug for RedirectPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedirectPlugin")
            .field("name", &PLUGIN_NAME)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
