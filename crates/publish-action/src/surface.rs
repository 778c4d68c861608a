//! Confirmation surface contract.
//!
//! When a publish would move a document to a new path, the engine shows a
//! [`ConfirmationPrompt`] on a [`ConfirmationSurface`] and waits. The surface
//! reports the editor's choice back as one [`UserDecision`] through
//! [`crate::PublishAndCreateRedirect::resolve`]. The engine makes no
//! assumption about how the prompt is rendered.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use redirects::{DocumentReference, RedirectDecision, RedirectKind, UrlPath};
use serde::Serialize;

use crate::dialog::DialogModel;

/// Everything a surface needs to render the confirmation step.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationPrompt {
    /// Path the redirect will be created from (the current published path).
    pub redirect_path: UrlPath,
    /// Path the document is moving to.
    pub destination_path: UrlPath,
    /// The document being published.
    pub destination: DocumentReference,
    /// Human-readable title of the document, when it has one.
    pub destination_title: Option<String>,
    /// Age of the published document. Advisory only.
    pub time_since_created: Option<Duration>,
    /// Kind preselected in the kind selector.
    pub redirect_kind: RedirectKind,
    /// Whether the kind selector should be hidden.
    pub hide_kind_selector: bool,
    /// Error from the last confirmation attempt, shown inline.
    pub error: Option<String>,
}

impl ConfirmationPrompt {
    pub(crate) fn for_decision(
        decision: &RedirectDecision,
        time_since_created: Option<Duration>,
        hide_kind_selector: bool,
    ) -> Self {
        Self {
            redirect_path: decision.old_path.clone(),
            destination_path: decision.new_path.clone(),
            destination: decision.destination.clone(),
            destination_title: decision.destination_title.clone(),
            time_since_created,
            redirect_kind: decision.redirect_kind,
            hide_kind_selector,
            error: None,
        }
    }
}

/// The editor's answer to a [`ConfirmationPrompt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserDecision {
    /// Create a redirect of the given kind, then publish.
    Confirm(RedirectKind),
    /// Publish without creating a redirect.
    PublishWithoutRedirect,
    /// Close the prompt; nothing is written or published.
    Cancel,
}

/// Renders confirmation prompts.
///
/// Implementations must be cheap and non-blocking: they are called from the
/// engine between awaits.
pub trait ConfirmationSurface: Send + Sync {
    /// Shows `prompt`, or replaces the prompt already shown (e.g. to add an
    /// inline error).
    fn show(&self, prompt: &ConfirmationPrompt);

    /// Hides the prompt.
    fn close(&self);
}

/// Headless default surface: keeps the [`DialogModel`] of the open prompt for
/// the host to render.
#[derive(Debug, Default)]
pub struct DefaultDialogBox {
    current: Mutex<Option<DialogModel>>,
}

impl DefaultDialogBox {
    /// Creates a closed dialog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a closed dialog behind an `Arc`, ready to hand to the engine.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Returns the model of the open dialog, or `None` when closed.
    pub fn current(&self) -> Option<DialogModel> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ConfirmationSurface for DefaultDialogBox {
    fn show(&self, prompt: &ConfirmationPrompt) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(DialogModel::from_prompt(prompt));
    }

    fn close(&self) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}
