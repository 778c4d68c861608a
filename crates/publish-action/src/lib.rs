//! Publish interception with redirect creation.
//!
//! This crate wraps a document's publish action. When publishing would change
//! the document's canonical path, it asks the editor whether to create a
//! redirect from the old path first, and sequences the record write, the toast
//! and the publish so that each happens at most once and in that order.
//!
//! ## Architectural Layer
//!
//! **Orchestration layer.** The engine sequences calls between the domain
//! rules in [`redirects`] and the host capabilities behind its port traits.
//! It contains no transport code and no rendering.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`engine`] | `PublishAndCreateRedirect`, its states, outcomes and errors |
//! | [`surface`] | Confirmation surface contract and the headless default dialog |
//! | [`dialog`] | Text and buttons of the default dialog |
//! | [`plugin`] | Plugin entry point: interception and schema contribution |

pub mod dialog;
pub mod engine;
pub mod plugin;
pub mod surface;

pub use dialog::{DialogAction, DialogButton, DialogModel, Tone};
pub use engine::{
    time_since_created, ActionDescriptor, ActionPorts, Clock, DialogState, DirectPublishReason,
    EngineError, EngineState, Outcome, PublishAndCreateRedirect,
};
pub use plugin::{DialogBoxFactory, RedirectPlugin, PLUGIN_NAME};
pub use surface::{ConfirmationPrompt, ConfirmationSurface, DefaultDialogBox, UserDecision};
