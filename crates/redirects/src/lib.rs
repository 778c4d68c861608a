//! Redirect domain for publish-time redirect creation.
//!
//! This crate holds every domain concept the workflow needs: document
//! snapshots, canonical paths and how they are resolved, redirect decisions
//! and records, the redirect schema contribution, batch redirect list
//! generation, and the port traits infrastructure crates implement.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* is needed; `sanity` defines *how* to supply it over HTTP
//! and `publish-action` sequences the calls.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`DocumentId`, `DocumentType`, `RecordId`, `CycleId`) |
//! | [`types`] | Value types (`UrlPath`, `DocumentSnapshot`, `RedirectDecision`, `RedirectRecord`, …) |
//! | [`errors`] | Error taxonomy and retry policy |
//! | [`resolvers`] | `PathResolver`, the resolver registry, path templates |
//! | [`config`] | Option parsing and one-shot configuration resolution |
//! | [`schema`] | Redirect document type contribution and record validation |
//! | [`ports`] | Writer, publisher, notification, and source traits |
//! | [`batch`] | Redirect list generation |

pub mod batch;
pub mod config;
pub mod errors;
pub mod identifiers;
pub mod ports;
pub mod resolvers;
pub mod schema;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use batch::{default_redirect_query, generate_redirects, project_redirects, RedirectEntry};
pub use config::{
    RedirectConfig, RedirectConfigBuilder, RedirectOptions, Toast, ToastOptions,
    DEFAULT_API_VERSION, DEFAULT_DOCUMENT_TITLE_KEY, DEFAULT_REDIRECT_SCHEMA_NAME,
    DEFAULT_TOAST_DURATION,
};
pub use errors::{
    ConfigError, PublishError, RedirectError, ResolutionError, RetryPolicy, SchemaError,
    SourceError, WriteError,
};
pub use identifiers::{CycleId, DocumentId, DocumentType, RecordId, DRAFTS_PREFIX};
pub use ports::{
    NotificationSink, PublishExecutor, RedirectDocument, RedirectRecordWriter, RedirectSource,
};
pub use resolvers::{PathResolver, PathResolverRegistry, PathTemplate};
pub use schema::{
    effective_redirect_schema, redirect_schema, with_redirect_schema, FieldDefinition, FieldType,
    SchemaType,
};
pub use types::{
    DocumentReference, DocumentSnapshot, RedirectDecision, RedirectKind, RedirectRecord,
    Timestamp, UrlPath, RELATIVE_URL_PATTERN,
};
