//! Content store adapter.
//!
//! Implements the [`redirects`] port traits over the Sanity HTTP data API:
//! [`redirects::RedirectRecordWriter`] and [`redirects::RedirectSource`] on
//! [`SanityClient`], and [`redirects::PublishExecutor`] on [`SanityPublisher`].
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** HTTP transport, authentication, request shaping,
//! response decoding and status-to-retry mapping live here. The [`redirects`]
//! and `publish-action` crates see only the port traits.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`client`] | `SanityClient`, `SanitySettings`, `SanityError`, endpoints |
//! | [`writer`] | Redirect record creation (mutate endpoint) |
//! | [`source`] | Redirect query and draft/published snapshot fetch |
//! | [`publisher`] | Draft publishing (actions endpoint) |

pub mod client;
pub mod publisher;
pub mod source;
pub mod writer;

pub use client::{SanityClient, SanityError, SanitySettings};
pub use publisher::{publish_action, SanityPublisher};
pub use source::DocumentVersions;
pub use writer::create_mutation;
