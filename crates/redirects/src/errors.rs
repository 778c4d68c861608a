//! Error and retry-policy types for the redirect domain.
//!
//! Each port and each domain concern has its own error type so that callers can
//! tell a configuration defect ([`ResolutionError`], [`ConfigError`]) from a
//! runtime failure at a network boundary ([`WriteError`], [`PublishError`],
//! [`SourceError`]). [`RedirectError`] aggregates them for callers that only
//! need to report.
//!
//! [`RetryPolicy`] is a cross-cutting concern: any error produced at a network
//! boundary must be able to produce a [`RetryPolicy`].

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::DocumentType;

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether an error condition is safe to retry and, if so, after what delay.
///
/// Nothing in this workspace retries automatically; the policy is surfaced so
/// the editor (or an operator) knows whether re-invoking publish can help.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// The operation may be retried.
    Retryable {
        /// Minimum back-off before the next attempt, when the store sent one.
        after: Option<Duration>,
    },
    /// Retrying the same request will fail the same way.
    NonRetryable,
}

// ---------------------------------------------------------------------------
// Configuration defects
// ---------------------------------------------------------------------------

/// A path resolver could not produce a path for a snapshot.
///
/// Always a configuration defect: it is propagated to the caller and never
/// treated as "path unchanged".
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolutionError {
    /// A field the resolver reads holds a value of the wrong shape.
    #[error("field '{field}' of {doc_type} has unexpected shape: expected {expected}")]
    UnexpectedShape {
        /// Type of the document being resolved.
        doc_type: DocumentType,
        /// Dotted path of the offending field.
        field: String,
        /// What the resolver expected to find there.
        expected: &'static str,
    },

    /// The resolver produced a string that is not a relative URL path.
    #[error("resolver for {doc_type} produced invalid path '{path}'")]
    InvalidPath {
        /// Type of the document being resolved.
        doc_type: DocumentType,
        /// The rejected value.
        path: String,
    },

    /// A custom resolver reported a failure of its own.
    #[error("resolver for {doc_type} failed: {message}")]
    Failed {
        /// Type of the document being resolved.
        doc_type: DocumentType,
        /// Description supplied by the resolver.
        message: String,
    },
}

/// A value violates the redirect record schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Not a relative URL path.
    #[error("'{value}' is not a valid URL path; enter a path without the domain, starting with '/'")]
    InvalidUrlPath {
        /// The rejected value.
        value: String,
    },

    /// Not one of `PERMANENT` / `TEMPORARY`.
    #[error("unknown redirect type '{value}'")]
    UnknownRedirectKind {
        /// The rejected value.
        value: String,
    },

    /// The destination's type is not one the schema allows references to.
    #[error("destination type '{doc_type}' is not redirect-tracked")]
    DestinationNotAllowed {
        /// Type of the referenced document.
        doc_type: DocumentType,
    },
}

/// Invalid plugin configuration. Produced once, at construction time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// No document type has a path resolver, so nothing would be tracked.
    #[error("at least one path resolver must be configured")]
    NoPathResolvers,

    /// A required string option was empty.
    #[error("option '{option}' must not be empty")]
    EmptyOption {
        /// Name of the option, as written in configuration.
        option: &'static str,
    },

    /// The toast duration was zero.
    #[error("toast duration must be greater than zero")]
    ZeroToastDuration,

    /// A path template could not be parsed.
    #[error("invalid path template '{template}': {reason}")]
    InvalidTemplate {
        /// The template source.
        template: String,
        /// What is wrong with it.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// Port errors
// ---------------------------------------------------------------------------

/// Creating a redirect record failed. Publish must not proceed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WriteError {
    /// The record failed schema validation before it was sent.
    #[error("redirect record rejected: {0}")]
    Invalid(#[from] SchemaError),

    /// The store was unreachable or answered with a server error.
    #[error("content store unavailable: {message}")]
    Unavailable {
        /// Transport or server message.
        message: String,
        /// Whether trying again may succeed.
        retry: RetryPolicy,
    },

    /// The store refused the mutation.
    #[error("content store rejected redirect record: {message}")]
    Rejected {
        /// Message returned by the store.
        message: String,
    },
}

impl WriteError {
    /// Returns whether the write may be retried.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            WriteError::Unavailable { retry, .. } => retry.clone(),
            WriteError::Invalid(_) | WriteError::Rejected { .. } => RetryPolicy::NonRetryable,
        }
    }
}

/// Executing the publish failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PublishError {
    /// The store was unreachable or answered with a server error.
    #[error("publish unavailable: {message}")]
    Unavailable {
        /// Transport or server message.
        message: String,
        /// Whether trying again may succeed.
        retry: RetryPolicy,
    },

    /// The store refused to publish the draft.
    #[error("publish rejected: {message}")]
    Rejected {
        /// Message returned by the store.
        message: String,
    },
}

impl PublishError {
    /// Returns whether the publish may be retried.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            PublishError::Unavailable { retry, .. } => retry.clone(),
            PublishError::Rejected { .. } => RetryPolicy::NonRetryable,
        }
    }
}

/// Fetching redirect documents for the batch generator failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SourceError {
    /// The store was unreachable or answered with a server error.
    #[error("content store unavailable: {message}")]
    Unavailable {
        /// Transport or server message.
        message: String,
    },

    /// The query result did not have the expected shape.
    #[error("unexpected query result: {message}")]
    Malformed {
        /// What failed to decode.
        message: String,
    },
}

// ---------------------------------------------------------------------------
// Aggregate
// ---------------------------------------------------------------------------

/// Any failure raised by the redirect domain.
#[derive(Debug, Error)]
pub enum RedirectError {
    /// See [`ResolutionError`].
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// See [`SchemaError`].
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// See [`ConfigError`].
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// See [`WriteError`].
    #[error(transparent)]
    Write(#[from] WriteError),

    /// See [`PublishError`].
    #[error(transparent)]
    Publish(#[from] PublishError),

    /// See [`SourceError`].
    #[error(transparent)]
    Source(#[from] SourceError),
}
