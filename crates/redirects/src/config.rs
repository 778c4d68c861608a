//! Plugin configuration.
//!
//! Options arrive in two halves: scalar options that can live in a file
//! ([`RedirectOptions`], deserialisable with camelCase keys) and code-level
//! options (the resolver registry, a replacement redirect schema). Both are
//! combined exactly once by [`RedirectConfigBuilder::build`], which applies
//! every default and validates the result. The [`RedirectConfig`] it returns is
//! immutable and is shared behind an `Arc` for the plugin's lifetime.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;
use crate::resolvers::PathResolverRegistry;
use crate::schema::SchemaType;
use crate::{DocumentType, RedirectKind};

/// Content store API version used when none is configured.
pub const DEFAULT_API_VERSION: &str = "2025-07-16";

/// Document type redirect records are stored under when none is configured.
pub const DEFAULT_REDIRECT_SCHEMA_NAME: &str = "redirect";

/// Field holding a document's human-readable title when none is configured.
pub const DEFAULT_DOCUMENT_TITLE_KEY: &str = "title";

/// How long the confirmation toast stays up when no duration is configured.
pub const DEFAULT_TOAST_DURATION: Duration = Duration::from_millis(10_000);

// ---------------------------------------------------------------------------
// File-level options
// ---------------------------------------------------------------------------

/// Toast shown after a redirect record has been created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToastOptions {
    /// Message title.
    pub title: String,
    /// Display time in milliseconds; defaults to [`DEFAULT_TOAST_DURATION`].
    #[serde(default)]
    pub duration: Option<u64>,
}

/// Scalar plugin options. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RedirectOptions {
    /// Content store API version the record writer is bound to.
    #[serde(default)]
    pub api_version: Option<String>,

    /// Toast shown after a redirect record is created. No toast when absent.
    #[serde(default)]
    pub toast_message: Option<ToastOptions>,

    /// Field used for the destination's human-readable title.
    #[serde(default)]
    pub document_title_key: Option<String>,

    /// Hide the redirect kind selector; every redirect uses the default kind.
    #[serde(default)]
    pub hide_redirect_type: bool,

    /// Kind proposed for new redirects.
    #[serde(default)]
    pub default_redirect_type: Option<RedirectKind>,

    /// Document type redirect records are stored under.
    #[serde(default)]
    pub redirect_schema_name: Option<String>,

    /// Create the redirect without asking whenever a path changes.
    #[serde(default)]
    pub suppress_dialog: bool,

    /// Log every state transition at `info` level.
    #[serde(default)]
    pub debug: bool,
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// A toast message with its duration resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    /// Message title.
    pub title: String,
    /// Display time.
    pub duration: Duration,
}

/// Fully resolved plugin configuration.
#[derive(Debug, Clone)]
pub struct RedirectConfig {
    resolvers: PathResolverRegistry,
    api_version: String,
    toast: Option<Toast>,
    document_title_key: String,
    hide_redirect_type: bool,
    default_redirect_kind: RedirectKind,
    redirect_schema_name: DocumentType,
    custom_redirect_schema: Option<SchemaType>,
    suppress_dialog: bool,
    debug: bool,
}

impl RedirectConfig {
    /// Starts building a configuration around the resolver registry.
    pub fn builder(resolvers: PathResolverRegistry) -> RedirectConfigBuilder {
        RedirectConfigBuilder {
            resolvers,
            options: RedirectOptions::default(),
            custom_redirect_schema: None,
        }
    }

    /// Resolves `options` against `resolvers` in one step.
    pub fn from_options(
        resolvers: PathResolverRegistry,
        options: RedirectOptions,
    ) -> Result<Self, ConfigError> {
        Self::builder(resolvers).options(options).build()
    }

    /// Path resolvers; their keys are the redirect-tracked document types.
    pub fn resolvers(&self) -> &PathResolverRegistry {
        &self.resolvers
    }

    /// Content store API version.
    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Toast to push after a redirect is created, if any.
    pub fn toast(&self) -> Option<&Toast> {
        self.toast.as_ref()
    }

    /// Field holding a document's human-readable title.
    pub fn document_title_key(&self) -> &str {
        &self.document_title_key
    }

    /// Whether the kind selector is hidden.
    pub fn hide_redirect_type(&self) -> bool {
        self.hide_redirect_type
    }

    /// Kind proposed for new redirects.
    pub fn default_redirect_kind(&self) -> RedirectKind {
        self.default_redirect_kind
    }

    /// Document type redirect records are stored under.
    pub fn redirect_schema_name(&self) -> &DocumentType {
        &self.redirect_schema_name
    }

    /// Replacement redirect schema, if one was supplied.
    pub fn custom_redirect_schema(&self) -> Option<&SchemaType> {
        self.custom_redirect_schema.as_ref()
    }

    /// Whether confirmation is skipped.
    pub fn suppress_dialog(&self) -> bool {
        self.suppress_dialog
    }

    /// Whether transitions are traced verbosely.
    pub fn debug(&self) -> bool {
        self.debug
    }
}

/// Builder for [`RedirectConfig`].
#[derive(Debug)]
pub struct RedirectConfigBuilder {
    resolvers: PathResolverRegistry,
    options: RedirectOptions,
    custom_redirect_schema: Option<SchemaType>,
}

impl RedirectConfigBuilder {
    /// Replaces all scalar options.
    pub fn options(mut self, options: RedirectOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the content store API version.
    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.options.api_version = Some(version.into());
        self
    }

    /// Sets the toast shown after a redirect is created.
    pub fn toast(mut self, title: impl Into<String>, duration: Option<Duration>) -> Self {
        self.options.toast_message = Some(ToastOptions {
            title: title.into(),
            duration: duration.map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
        });
        self
    }

    /// Sets the field holding a document's title.
    pub fn document_title_key(mut self, key: impl Into<String>) -> Self {
        self.options.document_title_key = Some(key.into());
        self
    }

    /// Hides the kind selector.
    pub fn hide_redirect_type(mut self, hide: bool) -> Self {
        self.options.hide_redirect_type = hide;
        self
    }

    /// Sets the kind proposed for new redirects.
    pub fn default_redirect_kind(mut self, kind: RedirectKind) -> Self {
        self.options.default_redirect_type = Some(kind);
        self
    }

    /// Sets the document type redirect records are stored under.
    pub fn redirect_schema_name(mut self, name: impl Into<String>) -> Self {
        self.options.redirect_schema_name = Some(name.into());
        self
    }

    /// Replaces the generated redirect schema.
    pub fn custom_redirect_schema(mut self, schema: SchemaType) -> Self {
        self.custom_redirect_schema = Some(schema);
        self
    }

    /// Skips confirmation.
    pub fn suppress_dialog(mut self, suppress: bool) -> Self {
        self.options.suppress_dialog = suppress;
        self
    }

    /// Enables verbose transition tracing.
    pub fn debug(mut self, debug: bool) -> Self {
        self.options.debug = debug;
        self
    }

    /// Applies defaults and validates.
    pub fn build(self) -> Result<RedirectConfig, ConfigError> {
        let RedirectOptions {
            api_version,
            toast_message,
            document_title_key,
            hide_redirect_type,
            default_redirect_type,
            redirect_schema_name,
            suppress_dialog,
            debug,
        } = self.options;

        if self.resolvers.is_empty() {
            return Err(ConfigError::NoPathResolvers);
        }

        let api_version = non_empty("apiVersion", api_version, DEFAULT_API_VERSION)?;
        let document_title_key =
            non_empty("documentTitleKey", document_title_key, DEFAULT_DOCUMENT_TITLE_KEY)?;

        // A custom schema decides the record type name unless one was given explicitly.
        let schema_name = match (redirect_schema_name, &self.custom_redirect_schema) {
            (Some(name), _) => name,
            (None, Some(custom)) => custom.name.clone(),
            (None, None) => DEFAULT_REDIRECT_SCHEMA_NAME.to_string(),
        };
        let redirect_schema_name = DocumentType::new(schema_name).ok_or(ConfigError::EmptyOption {
            option: "redirectSchemaName",
        })?;

        let toast = match toast_message {
            None => None,
            Some(ToastOptions { title, duration }) => {
                if title.trim().is_empty() {
                    return Err(ConfigError::EmptyOption {
                        option: "toastMessage.title",
                    });
                }
                let duration = match duration {
                    None => DEFAULT_TOAST_DURATION,
                    Some(0) => return Err(ConfigError::ZeroToastDuration),
                    Some(ms) => Duration::from_millis(ms),
                };
                Some(Toast { title, duration })
            }
        };

        Ok(RedirectConfig {
            resolvers: self.resolvers,
            api_version,
            toast,
            document_title_key,
            hide_redirect_type,
            default_redirect_kind: default_redirect_type.unwrap_or_default(),
            redirect_schema_name,
            custom_redirect_schema: self.custom_redirect_schema,
            suppress_dialog,
            debug,
        })
    }
}

fn non_empty(
    option: &'static str,
    value: Option<String>,
    default: &str,
) -> Result<String, ConfigError> {
    match value {
        None => Ok(default.to_string()),
        Some(v) if v.trim().is_empty() => Err(ConfigError::EmptyOption { option }),
        Some(v) => Ok(v),
    }
}
