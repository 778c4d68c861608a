//! Schema contribution: the document type under which redirect records are stored.
//!
//! The generated type has three required fields: `url` (relative path, pattern
//! checked), `destination` (a reference restricted to the redirect-tracked
//! types) and `redirectType` (`PERMANENT` or `TEMPORARY`, defaulting to
//! `PERMANENT`). Hosts that need a different shape supply their own
//! [`SchemaType`] through the configuration; it then replaces the generated one.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::RedirectConfig;
use crate::errors::SchemaError;
use crate::types::RELATIVE_URL_PATTERN;
use crate::{RedirectKind, RedirectRecord};

/// Validation message shown for a malformed `url`.
pub const URL_PATTERN_MESSAGE: &str = "Please enter a valid URL path, not including the domain.";

// ---------------------------------------------------------------------------
// Schema model
// ---------------------------------------------------------------------------

/// A document type definition contributed to the host's schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaType {
    /// Type name; redirect records are created with this `_type`.
    pub name: String,
    /// Display title.
    pub title: String,
    /// Always `"document"` for redirect records.
    #[serde(rename = "type")]
    pub kind: String,
    /// Field definitions, in display order.
    pub fields: Vec<FieldDefinition>,
    /// List preview configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<Preview>,
}

/// One field of a [`SchemaType`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    /// Field name as stored.
    pub name: String,
    /// Display title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Help text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Field type and its type-specific settings.
    #[serde(flatten)]
    pub field_type: FieldType,
    /// Whether a value is required.
    #[serde(default)]
    pub required: bool,
    /// Value a new document starts with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_value: Option<Value>,
}

/// Field type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum FieldType {
    /// Free text, optionally pattern-checked or restricted to a list.
    String {
        /// Regular expression the value must match.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pattern: Option<String>,
        /// Message shown when `pattern` does not match.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pattern_message: Option<String>,
        /// Allowed values and how to lay them out.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        options: Option<ListOptions>,
    },
    /// Reference to another document.
    Reference {
        /// Document types the reference may point at.
        to: Vec<ReferenceTarget>,
    },
}

/// Allowed values for a list-constrained string field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListOptions {
    /// Allowed values.
    pub list: Vec<String>,
    /// Input layout, e.g. `"radio"`.
    pub layout: String,
}

/// A document type a reference may point at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceTarget {
    /// Target document type.
    #[serde(rename = "type")]
    pub doc_type: String,
}

/// List preview: which fields feed the title and subtitle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preview {
    /// Field shown as the title.
    pub title: String,
    /// Field holding the redirect kind.
    pub redirect_type: String,
    /// Dotted path of the destination's title.
    pub destination: String,
}

impl SchemaType {
    /// Looks up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Renders the preview subtitle for a record, e.g. `permanent -> “Summer gala”`.
    pub fn preview_subtitle(kind: RedirectKind, destination_title: Option<&str>) -> String {
        format!(
            "{} -> “{}”",
            kind.as_str().to_lowercase(),
            destination_title.unwrap_or("untitled")
        )
    }

    /// Checks `record` against this schema's field rules.
    ///
    /// The URL pattern is enforced by [`crate::UrlPath`] itself; here the
    /// destination type and the redirect kind are checked against the
    /// reference targets and list options this schema declares. A field the
    /// schema does not declare, or declares without constraints, accepts any
    /// value.
    pub fn validate_record(&self, record: &RedirectRecord) -> Result<(), SchemaError> {
        if let Some(FieldDefinition {
            field_type: FieldType::Reference { to },
            ..
        }) = self.field("destination")
        {
            let dest = record.destination.doc_type.as_str();
            if !to.is_empty() && !to.iter().any(|t| t.doc_type == dest) {
                return Err(SchemaError::DestinationNotAllowed {
                    doc_type: record.destination.doc_type.clone(),
                });
            }
        }

        if let Some(FieldDefinition {
            field_type:
                FieldType::String {
                    options: Some(options),
                    ..
                },
            ..
        }) = self.field("redirectType")
        {
            let kind = record.redirect_type.as_str();
            if !options.list.iter().any(|v| v == kind) {
                return Err(SchemaError::UnknownRedirectKind {
                    value: kind.to_string(),
                });
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Contribution
// ---------------------------------------------------------------------------

/// Builds the generated redirect schema for `config`.
///
/// Reference targets are the redirect-tracked document types, in sorted order.
pub fn redirect_schema(config: &RedirectConfig) -> SchemaType {
    let targets = config
        .resolvers()
        .types()
        .map(|t| ReferenceTarget {
            doc_type: t.as_str().to_string(),
        })
        .collect();

    SchemaType {
        name: config.redirect_schema_name().as_str().to_string(),
        title: "Redirects".to_string(),
        kind: "document".to_string(),
        fields: vec![
            FieldDefinition {
                name: "url".to_string(),
                title: Some("redirect from this URL:".to_string()),
                description: Some("relative url, e.g. /events/some-event".to_string()),
                field_type: FieldType::String {
                    pattern: Some(RELATIVE_URL_PATTERN.to_string()),
                    pattern_message: Some(URL_PATTERN_MESSAGE.to_string()),
                    options: None,
                },
                required: true,
                initial_value: None,
            },
            FieldDefinition {
                name: "destination".to_string(),
                title: Some("to destination:".to_string()),
                description: None,
                field_type: FieldType::Reference { to: targets },
                required: true,
                initial_value: None,
            },
            FieldDefinition {
                name: "redirectType".to_string(),
                title: None,
                description: None,
                field_type: FieldType::String {
                    pattern: None,
                    pattern_message: None,
                    options: Some(ListOptions {
                        list: RedirectKind::ALL
                            .iter()
                            .map(|k| k.as_str().to_string())
                            .collect(),
                        layout: "radio".to_string(),
                    }),
                },
                required: true,
                initial_value: Some(Value::String(RedirectKind::Permanent.as_str().to_string())),
            },
        ],
        preview: Some(Preview {
            title: "url".to_string(),
            redirect_type: "redirectType".to_string(),
            destination: format!("destination.{}", config.document_title_key()),
        }),
    }
}

/// Returns the schema redirect records are validated against: the custom one
/// if configured, the generated one otherwise.
pub fn effective_redirect_schema(config: &RedirectConfig) -> SchemaType {
    config
        .custom_redirect_schema()
        .cloned()
        .unwrap_or_else(|| redirect_schema(config))
}

/// Appends the redirect schema to the host's existing schema types.
pub fn with_redirect_schema(mut existing: Vec<SchemaType>, config: &RedirectConfig) -> Vec<SchemaType> {
    existing.push(effective_redirect_schema(config));
    existing
}
