//! HTTP client for the content store API.
//!
//! Owns endpoint construction, authentication and the mapping from HTTP
//! status codes to [`SanityError`]. The port implementations in the sibling
//! modules only shape request bodies and decode responses.

use std::time::Duration;

use reqwest::header::RETRY_AFTER;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use redirects::{PublishError, RetryPolicy, SourceError, WriteError, DEFAULT_API_VERSION};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Connection settings for one project and dataset.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SanitySettings {
    /// Project id, e.g. `abc123xy`.
    pub project_id: String,
    /// Dataset name, e.g. `production`.
    pub dataset: String,
    /// API version date. Falls back to the plugin's `apiVersion` option.
    #[serde(default)]
    pub api_version: Option<String>,
    /// Name of the environment variable holding the API token.
    #[serde(default)]
    pub token_env: Option<String>,
    /// Overrides `https://<project_id>.api.sanity.io`.
    #[serde(default)]
    pub api_host: Option<String>,
    /// Request timeout in seconds.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures talking to the content store.
#[derive(Debug, Error)]
pub enum SanityError {
    /// The settings cannot produce a valid endpoint.
    #[error("invalid content store settings: {message}")]
    InvalidSettings {
        /// What is wrong.
        message: String,
    },

    /// The request never got an HTTP response.
    #[error("request to content store failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The store answered with a non-success status.
    #[error("content store returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Error description from the response body, or the raw body.
        message: String,
        /// Parsed `Retry-After` header.
        retry_after: Option<Duration>,
    },

    /// The response body did not have the expected shape.
    #[error("unexpected response from content store: {message}")]
    Decode {
        /// Decoder message.
        message: String,
    },
}

impl SanityError {
    /// Whether repeating the request may succeed.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            SanityError::Transport(e) if e.is_timeout() || e.is_connect() => {
                RetryPolicy::Retryable { after: None }
            }
            SanityError::Status {
                status,
                retry_after,
                ..
            } if *status == 429 || *status >= 500 => RetryPolicy::Retryable {
                after: *retry_after,
            },
            _ => RetryPolicy::NonRetryable,
        }
    }
}

impl From<SanityError> for WriteError {
    fn from(e: SanityError) -> Self {
        match e.retry_policy() {
            RetryPolicy::NonRetryable => WriteError::Rejected {
                message: e.to_string(),
            },
            retry => WriteError::Unavailable {
                message: e.to_string(),
                retry,
            },
        }
    }
}

impl From<SanityError> for PublishError {
    fn from(e: SanityError) -> Self {
        match e.retry_policy() {
            RetryPolicy::NonRetryable => PublishError::Rejected {
                message: e.to_string(),
            },
            retry => PublishError::Unavailable {
                message: e.to_string(),
                retry,
            },
        }
    }
}

impl From<SanityError> for SourceError {
    fn from(e: SanityError) -> Self {
        match e {
            SanityError::Decode { message } => SourceError::Malformed { message },
            other => SourceError::Unavailable {
                message: other.to_string(),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Authenticated client for one dataset.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Clone)]
pub struct SanityClient {
    dataset: String,
    api_version: String,
    base_url: Url,
    token: Option<String>,
    http: Client,
}

impl SanityClient {
    /// Builds a client from `settings`.
    ///
    /// `fallback_api_version` is used when the settings name none.
    ///
    /// # Errors
    ///
    /// [`SanityError::InvalidSettings`] if the project id, dataset or API
    /// host is unusable; [`SanityError::Transport`] if the HTTP client cannot
    /// be built.
    pub fn new(
        settings: &SanitySettings,
        fallback_api_version: Option<&str>,
        token: Option<String>,
    ) -> Result<Self, SanityError> {
        if settings.project_id.trim().is_empty() {
            return Err(SanityError::InvalidSettings {
                message: "project_id must not be empty".into(),
            });
        }
        if settings.dataset.trim().is_empty() {
            return Err(SanityError::InvalidSettings {
                message: "dataset must not be empty".into(),
            });
        }

        let host = settings
            .api_host
            .clone()
            .unwrap_or_else(|| format!("https://{}.api.sanity.io", settings.project_id));
        let base_url = Url::parse(host.trim_end_matches('/')).map_err(|e| {
            SanityError::InvalidSettings {
                message: format!("api_host '{host}': {e}"),
            }
        })?;

        let api_version = settings
            .api_version
            .as_deref()
            .or(fallback_api_version)
            .unwrap_or(DEFAULT_API_VERSION)
            .trim_start_matches('v')
            .to_string();

        let http = Client::builder()
            .timeout(
                settings
                    .timeout_secs
                    .map_or(DEFAULT_TIMEOUT, Duration::from_secs),
            )
            .build()?;

        Ok(Self {
            dataset: settings.dataset.clone(),
            api_version,
            base_url,
            token: token.filter(|t| !t.is_empty()),
            http,
        })
    }

    /// Dataset this client reads and writes.
    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    /// API version used in every endpoint path.
    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    // -----------------------------------------------------------------------
    // Endpoints
    // -----------------------------------------------------------------------

    fn endpoint(&self, operation: &str, suffix: &str) -> Result<Url, SanityError> {
        let path = format!(
            "/v{}/data/{operation}/{}{suffix}",
            self.api_version, self.dataset
        );
        self.base_url
            .join(&path)
            .map_err(|e| SanityError::InvalidSettings {
                message: format!("endpoint '{path}': {e}"),
            })
    }

    /// `POST` endpoint for mutations; asks the store to return created ids.
    pub fn mutate_url(&self) -> Result<Url, SanityError> {
        let mut url = self.endpoint("mutate", "")?;
        url.query_pairs_mut().append_pair("returnIds", "true");
        Ok(url)
    }

    /// `GET` endpoint running `query`.
    pub fn query_url(&self, query: &str) -> Result<Url, SanityError> {
        let mut url = self.endpoint("query", "")?;
        url.query_pairs_mut().append_pair("query", query);
        Ok(url)
    }

    /// `GET` endpoint returning the documents with the given ids.
    pub fn doc_url(&self, ids: &[&str]) -> Result<Url, SanityError> {
        self.endpoint("doc", &format!("/{}", ids.join(",")))
    }

    /// `POST` endpoint for document actions such as publish.
    pub fn actions_url(&self) -> Result<Url, SanityError> {
        self.endpoint("actions", "")
    }

    // -----------------------------------------------------------------------
    // Requests
    // -----------------------------------------------------------------------

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, SanityError> {
        self.send(self.http.get(url)).await
    }

    pub(crate) async fn post_json<T: DeserializeOwned>(
        &self,
        url: Url,
        body: &serde_json::Value,
    ) -> Result<T, SanityError> {
        self.send(self.http.post(url).json(body)).await
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, SanityError> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = request.send().await?;
        let status = response.status();
        debug!(status = status.as_u16(), url = %response.url().path(), "Content store responded");

        if !status.is_success() {
            let retry_after = retry_after(response.headers().get(RETRY_AFTER));
            let body = response.text().await.unwrap_or_default();
            let message = error_message(status, &body);
            warn!(status = status.as_u16(), %message, "Content store request failed");
            return Err(SanityError::Status {
                status: status.as_u16(),
                message,
                retry_after,
            });
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| SanityError::Decode {
            message: e.to_string(),
        })
    }
}

impl std::fmt::Debug for SanityClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SanityClient")
            .field("base_url", &self.base_url.as_str())
            .field("dataset", &self.dataset)
            .field("api_version", &self.api_version)
            .field("authenticated", &self.token.is_some())
            .finish_non_exhaustive()
    }
}

fn retry_after(value: Option<&reqwest::header::HeaderValue>) -> Option<Duration> {
    value?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Pulls `error.description` (or `message`) out of an error body.
fn error_message(status: StatusCode, body: &str) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    let described = parsed.as_ref().and_then(|v| {
        v.pointer("/error/description")
            .or_else(|| v.get("message"))
            .and_then(serde_json::Value::as_str)
    });
    match described {
        Some(text) => text.to_string(),
        None if body.trim().is_empty() => status
            .canonical_reason()
            .unwrap_or("no response body")
            .to_string(),
        None => body.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use reqwest::header::HeaderValue;

    use super::*;

    fn settings(api_host: Option<&str>) -> SanitySettings {
        SanitySettings {
            project_id: "abc123".into(),
            dataset: "production".into(),
            api_version: None,
            token_env: None,
            api_host: api_host.map(str::to_string),
            timeout_secs: Some(5),
        }
    }

    #[test]
    fn endpoints_follow_the_data_api_layout() {
        let client = SanityClient::new(&settings(None), Some("v2024-01-01"), None).unwrap();
        assert_eq!(client.api_version(), "2024-01-01");
        assert_eq!(
            client.mutate_url().unwrap().as_str(),
            "https://abc123.api.sanity.io/v2024-01-01/data/mutate/production?returnIds=true"
        );
        assert_eq!(
            client.doc_url(&["drafts.e1", "e1"]).unwrap().as_str(),
            "https://abc123.api.sanity.io/v2024-01-01/data/doc/production/drafts.e1,e1"
        );
        assert_eq!(
            client.actions_url().unwrap().as_str(),
            "https://abc123.api.sanity.io/v2024-01-01/data/actions/production"
        );
    }

    #[test]
    fn query_is_url_encoded() {
        let client = SanityClient::new(&settings(Some("http://localhost:3333/")), None, None).unwrap();
        let url = client.query_url("*[_type == 'redirect']").unwrap();
        assert!(url.as_str().starts_with(&format!(
            "http://localhost:3333/v{DEFAULT_API_VERSION}/data/query/production?query="
        )));
        let (_, query) = url.query_pairs().next().unwrap();
        assert_eq!(query, "*[_type == 'redirect']");
    }

    #[test]
    fn empty_settings_are_rejected() {
        let mut bad = settings(None);
        bad.dataset = " ".into();
        assert!(matches!(
            SanityClient::new(&bad, None, None),
            Err(SanityError::InvalidSettings { .. })
        ));
    }

    #[test]
    fn throttling_and_server_errors_are_retryable() {
        let throttled = SanityError::Status {
            status: 429,
            message: "slow down".into(),
            retry_after: Some(Duration::from_secs(3)),
        };
        assert_eq!(
            throttled.retry_policy(),
            RetryPolicy::Retryable {
                after: Some(Duration::from_secs(3))
            }
        );

        let bad_request = SanityError::Status {
            status: 400,
            message: "invalid mutation".into(),
            retry_after: None,
        };
        assert_eq!(bad_request.retry_policy(), RetryPolicy::NonRetryable);
        assert!(matches!(WriteError::from(bad_request), WriteError::Rejected { .. }));

        let unavailable = SanityError::Status {
            status: 503,
            message: "maintenance".into(),
            retry_after: None,
        };
        assert!(matches!(
            PublishError::from(unavailable),
            PublishError::Unavailable { .. }
        ));
    }

    #[test]
    fn decode_failures_surface_as_malformed_results() {
        let err = SourceError::from(SanityError::Decode {
            message: "missing field `result`".into(),
        });
        assert!(matches!(err, SourceError::Malformed { .. }));
    }

    #[test]
    fn error_bodies_are_summarised() {
        assert_eq!(
            error_message(
                StatusCode::BAD_REQUEST,
                r#"{"error":{"description":"Document has no draft"}}"#
            ),
            "Document has no draft"
        );
        assert_eq!(error_message(StatusCode::BAD_GATEWAY, ""), "Bad Gateway");
        assert_eq!(error_message(StatusCode::BAD_GATEWAY, "upstream down\n"), "upstream down");
    }

    #[test]
    fn retry_after_accepts_seconds_only() {
        assert_eq!(
            retry_after(Some(&HeaderValue::from_static("7"))),
            Some(Duration::from_secs(7))
        );
        assert_eq!(
            retry_after(Some(&HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"))),
            None
        );
        assert_eq!(retry_after(None), None);
    }
}
