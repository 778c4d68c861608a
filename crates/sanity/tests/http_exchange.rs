//! Request/response exchanges against a one-shot local `tiny_http` server.

use std::io::Read;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use redirects::{
    DocumentId, DocumentReference, DocumentType, PublishExecutor, RedirectKind, RedirectRecord,
    RedirectRecordWriter, RedirectSource, RetryPolicy, SourceError, UrlPath, WriteError,
};
use sanity::{SanityClient, SanityPublisher, SanitySettings};
use tiny_http::{Header, Response, Server};

/// What the server saw of the one request it answered.
struct Captured {
    method: String,
    url: String,
    authorization: Option<String>,
    body: String,
}

/// Serves exactly one response and hands back the request it received.
fn serve_once(
    status: u16,
    header: Option<(&'static str, &'static str)>,
    body: &'static str,
) -> (String, JoinHandle<Captured>) {
    let server = Server::http("127.0.0.1:0").unwrap();
    let host = format!("http://{}", server.server_addr());
    let handle = thread::spawn(move || {
        let mut request = server.recv().unwrap();
        let mut body_text = String::new();
        request.as_reader().read_to_string(&mut body_text).unwrap();
        let captured = Captured {
            method: request.method().to_string(),
            url: request.url().to_string(),
            authorization: request
                .headers()
                .iter()
                .find(|h| h.field.equiv("Authorization"))
                .map(|h| h.value.to_string()),
            body: body_text,
        };

        let mut response = Response::from_string(body)
            .with_status_code(status)
            .with_header(Header::from_bytes("Content-Type", "application/json").unwrap());
        if let Some((name, value)) = header {
            response = response.with_header(Header::from_bytes(name, value).unwrap());
        }
        request.respond(response).unwrap();
        captured
    });
    (host, handle)
}

fn client(host: &str) -> SanityClient {
    let settings = SanitySettings {
        project_id: "abc123".into(),
        dataset: "production".into(),
        api_version: Some("2024-01-01".into()),
        token_env: None,
        api_host: Some(host.to_string()),
        timeout_secs: Some(5),
    };
    SanityClient::new(&settings, None, Some("secret-token".into())).unwrap()
}

fn record() -> RedirectRecord {
    RedirectRecord {
        record_type: DocumentType::new("redirect").unwrap(),
        url: UrlPath::parse("/events/old").unwrap(),
        destination: DocumentReference {
            id: DocumentId::new("e1").unwrap(),
            doc_type: DocumentType::new("event").unwrap(),
        },
        redirect_type: RedirectKind::Permanent,
    }
}

#[tokio::test]
async fn create_posts_an_authenticated_mutation_and_returns_the_id() {
    let (host, server) = serve_once(
        200,
        None,
        r#"{"transactionId":"tx1","results":[{"id":"r-42","operation":"create"}]}"#,
    );

    let id = client(&host).create(&record()).await.unwrap();
    assert_eq!(id.as_str(), "r-42");

    let request = server.join().unwrap();
    assert_eq!(request.method, "POST");
    assert_eq!(request.url, "/v2024-01-01/data/mutate/production?returnIds=true");
    assert_eq!(request.authorization.as_deref(), Some("Bearer secret-token"));
    assert!(request.body.contains(r#""url":"/events/old""#));
    assert!(request.body.contains(r#""redirectType":"PERMANENT""#));
}

#[tokio::test]
async fn throttled_writes_are_retryable_with_the_server_delay() {
    let (host, _server) = serve_once(
        429,
        Some(("Retry-After", "2")),
        r#"{"error":{"description":"Rate limit exceeded"}}"#,
    );

    let err = client(&host).create(&record()).await.unwrap_err();
    let WriteError::Unavailable { message, retry } = err else {
        panic!("expected a retryable failure, got {err:?}");
    };
    assert!(message.contains("Rate limit exceeded"));
    assert_eq!(
        retry,
        RetryPolicy::Retryable {
            after: Some(Duration::from_secs(2))
        }
    );
}

#[tokio::test]
async fn rejected_mutations_are_not_retryable() {
    let (host, _server) = serve_once(
        400,
        None,
        r#"{"error":{"description":"Mutation failed: invalid reference"}}"#,
    );

    let err = client(&host).create(&record()).await.unwrap_err();
    assert_eq!(err.retry_policy(), RetryPolicy::NonRetryable);
}

#[tokio::test]
async fn redirect_query_returns_records_in_order() {
    let (host, server) = serve_once(
        200,
        None,
        r#"{"result":[
            {"url":"/a","redirectType":"PERMANENT","destination":{"_id":"e1","_type":"event"}},
            {"url":"/b","redirectType":"TEMPORARY","destination":null}
        ]}"#,
    );

    let records = client(&host)
        .fetch_redirects("*[_type == 'redirect']{..., destination->}")
        .await
        .unwrap();
    let urls: Vec<_> = records.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(urls, ["/a", "/b"]);

    let request = server.join().unwrap();
    assert_eq!(request.method, "GET");
    assert!(request.url.starts_with("/v2024-01-01/data/query/production?query="));
}

#[tokio::test]
async fn malformed_query_results_are_reported() {
    let (host, _server) = serve_once(200, None, r#"{"ms":3}"#);
    let err = client(&host).fetch_redirects("*").await.unwrap_err();
    assert!(matches!(err, SourceError::Malformed { .. }));
}

#[tokio::test]
async fn versions_are_fetched_in_one_request() {
    let (host, server) = serve_once(
        200,
        None,
        r#"{"documents":[{"_id":"drafts.e1","_type":"event","title":"Gala"}]}"#,
    );

    let versions = client(&host)
        .fetch_versions(&DocumentId::new("e1").unwrap())
        .await
        .unwrap();
    assert!(versions.draft.is_some());
    assert!(versions.published.is_none());

    let request = server.join().unwrap();
    assert_eq!(request.method, "GET");
    assert_eq!(request.url, "/v2024-01-01/data/doc/production/drafts.e1,e1");
}

#[tokio::test]
async fn publisher_posts_the_publish_action() {
    let (host, server) = serve_once(200, None, r#"{"transactionId":"tx2"}"#);

    let publisher = SanityPublisher::new(client(&host), DocumentId::new("drafts.e1").unwrap());
    publisher.execute().await.unwrap();

    let request = server.join().unwrap();
    assert_eq!(request.method, "POST");
    assert_eq!(request.url, "/v2024-01-01/data/actions/production");
    assert!(request.body.contains(r#""actionType":"sanity.action.document.publish""#));
    assert!(request.body.contains(r#""publishedId":"e1""#));
}

#[tokio::test]
async fn server_errors_make_publish_retryable() {
    let (host, _server) = serve_once(503, None, "");
    let publisher = SanityPublisher::new(client(&host), DocumentId::new("e1").unwrap());
    let err = publisher.execute().await.unwrap_err();
    assert_eq!(err.retry_policy(), RetryPolicy::Retryable { after: None });
}
