//! Remote source client for Outline-compatible knowledge-base APIs.
//!
//! Wraps the three calls a compilation run needs (collection metadata,
//! collection document tree, single document content) and maps HTTP status
//! semantics onto the [`DocbinderError`] taxonomy. One attempt per call; any
//! retry policy belongs to the caller.

mod wire;

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use docbinder_shared::{
    CollectionMetadata, DocbinderError, DocumentContent, DocumentNode, Result,
};

use crate::wire::{Envelope, ErrorBody, NavigationNode, WireCollection, WireDocument};

/// Default timeout in seconds for each API call.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// User-Agent string for API requests.
const USER_AGENT: &str = concat!("docbinder/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// DocumentSource
// ---------------------------------------------------------------------------

/// The three remote operations a compilation run depends on.
///
/// [`OutlineClient`] is the HTTP implementation; tests substitute in-memory
/// sources.
#[allow(async_fn_in_trait)]
pub trait DocumentSource {
    /// Fetch the collection's name and description.
    async fn collection_metadata(&self, collection_id: &str) -> Result<CollectionMetadata>;

    /// Fetch the collection's document forest, in service order.
    async fn document_tree(&self, collection_id: &str) -> Result<Vec<DocumentNode>>;

    /// Fetch one document's full content.
    async fn document_content(&self, document_id: &str) -> Result<DocumentContent>;
}

// ---------------------------------------------------------------------------
// Client options
// ---------------------------------------------------------------------------

/// Configuration for the HTTP client.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Timeout for each HTTP request in seconds.
    pub timeout_secs: u64,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

// ---------------------------------------------------------------------------
// OutlineClient
// ---------------------------------------------------------------------------

/// HTTP client for the Outline API (`POST {base}/{method}` with bearer auth).
#[derive(Debug, Clone)]
pub struct OutlineClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OutlineClient {
    /// Create a client for the given API base URL and bearer token.
    pub fn new(base_url: &Url, api_key: impl Into<String>, opts: &ClientOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(opts.timeout_secs))
            .build()
            .map_err(|e| DocbinderError::Connection(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    /// POST `{"id": id}` to an API method and decode the envelope's `data`.
    ///
    /// `what` names the object being requested (for `NotFound` messages).
    async fn call<T: DeserializeOwned>(&self, method: &str, id: &str, what: &str) -> Result<T> {
        let url = format!("{}/{method}", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&serde_json::json!({ "id": id }))
            .send()
            .await
            .map_err(|e| DocbinderError::Connection(format!("{url}: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| DocbinderError::Connection(format!("{url}: failed to read body: {e}")))?;

        debug!(%url, status = status.as_u16(), len = body.len(), "API response");

        if !status.is_success() {
            let err_body: ErrorBody = serde_json::from_str(&body).unwrap_or_default();
            return Err(status_error(
                status,
                what,
                id,
                &err_body.describe(&format!("HTTP {status}")),
            ));
        }

        let envelope: Envelope<T> = serde_json::from_str(&body).map_err(|e| {
            DocbinderError::UnexpectedResponse {
                status: status.as_u16(),
                message: format!("{method}: invalid response body: {e}"),
            }
        })?;

        if !envelope.ok {
            let err_body = ErrorBody {
                error: envelope.error,
                message: envelope.message,
            };
            return Err(DocbinderError::UnexpectedResponse {
                status: status.as_u16(),
                message: format!("{method}: {}", err_body.describe("API error")),
            });
        }

        envelope
            .data
            .ok_or_else(|| DocbinderError::UnexpectedResponse {
                status: status.as_u16(),
                message: format!("{method}: response has no data"),
            })
    }
}

impl DocumentSource for OutlineClient {
    #[instrument(skip(self))]
    async fn collection_metadata(&self, collection_id: &str) -> Result<CollectionMetadata> {
        let collection: WireCollection = self
            .call("collections.info", collection_id, "collection")
            .await?;
        Ok(collection.into())
    }

    #[instrument(skip(self))]
    async fn document_tree(&self, collection_id: &str) -> Result<Vec<DocumentNode>> {
        let nodes: Vec<NavigationNode> = self
            .call("collections.documents", collection_id, "collection")
            .await?;
        Ok(nodes
            .into_iter()
            .map(|node| node.into_document_node(None))
            .collect())
    }

    #[instrument(skip(self))]
    async fn document_content(&self, document_id: &str) -> Result<DocumentContent> {
        let document: WireDocument = self
            .call("documents.info", document_id, "document")
            .await?;

        if let Some(reason) = document.unavailable_reason() {
            return Err(DocbinderError::not_found(
                "document",
                format!("{document_id}: {reason}"),
            ));
        }

        Ok(document.into())
    }
}

/// Map a non-success HTTP status onto the error taxonomy.
fn status_error(status: StatusCode, what: &str, id: &str, message: &str) -> DocbinderError {
    match status {
        StatusCode::UNAUTHORIZED => DocbinderError::Unauthenticated {
            message: message.to_string(),
        },
        StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
            DocbinderError::not_found(what, format!("{id}: {message}"))
        }
        StatusCode::TOO_MANY_REQUESTS => DocbinderError::RateLimited {
            message: message.to_string(),
        },
        _ => DocbinderError::UnexpectedResponse {
            status: status.as_u16(),
            message: message.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> OutlineClient {
        let base = Url::parse(&format!("{}/api/", server.uri())).unwrap();
        OutlineClient::new(&base, "test-key", &ClientOptions::default()).unwrap()
    }

    #[tokio::test]
    async fn test_collection_metadata() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/collections.info"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_json(serde_json::json!({ "id": "col-1" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "data": {
                    "id": "col-1",
                    "name": "Engineering Docs",
                    "description": "Internal eng wiki"
                }
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let meta = client.collection_metadata("col-1").await.unwrap();

        assert_eq!(meta.name, "Engineering Docs");
        assert_eq!(meta.description.as_deref(), Some("Internal eng wiki"));
    }

    #[tokio::test]
    async fn test_document_tree() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/collections.documents"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "data": [
                    {"id": "a", "title": "A", "url": "/doc/a", "children": [
                        {"id": "b", "title": "B", "url": "/doc/b", "children": []}
                    ]},
                    {"id": "c", "title": "C", "url": "/doc/c", "children": []}
                ]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let tree = client.document_tree("col-1").await.unwrap();

        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].id, "a");
        assert_eq!(tree[0].children[0].parent_id.as_deref(), Some("a"));
        assert_eq!(tree[1].id, "c");
    }

    #[tokio::test]
    async fn test_document_content() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/documents.info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "data": {
                    "id": "a",
                    "title": "Architecture",
                    "text": "# Overview\n\nHello",
                    "createdBy": {"name": "Grace"},
                    "updatedAt": "2024-06-01T12:00:00.000Z",
                    "publishedAt": "2024-05-01T12:00:00.000Z"
                }
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let doc = client.document_content("a").await.unwrap();

        assert_eq!(doc.title, "Architecture");
        assert!(doc.body.starts_with("# Overview"));
        assert_eq!(doc.author.as_deref(), Some("Grace"));
        assert!(doc.updated_at.is_some());
    }

    #[tokio::test]
    async fn test_draft_is_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/documents.info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "data": {"id": "d", "title": "Draft", "text": "wip", "publishedAt": null}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.document_content("d").await.unwrap_err();
        assert!(matches!(err, DocbinderError::NotFound { .. }));
        assert!(err.to_string().contains("draft"));
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/collections.info"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "ok": false,
                "error": "authentication_required",
                "message": "Authentication required",
                "status": 401
            })))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/collections.documents"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/documents.info"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "ok": false,
                "error": "not_found",
                "message": "Resource not found",
                "status": 404
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;

        let err = client.collection_metadata("col-1").await.unwrap_err();
        assert!(matches!(err, DocbinderError::Unauthenticated { .. }));
        assert!(err.to_string().contains("Authentication required"));

        let err = client.document_tree("col-1").await.unwrap_err();
        assert!(matches!(err, DocbinderError::RateLimited { .. }));

        let err = client.document_content("gone").await.unwrap_err();
        match err {
            DocbinderError::NotFound { what, message } => {
                assert_eq!(what, "document");
                assert!(message.contains("gone"));
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_server_error_is_unexpected_response() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/documents.info"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.document_content("a").await.unwrap_err();
        assert!(matches!(
            err,
            DocbinderError::UnexpectedResponse { status: 502, .. }
        ));
    }

    #[tokio::test]
    async fn test_ok_false_envelope() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/collections.info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": false,
                "error": "validation_error",
                "message": "id is invalid"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.collection_metadata("???").await.unwrap_err();
        assert!(err.to_string().contains("id is invalid"));
    }

    #[tokio::test]
    async fn test_timeout_is_connection_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/documents.info"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_secs(3))
                    .set_body_json(serde_json::json!({ "ok": true, "data": {} })),
            )
            .mount(&server)
            .await;

        let base = Url::parse(&format!("{}/api", server.uri())).unwrap();
        let client =
            OutlineClient::new(&base, "k", &ClientOptions { timeout_secs: 1 }).unwrap();

        let err = client.document_content("slow").await.unwrap_err();
        assert!(matches!(err, DocbinderError::Connection(_)));
    }
}
