//! Per-binding response rendering.
//!
//! # Responsibilities
//! - Convert a validated BindingSpec into typed headers and status
//! - Resolve the body per request (inline text, file content, or nothing)
//! - Report each served request through tracing and metrics
//!
//! # Design Decisions
//! - File bodies are read at request time, never cached at build time
//! - A body that cannot be resolved leaves headers and status intact and
//!   sends an empty body; the failure stays local to that request

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::{HeaderName, HeaderValue, StatusCode, Uri};
use axum::response::Response;
use thiserror::Error;

use crate::config::{BindingSpec, BodyKind};
use crate::observability::metrics;
use crate::routing::router::RouteError;

/// Why a body could not be produced for one request.
#[derive(Debug, Error)]
pub enum BodyError {
    #[error("error reading file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("file {0} has no content")]
    Empty(PathBuf),
}

#[derive(Debug, Clone)]
enum BodySource {
    Inline(Bytes),
    File(PathBuf),
    Proxy,
}

/// A compiled binding: everything needed to answer one exact path.
#[derive(Debug, Clone)]
pub struct BindingHandler {
    listener: Arc<str>,
    path: String,
    status: StatusCode,
    headers: Vec<(HeaderName, HeaderValue)>,
    body: BodySource,
}

impl BindingHandler {
    /// Compile a binding for the named listener.
    pub fn new(listener: Arc<str>, spec: &BindingSpec) -> Result<Self, RouteError> {
        let status = StatusCode::from_u16(spec.status).map_err(|_| RouteError::InvalidStatus {
            path: spec.path.clone(),
            code: spec.status,
        })?;

        let headers = spec
            .headers
            .iter()
            .map(|h| {
                let name = HeaderName::from_bytes(h.key.as_bytes());
                let value = HeaderValue::from_str(&h.value);
                match (name, value) {
                    (Ok(name), Ok(value)) => Ok((name, value)),
                    _ => Err(RouteError::InvalidHeader {
                        path: spec.path.clone(),
                        key: h.key.clone(),
                    }),
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        let body = match spec.kind {
            BodyKind::Inline => BodySource::Inline(Bytes::from(spec.body.clone())),
            BodyKind::File => BodySource::File(PathBuf::from(&spec.body)),
            BodyKind::Proxy => BodySource::Proxy,
        };

        Ok(Self {
            listener,
            path: spec.path.clone(),
            status,
            headers,
            body,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Render the response for one request.
    pub async fn respond(&self, remote: SocketAddr, uri: &Uri) -> Response {
        tracing::info!(
            listener = %self.listener,
            binding = %self.path,
            remote = %remote,
            uri = %uri,
            "Binding got request, sending response"
        );

        let body = match self.resolve_body().await {
            Ok(Some(bytes)) => Body::from(bytes),
            Ok(None) => Body::empty(),
            Err(e) => {
                tracing::warn!(
                    listener = %self.listener,
                    binding = %self.path,
                    error = %e,
                    "Body unavailable, response sent without body"
                );
                metrics::record_body_failure(&self.listener, &self.path);
                Body::empty()
            }
        };

        let mut response = Response::new(body);
        *response.status_mut() = self.status;
        let headers = response.headers_mut();
        for (name, value) in &self.headers {
            headers.append(name.clone(), value.clone());
        }

        metrics::record_request(&self.listener, &self.path, self.status.as_u16());
        response
    }

    /// Produce the body bytes, or `None` when the kind writes no body.
    pub async fn resolve_body(&self) -> Result<Option<Bytes>, BodyError> {
        match &self.body {
            BodySource::Inline(bytes) => Ok(Some(bytes.clone())),
            BodySource::File(path) => {
                let content = tokio::fs::read(path).await.map_err(|source| BodyError::Read {
                    path: path.clone(),
                    source,
                })?;
                if content.is_empty() {
                    return Err(BodyError::Empty(path.clone()));
                }
                Ok(Some(Bytes::from(content)))
            }
            // Reserved for upstream forwarding.
            BodySource::Proxy => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler(spec: &BindingSpec) -> BindingHandler {
        BindingHandler::new(Arc::from("test"), spec).unwrap()
    }

    fn remote() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    async fn body_of(response: Response) -> Bytes {
        axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap()
    }

    #[tokio::test]
    async fn inline_body_verbatim() {
        let h = handler(&BindingSpec::inline("/ping", 200, "pong"));
        let response = h.respond(remote(), &Uri::from_static("/ping")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_of(response).await, "pong");
    }

    #[tokio::test]
    async fn headers_written_in_declaration_order() {
        let spec = BindingSpec::inline("/h", 201, "x")
            .with_header("X-Tag", "first")
            .with_header("Content-Type", "application/json")
            .with_header("X-Tag", "second");
        let response = handler(&spec).respond(remote(), &Uri::from_static("/h")).await;

        assert_eq!(response.status(), StatusCode::CREATED);
        let tags: Vec<_> = response.headers().get_all("x-tag").iter().collect();
        assert_eq!(tags, ["first", "second"]);
        assert_eq!(response.headers()["content-type"], "application/json");
    }

    #[tokio::test]
    async fn file_body_read_per_request() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("body.json");
        let h = handler(&BindingSpec::file("/data", 200, file.to_string_lossy()));

        // File created after the handler was built.
        std::fs::write(&file, r#"{"v":1}"#).unwrap();
        let response = h.respond(remote(), &Uri::from_static("/data")).await;
        assert_eq!(body_of(response).await, r#"{"v":1}"#);

        std::fs::write(&file, r#"{"v":2}"#).unwrap();
        let response = h.respond(remote(), &Uri::from_static("/data")).await;
        assert_eq!(body_of(response).await, r#"{"v":2}"#);
    }

    #[tokio::test]
    async fn missing_file_keeps_status_and_headers() {
        let spec = BindingSpec::file("/gone", 200, "/nonexistent/body.txt").with_header("X-Mock", "1");
        let h = handler(&spec);
        assert!(matches!(h.resolve_body().await, Err(BodyError::Read { .. })));

        let response = h.respond(remote(), &Uri::from_static("/gone")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-mock"], "1");
        assert!(body_of(response).await.is_empty());
    }

    #[tokio::test]
    async fn empty_file_is_a_body_failure() {
        let file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        let h = handler(&BindingSpec::file("/empty", 200, file.path().to_string_lossy()));
        assert!(matches!(h.resolve_body().await, Err(BodyError::Empty(_))));
    }

    #[tokio::test]
    async fn proxy_writes_no_body() {
        let mut spec = BindingSpec::inline("/upstream", 502, "http://backend");
        spec.kind = BodyKind::Proxy;
        let response = handler(&spec).respond(remote(), &Uri::from_static("/upstream")).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(body_of(response).await.is_empty());
    }

    #[test]
    fn invalid_header_rejected_at_build() {
        let spec = BindingSpec::inline("/x", 200, "x").with_header("bad key", "v");
        let err = BindingHandler::new(Arc::from("test"), &spec).unwrap_err();
        assert!(matches!(err, RouteError::InvalidHeader { .. }));
    }
}
