//! Routing table and request dispatch.
//!
//! # Responsibilities
//! - Compile a listener's bindings into an exact-path lookup table
//! - Dispatch every request on the listener through that table
//! - Fall through to 404 for unbound paths
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(1) exact path lookup via HashMap, no wildcard or prefix semantics
//! - Dispatch runs in a single axum fallback so arbitrary configured paths
//!   never go through axum's path-pattern parser

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, State},
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use thiserror::Error;
use tower_http::trace::TraceLayer;

use crate::config::ListenerSpec;
use crate::routing::binding::BindingHandler;

/// Error type for routing table construction.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("binding {path}: invalid response code {code}")]
    InvalidStatus { path: String, code: u16 },

    #[error("binding {path}: invalid header {key}")]
    InvalidHeader { path: String, key: String },

    #[error("binding path {0} is bound more than once")]
    DuplicatePath(String),
}

/// Immutable path → handler mapping for one listener.
#[derive(Debug)]
pub struct RoutingTable {
    listener: Arc<str>,
    routes: HashMap<String, BindingHandler>,
}

impl RoutingTable {
    /// Compile every binding of `spec`.
    pub fn build(spec: &ListenerSpec) -> Result<Self, RouteError> {
        let listener: Arc<str> = Arc::from(spec.name.as_str());
        let mut routes = HashMap::with_capacity(spec.bindings.len());

        for binding in &spec.bindings {
            tracing::debug!(listener = %listener, path = %binding.path, kind = %binding.kind, "Creating binding");
            let handler = BindingHandler::new(Arc::clone(&listener), binding)?;
            if routes.insert(binding.path.clone(), handler).is_some() {
                return Err(RouteError::DuplicatePath(binding.path.clone()));
            }
        }

        Ok(Self { listener, routes })
    }

    /// Find the handler bound to exactly `path`.
    pub fn lookup(&self, path: &str) -> Option<&BindingHandler> {
        self.routes.get(path)
    }

    pub fn listener(&self) -> &str {
        &self.listener
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Bound paths, sorted.
    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.routes.keys().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }

    /// Build the axum router serving this table.
    ///
    /// The router expects `ConnectInfo<SocketAddr>`; serve it with
    /// `into_make_service_with_connect_info`.
    pub fn into_router(self: Arc<Self>) -> Router {
        Router::new()
            .fallback(dispatch)
            .with_state(self)
            .layer(TraceLayer::new_for_http())
    }
}

async fn dispatch(
    State(table): State<Arc<RoutingTable>>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    uri: Uri,
) -> Response {
    match table.lookup(uri.path()) {
        Some(handler) => handler.respond(remote, &uri).await,
        None => {
            tracing::debug!(listener = %table.listener, path = %uri.path(), remote = %remote, "No binding matched");
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BindingSpec;
    use axum::body::Body;
    use axum::extract::connect_info::MockConnectInfo;
    use axum::http::Request;
    use tower::ServiceExt;

    fn table() -> Arc<RoutingTable> {
        let spec = crate::config::ListenerSpec::new("api", 8080)
            .with_binding(BindingSpec::inline("/ping", 200, "pong"))
            .with_binding(BindingSpec::inline("/teapot", 418, "short and stout"));
        Arc::new(RoutingTable::build(&spec).unwrap())
    }

    async fn get(table: Arc<RoutingTable>, uri: &str) -> (StatusCode, String) {
        let addr: SocketAddr = "127.0.0.1:50000".parse().unwrap();
        let router = table.into_router().layer(MockConnectInfo(addr));
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn exact_path_is_served() {
        assert_eq!(get(table(), "/ping").await, (StatusCode::OK, "pong".to_string()));
        assert_eq!(get(table(), "/ping?x=1").await, (StatusCode::OK, "pong".to_string()));
        assert_eq!(get(table(), "/teapot").await.0, StatusCode::IM_A_TEAPOT);
    }

    #[tokio::test]
    async fn no_prefix_or_wildcard_matching() {
        assert_eq!(get(table(), "/ping/").await.0, StatusCode::NOT_FOUND);
        assert_eq!(get(table(), "/ping/deeper").await.0, StatusCode::NOT_FOUND);
        assert_eq!(get(table(), "/").await.0, StatusCode::NOT_FOUND);
    }

    #[test]
    fn duplicate_paths_rejected() {
        let spec = crate::config::ListenerSpec::new("api", 8080)
            .with_binding(BindingSpec::inline("/a", 200, "1"))
            .with_binding(BindingSpec::inline("/a", 200, "2"));
        assert!(matches!(RoutingTable::build(&spec), Err(RouteError::DuplicatePath(p)) if p == "/a"));
    }

    #[test]
    fn paths_listed_sorted() {
        let table = table();
        assert_eq!(table.paths(), ["/ping", "/teapot"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.listener(), "api");
    }
}
