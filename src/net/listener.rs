//! Network endpoint binding.
//!
//! # Responsibilities
//! - Load TLS material before touching the port
//! - Bind the configured address and port
//! - Hand the bound socket to axum-server, plain or TLS
//!
//! # Design Decisions
//! - Binding happens before a worker is spawned, so "port in use" and
//!   "bad certificate" surface as errors to the caller instead of a task
//!   that dies later
//! - Shutdown goes through an `axum_server::Handle`

use std::net::SocketAddr;

use axum::extract::connect_info::IntoMakeServiceWithConnectInfo;
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::ListenerSpec;
use crate::net::tls::{load_tls_config, TlsError};

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Failed to bind to address.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Certificate or key could not be loaded.
    #[error(transparent)]
    Tls(#[from] TlsError),

    #[error("TLS is enabled but no certificate is configured")]
    MissingCertificate,
}

/// The service type every endpoint serves.
pub type AppService = IntoMakeServiceWithConnectInfo<Router, SocketAddr>;

/// A bound, not yet serving, network endpoint.
pub struct Endpoint {
    inner: std::net::TcpListener,
    local_addr: SocketAddr,
    tls: Option<RustlsConfig>,
    keep_alive: bool,
}

impl Endpoint {
    /// Bind the address and port described by `spec`.
    pub async fn bind(spec: &ListenerSpec) -> Result<Self, ListenerError> {
        let tls = if spec.tls {
            let pair = spec.certificate.as_ref().ok_or(ListenerError::MissingCertificate)?;
            let config = load_tls_config(pair).await?;
            Some(config)
        } else {
            None
        };

        let addr = SocketAddr::new(spec.address, spec.port);
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ListenerError::Bind { addr, source })?;

        let local_addr = listener
            .local_addr()
            .map_err(|source| ListenerError::Bind { addr, source })?;

        // into_std leaves the socket in non-blocking mode, as axum-server expects.
        let inner = listener
            .into_std()
            .map_err(|source| ListenerError::Bind { addr, source })?;

        tracing::info!(
            address = %local_addr,
            tls = tls.is_some(),
            "Listener bound"
        );

        Ok(Self {
            inner,
            local_addr,
            tls,
            keep_alive: spec.keep_alive,
        })
    }

    /// Get the local address this endpoint is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_tls(&self) -> bool {
        self.tls.is_some()
    }

    /// Start serving `app`. The returned future completes once `handle`
    /// has shut the server down, or on a fatal I/O error.
    pub fn serve(self, app: AppService, handle: Handle) -> BoxFuture<'static, std::io::Result<()>> {
        match self.tls {
            Some(config) => {
                let mut server = axum_server::from_tcp_rustls(self.inner, config).handle(handle);
                server.http_builder().http1().keep_alive(self.keep_alive);
                server.serve(app).boxed()
            }
            None => {
                let mut server = axum_server::from_tcp(self.inner).handle(handle);
                server.http_builder().http1().keep_alive(self.keep_alive);
                server.serve(app).boxed()
            }
        }
    }
}
