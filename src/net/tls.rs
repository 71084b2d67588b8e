//! TLS configuration and certificate loading.

use std::path::PathBuf;

use axum_server::tls_rustls::RustlsConfig;
use thiserror::Error;

use crate::config::CertificatePair;

/// A certificate pair that could not be turned into a server config.
#[derive(Debug, Error)]
#[error("failed to load TLS material (cert {cert}, key {key}): {source}")]
pub struct TlsError {
    pub cert: PathBuf,
    pub key: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Load TLS configuration from a PEM certificate and key pair.
///
/// Files are read now; validation only proved they were readable when the
/// settings were loaded.
pub async fn load_tls_config(pair: &CertificatePair) -> Result<RustlsConfig, TlsError> {
    RustlsConfig::from_pem_file(&pair.cert_file, &pair.key_file)
        .await
        .map_err(|source| TlsError {
            cert: pair.cert_file.clone(),
            key: pair.key_file.clone(),
            source,
        })
}
