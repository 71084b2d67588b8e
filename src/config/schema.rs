//! Configuration schema definitions.
//!
//! This module defines the structure of a mock API settings document.
//! Field names follow the lowercase keys used by existing settings files
//! (`listenername`, `contentbindings`, ...), so every field carries an
//! explicit serde rename.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// File extensions a `file` binding may serve.
pub const ALLOWED_FILE_EXTENSIONS: [&str; 5] = [".json", ".txt", ".csv", ".html", ".xml"];

/// Root of a settings document.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Settings {
    /// Document identifier.
    #[serde(default)]
    pub id: String,

    /// Schema tag, free-form.
    #[serde(default)]
    pub schema: String,

    #[serde(default)]
    pub description: String,

    /// Listener definitions, one HTTP endpoint each.
    #[serde(default, rename = "weblisteners")]
    pub listeners: Vec<ListenerSpec>,
}

/// One listener: a bound port plus its ordered path bindings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListenerSpec {
    /// Listener name, used in logs.
    #[serde(default, rename = "listenername")]
    pub name: String,

    /// TCP port to bind.
    #[serde(default, rename = "listenerport")]
    pub port: u16,

    /// Interface to bind (default: all IPv4 interfaces).
    #[serde(default = "default_address", rename = "listeneraddress")]
    pub address: IpAddr,

    /// Whether HTTP/1 connections are kept alive between requests.
    #[serde(default = "default_keep_alive", rename = "onconnectkeepalive")]
    pub keep_alive: bool,

    /// Serve over TLS using `certificate`.
    #[serde(default, rename = "enabletls")]
    pub tls: bool,

    /// Certificate and key pair, required when `tls` is set.
    #[serde(default, rename = "certdetails")]
    pub certificate: Option<CertificatePair>,

    /// Path bindings in declaration order.
    #[serde(default, rename = "contentbindings")]
    pub bindings: Vec<BindingSpec>,
}

fn default_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_keep_alive() -> bool {
    true
}

impl ListenerSpec {
    /// Create a plain HTTP listener with no bindings.
    pub fn new(name: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            port,
            address: default_address(),
            keep_alive: default_keep_alive(),
            tls: false,
            certificate: None,
            bindings: Vec::new(),
        }
    }

    /// Set the interface address to bind.
    pub fn with_address(mut self, address: IpAddr) -> Self {
        self.address = address;
        self
    }

    /// Append a binding.
    pub fn with_binding(mut self, binding: BindingSpec) -> Self {
        self.bindings.push(binding);
        self
    }

    /// Enable TLS with the given certificate and key files.
    pub fn with_tls(mut self, cert_file: impl Into<PathBuf>, key_file: impl Into<PathBuf>) -> Self {
        self.tls = true;
        self.certificate = Some(CertificatePair {
            cert_file: cert_file.into(),
            key_file: key_file.into(),
        });
        self
    }
}

/// PEM certificate and private key files.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CertificatePair {
    #[serde(default, rename = "certfile")]
    pub cert_file: PathBuf,

    #[serde(default, rename = "keyfile")]
    pub key_file: PathBuf,
}

/// Maps one exact URL path to a canned response.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BindingSpec {
    /// Exact request path, e.g. `/ping`.
    #[serde(default, rename = "bindingpath")]
    pub path: String,

    /// Headers written in declaration order.
    #[serde(default, rename = "responseheaders")]
    pub headers: Vec<ResponseHeader>,

    /// Response status code.
    #[serde(default, rename = "responsecode")]
    pub status: u16,

    /// Inline body, or a file path for `BodyKind::File`.
    #[serde(default, rename = "responsebody")]
    pub body: String,

    #[serde(rename = "responsebodytype")]
    pub kind: BodyKind,
}

impl BindingSpec {
    /// Binding answering with `body` verbatim.
    pub fn inline(path: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            headers: Vec::new(),
            status,
            body: body.into(),
            kind: BodyKind::Inline,
        }
    }

    /// Binding answering with the contents of `file`, read per request.
    pub fn file(path: impl Into<String>, status: u16, file: impl Into<String>) -> Self {
        Self {
            kind: BodyKind::File,
            ..Self::inline(path, status, file)
        }
    }

    /// Append a response header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(ResponseHeader {
            key: key.into(),
            value: value.into(),
        });
        self
    }
}

/// A single response header.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResponseHeader {
    #[serde(default, rename = "headerkey")]
    pub key: String,

    #[serde(default, rename = "headervalue")]
    pub value: String,
}

/// Where a binding's response body comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyKind {
    /// The body string itself.
    Inline,
    /// Contents of the file named by the body string.
    File,
    /// Reserved for upstream forwarding; writes no body.
    Proxy,
}

impl fmt::Display for BodyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BodyKind::Inline => "inline",
            BodyKind::File => "file",
            BodyKind::Proxy => "proxy",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_lowercase_keys() {
        let yaml = r#"
id: mock
schema: v1
description: demo
weblisteners:
  - listenername: api
    listenerport: 8080
    enabletls: false
    contentbindings:
      - bindingpath: /ping
        responseheaders:
          - headerkey: Content-Type
            headervalue: text/plain
        responsecode: 200
        responsebody: pong
        responsebodytype: inline
"#;
        let settings: Settings = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(settings.id, "mock");
        assert_eq!(settings.listeners.len(), 1);

        let listener = &settings.listeners[0];
        assert_eq!(listener.name, "api");
        assert_eq!(listener.port, 8080);
        assert_eq!(listener.address, default_address());
        assert!(listener.keep_alive);
        assert!(listener.certificate.is_none());

        let binding = &listener.bindings[0];
        assert_eq!(binding.path, "/ping");
        assert_eq!(binding.headers[0].key, "Content-Type");
        assert_eq!(binding.status, 200);
        assert_eq!(binding.kind, BodyKind::Inline);
    }

    #[test]
    fn unknown_body_kind_is_rejected() {
        let yaml = r#"
bindingpath: /x
responsecode: 200
responsebody: x
responsebodytype: stream
"#;
        assert!(serde_yaml::from_str::<BindingSpec>(yaml).is_err());
    }

    #[test]
    fn body_kind_display() {
        assert_eq!(BodyKind::Inline.to_string(), "inline");
        assert_eq!(BodyKind::File.to_string(), "file");
        assert_eq!(BodyKind::Proxy.to_string(), "proxy");
    }
}
