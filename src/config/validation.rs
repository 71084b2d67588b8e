//! Configuration validation.
//!
//! # Responsibilities
//! - Field presence checks serde cannot express (empty strings, empty lists)
//! - Value ranges (ports, status codes)
//! - Certificate files exist and are readable
//! - File-backed bindings use an allowed extension
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure apart from certificate file checks:
//!   Settings → Result<(), Vec<ValidationError>>
//! - Runs before any listener is touched

use std::collections::HashSet;
use std::fs::File;
use std::path::Path;

use axum::http::{HeaderName, HeaderValue};
use thiserror::Error;

use crate::config::schema::{
    BindingSpec, BodyKind, ListenerSpec, Settings, ALLOWED_FILE_EXTENSIONS,
};

/// Lowest status code a binding may answer with.
pub const MIN_STATUS: u16 = 100;
/// Highest status code a binding may answer with.
pub const MAX_STATUS: u16 = 511;

/// A single semantic problem in a settings document.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("field {0} in settings file must be defined")]
    MissingField(&'static str),

    #[error("field weblisteners in settings file must have at least one entry")]
    NoListeners,

    #[error("listener #{index}: listener name must be defined")]
    MissingListenerName { index: usize },

    #[error("listener {listener}: listener port must be greater than 0")]
    InvalidPort { listener: String },

    #[error("listener {listener}: TLS is enabled but certdetails is missing")]
    MissingCertificate { listener: String },

    #[error("listener {listener}: {which} file is not defined")]
    CertificatePathMissing { listener: String, which: &'static str },

    #[error("listener {listener}: {which} file {path} is not readable: {reason}")]
    CertificateUnreadable {
        listener: String,
        which: &'static str,
        path: String,
        reason: String,
    },

    #[error("listener {listener}, binding #{index}: binding path must be defined")]
    MissingPath { listener: String, index: usize },

    #[error("listener {listener}: binding path {path} must start with '/'")]
    RelativePath { listener: String, path: String },

    #[error("listener {listener}: binding path {path} is bound more than once")]
    DuplicatePath { listener: String, path: String },

    #[error("listener {listener}, binding {path}: header key must be defined")]
    MissingHeaderKey { listener: String, path: String },

    #[error("listener {listener}, binding {path}: header {key} value must be defined")]
    MissingHeaderValue {
        listener: String,
        path: String,
        key: String,
    },

    #[error("listener {listener}, binding {path}: invalid header {key}")]
    InvalidHeader {
        listener: String,
        path: String,
        key: String,
    },

    #[error("listener {listener}, binding {path}: invalid response code {code}")]
    InvalidStatus {
        listener: String,
        path: String,
        code: u16,
    },

    #[error("listener {listener}, binding {path}: response body must be defined")]
    MissingBody { listener: String, path: String },

    #[error("listener {listener}, binding {path}: invalid response body file type: {file}")]
    UnsupportedFileType {
        listener: String,
        path: String,
        file: String,
    },
}

/// Validate a decoded settings document.
pub fn validate_settings(settings: &Settings) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if settings.id.is_empty() {
        errors.push(ValidationError::MissingField("id"));
    }
    if settings.schema.is_empty() {
        errors.push(ValidationError::MissingField("schema"));
    }
    if settings.description.is_empty() {
        errors.push(ValidationError::MissingField("description"));
    }
    if settings.listeners.is_empty() {
        errors.push(ValidationError::NoListeners);
    }

    for (index, listener) in settings.listeners.iter().enumerate() {
        validate_listener(index, listener, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate one listener definition, appending problems to `errors`.
pub fn validate_listener(index: usize, listener: &ListenerSpec, errors: &mut Vec<ValidationError>) {
    if listener.name.is_empty() {
        errors.push(ValidationError::MissingListenerName { index });
    }
    let name = display_name(index, listener);

    if listener.port == 0 {
        errors.push(ValidationError::InvalidPort { listener: name.clone() });
    }

    if listener.tls {
        match &listener.certificate {
            None => errors.push(ValidationError::MissingCertificate { listener: name.clone() }),
            Some(pair) => {
                check_readable(&name, "cert", &pair.cert_file, errors);
                check_readable(&name, "key", &pair.key_file, errors);
            }
        }
    }

    let mut seen = HashSet::new();
    for (binding_index, binding) in listener.bindings.iter().enumerate() {
        validate_binding(&name, binding_index, binding, errors);
        if !binding.path.is_empty() && !seen.insert(binding.path.as_str()) {
            errors.push(ValidationError::DuplicatePath {
                listener: name.clone(),
                path: binding.path.clone(),
            });
        }
    }
}

fn validate_binding(listener: &str, index: usize, binding: &BindingSpec, errors: &mut Vec<ValidationError>) {
    let path = binding.path.clone();
    if path.is_empty() {
        errors.push(ValidationError::MissingPath {
            listener: listener.to_string(),
            index,
        });
    } else if !path.starts_with('/') {
        errors.push(ValidationError::RelativePath {
            listener: listener.to_string(),
            path: path.clone(),
        });
    }

    for header in &binding.headers {
        if header.key.is_empty() {
            errors.push(ValidationError::MissingHeaderKey {
                listener: listener.to_string(),
                path: path.clone(),
            });
        } else if header.value.is_empty() {
            errors.push(ValidationError::MissingHeaderValue {
                listener: listener.to_string(),
                path: path.clone(),
                key: header.key.clone(),
            });
        } else if HeaderName::from_bytes(header.key.as_bytes()).is_err()
            || HeaderValue::from_str(&header.value).is_err()
        {
            errors.push(ValidationError::InvalidHeader {
                listener: listener.to_string(),
                path: path.clone(),
                key: header.key.clone(),
            });
        }
    }

    if !(MIN_STATUS..=MAX_STATUS).contains(&binding.status) {
        errors.push(ValidationError::InvalidStatus {
            listener: listener.to_string(),
            path: path.clone(),
            code: binding.status,
        });
    }

    if binding.body.is_empty() {
        errors.push(ValidationError::MissingBody {
            listener: listener.to_string(),
            path,
        });
        return;
    }

    if binding.kind == BodyKind::File && !has_allowed_extension(&binding.body) {
        errors.push(ValidationError::UnsupportedFileType {
            listener: listener.to_string(),
            path,
            file: binding.body.clone(),
        });
    }
}

/// Whether `file` ends in one of [`ALLOWED_FILE_EXTENSIONS`].
pub fn has_allowed_extension(file: &str) -> bool {
    ALLOWED_FILE_EXTENSIONS.iter().any(|ext| file.ends_with(ext))
}

fn check_readable(listener: &str, which: &'static str, path: &Path, errors: &mut Vec<ValidationError>) {
    if path.as_os_str().is_empty() {
        errors.push(ValidationError::CertificatePathMissing {
            listener: listener.to_string(),
            which,
        });
        return;
    }

    if let Err(e) = File::open(path) {
        errors.push(ValidationError::CertificateUnreadable {
            listener: listener.to_string(),
            which,
            path: path.display().to_string(),
            reason: e.to_string(),
        });
    }
}

fn display_name(index: usize, listener: &ListenerSpec) -> String {
    if listener.name.is_empty() {
        format!("#{index}")
    } else {
        listener.name.clone()
    }
}
