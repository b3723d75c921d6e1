//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check that `api-prefix` compiles and `proxy` is an absolute http(s) URL
//! - Check that seeded header names and values are legal
//! - Check that TLS files exist
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is compiled into `Settings`

use axum::http::{HeaderName, HeaderValue};
use regex::Regex;
use thiserror::Error;
use url::Url;

use crate::config::schema::ServerConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("api-prefix is not a valid regular expression: {0}")]
    ApiPrefix(String),

    #[error("proxy target {target:?} is invalid: {reason}")]
    ProxyTarget { target: String, reason: String },

    #[error("header name {0:?} is invalid")]
    HeaderName(String),

    #[error("value of header {0:?} is invalid")]
    HeaderValue(String),

    #[error("cors header {0:?} is not a valid header name")]
    CorsHeader(String),

    #[error("{kind} file not found: {path}")]
    TlsFile { kind: &'static str, path: String },
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Some(target) = &config.proxy {
        if let Err(reason) = check_proxy_target(target) {
            errors.push(ValidationError::ProxyTarget {
                target: target.clone(),
                reason,
            });
        }
    }

    if let Some(pattern) = &config.api_prefix {
        if let Err(e) = Regex::new(pattern) {
            errors.push(ValidationError::ApiPrefix(e.to_string()));
        }
        if config.proxy.is_none() {
            tracing::warn!(api_prefix = %pattern, "api-prefix has no effect without proxy");
        }
    }

    for (name, value) in &config.headers {
        if HeaderName::from_bytes(name.as_bytes()).is_err() {
            errors.push(ValidationError::HeaderName(name.clone()));
        }
        if HeaderValue::from_str(value).is_err() {
            errors.push(ValidationError::HeaderValue(name.clone()));
        }
    }

    if config.cors {
        if let Some(extra) = &config.cors_headers {
            for name in extra.split(',').map(str::trim).filter(|n| !n.is_empty()) {
                if HeaderName::from_bytes(name.as_bytes()).is_err() {
                    errors.push(ValidationError::CorsHeader(name.to_string()));
                }
            }
        }
    }

    if let Some(tls) = &config.https {
        if !tls.cert.is_file() {
            errors.push(ValidationError::TlsFile {
                kind: "certificate",
                path: tls.cert.display().to_string(),
            });
        }
        if !tls.key.is_file() {
            errors.push(ValidationError::TlsFile {
                kind: "private key",
                path: tls.key.display().to_string(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_proxy_target(target: &str) -> Result<(), String> {
    let url = Url::parse(target).map_err(|e| e.to_string())?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(format!("unsupported scheme {other:?}")),
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    Ok(())
}
