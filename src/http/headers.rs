//! Response header assembly.
//!
//! # Responsibilities
//! - Build the header set seeded on every response, once, at startup
//! - Merge the CORS allow-list from a fixed base and operator extras
//! - Seed those headers onto responses without clobbering what handlers set
//!
//! # Design Decisions
//! - `compute_headers` is pure: configuration in, new `HeaderMap` out
//! - Seeded headers never overwrite a header a handler or upstream already set

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};
use std::collections::BTreeMap;

use crate::config::ValidationError;

/// Headers every CORS allow-list starts with.
pub const BASE_CORS_HEADERS: [&str; 5] = ["Origin", "X-Requested-With", "Content-Type", "Accept", "Range"];

/// Methods advertised in preflight answers.
pub const CORS_ALLOW_METHODS: &str = "GET, HEAD, POST";

/// The computed CORS allow-list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsHeaders {
    names: Vec<String>,
}

impl CorsHeaders {
    /// Base set followed by the comma-separated `extra` names, each once.
    pub fn new(extra: Option<&str>) -> Self {
        let mut names: Vec<String> = BASE_CORS_HEADERS.iter().map(|h| h.to_string()).collect();
        for name in extra
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|n| !n.is_empty())
        {
            if !names.iter().any(|existing| existing.eq_ignore_ascii_case(name)) {
                names.push(name.to_string());
            }
        }
        Self { names }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Value of `Access-Control-Allow-Headers`.
    pub fn allow_headers(&self) -> String {
        self.names.join(", ")
    }
}

/// Assemble the final response header set.
pub fn compute_headers(
    base: &BTreeMap<String, String>,
    cors: Option<&CorsHeaders>,
) -> Result<HeaderMap, ValidationError> {
    let mut headers = HeaderMap::with_capacity(base.len() + 2);

    for (name, value) in base {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ValidationError::HeaderName(name.clone()))?;
        let header_value =
            HeaderValue::from_str(value).map_err(|_| ValidationError::HeaderValue(name.clone()))?;
        headers.insert(header_name, header_value);
    }

    if let Some(cors) = cors {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
        let allow = cors.allow_headers();
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_str(&allow)
                .map_err(|_| ValidationError::CorsHeader(allow.clone()))?,
        );
    }

    Ok(headers)
}

/// Insert each seeded header the response does not already carry.
pub fn seed_headers(target: &mut HeaderMap, seeded: &HeaderMap) {
    for name in seeded.keys() {
        if !target.contains_key(name) {
            for value in seeded.get_all(name) {
                target.append(name.clone(), value.clone());
            }
        }
    }
}
