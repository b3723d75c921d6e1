//! Per-request proxy target resolution.
//!
//! # Responsibilities
//! - Start from the configured base target
//! - On paths matching `api-prefix`, let the `proxy_api_url` and
//!   `proxy_api_hosts` routing cookies steer the target
//! - Never touch shared state; every call is a pure function of the request
//!
//! # Design Decisions
//! - Cookies are located by a raw scan of the header, not a full cookie parse.
//!   Quoted values containing `;` are not supported.
//! - Malformed cookies degrade to the best partial resolution, never an error
//! - The result is always a parsed `Url`; anything unparsable falls back to
//!   the base target

use url::Url;

use crate::config::ProxySettings;

/// Cookie naming the upstream URL.
pub const PROXY_API_URL: &str = "proxy_api_url";

/// Cookie holding `<ip> <host>` for host-to-IP pinning.
pub const PROXY_API_HOSTS: &str = "proxy_api_hosts";

/// Where a single request should go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyResolution {
    pub target: Url,
    /// Value for the outbound `Host` header, when pinned to an IP.
    pub host_override: Option<String>,
}

/// Find the first non-empty `key=<value>` in a raw Cookie header; the value
/// ends at `;` or the end of the string.
pub fn scan_cookie<'a>(cookie_header: &'a str, key: &str) -> Option<&'a str> {
    let needle = format!("{key}=");
    cookie_header
        .match_indices(&needle)
        .filter_map(|(start, _)| cookie_header[start + needle.len()..].split(';').next())
        .find(|value| !value.is_empty())
}

/// Split a `proxy_api_hosts` value into `(ip, host)`.
fn split_hosts(value: &str) -> Option<(&str, &str)> {
    let mut tokens = value.split_whitespace();
    match (tokens.next(), tokens.next()) {
        (Some(ip), Some(host)) => Some((ip, host)),
        _ => None,
    }
}

/// Resolve the upstream for one request.
pub fn resolve(settings: &ProxySettings, path: &str, cookie_header: Option<&str>) -> ProxyResolution {
    let base = ProxyResolution {
        target: settings.base_target.clone(),
        host_override: None,
    };

    let Some(prefix) = &settings.api_prefix else {
        return base;
    };
    if !prefix.is_match(path) {
        return base;
    }
    let Some(cookies) = cookie_header else {
        return base;
    };

    let mut target = settings.base_target.as_str().to_string();
    let mut host_override = None;

    if let Some(url) = scan_cookie(cookies, PROXY_API_URL) {
        target = url.to_string();
    }

    if let Some((ip, host)) = scan_cookie(cookies, PROXY_API_HOSTS).and_then(split_hosts) {
        target = target.replacen(host, ip, 1);
        host_override = Some(host.to_string());
    }

    match Url::parse(&target) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => ProxyResolution {
            target: url,
            host_override,
        },
        _ => {
            tracing::debug!(target = %target, "Routing cookie produced an unusable target, using base");
            base
        }
    }
}
