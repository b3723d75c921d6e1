//! Upstream forwarding.
//!
//! # Responsibilities
//! - Build the outbound request for a resolved target
//! - Rename the routing cookie so the upstream cannot re-trigger routing
//! - Pin `Host` when the target was rewritten to an IP
//! - Stream the upstream response back with `www-authenticate: None`
//! - Splice WebSocket upgrades end to end
//!
//! # Design Decisions
//! - One shared `reqwest::Client`; upstream certificates are not verified
//! - Redirects are passed through to the client, never followed
//! - Hop-by-hop headers are stripped in both directions (except the upgrade
//!   pair on upgrade requests)

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderName, HeaderValue, Request, Response, StatusCode, Version},
};
use hyper_util::rt::TokioIo;
use url::Url;

use crate::proxy::resolver::{ProxyResolution, PROXY_API_URL};
use crate::proxy::ForwardError;

/// Name the routing cookie is renamed to on the way upstream.
pub const RENAMED_PROXY_API_URL: &str = "proxy_api_temp_api_url";

const HOP_BY_HOP: [&str; 7] = [
    "connection",
    "keep-alive",
    "proxy-connection",
    "proxy-authenticate",
    "te",
    "trailer",
    "transfer-encoding",
];

/// Forwards requests through a shared HTTP client.
#[derive(Debug, Clone)]
pub struct Forwarder {
    client: reqwest::Client,
}

impl Forwarder {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .redirect(reqwest::redirect::Policy::none())
            .no_proxy()
            .build()?;
        Ok(Self { client })
    }

    /// Forward one request to the resolved target.
    pub async fn forward(
        &self,
        mut req: Request<Body>,
        resolution: &ProxyResolution,
    ) -> Result<Response<Body>, ForwardError> {
        let upgrade = is_upgrade_request(req.headers());
        let client_upgrade = upgrade.then(|| hyper::upgrade::on(&mut req));

        let path_and_query = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let url = upstream_url(&resolution.target, path_and_query);

        let (parts, body) = req.into_parts();
        let headers = outbound_headers(&parts.headers, resolution.host_override.as_deref(), upgrade);
        let has_body = parts.headers.contains_key(header::CONTENT_LENGTH)
            || parts.headers.contains_key(header::TRANSFER_ENCODING);

        tracing::debug!(method = %parts.method, url = %url, "Forwarding upstream");

        let mut builder = self
            .client
            .request(parts.method, url)
            .headers(headers);
        if upgrade {
            builder = builder.version(Version::HTTP_11);
        }
        if has_body {
            builder = builder.body(reqwest::Body::wrap_stream(body.into_data_stream()));
        }

        let upstream = builder.send().await?;
        let status = upstream.status();

        let mut response = Response::builder().status(status);
        if let Some(headers) = response.headers_mut() {
            *headers = inbound_headers(upstream.headers(), status == StatusCode::SWITCHING_PROTOCOLS);
        }

        match client_upgrade {
            Some(client_upgrade) if status == StatusCode::SWITCHING_PROTOCOLS => {
                tokio::spawn(async move {
                    let (client, mut server) = match tokio::try_join!(
                        async { client_upgrade.await.map_err(|e| e.to_string()) },
                        async { upstream.upgrade().await.map_err(|e| e.to_string()) },
                    ) {
                        Ok(pair) => pair,
                        Err(error) => {
                            tracing::warn!(error = %error, "WebSocket upgrade failed");
                            return;
                        }
                    };
                    let mut client = TokioIo::new(client);
                    match tokio::io::copy_bidirectional(&mut client, &mut server).await {
                        Ok((from_client, from_server)) => {
                            tracing::debug!(from_client, from_server, "WebSocket closed")
                        }
                        Err(error) => tracing::debug!(error = %error, "WebSocket ended"),
                    }
                });
                Ok(response.body(Body::empty())?)
            }
            _ => Ok(response.body(Body::from_stream(upstream.bytes_stream()))?),
        }
    }
}

/// Join the target's path prefix with the request path; the query comes from
/// the request.
pub fn upstream_url(target: &Url, path_and_query: &str) -> Url {
    let (path, query) = match path_and_query.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (path_and_query, None),
    };
    let prefix = target.path().trim_end_matches('/');

    let mut url = target.clone();
    url.set_path(&format!("{prefix}{path}"));
    url.set_query(query);
    url
}

/// Rename the first `proxy_api_url=` in a Cookie value.
pub fn rename_routing_cookie(cookie: &str) -> String {
    cookie.replacen(
        &format!("{PROXY_API_URL}="),
        &format!("{RENAMED_PROXY_API_URL}="),
        1,
    )
}

fn is_upgrade_request(headers: &HeaderMap) -> bool {
    headers.contains_key(header::UPGRADE)
        && headers
            .get_all(header::CONNECTION)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(','))
            .any(|token| token.trim().eq_ignore_ascii_case("upgrade"))
}

/// Names listed in `Connection` are hop-by-hop as well.
fn connection_listed(headers: &HeaderMap) -> Vec<HeaderName> {
    headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|token| HeaderName::from_bytes(token.trim().as_bytes()).ok())
        .collect()
}

fn strip_hop_by_hop(headers: &mut HeaderMap, keep_upgrade: bool) {
    for name in connection_listed(headers) {
        if keep_upgrade && name == header::UPGRADE {
            continue;
        }
        headers.remove(&name);
    }
    for name in HOP_BY_HOP {
        if keep_upgrade && name == "connection" {
            continue;
        }
        headers.remove(name);
    }
    if !keep_upgrade {
        headers.remove(header::UPGRADE);
    }
}

/// Headers sent upstream.
pub fn outbound_headers(incoming: &HeaderMap, host_override: Option<&str>, upgrade: bool) -> HeaderMap {
    let mut headers = incoming.clone();
    strip_hop_by_hop(&mut headers, upgrade);
    headers.remove(header::HOST);

    if headers.contains_key(header::COOKIE) {
        let renamed: Vec<HeaderValue> = headers
            .get_all(header::COOKIE)
            .iter()
            .map(|value| match value.to_str() {
                Ok(cookie) => HeaderValue::from_str(&rename_routing_cookie(cookie))
                    .unwrap_or_else(|_| value.clone()),
                Err(_) => value.clone(),
            })
            .collect();
        headers.remove(header::COOKIE);
        for value in renamed {
            headers.append(header::COOKIE, value);
        }
    }

    if let Some(host) = host_override.and_then(|h| HeaderValue::from_str(h).ok()) {
        headers.insert(header::HOST, host);
    }
    headers
}

/// Headers returned to the client.
pub fn inbound_headers(upstream: &HeaderMap, upgrade: bool) -> HeaderMap {
    let mut headers = upstream.clone();
    strip_hop_by_hop(&mut headers, upgrade);
    headers.insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("None"));
    headers
}
