//! Static-file interceptor.
//!
//! # Responsibilities
//! - Adapt `StaticSettings` onto tower-http's `ServeDir`
//! - Try the default extension for extension-less paths
//! - Hide dotfiles, add cache headers, apply the fallback content type
//! - Render directory listings when enabled
//!
//! # Design Decisions
//! - With a proxy configured, not-found and bad-method results defer so the
//!   proxy interceptor gets the request
//! - The original request (and its body) is kept aside and handed back on defer

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, request::Parts, HeaderValue, Method, Request, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use tower_http::services::ServeDir;

use crate::config::StaticSettings;
use crate::pipeline::listing;
use crate::pipeline::{Interceptor, Outcome, PipelineError};

pub struct StaticInterceptor {
    settings: StaticSettings,
    serve_dir: ServeDir,
    cache_control: Option<HeaderValue>,
    content_type: Option<HeaderValue>,
}

impl StaticInterceptor {
    pub fn new(settings: StaticSettings) -> Self {
        let mut serve_dir =
            ServeDir::new(&settings.root).append_index_html_on_directories(settings.auto_index);
        if settings.gzip {
            serve_dir = serve_dir.precompressed_gzip();
        }

        let cache_control = HeaderValue::from_str(&format!("max-age={}", settings.cache_secs)).ok();
        let content_type = HeaderValue::from_str(&settings.default_content_type).ok();

        Self {
            settings,
            serve_dir,
            cache_control,
            content_type,
        }
    }

    /// Rebuild a bodiless request for the engine, optionally on a new path.
    fn probe(parts: &Parts, path: Option<&str>) -> Result<Request<Body>, PipelineError> {
        let uri = match path {
            Some(path) => match parts.uri.query() {
                Some(query) => format!("{path}?{query}"),
                None => path.to_string(),
            },
            None => parts.uri.to_string(),
        };
        let mut req = Request::builder()
            .method(parts.method.clone())
            .version(parts.version)
            .uri(uri)
            .body(Body::empty())?;
        *req.headers_mut() = parts.headers.clone();
        Ok(req)
    }

    async fn serve(&self, req: Request<Body>) -> Result<Response, PipelineError> {
        let res = self.serve_dir.clone().try_call(req).await?;
        Ok(res.map(Body::new))
    }

    fn extension_candidate(&self, path: &str) -> Option<String> {
        let ext = self.settings.default_extension.as_deref()?;
        let last = path.rsplit('/').next().unwrap_or_default();
        (!last.is_empty() && !last.contains('.')).then(|| format!("{path}.{ext}"))
    }

    async fn listing(&self, parts: &Parts) -> Result<Option<Response>, PipelineError> {
        let path = parts.uri.path();
        let Some(dir) = listing::resolve(&self.settings.root, path) else {
            return Ok(None);
        };
        if !tokio::fs::metadata(&dir).await.map(|m| m.is_dir()).unwrap_or(false) {
            return Ok(None);
        }
        if !path.ends_with('/') {
            return Ok(Some(Redirect::permanent(&format!("{path}/")).into_response()));
        }
        let html = listing::render(&dir, path, self.settings.show_dotfiles).await?;
        Ok(Some(
            (
                [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                html,
            )
                .into_response(),
        ))
    }

    fn decorate(&self, mut res: Response) -> Response {
        let status = res.status();
        if status.is_success() || status == StatusCode::NOT_MODIFIED {
            if let Some(cache_control) = &self.cache_control {
                res.headers_mut()
                    .entry(header::CACHE_CONTROL)
                    .or_insert_with(|| cache_control.clone());
            }
        }
        if let Some(content_type) = &self.content_type {
            let generic = res
                .headers()
                .get(header::CONTENT_TYPE)
                .is_some_and(|v| v == "application/octet-stream");
            if generic {
                res.headers_mut().insert(header::CONTENT_TYPE, content_type.clone());
            }
        }
        res
    }

    fn not_found(&self, parts: Parts, body: Body) -> Outcome {
        if self.settings.handle_error {
            Outcome::Handled(StatusCode::NOT_FOUND.into_response())
        } else {
            tracing::trace!(path = %parts.uri.path(), "Static miss, deferring");
            Outcome::Defer(Request::from_parts(parts, body))
        }
    }
}

#[async_trait]
impl Interceptor for StaticInterceptor {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn intercept(&self, req: Request<Body>) -> Result<Outcome, PipelineError> {
        let (parts, body) = req.into_parts();

        if parts.method != Method::GET && parts.method != Method::HEAD {
            if self.settings.handle_error {
                return Ok(Outcome::Handled(
                    (StatusCode::METHOD_NOT_ALLOWED, [(header::ALLOW, "GET, HEAD")]).into_response(),
                ));
            }
            return Ok(Outcome::Defer(Request::from_parts(parts, body)));
        }

        if !self.settings.show_dotfiles && listing::has_dot_segment(parts.uri.path()) {
            return Ok(self.not_found(parts, body));
        }

        if let Some(candidate) = self.extension_candidate(parts.uri.path()) {
            let res = self.serve(Self::probe(&parts, Some(&candidate))?).await?;
            if res.status() != StatusCode::NOT_FOUND {
                return Ok(Outcome::Handled(self.decorate(res)));
            }
        }

        let res = self.serve(Self::probe(&parts, None)?).await?;
        if res.status() != StatusCode::NOT_FOUND {
            return Ok(Outcome::Handled(self.decorate(res)));
        }

        if self.settings.show_dir {
            if let Some(res) = self.listing(&parts).await? {
                return Ok(Outcome::Handled(res));
            }
        }

        Ok(self.not_found(parts, body))
    }
}
