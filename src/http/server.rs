//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Compile the configuration and assemble the pipeline
//! - Create the Axum Router that hands every request to the pipeline
//! - Wire up middleware (tracing, request ID)
//! - Serve plain HTTP or TLS on a caller-supplied listener
//! - Stop accepting on `close()` and drain in-flight requests

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::Response,
    Router,
};
use std::io;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::{ConfigError, ServerConfig, Settings};
use crate::http::request::{RequestIdExt, UuidRequestId};
use crate::lifecycle::Shutdown;
use crate::net::tls;
use crate::observability::TracingLogHook;
use crate::pipeline::{Interceptor, LogHook, Pipeline};

/// Collects programmatic options before the server is created.
pub struct EdgeServerBuilder {
    config: ServerConfig,
    before: Vec<Arc<dyn Interceptor>>,
    log_hook: Option<Arc<dyn LogHook>>,
}

impl EdgeServerBuilder {
    /// Add an interceptor that runs ahead of the built-in ones.
    pub fn before(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.before.push(Arc::new(interceptor));
        self
    }

    /// Replace the default tracing log hook.
    pub fn log_hook(mut self, hook: impl LogHook + 'static) -> Self {
        self.log_hook = Some(Arc::new(hook));
        self
    }

    pub fn build(self) -> Result<EdgeServer, ConfigError> {
        let settings = Settings::compile(&self.config)?;

        let log_hook = if self.config.log.silent {
            None
        } else {
            Some(
                self.log_hook
                    .unwrap_or_else(|| Arc::new(TracingLogHook) as Arc<dyn LogHook>),
            )
        };

        let pipeline = Arc::new(Pipeline::build(&settings, self.before, log_hook)?);
        tracing::info!(
            interceptors = ?pipeline.interceptor_names(),
            proxy = ?settings.proxy.as_ref().map(|p| p.base_target.as_str()),
            root = ?settings.static_files.as_ref().map(|s| s.root.display().to_string()),
            "Server created"
        );

        Ok(EdgeServer {
            router: build_router(pipeline),
            settings: Arc::new(settings),
            shutdown: Shutdown::new(),
        })
    }
}

/// Edge HTTP server: static files, robots, CORS and a cookie-routed proxy.
pub struct EdgeServer {
    router: Router,
    settings: Arc<Settings>,
    shutdown: Shutdown,
}

impl EdgeServer {
    /// Create a server from configuration with no programmatic options.
    pub fn create(config: ServerConfig) -> Result<Self, ConfigError> {
        Self::builder(config).build()
    }

    pub fn builder(config: ServerConfig) -> EdgeServerBuilder {
        EdgeServerBuilder {
            config,
            before: Vec::new(),
            log_hook: None,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The request router, for embedding in another Axum application.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Bind the configured address and serve until `close()`.
    pub async fn bind_and_listen(&self) -> io::Result<()> {
        let listener = TcpListener::bind(&self.settings.bind_address).await?;
        self.listen(listener).await
    }

    /// Serve on `listener` until `close()`. Uses TLS when configured.
    pub async fn listen(&self, listener: TcpListener) -> io::Result<()> {
        let addr = listener.local_addr()?;
        let app = self.router.clone();

        match &self.settings.tls {
            None => {
                tracing::info!(address = %addr, scheme = "http", "Listening for connections");
                axum::serve(listener, app)
                    .with_graceful_shutdown(Shutdown::wait(self.shutdown.subscribe()))
                    .await?;
            }
            Some(tls_settings) => {
                let rustls = tls::load_tls_config(&tls_settings.cert, &tls_settings.key).await?;
                tracing::info!(address = %addr, scheme = "https", "Listening for connections");

                let handle = axum_server::Handle::new();
                let rx = self.shutdown.subscribe();
                let stopper = handle.clone();
                tokio::spawn(async move {
                    Shutdown::wait(rx).await;
                    stopper.graceful_shutdown(None);
                });

                axum_server::from_tcp_rustls(listener.into_std()?, rustls)
                    .handle(handle)
                    .serve(app.into_make_service())
                    .await?;
            }
        }

        tracing::info!(address = %addr, "Server stopped");
        Ok(())
    }

    /// Stop accepting connections; in-flight requests finish.
    pub fn close(&self) {
        tracing::info!("Closing server");
        self.shutdown.trigger();
    }
}

fn build_router(pipeline: Arc<Pipeline>) -> Router {
    Router::new()
        .fallback(dispatch)
        .with_state(pipeline)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
            tracing::info_span!(
                "request",
                method = %req.method(),
                uri = %req.uri(),
                request_id = req.request_id().unwrap_or("-"),
            )
        }))
        .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
}

async fn dispatch(State(pipeline): State<Arc<Pipeline>>, req: Request<Body>) -> Response {
    pipeline.dispatch(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RobotsOption;
    use crate::pipeline::{Outcome, PipelineError, RequestHead};
    use async_trait::async_trait;
    use axum::body::to_bytes;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use std::sync::Mutex;
    use tower::ServiceExt;

    struct Teapot;

    #[async_trait]
    impl Interceptor for Teapot {
        fn name(&self) -> &'static str {
            "teapot"
        }

        async fn intercept(&self, req: Request<Body>) -> Result<Outcome, PipelineError> {
            if req.uri().path() == "/tea" {
                return Ok(Outcome::Handled(StatusCode::IM_A_TEAPOT.into_response()));
            }
            Ok(Outcome::Defer(req))
        }
    }

    fn get(path: &str) -> Request<Body> {
        Request::builder().uri(path).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn responses_carry_request_id() {
        let server = EdgeServer::create(ServerConfig::default()).unwrap();
        let res = server.router().oneshot(get("/")).await.unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert!(res.headers().contains_key("x-request-id"));

        let req = Request::builder()
            .uri("/")
            .header("x-request-id", "given")
            .body(Body::empty())
            .unwrap();
        let res = server.router().oneshot(req).await.unwrap();
        assert_eq!(res.headers()["x-request-id"], "given");
    }

    #[tokio::test]
    async fn before_interceptors_run_ahead_of_builtins() {
        let mut config = ServerConfig::default();
        config.robots = Some(RobotsOption::Enabled(true));
        let server = EdgeServer::builder(config).before(Teapot).build().unwrap();

        let res = server.router().oneshot(get("/tea")).await.unwrap();
        assert_eq!(res.status(), StatusCode::IM_A_TEAPOT);

        let res = server.router().oneshot(get("/robots.txt")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body, "User-agent: *\nDisallow: /");
    }

    #[tokio::test]
    async fn custom_log_hook_sees_requests_unless_silent() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let hook = move |req: &RequestHead, _error: Option<&PipelineError>| {
            sink.lock().unwrap().push(req.uri.path().to_string());
        };

        let server = EdgeServer::builder(ServerConfig::default())
            .log_hook(hook.clone())
            .build()
            .unwrap();
        server.router().oneshot(get("/a")).await.unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["/a".to_string()]);

        let mut config = ServerConfig::default();
        config.log.silent = true;
        let server = EdgeServer::builder(config).log_hook(hook).build().unwrap();
        server.router().oneshot(get("/b")).await.unwrap();
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn invalid_config_fails_creation() {
        let mut config = ServerConfig::default();
        config.proxy = Some("http://127.0.0.1:3000".into());
        config.api_prefix = Some("^/api/(".into());
        assert!(matches!(
            EdgeServer::create(config),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn api_prefix_is_ignored_for_static_only_servers() {
        let root = tempfile::tempdir().unwrap();
        let mut config = ServerConfig::default();
        config.root = Some(root.path().to_path_buf());
        config.api_prefix = Some("^/api/".into());

        let server = EdgeServer::create(config).unwrap();
        assert!(server.settings().proxy.is_none());
    }

    #[tokio::test]
    async fn close_before_listen_returns_promptly() {
        let server = EdgeServer::create(ServerConfig::default()).unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        server.close();
        tokio::time::timeout(std::time::Duration::from_secs(5), server.listen(listener))
            .await
            .unwrap()
            .unwrap();
    }
}
