//! Edge HTTP server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ───────────────▶ http::server (request id, trace)
//!                          │
//!                          ▼
//!                      pipeline ── before… → logging → cors → robots → static
//!                          │
//!                          ▼ (static deferred, or no root)
//!                      proxy::resolver (base target + routing cookies)
//!                          │
//!                          ▼
//!                      proxy::forwarder ─────────────────────────▶ Upstream
//! ```

pub mod cli;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod pipeline;
pub mod proxy;

pub use config::{ConfigError, ServerConfig};
pub use http::{EdgeServer, EdgeServerBuilder};
pub use lifecycle::Shutdown;
pub use pipeline::{Interceptor, LogHook, Outcome, PipelineError, RequestHead};
