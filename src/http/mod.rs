//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, plain or TLS listener)
//!     → request.rs (request ID)
//!     → pipeline (interceptors decide: static, robots, CORS, proxy)
//!     → headers.rs (seeded response headers)
//!     → Send to client
//! ```

pub mod headers;
pub mod request;
pub mod server;

pub use request::{RequestIdExt, UuidRequestId, X_REQUEST_ID};
pub use server::{EdgeServer, EdgeServerBuilder};
