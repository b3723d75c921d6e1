//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events with structured fields
//!     → TraceLayer spans carrying the request id
//!
//! The pipeline's log hook:
//!     → logging.rs (one line per request, errors attached)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through all subsystems
//! - `RUST_LOG` wins over the configured level

pub mod logging;

pub use logging::{init_tracing, TracingLogHook};
