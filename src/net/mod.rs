//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → tls.rs (optional TLS handshake, rustls)
//!     → Hand off to HTTP layer
//! ```
//!
//! # Design Decisions
//! - Certificates are checked at startup, before the listener is bound
//! - TLS is optional and handled transparently

pub mod tls;
