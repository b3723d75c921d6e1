//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     close() → Stop accepting → Drain connections → listen() returns
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → close()
//! ```
//!
//! # Design Decisions
//! - The shutdown flag is sticky: a listener started after `close()` exits
//!   immediately

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::shutdown_signal;
