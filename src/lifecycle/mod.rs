//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Cancel change streams → Drain (bounded) → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Change streams are open-ended, so shutdown cancels them explicitly;
//!   otherwise draining would never finish

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
