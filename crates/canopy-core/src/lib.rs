//! Core systems for Canopy.
//!
//! This crate provides the foundational pieces shared by the Canopy
//! selection engine:
//!
//! - **Signal/Slot System**: Synchronous, type-safe change notification
//! - **Intercept Signals**: Before-notifications whose slots may veto or
//!   rewrite a pending change
//! - **Errors**: The workspace error type
//! - **Logging**: `tracing` targets and tree debug-format options
//!
//! # Signal/Slot Example
//!
//! ```
//! use canopy_core::{InterceptSignal, Signal};
//!
//! let value_changed = Signal::<i32>::new();
//! let conn_id = value_changed.connect(|value| {
//!     println!("Value changed to: {}", value);
//! });
//! value_changed.emit(42);
//! value_changed.disconnect(conn_id);
//!
//! // A veto hook: any slot may turn `true` into `false`.
//! let may_close = InterceptSignal::<bool>::new();
//! may_close.connect(|allowed| *allowed = false);
//! assert!(!may_close.emit(true));
//! ```

mod error;
pub mod logging;
pub mod signal;

pub use error::{Error, Result};
pub use logging::{TreeFormatOptions, TreeStyle};
pub use signal::{ConnectionGuard, ConnectionId, InterceptSignal, Signal};
