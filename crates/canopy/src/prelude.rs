//! Prelude module for Canopy.
//!
//! This module re-exports the most commonly used types for convenient importing:
//!
//! ```
//! use canopy::prelude::*;
//! ```
//!
//! This provides access to:
//! - The selection engine (`SelectionEngine`, `SelectionMode`, `SelectionConfig`)
//! - Tree access (`TreeSource`, `RecordTree`, `Visible`)
//! - State and event types (`SelectionState`, `TriState`, `SelectionOutcome`)
//! - Signal/slot system (`Signal`, `InterceptSignal`, `ConnectionId`)

// ============================================================================
// Selection Engine
// ============================================================================

pub use crate::model::{SelectionConfig, SelectionEngine, SelectionMode};

// ============================================================================
// Trees
// ============================================================================

pub use crate::model::{RecordKey, RecordTree, TreeSource, Visible};

// ============================================================================
// State and Events
// ============================================================================

pub use crate::model::{
    SelectionChanged, SelectionChanging, SelectionOutcome, SelectionState, TriState,
};

// ============================================================================
// Signal/Slot System
// ============================================================================

pub use crate::{ConnectionGuard, ConnectionId, InterceptSignal, Signal};
