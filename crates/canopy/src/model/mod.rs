//! Selection model for record trees.
//!
//! This module provides the selection engine and the types around it:
//!
//! - `TreeSource`: Read-only view of a forest of records, keyed by id
//! - `RecordTree`: Arena implementation of `TreeSource`
//! - `Visible`: Restricts a source to the records the host shows
//! - `SelectionState` / `TriState`: The selected and indeterminate sets
//! - `CascadePolicy`: How a mode turns requests into state changes
//! - `SelectionEngine`: Owns the state and emits change notifications
//! - `SelectionTreeDebug`: Text rendering of a tree with its checkboxes
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────┐     ┌─────────────────┐     ┌────────────────┐
//! │ TreeSource  │────>│ SelectionEngine │────>│    Signals     │
//! │ (+ Visible) │     │                 │     │ before / after │
//! └─────────────┘     └─────────────────┘     └────────────────┘
//!                              │
//!                              v
//!                     ┌─────────────────┐     ┌────────────────┐
//!                     │  CascadePolicy  │────>│ SelectionState │
//!                     │  (propagation)  │     │                │
//!                     └─────────────────┘     └────────────────┘
//! ```
//!
//! The host keeps ownership of its records and passes a `TreeSource` to
//! every call. Tri-state is derived from visible children only, so a
//! filtered view changes what a parent reports without touching the
//! selection of hidden records.

mod config;
mod debug;
mod events;
mod policy;
pub mod propagation;
pub mod selection;
mod state;
pub mod tree;

pub use config::SelectionConfig;
pub use debug::SelectionTreeDebug;
pub use events::{SelectionChanged, SelectionChanging, SelectionOutcome};
pub use policy::{CascadePolicy, CascadingPolicy, FlatPolicy};
pub use selection::{SelectionEngine, SelectionMode};
pub use state::{SelectionState, TriState};
pub use tree::{
    Record, RecordKey, RecordTree, TreeSource, Visible, all_child_records, ancestors, depth,
    visible_child_records, visible_records,
};
