//! Canopy - tri-state cascading selection for tree-shaped record sets.
//!
//! This is the main crate; it re-exports the core systems from
//! `canopy-core` and adds the selection engine in [`model`].
//!
//! # Example
//!
//! ```
//! use canopy::prelude::*;
//!
//! let tree = RecordTree::from_parent_pairs([
//!     (1, None),
//!     (2, Some(1)),
//!     (3, Some(1)),
//! ])
//! .unwrap();
//!
//! let mut engine = SelectionEngine::new();
//! engine.selection_changed.connect(|event| {
//!     println!("now selected: {:?}", event.new_selection);
//! });
//!
//! let outcome = engine.select_row(&tree, 1, false);
//! assert_eq!(outcome.final_selection.len(), 3);
//! assert_eq!(engine.row_state(&2), TriState::Selected);
//! ```

pub use canopy_core::*;

pub mod model;
pub mod prelude;
