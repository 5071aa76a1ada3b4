//! How a selection mode turns requested ids into state changes.
//!
//! The engine picks one [`CascadePolicy`] from its [`SelectionMode`] when it
//! is built (and again on `set_mode`), so the operations themselves never
//! branch on the mode.
//!
//! [`SelectionMode`]: super::SelectionMode

use std::fmt;

use canopy_core::logging::targets;

use super::propagation;
use super::state::SelectionState;
use super::tree::{self, RecordKey, TreeSource};

/// Applies select, deselect and refresh requests to a [`SelectionState`].
///
/// Implementations must skip ids the source does not contain and must leave
/// `selected` and `indeterminate` disjoint.
pub trait CascadePolicy<K: RecordKey>: fmt::Debug + Send + Sync {
    /// A short name used in logs.
    fn name(&self) -> &'static str;

    /// Adds `ids` to the selection.
    fn select(&self, source: &dyn TreeSource<K>, state: &mut SelectionState<K>, ids: &[K]);

    /// Removes `ids` from the selection.
    fn deselect(&self, source: &dyn TreeSource<K>, state: &mut SelectionState<K>, ids: &[K]);

    /// Brings `state` back in line after the tree or its visibility changed.
    fn refresh(&self, source: &dyn TreeSource<K>, state: &mut SelectionState<K>);
}

/// Plain set membership, no propagation.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatPolicy;

impl<K: RecordKey> CascadePolicy<K> for FlatPolicy {
    fn name(&self) -> &'static str {
        "flat"
    }

    fn select(&self, source: &dyn TreeSource<K>, state: &mut SelectionState<K>, ids: &[K]) {
        for id in ids {
            if source.contains(id) {
                state.select(id.clone());
            } else {
                tracing::trace!(target: targets::SELECTION, id = ?id, "unknown id skipped");
            }
        }
    }

    fn deselect(&self, source: &dyn TreeSource<K>, state: &mut SelectionState<K>, ids: &[K]) {
        let known: Vec<K> = ids.iter().filter(|id| source.contains(id)).cloned().collect();
        state.deselect_many(&known);
    }

    fn refresh(&self, source: &dyn TreeSource<K>, state: &mut SelectionState<K>) {
        state.retain(|id| source.contains(id));
    }
}

/// Cascades to descendants and recomputes ancestor tri-state.
#[derive(Debug, Clone, Copy, Default)]
pub struct CascadingPolicy {
    cascade_into_hidden: bool,
}

impl CascadingPolicy {
    /// Creates a policy that cascades through visible descendants.
    pub fn new() -> Self {
        Self::default()
    }

    /// Also cascade into descendants the source reports as hidden.
    pub fn with_cascade_into_hidden(mut self, enabled: bool) -> Self {
        self.cascade_into_hidden = enabled;
        self
    }

    /// Returns true if cascades reach hidden descendants.
    pub fn cascades_into_hidden(&self) -> bool {
        self.cascade_into_hidden
    }

    /// The requested ids that exist, each followed by its cascade targets.
    fn expand<K: RecordKey>(&self, source: &dyn TreeSource<K>, ids: &[K]) -> Vec<K> {
        let mut frontier = Vec::new();
        for id in ids {
            if !source.contains(id) {
                tracing::trace!(target: targets::SELECTION, id = ?id, "unknown id skipped");
                continue;
            }
            frontier.push(id.clone());
            if self.cascade_into_hidden {
                frontier.extend(tree::all_child_records(source, id));
            } else {
                frontier.extend(tree::visible_child_records(source, id));
            }
        }
        frontier
    }
}

impl<K: RecordKey> CascadePolicy<K> for CascadingPolicy {
    fn name(&self) -> &'static str {
        "cascading"
    }

    fn select(&self, source: &dyn TreeSource<K>, state: &mut SelectionState<K>, ids: &[K]) {
        let frontier = self.expand(source, ids);
        for id in &frontier {
            state.select(id.clone());
        }
        let changed = propagation::propagate_up(source, state, &frontier);
        tracing::trace!(target: targets::PROPAGATION, frontier = frontier.len(), changed, "select propagated");
    }

    fn deselect(&self, source: &dyn TreeSource<K>, state: &mut SelectionState<K>, ids: &[K]) {
        let frontier = self.expand(source, ids);
        state.deselect_many(&frontier);
        let changed = propagation::propagate_up(source, state, &frontier);
        tracing::trace!(target: targets::PROPAGATION, frontier = frontier.len(), changed, "deselect propagated");
    }

    fn refresh(&self, source: &dyn TreeSource<K>, state: &mut SelectionState<K>) {
        propagation::resync(source, state);
    }
}
