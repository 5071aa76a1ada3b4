//! Selection state: the `selected` and `indeterminate` id sets.

use std::collections::HashSet;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use canopy_core::Result;

use super::tree::RecordKey;

/// Checkbox state of a single record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriState {
    /// The record is not selected and has no selected descendants.
    #[default]
    Unselected,
    /// Some, but not all, visible descendants are selected.
    Indeterminate,
    /// The record is fully selected.
    Selected,
}

impl TriState {
    /// Returns `true` if the state is `Selected`.
    pub fn is_selected(&self) -> bool {
        matches!(self, TriState::Selected)
    }

    /// Returns `true` if the state is `Indeterminate`.
    pub fn is_indeterminate(&self) -> bool {
        matches!(self, TriState::Indeterminate)
    }

    /// Returns `true` for `Selected` and `Indeterminate`.
    pub fn is_marked(&self) -> bool {
        !matches!(self, TriState::Unselected)
    }
}

/// The selection state owned by a [`SelectionEngine`].
///
/// An id is in at most one of the two sets. The selected set keeps
/// selection order, which is the order reported by
/// [`selected_ids`](Self::selected_ids). The indeterminate set has no
/// meaningful order. Equality compares set contents and ignores order.
///
/// [`SelectionEngine`]: super::SelectionEngine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionState<K: RecordKey> {
    selected: IndexSet<K>,
    indeterminate: IndexSet<K>,
}

impl<K: RecordKey> Default for SelectionState<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: RecordKey> SelectionState<K> {
    /// Creates an empty state.
    pub fn new() -> Self {
        Self {
            selected: IndexSet::new(),
            indeterminate: IndexSet::new(),
        }
    }

    /// Builds a state from explicit sets. Ids listed in both end up selected.
    pub fn from_sets(
        selected: impl IntoIterator<Item = K>,
        indeterminate: impl IntoIterator<Item = K>,
    ) -> Self {
        let selected: IndexSet<K> = selected.into_iter().collect();
        let indeterminate = indeterminate
            .into_iter()
            .filter(|id| !selected.contains(id))
            .collect();
        Self {
            selected,
            indeterminate,
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Checks if a record is fully selected.
    pub fn is_selected(&self, id: &K) -> bool {
        self.selected.contains(id)
    }

    /// Checks if a record is indeterminate.
    pub fn is_indeterminate(&self, id: &K) -> bool {
        self.indeterminate.contains(id)
    }

    /// Returns the tri-state of a record.
    pub fn tri_state(&self, id: &K) -> TriState {
        if self.selected.contains(id) {
            TriState::Selected
        } else if self.indeterminate.contains(id) {
            TriState::Indeterminate
        } else {
            TriState::Unselected
        }
    }

    /// The selected set, in selection order.
    pub fn selected(&self) -> &IndexSet<K> {
        &self.selected
    }

    /// The indeterminate set.
    pub fn indeterminate(&self) -> &IndexSet<K> {
        &self.indeterminate
    }

    /// Selected ids in selection order.
    pub fn selected_ids(&self) -> Vec<K> {
        self.selected.iter().cloned().collect()
    }

    /// Indeterminate ids.
    pub fn indeterminate_ids(&self) -> Vec<K> {
        self.indeterminate.iter().cloned().collect()
    }

    /// Number of selected ids.
    pub fn selected_count(&self) -> usize {
        self.selected.len()
    }

    /// Returns true if nothing is selected or indeterminate.
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty() && self.indeterminate.is_empty()
    }

    /// Returns true if the two sets are disjoint.
    pub fn is_consistent(&self) -> bool {
        self.selected.is_disjoint(&self.indeterminate)
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Marks a record selected. Returns true if its state changed.
    pub fn select(&mut self, id: K) -> bool {
        let left_indeterminate = self.indeterminate.swap_remove(&id);
        self.selected.insert(id) || left_indeterminate
    }

    /// Clears a record's state. Returns true if its state changed.
    pub fn deselect(&mut self, id: &K) -> bool {
        let was_selected = self.selected.shift_remove(id);
        let was_indeterminate = self.indeterminate.swap_remove(id);
        was_selected || was_indeterminate
    }

    /// Clears the state of every id in `ids`. Returns the number of records
    /// whose state changed.
    ///
    /// The selected set is filtered in a single pass, so this stays linear
    /// for large batches.
    pub fn deselect_many(&mut self, ids: &[K]) -> usize {
        let leaving: HashSet<&K> = ids.iter().filter(|id| self.selected.contains(*id)).collect();
        let mut changed = leaving.len();
        if !leaving.is_empty() {
            self.selected.retain(|id| !leaving.contains(id));
        }
        for id in ids {
            if self.indeterminate.swap_remove(id) {
                changed += 1;
            }
        }
        changed
    }

    /// Sets a record's tri-state. Returns true if it changed.
    pub fn set_tri_state(&mut self, id: &K, state: TriState) -> bool {
        if self.tri_state(id) == state {
            return false;
        }
        match state {
            TriState::Selected => {
                self.select(id.clone());
            }
            TriState::Indeterminate => {
                self.selected.shift_remove(id);
                self.indeterminate.insert(id.clone());
            }
            TriState::Unselected => {
                self.deselect(id);
            }
        }
        true
    }

    /// Applies a batch of tri-state updates.
    ///
    /// Later entries for the same id win. Ids leaving the selected set are
    /// removed in one pass at the end, keeping the order of the rest.
    pub fn apply(&mut self, changes: impl IntoIterator<Item = (K, TriState)>) {
        let mut leaving: HashSet<K> = HashSet::new();
        for (id, next) in changes {
            match next {
                TriState::Selected => {
                    self.indeterminate.swap_remove(&id);
                    leaving.remove(&id);
                    self.selected.insert(id);
                }
                TriState::Indeterminate => {
                    if self.selected.contains(&id) {
                        leaving.insert(id.clone());
                    }
                    self.indeterminate.insert(id);
                }
                TriState::Unselected => {
                    if self.selected.contains(&id) {
                        leaving.insert(id.clone());
                    }
                    self.indeterminate.swap_remove(&id);
                }
            }
        }
        if !leaving.is_empty() {
            self.selected.retain(|id| !leaving.contains(id));
        }
    }

    /// Keeps only the ids for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&K) -> bool) {
        self.selected.retain(|id| keep(id));
        self.indeterminate.retain(|id| keep(id));
    }

    /// Removes everything.
    pub fn clear(&mut self) {
        self.selected.clear();
        self.indeterminate.clear();
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    /// Serializes the state to JSON.
    pub fn to_json(&self) -> Result<String>
    where
        K: Serialize,
    {
        Ok(serde_json::to_string(self)?)
    }

    /// Restores a state from JSON produced by [`to_json`](Self::to_json).
    pub fn from_json(json: &str) -> Result<Self>
    where
        K: for<'de> Deserialize<'de>,
    {
        let state: Self = serde_json::from_str(json)?;
        Ok(Self::from_sets(state.selected, state.indeterminate))
    }
}
