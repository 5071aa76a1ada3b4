//! Payloads of the engine's selection signals.

use indexmap::IndexSet;

use super::tree::RecordKey;

/// Emitted before a selection change is applied.
///
/// Slots run in connection order and may set [`cancel`](Self::cancel) to
/// veto the change, or replace [`new_selection`](Self::new_selection) to
/// commit a different one. `added` and `removed` describe the requested
/// change as given, before any cascade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionChanging<K: RecordKey> {
    /// The selection before the change.
    pub old_selection: IndexSet<K>,
    /// The selection being requested.
    pub new_selection: IndexSet<K>,
    /// Ids in `new_selection` but not in `old_selection`.
    pub added: IndexSet<K>,
    /// Ids in `old_selection` but not in `new_selection`.
    pub removed: IndexSet<K>,
    /// Set to true to abandon the change.
    pub cancel: bool,
}

impl<K: RecordKey> SelectionChanging<K> {
    pub(crate) fn new(old_selection: IndexSet<K>, new_selection: IndexSet<K>) -> Self {
        let (added, removed) = diff(&old_selection, &new_selection);
        Self {
            old_selection,
            new_selection,
            added,
            removed,
            cancel: false,
        }
    }
}

/// Emitted after a selection change was committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionChanged<K: RecordKey> {
    /// The selection before the change.
    pub old_selection: IndexSet<K>,
    /// The committed selection, including cascaded ids.
    pub new_selection: IndexSet<K>,
}

/// Result of [`SelectionEngine::apply_selection_change`].
///
/// [`SelectionEngine::apply_selection_change`]: super::SelectionEngine::apply_selection_change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionOutcome<K: RecordKey> {
    /// True if a slot vetoed the change.
    pub cancelled: bool,
    /// The selection after the call.
    pub final_selection: IndexSet<K>,
}

/// Splits the change from `old` to `new` into `(added, removed)`.
pub(crate) fn diff<K: RecordKey>(old: &IndexSet<K>, new: &IndexSet<K>) -> (IndexSet<K>, IndexSet<K>) {
    let added = new.difference(old).cloned().collect();
    let removed = old.difference(new).cloned().collect();
    (added, removed)
}
