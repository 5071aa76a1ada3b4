//! The selection engine.
//!
//! [`SelectionEngine`] owns the selected/indeterminate state of a record
//! tree and applies every change through the [`CascadePolicy`] picked for its
//! [`SelectionMode`].
//!
//! # Example
//!
//! ```
//! use canopy::model::{RecordTree, SelectionEngine};
//!
//! let tree = RecordTree::from_parent_pairs([
//!     ("root", None),
//!     ("a", Some("root")),
//!     ("b", Some("root")),
//!     ("a1", Some("a")),
//!     ("a2", Some("a")),
//! ])
//! .unwrap();
//!
//! let mut engine = SelectionEngine::new();
//! engine.select_ids(&tree, &["a1", "a2"], false);
//!
//! assert!(engine.is_selected(&"a"));
//! assert!(engine.is_indeterminate(&"root"));
//!
//! // Veto changes from a before-hook
//! engine.selection_changing.connect(|event| event.cancel = true);
//! let outcome = engine.select_row(&tree, "b", false);
//! assert!(outcome.cancelled);
//! assert!(!engine.is_selected(&"b"));
//! ```
//!
//! # Signals
//!
//! - `selection_changing`: before a change, slots may cancel or rewrite it
//! - `selection_changed`: after a change was committed
//!
//! Only the `apply_selection_change` family emits. `select_ids`,
//! `deselect_ids`, `refresh`, `reset`, `restore` and `set_mode` are silent.

use std::fmt;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use canopy_core::logging::{span_names, targets};
use canopy_core::{InterceptSignal, Signal};

use super::config::SelectionConfig;
use super::events::{self, SelectionChanged, SelectionChanging, SelectionOutcome};
use super::policy::{CascadePolicy, CascadingPolicy, FlatPolicy};
use super::state::{SelectionState, TriState};
use super::tree::{self, RecordKey, TreeSource};

/// Selection behavior mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// Nothing can be selected.
    None,
    /// At most one record is selected.
    Single,
    /// Any number of records, no propagation.
    Multiple,
    /// Any number of records, cascading to descendants with tri-state
    /// ancestors (default).
    #[default]
    MultipleCascade,
}

impl SelectionMode {
    /// Returns true unless the mode is [`SelectionMode::None`].
    pub fn is_enabled(&self) -> bool {
        !matches!(self, SelectionMode::None)
    }

    /// Returns true for modes that allow more than one selected record.
    pub fn allows_multiple(&self) -> bool {
        matches!(self, SelectionMode::Multiple | SelectionMode::MultipleCascade)
    }

    /// Returns true if selection propagates through the tree.
    pub fn is_cascading(&self) -> bool {
        matches!(self, SelectionMode::MultipleCascade)
    }
}

/// Tri-state selection over a tree of records.
///
/// The engine does not own the tree. Every operation borrows a
/// [`TreeSource`] for the length of the call, and visibility is whatever that
/// source reports. Unknown ids are ignored.
pub struct SelectionEngine<K: RecordKey> {
    config: SelectionConfig,
    policy: Box<dyn CascadePolicy<K>>,
    state: SelectionState<K>,

    /// Anchor for range selection, the last id given to `select_row`.
    anchor: Option<K>,

    /// Emitted before a change is applied. Slots may cancel it or replace
    /// the requested selection.
    pub selection_changing: InterceptSignal<SelectionChanging<K>>,

    /// Emitted after a change was committed.
    pub selection_changed: Signal<SelectionChanged<K>>,
}

impl<K: RecordKey> Default for SelectionEngine<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: RecordKey> SelectionEngine<K> {
    /// Creates an engine with the default configuration.
    pub fn new() -> Self {
        Self::with_config(SelectionConfig::default())
    }

    /// Creates an engine in `mode`.
    pub fn with_mode(mode: SelectionMode) -> Self {
        Self::with_config(SelectionConfig::new(mode))
    }

    /// Creates an engine from a configuration.
    pub fn with_config(config: SelectionConfig) -> Self {
        Self {
            config,
            policy: policy_for(&config),
            state: SelectionState::new(),
            anchor: None,
            selection_changing: InterceptSignal::new(),
            selection_changed: Signal::new(),
        }
    }

    // =========================================================================
    // Mode and configuration
    // =========================================================================

    /// Gets the active configuration.
    pub fn config(&self) -> &SelectionConfig {
        &self.config
    }

    /// Gets the selection mode.
    pub fn mode(&self) -> SelectionMode {
        self.config.mode
    }

    /// Switches the selection mode. The current selection is discarded.
    pub fn set_mode(&mut self, mode: SelectionMode) {
        self.set_config(SelectionConfig {
            mode,
            ..self.config
        });
    }

    /// Replaces the configuration. The current selection is discarded.
    pub fn set_config(&mut self, config: SelectionConfig) {
        self.config = config;
        self.policy = policy_for(&config);
        self.reset();
        tracing::debug!(target: targets::SELECTION, mode = ?config.mode, policy = self.policy.name(), "selection mode set");
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Checks if a record is selected.
    pub fn is_selected(&self, id: &K) -> bool {
        self.state.is_selected(id)
    }

    /// Checks if a record is indeterminate.
    pub fn is_indeterminate(&self, id: &K) -> bool {
        self.state.is_indeterminate(id)
    }

    /// Returns the checkbox state of a record.
    pub fn row_state(&self, id: &K) -> TriState {
        self.state.tri_state(id)
    }

    /// Returns the selected ids in selection order.
    pub fn selected_ids(&self) -> Vec<K> {
        self.state.selected_ids()
    }

    /// Returns the selected set.
    pub fn selection(&self) -> &IndexSet<K> {
        self.state.selected()
    }

    /// Returns the indeterminate ids.
    pub fn indeterminate_ids(&self) -> Vec<K> {
        self.state.indeterminate_ids()
    }

    /// Returns the number of selected records.
    pub fn selected_count(&self) -> usize {
        self.state.selected_count()
    }

    /// Returns true if any record is selected.
    pub fn has_selection(&self) -> bool {
        self.state.selected_count() > 0
    }

    /// Header checkbox state: whether all, some or none of the visible
    /// records are selected. An empty view is unselected.
    pub fn header_state<S: TreeSource<K>>(&self, source: &S) -> TriState {
        let visible = tree::visible_records(source);
        let selected = visible
            .iter()
            .filter(|id| self.state.is_selected(id))
            .count();

        if selected == 0 {
            TriState::Unselected
        } else if selected == visible.len() {
            TriState::Selected
        } else {
            TriState::Indeterminate
        }
    }

    /// The full selection state.
    pub fn state(&self) -> &SelectionState<K> {
        &self.state
    }

    /// Replaces the selection state without emitting.
    ///
    /// The state is taken as given; call [`refresh`](Self::refresh) to
    /// re-derive tri-state against the current tree.
    pub fn restore(&mut self, state: SelectionState<K>) {
        if !self.config.mode.is_enabled() {
            return;
        }
        self.state = state;
        self.anchor = None;
    }

    // =========================================================================
    // Silent operations
    // =========================================================================

    /// Selects `ids` without emitting.
    ///
    /// With `clear_previous` the current state is discarded first. In
    /// cascading mode every id is expanded to its descendants and ancestors
    /// are recomputed.
    pub fn select_ids<S: TreeSource<K>>(&mut self, source: &S, ids: &[K], clear_previous: bool) {
        let source: &dyn TreeSource<K> = source;
        select_into(self.config.mode, self.policy.as_ref(), source, &mut self.state, ids, clear_previous);
        debug_assert!(self.state.is_consistent());
    }

    /// Deselects `ids` without emitting.
    pub fn deselect_ids<S: TreeSource<K>>(&mut self, source: &S, ids: &[K]) {
        let source: &dyn TreeSource<K> = source;
        deselect_into(self.config.mode, self.policy.as_ref(), source, &mut self.state, ids);
        debug_assert!(self.state.is_consistent());
    }

    /// Re-synchronizes the state after records were added or removed, or the
    /// visible set changed.
    ///
    /// Ids missing from the tree are dropped, and in cascading mode every
    /// marked record and its ancestors are re-evaluated. A parent left with
    /// no visible children stays selected if it was, and is cleared if it
    /// was indeterminate.
    pub fn refresh<S: TreeSource<K>>(&mut self, source: &S) {
        let _span = tracing::debug_span!(target: targets::SELECTION, span_names::REFRESH).entered();
        let source: &dyn TreeSource<K> = source;
        self.policy.refresh(source, &mut self.state);
        if self.anchor.as_ref().is_some_and(|anchor| !source.contains(anchor)) {
            self.anchor = None;
        }
        debug_assert!(self.state.is_consistent());
        tracing::debug!(
            target: targets::SELECTION,
            selected = self.state.selected_count(),
            indeterminate = self.state.indeterminate().len(),
            "selection refreshed"
        );
    }

    /// Clears both sets without emitting.
    pub fn reset(&mut self) {
        self.state.clear();
        self.anchor = None;
    }

    // =========================================================================
    // Notifying operations
    // =========================================================================

    /// Replaces the selection with `new_selection`, notifying before and after.
    ///
    /// A selection equal (as a set) to the current one does nothing. If a
    /// `selection_changing` slot cancels, the state is left untouched. If a
    /// slot rewrites `new_selection`, the rewritten selection is applied.
    /// The change is computed on a copy of the state and committed only as a
    /// whole; cascaded ids are part of the committed selection and of the
    /// `selection_changed` payload.
    pub fn apply_selection_change<S, I>(&mut self, source: &S, new_selection: I) -> SelectionOutcome<K>
    where
        S: TreeSource<K>,
        I: IntoIterator<Item = K>,
    {
        if !self.config.mode.is_enabled() {
            return self.unchanged();
        }

        let requested: IndexSet<K> = new_selection.into_iter().collect();
        let old_selection = self.state.selected().clone();
        if requested == old_selection {
            tracing::trace!(target: targets::SELECTION, "requested selection equals current, skipping");
            return self.unchanged();
        }

        let _span = tracing::debug_span!(
            target: targets::SELECTION,
            span_names::SELECTION_CHANGE,
            requested = requested.len()
        )
        .entered();

        let event = self
            .selection_changing
            .emit(SelectionChanging::new(old_selection.clone(), requested));
        if event.cancel {
            tracing::debug!(target: targets::SELECTION, "selection change cancelled");
            return SelectionOutcome {
                cancelled: true,
                final_selection: old_selection,
            };
        }

        let (added, removed) = events::diff(&old_selection, &event.new_selection);
        let added: Vec<K> = added.into_iter().collect();
        let removed: Vec<K> = removed.into_iter().collect();

        let source: &dyn TreeSource<K> = source;
        let mut working = self.state.clone();
        if !removed.is_empty() {
            deselect_into(self.config.mode, self.policy.as_ref(), source, &mut working, &removed);
        }
        if !added.is_empty() {
            select_into(self.config.mode, self.policy.as_ref(), source, &mut working, &added, false);
        }

        let final_selection = working.selected().clone();
        if final_selection != event.new_selection {
            tracing::debug!(
                target: targets::SELECTION,
                requested = event.new_selection.len(),
                committed = final_selection.len(),
                "cascade adjusted requested selection"
            );
        }

        self.state = working;
        debug_assert!(self.state.is_consistent());
        tracing::debug!(
            target: targets::SELECTION,
            added = added.len(),
            removed = removed.len(),
            selected = final_selection.len(),
            "selection change committed"
        );

        self.selection_changed.emit(SelectionChanged {
            old_selection,
            new_selection: final_selection.clone(),
        });

        SelectionOutcome {
            cancelled: false,
            final_selection,
        }
    }

    /// Selects one record, notifying.
    ///
    /// With `clear_previous`, or in single mode, it replaces the selection.
    /// Unknown ids and ids that are already selected (without clearing) do
    /// nothing.
    pub fn select_row<S: TreeSource<K>>(&mut self, source: &S, id: K, clear_previous: bool) -> SelectionOutcome<K> {
        if !self.config.mode.is_enabled() || !source.contains(&id) {
            return self.unchanged();
        }

        let clear = clear_previous || !self.config.mode.allows_multiple();
        if !clear && self.state.is_selected(&id) {
            return self.unchanged();
        }

        let new_selection: IndexSet<K> = if clear {
            IndexSet::from([id.clone()])
        } else {
            let mut selection = self.state.selected().clone();
            selection.insert(id.clone());
            selection
        };

        let outcome = self.apply_selection_change(source, new_selection);
        if !outcome.cancelled {
            self.anchor = Some(id);
        }
        outcome
    }

    /// Deselects one record, notifying. Does nothing if it is not selected.
    pub fn deselect_row<S: TreeSource<K>>(&mut self, source: &S, id: &K) -> SelectionOutcome<K> {
        if !self.state.is_selected(id) {
            return self.unchanged();
        }
        let mut new_selection = self.state.selected().clone();
        new_selection.shift_remove(id);
        self.apply_selection_change(source, new_selection)
    }

    /// Extends the selection over every visible record between the range
    /// anchor and `id`, in display order, notifying.
    ///
    /// The anchor is the last id given to [`select_row`](Self::select_row),
    /// or else the most recently selected id. Without a usable anchor this
    /// behaves like `select_row(source, id, false)`. Only available in
    /// multiple-selection modes.
    pub fn select_range<S: TreeSource<K>>(&mut self, source: &S, id: K) -> SelectionOutcome<K> {
        if !self.config.mode.allows_multiple() || !source.is_visible(&id) {
            return self.unchanged();
        }

        let anchor = self
            .anchor
            .clone()
            .or_else(|| self.state.selected().last().cloned());
        let order = tree::visible_records(source);
        let target = order.iter().position(|record| *record == id);
        let start = anchor.and_then(|anchor| order.iter().position(|record| *record == anchor));

        let (Some(start), Some(end)) = (start, target) else {
            return self.select_row(source, id, false);
        };
        let (first, last) = if start <= end { (start, end) } else { (end, start) };

        let mut new_selection = self.state.selected().clone();
        new_selection.extend(order[first..=last].iter().cloned());
        self.apply_selection_change(source, new_selection)
    }

    /// Selects every visible record, notifying. Only available in
    /// multiple-selection modes.
    pub fn select_all<S: TreeSource<K>>(&mut self, source: &S) -> SelectionOutcome<K> {
        if !self.config.mode.allows_multiple() {
            return self.unchanged();
        }
        let mut new_selection = self.state.selected().clone();
        new_selection.extend(tree::visible_records(source));
        self.apply_selection_change(source, new_selection)
    }

    /// Deselects every visible record, notifying.
    ///
    /// Selected records the source reports as hidden stay selected.
    pub fn clear_selection<S: TreeSource<K>>(&mut self, source: &S) -> SelectionOutcome<K> {
        let new_selection: IndexSet<K> = self
            .state
            .selected()
            .iter()
            .filter(|id| !source.is_visible(id))
            .cloned()
            .collect();
        let outcome = self.apply_selection_change(source, new_selection);
        if !outcome.cancelled {
            self.anchor = None;
        }
        outcome
    }

    // =========================================================================
    // Internal Helpers
    // =========================================================================

    fn unchanged(&self) -> SelectionOutcome<K> {
        SelectionOutcome {
            cancelled: false,
            final_selection: self.state.selected().clone(),
        }
    }
}

impl<K: RecordKey> fmt::Debug for SelectionEngine<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectionEngine")
            .field("mode", &self.config.mode)
            .field("policy", &self.policy.name())
            .field("selected", &self.state.selected_count())
            .field("indeterminate", &self.state.indeterminate().len())
            .finish_non_exhaustive()
    }
}

static_assertions::assert_impl_all!(SelectionEngine<String>: Send, Sync);

fn policy_for<K: RecordKey>(config: &SelectionConfig) -> Box<dyn CascadePolicy<K>> {
    if config.mode.is_cascading() {
        Box::new(CascadingPolicy::new().with_cascade_into_hidden(config.cascade_into_hidden))
    } else {
        Box::new(FlatPolicy)
    }
}

fn select_into<K: RecordKey>(
    mode: SelectionMode,
    policy: &dyn CascadePolicy<K>,
    source: &dyn TreeSource<K>,
    state: &mut SelectionState<K>,
    ids: &[K],
    clear_previous: bool,
) {
    match mode {
        SelectionMode::None => {}
        SelectionMode::Single => {
            // Last valid id wins and replaces everything.
            let Some(last) = ids.iter().rev().find(|id| source.contains(id)) else {
                return;
            };
            state.clear();
            policy.select(source, state, std::slice::from_ref(last));
        }
        SelectionMode::Multiple | SelectionMode::MultipleCascade => {
            if clear_previous {
                state.clear();
            }
            policy.select(source, state, ids);
        }
    }
}

fn deselect_into<K: RecordKey>(
    mode: SelectionMode,
    policy: &dyn CascadePolicy<K>,
    source: &dyn TreeSource<K>,
    state: &mut SelectionState<K>,
    ids: &[K],
) {
    if mode.is_enabled() {
        policy.deselect(source, state, ids);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tree::{RecordTree, Visible};
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    fn flat_tree() -> RecordTree<u32> {
        RecordTree::from_parent_pairs((1..=5).map(|id| (id, None))).unwrap()
    }

    #[test]
    fn test_engine_creation() {
        let engine = SelectionEngine::<u32>::new();
        assert_eq!(engine.mode(), SelectionMode::MultipleCascade);
        assert!(!engine.has_selection());
        assert!(engine.state().is_empty());
    }

    #[test]
    fn test_mode_predicates() {
        assert!(!SelectionMode::None.is_enabled());
        assert!(!SelectionMode::Single.allows_multiple());
        assert!(SelectionMode::Multiple.allows_multiple());
        assert!(!SelectionMode::Multiple.is_cascading());
        assert!(SelectionMode::MultipleCascade.is_cascading());
    }

    #[test]
    fn test_no_selection_mode() {
        let tree = flat_tree();
        let mut engine = SelectionEngine::with_mode(SelectionMode::None);
        engine.select_ids(&tree, &[1, 2], false);
        engine.select_row(&tree, 3, false);
        engine.select_all(&tree);
        engine.restore(SelectionState::from_sets([4], []));
        assert!(!engine.has_selection());
    }

    #[test]
    fn test_single_selection() {
        let tree = flat_tree();
        let mut engine = SelectionEngine::with_mode(SelectionMode::Single);

        engine.select_row(&tree, 1, false);
        assert!(engine.is_selected(&1));

        // Replaces the previous record even without clearing
        engine.select_row(&tree, 2, false);
        assert_eq!(engine.selected_ids(), vec![2]);

        engine.select_ids(&tree, &[3, 4, 99], false);
        assert_eq!(engine.selected_ids(), vec![4]);

        engine.select_all(&tree);
        assert_eq!(engine.selected_ids(), vec![4]);
    }

    #[test]
    fn test_multiple_selection() {
        let tree = flat_tree();
        let mut engine = SelectionEngine::with_mode(SelectionMode::Multiple);

        engine.select_row(&tree, 5, false);
        engine.select_row(&tree, 2, false);
        engine.select_row(&tree, 99, false);
        assert_eq!(engine.selected_ids(), vec![5, 2]);

        engine.select_row(&tree, 3, true);
        assert_eq!(engine.selected_ids(), vec![3]);
    }

    #[test]
    fn test_deselect_row() {
        let tree = flat_tree();
        let mut engine = SelectionEngine::with_mode(SelectionMode::Multiple);
        engine.select_ids(&tree, &[1, 2], false);

        let outcome = engine.deselect_row(&tree, &1);
        assert!(!outcome.cancelled);
        assert_eq!(engine.selected_ids(), vec![2]);

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        engine.selection_changed.connect(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });
        engine.deselect_row(&tree, &1);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_selection_signals() {
        let tree = flat_tree();
        let mut engine = SelectionEngine::with_mode(SelectionMode::Multiple);

        let before = Arc::new(AtomicUsize::new(0));
        let after = Arc::new(AtomicUsize::new(0));
        let before_clone = before.clone();
        let after_clone = after.clone();

        engine.selection_changing.connect(move |event| {
            before_clone.fetch_add(event.added.len(), Ordering::SeqCst);
        });
        engine.selection_changed.connect(move |event| {
            after_clone.fetch_add(event.new_selection.len(), Ordering::SeqCst);
        });

        engine.select_row(&tree, 1, false);
        engine.select_row(&tree, 2, false);

        assert_eq!(before.load(Ordering::SeqCst), 2);
        assert_eq!(after.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_silent_operations_do_not_emit() {
        let tree = flat_tree();
        let mut engine = SelectionEngine::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        engine.selection_changing.connect(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        engine.select_ids(&tree, &[1], false);
        engine.deselect_ids(&tree, &[1]);
        engine.refresh(&tree);
        engine.reset();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_range_selection() {
        let tree = flat_tree();
        let mut engine = SelectionEngine::with_mode(SelectionMode::Multiple);

        engine.select_row(&tree, 2, false);
        engine.select_range(&tree, 4);
        assert_eq!(engine.selected_ids(), vec![2, 3, 4]);

        // Backwards from the same anchor
        engine.select_range(&tree, 1);
        assert_eq!(engine.selected_count(), 4);
        assert!(!engine.is_selected(&5));
    }

    #[test]
    fn test_range_without_anchor_selects_row() {
        let tree = flat_tree();
        let mut engine = SelectionEngine::with_mode(SelectionMode::Multiple);
        engine.select_range(&tree, 3);
        assert_eq!(engine.selected_ids(), vec![3]);
    }

    #[test]
    fn test_range_skips_hidden_records() {
        let tree = flat_tree();
        let view = Visible::excluding(&tree, [3]);
        let mut engine = SelectionEngine::with_mode(SelectionMode::Multiple);
        engine.select_row(&view, 1, false);
        engine.select_range(&view, 5);
        assert_eq!(engine.selected_ids(), vec![1, 2, 4, 5]);

        // Hidden target does nothing
        engine.select_range(&view, 3);
        assert!(!engine.is_selected(&3));
    }

    #[test]
    fn test_select_all_and_header_state() {
        let tree = flat_tree();
        let mut engine = SelectionEngine::with_mode(SelectionMode::Multiple);
        assert_eq!(engine.header_state(&tree), TriState::Unselected);

        engine.select_row(&tree, 1, false);
        assert_eq!(engine.header_state(&tree), TriState::Indeterminate);

        engine.select_all(&tree);
        assert_eq!(engine.selected_count(), 5);
        assert_eq!(engine.header_state(&tree), TriState::Selected);

        let empty = RecordTree::<u32>::new();
        assert_eq!(engine.header_state(&empty), TriState::Unselected);
    }

    #[test]
    fn test_set_mode_clears_state() {
        let tree = flat_tree();
        let mut engine = SelectionEngine::new();
        engine.select_ids(&tree, &[1, 2], false);
        engine.set_mode(SelectionMode::Single);
        assert!(!engine.has_selection());
        assert_eq!(engine.mode(), SelectionMode::Single);
        assert!(!engine.config().cascade_into_hidden);
    }

    #[test]
    fn test_restore_state() {
        let tree = flat_tree();
        let mut engine = SelectionEngine::with_mode(SelectionMode::Multiple);
        engine.select_ids(&tree, &[1, 4], false);
        let snapshot = engine.state().clone();

        engine.reset();
        engine.restore(snapshot.clone());
        assert_eq!(engine.state(), &snapshot);
    }

    #[test]
    fn test_debug_output() {
        let engine = SelectionEngine::<u32>::with_mode(SelectionMode::Multiple);
        let text = format!("{:?}", engine);
        assert!(text.contains("Multiple"));
        assert!(text.contains("flat"));
    }
}
