//! Tri-state propagation over a [`TreeSource`].
//!
//! These are plain functions over an explicit [`SelectionState`]. A parent's
//! state is derived only from its *visible* direct children, so propagation
//! is correct as long as children are evaluated before their parents. Both
//! entry points guarantee that by working deepest first.

use std::collections::{BTreeMap, HashMap, HashSet};

use indexmap::{IndexMap, IndexSet};

use canopy_core::logging::targets;

use super::state::{SelectionState, TriState};
use super::tree::{self, RecordKey, TreeSource};

/// Computes the state `parent` should have from its visible children.
///
/// Returns `None` when `parent` has no visible children and its current
/// state stands: a selected or unselected record is left alone. A record
/// that is indeterminate without visible children has nothing left to be
/// partial about, so it becomes [`TriState::Unselected`]. Otherwise:
///
/// - every visible child selected gives [`TriState::Selected`];
/// - any visible child selected or indeterminate gives
///   [`TriState::Indeterminate`];
/// - anything else gives [`TriState::Unselected`].
pub fn evaluate<K, S>(source: &S, state: &SelectionState<K>, parent: &K) -> Option<TriState>
where
    K: RecordKey,
    S: TreeSource<K> + ?Sized,
{
    derive(source, parent, |id| state.tri_state(id))
}

fn derive<K, S>(source: &S, parent: &K, state_of: impl Fn(&K) -> TriState) -> Option<TriState>
where
    K: RecordKey,
    S: TreeSource<K> + ?Sized,
{
    let mut any_child = false;
    let mut all_selected = true;
    let mut any_marked = false;

    for child in tree::visible_children(source, parent) {
        any_child = true;
        match state_of(child) {
            TriState::Selected => any_marked = true,
            TriState::Indeterminate => {
                all_selected = false;
                any_marked = true;
            }
            TriState::Unselected => all_selected = false,
        }
    }

    if !any_child {
        return state_of(parent)
            .is_indeterminate()
            .then_some(TriState::Unselected);
    }

    Some(if all_selected {
        TriState::Selected
    } else if any_marked {
        TriState::Indeterminate
    } else {
        TriState::Unselected
    })
}

/// Record depths computed during one pass, so each ancestor chain is
/// walked at most once.
struct DepthCache<'s, K, S: ?Sized> {
    source: &'s S,
    depths: HashMap<K, usize>,
}

impl<'s, K: RecordKey, S: TreeSource<K> + ?Sized> DepthCache<'s, K, S> {
    fn new(source: &'s S) -> Self {
        Self {
            source,
            depths: HashMap::new(),
        }
    }

    fn depth(&mut self, id: &K) -> usize {
        if let Some(&depth) = self.depths.get(id) {
            return depth;
        }

        let source = self.source;
        // Nearest first; stops below the first ancestor already known.
        let mut chain = vec![id.clone()];
        let mut top = 0;
        let mut cursor = source.parent_of(id);
        while let Some(parent) = cursor {
            if let Some(&depth) = self.depths.get(parent) {
                top = depth + 1;
                break;
            }
            chain.push(parent.clone());
            cursor = source.parent_of(parent);
        }

        let mut depth = top;
        for node in chain.into_iter().rev() {
            self.depths.insert(node, depth);
            depth += 1;
        }
        depth - 1
    }
}

/// Updates staged on top of a [`SelectionState`] and applied in one batch.
struct Staged<'a, K: RecordKey> {
    state: &'a SelectionState<K>,
    changes: IndexMap<K, TriState>,
}

impl<'a, K: RecordKey> Staged<'a, K> {
    fn new(state: &'a SelectionState<K>) -> Self {
        Self {
            state,
            changes: IndexMap::new(),
        }
    }

    fn tri_state(&self, id: &K) -> TriState {
        self.changes
            .get(id)
            .copied()
            .unwrap_or_else(|| self.state.tri_state(id))
    }

    fn evaluate<S: TreeSource<K> + ?Sized>(&self, source: &S, parent: &K) -> Option<TriState> {
        derive(source, parent, |id| self.tri_state(id))
    }

    /// Returns true if `next` differs from the current state.
    fn set(&mut self, id: &K, next: TriState) -> bool {
        if self.tri_state(id) == next {
            return false;
        }
        self.changes.insert(id.clone(), next);
        true
    }

    fn into_changes(self) -> IndexMap<K, TriState> {
        self.changes
    }
}

/// Recomputes the ancestors of every id in `frontier`.
///
/// The direct parents of the frontier are queued by depth and evaluated
/// deepest first. A parent whose state changed queues its own parent; an
/// unchanged parent ends its chain. Returns the number of parents whose
/// state changed.
pub fn propagate_up<K, S>(source: &S, state: &mut SelectionState<K>, frontier: &[K]) -> usize
where
    K: RecordKey,
    S: TreeSource<K> + ?Sized,
{
    let mut depths = DepthCache::new(source);
    let mut queue: BTreeMap<usize, IndexSet<K>> = BTreeMap::new();
    for id in frontier {
        if let Some(parent) = source.parent_of(id) {
            let depth = depths.depth(parent);
            queue.entry(depth).or_default().insert(parent.clone());
        }
    }

    let mut staged = Staged::new(state);
    let mut changed = 0;
    while let Some((depth, parents)) = queue.pop_last() {
        for parent in parents {
            let Some(next) = staged.evaluate(source, &parent) else {
                tracing::trace!(target: targets::PROPAGATION, id = ?parent, "no visible children, state kept");
                continue;
            };
            if !staged.set(&parent, next) {
                continue;
            }

            changed += 1;
            tracing::trace!(target: targets::PROPAGATION, id = ?parent, state = ?next, depth, "parent updated");
            if let Some(grandparent) = source.parent_of(&parent) {
                queue
                    .entry(depth.saturating_sub(1))
                    .or_default()
                    .insert(grandparent.clone());
            }
        }
    }

    let changes = staged.into_changes();
    state.apply(changes);
    changed
}

/// Re-synchronizes `state` with the current structure and visibility.
///
/// Ids no longer in the tree are dropped. Then every selected or
/// indeterminate record and all of its ancestors are re-evaluated, deepest
/// first. A selected record without visible children stays selected; an
/// indeterminate one is cleared. Returns the number of records whose state
/// changed, not counting dropped ids.
pub fn resync<K, S>(source: &S, state: &mut SelectionState<K>) -> usize
where
    K: RecordKey,
    S: TreeSource<K> + ?Sized,
{
    state.retain(|id| source.contains(id));

    let mut depths = DepthCache::new(source);
    let mut walked: HashSet<K> = HashSet::new();
    let mut candidates: Vec<(usize, K)> = Vec::new();
    let marked: Vec<K> = state
        .selected()
        .iter()
        .chain(state.indeterminate().iter())
        .cloned()
        .collect();

    for id in marked {
        let mut current = Some(id);
        while let Some(node) = current {
            if !walked.insert(node.clone()) {
                break;
            }
            current = source.parent_of(&node).cloned();
            candidates.push((depths.depth(&node), node));
        }
    }

    // Deepest first; ties keep discovery order.
    candidates.sort_by(|a, b| b.0.cmp(&a.0));

    let mut staged = Staged::new(state);
    let mut changed = 0;
    for (_, id) in &candidates {
        if let Some(next) = staged.evaluate(source, id)
            && staged.set(id, next)
        {
            changed += 1;
            tracing::trace!(target: targets::PROPAGATION, id = ?id, state = ?next, "record resynced");
        }
    }

    let changes = staged.into_changes();
    state.apply(changes);
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tree::{RecordTree, Visible};

    fn sample() -> RecordTree<&'static str> {
        RecordTree::from_parent_pairs([
            ("root", None),
            ("a", Some("root")),
            ("b", Some("root")),
            ("a1", Some("a")),
            ("a2", Some("a")),
        ])
        .unwrap()
    }

    #[test]
    fn test_evaluate_rules() {
        let tree = sample();
        let mut state = SelectionState::new();

        assert_eq!(evaluate(&tree, &state, &"a"), Some(TriState::Unselected));
        assert_eq!(evaluate(&tree, &state, &"a1"), None);

        state.select("a1");
        assert_eq!(evaluate(&tree, &state, &"a"), Some(TriState::Indeterminate));

        state.select("a2");
        assert_eq!(evaluate(&tree, &state, &"a"), Some(TriState::Selected));

        state.set_tri_state(&"a", TriState::Indeterminate);
        assert_eq!(evaluate(&tree, &state, &"root"), Some(TriState::Indeterminate));
    }

    #[test]
    fn test_evaluate_ignores_hidden_children() {
        let tree = sample();
        let view = Visible::excluding(&tree, ["a2"]);
        let mut state = SelectionState::new();
        state.select("a1");
        assert_eq!(evaluate(&view, &state, &"a"), Some(TriState::Selected));

        let none_visible = Visible::excluding(&tree, ["a1", "a2"]);
        assert_eq!(evaluate(&none_visible, &state, &"a"), None);

        state.set_tri_state(&"a", TriState::Selected);
        assert_eq!(evaluate(&none_visible, &state, &"a"), None);
        state.set_tri_state(&"a", TriState::Indeterminate);
        assert_eq!(evaluate(&none_visible, &state, &"a"), Some(TriState::Unselected));
    }

    #[test]
    fn test_propagate_up_reaches_root() {
        let tree = sample();
        let mut state = SelectionState::new();
        state.select("a1");
        state.select("a2");

        let changed = propagate_up(&tree, &mut state, &["a1", "a2"]);
        assert_eq!(changed, 2);
        assert!(state.is_selected(&"a"));
        assert!(state.is_indeterminate(&"root"));
    }

    #[test]
    fn test_propagate_up_stops_on_unchanged_parent() {
        let tree = sample();
        let mut state = SelectionState::new();
        state.select("a1");
        propagate_up(&tree, &mut state, &["a1"]);
        assert!(state.is_indeterminate(&"root"));

        // "a" stays indeterminate, so "root" is not revisited.
        state.select("b");
        state.deselect(&"b");
        assert_eq!(propagate_up(&tree, &mut state, &["a1"]), 0);
    }

    #[test]
    fn test_propagate_up_deepest_first() {
        let tree = RecordTree::from_parent_pairs([
            (0, None),
            (1, Some(0)),
            (2, Some(1)),
            (3, Some(2)),
            (4, Some(0)),
        ])
        .unwrap();
        let mut state = SelectionState::new();
        state.select(3);
        state.select(4);

        propagate_up(&tree, &mut state, &[3, 4]);
        assert!(state.is_selected(&2));
        assert!(state.is_selected(&1));
        assert!(state.is_selected(&0));
        assert!(state.indeterminate().is_empty());
    }

    #[test]
    fn test_resync_after_removal_keeps_childless_parent() {
        let mut tree = RecordTree::from_parent_pairs([("p", None), ("c", Some("p"))]).unwrap();
        let mut state = SelectionState::from_sets(["p", "c"], []);

        tree.remove(&"c");
        resync(&tree, &mut state);
        assert_eq!(state.selected_ids(), vec!["p"]);
    }

    #[test]
    fn test_resync_clears_indeterminate_without_visible_children() {
        let tree = sample();
        let mut state = SelectionState::new();
        state.select("a1");
        propagate_up(&tree, &mut state, &["a1"]);
        assert!(state.is_indeterminate(&"a"));

        let view = Visible::excluding(&tree, ["a1", "a2"]);
        resync(&view, &mut state);
        assert_eq!(state.tri_state(&"a"), TriState::Unselected);
        assert_eq!(state.tri_state(&"root"), TriState::Unselected);
        assert!(state.is_selected(&"a1"));
    }

    #[test]
    fn test_deep_chain_propagation() {
        let pairs = (0..2_000u32).map(|i| (i, i.checked_sub(1)));
        let tree = RecordTree::from_parent_pairs(pairs).unwrap();
        let mut state = SelectionState::new();
        state.select(1_999);

        let changed = propagate_up(&tree, &mut state, &[1_999]);
        assert_eq!(changed, 1_999);
        assert_eq!(state.selected_count(), 2_000);
        assert!(state.indeterminate().is_empty());

        state.deselect(&1_999);
        assert_eq!(propagate_up(&tree, &mut state, &[1_999]), 1_999);
        assert!(state.is_empty());
    }

    #[test]
    fn test_resync_after_filter() {
        let tree = sample();
        let mut state = SelectionState::new();
        state.select("a1");
        propagate_up(&tree, &mut state, &["a1"]);
        assert!(state.is_indeterminate(&"a"));

        // Hiding the only unselected sibling completes the parent.
        let view = Visible::excluding(&tree, ["a2"]);
        resync(&view, &mut state);
        assert!(state.is_selected(&"a"));
        assert!(state.is_indeterminate(&"root"));

        // Hiding the only selected child clears it.
        let view = Visible::excluding(&tree, ["a1"]);
        resync(&view, &mut state);
        assert!(!state.is_selected(&"a"));
        assert!(!state.is_indeterminate(&"a"));
        assert!(!state.is_indeterminate(&"root"));
        assert!(state.is_selected(&"a1"));
    }

    #[test]
    fn test_resync_drops_missing_ids() {
        let tree = sample();
        let mut state = SelectionState::from_sets(["gone", "b"], []);
        resync(&tree, &mut state);
        assert_eq!(state.selected_ids(), vec!["b"]);
        assert!(state.is_indeterminate(&"root"));
    }
}
