//! Record trees as seen by the selection engine.
//!
//! The engine never owns records. It reads structure through [`TreeSource`],
//! a read-only, id-keyed view of a rooted forest. [`RecordTree`] is the arena
//! implementation shipped with the crate; hosts with their own storage can
//! implement the trait directly.
//!
//! Visibility (filtering, paging, virtualization) is a host concern. It reaches
//! the engine through [`TreeSource::is_visible`], usually by wrapping a source
//! in [`Visible`] for the duration of one call.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;

use canopy_core::logging::targets;
use canopy_core::{Error, Result};

/// Bound for record ids.
///
/// Ids must be unique within a tree and stable across calls.
pub trait RecordKey: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

impl<T> RecordKey for T where T: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

/// Read-only view of a rooted forest keyed by record id.
///
/// Implementations must describe a forest: every `parent_of` chain ends at a
/// root, and `children_of(p)` lists exactly the records whose parent is `p`.
/// The structure must not change while an engine call is in progress.
pub trait TreeSource<K: RecordKey> {
    /// Returns true if the record exists in the tree.
    fn contains(&self, id: &K) -> bool;

    /// Returns the parent of a record, or `None` for roots and unknown ids.
    fn parent_of(&self, id: &K) -> Option<&K>;

    /// Returns the ordered children of a record (empty for leaves and unknown ids).
    fn children_of(&self, id: &K) -> &[K];

    /// Returns the ordered root records.
    fn roots(&self) -> &[K];

    /// Returns true if the record takes part in tri-state computation.
    ///
    /// Defaults to every existing record.
    fn is_visible(&self, id: &K) -> bool {
        self.contains(id)
    }
}

// =========================================================================
// Traversal helpers
// =========================================================================

/// Iterates the visible direct children of `id`.
pub fn visible_children<'s, K, S>(source: &'s S, id: &K) -> impl Iterator<Item = &'s K> + use<'s, K, S>
where
    K: RecordKey,
    S: TreeSource<K> + ?Sized,
{
    source
        .children_of(id)
        .iter()
        .filter(move |child| source.is_visible(child))
}

/// Collects every descendant of `id` in pre-order, ignoring visibility.
///
/// Parents come before their children and siblings keep `children_of` order.
/// The record itself is not included.
pub fn all_child_records<K, S>(source: &S, id: &K) -> Vec<K>
where
    K: RecordKey,
    S: TreeSource<K> + ?Sized,
{
    collect_descendants(source, id, false)
}

/// Collects the descendants of `id` reachable through visible children, in
/// pre-order. A hidden record prunes its whole subtree.
pub fn visible_child_records<K, S>(source: &S, id: &K) -> Vec<K>
where
    K: RecordKey,
    S: TreeSource<K> + ?Sized,
{
    collect_descendants(source, id, true)
}

fn collect_descendants<K, S>(source: &S, id: &K, visible_only: bool) -> Vec<K>
where
    K: RecordKey,
    S: TreeSource<K> + ?Sized,
{
    let mut out = Vec::new();
    // Reversed pushes keep the explicit stack in pre-order.
    let mut stack: Vec<&K> = source.children_of(id).iter().rev().collect();
    while let Some(next) = stack.pop() {
        if visible_only && !source.is_visible(next) {
            continue;
        }
        out.push(next.clone());
        stack.extend(source.children_of(next).iter().rev());
    }
    out
}

/// All visible records in display (pre-order) order, starting from the roots.
pub fn visible_records<K, S>(source: &S) -> Vec<K>
where
    K: RecordKey,
    S: TreeSource<K> + ?Sized,
{
    let mut out = Vec::new();
    for root in source.roots() {
        if source.is_visible(root) {
            out.push(root.clone());
            out.extend(visible_child_records(source, root));
        }
    }
    out
}

/// Returns the ancestors of `id`, nearest first.
pub fn ancestors<K, S>(source: &S, id: &K) -> Vec<K>
where
    K: RecordKey,
    S: TreeSource<K> + ?Sized,
{
    let mut out = Vec::new();
    let mut current = source.parent_of(id);
    while let Some(parent) = current {
        out.push(parent.clone());
        current = source.parent_of(parent);
    }
    out
}

/// Number of ancestors of `id` (roots have depth 0).
pub fn depth<K, S>(source: &S, id: &K) -> usize
where
    K: RecordKey,
    S: TreeSource<K> + ?Sized,
{
    let mut depth = 0;
    let mut current = source.parent_of(id);
    while let Some(parent) = current {
        depth += 1;
        current = source.parent_of(parent);
    }
    depth
}

// =========================================================================
// RecordTree
// =========================================================================

/// A node of a [`RecordTree`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record<K> {
    id: K,
    parent: Option<K>,
    children: Vec<K>,
}

impl<K> Record<K> {
    fn new(id: K, parent: Option<K>) -> Self {
        Self {
            id,
            parent,
            children: Vec::new(),
        }
    }

    /// The record's id.
    pub fn id(&self) -> &K {
        &self.id
    }

    /// The parent's id, `None` for roots.
    pub fn parent_id(&self) -> Option<&K> {
        self.parent.as_ref()
    }

    /// The ordered child ids.
    pub fn child_ids(&self) -> &[K] {
        &self.children
    }
}

/// Arena storage for a forest of records.
///
/// Records are kept in a flat map from id to `{parent, children}`, and all
/// traversal goes through id lookups, so there are no owning parent/child
/// pointers.
///
/// # Example
///
/// ```
/// use canopy::model::RecordTree;
///
/// let tree = RecordTree::from_parent_pairs([
///     ("root", None),
///     ("a", Some("root")),
///     ("b", Some("root")),
///     ("a1", Some("a")),
/// ])
/// .unwrap();
///
/// assert_eq!(tree.len(), 4);
/// assert_eq!(tree.all_child_records(&"root"), vec!["a", "a1", "b"]);
/// ```
#[derive(Debug, Clone)]
pub struct RecordTree<K: RecordKey> {
    records: HashMap<K, Record<K>>,
    roots: Vec<K>,
}

impl<K: RecordKey> Default for RecordTree<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: RecordKey> RecordTree<K> {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
            roots: Vec::new(),
        }
    }

    /// Builds a tree from `(id, parent_id)` pairs.
    ///
    /// Pairs may come in any order; siblings keep the order in which they
    /// appear. Fails on duplicate ids, unknown parents and parent cycles.
    pub fn from_parent_pairs<I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, Option<K>)>,
    {
        let pairs: Vec<(K, Option<K>)> = pairs.into_iter().collect();
        let mut tree = Self::new();

        for (id, parent) in &pairs {
            if tree.records.contains_key(id) {
                return Err(Error::duplicate_record(id));
            }
            tree.records
                .insert(id.clone(), Record::new(id.clone(), parent.clone()));
        }

        for (id, parent) in pairs {
            match parent {
                Some(parent_id) => {
                    let parent = tree
                        .records
                        .get_mut(&parent_id)
                        .ok_or_else(|| Error::unknown_parent(&id, &parent_id))?;
                    parent.children.push(id);
                }
                None => tree.roots.push(id),
            }
        }

        tree.check_acyclic()?;
        tracing::debug!(target: targets::TREE, records = tree.len(), roots = tree.roots.len(), "record tree built");
        Ok(tree)
    }

    /// Fails if any parent chain does not end at a root.
    fn check_acyclic(&self) -> Result<()> {
        let mut settled: HashSet<&K> = HashSet::new();
        for id in self.records.keys() {
            let mut path: HashSet<&K> = HashSet::new();
            let mut current = Some(id);
            while let Some(node) = current {
                if settled.contains(node) {
                    break;
                }
                if !path.insert(node) {
                    return Err(Error::cycle(node));
                }
                current = self.records.get(node).and_then(|r| r.parent.as_ref());
            }
            settled.extend(path);
        }
        Ok(())
    }

    /// Adds a root record.
    pub fn insert_root(&mut self, id: K) -> Result<()> {
        if self.records.contains_key(&id) {
            return Err(Error::duplicate_record(&id));
        }
        self.records.insert(id.clone(), Record::new(id.clone(), None));
        self.roots.push(id);
        Ok(())
    }

    /// Adds a record as the last child of `parent`.
    pub fn insert_child(&mut self, parent: &K, id: K) -> Result<()> {
        if self.records.contains_key(&id) {
            return Err(Error::duplicate_record(&id));
        }
        let parent_record = self
            .records
            .get_mut(parent)
            .ok_or_else(|| Error::unknown_parent(&id, parent))?;
        parent_record.children.push(id.clone());
        self.records
            .insert(id.clone(), Record::new(id, Some(parent.clone())));
        Ok(())
    }

    /// Removes a record and its whole subtree.
    ///
    /// Returns the removed ids in pre-order; empty if `id` is unknown.
    pub fn remove(&mut self, id: &K) -> Vec<K> {
        let Some(record) = self.records.get(id) else {
            return Vec::new();
        };

        match record.parent.clone() {
            Some(parent_id) => {
                if let Some(parent) = self.records.get_mut(&parent_id) {
                    parent.children.retain(|child| child != id);
                }
            }
            None => self.roots.retain(|root| root != id),
        }

        let mut removed = vec![id.clone()];
        removed.extend(all_child_records(&*self, id));
        for removed_id in &removed {
            self.records.remove(removed_id);
        }
        removed
    }

    /// Returns the record with the given id.
    pub fn get(&self, id: &K) -> Option<&Record<K>> {
        self.records.get(id)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the tree has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterates all records in unspecified order.
    pub fn records(&self) -> impl Iterator<Item = &Record<K>> {
        self.records.values()
    }

    /// Every descendant of `id` in pre-order.
    pub fn all_child_records(&self, id: &K) -> Vec<K> {
        all_child_records(self, id)
    }

    /// Ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: &K) -> Vec<K> {
        ancestors(self, id)
    }

    /// Depth of `id` (roots are 0).
    pub fn depth(&self, id: &K) -> usize {
        depth(self, id)
    }
}

impl<K: RecordKey> TreeSource<K> for RecordTree<K> {
    fn contains(&self, id: &K) -> bool {
        self.records.contains_key(id)
    }

    fn parent_of(&self, id: &K) -> Option<&K> {
        self.records.get(id).and_then(|r| r.parent.as_ref())
    }

    fn children_of(&self, id: &K) -> &[K] {
        self.records
            .get(id)
            .map(|r| r.children.as_slice())
            .unwrap_or(&[])
    }

    fn roots(&self) -> &[K] {
        &self.roots
    }
}

// =========================================================================
// Visibility restriction
// =========================================================================

#[derive(Debug, Clone)]
enum Restriction<K> {
    Only(HashSet<K>),
    Except(HashSet<K>),
}

/// Restricts a [`TreeSource`] to the records the host currently shows.
///
/// Hidden records keep their selection state but are left out of tri-state
/// computation and out of cascades.
///
/// # Example
///
/// ```
/// use canopy::model::{RecordTree, TreeSource, Visible};
///
/// let tree = RecordTree::from_parent_pairs([(1, None), (2, Some(1)), (3, Some(1))]).unwrap();
/// let filtered = Visible::excluding(&tree, [3]);
///
/// assert!(filtered.is_visible(&2));
/// assert!(!filtered.is_visible(&3));
/// assert!(filtered.contains(&3));
/// ```
pub struct Visible<'a, K: RecordKey, S: TreeSource<K> + ?Sized> {
    source: &'a S,
    restriction: Restriction<K>,
}

impl<'a, K: RecordKey, S: TreeSource<K> + ?Sized> Visible<'a, K, S> {
    /// Only the given ids are visible.
    pub fn only(source: &'a S, ids: impl IntoIterator<Item = K>) -> Self {
        Self {
            source,
            restriction: Restriction::Only(ids.into_iter().collect()),
        }
    }

    /// Every record except the given ids is visible.
    pub fn excluding(source: &'a S, ids: impl IntoIterator<Item = K>) -> Self {
        Self {
            source,
            restriction: Restriction::Except(ids.into_iter().collect()),
        }
    }

    /// The wrapped source.
    pub fn source(&self) -> &'a S {
        self.source
    }
}

impl<K: RecordKey, S: TreeSource<K> + ?Sized> TreeSource<K> for Visible<'_, K, S> {
    fn contains(&self, id: &K) -> bool {
        self.source.contains(id)
    }

    fn parent_of(&self, id: &K) -> Option<&K> {
        self.source.parent_of(id)
    }

    fn children_of(&self, id: &K) -> &[K] {
        self.source.children_of(id)
    }

    fn roots(&self) -> &[K] {
        self.source.roots()
    }

    fn is_visible(&self, id: &K) -> bool {
        let allowed = match &self.restriction {
            Restriction::Only(ids) => ids.contains(id),
            Restriction::Except(ids) => !ids.contains(id),
        };
        allowed && self.source.is_visible(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RecordTree<&'static str> {
        RecordTree::from_parent_pairs([
            ("root", None),
            ("a", Some("root")),
            ("b", Some("root")),
            ("a1", Some("a")),
            ("a2", Some("a")),
            ("other", None),
        ])
        .unwrap()
    }

    #[test]
    fn test_from_parent_pairs_structure() {
        let tree = sample();
        assert_eq!(tree.len(), 6);
        assert_eq!(tree.roots(), &["root", "other"]);
        assert_eq!(tree.children_of(&"a"), &["a1", "a2"]);
        assert_eq!(tree.parent_of(&"a1"), Some(&"a"));
        assert_eq!(tree.parent_of(&"root"), None);
        assert_eq!(tree.get(&"a").map(|r| r.child_ids().len()), Some(2));
    }

    #[test]
    fn test_pairs_in_any_order() {
        let tree =
            RecordTree::from_parent_pairs([(3, Some(1)), (2, Some(1)), (1, None)]).unwrap();
        assert_eq!(tree.children_of(&1), &[3, 2]);
    }

    #[test]
    fn test_duplicate_record_rejected() {
        let err = RecordTree::from_parent_pairs([(1, None), (1, None)]).unwrap_err();
        assert!(matches!(err, Error::DuplicateRecord(_)));
    }

    #[test]
    fn test_unknown_parent_rejected() {
        let err = RecordTree::from_parent_pairs([(1, None), (2, Some(9))]).unwrap_err();
        assert!(matches!(err, Error::UnknownParent { .. }));
    }

    #[test]
    fn test_cycle_rejected() {
        let err =
            RecordTree::from_parent_pairs([(1, Some(2)), (2, Some(1)), (3, None)]).unwrap_err();
        assert!(matches!(err, Error::Cycle(_)));

        let err = RecordTree::from_parent_pairs([(1, Some(1))]).unwrap_err();
        assert!(matches!(err, Error::Cycle(_)));
    }

    #[test]
    fn test_all_child_records_pre_order() {
        let tree = sample();
        assert_eq!(tree.all_child_records(&"root"), vec!["a", "a1", "a2", "b"]);
        assert!(tree.all_child_records(&"a1").is_empty());
        assert!(tree.all_child_records(&"missing").is_empty());
    }

    #[test]
    fn test_ancestors_and_depth() {
        let tree = sample();
        assert_eq!(tree.ancestors(&"a2"), vec!["a", "root"]);
        assert_eq!(tree.depth(&"a2"), 2);
        assert_eq!(tree.depth(&"root"), 0);
    }

    #[test]
    fn test_insert_and_remove() {
        let mut tree = sample();
        tree.insert_child(&"b", "b1").unwrap();
        assert_eq!(tree.children_of(&"b"), &["b1"]);
        assert!(tree.insert_child(&"b", "b1").is_err());
        assert!(tree.insert_child(&"ghost", "x").is_err());

        let removed = tree.remove(&"a");
        assert_eq!(removed, vec!["a", "a1", "a2"]);
        assert!(!tree.contains(&"a1"));
        assert_eq!(tree.children_of(&"root"), &["b"]);

        assert_eq!(tree.remove(&"other"), vec!["other"]);
        assert_eq!(tree.roots(), &["root"]);
        assert!(tree.remove(&"other").is_empty());
    }

    #[test]
    fn test_insert_root() {
        let mut tree = RecordTree::new();
        assert!(tree.is_empty());
        tree.insert_root(10u32).unwrap();
        assert!(tree.insert_root(10).is_err());
        assert_eq!(tree.roots(), &[10]);
    }

    #[test]
    fn test_visible_restriction() {
        let tree = sample();
        let view = Visible::excluding(&tree, ["a2"]);
        assert!(!view.is_visible(&"a2"));
        assert!(view.is_visible(&"a1"));
        assert!(!view.is_visible(&"missing"));
        assert_eq!(visible_children(&view, &"a").collect::<Vec<_>>(), vec![&"a1"]);

        let only = Visible::only(&tree, ["root", "b"]);
        assert_eq!(visible_records(&only), vec!["root", "b"]);
    }

    #[test]
    fn test_hidden_parent_prunes_subtree() {
        let tree = sample();
        let view = Visible::excluding(&tree, ["a"]);
        assert_eq!(visible_child_records(&view, &"root"), vec!["b"]);
        assert_eq!(all_child_records(&view, &"root"), vec!["a", "a1", "a2", "b"]);
        assert_eq!(visible_records(&view), vec!["root", "b", "other"]);
    }

    #[test]
    fn test_nested_visibility_composes() {
        let tree = sample();
        let outer = Visible::excluding(&tree, ["b"]);
        let inner = Visible::excluding(&outer, ["a1"]);
        assert!(!inner.is_visible(&"b"));
        assert!(!inner.is_visible(&"a1"));
        assert!(inner.is_visible(&"a2"));
    }
}
