//! Text rendering of a tree with its checkbox states.

use std::fmt::{self, Write};

use canopy_core::logging::TreeFormatOptions;

use super::state::{SelectionState, TriState};
use super::tree::{RecordKey, TreeSource};

type Label<'a, K> = Box<dyn Fn(&K) -> String + 'a>;

/// Debug utility for visualizing a record tree with its selection.
///
/// Each record is printed on its own line with a `[x]`, `[-]` or `[ ]`
/// marker for selected, indeterminate and unselected records.
///
/// # Example
///
/// ```
/// use canopy::model::{RecordTree, SelectionEngine, SelectionTreeDebug};
/// use canopy::TreeFormatOptions;
///
/// let tree = RecordTree::from_parent_pairs([("root", None), ("a", Some("root")), ("b", Some("root"))]).unwrap();
/// let mut engine = SelectionEngine::new();
/// engine.select_ids(&tree, &["a"], false);
///
/// let text = SelectionTreeDebug::new(&tree, engine.state())
///     .with_options(TreeFormatOptions::ascii())
///     .with_label(|id| id.to_string())
///     .format_all();
///
/// assert_eq!(text, "[-] root\n+-- [x] a\n`-- [ ] b\n");
/// ```
pub struct SelectionTreeDebug<'a, K: RecordKey, S: TreeSource<K> + ?Sized> {
    source: &'a S,
    state: &'a SelectionState<K>,
    options: TreeFormatOptions,
    label: Option<Label<'a, K>>,
}

impl<'a, K: RecordKey, S: TreeSource<K> + ?Sized> SelectionTreeDebug<'a, K, S> {
    /// Create a visualizer with default options. Ids are labelled with
    /// their `Debug` output.
    pub fn new(source: &'a S, state: &'a SelectionState<K>) -> Self {
        Self {
            source,
            state,
            options: TreeFormatOptions::default(),
            label: None,
        }
    }

    /// Use custom format options.
    pub fn with_options(mut self, options: TreeFormatOptions) -> Self {
        self.options = options;
        self
    }

    /// Use a custom label for each record.
    pub fn with_label(mut self, label: impl Fn(&K) -> String + 'a) -> Self {
        self.label = Some(Box::new(label));
        self
    }

    /// Format every root and its subtree.
    pub fn format_all(&self) -> String {
        self.to_string()
    }

    /// Format the subtree rooted at `id`.
    pub fn format_subtree(&self, id: &K) -> String {
        let mut output = String::new();
        if self.source.contains(id) {
            // Writing into a String cannot fail.
            let _ = self.write_subtree(&mut output, id, &mut Vec::new());
        }
        output
    }

    fn shows(&self, id: &K) -> bool {
        self.options.show_hidden || self.source.is_visible(id)
    }

    /// `lineage` holds the `is_last` flags from below the root down to `id`.
    fn write_subtree<W: Write>(&self, out: &mut W, id: &K, lineage: &mut Vec<bool>) -> fmt::Result {
        if let Some(max) = self.options.max_depth
            && lineage.len() > max
        {
            return Ok(());
        }

        let marker = match self.state.tri_state(id) {
            TriState::Selected => "[x]",
            TriState::Indeterminate => "[-]",
            TriState::Unselected => "[ ]",
        };
        let label = match &self.label {
            Some(label) => label(id),
            None => format!("{:?}", id),
        };
        write!(out, "{}{} {}", self.options.prefix(lineage), marker, label)?;
        if !self.source.is_visible(id) {
            out.write_str(" (hidden)")?;
        }
        out.write_char('\n')?;

        let children: Vec<&K> = self
            .source
            .children_of(id)
            .iter()
            .filter(|child| self.shows(child))
            .collect();
        let child_count = children.len();
        for (i, child) in children.into_iter().enumerate() {
            lineage.push(i + 1 == child_count);
            let written = self.write_subtree(out, child, lineage);
            lineage.pop();
            written?;
        }
        Ok(())
    }
}

impl<K: RecordKey, S: TreeSource<K> + ?Sized> fmt::Display for SelectionTreeDebug<'_, K, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let roots: Vec<&K> = self.source.roots().iter().filter(|root| self.shows(root)).collect();
        if roots.is_empty() {
            return writeln!(f, "(empty)");
        }
        for root in roots {
            self.write_subtree(f, root, &mut Vec::new())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tree::{RecordTree, Visible};

    fn sample() -> (RecordTree<&'static str>, SelectionState<&'static str>) {
        let tree = RecordTree::from_parent_pairs([
            ("root", None),
            ("a", Some("root")),
            ("b", Some("root")),
            ("a1", Some("a")),
            ("a2", Some("a")),
        ])
        .unwrap();
        let state = SelectionState::from_sets(["a1"], ["a", "root"]);
        (tree, state)
    }

    fn plain(id: &&'static str) -> String {
        id.to_string()
    }

    #[test]
    fn test_format_all_ascii() {
        let (tree, state) = sample();
        let text = SelectionTreeDebug::new(&tree, &state)
            .with_options(TreeFormatOptions::ascii())
            .with_label(plain)
            .format_all();

        let expected = "\
[-] root
+-- [-] a
|  +-- [x] a1
|  `-- [ ] a2
`-- [ ] b
";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_last_sibling_subtree_has_no_bar() {
        let tree = RecordTree::from_parent_pairs([
            ("root", None),
            ("a", Some("root")),
            ("b", Some("root")),
            ("b1", Some("b")),
            ("b2", Some("b")),
        ])
        .unwrap();
        let state = SelectionState::from_sets(["b1"], ["b", "root"]);
        let text = SelectionTreeDebug::new(&tree, &state)
            .with_options(TreeFormatOptions::ascii())
            .with_label(plain)
            .format_all();

        let expected = "\
[-] root
+-- [ ] a
`-- [-] b
   +-- [x] b1
   `-- [ ] b2
";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_default_label_uses_debug() {
        let (tree, state) = sample();
        let text = SelectionTreeDebug::new(&tree, &state).format_subtree(&"a1");
        assert_eq!(text, "[x] \"a1\"\n");
    }

    #[test]
    fn test_hidden_records() {
        let (tree, state) = sample();
        let view = Visible::excluding(&tree, ["a2"]);

        let text = SelectionTreeDebug::new(&view, &state)
            .with_options(TreeFormatOptions::ascii())
            .with_label(plain)
            .format_all();
        assert!(!text.contains("a2"));

        let options = TreeFormatOptions {
            show_hidden: true,
            ..TreeFormatOptions::ascii()
        };
        let text = SelectionTreeDebug::new(&view, &state)
            .with_options(options)
            .with_label(plain)
            .format_all();
        assert!(text.contains("[ ] a2 (hidden)"));
    }

    #[test]
    fn test_max_depth() {
        let (tree, state) = sample();
        let options = TreeFormatOptions {
            max_depth: Some(1),
            ..TreeFormatOptions::ascii()
        };
        let text = SelectionTreeDebug::new(&tree, &state)
            .with_options(options)
            .with_label(plain)
            .format_all();
        assert!(text.contains("a\n"));
        assert!(!text.contains("a1"));
    }

    #[test]
    fn test_empty_tree() {
        let tree = RecordTree::<u32>::new();
        let state = SelectionState::new();
        assert_eq!(SelectionTreeDebug::new(&tree, &state).to_string(), "(empty)\n");
        assert!(SelectionTreeDebug::new(&tree, &state).format_subtree(&7).is_empty());
    }
}
