//! Logging and debugging facilities for Canopy.
//!
//! Canopy uses the `tracing` crate for instrumentation. The library never
//! installs a subscriber; to see logs, install one in your application:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("canopy=debug,canopy_core=trace")
//!     .init();
//! ```
//!
//! This module also holds the formatting options shared by the tree debug
//! renderers (see `canopy::model::SelectionTreeDebug`).

/// Span names used throughout Canopy for tracing.
pub mod span_names {
    /// A committed selection change.
    pub const SELECTION_CHANGE: &str = "canopy::selection_change";
    /// Re-synchronization after a tree or visibility change.
    pub const REFRESH: &str = "canopy::refresh";
}

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Signal/slot system target.
    pub const SIGNAL: &str = "canopy_core::signal";
    /// Selection engine target.
    pub const SELECTION: &str = "canopy::selection";
    /// Tri-state propagation target.
    pub const PROPAGATION: &str = "canopy::propagation";
    /// Record tree construction target.
    pub const TREE: &str = "canopy::tree";
}

/// Style options for tree visualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeStyle {
    /// ASCII characters for tree branches.
    Ascii,
    /// Unicode box-drawing characters.
    #[default]
    Unicode,
    /// Compact, indentation-only representation.
    Compact,
}

impl TreeStyle {
    /// Returns `(continuation, branch, last_branch)` connector strings.
    pub fn connectors(&self) -> (&'static str, &'static str, &'static str) {
        match self {
            TreeStyle::Ascii => ("|", "+-- ", "`-- "),
            TreeStyle::Unicode => ("\u{2502}", "\u{251c}\u{2500}\u{2500} ", "\u{2514}\u{2500}\u{2500} "),
            TreeStyle::Compact => ("", "- ", "- "),
        }
    }
}

/// Configuration for tree debug output.
#[derive(Debug, Clone)]
pub struct TreeFormatOptions {
    /// The style of tree visualization.
    pub style: TreeStyle,
    /// Whether to show ids of records that are filtered out of the view.
    pub show_hidden: bool,
    /// Maximum depth to traverse (None for unlimited).
    pub max_depth: Option<usize>,
    /// Indent size for each level.
    pub indent_size: usize,
}

impl Default for TreeFormatOptions {
    fn default() -> Self {
        Self {
            style: TreeStyle::default(),
            show_hidden: false,
            max_depth: None,
            indent_size: 2,
        }
    }
}

impl TreeFormatOptions {
    /// Options for detailed debugging output, including hidden records.
    pub fn detailed() -> Self {
        Self {
            show_hidden: true,
            ..Default::default()
        }
    }

    /// ASCII-only options, stable across terminals and handy in assertions.
    pub fn ascii() -> Self {
        Self {
            style: TreeStyle::Ascii,
            ..Default::default()
        }
    }

    /// Build the prefix string for a node from its lineage.
    ///
    /// `lineage` holds one `is_last` flag per level below the root, ending
    /// with the node itself, and is empty for roots. Levels whose ancestor
    /// was the last child draw blanks instead of a continuation bar.
    pub fn prefix(&self, lineage: &[bool]) -> String {
        let Some((&is_last, ancestors)) = lineage.split_last() else {
            return String::new();
        };

        let (continuation, branch, last) = self.style.connectors();
        let mut prefix = String::new();

        for &ancestor_last in ancestors {
            if ancestor_last {
                prefix.extend(std::iter::repeat_n(' ', continuation.chars().count()));
            } else {
                prefix.push_str(continuation);
            }
            prefix.extend(std::iter::repeat_n(' ', self.indent_size));
        }

        prefix.push_str(if is_last { last } else { branch });
        prefix
    }
}
