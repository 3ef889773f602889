//! Conversion options.

/// Options controlling the tree-to-Markdown conversion.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// When set, a textless element outside the structural set drops its
    /// whole subtree instead of only its own rendering. The default keeps
    /// the children, which is what the upstream pipeline always did; the
    /// strict variant exists so the omission is a choice, not an accident.
    pub prune_empty: bool,
    /// Maximum nesting depth; descent stops beyond it so adversarially deep
    /// documents cannot exhaust the stack.
    pub max_depth: usize,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            prune_empty: false,
            max_depth: 256,
        }
    }
}
