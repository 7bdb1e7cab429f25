use crate::core::filter::Leaf;
use crate::core::flatten::{FlattenedItem, filter_at, leaf_ordinals};
use crate::core::path::NodePath;

/// Which leaf of the flattened tree the editor is pointing at
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditorSelectionState {
    /// Ordinal of the selected `Filter` item
    pub selected_leaf_index: Option<usize>,
    /// Copy of the selected leaf, edited by the composer
    pub editing_leaf: Option<Leaf>,
}

impl EditorSelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick a leaf after opening or rebuilding
    ///
    /// A hint naming an existing leaf wins; otherwise the first leaf is
    /// selected; with no leaves the selection is cleared.
    pub fn auto_select(&mut self, items: &[FlattenedItem<'_>], hint: Option<usize>) {
        let chosen = hint
            .and_then(|ordinal| filter_at(items, ordinal).map(|_| ordinal))
            .or_else(|| leaf_ordinals(items).first().copied());
        self.set(items, chosen);
    }

    /// Select the leaf at `ordinal`; returns whether the selection changed
    ///
    /// Ordinals of operators, parentheses or nothing at all are ignored.
    pub fn select(&mut self, items: &[FlattenedItem<'_>], ordinal: usize) -> bool {
        if filter_at(items, ordinal).is_none() || self.selected_leaf_index == Some(ordinal) {
            return false;
        }
        self.set(items, Some(ordinal));
        true
    }

    pub fn select_next(&mut self, items: &[FlattenedItem<'_>]) {
        self.step(items, true);
    }

    pub fn select_prev(&mut self, items: &[FlattenedItem<'_>]) {
        self.step(items, false);
    }

    fn step(&mut self, items: &[FlattenedItem<'_>], forward: bool) {
        let leaves = leaf_ordinals(items);
        if leaves.is_empty() {
            self.clear();
            return;
        }
        let position = self
            .selected_leaf_index
            .and_then(|current| leaves.iter().position(|o| *o == current));
        let next = match (position, forward) {
            (None, true) => 0,
            (None, false) => leaves.len() - 1,
            (Some(i), true) => (i + 1) % leaves.len(),
            (Some(i), false) => (i + leaves.len() - 1) % leaves.len(),
        };
        self.set(items, Some(leaves[next]));
    }

    pub fn clear(&mut self) {
        self.selected_leaf_index = None;
        self.editing_leaf = None;
    }

    pub fn is_empty(&self) -> bool {
        self.selected_leaf_index.is_none()
    }

    /// Path of the selected leaf in the tree that produced `items`
    pub fn selected_path(&self, items: &[FlattenedItem<'_>]) -> Option<NodePath> {
        let ordinal = self.selected_leaf_index?;
        filter_at(items, ordinal).map(|(_, path)| path.clone())
    }

    /// Position of the selected leaf among all leaves
    pub fn selected_leaf_position(&self, items: &[FlattenedItem<'_>]) -> Option<usize> {
        let ordinal = self.selected_leaf_index?;
        leaf_ordinals(items).iter().position(|o| *o == ordinal)
    }

    fn set(&mut self, items: &[FlattenedItem<'_>], ordinal: Option<usize>) {
        self.selected_leaf_index = ordinal;
        self.editing_leaf = ordinal
            .and_then(|o| filter_at(items, o))
            .map(|(leaf, _)| leaf.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::filter::{FilterNode, FilterTree};
    use pretty_assertions::assert_eq;

    fn tree() -> FilterTree {
        FilterTree::from_root(FilterNode::and(
            Leaf::categorical("a", &["x"]).into(),
            FilterNode::or(
                Leaf::categorical("b", &["x"]).into(),
                Leaf::categorical("c", &["x"]).into(),
            ),
        ))
    }

    #[test]
    fn auto_select_prefers_valid_hint() {
        let tree = tree();
        let items = tree.flatten();
        let mut state = EditorSelectionState::new();

        state.auto_select(&items, Some(5));
        assert_eq!(state.selected_leaf_index, Some(5));
        assert_eq!(state.editing_leaf.as_ref().map(Leaf::summary), Some("c in [x]".to_string()));
    }

    #[test]
    fn auto_select_falls_back_to_first_leaf() {
        let tree = tree();
        let items = tree.flatten();
        let mut state = EditorSelectionState::new();

        // 1 is the AND operator, 42 does not exist.
        state.auto_select(&items, Some(1));
        assert_eq!(state.selected_leaf_index, Some(0));
        state.auto_select(&items, Some(42));
        assert_eq!(state.selected_leaf_index, Some(0));
        state.auto_select(&items, None);
        assert_eq!(state.selected_leaf_index, Some(0));
    }

    #[test]
    fn auto_select_on_empty_tree_clears() {
        let mut state = EditorSelectionState::new();
        state.selected_leaf_index = Some(3);
        state.auto_select(&[], Some(3));
        assert_eq!(state, EditorSelectionState::default());
    }

    #[test]
    fn auto_select_is_idempotent() {
        let tree = tree();
        let items = tree.flatten();
        let mut once = EditorSelectionState::new();
        once.auto_select(&items, Some(3));
        let mut twice = once.clone();
        twice.auto_select(&items, Some(3));
        assert_eq!(once, twice);
    }

    #[test]
    fn select_ignores_non_leaf_ordinals() {
        let tree = tree();
        let items = tree.flatten();
        let mut state = EditorSelectionState::new();
        state.auto_select(&items, None);

        assert!(!state.select(&items, 2));
        assert!(!state.select(&items, 0));
        assert!(state.select(&items, 3));
        assert_eq!(state.selected_leaf_position(&items), Some(1));
    }

    #[test]
    fn next_and_prev_wrap_over_leaves() {
        let tree = tree();
        let items = tree.flatten();
        let mut state = EditorSelectionState::new();

        state.select_next(&items);
        assert_eq!(state.selected_leaf_index, Some(0));
        state.select_next(&items);
        state.select_next(&items);
        assert_eq!(state.selected_leaf_index, Some(5));
        state.select_next(&items);
        assert_eq!(state.selected_leaf_index, Some(0));
        state.select_prev(&items);
        assert_eq!(state.selected_leaf_index, Some(5));
        assert_eq!(state.selected_path(&items).map(|p| p.to_string()), Some("2.2".to_string()));
    }
}
