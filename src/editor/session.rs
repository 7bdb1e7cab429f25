use serde_json::Value;
use tracing::debug;

use crate::core::filter::{FilterTree, Leaf};
use crate::core::flatten::{FlattenedItem, item_path, leaf_ordinals};
use crate::core::types::LogicalOp;
use crate::editor::selection::EditorSelectionState;

/// One edit of one filter cell
///
/// Owns the tree from open to commit. The hosting grid only sees the JSON
/// handed back by [`FilterEditSession::commit`].
#[derive(Debug, Clone)]
pub struct FilterEditSession {
    original: FilterTree,
    tree: FilterTree,
    selection: EditorSelectionState,
}

impl FilterEditSession {
    /// Open a session on a cell value, selecting the hinted leaf if it exists
    pub fn open(value: Option<&Value>, hint: Option<usize>) -> Self {
        let tree = FilterTree::from_json(value);
        Self::from_tree(tree, hint)
    }

    pub fn from_tree(tree: FilterTree, hint: Option<usize>) -> Self {
        let mut selection = EditorSelectionState::new();
        selection.auto_select(&tree.flatten(), hint);
        Self {
            original: tree.clone(),
            tree,
            selection,
        }
    }

    pub fn tree(&self) -> &FilterTree {
        &self.tree
    }

    pub fn selection(&self) -> &EditorSelectionState {
        &self.selection
    }

    pub fn items(&self) -> Vec<FlattenedItem<'_>> {
        self.tree.flatten()
    }

    pub fn selected_leaf(&self) -> Option<&Leaf> {
        self.selection.editing_leaf.as_ref()
    }

    /// Append a leaf joined by `op` and select it
    pub fn add_filter(&mut self, op: LogicalOp, leaf: Leaf) {
        debug!("Adding {} leaf with {op}", leaf.kind());
        self.tree = self.tree.add_leaf(op, leaf.with_derived_status());
        let items = self.tree.flatten();
        let last = leaf_ordinals(&items).last().copied();
        self.selection.auto_select(&items, last);
    }

    /// Toggle the operator token at `ordinal`; returns false for other tokens
    pub fn toggle_operator(&mut self, ordinal: usize) -> bool {
        let items = self.tree.flatten();
        let path = match items.iter().find(|i| i.ordinal() == ordinal) {
            Some(item) if item.is_operator() => item_path(&items, ordinal).cloned(),
            _ => None,
        };
        let Some(path) = path else {
            return false;
        };
        debug!("Toggling operator at {path}");
        let selected = self.selection.selected_leaf_index;
        self.tree = self.tree.toggle_operator(&path);
        self.selection.auto_select(&self.tree.flatten(), selected);
        true
    }

    /// Replace the selected leaf, keeping its identifier
    pub fn update_selected_leaf(&mut self, leaf: Leaf) -> bool {
        let items = self.tree.flatten();
        let Some(path) = self.selection.selected_path(&items) else {
            return false;
        };
        let Some(current) = self.selection.editing_leaf.as_ref() else {
            return false;
        };
        let leaf = leaf.with_id(current.id().clone()).with_derived_status();
        let selected = self.selection.selected_leaf_index;
        self.tree = self.tree.replace_leaf(&path, leaf);
        self.selection.auto_select(&self.tree.flatten(), selected);
        true
    }

    /// Delete the selected leaf and select the leaf before it
    pub fn delete_selected(&mut self) -> bool {
        let items = self.tree.flatten();
        let (Some(path), Some(position)) = (
            self.selection.selected_path(&items),
            self.selection.selected_leaf_position(&items),
        ) else {
            return false;
        };
        debug!("Deleting leaf at {path}");
        self.tree = self.tree.delete_leaf(&path);

        let items = self.tree.flatten();
        let leaves = leaf_ordinals(&items);
        let next = leaves.get(position.saturating_sub(1)).copied();
        self.selection.auto_select(&items, next);
        true
    }

    pub fn select(&mut self, ordinal: usize) -> bool {
        let items = self.tree.flatten();
        self.selection.select(&items, ordinal)
    }

    pub fn select_next(&mut self) {
        let items = self.tree.flatten();
        self.selection.select_next(&items);
    }

    pub fn select_prev(&mut self) {
        let items = self.tree.flatten();
        self.selection.select_prev(&items);
    }

    pub fn dismiss(&mut self) {
        self.selection.clear();
    }

    /// Whether the tree differs from the value the session opened with
    pub fn is_dirty(&self) -> bool {
        self.tree != self.original
    }

    /// Cell value for the edited tree, `null` when empty
    pub fn commit(self) -> Value {
        self.tree.to_json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::filter::{FilterNode, LeafKind};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn age_and_sex() -> Value {
        FilterTree::from_root(FilterNode::and(
            Leaf::categorical("age", &["18-65"]).into(),
            Leaf::categorical("sex", &["F"]).into(),
        ))
        .to_json()
    }

    fn labels(session: &FilterEditSession) -> Vec<String> {
        session.items().iter().map(|i| i.label()).collect()
    }

    #[test]
    fn opening_malformed_value_gives_empty_session() {
        let value = json!({"class_name": "Nope"});
        let session = FilterEditSession::open(Some(&value), Some(0));
        assert!(session.tree().is_empty());
        assert!(session.selection().is_empty());
        assert_eq!(session.commit(), Value::Null);
    }

    #[test]
    fn add_filter_appends_and_selects() {
        let mut session = FilterEditSession::open(None, None);
        session.add_filter(LogicalOp::And, Leaf::categorical("age", &["18-65"]));
        assert_eq!(session.selection().selected_leaf_index, Some(0));

        session.add_filter(LogicalOp::Or, Leaf::new(LeafKind::Phenotype));
        assert_eq!(labels(&session), vec!["age in [18-65]", "OR", "@<phenotype>"]);
        assert_eq!(session.selection().selected_leaf_index, Some(2));
        assert!(session.is_dirty());
    }

    #[test]
    fn toggle_only_accepts_operator_ordinals() {
        let value = age_and_sex();
        let mut session = FilterEditSession::open(Some(&value), Some(2));

        assert!(!session.toggle_operator(0));
        assert!(session.toggle_operator(1));
        assert_eq!(labels(&session)[1], "OR");
        assert_eq!(session.selection().selected_leaf_index, Some(2));

        assert!(session.toggle_operator(1));
        assert!(!session.is_dirty());
    }

    #[test]
    fn update_keeps_identity_and_rederives_status() {
        let value = age_and_sex();
        let mut session = FilterEditSession::open(Some(&value), Some(2));
        let id = session.selected_leaf().unwrap().id().clone();

        assert!(session.update_selected_leaf(Leaf::new(LeafKind::Value)));
        let leaf = session.selected_leaf().unwrap();
        assert_eq!(leaf.id(), &id);
        assert_eq!(leaf.kind(), LeafKind::Value);
        assert_eq!(leaf.status(), crate::core::types::FilterStatus::Empty);
    }

    #[test]
    fn deleting_first_leaf_leaves_sibling_selected() {
        let value = age_and_sex();
        let mut session = FilterEditSession::open(Some(&value), Some(0));

        assert!(session.delete_selected());
        assert_eq!(labels(&session), vec!["sex in [F]"]);
        assert_eq!(session.selection().selected_leaf_index, Some(0));

        assert!(session.delete_selected());
        assert!(session.tree().is_empty());
        assert!(session.selection().is_empty());
        assert!(!session.delete_selected());
        assert_eq!(session.commit(), Value::Null);
    }

    #[test]
    fn deleting_selects_preceding_leaf() {
        let mut session = FilterEditSession::open(None, None);
        session.add_filter(LogicalOp::And, Leaf::categorical("a", &["x"]));
        session.add_filter(LogicalOp::And, Leaf::categorical("b", &["x"]));
        session.add_filter(LogicalOp::And, Leaf::categorical("c", &["x"]));

        assert!(session.delete_selected());
        let selected = session.selected_leaf().map(Leaf::summary);
        assert_eq!(selected, Some("b in [x]".to_string()));
    }

    #[test]
    fn dismiss_clears_selection_but_keeps_edits() {
        let value = age_and_sex();
        let mut session = FilterEditSession::open(Some(&value), None);
        session.toggle_operator(1);
        session.dismiss();
        assert!(session.selection().is_empty());
        assert_eq!(session.commit()["class_name"], "OrFilter");
    }
}
