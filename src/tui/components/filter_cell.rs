//! Renders a flattened filter tree as one line of styled spans. Used by the
//! cohort grid cells and by the editor's mirror panel.
use ratatui::text::{Line, Span};

use crate::core::{FlattenedItem, Paren};
use crate::tui::Theme;

const EMPTY_FILTER: &str = "(no filter)";

/// Styled line for `items`, highlighting the token at `selected`
pub fn filter_line(
    items: &[FlattenedItem<'_>],
    selected: Option<usize>,
    theme: &Theme,
) -> Line<'static> {
    if items.is_empty() {
        return Line::from(Span::styled(EMPTY_FILTER, theme.paren_style()));
    }

    let mut spans = Vec::with_capacity(items.len() * 2);
    let mut previous: Option<&FlattenedItem<'_>> = None;
    for item in items {
        if previous.is_some_and(|prev| needs_space(prev, item)) {
            spans.push(Span::raw(" "));
        }
        let style = match item {
            _ if Some(item.ordinal()) == selected => theme.selected_token_style(),
            FlattenedItem::Filter { leaf, .. } => theme.leaf_style(leaf.status()),
            FlattenedItem::Operator { .. } => theme.operator_style(),
            FlattenedItem::Parenthesis { .. } => theme.paren_style(),
        };
        spans.push(Span::styled(item.label(), style));
        previous = Some(item);
    }
    Line::from(spans)
}

/// Plain text of a flattened tree, matching what `filter_line` draws
pub fn filter_text(items: &[FlattenedItem<'_>]) -> String {
    filter_line(items, None, &Theme::default())
        .spans
        .iter()
        .map(|span| span.content.as_ref())
        .collect()
}

fn needs_space(prev: &FlattenedItem<'_>, next: &FlattenedItem<'_>) -> bool {
    let after_open = matches!(prev, FlattenedItem::Parenthesis { symbol: Paren::Open, .. });
    let before_close = matches!(next, FlattenedItem::Parenthesis { symbol: Paren::Close, .. });
    !(after_open || before_close)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FilterNode, FilterTree, Leaf};
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_tree_renders_placeholder() {
        assert_eq!(filter_text(&[]), EMPTY_FILTER);
    }

    #[test]
    fn nested_tree_renders_tight_parentheses() {
        let tree = FilterTree::from_root(FilterNode::and(
            Leaf::categorical("sex", &["F"]).into(),
            FilterNode::or(Leaf::phenotype("p1", "Diabetes").into(), Leaf::phenotype("p2", "CKD").into()),
        ));
        let items = tree.flatten();
        assert_eq!(filter_text(&items), "sex in [F] AND (@Diabetes OR @CKD)");
        assert_eq!(filter_text(&items), tree.summary());
    }

    #[test]
    fn selected_token_is_highlighted() {
        let tree = FilterTree::from_root(FilterNode::and(
            Leaf::categorical("sex", &["F"]).into(),
            Leaf::categorical("age", &[]).into(),
        ));
        let items = tree.flatten();
        let theme = Theme::default();
        let line = filter_line(&items, Some(2), &theme);

        let age = line.spans.iter().find(|s| s.content.starts_with("age")).unwrap();
        assert_eq!(age.style, theme.selected_token_style());
        let sex = line.spans.iter().find(|s| s.content.starts_with("sex")).unwrap();
        assert_eq!(sex.style.fg, Some(theme.complete_fg));
    }
}
