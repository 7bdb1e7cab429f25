//! Flattening of a filter tree into the token sequence that cell renderers
//! draw, and the inverse rebuild.
use strum::Display;

use crate::core::error::FilterTreeError;
use crate::core::filter::{FilterNode, Leaf};
use crate::core::path::{Branch, NodePath};
use crate::core::types::LogicalOp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Paren {
    #[strum(serialize = "(")]
    Open,
    #[strum(serialize = ")")]
    Close,
}

/// One renderable token of a flattened filter tree
///
/// Ordinals number every token of a single flatten call in order; they are
/// render keys, not persistent identifiers.
#[derive(Debug, Clone, PartialEq)]
pub enum FlattenedItem<'a> {
    Filter {
        leaf: &'a Leaf,
        ordinal: usize,
        path: NodePath,
    },
    Operator {
        op: LogicalOp,
        ordinal: usize,
        path: NodePath,
    },
    Parenthesis {
        symbol: Paren,
        ordinal: usize,
    },
}

impl<'a> FlattenedItem<'a> {
    pub fn ordinal(&self) -> usize {
        match self {
            FlattenedItem::Filter { ordinal, .. }
            | FlattenedItem::Operator { ordinal, .. }
            | FlattenedItem::Parenthesis { ordinal, .. } => *ordinal,
        }
    }

    /// Path of the node behind this token; parentheses have none
    pub fn path(&self) -> Option<&NodePath> {
        match self {
            FlattenedItem::Filter { path, .. } | FlattenedItem::Operator { path, .. } => Some(path),
            FlattenedItem::Parenthesis { .. } => None,
        }
    }

    pub fn as_leaf(&self) -> Option<&'a Leaf> {
        match self {
            FlattenedItem::Filter { leaf, .. } => Some(*leaf),
            _ => None,
        }
    }

    pub fn is_filter(&self) -> bool {
        matches!(self, FlattenedItem::Filter { .. })
    }

    pub fn is_operator(&self) -> bool {
        matches!(self, FlattenedItem::Operator { .. })
    }

    /// Text drawn for this token
    pub fn label(&self) -> String {
        match self {
            FlattenedItem::Filter { leaf, .. } => leaf.summary(),
            FlattenedItem::Operator { op, .. } => op.to_string(),
            FlattenedItem::Parenthesis { symbol, .. } => symbol.to_string(),
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            FlattenedItem::Filter { .. } => "filter",
            FlattenedItem::Operator { .. } => "operator",
            FlattenedItem::Parenthesis { symbol: Paren::Open, .. } => "'('",
            FlattenedItem::Parenthesis { symbol: Paren::Close, .. } => "')'",
        }
    }
}

/// Flatten a tree into filter, operator and parenthesis tokens
///
/// Nested binary subtrees are wrapped in parentheses; the root expression is
/// never wrapped.
pub fn flatten(root: Option<&FilterNode>) -> Vec<FlattenedItem<'_>> {
    let mut items = Vec::new();
    if let Some(node) = root {
        flatten_into(node, NodePath::root(), &mut items);
    }
    items
}

fn flatten_into<'a>(node: &'a FilterNode, path: NodePath, items: &mut Vec<FlattenedItem<'a>>) {
    let Some((op, left, right)) = node.as_binary() else {
        if let FilterNode::Leaf(leaf) = node {
            items.push(FlattenedItem::Filter { leaf, ordinal: items.len(), path });
        }
        return;
    };

    let nested = !path.is_root();
    if nested {
        items.push(FlattenedItem::Parenthesis { symbol: Paren::Open, ordinal: items.len() });
    }
    flatten_into(left, path.child(Branch::Left), items);
    items.push(FlattenedItem::Operator { op, ordinal: items.len(), path: path.clone() });
    flatten_into(right, path.child(Branch::Right), items);
    if nested {
        items.push(FlattenedItem::Parenthesis { symbol: Paren::Close, ordinal: items.len() });
    }
}

/// Rebuild a tree from a token sequence
///
/// Operators at the same nesting level fold to the left, so
/// `a AND b OR c` becomes `Or(And(a, b), c)`.
pub fn rebuild_from_flattened(
    items: &[FlattenedItem<'_>],
) -> Result<Option<FilterNode>, FilterTreeError> {
    if items.is_empty() {
        return Ok(None);
    }
    let mut rebuilder = Rebuilder { items, pos: 0 };
    let root = rebuilder.expression()?;
    if let Some(extra) = rebuilder.peek() {
        return Err(FilterTreeError::UnexpectedToken {
            ordinal: extra.ordinal(),
            found: extra.describe(),
        });
    }
    Ok(Some(root))
}

struct Rebuilder<'i, 'a> {
    items: &'i [FlattenedItem<'a>],
    pos: usize,
}

impl<'i, 'a> Rebuilder<'i, 'a> {
    fn peek(&self) -> Option<&'i FlattenedItem<'a>> {
        self.items.get(self.pos)
    }

    fn next(&mut self) -> Option<&'i FlattenedItem<'a>> {
        let item = self.items.get(self.pos)?;
        self.pos += 1;
        Some(item)
    }

    fn expression(&mut self) -> Result<FilterNode, FilterTreeError> {
        let mut lhs = self.term()?;
        while let Some(FlattenedItem::Operator { op, .. }) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            lhs = FilterNode::binary(*op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<FilterNode, FilterTreeError> {
        match self.next() {
            Some(FlattenedItem::Filter { leaf, .. }) => Ok(FilterNode::Leaf((*leaf).clone())),
            Some(FlattenedItem::Parenthesis { symbol: Paren::Open, ordinal }) => {
                let inner = self.expression()?;
                match self.next() {
                    Some(FlattenedItem::Parenthesis { symbol: Paren::Close, .. }) => Ok(inner),
                    Some(other) => Err(FilterTreeError::UnexpectedToken {
                        ordinal: other.ordinal(),
                        found: other.describe(),
                    }),
                    None => Err(FilterTreeError::UnclosedParenthesis(*ordinal)),
                }
            }
            Some(other) => Err(FilterTreeError::UnexpectedToken {
                ordinal: other.ordinal(),
                found: other.describe(),
            }),
            None => Err(FilterTreeError::UnexpectedEnd),
        }
    }
}

/// Ordinals of the filter tokens, in order
pub fn leaf_ordinals(items: &[FlattenedItem<'_>]) -> Vec<usize> {
    items.iter().filter(|i| i.is_filter()).map(FlattenedItem::ordinal).collect()
}

/// The filter token with the given ordinal, if there is one
pub fn filter_at<'i, 'a>(
    items: &'i [FlattenedItem<'a>],
    ordinal: usize,
) -> Option<(&'a Leaf, &'i NodePath)> {
    items.iter().find_map(|item| match item {
        FlattenedItem::Filter { leaf, ordinal: o, path } if *o == ordinal => Some((*leaf, path)),
        _ => None,
    })
}

/// Path of the node behind the token with the given ordinal
pub fn item_path<'i>(items: &'i [FlattenedItem<'_>], ordinal: usize) -> Option<&'i NodePath> {
    items.iter().find(|item| item.ordinal() == ordinal).and_then(FlattenedItem::path)
}
