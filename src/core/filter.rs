//! Filter tree model: leaf filters, binary AND/OR nodes, and the tree value
//! handed between the cohort grid and the filter editor.
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use strum::{Display, EnumIter};
use tracing::warn;

use crate::core::error::FilterTreeError;
use crate::core::flatten::{flatten, FlattenedItem};
use crate::core::ops;
use crate::core::path::NodePath;
use crate::core::types::{FilterStatus, LeafId, LogicalOp};

/// Membership test used by categorical filters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumIter, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoricalOperator {
    #[default]
    #[strum(serialize = "in")]
    Isin,
    #[strum(serialize = "not in")]
    Notin,
}

/// Comparison used by value and day-count bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, Serialize, Deserialize)]
pub enum ComparisonOp {
    #[serde(rename = ">")]
    #[strum(serialize = ">")]
    Gt,
    #[serde(rename = ">=")]
    #[strum(serialize = ">=")]
    Gte,
    #[serde(rename = "<")]
    #[strum(serialize = "<")]
    Lt,
    #[serde(rename = "<=")]
    #[strum(serialize = "<=")]
    Lte,
}

/// One side of a numeric range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bound {
    pub operator: ComparisonOp,
    pub value: f64,
}

impl Bound {
    pub fn new(operator: ComparisonOp, value: f64) -> Self {
        Self { operator, value }
    }
}

/// Which side of the anchor event a time range lies on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumIter, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum When {
    #[default]
    Before,
    After,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalFilter {
    #[serde(default)]
    pub id: LeafId,
    pub column_name: String,
    #[serde(default)]
    pub allowed_values: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default)]
    pub operator: CategoricalOperator,
    #[serde(default)]
    pub status: FilterStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueFilter {
    #[serde(default)]
    pub id: LeafId,
    pub column_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<Bound>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<Bound>,
    #[serde(default)]
    pub status: FilterStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelativeTimeRangeFilter {
    #[serde(default)]
    pub id: LeafId,
    pub when: When,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_days: Option<Bound>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_days: Option<Bound>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor_phenotype_id: Option<String>,
    #[serde(default)]
    pub status: FilterStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhenotypeReference {
    #[serde(default)]
    pub id: LeafId,
    pub phenotype_id: String,
    #[serde(default)]
    pub phenotype_name: String,
    #[serde(default)]
    pub status: FilterStatus,
}

/// Kinds of leaf the composer can create
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum LeafKind {
    #[strum(serialize = "Categorical")]
    Categorical,
    #[strum(serialize = "Value")]
    Value,
    #[strum(serialize = "Time Range")]
    TimeRange,
    #[strum(serialize = "Phenotype")]
    Phenotype,
}

/// A terminal filter condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "class_name")]
pub enum Leaf {
    CategoricalFilter(CategoricalFilter),
    ValueFilter(ValueFilter),
    RelativeTimeRangeFilter(RelativeTimeRangeFilter),
    PhenotypeReference(PhenotypeReference),
}

impl Leaf {
    /// A fresh, empty leaf of the given kind
    pub fn new(kind: LeafKind) -> Self {
        let id = LeafId::new();
        match kind {
            LeafKind::Categorical => Leaf::CategoricalFilter(CategoricalFilter {
                id,
                column_name: String::new(),
                allowed_values: Vec::new(),
                domain: None,
                operator: CategoricalOperator::Isin,
                status: FilterStatus::Empty,
            }),
            LeafKind::Value => Leaf::ValueFilter(ValueFilter {
                id,
                column_name: String::new(),
                min_value: None,
                max_value: None,
                status: FilterStatus::Empty,
            }),
            LeafKind::TimeRange => Leaf::RelativeTimeRangeFilter(RelativeTimeRangeFilter {
                id,
                when: When::Before,
                min_days: None,
                max_days: None,
                anchor_phenotype_id: None,
                status: FilterStatus::Empty,
            }),
            LeafKind::Phenotype => Leaf::PhenotypeReference(PhenotypeReference {
                id,
                phenotype_id: String::new(),
                phenotype_name: String::new(),
                status: FilterStatus::Empty,
            }),
        }
    }

    /// Categorical leaf over `column` with the given allowed values, status derived
    pub fn categorical(column: &str, values: &[&str]) -> Self {
        Leaf::CategoricalFilter(CategoricalFilter {
            id: LeafId::new(),
            column_name: column.to_string(),
            allowed_values: values.iter().map(|v| v.to_string()).collect(),
            domain: None,
            operator: CategoricalOperator::Isin,
            status: FilterStatus::Empty,
        })
        .with_derived_status()
    }

    /// Leaf referencing another phenotype of the cohort
    pub fn phenotype(phenotype_id: &str, phenotype_name: &str) -> Self {
        Leaf::PhenotypeReference(PhenotypeReference {
            id: LeafId::new(),
            phenotype_id: phenotype_id.to_string(),
            phenotype_name: phenotype_name.to_string(),
            status: FilterStatus::Empty,
        })
        .with_derived_status()
    }

    pub fn kind(&self) -> LeafKind {
        match self {
            Leaf::CategoricalFilter(_) => LeafKind::Categorical,
            Leaf::ValueFilter(_) => LeafKind::Value,
            Leaf::RelativeTimeRangeFilter(_) => LeafKind::TimeRange,
            Leaf::PhenotypeReference(_) => LeafKind::Phenotype,
        }
    }

    pub fn id(&self) -> &LeafId {
        match self {
            Leaf::CategoricalFilter(f) => &f.id,
            Leaf::ValueFilter(f) => &f.id,
            Leaf::RelativeTimeRangeFilter(f) => &f.id,
            Leaf::PhenotypeReference(f) => &f.id,
        }
    }

    pub fn with_id(mut self, id: LeafId) -> Self {
        match &mut self {
            Leaf::CategoricalFilter(f) => f.id = id,
            Leaf::ValueFilter(f) => f.id = id,
            Leaf::RelativeTimeRangeFilter(f) => f.id = id,
            Leaf::PhenotypeReference(f) => f.id = id,
        }
        self
    }

    pub fn status(&self) -> FilterStatus {
        match self {
            Leaf::CategoricalFilter(f) => f.status,
            Leaf::ValueFilter(f) => f.status,
            Leaf::RelativeTimeRangeFilter(f) => f.status,
            Leaf::PhenotypeReference(f) => f.status,
        }
    }

    /// Compute the status implied by the leaf's fields
    pub fn derive_status(&self) -> FilterStatus {
        let (set, required) = match self {
            Leaf::CategoricalFilter(f) => {
                let set = [!f.column_name.trim().is_empty(), !f.allowed_values.is_empty()];
                (set.iter().filter(|s| **s).count(), set.len())
            }
            Leaf::ValueFilter(f) => {
                let has_bound = f.min_value.is_some() || f.max_value.is_some();
                let set = [!f.column_name.trim().is_empty(), has_bound];
                (set.iter().filter(|s| **s).count(), set.len())
            }
            Leaf::RelativeTimeRangeFilter(f) => {
                // `when` always has a value, so only the day bounds decide completeness.
                let has_days = f.min_days.is_some() || f.max_days.is_some();
                if has_days {
                    (1, 1)
                } else if f.anchor_phenotype_id.is_some() {
                    (1, 2)
                } else {
                    (0, 1)
                }
            }
            Leaf::PhenotypeReference(f) => (usize::from(!f.phenotype_id.trim().is_empty()), 1),
        };
        match set {
            0 => FilterStatus::Empty,
            n if n >= required => FilterStatus::Complete,
            _ => FilterStatus::Incomplete,
        }
    }

    /// Same leaf with `status` recomputed from its fields
    pub fn with_derived_status(mut self) -> Self {
        let status = self.derive_status();
        match &mut self {
            Leaf::CategoricalFilter(f) => f.status = status,
            Leaf::ValueFilter(f) => f.status = status,
            Leaf::RelativeTimeRangeFilter(f) => f.status = status,
            Leaf::PhenotypeReference(f) => f.status = status,
        }
        self
    }

    /// One-line label used by cell renderers
    pub fn summary(&self) -> String {
        match self {
            Leaf::CategoricalFilter(f) => {
                let column = placeholder(&f.column_name, "<column>");
                let values = if f.allowed_values.is_empty() {
                    "<values>".to_string()
                } else if f.allowed_values.len() > 3 {
                    format!(
                        "{}, {}... ({} total)",
                        f.allowed_values[0],
                        f.allowed_values[1],
                        f.allowed_values.len()
                    )
                } else {
                    f.allowed_values.join(", ")
                };
                match &f.domain {
                    Some(domain) => format!("{domain}.{column} {} [{values}]", f.operator),
                    None => format!("{column} {} [{values}]", f.operator),
                }
            }
            Leaf::ValueFilter(f) => {
                let column = placeholder(&f.column_name, "<column>");
                match (&f.min_value, &f.max_value) {
                    (None, None) => format!("{column} <range>"),
                    (Some(min), None) => format!("{column} {} {}", min.operator, min.value),
                    (None, Some(max)) => format!("{column} {} {}", max.operator, max.value),
                    (Some(min), Some(max)) => format!(
                        "{column} {} {} and {} {}",
                        min.operator, min.value, max.operator, max.value
                    ),
                }
            }
            Leaf::RelativeTimeRangeFilter(f) => {
                let anchor = f.anchor_phenotype_id.as_deref().unwrap_or("index");
                let days = match (&f.min_days, &f.max_days) {
                    (None, None) => "<days>".to_string(),
                    (Some(min), None) => format!("{} {}d", min.operator, min.value),
                    (None, Some(max)) => format!("{} {}d", max.operator, max.value),
                    (Some(min), Some(max)) => format!("{}..{}d", min.value, max.value),
                };
                format!("{} {anchor} {days}", f.when)
            }
            Leaf::PhenotypeReference(f) => {
                if !f.phenotype_name.is_empty() {
                    format!("@{}", f.phenotype_name)
                } else {
                    format!("@{}", placeholder(&f.phenotype_id, "<phenotype>"))
                }
            }
        }
    }
}

fn placeholder<'a>(value: &'a str, empty: &'a str) -> &'a str {
    if value.trim().is_empty() { empty } else { value }
}

/// A node of a filter tree: a leaf or a binary AND/OR of two subtrees
#[derive(Debug, Clone, PartialEq)]
pub enum FilterNode {
    Leaf(Leaf),
    And(Box<FilterNode>, Box<FilterNode>),
    Or(Box<FilterNode>, Box<FilterNode>),
}

impl FilterNode {
    pub fn binary(op: LogicalOp, left: FilterNode, right: FilterNode) -> Self {
        match op {
            LogicalOp::And => FilterNode::And(Box::new(left), Box::new(right)),
            LogicalOp::Or => FilterNode::Or(Box::new(left), Box::new(right)),
        }
    }

    pub fn and(left: FilterNode, right: FilterNode) -> Self {
        Self::binary(LogicalOp::And, left, right)
    }

    pub fn or(left: FilterNode, right: FilterNode) -> Self {
        Self::binary(LogicalOp::Or, left, right)
    }

    pub fn as_leaf(&self) -> Option<&Leaf> {
        match self {
            FilterNode::Leaf(leaf) => Some(leaf),
            _ => None,
        }
    }

    /// Operator and children of a binary node
    pub fn as_binary(&self) -> Option<(LogicalOp, &FilterNode, &FilterNode)> {
        match self {
            FilterNode::And(left, right) => Some((LogicalOp::And, left, right)),
            FilterNode::Or(left, right) => Some((LogicalOp::Or, left, right)),
            FilterNode::Leaf(_) => None,
        }
    }

    pub fn operator(&self) -> Option<LogicalOp> {
        self.as_binary().map(|(op, _, _)| op)
    }

    pub fn leaf_count(&self) -> usize {
        match self.as_binary() {
            Some((_, left, right)) => left.leaf_count() + right.leaf_count(),
            None => 1,
        }
    }

    /// Leaves in left-to-right order
    pub fn leaves(&self) -> Vec<&Leaf> {
        let mut out = Vec::new();
        collect_leaves(self, &mut out);
        out
    }
}

fn collect_leaves<'a>(node: &'a FilterNode, out: &mut Vec<&'a Leaf>) {
    match node {
        FilterNode::Leaf(leaf) => out.push(leaf),
        FilterNode::And(left, right) | FilterNode::Or(left, right) => {
            collect_leaves(left, out);
            collect_leaves(right, out);
        }
    }
}

impl From<Leaf> for FilterNode {
    fn from(leaf: Leaf) -> Self {
        FilterNode::Leaf(leaf)
    }
}

/// Wire shape of a node, tagged by `class_name`
#[derive(Deserialize)]
#[serde(tag = "class_name")]
enum NodeRepr {
    AndFilter {
        filter1: Box<FilterNode>,
        filter2: Box<FilterNode>,
    },
    OrFilter {
        filter1: Box<FilterNode>,
        filter2: Box<FilterNode>,
    },
    CategoricalFilter(CategoricalFilter),
    ValueFilter(ValueFilter),
    RelativeTimeRangeFilter(RelativeTimeRangeFilter),
    PhenotypeReference(PhenotypeReference),
}

#[derive(Serialize)]
#[serde(tag = "class_name")]
enum NodeReprRef<'a> {
    AndFilter {
        filter1: &'a FilterNode,
        filter2: &'a FilterNode,
    },
    OrFilter {
        filter1: &'a FilterNode,
        filter2: &'a FilterNode,
    },
    CategoricalFilter(&'a CategoricalFilter),
    ValueFilter(&'a ValueFilter),
    RelativeTimeRangeFilter(&'a RelativeTimeRangeFilter),
    PhenotypeReference(&'a PhenotypeReference),
}

impl From<NodeRepr> for FilterNode {
    fn from(repr: NodeRepr) -> Self {
        match repr {
            NodeRepr::AndFilter { filter1, filter2 } => FilterNode::And(filter1, filter2),
            NodeRepr::OrFilter { filter1, filter2 } => FilterNode::Or(filter1, filter2),
            NodeRepr::CategoricalFilter(f) => FilterNode::Leaf(Leaf::CategoricalFilter(f)),
            NodeRepr::ValueFilter(f) => FilterNode::Leaf(Leaf::ValueFilter(f)),
            NodeRepr::RelativeTimeRangeFilter(f) => {
                FilterNode::Leaf(Leaf::RelativeTimeRangeFilter(f))
            }
            NodeRepr::PhenotypeReference(f) => FilterNode::Leaf(Leaf::PhenotypeReference(f)),
        }
    }
}

impl<'a> From<&'a FilterNode> for NodeReprRef<'a> {
    fn from(node: &'a FilterNode) -> Self {
        match node {
            FilterNode::And(filter1, filter2) => NodeReprRef::AndFilter { filter1, filter2 },
            FilterNode::Or(filter1, filter2) => NodeReprRef::OrFilter { filter1, filter2 },
            FilterNode::Leaf(Leaf::CategoricalFilter(f)) => NodeReprRef::CategoricalFilter(f),
            FilterNode::Leaf(Leaf::ValueFilter(f)) => NodeReprRef::ValueFilter(f),
            FilterNode::Leaf(Leaf::RelativeTimeRangeFilter(f)) => {
                NodeReprRef::RelativeTimeRangeFilter(f)
            }
            FilterNode::Leaf(Leaf::PhenotypeReference(f)) => NodeReprRef::PhenotypeReference(f),
        }
    }
}

impl Serialize for FilterNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        NodeReprRef::from(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FilterNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        NodeRepr::deserialize(deserializer).map(FilterNode::from)
    }
}

/// An immutable filter tree value; empty when there is no root
///
/// Every edit returns a new tree so that callers can compare the value they
/// opened with against the value they are about to commit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterTree {
    root: Option<FilterNode>,
}

impl FilterTree {
    pub fn empty() -> Self {
        Self { root: None }
    }

    pub fn from_root(root: FilterNode) -> Self {
        Self { root: Some(root) }
    }

    pub fn root(&self) -> Option<&FilterNode> {
        self.root.as_ref()
    }

    pub fn into_root(self) -> Option<FilterNode> {
        self.root
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Strictly decode a cell value
    pub fn parse(value: &Value) -> Result<Self, FilterTreeError> {
        if value.is_null() {
            return Ok(Self::empty());
        }
        let root = FilterNode::deserialize(value)?;
        Ok(Self::from_root(root))
    }

    /// Decode a cell value, treating anything malformed as the empty filter
    pub fn from_json(value: Option<&Value>) -> Self {
        let Some(value) = value else {
            return Self::empty();
        };
        match Self::parse(value) {
            Ok(tree) => tree,
            Err(e) => {
                warn!("Ignoring malformed filter value: {e}");
                Self::empty()
            }
        }
    }

    /// Like [`FilterTree::from_json`] without logging, for per-frame rendering
    pub fn decode(value: &Value) -> Self {
        Self::parse(value).unwrap_or_default()
    }

    /// JSON shape handed back to the hosting grid (`null` when empty)
    pub fn to_json(&self) -> Value {
        match &self.root {
            Some(root) => serde_json::to_value(root).unwrap_or(Value::Null),
            None => Value::Null,
        }
    }

    pub fn flatten(&self) -> Vec<FlattenedItem<'_>> {
        flatten(self.root.as_ref())
    }

    pub fn node_at(&self, path: &NodePath) -> Option<&FilterNode> {
        self.root.as_ref().and_then(|root| ops::node_at(root, path))
    }

    pub fn add_leaf(&self, op: LogicalOp, leaf: Leaf) -> Self {
        Self::from_root(ops::add_leaf(self.root.as_ref(), op, leaf))
    }

    pub fn replace_leaf(&self, path: &NodePath, leaf: Leaf) -> Self {
        match &self.root {
            Some(root) => Self::from_root(ops::replace_leaf(root, path, leaf)),
            None => Self::empty(),
        }
    }

    pub fn toggle_operator(&self, path: &NodePath) -> Self {
        match &self.root {
            Some(root) => Self::from_root(ops::toggle_operator(root, path)),
            None => Self::empty(),
        }
    }

    pub fn delete_leaf(&self, path: &NodePath) -> Self {
        Self {
            root: self.root.as_ref().and_then(|root| ops::delete_leaf(root, path)),
        }
    }

    pub fn leaf_count(&self) -> usize {
        self.root.as_ref().map_or(0, FilterNode::leaf_count)
    }

    /// Whole tree as text, e.g. `age in [18] AND (sex in [F] OR @Diabetes)`
    pub fn summary(&self) -> String {
        self.flatten()
            .iter()
            .map(|item| item.label())
            .collect::<Vec<_>>()
            .join(" ")
            .replace("( ", "(")
            .replace(" )", ")")
    }
}

impl From<FilterNode> for FilterTree {
    fn from(root: FilterNode) -> Self {
        Self::from_root(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn decodes_class_name_tagged_tree() {
        let value = json!({
            "class_name": "AndFilter",
            "filter1": {
                "class_name": "CategoricalFilter",
                "id": "a",
                "column_name": "age_group",
                "allowed_values": ["18-65"],
                "operator": "isin",
                "status": "complete"
            },
            "filter2": {
                "class_name": "PhenotypeReference",
                "id": "b",
                "phenotype_id": "p1",
                "phenotype_name": "Diabetes",
                "status": "complete"
            }
        });

        let tree = FilterTree::parse(&value).unwrap();
        let root = tree.root().unwrap();
        assert_eq!(root.operator(), Some(LogicalOp::And));
        assert_eq!(root.leaf_count(), 2);
        assert_eq!(tree.summary(), "age_group in [18-65] AND @Diabetes");
        assert_eq!(tree.to_json(), value);
    }

    #[test]
    fn malformed_values_degrade_to_empty() {
        let unknown = json!({"class_name": "XorFilter", "filter1": null});
        assert!(FilterTree::from_json(Some(&unknown)).is_empty());

        let missing_column = json!({"class_name": "CategoricalFilter", "allowed_values": []});
        assert!(FilterTree::from_json(Some(&missing_column)).is_empty());

        let bad_child = json!({
            "class_name": "OrFilter",
            "filter1": {"class_name": "PhenotypeReference", "phenotype_id": "p1"},
            "filter2": 42
        });
        assert!(FilterTree::from_json(Some(&bad_child)).is_empty());

        assert!(FilterTree::from_json(Some(&Value::Null)).is_empty());
        assert!(FilterTree::from_json(None).is_empty());
        assert_eq!(FilterTree::empty().to_json(), Value::Null);
    }

    #[test]
    fn derives_status_from_fields() {
        let empty = Leaf::new(LeafKind::Categorical);
        assert_eq!(empty.derive_status(), FilterStatus::Empty);

        let partial = Leaf::categorical("sex", &[]);
        assert_eq!(partial.status(), FilterStatus::Incomplete);

        let complete = Leaf::categorical("sex", &["F"]);
        assert_eq!(complete.status(), FilterStatus::Complete);

        let mut time = Leaf::new(LeafKind::TimeRange);
        assert_eq!(time.derive_status(), FilterStatus::Empty);
        if let Leaf::RelativeTimeRangeFilter(f) = &mut time {
            f.anchor_phenotype_id = Some("entry".to_string());
        }
        assert_eq!(time.derive_status(), FilterStatus::Incomplete);
        if let Leaf::RelativeTimeRangeFilter(f) = &mut time {
            f.max_days = Some(Bound::new(ComparisonOp::Lte, 365.0));
        }
        assert_eq!(time.derive_status(), FilterStatus::Complete);
    }

    #[test]
    fn summaries_describe_each_leaf_kind() {
        let value = Leaf::ValueFilter(ValueFilter {
            id: LeafId::new(),
            column_name: "age".to_string(),
            min_value: Some(Bound::new(ComparisonOp::Gte, 18.0)),
            max_value: None,
            status: FilterStatus::Complete,
        });
        assert_eq!(value.summary(), "age >= 18");

        let many = Leaf::categorical("code", &["a", "b", "c", "d"]);
        assert_eq!(many.summary(), "code in [a, b... (4 total)]");

        assert_eq!(Leaf::new(LeafKind::Phenotype).summary(), "@<phenotype>");
        assert_eq!(Leaf::phenotype("p9", "").summary(), "@p9");
    }

    #[test]
    fn with_id_keeps_identity_across_kinds() {
        let original = Leaf::categorical("sex", &["F"]);
        let replacement = Leaf::new(LeafKind::Value).with_id(original.id().clone());
        assert_eq!(replacement.id(), original.id());
        assert_eq!(replacement.kind(), LeafKind::Value);
    }
}
