//! Composer panel state: a field-by-field form over one draft leaf.
use strum::IntoEnumIterator;

use crate::core::filter::{
    Bound, CategoricalFilter, CategoricalOperator, ComparisonOp, PhenotypeReference,
    RelativeTimeRangeFilter, ValueFilter, When,
};
use crate::core::{Leaf, LeafKind};

/// How a composer field is edited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    /// Decimal number; blank means unset
    Number,
    /// Cycled with Left/Right through fixed options
    Choice(&'static [&'static str]),
    /// Text, also cycled through the cohort's phenotype ids
    PhenotypeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub label: &'static str,
    pub kind: FieldKind,
}

const CATEGORICAL_OPS: &[&str] = &["in", "not in"];
const LOWER_OPS: &[&str] = &[">=", ">"];
const UPPER_OPS: &[&str] = &["<=", "<"];
const WHEN: &[&str] = &["before", "after"];

const CATEGORICAL_FIELDS: &[FieldSpec] = &[
    FieldSpec { label: "Column", kind: FieldKind::Text },
    FieldSpec { label: "Operator", kind: FieldKind::Choice(CATEGORICAL_OPS) },
    FieldSpec { label: "Values", kind: FieldKind::Text },
    FieldSpec { label: "Domain", kind: FieldKind::Text },
];

const VALUE_FIELDS: &[FieldSpec] = &[
    FieldSpec { label: "Column", kind: FieldKind::Text },
    FieldSpec { label: "Min op", kind: FieldKind::Choice(LOWER_OPS) },
    FieldSpec { label: "Min", kind: FieldKind::Number },
    FieldSpec { label: "Max op", kind: FieldKind::Choice(UPPER_OPS) },
    FieldSpec { label: "Max", kind: FieldKind::Number },
];

const TIME_RANGE_FIELDS: &[FieldSpec] = &[
    FieldSpec { label: "When", kind: FieldKind::Choice(WHEN) },
    FieldSpec { label: "Min op", kind: FieldKind::Choice(LOWER_OPS) },
    FieldSpec { label: "Min days", kind: FieldKind::Number },
    FieldSpec { label: "Max op", kind: FieldKind::Choice(UPPER_OPS) },
    FieldSpec { label: "Max days", kind: FieldKind::Number },
    FieldSpec { label: "Anchor", kind: FieldKind::PhenotypeId },
];

const PHENOTYPE_FIELDS: &[FieldSpec] = &[FieldSpec {
    label: "Phenotype",
    kind: FieldKind::PhenotypeId,
}];

pub fn fields_for(kind: LeafKind) -> &'static [FieldSpec] {
    match kind {
        LeafKind::Categorical => CATEGORICAL_FIELDS,
        LeafKind::Value => VALUE_FIELDS,
        LeafKind::TimeRange => TIME_RANGE_FIELDS,
        LeafKind::Phenotype => PHENOTYPE_FIELDS,
    }
}

/// Form state for editing one leaf
#[derive(Debug, Clone)]
pub struct Composer {
    base: Leaf,
    kind: LeafKind,
    values: Vec<String>,
    active: usize,
    /// (id, name) of phenotypes that can be referenced
    phenotypes: Vec<(String, String)>,
}

impl Composer {
    pub fn new(leaf: &Leaf, phenotypes: Vec<(String, String)>) -> Self {
        Self {
            base: leaf.clone(),
            kind: leaf.kind(),
            values: field_values(leaf),
            active: 0,
            phenotypes,
        }
    }

    pub fn kind(&self) -> LeafKind {
        self.kind
    }

    pub fn fields(&self) -> &'static [FieldSpec] {
        fields_for(self.kind)
    }

    pub fn active_field(&self) -> usize {
        self.active
    }

    pub fn value(&self, index: usize) -> &str {
        self.values.get(index).map(String::as_str).unwrap_or("")
    }

    fn active_spec(&self) -> FieldSpec {
        self.fields()[self.active]
    }

    /// Whether typed characters go into the active field
    pub fn accepts_text(&self) -> bool {
        !matches!(self.active_spec().kind, FieldKind::Choice(_))
    }

    pub fn next_field(&mut self) {
        self.active = (self.active + 1) % self.fields().len();
    }

    pub fn prev_field(&mut self) {
        let len = self.fields().len();
        self.active = (self.active + len - 1) % len;
    }

    /// Step a choice field, or the phenotype id through known phenotypes
    pub fn cycle_value(&mut self, forward: bool) {
        let options: Vec<String> = match self.active_spec().kind {
            FieldKind::Choice(options) => options.iter().map(|o| o.to_string()).collect(),
            FieldKind::PhenotypeId => self.phenotypes.iter().map(|(id, _)| id.clone()).collect(),
            FieldKind::Text | FieldKind::Number => return,
        };
        if options.is_empty() {
            return;
        }
        let current = options.iter().position(|o| *o == self.values[self.active]);
        let next = match (current, forward) {
            (None, _) => 0,
            (Some(i), true) => (i + 1) % options.len(),
            (Some(i), false) => (i + options.len() - 1) % options.len(),
        };
        self.values[self.active] = options[next].clone();
    }

    pub fn insert_char(&mut self, c: char) {
        if self.accepts_text() {
            self.values[self.active].push(c);
        }
    }

    pub fn backspace(&mut self) {
        if self.accepts_text() {
            self.values[self.active].pop();
        }
    }

    /// Switch to the next leaf kind, starting from a blank form
    pub fn cycle_kind(&mut self) {
        let kinds: Vec<LeafKind> = LeafKind::iter().collect();
        let position = kinds.iter().position(|k| *k == self.kind).unwrap_or(0);
        self.kind = kinds[(position + 1) % kinds.len()];
        self.values = field_values(&Leaf::new(self.kind));
        self.active = 0;
    }

    /// Leaf described by the form, with status derived from its fields
    pub fn build(&self) -> Result<Leaf, String> {
        let id = self.base.id().clone();
        let text = |i: usize| self.values[i].trim().to_string();
        let optional = |i: usize| Some(text(i)).filter(|s| !s.is_empty());

        let leaf = match self.kind {
            LeafKind::Categorical => Leaf::CategoricalFilter(CategoricalFilter {
                id,
                column_name: text(0),
                operator: if text(1) == "not in" {
                    CategoricalOperator::Notin
                } else {
                    CategoricalOperator::Isin
                },
                allowed_values: text(2)
                    .split(',')
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
                    .collect(),
                domain: optional(3),
                status: Default::default(),
            }),
            LeafKind::Value => Leaf::ValueFilter(ValueFilter {
                id,
                column_name: text(0),
                min_value: self.bound(1, 2, "Min")?,
                max_value: self.bound(3, 4, "Max")?,
                status: Default::default(),
            }),
            LeafKind::TimeRange => Leaf::RelativeTimeRangeFilter(RelativeTimeRangeFilter {
                id,
                when: if text(0) == "after" { When::After } else { When::Before },
                min_days: self.bound(1, 2, "Min days")?,
                max_days: self.bound(3, 4, "Max days")?,
                anchor_phenotype_id: optional(5),
                status: Default::default(),
            }),
            LeafKind::Phenotype => {
                let phenotype_id = text(0);
                let phenotype_name = self
                    .phenotypes
                    .iter()
                    .find(|(pid, _)| *pid == phenotype_id)
                    .map(|(_, name)| name.clone())
                    .unwrap_or_default();
                Leaf::PhenotypeReference(PhenotypeReference {
                    id,
                    phenotype_id,
                    phenotype_name,
                    status: Default::default(),
                })
            }
        };
        Ok(leaf.with_derived_status())
    }

    fn bound(&self, op_field: usize, value_field: usize, label: &str) -> Result<Option<Bound>, String> {
        let Some(value) = parse_number(&self.values[value_field], label)? else {
            return Ok(None);
        };
        let operator = match self.values[op_field].as_str() {
            ">" => ComparisonOp::Gt,
            ">=" => ComparisonOp::Gte,
            "<" => ComparisonOp::Lt,
            _ => ComparisonOp::Lte,
        };
        Ok(Some(Bound::new(operator, value)))
    }
}

fn parse_number(raw: &str, label: &str) -> Result<Option<f64>, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    match raw.parse::<f64>() {
        // NaN and infinities have no JSON encoding.
        Ok(value) if value.is_finite() => Ok(Some(value)),
        _ => Err(format!("{label}: '{raw}' is not a number")),
    }
}

fn number_text(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn field_values(leaf: &Leaf) -> Vec<String> {
    match leaf {
        Leaf::CategoricalFilter(f) => vec![
            f.column_name.clone(),
            f.operator.to_string(),
            f.allowed_values.join(", "),
            f.domain.clone().unwrap_or_default(),
        ],
        Leaf::ValueFilter(f) => vec![
            f.column_name.clone(),
            f.min_value.map_or(">=".to_string(), |b| b.operator.to_string()),
            number_text(f.min_value.map(|b| b.value)),
            f.max_value.map_or("<=".to_string(), |b| b.operator.to_string()),
            number_text(f.max_value.map(|b| b.value)),
        ],
        Leaf::RelativeTimeRangeFilter(f) => vec![
            f.when.to_string(),
            f.min_days.map_or(">=".to_string(), |b| b.operator.to_string()),
            number_text(f.min_days.map(|b| b.value)),
            f.max_days.map_or("<=".to_string(), |b| b.operator.to_string()),
            number_text(f.max_days.map(|b| b.value)),
            f.anchor_phenotype_id.clone().unwrap_or_default(),
        ],
        Leaf::PhenotypeReference(f) => vec![f.phenotype_id.clone()],
    }
}
