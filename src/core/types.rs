use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use strum::{Display, EnumIter, EnumString};
use uuid::Uuid;

/// Stable identifier for a leaf filter
///
/// Leaves created in the editor get a fresh UUID. Values loaded from a cohort
/// file keep whatever identifier they were saved with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeafId(String);

impl LeafId {
    /// Create a new unique leaf ID
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for LeafId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LeafId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LeafId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err("Leaf id cannot be empty".to_string());
        }
        Ok(Self(s.to_string()))
    }
}

/// Completion state of a leaf filter
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FilterStatus {
    #[default]
    Empty,
    Incomplete,
    Complete,
}

/// Binary operator joining two filter subtrees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicalOp {
    #[strum(serialize = "AND")]
    And,
    #[strum(serialize = "OR")]
    Or,
}

impl LogicalOp {
    pub fn toggled(self) -> Self {
        match self {
            LogicalOp::And => LogicalOp::Or,
            LogicalOp::Or => LogicalOp::And,
        }
    }
}
