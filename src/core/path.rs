use serde::{Deserialize, Serialize};
use std::fmt;

/// One step from a binary node down to one of its children
///
/// Serialized as `1` for the left child and `2` for the right child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Branch {
    Left,
    Right,
}

impl TryFrom<u8> for Branch {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Branch::Left),
            2 => Ok(Branch::Right),
            other => Err(format!("Invalid branch {other}, expected 1 or 2")),
        }
    }
}

impl From<Branch> for u8 {
    fn from(branch: Branch) -> Self {
        match branch {
            Branch::Left => 1,
            Branch::Right => 2,
        }
    }
}

/// Address of a node in a filter tree, as branch choices from the root
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodePath(Vec<Branch>);

impl NodePath {
    /// The empty path, addressing the root itself
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn branches(&self) -> &[Branch] {
        &self.0
    }

    /// Path of this node's child on the given side
    pub fn child(&self, branch: Branch) -> Self {
        let mut branches = self.0.clone();
        branches.push(branch);
        Self(branches)
    }

    pub fn parent(&self) -> Option<Self> {
        let (_, head) = self.0.split_last()?;
        Some(Self(head.to_vec()))
    }
}

impl From<Vec<Branch>> for NodePath {
    fn from(branches: Vec<Branch>) -> Self {
        Self(branches)
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "root");
        }
        let parts: Vec<String> = self.0.iter().map(|b| u8::from(*b).to_string()).collect();
        write!(f, "{}", parts.join("."))
    }
}
