pub mod cohort;
pub mod error;
pub mod filter;
pub mod flatten;
pub mod ops;
pub mod path;
pub mod types;

pub use cohort::{Cohort, CohortSection, Phenotype};
pub use error::{CohortError, FilterTreeError};
pub use filter::{FilterNode, FilterTree, Leaf, LeafKind};
pub use flatten::{FlattenedItem, Paren, flatten, rebuild_from_flattened};
pub use path::{Branch, NodePath};
pub use types::*;
