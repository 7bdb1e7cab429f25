#![allow(clippy::collapsible_if)]
#![allow(clippy::collapsible_match)]
#![allow(clippy::collapsible_else_if)]

pub mod config;
pub mod core;
pub mod editor;
pub mod logging;
pub mod services;
pub mod tui;

// Re-export commonly used types
pub use core::{Cohort, FilterNode, FilterTree, FlattenedItem, Leaf, LogicalOp, NodePath};
pub use editor::{FilterEditSession, place_panels};
pub use services::CohortStore;
pub use tui::{Action, ActionCategory};
