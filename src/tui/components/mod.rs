pub mod cohort_table;
pub mod composer;
pub mod filter_cell;
pub mod filter_editor;

pub use cohort_table::CohortTable;
pub use composer::Composer;
pub use filter_cell::{filter_line, filter_text};
pub use filter_editor::{EditorMode, EditorOutcome, FilterEditor};
