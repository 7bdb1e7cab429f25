pub mod cohort_store;

pub use cohort_store::{CohortStore, StoreEvent};
