use std::path::PathBuf;

use cohortui::core::{Cohort, CohortSection, Leaf, LogicalOp};
use cohortui::editor::FilterEditSession;
use cohortui::services::{CohortStore, StoreEvent};
use pretty_assertions::assert_eq;
use serde_json::Value;
use tempfile::TempDir;

fn sample_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("sample-data")
        .join("cohort.json")
}

#[test]
fn sample_cohort_loads() {
    let cohort = Cohort::load(&sample_path()).expect("sample cohort should load");
    assert_eq!(cohort.phenotypes.len(), 4);

    let sections: Vec<CohortSection> = cohort.rows().iter().map(|p| p.section).collect();
    assert_eq!(
        sections,
        vec![
            CohortSection::Entry,
            CohortSection::Inclusion,
            CohortSection::Inclusion,
            CohortSection::Exclusion
        ]
    );

    let adults = cohort.phenotype("adults").unwrap().filter_tree();
    assert_eq!(adults.summary(), "age >= 18 AND (sex in [F] OR @CKD)");
    assert!(cohort.phenotype("ckd").unwrap().filter_tree().is_empty());
    assert_eq!(
        cohort.phenotype("insulin").unwrap().filter_tree().summary(),
        "before entry 0..365d"
    );
}

#[test]
fn edit_commit_save_and_reload() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cohort.json");
    std::fs::copy(sample_path(), &path).unwrap();

    let store = CohortStore::open(&path).unwrap();
    let mut events = store.subscribe().unwrap();
    let phenotype = store.phenotype("adults").unwrap();

    // Open on the "sex" leaf, delete it, then add a reference to the entry.
    let mut session = FilterEditSession::open(Some(&phenotype.categorical_filter), Some(3));
    assert_eq!(session.selected_leaf().map(Leaf::summary).as_deref(), Some("sex in [F]"));
    assert!(session.delete_selected());
    session.add_filter(LogicalOp::Or, Leaf::phenotype("entry", "T2DM diagnosis"));
    assert!(session.is_dirty());
    let value = session.commit();

    store.set_filter("adults", value).unwrap();
    assert_eq!(
        events.try_recv().unwrap(),
        StoreEvent::FilterChanged {
            phenotype_id: "adults".to_string()
        }
    );
    assert_eq!(store.save().unwrap(), path);

    let reloaded = Cohort::load(&path).unwrap();
    assert_eq!(
        reloaded.phenotype("adults").unwrap().filter_tree().summary(),
        "(age >= 18 AND @CKD) OR @T2DM diagnosis"
    );
    assert!(reloaded.last_modified.is_some());
    assert_eq!(reloaded.phenotypes.len(), 4);
}

#[test]
fn deleting_the_last_leaf_clears_the_cell() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cohort.json");
    std::fs::copy(sample_path(), &path).unwrap();
    let store = CohortStore::open(&path).unwrap();

    let phenotype = store.phenotype("entry").unwrap();
    let mut session = FilterEditSession::open(Some(&phenotype.categorical_filter), None);
    assert!(session.delete_selected());
    assert!(session.selection().is_empty());
    store.set_filter("entry", session.commit()).unwrap();
    store.save().unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let json: Value = serde_json::from_str(&text).unwrap();
    assert!(json["phenotypes"][0].get("categorical_filter").is_none());
}
