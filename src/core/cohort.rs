use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use strum::{Display, EnumIter};
use tracing::warn;

use crate::core::error::CohortError;
use crate::core::filter::FilterTree;

/// Section of the cohort definition a phenotype belongs to
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumIter, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CohortSection {
    Entry,
    #[default]
    Inclusion,
    Exclusion,
    Baseline,
    Outcome,
}

/// One row of the cohort grid
///
/// The filter cell is kept as raw JSON so that a malformed value survives a
/// load/save cycle untouched until someone edits it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phenotype {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub class_name: String,
    #[serde(default, rename = "type")]
    pub section: CohortSection,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub categorical_filter: Value,
}

impl Phenotype {
    /// Leniently decoded filter cell
    ///
    /// Malformed cells are reported once by [`Cohort::normalize_filters`];
    /// this is called on every render and stays quiet.
    pub fn filter_tree(&self) -> FilterTree {
        FilterTree::decode(&self.categorical_filter)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cohort {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub phenotypes: Vec<Phenotype>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
}

impl Cohort {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            phenotypes: Vec::new(),
            last_modified: None,
        }
    }

    pub fn load(path: &Path) -> Result<Self, CohortError> {
        let text = std::fs::read_to_string(path).map_err(|source| CohortError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut cohort: Cohort = serde_json::from_str(&text)?;
        cohort.normalize_filters();
        Ok(cohort)
    }

    /// Re-encode every well-formed filter cell in canonical form
    ///
    /// Leaves without an id get one here, so ids stay fixed for the session
    /// and an untouched cell compares equal to what an editor commits.
    /// Malformed cells are kept verbatim and warned about.
    pub fn normalize_filters(&mut self) {
        for phenotype in &mut self.phenotypes {
            match FilterTree::parse(&phenotype.categorical_filter) {
                Ok(tree) => phenotype.categorical_filter = tree.to_json(),
                Err(e) => warn!("Malformed filter on phenotype {}: {e}", phenotype.id),
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), CohortError> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text).map_err(|source| CohortError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn phenotype(&self, id: &str) -> Option<&Phenotype> {
        self.phenotypes.iter().find(|p| p.id == id)
    }

    pub fn phenotype_mut(&mut self, id: &str) -> Option<&mut Phenotype> {
        self.phenotypes.iter_mut().find(|p| p.id == id)
    }

    /// Phenotypes in section order, keeping file order within a section
    pub fn rows(&self) -> Vec<&Phenotype> {
        let mut rows: Vec<&Phenotype> = self.phenotypes.iter().collect();
        rows.sort_by_key(|p| p.section as u8);
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::filter::Leaf;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    fn sample() -> Cohort {
        let mut cohort = Cohort::new("c1", "Adults with diabetes");
        cohort.phenotypes.push(Phenotype {
            id: "p2".to_string(),
            name: "Age".to_string(),
            class_name: "AgePhenotype".to_string(),
            section: CohortSection::Inclusion,
            categorical_filter: Value::Null,
        });
        cohort.phenotypes.push(Phenotype {
            id: "p1".to_string(),
            name: "Diabetes".to_string(),
            class_name: "CodelistPhenotype".to_string(),
            section: CohortSection::Entry,
            categorical_filter: FilterTree::from_root(Leaf::categorical("code", &["E11"]).into())
                .to_json(),
        });
        cohort
    }

    #[test]
    fn rows_are_grouped_by_section() {
        let cohort = sample();
        let ids: Vec<&str> = cohort.rows().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p2"]);
    }

    #[test]
    fn save_then_load_preserves_cohort() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cohort.json");
        let cohort = sample();

        cohort.save(&path).unwrap();
        let loaded = Cohort::load(&path).unwrap();
        assert_eq!(loaded, cohort);
        assert_eq!(loaded.phenotype("p1").unwrap().filter_tree().leaf_count(), 1);
    }

    #[test]
    fn malformed_filter_cells_load_as_raw_json() {
        let cohort: Cohort = serde_json::from_value(json!({
            "id": "c1",
            "phenotypes": [
                {"id": "p1", "type": "exclusion", "categorical_filter": {"class_name": "Bogus"}}
            ]
        }))
        .unwrap();

        let phenotype = cohort.phenotype("p1").unwrap();
        assert_eq!(phenotype.section, CohortSection::Exclusion);
        assert!(phenotype.filter_tree().is_empty());
        assert_eq!(phenotype.categorical_filter["class_name"], "Bogus");
    }

    #[test]
    fn loading_fixes_leaf_ids_and_number_encoding() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cohort.json");
        let raw = json!({
            "id": "c1",
            "phenotypes": [
                {
                    "id": "p1",
                    "categorical_filter": {
                        "class_name": "ValueFilter",
                        "column_name": "age",
                        "min_value": {"operator": ">=", "value": 18}
                    }
                },
                {"id": "p2", "categorical_filter": {"class_name": "Bogus"}}
            ]
        });
        std::fs::write(&path, raw.to_string()).unwrap();

        let cohort = Cohort::load(&path).unwrap();
        let p1 = cohort.phenotype("p1").unwrap();
        let first = p1.filter_tree();
        let second = p1.filter_tree();
        assert_eq!(first, second);
        assert_eq!(FilterTree::decode(&first.to_json()).to_json(), p1.categorical_filter);
        assert_eq!(cohort.phenotype("p2").unwrap().categorical_filter["class_name"], "Bogus");
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = Cohort::load(Path::new("/nonexistent/cohort.json")).unwrap_err();
        assert!(matches!(err, CohortError::Io { .. }));
    }
}
