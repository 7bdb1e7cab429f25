use chrono::Utc;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{debug, error, info};

use crate::core::{Cohort, CohortError, Phenotype};

/// Change notifications published by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    Loaded,
    FilterChanged { phenotype_id: String },
    Saved { path: PathBuf },
}

#[derive(Debug)]
struct StoreState {
    cohort: Cohort,
    path: Option<PathBuf>,
    dirty: bool,
}

/// CohortStore holds the cohort being edited
///
/// This store is responsible for:
/// - Loading and saving the cohort file
/// - Accepting committed filter values from the editor
/// - Notifying subscribers about changes
///
/// Clones share the same cohort.
#[derive(Debug, Clone)]
pub struct CohortStore {
    state: Arc<Mutex<StoreState>>,
    subscribers: Arc<Mutex<Vec<UnboundedSender<StoreEvent>>>>,
}

impl CohortStore {
    /// Create a store holding an in-memory cohort with no backing file
    pub fn new(cohort: Cohort) -> Self {
        Self {
            state: Arc::new(Mutex::new(StoreState {
                cohort,
                path: None,
                dirty: false,
            })),
            subscribers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Open a cohort file
    pub fn open(path: &Path) -> Result<Self, CohortError> {
        let store = Self::new(Cohort::new("", ""));
        store.load(path)?;
        Ok(store)
    }

    /// Replace the held cohort with the contents of `path`
    pub fn load(&self, path: &Path) -> Result<(), CohortError> {
        let cohort = Cohort::load(path)?;
        info!(
            "Loaded cohort '{}' with {} phenotypes from {}",
            cohort.name,
            cohort.phenotypes.len(),
            path.display()
        );
        {
            let mut state = self.lock()?;
            state.cohort = cohort;
            state.path = Some(path.to_path_buf());
            state.dirty = false;
        }
        self.notify(StoreEvent::Loaded);
        Ok(())
    }

    /// Write the cohort back to the file it was loaded from
    pub fn save(&self) -> Result<PathBuf, CohortError> {
        let path = self.lock()?.path.clone().ok_or(CohortError::NoPath)?;
        self.save_as(&path)?;
        Ok(path)
    }

    /// Write the cohort to `path` and remember it for later saves
    pub fn save_as(&self, path: &Path) -> Result<(), CohortError> {
        {
            let mut state = self.lock()?;
            if let Err(e) = state.cohort.save(path) {
                error!("Failed to save cohort to {}: {e}", path.display());
                return Err(e);
            }
            state.path = Some(path.to_path_buf());
            state.dirty = false;
        }
        info!("Saved cohort to {}", path.display());
        self.notify(StoreEvent::Saved {
            path: path.to_path_buf(),
        });
        Ok(())
    }

    /// Snapshot of the current cohort
    pub fn cohort(&self) -> Result<Cohort, CohortError> {
        Ok(self.lock()?.cohort.clone())
    }

    pub fn phenotype(&self, id: &str) -> Result<Phenotype, CohortError> {
        self.lock()?
            .cohort
            .phenotype(id)
            .cloned()
            .ok_or_else(|| CohortError::UnknownPhenotype(id.to_string()))
    }

    pub fn path(&self) -> Result<Option<PathBuf>, CohortError> {
        Ok(self.lock()?.path.clone())
    }

    /// Set the file later saves go to, without writing anything yet
    pub fn set_path(&self, path: impl Into<PathBuf>) -> Result<(), CohortError> {
        let path = path.into();
        debug!("Cohort save path set to {}", path.display());
        self.lock()?.path = Some(path);
        Ok(())
    }

    pub fn is_dirty(&self) -> Result<bool, CohortError> {
        Ok(self.lock()?.dirty)
    }

    /// Store a committed filter cell value
    pub fn set_filter(&self, phenotype_id: &str, value: Value) -> Result<(), CohortError> {
        {
            let mut state = self.lock()?;
            let phenotype = state
                .cohort
                .phenotype_mut(phenotype_id)
                .ok_or_else(|| CohortError::UnknownPhenotype(phenotype_id.to_string()))?;
            if phenotype.categorical_filter == value {
                debug!("Filter of {phenotype_id} unchanged");
                return Ok(());
            }
            phenotype.categorical_filter = value;
            state.cohort.last_modified = Some(Utc::now());
            state.dirty = true;
        }
        debug!("Filter of {phenotype_id} changed");
        self.notify(StoreEvent::FilterChanged {
            phenotype_id: phenotype_id.to_string(),
        });
        Ok(())
    }

    /// Receive every event published after this call
    pub fn subscribe(&self) -> Result<UnboundedReceiver<StoreEvent>, CohortError> {
        let (tx, rx) = unbounded_channel();
        self.subscribers
            .lock()
            .map_err(|_| CohortError::Poisoned)?
            .push(tx);
        Ok(rx)
    }

    fn notify(&self, event: StoreEvent) {
        let Ok(mut subscribers) = self.subscribers.lock() else {
            error!("Subscriber list lock poisoned; dropping {event:?}");
            return;
        };
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, CohortError> {
        self.state.lock().map_err(|_| CohortError::Poisoned)
    }
}
