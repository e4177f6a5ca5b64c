use parking_lot::RwLock;
use std::sync::Arc;

use crate::config::Config;
use crate::error::AppError;
use crate::models::{Dataset, DatasetId};
use crate::services::analysis::MetricsCache;
use crate::services::session_store::{SessionStore, SqliteSessionStore};

/// The uploaded dataset and the value currently shown, which is either the
/// upload itself or something derived from it.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub original: Arc<Dataset>,
    pub current: Arc<Dataset>,
}

pub struct AppState {
    pub config: Config,
    pub metrics: MetricsCache,
    pub sessions: Arc<dyn SessionStore>,
    workspace: RwLock<Option<Workspace>>,
}

impl AppState {
    pub fn new(config: Config, sessions: Arc<dyn SessionStore>) -> Self {
        let metrics = MetricsCache::new(config.rollup_policy(), config.metrics_cache_capacity);
        Self {
            config,
            metrics,
            sessions,
            workspace: RwLock::new(None),
        }
    }

    /// State backed by the session store the config points at.
    pub fn from_config(config: Config) -> Result<Self, AppError> {
        let sessions: Arc<dyn SessionStore> = match &config.session_db_path {
            Some(path) => Arc::new(SqliteSessionStore::open(path, config.recent_analyses_limit)?),
            None => Arc::new(SqliteSessionStore::open_in_memory(config.recent_analyses_limit)?),
        };
        Ok(Self::new(config, sessions))
    }

    pub fn workspace(&self) -> Result<Workspace, AppError> {
        self.workspace.read().clone().ok_or(AppError::NoDataset)
    }

    pub fn current(&self) -> Result<Arc<Dataset>, AppError> {
        Ok(self.workspace()?.current)
    }

    /// Installs a fresh upload, dropping the previous one.
    pub fn replace(&self, dataset: Dataset) -> Arc<Dataset> {
        let dataset = Arc::new(dataset);
        let previous = self.workspace.write().replace(Workspace {
            original: dataset.clone(),
            current: dataset.clone(),
        });
        if let Some(previous) = previous {
            self.forget(&previous);
            tracing::info!(
                "Dataset {} replaced by {}",
                previous.original.id(),
                dataset.id()
            );
        }
        dataset
    }

    /// Makes a derived dataset the current one. The original upload is kept.
    ///
    /// `parent` is the id of the current dataset the value was derived from.
    /// Fails with `Conflict` when the workspace moved on in the meantime.
    pub fn set_current(&self, dataset: Dataset, parent: DatasetId) -> Result<Arc<Dataset>, AppError> {
        let mut guard = self.workspace.write();
        let workspace = guard.as_mut().ok_or(AppError::NoDataset)?;
        if workspace.current.id() != parent {
            tracing::warn!(
                "Discarding dataset {} derived from {}, current is {}",
                dataset.id(),
                parent,
                workspace.current.id()
            );
            return Err(AppError::Conflict("dataset changed during transform".to_string()));
        }
        let dataset = Arc::new(dataset);
        let previous = std::mem::replace(&mut workspace.current, dataset.clone());
        if previous.id() != workspace.original.id() && previous.id() != dataset.id() {
            self.metrics.invalidate(previous.id());
        }
        Ok(dataset)
    }

    /// Goes back to the original upload.
    pub fn reset(&self) -> Result<Arc<Dataset>, AppError> {
        let mut guard = self.workspace.write();
        let workspace = guard.as_mut().ok_or(AppError::NoDataset)?;
        if workspace.current.id() != workspace.original.id() {
            self.metrics.invalidate(workspace.current.id());
        }
        workspace.current = workspace.original.clone();
        Ok(workspace.current.clone())
    }

    fn forget(&self, workspace: &Workspace) {
        self.metrics.invalidate(workspace.original.id());
        self.metrics.invalidate(workspace.current.id());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::csv::parse_csv;
    use crate::services::transforms::{apply_all, Transform};

    fn state() -> AppState {
        AppState::from_config(Config::default()).unwrap()
    }

    #[test]
    fn no_dataset_until_upload() {
        let state = state();
        assert!(matches!(state.current(), Err(AppError::NoDataset)));
        assert!(matches!(state.reset(), Err(AppError::NoDataset)));
    }

    #[test]
    fn derived_value_keeps_original_and_reset_restores_it() {
        let state = state();
        let original = state.replace(parse_csv("a\n1\n\n", "x"));
        let derived = original.derive(original.columns().to_vec(), Vec::new());
        let derived_id = derived.id();

        state.set_current(derived, original.id()).unwrap();
        let ws = state.workspace().unwrap();
        assert_eq!(ws.original.id(), original.id());
        assert_eq!(ws.current.id(), derived_id);

        assert_eq!(state.reset().unwrap().id(), original.id());
    }

    #[test]
    fn stale_derivation_is_rejected_after_new_upload() {
        let state = state();
        state.replace(parse_csv("a\n1\n\n", "first"));
        let stale_parent = state.current().unwrap();
        let second = state.replace(parse_csv("b,c\n2,3\n", "second"));

        let derived = apply_all(&stale_parent, &[Transform::DropIncompleteRows]).unwrap();
        let err = state.set_current(derived, stale_parent.id()).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let ws = state.workspace().unwrap();
        assert_eq!(ws.original.id(), second.id());
        assert_eq!(ws.current.id(), second.id());
        assert_eq!(ws.current.columns(), ["b", "c"]);
    }

    #[test]
    fn derivation_from_a_replaced_current_is_rejected() {
        let state = state();
        let original = state.replace(parse_csv("a\n1\n", "x"));
        let first = original.derive(original.columns().to_vec(), Vec::new());
        let first_id = first.id();
        state.set_current(first, original.id()).unwrap();

        let late = original.derive(original.columns().to_vec(), Vec::new());
        assert!(matches!(state.set_current(late, original.id()), Err(AppError::Conflict(_))));
        assert_eq!(state.current().unwrap().id(), first_id);
    }

    #[test]
    fn replacing_drops_cached_metrics() {
        let state = state();
        let first = state.replace(parse_csv("a\n1\n", "first"));
        state.metrics.get_or_compute(&first);
        assert!(state.metrics.contains(first.id()));

        state.replace(parse_csv("b\n2\n", "second"));
        assert!(!state.metrics.contains(first.id()));
    }
}
