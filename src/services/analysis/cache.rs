use moka::sync::Cache;
use std::sync::Arc;

use crate::models::{Dataset, DatasetId};
use super::classifier::ClassificationPolicy;
use super::metrics::{compute_dashboard_metrics, DashboardMetrics};

/// Dashboard metrics memoized by dataset identity. Datasets are immutable, so
/// an entry only goes away when its dataset is replaced or evicted.
#[derive(Clone)]
pub struct MetricsCache {
    policy: ClassificationPolicy,
    entries: Cache<DatasetId, Arc<DashboardMetrics>>,
}

impl MetricsCache {
    pub fn new(policy: ClassificationPolicy, capacity: u64) -> Self {
        Self {
            policy,
            entries: Cache::new(capacity),
        }
    }

    pub fn policy(&self) -> &ClassificationPolicy {
        &self.policy
    }

    pub fn get_or_compute(&self, dataset: &Dataset) -> Arc<DashboardMetrics> {
        self.entries.get_with(dataset.id(), || {
            tracing::debug!("Metrics cache miss for dataset {}", dataset.id());
            Arc::new(compute_dashboard_metrics(dataset, &self.policy))
        })
    }

    pub fn contains(&self, id: DatasetId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn invalidate(&self, id: DatasetId) {
        self.entries.invalidate(&id);
    }
}
