pub mod cache;
pub mod classifier;
pub mod metrics;
pub mod profile;
pub mod recommend;
pub mod unique;

pub use cache::MetricsCache;
pub use classifier::{ClassificationPolicy, ColumnKind};
pub use metrics::{compute_dashboard_metrics, count_missing, DashboardMetrics};
pub use profile::{profile_columns, ColumnProfile};
pub use recommend::recommendations;
pub use unique::{unique_values, value_counts, ValueCount};
