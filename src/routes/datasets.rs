use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    config::Config,
    error::AppError,
    models::{Cell, Dataset, DatasetId, ParseDiagnostics, RowObject},
    services::{
        analysis::{
            profile_columns, recommendations, unique_values, value_counts, ColumnKind,
            ColumnProfile, DashboardMetrics, ValueCount,
        },
        csv::to_csv,
        session_store::AnalysisRecord,
        transforms::{apply_all, Transform},
        upload,
    },
    AppState,
};

const DEFAULT_ROW_LIMIT: usize = 100;
const MAX_ROW_LIMIT: usize = 1000;
// multipart framing on top of the file itself
const UPLOAD_OVERHEAD: usize = 64 * 1024;

pub fn routes(config: &Config) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/datasets",
            post(upload_dataset).layer(DefaultBodyLimit::max(config.max_file_size + UPLOAD_OVERHEAD)),
        )
        .route("/datasets/current", get(current_dataset))
        .route("/datasets/current/rows", get(dataset_rows))
        .route("/datasets/current/metrics", get(dataset_metrics))
        .route("/datasets/current/columns", get(column_profiles))
        .route("/datasets/current/columns/:name/classification", get(column_classification))
        .route("/datasets/current/columns/:name/unique", get(column_unique_values))
        .route("/datasets/current/columns/:name/counts", get(column_value_counts))
        .route("/datasets/current/transforms", post(apply_transforms))
        .route("/datasets/current/reset", post(reset_dataset))
        .route("/datasets/current/export", get(export_dataset))
}

#[derive(Debug, Serialize)]
pub struct DatasetSummary {
    id: DatasetId,
    name: String,
    columns: Vec<String>,
    row_count: usize,
    file_size: usize,
    uploaded_at: DateTime<Utc>,
    derived_from: Option<DatasetId>,
    diagnostics: ParseDiagnostics,
    metrics: DashboardMetrics,
}

impl DatasetSummary {
    fn new(dataset: &Dataset, metrics: &DashboardMetrics) -> Self {
        Self {
            id: dataset.id(),
            name: dataset.name().to_string(),
            columns: dataset.columns().to_vec(),
            row_count: dataset.row_count(),
            file_size: dataset.file_size(),
            uploaded_at: dataset.uploaded_at(),
            derived_from: dataset.derived_from(),
            diagnostics: dataset.diagnostics(),
            metrics: metrics.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    dataset: DatasetSummary,
    recommendations: Vec<String>,
    /// Whether the analysis was stored for the signed-in user.
    recorded: bool,
}

async fn upload_dataset(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let start = std::time::Instant::now();

    let mut upload_file = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let data = field.bytes().await.map_err(multipart_error)?;
        upload_file = Some((file_name, data));
        break;
    }
    let (file_name, data) =
        upload_file.ok_or_else(|| AppError::InvalidInput("No file provided".to_string()))?;

    let dataset = upload::ingest(file_name.clone(), data, state.config.max_file_size).await?;
    let dataset = state.replace(dataset);
    let metrics = state.metrics.get_or_compute(&dataset);
    let recommendations = recommendations(&metrics);

    let recorded = match state.sessions.current_user()? {
        Some(user) => {
            state.sessions.record_analysis(
                &user.id,
                AnalysisRecord {
                    file_name: file_name.clone(),
                    dataset_name: dataset.name().to_string(),
                    metrics: (*metrics).clone(),
                    recommendations: recommendations.clone(),
                    analyzed_at: Utc::now(),
                },
            )?;
            true
        }
        None => false,
    };

    tracing::info!(
        "Upload of {} processed in {:?}: {} rows, {} columns, {} missing",
        file_name,
        start.elapsed(),
        metrics.total_rows,
        metrics.total_columns,
        metrics.missing_values
    );

    Ok(Json(UploadResponse {
        dataset: DatasetSummary::new(&dataset, &metrics),
        recommendations,
        recorded,
    }))
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::UploadRejected(err.body_text())
    } else {
        AppError::Unreadable(err.body_text())
    }
}

#[derive(Debug, Serialize)]
pub struct CurrentResponse {
    original_id: DatasetId,
    dataset: DatasetSummary,
}

async fn current_dataset(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CurrentResponse>, AppError> {
    let workspace = state.workspace()?;
    let metrics = state.metrics.get_or_compute(&workspace.current);
    Ok(Json(CurrentResponse {
        original_id: workspace.original.id(),
        dataset: DatasetSummary::new(&workspace.current, &metrics),
    }))
}

#[derive(Debug, Deserialize)]
pub struct RowsQuery {
    #[serde(default)]
    offset: usize,
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct RowsResponse<'a> {
    columns: &'a [String],
    total: usize,
    offset: usize,
    rows: Vec<RowObject<'a>>,
}

async fn dataset_rows(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RowsQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let dataset = state.current()?;
    let limit = query.limit.unwrap_or(DEFAULT_ROW_LIMIT).min(MAX_ROW_LIMIT);
    let visible = dataset.visible_columns();

    let body = RowsResponse {
        columns: dataset.columns(),
        total: dataset.row_count(),
        offset: query.offset,
        rows: dataset.row_objects(&visible).skip(query.offset).take(limit).collect(),
    };
    Ok(Json(serde_json::to_value(&body)?))
}

async fn dataset_metrics(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DashboardMetrics>, AppError> {
    let dataset = state.current()?;
    Ok(Json((*state.metrics.get_or_compute(&dataset)).clone()))
}

async fn column_profiles(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ColumnProfile>>, AppError> {
    let dataset = state.current()?;
    Ok(Json(profile_columns(&dataset, &state.config.standalone_policy())))
}

#[derive(Debug, Serialize)]
pub struct ClassificationResponse {
    column: String,
    kind: ColumnKind,
    sample_size: usize,
    numeric_threshold: f64,
}

async fn column_classification(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<ClassificationResponse>, AppError> {
    let dataset = state.current()?;
    let policy = state.config.standalone_policy();
    let kind = policy
        .classify(&dataset, &name)
        .ok_or_else(|| AppError::UnknownColumn(name.clone()))?;

    Ok(Json(ClassificationResponse {
        column: name,
        kind,
        sample_size: policy.sample_size(),
        numeric_threshold: policy.numeric_threshold(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct UniqueResponse {
    column: String,
    total_unique: usize,
    values: Vec<Cell>,
}

async fn column_unique_values(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<UniqueResponse>, AppError> {
    let dataset = state.current()?;
    let mut values =
        unique_values(&dataset, &name).ok_or_else(|| AppError::UnknownColumn(name.clone()))?;
    let total_unique = values.len();
    if let Some(limit) = query.limit {
        values.truncate(limit);
    }

    Ok(Json(UniqueResponse {
        column: name,
        total_unique,
        values,
    }))
}

#[derive(Debug, Serialize)]
pub struct CountsResponse {
    column: String,
    total_unique: usize,
    counts: Vec<ValueCount>,
}

async fn column_value_counts(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<CountsResponse>, AppError> {
    let dataset = state.current()?;
    let mut counts =
        value_counts(&dataset, &name).ok_or_else(|| AppError::UnknownColumn(name.clone()))?;
    let total_unique = counts.len();
    counts.truncate(query.limit.unwrap_or(8));

    Ok(Json(CountsResponse {
        column: name,
        total_unique,
        counts,
    }))
}

#[derive(Debug, Deserialize)]
pub struct TransformRequest {
    transforms: Vec<Transform>,
}

async fn apply_transforms(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TransformRequest>,
) -> Result<Json<DatasetSummary>, AppError> {
    if request.transforms.is_empty() {
        return Err(AppError::InvalidInput("No transforms provided".to_string()));
    }

    let current = state.current()?;
    let parent = current.id();
    let derived = tokio::task::spawn_blocking(move || apply_all(&current, &request.transforms))
        .await
        .map_err(|e| AppError::Internal(format!("transform task failed: {}", e)))??;

    let derived = state.set_current(derived, parent)?;
    let metrics = state.metrics.get_or_compute(&derived);
    Ok(Json(DatasetSummary::new(&derived, &metrics)))
}

async fn reset_dataset(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DatasetSummary>, AppError> {
    let dataset = state.reset()?;
    let metrics = state.metrics.get_or_compute(&dataset);
    Ok(Json(DatasetSummary::new(&dataset, &metrics)))
}

async fn export_dataset(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let dataset = state.current()?;
    let suffix = if dataset.derived_from().is_some() { "_cleaned" } else { "" };
    let file_stem: String = dataset
        .name()
        .chars()
        .filter(|c| (c.is_ascii_graphic() && *c != '"') || *c == ' ')
        .collect();
    let disposition = format!("attachment; filename=\"{}{}.csv\"", file_stem, suffix);

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        to_csv(&dataset),
    ))
}
