use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    error::AppError,
    services::session_store::{AnalysisRecord, UserProfile},
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/session/users", get(list_users).post(register_user))
        .route(
            "/session/current",
            get(current_user).put(sign_in).delete(sign_out),
        )
        .route("/session/analyses", get(recent_analyses))
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    name: String,
    email: String,
}

async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<UserProfile>>, AppError> {
    Ok(Json(state.sessions.registered_users()?))
}

async fn register_user(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<UserProfile>, AppError> {
    Ok(Json(state.sessions.register_user(&request.name, &request.email)?))
}

async fn current_user(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Option<UserProfile>>, AppError> {
    Ok(Json(state.sessions.current_user()?))
}

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    user_id: String,
}

/// Selects a registered profile as the current user.
async fn sign_in(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SignInRequest>,
) -> Result<Json<UserProfile>, AppError> {
    let user = state
        .sessions
        .registered_users()?
        .into_iter()
        .find(|u| u.id == request.user_id)
        .ok_or_else(|| AppError::NotFound(format!("user {}", request.user_id)))?;

    state.sessions.set_current_user(Some(&user))?;
    Ok(Json(user))
}

async fn sign_out(State(state): State<Arc<AppState>>) -> Result<Json<Option<UserProfile>>, AppError> {
    state.sessions.set_current_user(None)?;
    Ok(Json(None))
}

async fn recent_analyses(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<AnalysisRecord>>, AppError> {
    let user = state
        .sessions
        .current_user()?
        .ok_or_else(|| AppError::NotFound("no user is signed in".to_string()))?;
    Ok(Json(state.sessions.recent_analyses(&user.id)?))
}
