//! Authentication endpoint handlers.

use crate::auth::{self, TokenResponse};
use crate::error::AppError;
use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub uname: String,
    pub pword: String,
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let token = auth::login(&state.settings, &state.pools, &request.uname, &request.pword).await?;
    tracing::info!(uname = %request.uname, role = %token.role, "login");
    Ok(Json(token))
}

pub async fn guest(State(state): State<AppState>) -> Result<Json<TokenResponse>, AppError> {
    let token = auth::guest(&state.settings, &state.pools).await?;
    Ok(Json(token))
}
