//! REST endpoints for the preferences store.

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use super::model::Theme;
use super::store::PreferencesStore;

/// Shared state for preferences routes.
#[derive(Clone)]
pub struct PreferencesRouteState {
    pub store: Arc<PreferencesStore>,
}

/// Body of PUT /api/preferences. Absent fields are left unchanged.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesUpdate {
    pub theme: Option<Theme>,
    pub metric_units: Option<bool>,
}

/// GET /api/preferences
async fn get_preferences(State(state): State<PreferencesRouteState>) -> impl IntoResponse {
    Json(state.store.state().await)
}

/// PUT /api/preferences
async fn put_preferences(
    State(state): State<PreferencesRouteState>,
    Json(update): Json<PreferencesUpdate>,
) -> impl IntoResponse {
    state.store.update(update.theme, update.metric_units).await;
    Json(state.store.state().await)
}

/// POST /api/preferences/reset
async fn reset_preferences(State(state): State<PreferencesRouteState>) -> impl IntoResponse {
    state.store.reset().await;
    Json(state.store.state().await)
}

/// Build the preferences REST routes.
pub fn preferences_routes(state: PreferencesRouteState) -> Router {
    Router::new()
        .route("/api/preferences", get(get_preferences).put(put_preferences))
        .route("/api/preferences/reset", post(reset_preferences))
        .with_state(state)
}
