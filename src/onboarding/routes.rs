//! REST endpoints over the onboarding action handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, patch, post, put};
use axum::{Json, Router};
use serde_json::{Map, Value};

use super::manager::OnboardingManager;
use crate::error::NavigationError;

/// Shared state for onboarding routes.
#[derive(Clone)]
pub struct OnboardingRouteState {
    pub manager: Arc<OnboardingManager>,
}

/// GET /api/onboarding/status
async fn get_status(State(state): State<OnboardingRouteState>) -> impl IntoResponse {
    Json(state.manager.status().await)
}

/// POST /api/onboarding/start
async fn start(State(state): State<OnboardingRouteState>) -> impl IntoResponse {
    let started = state.manager.start().await;
    Json(serde_json::json!({ "started": started }))
}

/// POST /api/onboarding/next
///
/// At the last slide the response carries `"result": "at_end"` and nothing
/// changes.
async fn next(State(state): State<OnboardingRouteState>) -> impl IntoResponse {
    let advance = state.manager.next_slide().await;
    let status = state.manager.status().await;
    Json(serde_json::json!({ "advance": advance, "status": status }))
}

/// POST /api/onboarding/previous
async fn previous(State(state): State<OnboardingRouteState>) -> impl IntoResponse {
    let moved = state.manager.previous_slide().await;
    let status = state.manager.status().await;
    Json(serde_json::json!({ "moved": moved, "status": status }))
}

/// PUT /api/onboarding/slide/{index}
///
/// 400 when the index is out of range, 409 once onboarding is completed.
async fn set_slide(
    State(state): State<OnboardingRouteState>,
    Path(index): Path<usize>,
) -> impl IntoResponse {
    match state.manager.set_current_slide_index(index).await {
        Ok(()) => Json(serde_json::to_value(state.manager.status().await).unwrap_or_default())
            .into_response(),
        Err(e) => {
            let code = match e {
                NavigationError::OutOfRange { .. } => StatusCode::BAD_REQUEST,
                NavigationError::Completed => StatusCode::CONFLICT,
            };
            (code, Json(serde_json::json!({ "error": e.to_string() }))).into_response()
        }
    }
}

/// POST /api/onboarding/slides/{slide_id}/complete
async fn complete_slide(
    State(state): State<OnboardingRouteState>,
    Path(slide_id): Path<String>,
) -> impl IntoResponse {
    let found = state.manager.mark_slide_completed(&slide_id).await;
    let progress = state.manager.progress().await;
    Json(serde_json::json!({ "found": found, "progress": progress }))
}

/// PATCH /api/onboarding/personal-info
async fn update_personal_info(
    State(state): State<OnboardingRouteState>,
    Json(partial): Json<Map<String, Value>>,
) -> impl IntoResponse {
    Json(state.manager.update_personal_info(&partial).await)
}

/// PATCH /api/onboarding/goals
async fn update_goals(
    State(state): State<OnboardingRouteState>,
    Json(partial): Json<Map<String, Value>>,
) -> impl IntoResponse {
    Json(state.manager.update_goals(&partial).await)
}

/// PATCH /api/onboarding/preferences
async fn update_preferences(
    State(state): State<OnboardingRouteState>,
    Json(partial): Json<Map<String, Value>>,
) -> impl IntoResponse {
    Json(state.manager.update_preferences(&partial).await)
}

/// POST /api/onboarding/complete
///
/// 200 with the validated record, or 422 with per-field messages.
async fn complete(State(state): State<OnboardingRouteState>) -> impl IntoResponse {
    match state.manager.complete_onboarding().await {
        Ok(record) => Json(serde_json::json!({ "record": record })).into_response(),
        Err(e) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({
                "error": e.summary,
                "fieldErrors": e.field_errors,
            })),
        )
            .into_response(),
    }
}

/// POST /api/onboarding/reset
async fn reset(State(state): State<OnboardingRouteState>) -> impl IntoResponse {
    Json(state.manager.reset_onboarding().await)
}

/// Build the onboarding REST routes.
pub fn onboarding_routes(state: OnboardingRouteState) -> Router {
    Router::new()
        .route("/api/onboarding/status", get(get_status))
        .route("/api/onboarding/start", post(start))
        .route("/api/onboarding/next", post(next))
        .route("/api/onboarding/previous", post(previous))
        .route("/api/onboarding/slide/{index}", put(set_slide))
        .route("/api/onboarding/slides/{slide_id}/complete", post(complete_slide))
        .route("/api/onboarding/personal-info", patch(update_personal_info))
        .route("/api/onboarding/goals", patch(update_goals))
        .route("/api/onboarding/preferences", patch(update_preferences))
        .route("/api/onboarding/complete", post(complete))
        .route("/api/onboarding/reset", post(reset))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    use crate::auth::AuthStore;
    use crate::store::{MemoryStore, StoreContext};

    fn app() -> Router {
        let stores = StoreContext::new(
            Arc::new(MemoryStore::new("secure")),
            Arc::new(MemoryStore::new("general")),
        );
        let auth = Arc::new(AuthStore::new(Arc::clone(&stores.secure)));
        let manager = Arc::new(OnboardingManager::new(stores, auth));
        onboarding_routes(OnboardingRouteState { manager })
    }

    async fn call(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = app.oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn out_of_range_slide_is_bad_request() {
        let (status, body) = call(app(), "PUT", "/api/onboarding/slide/5", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Slide index 5 out of range (0..5)");
    }

    #[tokio::test]
    async fn in_range_slide_returns_status() {
        let (status, body) = call(app(), "PUT", "/api/onboarding/slide/2", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["currentStepIndex"], 2);
        assert_eq!(body["currentStep"], "goals");
    }

    #[tokio::test]
    async fn patch_reports_rejected_fields() {
        let (status, body) = call(
            app(),
            "PATCH",
            "/api/onboarding/goals",
            Some(serde_json::json!({ "dailyWaterGoal": 0, "weeklyWorkouts": 3 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["accepted"], serde_json::json!(["weeklyWorkouts"]));
        assert_eq!(body["rejected"]["dailyWaterGoal"], "must be at least 1");
    }

    #[tokio::test]
    async fn empty_completion_is_unprocessable() {
        let (status, body) = call(app(), "POST", "/api/onboarding/complete", None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["fieldErrors"]["goals.primaryGoal"], "is required");
    }

    #[tokio::test]
    async fn navigation_after_completion_conflicts() {
        use crate::validation::schemas::tests::{valid_goals, valid_personal_info, valid_preferences};

        let app = app();
        call(app.clone(), "PATCH", "/api/onboarding/personal-info", Some(Value::Object(valid_personal_info()))).await;
        call(app.clone(), "PATCH", "/api/onboarding/goals", Some(Value::Object(valid_goals()))).await;
        call(app.clone(), "PATCH", "/api/onboarding/preferences", Some(Value::Object(valid_preferences()))).await;
        let (status, _) = call(app.clone(), "POST", "/api/onboarding/complete", None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(app.clone(), "PUT", "/api/onboarding/slide/1", None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"].as_str().unwrap().contains("already completed"));

        let (_, body) = call(app, "POST", "/api/onboarding/next", None).await;
        assert_eq!(body["advance"]["result"], "completed");
        assert_eq!(body["status"]["currentStepIndex"], 0);
    }
}
