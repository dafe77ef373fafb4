//! REST endpoints for the auth session.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use secrecy::SecretString;
use serde::Deserialize;
use uuid::Uuid;

use super::store::AuthStore;

/// Shared state for auth routes.
#[derive(Clone)]
pub struct AuthRouteState {
    pub auth: Arc<AuthStore>,
}

/// Body of POST /api/auth/sign-in.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInRequest {
    /// Generated when absent.
    #[serde(default)]
    pub user_id: Option<Uuid>,
    pub email: String,
    pub access_token: SecretString,
}

/// GET /api/auth/status
async fn get_status(State(state): State<AuthRouteState>) -> impl IntoResponse {
    Json(state.auth.status().await)
}

/// POST /api/auth/sign-in
///
/// 409 when a different user is already signed in.
async fn sign_in(
    State(state): State<AuthRouteState>,
    Json(req): Json<SignInRequest>,
) -> impl IntoResponse {
    let user_id = req.user_id.unwrap_or_else(Uuid::new_v4);
    if let Some(current) = state.auth.user_id().await {
        if current != user_id {
            return (
                StatusCode::CONFLICT,
                Json(serde_json::json!({ "error": "Another user is signed in" })),
            )
                .into_response();
        }
    }
    state.auth.sign_in(user_id, req.email, req.access_token).await;
    Json(state.auth.status().await).into_response()
}

/// POST /api/auth/sign-out
async fn sign_out(State(state): State<AuthRouteState>) -> impl IntoResponse {
    if state.auth.is_authenticated().await {
        state.auth.sign_out().await;
    }
    Json(state.auth.status().await)
}

/// Build the auth REST routes.
pub fn auth_routes(state: AuthRouteState) -> Router {
    Router::new()
        .route("/api/auth/status", get(get_status))
        .route("/api/auth/sign-in", post(sign_in))
        .route("/api/auth/sign-out", post(sign_out))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use crate::store::{KeyValueStore, MemoryStore, keys};

    async fn call(app: Router, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method("POST").uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        };
        let response = app.oneshot(request.unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn sign_in_then_out() {
        let secure = Arc::new(MemoryStore::new("secure"));
        let auth = Arc::new(AuthStore::new(secure.clone()));
        let app = auth_routes(AuthRouteState { auth: Arc::clone(&auth) });
        let user_id = Uuid::new_v4();

        let (status, body) = call(
            app.clone(),
            "/api/auth/sign-in",
            Some(json!({ "userId": user_id, "email": "sam@example.com", "accessToken": "tok-9" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["authenticated"], true);
        assert_eq!(body["userId"], user_id.to_string());
        assert!(body.get("accessToken").is_none());
        assert!(secure.get_item(keys::secure::AUTH).await.unwrap().is_some());

        let (status, _) = call(
            app.clone(),
            "/api/auth/sign-in",
            Some(json!({ "email": "other@example.com", "accessToken": "tok-0" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(auth.user_id().await, Some(user_id));

        let (_, body) = call(app, "/api/auth/sign-out", None).await;
        assert_eq!(body["authenticated"], false);
        assert!(secure.get_item(keys::secure::AUTH).await.unwrap().is_none());
    }
}
