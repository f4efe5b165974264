//! Router assembly: HTTP endpoints, WebSocket upgrade, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;
pub mod ws;

/// Build the application router with:
/// - WebSocket at `/ws`
/// - REST-ish API under `/api/v1/...`
/// - CORS (allow any origin/method/headers) – adjust for production if needed
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // WebSocket
        .route("/ws", get(ws::ws_upgrade))
        // HTTP API
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/users", post(http::http_post_user))
        .route("/api/v1/turn", post(http::http_post_turn))
        .route("/api/v1/question", post(http::http_post_question))
        .route("/api/v1/answer", post(http::http_post_answer))
        .route("/api/v1/feedback", get(http::http_get_feedback))
        .route("/api/v1/tutor/next", post(http::http_post_tutor_next))
        .route("/api/v1/level", post(http::http_post_level))
        .route("/api/v1/reset", post(http::http_post_reset))
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn app() -> Router {
        build_router(Arc::new(AppState::from_config(None)))
    }

    async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let req = Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn health_is_ok() {
        let res = app()
            .oneshot(Request::get("/api/v1/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn launch_turn_speaks_welcome() {
        let (status, body) = post_json(
            app(),
            "/api/v1/turn",
            serde_json::json!({ "userId": "u", "intent": { "name": "launch" } }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], "Welcome");
        assert_eq!(body["should_end_session"], false);
    }

    #[tokio::test]
    async fn question_for_unknown_user_is_404() {
        let (status, body) = post_json(app(), "/api/v1/question", serde_json::json!({ "userId": "ghost" })).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("ghost"));
    }

    #[tokio::test]
    async fn created_user_gets_level_and_rejects_garbage_answers() {
        let app = app();
        let (status, rec) = post_json(app.clone(), "/api/v1/users", serde_json::json!({ "userId": "v" })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(rec["level"], 1);

        let (status, body) = post_json(app.clone(), "/api/v1/level", serde_json::json!({ "userId": "v" })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["level"], 1);

        let question = serde_json::json!({
            "id": "q",
            "prompt": "The CTU instruction counts up.",
            "attribute": "counts",
            "answer": { "kind": "true_false", "truth": true, "statement": null }
        });
        let (status, _) = post_json(
            app,
            "/api/v1/answer",
            serde_json::json!({ "userId": "v", "question": question, "answer": "banana" }),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn reset_for_unknown_user_is_404_and_creates_nothing() {
        let app = app();
        let (status, _) = post_json(app.clone(), "/api/v1/reset", serde_json::json!({ "userId": "ghost" })).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = post_json(app, "/api/v1/question", serde_json::json!({ "userId": "ghost" })).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn answer_for_unknown_attribute_is_422() {
        let app = app();
        post_json(app.clone(), "/api/v1/users", serde_json::json!({ "userId": "c" })).await;
        let question = serde_json::json!({
            "id": "q",
            "prompt": "The CTU instruction is red.",
            "attribute": "colour",
            "answer": { "kind": "true_false", "truth": false, "statement": null }
        });
        let (status, body) = post_json(
            app,
            "/api/v1/answer",
            serde_json::json!({ "userId": "c", "question": question, "answer": "false" }),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("colour"));
    }

    #[test]
    fn store_outage_maps_to_503() {
        use axum::response::IntoResponse;
        use crate::error::TutorError;
        let res = http::ApiError(TutorError::StoreUnavailable("down".into())).into_response();
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn unexpected_intent_is_409() {
        let (status, _) = post_json(
            app(),
            "/api/v1/turn",
            serde_json::json!({ "userId": "u", "intent": { "name": "yes" } }),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }
}
