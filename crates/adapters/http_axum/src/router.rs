//! Axum router assembly.

use std::path::PathBuf;

use axum::Router;
use axum::routing::get;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use valvehub_app::ports::{EventPublisher, EventStore, ValveDriver};

use crate::state::AppState;

/// File served at `/` when a UI directory is configured.
pub const UI_ENTRY: &str = "server_ui.html";

/// Build the top-level axum [`Router`].
///
/// Mounts the observer WebSocket at `/ws` and API routes under `/api`.
/// When `ui_dir` is set, `/` serves its [`UI_ENTRY`] page and any other
/// unmatched path falls through to the directory. Includes a
/// [`TraceLayer`] that logs each HTTP request/response at the `DEBUG`
/// level using the `tracing` ecosystem.
pub fn build<D, P, ES>(state: AppState<D, P, ES>, ui_dir: Option<PathBuf>) -> Router
where
    D: ValveDriver + 'static,
    P: EventPublisher + Send + Sync + 'static,
    ES: EventStore + Send + Sync + 'static,
{
    let mut router = Router::new()
        .route("/health", get(health_check))
        .route("/ws", get(crate::ws::upgrade::<D, P, ES>))
        .nest("/api", crate::api::routes());

    if let Some(dir) = ui_dir {
        router = router
            .route_service("/", ServeFile::new(dir.join(UI_ENTRY)))
            .fallback_service(ServeDir::new(dir));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::testing::harness;

    fn ui_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("valvehub-ui-{}-{name}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(UI_ENTRY), "<h1>Valves</h1>").unwrap();
        std::fs::write(dir.join("app.css"), "body{}").unwrap();
        dir
    }

    #[tokio::test]
    async fn should_return_ok_when_health_check_called() {
        let app = build(harness().state, None);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn should_return_not_found_for_root_without_ui() {
        let app = build(harness().state, None);
        let response = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn should_serve_control_page_at_root() {
        let dir = ui_dir("root");
        let app = build(harness().state, Some(dir.clone()));

        let response = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"<h1>Valves</h1>");
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn should_serve_static_assets_from_ui_dir() {
        let dir = ui_dir("assets");
        let app = build(harness().state, Some(dir.clone()));

        let response = app
            .clone()
            .oneshot(Request::get("/app.css").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn should_reject_plain_get_on_websocket_route() {
        let app = build(harness().state, None);
        let response = app
            .oneshot(Request::get("/ws").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }
}
