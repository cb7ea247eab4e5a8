use axum::Router;
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::modules::assistant::ws;
use crate::modules::identity::http as identity_http;
use crate::modules::scheduling::http as scheduling_http;
use crate::shell::state::AppState;

pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.settings.cors_origins);

    Router::new()
        .route("/", get(index))
        .merge(identity_http::routes())
        .merge(scheduling_http::routes())
        .route("/ws/chat", get(ws::handler))
        .nest_service("/static", ServeDir::new("static"))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Wildcard origins cannot be combined with credentials, so `*` switches the
/// layer to `Any` without them.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let methods = [Method::GET, Method::POST, Method::PUT, Method::DELETE];
    if origins.iter().any(|origin| origin == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(parsed)
        .allow_methods(methods)
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
}

async fn index() -> Response {
    match tokio::fs::read_to_string("static/index.html").await {
        Ok(page) => Html(page).into_response(),
        Err(error) => {
            warn!(%error, "chat client page missing");
            (
                StatusCode::NOT_FOUND,
                Html("<h1>Chat Client HTML Not Found!</h1>".to_string()),
            )
                .into_response()
        }
    }
}
