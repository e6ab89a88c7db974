//! HTTP surface of the fact-checking service.
//!
//! [`router`] wires the three endpoints onto an [`AppState`]:
//!
//! | route | handler |
//! |---|---|
//! | `GET /` | [`routes::index`] |
//! | `GET /list-models` | [`routes::list_models`] |
//! | `POST /verify` | [`routes::verify`] |
//!
//! The binary in `main.rs` loads configuration, selects a model once and then
//! serves this router until the process exits.

pub mod error;
pub mod routes;
pub mod state;

use axum::Router;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use factcheck_llm::verifier::VerifyError;
use std::any::Any;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use error::ApiError;
pub use state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::index))
        .route("/list-models", get(routes::list_models))
        .route("/verify", post(routes::verify))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(CatchPanicLayer::custom(handle_panic))
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = payload
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| payload.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");
    tracing::error!(%detail, "handler panicked");
    ApiError::from(VerifyError::Internal).into_response()
}
