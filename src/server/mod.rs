mod api;
mod error;
mod state;
mod types;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::limit::RequestBodyLimitLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use self::error::AppError;
pub use self::state::*;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::index_handler,
        api::upload_handler,
        api::similarities_handler,
        api::diff_handler,
        api::metrics_handler,
    ),
    components(schemas(
        types::IndexResponse,
        types::UploadForm,
        types::UploadResponse,
        types::SimilaritiesResponse,
        types::DiffForm,
        types::DiffResponse,
    ))
)]
pub struct ApiDoc;

/// 构建API服务器
pub fn create_app(state: Arc<AppState>) -> Router {
    let body_limit = state.body_limit;
    Router::new()
        .route("/", get(api::index_handler))
        .route("/upload", post(api::upload_handler))
        .route("/similarities", get(api::similarities_handler))
        .route("/diff", post(api::diff_handler))
        .route("/metrics", get(api::metrics_handler))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .with_state(state)
}
