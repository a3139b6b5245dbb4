use axum::{routing::get, Json, Router};
use std::sync::Arc;
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::core::config::{AppConfig, SwaggerConfig};
use crate::core::middleware;
use crate::core::openapi::{ApiDoc, SwaggerInfoModifier};
use crate::features::files::{routes as files_routes, FileService};
use crate::shared::types::HealthResponse;

/// Liveness check
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Assemble the application router with its middleware stack
pub fn build_router(
    app_config: &AppConfig,
    swagger_config: &SwaggerConfig,
    file_service: Arc<FileService>,
) -> Router {
    let swagger_modifier = SwaggerInfoModifier {
        title: swagger_config.title.clone(),
        version: swagger_config.version.clone(),
        description: swagger_config.description.clone(),
    };

    let mut openapi = ApiDoc::openapi();
    swagger_modifier.modify(&mut openapi);

    let swagger =
        Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi));

    let health_route = Router::new().route("/api/health", get(health_check));

    let router = Router::new()
        .merge(swagger)
        .merge(health_route)
        .merge(files_routes(file_service, app_config.max_upload_size));

    middleware::apply(router, &app_config.cors_allowed_origins)
}
