use utoipa::{Modify, OpenApi};

use crate::core::app;
use crate::features::files::{dtos as files_dtos, handlers as files_handlers};
use crate::shared::types::{ErrorResponse, HealthResponse, ItemResponse, ItemsResponse};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Health
        app::health_check,
        // Files
        files_handlers::upload_file,
        files_handlers::list_files,
        files_handlers::get_file,
        files_handlers::download_file,
        files_handlers::update_tags,
        files_handlers::autotag_file,
        files_handlers::bulk_update_tags,
        files_handlers::delete_file,
    ),
    components(
        schemas(
            // Shared
            ErrorResponse,
            HealthResponse,
            // Files
            files_dtos::UploadFileDto,
            files_dtos::FileResponseDto,
            files_dtos::UpdateTagsDto,
            files_dtos::SuggestionStrategy,
            files_dtos::AutotagResponseDto,
            files_dtos::BulkTagMode,
            files_dtos::BulkUpdateTagsDto,
            files_dtos::DeleteFileResponseDto,
            ItemResponse<files_dtos::FileResponseDto>,
            ItemsResponse<files_dtos::FileResponseDto>,
        )
    ),
    tags(
        (name = "health", description = "Service liveness"),
        (name = "files", description = "Model file upload, download and tagging"),
    ),
    info(
        title = "Model Vault API",
        version = "0.1.0",
        description = "API documentation for the model file vault",
    )
)]
pub struct ApiDoc;

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}
