use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tokio_util::io::ReaderStream;
use validator::Validate;

use crate::core::error::AppError;
use crate::core::extractor::{AppJson, AppQuery, ModelUpload};
use crate::features::files::dtos::{
    AutotagQuery, AutotagResponseDto, BulkUpdateTagsDto, DeleteFileResponseDto, FileResponseDto,
    ListFilesQuery, UpdateTagsDto, UploadFileDto,
};
use crate::features::files::services::FileService;
use crate::shared::types::{ErrorResponse, ItemResponse, ItemsResponse};

/// Upload a model file
///
/// Accepts multipart/form-data with a single `file` field holding an
/// `.stl` or `.3mf` file.
#[utoipa::path(
    post,
    path = "/api/files",
    tag = "files",
    request_body(
        content = UploadFileDto,
        content_type = "multipart/form-data",
        description = "Model file upload form",
    ),
    responses(
        (status = 201, description = "File uploaded successfully", body = ItemResponse<FileResponseDto>),
        (status = 400, description = "Missing file or disallowed extension", body = ErrorResponse),
        (status = 413, description = "File too large")
    )
)]
pub async fn upload_file(
    State(service): State<Arc<FileService>>,
    upload: ModelUpload,
) -> Result<(StatusCode, Json<ItemResponse<FileResponseDto>>), AppError> {
    let item = service
        .upload_file(&upload.data, &upload.file_name, &upload.content_type)
        .await?;

    Ok((StatusCode::CREATED, Json(ItemResponse { item })))
}

/// List files, newest first
#[utoipa::path(
    get,
    path = "/api/files",
    tag = "files",
    params(ListFilesQuery),
    responses(
        (status = 200, description = "Files retrieved successfully", body = ItemsResponse<FileResponseDto>)
    )
)]
pub async fn list_files(
    State(service): State<Arc<FileService>>,
    AppQuery(query): AppQuery<ListFilesQuery>,
) -> Result<Json<ItemsResponse<FileResponseDto>>, AppError> {
    let items = service.list_files(query.tag.as_deref()).await?;
    Ok(Json(ItemsResponse { items }))
}

/// Get a file's metadata
#[utoipa::path(
    get,
    path = "/api/files/{id}",
    tag = "files",
    params(("id" = String, Path, description = "File ID")),
    responses(
        (status = 200, description = "File retrieved successfully", body = ItemResponse<FileResponseDto>),
        (status = 404, description = "File not found", body = ErrorResponse)
    )
)]
pub async fn get_file(
    State(service): State<Arc<FileService>>,
    Path(id): Path<String>,
) -> Result<Json<ItemResponse<FileResponseDto>>, AppError> {
    let item = service.get_file(&id).await?;
    Ok(Json(ItemResponse { item }))
}

/// Download a file's content
#[utoipa::path(
    get,
    path = "/api/files/{id}/file",
    tag = "files",
    params(("id" = String, Path, description = "File ID")),
    responses(
        (status = 200, description = "File content", content_type = "application/octet-stream"),
        (status = 404, description = "File or its content not found", body = ErrorResponse)
    )
)]
pub async fn download_file(
    State(service): State<Arc<FileService>>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let content = service.open_content(&id).await?;

    let content_type = HeaderValue::from_str(&content.record.mime_type)
        .ok()
        .filter(|_| !content.record.mime_type.is_empty())
        .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream"));

    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename*=UTF-8''{}",
        urlencoding::encode(&content.record.original_name)
    ))
    .map_err(|e| AppError::Internal(format!("Invalid Content-Disposition header: {}", e)))?;

    let body = Body::from_stream(ReaderStream::new(content.file));

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_LENGTH, HeaderValue::from(content.len)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

/// Replace a file's tags
///
/// `tags` may be a comma-separated string or a list of strings.
#[utoipa::path(
    patch,
    path = "/api/files/{id}/tags",
    tag = "files",
    params(("id" = String, Path, description = "File ID")),
    request_body = UpdateTagsDto,
    responses(
        (status = 200, description = "Tags updated", body = ItemResponse<FileResponseDto>),
        (status = 400, description = "Invalid body", body = ErrorResponse),
        (status = 404, description = "File not found", body = ErrorResponse)
    )
)]
pub async fn update_tags(
    State(service): State<Arc<FileService>>,
    Path(id): Path<String>,
    AppJson(dto): AppJson<UpdateTagsDto>,
) -> Result<Json<ItemResponse<FileResponseDto>>, AppError> {
    let item = service.update_tags(&id, dto.tags.as_ref()).await?;
    Ok(Json(ItemResponse { item }))
}

/// Suggest tags for a file and apply them
#[utoipa::path(
    post,
    path = "/api/files/{id}/autotag",
    tag = "files",
    params(("id" = String, Path, description = "File ID"), AutotagQuery),
    responses(
        (status = 200, description = "Tags suggested and applied", body = AutotagResponseDto),
        (status = 404, description = "File not found", body = ErrorResponse),
        (status = 500, description = "Suggestion service failure or not configured", body = ErrorResponse)
    )
)]
pub async fn autotag_file(
    State(service): State<Arc<FileService>>,
    Path(id): Path<String>,
    AppQuery(query): AppQuery<AutotagQuery>,
) -> Result<Json<AutotagResponseDto>, AppError> {
    let (item, suggested) = service
        .autotag(&id, query.strategy.unwrap_or_default())
        .await?;
    Ok(Json(AutotagResponseDto { item, suggested }))
}

/// Add, replace or clear the tags of several files at once
///
/// Either every file is updated or none is.
#[utoipa::path(
    post,
    path = "/api/files/tags/bulk",
    tag = "files",
    request_body = BulkUpdateTagsDto,
    responses(
        (status = 200, description = "Tags updated", body = ItemsResponse<FileResponseDto>),
        (status = 400, description = "Invalid body", body = ErrorResponse),
        (status = 404, description = "One or more files not found", body = ErrorResponse)
    )
)]
pub async fn bulk_update_tags(
    State(service): State<Arc<FileService>>,
    AppJson(dto): AppJson<BulkUpdateTagsDto>,
) -> Result<Json<ItemsResponse<FileResponseDto>>, AppError> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let items = service.bulk_update_tags(&dto).await?;
    Ok(Json(ItemsResponse { items }))
}

/// Delete a file and its content
#[utoipa::path(
    delete,
    path = "/api/files/{id}",
    tag = "files",
    params(("id" = String, Path, description = "File ID")),
    responses(
        (status = 200, description = "File deleted successfully", body = DeleteFileResponseDto),
        (status = 404, description = "File not found", body = ErrorResponse)
    )
)]
pub async fn delete_file(
    State(service): State<Arc<FileService>>,
    Path(id): Path<String>,
) -> Result<Json<DeleteFileResponseDto>, AppError> {
    service.delete_file(&id).await?;
    Ok(Json(DeleteFileResponseDto { deleted: true }))
}
