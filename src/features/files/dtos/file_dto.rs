use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::features::files::models::{FileRecord, TagMutation};
use crate::shared::tags::{self, TagInput};

/// Upload file request DTO for OpenAPI documentation
/// Note: This struct is for Swagger UI documentation only.
/// The actual handler uses axum's Multipart extractor directly.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct UploadFileDto {
    /// The model file to upload (.stl or .3mf)
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub file: String,
}

/// A stored model file as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FileResponseDto {
    /// Unique identifier for the file
    pub id: String,
    /// Filename as uploaded
    pub original_name: String,
    /// Generated name of the stored content
    pub storage_name: String,
    /// Lowercase extension without the dot
    #[schema(example = "stl")]
    pub extension: String,
    /// Size of the file in bytes
    pub size: i64,
    /// Content type supplied with the upload, may be empty
    pub mime_type: String,
    /// Timestamp when the file was uploaded
    pub created_at: DateTime<Utc>,
    /// Normalized tags
    #[schema(example = json!(["bracket", "mount"]))]
    pub tags: Vec<String>,
    /// Download URL for the file content
    pub file_url: String,
}

impl From<FileRecord> for FileResponseDto {
    fn from(record: FileRecord) -> Self {
        let tags = record.tag_list();
        let file_url = file_url(&record.id);

        Self {
            id: record.id,
            original_name: record.original_name,
            storage_name: record.storage_name,
            extension: record.extension,
            size: record.size,
            mime_type: record.mime_type,
            created_at: record.created_at,
            tags,
            file_url,
        }
    }
}

pub fn file_url(id: &str) -> String {
    format!("/api/files/{}/file", id)
}

/// Query parameters for listing files
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListFilesQuery {
    /// Only return files carrying this tag
    pub tag: Option<String>,
}

/// Request DTO for replacing a file's tags.
///
/// `tags` may be a comma-separated string or a list of strings.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateTagsDto {
    #[serde(default)]
    #[schema(value_type = Option<Vec<String>>, example = json!(["bracket", "mount"]))]
    pub tags: Option<TagInput>,
}

/// How autotag obtains its suggestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionStrategy {
    /// External service when configured, filename heuristic otherwise
    #[default]
    Auto,
    /// External service only; fails if it is not configured
    External,
    /// Filename heuristic only
    Local,
}

/// Query parameters for autotag
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AutotagQuery {
    /// auto (default), external or local
    pub strategy: Option<SuggestionStrategy>,
}

/// Response DTO for autotag
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AutotagResponseDto {
    pub item: FileResponseDto,
    pub suggested: Vec<String>,
}

/// Bulk tag mutation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BulkTagMode {
    Add,
    Replace,
    Clear,
}

/// Request DTO for changing the tags of several files at once
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BulkUpdateTagsDto {
    /// Files to update, at least one
    #[validate(length(min = 1, max = 500, message = "ids must contain between 1 and 500 entries"))]
    pub ids: Vec<String>,
    pub mode: BulkTagMode,
    /// Ignored for `clear`
    #[serde(default)]
    #[schema(value_type = Option<Vec<String>>)]
    pub tags: Option<TagInput>,
}

impl BulkUpdateTagsDto {
    pub fn mutation(&self) -> TagMutation {
        let tags = tags::normalize(self.tags.as_ref());
        match self.mode {
            BulkTagMode::Add => TagMutation::Add(tags),
            BulkTagMode::Replace => TagMutation::Replace(tags),
            BulkTagMode::Clear => TagMutation::Clear,
        }
    }
}

/// Response DTO for delete operations
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteFileResponseDto {
    /// Confirmation that the file was deleted
    pub deleted: bool,
}

/// Accepted upload extensions, lowercase with the dot
pub const ALLOWED_EXTENSIONS: &[&str] = &[".stl", ".3mf"];

/// Lowercase extension of a filename, without the dot
pub fn file_extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(|ext| ext.to_lowercase())
}

/// Check whether a filename carries an accepted model extension
pub fn is_extension_allowed(filename: &str) -> bool {
    file_extension(filename)
        .map(|ext| ALLOWED_EXTENSIONS.contains(&format!(".{}", ext).as_str()))
        .unwrap_or(false)
}

/// Strip any client-side directory components from an uploaded filename
pub fn base_filename(filename: &str) -> &str {
    filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .trim()
}
