use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;

use crate::features::files::handlers::{
    autotag_file, bulk_update_tags, delete_file, download_file, get_file, list_files,
    update_tags, upload_file,
};
use crate::features::files::services::FileService;

/// Multipart framing allowance on top of the file size limit
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Create routes for the files feature
pub fn routes(file_service: Arc<FileService>, max_upload_size: usize) -> Router {
    Router::new()
        .route(
            "/api/files",
            get(list_files).post(upload_file).layer(DefaultBodyLimit::max(
                max_upload_size.saturating_add(MULTIPART_OVERHEAD),
            )),
        )
        .route("/api/files/tags/bulk", post(bulk_update_tags))
        .route("/api/files/{id}", get(get_file).delete(delete_file))
        .route("/api/files/{id}/file", get(download_file))
        .route("/api/files/{id}/tags", patch(update_tags))
        .route("/api/files/{id}/autotag", post(autotag_file))
        .with_state(file_service)
}
