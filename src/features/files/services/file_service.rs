use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::fs::File;
use tracing::{debug, info, warn};

use crate::core::error::{AppError, Result};
use crate::features::files::dtos::{
    base_filename, file_extension, is_extension_allowed, BulkUpdateTagsDto, FileResponseDto,
    SuggestionStrategy, ALLOWED_EXTENSIONS,
};
use crate::features::files::models::FileRecord;
use crate::features::files::repositories::FileRepository;
use crate::features::files::services::TagSuggestionService;
use crate::modules::storage::LocalStorage;
use crate::shared::tags::{self, TagInput};

/// Stored content opened for download
pub struct FileContent {
    pub record: FileRecord,
    pub file: File,
    pub len: u64,
}

/// Service for model file operations
pub struct FileService {
    repository: FileRepository,
    storage: Arc<LocalStorage>,
    suggestions: Arc<TagSuggestionService>,
    max_upload_size: usize,
}

impl FileService {
    pub fn new(
        pool: SqlitePool,
        storage: Arc<LocalStorage>,
        suggestions: Arc<TagSuggestionService>,
        max_upload_size: usize,
    ) -> Self {
        Self {
            repository: FileRepository::new(pool),
            storage,
            suggestions,
            max_upload_size,
        }
    }

    /// Accept an uploaded model file.
    ///
    /// The extension is checked before anything is written. Content is stored
    /// first and removed again if the record cannot be inserted.
    ///
    /// # Arguments
    /// * `data` - The file content
    /// * `filename` - Filename as sent by the client
    /// * `content_type` - Advisory MIME type, may be empty
    pub async fn upload_file(
        &self,
        data: &[u8],
        filename: &str,
        content_type: &str,
    ) -> Result<FileResponseDto> {
        let original_name = base_filename(filename);

        if !is_extension_allowed(original_name) {
            return Err(AppError::Validation(format!(
                "File type not allowed: '{}'. Allowed extensions: {}",
                original_name,
                ALLOWED_EXTENSIONS.join(", ")
            )));
        }
        let extension = file_extension(original_name)
            .ok_or_else(|| AppError::Validation("File has no extension".to_string()))?;

        if data.len() > self.max_upload_size {
            return Err(AppError::Validation(format!(
                "File too large. Maximum size is {} bytes ({} MB)",
                self.max_upload_size,
                self.max_upload_size / 1024 / 1024
            )));
        }

        let record = FileRecord::new(original_name, &extension, data.len() as i64, content_type);

        self.storage.write(&record.storage_name, data).await?;

        let record = match self.repository.create(&record).await {
            Ok(record) => record,
            Err(e) => {
                if let Err(cleanup) = self.storage.delete(&record.storage_name).await {
                    warn!(
                        "Failed to remove content after rejected insert: {}: {}",
                        record.storage_name, cleanup
                    );
                }
                return Err(e);
            }
        };

        info!(
            "File uploaded: id={}, name={}, size={}",
            record.id, record.original_name, record.size
        );

        Ok(record.into())
    }

    /// List files newest first, optionally only those carrying `tag`
    pub async fn list_files(&self, tag: Option<&str>) -> Result<Vec<FileResponseDto>> {
        let filter = tag.and_then(|t| tags::normalize_text(t).into_iter().next());

        let records = match filter {
            Some(tag) => self.repository.list_by_tag(&tag).await?,
            None => self.repository.list().await?,
        };

        Ok(records.into_iter().map(FileResponseDto::from).collect())
    }

    pub async fn get_file(&self, id: &str) -> Result<FileResponseDto> {
        Ok(self.find(id).await?.into())
    }

    /// Open a record's content for streaming
    pub async fn open_content(&self, id: &str) -> Result<FileContent> {
        let record = self.find(id).await?;

        let (file, len) = self
            .storage
            .open(&record.storage_name)
            .await?
            .ok_or_else(|| {
                warn!("Content missing for file {}: {}", id, record.storage_name);
                AppError::NotFound(format!("File content not found: {}", id))
            })?;

        Ok(FileContent { record, file, len })
    }

    /// Replace a file's tags with the normalized form of `input`
    pub async fn update_tags(&self, id: &str, input: Option<&TagInput>) -> Result<FileResponseDto> {
        let normalized = tags::normalize(input);
        let record = self.repository.update_tags(id, &normalized).await?;

        info!("Tags updated: id={}, tags={}", record.id, record.tags);
        Ok(record.into())
    }

    /// Suggest tags for a file and store them.
    ///
    /// Existing tags are only replaced once a suggestion was obtained.
    pub async fn autotag(
        &self,
        id: &str,
        strategy: SuggestionStrategy,
    ) -> Result<(FileResponseDto, Vec<String>)> {
        let record = self.find(id).await?;

        let suggested = self
            .suggestions
            .suggest(&record.original_name, &record.extension, strategy)
            .await?;
        debug!("Suggested tags for {}: {:?}", id, suggested);

        let record = self.repository.update_tags(id, &suggested).await?;

        info!(
            "Autotag applied: id={}, strategy={:?}, tags={}",
            record.id, strategy, record.tags
        );
        Ok((record.into(), suggested))
    }

    /// Apply one tag mutation to several files, all or nothing
    pub async fn bulk_update_tags(&self, dto: &BulkUpdateTagsDto) -> Result<Vec<FileResponseDto>> {
        let records = self
            .repository
            .mutate_tags_many(&dto.ids, &dto.mutation())
            .await?;

        info!("Bulk tag update: mode={:?}, files={}", dto.mode, records.len());
        Ok(records.into_iter().map(FileResponseDto::from).collect())
    }

    /// Delete a file and its content.
    ///
    /// Content removal is attempted first when the content exists; a failure
    /// there is logged and the record is removed regardless.
    pub async fn delete_file(&self, id: &str) -> Result<()> {
        let record = self.find(id).await?;

        match self.storage.exists(&record.storage_name).await {
            Ok(true) => {
                if let Err(e) = self.storage.delete(&record.storage_name).await {
                    warn!(
                        "Failed to delete content {} for file {}: {}",
                        record.storage_name, id, e
                    );
                }
            }
            Ok(false) => debug!("No content to delete for file {}", id),
            Err(e) => warn!("Could not check content for file {}: {}", id, e),
        }

        if !self.repository.delete(id).await? {
            return Err(AppError::NotFound(format!("File not found: {}", id)));
        }

        info!("File deleted: id={}, name={}", record.id, record.original_name);
        Ok(())
    }

    async fn find(&self, id: &str) -> Result<FileRecord> {
        self.repository
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("File not found: {}", id)))
    }
}
