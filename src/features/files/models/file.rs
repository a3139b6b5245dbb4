use chrono::{DateTime, SubsecRound, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::shared::tags;

/// Database model for an uploaded model file.
///
/// Every column except `tags` is fixed at creation. `tags` holds the
/// comma-joined, normalized tag list.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct FileRecord {
    pub id: String,
    pub original_name: String,
    pub storage_name: String,
    pub extension: String,
    pub size: i64,
    pub mime_type: String,
    pub created_at: DateTime<Utc>,
    pub tags: String,
}

impl FileRecord {
    /// Build a fresh record with a generated id and storage name.
    ///
    /// `extension` is expected lowercase without the leading dot.
    pub fn new(original_name: &str, extension: &str, size: i64, mime_type: &str) -> Self {
        let id = Uuid::new_v4().to_string();
        let storage_name = format!("{}.{}", id, extension);

        Self {
            id,
            original_name: original_name.to_string(),
            storage_name,
            extension: extension.to_string(),
            size,
            mime_type: mime_type.to_string(),
            // Stored with millisecond precision
            created_at: Utc::now().trunc_subsecs(3),
            tags: String::new(),
        }
    }

    pub fn tag_list(&self) -> Vec<String> {
        tags::split(&self.tags)
    }
}

/// A tag change applied to one or more records
#[derive(Debug, Clone, PartialEq)]
pub enum TagMutation {
    /// Append to the existing tags, keeping existing order first
    Add(Vec<String>),
    Replace(Vec<String>),
    Clear,
}

impl TagMutation {
    /// Resulting normalized tag list for a record currently holding `existing`
    pub fn apply(&self, existing: &[String]) -> Vec<String> {
        match self {
            TagMutation::Add(added) => tags::normalize_list(existing.iter().chain(added.iter())),
            TagMutation::Replace(replacement) => tags::normalize_list(replacement),
            TagMutation::Clear => Vec::new(),
        }
    }
}
