mod file_service;
mod tag_suggestion_service;

pub use file_service::{FileContent, FileService};
pub use tag_suggestion_service::TagSuggestionService;
