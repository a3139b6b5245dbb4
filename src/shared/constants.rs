/// Separator used both for comma-string tag input and for the persisted tag column
pub const TAG_SEPARATOR: char = ',';

/// Upper bound on tags returned by the suggestion engine
pub const MAX_SUGGESTED_TAGS: usize = 8;

/// Filename tokens that never become suggested tags
pub const SUGGESTION_STOPWORDS: &[&str] = &["v1", "v2", "v3", "final"];
