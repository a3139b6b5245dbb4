mod tag_suggestion_client;

pub use tag_suggestion_client::{OpenAiCompatibleClient, TagSuggestionClient};
