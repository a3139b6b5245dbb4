use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;

use crate::core::error::{AppError, Result};
use crate::features::files::clients::TagSuggestionClient;
use crate::features::files::dtos::SuggestionStrategy;
use crate::shared::constants::{MAX_SUGGESTED_TAGS, SUGGESTION_STOPWORDS};
use crate::shared::llm::parse_json_array;
use crate::shared::prompts::render_tag_suggestion_prompt;
use crate::shared::tags::{self, TagInput};

lazy_static! {
    /// Runs of characters that separate filename tokens
    static ref TOKEN_SEPARATOR_RE: Regex = Regex::new(r"[^A-Za-z0-9]+").unwrap();
}

/// Derive candidate tags from a filename.
///
/// Splits the name (without its extension) into alphanumeric tokens, drops
/// single characters and version markers, then appends the extension.
pub fn suggest_from_filename(original_name: &str, extension: &str) -> Vec<String> {
    let extension = extension.to_lowercase();
    let stem = strip_extension(original_name, &extension);

    let mut suggested: Vec<String> = Vec::new();
    for token in TOKEN_SEPARATOR_RE.split(stem) {
        let token = token.to_lowercase();
        if token.chars().count() <= 1 || SUGGESTION_STOPWORDS.contains(&token.as_str()) {
            continue;
        }
        if !suggested.contains(&token) {
            suggested.push(token);
        }
    }

    if !extension.is_empty() && !suggested.contains(&extension) {
        suggested.push(extension);
    }

    suggested.truncate(MAX_SUGGESTED_TAGS);
    suggested
}

/// Remove a trailing `.<extension>`, compared case-insensitively
fn strip_extension<'a>(name: &'a str, extension: &str) -> &'a str {
    if extension.is_empty() {
        return name;
    }

    let suffix_len = extension.len() + 1;
    if name.len() < suffix_len || !name.is_char_boundary(name.len() - suffix_len) {
        return name;
    }

    let (stem, suffix) = name.split_at(name.len() - suffix_len);
    if suffix.starts_with('.') && suffix[1..].eq_ignore_ascii_case(extension) {
        stem
    } else {
        name
    }
}

/// Suggestion engine: filename heuristic plus optional external service
pub struct TagSuggestionService {
    client: Option<Arc<dyn TagSuggestionClient>>,
}

impl TagSuggestionService {
    pub fn new(client: Option<Arc<dyn TagSuggestionClient>>) -> Self {
        Self { client }
    }

    pub fn is_external_configured(&self) -> bool {
        self.client.is_some()
    }

    /// Suggest tags with the requested strategy
    pub async fn suggest(
        &self,
        original_name: &str,
        extension: &str,
        strategy: SuggestionStrategy,
    ) -> Result<Vec<String>> {
        match strategy {
            SuggestionStrategy::Local => Ok(suggest_from_filename(original_name, extension)),
            SuggestionStrategy::External => self.suggest_external(original_name, extension).await,
            SuggestionStrategy::Auto if self.is_external_configured() => {
                self.suggest_external(original_name, extension).await
            }
            SuggestionStrategy::Auto => Ok(suggest_from_filename(original_name, extension)),
        }
    }

    /// Ask the external service for tags.
    ///
    /// Service failures are returned as errors. An answer that yields no
    /// usable tags falls back to the filename heuristic.
    pub async fn suggest_external(&self, original_name: &str, extension: &str) -> Result<Vec<String>> {
        let client = self
            .client
            .as_ref()
            .ok_or(AppError::SuggestionNotConfigured)?;

        let prompt = render_tag_suggestion_prompt(original_name, extension)
            .map_err(|e| AppError::Internal(format!("Failed to render suggestion prompt: {}", e)))?;

        let response = client.complete(&prompt).await?;

        let mut suggested = tags::normalize(Some(&TagInput::List(parse_json_array(&response))));
        if suggested.is_empty() {
            tracing::info!(
                "External suggestion for '{}' was empty, using filename heuristic",
                original_name
            );
            return Ok(suggest_from_filename(original_name, extension));
        }

        suggested.truncate(MAX_SUGGESTED_TAGS);
        Ok(suggested)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Canned client recording the prompts it receives
    struct StubClient {
        reply: Result<String>,
        prompts: Mutex<Vec<String>>,
    }

    impl StubClient {
        fn replying(text: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(text.to_string()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn failing(status: u16, body: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(AppError::ExternalServiceError {
                    status: Some(status),
                    body: body.to_string(),
                }),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl TagSuggestionClient for StubClient {
        async fn complete(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(AppError::ExternalServiceError { status, body }) => {
                    Err(AppError::ExternalServiceError {
                        status: *status,
                        body: body.clone(),
                    })
                }
                Err(other) => Err(AppError::Internal(other.to_string())),
            }
        }
    }

    #[test]
    fn test_heuristic_drops_versions_and_short_tokens() {
        let tags = suggest_from_filename("Bracket_Mount_v2_FINAL.stl", "stl");
        assert_eq!(tags, vec!["bracket", "mount", "stl"]);
    }

    #[test]
    fn test_heuristic_strips_extension_case_insensitively() {
        let tags = suggest_from_filename("x-Wing.Model.3MF", "3mf");
        assert_eq!(tags, vec!["wing", "model", "3mf"]);
    }

    #[test]
    fn test_heuristic_caps_at_eight() {
        let tags = suggest_from_filename(
            "alpha beta gamma delta epsilon zeta eta theta iota.stl",
            "stl",
        );
        assert_eq!(tags.len(), 8);
        assert_eq!(tags[0], "alpha");
        assert!(!tags.contains(&"stl".to_string()));
    }

    #[test]
    fn test_heuristic_dedups_and_keeps_extension_once() {
        let tags = suggest_from_filename("gear-GEAR-stl.stl", "STL");
        assert_eq!(tags, vec!["gear", "stl"]);
    }

    #[test]
    fn test_heuristic_on_name_without_tokens() {
        assert_eq!(suggest_from_filename("__.stl", "stl"), vec!["stl"]);
        assert_eq!(suggest_from_filename("é.stl", "stl"), vec!["stl"]);
    }

    #[tokio::test]
    async fn test_external_uses_parsed_array() {
        let client = StubClient::replying(
            "Here you go: [\"Wall Mount\", \"bracket\", \"BRACKET\", \"hardware\"]",
        );
        let service = TagSuggestionService::new(Some(client.clone()));

        let tags = service
            .suggest("Bracket_Mount.stl", "stl", SuggestionStrategy::External)
            .await
            .unwrap();
        assert_eq!(tags, vec!["wall mount", "bracket", "hardware"]);

        let prompts = client.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Bracket_Mount.stl"));
    }

    #[tokio::test]
    async fn test_external_truncates_to_eight() {
        let client = StubClient::replying(r#"["a1","a2","a3","a4","a5","a6","a7","a8","a9","a10"]"#);
        let service = TagSuggestionService::new(Some(client));

        let tags = service.suggest_external("x.stl", "stl").await.unwrap();
        assert_eq!(tags.len(), 8);
        assert_eq!(tags[7], "a8");
    }

    #[tokio::test]
    async fn test_external_unparseable_falls_back_to_heuristic() {
        let client = StubClient::replying("Sorry, I cannot help with that.");
        let service = TagSuggestionService::new(Some(client));

        let tags = service
            .suggest_external("Desk_Organizer.3mf", "3mf")
            .await
            .unwrap();
        assert_eq!(tags, vec!["desk", "organizer", "3mf"]);
    }

    #[tokio::test]
    async fn test_external_failure_is_not_swallowed() {
        let service = TagSuggestionService::new(Some(StubClient::failing(503, "overloaded")));

        let result = service
            .suggest("Gear.stl", "stl", SuggestionStrategy::Auto)
            .await;
        match result {
            Err(AppError::ExternalServiceError { status, body }) => {
                assert_eq!(status, Some(503));
                assert_eq!(body, "overloaded");
            }
            other => panic!("expected external service error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_external_without_client_is_not_configured() {
        let service = TagSuggestionService::new(None);

        let result = service
            .suggest("Gear.stl", "stl", SuggestionStrategy::External)
            .await;
        assert!(matches!(result, Err(AppError::SuggestionNotConfigured)));
    }

    #[tokio::test]
    async fn test_auto_and_local_without_client_use_heuristic() {
        let service = TagSuggestionService::new(None);

        for strategy in [SuggestionStrategy::Auto, SuggestionStrategy::Local] {
            let tags = service
                .suggest("Gear_Box.stl", "stl", strategy)
                .await
                .unwrap();
            assert_eq!(tags, vec!["gear", "box", "stl"]);
        }
    }

    #[tokio::test]
    async fn test_local_ignores_configured_client() {
        let client = StubClient::replying(r#"["remote"]"#);
        let service = TagSuggestionService::new(Some(client.clone()));

        let tags = service
            .suggest("Gear.stl", "stl", SuggestionStrategy::Local)
            .await
            .unwrap();
        assert_eq!(tags, vec!["gear", "stl"]);
        assert!(client.prompts.lock().unwrap().is_empty());
    }
}
