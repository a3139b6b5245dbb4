use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub suggestion: SuggestionConfig,
    pub swagger: SwaggerConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    pub max_upload_size: usize,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

/// Location of uploaded model content on disk
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub uploads_dir: PathBuf,
}

/// External text-generation service used by autotag.
///
/// The service counts as configured only when an API key is present.
#[derive(Debug, Clone)]
pub struct SuggestionConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct SwaggerConfig {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if exists, ignore if not found (optional for production)
        if let Err(e) = dotenvy::dotenv() {
            if !e.to_string().contains("not found") {
                eprintln!("Warning: Error loading .env file: {}", e);
            }
        }

        Self::from_vars(&env_var)
    }

    fn from_vars(var: &impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        Ok(Config {
            app: AppConfig::from_vars(var)?,
            database: DatabaseConfig::from_vars(var)?,
            storage: StorageConfig::from_vars(var)?,
            suggestion: SuggestionConfig::from_vars(var)?,
            swagger: SwaggerConfig::from_vars(var)?,
        })
    }
}

fn env_var(key: &str) -> Option<String> {
    env::var(key).ok()
}

impl AppConfig {
    const DEFAULT_MAX_UPLOAD_SIZE: usize = 200 * 1024 * 1024; // 200MB

    fn from_vars(var: &impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let host = var("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = var("PORT")
            .unwrap_or_else(|| "4000".to_string())
            .parse::<u16>()
            .map_err(|e| format!("Invalid PORT: {}", e))?;

        // Parse CORS allowed origins from comma-separated string
        let cors_allowed_origins = var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let max_upload_size = var("MAX_UPLOAD_SIZE")
            .unwrap_or_else(|| Self::DEFAULT_MAX_UPLOAD_SIZE.to_string())
            .parse::<usize>()
            .map_err(|_| "MAX_UPLOAD_SIZE must be a valid number".to_string())?;

        Ok(Self {
            host,
            port,
            cors_allowed_origins,
            max_upload_size,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl DatabaseConfig {
    const DEFAULT_URL: &'static str = "sqlite://data/vault.db";
    const DEFAULT_MAX_CONNECTIONS: u32 = 5;
    const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;

    fn from_vars(var: &impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let url = var("DATABASE_URL").unwrap_or_else(|| Self::DEFAULT_URL.to_string());

        let max_connections = var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|| Self::DEFAULT_MAX_CONNECTIONS.to_string())
            .parse::<u32>()
            .map_err(|_| "DB_MAX_CONNECTIONS must be a valid number".to_string())?;

        let acquire_timeout_secs = var("DB_ACQUIRE_TIMEOUT_SECS")
            .unwrap_or_else(|| Self::DEFAULT_ACQUIRE_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "DB_ACQUIRE_TIMEOUT_SECS must be a valid number".to_string())?;

        Ok(Self {
            url,
            max_connections,
            acquire_timeout_secs,
        })
    }

    /// Single-connection in-memory database, used by tests
    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            acquire_timeout_secs: Self::DEFAULT_ACQUIRE_TIMEOUT_SECS,
        }
    }
}

impl StorageConfig {
    fn from_vars(var: &impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let uploads_dir = var("UPLOADS_DIR").unwrap_or_else(|| "uploads".to_string());
        if uploads_dir.trim().is_empty() {
            return Err("UPLOADS_DIR must not be empty".to_string());
        }

        Ok(Self {
            uploads_dir: PathBuf::from(uploads_dir),
        })
    }
}

impl SuggestionConfig {
    const DEFAULT_BASE_URL: &'static str = "https://api.openai.com/v1";
    const DEFAULT_MODEL: &'static str = "gpt-4o-mini";
    const DEFAULT_TIMEOUT_SECS: u64 = 20;

    fn from_vars(var: &impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        // Only treat the key as present if it is non-empty
        let api_key = var("SUGGESTION_API_KEY").filter(|s| !s.trim().is_empty());

        let base_url = var("SUGGESTION_BASE_URL")
            .unwrap_or_else(|| Self::DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let model = var("SUGGESTION_MODEL").unwrap_or_else(|| Self::DEFAULT_MODEL.to_string());

        let timeout_secs = var("SUGGESTION_TIMEOUT_SECS")
            .unwrap_or_else(|| Self::DEFAULT_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "SUGGESTION_TIMEOUT_SECS must be a valid number".to_string())?;

        if timeout_secs == 0 {
            return Err("SUGGESTION_TIMEOUT_SECS must be greater than zero".to_string());
        }

        Ok(Self {
            api_key,
            base_url,
            model,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

impl SwaggerConfig {
    fn from_vars(var: &impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let title = var("SWAGGER_TITLE").unwrap_or_else(|| "Model Vault API".to_string());
        let version =
            var("SWAGGER_VERSION").unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());
        let description = var("SWAGGER_DESCRIPTION")
            .unwrap_or_else(|| "Local vault for STL/3MF model files".to_string());

        Ok(Self {
            title,
            version,
            description,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_variables() {
        let config = Config::from_vars(&vars(&[])).unwrap();

        assert_eq!(config.app.server_address(), "127.0.0.1:4000");
        assert_eq!(config.app.cors_allowed_origins, vec!["*"]);
        assert_eq!(config.app.max_upload_size, 200 * 1024 * 1024);
        assert_eq!(config.database.url, "sqlite://data/vault.db");
        assert_eq!(config.storage.uploads_dir, PathBuf::from("uploads"));
        assert!(config.suggestion.api_key.is_none());
        assert_eq!(config.suggestion.timeout, Duration::from_secs(20));
        assert_eq!(config.swagger.title, "Model Vault API");
    }

    #[test]
    fn test_overrides_are_parsed() {
        let config = Config::from_vars(&vars(&[
            ("PORT", "8080"),
            ("CORS_ALLOWED_ORIGINS", "http://a.test, ,http://b.test"),
            ("SUGGESTION_API_KEY", "sk-test"),
            ("SUGGESTION_BASE_URL", "http://localhost:11434/v1/"),
            ("SUGGESTION_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();

        assert_eq!(config.app.port, 8080);
        assert_eq!(
            config.app.cors_allowed_origins,
            vec!["http://a.test", "http://b.test"]
        );
        assert_eq!(config.suggestion.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.suggestion.base_url, "http://localhost:11434/v1");
        assert_eq!(config.suggestion.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let error = AppConfig::from_vars(&vars(&[("PORT", "not-a-port")])).unwrap_err();
        assert!(error.contains("Invalid PORT"));

        assert!(AppConfig::from_vars(&vars(&[("PORT", "70000")])).is_err());
    }

    #[test]
    fn test_invalid_numbers_are_rejected() {
        let error =
            AppConfig::from_vars(&vars(&[("MAX_UPLOAD_SIZE", "lots")])).unwrap_err();
        assert!(error.contains("MAX_UPLOAD_SIZE"));

        let error =
            DatabaseConfig::from_vars(&vars(&[("DB_MAX_CONNECTIONS", "-1")])).unwrap_err();
        assert!(error.contains("DB_MAX_CONNECTIONS"));

        let error =
            SuggestionConfig::from_vars(&vars(&[("SUGGESTION_TIMEOUT_SECS", "soon")]))
                .unwrap_err();
        assert!(error.contains("SUGGESTION_TIMEOUT_SECS"));
    }

    #[test]
    fn test_zero_suggestion_timeout_is_rejected() {
        let error = SuggestionConfig::from_vars(&vars(&[("SUGGESTION_TIMEOUT_SECS", "0")]))
            .unwrap_err();
        assert!(error.contains("greater than zero"));
    }

    #[test]
    fn test_blank_api_key_is_not_configured() {
        let config =
            SuggestionConfig::from_vars(&vars(&[("SUGGESTION_API_KEY", "   ")])).unwrap();
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_blank_uploads_dir_is_rejected() {
        assert!(StorageConfig::from_vars(&vars(&[("UPLOADS_DIR", " ")])).is_err());
    }

    #[test]
    fn test_server_address() {
        let app = AppConfig {
            host: "0.0.0.0".to_string(),
            port: 4000,
            cors_allowed_origins: vec!["*".to_string()],
            max_upload_size: 1024,
        };
        assert_eq!(app.server_address(), "0.0.0.0:4000");
    }
}
