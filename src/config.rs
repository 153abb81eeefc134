use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Top-level application settings
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// OCR (Google Cloud Vision) settings
    #[serde(default)]
    pub ocr: OcrSettings,
    /// Language model (Google Gemini) settings
    #[serde(default)]
    pub llm: LlmSettings,
    /// Optional request timeout in seconds. Unset leaves timeouts to the HTTP client.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Secret store file consulted before environment variables
    #[serde(default = "default_secrets_file")]
    pub secrets_file: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ocr: OcrSettings::default(),
            llm: LlmSettings::default(),
            timeout_secs: None,
            secrets_file: default_secrets_file(),
        }
    }
}

/// Settings for the text extraction stage
#[derive(Debug, Deserialize, Clone)]
pub struct OcrSettings {
    /// Base URL of the Vision API
    #[serde(default = "default_vision_endpoint")]
    pub endpoint: String,
    /// Vision feature type requested for each image
    #[serde(default = "default_vision_feature")]
    pub feature: String,
    /// Where credentials taken from the secret store are written for the Vision client
    #[serde(default = "default_credentials_artifact")]
    pub credentials_artifact: PathBuf,
    /// OAuth token endpoint used for `authorized_user` and `service_account` credentials
    #[serde(default = "default_token_endpoint")]
    pub token_endpoint: String,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            endpoint: default_vision_endpoint(),
            feature: default_vision_feature(),
            credentials_artifact: default_credentials_artifact(),
            token_endpoint: default_token_endpoint(),
        }
    }
}

/// Settings for the ingredient extraction stage
#[derive(Debug, Deserialize, Clone)]
pub struct LlmSettings {
    /// Model identifier (e.g., "gemini-2.5-flash")
    #[serde(default = "default_model")]
    pub model: String,
    /// Base URL of the Generative Language API
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,
    /// Temperature for generation. Unset uses the model default.
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Maximum tokens to generate. Unset uses the model default.
    #[serde(default)]
    pub max_output_tokens: Option<u32>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_gemini_base_url(),
            temperature: None,
            max_output_tokens: None,
        }
    }
}

// Default value functions
fn default_secrets_file() -> PathBuf {
    PathBuf::from("secrets.toml")
}

fn default_vision_endpoint() -> String {
    "https://vision.googleapis.com".to_string()
}

fn default_vision_feature() -> String {
    "TEXT_DETECTION".to_string()
}

fn default_credentials_artifact() -> PathBuf {
    PathBuf::from("gcp-credentials.json")
}

fn default_token_endpoint() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

impl Settings {
    /// Load settings from file and environment variables
    ///
    /// Settings are loaded with the following priority (highest to lowest):
    /// 1. Environment variables with INGREDIENTS__ prefix
    /// 2. config.toml file in current directory
    /// 3. Default values
    ///
    /// Environment variable format: INGREDIENTS__LLM__MODEL
    pub fn load() -> Result<Self, ConfigError> {
        load_settings()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Load settings from file and environment variables
///
/// Environment variable format: INGREDIENTS__OCR__ENDPOINT
pub fn load_settings() -> Result<Settings, ConfigError> {
    let settings = Config::builder()
        // Optional config file (can be missing)
        .add_source(File::with_name("config").required(false))
        // Use double underscore for nested: INGREDIENTS__LLM__MODEL
        .add_source(
            Environment::with_prefix("INGREDIENTS")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    settings.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let settings = Settings::default();
        assert_eq!(settings.llm.model, "gemini-2.5-flash");
        assert_eq!(settings.ocr.feature, "TEXT_DETECTION");
        assert_eq!(settings.ocr.endpoint, "https://vision.googleapis.com");
        assert_eq!(
            settings.ocr.credentials_artifact,
            PathBuf::from("gcp-credentials.json")
        );
        assert!(settings.timeout().is_none());
    }

    #[test]
    fn test_serde_defaults_match_default_impl() {
        // An empty document must yield the same settings as Default
        let settings: Settings = Config::builder()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(settings.secrets_file, default_secrets_file());
        assert_eq!(settings.llm.base_url, default_gemini_base_url());
        assert!(settings.llm.temperature.is_none());
    }

    #[test]
    fn test_nested_overrides() {
        let settings: Settings = Config::builder()
            .set_override("llm.model", "gemini-1.0-pro")
            .unwrap()
            .set_override("timeout_secs", 15)
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.llm.model, "gemini-1.0-pro");
        assert_eq!(settings.timeout(), Some(Duration::from_secs(15)));
        assert_eq!(settings.ocr.feature, "TEXT_DETECTION");
    }
}
