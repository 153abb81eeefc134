use thiserror::Error;

/// Errors that can occur while extracting ingredients from an image
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Transport-level failure talking to a remote service
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The OCR service rejected the request or reported an error
    #[error("OCR service error: {0}")]
    Ocr(String),

    /// The language model service rejected the request or reported an error
    #[error("Language model error: {0}")]
    Llm(String),

    /// The language model answered with something that is not an ingredient array
    #[error("Malformed language model response: {0}")]
    MalformedResponse(String),

    /// Required credentials were found in neither the secret store nor the environment
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    /// A credentials document could not be used
    #[error("Invalid credentials: {0}")]
    Credentials(String),

    /// The submitted image cannot be accepted
    #[error("Unsupported image: {0}")]
    UnsupportedImage(String),

    /// Builder configuration error
    #[error("Builder error: {0}")]
    Builder(String),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl ExtractError {
    /// Whether the error comes from setup (settings, credentials, HTTP client)
    /// rather than from processing an image.
    ///
    /// The binary exits with a distinct status and a configuration hint for these.
    pub fn is_startup_error(&self) -> bool {
        matches!(
            self,
            ExtractError::MissingCredentials(_)
                | ExtractError::Credentials(_)
                | ExtractError::Config(_)
                | ExtractError::Builder(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startup_errors() {
        assert!(ExtractError::MissingCredentials("GEMINI_API_KEY".into()).is_startup_error());
        assert!(ExtractError::Credentials("bad".into()).is_startup_error());
        assert!(!ExtractError::Ocr("quota".into()).is_startup_error());
        assert!(!ExtractError::MalformedResponse("not json".into()).is_startup_error());
    }

    #[test]
    fn test_display_includes_detail() {
        let err = ExtractError::Llm("Google Gemini API error (429): quota".into());
        assert_eq!(
            err.to_string(),
            "Language model error: Google Gemini API error (429): quota"
        );
    }
}
