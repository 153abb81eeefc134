use std::time::Duration;

use crate::config::Settings;
use crate::credentials::Credentials;
use crate::images_to_text::{GoogleVisionRecognizer, TextRecognizer};
use crate::pipeline::Pipeline;
use crate::text_to_ingredients::{GeminiExtractor, IngredientExtractor};
use crate::ExtractError;

/// Builder for configuring an ingredient extraction [`Pipeline`]
#[derive(Default)]
pub struct PipelineBuilder {
    settings: Option<Settings>,
    credentials: Option<Credentials>,
    recognizer: Option<Box<dyn TextRecognizer>>,
    extractor: Option<Box<dyn IngredientExtractor>>,
    timeout: Option<Duration>,
    model: Option<String>,
}

impl PipelineBuilder {
    /// Use these settings instead of loading `config.toml` and the environment
    ///
    /// # Example
    /// ```
    /// use ingredient_extractor::{Pipeline, Settings};
    ///
    /// let builder = Pipeline::builder().settings(Settings::default());
    /// ```
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Use these credentials instead of resolving them from the secret store
    /// and the environment
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Replace the Google Vision client, e.g. with a fake in tests
    ///
    /// The recognizer is still wrapped in the OCR cache.
    pub fn recognizer(mut self, recognizer: impl TextRecognizer + 'static) -> Self {
        self.recognizer = Some(Box::new(recognizer));
        self
    }

    /// Replace the Gemini client, e.g. with a fake in tests
    pub fn extractor(mut self, extractor: impl IngredientExtractor + 'static) -> Self {
        self.extractor = Some(Box::new(extractor));
        self
    }

    /// Set a timeout for both remote calls
    ///
    /// # Example
    /// ```
    /// use ingredient_extractor::Pipeline;
    /// use std::time::Duration;
    ///
    /// let builder = Pipeline::builder().timeout(Duration::from_secs(30));
    /// ```
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Set the Gemini model name
    ///
    /// # Example
    /// ```
    /// use ingredient_extractor::Pipeline;
    ///
    /// let builder = Pipeline::builder().model("gemini-1.0-pro");
    /// ```
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Build the pipeline
    ///
    /// Settings and credentials are only looked up when one of the two
    /// remote clients has to be created.
    ///
    /// # Errors
    /// Returns `ExtractError` if:
    /// - Settings cannot be loaded
    /// - Credentials are missing or unusable
    /// - An HTTP client cannot be created
    pub async fn build(self) -> Result<Pipeline, ExtractError> {
        let (recognizer, extractor) = match (self.recognizer, self.extractor) {
            (Some(recognizer), Some(extractor)) => (recognizer, extractor),
            (recognizer, extractor) => {
                let mut settings = match self.settings {
                    Some(settings) => settings,
                    None => Settings::load()?,
                };
                if let Some(model) = self.model {
                    if model.trim().is_empty() {
                        return Err(ExtractError::Builder("model name cannot be empty".to_string()));
                    }
                    settings.llm.model = model;
                }
                let timeout = self.timeout.or_else(|| settings.timeout());

                let credentials = match self.credentials {
                    Some(credentials) => credentials,
                    None => Credentials::resolve(&settings)?,
                };

                let recognizer: Box<dyn TextRecognizer> = match recognizer {
                    Some(recognizer) => recognizer,
                    None => Box::new(GoogleVisionRecognizer::new(
                        &settings.ocr,
                        credentials.vision.clone(),
                        timeout,
                    )?),
                };
                let extractor: Box<dyn IngredientExtractor> = match extractor {
                    Some(extractor) => extractor,
                    None => Box::new(GeminiExtractor::new(
                        &settings.llm,
                        credentials.gemini_api_key.clone(),
                        timeout,
                    )?),
                };
                (recognizer, extractor)
            }
        };

        Ok(Pipeline::new(recognizer, extractor))
    }
}
