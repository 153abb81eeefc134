use log::{debug, error, info};

use crate::builder::PipelineBuilder;
use crate::error::ExtractError;
use crate::images_to_text::{CachedRecognizer, ImageSource, TextRecognizer};
use crate::model::{IngredientRecord, Outcome};
use crate::text_to_ingredients::IngredientExtractor;

/// What a stage produced once its errors have been turned into messages
#[derive(Debug, Clone, PartialEq)]
pub enum StageResult<T> {
    /// The stage produced a value
    Present(T),
    /// The stage ran fine but found nothing
    Absent,
    /// The remote call failed; `message` is meant for the user
    Failed { message: String },
}

/// OCR followed by ingredient extraction.
///
/// Only the OCR stage is memoized. Every call to the ingredient stage goes
/// to the language model.
pub struct Pipeline {
    recognizer: CachedRecognizer<Box<dyn TextRecognizer>>,
    extractor: Box<dyn IngredientExtractor>,
}

impl Pipeline {
    pub fn new(
        recognizer: Box<dyn TextRecognizer>,
        extractor: Box<dyn IngredientExtractor>,
    ) -> Self {
        Pipeline {
            recognizer: CachedRecognizer::new(recognizer),
            extractor,
        }
    }

    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// Number of images whose OCR result is memoized
    pub fn cached_images(&self) -> usize {
        self.recognizer.len()
    }

    /// Text extraction stage. Never fails; errors become a message.
    pub async fn extract_text(&self, image: &[u8]) -> StageResult<String> {
        match self.recognizer.recognize(image).await {
            Ok(Some(text)) => StageResult::Present(text),
            Ok(None) => StageResult::Absent,
            Err(e) => {
                error!("OCR with {} failed: {}", self.recognizer.name(), e);
                StageResult::Failed {
                    message: format!("Error calling the OCR service: {}", e),
                }
            }
        }
    }

    /// Ingredient extraction stage. Never fails; errors become a message.
    ///
    /// An empty array from the model is reported as `Absent`.
    pub async fn extract_ingredients(&self, raw_text: &str) -> StageResult<Vec<IngredientRecord>> {
        match self.extractor.extract(raw_text).await {
            Ok(records) if records.is_empty() => StageResult::Absent,
            Ok(records) => StageResult::Present(records),
            Err(e) => {
                error!("Analysis with {} failed: {}", self.extractor.name(), e);
                StageResult::Failed {
                    message: format!("Error during ingredient analysis: {}", e),
                }
            }
        }
    }

    /// Run both stages on one image.
    ///
    /// The ingredient stage only runs when OCR found text.
    pub async fn run(&self, image: &[u8]) -> Outcome {
        info!("Step 1: extracting text with {}", self.recognizer.name());
        let raw_text = match self.extract_text(image).await {
            StageResult::Present(text) => text,
            StageResult::Absent => {
                info!("No text found in image; skipping analysis");
                return Outcome::NoTextFound;
            }
            StageResult::Failed { message } => return Outcome::OcrFailed { message },
        };
        debug!("OCR text: {} characters", raw_text.len());

        info!("Step 2: analyzing ingredients with {}", self.extractor.name());
        match self.extract_ingredients(&raw_text).await {
            StageResult::Present(ingredients) => {
                info!("Extracted {} ingredient list(s)", ingredients.len());
                Outcome::Extracted {
                    raw_text,
                    ingredients,
                }
            }
            StageResult::Absent => Outcome::AnalysisFailed {
                raw_text,
                message: "No ingredient list was found in the text".to_string(),
            },
            StageResult::Failed { message } => Outcome::AnalysisFailed { raw_text, message },
        }
    }

    /// Load an image and run both stages on it
    ///
    /// Only reading the image can fail here; remote failures are part of the
    /// returned [`Outcome`].
    pub async fn run_source(&self, source: ImageSource) -> Result<Outcome, ExtractError> {
        debug!("Processing image {}", source.describe());
        let image = source.load().await?;
        Ok(self.run(&image).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FixedRecognizer(Result<Option<&'static str>, &'static str>);

    #[async_trait]
    impl TextRecognizer for FixedRecognizer {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn recognize(&self, _image: &[u8]) -> Result<Option<String>, ExtractError> {
            match self.0 {
                Ok(text) => Ok(text.map(str::to_string)),
                Err(e) => Err(ExtractError::Ocr(e.to_string())),
            }
        }
    }

    struct CountingExtractor {
        calls: Arc<AtomicUsize>,
        answer: Result<Vec<IngredientRecord>, &'static str>,
    }

    #[async_trait]
    impl IngredientExtractor for CountingExtractor {
        fn name(&self) -> &str {
            "counting"
        }

        async fn extract(&self, _raw_text: &str) -> Result<Vec<IngredientRecord>, ExtractError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer
                .clone()
                .map_err(|e| ExtractError::MalformedResponse(e.to_string()))
        }
    }

    fn pipeline(
        ocr: Result<Option<&'static str>, &'static str>,
        answer: Result<Vec<IngredientRecord>, &'static str>,
    ) -> (Pipeline, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let pipeline = Pipeline::new(
            Box::new(FixedRecognizer(ocr)),
            Box::new(CountingExtractor {
                calls: calls.clone(),
                answer,
            }),
        );
        (pipeline, calls)
    }

    #[tokio::test]
    async fn test_no_text_skips_analysis() {
        let (pipeline, calls) = pipeline(Ok(None), Ok(vec![]));
        assert_eq!(pipeline.run(b"img").await, Outcome::NoTextFound);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_ocr_failure_skips_analysis() {
        let (pipeline, calls) = pipeline(Err("quota exceeded"), Ok(vec![]));
        match pipeline.run(b"img").await {
            Outcome::OcrFailed { message } => assert!(message.contains("quota exceeded")),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_success() {
        let records = vec![IngredientRecord::new("Sugar, Salt", "en")];
        let (pipeline, _) = pipeline(Ok(Some("Sugar, Salt")), Ok(records.clone()));
        assert_eq!(
            pipeline.run(b"img").await,
            Outcome::Extracted {
                raw_text: "Sugar, Salt".to_string(),
                ingredients: records,
            }
        );
    }

    #[tokio::test]
    async fn test_malformed_answer_is_analysis_failure() {
        let (pipeline, _) = pipeline(Ok(Some("Sugar")), Err("not json"));
        match pipeline.run(b"img").await {
            Outcome::AnalysisFailed { raw_text, message } => {
                assert_eq!(raw_text, "Sugar");
                assert!(message.contains("not json"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_answer_is_analysis_failure() {
        let (pipeline, _) = pipeline(Ok(Some("Sugar")), Ok(vec![]));
        assert!(matches!(
            pipeline.run(b"img").await,
            Outcome::AnalysisFailed { .. }
        ));
    }

    #[tokio::test]
    async fn test_ocr_cached_but_analysis_repeated() {
        let (pipeline, calls) = pipeline(
            Ok(Some("Sugar")),
            Ok(vec![IngredientRecord::new("Sugar", "en")]),
        );

        pipeline.run(b"same image").await;
        pipeline.run(b"same image").await;

        assert_eq!(pipeline.cached_images(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_run_source_rejects_bad_extension() {
        let (pipeline, _) = pipeline(Ok(Some("Sugar")), Ok(vec![]));
        let result = pipeline
            .run_source(ImageSource::Path("label.bmp".into()))
            .await;
        assert!(matches!(result, Err(ExtractError::UnsupportedImage(_))));
    }
}
