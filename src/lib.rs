pub mod builder;
pub mod config;
pub mod credentials;
pub mod error;
pub mod images_to_text;
pub mod model;
pub mod pipeline;
pub mod render;
pub mod text_to_ingredients;

use reqwest::Client;
use std::path::Path;
use std::time::Duration;

pub use builder::PipelineBuilder;
pub use config::{LlmSettings, OcrSettings, Settings};
pub use credentials::{Credentials, VisionCredentials};
pub use error::ExtractError;
pub use images_to_text::{CachedRecognizer, GoogleVisionRecognizer, ImageSource, TextRecognizer};
pub use model::{IngredientRecord, Outcome};
pub use pipeline::{Pipeline, StageResult};
pub use text_to_ingredients::{GeminiExtractor, IngredientExtractor};

/// HTTP client shared by both remote stages.
///
/// Without a timeout, reqwest's own defaults apply.
pub(crate) fn http_client(timeout: Option<Duration>) -> Result<Client, ExtractError> {
    let mut builder = Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    Ok(builder.build()?)
}

/// Run an image file through OCR and ingredient extraction using settings
/// and credentials from the environment
///
/// # Example
/// ```no_run
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let outcome = ingredient_extractor::extract_from_image_file("label.jpg").await?;
/// if let Some(ingredients) = outcome.ingredients() {
///     println!("{} ingredient list(s)", ingredients.len());
/// }
/// # Ok(())
/// # }
/// ```
pub async fn extract_from_image_file(path: impl AsRef<Path>) -> Result<Outcome, ExtractError> {
    let pipeline = Pipeline::builder().build().await?;
    pipeline
        .run_source(ImageSource::Path(path.as_ref().to_path_buf()))
        .await
}
