mod gemini;
mod prompt;
mod response;

pub use gemini::GeminiExtractor;
pub use prompt::{build_prompt, INGREDIENT_EXTRACTION_PROMPT};
pub use response::{parse_ingredient_records, strip_code_fence};

use async_trait::async_trait;

use crate::error::ExtractError;
use crate::model::IngredientRecord;

/// Anything that can find ingredient lists in OCR text.
///
/// Implementations must not cache: the same text may legitimately yield a
/// different answer on the next call (e.g. after a model upgrade).
#[async_trait]
pub trait IngredientExtractor: Send + Sync {
    /// Get the extractor name (e.g., "gemini")
    fn name(&self) -> &str;

    /// Extract one record per ingredient list found in `raw_text`
    async fn extract(&self, raw_text: &str) -> Result<Vec<IngredientRecord>, ExtractError>;
}

#[async_trait]
impl<T: IngredientExtractor + ?Sized> IngredientExtractor for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn extract(&self, raw_text: &str) -> Result<Vec<IngredientRecord>, ExtractError> {
        (**self).extract(raw_text).await
    }
}
