use serde::{Deserialize, Serialize};

/// One ingredient list found in the OCR text, tagged with its language
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientRecord {
    /// The ingredient list, as it appears in the OCR text
    pub text: String,
    /// Detected language of the list (e.g. "en", "fr")
    pub lang: String,
}

impl IngredientRecord {
    pub fn new(text: impl Into<String>, lang: impl Into<String>) -> Self {
        IngredientRecord {
            text: text.into(),
            lang: lang.into(),
        }
    }

    /// Whether `text` occurs unaltered inside `source`.
    ///
    /// The model is asked to copy ingredient lists verbatim, but nothing
    /// forces it to.
    pub fn is_verbatim_in(&self, source: &str) -> bool {
        !self.text.is_empty() && source.contains(&self.text)
    }
}

/// Final result of running one image through the pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// OCR succeeded but found no text; the language model was not called
    NoTextFound,
    /// The OCR call failed
    OcrFailed { message: String },
    /// Text was found but the language model call or its parsing failed
    AnalysisFailed { raw_text: String, message: String },
    /// Ingredient lists were extracted
    Extracted {
        raw_text: String,
        ingredients: Vec<IngredientRecord>,
    },
}

impl Outcome {
    /// The OCR text, when the first stage produced any
    pub fn raw_text(&self) -> Option<&str> {
        match self {
            Outcome::AnalysisFailed { raw_text, .. } | Outcome::Extracted { raw_text, .. } => {
                Some(raw_text)
            }
            Outcome::NoTextFound | Outcome::OcrFailed { .. } => None,
        }
    }

    pub fn ingredients(&self) -> Option<&[IngredientRecord]> {
        match self {
            Outcome::Extracted { ingredients, .. } => Some(ingredients),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Extracted { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbatim_check() {
        let source = "Water, Sugar, Salt. Eau, Sucre, Sel.";
        assert!(IngredientRecord::new("Eau, Sucre, Sel.", "fr").is_verbatim_in(source));
        assert!(!IngredientRecord::new("Water, sugar, salt", "en").is_verbatim_in(source));
        assert!(!IngredientRecord::new("", "en").is_verbatim_in(source));
    }

    #[test]
    fn test_record_serializes_with_two_fields() {
        let record = IngredientRecord::new("Water, Sugar, Salt.", "en");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"text": "Water, Sugar, Salt.", "lang": "en"})
        );
    }

    #[test]
    fn test_outcome_accessors() {
        let outcome = Outcome::AnalysisFailed {
            raw_text: "Sugar".to_string(),
            message: "boom".to_string(),
        };
        assert_eq!(outcome.raw_text(), Some("Sugar"));
        assert!(outcome.ingredients().is_none());
        assert!(!outcome.is_success());
        assert_eq!(Outcome::NoTextFound.raw_text(), None);
    }
}
