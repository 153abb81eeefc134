use crate::error::ExtractError;
use crate::model::{IngredientRecord, Outcome};

pub const NO_TEXT_MESSAGE: &str = "No text could be found in the image.";
pub const ANALYSIS_FAILED_MESSAGE: &str =
    "The language model could not analyze the text or returned an error.";
pub const SUCCESS_MESSAGE: &str = "Ingredients extracted successfully!";

const RULE: &str = "---";

/// Pretty JSON array of ingredient records
pub fn render_json(ingredients: &[IngredientRecord]) -> Result<String, ExtractError> {
    Ok(serde_json::to_string_pretty(ingredients)?)
}

/// Human-readable report of one pipeline run
///
/// `show_raw_text` includes the OCR transcription when there is one.
pub fn render_report(outcome: &Outcome, show_raw_text: bool) -> Result<String, ExtractError> {
    let mut out = String::new();
    out.push_str(RULE);
    out.push_str("\nStep 1: Extracting text\n");

    if let Outcome::NoTextFound = outcome {
        out.push_str(NO_TEXT_MESSAGE);
        out.push('\n');
        return Ok(out);
    }
    if let Outcome::OcrFailed { message } = outcome {
        out.push_str(message);
        out.push('\n');
        return Ok(out);
    }

    if let (true, Some(raw_text)) = (show_raw_text, outcome.raw_text()) {
        out.push_str("\nRaw text:\n");
        for line in raw_text.lines() {
            out.push_str("  ");
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');
    }

    out.push_str("Step 2: Analyzing ingredients\n");
    match outcome {
        Outcome::Extracted { ingredients, .. } => {
            out.push_str(SUCCESS_MESSAGE);
            out.push('\n');
            out.push_str(&render_json(ingredients)?);
            out.push('\n');
        }
        Outcome::AnalysisFailed { message, .. } => {
            out.push_str(ANALYSIS_FAILED_MESSAGE);
            out.push('\n');
            out.push_str(message);
            out.push('\n');
        }
        Outcome::NoTextFound | Outcome::OcrFailed { .. } => {}
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_text_report() {
        let report = render_report(&Outcome::NoTextFound, true).unwrap();
        assert!(report.contains(NO_TEXT_MESSAGE));
        assert!(!report.contains("Step 2"));
    }

    #[test]
    fn test_failure_messages_are_distinct() {
        let ocr = render_report(
            &Outcome::OcrFailed {
                message: "Error calling the OCR service: 403".to_string(),
            },
            false,
        )
        .unwrap();
        let analysis = render_report(
            &Outcome::AnalysisFailed {
                raw_text: "Sugar".to_string(),
                message: "Error during ingredient analysis: bad json".to_string(),
            },
            false,
        )
        .unwrap();

        assert!(ocr.contains("403"));
        assert!(!ocr.contains(NO_TEXT_MESSAGE));
        assert!(analysis.contains(ANALYSIS_FAILED_MESSAGE));
        assert!(analysis.contains("bad json"));
        assert!(!analysis.contains("Raw text"));
    }

    #[test]
    fn test_success_report() {
        let outcome = Outcome::Extracted {
            raw_text: "Water, Sugar\nEau, Sucre".to_string(),
            ingredients: vec![
                IngredientRecord::new("Water, Sugar", "en"),
                IngredientRecord::new("Eau, Sucre", "fr"),
            ],
        };
        let report = render_report(&outcome, true).unwrap();

        assert!(report.contains("  Water, Sugar\n  Eau, Sucre\n"));
        assert!(report.contains(SUCCESS_MESSAGE));
        assert!(report.contains("\"lang\": \"fr\""));
    }

    #[test]
    fn test_render_json() {
        let json = render_json(&[IngredientRecord::new("Sel", "fr")]).unwrap();
        let parsed: Vec<IngredientRecord> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, vec![IngredientRecord::new("Sel", "fr")]);
    }
}
