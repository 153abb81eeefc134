/// The instruction sent ahead of every OCR text.
///
/// Loaded from `prompt.txt` at compile time. It is always English,
/// whatever language the label is printed in.
pub const INGREDIENT_EXTRACTION_PROMPT: &str = include_str!("prompt.txt");

/// Combine the fixed instruction and the OCR text into a single prompt
pub fn build_prompt(raw_text: &str) -> String {
    format!("{}\n\n{}", INGREDIENT_EXTRACTION_PROMPT.trim_end(), raw_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_is_embedded() {
        assert!(!INGREDIENT_EXTRACTION_PROMPT.is_empty());
        assert!(INGREDIENT_EXTRACTION_PROMPT.contains("\"text\""));
        assert!(INGREDIENT_EXTRACTION_PROMPT.contains("\"lang\""));
        assert!(INGREDIENT_EXTRACTION_PROMPT.contains("must not alter the original text"));
    }

    #[test]
    fn test_build_prompt_appends_text_verbatim() {
        let raw = "Water, Sugar, Salt.\nEau, Sucre, Sel.";
        let prompt = build_prompt(raw);
        assert!(prompt.starts_with("Extract ingredient lists"));
        assert!(prompt.ends_with(&format!("JSON list.\n\n{}", raw)));
    }
}
