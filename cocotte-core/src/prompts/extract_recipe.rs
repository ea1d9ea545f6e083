//! Extraction prompt: transcript + cleaned caption to structured recipe.

use crate::types::Language;

use super::{language_name, recipe_schema_block};

/// Temperature used for extraction calls.
pub const EXTRACT_TEMPERATURE: f32 = 0.3;

/// Render the extraction prompt for a video transcript and its (possibly
/// empty) cleaned caption.
pub fn render_extract_prompt(transcript: &str, caption: &str, language: Language) -> String {
    let not_recipe_message = match language {
        Language::Fr => "Ce lien ne semble pas pointer vers une recette de cuisine.",
        Language::En => "This link does not appear to point to a cooking recipe.",
    };

    format!(
        r#"You are a culinary assistant. Below are the audio transcript of a short cooking video and the cleaned caption that accompanied it.

Transcript:
{transcript}

Caption:
{caption}

If the content is NOT about cooking a dish, respond with JSON only:
{{"error": "NOT_RECIPE", "message": "{not_recipe_message}"}}

Otherwise extract the recipe. {schema}

Rules:
- Respond with JSON only, no surrounding text or code fences.
- All textual values must be written in {lang_name}.
- Quantities are decimal numbers (write 0.5 for half).
- Only list equipment actually needed by the steps.
- Do not invent ingredients or steps that the video does not support."#,
        transcript = transcript,
        caption = caption,
        not_recipe_message = not_recipe_message,
        schema = recipe_schema_block(language),
        lang_name = language_name(language),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_prompt_includes_inputs() {
        let prompt = render_extract_prompt(
            "melt the butter, add the garlic",
            "Garlic butter pasta",
            Language::En,
        );
        assert!(prompt.contains("melt the butter"));
        assert!(prompt.contains("Garlic butter pasta"));
        assert!(prompt.contains("NOT_RECIPE"));
    }

    #[test]
    fn test_render_prompt_localizes_refusal_message() {
        let prompt = render_extract_prompt("t", "c", Language::Fr);
        assert!(prompt.contains("Ce lien ne semble pas"));
    }
}
