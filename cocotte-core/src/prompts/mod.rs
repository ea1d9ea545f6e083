//! Prompt templates for the extraction and generation flows.

pub mod extract_recipe;
pub mod generate_recipe;

use crate::types::Language;
use crate::vocab;

/// The JSON shape both flows must return, with the closed sets enumerated
/// for the requested language.
pub(crate) fn recipe_schema_block(language: Language) -> String {
    format!(
        r#"Return a single JSON object with exactly these keys (keys in English, textual values in {lang_name}):
{{
  "title": string,
  "prep_time": integer minutes or null,
  "cook_time": integer minutes or null,
  "total_time": integer minutes or null,
  "servings": integer or null,
  "cuisine_origin": one of [{cuisines}] or null,
  "meal_type": one of [{meal_types}] or null,
  "diet_type": array with values from [{diet_types}] (empty array if none apply),
  "calories": number or null,
  "proteins": number or null,
  "carbs": number or null,
  "fats": number or null,
  "equipment": array with values from [{equipment}],
  "ingredients": [{{"name": string, "quantity": decimal number or null, "unit": string or null}}],
  "steps": [{{"order": integer starting at 1, "text": string, "duration": integer minutes or null, "temperature": integer degrees Celsius or null, "ingredients_used": array of ingredient names from this recipe}}]
}}"#,
        lang_name = language_name(language),
        cuisines = quoted_list(vocab::cuisine_origins(language)),
        meal_types = quoted_list(vocab::meal_types(language)),
        diet_types = quoted_list(vocab::diet_types(language)),
        equipment = quoted_list(vocab::equipment(language)),
    )
}

pub(crate) fn language_name(language: Language) -> &'static str {
    match language {
        Language::Fr => "French",
        Language::En => "English",
    }
}

fn quoted_list(values: &[&str]) -> String {
    values
        .iter()
        .map(|v| format!("\"{}\"", v))
        .collect::<Vec<_>>()
        .join(", ")
}
