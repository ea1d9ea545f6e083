//! Generation prompt: user preferences to a real, existing recipe, plus the
//! dish image prompt.

use crate::types::Language;

use super::{language_name, recipe_schema_block};

/// Temperature used for preference-based generation.
pub const GENERATE_TEMPERATURE: f32 = 0.7;

/// Inputs to the generation prompt, already filtered against the closed
/// vocabularies.
#[derive(Debug, Clone, Default)]
pub struct GenerationPreferences {
    pub meal_type: Option<String>,
    pub diet_types: Vec<String>,
    pub equipment: Vec<String>,
    pub ingredients: Vec<String>,
}

/// Render the generation prompt from validated preferences.
pub fn render_generate_prompt(preferences: &GenerationPreferences, language: Language) -> String {
    let meal_type = preferences.meal_type.as_deref().unwrap_or("any");
    let diet_types = join_or(&preferences.diet_types, "none");
    let equipment = join_or(&preferences.equipment, "any common kitchen equipment");
    let ingredients = join_or(&preferences.ingredients, "any");

    format!(
        r#"You are a culinary assistant. Propose ONE real, existing recipe matching these preferences:

- Meal type: {meal_type}
- Dietary constraints: {diet_types}
- Available equipment: {equipment}
- Ingredients to build around: {ingredients}

Rules:
- The recipe must be a real, established dish. Never invent a fantasy recipe.
- Ignore any listed ingredient that is inconsistent with the dietary constraints.
- Respond with JSON only, no surrounding text or code fences.
- All textual values must be written in {lang_name}.

{schema}"#,
        meal_type = meal_type,
        diet_types = diet_types,
        equipment = equipment,
        ingredients = ingredients,
        lang_name = language_name(language),
        schema = recipe_schema_block(language),
    )
}

/// Render the dish-image prompt for the generated recipe title.
pub fn render_image_prompt(title: &str) -> String {
    format!(
        "Professional food photography of {title}, plated on a neutral ceramic dish, \
         natural light, shallow depth of field, square composition, no text, no people."
    )
}

fn join_or(values: &[String], fallback: &str) -> String {
    if values.is_empty() {
        fallback.to_string()
    } else {
        values.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_generate_prompt_lists_preferences() {
        let preferences = GenerationPreferences {
            meal_type: Some("dinner".to_string()),
            diet_types: vec!["vegan".to_string()],
            equipment: vec!["oven".to_string()],
            ingredients: vec!["chickpeas".to_string(), "spinach".to_string()],
        };
        let prompt = render_generate_prompt(&preferences, Language::En);
        assert!(prompt.contains("Meal type: dinner"));
        assert!(prompt.contains("vegan"));
        assert!(prompt.contains("chickpeas, spinach"));
        assert!(prompt.contains("real, established dish"));
    }

    #[test]
    fn test_render_generate_prompt_defaults_for_empty_inputs() {
        let prompt = render_generate_prompt(&GenerationPreferences::default(), Language::En);
        assert!(prompt.contains("Meal type: any"));
        assert!(prompt.contains("Dietary constraints: none"));
    }

    #[test]
    fn test_render_image_prompt_mentions_title() {
        let prompt = render_image_prompt("Ratatouille");
        assert!(prompt.contains("Ratatouille"));
        assert!(prompt.contains("square"));
    }
}
