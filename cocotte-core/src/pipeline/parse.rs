//! Parsing and normalization of LLM recipe payloads.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::PipelineError;
use crate::types::{ExtractedIngredient, ExtractedRecipe, ExtractedStep, Language};
use crate::vocab;

/// Error marker the LLM returns for non-culinary content.
pub const NOT_RECIPE: &str = "NOT_RECIPE";

/// Strip a surrounding Markdown code fence, if any. Providers occasionally
/// wrap JSON in ```json ... ``` despite instructions.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the language tag on the opening fence line.
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Raw payload shape: either `{error, message}` or a recipe object.
/// Numeric fields tolerate floats and numeric strings; models are sloppy.
#[derive(Debug, Deserialize)]
pub struct LlmRecipePayload {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_i32")]
    pub prep_time: Option<i32>,
    #[serde(default, deserialize_with = "lenient_i32")]
    pub cook_time: Option<i32>,
    #[serde(default, deserialize_with = "lenient_i32")]
    pub total_time: Option<i32>,
    #[serde(default, deserialize_with = "lenient_i32")]
    pub servings: Option<i32>,
    #[serde(default)]
    pub cuisine_origin: Option<String>,
    #[serde(default)]
    pub meal_type: Option<String>,
    #[serde(default)]
    pub diet_type: Option<Value>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub calories: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub proteins: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub carbs: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub fats: Option<f64>,
    #[serde(default)]
    pub equipment: Vec<String>,
    #[serde(default)]
    pub ingredients: Vec<PayloadIngredient>,
    #[serde(default)]
    pub steps: Vec<PayloadStep>,
}

#[derive(Debug, Deserialize)]
pub struct PayloadIngredient {
    pub name: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PayloadStep {
    #[serde(default, deserialize_with = "lenient_i32")]
    pub order: Option<i32>,
    pub text: String,
    #[serde(default, deserialize_with = "lenient_i32")]
    pub duration: Option<i32>,
    #[serde(default, deserialize_with = "lenient_i32")]
    pub temperature: Option<i32>,
    #[serde(default)]
    pub ingredients_used: Vec<String>,
}

fn lenient_i32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i32>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(coerce_i32))
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(coerce_f64))
}

fn coerce_i32(value: &Value) -> Option<i32> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64))
            .and_then(|i| i32::try_from(i).ok()),
        Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f.round() as i32),
        _ => None,
    }
}

fn coerce_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// `diet_type` arrives as a string, a list, or nothing; always a list here.
fn coerce_string_list(value: Option<Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s],
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) if !s.trim().is_empty() => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Parse a raw LLM response into a normalized [`ExtractedRecipe`].
///
/// Translates the `NOT_RECIPE` verdict, coerces `diet_type` to a list,
/// restricts `equipment` to the per-language vocabulary, renumbers steps
/// densely from 1, and drops `ingredients_used` entries that name no
/// ingredient of the recipe.
pub fn parse_recipe_payload(
    raw: &str,
    language: Language,
) -> Result<ExtractedRecipe, PipelineError> {
    let json = strip_code_fences(raw);
    let payload: LlmRecipePayload = serde_json::from_str(json)
        .map_err(|e| PipelineError::InvalidPayload(format!("not valid JSON: {}", e)))?;

    if let Some(error) = payload.error {
        if error == NOT_RECIPE {
            let message = payload.message.unwrap_or_else(|| default_not_recipe(language));
            return Err(PipelineError::NotRecipe { message });
        }
        return Err(PipelineError::InvalidPayload(format!(
            "unexpected error marker: {}",
            error
        )));
    }

    let title = payload
        .title
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| PipelineError::InvalidPayload("missing title".to_string()))?;

    let ingredients: Vec<ExtractedIngredient> = payload
        .ingredients
        .into_iter()
        .filter(|i| !i.name.trim().is_empty())
        .map(|i| ExtractedIngredient {
            name: i.name.trim().to_string(),
            quantity: i.quantity,
            unit: i.unit.filter(|u| !u.trim().is_empty()),
        })
        .collect();

    let ingredient_names: Vec<&str> = ingredients.iter().map(|i| i.name.as_str()).collect();

    let mut steps: Vec<PayloadStep> = payload.steps;
    steps.sort_by_key(|s| s.order.unwrap_or(i32::MAX));
    let steps: Vec<ExtractedStep> = steps
        .into_iter()
        .filter(|s| !s.text.trim().is_empty())
        .enumerate()
        .map(|(idx, s)| ExtractedStep {
            order: idx as i32 + 1,
            text: s.text.trim().to_string(),
            duration: s.duration,
            temperature: s.temperature,
            ingredients_used: s
                .ingredients_used
                .into_iter()
                .filter(|name| {
                    ingredient_names
                        .iter()
                        .any(|known| known.eq_ignore_ascii_case(name.trim()))
                })
                .collect(),
        })
        .collect();

    Ok(ExtractedRecipe {
        title: title.trim().to_string(),
        prep_time: payload.prep_time,
        cook_time: payload.cook_time,
        total_time: payload.total_time,
        servings: payload.servings,
        cuisine_origin: payload.cuisine_origin.filter(|c| !c.trim().is_empty()),
        meal_type: payload.meal_type.filter(|m| !m.trim().is_empty()),
        diet_type: coerce_string_list(payload.diet_type),
        calories: payload.calories,
        proteins: payload.proteins,
        carbs: payload.carbs,
        fats: payload.fats,
        equipment: vocab::retain_known(vocab::equipment(language), payload.equipment),
        ingredients,
        steps,
    })
}

fn default_not_recipe(language: Language) -> String {
    match language {
        Language::Fr => "Ce lien ne semble pas pointer vers une recette de cuisine.".to_string(),
        Language::En => "This link does not appear to point to a cooking recipe.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fences_variants() {
        assert_eq!(strip_code_fences("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  {\"a\":1}  "), "{\"a\":1}");
    }

    #[test]
    fn test_not_recipe_verdict_is_translated() {
        let raw = r#"{"error": "NOT_RECIPE", "message": "Ce lien ne parle pas de cuisine."}"#;
        let err = parse_recipe_payload(raw, Language::Fr).unwrap_err();
        match err {
            PipelineError::NotRecipe { message } => {
                assert_eq!(message, "Ce lien ne parle pas de cuisine.")
            }
            other => panic!("expected NotRecipe, got {other:?}"),
        }
    }

    #[test]
    fn test_diet_type_string_is_coerced_to_list() {
        let raw = r#"{"title": "Salade", "diet_type": "végétarien"}"#;
        let recipe = parse_recipe_payload(raw, Language::Fr).unwrap();
        assert_eq!(recipe.diet_type, vec!["végétarien"]);
    }

    #[test]
    fn test_diet_type_defaults_to_empty_list() {
        let raw = r#"{"title": "Steak frites", "diet_type": null}"#;
        let recipe = parse_recipe_payload(raw, Language::Fr).unwrap();
        assert!(recipe.diet_type.is_empty());
    }

    #[test]
    fn test_equipment_restricted_to_vocabulary() {
        let raw = r#"{"title": "Gratin", "equipment": ["four", "soudure laser", "mixeur"]}"#;
        let recipe = parse_recipe_payload(raw, Language::Fr).unwrap();
        assert_eq!(recipe.equipment, vec!["four", "mixeur"]);
    }

    #[test]
    fn test_steps_are_renumbered_densely() {
        let raw = r#"{
            "title": "Pancakes",
            "ingredients": [{"name": "flour"}, {"name": "milk"}],
            "steps": [
                {"order": 10, "text": "Mix", "ingredients_used": ["flour", "milk"]},
                {"order": 3, "text": "Rest", "ingredients_used": []},
                {"order": 20, "text": "Cook", "ingredients_used": ["unknown thing"]}
            ]
        }"#;
        let recipe = parse_recipe_payload(raw, Language::En).unwrap();
        let orders: Vec<i32> = recipe.steps.iter().map(|s| s.order).collect();
        assert_eq!(orders, vec![1, 2, 3]);
        assert_eq!(recipe.steps[0].text, "Rest");
        // Unknown ingredient references are dropped.
        assert!(recipe.steps[2].ingredients_used.is_empty());
    }

    #[test]
    fn test_numeric_strings_are_tolerated() {
        let raw = r#"{"title": "Soup", "prep_time": "15", "calories": "320.5", "servings": 4.0}"#;
        let recipe = parse_recipe_payload(raw, Language::En).unwrap();
        assert_eq!(recipe.prep_time, Some(15));
        assert_eq!(recipe.calories, Some(320.5));
        assert_eq!(recipe.servings, Some(4));
    }

    #[test]
    fn test_missing_title_is_invalid() {
        let err = parse_recipe_payload(r#"{"steps": []}"#, Language::En).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidPayload(_)));
    }

    #[test]
    fn test_garbage_is_invalid() {
        let err = parse_recipe_payload("the model rambled here", Language::En).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidPayload(_)));
    }
}
