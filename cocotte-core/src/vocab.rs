//! Closed vocabularies, one set per language.
//!
//! The LLM prompts enumerate these sets, ingress validation checks request
//! fields against them, and pipeline normalization drops anything outside
//! them. Membership checks are case-insensitive.

use crate::types::Language;

pub fn meal_types(language: Language) -> &'static [&'static str] {
    match language {
        Language::En => &["breakfast", "lunch", "dinner", "snack", "dessert", "drink"],
        Language::Fr => &[
            "petit-déjeuner",
            "déjeuner",
            "dîner",
            "collation",
            "dessert",
            "boisson",
        ],
    }
}

pub fn diet_types(language: Language) -> &'static [&'static str] {
    match language {
        Language::En => &[
            "vegetarian",
            "vegan",
            "gluten-free",
            "lactose-free",
            "pescatarian",
            "halal",
            "kosher",
        ],
        Language::Fr => &[
            "végétarien",
            "végétalien",
            "sans gluten",
            "sans lactose",
            "pescétarien",
            "halal",
            "casher",
        ],
    }
}

pub fn cuisine_origins(language: Language) -> &'static [&'static str] {
    match language {
        Language::En => &[
            "french",
            "italian",
            "spanish",
            "greek",
            "mediterranean",
            "american",
            "mexican",
            "indian",
            "chinese",
            "japanese",
            "korean",
            "thai",
            "vietnamese",
            "middle-eastern",
            "north-african",
            "african",
            "other",
        ],
        Language::Fr => &[
            "française",
            "italienne",
            "espagnole",
            "grecque",
            "méditerranéenne",
            "américaine",
            "mexicaine",
            "indienne",
            "chinoise",
            "japonaise",
            "coréenne",
            "thaïlandaise",
            "vietnamienne",
            "moyen-orientale",
            "maghrébine",
            "africaine",
            "autre",
        ],
    }
}

pub fn equipment(language: Language) -> &'static [&'static str] {
    match language {
        Language::En => &[
            "oven",
            "stovetop",
            "microwave",
            "blender",
            "food processor",
            "stand mixer",
            "hand mixer",
            "air fryer",
            "barbecue",
            "rice cooker",
            "pressure cooker",
            "slow cooker",
            "no-cook",
        ],
        Language::Fr => &[
            "four",
            "plaque de cuisson",
            "micro-ondes",
            "mixeur",
            "robot de cuisine",
            "batteur sur socle",
            "batteur à main",
            "friteuse à air",
            "barbecue",
            "cuiseur à riz",
            "autocuiseur",
            "mijoteuse",
            "sans cuisson",
        ],
    }
}

/// Case-insensitive membership test against a closed set.
pub fn contains(set: &[&str], value: &str) -> bool {
    let value = value.trim();
    set.iter().any(|member| member.eq_ignore_ascii_case(value))
}

/// Keep only the values that belong to the closed set, preserving order.
pub fn retain_known(set: &[&str], values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .filter(|v| contains(set, v))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_is_case_insensitive() {
        assert!(contains(meal_types(Language::En), "Dinner"));
        assert!(contains(equipment(Language::Fr), "Four"));
        assert!(!contains(meal_types(Language::En), "brunch"));
    }

    #[test]
    fn test_retain_known_filters_unknown_values() {
        let filtered = retain_known(
            equipment(Language::En),
            vec![
                "oven".to_string(),
                "laser cutter".to_string(),
                "blender".to_string(),
            ],
        );
        assert_eq!(filtered, vec!["oven", "blender"]);
    }

    #[test]
    fn test_vocabularies_are_parallel_across_languages() {
        assert_eq!(
            meal_types(Language::En).len(),
            meal_types(Language::Fr).len()
        );
        assert_eq!(
            diet_types(Language::En).len(),
            diet_types(Language::Fr).len()
        );
        assert_eq!(
            equipment(Language::En).len(),
            equipment(Language::Fr).len()
        );
    }
}
