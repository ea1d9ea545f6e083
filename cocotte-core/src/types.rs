use serde::{Deserialize, Serialize};

/// Video platforms we know how to handle.
///
/// `Generated` is assigned (never matched) when a recipe is produced from
/// user preferences instead of a source video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    TikTok,
    YouTube,
    Instagram,
    Generated,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::TikTok => "tiktok",
            Platform::YouTube => "youtube",
            Platform::Instagram => "instagram",
            Platform::Generated => "generated",
        }
    }

    #[allow(clippy::should_implement_trait)] // Returns Option, not Result
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "tiktok" => Some(Platform::TikTok),
            "youtube" => Some(Platform::YouTube),
            "instagram" => Some(Platform::Instagram),
            "generated" => Some(Platform::Generated),
            _ => None,
        }
    }
}

/// Output language for extracted recipes. Keys stay English; textual values
/// follow this language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Fr,
    En,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Fr => "fr",
            Language::En => "en",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "fr" => Some(Language::Fr),
            "en" => Some(Language::En),
            _ => None,
        }
    }
}

impl Default for Language {
    fn default() -> Self {
        Language::Fr
    }
}

/// Metadata fetched for a source video (oEmbed or Open-Graph scrape).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub author_url: Option<String>,
    pub thumbnail_url: Option<String>,
}

/// A recipe as extracted by the LLM, before persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedRecipe {
    pub title: String,
    /// Minutes.
    pub prep_time: Option<i32>,
    pub cook_time: Option<i32>,
    pub total_time: Option<i32>,
    pub servings: Option<i32>,
    pub cuisine_origin: Option<String>,
    pub meal_type: Option<String>,
    pub diet_type: Vec<String>,
    pub calories: Option<f64>,
    pub proteins: Option<f64>,
    pub carbs: Option<f64>,
    pub fats: Option<f64>,
    pub equipment: Vec<String>,
    pub ingredients: Vec<ExtractedIngredient>,
    pub steps: Vec<ExtractedStep>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedIngredient {
    pub name: String,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedStep {
    /// Dense, starts at 1.
    pub order: i32,
    pub text: String,
    /// Minutes.
    pub duration: Option<i32>,
    /// Degrees Celsius.
    pub temperature: Option<i32>,
    /// Names of ingredients from the same recipe used in this step.
    pub ingredients_used: Vec<String>,
}

/// Truncate a source URL at the first `?`.
///
/// The normalized form is the canonical key for both single-flight and
/// idempotence lookups, so `normalize_url(u) == normalize_url(u + "?x=1")`
/// must hold for every `u` without a query string.
pub fn normalize_url(url: &str) -> &str {
    match url.find('?') {
        Some(idx) => &url[..idx],
        None => url,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_url_strips_query() {
        assert_eq!(
            normalize_url("https://tiktok.com/@c/video/1?x=a&y=b"),
            "https://tiktok.com/@c/video/1"
        );
        assert_eq!(
            normalize_url("https://tiktok.com/@c/video/1"),
            "https://tiktok.com/@c/video/1"
        );
    }

    #[test]
    fn test_normalize_url_is_stable_under_query_changes() {
        let base = "https://www.youtube.com/watch";
        assert_eq!(
            normalize_url(&format!("{base}?v=abc")),
            normalize_url(&format!("{base}?v=abc&t=10s"))
        );
        assert_eq!(normalize_url(base), normalize_url(&format!("{base}?")));
    }

    #[test]
    fn test_platform_round_trip() {
        for platform in [
            Platform::TikTok,
            Platform::YouTube,
            Platform::Instagram,
            Platform::Generated,
        ] {
            assert_eq!(Platform::from_str(platform.as_str()), Some(platform));
        }
        assert_eq!(Platform::from_str("vimeo"), None);
    }

    #[test]
    fn test_language_parsing() {
        assert_eq!(Language::from_str("fr"), Some(Language::Fr));
        assert_eq!(Language::from_str("en"), Some(Language::En));
        assert_eq!(Language::from_str("de"), None);
    }
}
