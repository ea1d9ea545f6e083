use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Whether a recipe was produced on the free tier or by a premium account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    Free,
    Premium,
}

impl GenerationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationMode::Free => "free",
            GenerationMode::Premium => "premium",
        }
    }
}

#[derive(Queryable, Selectable, Debug, Clone, Serialize, ToSchema)]
#[diesel(table_name = crate::schema::recipes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Recipe {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub source_url: Option<String>,
    pub platform: String,
    pub prep_time: Option<i32>,
    pub cook_time: Option<i32>,
    pub total_time: Option<i32>,
    pub servings: Option<i32>,
    pub cuisine_origin: Option<String>,
    pub meal_type: Option<String>,
    pub diet_type: Option<Vec<Option<String>>>,
    pub calories: Option<f64>,
    pub proteins: Option<f64>,
    pub carbs: Option<f64>,
    pub fats: Option<f64>,
    pub equipment: Option<Vec<Option<String>>>,
    pub image_url: Option<String>,
    pub generation_mode: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::recipes)]
pub struct NewRecipe<'a> {
    pub user_id: Uuid,
    pub title: &'a str,
    pub source_url: Option<&'a str>,
    pub platform: &'a str,
    pub prep_time: Option<i32>,
    pub cook_time: Option<i32>,
    pub total_time: Option<i32>,
    pub servings: Option<i32>,
    pub cuisine_origin: Option<&'a str>,
    pub meal_type: Option<&'a str>,
    pub diet_type: Option<Vec<Option<String>>>,
    pub calories: Option<f64>,
    pub proteins: Option<f64>,
    pub carbs: Option<f64>,
    pub fats: Option<f64>,
    pub equipment: Option<Vec<Option<String>>>,
    pub image_url: Option<&'a str>,
    pub generation_mode: &'a str,
}

#[derive(Queryable, Selectable, Debug, Clone, Serialize, ToSchema)]
#[diesel(table_name = crate::schema::ingredients)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Ingredient {
    pub id: Uuid,
    pub recipe_id: Uuid,
    pub name: String,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub food_item_id: Option<Uuid>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::ingredients)]
pub struct NewIngredient {
    pub recipe_id: Uuid,
    pub name: String,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub food_item_id: Option<Uuid>,
}

#[derive(Queryable, Selectable, Debug, Clone, Serialize, ToSchema)]
#[diesel(table_name = crate::schema::steps)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Step {
    pub id: Uuid,
    pub recipe_id: Uuid,
    pub step_order: i32,
    pub text: String,
    pub duration: Option<i32>,
    pub temperature: Option<i32>,
    pub ingredients_used: Option<Vec<Option<String>>>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::steps)]
pub struct NewStep {
    pub recipe_id: Uuid,
    pub step_order: i32,
    pub text: String,
    pub duration: Option<i32>,
    pub temperature: Option<i32>,
    pub ingredients_used: Option<Vec<Option<String>>>,
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::food_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct FoodItem {
    pub id: Uuid,
    pub name: String,
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::profiles)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[allow(dead_code)]
pub struct Profile {
    pub id: Uuid,
    pub email: Option<String>,
    pub is_premium: bool,
    pub free_generations_remaining: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::rate_limit_stats)]
pub struct NewRateLimitStat<'a> {
    pub stat_type: &'a str,
    pub identifier: &'a str,
    pub period_start: DateTime<Utc>,
    pub count: i64,
    pub blocked_until: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_mode_as_str() {
        assert_eq!(GenerationMode::Free.as_str(), "free");
        assert_eq!(GenerationMode::Premium.as_str(), "premium");
    }
}
