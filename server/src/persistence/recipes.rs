//! Recipe store: idempotence lookups, the non-transactional write ladder,
//! hydration, and cross-owner cloning.
//!
//! Writes are ordered, not transactional: the recipe row lands first, then
//! ingredients, then steps. A failed child batch is logged and the recipe
//! is kept; the data model tolerates an orphaned parent over orphaned
//! children.

use cocotte_core::fuzzy;
use cocotte_core::types::{ExtractedRecipe, Platform};
use diesel::prelude::*;
use uuid::Uuid;

use crate::api::RecipeWithChildren;
use crate::db::DbConn;
use crate::models::{
    FoodItem, GenerationMode, Ingredient, NewIngredient, NewRecipe, NewStep, Recipe, Step,
};

/// Inputs for a fresh recipe write.
pub struct NewRecipeData<'a> {
    pub user_id: Uuid,
    pub source_url: Option<&'a str>,
    pub platform: Platform,
    pub generation_mode: GenerationMode,
    pub image_url: Option<String>,
    pub recipe: &'a ExtractedRecipe,
}

/// Escape LIKE metacharacters so a URL prefix matches literally.
fn like_prefix_pattern(normalized_url: &str) -> String {
    let escaped = normalized_url
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("{escaped}%")
}

/// Most recent recipe of `owner` whose source URL begins with the
/// normalized URL.
pub fn find_owned_by_source(
    conn: &mut DbConn,
    owner: Uuid,
    normalized_url: &str,
) -> QueryResult<Option<Recipe>> {
    use crate::schema::recipes::dsl::*;

    recipes
        .filter(user_id.eq(owner))
        .filter(source_url.like(like_prefix_pattern(normalized_url)))
        .order(created_at.desc())
        .select(Recipe::as_select())
        .first::<Recipe>(conn)
        .optional()
}

/// Most recent recipe of any owner whose source URL begins with the
/// normalized URL.
pub fn find_any_by_source(
    conn: &mut DbConn,
    normalized_url: &str,
) -> QueryResult<Option<Recipe>> {
    use crate::schema::recipes::dsl::*;

    recipes
        .filter(source_url.like(like_prefix_pattern(normalized_url)))
        .order(created_at.desc())
        .select(Recipe::as_select())
        .first::<Recipe>(conn)
        .optional()
}

/// Full read of a recipe: ingredients ordered by name, steps by order.
pub fn hydrate(conn: &mut DbConn, recipe: Recipe) -> QueryResult<RecipeWithChildren> {
    let recipe_ingredients = {
        use crate::schema::ingredients::dsl::*;
        ingredients
            .filter(recipe_id.eq(recipe.id))
            .order(name.asc())
            .select(Ingredient::as_select())
            .load::<Ingredient>(conn)?
    };

    let recipe_steps = {
        use crate::schema::steps::dsl::*;
        steps
            .filter(recipe_id.eq(recipe.id))
            .order(step_order.asc())
            .select(Step::as_select())
            .load::<Step>(conn)?
    };

    Ok(RecipeWithChildren {
        recipe,
        ingredients: recipe_ingredients,
        steps: recipe_steps,
    })
}

/// Link ingredient names to the master food table by fuzzy match.
/// `None` where nothing clears the acceptance threshold.
pub(crate) fn resolve_food_ids(foods: &[FoodItem], names: &[&str]) -> Vec<Option<Uuid>> {
    names
        .iter()
        .map(|raw_name| {
            fuzzy::best_match(raw_name, foods.iter().map(|f| f.name.as_str()))
                .map(|idx| foods[idx].id)
        })
        .collect()
}

fn to_nullable_list(values: &[String]) -> Option<Vec<Option<String>>> {
    Some(values.iter().cloned().map(Some).collect())
}

/// Insert a recipe with its children. The recipe row is authoritative:
/// child batch failures are logged and the recipe is still returned.
pub fn insert_full(conn: &mut DbConn, data: NewRecipeData<'_>) -> QueryResult<RecipeWithChildren> {
    use crate::schema::recipes;

    let extracted = data.recipe;
    let new_recipe = NewRecipe {
        user_id: data.user_id,
        title: &extracted.title,
        source_url: data.source_url,
        platform: data.platform.as_str(),
        prep_time: extracted.prep_time,
        cook_time: extracted.cook_time,
        total_time: extracted.total_time,
        servings: extracted.servings,
        cuisine_origin: extracted.cuisine_origin.as_deref(),
        meal_type: extracted.meal_type.as_deref(),
        diet_type: to_nullable_list(&extracted.diet_type),
        calories: extracted.calories,
        proteins: extracted.proteins,
        carbs: extracted.carbs,
        fats: extracted.fats,
        equipment: to_nullable_list(&extracted.equipment),
        image_url: data.image_url.as_deref(),
        generation_mode: data.generation_mode.as_str(),
    };

    let recipe: Recipe = diesel::insert_into(recipes::table)
        .values(&new_recipe)
        .returning(Recipe::as_returning())
        .get_result(conn)?;

    insert_ingredients(conn, recipe.id, extracted);
    insert_steps(conn, recipe.id, extracted);

    hydrate(conn, recipe)
}

fn insert_ingredients(conn: &mut DbConn, parent_id: Uuid, extracted: &ExtractedRecipe) {
    use crate::schema::ingredients;

    if extracted.ingredients.is_empty() {
        return;
    }

    let foods = {
        use crate::schema::food_items::dsl::*;
        match food_items.select(FoodItem::as_select()).load::<FoodItem>(conn) {
            Ok(foods) => foods,
            Err(e) => {
                tracing::warn!(error = %e, "food table load failed, inserting unlinked ingredients");
                Vec::new()
            }
        }
    };

    let names: Vec<&str> = extracted.ingredients.iter().map(|i| i.name.as_str()).collect();
    let food_ids = resolve_food_ids(&foods, &names);

    let rows: Vec<NewIngredient> = extracted
        .ingredients
        .iter()
        .zip(food_ids)
        .map(|(ingredient, food_item_id)| NewIngredient {
            recipe_id: parent_id,
            name: ingredient.name.clone(),
            quantity: ingredient.quantity,
            unit: ingredient.unit.clone(),
            food_item_id,
        })
        .collect();

    if let Err(e) = diesel::insert_into(ingredients::table)
        .values(&rows)
        .execute(conn)
    {
        tracing::error!(recipe_id = %parent_id, error = %e, "ingredient batch insert failed");
    }
}

fn insert_steps(conn: &mut DbConn, parent_id: Uuid, extracted: &ExtractedRecipe) {
    use crate::schema::steps;

    if extracted.steps.is_empty() {
        return;
    }

    let rows: Vec<NewStep> = extracted
        .steps
        .iter()
        .map(|step| NewStep {
            recipe_id: parent_id,
            step_order: step.order,
            text: step.text.clone(),
            duration: step.duration,
            temperature: step.temperature,
            ingredients_used: to_nullable_list(&step.ingredients_used),
        })
        .collect();

    if let Err(e) = diesel::insert_into(steps::table).values(&rows).execute(conn) {
        tracing::error!(recipe_id = %parent_id, error = %e, "step batch insert failed");
    }
}

/// Copy a recipe (with children) for a new owner. The clone is a complete,
/// independent row set sharing no ids with the source.
pub fn clone_for_owner(
    conn: &mut DbConn,
    source: &Recipe,
    new_owner: Uuid,
    generation_mode: GenerationMode,
) -> QueryResult<RecipeWithChildren> {
    use crate::schema::recipes;

    let new_recipe = NewRecipe {
        user_id: new_owner,
        title: &source.title,
        source_url: source.source_url.as_deref(),
        platform: &source.platform,
        prep_time: source.prep_time,
        cook_time: source.cook_time,
        total_time: source.total_time,
        servings: source.servings,
        cuisine_origin: source.cuisine_origin.as_deref(),
        meal_type: source.meal_type.as_deref(),
        diet_type: source.diet_type.clone(),
        calories: source.calories,
        proteins: source.proteins,
        carbs: source.carbs,
        fats: source.fats,
        equipment: source.equipment.clone(),
        image_url: source.image_url.as_deref(),
        generation_mode: generation_mode.as_str(),
    };

    let clone: Recipe = diesel::insert_into(recipes::table)
        .values(&new_recipe)
        .returning(Recipe::as_returning())
        .get_result(conn)?;

    clone_children(conn, source.id, clone.id);

    hydrate(conn, clone)
}

fn clone_children(conn: &mut DbConn, source_id: Uuid, clone_id: Uuid) {
    {
        use crate::schema::ingredients::dsl::*;
        let source_rows = ingredients
            .filter(recipe_id.eq(source_id))
            .select(Ingredient::as_select())
            .load::<Ingredient>(conn);
        match source_rows {
            Ok(rows) => {
                let copies: Vec<NewIngredient> = rows
                    .into_iter()
                    .map(|row| NewIngredient {
                        recipe_id: clone_id,
                        name: row.name,
                        quantity: row.quantity,
                        unit: row.unit,
                        food_item_id: row.food_item_id,
                    })
                    .collect();
                if !copies.is_empty() {
                    if let Err(e) = diesel::insert_into(ingredients).values(&copies).execute(conn)
                    {
                        tracing::error!(recipe_id = %clone_id, error = %e, "ingredient clone failed");
                    }
                }
            }
            Err(e) => {
                tracing::error!(recipe_id = %source_id, error = %e, "ingredient read for clone failed");
            }
        }
    }

    {
        use crate::schema::steps::dsl::*;
        let source_rows = steps
            .filter(recipe_id.eq(source_id))
            .select(Step::as_select())
            .load::<Step>(conn);
        match source_rows {
            Ok(rows) => {
                let copies: Vec<NewStep> = rows
                    .into_iter()
                    .map(|row| NewStep {
                        recipe_id: clone_id,
                        step_order: row.step_order,
                        text: row.text,
                        duration: row.duration,
                        temperature: row.temperature,
                        ingredients_used: row.ingredients_used,
                    })
                    .collect();
                if !copies.is_empty() {
                    if let Err(e) = diesel::insert_into(steps).values(&copies).execute(conn) {
                        tracing::error!(recipe_id = %clone_id, error = %e, "step clone failed");
                    }
                }
            }
            Err(e) => {
                tracing::error!(recipe_id = %source_id, error = %e, "step read for clone failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn food(name: &str) -> FoodItem {
        FoodItem {
            id: Uuid::new_v4(),
            name: name.to_string(),
        }
    }

    #[test]
    fn test_like_prefix_pattern_escapes_metacharacters() {
        assert_eq!(
            like_prefix_pattern("https://tiktok.com/@some_chef/video/1"),
            "https://tiktok.com/@some\\_chef/video/1%"
        );
        assert_eq!(like_prefix_pattern("https://a.b/100%"), "https://a.b/100\\%%");
    }

    #[test]
    fn test_resolve_food_ids_links_fuzzy_matches() {
        let foods = vec![food("Tomate"), food("Oignon"), food("Farine de blé")];
        let ids = resolve_food_ids(&foods, &["tomates fraîches", "oignon", "plutonium"]);
        assert_eq!(ids[0], Some(foods[0].id));
        assert_eq!(ids[1], Some(foods[1].id));
        assert_eq!(ids[2], None);
    }

    #[test]
    fn test_resolve_food_ids_with_empty_food_table() {
        let ids = resolve_food_ids(&[], &["tomate"]);
        assert_eq!(ids, vec![None]);
    }

    #[test]
    fn test_to_nullable_list() {
        assert_eq!(
            to_nullable_list(&["a".to_string(), "b".to_string()]),
            Some(vec![Some("a".to_string()), Some("b".to_string())])
        );
        assert_eq!(to_nullable_list(&[]), Some(vec![]));
    }
}
