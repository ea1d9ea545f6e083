diesel::table! {
    food_items (id) {
        id -> Uuid,
        #[max_length = 255]
        name -> Varchar,
    }
}

diesel::table! {
    ingredients (id) {
        id -> Uuid,
        recipe_id -> Uuid,
        #[max_length = 255]
        name -> Varchar,
        quantity -> Nullable<Float8>,
        #[max_length = 64]
        unit -> Nullable<Varchar>,
        food_item_id -> Nullable<Uuid>,
    }
}

diesel::table! {
    profiles (id) {
        id -> Uuid,
        #[max_length = 255]
        email -> Nullable<Varchar>,
        is_premium -> Bool,
        free_generations_remaining -> Int4,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    rate_limit_stats (id) {
        id -> Uuid,
        #[max_length = 32]
        stat_type -> Varchar,
        #[max_length = 255]
        identifier -> Varchar,
        period_start -> Timestamptz,
        count -> Int8,
        blocked_until -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    recipes (id) {
        id -> Uuid,
        user_id -> Uuid,
        #[max_length = 512]
        title -> Varchar,
        #[max_length = 2048]
        source_url -> Nullable<Varchar>,
        #[max_length = 32]
        platform -> Varchar,
        prep_time -> Nullable<Int4>,
        cook_time -> Nullable<Int4>,
        total_time -> Nullable<Int4>,
        servings -> Nullable<Int4>,
        #[max_length = 64]
        cuisine_origin -> Nullable<Varchar>,
        #[max_length = 64]
        meal_type -> Nullable<Varchar>,
        diet_type -> Nullable<Array<Nullable<Text>>>,
        calories -> Nullable<Float8>,
        proteins -> Nullable<Float8>,
        carbs -> Nullable<Float8>,
        fats -> Nullable<Float8>,
        equipment -> Nullable<Array<Nullable<Text>>>,
        #[max_length = 2048]
        image_url -> Nullable<Varchar>,
        #[max_length = 16]
        generation_mode -> Varchar,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    steps (id) {
        id -> Uuid,
        recipe_id -> Uuid,
        step_order -> Int4,
        text -> Text,
        duration -> Nullable<Int4>,
        temperature -> Nullable<Int4>,
        ingredients_used -> Nullable<Array<Nullable<Text>>>,
    }
}

diesel::joinable!(ingredients -> food_items (food_item_id));
diesel::joinable!(ingredients -> recipes (recipe_id));
diesel::joinable!(steps -> recipes (recipe_id));

diesel::allow_tables_to_appear_in_same_query!(
    food_items,
    ingredients,
    profiles,
    rate_limit_stats,
    recipes,
    steps,
);
