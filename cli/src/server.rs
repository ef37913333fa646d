use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Path, Query, Request, State},
    http::{HeaderValue, Method, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post, put},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use tracing::{error, info};

use crate::openfoodfacts::OpenFoodFactsClient;
use fivethirty_core::db::Database;
use fivethirty_core::models::{
    Category, DEFAULT_LIST_NAME, ItemSource, MealPlanEntry, MealStatus, MealType,
    NewMealPlanEntry, NewPantryItem, NewRecipe, NewShoppingItem, PantryCategory, PantryFilter,
    PantryItem, PantryStats, QuantityChange, Recipe, ShoppingItem, ShoppingList,
    ShoppingListStatus, ShoppingListWithItems, UpdatePantryItem, UpdateRecipe, UpdateShoppingItem,
    parse_date, parse_string_list, validate_name, week_end,
};
use fivethirty_core::openfoodfacts::BarcodeLookup;
use fivethirty_core::shopping::{self, GenerateSummary};

const BODY_LIMIT: usize = 1024 * 1024; // 1 MB

#[derive(Clone)]
struct AppState {
    db: Arc<Mutex<Database>>,
    off: Arc<OpenFoodFactsClient>,
}

impl AppState {
    fn db(&self) -> MutexGuard<'_, Database> {
        self.db
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

// --- Request / Response types ---

/// Ingredient and tag lists arrive either as a JSON array or as a string
/// holding an encoded array.
#[derive(Deserialize)]
#[serde(untagged)]
enum StringList {
    Items(Vec<String>),
    Encoded(String),
}

impl StringList {
    fn into_vec(self, field: &str) -> Result<Vec<String>, ApiError> {
        match self {
            Self::Items(items) => Ok(items),
            Self::Encoded(raw) => parse_string_list(&raw).map_err(|_| {
                ApiError::BadRequest(format!("{field} must be a JSON array of strings"))
            }),
        }
    }
}

#[derive(Deserialize)]
struct CreateRecipeRequest {
    name: Option<String>,
    description: Option<String>,
    ingredients: Option<StringList>,
    instructions: Option<String>,
    prep_time_mins: Option<i64>,
    cook_time_mins: Option<i64>,
    servings: Option<i64>,
    tags: Option<StringList>,
    notes: Option<String>,
    image_url: Option<String>,
    source_url: Option<String>,
}

#[derive(Deserialize)]
struct UpdateRecipeRequest {
    name: Option<String>,
    description: Option<String>,
    ingredients: Option<StringList>,
    instructions: Option<String>,
    prep_time_mins: Option<i64>,
    cook_time_mins: Option<i64>,
    servings: Option<i64>,
    tags: Option<StringList>,
    notes: Option<String>,
    rating: Option<i64>,
    image_url: Option<String>,
    source_url: Option<String>,
}

#[derive(Deserialize)]
struct RecipeSearchQuery {
    q: Option<String>,
    tag: Option<String>,
}

#[derive(Deserialize)]
struct MealPlanQuery {
    week: Option<String>,
}

#[derive(Deserialize)]
struct CreateMealPlanRequest {
    recipe_id: Option<i64>,
    planned_date: Option<String>,
    meal_type: Option<String>,
}

#[derive(Deserialize)]
struct UpdateMealStatusRequest {
    status: String,
}

#[derive(Deserialize)]
struct PantryQuery {
    category: Option<String>,
    low: Option<String>,
    expiring: Option<i64>,
    search: Option<String>,
}

#[derive(Deserialize)]
struct CreatePantryRequest {
    name: Option<String>,
    category: Option<String>,
    barcode: Option<String>,
    quantity: Option<String>,
    quantity_unit: Option<String>,
    expiry_date: Option<String>,
    image_url: Option<String>,
}

#[derive(Deserialize)]
struct UpdatePantryRequest {
    name: Option<String>,
    barcode: Option<String>,
    category: Option<String>,
    quantity: Option<String>,
    quantity_unit: Option<String>,
    expiry_date: Option<String>,
    is_low: Option<bool>,
    image_url: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct CreateListRequest {
    name: Option<String>,
}

#[derive(Deserialize)]
struct UpdateListRequest {
    name: Option<String>,
    status: Option<String>,
}

#[derive(Deserialize)]
struct GenerateRequest {
    week_start: Option<String>,
}

#[derive(Deserialize)]
struct ListIdQuery {
    list_id: Option<i64>,
}

#[derive(Deserialize)]
struct CreateItemRequest {
    list_id: Option<i64>,
    name: Option<String>,
    quantity: Option<String>,
    category: Option<String>,
    source: Option<String>,
    barcode: Option<String>,
}

#[derive(Deserialize)]
struct UpdateItemRequest {
    name: Option<String>,
    quantity: Option<String>,
    category: Option<String>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    database: &'static str,
    recipe_count: i64,
}

// --- Error handling ---

enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Internal(err) => {
                error!(error = %format!("{err:#}"), "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

fn bad_request(err: &anyhow::Error) -> ApiError {
    ApiError::BadRequest(format!("{err}"))
}

/// Blank strings count as absent, like a missing field.
fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn created(id: i64, message: &str) -> (StatusCode, Json<Value>) {
    (StatusCode::CREATED, Json(json!({ "id": id, "message": message })))
}

fn message(message: &str) -> Json<Value> {
    Json(json!({ "message": message }))
}

/// A window start date that still leaves room for a full week after it.
fn parse_week_start(value: &str) -> Result<NaiveDate, ApiError> {
    let start = parse_date(value).map_err(|e| bad_request(&e))?;
    week_end(start).map_err(|e| bad_request(&e))?;
    Ok(start)
}

fn parse_optional_date(value: Option<String>) -> Result<Option<String>, ApiError> {
    present(value)
        .map(|v| {
            parse_date(&v)
                .map(|d| d.format("%Y-%m-%d").to_string())
                .map_err(|e| bad_request(&e))
        })
        .transpose()
}

// --- Middleware ---

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'"),
    );
    response
}

// --- Health ---

async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    let recipe_count = state.db().count_recipes().context("database error")?;
    Ok(Json(HealthResponse {
        status: "healthy",
        database: "connected",
        recipe_count,
    }))
}

// --- Recipe Handlers ---

async fn list_recipes(State(state): State<AppState>) -> Result<Json<Vec<Recipe>>, ApiError> {
    let recipes = state.db().list_recipes().context("database error")?;
    Ok(Json(recipes))
}

async fn search_recipes(
    State(state): State<AppState>,
    Query(params): Query<RecipeSearchQuery>,
) -> Result<Json<Vec<Recipe>>, ApiError> {
    let query = params.q.unwrap_or_default();
    let tag = present(params.tag);
    let recipes = state
        .db()
        .search_recipes(&query, tag.as_deref())
        .context("database error")?;
    Ok(Json(recipes))
}

async fn get_recipe(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Recipe>, ApiError> {
    state
        .db()
        .get_recipe(id)
        .context("database error")?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Recipe not found".to_string()))
}

async fn create_recipe(
    State(state): State<AppState>,
    Json(req): Json<CreateRecipeRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let (Some(name), Some(ingredients)) = (present(req.name), req.ingredients) else {
        return Err(ApiError::BadRequest(
            "Name and ingredients are required".to_string(),
        ));
    };
    let recipe = NewRecipe {
        name: validate_name(&name).map_err(|e| bad_request(&e))?,
        description: present(req.description),
        ingredients: ingredients.into_vec("ingredients")?,
        instructions: present(req.instructions),
        prep_time_mins: req.prep_time_mins,
        cook_time_mins: req.cook_time_mins,
        servings: req.servings.filter(|s| *s > 0),
        tags: req
            .tags
            .map(|t| t.into_vec("tags"))
            .transpose()?
            .unwrap_or_default(),
        notes: present(req.notes),
        image_url: present(req.image_url),
        source_url: present(req.source_url),
    };

    let recipe = state
        .db()
        .create_recipe(&recipe)
        .context("failed to create recipe")?;
    info!(recipe_id = recipe.id, "recipe created");
    Ok(created(recipe.id, "Recipe created"))
}

async fn update_recipe(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateRecipeRequest>,
) -> Result<Json<Value>, ApiError> {
    if req.rating.is_some_and(|r| !(1..=5).contains(&r)) {
        return Err(ApiError::BadRequest(
            "rating must be between 1 and 5".to_string(),
        ));
    }
    let update = UpdateRecipe {
        name: present(req.name),
        description: present(req.description),
        ingredients: req
            .ingredients
            .map(|i| i.into_vec("ingredients"))
            .transpose()?,
        instructions: present(req.instructions),
        prep_time_mins: req.prep_time_mins,
        cook_time_mins: req.cook_time_mins,
        servings: req.servings.filter(|s| *s > 0),
        tags: req.tags.map(|t| t.into_vec("tags")).transpose()?,
        notes: present(req.notes),
        rating: req.rating,
        image_url: present(req.image_url),
        source_url: present(req.source_url),
    };

    state
        .db()
        .update_recipe(id, &update)
        .context("failed to update recipe")?
        .ok_or_else(|| ApiError::NotFound("Recipe not found".to_string()))?;
    Ok(message("Recipe updated"))
}

async fn delete_recipe(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    if !state.db().delete_recipe(id).context("failed to delete recipe")? {
        return Err(ApiError::NotFound("Recipe not found".to_string()));
    }
    Ok(message("Recipe deleted"))
}

// --- Meal plan Handlers ---

async fn list_meal_plan(
    State(state): State<AppState>,
    Query(params): Query<MealPlanQuery>,
) -> Result<Json<Vec<MealPlanEntry>>, ApiError> {
    let week = present(params.week)
        .map(|w| parse_week_start(&w))
        .transpose()?;
    let entries = state.db().list_meal_plan(week).context("database error")?;
    Ok(Json(entries))
}

async fn create_meal_plan_entry(
    State(state): State<AppState>,
    Json(req): Json<CreateMealPlanRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let (Some(recipe_id), Some(planned_date)) = (req.recipe_id, present(req.planned_date)) else {
        return Err(ApiError::BadRequest(
            "recipe_id and planned_date are required".to_string(),
        ));
    };
    let planned_date = parse_date(&planned_date).map_err(|e| bad_request(&e))?;
    let meal_type = present(req.meal_type)
        .map(|m| MealType::parse(&m))
        .transpose()
        .map_err(|e| bad_request(&e))?
        .unwrap_or_default();

    let db = state.db();
    if db.get_recipe(recipe_id).context("database error")?.is_none() {
        return Err(ApiError::BadRequest(format!(
            "Recipe with id {recipe_id} not found"
        )));
    }
    let entry = db
        .upsert_meal_plan_entry(&NewMealPlanEntry {
            recipe_id,
            planned_date,
            meal_type,
        })
        .context("failed to plan meal")?;
    Ok(created(entry.id, "Meal planned"))
}

async fn update_meal_plan_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateMealStatusRequest>,
) -> Result<Json<Value>, ApiError> {
    let status = MealStatus::parse(&req.status).map_err(|e| bad_request(&e))?;
    if !state
        .db()
        .set_meal_plan_status(id, status)
        .context("failed to update meal status")?
    {
        return Err(ApiError::NotFound("Meal plan not found".to_string()));
    }
    Ok(message("Meal status updated"))
}

async fn delete_meal_plan_entry(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    if !state
        .db()
        .delete_meal_plan_entry(id)
        .context("failed to remove meal")?
    {
        return Err(ApiError::NotFound("Meal plan not found".to_string()));
    }
    Ok(message("Meal removed from plan"))
}

// --- Pantry Handlers ---

async fn list_pantry(
    State(state): State<AppState>,
    Query(params): Query<PantryQuery>,
) -> Result<Json<Vec<PantryItem>>, ApiError> {
    let category = present(params.category)
        .map(|c| PantryCategory::parse(&c))
        .transpose()
        .map_err(|e| bad_request(&e))?;
    let filter = PantryFilter {
        category,
        low_only: params.low.as_deref() == Some("true"),
        expiring_within_days: params.expiring,
        search: present(params.search),
    };
    let items = state
        .db()
        .list_pantry_items(&filter)
        .context("database error")?;
    Ok(Json(items))
}

async fn create_pantry_item(
    State(state): State<AppState>,
    Json(req): Json<CreatePantryRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let (Some(name), Some(category)) = (present(req.name), present(req.category)) else {
        return Err(ApiError::BadRequest(
            "Name and category are required".to_string(),
        ));
    };
    let item = NewPantryItem {
        name: validate_name(&name).map_err(|e| bad_request(&e))?,
        category: PantryCategory::parse(&category).map_err(|e| bad_request(&e))?,
        barcode: present(req.barcode),
        quantity: present(req.quantity),
        quantity_unit: present(req.quantity_unit),
        expiry_date: parse_optional_date(req.expiry_date)?,
        image_url: present(req.image_url),
    };
    let item = state
        .db()
        .insert_pantry_item(&item)
        .context("failed to add pantry item")?;
    Ok(created(item.id, "Item added to pantry"))
}

async fn pantry_stats(State(state): State<AppState>) -> Result<Json<PantryStats>, ApiError> {
    let stats = state.db().pantry_stats().context("database error")?;
    Ok(Json(stats))
}

async fn get_pantry_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PantryItem>, ApiError> {
    state
        .db()
        .get_pantry_item(id)
        .context("database error")?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Item not found".to_string()))
}

async fn update_pantry_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdatePantryRequest>,
) -> Result<Json<Value>, ApiError> {
    let update = UpdatePantryItem {
        name: present(req.name),
        barcode: present(req.barcode),
        category: present(req.category)
            .map(|c| PantryCategory::parse(&c))
            .transpose()
            .map_err(|e| bad_request(&e))?,
        quantity: present(req.quantity),
        quantity_unit: present(req.quantity_unit),
        expiry_date: parse_optional_date(req.expiry_date)?,
        is_low: req.is_low,
        image_url: present(req.image_url),
    };
    state
        .db()
        .update_pantry_item(id, &update)
        .context("failed to update pantry item")?
        .ok_or_else(|| ApiError::NotFound("Item not found".to_string()))?;
    Ok(message("Item updated"))
}

async fn delete_pantry_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    if !state
        .db()
        .delete_pantry_item(id)
        .context("failed to delete pantry item")?
    {
        return Err(ApiError::NotFound("Item not found".to_string()));
    }
    Ok(message("Item removed from pantry"))
}

async fn decrement_pantry_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<QuantityChange>, ApiError> {
    state
        .db()
        .decrement_pantry_item(id)
        .context("failed to update quantity")?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Item not found".to_string()))
}

async fn increment_pantry_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<QuantityChange>, ApiError> {
    state
        .db()
        .increment_pantry_item(id)
        .context("failed to update quantity")?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Item not found".to_string()))
}

async fn toggle_pantry_low(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let is_low = state
        .db()
        .toggle_pantry_low(id)
        .context("failed to update pantry item")?
        .ok_or_else(|| ApiError::NotFound("Item not found".to_string()))?;
    let msg = if is_low {
        "Marked as low"
    } else {
        "Unmarked as low"
    };
    Ok(Json(json!({ "is_low": is_low, "message": msg })))
}

async fn lookup_barcode(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Json<BarcodeLookup> {
    Json(state.off.lookup_barcode(&code).await)
}

// --- Shopping list Handlers ---

async fn get_active_list(State(state): State<AppState>) -> Result<Json<ShoppingList>, ApiError> {
    let list = state
        .db()
        .get_or_create_active_shopping_list()
        .context("database error")?;
    Ok(Json(list))
}

async fn create_list(
    State(state): State<AppState>,
    Json(req): Json<CreateListRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let name = present(req.name).unwrap_or_else(|| DEFAULT_LIST_NAME.to_string());
    let list = state
        .db()
        .create_shopping_list(name.trim())
        .context("failed to create shopping list")?;
    info!(list_id = list.id, "shopping list created");
    Ok(created(list.id, "Shopping list created"))
}

async fn get_list(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ShoppingListWithItems>, ApiError> {
    state
        .db()
        .get_shopping_list_with_items(id)
        .context("database error")?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Shopping list not found".to_string()))
}

async fn update_list(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateListRequest>,
) -> Result<Json<Value>, ApiError> {
    let name = present(req.name);
    let status = present(req.status)
        .map(|s| ShoppingListStatus::parse(&s))
        .transpose()
        .map_err(|e| bad_request(&e))?;
    if name.is_none() && status.is_none() {
        return Err(ApiError::BadRequest("No fields to update".to_string()));
    }
    state
        .db()
        .update_shopping_list(id, name.as_deref(), status)
        .context("failed to update shopping list")?
        .ok_or_else(|| ApiError::NotFound("Shopping list not found".to_string()))?;
    Ok(message("Shopping list updated"))
}

async fn generate_list(
    State(state): State<AppState>,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<GenerateSummary>, ApiError> {
    let Some(week_start) = present(req.week_start) else {
        return Err(ApiError::BadRequest(
            "week_start is required (YYYY-MM-DD format)".to_string(),
        ));
    };
    let week_start = parse_week_start(&week_start)?;
    let db = state.db();
    let summary = shopping::generate(&*db, week_start).context("failed to generate shopping list")?;
    Ok(Json(summary))
}

// --- Shopping item Handlers ---

fn require_list_id(query: &ListIdQuery) -> Result<i64, ApiError> {
    query
        .list_id
        .ok_or_else(|| ApiError::BadRequest("list_id is required".to_string()))
}

async fn list_items(
    State(state): State<AppState>,
    Query(params): Query<ListIdQuery>,
) -> Result<Json<Vec<ShoppingItem>>, ApiError> {
    let list_id = require_list_id(&params)?;
    let items = state
        .db()
        .list_shopping_items(list_id)
        .context("database error")?;
    Ok(Json(items))
}

async fn create_item(
    State(state): State<AppState>,
    Json(req): Json<CreateItemRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let (Some(list_id), Some(name)) = (req.list_id, present(req.name)) else {
        return Err(ApiError::BadRequest(
            "list_id and name are required".to_string(),
        ));
    };
    let item = NewShoppingItem {
        list_id,
        name: validate_name(&name).map_err(|e| bad_request(&e))?,
        quantity: present(req.quantity),
        category: present(req.category)
            .map(|c| Category::parse(&c))
            .transpose()
            .map_err(|e| bad_request(&e))?
            .unwrap_or_default(),
        source: present(req.source)
            .map(|s| ItemSource::parse(&s))
            .transpose()
            .map_err(|e| bad_request(&e))?
            .unwrap_or_default(),
        barcode: present(req.barcode),
    };

    let db = state.db();
    if db.get_shopping_list(list_id).context("database error")?.is_none() {
        return Err(ApiError::BadRequest(format!(
            "Shopping list with id {list_id} not found"
        )));
    }
    let item = db
        .insert_shopping_item(&item)
        .context("failed to add shopping item")?;
    Ok(created(item.id, "Item added"))
}

async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateItemRequest>,
) -> Result<Json<Value>, ApiError> {
    let update = UpdateShoppingItem {
        name: present(req.name),
        quantity: present(req.quantity),
        category: present(req.category)
            .map(|c| Category::parse(&c))
            .transpose()
            .map_err(|e| bad_request(&e))?,
    };
    state
        .db()
        .update_shopping_item(id, &update)
        .context("failed to update shopping item")?
        .ok_or_else(|| ApiError::NotFound("Item not found".to_string()))?;
    Ok(message("Item updated"))
}

async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    if !state
        .db()
        .delete_shopping_item(id)
        .context("failed to delete shopping item")?
    {
        return Err(ApiError::NotFound("Item not found".to_string()));
    }
    Ok(message("Item removed"))
}

async fn toggle_item_checked(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let checked = state
        .db()
        .toggle_shopping_item_checked(id)
        .context("failed to update shopping item")?
        .ok_or_else(|| ApiError::NotFound("Item not found".to_string()))?;
    let msg = if checked {
        "Item checked"
    } else {
        "Item unchecked"
    };
    Ok(Json(json!({ "checked": checked, "message": msg })))
}

async fn clear_checked_items(
    State(state): State<AppState>,
    Query(params): Query<ListIdQuery>,
) -> Result<Json<Value>, ApiError> {
    let list_id = require_list_id(&params)?;
    let removed = state
        .db()
        .clear_checked_items(list_id)
        .context("failed to clear checked items")?;
    Ok(Json(
        json!({ "removed": removed, "message": "Checked items removed" }),
    ))
}

async fn not_found() -> ApiError {
    ApiError::NotFound("Not found".to_string())
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE])
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/recipes", get(list_recipes).post(create_recipe))
        .route("/api/recipes/search", get(search_recipes))
        .route(
            "/api/recipes/{id}",
            get(get_recipe).put(update_recipe).delete(delete_recipe),
        )
        .route(
            "/api/meal-plan",
            get(list_meal_plan).post(create_meal_plan_entry),
        )
        .route("/api/meal-plan/{id}", delete(delete_meal_plan_entry))
        .route("/api/meal-plan/{id}/status", put(update_meal_plan_status))
        .route("/api/pantry", get(list_pantry).post(create_pantry_item))
        .route("/api/pantry/stats", get(pantry_stats))
        .route("/api/pantry/barcode/{code}", post(lookup_barcode))
        .route(
            "/api/pantry/{id}",
            get(get_pantry_item)
                .put(update_pantry_item)
                .delete(delete_pantry_item),
        )
        .route("/api/pantry/{id}/decrement", patch(decrement_pantry_item))
        .route("/api/pantry/{id}/increment", patch(increment_pantry_item))
        .route("/api/pantry/{id}/toggle-low", patch(toggle_pantry_low))
        .route(
            "/api/shopping-lists",
            get(get_active_list).post(create_list),
        )
        .route("/api/shopping-lists/generate", post(generate_list))
        .route(
            "/api/shopping-lists/{id}",
            get(get_list).put(update_list),
        )
        .route("/api/shopping-items", get(list_items).post(create_item))
        .route("/api/shopping-items/checked", delete(clear_checked_items))
        .route(
            "/api/shopping-items/{id}",
            put(update_item).delete(delete_item),
        )
        .route("/api/shopping-items/{id}/check", patch(toggle_item_checked))
        .fallback(not_found)
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(cors_layer())
        .layer(middleware::from_fn(security_headers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// --- Server startup ---

pub async fn start_server(db: Database, port: u16, bind: &str) -> anyhow::Result<()> {
    let state = AppState {
        db: Arc::new(Mutex::new(db)),
        off: Arc::new(OpenFoodFactsClient::new()?),
    };

    let app = build_router(state);

    if bind != "127.0.0.1" && bind != "localhost" {
        tracing::warn!(
            bind,
            "listening beyond localhost with no authentication; any device on your network can access this API"
        );
    }

    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}"))
        .await
        .with_context(|| format!("Failed to bind {bind}:{port}"))?;
    info!("Listening on http://{bind}:{port}");
    axum::serve(listener, app).await?;

    Ok(())
}
