use std::collections::BTreeMap;

use anyhow::{Context, Result, bail};
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

// --- Recipes ---

#[derive(Debug, Clone, Serialize)]
pub struct Recipe {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub ingredients: Vec<String>,
    pub instructions: Option<String>,
    pub prep_time_mins: Option<i64>,
    pub cook_time_mins: Option<i64>,
    pub servings: i64,
    pub tags: Vec<String>,
    pub notes: Option<String>,
    pub rating: Option<i64>,
    pub image_url: Option<String>,
    pub source_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewRecipe {
    pub name: String,
    pub description: Option<String>,
    pub ingredients: Vec<String>,
    pub instructions: Option<String>,
    pub prep_time_mins: Option<i64>,
    pub cook_time_mins: Option<i64>,
    pub servings: Option<i64>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub notes: Option<String>,
    pub image_url: Option<String>,
    pub source_url: Option<String>,
}

/// Partial recipe update. `None` keeps the stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateRecipe {
    pub name: Option<String>,
    pub description: Option<String>,
    pub ingredients: Option<Vec<String>>,
    pub instructions: Option<String>,
    pub prep_time_mins: Option<i64>,
    pub cook_time_mins: Option<i64>,
    pub servings: Option<i64>,
    pub tags: Option<Vec<String>>,
    pub notes: Option<String>,
    pub rating: Option<i64>,
    pub image_url: Option<String>,
    pub source_url: Option<String>,
}

pub const DEFAULT_SERVINGS: i64 = 4;

// --- Meal plan ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    #[default]
    Dinner,
}

impl MealType {
    pub const ALL: [MealType; 3] = [MealType::Breakfast, MealType::Lunch, MealType::Dinner];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        let lower = value.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == lower)
            .with_context(|| {
                format!("Invalid meal type '{value}'. Must be one of: breakfast, lunch, dinner")
            })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealStatus {
    #[default]
    Planned,
    Cooked,
    Skipped,
}

impl MealStatus {
    pub const ALL: [MealStatus; 3] = [MealStatus::Planned, MealStatus::Cooked, MealStatus::Skipped];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MealStatus::Planned => "planned",
            MealStatus::Cooked => "cooked",
            MealStatus::Skipped => "skipped",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        let lower = value.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|s| s.as_str() == lower)
            .with_context(|| {
                format!("Invalid meal status '{value}'. Must be one of: planned, cooked, skipped")
            })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MealPlanEntry {
    pub id: i64,
    pub recipe_id: i64,
    pub planned_date: String,
    pub meal_type: MealType,
    pub status: MealStatus,
    // Joined from recipes for display
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipe_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prep_time_mins: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cook_time_mins: Option<i64>,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewMealPlanEntry {
    pub recipe_id: i64,
    pub planned_date: NaiveDate,
    pub meal_type: MealType,
}

/// One planned meal's raw ingredient column, as stored.
///
/// Decoding is left to the aggregator so a single bad row can be skipped.
#[derive(Debug, Clone)]
pub struct PlannedIngredients {
    pub recipe_id: i64,
    pub raw_ingredients: String,
}

// --- Pantry ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PantryCategory {
    Fridge,
    Freezer,
    #[default]
    Cupboard,
}

impl PantryCategory {
    pub const ALL: [PantryCategory; 3] = [
        PantryCategory::Fridge,
        PantryCategory::Freezer,
        PantryCategory::Cupboard,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PantryCategory::Fridge => "fridge",
            PantryCategory::Freezer => "freezer",
            PantryCategory::Cupboard => "cupboard",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        let lower = value.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == lower)
            .context("Category must be fridge, freezer, or cupboard")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PantryItem {
    pub id: i64,
    pub name: String,
    pub barcode: Option<String>,
    pub category: PantryCategory,
    pub quantity: String,
    pub quantity_unit: Option<String>,
    pub expiry_date: Option<String>,
    pub is_low: bool,
    pub image_url: Option<String>,
    pub added_at: String,
    pub updated_at: Option<String>,
    pub used_at: Option<String>,
}

impl PantryItem {
    /// Confidently on hand: not used up and not flagged as running low.
    #[must_use]
    pub fn is_in_stock(&self) -> bool {
        self.used_at.is_none() && !self.is_low
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPantryItem {
    pub name: String,
    pub category: PantryCategory,
    pub barcode: Option<String>,
    pub quantity: Option<String>,
    pub quantity_unit: Option<String>,
    pub expiry_date: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePantryItem {
    pub name: Option<String>,
    pub barcode: Option<String>,
    pub category: Option<PantryCategory>,
    pub quantity: Option<String>,
    pub quantity_unit: Option<String>,
    pub expiry_date: Option<String>,
    pub is_low: Option<bool>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PantryFilter {
    pub category: Option<PantryCategory>,
    pub low_only: bool,
    pub expiring_within_days: Option<i64>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PantryStats {
    pub categories: BTreeMap<String, i64>,
    pub total: i64,
    pub low: i64,
    pub expiring: i64,
}

/// Outcome of a quantity step on a pantry item.
#[derive(Debug, Clone, Serialize)]
pub struct QuantityChange {
    pub quantity: i64,
    pub message: String,
}

pub const DEFAULT_PANTRY_QUANTITY: &str = "1";
pub const EXPIRING_SOON_DAYS: i64 = 3;

// --- Shopping ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShoppingListStatus {
    #[default]
    Active,
    Completed,
}

impl ShoppingListStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ShoppingListStatus::Active => "active",
            ShoppingListStatus::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "active" => Ok(ShoppingListStatus::Active),
            "completed" => Ok(ShoppingListStatus::Completed),
            _ => bail!("Invalid list status '{value}'. Must be one of: active, completed"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ShoppingList {
    pub id: i64,
    pub name: String,
    pub status: ShoppingListStatus,
    pub created_at: String,
    pub completed_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShoppingListWithItems {
    #[serde(flatten)]
    pub list: ShoppingList,
    pub items: Vec<ShoppingItem>,
}

pub const DEFAULT_LIST_NAME: &str = "Weekly Shop";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemSource {
    Auto,
    #[default]
    Manual,
    TrashScan,
}

impl ItemSource {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ItemSource::Auto => "auto",
            ItemSource::Manual => "manual",
            ItemSource::TrashScan => "trash_scan",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "auto" => Ok(ItemSource::Auto),
            "manual" => Ok(ItemSource::Manual),
            "trash_scan" => Ok(ItemSource::TrashScan),
            _ => bail!("Invalid item source '{value}'. Must be one of: auto, manual, trash_scan"),
        }
    }
}

/// Aisle grouping for shopping items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Dairy,
    Meat,
    Veg,
    Fruit,
    Bakery,
    Frozen,
    Cupboard,
    #[default]
    Other,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Dairy,
        Category::Meat,
        Category::Veg,
        Category::Fruit,
        Category::Bakery,
        Category::Frozen,
        Category::Cupboard,
        Category::Other,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Dairy => "dairy",
            Category::Meat => "meat",
            Category::Veg => "veg",
            Category::Fruit => "fruit",
            Category::Bakery => "bakery",
            Category::Frozen => "frozen",
            Category::Cupboard => "cupboard",
            Category::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        let lower = value.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == lower)
            .with_context(|| {
                format!(
                    "Invalid category '{value}'. Must be one of: {}",
                    Self::ALL.map(Category::as_str).join(", ")
                )
            })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ShoppingItem {
    pub id: i64,
    pub list_id: i64,
    pub name: String,
    pub quantity: Option<String>,
    pub category: Category,
    pub checked: bool,
    pub source: ItemSource,
    pub barcode: Option<String>,
    pub scanned_at: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Default)]
pub struct NewShoppingItem {
    pub list_id: i64,
    pub name: String,
    pub quantity: Option<String>,
    pub category: Category,
    pub source: ItemSource,
    pub barcode: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateShoppingItem {
    pub name: Option<String>,
    pub quantity: Option<String>,
    pub category: Option<Category>,
}

// --- Helpers ---

/// Decode a JSON string array column (ingredients, tags).
pub fn parse_string_list(raw: &str) -> Result<Vec<String>> {
    serde_json::from_str(raw).with_context(|| format!("Invalid JSON string list: '{raw}'"))
}

/// Lenient variant for display paths: malformed or missing data reads as empty.
#[must_use]
pub fn parse_string_list_or_empty(raw: Option<&str>) -> Vec<String> {
    raw.and_then(|r| parse_string_list(r).ok()).unwrap_or_default()
}

pub fn validate_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        bail!("Name must not be empty");
    }
    Ok(trimmed.to_string())
}

pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{value}'. Use YYYY-MM-DD"))
}

/// Exclusive end of the seven-day window starting at `start`.
pub fn week_end(start: NaiveDate) -> Result<NaiveDate> {
    start
        .checked_add_days(Days::new(7))
        .with_context(|| format!("Date {start} is too late to start a week"))
}
