use std::collections::HashSet;

use anyhow::Result;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::db::Database;
use crate::models::{
    Category, ItemSource, NewShoppingItem, PlannedIngredients, ShoppingList, parse_string_list,
    week_end,
};

/// Keyword table used by [`categorize`]. Checked top to bottom; the first
/// category with a keyword contained in the ingredient wins.
pub const CATEGORY_KEYWORDS: [(Category, &[&str]); 7] = [
    (
        Category::Dairy,
        &["milk", "cheese", "butter", "cream", "yogurt", "yoghurt"],
    ),
    (
        Category::Meat,
        &[
            "chicken", "beef", "pork", "lamb", "salmon", "fish", "bacon", "sausage", "mince",
        ],
    ),
    (
        Category::Veg,
        &[
            "tomato", "onion", "pepper", "lettuce", "spinach", "carrot", "potato", "garlic",
            "mushroom", "courgette", "broccoli", "cucumber",
        ],
    ),
    (
        Category::Fruit,
        &["apple", "banana", "orange", "lemon", "lime", "berry", "fruit"],
    ),
    (
        Category::Bakery,
        &["bread", "roll", "bun", "croissant", "bagel"],
    ),
    (Category::Frozen, &["ice cream", "frozen", "pizza"]),
    (
        Category::Cupboard,
        &[
            "pasta", "rice", "tinned", "canned", "flour", "sugar", "spice", "oil", "vinegar",
            "sauce", "stock",
        ],
    ),
];

pub const NO_MEALS_MESSAGE: &str = "No meals planned for this week";

/// The store operations the generator needs.
///
/// `Database` is the production implementation; tests substitute in-memory fakes.
pub trait ShoppingStore {
    /// Planned recipes' raw ingredient columns for `[start, end_exclusive)`.
    fn list_planned_ingredients(
        &self,
        start: NaiveDate,
        end_exclusive: NaiveDate,
    ) -> Result<Vec<PlannedIngredients>>;
    /// Pantry names that are neither used up nor flagged low.
    fn list_in_stock_pantry_names(&self) -> Result<Vec<String>>;
    fn get_or_create_active_shopping_list(&self) -> Result<ShoppingList>;
    fn insert_shopping_item(&self, item: &NewShoppingItem) -> Result<()>;
}

impl ShoppingStore for Database {
    fn list_planned_ingredients(
        &self,
        start: NaiveDate,
        end_exclusive: NaiveDate,
    ) -> Result<Vec<PlannedIngredients>> {
        Database::list_planned_ingredients(self, start, end_exclusive)
    }

    fn list_in_stock_pantry_names(&self) -> Result<Vec<String>> {
        Database::list_in_stock_pantry_names(self)
    }

    fn get_or_create_active_shopping_list(&self) -> Result<ShoppingList> {
        Database::get_or_create_active_shopping_list(self)
    }

    fn insert_shopping_item(&self, item: &NewShoppingItem) -> Result<()> {
        Database::insert_shopping_item(self, item).map(|_| ())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerateSummary {
    pub list_id: i64,
    pub items_added: usize,
    /// In-stock pantry rows considered. Absent when nothing was planned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pantry_items_subtracted: Option<usize>,
    pub message: String,
}

/// A distinct ingredient waiting to be added, keyed by its normalized text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub key: String,
    pub category: Category,
}

#[must_use]
pub fn normalize_key(text: &str) -> String {
    text.trim().to_lowercase()
}

#[must_use]
pub fn categorize(ingredient: &str) -> Category {
    let lower = ingredient.to_lowercase();
    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map_or(Category::Other, |(category, _)| *category)
}

/// True when any pantry name and the key contain one another, compared
/// case-insensitively after trimming. "milk" holds "2l semi-skimmed milk".
#[must_use]
pub fn is_held_in_pantry<S: AsRef<str>>(key: &str, pantry_names: &[S]) -> bool {
    let key = normalize_key(key);
    pantry_names.iter().any(|name| {
        let name = normalize_key(name.as_ref());
        key.contains(&name) || name.contains(&key)
    })
}

/// Upper-case the first character, leave the rest as is.
#[must_use]
pub fn display_name(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Flatten planned recipes into distinct candidates, first occurrence first.
///
/// A recipe whose ingredient column does not decode is skipped on its own.
#[must_use]
pub fn collect_ingredients(planned: &[PlannedIngredients]) -> Vec<Candidate> {
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    for recipe in planned {
        let ingredients = match parse_string_list(&recipe.raw_ingredients) {
            Ok(list) => list,
            Err(e) => {
                warn!(recipe_id = recipe.recipe_id, error = %e, "skipping recipe with malformed ingredients");
                continue;
            }
        };
        for ingredient in ingredients {
            let key = normalize_key(&ingredient);
            if key.is_empty() || !seen.insert(key.clone()) {
                continue;
            }
            candidates.push(Candidate {
                key,
                category: categorize(&ingredient),
            });
        }
    }

    candidates
}

/// Drop every candidate the pantry already holds.
#[must_use]
pub fn subtract_pantry<S: AsRef<str>>(candidates: Vec<Candidate>, pantry_names: &[S]) -> Vec<Candidate> {
    candidates
        .into_iter()
        .filter(|c| !is_held_in_pantry(&c.key, pantry_names))
        .collect()
}

/// Build the active shopping list from the meals planned in
/// `[week_start, week_start + 7 days)`, minus what the pantry already holds.
///
/// Items are always appended; running this twice for the same week adds
/// every surviving ingredient twice.
pub fn generate<S: ShoppingStore + ?Sized>(store: &S, week_start: NaiveDate) -> Result<GenerateSummary> {
    let end_exclusive = week_end(week_start)?;
    let list = store.get_or_create_active_shopping_list()?;

    let planned = store.list_planned_ingredients(week_start, end_exclusive)?;
    if planned.is_empty() {
        info!(%week_start, list_id = list.id, "no meals planned");
        return Ok(GenerateSummary {
            list_id: list.id,
            items_added: 0,
            pantry_items_subtracted: None,
            message: NO_MEALS_MESSAGE.to_string(),
        });
    }

    let candidates = collect_ingredients(&planned);
    let pantry_names = store.list_in_stock_pantry_names()?;
    let survivors = subtract_pantry(candidates, &pantry_names);
    debug!(planned_meals = planned.len(), survivors = survivors.len(), "aggregated ingredients");

    let mut items_added = 0;
    for candidate in survivors {
        store.insert_shopping_item(&NewShoppingItem {
            list_id: list.id,
            name: display_name(&candidate.key),
            quantity: None,
            category: candidate.category,
            source: ItemSource::Auto,
            barcode: None,
        })?;
        items_added += 1;
    }

    info!(
        %week_start,
        list_id = list.id,
        items_added,
        pantry_items_subtracted = pantry_names.len(),
        "generated shopping list"
    );

    Ok(GenerateSummary {
        list_id: list.id,
        items_added,
        pantry_items_subtracted: Some(pantry_names.len()),
        message: format!("Generated shopping list with {items_added} items"),
    })
}
