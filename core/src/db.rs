use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Days, Local, NaiveDate};
use rusqlite::{Connection, OptionalExtension, params, params_from_iter, types::Value};

use crate::models::{
    Category, DEFAULT_LIST_NAME, DEFAULT_PANTRY_QUANTITY, DEFAULT_SERVINGS, EXPIRING_SOON_DAYS,
    ItemSource, MealPlanEntry, MealStatus, MealType, NewMealPlanEntry, NewPantryItem, NewRecipe,
    NewShoppingItem, PantryCategory, PantryFilter, PantryItem, PantryStats, PlannedIngredients,
    QuantityChange, Recipe, ShoppingItem, ShoppingList, ShoppingListStatus, ShoppingListWithItems,
    UpdatePantryItem, UpdateRecipe, UpdateShoppingItem, parse_string_list_or_empty, week_end,
};

const RECIPE_COLUMNS: &str = "id, name, description, ingredients, instructions, prep_time_mins,
    cook_time_mins, servings, tags, notes, rating, image_url, source_url, created_at, updated_at";

const PANTRY_COLUMNS: &str = "id, name, barcode, category, quantity, quantity_unit, expiry_date,
    is_low, image_url, added_at, updated_at, used_at";

const LIST_COLUMNS: &str = "id, name, status, created_at, completed_at";

const ITEM_COLUMNS: &str =
    "id, list_id, name, quantity, category, checked, source, barcode, scanned_at, created_at";

// Breakfast, lunch, dinner rather than alphabetical.
const MEAL_ORDER: &str =
    "CASE mp.meal_type WHEN 'breakfast' THEN 0 WHEN 'lunch' THEN 1 ELSE 2 END";

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    #[cfg(test)]
    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS recipes (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    description TEXT,
                    ingredients TEXT NOT NULL,
                    instructions TEXT,
                    prep_time_mins INTEGER,
                    cook_time_mins INTEGER,
                    servings INTEGER NOT NULL DEFAULT 4,
                    tags TEXT NOT NULL DEFAULT '[]',
                    notes TEXT,
                    rating INTEGER,
                    image_url TEXT,
                    source_url TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS meal_plans (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    recipe_id INTEGER NOT NULL REFERENCES recipes(id),
                    planned_date TEXT NOT NULL,
                    meal_type TEXT NOT NULL DEFAULT 'dinner',
                    status TEXT NOT NULL DEFAULT 'planned',
                    created_at TEXT NOT NULL,
                    UNIQUE (planned_date, meal_type)
                );

                CREATE TABLE IF NOT EXISTS pantry_items (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    barcode TEXT,
                    category TEXT NOT NULL,
                    quantity TEXT NOT NULL DEFAULT '1',
                    quantity_unit TEXT,
                    expiry_date TEXT,
                    is_low INTEGER NOT NULL DEFAULT 0,
                    image_url TEXT,
                    added_at TEXT NOT NULL,
                    updated_at TEXT,
                    used_at TEXT
                );

                CREATE TABLE IF NOT EXISTS shopping_lists (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    status TEXT NOT NULL DEFAULT 'active',
                    created_at TEXT NOT NULL,
                    completed_at TEXT
                );

                CREATE TABLE IF NOT EXISTS shopping_items (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    list_id INTEGER NOT NULL REFERENCES shopping_lists(id),
                    name TEXT NOT NULL,
                    quantity TEXT,
                    category TEXT NOT NULL DEFAULT 'other',
                    checked INTEGER NOT NULL DEFAULT 0,
                    source TEXT NOT NULL DEFAULT 'manual',
                    barcode TEXT,
                    scanned_at TEXT,
                    created_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_recipes_name ON recipes(name);
                CREATE INDEX IF NOT EXISTS idx_meal_plans_date ON meal_plans(planned_date);
                CREATE INDEX IF NOT EXISTS idx_pantry_items_name ON pantry_items(name);
                CREATE INDEX IF NOT EXISTS idx_shopping_lists_status ON shopping_lists(status);
                CREATE INDEX IF NOT EXISTS idx_shopping_items_list ON shopping_items(list_id);

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }

    // --- Row mapping helpers ---

    fn recipe_from_row(row: &rusqlite::Row) -> rusqlite::Result<Recipe> {
        let ingredients: Option<String> = row.get(3)?;
        let tags: Option<String> = row.get(8)?;
        Ok(Recipe {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            ingredients: parse_string_list_or_empty(ingredients.as_deref()),
            instructions: row.get(4)?,
            prep_time_mins: row.get(5)?,
            cook_time_mins: row.get(6)?,
            servings: row.get(7)?,
            tags: parse_string_list_or_empty(tags.as_deref()),
            notes: row.get(9)?,
            rating: row.get(10)?,
            image_url: row.get(11)?,
            source_url: row.get(12)?,
            created_at: row.get(13)?,
            updated_at: row.get(14)?,
        })
    }

    // Expects columns:
    // 0: mp.id, 1: mp.recipe_id, 2: mp.planned_date, 3: mp.meal_type, 4: mp.status,
    // 5: r.name, 6: r.prep_time_mins, 7: r.cook_time_mins, 8: r.tags, 9: r.image_url
    fn meal_plan_from_row(row: &rusqlite::Row) -> rusqlite::Result<MealPlanEntry> {
        let meal_type: String = row.get(3)?;
        let status: String = row.get(4)?;
        let tags: Option<String> = row.get(8)?;
        Ok(MealPlanEntry {
            id: row.get(0)?,
            recipe_id: row.get(1)?,
            planned_date: row.get(2)?,
            meal_type: MealType::parse(&meal_type).unwrap_or_default(),
            status: MealStatus::parse(&status).unwrap_or_default(),
            recipe_name: row.get(5)?,
            prep_time_mins: row.get(6)?,
            cook_time_mins: row.get(7)?,
            tags: parse_string_list_or_empty(tags.as_deref()),
            image_url: row.get(9)?,
        })
    }

    fn pantry_item_from_row(row: &rusqlite::Row) -> rusqlite::Result<PantryItem> {
        let category: String = row.get(3)?;
        Ok(PantryItem {
            id: row.get(0)?,
            name: row.get(1)?,
            barcode: row.get(2)?,
            category: PantryCategory::parse(&category).unwrap_or_default(),
            quantity: row.get(4)?,
            quantity_unit: row.get(5)?,
            expiry_date: row.get(6)?,
            is_low: row.get(7)?,
            image_url: row.get(8)?,
            added_at: row.get(9)?,
            updated_at: row.get(10)?,
            used_at: row.get(11)?,
        })
    }

    fn shopping_list_from_row(row: &rusqlite::Row) -> rusqlite::Result<ShoppingList> {
        let status: String = row.get(2)?;
        Ok(ShoppingList {
            id: row.get(0)?,
            name: row.get(1)?,
            status: ShoppingListStatus::parse(&status).unwrap_or_default(),
            created_at: row.get(3)?,
            completed_at: row.get(4)?,
        })
    }

    fn shopping_item_from_row(row: &rusqlite::Row) -> rusqlite::Result<ShoppingItem> {
        let category: String = row.get(4)?;
        let source: String = row.get(6)?;
        Ok(ShoppingItem {
            id: row.get(0)?,
            list_id: row.get(1)?,
            name: row.get(2)?,
            quantity: row.get(3)?,
            category: Category::parse(&category).unwrap_or_default(),
            checked: row.get(5)?,
            source: ItemSource::parse(&source).unwrap_or_default(),
            barcode: row.get(7)?,
            scanned_at: row.get(8)?,
            created_at: row.get(9)?,
        })
    }

    // --- Recipes ---

    pub fn create_recipe(&self, recipe: &NewRecipe) -> Result<Recipe> {
        let now = Local::now().to_rfc3339();
        let ingredients = serde_json::to_string(&recipe.ingredients)?;
        let tags = serde_json::to_string(&recipe.tags)?;
        self.conn.execute(
            "INSERT INTO recipes (name, description, ingredients, instructions, prep_time_mins,
                                  cook_time_mins, servings, tags, notes, image_url, source_url,
                                  created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                recipe.name,
                recipe.description,
                ingredients,
                recipe.instructions,
                recipe.prep_time_mins,
                recipe.cook_time_mins,
                recipe.servings.unwrap_or(DEFAULT_SERVINGS),
                tags,
                recipe.notes,
                recipe.image_url,
                recipe.source_url,
                now,
                now,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_recipe(id)?
            .context("Recipe not found after insert")
    }

    pub fn get_recipe(&self, id: i64) -> Result<Option<Recipe>> {
        let recipe = self
            .conn
            .query_row(
                &format!("SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = ?1"),
                params![id],
                Self::recipe_from_row,
            )
            .optional()?;
        Ok(recipe)
    }

    pub fn list_recipes(&self) -> Result<Vec<Recipe>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {RECIPE_COLUMNS} FROM recipes ORDER BY name ASC"))?;
        let recipes = stmt
            .query_map([], Self::recipe_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(recipes)
    }

    pub fn search_recipes(&self, query: &str, tag: Option<&str>) -> Result<Vec<Recipe>> {
        let mut sql = format!("SELECT {RECIPE_COLUMNS} FROM recipes WHERE name LIKE ?1 ESCAPE '\\'");
        let mut bindings = vec![Value::Text(like_pattern(query))];
        if let Some(tag) = tag {
            sql.push_str(" AND tags LIKE ?2 ESCAPE '\\'");
            bindings.push(Value::Text(like_pattern(tag)));
        }
        sql.push_str(" ORDER BY name ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let recipes = stmt
            .query_map(params_from_iter(bindings), Self::recipe_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(recipes)
    }

    /// Apply a partial update. Returns `None` when the recipe does not exist.
    pub fn update_recipe(&self, id: i64, update: &UpdateRecipe) -> Result<Option<Recipe>> {
        let now = Local::now().to_rfc3339();
        let ingredients = update
            .ingredients
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let tags = update.tags.as_ref().map(serde_json::to_string).transpose()?;
        let rows = self.conn.execute(
            "UPDATE recipes SET
                name = COALESCE(?1, name),
                description = COALESCE(?2, description),
                ingredients = COALESCE(?3, ingredients),
                instructions = COALESCE(?4, instructions),
                prep_time_mins = COALESCE(?5, prep_time_mins),
                cook_time_mins = COALESCE(?6, cook_time_mins),
                servings = COALESCE(?7, servings),
                tags = COALESCE(?8, tags),
                notes = COALESCE(?9, notes),
                rating = COALESCE(?10, rating),
                image_url = COALESCE(?11, image_url),
                source_url = COALESCE(?12, source_url),
                updated_at = ?13
             WHERE id = ?14",
            params![
                update.name,
                update.description,
                ingredients,
                update.instructions,
                update.prep_time_mins,
                update.cook_time_mins,
                update.servings,
                tags,
                update.notes,
                update.rating,
                update.image_url,
                update.source_url,
                now,
                id,
            ],
        )?;
        if rows == 0 {
            return Ok(None);
        }
        self.get_recipe(id)
    }

    /// Delete a recipe together with any meal plan slots that reference it.
    pub fn delete_recipe(&self, id: i64) -> Result<bool> {
        self.conn
            .execute("DELETE FROM meal_plans WHERE recipe_id = ?1", params![id])?;
        let rows = self
            .conn
            .execute("DELETE FROM recipes WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    pub fn count_recipes(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM recipes", [], |row| row.get(0))?;
        Ok(count)
    }

    // --- Meal plan ---

    /// Assign a recipe to a (date, meal) slot, replacing whatever was there.
    pub fn upsert_meal_plan_entry(&self, entry: &NewMealPlanEntry) -> Result<MealPlanEntry> {
        let now = Local::now().to_rfc3339();
        let date_str = entry.planned_date.format("%Y-%m-%d").to_string();
        self.conn.execute(
            "INSERT OR REPLACE INTO meal_plans (recipe_id, planned_date, meal_type, status, created_at)
             VALUES (?1, ?2, ?3, 'planned', ?4)",
            params![entry.recipe_id, date_str, entry.meal_type.as_str(), now],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_meal_plan_entry(id)?
            .context("Meal plan entry not found after insert")
    }

    pub fn get_meal_plan_entry(&self, id: i64) -> Result<Option<MealPlanEntry>> {
        let entry = self
            .conn
            .query_row(
                "SELECT mp.id, mp.recipe_id, mp.planned_date, mp.meal_type, mp.status,
                        r.name, r.prep_time_mins, r.cook_time_mins, r.tags, r.image_url
                 FROM meal_plans mp
                 LEFT JOIN recipes r ON mp.recipe_id = r.id
                 WHERE mp.id = ?1",
                params![id],
                Self::meal_plan_from_row,
            )
            .optional()?;
        Ok(entry)
    }

    /// Meal plan rows for `[week_start, week_start + 7 days)`, or everything when `None`.
    pub fn list_meal_plan(&self, week_start: Option<NaiveDate>) -> Result<Vec<MealPlanEntry>> {
        let base = "SELECT mp.id, mp.recipe_id, mp.planned_date, mp.meal_type, mp.status,
                           r.name, r.prep_time_mins, r.cook_time_mins, r.tags, r.image_url
                    FROM meal_plans mp
                    LEFT JOIN recipes r ON mp.recipe_id = r.id";
        let entries = if let Some(start) = week_start {
            let (start, end) = week_bounds(start)?;
            let mut stmt = self.conn.prepare(&format!(
                "{base} WHERE mp.planned_date >= ?1 AND mp.planned_date < ?2
                 ORDER BY mp.planned_date ASC, {MEAL_ORDER}"
            ))?;
            stmt.query_map(params![start, end], Self::meal_plan_from_row)?
                .collect::<Result<Vec<_>, _>>()?
        } else {
            let mut stmt = self.conn.prepare(&format!(
                "{base} ORDER BY mp.planned_date ASC, {MEAL_ORDER}"
            ))?;
            stmt.query_map([], Self::meal_plan_from_row)?
                .collect::<Result<Vec<_>, _>>()?
        };
        Ok(entries)
    }

    pub fn set_meal_plan_status(&self, id: i64, status: MealStatus) -> Result<bool> {
        let rows = self.conn.execute(
            "UPDATE meal_plans SET status = ?1 WHERE id = ?2",
            params![status.as_str(), id],
        )?;
        Ok(rows > 0)
    }

    pub fn delete_meal_plan_entry(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM meal_plans WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    /// Raw ingredient columns of every recipe planned in `[start, end_exclusive)`,
    /// in plan order (date, then breakfast/lunch/dinner).
    pub fn list_planned_ingredients(
        &self,
        start: NaiveDate,
        end_exclusive: NaiveDate,
    ) -> Result<Vec<PlannedIngredients>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT mp.recipe_id, r.ingredients
             FROM meal_plans mp
             JOIN recipes r ON mp.recipe_id = r.id
             WHERE mp.planned_date >= ?1 AND mp.planned_date < ?2
             ORDER BY mp.planned_date ASC, {MEAL_ORDER}, mp.id ASC"
        ))?;
        let rows = stmt
            .query_map(
                params![
                    start.format("%Y-%m-%d").to_string(),
                    end_exclusive.format("%Y-%m-%d").to_string()
                ],
                |row| {
                    Ok(PlannedIngredients {
                        recipe_id: row.get(0)?,
                        raw_ingredients: row.get(1)?,
                    })
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // --- Pantry ---

    pub fn insert_pantry_item(&self, item: &NewPantryItem) -> Result<PantryItem> {
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO pantry_items (name, barcode, category, quantity, quantity_unit,
                                       expiry_date, image_url, added_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                item.name,
                item.barcode,
                item.category.as_str(),
                item.quantity.as_deref().unwrap_or(DEFAULT_PANTRY_QUANTITY),
                item.quantity_unit,
                item.expiry_date,
                item.image_url,
                now,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_pantry_item(id)?
            .context("Pantry item not found after insert")
    }

    pub fn get_pantry_item(&self, id: i64) -> Result<Option<PantryItem>> {
        let item = self
            .conn
            .query_row(
                &format!("SELECT {PANTRY_COLUMNS} FROM pantry_items WHERE id = ?1"),
                params![id],
                Self::pantry_item_from_row,
            )
            .optional()?;
        Ok(item)
    }

    /// Current pantry (items not yet used up), narrowed by `filter`.
    pub fn list_pantry_items(&self, filter: &PantryFilter) -> Result<Vec<PantryItem>> {
        let mut sql = format!("SELECT {PANTRY_COLUMNS} FROM pantry_items WHERE used_at IS NULL");
        let mut bindings: Vec<Value> = Vec::new();

        if let Some(category) = filter.category {
            bindings.push(Value::Text(category.as_str().to_string()));
            sql.push_str(&format!(" AND category = ?{}", bindings.len()));
        }
        if filter.low_only {
            sql.push_str(" AND is_low = 1");
        }
        if let Some(days) = filter.expiring_within_days {
            let cutoff = days_from_today(days);
            bindings.push(Value::Text(cutoff.format("%Y-%m-%d").to_string()));
            sql.push_str(&format!(
                " AND expiry_date IS NOT NULL AND expiry_date <= ?{}",
                bindings.len()
            ));
        }
        if let Some(search) = &filter.search {
            bindings.push(Value::Text(like_pattern(search)));
            sql.push_str(&format!(" AND name LIKE ?{} ESCAPE '\\'", bindings.len()));
        }
        sql.push_str(" ORDER BY category ASC, name ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let items = stmt
            .query_map(params_from_iter(bindings), Self::pantry_item_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    pub fn update_pantry_item(&self, id: i64, update: &UpdatePantryItem) -> Result<Option<PantryItem>> {
        let now = Local::now().to_rfc3339();
        let rows = self.conn.execute(
            "UPDATE pantry_items SET
                name = COALESCE(?1, name),
                barcode = COALESCE(?2, barcode),
                category = COALESCE(?3, category),
                quantity = COALESCE(?4, quantity),
                quantity_unit = COALESCE(?5, quantity_unit),
                expiry_date = COALESCE(?6, expiry_date),
                is_low = COALESCE(?7, is_low),
                image_url = COALESCE(?8, image_url),
                updated_at = ?9
             WHERE id = ?10",
            params![
                update.name,
                update.barcode,
                update.category.map(PantryCategory::as_str),
                update.quantity,
                update.quantity_unit,
                update.expiry_date,
                update.is_low,
                update.image_url,
                now,
                id,
            ],
        )?;
        if rows == 0 {
            return Ok(None);
        }
        self.get_pantry_item(id)
    }

    pub fn delete_pantry_item(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM pantry_items WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    /// Use one unit. At zero the item is stamped `used_at` rather than deleted.
    pub fn decrement_pantry_item(&self, id: i64) -> Result<Option<QuantityChange>> {
        let Some(item) = self.get_pantry_item(id)? else {
            return Ok(None);
        };
        let now = Local::now().to_rfc3339();
        let new_qty = quantity_count(&item.quantity).saturating_sub(1).max(0);

        if new_qty == 0 {
            self.conn.execute(
                "UPDATE pantry_items SET quantity = '0', used_at = ?1, updated_at = ?1 WHERE id = ?2",
                params![now, id],
            )?;
            return Ok(Some(QuantityChange {
                quantity: 0,
                message: "Item marked as used".to_string(),
            }));
        }

        self.conn.execute(
            "UPDATE pantry_items SET quantity = ?1, updated_at = ?2 WHERE id = ?3",
            params![new_qty.to_string(), now, id],
        )?;
        Ok(Some(QuantityChange {
            quantity: new_qty,
            message: "Quantity decreased".to_string(),
        }))
    }

    pub fn increment_pantry_item(&self, id: i64) -> Result<Option<QuantityChange>> {
        let Some(item) = self.get_pantry_item(id)? else {
            return Ok(None);
        };
        let now = Local::now().to_rfc3339();
        let new_qty = quantity_count(&item.quantity).saturating_add(1);
        self.conn.execute(
            "UPDATE pantry_items SET quantity = ?1, updated_at = ?2 WHERE id = ?3",
            params![new_qty.to_string(), now, id],
        )?;
        Ok(Some(QuantityChange {
            quantity: new_qty,
            message: "Quantity increased".to_string(),
        }))
    }

    /// Flip the low-stock flag, returning the new value.
    pub fn toggle_pantry_low(&self, id: i64) -> Result<Option<bool>> {
        let Some(item) = self.get_pantry_item(id)? else {
            return Ok(None);
        };
        let now = Local::now().to_rfc3339();
        let is_low = !item.is_low;
        self.conn.execute(
            "UPDATE pantry_items SET is_low = ?1, updated_at = ?2 WHERE id = ?3",
            params![is_low, now, id],
        )?;
        Ok(Some(is_low))
    }

    pub fn pantry_stats(&self) -> Result<PantryStats> {
        let mut stats = PantryStats::default();
        {
            let mut stmt = self.conn.prepare(
                "SELECT category, COUNT(*) FROM pantry_items
                 WHERE used_at IS NULL
                 GROUP BY category",
            )?;
            let rows = stmt
                .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
                .collect::<Result<Vec<_>, _>>()?;
            for (category, count) in rows {
                stats.total += count;
                stats.categories.insert(category, count);
            }
        }

        stats.low = self.conn.query_row(
            "SELECT COUNT(*) FROM pantry_items WHERE used_at IS NULL AND is_low = 1",
            [],
            |row| row.get(0),
        )?;

        let cutoff = days_from_today(EXPIRING_SOON_DAYS);
        stats.expiring = self.conn.query_row(
            "SELECT COUNT(*) FROM pantry_items
             WHERE used_at IS NULL AND expiry_date IS NOT NULL AND expiry_date <= ?1",
            params![cutoff.format("%Y-%m-%d").to_string()],
            |row| row.get(0),
        )?;

        Ok(stats)
    }

    /// Names of items confidently on hand: not used up and not flagged low.
    pub fn list_in_stock_pantry_names(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM pantry_items
             WHERE used_at IS NULL AND (is_low = 0 OR is_low IS NULL)
             ORDER BY id ASC",
        )?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(names)
    }

    // --- Shopping lists ---

    /// The most recent active list, creating a default one if none is active.
    pub fn get_or_create_active_shopping_list(&self) -> Result<ShoppingList> {
        if let Some(list) = self.get_active_shopping_list()? {
            return Ok(list);
        }
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO shopping_lists (name, status, created_at) VALUES (?1, 'active', ?2)",
            params![DEFAULT_LIST_NAME, now],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_shopping_list(id)?
            .context("Shopping list not found after insert")
    }

    pub fn get_active_shopping_list(&self) -> Result<Option<ShoppingList>> {
        let list = self
            .conn
            .query_row(
                &format!(
                    "SELECT {LIST_COLUMNS} FROM shopping_lists
                     WHERE status = 'active'
                     ORDER BY created_at DESC, id DESC LIMIT 1"
                ),
                [],
                Self::shopping_list_from_row,
            )
            .optional()?;
        Ok(list)
    }

    /// Start a fresh active list, completing any list that was active before.
    pub fn create_shopping_list(&self, name: &str) -> Result<ShoppingList> {
        let now = Local::now().to_rfc3339();
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "UPDATE shopping_lists SET status = 'completed', completed_at = ?1 WHERE status = 'active'",
            params![now],
        )?;
        tx.execute(
            "INSERT INTO shopping_lists (name, status, created_at) VALUES (?1, 'active', ?2)",
            params![name, now],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        self.get_shopping_list(id)?
            .context("Shopping list not found after insert")
    }

    pub fn get_shopping_list(&self, id: i64) -> Result<Option<ShoppingList>> {
        let list = self
            .conn
            .query_row(
                &format!("SELECT {LIST_COLUMNS} FROM shopping_lists WHERE id = ?1"),
                params![id],
                Self::shopping_list_from_row,
            )
            .optional()?;
        Ok(list)
    }

    pub fn get_shopping_list_with_items(&self, id: i64) -> Result<Option<ShoppingListWithItems>> {
        let Some(list) = self.get_shopping_list(id)? else {
            return Ok(None);
        };
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ITEM_COLUMNS} FROM shopping_items WHERE list_id = ?1
             ORDER BY category ASC, name ASC"
        ))?;
        let items = stmt
            .query_map(params![id], Self::shopping_item_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(ShoppingListWithItems { list, items }))
    }

    pub fn update_shopping_list(
        &self,
        id: i64,
        name: Option<&str>,
        status: Option<ShoppingListStatus>,
    ) -> Result<Option<ShoppingList>> {
        let now = Local::now().to_rfc3339();
        let completed_at = status
            .filter(|s| *s == ShoppingListStatus::Completed)
            .map(|_| now);
        let rows = self.conn.execute(
            "UPDATE shopping_lists SET
                name = COALESCE(?1, name),
                status = COALESCE(?2, status),
                completed_at = COALESCE(?3, completed_at)
             WHERE id = ?4",
            params![name, status.map(ShoppingListStatus::as_str), completed_at, id],
        )?;
        if rows == 0 {
            return Ok(None);
        }
        self.get_shopping_list(id)
    }

    // --- Shopping items ---

    pub fn list_shopping_items(&self, list_id: i64) -> Result<Vec<ShoppingItem>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ITEM_COLUMNS} FROM shopping_items WHERE list_id = ?1
             ORDER BY category ASC, checked ASC, name ASC"
        ))?;
        let items = stmt
            .query_map(params![list_id], Self::shopping_item_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    pub fn insert_shopping_item(&self, item: &NewShoppingItem) -> Result<ShoppingItem> {
        let now = Local::now().to_rfc3339();
        let scanned_at = item.barcode.as_ref().map(|_| now.clone());
        self.conn.execute(
            "INSERT INTO shopping_items (list_id, name, quantity, category, source, barcode,
                                         scanned_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                item.list_id,
                item.name,
                item.quantity,
                item.category.as_str(),
                item.source.as_str(),
                item.barcode,
                scanned_at,
                now,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_shopping_item(id)?
            .context("Shopping item not found after insert")
    }

    pub fn get_shopping_item(&self, id: i64) -> Result<Option<ShoppingItem>> {
        let item = self
            .conn
            .query_row(
                &format!("SELECT {ITEM_COLUMNS} FROM shopping_items WHERE id = ?1"),
                params![id],
                Self::shopping_item_from_row,
            )
            .optional()?;
        Ok(item)
    }

    pub fn update_shopping_item(
        &self,
        id: i64,
        update: &UpdateShoppingItem,
    ) -> Result<Option<ShoppingItem>> {
        let rows = self.conn.execute(
            "UPDATE shopping_items SET
                name = COALESCE(?1, name),
                quantity = COALESCE(?2, quantity),
                category = COALESCE(?3, category)
             WHERE id = ?4",
            params![
                update.name,
                update.quantity,
                update.category.map(Category::as_str),
                id
            ],
        )?;
        if rows == 0 {
            return Ok(None);
        }
        self.get_shopping_item(id)
    }

    pub fn delete_shopping_item(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM shopping_items WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    /// Flip the checked flag, returning the new value.
    pub fn toggle_shopping_item_checked(&self, id: i64) -> Result<Option<bool>> {
        let Some(item) = self.get_shopping_item(id)? else {
            return Ok(None);
        };
        let checked = !item.checked;
        self.conn.execute(
            "UPDATE shopping_items SET checked = ?1 WHERE id = ?2",
            params![checked, id],
        )?;
        Ok(Some(checked))
    }

    /// Remove every checked item on a list, returning how many went.
    pub fn clear_checked_items(&self, list_id: i64) -> Result<usize> {
        let rows = self.conn.execute(
            "DELETE FROM shopping_items WHERE list_id = ?1 AND checked = 1",
            params![list_id],
        )?;
        Ok(rows)
    }
}

/// `[start, start + 7 days)` as stored date strings.
fn week_bounds(start: NaiveDate) -> Result<(String, String)> {
    let end = week_end(start)?;
    Ok((
        start.format("%Y-%m-%d").to_string(),
        end.format("%Y-%m-%d").to_string(),
    ))
}

/// Today shifted by `days`, clamped to four-digit years so the cutoff
/// still compares correctly against stored `YYYY-MM-DD` text.
fn days_from_today(days: i64) -> NaiveDate {
    let today = Local::now().date_naive();
    let offset = Days::new(days.unsigned_abs());
    let shifted = if days >= 0 {
        today.checked_add_days(offset)
    } else {
        today.checked_sub_days(offset)
    };
    let (first, last) = storable_date_range();
    shifted.map_or(if days >= 0 { last } else { first }, |d| d.clamp(first, last))
}

fn storable_date_range() -> (NaiveDate, NaiveDate) {
    (
        NaiveDate::from_ymd_opt(1, 1, 1).unwrap_or(NaiveDate::MIN),
        NaiveDate::from_ymd_opt(9999, 12, 31).unwrap_or(NaiveDate::MAX),
    )
}

fn like_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Whole-unit count from a free-text quantity ("3", "2 packs", "1.5").
/// Anything without a leading non-zero integer counts as one.
fn quantity_count(quantity: &str) -> i64 {
    let trimmed = quantity.trim_start();
    let (sign, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end]
        .parse::<i64>()
        .ok()
        .map(|n| sign * n)
        .filter(|n| *n != 0)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewPantryItem, NewRecipe};

    fn sample_recipe(name: &str, ingredients: &[&str]) -> NewRecipe {
        NewRecipe {
            name: name.to_string(),
            ingredients: ingredients.iter().map(ToString::to_string).collect(),
            tags: vec!["quick".to_string()],
            prep_time_mins: Some(10),
            cook_time_mins: Some(20),
            ..NewRecipe::default()
        }
    }

    fn sample_pantry(name: &str, category: PantryCategory) -> NewPantryItem {
        NewPantryItem {
            name: name.to_string(),
            category,
            barcode: None,
            quantity: None,
            quantity_unit: None,
            expiry_date: None,
            image_url: None,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_create_and_get_recipe() {
        let db = Database::open_in_memory().unwrap();
        let recipe = db
            .create_recipe(&sample_recipe("Chilli", &["500g beef mince", "1 tin tomatoes"]))
            .unwrap();

        assert_eq!(recipe.name, "Chilli");
        assert_eq!(recipe.ingredients, vec!["500g beef mince", "1 tin tomatoes"]);
        assert_eq!(recipe.tags, vec!["quick"]);
        assert_eq!(recipe.servings, DEFAULT_SERVINGS);

        let fetched = db.get_recipe(recipe.id).unwrap().unwrap();
        assert_eq!(fetched.id, recipe.id);
        assert!(db.get_recipe(9999).unwrap().is_none());
    }

    #[test]
    fn test_update_recipe_keeps_unset_fields() {
        let db = Database::open_in_memory().unwrap();
        let recipe = db.create_recipe(&sample_recipe("Soup", &["leeks"])).unwrap();

        let updated = db
            .update_recipe(
                recipe.id,
                &UpdateRecipe {
                    rating: Some(4),
                    ingredients: Some(vec!["leeks".to_string(), "potatoes".to_string()]),
                    ..UpdateRecipe::default()
                },
            )
            .unwrap()
            .unwrap();

        assert_eq!(updated.name, "Soup");
        assert_eq!(updated.rating, Some(4));
        assert_eq!(updated.ingredients.len(), 2);
        assert_eq!(updated.prep_time_mins, Some(10));

        assert!(db.update_recipe(9999, &UpdateRecipe::default()).unwrap().is_none());
    }

    #[test]
    fn test_search_recipes_by_name_and_tag() {
        let db = Database::open_in_memory().unwrap();
        db.create_recipe(&sample_recipe("Chicken Curry", &["chicken"])).unwrap();
        let mut slow = sample_recipe("Beef Stew", &["beef"]);
        slow.tags = vec!["slow-cooker".to_string()];
        db.create_recipe(&slow).unwrap();

        let results = db.search_recipes("curry", None).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "Chicken Curry");

        let results = db.search_recipes("", Some("slow")).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "Beef Stew");

        // LIKE wildcards in the query are literal
        assert!(db.search_recipes("%", None).unwrap().is_empty());
    }

    #[test]
    fn test_delete_recipe_removes_plan_slots() {
        let db = Database::open_in_memory().unwrap();
        let recipe = db.create_recipe(&sample_recipe("Tacos", &["tortillas"])).unwrap();
        db.upsert_meal_plan_entry(&NewMealPlanEntry {
            recipe_id: recipe.id,
            planned_date: date(2024, 6, 10),
            meal_type: MealType::Dinner,
        })
        .unwrap();

        assert!(db.delete_recipe(recipe.id).unwrap());
        assert!(!db.delete_recipe(recipe.id).unwrap());
        assert!(db.list_meal_plan(None).unwrap().is_empty());
        assert_eq!(db.count_recipes().unwrap(), 0);
    }

    #[test]
    fn test_meal_plan_slot_is_replaced() {
        let db = Database::open_in_memory().unwrap();
        let first = db.create_recipe(&sample_recipe("Pasta", &["pasta"])).unwrap();
        let second = db.create_recipe(&sample_recipe("Risotto", &["rice"])).unwrap();

        let slot = NewMealPlanEntry {
            recipe_id: first.id,
            planned_date: date(2024, 6, 10),
            meal_type: MealType::Dinner,
        };
        db.upsert_meal_plan_entry(&slot).unwrap();
        let replaced = db
            .upsert_meal_plan_entry(&NewMealPlanEntry {
                recipe_id: second.id,
                ..slot.clone()
            })
            .unwrap();

        let plan = db.list_meal_plan(None).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].id, replaced.id);
        assert_eq!(plan[0].recipe_name.as_deref(), Some("Risotto"));
        assert_eq!(plan[0].status, MealStatus::Planned);

        // A different meal on the same day is a separate slot
        db.upsert_meal_plan_entry(&NewMealPlanEntry {
            meal_type: MealType::Lunch,
            ..slot
        })
        .unwrap();
        assert_eq!(db.list_meal_plan(None).unwrap().len(), 2);
    }

    #[test]
    fn test_week_window_is_half_open() {
        let db = Database::open_in_memory().unwrap();
        let recipe = db.create_recipe(&sample_recipe("Omelette", &["eggs"])).unwrap();
        for day in [9, 10, 16, 17] {
            db.upsert_meal_plan_entry(&NewMealPlanEntry {
                recipe_id: recipe.id,
                planned_date: date(2024, 6, day),
                meal_type: MealType::Breakfast,
            })
            .unwrap();
        }

        let week = db.list_meal_plan(Some(date(2024, 6, 10))).unwrap();
        let dates: Vec<&str> = week.iter().map(|e| e.planned_date.as_str()).collect();
        assert_eq!(dates, vec!["2024-06-10", "2024-06-16"]);

        let planned = db
            .list_planned_ingredients(date(2024, 6, 10), date(2024, 6, 17))
            .unwrap();
        assert_eq!(planned.len(), 2);
        assert_eq!(planned[0].raw_ingredients, r#"["eggs"]"#);
    }

    #[test]
    fn test_meal_plan_orders_meals_within_day() {
        let db = Database::open_in_memory().unwrap();
        let recipe = db.create_recipe(&sample_recipe("Toast", &["bread"])).unwrap();
        for meal_type in [MealType::Dinner, MealType::Breakfast, MealType::Lunch] {
            db.upsert_meal_plan_entry(&NewMealPlanEntry {
                recipe_id: recipe.id,
                planned_date: date(2024, 6, 10),
                meal_type,
            })
            .unwrap();
        }
        let plan = db.list_meal_plan(Some(date(2024, 6, 10))).unwrap();
        let meals: Vec<MealType> = plan.iter().map(|e| e.meal_type).collect();
        assert_eq!(meals, MealType::ALL.to_vec());
    }

    #[test]
    fn test_set_meal_plan_status() {
        let db = Database::open_in_memory().unwrap();
        let recipe = db.create_recipe(&sample_recipe("Salad", &["lettuce"])).unwrap();
        let entry = db
            .upsert_meal_plan_entry(&NewMealPlanEntry {
                recipe_id: recipe.id,
                planned_date: date(2024, 6, 12),
                meal_type: MealType::Lunch,
            })
            .unwrap();

        assert!(db.set_meal_plan_status(entry.id, MealStatus::Cooked).unwrap());
        let fetched = db.get_meal_plan_entry(entry.id).unwrap().unwrap();
        assert_eq!(fetched.status, MealStatus::Cooked);
        assert!(!db.set_meal_plan_status(9999, MealStatus::Skipped).unwrap());
    }

    #[test]
    fn test_insert_pantry_item_defaults() {
        let db = Database::open_in_memory().unwrap();
        let item = db
            .insert_pantry_item(&sample_pantry("Milk", PantryCategory::Fridge))
            .unwrap();
        assert_eq!(item.quantity, "1");
        assert!(!item.is_low);
        assert!(item.used_at.is_none());
        assert!(item.is_in_stock());
    }

    #[test]
    fn test_decrement_marks_item_used() {
        let db = Database::open_in_memory().unwrap();
        let mut new_item = sample_pantry("Eggs", PantryCategory::Fridge);
        new_item.quantity = Some("2".to_string());
        let item = db.insert_pantry_item(&new_item).unwrap();

        let change = db.decrement_pantry_item(item.id).unwrap().unwrap();
        assert_eq!(change.quantity, 1);
        assert_eq!(change.message, "Quantity decreased");

        let change = db.decrement_pantry_item(item.id).unwrap().unwrap();
        assert_eq!(change.quantity, 0);
        assert_eq!(change.message, "Item marked as used");

        let used = db.get_pantry_item(item.id).unwrap().unwrap();
        assert_eq!(used.quantity, "0");
        assert!(used.used_at.is_some());
        // Used items drop out of the current pantry view
        assert!(db.list_pantry_items(&PantryFilter::default()).unwrap().is_empty());

        assert!(db.decrement_pantry_item(9999).unwrap().is_none());
    }

    #[test]
    fn test_increment_pantry_item() {
        let db = Database::open_in_memory().unwrap();
        let mut new_item = sample_pantry("Beans", PantryCategory::Cupboard);
        new_item.quantity = Some("3 tins".to_string());
        let item = db.insert_pantry_item(&new_item).unwrap();

        let change = db.increment_pantry_item(item.id).unwrap().unwrap();
        assert_eq!(change.quantity, 4);
        assert_eq!(db.get_pantry_item(item.id).unwrap().unwrap().quantity, "4");
    }

    #[test]
    fn test_quantity_count() {
        assert_eq!(quantity_count("3"), 3);
        assert_eq!(quantity_count("2 packs"), 2);
        assert_eq!(quantity_count("1.5"), 1);
        assert_eq!(quantity_count("some"), 1);
        assert_eq!(quantity_count("0"), 1);
        assert_eq!(quantity_count(""), 1);
        assert_eq!(quantity_count("-2"), -2);
        assert_eq!(quantity_count("9223372036854775807"), i64::MAX);
        // Too large for i64
        assert_eq!(quantity_count("99999999999999999999"), 1);
    }

    #[test]
    fn test_quantity_saturates_at_bounds() {
        let db = Database::open_in_memory().unwrap();
        let mut huge = sample_pantry("Rice", PantryCategory::Cupboard);
        huge.quantity = Some(i64::MAX.to_string());
        let huge = db.insert_pantry_item(&huge).unwrap();

        let change = db.increment_pantry_item(huge.id).unwrap().unwrap();
        assert_eq!(change.quantity, i64::MAX);
        let stored = db.get_pantry_item(huge.id).unwrap().unwrap();
        assert_eq!(stored.quantity, i64::MAX.to_string());

        let mut owed = sample_pantry("Flour", PantryCategory::Cupboard);
        owed.quantity = Some((-i64::MAX).to_string());
        let owed = db.insert_pantry_item(&owed).unwrap();
        let change = db.decrement_pantry_item(owed.id).unwrap().unwrap();
        assert_eq!(change.quantity, 0);
    }

    #[test]
    fn test_week_bounds_rejects_overflow() {
        let (start, end) = week_bounds(date(2024, 6, 12)).unwrap();
        assert_eq!((start.as_str(), end.as_str()), ("2024-06-12", "2024-06-19"));

        let db = Database::open_in_memory().unwrap();
        assert!(db.list_meal_plan(Some(NaiveDate::MAX)).is_err());
    }

    #[test]
    fn test_expiring_filter_with_huge_window() {
        let db = Database::open_in_memory().unwrap();
        let mut jam = sample_pantry("Jam", PantryCategory::Cupboard);
        jam.expiry_date = Some("2099-01-01".to_string());
        db.insert_pantry_item(&jam).unwrap();

        let filter = PantryFilter {
            expiring_within_days: Some(i64::MAX),
            ..PantryFilter::default()
        };
        assert_eq!(db.list_pantry_items(&filter).unwrap().len(), 1);
        assert_eq!(days_from_today(i64::MAX), date(9999, 12, 31));
        assert_eq!(days_from_today(i64::MIN), date(1, 1, 1));
    }

    #[test]
    fn test_toggle_low_excludes_from_in_stock() {
        let db = Database::open_in_memory().unwrap();
        let milk = db
            .insert_pantry_item(&sample_pantry("Milk", PantryCategory::Fridge))
            .unwrap();
        db.insert_pantry_item(&sample_pantry("Rice", PantryCategory::Cupboard))
            .unwrap();

        assert_eq!(db.toggle_pantry_low(milk.id).unwrap(), Some(true));
        assert_eq!(db.list_in_stock_pantry_names().unwrap(), vec!["Rice"]);

        let low = db
            .list_pantry_items(&PantryFilter {
                low_only: true,
                ..PantryFilter::default()
            })
            .unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].name, "Milk");

        assert_eq!(db.toggle_pantry_low(milk.id).unwrap(), Some(false));
        assert_eq!(db.list_in_stock_pantry_names().unwrap().len(), 2);
        assert!(db.toggle_pantry_low(9999).unwrap().is_none());
    }

    #[test]
    fn test_list_pantry_filters() {
        let db = Database::open_in_memory().unwrap();
        let soon = days_from_today(1).format("%Y-%m-%d").to_string();
        let later = days_from_today(30).format("%Y-%m-%d").to_string();

        let mut yoghurt = sample_pantry("Yoghurt", PantryCategory::Fridge);
        yoghurt.expiry_date = Some(soon);
        db.insert_pantry_item(&yoghurt).unwrap();
        let mut peas = sample_pantry("Peas", PantryCategory::Freezer);
        peas.expiry_date = Some(later);
        db.insert_pantry_item(&peas).unwrap();
        db.insert_pantry_item(&sample_pantry("Pasta", PantryCategory::Cupboard))
            .unwrap();

        let all = db.list_pantry_items(&PantryFilter::default()).unwrap();
        let names: Vec<&str> = all.iter().map(|i| i.name.as_str()).collect();
        // Ordered by category text, then name
        assert_eq!(names, vec!["Pasta", "Peas", "Yoghurt"]);

        let freezer = db
            .list_pantry_items(&PantryFilter {
                category: Some(PantryCategory::Freezer),
                ..PantryFilter::default()
            })
            .unwrap();
        assert_eq!(freezer.len(), 1);

        let expiring = db
            .list_pantry_items(&PantryFilter {
                expiring_within_days: Some(3),
                ..PantryFilter::default()
            })
            .unwrap();
        assert_eq!(expiring.len(), 1);
        assert_eq!(expiring[0].name, "Yoghurt");

        let search = db
            .list_pantry_items(&PantryFilter {
                search: Some("pa".to_string()),
                ..PantryFilter::default()
            })
            .unwrap();
        assert_eq!(search.len(), 1);
        assert_eq!(search[0].name, "Pasta");
    }

    #[test]
    fn test_pantry_stats() {
        let db = Database::open_in_memory().unwrap();
        let today = Local::now().date_naive().format("%Y-%m-%d").to_string();
        let mut milk = sample_pantry("Milk", PantryCategory::Fridge);
        milk.expiry_date = Some(today);
        let milk = db.insert_pantry_item(&milk).unwrap();
        db.insert_pantry_item(&sample_pantry("Cheese", PantryCategory::Fridge))
            .unwrap();
        db.insert_pantry_item(&sample_pantry("Flour", PantryCategory::Cupboard))
            .unwrap();
        db.toggle_pantry_low(milk.id).unwrap();

        let stats = db.pantry_stats().unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.categories.get("fridge"), Some(&2));
        assert_eq!(stats.categories.get("cupboard"), Some(&1));
        assert_eq!(stats.low, 1);
        assert_eq!(stats.expiring, 1);
    }

    #[test]
    fn test_update_pantry_item() {
        let db = Database::open_in_memory().unwrap();
        let item = db
            .insert_pantry_item(&sample_pantry("Butter", PantryCategory::Fridge))
            .unwrap();
        let updated = db
            .update_pantry_item(
                item.id,
                &UpdatePantryItem {
                    category: Some(PantryCategory::Freezer),
                    is_low: Some(true),
                    ..UpdatePantryItem::default()
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "Butter");
        assert_eq!(updated.category, PantryCategory::Freezer);
        assert!(updated.is_low);
        assert!(updated.updated_at.is_some());

        assert!(db.delete_pantry_item(item.id).unwrap());
        assert!(db.get_pantry_item(item.id).unwrap().is_none());
    }

    #[test]
    fn test_get_or_create_active_list_reuses() {
        let db = Database::open_in_memory().unwrap();
        let first = db.get_or_create_active_shopping_list().unwrap();
        let second = db.get_or_create_active_shopping_list().unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.name, DEFAULT_LIST_NAME);
        assert_eq!(first.status, ShoppingListStatus::Active);
    }

    #[test]
    fn test_create_list_completes_previous() {
        let db = Database::open_in_memory().unwrap();
        let old = db.get_or_create_active_shopping_list().unwrap();
        let new = db.create_shopping_list("Party").unwrap();

        assert_ne!(old.id, new.id);
        let old = db.get_shopping_list(old.id).unwrap().unwrap();
        assert_eq!(old.status, ShoppingListStatus::Completed);
        assert!(old.completed_at.is_some());

        let active = db.get_active_shopping_list().unwrap().unwrap();
        assert_eq!(active.id, new.id);
        assert_eq!(active.name, "Party");

        let active_count: i64 = db
            .conn
            .query_row(
                "SELECT COUNT(*) FROM shopping_lists WHERE status = 'active'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(active_count, 1);
    }

    #[test]
    fn test_update_shopping_list_status() {
        let db = Database::open_in_memory().unwrap();
        let list = db.get_or_create_active_shopping_list().unwrap();
        let updated = db
            .update_shopping_list(list.id, Some("Big Shop"), Some(ShoppingListStatus::Completed))
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "Big Shop");
        assert_eq!(updated.status, ShoppingListStatus::Completed);
        assert!(updated.completed_at.is_some());

        // With nothing active, a new default list is created
        let next = db.get_or_create_active_shopping_list().unwrap();
        assert_ne!(next.id, list.id);
        assert!(db.update_shopping_list(9999, Some("x"), None).unwrap().is_none());
    }

    #[test]
    fn test_shopping_items_lifecycle() {
        let db = Database::open_in_memory().unwrap();
        let list = db.get_or_create_active_shopping_list().unwrap();

        let bread = db
            .insert_shopping_item(&NewShoppingItem {
                list_id: list.id,
                name: "Bread".to_string(),
                category: Category::Bakery,
                ..NewShoppingItem::default()
            })
            .unwrap();
        assert_eq!(bread.source, ItemSource::Manual);
        assert!(bread.scanned_at.is_none());

        let scanned = db
            .insert_shopping_item(&NewShoppingItem {
                list_id: list.id,
                name: "Beans".to_string(),
                source: ItemSource::TrashScan,
                barcode: Some("5000157024671".to_string()),
                ..NewShoppingItem::default()
            })
            .unwrap();
        assert_eq!(scanned.category, Category::Other);
        assert!(scanned.scanned_at.is_some());

        assert_eq!(db.toggle_shopping_item_checked(bread.id).unwrap(), Some(true));

        let items = db.list_shopping_items(list.id).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "Bread");

        let updated = db
            .update_shopping_item(
                scanned.id,
                &UpdateShoppingItem {
                    quantity: Some("2".to_string()),
                    category: Some(Category::Cupboard),
                    ..UpdateShoppingItem::default()
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "Beans");
        assert_eq!(updated.category, Category::Cupboard);

        assert_eq!(db.clear_checked_items(list.id).unwrap(), 1);
        let remaining = db.get_shopping_list_with_items(list.id).unwrap().unwrap();
        assert_eq!(remaining.items.len(), 1);
        assert_eq!(remaining.items[0].name, "Beans");

        assert!(db.delete_shopping_item(scanned.id).unwrap());
        assert!(!db.delete_shopping_item(scanned.id).unwrap());
    }

    #[test]
    fn test_open_on_disk_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fivethirty.db");
        {
            let db = Database::open(&path).unwrap();
            db.create_recipe(&sample_recipe("Porridge", &["oats", "milk"]))
                .unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert_eq!(db.count_recipes().unwrap(), 1);
    }
}
