use anyhow::{Result, bail};
use tabled::{Table, Tabled, settings::Style};

use fivethirty_core::db::Database;
use fivethirty_core::models::{
    Category, DEFAULT_LIST_NAME, ItemSource, NewShoppingItem, ShoppingList, validate_name,
};
use fivethirty_core::shopping;

use super::helpers::{exit_not_found, or_dash, parse_week, parse_window_start, truncate};

/// The list a command acts on: an explicit id, or the active list.
fn resolve_list(db: &Database, list_id: Option<i64>, json: bool) -> Result<ShoppingList> {
    match list_id {
        Some(id) => match db.get_shopping_list(id)? {
            Some(list) => Ok(list),
            None => exit_not_found("Shopping list not found", json),
        },
        None => db.get_or_create_active_shopping_list(),
    }
}

pub(crate) fn cmd_shop_generate(
    db: &Database,
    week: Option<String>,
    from: Option<String>,
    json: bool,
) -> Result<()> {
    // --from keeps its weekday; --week snaps back to Monday
    let week_start = match from {
        Some(from) => parse_window_start(Some(from))?,
        None => parse_week(week)?,
    };
    let summary = shopping::generate(db, week_start)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "Week from {}: {}",
            week_start.format("%a %Y-%m-%d"),
            summary.message
        );
        if let Some(held) = summary.pantry_items_subtracted {
            println!("  Checked against {held} pantry items");
        }
        println!("  View it with: fivethirty shop show");
    }
    Ok(())
}

pub(crate) fn cmd_shop_show(db: &Database, list_id: Option<i64>, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct ItemRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "")]
        checked: &'static str,
        #[tabled(rename = "Item")]
        name: String,
        #[tabled(rename = "Qty")]
        quantity: String,
        #[tabled(rename = "Aisle")]
        category: &'static str,
        #[tabled(rename = "Source")]
        source: &'static str,
    }

    let list = resolve_list(db, list_id, json)?;
    let Some(detail) = db.get_shopping_list_with_items(list.id)? else {
        exit_not_found("Shopping list not found", json);
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&detail)?);
        return Ok(());
    }

    let remaining = detail.items.iter().filter(|i| !i.checked).count();
    println!(
        "=== {} ({}, {remaining}/{} left) ===",
        detail.list.name,
        detail.list.status.as_str(),
        detail.items.len()
    );
    if detail.items.is_empty() {
        println!("  Nothing on the list");
        return Ok(());
    }

    let rows: Vec<ItemRow> = detail
        .items
        .iter()
        .map(|i| ItemRow {
            id: i.id,
            checked: if i.checked { "[x]" } else { "[ ]" },
            name: truncate(&i.name, 30),
            quantity: or_dash(i.quantity.as_deref()),
            category: i.category.as_str(),
            source: i.source.as_str(),
        })
        .collect();

    let table = Table::new(&rows).with(Style::rounded()).to_string();
    println!("{table}");

    Ok(())
}

pub(crate) fn cmd_shop_add(
    db: &Database,
    name: &str,
    quantity: Option<String>,
    category: Option<&str>,
    list_id: Option<i64>,
    json: bool,
) -> Result<()> {
    let name = validate_name(name)?;
    let category = match category {
        Some(c) => Category::parse(c)?,
        None => shopping::categorize(&name),
    };
    let list = resolve_list(db, list_id, json)?;
    let item = db.insert_shopping_item(&NewShoppingItem {
        list_id: list.id,
        name,
        quantity,
        category,
        source: ItemSource::Manual,
        barcode: None,
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&item)?);
    } else {
        println!(
            "Added {} to {} ({}, id: {})",
            item.name,
            list.name,
            item.category.as_str(),
            item.id
        );
    }
    Ok(())
}

pub(crate) fn cmd_shop_check(db: &Database, item_id: i64, json: bool) -> Result<()> {
    let Some(checked) = db.toggle_shopping_item_checked(item_id)? else {
        exit_not_found("Item not found", json);
    };
    let message = if checked {
        "Item checked"
    } else {
        "Item unchecked"
    };
    if json {
        println!(
            "{}",
            serde_json::json!({ "id": item_id, "checked": checked, "message": message })
        );
    } else {
        println!("{message}");
    }
    Ok(())
}

pub(crate) fn cmd_shop_clear(db: &Database, list_id: Option<i64>, json: bool) -> Result<()> {
    let list = resolve_list(db, list_id, json)?;
    let removed = db.clear_checked_items(list.id)?;
    if json {
        println!(
            "{}",
            serde_json::json!({ "list_id": list.id, "removed": removed })
        );
    } else {
        println!("Removed {removed} checked items from {}", list.name);
    }
    Ok(())
}

pub(crate) fn cmd_shop_new(db: &Database, name: Option<String>, json: bool) -> Result<()> {
    let name = name.unwrap_or_else(|| DEFAULT_LIST_NAME.to_string());
    if name.trim().is_empty() {
        bail!("List name must not be empty");
    }
    let list = db.create_shopping_list(name.trim())?;
    if json {
        println!("{}", serde_json::to_string_pretty(&list)?);
    } else {
        println!("Started shopping list: {} (id: {})", list.name, list.id);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fivethirty_core::models::{NewMealPlanEntry, NewRecipe, ShoppingListStatus};

    #[test]
    fn test_add_categorizes_by_keyword() {
        let db = Database::open_in_memory().unwrap();
        cmd_shop_add(&db, "Greek yoghurt", None, None, None, true).unwrap();
        cmd_shop_add(&db, "Kitchen roll", Some("2".to_string()), Some("other"), None, true)
            .unwrap();

        let list = db.get_or_create_active_shopping_list().unwrap();
        let items = db.list_shopping_items(list.id).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "Greek yoghurt");
        assert_eq!(items[0].category, Category::Dairy);
        assert_eq!(items[1].category, Category::Other);
        assert_eq!(items[1].quantity.as_deref(), Some("2"));
        assert!(items.iter().all(|i| i.source == ItemSource::Manual));
    }

    #[test]
    fn test_add_rejects_unknown_category() {
        let db = Database::open_in_memory().unwrap();
        assert!(cmd_shop_add(&db, "Socks", None, Some("clothing"), None, true).is_err());
    }

    #[test]
    fn test_new_completes_active_list() {
        let db = Database::open_in_memory().unwrap();
        let first = db.get_or_create_active_shopping_list().unwrap();
        cmd_shop_new(&db, Some("Party".to_string()), true).unwrap();

        let first = db.get_shopping_list(first.id).unwrap().unwrap();
        assert_eq!(first.status, ShoppingListStatus::Completed);
        let active = db.get_active_shopping_list().unwrap().unwrap();
        assert_eq!(active.name, "Party");
    }

    #[test]
    fn test_check_then_clear() {
        let db = Database::open_in_memory().unwrap();
        cmd_shop_add(&db, "Bread", None, None, None, true).unwrap();
        cmd_shop_add(&db, "Eggs", None, None, None, true).unwrap();
        let list = db.get_or_create_active_shopping_list().unwrap();
        let bread = db.list_shopping_items(list.id).unwrap()[0].id;

        cmd_shop_check(&db, bread, true).unwrap();
        cmd_shop_clear(&db, None, true).unwrap();

        let items = db.list_shopping_items(list.id).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Eggs");
    }

    #[test]
    fn test_generate_for_week_containing_date() {
        let db = Database::open_in_memory().unwrap();
        let recipe = db
            .create_recipe(&NewRecipe {
                name: "Fry up".to_string(),
                ingredients: vec!["Bacon".to_string(), "Eggs".to_string()],
                ..NewRecipe::default()
            })
            .unwrap();
        db.upsert_meal_plan_entry(&NewMealPlanEntry {
            recipe_id: recipe.id,
            planned_date: chrono::NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
            meal_type: fivethirty_core::models::MealType::Breakfast,
        })
        .unwrap();

        // Any date in the week resolves to its Monday
        cmd_shop_generate(&db, Some("2024-06-12".to_string()), None, true).unwrap();

        let list = db.get_or_create_active_shopping_list().unwrap();
        let names: Vec<String> = db
            .list_shopping_items(list.id)
            .unwrap()
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(names, vec!["Bacon".to_string(), "Eggs".to_string()]);
    }

    #[test]
    fn test_generate_from_exact_start_date() {
        let db = Database::open_in_memory().unwrap();
        for (name, ingredient, day) in [
            ("Omelette", "Eggs", 12),
            ("Stir Fry", "Noodles", 18),
            ("Curry", "Lentils", 19),
        ] {
            let recipe = db
                .create_recipe(&NewRecipe {
                    name: name.to_string(),
                    ingredients: vec![ingredient.to_string()],
                    ..NewRecipe::default()
                })
                .unwrap();
            db.upsert_meal_plan_entry(&NewMealPlanEntry {
                recipe_id: recipe.id,
                planned_date: chrono::NaiveDate::from_ymd_opt(2024, 6, day).unwrap(),
                meal_type: fivethirty_core::models::MealType::Dinner,
            })
            .unwrap();
        }

        // Wednesday to the following Tuesday, no snapping
        cmd_shop_generate(&db, None, Some("2024-06-12".to_string()), true).unwrap();

        let list = db.get_or_create_active_shopping_list().unwrap();
        let mut names: Vec<String> = db
            .list_shopping_items(list.id)
            .unwrap()
            .into_iter()
            .map(|i| i.name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["Eggs".to_string(), "Noodles".to_string()]);
    }

    #[test]
    fn test_generate_rejects_start_at_calendar_end() {
        let db = Database::open_in_memory().unwrap();
        assert!(cmd_shop_generate(&db, None, Some("+262142-12-30".to_string()), true).is_err());
        assert!(db.get_active_shopping_list().unwrap().is_none());
    }
}
