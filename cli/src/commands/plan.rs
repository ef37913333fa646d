use anyhow::{Result, bail};
use chrono::Duration;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use fivethirty_core::db::Database;
use fivethirty_core::models::{MealStatus, MealType, NewMealPlanEntry};

use super::helpers::{exit_not_found, parse_date, parse_week, truncate};

pub(crate) fn cmd_plan_add(
    db: &Database,
    recipe_id: i64,
    date: Option<String>,
    meal: &str,
    json: bool,
) -> Result<()> {
    let planned_date = parse_date(date)?;
    let meal_type = MealType::parse(meal)?;
    let Some(recipe) = db.get_recipe(recipe_id)? else {
        bail!("Recipe with id {recipe_id} not found");
    };

    let entry = db.upsert_meal_plan_entry(&NewMealPlanEntry {
        recipe_id,
        planned_date,
        meal_type,
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
    } else {
        println!(
            "Planned {} for {} on {} (id: {})",
            recipe.name,
            meal_type.as_str(),
            planned_date.format("%a %Y-%m-%d"),
            entry.id
        );
    }
    Ok(())
}

pub(crate) fn cmd_plan_week(db: &Database, week: Option<String>, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct PlanRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Day")]
        day: String,
        #[tabled(rename = "Meal")]
        meal: &'static str,
        #[tabled(rename = "Recipe")]
        recipe: String,
        #[tabled(rename = "Status")]
        status: &'static str,
        #[tabled(rename = "Time")]
        time: String,
    }

    let week_start = parse_week(week)?;
    let entries = db.list_meal_plan(Some(week_start))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    let week_end = week_start + Duration::days(6);
    println!(
        "=== Week of {} to {} ===",
        week_start.format("%a %Y-%m-%d"),
        week_end.format("%a %Y-%m-%d")
    );
    if entries.is_empty() {
        println!("  No meals planned");
        return Ok(());
    }

    let rows: Vec<PlanRow> = entries
        .iter()
        .map(|e| PlanRow {
            id: e.id,
            day: chrono::NaiveDate::parse_from_str(&e.planned_date, "%Y-%m-%d")
                .map_or_else(|_| e.planned_date.clone(), |d| d.format("%a %d").to_string()),
            meal: e.meal_type.as_str(),
            recipe: truncate(e.recipe_name.as_deref().unwrap_or("?"), 30),
            status: e.status.as_str(),
            time: match (e.prep_time_mins, e.cook_time_mins) {
                (None, None) => "-".to_string(),
                (prep, cook) => format!("{} min", prep.unwrap_or(0) + cook.unwrap_or(0)),
            },
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(5..)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    Ok(())
}

pub(crate) fn cmd_plan_status(db: &Database, id: i64, status: &str, json: bool) -> Result<()> {
    let status = MealStatus::parse(status)?;
    if !db.set_meal_plan_status(id, status)? {
        exit_not_found("Meal plan not found", json);
    }
    if json {
        match db.get_meal_plan_entry(id)? {
            Some(entry) => println!("{}", serde_json::to_string_pretty(&entry)?),
            None => exit_not_found("Meal plan not found", json),
        }
    } else {
        println!("Marked meal {id} as {}", status.as_str());
    }
    Ok(())
}

pub(crate) fn cmd_plan_remove(db: &Database, id: i64, json: bool) -> Result<()> {
    if !db.delete_meal_plan_entry(id)? {
        exit_not_found("Meal plan not found", json);
    }
    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("Removed meal {id} from plan");
    }
    Ok(())
}
