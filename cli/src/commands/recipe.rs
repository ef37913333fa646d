use anyhow::{Context, Result, bail};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use fivethirty_core::db::Database;
use fivethirty_core::models::{NewRecipe, validate_name};

use super::helpers::{exit_not_found, or_dash, truncate};

pub(crate) struct RecipeArgs {
    pub name: String,
    pub ingredients: Vec<String>,
    pub description: Option<String>,
    pub instructions: Option<String>,
    pub prep_time_mins: Option<i64>,
    pub cook_time_mins: Option<i64>,
    pub servings: Option<i64>,
    pub tags: Vec<String>,
    pub notes: Option<String>,
    pub source_url: Option<String>,
}

pub(crate) fn cmd_recipe_add(db: &Database, args: RecipeArgs, json: bool) -> Result<()> {
    let ingredients: Vec<String> = args
        .ingredients
        .into_iter()
        .map(|i| i.trim().to_string())
        .filter(|i| !i.is_empty())
        .collect();
    if ingredients.is_empty() {
        bail!("A recipe needs at least one ingredient (--ingredient)");
    }
    if matches!(args.servings, Some(s) if s <= 0) {
        bail!("Servings must be greater than 0");
    }

    let recipe = db.create_recipe(&NewRecipe {
        name: validate_name(&args.name)?,
        description: args.description,
        ingredients,
        instructions: args.instructions,
        prep_time_mins: args.prep_time_mins,
        cook_time_mins: args.cook_time_mins,
        servings: args.servings,
        tags: args.tags,
        notes: args.notes,
        image_url: None,
        source_url: args.source_url,
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&recipe)?);
    } else {
        let count = recipe.ingredients.len();
        println!(
            "Created recipe: {} (id: {}, {count} ingredients)",
            recipe.name, recipe.id
        );
        println!("Plan it with: fivethirty plan add {} --date <YYYY-MM-DD>", recipe.id);
    }
    Ok(())
}

pub(crate) fn cmd_recipe_list(
    db: &Database,
    search: Option<&str>,
    tag: Option<&str>,
    json: bool,
) -> Result<()> {
    #[derive(Tabled)]
    struct RecipeRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Tags")]
        tags: String,
        #[tabled(rename = "Ingredients")]
        ingredients: usize,
        #[tabled(rename = "Time")]
        time: String,
        #[tabled(rename = "Rating")]
        rating: String,
    }

    let recipes = if search.is_some() || tag.is_some() {
        db.search_recipes(search.unwrap_or_default(), tag)?
    } else {
        db.list_recipes()?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&recipes)?);
        return Ok(());
    }
    if recipes.is_empty() {
        eprintln!("No recipes found");
        return Ok(());
    }

    let rows: Vec<RecipeRow> = recipes
        .iter()
        .map(|r| RecipeRow {
            id: r.id,
            name: truncate(&r.name, 30),
            tags: truncate(&r.tags.join(", "), 25),
            ingredients: r.ingredients.len(),
            time: match (r.prep_time_mins, r.cook_time_mins) {
                (None, None) => "-".to_string(),
                (prep, cook) => format!("{} min", prep.unwrap_or(0) + cook.unwrap_or(0)),
            },
            rating: r.rating.map_or_else(|| "-".to_string(), |n| format!("{n}/5")),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    Ok(())
}

pub(crate) fn cmd_recipe_show(db: &Database, id: i64, json: bool) -> Result<()> {
    let Some(recipe) = db.get_recipe(id)? else {
        exit_not_found("Recipe not found", json);
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&recipe)?);
        return Ok(());
    }

    println!("=== {} ===", recipe.name);
    if let Some(desc) = &recipe.description {
        println!("  {desc}");
    }
    println!(
        "  Serves: {}  |  Prep: {}  |  Cook: {}  |  Rating: {}",
        recipe.servings,
        recipe
            .prep_time_mins
            .map_or_else(|| "-".to_string(), |m| format!("{m} min")),
        recipe
            .cook_time_mins
            .map_or_else(|| "-".to_string(), |m| format!("{m} min")),
        recipe.rating.map_or_else(|| "-".to_string(), |n| format!("{n}/5")),
    );
    if !recipe.tags.is_empty() {
        println!("  Tags: {}", recipe.tags.join(", "));
    }

    println!("\n  INGREDIENTS:");
    for ingredient in &recipe.ingredients {
        println!("    - {ingredient}");
    }

    if let Some(instructions) = &recipe.instructions {
        println!("\n  METHOD:");
        for line in instructions.lines() {
            println!("    {line}");
        }
    }
    if let Some(notes) = &recipe.notes {
        println!("\n  Notes: {notes}");
    }
    println!("  Source: {}", or_dash(recipe.source_url.as_deref()));

    Ok(())
}

pub(crate) fn cmd_recipe_delete(db: &Database, id: i64, json: bool) -> Result<()> {
    if !db.delete_recipe(id)? {
        exit_not_found("Recipe not found", json);
    }
    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("Deleted recipe {id}");
    }
    Ok(())
}

pub(crate) fn cmd_recipe_import(
    db: &Database,
    file: &std::path::Path,
    name_override: Option<String>,
    servings_override: Option<i64>,
    tags: Vec<String>,
    json: bool,
) -> Result<()> {
    let input = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read file: {}", file.display()))?;

    let (recipe_data, _report) = cooklang::parse(&input)
        .into_result()
        .map_err(|e| anyhow::anyhow!("Failed to parse Cooklang file: {e}"))?;

    let name = name_override
        .or_else(|| recipe_data.metadata.title().map(String::from))
        .or_else(|| file.file_stem().and_then(|s| s.to_str()).map(String::from))
        .context("Could not determine recipe name. Use --name to specify one")?;

    let servings = servings_override.or_else(|| {
        recipe_data
            .metadata
            .servings()
            .and_then(|s| s.as_number().map(i64::from))
    });

    let converter = cooklang::Converter::default();
    let ingredients: Vec<String> = recipe_data
        .group_ingredients(&converter)
        .iter()
        .map(cooklang_ingredient_line)
        .collect();

    if ingredients.is_empty() {
        bail!("No ingredients found in recipe");
    }

    let recipe = db.create_recipe(&NewRecipe {
        name: validate_name(&name)?,
        ingredients,
        servings,
        tags,
        ..NewRecipe::default()
    })?;
    tracing::info!(recipe_id = recipe.id, file = %file.display(), "imported cooklang recipe");

    if json {
        println!("{}", serde_json::to_string_pretty(&recipe)?);
    } else {
        println!(
            "Imported recipe: {} (id: {}, {} ingredients, serves {})",
            recipe.name,
            recipe.id,
            recipe.ingredients.len(),
            recipe.servings
        );
    }

    Ok(())
}

/// Render a grouped ingredient as a free-text line ("500 g beef mince").
fn cooklang_ingredient_line(gi: &cooklang::ingredient_list::GroupedIngredient<'_>) -> String {
    // Take the first quantity from the grouped quantities (if any)
    let (amount, unit) = gi
        .quantity
        .iter()
        .next()
        .map_or((None, None), |qty: &cooklang::Quantity| {
            let amount = match qty.value() {
                cooklang::Value::Number(n) => format_amount(n.value()),
                cooklang::Value::Range { start, .. } => format_amount(start.value()),
                cooklang::Value::Text(t) => t.clone(),
            };
            (Some(amount), qty.unit().map(String::from))
        });

    ingredient_line(
        &gi.ingredient.display_name(),
        amount.as_deref(),
        unit.as_deref(),
    )
}

fn ingredient_line(name: &str, amount: Option<&str>, unit: Option<&str>) -> String {
    [amount, unit, Some(name)]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn format_amount(value: f64) -> String {
    if value.fract().abs() < f64::EPSILON {
        format!("{value:.0}")
    } else {
        format!("{value}")
    }
}
