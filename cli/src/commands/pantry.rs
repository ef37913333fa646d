use anyhow::Result;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use crate::openfoodfacts::OpenFoodFactsClient;
use fivethirty_core::db::Database;
use fivethirty_core::models::{
    EXPIRING_SOON_DAYS, NewPantryItem, PantryCategory, PantryFilter, PantryItem, parse_date,
    validate_name,
};

use super::helpers::{exit_not_found, or_dash, truncate};

pub(crate) struct PantryArgs {
    pub name: String,
    pub category: String,
    pub quantity: Option<String>,
    pub unit: Option<String>,
    pub expiry: Option<String>,
    pub barcode: Option<String>,
}

pub(crate) fn cmd_pantry_add(db: &Database, args: PantryArgs, json: bool) -> Result<()> {
    let item = NewPantryItem {
        name: validate_name(&args.name)?,
        category: PantryCategory::parse(&args.category)?,
        barcode: args.barcode,
        quantity: args.quantity,
        quantity_unit: args.unit,
        expiry_date: args
            .expiry
            .map(|e| parse_date(&e).map(|d| d.format("%Y-%m-%d").to_string()))
            .transpose()?,
        image_url: None,
    };
    let item = db.insert_pantry_item(&item)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&item)?);
    } else {
        println!(
            "Added {} to the {} (id: {}, quantity: {})",
            item.name,
            item.category.as_str(),
            item.id,
            display_quantity(&item)
        );
    }
    Ok(())
}

pub(crate) fn cmd_pantry_list(
    db: &Database,
    category: Option<&str>,
    low: bool,
    expiring: Option<i64>,
    search: Option<String>,
    json: bool,
) -> Result<()> {
    #[derive(Tabled)]
    struct PantryRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Where")]
        category: &'static str,
        #[tabled(rename = "Qty")]
        quantity: String,
        #[tabled(rename = "Expires")]
        expiry: String,
        #[tabled(rename = "Low")]
        low: &'static str,
    }

    let filter = PantryFilter {
        category: category.map(PantryCategory::parse).transpose()?,
        low_only: low,
        expiring_within_days: expiring,
        search,
    };
    let items = db.list_pantry_items(&filter)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }
    if items.is_empty() {
        eprintln!("No pantry items found");
        return Ok(());
    }

    let rows: Vec<PantryRow> = items
        .iter()
        .map(|i| PantryRow {
            id: i.id,
            name: truncate(&i.name, 30),
            category: i.category.as_str(),
            quantity: display_quantity(i),
            expiry: or_dash(i.expiry_date.as_deref()),
            low: if i.is_low { "yes" } else { "" },
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..4)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    Ok(())
}

pub(crate) fn cmd_pantry_use(db: &Database, id: i64, json: bool) -> Result<()> {
    let Some(change) = db.decrement_pantry_item(id)? else {
        exit_not_found("Item not found", json);
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&change)?);
    } else {
        println!("{} (now {})", change.message, change.quantity);
    }
    Ok(())
}

pub(crate) fn cmd_pantry_restock(db: &Database, id: i64, json: bool) -> Result<()> {
    let Some(change) = db.increment_pantry_item(id)? else {
        exit_not_found("Item not found", json);
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&change)?);
    } else {
        println!("{} (now {})", change.message, change.quantity);
    }
    Ok(())
}

pub(crate) fn cmd_pantry_low(db: &Database, id: i64, json: bool) -> Result<()> {
    let Some(is_low) = db.toggle_pantry_low(id)? else {
        exit_not_found("Item not found", json);
    };
    let message = if is_low {
        "Marked as low"
    } else {
        "Unmarked as low"
    };
    if json {
        println!(
            "{}",
            serde_json::json!({ "id": id, "is_low": is_low, "message": message })
        );
    } else {
        println!("{message}");
    }
    Ok(())
}

pub(crate) fn cmd_pantry_remove(db: &Database, id: i64, json: bool) -> Result<()> {
    if !db.delete_pantry_item(id)? {
        exit_not_found("Item not found", json);
    }
    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("Removed item {id} from pantry");
    }
    Ok(())
}

pub(crate) fn cmd_pantry_stats(db: &Database, json: bool) -> Result<()> {
    let stats = db.pantry_stats()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("=== Pantry ===");
    for category in PantryCategory::ALL {
        let count = stats.categories.get(category.as_str()).copied().unwrap_or(0);
        println!("  {:<9}{count:>4}", category.as_str());
    }
    println!("  {:<9}{:>4}", "total", stats.total);
    println!("\n  Running low: {}", stats.low);
    println!(
        "  Expiring within {EXPIRING_SOON_DAYS} days: {}",
        stats.expiring
    );
    Ok(())
}

pub(crate) async fn cmd_pantry_barcode(
    db: &Database,
    off: &OpenFoodFactsClient,
    code: &str,
    add: bool,
    category: &str,
    json: bool,
) -> Result<()> {
    let category = PantryCategory::parse(category)?;
    let lookup = off.lookup_barcode(code).await;

    let added = match lookup.to_pantry_item(category) {
        Some(item) if add => Some(db.insert_pantry_item(&item)?),
        _ => None,
    };

    if json {
        let mut value = serde_json::to_value(&lookup)?;
        if let Some(item) = &added {
            value["pantry_item"] = serde_json::to_value(item)?;
        }
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    if let Some(error) = &lookup.error {
        eprintln!("{error}: {code}");
        return Ok(());
    }
    if !lookup.found {
        eprintln!("No product found for barcode {code}");
        return Ok(());
    }

    println!("=== {} ===", lookup.name.as_deref().unwrap_or_default());
    println!("  Brand:    {}", or_dash(lookup.brand.as_deref()));
    println!("  Quantity: {}", or_dash(lookup.quantity_info.as_deref()));
    println!("  Barcode:  {code}");
    match added {
        Some(item) => println!(
            "\nAdded to the {} (id: {})",
            item.category.as_str(),
            item.id
        ),
        None => println!(
            "\nAdd it with: fivethirty pantry barcode {code} --add --category <fridge|freezer|cupboard>"
        ),
    }
    Ok(())
}

fn display_quantity(item: &PantryItem) -> String {
    match &item.quantity_unit {
        Some(unit) => format!("{} x {unit}", item.quantity),
        None => item.quantity.clone(),
    }
}
