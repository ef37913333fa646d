mod commands;
mod config;
mod logging;
mod openfoodfacts;
mod server;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing::debug;

use crate::commands::{
    PantryArgs, RecipeArgs, cmd_pantry_add, cmd_pantry_barcode, cmd_pantry_list, cmd_pantry_low,
    cmd_pantry_remove, cmd_pantry_restock, cmd_pantry_stats, cmd_pantry_use, cmd_plan_add,
    cmd_plan_remove, cmd_plan_status, cmd_plan_week, cmd_recipe_add, cmd_recipe_delete,
    cmd_recipe_import, cmd_recipe_list, cmd_recipe_show, cmd_shop_add, cmd_shop_check,
    cmd_shop_clear, cmd_shop_generate, cmd_shop_new, cmd_shop_show,
};
use crate::config::Config;
use crate::openfoodfacts::OpenFoodFactsClient;
use fivethirty_core::db::Database;

#[derive(Parser)]
#[command(
    name = "fivethirty",
    version,
    about = "Plan the week's dinners, keep track of the pantry, and build the shopping list"
)]
struct Cli {
    /// Path to the database file (default: <data dir>/fivethirty.db)
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,
    /// Log filter, e.g. "debug" or "fivethirty=trace" (overrides `RUST_LOG`)
    #[arg(long, global = true, value_name = "FILTER")]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage recipes
    Recipe {
        #[command(subcommand)]
        command: RecipeCommands,
    },
    /// Plan meals for the week
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
    /// Track what's in the fridge, freezer and cupboard
    Pantry {
        #[command(subcommand)]
        command: PantryCommands,
    },
    /// Build and work through the shopping list
    Shop {
        #[command(subcommand)]
        command: ShopCommands,
    },
    /// Start the REST API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8788")]
        port: u16,
        /// Address to bind to (default: 127.0.0.1, use 0.0.0.0 to expose to network)
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
    },
}

#[derive(Subcommand)]
enum RecipeCommands {
    /// Add a recipe
    Add {
        /// Recipe name
        name: String,
        /// Ingredient line, repeatable (e.g. -i "500g beef mince" -i "1 onion")
        #[arg(short, long = "ingredient", value_name = "TEXT", required = true)]
        ingredients: Vec<String>,
        /// Short description
        #[arg(long)]
        description: Option<String>,
        /// Method / instructions
        #[arg(long)]
        instructions: Option<String>,
        /// Prep time in minutes
        #[arg(long)]
        prep: Option<i64>,
        /// Cook time in minutes
        #[arg(long)]
        cook: Option<i64>,
        /// Number of servings (default: 4)
        #[arg(short, long)]
        servings: Option<i64>,
        /// Tag, repeatable
        #[arg(short, long = "tag", value_name = "TAG")]
        tags: Vec<String>,
        /// Free-text notes
        #[arg(long)]
        notes: Option<String>,
        /// Where the recipe came from
        #[arg(long)]
        source_url: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List recipes, optionally filtered by name or tag
    List {
        /// Name contains
        #[arg(short, long)]
        search: Option<String>,
        /// Tag contains
        #[arg(short, long)]
        tag: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a recipe
    Show {
        /// Recipe ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a recipe (and any meals planned with it)
    Delete {
        /// Recipe ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Import a recipe from a Cooklang (.cook) file
    Import {
        /// Path to the .cook file
        file: PathBuf,
        /// Recipe name override (defaults to metadata title or filename)
        #[arg(long)]
        name: Option<String>,
        /// Servings override (defaults to metadata servings)
        #[arg(long)]
        servings: Option<i64>,
        /// Tag, repeatable
        #[arg(short, long = "tag", value_name = "TAG")]
        tags: Vec<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum PlanCommands {
    /// Put a recipe in a meal slot (replaces whatever was there)
    Add {
        /// Recipe ID
        recipe_id: i64,
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Meal type: breakfast, lunch, dinner
        #[arg(short, long, default_value = "dinner")]
        meal: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the plan for a week (Monday to Sunday)
    Week {
        /// Any date within the week (default: this week)
        #[arg(short, long)]
        week: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Mark a planned meal as planned, cooked or skipped
    Status {
        /// Meal plan entry ID
        id: i64,
        /// New status: planned, cooked, skipped
        status: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a meal from the plan
    Remove {
        /// Meal plan entry ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum PantryCommands {
    /// Add an item to the pantry
    Add {
        /// Item name
        name: String,
        /// Where it's kept: fridge, freezer, cupboard
        #[arg(short, long)]
        category: String,
        /// Quantity (default: 1)
        #[arg(short, long)]
        quantity: Option<String>,
        /// Size of one unit (e.g. "415 g")
        #[arg(long)]
        unit: Option<String>,
        /// Expiry date (YYYY-MM-DD)
        #[arg(long)]
        expiry: Option<String>,
        /// Product barcode
        #[arg(long)]
        barcode: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List what's in stock
    List {
        /// Only this location: fridge, freezer, cupboard
        #[arg(short, long)]
        category: Option<String>,
        /// Only items marked as running low
        #[arg(long)]
        low: bool,
        /// Only items expiring within this many days
        #[arg(long, value_name = "DAYS")]
        expiring: Option<i64>,
        /// Name contains
        #[arg(short, long)]
        search: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Use one unit of an item
    Use {
        /// Pantry item ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add one unit of an item
    Restock {
        /// Pantry item ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Toggle the running-low flag on an item
    Low {
        /// Pantry item ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove an item from the pantry
    Remove {
        /// Pantry item ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show counts per location, low and expiring items
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Look up a product by barcode on `OpenFoodFacts`
    Barcode {
        /// Barcode number
        code: String,
        /// Add the product to the pantry if found
        #[arg(long)]
        add: bool,
        /// Location to add it to: fridge, freezer, cupboard
        #[arg(short, long, default_value = "cupboard")]
        category: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ShopCommands {
    /// Build the shopping list from a week's meal plan, minus what's in the pantry
    Generate {
        /// Any date within the week; the window starts on that week's Monday (default: this week)
        #[arg(short, long, conflicts_with = "from")]
        week: Option<String>,
        /// Start the seven-day window on exactly this date instead of its Monday
        #[arg(long)]
        from: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the active shopping list
    Show {
        /// Show this list instead of the active one
        #[arg(long)]
        list: Option<i64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add an item to the shopping list
    Add {
        /// Item name
        name: String,
        /// Free-text quantity (e.g. "2 tins")
        #[arg(short, long)]
        quantity: Option<String>,
        /// Aisle category (default: guessed from the name)
        #[arg(short, long)]
        category: Option<String>,
        /// Add to this list instead of the active one
        #[arg(long)]
        list: Option<i64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check or uncheck an item
    Check {
        /// Shopping item ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove checked items
    Clear {
        /// Clear this list instead of the active one
        #[arg(long)]
        list: Option<i64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Start a new list, completing the current one
    New {
        /// List name (default: "Weekly Shop")
        name: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

#[allow(clippy::too_many_lines)]
async fn run(cli: Cli) -> Result<()> {
    logging::init(cli.log_level.as_deref())?;
    let config = Config::load(cli.db.as_deref())?;
    let db = Database::open(&config.db_path)?;
    debug!(
        db = %config.db_path.display(),
        data_dir = %config.data_dir.display(),
        "database opened"
    );

    match cli.command {
        Commands::Recipe { command } => match command {
            RecipeCommands::Add {
                name,
                ingredients,
                description,
                instructions,
                prep,
                cook,
                servings,
                tags,
                notes,
                source_url,
                json,
            } => cmd_recipe_add(
                &db,
                RecipeArgs {
                    name,
                    ingredients,
                    description,
                    instructions,
                    prep_time_mins: prep,
                    cook_time_mins: cook,
                    servings,
                    tags,
                    notes,
                    source_url,
                },
                json,
            ),
            RecipeCommands::List { search, tag, json } => {
                cmd_recipe_list(&db, search.as_deref(), tag.as_deref(), json)
            }
            RecipeCommands::Show { id, json } => cmd_recipe_show(&db, id, json),
            RecipeCommands::Delete { id, json } => cmd_recipe_delete(&db, id, json),
            RecipeCommands::Import {
                file,
                name,
                servings,
                tags,
                json,
            } => cmd_recipe_import(&db, &file, name, servings, tags, json),
        },
        Commands::Plan { command } => match command {
            PlanCommands::Add {
                recipe_id,
                date,
                meal,
                json,
            } => cmd_plan_add(&db, recipe_id, date, &meal, json),
            PlanCommands::Week { week, json } => cmd_plan_week(&db, week, json),
            PlanCommands::Status { id, status, json } => cmd_plan_status(&db, id, &status, json),
            PlanCommands::Remove { id, json } => cmd_plan_remove(&db, id, json),
        },
        Commands::Pantry { command } => match command {
            PantryCommands::Add {
                name,
                category,
                quantity,
                unit,
                expiry,
                barcode,
                json,
            } => cmd_pantry_add(
                &db,
                PantryArgs {
                    name,
                    category,
                    quantity,
                    unit,
                    expiry,
                    barcode,
                },
                json,
            ),
            PantryCommands::List {
                category,
                low,
                expiring,
                search,
                json,
            } => cmd_pantry_list(&db, category.as_deref(), low, expiring, search, json),
            PantryCommands::Use { id, json } => cmd_pantry_use(&db, id, json),
            PantryCommands::Restock { id, json } => cmd_pantry_restock(&db, id, json),
            PantryCommands::Low { id, json } => cmd_pantry_low(&db, id, json),
            PantryCommands::Remove { id, json } => cmd_pantry_remove(&db, id, json),
            PantryCommands::Stats { json } => cmd_pantry_stats(&db, json),
            PantryCommands::Barcode {
                code,
                add,
                category,
                json,
            } => {
                let off = OpenFoodFactsClient::new()?;
                cmd_pantry_barcode(&db, &off, &code, add, &category, json).await
            }
        },
        Commands::Shop { command } => match command {
            ShopCommands::Generate { week, from, json } => {
                cmd_shop_generate(&db, week, from, json)
            }
            ShopCommands::Show { list, json } => cmd_shop_show(&db, list, json),
            ShopCommands::Add {
                name,
                quantity,
                category,
                list,
                json,
            } => cmd_shop_add(&db, &name, quantity, category.as_deref(), list, json),
            ShopCommands::Check { id, json } => cmd_shop_check(&db, id, json),
            ShopCommands::Clear { list, json } => cmd_shop_clear(&db, list, json),
            ShopCommands::New { name, json } => cmd_shop_new(&db, name, json),
        },
        Commands::Serve { port, bind } => server::start_server(db, port, &bind).await,
    }
}
