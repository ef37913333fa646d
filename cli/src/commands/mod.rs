mod helpers;
mod pantry;
mod plan;
mod recipe;
mod shop;

pub(crate) use pantry::{
    PantryArgs, cmd_pantry_add, cmd_pantry_barcode, cmd_pantry_list, cmd_pantry_low,
    cmd_pantry_remove, cmd_pantry_restock, cmd_pantry_stats, cmd_pantry_use,
};
pub(crate) use plan::{cmd_plan_add, cmd_plan_remove, cmd_plan_status, cmd_plan_week};
pub(crate) use recipe::{
    RecipeArgs, cmd_recipe_add, cmd_recipe_delete, cmd_recipe_import, cmd_recipe_list,
    cmd_recipe_show,
};
pub(crate) use shop::{
    cmd_shop_add, cmd_shop_check, cmd_shop_clear, cmd_shop_generate, cmd_shop_new, cmd_shop_show,
};
