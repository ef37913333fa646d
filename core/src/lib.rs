pub mod db;
pub mod models;
pub mod openfoodfacts;
pub mod shopping;
