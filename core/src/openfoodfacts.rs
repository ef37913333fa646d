use serde::{Deserialize, Serialize};

use crate::models::{NewPantryItem, PantryCategory};

pub const UNKNOWN_PRODUCT: &str = "Unknown Product";
pub const LOOKUP_FAILED: &str = "Failed to lookup barcode";

#[derive(Debug, Deserialize)]
pub struct ProductResponse {
    #[serde(default)]
    pub status: i32,
    pub product: Option<ProductData>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductData {
    pub product_name: Option<String>,
    pub brands: Option<String>,
    pub image_url: Option<String>,
    pub image_front_url: Option<String>,
    pub quantity: Option<String>,
}

/// Result of a barcode lookup as returned to API and CLI callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BarcodeLookup {
    pub found: bool,
    pub barcode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity_info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BarcodeLookup {
    #[must_use]
    pub fn not_found(barcode: &str) -> Self {
        Self {
            found: false,
            barcode: barcode.to_string(),
            name: None,
            brand: None,
            image_url: None,
            quantity_info: None,
            error: None,
        }
    }

    /// The upstream service could not be reached or answered garbage.
    #[must_use]
    pub fn failed(barcode: &str) -> Self {
        Self {
            error: Some(LOOKUP_FAILED.to_string()),
            ..Self::not_found(barcode)
        }
    }

    /// Pantry entry for a found product, or `None` if nothing was found.
    #[must_use]
    pub fn to_pantry_item(&self, category: PantryCategory) -> Option<NewPantryItem> {
        if !self.found {
            return None;
        }
        Some(NewPantryItem {
            name: self
                .name
                .clone()
                .unwrap_or_else(|| UNKNOWN_PRODUCT.to_string()),
            category,
            barcode: Some(self.barcode.clone()),
            quantity: None,
            quantity_unit: self.quantity_info.clone(),
            expiry_date: None,
            image_url: self.image_url.clone(),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[must_use]
pub fn product_to_lookup(barcode: &str, response: ProductResponse) -> BarcodeLookup {
    let product = match response.product {
        Some(p) if response.status == 1 => p,
        _ => return BarcodeLookup::not_found(barcode),
    };

    BarcodeLookup {
        found: true,
        barcode: barcode.to_string(),
        name: Some(non_empty(product.product_name).unwrap_or_else(|| UNKNOWN_PRODUCT.to_string())),
        brand: non_empty(product.brands),
        image_url: non_empty(product.image_front_url).or_else(|| non_empty(product.image_url)),
        quantity_info: non_empty(product.quantity),
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn beans() -> ProductData {
        ProductData {
            product_name: Some("Baked Beanz".to_string()),
            brands: Some("Heinz".to_string()),
            image_url: Some("https://images.example/beanz.jpg".to_string()),
            image_front_url: Some("https://images.example/beanz_front.jpg".to_string()),
            quantity: Some("415 g".to_string()),
        }
    }

    #[test]
    fn test_found_product() {
        let lookup = product_to_lookup(
            "5000157024671",
            ProductResponse {
                status: 1,
                product: Some(beans()),
            },
        );
        assert!(lookup.found);
        assert_eq!(lookup.name.as_deref(), Some("Baked Beanz"));
        assert_eq!(lookup.brand.as_deref(), Some("Heinz"));
        assert_eq!(
            lookup.image_url.as_deref(),
            Some("https://images.example/beanz_front.jpg")
        );
        assert_eq!(lookup.quantity_info.as_deref(), Some("415 g"));
        assert!(lookup.error.is_none());
    }

    #[test]
    fn test_missing_fields_fall_back() {
        let product = ProductData {
            product_name: Some(String::new()),
            image_url: Some("https://images.example/plain.jpg".to_string()),
            ..ProductData::default()
        };
        let lookup = product_to_lookup(
            "123",
            ProductResponse {
                status: 1,
                product: Some(product),
            },
        );
        assert!(lookup.found);
        assert_eq!(lookup.name.as_deref(), Some(UNKNOWN_PRODUCT));
        assert!(lookup.brand.is_none());
        assert_eq!(
            lookup.image_url.as_deref(),
            Some("https://images.example/plain.jpg")
        );
    }

    #[test]
    fn test_status_zero_is_not_found() {
        let lookup = product_to_lookup(
            "0000000000000",
            ProductResponse {
                status: 0,
                product: Some(beans()),
            },
        );
        assert_eq!(lookup, BarcodeLookup::not_found("0000000000000"));

        let body: ProductResponse =
            serde_json::from_str(r#"{"status": 0, "status_verbose": "product not found"}"#).unwrap();
        assert!(!product_to_lookup("1", body).found);
    }

    #[test]
    fn test_failed_lookup_serializes_error() {
        let json = serde_json::to_value(BarcodeLookup::failed("42")).unwrap();
        assert_eq!(json["found"], false);
        assert_eq!(json["barcode"], "42");
        assert_eq!(json["error"], LOOKUP_FAILED);
        assert!(json.get("name").is_none());
    }

    #[test]
    fn test_to_pantry_item() {
        let lookup = product_to_lookup(
            "5000157024671",
            ProductResponse {
                status: 1,
                product: Some(beans()),
            },
        );
        let item = lookup.to_pantry_item(PantryCategory::Cupboard).unwrap();
        assert_eq!(item.name, "Baked Beanz");
        assert_eq!(item.barcode.as_deref(), Some("5000157024671"));
        assert_eq!(item.quantity_unit.as_deref(), Some("415 g"));

        assert!(BarcodeLookup::not_found("1").to_pantry_item(PantryCategory::Fridge).is_none());
    }
}
