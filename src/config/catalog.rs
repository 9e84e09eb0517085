//! Reward catalog loading from catalog.toml
//!
//! The catalog of purchasable items is configuration, not persisted state:
//! a small fixed list of {name, description, cost} entries. A built-in
//! default matches the original four items; deployments can override it with
//! a TOML file. Coupons snapshot the item fields at purchase time, so
//! editing the catalog never rewrites sold coupons.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Configuration structure representing the entire catalog.toml file
#[derive(Debug, Deserialize, Clone)]
pub struct Catalog {
    /// List of purchasable reward items
    pub items: Vec<CatalogItem>,
}

/// A single purchasable reward
#[derive(Debug, Deserialize, Clone)]
pub struct CatalogItem {
    /// Display name of the item
    pub name: String,
    /// Short description shown to students
    pub description: String,
    /// Price in points
    pub points_cost: i64,
}

impl Catalog {
    /// Looks up an item by its position in the catalog.
    pub fn item(&self, index: usize) -> Option<&CatalogItem> {
        self.items.get(index)
    }
}

/// The built-in catalog used when no catalog.toml is provided.
pub fn default_catalog() -> Catalog {
    let items = [
        ("Pen", "A high-quality pen", 10),
        ("Notebook", "A durable notebook", 20),
        ("Coffee", "A delicious cup of coffee", 30),
        ("Lunch", "A nutritious lunch", 50),
    ];
    Catalog {
        items: items
            .into_iter()
            .map(|(name, description, points_cost)| CatalogItem {
                name: name.to_string(),
                description: description.to_string(),
                points_cost,
            })
            .collect(),
    }
}

/// Loads a reward catalog from a TOML file.
///
/// # Errors
/// Returns an error if the file cannot be read, the TOML is invalid, or the
/// catalog is empty or contains a non-positive price.
pub fn load_catalog<P: AsRef<Path>>(path: P) -> Result<Catalog> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read catalog file: {e}"),
    })?;

    let catalog: Catalog = toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse catalog.toml: {e}"),
    })?;

    if catalog.items.is_empty() {
        return Err(Error::Config {
            message: "Catalog must contain at least one item".to_string(),
        });
    }
    if let Some(item) = catalog.items.iter().find(|i| i.points_cost <= 0) {
        return Err(Error::Config {
            message: format!("Catalog item '{}' must cost at least 1 point", item.name),
        });
    }

    Ok(catalog)
}
