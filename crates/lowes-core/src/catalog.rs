//! Static scrape catalog: the stores to visit and the category listings to
//! walk at each store.
//!
//! Loaded once from YAML at run start and never mutated afterwards.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// A physical store whose inventory and pricing we want to observe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreTarget {
    /// Site-assigned store number, e.g. `"1845"`. Authoritative metadata for
    /// every record captured under this store, whether or not the store
    /// selector UI confirmed it.
    pub store_id: String,
    pub name: String,
    pub zip: String,
    /// Direct store-details page, when known. Lets the context setter skip
    /// the zip-code search flow.
    #[serde(default)]
    pub url: Option<String>,
}

/// A category listing entry point. The URL may already carry query filters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTarget {
    pub name: String,
    pub url: String,
}

impl CategoryTarget {
    /// Generate a filesystem-safe slug from the category name.
    #[must_use]
    pub fn slug(&self) -> String {
        self.name
            .to_lowercase()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' {
                    c
                } else if c == ' ' || c == '&' || c == '/' {
                    '-'
                } else {
                    '\0'
                }
            })
            .filter(|&c| c != '\0')
            .collect::<String>()
            .split('-')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("-")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Catalog {
    pub stores: Vec<StoreTarget>,
    pub categories: Vec<CategoryTarget>,
}

impl Catalog {
    /// Narrow the catalog to the given store ids and category names.
    ///
    /// Empty filters keep everything. Category names match case-insensitively.
    #[must_use]
    pub fn select(&self, store_ids: &[String], category_names: &[String]) -> Catalog {
        let stores = self
            .stores
            .iter()
            .filter(|s| store_ids.is_empty() || store_ids.contains(&s.store_id))
            .cloned()
            .collect();
        let categories = self
            .categories
            .iter()
            .filter(|c| {
                category_names.is_empty()
                    || category_names
                        .iter()
                        .any(|n| n.eq_ignore_ascii_case(&c.name))
            })
            .cloned()
            .collect();
        Catalog { stores, categories }
    }
}

/// Load and validate the scrape catalog from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_catalog(path: &Path) -> Result<Catalog, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::CatalogFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_catalog(&content)
}

/// Parse and validate a catalog from YAML text.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is malformed or fails validation.
pub fn parse_catalog(content: &str) -> Result<Catalog, ConfigError> {
    let catalog: Catalog = serde_yaml::from_str(content).map_err(ConfigError::CatalogFileParse)?;
    validate_catalog(&catalog)?;
    Ok(catalog)
}

fn validate_catalog(catalog: &Catalog) -> Result<(), ConfigError> {
    let mut seen_store_ids = HashSet::new();
    for store in &catalog.stores {
        if store.store_id.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "store '{}' has an empty store_id",
                store.name
            )));
        }
        if store.zip.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "store '{}' has an empty zip",
                store.store_id
            )));
        }
        if let Some(url) = &store.url {
            validate_http_url(url, &format!("store '{}'", store.store_id))?;
        }
        if !seen_store_ids.insert(store.store_id.trim().to_string()) {
            return Err(ConfigError::Validation(format!(
                "duplicate store_id: '{}'",
                store.store_id
            )));
        }
    }

    let mut seen_categories = HashSet::new();
    for category in &catalog.categories {
        if category.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "category name must be non-empty".to_string(),
            ));
        }
        validate_http_url(&category.url, &format!("category '{}'", category.name))?;
        if !seen_categories.insert(category.name.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate category name: '{}'",
                category.name
            )));
        }
    }

    Ok(())
}

fn validate_http_url(raw: &str, owner: &str) -> Result<(), ConfigError> {
    let parsed = url::Url::parse(raw)
        .map_err(|e| ConfigError::Validation(format!("{owner} has invalid url '{raw}': {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::Validation(format!(
            "{owner} url '{raw}' must use http or https"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "catalog_test.rs"]
mod tests;
