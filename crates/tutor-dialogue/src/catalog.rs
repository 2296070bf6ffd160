//! Lookup of stored documents by spoken name.

use serde::Serialize;

use tutor_core::error::Result;

/// A document the user can switch to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub id: String,
    pub name: String,
}

/// Resolves a spoken document name to a stored document.
pub trait DocumentCatalog: Send + Sync {
    fn find(&self, name: &str) -> Result<Option<CatalogEntry>>;
}

/// Catalog over a fixed list, matched by case-insensitive substring.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    entries: Vec<CatalogEntry>,
}

impl StaticCatalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }
}

impl DocumentCatalog for StaticCatalog {
    fn find(&self, name: &str) -> Result<Option<CatalogEntry>> {
        let needle = name.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(None);
        }
        Ok(self
            .entries
            .iter()
            .find(|e| e.name.to_lowercase().contains(&needle))
            .cloned())
    }
}
