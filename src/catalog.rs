//! Reference catalog: taxonomy paths and product attribute tags.
//!
//! Loaded once at process start from a configured directory. Absence of
//! either source degrades to an empty list so the pipeline still returns
//! vendor/product detail fields; every downstream match then resolves to
//! the "N/A" sentinel.

use csv::ReaderBuilder;
use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use tracing::{info, warn};

pub const PRODUCTS_FILE: &str = "products.csv";
pub const TAXONOMY_FILE: &str = "taxonomy.csv";
const ATTRIBUTES_COLUMN: &str = "PRODUCT_ATTRIBUTES";

/// Two disjoint, read-only label lists. Shared as `Arc` and never mutated
/// after startup.
#[derive(Debug, Clone, Default)]
pub struct ReferenceCatalog {
    /// Full hierarchical path strings, in source order.
    pub taxonomy: Vec<String>,
    /// Unique short tag strings, sorted.
    pub attributes: Vec<String>,
}

impl ReferenceCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load both sources from `data_dir`. Never fails: a missing or
    /// malformed source logs a warning and yields an empty list.
    pub fn load(data_dir: &Path) -> Self {
        let taxonomy = match load_taxonomy(&data_dir.join(TAXONOMY_FILE)) {
            Ok(labels) => {
                info!(count = labels.len(), "loaded taxonomy labels");
                labels
            }
            Err(e) => {
                warn!("taxonomy source unavailable, matches degrade to N/A: {e}");
                Vec::new()
            }
        };

        let attributes = match load_attributes(&data_dir.join(PRODUCTS_FILE)) {
            Ok(tags) => {
                info!(count = tags.len(), "loaded product attributes");
                tags
            }
            Err(e) => {
                warn!("product catalog unavailable, matches degrade to N/A: {e}");
                Vec::new()
            }
        };

        Self {
            taxonomy,
            attributes,
        }
    }
}

/// Taxonomy labels come from the first column, deduplicated with source
/// order preserved (fuzzy matching scans in catalog order).
fn load_taxonomy(path: &Path) -> anyhow::Result<Vec<String>> {
    let mut reader = ReaderBuilder::new().flexible(true).from_path(path)?;
    let mut labels = Vec::new();
    let mut seen = HashSet::new();

    for record in reader.records() {
        let record = record?;
        let Some(label) = record.get(0) else {
            continue;
        };
        let label = label.trim();
        if !label.is_empty() && seen.insert(label.to_string()) {
            labels.push(label.to_string());
        }
    }
    Ok(labels)
}

/// Attribute tags are split out of the comma-separated `PRODUCT_ATTRIBUTES`
/// column, deduplicated and sorted.
fn load_attributes(path: &Path) -> anyhow::Result<Vec<String>> {
    let mut reader = ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers = reader.headers()?.clone();
    let column = headers
        .iter()
        .position(|h| h == ATTRIBUTES_COLUMN)
        .ok_or_else(|| anyhow::anyhow!("{ATTRIBUTES_COLUMN} column not found"))?;

    let mut tags = BTreeSet::new();
    for record in reader.records() {
        let record = record?;
        let Some(cell) = record.get(column) else {
            continue;
        };
        for tag in cell.split(',') {
            let tag = tag.trim();
            if !tag.is_empty() {
                tags.insert(tag.to_string());
            }
        }
    }
    Ok(tags.into_iter().collect())
}
