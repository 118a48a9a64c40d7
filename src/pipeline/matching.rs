//! Label validation against the reference catalog.
//!
//! Models reliably paraphrase catalog entries even when told to copy them
//! verbatim. Exact match plus a case-insensitive substring fallback keeps the
//! N/A rate down without ever emitting free text: every non-N/A value leaving
//! this module is byte-identical to a catalog entry, and downstream consumers
//! join on those exact strings.

use crate::pipeline::state::NOT_AVAILABLE;
use tracing::info;

/// Resolve a model-returned label against the catalog list.
///
/// Exact membership wins. Otherwise the catalog is scanned in source order
/// for the first entry where either string case-insensitively contains the
/// other; no hit resolves to the "N/A" sentinel.
pub fn resolve_label(raw: &str, catalog: &[String]) -> String {
    let raw = raw.trim();
    if raw.is_empty() || raw == NOT_AVAILABLE {
        return NOT_AVAILABLE.to_string();
    }

    if catalog.iter().any(|entry| entry == raw) {
        return raw.to_string();
    }

    let raw_lower = raw.to_lowercase();
    for entry in catalog {
        let entry_lower = entry.to_lowercase();
        if entry_lower.contains(&raw_lower) || raw_lower.contains(&entry_lower) {
            info!("fuzzy-matched label {raw:?} to catalog entry {entry:?}");
            return entry.clone();
        }
    }

    NOT_AVAILABLE.to_string()
}
