//! Per-row enrichment pipeline.
//!
//! A fixed stage graph, identical for every row:
//!
//! ```text
//!  [fetch_vendor_info]  \
//!                         >--> extract_software_type --> [taxonomy, attribute, platform] --> format_output
//!  [fetch_product_info] /                                  (fan-out, run concurrently)
//! ```
//!
//! Every stage runs for every row. Failures are carried as data: a failed
//! stage yields `None` or sentinel values plus an entry in the row's error
//! list, and the pipeline keeps going. Only `format_output` reads the
//! accumulated errors.

mod matching;
pub mod state;

pub use matching::resolve_label;
pub use state::{
    AttributeGroup, EnrichedRecord, ProductDetails, ProductInfoGroup, RowInput, RowState,
    SingleEnrichment, StringOrList, TaxonomyGroup, VendorDetails, VendorInfoGroup, NOT_AVAILABLE,
};

use crate::cache::{ResultCache, DETAILS_TTL_SECONDS, MATCH_TTL_SECONDS};
use crate::catalog::ReferenceCatalog;
use crate::gateway::{extract_json, LlmGateway, ModelTier};
use crate::prompts;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error};
use uuid::Uuid;

/// Shared services handed to every pipeline execution. Explicitly
/// constructed and dependency-injected; no hidden process-wide state.
#[derive(Clone)]
pub struct Services {
    pub gateway: Arc<LlmGateway>,
    pub cache: Arc<ResultCache>,
    pub catalog: Arc<ReferenceCatalog>,
}

/// Execute the full stage graph for one row. Infallible: always produces a
/// record, substituting "N/A" liberally.
pub async fn run_row(services: &Services, input: RowInput) -> EnrichedRecord {
    let mut state = RowState::new(input);
    debug!(row_id = %state.input.row_id, "row pipeline start");

    // Stage 1 fan-out: vendor and product fetch have no data dependency.
    let (vendor, product) = tokio::join!(
        fetch_vendor_info(services, &state.input),
        fetch_product_details(services, &state.input),
    );
    let (vendor_details, vendor_errors) = vendor;
    let (product_details, product_errors) = product;
    state.vendor_details = vendor_details;
    state.product_details = product_details;
    state.errors.extend(vendor_errors);
    state.errors.extend(product_errors);

    // Stage 2: pure, no LLM call.
    let (software_type, type_errors) = extract_software_type(&state);
    state.errors.extend(type_errors);
    state.software_type = Some(software_type.clone());

    // Stage 3 fan-out: each match depends only on software_type and
    // product_name, not on its siblings.
    let (taxonomy, attributes, platform) = tokio::join!(
        find_taxonomy_matches(services, &state.input, &software_type),
        find_attribute_matches(services, &state.input, &software_type),
        async { find_platform_matches() },
    );
    let (taxonomy_matches, taxonomy_errors) = taxonomy;
    let (attribute_matches, attribute_errors) = attributes;
    state.taxonomy_matches = Some(taxonomy_matches);
    state.attribute_matches = Some(attribute_matches);
    state.platform_matches = Some(platform);
    state.errors.extend(taxonomy_errors);
    state.errors.extend(attribute_errors);

    format_output(&state)
}

/// Single-item enrichment: same pipeline, nested output grouping.
pub async fn enrich_single(
    services: &Services,
    vendor_name: &str,
    vendor_url: &str,
    product_name: &str,
    product_url: &str,
) -> SingleEnrichment {
    let input = RowInput::new(
        format!("single_{}", Uuid::new_v4()),
        vendor_name,
        vendor_url,
        product_name,
        product_url,
    );
    let record = run_row(services, input).await;
    SingleEnrichment::from(&record)
}

/// Vendor legal/social metadata via the higher-capability tier. Semantic
/// cache key is the vendor identity, not the prompt text.
async fn fetch_vendor_info(
    services: &Services,
    input: &RowInput,
) -> (Option<VendorDetails>, Vec<String>) {
    let params = [
        ("vendor_name", input.vendor_name.as_str()),
        ("vendor_url", input.vendor_url.as_str()),
    ];
    if let Some(cached) = services.cache.get("vendor_info", &params).await {
        if let Ok(details) = serde_json::from_value::<VendorDetails>(cached) {
            return (Some(details), Vec::new());
        }
    }

    let prompt = prompts::vendor_info(
        &input.vendor_name,
        &input.vendor_url,
        &input.product_name,
        &input.product_url,
    );
    let Some(response) = services
        .gateway
        .call(&prompt, None, ModelTier::Sonnet, true)
        .await
    else {
        return (None, vec!["Vendor info fetch failed".to_string()]);
    };

    match serde_json::from_str::<VendorDetails>(&extract_json(&response)) {
        Ok(details) => {
            if let Ok(value) = serde_json::to_value(&details) {
                services
                    .cache
                    .set("vendor_info", &params, value, DETAILS_TTL_SECONDS)
                    .await;
            }
            (Some(details), Vec::new())
        }
        Err(e) => {
            error!(row_id = %input.row_id, "vendor details were not valid JSON: {e}");
            (None, vec![format!("Vendor error: {e}")])
        }
    }
}

/// Product detail fetch; cached by product URL alone so the same product
/// referenced by several vendors reuses one lookup.
async fn fetch_product_details(
    services: &Services,
    input: &RowInput,
) -> (Option<ProductDetails>, Vec<String>) {
    let params = [("product_url", input.product_url.as_str())];
    if let Some(cached) = services.cache.get("product_details", &params).await {
        if let Ok(details) = serde_json::from_value::<ProductDetails>(cached) {
            return (Some(details), Vec::new());
        }
    }

    let prompt = prompts::product_info(&input.product_name, &input.product_url);
    let Some(response) = services
        .gateway
        .call(&prompt, None, ModelTier::Sonnet, true)
        .await
    else {
        return (None, vec!["Product fetch failed".to_string()]);
    };

    match serde_json::from_str::<ProductDetails>(&extract_json(&response)) {
        Ok(details) => {
            if let Ok(value) = serde_json::to_value(&details) {
                services
                    .cache
                    .set("product_details", &params, value, DETAILS_TTL_SECONDS)
                    .await;
            }
            (Some(details), Vec::new())
        }
        Err(e) => {
            error!(row_id = %input.row_id, "product details were not valid JSON: {e}");
            (None, vec![format!("Product error: {e}")])
        }
    }
}

/// Pure stage: derive the software type string from product details.
fn extract_software_type(state: &RowState) -> (String, Vec<String>) {
    let Some(details) = &state.product_details else {
        return (
            NOT_AVAILABLE.to_string(),
            vec!["No product details available".to_string()],
        );
    };

    let joined = details.product_type.joined();
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        (NOT_AVAILABLE.to_string(), Vec::new())
    } else {
        (trimmed.to_string(), Vec::new())
    }
}

/// Classify the product against the taxonomy catalog; every returned label
/// is validated back against the list.
async fn find_taxonomy_matches(
    services: &Services,
    input: &RowInput,
    software_type: &str,
) -> ([String; 2], Vec<String>) {
    let sentinel = || [NOT_AVAILABLE.to_string(), NOT_AVAILABLE.to_string()];
    let catalog = &services.catalog.taxonomy;
    if catalog.is_empty() {
        debug!("no taxonomy labels loaded, matches degrade to N/A");
        return (sentinel(), Vec::new());
    }

    let params = [
        ("software_type", software_type),
        ("product_name", input.product_name.as_str()),
    ];
    if let Some(cached) = services.cache.get("taxonomy_match", &params).await {
        if let Ok(matches) = serde_json::from_value::<[String; 2]>(cached) {
            return (matches, Vec::new());
        }
    }

    let prompt = prompts::taxonomy_match(&input.product_name, software_type, catalog);
    let Some(response) = services
        .gateway
        .call(&prompt, Some(prompts::TAXONOMY_SYSTEM), ModelTier::Sonnet, true)
        .await
    else {
        return (sentinel(), vec!["Taxonomy match failed".to_string()]);
    };

    let parsed: Value = match serde_json::from_str(&extract_json(&response)) {
        Ok(parsed) => parsed,
        Err(e) => {
            error!(row_id = %input.row_id, "taxonomy response was not valid JSON: {e}");
            return (sentinel(), vec![format!("Taxonomy error: {e}")]);
        }
    };

    let matches = [
        resolve_label(&taxonomy_label(&parsed, 1), catalog),
        resolve_label(&taxonomy_label(&parsed, 2), catalog),
    ];

    if let Ok(value) = serde_json::to_value(&matches) {
        services
            .cache
            .set("taxonomy_match", &params, value, MATCH_TTL_SECONDS)
            .await;
    }
    (matches, Vec::new())
}

/// Pull the nth taxonomy label out of the response, tolerating both the
/// requested flat shape and the nested one the model sometimes produces.
fn taxonomy_label(parsed: &Value, n: usize) -> String {
    if let Some(label) = parsed.get(format!("match_{n}")).and_then(Value::as_str) {
        return label.to_string();
    }
    parsed
        .get(format!("Top_Match_{n}"))
        .and_then(|v| v.get("Taxonomy Name"))
        .and_then(Value::as_str)
        .unwrap_or(NOT_AVAILABLE)
        .to_string()
}

/// Tag the product with catalog attributes; uses the faster tier, accuracy
/// is less critical than for taxonomy placement.
async fn find_attribute_matches(
    services: &Services,
    input: &RowInput,
    software_type: &str,
) -> ([String; 3], Vec<String>) {
    let sentinel = || {
        [
            NOT_AVAILABLE.to_string(),
            NOT_AVAILABLE.to_string(),
            NOT_AVAILABLE.to_string(),
        ]
    };
    let catalog = &services.catalog.attributes;
    if catalog.is_empty() {
        debug!("no attribute tags loaded, matches degrade to N/A");
        return (sentinel(), Vec::new());
    }

    let params = [
        ("software_type", software_type),
        ("product_name", input.product_name.as_str()),
    ];
    if let Some(cached) = services.cache.get("attribute_match", &params).await {
        if let Ok(matches) = serde_json::from_value::<[String; 3]>(cached) {
            return (matches, Vec::new());
        }
    }

    let system = prompts::attribute_system(catalog);
    let prompt = prompts::attribute_match(&input.product_name, software_type);
    let Some(response) = services
        .gateway
        .call(&prompt, Some(system.as_str()), ModelTier::Haiku, true)
        .await
    else {
        return (sentinel(), vec!["Attribute match failed".to_string()]);
    };

    let parsed: Value = match serde_json::from_str(&extract_json(&response)) {
        Ok(parsed) => parsed,
        Err(e) => {
            error!(row_id = %input.row_id, "attribute response was not valid JSON: {e}");
            return (sentinel(), vec![format!("Attribute error: {e}")]);
        }
    };

    let matches = [
        resolve_label(&attribute_label(&parsed, 1), catalog),
        resolve_label(&attribute_label(&parsed, 2), catalog),
        resolve_label(&attribute_label(&parsed, 3), catalog),
    ];

    if let Ok(value) = serde_json::to_value(&matches) {
        services
            .cache
            .set("attribute_match", &params, value, MATCH_TTL_SECONDS)
            .await;
    }
    (matches, Vec::new())
}

fn attribute_label(parsed: &Value, n: usize) -> String {
    parsed
        .get(format!("Top_Attribute_{n}"))
        .and_then(|v| v.get("Attribute Name"))
        .and_then(Value::as_str)
        .unwrap_or(NOT_AVAILABLE)
        .to_string()
}

/// Static placeholders until the platform taxonomy gets its own source.
fn find_platform_matches() -> [String; 2] {
    ["Software".to_string(), "SaaS".to_string()]
}

/// Terminal stage: assemble the flat record from whatever partial state
/// exists. Must not fail; every missing value becomes "N/A".
pub fn format_output(state: &RowState) -> EnrichedRecord {
    fn or_na(value: &str) -> String {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            NOT_AVAILABLE.to_string()
        } else {
            trimmed.to_string()
        }
    }

    let vendor = state.vendor_details.clone().unwrap_or_default();
    let product = state.product_details.clone().unwrap_or_default();
    let na2 = || [NOT_AVAILABLE.to_string(), NOT_AVAILABLE.to_string()];
    let na3 = || {
        [
            NOT_AVAILABLE.to_string(),
            NOT_AVAILABLE.to_string(),
            NOT_AVAILABLE.to_string(),
        ]
    };
    let taxonomy = state.taxonomy_matches.clone().unwrap_or_else(na2);
    let attributes = state.attribute_matches.clone().unwrap_or_else(na3);
    let platform = state.platform_matches.clone().unwrap_or_else(na2);

    EnrichedRecord {
        vendor_name: state.input.vendor_name.clone(),
        vendor_url: state.input.vendor_url.clone(),
        product_name: state.input.product_name.clone(),
        product_url: state.input.product_url.clone(),
        legal_vendor_name: or_na(&vendor.legal_name),
        official_vendor_website: or_na(&vendor.official_website),
        acquiring_company: or_na(&vendor.acquiring_company),
        wikipedia_link: or_na(&vendor.wikipedia_link),
        linkedin_profile: or_na(&vendor.linkedin_profile),
        founded_year: or_na(&vendor.founded_year),
        product_type: or_na(&product.product_type.joined()),
        product_users: or_na(&product.product_users),
        product_tasks: or_na(&product.product_tasks),
        product_features: or_na(&product.product_features),
        taxonomy_match_1: taxonomy[0].clone(),
        taxonomy_match_2: taxonomy[1].clone(),
        attribute_1: attributes[0].clone(),
        attribute_2: attributes[1].clone(),
        attribute_3: attributes[2].clone(),
        platform_1: platform[0].clone(),
        platform_2: platform[1].clone(),
        errors: if state.errors.is_empty() {
            "None".to_string()
        } else {
            state.errors.join("; ")
        },
        row_id: state.input.row_id.clone(),
    }
}
