//! Typed row state flowing through the enrichment pipeline.
//!
//! Fields populate monotonically as stages complete; stage outcomes are
//! carried as data (`None` / sentinel values plus error strings), never as
//! control flow.

use serde::{Deserialize, Deserializer, Serialize};

/// Explicit placeholder meaning "no valid value determined", distinct from
/// absence.
pub const NOT_AVAILABLE: &str = "N/A";

/// One vendor/product tuple to be enriched; the unit of batch parallelism.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RowInput {
    pub row_id: String,
    pub vendor_name: String,
    pub vendor_url: String,
    pub product_name: String,
    pub product_url: String,
}

impl RowInput {
    /// Product fields default to their vendor equivalents when blank.
    pub fn new(
        row_id: impl Into<String>,
        vendor_name: impl Into<String>,
        vendor_url: impl Into<String>,
        product_name: impl Into<String>,
        product_url: impl Into<String>,
    ) -> Self {
        let vendor_name = vendor_name.into();
        let vendor_url = vendor_url.into();
        let product_name = non_blank_or(product_name.into(), &vendor_name);
        let product_url = non_blank_or(product_url.into(), &vendor_url);
        Self {
            row_id: row_id.into(),
            vendor_name,
            vendor_url,
            product_name,
            product_url,
        }
    }
}

fn non_blank_or(value: String, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value
    }
}

/// A value the model may return as either a single string or a list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StringOrList {
    One(String),
    Many(Vec<String>),
}

impl StringOrList {
    pub fn joined(&self) -> String {
        match self {
            StringOrList::One(s) => s.clone(),
            StringOrList::Many(items) => items.join(", "),
        }
    }
}

impl Default for StringOrList {
    fn default() -> Self {
        StringOrList::One(String::new())
    }
}

/// Accept any scalar (or list of scalars) where a string is expected; models
/// occasionally return founding years as numbers and feature lists as arrays.
fn de_flex_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(flex_string(&value))
}

fn flex_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        serde_json::Value::Array(items) => items
            .iter()
            .map(flex_string)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VendorDetails {
    #[serde(rename = "Legal_Vendor_Name", default, deserialize_with = "de_flex_string")]
    pub legal_name: String,
    #[serde(rename = "Official_Vendor_Website", default, deserialize_with = "de_flex_string")]
    pub official_website: String,
    #[serde(rename = "Acquiring_Company_Name", default, deserialize_with = "de_flex_string")]
    pub acquiring_company: String,
    #[serde(rename = "Wikipedia_link", default, deserialize_with = "de_flex_string")]
    pub wikipedia_link: String,
    #[serde(rename = "LinkedIn_profile", default, deserialize_with = "de_flex_string")]
    pub linkedin_profile: String,
    #[serde(rename = "Founded_Year", default, deserialize_with = "de_flex_string")]
    pub founded_year: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductDetails {
    #[serde(rename = "Product_name", default, deserialize_with = "de_flex_string")]
    pub product_name: String,
    #[serde(rename = "Product_Link", default, deserialize_with = "de_flex_string")]
    pub product_link: String,
    /// Kept as string-or-list; the software-type stage does the joining.
    #[serde(rename = "Type_of_Product", default)]
    pub product_type: StringOrList,
    #[serde(rename = "Type_of_users", default, deserialize_with = "de_flex_string")]
    pub product_users: String,
    #[serde(rename = "Tasks_a_user_can_perform", default, deserialize_with = "de_flex_string")]
    pub product_tasks: String,
    #[serde(rename = "Product_features", default, deserialize_with = "de_flex_string")]
    pub product_features: String,
}

/// Mutable accumulator for one row's pipeline execution. Owned exclusively
/// by that execution; never shared across rows.
#[derive(Debug, Clone, Default)]
pub struct RowState {
    pub input: RowInput,
    pub vendor_details: Option<VendorDetails>,
    pub product_details: Option<ProductDetails>,
    pub software_type: Option<String>,
    pub taxonomy_matches: Option<[String; 2]>,
    pub attribute_matches: Option<[String; 3]>,
    pub platform_matches: Option<[String; 2]>,
    /// Append-only; only the terminal stage reads it for the output summary.
    pub errors: Vec<String>,
}

impl RowState {
    pub fn new(input: RowInput) -> Self {
        Self {
            input,
            ..Self::default()
        }
    }
}

/// Final flat output record; the field order defines the CSV column order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedRecord {
    pub vendor_name: String,
    pub vendor_url: String,
    pub product_name: String,
    pub product_url: String,
    pub legal_vendor_name: String,
    pub official_vendor_website: String,
    pub acquiring_company: String,
    pub wikipedia_link: String,
    pub linkedin_profile: String,
    pub founded_year: String,
    pub product_type: String,
    pub product_users: String,
    pub product_tasks: String,
    pub product_features: String,
    pub taxonomy_match_1: String,
    pub taxonomy_match_2: String,
    pub attribute_1: String,
    pub attribute_2: String,
    pub attribute_3: String,
    pub platform_1: String,
    pub platform_2: String,
    pub errors: String,
    pub row_id: String,
}

/// Nested grouping returned by the single-item enrichment surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SingleEnrichment {
    pub vendor_info: VendorInfoGroup,
    pub product_info: ProductInfoGroup,
    pub taxonomy: TaxonomyGroup,
    pub attributes: AttributeGroup,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorInfoGroup {
    pub legal_name: String,
    pub website: String,
    pub acquiring_company: String,
    pub wikipedia: String,
    pub linkedin: String,
    pub founded_year: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductInfoGroup {
    #[serde(rename = "type")]
    pub product_type: String,
    pub users: String,
    pub tasks: String,
    pub features: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxonomyGroup {
    pub match_1: String,
    pub match_2: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeGroup {
    pub attribute_1: String,
    pub attribute_2: String,
    pub attribute_3: String,
}

impl From<&EnrichedRecord> for SingleEnrichment {
    fn from(record: &EnrichedRecord) -> Self {
        Self {
            vendor_info: VendorInfoGroup {
                legal_name: record.legal_vendor_name.clone(),
                website: record.official_vendor_website.clone(),
                acquiring_company: record.acquiring_company.clone(),
                wikipedia: record.wikipedia_link.clone(),
                linkedin: record.linkedin_profile.clone(),
                founded_year: record.founded_year.clone(),
            },
            product_info: ProductInfoGroup {
                product_type: record.product_type.clone(),
                users: record.product_users.clone(),
                tasks: record.product_tasks.clone(),
                features: record.product_features.clone(),
            },
            taxonomy: TaxonomyGroup {
                match_1: record.taxonomy_match_1.clone(),
                match_2: record.taxonomy_match_2.clone(),
            },
            attributes: AttributeGroup {
                attribute_1: record.attribute_1.clone(),
                attribute_2: record.attribute_2.clone(),
                attribute_3: record.attribute_3.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_product_fields_default_to_vendor() {
        let input = RowInput::new("row_0", "Acme", "acme.com", "  ", "");
        assert_eq!(input.product_name, "Acme");
        assert_eq!(input.product_url, "acme.com");
    }

    #[test]
    fn product_type_accepts_string_or_list() {
        let one: ProductDetails =
            serde_json::from_str(r#"{"Type_of_Product": "CRM Software"}"#).unwrap();
        assert_eq!(one.product_type.joined(), "CRM Software");

        let many: ProductDetails =
            serde_json::from_str(r#"{"Type_of_Product": ["CRM", "Analytics"]}"#).unwrap();
        assert_eq!(many.product_type.joined(), "CRM, Analytics");
    }

    #[test]
    fn founded_year_accepts_numbers() {
        let details: VendorDetails =
            serde_json::from_str(r#"{"Founded_Year": 1999}"#).unwrap();
        assert_eq!(details.founded_year, "1999");
    }

    #[test]
    fn missing_keys_default_to_empty() {
        let details: VendorDetails = serde_json::from_str("{}").unwrap();
        assert!(details.legal_name.is_empty());
        assert!(details.founded_year.is_empty());
    }
}
