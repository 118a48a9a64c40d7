//! Centralized prompt templates for the enrichment LLM calls.
//!
//! All prompts live here so wording changes never touch pipeline logic. The
//! matching prompts embed a numbered catalog listing and instruct the model
//! to copy labels verbatim; validation still re-checks every returned label.

/// Cap on how many attribute tags are embedded in the matching prompt.
pub const ATTRIBUTE_PROMPT_LIMIT: usize = 200;

pub fn vendor_info(
    vendor_name: &str,
    vendor_url: &str,
    product_name: &str,
    product_url: &str,
) -> String {
    format!(
        r#"Extract vendor information for:
Vendor: {vendor_name}
Vendor URL: {vendor_url}
Product: {product_name}
Product URL: {product_url}

Find the following information about this vendor:
1. Legal Vendor Name (official legal entity name)
2. Official Vendor Website (canonical URL)
3. Acquiring Company Name (if the company was acquired, otherwise "N/A")
4. Wikipedia link (if available, otherwise "N/A")
5. LinkedIn profile (company LinkedIn URL, otherwise "N/A")
6. Founded Year (year company was founded, otherwise "N/A")

Research using the provided information and your knowledge base.

Return ONLY a JSON object with these EXACT keys:
{{
    "Legal_Vendor_Name": "",
    "Official_Vendor_Website": "",
    "Acquiring_Company_Name": "",
    "Wikipedia_link": "",
    "LinkedIn_profile": "",
    "Founded_Year": ""
}}

No markdown, no explanations, just the JSON object."#
    )
}

pub fn product_info(product_name: &str, product_url: &str) -> String {
    format!(
        r#"Analyze this product and extract key information:

Product Name: {product_name}
Product URL: {product_url}

Extract the following:
1. Product_name (official product name)
2. Product_Link (canonical URL)
3. Type_of_Product (e.g., "CRM Software", "Security Platform", "HR Management System")
4. Type_of_users (target audience, e.g., "Enterprise IT Teams", "Small Business Owners")
5. Tasks_a_user_can_perform (main tasks users can do, comma-separated)
6. Product_features (key features, comma-separated)

Research using the provided URL and your knowledge.

Return ONLY a JSON object with these EXACT keys:
{{
    "Product_name": "",
    "Product_Link": "",
    "Type_of_Product": "",
    "Type_of_users": "",
    "Tasks_a_user_can_perform": "",
    "Product_features": ""
}}

No markdown, no explanations, just the JSON object."#
    )
}

pub const TAXONOMY_SYSTEM: &str = r#"You are a taxonomy classification expert. You match products to the most relevant taxonomy categories from a provided list.

CRITICAL RULES:
1. You MUST return the EXACT taxonomy text from the numbered list - copy it character-for-character
2. Do NOT paraphrase, shorten, or modify the taxonomy names
3. Do NOT make up new taxonomy names
4. If unsure, pick the closest match from the list"#;

pub fn taxonomy_match(product_name: &str, software_type: &str, taxonomy: &[String]) -> String {
    let listing = numbered(taxonomy.iter());
    format!(
        r#"Product Name: {product_name}
Product Type: {software_type}

Available Taxonomy Categories (choose from this list):
{listing}

Task: Select the 2 most relevant taxonomy categories for this product.

Examples of correct format:
- For a CRM product: "Software > Enterprise Applications > Customer Relationship Management Applications"
- For security software: "Software > Software Infrastructure > Security > Identity and Access Management"

Return ONLY this JSON (copy taxonomy names EXACTLY from the numbered list above):
{{
    "match_1": "EXACT taxonomy from list",
    "match_2": "EXACT taxonomy from list"
}}"#
    )
}

pub fn attribute_system(attributes: &[String]) -> String {
    let listing = numbered(attributes.iter().take(ATTRIBUTE_PROMPT_LIMIT));
    format!(
        r#"You are matching products to attributes.

Available Product Attributes:
{listing}

CRITICAL: You MUST return ONLY the EXACT attribute names from the list above. Do not paraphrase or modify them."#
    )
}

pub fn attribute_match(product_name: &str, software_type: &str) -> String {
    format!(
        r#"Product: {product_name}
Type: {software_type}

Based on the available attributes above, identify the top 3 most relevant attributes for this product.

Return ONLY JSON in this exact format (use the EXACT attribute names from the list):
{{
    "Top_Attribute_1": {{"Attribute Name": "exact attribute from list"}},
    "Top_Attribute_2": {{"Attribute Name": "exact attribute from list"}},
    "Top_Attribute_3": {{"Attribute Name": "exact attribute from list"}}
}}

IMPORTANT: Copy the attribute names EXACTLY as they appear in the list. Do not modify or paraphrase."#
    )
}

fn numbered<'a>(labels: impl Iterator<Item = &'a String>) -> String {
    labels
        .enumerate()
        .map(|(i, label)| format!("{}. {label}", i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_prompt_numbers_every_label() {
        let taxonomy = vec!["Software > A".to_string(), "Software > B".to_string()];
        let prompt = taxonomy_match("Sales Cloud", "CRM Software", &taxonomy);
        assert!(prompt.contains("1. Software > A"));
        assert!(prompt.contains("2. Software > B"));
    }

    #[test]
    fn attribute_system_caps_the_listing() {
        let attributes: Vec<String> = (0..300).map(|i| format!("attr_{i}")).collect();
        let system = attribute_system(&attributes);
        assert!(system.contains(&format!("{}. attr_{}", ATTRIBUTE_PROMPT_LIMIT, ATTRIBUTE_PROMPT_LIMIT - 1)));
        assert!(!system.contains("attr_200"));
    }
}
