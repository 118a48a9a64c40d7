//! CSV boundary: the pipeline treats tabular I/O as an opaque row
//! source/sink.

use crate::error::EnrichError;
use crate::pipeline::{EnrichedRecord, RowInput};
use csv::ReaderBuilder;

pub const REQUIRED_COLUMNS: [&str; 4] =
    ["vendor_name", "vendor_url", "product_name", "product_url"];

/// Parse an input table into rows, assigning `row_{index}` identifiers.
///
/// Missing required columns or an empty body reject the whole batch; no
/// partial processing is attempted.
pub fn parse_input(csv_text: &str) -> Result<Vec<RowInput>, EnrichError> {
    let mut reader = ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(csv_text.as_bytes());
    let headers = reader.headers()?.clone();

    let mut positions = [0usize; 4];
    let mut missing = Vec::new();
    for (i, column) in REQUIRED_COLUMNS.iter().enumerate() {
        match headers.iter().position(|h| h == *column) {
            Some(pos) => positions[i] = pos,
            None => missing.push(column.to_string()),
        }
    }
    if !missing.is_empty() {
        return Err(EnrichError::MissingColumns(missing));
    }

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let field = |pos: usize| record.get(pos).unwrap_or("").trim().to_string();
        rows.push(RowInput::new(
            format!("row_{index}"),
            field(positions[0]),
            field(positions[1]),
            field(positions[2]),
            field(positions[3]),
        ));
    }
    if rows.is_empty() {
        return Err(EnrichError::EmptyInput);
    }
    Ok(rows)
}

/// Serialize enriched records back to CSV, headers included.
pub fn write_output(records: &[EnrichedRecord]) -> Result<String, EnrichError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    let bytes = writer
        .into_inner()
        .map_err(|e| EnrichError::Io(std::io::Error::other(e.to_string())))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rows_in_order_with_ids() {
        let csv = "vendor_name,vendor_url,product_name,product_url\n\
                   Salesforce,salesforce.com,Sales Cloud,salesforce.com/products/sales-cloud\n\
                   Acme,acme.com,Widget,acme.com/widget\n";
        let rows = parse_input(csv).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].row_id, "row_0");
        assert_eq!(rows[0].product_name, "Sales Cloud");
        assert_eq!(rows[1].row_id, "row_1");
        assert_eq!(rows[1].vendor_name, "Acme");
    }

    #[test]
    fn blank_product_fields_default_to_vendor_fields() {
        let csv = "vendor_name,vendor_url,product_name,product_url\nAcme,acme.com,,\n";
        let rows = parse_input(csv).unwrap();

        assert_eq!(rows[0].product_name, "Acme");
        assert_eq!(rows[0].product_url, "acme.com");
    }

    #[test]
    fn extra_columns_are_tolerated() {
        let csv = "notes,vendor_name,vendor_url,product_name,product_url\nx,Acme,acme.com,W,acme.com/w\n";
        let rows = parse_input(csv).unwrap();
        assert_eq!(rows[0].vendor_name, "Acme");
    }

    #[test]
    fn missing_columns_reject_the_batch() {
        let csv = "vendor_name,product_name\nAcme,Widget\n";
        match parse_input(csv) {
            Err(EnrichError::MissingColumns(missing)) => {
                assert_eq!(missing, vec!["vendor_url", "product_url"]);
            }
            other => panic!("expected MissingColumns, got {other:?}"),
        }
    }

    #[test]
    fn empty_body_rejects_the_batch() {
        let csv = "vendor_name,vendor_url,product_name,product_url\n";
        assert!(matches!(parse_input(csv), Err(EnrichError::EmptyInput)));
    }

    #[test]
    fn empty_input_rejects_the_batch() {
        assert!(parse_input("").is_err());
    }

    #[test]
    fn output_contains_headers_and_all_columns() {
        let record = crate::pipeline::format_output(&crate::pipeline::RowState::new(
            RowInput::new("row_0", "Acme", "acme.com", "", ""),
        ));
        let csv = write_output(&[record]).unwrap();
        let header = csv.lines().next().unwrap();

        assert!(header.starts_with("vendor_name,vendor_url,product_name,product_url"));
        assert!(header.ends_with("errors,row_id"));
        assert_eq!(csv.lines().count(), 2);
    }
}
