//! # CSV Export Module
//!
//! ## Purpose
//! Serializes the export projection of an aggregation result to CSV so
//! matching documents can be pulled into a spreadsheet, one relevance score
//! column per requested term.
//!
//! ## Key Features
//! - RFC-4180-style quoting: fields containing a comma, quote, or newline are
//!   wrapped in quotes with internal quotes doubled
//! - CRLF record separators
//! - Column order mirrors the export projection: id, title, document_date,
//!   file_link, then one column per term in request order

use crate::aggregate::ExportRow;

/// Quote a field if it contains a comma, quote, or line break
pub fn escape_field(value: &str) -> String {
    if value.contains(|c| matches!(c, '"' | ',' | '\n' | '\r')) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Render export rows as a CSV document, header included
pub fn to_csv(terms: &[String], rows: &[ExportRow]) -> String {
    let mut header: Vec<String> = ["id", "title", "document_date", "file_link"]
        .iter()
        .map(|c| c.to_string())
        .collect();
    header.extend(terms.iter().map(|term| escape_field(term)));

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(header.join(","));

    for row in rows {
        let mut fields = vec![
            row.id.to_string(),
            escape_field(&row.title),
            row.document_date.to_string(),
            escape_field(&row.file_link),
        ];
        fields.extend(row.scores.iter().map(|score| score.to_string()));
        lines.push(fields.join(","));
    }

    let mut csv = lines.join("\r\n");
    csv.push_str("\r\n");
    csv
}
