//! # Document Aggregation Module
//!
//! ## Purpose
//! The core query of the service: given one or more search terms, a date
//! granularity, and an optional inclusive date range, compute per-period
//! mention counts over a contiguous timeline and optionally fetch the
//! matching document rows.
//!
//! ## Input/Output Specification
//! - **Input**: Term set, granularity (day/month/year), optional date range,
//!   match field selection, projection selection
//! - **Output**: Gap-free ascending bucket series plus optional document rows
//!   in the display or export projection
//!
//! ## Key Features
//! - Case-insensitive substring matching, multiple terms OR-ed together
//! - Contiguous bucket series between the first and last matching period,
//!   zero-filled where a period has no matches
//! - Deterministic document ordering by (document_date, id)
//! - Export projection with per-term substring-occurrence relevance scores

use crate::config::QueryConfig;
use crate::errors::{DashboardError, Result};
use crate::store::Store;
use chrono::{Datelike, Months, NaiveDate};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Time unit used to group document dates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Day,
    Month,
    Year,
}

impl Granularity {
    /// Parse a caller-supplied granularity value
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(Granularity::Day),
            "month" => Ok(Granularity::Month),
            "year" => Ok(Granularity::Year),
            _ => Err(DashboardError::validation(
                "granularity",
                "must be one of day, month, year",
            )),
        }
    }

    /// Truncate a date to the start of its period
    pub fn truncate(self, date: NaiveDate) -> NaiveDate {
        match self {
            Granularity::Day => date,
            Granularity::Month => date.with_day(1).unwrap_or(date),
            Granularity::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date),
        }
    }

    /// Start of the period following the one that begins at `start`
    pub fn next_period(self, start: NaiveDate) -> Option<NaiveDate> {
        match self {
            Granularity::Day => start.succ_opt(),
            Granularity::Month => start.checked_add_months(Months::new(1)),
            Granularity::Year => start.checked_add_months(Months::new(12)),
        }
    }

    /// Inclusive date range covered by the period containing `date`.
    /// A clicked day bucket spans that single day, a month bucket the whole
    /// calendar month, a year bucket the whole calendar year.
    pub fn period_bounds(self, date: NaiveDate) -> (NaiveDate, NaiveDate) {
        let start = self.truncate(date);
        let end = self
            .next_period(start)
            .and_then(|next| next.pred_opt())
            .unwrap_or(start);
        (start, end)
    }

    /// SQL expression producing the period start for a document date
    fn bucket_expr(self) -> &'static str {
        match self {
            Granularity::Day => "date(document_date)",
            Granularity::Month => "strftime('%Y-%m-01', document_date)",
            Granularity::Year => "strftime('%Y-01-01', document_date)",
        }
    }
}

/// Which document field(s) a term is matched against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchField {
    #[default]
    Text,
    TextOrTitle,
}

/// Which row shape to return when documents are fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Projection {
    #[default]
    Display,
    Export,
}

/// A time period with its mention count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    pub bucket_date: NaiveDate,
    pub count: u64,
}

/// Document row shape used by the dashboard table
#[derive(Debug, Clone, Serialize)]
pub struct DisplayRow {
    pub id: i64,
    pub title: String,
    pub text: String,
    pub document_date: NaiveDate,
    pub folder_path: String,
    pub file_link: String,
}

/// Document row shape used by CSV export, with one score per requested term
#[derive(Debug, Clone, Serialize)]
pub struct ExportRow {
    pub id: i64,
    pub title: String,
    pub document_date: NaiveDate,
    pub file_link: String,
    pub scores: Vec<u64>,
}

/// Fetched document rows in the projection the caller selected
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum DocumentRows {
    Display(Vec<DisplayRow>),
    Export(Vec<ExportRow>),
}

impl DocumentRows {
    pub fn len(&self) -> usize {
        match self {
            DocumentRows::Display(rows) => rows.len(),
            DocumentRows::Export(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Aggregation query parameters
#[derive(Debug, Clone)]
pub struct AggregateQuery {
    /// Raw term set; trimmed and deduplicated before use
    pub terms: Vec<String>,
    pub granularity: Granularity,
    /// Inclusive date range; when present, matching rows are fetched too
    pub range: Option<(NaiveDate, NaiveDate)>,
    pub match_field: MatchField,
    pub projection: Projection,
}

/// Aggregation result: bucket series plus optional document rows
#[derive(Debug, Clone, Serialize)]
pub struct AggregateResult {
    pub buckets: Vec<Bucket>,
    pub documents: Option<DocumentRows>,
}

/// Executes aggregation queries against the document store
pub struct Aggregator {
    store: Arc<Store>,
    limits: QueryConfig,
}

impl Aggregator {
    pub fn new(store: Arc<Store>, limits: QueryConfig) -> Self {
        Self { store, limits }
    }

    /// Run an aggregation query.
    ///
    /// Buckets are always computed. Document rows are fetched when a date
    /// range is supplied or the export projection was requested; an export
    /// without a range covers every matching document.
    pub fn run(&self, query: &AggregateQuery) -> Result<AggregateResult> {
        let terms = self.normalize_terms(&query.terms)?;

        self.store.with_connection(|conn| {
            let buckets = query_buckets(conn, &terms, query.granularity, query.match_field)?;

            let fetch_documents =
                query.range.is_some() || query.projection == Projection::Export;
            let documents = if fetch_documents {
                Some(query_documents(
                    conn,
                    &terms,
                    query.range,
                    query.match_field,
                    query.projection,
                )?)
            } else {
                None
            };

            Ok(AggregateResult { buckets, documents })
        })
    }

    /// Trim, drop blanks, deduplicate case-insensitively, and enforce limits.
    /// Exposed so callers shaping export columns see the same term order the
    /// query will use.
    pub fn normalize_terms(&self, raw: &[String]) -> Result<Vec<String>> {
        let mut seen = HashSet::new();
        let mut terms = Vec::new();

        for value in raw {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                continue;
            }
            if seen.insert(trimmed.to_lowercase()) {
                terms.push(trimmed.to_string());
            }
        }

        if terms.is_empty() {
            return Err(DashboardError::validation("term", "term is required"));
        }
        if terms.len() > self.limits.max_terms {
            return Err(DashboardError::validation(
                "terms",
                format!("at most {} terms are allowed per query", self.limits.max_terms),
            ));
        }
        for term in &terms {
            let length = term.chars().count();
            if length < self.limits.min_term_length {
                return Err(DashboardError::validation(
                    "terms",
                    format!("term '{}' is shorter than {} characters", term, self.limits.min_term_length),
                ));
            }
            if length > self.limits.max_term_length {
                return Err(DashboardError::validation(
                    "terms",
                    format!("term '{}' is longer than {} characters", term, self.limits.max_term_length),
                ));
            }
        }

        Ok(terms)
    }
}

/// Approximate per-term relevance: case-insensitive substring occurrences in
/// text plus title. A cheap containment count, not tokenized term frequency.
pub fn relevance_score(text: &str, title: &str, term: &str) -> u64 {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return 0;
    }
    (count_occurrences(text, &needle) + count_occurrences(title, &needle)) as u64
}

fn count_occurrences(haystack: &str, needle_lower: &str) -> usize {
    if haystack.is_empty() {
        return 0;
    }
    haystack.to_lowercase().matches(needle_lower).count()
}

/// Escape LIKE metacharacters so a user term always matches literally
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.to_lowercase().chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

/// Build the WHERE fragment OR-ing every term over the searchable field(s),
/// pushing the bound patterns onto `params`
fn match_clause(terms: &[String], match_field: MatchField, params: &mut Vec<String>) -> String {
    let mut predicates = Vec::with_capacity(terms.len());

    for term in terms {
        let pattern = like_pattern(term);
        match match_field {
            MatchField::Text => {
                params.push(pattern);
                predicates.push(format!("lower(text) LIKE ?{} ESCAPE '\\'", params.len()));
            }
            MatchField::TextOrTitle => {
                params.push(pattern.clone());
                let text_index = params.len();
                params.push(pattern);
                let title_index = params.len();
                predicates.push(format!(
                    "(lower(text) LIKE ?{} ESCAPE '\\' OR lower(title) LIKE ?{} ESCAPE '\\')",
                    text_index, title_index
                ));
            }
        }
    }

    format!("({})", predicates.join(" OR "))
}

fn query_buckets(
    conn: &Connection,
    terms: &[String],
    granularity: Granularity,
    match_field: MatchField,
) -> Result<Vec<Bucket>> {
    let mut params: Vec<String> = Vec::new();
    let clause = match_clause(terms, match_field, &mut params);
    let expr = granularity.bucket_expr();

    let sql = format!(
        "SELECT {expr} AS bucket_date, COUNT(*) AS count
         FROM documents
         WHERE {clause}
         GROUP BY {expr}
         ORDER BY {expr}",
    );

    let mut stmt = conn.prepare(&sql)?;
    let counted = stmt
        .query_map(rusqlite::params_from_iter(params.iter()), |row| {
            Ok((row.get::<_, NaiveDate>(0)?, row.get::<_, i64>(1)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(fill_gaps(&counted, granularity))
}

/// Expand sparse per-period counts into a contiguous zero-filled series
/// between the first and last matching period. Empty input stays empty.
fn fill_gaps(counted: &[(NaiveDate, i64)], granularity: Granularity) -> Vec<Bucket> {
    let (first, last) = match (counted.first(), counted.last()) {
        (Some(first), Some(last)) => (first.0, last.0),
        _ => return Vec::new(),
    };

    let counts: HashMap<NaiveDate, i64> = counted.iter().copied().collect();
    let mut buckets = Vec::new();
    let mut current = granularity.truncate(first);
    let max = granularity.truncate(last);

    while current <= max {
        let count = counts.get(&current).copied().unwrap_or(0).max(0) as u64;
        buckets.push(Bucket {
            bucket_date: current,
            count,
        });
        current = match granularity.next_period(current) {
            Some(next) => next,
            None => break,
        };
    }

    buckets
}

fn query_documents(
    conn: &Connection,
    terms: &[String],
    range: Option<(NaiveDate, NaiveDate)>,
    match_field: MatchField,
    projection: Projection,
) -> Result<DocumentRows> {
    let mut params: Vec<String> = Vec::new();
    let clause = match_clause(terms, match_field, &mut params);

    let mut sql = format!(
        "SELECT id, title, text, document_date, folder_path, file_link
         FROM documents
         WHERE {clause}",
    );
    if let Some((start, end)) = range {
        params.push(start.to_string());
        sql.push_str(&format!(" AND document_date >= ?{}", params.len()));
        params.push(end.to_string());
        sql.push_str(&format!(" AND document_date <= ?{}", params.len()));
    }
    sql.push_str(" ORDER BY document_date ASC, id ASC");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(params.iter()), |row| {
            Ok(DisplayRow {
                id: row.get(0)?,
                title: row.get(1)?,
                text: row.get(2)?,
                document_date: row.get(3)?,
                folder_path: row.get(4)?,
                file_link: row.get(5)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    match projection {
        Projection::Display => Ok(DocumentRows::Display(rows)),
        Projection::Export => Ok(DocumentRows::Export(
            rows.into_iter()
                .map(|row| {
                    let scores = terms
                        .iter()
                        .map(|term| relevance_score(&row.text, &row.title, term))
                        .collect();
                    ExportRow {
                        id: row.id,
                        title: row.title,
                        document_date: row.document_date,
                        file_link: row.file_link,
                        scores,
                    }
                })
                .collect(),
        )),
    }
}
