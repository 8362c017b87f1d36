//! # API Server Module
//!
//! ## Purpose
//! REST API server for the document insights dashboard: the aggregation
//! endpoint the chart and table are built from, search term management, and
//! a health probe.
//!
//! ## Input/Output Specification
//! - **Input**: HTTP requests with term sets, granularity, date ranges,
//!   projection flags, and term payloads
//! - **Output**: JSON responses (bucket series, derived trend analytics,
//!   document rows, search terms) or CSV for exports
//! - **Status codes**: 200/201/204 success, 400 validation, 404 unknown id,
//!   500 store failure with an opaque message
//!
//! ## Key Features
//! - Single `/documents` endpoint serving buckets, drill-down rows, and export
//! - Lenient date handling: malformed dates are treated as absent
//! - CORS support for browser dashboards
//! - Structured error responses; store detail stays in the server log

use crate::aggregate::{
    AggregateQuery, Bucket, DocumentRows, Granularity, MatchField, Projection,
};
use crate::analytics::{self, ChartPoint, MonthTrend};
use crate::errors::{DashboardError, Result};
use crate::export;
use actix_cors::Cors;
use actix_web::{web, App, HttpResponse, HttpServer, Result as ActixResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Application state wrapper for the API server
pub struct ApiServer {
    app_state: crate::AppState,
}

/// Query parameters accepted by the documents endpoint
#[derive(Debug, Deserialize)]
struct DocumentsParams {
    /// Comma-separated term set; the singular form is accepted as an alias
    #[serde(alias = "term")]
    terms: Option<String>,
    granularity: Option<String>,
    #[serde(rename = "startDate")]
    start_date: Option<String>,
    #[serde(rename = "endDate")]
    end_date: Option<String>,
    /// Select the export projection instead of the display projection
    export: Option<bool>,
    /// `csv` renders the export projection as text/csv
    format: Option<String>,
    /// Also match terms against the document title
    #[serde(rename = "matchTitle")]
    match_title: Option<bool>,
}

/// Documents endpoint response payload
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DocumentsResponse {
    buckets: Vec<Bucket>,
    documents: Option<DocumentRows>,
    trend: Vec<ChartPoint>,
    month_trend: Option<MonthTrend>,
}

/// Create/update payload for a search term
#[derive(Debug, Deserialize)]
struct TermPayload {
    term: Option<String>,
    category: Option<String>,
}

impl ApiServer {
    /// Create new API server
    pub fn new(app_state: crate::AppState) -> Self {
        Self { app_state }
    }

    /// Run the API server
    pub async fn run(self) -> Result<()> {
        let bind_addr = format!(
            "{}:{}",
            self.app_state.config.server.host, self.app_state.config.server.port
        );
        let enable_cors = self.app_state.config.server.enable_cors;

        tracing::info!("Starting API server on {}", bind_addr);

        let state = self.app_state.clone();
        let server = HttpServer::new(move || {
            let cors = if enable_cors {
                Cors::permissive()
            } else {
                Cors::default()
            };

            App::new()
                .app_data(web::Data::new(state.clone()))
                .wrap(cors)
                .configure(routes)
        })
        .bind(&bind_addr)
        .map_err(|e| DashboardError::Internal {
            message: format!("Failed to bind server to {}: {}", bind_addr, e),
        })?
        .run();

        server.await.map_err(|e| DashboardError::Internal {
            message: format!("Server error: {}", e),
        })?;

        Ok(())
    }
}

/// Route table, shared by the server and the handler tests
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/documents", web::get().to(documents_handler))
        .route("/search-terms", web::get().to(list_terms_handler))
        .route("/search-terms", web::post().to(create_term_handler))
        .route("/search-terms/{id}", web::get().to(get_term_handler))
        .route("/search-terms/{id}", web::put().to(update_term_handler))
        .route("/search-terms/{id}", web::delete().to(delete_term_handler))
        .route("/health", web::get().to(health_handler));
}

/// Map an error to its HTTP response. Caller errors surface their message;
/// store failures are logged with full detail and answered generically.
fn error_response(err: &DashboardError) -> HttpResponse {
    match err {
        DashboardError::Validation { .. } => {
            HttpResponse::BadRequest().json(json!({ "error": err.to_string() }))
        }
        DashboardError::NotFound { .. } => {
            HttpResponse::NotFound().json(json!({ "error": err.to_string() }))
        }
        _ => {
            tracing::error!(category = err.category(), "Request failed: {}", err);
            HttpResponse::InternalServerError()
                .json(json!({ "error": "Failed to query the document store" }))
        }
    }
}

/// Lenient date normalization: blank or unparseable values are treated as
/// absent rather than rejected. Timestamps are reduced to their date part.
fn normalize_date(value: Option<&str>) -> Option<NaiveDate> {
    let raw = value?.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    raw.parse::<chrono::DateTime<chrono::Utc>>()
        .ok()
        .map(|dt| dt.date_naive())
}

/// Documents endpoint handler
async fn documents_handler(
    app_state: web::Data<crate::AppState>,
    params: web::Query<DocumentsParams>,
) -> ActixResult<HttpResponse> {
    let response = execute_documents(&app_state, &params);
    Ok(response.unwrap_or_else(|e| error_response(&e)))
}

fn execute_documents(
    app_state: &crate::AppState,
    params: &DocumentsParams,
) -> Result<HttpResponse> {
    let raw_terms: Vec<String> = params
        .terms
        .as_deref()
        .unwrap_or("")
        .split(',')
        .map(str::to_string)
        .collect();
    let terms = app_state.aggregator.normalize_terms(&raw_terms)?;

    let start = normalize_date(params.start_date.as_deref());
    let end = normalize_date(params.end_date.as_deref());
    let range = match (start, end) {
        (Some(start), Some(end)) => Some((start, end)),
        (None, None) => None,
        _ => {
            return Err(DashboardError::validation(
                "dateRange",
                "both startDate and endDate are required when filtering by range",
            ))
        }
    };

    let granularity = match params.granularity.as_deref() {
        Some(value) => Granularity::parse(value)?,
        None => Granularity::Day,
    };

    let export_mode = params.export.unwrap_or(false);
    let query = AggregateQuery {
        terms: terms.clone(),
        granularity,
        range,
        match_field: if params.match_title.unwrap_or(false) {
            MatchField::TextOrTitle
        } else {
            MatchField::Text
        },
        projection: if export_mode {
            Projection::Export
        } else {
            Projection::Display
        },
    };

    let result = app_state.aggregator.run(&query)?;

    let csv_requested = export_mode
        && params
            .format
            .as_deref()
            .map(|f| f.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);
    if csv_requested {
        let rows = match &result.documents {
            Some(DocumentRows::Export(rows)) => rows.as_slice(),
            _ => &[],
        };
        let body = export::to_csv(&terms, rows);
        return Ok(HttpResponse::Ok()
            .content_type("text/csv; charset=utf-8")
            .insert_header((
                "Content-Disposition",
                "attachment; filename=\"documents-export.csv\"",
            ))
            .body(body));
    }

    let trend = analytics::rolling_trend(&result.buckets, granularity);
    let month_trend = analytics::month_trend(&result.buckets);

    Ok(HttpResponse::Ok().json(DocumentsResponse {
        buckets: result.buckets,
        documents: result.documents,
        trend,
        month_trend,
    }))
}

/// List all search terms, newest first
async fn list_terms_handler(app_state: web::Data<crate::AppState>) -> ActixResult<HttpResponse> {
    match app_state.store.list_terms() {
        Ok(terms) => Ok(HttpResponse::Ok().json(terms)),
        Err(e) => Ok(error_response(&e)),
    }
}

/// Create a search term
async fn create_term_handler(
    app_state: web::Data<crate::AppState>,
    payload: web::Json<TermPayload>,
) -> ActixResult<HttpResponse> {
    let term = payload.term.as_deref().unwrap_or("");
    match app_state.store.create_term(term, payload.category.as_deref()) {
        Ok(created) => Ok(HttpResponse::Created().json(created)),
        Err(e) => Ok(error_response(&e)),
    }
}

/// Fetch a single search term
async fn get_term_handler(
    app_state: web::Data<crate::AppState>,
    id: web::Path<i64>,
) -> ActixResult<HttpResponse> {
    match app_state.store.get_term(id.into_inner()) {
        Ok(term) => Ok(HttpResponse::Ok().json(term)),
        Err(e) => Ok(error_response(&e)),
    }
}

/// Update a search term, keeping its creation timestamp
async fn update_term_handler(
    app_state: web::Data<crate::AppState>,
    id: web::Path<i64>,
    payload: web::Json<TermPayload>,
) -> ActixResult<HttpResponse> {
    let term = payload.term.as_deref().unwrap_or("");
    match app_state
        .store
        .update_term(id.into_inner(), term, payload.category.as_deref())
    {
        Ok(updated) => Ok(HttpResponse::Ok().json(updated)),
        Err(e) => Ok(error_response(&e)),
    }
}

/// Delete a search term
async fn delete_term_handler(
    app_state: web::Data<crate::AppState>,
    id: web::Path<i64>,
) -> ActixResult<HttpResponse> {
    match app_state.store.delete_term(id.into_inner()) {
        Ok(()) => Ok(HttpResponse::NoContent().finish()),
        Err(e) => Ok(error_response(&e)),
    }
}

/// Health check endpoint handler
async fn health_handler(app_state: web::Data<crate::AppState>) -> ActixResult<HttpResponse> {
    let store_status = match app_state.store.health_check() {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    Ok(HttpResponse::Ok().json(json!({
        "status": store_status,
        "version": env!("CARGO_PKG_VERSION"),
        "components": {
            "store": store_status,
        },
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Aggregator;
    use crate::config::Config;
    use crate::store::Store;
    use crate::AppState;
    use actix_web::{test, App};
    use std::sync::Arc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn seeded_state() -> AppState {
        let config = Arc::new(Config::default());
        let store = Arc::new(Store::in_memory().unwrap());
        store
            .insert_document(
                "Audit report",
                "annual audit findings",
                date(2024, 1, 5),
                "customers/acme",
                "files/audit.pdf",
            )
            .unwrap();
        store
            .insert_document(
                "Recall notice",
                "field action after the audit",
                date(2024, 3, 10),
                "customers/zenith",
                "files/recall.pdf",
            )
            .unwrap();

        let aggregator = Arc::new(Aggregator::new(store.clone(), config.query.clone()));
        AppState {
            config,
            store,
            aggregator,
        }
    }

    macro_rules! test_app {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new($state))
                    .configure(routes),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn test_documents_requires_a_term() {
        let app = test_app!(seeded_state());
        let req = test::TestRequest::get().uri("/documents").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
    }

    #[actix_web::test]
    async fn test_documents_rejects_partial_range() {
        let app = test_app!(seeded_state());
        let req = test::TestRequest::get()
            .uri("/documents?terms=audit&startDate=2024-01-01")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
    }

    #[actix_web::test]
    async fn test_documents_rejects_unknown_granularity() {
        let app = test_app!(seeded_state());
        let req = test::TestRequest::get()
            .uri("/documents?terms=audit&granularity=week")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
    }

    #[actix_web::test]
    async fn test_documents_malformed_dates_are_treated_as_absent() {
        let app = test_app!(seeded_state());
        let req = test::TestRequest::get()
            .uri("/documents?terms=audit&startDate=not-a-date&endDate=also-bad")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert!(body["documents"].is_null());
    }

    #[actix_web::test]
    async fn test_documents_month_buckets_and_trend() {
        let app = test_app!(seeded_state());
        let req = test::TestRequest::get()
            .uri("/documents?terms=audit&granularity=month")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);

        let body: serde_json::Value = test::read_body_json(resp).await;
        let buckets = body["buckets"].as_array().unwrap();
        assert_eq!(buckets.len(), 3);
        assert_eq!(buckets[0]["bucket_date"], "2024-01-01");
        assert_eq!(buckets[1]["count"], 0);
        assert_eq!(buckets[2]["bucket_date"], "2024-03-01");
        assert!(body["documents"].is_null());
        assert_eq!(body["trend"].as_array().unwrap().len(), 3);
        assert!(body["monthTrend"].is_object());
    }

    #[actix_web::test]
    async fn test_documents_range_returns_rows() {
        let app = test_app!(seeded_state());
        let req = test::TestRequest::get()
            .uri("/documents?terms=audit&startDate=2024-01-01&endDate=2024-01-31")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);

        let body: serde_json::Value = test::read_body_json(resp).await;
        let documents = body["documents"].as_array().unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0]["title"], "Audit report");
        assert_eq!(documents[0]["document_date"], "2024-01-05");
        assert_eq!(documents[0]["folder_path"], "customers/acme");
    }

    #[actix_web::test]
    async fn test_documents_csv_export() {
        let app = test_app!(seeded_state());
        let req = test::TestRequest::get()
            .uri("/documents?terms=audit&export=true&format=csv&startDate=2024-01-01&endDate=2024-12-31")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
        assert!(resp
            .headers()
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("text/csv"));

        let body = test::read_body(resp).await;
        let text = std::str::from_utf8(&body).unwrap();
        assert!(text.starts_with("id,title,document_date,file_link,audit\r\n"));
        assert!(text.contains("Audit report"));
    }

    #[actix_web::test]
    async fn test_term_crud_flow() {
        let app = test_app!(seeded_state());

        let req = test::TestRequest::post()
            .uri("/search-terms")
            .set_json(json!({ "term": "complaint", "category": "quality" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 201);
        let created: serde_json::Value = test::read_body_json(resp).await;
        let id = created["id"].as_i64().unwrap();
        assert_eq!(created["term"], "complaint");

        let req = test::TestRequest::put()
            .uri(&format!("/search-terms/{}", id))
            .set_json(json!({ "term": "complaints" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
        let updated: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(updated["term"], "complaints");
        assert_eq!(updated["created_date"], created["created_date"]);

        let req = test::TestRequest::get().uri("/search-terms").to_request();
        let resp = test::call_service(&app, req).await;
        let listed: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let req = test::TestRequest::delete()
            .uri(&format!("/search-terms/{}", id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 204);

        let req = test::TestRequest::delete()
            .uri(&format!("/search-terms/{}", id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 404);
    }

    #[actix_web::test]
    async fn test_create_term_requires_text() {
        let app = test_app!(seeded_state());
        let req = test::TestRequest::post()
            .uri("/search-terms")
            .set_json(json!({ "term": "   " }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
    }

    #[actix_web::test]
    async fn test_get_unknown_term_is_not_found() {
        let app = test_app!(seeded_state());
        let req = test::TestRequest::get()
            .uri("/search-terms/9999")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 404);
    }

    #[actix_web::test]
    async fn test_health_endpoint() {
        let app = test_app!(seeded_state());
        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "healthy");
    }
}
