//! HTTP request handlers for the Scribe API.

use std::path::Path as FsPath;
use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use scribe_alerts::{IngestOutcome, PendingAlert, PendingAlertSummary, normalize_payload};
use scribe_docs::{
    Document, DocumentUpdate, ExportFormat, NewDocument, NewTemplate, PreviewOutcome, Template,
    TemplateUpdate, export,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ApiError, ApiResult};
use crate::extract::JsonBody;
use crate::state::AppState;

/// Body of the process and preview endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateChoice {
    /// Template to render with.
    pub template_id: String,
}

/// Query parameters for document listing.
#[derive(Debug, Deserialize)]
pub struct DocumentQuery {
    /// Substring to search for.
    pub search: Option<String>,
}

/// Query parameters for export.
#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    /// `text` (default) or `html`.
    pub format: Option<String>,
}

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Status message.
    pub status: String,
    /// Server uptime in seconds.
    pub uptime_secs: u64,
    /// Alerts waiting for a template.
    pub pending_alerts: usize,
}

/// Handle GET /api/health - health check endpoint.
pub async fn health_check(State(state): State<Arc<AppState>>) -> ApiResult<Json<HealthResponse>> {
    let uptime_secs = state.uptime_secs();
    let pending_alerts = state
        .run_blocking(|s| Ok(s.alerts().pending_count()?))
        .await?;
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs,
        pending_alerts,
    }))
}

// ============ Alerts ============

/// Handle POST /api/webhook - ingest a raw alert delivery.
pub async fn receive_webhook(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<Json<IngestOutcome>> {
    let outcome = state
        .run_blocking(move |s| Ok(s.alerts().ingest(&body)?))
        .await?;
    debug!(alert_id = %outcome.alert_id, duplicate = outcome.duplicate, "webhook accepted");
    Ok(Json(outcome))
}

/// Handle GET /api/alerts/pending - alerts waiting for a template.
pub async fn list_pending_alerts(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<PendingAlertSummary>>> {
    let alerts = state
        .run_blocking(|s| Ok(s.alerts().list_pending()?))
        .await?;
    Ok(Json(alerts.iter().map(PendingAlertSummary::from).collect()))
}

/// Handle GET /api/alerts - every stored alert, processed ones included.
pub async fn list_alerts(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<PendingAlertSummary>>> {
    let alerts = state
        .run_blocking(|s| Ok(s.alerts().list_all()?))
        .await?;
    Ok(Json(alerts.iter().map(PendingAlertSummary::from).collect()))
}

/// Handle GET /api/alerts/:id - alert detail.
pub async fn get_alert(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<PendingAlert>> {
    let alert = state
        .run_blocking(move |s| Ok(s.alerts().get(&id)?))
        .await?;
    Ok(Json(alert))
}

/// Handle DELETE /api/alerts/:id - dismiss a pending alert.
pub async fn dismiss_alert(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state
        .run_blocking(move |s| Ok(s.alerts().dismiss(&id)?))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handle POST /api/alerts/:id/process - render a document from an alert.
pub async fn process_alert(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    JsonBody(choice): JsonBody<TemplateChoice>,
) -> ApiResult<(StatusCode, Json<Document>)> {
    let document = state
        .run_blocking(move |s| s.process_alert(&id, &choice.template_id))
        .await?;
    Ok((StatusCode::CREATED, Json(document)))
}

/// Handle POST /api/alerts/:id/preview - render without saving.
pub async fn preview_alert(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    JsonBody(choice): JsonBody<TemplateChoice>,
) -> ApiResult<Json<PreviewOutcome>> {
    let outcome = state
        .run_blocking(move |s| s.preview_alert(&id, &choice.template_id))
        .await?;
    Ok(Json(outcome))
}

// ============ Templates ============

/// Handle GET /api/templates - list templates.
pub async fn list_templates(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Template>>> {
    let templates = state
        .run_blocking(|s| Ok(s.templates().list()?))
        .await?;
    Ok(Json(templates))
}

/// Handle GET /api/templates/:id - get a template.
pub async fn get_template(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Template>> {
    let template = state
        .run_blocking(move |s| Ok(s.templates().get(&id)?))
        .await?;
    Ok(Json(template))
}

/// Handle POST /api/templates - create a template.
pub async fn create_template(
    State(state): State<Arc<AppState>>,
    JsonBody(new): JsonBody<NewTemplate>,
) -> ApiResult<(StatusCode, Json<Template>)> {
    let template = state
        .run_blocking(move |s| Ok(s.templates().create(new)?))
        .await?;
    Ok((StatusCode::CREATED, Json(template)))
}

/// Handle POST /api/templates/upload - create a template from a file.
///
/// Multipart fields: `file` (required), `name`, `description`, `category`.
pub async fn upload_template(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Template>)> {
    let mut body = None;
    let mut file_name = None;
    let mut name = None;
    let mut description = None;
    let mut category = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "file" => {
                file_name = field.file_name().map(str::to_string);
                let bytes = field.bytes().await.map_err(bad_multipart)?;
                let text = String::from_utf8(bytes.to_vec()).map_err(|_| {
                    ApiError::InvalidRequest("template file must be UTF-8 text".to_string())
                })?;
                body = Some(text);
            }
            "name" => name = Some(field.text().await.map_err(bad_multipart)?),
            "description" => description = Some(field.text().await.map_err(bad_multipart)?),
            "category" => category = Some(field.text().await.map_err(bad_multipart)?),
            _ => {}
        }
    }

    let body = body.ok_or_else(|| ApiError::InvalidRequest("missing file field".to_string()))?;
    let name = name
        .filter(|n| !n.trim().is_empty())
        .or_else(|| file_name.as_deref().and_then(file_stem))
        .unwrap_or_default();

    let new = NewTemplate {
        name,
        description,
        category,
        body,
    };
    let template = state
        .run_blocking(move |s| Ok(s.templates().create(new)?))
        .await?;
    info!(template_id = %template.id, file = ?file_name, "uploaded template");
    Ok((StatusCode::CREATED, Json(template)))
}

/// Handle PUT /api/templates/:id - update a template.
pub async fn update_template(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    JsonBody(update): JsonBody<TemplateUpdate>,
) -> ApiResult<Json<Template>> {
    let template = state
        .run_blocking(move |s| Ok(s.templates().update(&id, update)?))
        .await?;
    Ok(Json(template))
}

/// Handle DELETE /api/templates/:id - delete a template.
pub async fn delete_template(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state
        .run_blocking(move |s| Ok(s.templates().delete(&id)?))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handle POST /api/templates/:id/preview - render against a posted or sample alert.
///
/// The body, when present, is read like a webhook delivery.
pub async fn preview_template(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<PreviewOutcome>> {
    let alert = if body.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        Some(normalize_payload(&body)?)
    };
    let outcome = state
        .run_blocking(move |s| s.preview_template(&id, alert))
        .await?;
    Ok(Json(outcome))
}

// ============ Documents ============

/// Handle GET /api/documents - list documents, or search with `?search=`.
pub async fn list_documents(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DocumentQuery>,
) -> ApiResult<Response> {
    match query.search {
        Some(q) => {
            let hits = state
                .run_blocking(move |s| Ok(s.documents().search(&q)?))
                .await?;
            Ok(Json(hits).into_response())
        }
        None => {
            let documents = state
                .run_blocking(|s| Ok(s.documents().list()?))
                .await?;
            Ok(Json(documents).into_response())
        }
    }
}

/// Handle GET /api/documents/:id - get a document.
pub async fn get_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Document>> {
    let document = state
        .run_blocking(move |s| Ok(s.documents().get(&id)?))
        .await?;
    Ok(Json(document))
}

/// Handle POST /api/documents - create a document directly.
pub async fn create_document(
    State(state): State<Arc<AppState>>,
    JsonBody(new): JsonBody<NewDocument>,
) -> ApiResult<(StatusCode, Json<Document>)> {
    let document = state
        .run_blocking(move |s| Ok(s.documents().create(new)?))
        .await?;
    Ok((StatusCode::CREATED, Json(document)))
}

/// Handle PUT /api/documents/:id - update a document.
pub async fn update_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    JsonBody(update): JsonBody<DocumentUpdate>,
) -> ApiResult<Json<Document>> {
    let document = state
        .run_blocking(move |s| Ok(s.documents().update(&id, update)?))
        .await?;
    Ok(Json(document))
}

/// Handle DELETE /api/documents/:id - delete a document.
pub async fn delete_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state
        .run_blocking(move |s| Ok(s.documents().delete(&id)?))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handle GET /api/documents/:id/export - download as text or HTML.
pub async fn export_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<ExportQuery>,
) -> ApiResult<Response> {
    let format = match query.format.as_deref() {
        Some(f) => f.parse::<ExportFormat>()?,
        None => ExportFormat::default(),
    };
    let document = state
        .run_blocking(move |s| Ok(s.documents().get(&id)?))
        .await?;
    let exported = export(&document, format);

    let disposition = format!("attachment; filename=\"{}\"", exported.file_name);
    Ok((
        [
            (header::CONTENT_TYPE, exported.content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        exported.body,
    )
        .into_response())
}

fn bad_multipart(err: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::InvalidRequest(format!("bad multipart body: {err}"))
}

fn file_stem(file_name: &str) -> Option<String> {
    FsPath::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("incident.hbs", Some("incident") ; "extension stripped")]
    #[test_case("dir/weekly.report.txt", Some("weekly.report") ; "last extension only")]
    #[test_case("README", Some("README") ; "no extension")]
    #[test_case("", None ; "empty")]
    fn stems(file_name: &str, expected: Option<&str>) {
        assert_eq!(file_stem(file_name).as_deref(), expected);
    }
}
