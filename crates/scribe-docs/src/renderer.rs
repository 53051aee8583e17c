//! Turns an alert plus a template into a stored document.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use scribe_alerts::NormalizedAlert;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::context::{RenderContext, build_context};
use crate::document::{Document, DocumentStatus, DocumentStore};
use crate::engine::TemplateEngine;
use crate::error::{DocError, Result};
use crate::template::TemplateStore;

/// Result of a preview. Template errors are reported here rather than raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewOutcome {
    /// Whether rendering succeeded.
    pub success: bool,
    /// Rendered text on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Error message on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PreviewOutcome {
    fn from_render(result: Result<String>) -> Result<Self> {
        match result {
            Ok(content) => Ok(Self {
                success: true,
                content: Some(content),
                error: None,
            }),
            Err(DocError::TemplateCompile(message)) => Ok(Self {
                success: false,
                content: None,
                error: Some(message),
            }),
            Err(other) => Err(other),
        }
    }
}

/// Renders documents from templates.
pub struct Renderer {
    templates: Arc<TemplateStore>,
    documents: Arc<DocumentStore>,
    engine: TemplateEngine,
}

impl Renderer {
    /// Creates a renderer over the given stores.
    #[must_use]
    pub fn new(templates: Arc<TemplateStore>, documents: Arc<DocumentStore>) -> Self {
        Self {
            templates,
            documents,
            engine: TemplateEngine::new(),
        }
    }

    /// Returns the template store.
    #[must_use]
    pub fn templates(&self) -> &Arc<TemplateStore> {
        &self.templates
    }

    /// Returns the document store.
    #[must_use]
    pub fn documents(&self) -> &Arc<DocumentStore> {
        &self.documents
    }

    /// Returns the engine.
    #[must_use]
    pub const fn engine(&self) -> &TemplateEngine {
        &self.engine
    }

    /// Renders `alert` with the template `template_id` and stores the result.
    ///
    /// The template's usage count is bumped afterwards; a failure there is
    /// logged and does not fail the render.
    ///
    /// # Errors
    ///
    /// Returns `DocError::TemplateNotFound`, `DocError::TemplateCompile`, or a
    /// store error if the document cannot be saved.
    pub fn render(
        &self,
        template_id: &str,
        alert: &NormalizedAlert,
        alert_id: Option<&str>,
    ) -> Result<Document> {
        self.render_at(template_id, alert, alert_id, Utc::now())
    }

    /// Like [`Renderer::render`] with an explicit clock.
    ///
    /// # Errors
    ///
    /// See [`Renderer::render`].
    pub fn render_at(
        &self,
        template_id: &str,
        alert: &NormalizedAlert,
        alert_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Document> {
        let template = self.templates.get(template_id)?;
        let context = context_for(alert, alert_id, now, &template.name);
        let content = self.engine.render(&template.body, &context)?;

        let document = Document {
            id: Uuid::new_v4().to_string(),
            title: format!("{} - {}", alert.title_or_default(), now.format("%Y-%m-%d")),
            content,
            alert_type: alert.alert_type.clone(),
            priority: alert.priority(),
            template_id: Some(template.id.clone()),
            template_name: Some(template.name.clone()),
            source_alert: serde_json::to_value(alert).unwrap_or_default(),
            alert_id: alert_id.map(str::to_string),
            created_at: now,
            updated_at: now,
            status: DocumentStatus::Generated,
        };
        self.documents.insert(&document)?;

        if let Err(e) = self.templates.record_usage(&template.id) {
            warn!(template_id = %template.id, error = %e, "failed to record template usage");
        }

        info!(
            document_id = %document.id,
            template_id = %template.id,
            priority = %document.priority,
            "rendered document"
        );
        Ok(document)
    }

    /// Renders `alert` with a stored template without saving anything.
    ///
    /// # Errors
    ///
    /// Returns `DocError::TemplateNotFound`; template errors are reported in
    /// the outcome.
    pub fn preview(&self, template_id: &str, alert: &NormalizedAlert) -> Result<PreviewOutcome> {
        let template = self.templates.get(template_id)?;
        let context = context_for(alert, None, Utc::now(), &template.name);
        PreviewOutcome::from_render(self.engine.render(&template.body, &context))
    }

    /// Renders an unsaved template body against `alert`.
    #[must_use]
    pub fn preview_body(&self, body: &str, alert: &NormalizedAlert) -> PreviewOutcome {
        let context = context_for(alert, None, Utc::now(), "");
        match self.engine.render(body, &context) {
            Ok(content) => PreviewOutcome {
                success: true,
                content: Some(content),
                error: None,
            },
            Err(e) => PreviewOutcome {
                success: false,
                content: None,
                error: Some(e.to_string()),
            },
        }
    }
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer").finish_non_exhaustive()
    }
}

fn context_for(
    alert: &NormalizedAlert,
    alert_id: Option<&str>,
    now: DateTime<Utc>,
    template_name: &str,
) -> RenderContext {
    let mut context = build_context(alert, alert_id, now);
    context.generated.template_name = template_name.to_string();
    context
}
