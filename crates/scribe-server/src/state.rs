//! Shared state for the HTTP server.

use std::sync::Arc;
use std::time::Instant;

use scribe_alerts::{AlertError, AlertQueue, FingerprintClaim, NormalizedAlert, PendingAlert};
use scribe_docs::{Document, DocumentStore, PreviewOutcome, Renderer, Template, TemplateStore};
use scribe_store::FileStore;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::error::{ApiError, ApiResult};

/// Services shared by every request.
#[derive(Debug)]
pub struct AppState {
    config: Arc<ServerConfig>,
    alerts: Arc<AlertQueue>,
    renderer: Arc<Renderer>,
    start_time: Instant,
}

impl AppState {
    /// Creates state from already-built services.
    #[must_use]
    pub fn new(config: ServerConfig, alerts: Arc<AlertQueue>, renderer: Arc<Renderer>) -> Self {
        Self {
            config: Arc::new(config),
            alerts,
            renderer,
            start_time: Instant::now(),
        }
    }

    /// Opens file-backed services under `config.data_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if a store directory cannot be created.
    pub fn open(config: ServerConfig) -> ApiResult<Self> {
        let root = config.data_dir.clone();
        let alerts = AlertQueue::new(
            config.queue_config(),
            Arc::new(FileStore::<PendingAlert>::open(&root)?),
            Arc::new(FileStore::<FingerprintClaim>::open(&root)?),
        );
        let templates = TemplateStore::new(Arc::new(FileStore::<Template>::open(&root)?));
        let documents = DocumentStore::new(Arc::new(FileStore::<Document>::open(&root)?));
        info!(data_dir = %root.display(), "opened record stores");

        Ok(Self::new(
            config,
            Arc::new(alerts),
            Arc::new(Renderer::new(Arc::new(templates), Arc::new(documents))),
        ))
    }

    /// Creates memory-backed services.
    #[must_use]
    pub fn in_memory(config: ServerConfig) -> Self {
        let alerts = AlertQueue::in_memory(config.queue_config());
        let renderer = Renderer::new(
            Arc::new(TemplateStore::in_memory()),
            Arc::new(DocumentStore::in_memory()),
        );
        Self::new(config, Arc::new(alerts), Arc::new(renderer))
    }

    /// Seeds the default template if enabled and the store is empty.
    ///
    /// # Errors
    ///
    /// Returns a store error.
    pub fn seed(&self) -> ApiResult<()> {
        if self.config.seed_template {
            self.templates().seed_default()?;
        }
        Ok(())
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get the alert queue.
    #[must_use]
    pub fn alerts(&self) -> &AlertQueue {
        &self.alerts
    }

    /// Get the renderer.
    #[must_use]
    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// Get the template store.
    #[must_use]
    pub fn templates(&self) -> &TemplateStore {
        self.renderer.templates()
    }

    /// Get the document store.
    #[must_use]
    pub fn documents(&self) -> &DocumentStore {
        self.renderer.documents()
    }

    /// Get the server uptime in seconds.
    #[must_use]
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Runs store-backed work on tokio's blocking pool.
    ///
    /// Record stores do synchronous file I/O, and the alert queue holds its
    /// write lock while doing it.
    ///
    /// # Errors
    ///
    /// Returns the closure's error, or `ApiError::Internal` if the task did
    /// not complete.
    pub async fn run_blocking<T, F>(self: Arc<Self>, f: F) -> ApiResult<T>
    where
        F: FnOnce(&Self) -> ApiResult<T> + Send + 'static,
        T: Send + 'static,
    {
        tokio::task::spawn_blocking(move || f(&self))
            .await
            .map_err(|e| ApiError::Internal(format!("blocking task failed: {e}")))?
    }

    /// Renders a document from a pending alert and marks the alert processed.
    ///
    /// # Errors
    ///
    /// Returns not-found and already-processed errors from the queue and
    /// template or store errors from the renderer.
    pub fn process_alert(&self, alert_id: &str, template_id: &str) -> ApiResult<Document> {
        let pending = self.pending(alert_id)?;
        let document = self
            .renderer
            .render(template_id, &pending.alert, Some(&pending.id))?;

        if let Err(e) = self.alerts.mark_processed(&pending.id, &document.id) {
            // Another request processed it first; drop our copy.
            warn!(alert_id = %pending.id, document_id = %document.id, error = %e, "discarding document");
            if let Err(cleanup) = self.documents().delete(&document.id) {
                warn!(document_id = %document.id, error = %cleanup, "failed to discard document");
            }
            return Err(e.into());
        }

        info!(alert_id = %pending.id, document_id = %document.id, "processed alert");
        Ok(document)
    }

    /// Previews a template against a pending alert.
    ///
    /// # Errors
    ///
    /// Returns not-found errors for the alert or template.
    pub fn preview_alert(&self, alert_id: &str, template_id: &str) -> ApiResult<PreviewOutcome> {
        let pending = self.alerts.get(alert_id)?;
        Ok(self.renderer.preview(template_id, &pending.alert)?)
    }

    /// Previews a template against `alert`, or the sample alert.
    ///
    /// # Errors
    ///
    /// Returns `TemplateNotFound`.
    pub fn preview_template(
        &self,
        template_id: &str,
        alert: Option<NormalizedAlert>,
    ) -> ApiResult<PreviewOutcome> {
        let alert = alert.unwrap_or_else(NormalizedAlert::sample);
        Ok(self.renderer.preview(template_id, &alert)?)
    }

    fn pending(&self, alert_id: &str) -> ApiResult<PendingAlert> {
        let pending = self.alerts.get(alert_id)?;
        if !pending.is_pending() {
            return Err(ApiError::Alert(AlertError::AlreadyProcessed { id: pending.id }));
        }
        Ok(pending)
    }
}
