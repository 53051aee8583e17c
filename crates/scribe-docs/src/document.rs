//! Document storage and search.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use scribe_alerts::Priority;
use scribe_store::{MemoryStore, Record, RecordStore};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::error::{DocError, Result, lookup_error};

/// Characters of content included in a search snippet.
pub const SNIPPET_LEN: usize = 200;

/// Alert type recorded on documents created without one.
const DEFAULT_ALERT_TYPE: &str = "info";

/// Review state of a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    /// Written by hand, not yet reviewed.
    #[default]
    Draft,
    /// Rendered from a template.
    Generated,
    /// Checked by an operator.
    Reviewed,
    /// No longer current.
    Archived,
}

impl DocumentStatus {
    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Generated => "generated",
            Self::Reviewed => "reviewed",
            Self::Archived => "archived",
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentStatus {
    type Err = DocError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "generated" => Ok(Self::Generated),
            "reviewed" => Ok(Self::Reviewed),
            "archived" => Ok(Self::Archived),
            other => Err(DocError::Validation(format!("unknown document status: {other}"))),
        }
    }
}

/// A rendered or hand-written incident document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Unique id.
    pub id: String,
    /// Title.
    pub title: String,
    /// Body text.
    pub content: String,
    /// Alert type of the source alert.
    pub alert_type: String,
    /// Priority of the source alert.
    pub priority: Priority,
    /// Template the document was rendered from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    /// Name of that template at render time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_name: Option<String>,
    /// The alert the document was rendered from, verbatim.
    #[serde(default)]
    pub source_alert: Value,
    /// Pending alert the document was rendered from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_id: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
    /// Review state.
    pub status: DocumentStatus,
}

impl Record for Document {
    const KIND: &'static str = "documents";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Document {
    /// Returns true if `needle` (already lowercased) occurs in the title,
    /// content or serialized source alert.
    fn matches(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self.content.to_lowercase().contains(needle)
            || (!self.source_alert.is_null()
                && self.source_alert.to_string().to_lowercase().contains(needle))
    }
}

/// Fields for creating a document directly.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDocument {
    /// Title (required).
    pub title: String,
    /// Content (required).
    pub content: String,
    /// Alert type; defaults to `info`.
    #[serde(default)]
    pub alert_type: Option<String>,
    /// Priority; defaults to medium.
    #[serde(default)]
    pub priority: Option<Priority>,
    /// Source alert payload.
    #[serde(default)]
    pub source_alert: Option<Value>,
}

impl NewDocument {
    /// Creates a request with the required fields.
    #[must_use]
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            ..Self::default()
        }
    }
}

/// Partial document update.
///
/// Blank titles and contents are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentUpdate {
    /// New title.
    #[serde(default)]
    pub title: Option<String>,
    /// New content.
    #[serde(default)]
    pub content: Option<String>,
    /// New status.
    #[serde(default)]
    pub status: Option<DocumentStatus>,
}

/// A search result.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    /// The matching document.
    #[serde(flatten)]
    pub document: Document,
    /// Start of the content.
    pub snippet: String,
}

/// Returns the first [`SNIPPET_LEN`] characters of `content`, with `...`
/// appended when anything was cut.
#[must_use]
pub fn snippet(content: &str) -> String {
    match content.char_indices().nth(SNIPPET_LEN) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content.to_string(),
    }
}

/// CRUD and search over stored documents.
pub struct DocumentStore {
    store: Arc<dyn RecordStore<Document>>,
    write_lock: Mutex<()>,
}

impl DocumentStore {
    /// Creates a document store over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore<Document>>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// Creates a document store backed by memory.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Creates a draft document.
    ///
    /// # Errors
    ///
    /// Returns `DocError::Validation` if the title or content is blank.
    pub fn create(&self, new: NewDocument) -> Result<Document> {
        if new.title.trim().is_empty() {
            return Err(DocError::Validation("title is required".into()));
        }
        if new.content.trim().is_empty() {
            return Err(DocError::Validation("content is required".into()));
        }

        let now = Utc::now();
        let document = Document {
            id: Uuid::new_v4().to_string(),
            title: new.title.trim().to_string(),
            content: new.content,
            alert_type: new
                .alert_type
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_ALERT_TYPE.to_string()),
            priority: new.priority.unwrap_or_default(),
            template_id: None,
            template_name: None,
            source_alert: new.source_alert.unwrap_or(Value::Null),
            alert_id: None,
            created_at: now,
            updated_at: now,
            status: DocumentStatus::Draft,
        };
        self.insert(&document)?;
        Ok(document)
    }

    /// Stores a fully built document.
    ///
    /// # Errors
    ///
    /// Returns a store error.
    pub fn insert(&self, document: &Document) -> Result<()> {
        self.store.put(document)?;
        info!(
            document_id = %document.id,
            status = %document.status,
            priority = %document.priority,
            "stored document"
        );
        Ok(())
    }

    /// Gets a document by id.
    ///
    /// # Errors
    ///
    /// Returns `DocError::DocumentNotFound` for unknown ids.
    pub fn get(&self, id: &str) -> Result<Document> {
        self.store
            .get(id)
            .map_err(|e| lookup_error(e, || DocError::DocumentNotFound(id.to_string())))?
            .ok_or_else(|| DocError::DocumentNotFound(id.to_string()))
    }

    /// Returns all documents, newest first.
    ///
    /// # Errors
    ///
    /// Returns a store error.
    pub fn list(&self) -> Result<Vec<Document>> {
        let mut documents = self.store.list()?;
        documents.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(documents)
    }

    /// Applies a partial update.
    ///
    /// # Errors
    ///
    /// Returns `DocError::DocumentNotFound` for unknown ids.
    pub fn update(&self, id: &str, update: DocumentUpdate) -> Result<Document> {
        let _guard = self.write_lock.lock();
        let mut document = self.get(id)?;

        if let Some(title) = update.title.filter(|t| !t.trim().is_empty()) {
            document.title = title.trim().to_string();
        }
        if let Some(content) = update.content.filter(|c| !c.trim().is_empty()) {
            document.content = content;
        }
        if let Some(status) = update.status {
            document.status = status;
        }
        document.updated_at = Utc::now();

        self.store.put(&document)?;
        info!(document_id = %id, status = %document.status, "updated document");
        Ok(document)
    }

    /// Deletes a document.
    ///
    /// # Errors
    ///
    /// Returns `DocError::DocumentNotFound` if nothing was deleted.
    pub fn delete(&self, id: &str) -> Result<()> {
        let removed = self
            .store
            .delete(id)
            .map_err(|e| lookup_error(e, || DocError::DocumentNotFound(id.to_string())))?;
        if !removed {
            return Err(DocError::DocumentNotFound(id.to_string()));
        }
        info!(document_id = %id, "deleted document");
        Ok(())
    }

    /// Case-insensitive substring search over title, content and source
    /// alert. A blank query matches every document.
    ///
    /// # Errors
    ///
    /// Returns a store error.
    pub fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let needle = query.trim().to_lowercase();
        Ok(self
            .list()?
            .into_iter()
            .filter(|doc| needle.is_empty() || doc.matches(&needle))
            .map(|document| SearchHit {
                snippet: snippet(&document.content),
                document,
            })
            .collect())
    }
}

impl fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentStore").finish_non_exhaustive()
    }
}
