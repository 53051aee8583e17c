//! Templates, rendering and documents for Scribe.
//!
//! `scribe-docs` takes a [`scribe_alerts::NormalizedAlert`] and an operator's
//! template choice and produces a stored [`Document`].
//!
//! # Components
//!
//! - [`TemplateStore`]: Handlebars templates with usage tracking
//! - [`build_context`]: the grouped view of an alert that templates address
//! - [`TemplateEngine`]: plain-text Handlebars with comparison helpers
//! - [`Renderer`]: render, preview and persist
//! - [`DocumentStore`]: CRUD and substring search
//! - [`export()`]: plain text or standalone HTML
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use scribe_alerts::NormalizedAlert;
//! use scribe_docs::{DocumentStore, NewTemplate, Renderer, TemplateStore};
//!
//! let renderer = Renderer::new(
//!     Arc::new(TemplateStore::in_memory()),
//!     Arc::new(DocumentStore::in_memory()),
//! );
//! let template = renderer
//!     .templates()
//!     .create(NewTemplate::new("Short", "{{upper alert.priority}}: {{alert.title}}"))
//!     .unwrap();
//!
//! let alert = NormalizedAlert::new("error").with_title("Disk full");
//! let doc = renderer.render(&template.id, &alert, None).unwrap();
//! assert_eq!(doc.content, "HIGH: Disk full");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod context;
pub mod document;
pub mod engine;
pub mod error;
pub mod export;
pub mod renderer;
pub mod template;

pub use context::{RenderContext, build_context, relative_time};
pub use document::{
    Document, DocumentStatus, DocumentStore, DocumentUpdate, NewDocument, SNIPPET_LEN, SearchHit,
    snippet,
};
pub use engine::TemplateEngine;
pub use error::{DocError, Result};
pub use export::{Export, ExportFormat, export, priority_color};
pub use renderer::{PreviewOutcome, Renderer};
pub use template::{
    DEFAULT_CATEGORY, NewTemplate, Template, TemplateStore, TemplateUpdate, default_template,
};
