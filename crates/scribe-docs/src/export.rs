//! Document export as plain text or a standalone HTML page.

use std::fmt;
use std::str::FromStr;

use handlebars::html_escape;
use scribe_alerts::Priority;
use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::error::DocError;

/// Export format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// The stored content, unchanged.
    #[default]
    Text,
    /// A styled HTML page.
    Html,
}

impl ExportFormat {
    /// Returns the MIME type.
    #[must_use]
    pub const fn content_type(&self) -> &'static str {
        match self {
            Self::Text => "text/plain; charset=utf-8",
            Self::Html => "text/html; charset=utf-8",
        }
    }

    /// Returns the file extension.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Text => "txt",
            Self::Html => "html",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = DocError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "html" => Ok(Self::Html),
            other => Err(DocError::Validation(format!("unsupported export format: {other}"))),
        }
    }
}

/// An exported document ready to send as a download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    /// MIME type.
    pub content_type: &'static str,
    /// Suggested download name.
    pub file_name: String,
    /// Body.
    pub body: String,
}

/// Exports `document` as `format`.
#[must_use]
pub fn export(document: &Document, format: ExportFormat) -> Export {
    let body = match format {
        ExportFormat::Text => document.content.clone(),
        ExportFormat::Html => render_html(document),
    };
    Export {
        content_type: format.content_type(),
        file_name: format!("{}.{}", file_stem(&document.title), format.extension()),
        body,
    }
}

/// Accent color for a priority.
#[must_use]
pub const fn priority_color(priority: Priority) -> &'static str {
    match priority {
        Priority::High => "#dc3545",
        Priority::Medium => "#fd7e14",
        Priority::Low => "#28a745",
    }
}

const STYLESHEET: &str = "\
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; background: #f5f6f8; color: #212529; margin: 0; padding: 2rem; }
.document { max-width: 860px; margin: 0 auto; background: #fff; padding: 2rem; border-left: 6px solid #6c757d; border-radius: 4px; box-shadow: 0 1px 3px rgba(0, 0, 0, 0.1); }
.document.priority-high { border-left-color: #dc3545; }
.document.priority-medium { border-left-color: #fd7e14; }
.document.priority-low { border-left-color: #28a745; }
h1 { margin-top: 0; font-size: 1.5rem; }
.meta { color: #6c757d; font-size: 0.875rem; margin-bottom: 1.5rem; }
.meta span { margin-right: 1rem; }
.badge { display: inline-block; padding: 0.1rem 0.5rem; border-radius: 3px; color: #fff; text-transform: uppercase; font-size: 0.75rem; }
pre.content { white-space: pre-wrap; word-wrap: break-word; font-family: SFMono-Regular, Menlo, Consolas, monospace; font-size: 0.875rem; line-height: 1.5; }
";

fn render_html(document: &Document) -> String {
    let title = html_escape(&document.title);
    let priority = document.priority.as_str();
    let color = priority_color(document.priority);
    let template = document
        .template_name
        .as_deref()
        .map(|name| format!("<span>Template: {}</span>", html_escape(name)))
        .unwrap_or_default();

    format!(
        "<!DOCTYPE html>
<html lang=\"en\">
<head>
<meta charset=\"utf-8\">
<title>{title}</title>
<style>
{STYLESHEET}</style>
</head>
<body>
<article class=\"document priority-{priority}\" style=\"border-left-color: {color};\">
<h1>{title}</h1>
<div class=\"meta\">
<span class=\"badge\" style=\"background: {color};\">{priority}</span>
<span>Type: {alert_type}</span>
<span>Status: {status}</span>
<span>Created: {created}</span>
{template}
</div>
<pre class=\"content\">{content}</pre>
</article>
</body>
</html>
",
        alert_type = html_escape(&document.alert_type),
        status = document.status,
        created = document.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
        content = html_escape(&document.content),
    )
}

/// Reduces a title to a safe file name stem.
fn file_stem(title: &str) -> String {
    let mut stem = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            stem.push(c.to_ascii_lowercase());
        } else if !stem.ends_with('-') {
            stem.push('-');
        }
    }
    let stem = stem.trim_matches('-');
    if stem.is_empty() {
        "document".to_string()
    } else {
        stem.to_string()
    }
}
