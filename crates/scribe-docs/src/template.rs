//! Template storage.
//!
//! Templates are Handlebars text with usage bookkeeping. Each render bumps
//! `usageCount` and `lastUsedAt` through [`TemplateStore::record_usage`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use scribe_store::{MemoryStore, Record, RecordStore};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::{DocError, Result, lookup_error};

/// Category assigned when none is given.
pub const DEFAULT_CATEGORY: &str = "general";

/// A named, reusable document template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    /// Unique id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Grouping category.
    pub category: String,
    /// Handlebars source.
    pub body: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
    /// Number of documents rendered from this template.
    #[serde(default)]
    pub usage_count: u64,
    /// Last render time.
    #[serde(default)]
    pub last_used_at: Option<DateTime<Utc>>,
}

impl Record for Template {
    const KIND: &'static str = "templates";

    fn id(&self) -> &str {
        &self.id
    }
}

/// Fields for creating a template.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTemplate {
    /// Display name (required).
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Category; defaults to [`DEFAULT_CATEGORY`].
    #[serde(default)]
    pub category: Option<String>,
    /// Handlebars source (required).
    pub body: String,
}

impl NewTemplate {
    /// Creates a request with the required fields.
    #[must_use]
    pub fn new(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: body.into(),
            ..Self::default()
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the category.
    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// Partial template update; absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateUpdate {
    /// New name.
    #[serde(default)]
    pub name: Option<String>,
    /// New description.
    #[serde(default)]
    pub description: Option<String>,
    /// New category.
    #[serde(default)]
    pub category: Option<String>,
    /// New body.
    #[serde(default)]
    pub body: Option<String>,
}

/// CRUD and usage tracking over stored templates.
pub struct TemplateStore {
    store: Arc<dyn RecordStore<Template>>,
    /// Serializes read-modify-write cycles.
    write_lock: Mutex<()>,
}

impl TemplateStore {
    /// Creates a template store over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore<Template>>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// Creates a template store backed by memory.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Creates a template.
    ///
    /// # Errors
    ///
    /// Returns `DocError::Validation` if the name or body is blank.
    pub fn create(&self, new: NewTemplate) -> Result<Template> {
        let name = required("name", &new.name)?;
        required("body", &new.body)?;

        let now = Utc::now();
        let template = Template {
            id: Uuid::new_v4().to_string(),
            name,
            description: new.description.unwrap_or_default(),
            category: category_or_default(new.category.as_deref()),
            body: new.body,
            created_at: now,
            updated_at: now,
            usage_count: 0,
            last_used_at: None,
        };

        self.store.put(&template)?;
        info!(template_id = %template.id, name = %template.name, "created template");
        Ok(template)
    }

    /// Gets a template by id.
    ///
    /// # Errors
    ///
    /// Returns `DocError::TemplateNotFound` for unknown ids.
    pub fn get(&self, id: &str) -> Result<Template> {
        self.store
            .get(id)
            .map_err(|e| lookup_error(e, || DocError::TemplateNotFound(id.to_string())))?
            .ok_or_else(|| DocError::TemplateNotFound(id.to_string()))
    }

    /// Returns all templates, newest first.
    ///
    /// # Errors
    ///
    /// Returns a store error if the templates cannot be listed.
    pub fn list(&self) -> Result<Vec<Template>> {
        let mut templates = self.store.list()?;
        templates.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(templates)
    }

    /// Returns true when no templates are stored.
    ///
    /// # Errors
    ///
    /// Returns a store error if the templates cannot be counted.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.store.count()? == 0)
    }

    /// Applies a partial update.
    ///
    /// # Errors
    ///
    /// Returns `DocError::TemplateNotFound`, or `DocError::Validation` if a
    /// supplied name or body is blank.
    pub fn update(&self, id: &str, update: TemplateUpdate) -> Result<Template> {
        let _guard = self.write_lock.lock();
        let mut template = self.get(id)?;

        if let Some(name) = update.name {
            template.name = required("name", &name)?;
        }
        if let Some(body) = update.body {
            required("body", &body)?;
            template.body = body;
        }
        if let Some(description) = update.description {
            template.description = description;
        }
        if let Some(category) = update.category {
            template.category = category_or_default(Some(&category));
        }
        template.updated_at = Utc::now();

        self.store.put(&template)?;
        info!(template_id = %id, "updated template");
        Ok(template)
    }

    /// Deletes a template.
    ///
    /// # Errors
    ///
    /// Returns `DocError::TemplateNotFound` if nothing was deleted.
    pub fn delete(&self, id: &str) -> Result<()> {
        let removed = self
            .store
            .delete(id)
            .map_err(|e| lookup_error(e, || DocError::TemplateNotFound(id.to_string())))?;

        if !removed {
            return Err(DocError::TemplateNotFound(id.to_string()));
        }
        info!(template_id = %id, "deleted template");
        Ok(())
    }

    /// Increments the usage count and stamps the last-used time.
    ///
    /// # Errors
    ///
    /// Returns `DocError::TemplateNotFound` for unknown ids.
    pub fn record_usage(&self, id: &str) -> Result<Template> {
        let _guard = self.write_lock.lock();
        let mut template = self.get(id)?;

        let now = Utc::now();
        template.usage_count += 1;
        template.last_used_at = Some(template.last_used_at.map_or(now, |prev| prev.max(now)));

        self.store.put(&template)?;
        Ok(template)
    }

    /// Creates the built-in incident template when the store is empty.
    ///
    /// Returns the created template, or `None` if templates already exist.
    ///
    /// # Errors
    ///
    /// Returns a store error.
    pub fn seed_default(&self) -> Result<Option<Template>> {
        if !self.is_empty()? {
            return Ok(None);
        }
        let template = self.create(default_template())?;
        info!(template_id = %template.id, "seeded default template");
        Ok(Some(template))
    }
}

impl std::fmt::Debug for TemplateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateStore").finish_non_exhaustive()
    }
}

/// The built-in incident report template.
#[must_use]
pub fn default_template() -> NewTemplate {
    NewTemplate::new("Incident Report", DEFAULT_TEMPLATE_BODY)
        .description("Standard incident report generated from a monitoring alert")
        .category("incident")
}

const DEFAULT_TEMPLATE_BODY: &str = "\
INCIDENT REPORT: {{alert.title}}
================================================================

Priority:    {{upper alert.priority}}
Alert type:  {{alert.type}}
Triggered:   {{timing.formatted}} ({{timing.relative}})
{{#if org.name}}Organization: {{org.name}}
{{/if}}
SUMMARY
-------
{{default alert.message \"No message was included with this alert.\"}}

AFFECTED SYSTEMS
----------------
Host:        {{default host.hostname \"unknown\"}}
Environment: {{default host.environment \"unknown\"}}
Service:     {{default host.service \"unknown\"}}
{{#if host.team}}Team:        {{host.team}}
{{/if}}{{#if host.region}}Region:      {{host.region}}
{{/if}}
{{#if metric.name}}
METRIC
------
{{metric.name}}: {{metric.value}}{{metric.unit}}{{#if metric.threshold}} (threshold {{metric.threshold}}){{/if}}
{{#if metric.condition}}Condition: {{metric.condition}}
{{/if}}{{/if}}
{{#if (eq alert.priority \"high\")}}
ACTION REQUIRED: this is a high-priority incident. Page the on-call owner.
{{else}}
Review during business hours.
{{/if}}
{{#if alert.url}}Details: {{alert.url}}
{{/if}}
----------------------------------------------------------------
Generated {{generated.formatted}} from template \"{{generated.templateName}}\"
";

/// Trims and checks a required field.
fn required(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DocError::Validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

fn category_or_default(category: Option<&str>) -> String {
    match category.map(str::trim) {
        Some(c) if !c.is_empty() => c.to_string(),
        _ => DEFAULT_CATEGORY.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn store() -> TemplateStore {
        TemplateStore::in_memory()
    }

    mod create_tests {
        use super::*;

        #[test]
        fn create_then_get() {
            let store = store();
            let created = store
                .create(NewTemplate::new("  Outage  ", "{{alert.title}}").description("d"))
                .unwrap();

            let loaded = store.get(&created.id).unwrap();
            assert_eq!(loaded, created);
            assert_eq!(loaded.name, "Outage");
            assert_eq!(loaded.category, DEFAULT_CATEGORY);
            assert_eq!(loaded.usage_count, 0);
            assert!(loaded.last_used_at.is_none());
        }

        #[test]
        fn blank_category_defaults() {
            let template = store()
                .create(NewTemplate::new("a", "b").category("   "))
                .unwrap();
            assert_eq!(template.category, "general");
        }

        #[test]
        fn name_and_body_required() {
            let store = store();
            assert!(matches!(
                store.create(NewTemplate::new("", "body")),
                Err(DocError::Validation(_))
            ));
            assert!(matches!(
                store.create(NewTemplate::new("name", " \n ")),
                Err(DocError::Validation(_))
            ));
        }

        proptest! {
            #[test]
            fn new_templates_start_unused(name in "[A-Za-z][A-Za-z0-9 ]{0,30}", body in "[a-z{}. ]{1,60}") {
                prop_assume!(!body.trim().is_empty());
                let store = store();
                let created = store.create(NewTemplate::new(name, body)).unwrap();
                let loaded = store.get(&created.id).unwrap();
                prop_assert_eq!(loaded.usage_count, 0);
            }
        }
    }

    mod update_tests {
        use super::*;

        #[test]
        fn partial_update_keeps_other_fields() {
            let store = store();
            let created = store.create(NewTemplate::new("n", "b").category("ops")).unwrap();

            let updated = store
                .update(
                    &created.id,
                    TemplateUpdate {
                        body: Some("new body".into()),
                        ..TemplateUpdate::default()
                    },
                )
                .unwrap();

            assert_eq!(updated.body, "new body");
            assert_eq!(updated.name, "n");
            assert_eq!(updated.category, "ops");
            assert!(updated.updated_at >= created.updated_at);
        }

        #[test]
        fn blank_name_rejected() {
            let store = store();
            let created = store.create(NewTemplate::new("n", "b")).unwrap();
            let err = store
                .update(
                    &created.id,
                    TemplateUpdate {
                        name: Some(" ".into()),
                        ..TemplateUpdate::default()
                    },
                )
                .unwrap_err();
            assert!(matches!(err, DocError::Validation(_)));
        }

        #[test]
        fn update_missing_is_not_found() {
            let err = store().update("missing", TemplateUpdate::default()).unwrap_err();
            assert!(matches!(err, DocError::TemplateNotFound(_)));
        }
    }

    mod delete_tests {
        use super::*;

        #[test]
        fn delete_twice_is_not_found() {
            let store = store();
            let created = store.create(NewTemplate::new("n", "b")).unwrap();

            store.delete(&created.id).unwrap();
            assert!(matches!(store.delete(&created.id), Err(DocError::TemplateNotFound(_))));
        }

        #[test]
        fn delete_unknown_is_not_found() {
            let store = store();
            assert!(matches!(store.delete("nope"), Err(DocError::TemplateNotFound(_))));
            assert!(matches!(store.delete("nope"), Err(DocError::TemplateNotFound(_))));
            assert!(matches!(store.delete("../etc"), Err(DocError::TemplateNotFound(_))));
        }
    }

    mod usage_tests {
        use super::*;

        #[test]
        fn record_usage_increments() {
            let store = store();
            let created = store.create(NewTemplate::new("n", "b")).unwrap();

            let first = store.record_usage(&created.id).unwrap();
            let second = store.record_usage(&created.id).unwrap();

            assert_eq!(first.usage_count, 1);
            assert_eq!(second.usage_count, 2);
            assert!(second.last_used_at >= first.last_used_at);
            assert!(first.last_used_at.is_some());
        }
    }

    mod listing_tests {
        use super::*;

        #[test]
        fn list_newest_first() {
            let store = store();
            let a = store.create(NewTemplate::new("a", "b")).unwrap();
            std::thread::sleep(std::time::Duration::from_millis(5));
            let b = store.create(NewTemplate::new("b", "b")).unwrap();

            let ids: Vec<_> = store.list().unwrap().into_iter().map(|t| t.id).collect();
            assert_eq!(ids, vec![b.id, a.id]);
        }

        #[test]
        fn seed_only_when_empty() {
            let store = store();
            let seeded = store.seed_default().unwrap();
            assert!(seeded.is_some());
            assert!(store.seed_default().unwrap().is_none());
            assert_eq!(store.list().unwrap().len(), 1);
        }
    }
}
