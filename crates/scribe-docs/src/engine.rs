//! Handlebars template engine.
//!
//! Output is plain text, so HTML escaping is disabled. Besides the built-in
//! `eq`, `ne`, `gt`, `gte`, `lt`, `lte`, `and`, `or` and `not` helpers the
//! engine registers `upper`, `lower` and `default`.

use handlebars::{Handlebars, Template};
use serde::Serialize;
use tracing::debug;

use crate::error::{DocError, Result};

/// Compiles and renders template bodies.
pub struct TemplateEngine {
    registry: Handlebars<'static>,
}

impl TemplateEngine {
    /// Creates an engine with the text helpers registered.
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);
        registry.set_strict_mode(false);
        registry.register_helper("upper", Box::new(helpers::upper_helper));
        registry.register_helper("lower", Box::new(helpers::lower_helper));
        registry.register_helper("default", Box::new(helpers::default_helper));
        Self { registry }
    }

    /// Checks that `body` parses.
    ///
    /// # Errors
    ///
    /// Returns `DocError::TemplateCompile` with the parser's message.
    pub fn compile(&self, body: &str) -> Result<()> {
        Template::compile(body)
            .map(drop)
            .map_err(|e| DocError::TemplateCompile(e.to_string()))
    }

    /// Renders `body` against `context`.
    ///
    /// # Errors
    ///
    /// Returns `DocError::TemplateCompile` if the body does not parse or a
    /// helper fails.
    pub fn render<C: Serialize>(&self, body: &str, context: &C) -> Result<String> {
        self.registry.render_template(body, context).map_err(|e| {
            debug!(error = %e, "template render failed");
            DocError::TemplateCompile(e.to_string())
        })
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TemplateEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateEngine").finish_non_exhaustive()
    }
}

mod helpers {
    use handlebars::handlebars_helper;
    use serde_json::Value;

    handlebars_helper!(upper_helper: |value: Json| display(value).to_uppercase());
    handlebars_helper!(lower_helper: |value: Json| display(value).to_lowercase());
    handlebars_helper!(default_helper: |value: Json, fallback: Json| {
        if is_blank(value) { fallback.clone() } else { value.clone() }
    });

    fn display(value: &Value) -> String {
        match value {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    fn is_blank(value: &Value) -> bool {
        match value {
            Value::Null => true,
            Value::String(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}
