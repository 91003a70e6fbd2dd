//! Template engine based on MiniJinja

use minijinja::Environment;
use serde::Serialize;

use crate::error::{EngineError, Result, TemplateError};
use crate::functions;

/// Template engine builder
pub struct EngineBuilder {
    strict_mode: bool,
    placeholders: bool,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            strict_mode: true,
            placeholders: true,
        }
    }

    /// Set strict mode (fail on undefined variables)
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict_mode = strict;
        self
    }

    /// Install the late-bound placeholders (`include`, `tpl`, `required`, `lookup`)
    pub fn placeholders(mut self, placeholders: bool) -> Self {
        self.placeholders = placeholders;
        self
    }

    /// Build the engine
    pub fn build(self) -> Engine {
        Engine {
            strict_mode: self.strict_mode,
            placeholders: self.placeholders,
        }
    }
}

/// The template engine
pub struct Engine {
    strict_mode: bool,
    placeholders: bool,
}

impl Default for Engine {
    fn default() -> Self {
        EngineBuilder::new().build()
    }
}

impl Engine {
    /// Create a builder
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// Create a MiniJinja environment with the function table installed.
    ///
    /// Hosts that own the real `include`/`tpl`/`required`/`lookup`
    /// register them on the returned environment.
    pub fn environment(&self) -> Environment<'static> {
        let mut env = Environment::new();

        if self.strict_mode {
            env.set_undefined_behavior(minijinja::UndefinedBehavior::Strict);
        } else {
            env.set_undefined_behavior(minijinja::UndefinedBehavior::Lenient);
        }

        // Output is YAML/JSON/TOML text, never HTML
        env.set_auto_escape_callback(|_| minijinja::AutoEscape::None);

        if self.placeholders {
            functions::install(&mut env);
        } else {
            functions::install_core(&mut env);
        }

        env
    }

    /// Render a single template string
    pub fn render_string<S: Serialize>(
        &self,
        template: &str,
        context: S,
        template_name: &str,
    ) -> Result<String> {
        let mut env = self.environment();

        env.add_template_owned(template_name.to_string(), template.to_string())
            .map_err(|e| {
                EngineError::Template(TemplateError::from_minijinja(e, template_name, template))
            })?;

        let tmpl = env.get_template(template_name).map_err(|e| {
            EngineError::Template(TemplateError::from_minijinja(e, template_name, template))
        })?;

        tmpl.render(context).map_err(|e| {
            tracing::debug!(template = template_name, error = %e, "render failed");
            EngineError::Template(TemplateError::from_minijinja(e, template_name, template))
        })
    }
}
