//! Error types for conversion helpers, filtering and rendering

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use crate::functions::suggest_function;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Main engine error type
#[derive(Error, Debug, Diagnostic)]
pub enum EngineError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Template(#[from] TemplateError),
}

/// Failure inside the format bridge.
///
/// These never cross the template boundary as errors: every bridge function
/// folds them back into data (an empty string, error text, an `"Error"` map
/// entry or a one-element sequence).
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum BridgeError {
    #[error("error converting YAML to JSON: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("error unmarshaling JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("toml: {0}")]
    Toml(#[from] toml::ser::Error),

    #[error("toml: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("cannot unmarshal {found} into {expected}")]
    Shape {
        expected: &'static str,
        found: &'static str,
    },

    #[error("map key of type {found} cannot be converted to a string")]
    NonScalarKey { found: &'static str },

    #[error("number {0} cannot be represented in JSON")]
    NonFiniteNumber(f64),
}

/// Failure of the predicate filter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FilterError {
    /// The collection is neither a sequence nor map-like
    #[error("cannot filter on type {kind}")]
    TypeMismatch { kind: String },

    /// The predicate key is not a string
    #[error("filter key must be a string, got {kind}")]
    KeyNotString { kind: String },
}

impl From<FilterError> for minijinja::Error {
    fn from(err: FilterError) -> Self {
        minijinja::Error::new(minijinja::ErrorKind::InvalidOperation, err.to_string())
    }
}

/// Template-specific error with source information
#[derive(Error, Debug, Diagnostic, Clone)]
#[error("{message}")]
#[diagnostic(code(chartkit::template::render))]
pub struct TemplateError {
    /// Error message
    pub message: String,

    /// Template source code
    #[source_code]
    pub src: NamedSource<String>,

    /// Error location in source
    #[label("error occurred here")]
    pub span: Option<SourceSpan>,

    /// Suggestion for fixing the error
    #[help]
    pub suggestion: Option<String>,
}

impl TemplateError {
    /// Create a new template error from a MiniJinja error
    pub fn from_minijinja(
        err: minijinja::Error,
        template_name: &str,
        template_source: &str,
    ) -> Self {
        let span = err
            .line()
            .and_then(|line_num| calculate_span(template_source, line_num));

        let suggestion = match err.kind() {
            minijinja::ErrorKind::UnknownFunction => err
                .detail()
                .and_then(|detail| detail.split_whitespace().next())
                .and_then(suggest_function),
            _ => None,
        };

        let message = err
            .to_string()
            .replace("invalid operation: ", "")
            .replace("syntax error: ", "");

        Self {
            message,
            src: NamedSource::new(template_name, template_source.to_string()),
            span,
            suggestion,
        }
    }
}

/// Calculate the source span for a given line number
fn calculate_span(source: &str, line_num: usize) -> Option<SourceSpan> {
    let mut offset = 0;

    for (current_line, line) in source.lines().enumerate() {
        if current_line + 1 == line_num {
            return Some(SourceSpan::new(offset.into(), line.len().into()));
        }
        offset += line.len() + 1;
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_span() {
        let source = "first\nsecond line\nthird";
        let span = calculate_span(source, 2).unwrap();
        assert_eq!(span.offset(), 6);
        assert_eq!(span.len(), 11);
        assert!(calculate_span(source, 9).is_none());
    }

    #[test]
    fn test_filter_error_into_minijinja() {
        let err: minijinja::Error = FilterError::TypeMismatch {
            kind: "Number".to_string(),
        }
        .into();
        assert_eq!(err.kind(), minijinja::ErrorKind::InvalidOperation);
        assert!(err.to_string().contains("cannot filter on type Number"));
    }

    #[test]
    fn test_shape_error_message() {
        let err = BridgeError::Shape {
            expected: "map",
            found: "sequence",
        };
        assert_eq!(err.to_string(), "cannot unmarshal sequence into map");
    }
}
